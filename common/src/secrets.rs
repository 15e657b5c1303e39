//! Secret material handed to a plugin at initialization.
//!
//! The orchestrator ships its secret store as newline-separated
//! `key=value` text. Keys are looked up case-insensitively so plugins do
//! not have to agree on exact casing with whoever wrote the store.

#[derive(Debug, Clone, Default)]
pub struct SecretCollection {
    entries: Vec<(String, String)>,
}

impl SecretCollection {
    /// Parses the formatted secret text. `None` yields an empty collection.
    /// Lines without a `=` past the first character are ignored.
    pub fn parse(formatted: Option<&str>) -> Self {
        let mut entries = Vec::new();
        if let Some(text) = formatted {
            for line in text.lines() {
                if let Some(idx) = line.find('=') {
                    if idx > 0 {
                        entries.push((line[..idx].to_string(), line[idx + 1..].to_string()));
                    }
                }
            }
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines() {
        let secrets = SecretCollection::parse(Some("githubToken=abc123\napiKey=xyz"));
        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets.get("githubToken"), Some("abc123"));
        assert_eq!(secrets.get("apiKey"), Some("xyz"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let secrets = SecretCollection::parse(Some("GithubToken=abc"));
        assert_eq!(secrets.get("githubtoken"), Some("abc"));
        assert_eq!(secrets.get("GITHUBTOKEN"), Some("abc"));
    }

    #[test]
    fn value_may_contain_equals() {
        let secrets = SecretCollection::parse(Some("key=a=b=c"));
        assert_eq!(secrets.get("key"), Some("a=b=c"));
    }

    #[test]
    fn skips_malformed_lines() {
        let secrets = SecretCollection::parse(Some("=nokey\nplain\nok=1"));
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets.get("ok"), Some("1"));
    }

    #[test]
    fn none_is_empty() {
        assert!(SecretCollection::parse(None).is_empty());
    }
}
