//! Archive post-processing for downloaded assets.
//!
//! When the downloaded asset is the only file in the version directory
//! and looks like an archive, it is unpacked in place, the archive file
//! removed, and a lone top-level directory flattened away so the
//! executable detector sees the real tree. Everything here is advisory:
//! a failure leaves the download as-is and is only logged.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{info, warn};
use zip::ZipArchive;

pub(crate) async fn post_process(dir: &Path) {
    let dir = dir.to_path_buf();
    let result = tokio::task::spawn_blocking(move || process(&dir)).await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(%err, "archive post-processing failed; leaving download as-is"),
        Err(err) => warn!(%err, "archive post-processing task panicked"),
    }
}

fn process(dir: &Path) -> anyhow::Result<()> {
    let Some(archive) = sole_archive(dir)? else {
        return Ok(());
    };

    let name = archive.to_string_lossy().to_string();
    if name.ends_with(".zip") {
        info!(archive = %name, "unpacking zip asset");
        extract_zip(&archive, dir)?;
    } else {
        info!(archive = %name, "unpacking tarball asset");
        extract_tar_gz(&archive, dir)?;
    }
    fs::remove_file(&archive)?;
    flatten_single_dir(dir)?;
    Ok(())
}

/// The directory's one file, when it is an archive. Several files mean
/// the asset was not an archive download, so nothing is touched.
fn sole_archive(dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?;
    let first = match entries.next() {
        Some(entry) => entry?.path(),
        None => return Ok(None),
    };
    if entries.next().is_some() || !first.is_file() {
        return Ok(None);
    }

    let name = first.to_string_lossy().to_lowercase();
    if name.ends_with(".zip") || name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Ok(Some(first))
    } else {
        Ok(None)
    }
}

fn extract_zip(archive: &Path, dir: &Path) -> anyhow::Result<()> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    zip.extract(dir)?;
    Ok(())
}

fn extract_tar_gz(archive: &Path, dir: &Path) -> anyhow::Result<()> {
    let tar = GzDecoder::new(File::open(archive)?);
    Archive::new(tar).unpack(dir)?;
    Ok(())
}

/// Archives often wrap everything in `<app>-<version>/`; hoist that
/// layer away so paths stay short and detection predictable.
fn flatten_single_dir(dir: &Path) -> anyhow::Result<()> {
    let entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    let [only] = entries.as_slice() else {
        return Ok(());
    };
    let inner = only.path();
    if !inner.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(&inner)? {
        let entry = entry?;
        fs::rename(entry.path(), dir.join(entry.file_name()))?;
    }
    fs::remove_dir(&inner)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in files {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn write_tar_gz(path: &Path, files: &[(&str, &str)]) {
        let gz = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(gz);
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[tokio::test]
    async fn zip_asset_is_unpacked_and_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("app.zip");
        write_zip(&archive, &[("app", "bin"), ("README", "docs")]);

        post_process(tmp.path()).await;

        assert!(!archive.exists());
        assert!(tmp.path().join("app").is_file());
        assert!(tmp.path().join("README").is_file());
    }

    #[tokio::test]
    async fn tarball_with_wrapper_directory_is_flattened() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("app-1.2.3.tar.gz");
        write_tar_gz(
            &archive,
            &[("app-1.2.3/app", "bin"), ("app-1.2.3/lib/data", "x")],
        );

        post_process(tmp.path()).await;

        assert!(!archive.exists());
        assert!(tmp.path().join("app").is_file());
        assert!(tmp.path().join("lib/data").is_file());
        assert!(!tmp.path().join("app-1.2.3").exists());
    }

    #[tokio::test]
    async fn plain_binary_download_is_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let binary = tmp.path().join("app");
        fs::write(&binary, "bin").unwrap();

        post_process(tmp.path()).await;

        assert!(binary.is_file());
    }

    #[tokio::test]
    async fn archive_beside_other_files_is_not_unpacked() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("app.zip");
        write_zip(&archive, &[("app", "bin")]);
        fs::write(tmp.path().join("notes.txt"), "keep").unwrap();

        post_process(tmp.path()).await;

        assert!(archive.exists());
    }
}
