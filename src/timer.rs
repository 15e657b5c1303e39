//! Automatic update scheduling through a systemd timer.
//!
//! `updaemon timer 5m` writes a oneshot `updaemon.service` plus an
//! `updaemon.timer` firing on the requested cadence, then reloads
//! systemd and enables the timer.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, UpdaemonError};
use crate::paths;

const TIMER_UNIT: &str = "updaemon.timer";

const SERVICE_UNIT_CONTENT: &str = "\
[Unit]
Description=Updaemon update service

[Service]
Type=oneshot
ExecStart=/usr/local/bin/updaemon update
";

pub struct TimerManager {
    timer_unit_path: PathBuf,
    service_unit_path: PathBuf,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::with_unit_dir(paths::unit_dir())
    }

    pub fn with_unit_dir(unit_dir: PathBuf) -> Self {
        Self {
            timer_unit_path: unit_dir.join(TIMER_UNIT),
            service_unit_path: unit_dir.join("updaemon.service"),
        }
    }

    pub async fn set(&self, interval: Duration) -> Result<()> {
        fs::write(&self.service_unit_path, SERVICE_UNIT_CONTENT)?;
        fs::write(&self.timer_unit_path, timer_unit_content(interval))?;

        systemctl(&["daemon-reload"]).await?;
        systemctl(&["enable", TIMER_UNIT]).await?;
        systemctl(&["start", TIMER_UNIT]).await?;
        Ok(())
    }

    pub async fn disable(&self) -> Result<()> {
        // The timer may not be running or enabled; neither is an error.
        if let Err(err) = systemctl(&["stop", TIMER_UNIT]).await {
            debug!(%err, "stop ignored");
        }
        if let Err(err) = systemctl(&["disable", TIMER_UNIT]).await {
            debug!(%err, "disable ignored");
        }
        Ok(())
    }

    pub async fn is_enabled(&self) -> bool {
        match systemctl_output(&["is-enabled", TIMER_UNIT]).await {
            Ok(output) => output.trim() == "enabled",
            Err(err) => {
                debug!(%err, "is-enabled probe failed");
                false
            }
        }
    }

    /// The `OnCalendar=` expression currently installed, if any.
    pub fn current_interval(&self) -> Option<String> {
        let content = fs::read_to_string(&self.timer_unit_path).ok()?;
        content.lines().find_map(|line| {
            line.strip_prefix("OnCalendar=")
                .map(|value| value.trim().to_string())
        })
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses `30s`, `5m`, `2h` style intervals.
pub fn parse_interval(interval: &str) -> Option<Duration> {
    let interval = interval.trim().to_lowercase();
    if interval.len() < 2 {
        return None;
    }
    let (number, unit) = interval.split_at(interval.len() - 1);
    let value: u64 = number.parse().ok().filter(|v| *v > 0)?;
    match unit {
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        "h" => Some(Duration::from_secs(value * 3600)),
        _ => None,
    }
}

/// Maps an interval onto a systemd `OnCalendar` expression.
pub fn on_calendar(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs < 60 {
        format!("*:*:0/{secs}")
    } else if secs < 3600 {
        format!("*:0/{}:00", secs / 60)
    } else {
        format!("0/{}:00:00", secs / 3600)
    }
}

fn timer_unit_content(interval: Duration) -> String {
    format!(
        "\
[Unit]
Description=Run updaemon update periodically

[Timer]
OnCalendar={}
Persistent=true

[Install]
WantedBy=timers.target
",
        on_calendar(interval)
    )
}

async fn systemctl(args: &[&str]) -> Result<()> {
    systemctl_output(args).await.map(|_| ())
}

async fn systemctl_output(args: &[&str]) -> Result<String> {
    debug!(?args, "systemctl");
    let output = Command::new("systemctl").args(args).output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(?args, %stderr, "systemctl failed");
        return Err(UpdaemonError::Systemctl {
            command: args.join(" "),
            unit: TIMER_UNIT.to_string(),
            stderr,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
