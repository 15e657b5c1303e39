use std::time::Duration;

use anyhow::bail;
use updaemon::timer::{parse_interval, TimerManager};

enum TimerAction {
    Status,
    Disable,
    Set(Duration),
}

impl TimerAction {
    /// `-` disables the timer (`disable` works too); anything else must
    /// parse as an interval.
    fn parse(interval: Option<&str>) -> anyhow::Result<Self> {
        match interval {
            None => Ok(Self::Status),
            Some("-") | Some("disable") => Ok(Self::Disable),
            Some(raw) => match parse_interval(raw) {
                Some(duration) => Ok(Self::Set(duration)),
                None => bail!("invalid interval '{raw}'; use forms like 30s, 5m or 2h"),
            },
        }
    }
}

/// `updaemon timer` shows the state, `updaemon timer <interval>` sets
/// it, `updaemon timer -` removes it.
pub(crate) async fn cmd_timer(interval: Option<&str>) -> anyhow::Result<()> {
    let timer = TimerManager::new();

    match TimerAction::parse(interval)? {
        TimerAction::Status => {
            if timer.is_enabled().await {
                match timer.current_interval() {
                    Some(on_calendar) => {
                        println!("Update timer enabled (OnCalendar={on_calendar}).")
                    }
                    None => println!("Update timer enabled."),
                }
            } else {
                println!("Update timer disabled.");
            }
        }
        TimerAction::Disable => {
            timer.disable().await?;
            println!("Update timer disabled.");
        }
        TimerAction::Set(duration) => {
            timer.set(duration).await?;
            println!("Update timer set to every {}.", interval.unwrap_or_default());
        }
    }
    Ok(())
}
