//! Desktop reminder fired by the scheduler.

use std::process::Command;

use chrono::Timelike;

use crate::config::Config;
use crate::error::Result;

pub const TITLE: &str = "gitday";

pub fn reminder_text(count: usize) -> Option<String> {
    match count {
        0 => None,
        1 => Some("1 repository has changes to commit or push".to_string()),
        n => Some(format!("{n} repositories have changes to commit or push")),
    }
}

/// Crontab line that runs the reminder at `syncTime` on weekdays.
pub fn cron_line(config: &Config, exe: &str) -> Result<String> {
    let at = config.reminder_time()?;
    Ok(format!("{} {} * * 1-5 {exe} --remind", at.minute(), at.hour()))
}

/// Hand the message to the platform notifier. Returns whether one accepted it.
pub fn send(title: &str, body: &str) -> bool {
    let mut cmd = if cfg!(target_os = "macos") {
        let script = format!(
            "display notification {:?} with title {:?}",
            body, title
        );
        let mut cmd = Command::new("osascript");
        cmd.args(["-e", &script]);
        cmd
    } else {
        let mut cmd = Command::new("notify-send");
        cmd.args([title, body]);
        cmd
    };

    match cmd.output() {
        Ok(out) if out.status.success() => true,
        Ok(out) => {
            tracing::warn!(
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "notification sender failed"
            );
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "no notification sender available");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_text_without_repositories() {
        assert_eq!(reminder_text(0), None);
        assert_eq!(
            reminder_text(1).as_deref(),
            Some("1 repository has changes to commit or push")
        );
        assert!(reminder_text(4).unwrap().starts_with("4 repositories"));
    }

    #[test]
    fn cron_line_uses_sync_time() {
        let mut config = Config::new("/tmp/p", "alice/*");
        config.sync_time = "17:45".to_string();
        assert_eq!(
            cron_line(&config, "/usr/local/bin/gitday").unwrap(),
            "45 17 * * 1-5 /usr/local/bin/gitday --remind"
        );
    }
}
