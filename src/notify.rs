use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{IsTerminal, Write};
use thiserror::Error;

/// Notification permission as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not decided yet; asking will prompt the user
    #[serde(alias = "prompt")]
    Default,
    Granted,
    Denied,
    /// The platform cannot show notifications at all
    Unsupported,
}

/// A transient user-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    /// Alerts sharing a tag replace each other
    pub tag: String,
    pub icon: Option<String>,
    pub require_interaction: bool,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification permission is {0:?}")]
    NotPermitted(Permission),
    #[error("Failed to display notification: {0}")]
    Display(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Platform notification primitive used by the scheduler.
///
/// Hosts with a clickable notification surface forward each click to
/// [`ReminderScheduler::on_alert_clicked`](crate::scheduler::ReminderScheduler::on_alert_clicked)
/// with the alert's tag; the scheduler then calls [`Notifier::focus_app`] and
/// [`Notifier::dismiss`]. The terminal host has no click source.
pub trait Notifier {
    fn permission(&self) -> Permission;

    /// Ask the user for permission. Only called while permission is `Default`.
    fn prompt_permission(&mut self) -> Permission;

    fn show(&mut self, alert: &Alert) -> Result<(), NotifyError>;

    fn dismiss(&mut self, tag: &str);

    /// Bring the application to the foreground
    fn focus_app(&mut self);
}

/// Prints alerts to the terminal, optionally ringing the bell.
///
/// Alerts stay "visible" until dismissed; the notifier only tracks which tags
/// are on screen so a replaced or dismissed alert can be reported.
pub struct TerminalNotifier {
    permission: Permission,
    bell: bool,
    visible: Vec<String>,
}

impl TerminalNotifier {
    pub fn new(permission: Permission, bell: bool) -> Self {
        // Prompting needs someone at the keyboard
        let permission = if permission == Permission::Default && !std::io::stdin().is_terminal() {
            warn!("stdin is not a terminal, notification prompt unavailable");
            Permission::Denied
        } else {
            permission
        };
        Self {
            permission,
            bell,
            visible: Vec::new(),
        }
    }

    pub fn visible_tags(&self) -> &[String] {
        &self.visible
    }
}

impl Notifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn prompt_permission(&mut self) -> Permission {
        let answer = dialoguer::Confirm::new()
            .with_prompt("Izinkan IngetinAja menampilkan notifikasi?")
            .default(true)
            .interact();
        self.permission = match answer {
            Ok(true) => Permission::Granted,
            Ok(false) => Permission::Denied,
            Err(e) => {
                warn!("Notification prompt failed: {}", e);
                Permission::Denied
            }
        };
        self.permission
    }

    fn show(&mut self, alert: &Alert) -> Result<(), NotifyError> {
        if self.permission != Permission::Granted {
            return Err(NotifyError::NotPermitted(self.permission));
        }

        let replaced = self.visible.iter().any(|t| t == &alert.tag);
        if replaced {
            debug!("Replacing visible alert {}", alert.tag);
        } else {
            self.visible.push(alert.tag.clone());
        }

        let mut out = std::io::stdout().lock();
        if self.bell {
            write!(out, "\x07")?;
        }
        writeln!(out, "🔔 {}", alert.title)?;
        for line in alert.body.lines() {
            writeln!(out, "   {}", line)?;
        }
        out.flush()?;
        Ok(())
    }

    fn dismiss(&mut self, tag: &str) {
        if let Some(pos) = self.visible.iter().position(|t| t == tag) {
            self.visible.remove(pos);
            debug!("Alert {} dismissed", tag);
        }
    }

    fn focus_app(&mut self) {
        info!("Focus requested from notification");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Notifier that records every call and can be told to fail
    #[derive(Debug)]
    pub struct RecordingNotifier {
        pub permission: Permission,
        pub prompt_answer: Permission,
        pub prompts: usize,
        pub shown: Vec<Alert>,
        pub dismissed: Vec<String>,
        pub focused: usize,
        pub fail_display: bool,
    }

    impl RecordingNotifier {
        pub fn with_permission(permission: Permission) -> Self {
            Self {
                permission,
                prompt_answer: Permission::Granted,
                prompts: 0,
                shown: Vec::new(),
                dismissed: Vec::new(),
                focused: 0,
                fail_display: false,
            }
        }

        pub fn granted() -> Self {
            Self::with_permission(Permission::Granted)
        }
    }

    impl Notifier for RecordingNotifier {
        fn permission(&self) -> Permission {
            self.permission
        }

        fn prompt_permission(&mut self) -> Permission {
            self.prompts += 1;
            self.permission = self.prompt_answer;
            self.permission
        }

        fn show(&mut self, alert: &Alert) -> Result<(), NotifyError> {
            if self.fail_display {
                return Err(NotifyError::Display("platform rejected alert".to_string()));
            }
            self.shown.push(alert.clone());
            Ok(())
        }

        fn dismiss(&mut self, tag: &str) {
            self.dismissed.push(tag.to_string());
        }

        fn focus_app(&mut self) {
            self.focused += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(tag: &str) -> Alert {
        Alert {
            title: "1 jam lagi: Rapat".to_string(),
            body: "Deadline: Rapat".to_string(),
            tag: tag.to_string(),
            icon: None,
            require_interaction: true,
        }
    }

    #[test]
    fn test_terminal_notifier_refuses_without_permission() {
        let mut notifier = TerminalNotifier::new(Permission::Denied, false);
        assert!(matches!(
            notifier.show(&alert("note-1")),
            Err(NotifyError::NotPermitted(Permission::Denied))
        ));
        assert!(notifier.visible_tags().is_empty());
    }

    #[test]
    fn test_terminal_notifier_replaces_same_tag() {
        let mut notifier = TerminalNotifier::new(Permission::Granted, false);
        notifier.show(&alert("note-1")).expect("shown");
        notifier.show(&alert("note-1")).expect("shown");
        notifier.show(&alert("note-2")).expect("shown");
        assert_eq!(notifier.visible_tags(), ["note-1", "note-2"]);

        notifier.dismiss("note-1");
        assert_eq!(notifier.visible_tags(), ["note-2"]);
    }

    #[test]
    fn test_permission_config_names() {
        #[derive(Deserialize)]
        struct Wrap {
            permission: Permission,
        }
        let w: Wrap = toml::from_str(r#"permission = "prompt""#).expect("valid toml");
        assert_eq!(w.permission, Permission::Default);
        let w: Wrap = toml::from_str(r#"permission = "denied""#).expect("valid toml");
        assert_eq!(w.permission, Permission::Denied);
    }
}
