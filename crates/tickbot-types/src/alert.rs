//! Persistent operator alerts.
//!
//! An [`Alert`] is set every tick from some condition; only the edges are
//! logged, so a camera that stays unplugged produces one warning rather than
//! one per tick.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Alert {
    text: String,
    level: AlertLevel,
    active: bool,
}

impl Alert {
    pub fn new(text: impl Into<String>, level: AlertLevel) -> Self {
        Self {
            text: text.into(),
            level,
            active: false,
        }
    }

    /// Update the alert's condition.  Returns `true` when this call changed
    /// the active flag.
    pub fn set(&mut self, active: bool) -> bool {
        if active == self.active {
            return false;
        }
        self.active = active;
        if active {
            match self.level {
                AlertLevel::Info => info!(alert = %self.text, "alert raised"),
                AlertLevel::Warning => warn!(alert = %self.text, "alert raised"),
                AlertLevel::Error => error!(alert = %self.text, "alert raised"),
            }
        } else {
            info!(alert = %self.text, "alert cleared");
        }
        true
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_starts_inactive() {
        let alert = Alert::new("Vision camera 0 is disconnected.", AlertLevel::Warning);
        assert!(!alert.is_active());
        assert_eq!(alert.level(), AlertLevel::Warning);
    }

    #[test]
    fn set_reports_edges_only() {
        let mut alert = Alert::new("x", AlertLevel::Error);
        assert!(alert.set(true));
        assert!(!alert.set(true));
        assert!(alert.is_active());
        assert!(alert.set(false));
        assert!(!alert.set(false));
        assert!(!alert.is_active());
    }
}
