//! Runtime settings.
//!
//! Settings are reactive signals held per thread, like every other piece of
//! engine state. Code that wants to follow a setting can read its signal
//! inside an effect.

use spark_signals::signal;
use std::cell::RefCell;

/// Environment variable read by [`load_from_env`].
pub const DEV_MODE_ENV: &str = "SPARK_VIEW_DEV_MODE";

// =============================================================================
// Dev Mode
// =============================================================================

thread_local! {
    static DEV_MODE: RefCell<spark_signals::Signal<bool>> = RefCell::new(signal(false));
}

/// Whether `detect_changes` is followed by a check-no-changes pass.
pub fn dev_mode() -> bool {
    DEV_MODE.with(|m| m.borrow().get())
}

pub fn set_dev_mode(enabled: bool) {
    DEV_MODE.with(|m| m.borrow().set(enabled));
}

/// Get the dev mode signal for reactive tracking.
pub fn dev_mode_signal() -> spark_signals::Signal<bool> {
    DEV_MODE.with(|m| m.borrow().clone())
}

// =============================================================================
// Environment
// =============================================================================

/// Apply `SPARK_VIEW_DEV_MODE` if it is set. Returns the resulting dev mode.
///
/// Accepts `1/true/yes/on` and `0/false/no/off`; anything else is ignored
/// with a warning.
pub fn load_from_env() -> bool {
    if let Ok(raw) = std::env::var(DEV_MODE_ENV) {
        match parse_flag(&raw) {
            Some(enabled) => {
                log::debug!("{DEV_MODE_ENV}={raw}: dev mode {enabled}");
                set_dev_mode(enabled);
            }
            None => log::warn!("ignoring {DEV_MODE_ENV}={raw:?}: expected a boolean"),
        }
    }
    dev_mode()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_mode() {
        set_dev_mode(true);
        assert!(dev_mode());
        assert!(dev_mode_signal().get());

        set_dev_mode(false);
        assert!(!dev_mode());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
