pub mod clean;
pub mod diff;
pub mod export;
pub mod install;
pub mod list;
pub mod lock;
pub mod outdated;
pub mod remove;
pub mod search;
pub mod show;
pub mod status;
pub mod sync;
pub mod update;

use indicatif::{ProgressBar, ProgressStyle};
use pkgmanager_core::{ActionResult, ActionStatus, UnreadableManager};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// Message prefixes of errors caused by unusable input files or settings.
const CONFIG_ERROR_PREFIXES: &[&str] = &[
    "manifest error:",
    "lock error:",
    "custom package specs:",
    "invalid configuration:",
    "unknown manager type:",
];

pub fn is_configuration_error(msg: &str) -> bool {
    CONFIG_ERROR_PREFIXES.iter().any(|p| msg.starts_with(p))
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn colorize_status(status: &ActionStatus) -> String {
    use console::Style;
    match status {
        ActionStatus::Planned => Style::new().cyan().apply_to("planned").to_string(),
        ActionStatus::Succeeded { .. } => Style::new().green().apply_to("ok").to_string(),
        ActionStatus::Failed { .. } => Style::new().red().bold().apply_to("failed").to_string(),
        ActionStatus::Skipped => Style::new().yellow().apply_to("skipped").to_string(),
        ActionStatus::Cancelled => Style::new().dim().apply_to("cancelled").to_string(),
    }
}

pub fn tracked_marker(tracked: bool) -> String {
    use console::Style;
    if tracked {
        Style::new().green().apply_to("tracked").to_string()
    } else {
        Style::new().yellow().apply_to("untracked").to_string()
    }
}

/// One line per action, with the error underneath failures.
pub fn print_results(results: &[ActionResult]) {
    for result in results {
        println!("{:<10} {}", colorize_status(&result.status), result.action);
        if let ActionStatus::Failed { error } = &result.status {
            println!("           {error}");
        }
    }
}

pub fn warn_unreadable(unreadable: &[UnreadableManager]) {
    for u in unreadable {
        eprintln!("warning: could not list {} packages: {}", u.manager, u.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgmanager_core::CoreError;
    use pkgmanager_schema::{ManagerType, ManifestError};

    #[test]
    fn json_pretty_serializes_string() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn configuration_errors_are_recognized() {
        let errors = [
            CoreError::from(ManifestError::NotAMapping),
            CoreError::Config("bad timeout".to_owned()),
            CoreError::UnknownManagerType("apt".to_owned()),
        ];
        for e in errors {
            assert!(e.is_configuration());
            assert!(is_configuration_error(&e.to_string()), "{e}");
        }
        let runtime = CoreError::PackageNotFound("jq".to_owned());
        assert!(!is_configuration_error(&runtime.to_string()));
        let aborted = CoreError::Aborted {
            manager: ManagerType::Conda,
            reason: "boom".to_owned(),
        };
        assert!(!is_configuration_error(&aborted.to_string()));
    }

    #[test]
    fn colorize_status_keeps_label() {
        assert!(colorize_status(&ActionStatus::Skipped).contains("skipped"));
        assert!(colorize_status(&ActionStatus::Failed {
            error: "x".to_owned()
        })
        .contains("failed"));
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_CONFIG_ERROR);
    }

    #[test]
    fn spinner_creates_progress_bar() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}
