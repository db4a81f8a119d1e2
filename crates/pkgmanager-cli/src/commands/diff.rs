use super::{json_pretty, warn_unreadable, EXIT_FAILURE, EXIT_SUCCESS};
use console::Style;
use pkgmanager_core::Engine;
use pkgmanager_schema::ManagerType;

/// Exit 0 when clean, 1 when anything differs.
pub fn run(engine: &Engine, types: &[ManagerType], json: bool) -> Result<u8, String> {
    let diff = engine.diff(types).map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&diff)?);
    } else if diff.is_clean() && diff.unreadable.is_empty() {
        println!("no differences");
    } else {
        let add = Style::new().green();
        let extra = Style::new().yellow();
        let drift = Style::new().red();
        for manager in diff.managers.iter().filter(|d| !d.is_clean()) {
            println!("{}:", Style::new().bold().apply_to(manager.manager));
            for name in &manager.missing {
                println!("  {} {name}", add.apply_to("+"));
            }
            for pkg in &manager.untracked {
                println!("  {} {} {}", extra.apply_to("?"), pkg.name, pkg.version);
            }
            for m in &manager.mismatched {
                println!(
                    "  {} {} {} (locked {})",
                    drift.apply_to("~"),
                    m.name,
                    m.installed,
                    m.pinned
                );
            }
        }
        println!(
            "{} missing, {} untracked, {} off-lock",
            diff.missing_count(),
            diff.untracked_count(),
            diff.mismatched_count()
        );
        warn_unreadable(&diff.unreadable);
    }
    Ok(if diff.is_clean() && diff.unreadable.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
