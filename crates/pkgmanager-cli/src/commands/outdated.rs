use super::{json_pretty, warn_unreadable, EXIT_FAILURE, EXIT_SUCCESS};
use pkgmanager_core::Engine;
use pkgmanager_schema::ManagerType;

pub fn run(engine: &Engine, types: &[ManagerType], json: bool) -> Result<u8, String> {
    let report = engine.outdated(types);
    if json {
        println!("{}", json_pretty(&report)?);
    } else if report.item_count() == 0 {
        println!("everything is up to date");
    } else {
        println!("{:<8} {:<40} {:<16} LATEST", "MANAGER", "NAME", "CURRENT");
        for found in &report.results {
            for pkg in &found.items {
                println!(
                    "{:<8} {:<40} {:<16} {}",
                    found.manager, pkg.name, pkg.current_version, pkg.latest_version
                );
            }
        }
    }
    if !json {
        warn_unreadable(&report.failures);
    }
    Ok(if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
