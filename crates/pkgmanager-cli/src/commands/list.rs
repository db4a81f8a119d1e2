use super::{json_pretty, tracked_marker, warn_unreadable, EXIT_FAILURE, EXIT_SUCCESS};
use pkgmanager_core::Engine;
use pkgmanager_schema::ManagerType;

pub fn run(engine: &Engine, types: &[ManagerType], json: bool) -> Result<u8, String> {
    let report = engine.list(types).map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&report)?);
    } else if report.item_count() == 0 {
        println!("no installed packages found");
    } else {
        println!("{:<8} {:<40} {:<16} STATE", "MANAGER", "NAME", "VERSION");
        for listing in &report.results {
            for pkg in &listing.items {
                let name = match &pkg.display_name {
                    Some(display) => format!("{} ({display})", pkg.name),
                    None => pkg.name.clone(),
                };
                println!(
                    "{:<8} {:<40} {:<16} {}",
                    listing.manager,
                    name,
                    pkg.version,
                    tracked_marker(pkg.tracked)
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
