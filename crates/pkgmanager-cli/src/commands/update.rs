use super::{colorize_status, json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use pkgmanager_core::{ActionStatus, Engine};
use pkgmanager_schema::ManagerType;

pub fn run(
    engine: &Engine,
    name: Option<&str>,
    manager: Option<ManagerType>,
    dry_run: bool,
    json: bool,
) -> Result<u8, String> {
    let report = engine
        .update(name, manager, dry_run)
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&report)?);
    } else if report.entries.is_empty() {
        println!("nothing to update");
    } else {
        for entry in &report.entries {
            let target = entry.name.as_deref().unwrap_or("all packages");
            println!(
                "{:<10} {} update {target}",
                colorize_status(&entry.status),
                entry.manager
            );
            if let ActionStatus::Failed { error } = &entry.status {
                println!("           {error}");
            }
        }
    }
    Ok(if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
