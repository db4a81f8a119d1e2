use super::{json_pretty, tracked_marker, EXIT_FAILURE, EXIT_SUCCESS};
use pkgmanager_core::Engine;
use pkgmanager_schema::ManagerType;

pub fn run(
    engine: &Engine,
    name: &str,
    manager: Option<ManagerType>,
    json: bool,
) -> Result<u8, String> {
    let Some(report) = engine.show(name, manager).map_err(|e| e.to_string())? else {
        if json {
            println!("null");
        } else {
            eprintln!("{name} is not installed");
        }
        return Ok(EXIT_FAILURE);
    };
    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }

    let d = &report.details;
    println!("{} {} [{}, {}]", d.name, d.version, report.manager, tracked_marker(report.tracked));
    let fields = [
        ("summary", d.summary.as_str()),
        ("homepage", d.homepage.as_str()),
        ("license", d.license.as_str()),
        ("location", d.location.as_str()),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            println!("  {label:<9} {value}");
        }
    }
    if !d.requires.is_empty() {
        println!("  {:<9} {}", "requires", d.requires.join(", "));
    }
    if !d.binaries.is_empty() {
        println!("  {:<9} {}", "binaries", d.binaries.join(", "));
    }
    Ok(EXIT_SUCCESS)
}
