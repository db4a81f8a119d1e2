use super::{json_pretty, warn_unreadable, EXIT_SUCCESS};
use console::Style;
use pkgmanager_core::Engine;
use pkgmanager_schema::ManagerType;

pub fn run(engine: &Engine, query: &str, types: &[ManagerType], json: bool) -> Result<u8, String> {
    let report = engine.search(query, types);
    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }

    if report.item_count() == 0 {
        println!("no results for '{query}'");
    }
    for found in report.results.iter().filter(|r| !r.items.is_empty()) {
        println!("{}:", Style::new().bold().apply_to(found.manager));
        for hit in &found.items {
            if hit.description.is_empty() {
                println!("  {}", hit.name);
            } else {
                println!("  {:<32} {}", hit.name, Style::new().dim().apply_to(&hit.description));
            }
        }
    }
    if !report.unsupported.is_empty() {
        let names: Vec<String> = report.unsupported.iter().map(ToString::to_string).collect();
        eprintln!("search not supported by: {}", names.join(", "));
    }
    warn_unreadable(&report.failures);
    Ok(EXIT_SUCCESS)
}
