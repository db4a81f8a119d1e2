use super::{json_pretty, EXIT_SUCCESS};
use console::Style;
use pkgmanager_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let status = engine.status().map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&status)?);
        return Ok(EXIT_SUCCESS);
    }

    let missing = |exists: bool| if exists { "" } else { " (missing)" };
    println!(
        "manifest: {}{}",
        status.manifest_path.display(),
        missing(status.manifest_exists)
    );
    println!(
        "lock:     {}{}",
        status.lock_path.display(),
        missing(status.lock_exists)
    );
    println!("platform: {}", status.platform);
    println!("shell:    {}", status.shell);
    println!();
    println!("{:<8} {:<12} {:<10} ENTRIES", "TYPE", "TOOL", "AVAILABLE");
    for m in &status.managers {
        let available = if m.available {
            Style::new().green().apply_to("yes")
        } else {
            Style::new().dim().apply_to("no")
        };
        println!("{:<8} {:<12} {:<10} {}", m.manager, m.tool, available, m.entries);
    }
    Ok(EXIT_SUCCESS)
}
