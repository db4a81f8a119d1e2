use super::EXIT_SUCCESS;
use pkgmanager_core::Engine;
use pkgmanager_schema::ManagerType;
use std::path::Path;

/// The exported document is YAML even with `--json`, so it can be used as a manifest directly.
pub fn run(
    engine: &Engine,
    types: &[ManagerType],
    output: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let manifest = engine.export(types);
    match output {
        Some(path) => {
            manifest.write_to_file(path).map_err(|e| e.to_string())?;
            if json {
                println!("{}", serde_json::json!({ "written": path }));
            } else {
                eprintln!("exported to {}", path.display());
            }
        }
        None => {
            let yaml = manifest.to_yaml_string().map_err(|e| e.to_string())?;
            print!("{yaml}");
        }
    }
    Ok(EXIT_SUCCESS)
}
