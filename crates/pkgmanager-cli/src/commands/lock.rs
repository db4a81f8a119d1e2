use super::{json_pretty, EXIT_SUCCESS};
use pkgmanager_core::Engine;
use pkgmanager_schema::ManagerType;

pub fn run(engine: &Engine, types: &[ManagerType], json: bool) -> Result<u8, String> {
    let lock = engine.lock(types).map_err(|e| e.to_string())?;
    if json {
        let payload = serde_json::json!({
            "lock_path": engine.config().lock_path,
            "packages": lock.len(),
            "pins": lock,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "locked {} packages in {}",
            lock.len(),
            engine.config().lock_path.display()
        );
    }
    Ok(EXIT_SUCCESS)
}
