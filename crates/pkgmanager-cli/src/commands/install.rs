use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use pkgmanager_core::Engine;
use pkgmanager_schema::ManagerType;

pub fn run(
    engine: &Engine,
    manager: ManagerType,
    name: &str,
    dry_run: bool,
    json: bool,
) -> Result<u8, String> {
    let pb = (!json && !dry_run).then(|| spinner(&format!("installing {name} with {manager}...")));
    let report = match engine.install(manager, name, dry_run) {
        Ok(report) => report,
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, &format!("{manager}: {name} failed"));
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else if dry_run {
        println!("would install {name} with {manager}");
    } else {
        if let Some(pb) = &pb {
            spin_ok(pb, &format!("{manager}: installed {name}"));
        }
        if report.manifest_updated {
            println!("added {name} to {}", engine.config().manifest_path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
