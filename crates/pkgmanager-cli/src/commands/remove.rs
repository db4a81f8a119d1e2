use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use pkgmanager_core::Engine;
use pkgmanager_schema::ManagerType;

pub fn run(
    engine: &Engine,
    name: &str,
    manager: Option<ManagerType>,
    keep: bool,
    dry_run: bool,
    json: bool,
) -> Result<u8, String> {
    let pb = (!json && !dry_run).then(|| spinner(&format!("removing {name}...")));
    let report = match engine.remove(name, manager, keep, dry_run) {
        Ok(report) => report,
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, &format!("removing {name} failed"));
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else if dry_run {
        println!("would remove {name} with {}", report.manager);
    } else {
        if let Some(pb) = &pb {
            spin_ok(pb, &format!("{}: removed {name}", report.manager));
        }
        if let Some(section) = &report.manifest_section {
            println!("dropped {name} from the '{section}' section");
        }
    }
    Ok(EXIT_SUCCESS)
}
