use super::{json_pretty, print_results, spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS};
use pkgmanager_core::{Engine, SyncOptions, SyncReport};

pub fn run(engine: &Engine, options: &SyncOptions, json: bool) -> Result<u8, String> {
    let pb = (!json).then(|| spinner("checking installed packages..."));
    let report = match engine.sync(options) {
        Ok(report) => report,
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, "sync failed");
            }
            return Err(e.to_string());
        }
    };
    if let Some(pb) = &pb {
        if report.is_success() {
            spin_ok(pb, "sync finished");
        } else {
            spin_fail(pb, "sync finished with errors");
        }
    }

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

fn print_report(report: &SyncReport) {
    for (manager, error) in &report.unreadable {
        eprintln!("warning: could not list {manager} packages: {error}");
    }
    if report.results.is_empty() {
        println!("nothing to do: installed packages match the manifest");
        return;
    }
    print_results(&report.results);
    if report.dry_run {
        println!("dry run: {} actions planned", report.results.len());
    } else {
        println!(
            "sync: {} succeeded, {} failed, {} skipped, {} cancelled",
            report.succeeded(),
            report.failed(),
            report.skipped(),
            report.cancelled()
        );
    }
}
