use super::{json_pretty, print_results, EXIT_FAILURE, EXIT_SUCCESS};
use dialoguer::Confirm;
use pkgmanager_core::Engine;
use pkgmanager_schema::ManagerType;
use std::io::{stderr, stdin, IsTerminal};

pub fn run(
    engine: &Engine,
    types: &[ManagerType],
    dry_run: bool,
    yes: bool,
    json: bool,
) -> Result<u8, String> {
    let plan = engine.plan_clean(types).map_err(|e| e.to_string())?;
    if plan.is_empty() {
        if json {
            println!("{}", json_pretty(&engine.execute(plan, true, true))?);
        } else {
            println!("nothing to clean: no untracked packages");
        }
        return Ok(EXIT_SUCCESS);
    }

    if !json {
        println!("untracked packages:");
        for action in &plan {
            println!("  {} {}", action.manager, action.name);
        }
    }

    let proceed = if dry_run || yes {
        true
    } else if stdin().is_terminal() && stderr().is_terminal() {
        Confirm::new()
            .with_prompt(format!("remove {} packages?", plan.len()))
            .default(false)
            .interact()
            .map_err(|e| format!("prompt failed: {e}"))?
    } else {
        return Err("refusing to remove packages without confirmation (pass --yes)".to_owned());
    };
    if !proceed {
        println!("aborted");
        return Ok(EXIT_SUCCESS);
    }

    let report = engine.execute(plan, dry_run, true);
    if json {
        println!("{}", json_pretty(&report)?);
    } else if !dry_run {
        print_results(&report.results);
        println!("clean: {} removed, {} failed", report.succeeded(), report.failed());
    }
    Ok(if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
