mod commands;

use clap::{Args, Parser, Subcommand};
use commands::{is_configuration_error, EXIT_CONFIG_ERROR, EXIT_FAILURE};
use pkgmanager_core::{install_signal_handler, Config, Engine, SyncOptions};
use pkgmanager_schema::ManagerType;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "pkgmanager",
    version,
    about = "Keep brew, conda, uv, cargo, go, bun, winget and custom packages in line with one manifest"
)]
struct Cli {
    /// Path to the package manifest (default: ~/.config/packages.yaml).
    #[arg(short = 'e', long, global = true)]
    manifest: Option<PathBuf>,

    /// Path to the lock file (default: packages.lock.yaml next to the manifest).
    #[arg(long, global = true)]
    lock: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct TypeFilter {
    /// Only these manager types (comma separated or repeated).
    #[arg(short = 't', long = "type", value_delimiter = ',')]
    types: Vec<ManagerType>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Install everything the manifest declares that is not installed yet.
    #[command(visible_alias = "init")]
    Sync {
        #[command(flatten)]
        filter: TypeFilter,
        /// Show the plan without executing it.
        #[arg(short = 'n', long, default_value_t = false)]
        dry_run: bool,
        /// Reinstall packages that are already present.
        #[arg(short, long, default_value_t = false)]
        force: bool,
        /// Keep going after a failed action.
        #[arg(short, long, default_value_t = false)]
        continue_on_error: bool,
        /// Install the exact versions recorded in the lock file.
        #[arg(long, default_value_t = false)]
        locked: bool,
        /// Number of manager types to process in parallel.
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
    },
    /// Install a package and add it to the manifest.
    Install {
        /// Manager type (brew, cask, mas, winget, conda, python, rust, go, bun, custom).
        manager: ManagerType,
        /// Package name.
        name: String,
        #[arg(short = 'n', long, default_value_t = false)]
        dry_run: bool,
    },
    /// Uninstall a package and drop it from the manifest.
    Remove {
        name: String,
        /// Manager type; detected from the manifest when omitted.
        #[arg(short = 't', long = "type")]
        manager: Option<ManagerType>,
        /// Leave the manifest entry in place.
        #[arg(long, default_value_t = false)]
        keep: bool,
        #[arg(short = 'n', long, default_value_t = false)]
        dry_run: bool,
    },
    /// Update one package, or everything the manifest's managers installed.
    Update {
        name: Option<String>,
        /// Manager type; detected when omitted.
        #[arg(short = 't', long = "type")]
        manager: Option<ManagerType>,
        #[arg(short = 'n', long, default_value_t = false)]
        dry_run: bool,
    },
    /// List installed packages, marking those the manifest tracks.
    List {
        #[command(flatten)]
        filter: TypeFilter,
    },
    /// Record the installed versions of manifest packages in the lock file.
    Lock {
        #[command(flatten)]
        filter: TypeFilter,
    },
    /// Show missing, untracked and off-lock packages.
    Diff {
        #[command(flatten)]
        filter: TypeFilter,
    },
    /// Show paths, platform and which package managers are available.
    Status,
    /// Show details of an installed package.
    Show {
        name: String,
        #[arg(short = 't', long = "type")]
        manager: Option<ManagerType>,
    },
    /// Search the package managers for a query.
    Search {
        query: String,
        #[command(flatten)]
        filter: TypeFilter,
    },
    /// List installed packages with newer versions available.
    Outdated {
        #[command(flatten)]
        filter: TypeFilter,
    },
    /// Remove installed packages the manifest does not declare.
    Clean {
        #[command(flatten)]
        filter: TypeFilter,
        #[arg(short = 'n', long, default_value_t = false)]
        dry_run: bool,
        /// Do not ask for confirmation.
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Write the installed packages as a manifest.
    Export {
        #[command(flatten)]
        filter: TypeFilter,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PKGMANAGER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    install_signal_handler();

    let engine = match Config::from_env(cli.manifest, cli.lock).and_then(Engine::new) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let json = cli.json;

    let result = match cli.command {
        Commands::Sync {
            filter,
            dry_run,
            force,
            continue_on_error,
            locked,
            jobs,
        } => commands::sync::run(
            &engine,
            &SyncOptions {
                dry_run,
                force,
                continue_on_error,
                locked,
                types: filter.types,
                jobs,
            },
            json,
        ),
        Commands::Install {
            manager,
            name,
            dry_run,
        } => commands::install::run(&engine, manager, &name, dry_run, json),
        Commands::Remove {
            name,
            manager,
            keep,
            dry_run,
        } => commands::remove::run(&engine, &name, manager, keep, dry_run, json),
        Commands::Update {
            name,
            manager,
            dry_run,
        } => commands::update::run(&engine, name.as_deref(), manager, dry_run, json),
        Commands::List { filter } => commands::list::run(&engine, &filter.types, json),
        Commands::Lock { filter } => commands::lock::run(&engine, &filter.types, json),
        Commands::Diff { filter } => commands::diff::run(&engine, &filter.types, json),
        Commands::Status => commands::status::run(&engine, json),
        Commands::Show { name, manager } => commands::show::run(&engine, &name, manager, json),
        Commands::Search { query, filter } => {
            commands::search::run(&engine, &query, &filter.types, json)
        }
        Commands::Outdated { filter } => commands::outdated::run(&engine, &filter.types, json),
        Commands::Clean {
            filter,
            dry_run,
            yes,
        } => commands::clean::run(&engine, &filter.types, dry_run, yes, json),
        Commands::Export { filter, output } => {
            commands::export::run(&engine, &filter.types, output.as_deref(), json)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if is_configuration_error(&msg) {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
