//! `optsync` command-line front end

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use optsync_core::SyncConfig;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::SyncArgs;

fn cli() -> Command {
    let store = Arg::new("store")
        .long("store")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Directory holding one JSON file per record");
    let shapes = Arg::new("shapes")
        .required(true)
        .num_args(1..)
        .value_parser(value_parser!(PathBuf))
        .help("Shape files (.yaml, .yml, .json or .toml)");

    Command::new("optsync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Keep persisted settings records in their desired shape")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Synchronizer settings (TOML)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More logging (-v info, -vv debug, -vvv trace); RUST_LOG overrides"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("ensure")
                .about("Reconcile records and write back those that diverge")
                .arg(store.clone())
                .arg(shapes.clone())
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Report changes without writing"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Exit with status 1 if any record would change or conflicts")
                .arg(store.clone())
                .arg(shapes),
        )
        .subcommand(
            Command::new("show")
                .about("Print a record as JSON")
                .arg(store.clone())
                .arg(Arg::new("key").required(true).help("Record key")),
        )
        .subcommand(
            Command::new("list")
                .about("List record keys")
                .arg(store),
        )
}

fn init_tracing(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn sync_args(matches: &ArgMatches, config: SyncConfig) -> SyncArgs {
    SyncArgs {
        store: matches.get_one::<PathBuf>("store").cloned().unwrap_or_default(),
        shapes: matches
            .get_many::<PathBuf>("shapes")
            .map(|paths| paths.cloned().collect())
            .unwrap_or_default(),
        config,
    }
}

async fn run(matches: ArgMatches) -> Result<ExitCode> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SyncConfig::from_file(path)?,
        None => SyncConfig::default(),
    };

    match matches.subcommand() {
        Some(("ensure", args)) => {
            let dry_run = args.get_flag("dry-run") || config.dry_run;
            let report = commands::sync(&sync_args(args, config.with_dry_run(dry_run))).await?;
            commands::print_report(&mut io::stdout().lock(), &report)?;
            Ok(exit_code(commands::has_errors(&report)))
        }
        Some(("check", args)) => {
            let report = commands::sync(&sync_args(args, config.with_dry_run(true))).await?;
            commands::print_report(&mut io::stdout().lock(), &report)?;
            Ok(exit_code(commands::needs_attention(&report)))
        }
        Some(("show", args)) => {
            let store = args.get_one::<PathBuf>("store").cloned().unwrap_or_default();
            let key = args.get_one::<String>("key").map_or("", String::as_str);
            println!("{}", commands::show(&store, key).await?);
            Ok(ExitCode::SUCCESS)
        }
        Some(("list", args)) => {
            let store = args.get_one::<PathBuf>("store").cloned().unwrap_or_default();
            for key in commands::list(&store).await? {
                println!("{key}");
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::from(2)),
    }
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"), matches.get_flag("json-logs"));

    match run(matches).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
