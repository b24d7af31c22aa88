use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use flatland_asset::{AssetPath, StoreConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod inspect;

use inspect::Inspector;

fn cli() -> Command {
    Command::new("flatland-inspect")
        .version(flatland_asset::VERSION)
        .about("Inspect a directory of flatland asset envelopes")
        .subcommand_required(true)
        .arg(
            Arg::new("root")
                .long("root")
                .short('r')
                .global(true)
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Content directory to inspect"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Store configuration file (TOML)"),
        )
        .arg(
            Arg::new("extension")
                .long("extension")
                .global(true)
                .help("Asset file extension, overriding the configuration"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
        .subcommand(
            Command::new("list")
                .about("List envelopes with their type and parent")
                .arg(
                    Arg::new("type")
                        .long("type")
                        .short('t')
                        .help("Only envelopes of this type, by full path or last segment"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print one envelope")
                .arg(Arg::new("path").required(true).help("Asset path relative to the root")),
        )
        .subcommand(
            Command::new("chain")
                .about("Print an asset's parent chain, nearest first")
                .arg(Arg::new("path").required(true).help("Asset path relative to the root")),
        )
        .subcommand(Command::new("validate").about("Check every envelope and parent chain"))
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<StoreConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            StoreConfig::from_toml(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => StoreConfig::default(),
    };
    if let Some(extension) = matches.get_one::<String>("extension") {
        config = config.with_default_extension(Some(extension.as_str()));
    }
    Ok(config)
}

fn path_arg(matches: &ArgMatches) -> AssetPath {
    matches
        .get_one::<String>("path")
        .map(|path| AssetPath::new(path.as_str()))
        .unwrap_or_default()
}

fn run(matches: &ArgMatches) -> Result<ExitCode> {
    let root = matches
        .get_one::<PathBuf>("root")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let inspector = Inspector::new(root, load_config(matches)?);

    match matches.subcommand() {
        Some(("list", args)) => {
            let type_filter = args.get_one::<String>("type").map(String::as_str);
            for entry in inspector.list(type_filter)? {
                println!("{entry}");
            }
        }
        Some(("show", args)) => {
            let envelope = inspector.envelope(&path_arg(args))?;
            let text = envelope.encode(true)?;
            println!("{}", String::from_utf8_lossy(&text));
        }
        Some(("chain", args)) => {
            for entry in inspector.chain(&path_arg(args))? {
                println!("{entry}");
            }
        }
        Some(("validate", _)) => {
            let problems = inspector.validate()?;
            for problem in &problems {
                println!("{}: {}", problem.path, problem.message);
            }
            if !problems.is_empty() {
                tracing::warn!(count = problems.len(), "validation failed");
                return Ok(ExitCode::FAILURE);
            }
            tracing::info!("all envelopes valid");
        }
        other => anyhow::bail!("unknown command: {other:?}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));
    match run(&matches) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
