//! `formsync` command line: render resources and check YAML files

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use formsync_core::{SyncConfig, SyncSession};
use formsync_document::map;
use formsync_validation::{SchemaSet, Severity};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let config = Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("TOML session config");
    let secrets = Arg::new("secret")
        .long("secret")
        .action(ArgAction::Append)
        .help("Secret path pattern, e.g. Secret.*.data.*");

    Command::new("formsync")
        .version(formsync_core::VERSION)
        .about("Render and check YAML resources the way the form editor does")
        .subcommand_required(true)
        .subcommand(
            Command::new("render")
                .about("Print resources as canonical YAML")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Resources as JSON (object or array) or YAML"),
                )
                .arg(secrets.clone())
                .arg(config.clone()),
        )
        .subcommand(
            Command::new("check")
                .about("Report syntax and schema errors of a YAML file")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("YAML file"),
                )
                .arg(
                    Arg::new("schema")
                        .long("schema")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON schema, or list of {type, required, schema} entries"),
                )
                .arg(secrets)
                .arg(config),
        )
}

fn load_config(args: &ArgMatches) -> anyhow::Result<SyncConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => SyncConfig::load(path).context("loading config"),
        None => Ok(SyncConfig::default()),
    }
}

fn secrets(args: &ArgMatches) -> Vec<String> {
    args.get_many::<String>("secret")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load_resources(path: &Path) -> anyhow::Result<Vec<Value>> {
    let text = read(path)?;
    if path.extension().is_some_and(|ext| ext == "json") {
        let value: Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        return Ok(match value {
            Value::Array(items) => items,
            single => vec![single],
        });
    }
    let mapped = map(&text);
    if let Some(first) = mapped.syntax_errors.first() {
        bail!("{}:{}: {}", path.display(), first.position.start.line, first.message);
    }
    Ok(mapped.snapshot.resources)
}

fn render(args: &ArgMatches) -> anyhow::Result<()> {
    let Some(input) = args.get_one::<PathBuf>("input") else {
        bail!("missing input");
    };
    let resources = load_resources(input)?;
    let mut session = SyncSession::builder()
        .with_secrets(secrets(args))
        .with_config(load_config(args)?)
        .build();
    let outcome = session.apply_form_update(&resources).context("rendering resources")?;
    print!("{}", outcome.yaml);
    Ok(())
}

fn check(args: &ArgMatches) -> anyhow::Result<()> {
    let Some(input) = args.get_one::<PathBuf>("input") else {
        bail!("missing input");
    };
    let text = read(input)?;
    let mut builder = SyncSession::builder()
        .with_secrets(secrets(args))
        .with_config(load_config(args)?);
    if let Some(path) = args.get_one::<PathBuf>("schema") {
        let schema: Value =
            serde_json::from_str(&read(path)?).with_context(|| format!("parsing {}", path.display()))?;
        SchemaSet::compile(&schema).with_context(|| format!("compiling {}", path.display()))?;
        builder = builder.with_schema(schema);
    }
    let mut session = builder.build();
    let outcome = session.apply_user_edit(&text);

    for error in &outcome.syntax_errors {
        println!(
            "{}:{}:{}: syntax error: {}",
            input.display(),
            error.position.start.line,
            error.position.start.col,
            error.message
        );
    }
    for error in &outcome.errors {
        println!(
            "{}:{}:{}: {}: {}",
            input.display(),
            error.position.start.line,
            error.position.start.col,
            error.severity,
            error.message
        );
    }

    let blocking = outcome.syntax_errors.len()
        + outcome
            .errors
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .count();
    if blocking > 0 {
        bail!("{blocking} blocking error(s) in {}", input.display());
    }
    println!("{}: ok", input.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("render", args)) => render(args),
        Some(("check", args)) => check(args),
        _ => bail!("unknown command"),
    }
}
