mod config;
mod sync;

use std::path::PathBuf;

use anyhow::Context;
use depot_core::StoreClient;

use crate::sync::cache::CacheStore;
use crate::sync::engine::{SyncEngine, SyncEvent};
use crate::sync::fs::LocalDir;

const DEFAULT_NAMESPACE: &str = "global";

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    List(Targets),
    Fetch(Targets),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Targets {
    directory: PathBuf,
    namespaces: Vec<String>,
}

fn parse_cli<I>(args: I) -> anyhow::Result<CliCommand>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().skip(1);
    let Some(command) = args.next() else {
        return Ok(CliCommand::Help);
    };
    if matches!(command.as_str(), "--help" | "-h" | "help") {
        return Ok(CliCommand::Help);
    }

    let mut directory = PathBuf::from(".");
    let mut namespaces = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--directory" | "-d" => {
                directory = PathBuf::from(args.next().context("--directory requires a value")?);
            }
            "--namespace" | "-n" => {
                let value = args.next().context("--namespace requires a value")?;
                namespaces.extend(split_namespaces(&value));
            }
            "--help" | "-h" => return Ok(CliCommand::Help),
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    if namespaces.is_empty() {
        namespaces.push(DEFAULT_NAMESPACE.to_string());
    }

    let targets = Targets {
        directory,
        namespaces,
    };
    match command.as_str() {
        "list" => Ok(CliCommand::List(targets)),
        "fetch" => Ok(CliCommand::Fetch(targets)),
        other => anyhow::bail!("unknown command: {other}"),
    }
}

fn split_namespaces(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn print_usage() {
    println!("Usage: depot <list|fetch> [options]");
    println!("  list    print remote objects per namespace");
    println!("  fetch   synchronize namespaces into the target directory");
    println!();
    println!("Options:");
    println!("  -d, --directory DIR   target directory (default: current directory)");
    println!("  -n, --namespace NS    namespace to process; repeatable, comma-splittable");
    println!("                        (default: {DEFAULT_NAMESPACE})");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    match parse_cli(std::env::args())? {
        CliCommand::Help => {
            print_usage();
            Ok(())
        }
        CliCommand::List(targets) => run_list(&targets).await,
        CliCommand::Fetch(targets) => run_fetch(&targets).await,
    }
}

async fn run_list(targets: &Targets) -> anyhow::Result<()> {
    let store = StoreClient::new(config::load_store_config()?);
    for namespace in &targets.namespaces {
        for entry in store.list(namespace).await? {
            println!("[{}] {} ({})", entry.fingerprint, entry.name, entry.path);
        }
    }
    Ok(())
}

async fn run_fetch(targets: &Targets) -> anyhow::Result<()> {
    let store = StoreClient::new(config::load_store_config()?);
    let cache = CacheStore::load(&targets.directory).await?;
    let target = LocalDir::new(targets.directory.clone());
    let mut engine = SyncEngine::new(store, cache, target);

    for namespace in &targets.namespaces {
        let summary = engine
            .sync_namespace(namespace, &mut |event| print_event(&event))
            .await?;
        eprintln!(
            "[depot] {namespace}: {} fetched, {} skipped, {} removed",
            summary.fetched, summary.skipped, summary.removed
        );
    }
    Ok(())
}

fn print_event(event: &SyncEvent) {
    match event {
        SyncEvent::Listed { namespace, objects } => {
            eprintln!("[depot] {namespace}: {objects} remote objects");
        }
        SyncEvent::Removed { name } => eprintln!("[depot] removed stale file: {name}"),
        SyncEvent::Skipped { name } => eprintln!("[depot] unchanged, skipping: {name}"),
        SyncEvent::Fetched { path, bytes } => eprintln!("[depot] fetched {path} ({bytes} bytes)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        std::iter::once("depot")
            .chain(parts.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn no_arguments_prints_help() {
        assert_eq!(parse_cli(args(&[])).unwrap(), CliCommand::Help);
    }

    #[test]
    fn fetch_defaults_to_global_namespace_and_current_directory() {
        let command = parse_cli(args(&["fetch"])).unwrap();
        assert_eq!(
            command,
            CliCommand::Fetch(Targets {
                directory: PathBuf::from("."),
                namespaces: vec!["global".to_string()],
            })
        );
    }

    #[test]
    fn list_accepts_directory_and_comma_split_namespaces() {
        let command = parse_cli(args(&["list", "-d", "/srv/out", "-n", "global,lobby"])).unwrap();
        assert_eq!(
            command,
            CliCommand::List(Targets {
                directory: PathBuf::from("/srv/out"),
                namespaces: vec!["global".to_string(), "lobby".to_string()],
            })
        );
    }

    #[test]
    fn namespace_flag_is_repeatable() {
        let command = parse_cli(args(&["fetch", "-n", "global", "--namespace", "lobby"])).unwrap();
        let CliCommand::Fetch(targets) = command else {
            panic!("expected fetch");
        };
        assert_eq!(targets.namespaces, vec!["global", "lobby"]);
    }

    #[test]
    fn help_flag_wins_over_subcommand() {
        assert_eq!(
            parse_cli(args(&["fetch", "--help"])).unwrap(),
            CliCommand::Help
        );
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(parse_cli(args(&["push"])).is_err());
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse_cli(args(&["fetch", "--force"])).is_err());
    }

    #[test]
    fn missing_flag_value_is_an_error() {
        assert!(parse_cli(args(&["fetch", "--directory"])).is_err());
    }
}
