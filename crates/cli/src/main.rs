#![forbid(unsafe_code)]

use std::{env, fs, path::PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use hostsmith_core::{
    download::fetch_hosts_text,
    outcome::{apply_outcome, download_outcome, revert_outcome},
    platform::{current_platform_ops, default_hosts_path, PlatformOps},
    EngineConfig, MutationEngine, Outcome,
};

const STAGED_FILE_NAME: &str = "hostsmith_domains.tmp";

#[derive(Debug, Clone)]
enum Command {
    Download { url: String },
    Apply { url: Option<String>, hosts: Option<PathBuf> },
    Revert { hosts: Option<PathBuf> },
    Path,
    Help,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let command = parse_args(env::args().skip(1).collect())?;

    let outcome = match command {
        Command::Download { url } => run_download(&url)?,
        Command::Apply { url, hosts } => run_apply(url.as_deref(), hosts)?,
        Command::Revert { hosts } => run_revert(hosts),
        Command::Path => {
            let ops = current_platform_ops();
            println!("{}", ops.resolve_real_path(&default_hosts_path()).display());
            return Ok(());
        }
        Command::Help => {
            print_help();
            return Ok(());
        }
    };

    println!("{}", outcome.message);
    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Command> {
    if args.is_empty() {
        return Ok(Command::Help);
    }

    let command = args[0].as_str();
    let options = &args[1..];

    match command {
        "download" => parse_download_command(options),
        "apply" => parse_apply_command(options),
        "revert" => parse_revert_command(options),
        "path" => {
            ensure_no_options(options, "path")?;
            Ok(Command::Path)
        }
        "--help" | "-h" | "help" => Ok(Command::Help),
        other => bail!("unknown command: {other}"),
    }
}

fn parse_download_command(options: &[String]) -> Result<Command> {
    let mut url: Option<String> = None;

    let mut i = 0;
    while i < options.len() {
        match options[i].as_str() {
            "--url" => {
                i += 1;
                if i >= options.len() {
                    bail!("missing value for --url");
                }
                url = Some(options[i].clone());
            }
            other => bail!("unknown download option: {other}"),
        }
        i += 1;
    }

    let url = url.ok_or_else(|| anyhow!("download requires --url"))?;
    Ok(Command::Download { url })
}

fn parse_apply_command(options: &[String]) -> Result<Command> {
    let mut url: Option<String> = None;
    let mut hosts: Option<PathBuf> = None;

    let mut i = 0;
    while i < options.len() {
        match options[i].as_str() {
            "--url" => {
                i += 1;
                if i >= options.len() {
                    bail!("missing value for --url");
                }
                url = Some(options[i].clone());
            }
            "--hosts" => {
                i += 1;
                if i >= options.len() {
                    bail!("missing value for --hosts");
                }
                hosts = Some(PathBuf::from(&options[i]));
            }
            other => bail!("unknown apply option: {other}"),
        }
        i += 1;
    }

    Ok(Command::Apply { url, hosts })
}

fn parse_revert_command(options: &[String]) -> Result<Command> {
    let mut hosts: Option<PathBuf> = None;

    let mut i = 0;
    while i < options.len() {
        match options[i].as_str() {
            "--hosts" => {
                i += 1;
                if i >= options.len() {
                    bail!("missing value for --hosts");
                }
                hosts = Some(PathBuf::from(&options[i]));
            }
            other => bail!("unknown revert option: {other}"),
        }
        i += 1;
    }

    Ok(Command::Revert { hosts })
}

fn ensure_no_options(options: &[String], command_name: &str) -> Result<()> {
    if let Some(extra) = options.first() {
        bail!("unknown {command_name} option: {extra}");
    }
    Ok(())
}

fn staged_file_path() -> PathBuf {
    env::temp_dir().join(STAGED_FILE_NAME)
}

fn run_download(url: &str) -> Result<Outcome> {
    let result = fetch_hosts_text(url);
    if let Ok(text) = &result {
        let staged = staged_file_path();
        fs::write(&staged, text)
            .with_context(|| format!("failed staging download at {}", staged.display()))?;
    }
    Ok(download_outcome(url, &result))
}

fn run_apply(url: Option<&str>, hosts: Option<PathBuf>) -> Result<Outcome> {
    let content = match url {
        Some(url) => match fetch_hosts_text(url) {
            Ok(text) => text,
            Err(err) => return Ok(download_outcome(url, &Err(err))),
        },
        None => {
            let staged = staged_file_path();
            if !staged.exists() {
                return Ok(Outcome::error(
                    "No downloaded content staged. Run `hostsmith download --url <URL>` first.",
                ));
            }
            fs::read_to_string(&staged)
                .with_context(|| format!("failed reading staged content {}", staged.display()))?
        }
    };

    let target = hosts.unwrap_or_else(default_hosts_path);
    let engine = MutationEngine::new(EngineConfig::default(), current_platform_ops());
    Ok(apply_outcome(&engine.apply(&content, &target)))
}

fn run_revert(hosts: Option<PathBuf>) -> Outcome {
    let target = hosts.unwrap_or_else(default_hosts_path);
    let engine = MutationEngine::new(EngineConfig::default(), current_platform_ops());
    revert_outcome(&engine.revert(&target))
}

fn print_help() {
    println!("hostsmith <command> [options]");
    println!();
    println!("Commands:");
    println!("  download --url URL          Fetch a hosts list and stage it");
    println!("  apply [--url URL] [--hosts PATH]");
    println!("                              Install staged (or freshly fetched) content");
    println!("                              into the hosts file, with backup");
    println!("  revert [--hosts PATH]       Restore the hosts file from its latest backup");
    println!("  path                        Print the resolved default hosts path");
    println!();
    println!("Examples:");
    println!("  hostsmith download --url https://example.test/blocklist.txt");
    println!("  hostsmith apply");
    println!("  hostsmith revert --hosts /etc/hosts");
}
