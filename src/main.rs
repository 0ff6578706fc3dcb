//! `toolrelay` command-line driver.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use toolrelay::agent_core::{Agent, Attachment, Session};
use toolrelay::config::{self, AppConfig};
use toolrelay::enablement::EnablementStore;
use toolrelay::storage::Preferences;

/// Agent orchestration engine: tool discovery, enablement, concurrent dispatch.
#[derive(Parser, Debug)]
#[command(name = "toolrelay", version, about)]
struct CliArgs {
    /// Config file (default: search upward for toolrelay.yaml)
    #[arg(long, value_name = "PATH", env = "TOOLRELAY_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List discovered tools grouped by origin, with enablement
    Tools {
        /// Print the grouped view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip a module or provider on/off
    Toggle { group: String },
    /// Run a single turn and print the answer
    Ask {
        text: String,
        /// Attach a file's text to the question (repeatable)
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,
    },
    /// Interactive session over stdin; `/reset` clears history, `/reload`
    /// rediscovers tools, `/exit` quits
    Chat,
    /// Read or write session preferences
    Pref {
        #[command(subcommand)]
        action: PrefAction,
    },
}

#[derive(Subcommand, Debug)]
enum PrefAction {
    Get { name: String },
    /// VALUE is parsed as JSON, falling back to a plain string
    Set { name: String, value: String },
    Unset { name: String },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Logging goes to the data dir; a failure here should not stop the CLI.
    if let Err(e) = toolrelay::init_tracing() {
        eprintln!("warning: file logging disabled: {e}");
    }

    let config = load_config(args.config.as_deref())?;
    let kv = toolrelay::open_store(&config.storage).context("opening kv store")?;

    if let Command::Pref { action } = &args.command {
        return run_pref(Preferences::new(kv), action);
    }

    let enablement = Arc::new(EnablementStore::new(kv));
    let mut agent = Agent::from_config(&config, enablement)?;
    agent.refresh().await?;

    match args.command {
        Command::Tools { json } => print_tools(&agent, json)?,
        Command::Toggle { group } => {
            let enabled = agent.enablement().toggle(&group)?;
            println!("{group}: {}", if enabled { "enabled" } else { "disabled" });
        }
        Command::Ask { text, files } => {
            let attachments = read_attachments(&files)?;
            let mut session = Session::new();
            let outcome = agent.run_turn(&mut session, &text, &attachments).await;
            println!("{}", outcome.text());
            if outcome.is_error {
                std::process::exit(1);
            }
        }
        Command::Chat => run_chat(&mut agent).await?,
        Command::Pref { .. } => {}
    }

    Ok(())
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<AppConfig> {
    match explicit {
        Some(path) => config::load_config(path)
            .with_context(|| format!("loading {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("reading current directory")?;
            config::load_or_default(&cwd).context("loading config")
        }
    }
}

fn print_tools(agent: &Agent, as_json: bool) -> Result<()> {
    let grouped = agent.registry().grouped();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&grouped)?);
        return Ok(());
    }

    let enablement = agent.enablement();
    for (kind, groups) in [("module", &grouped.module), ("server", &grouped.server)] {
        for group in groups {
            let state = if enablement.is_enabled(&group.name) { "on " } else { "off" };
            match &group.url {
                Some(url) => println!("[{state}] {kind} {} ({url})", group.name),
                None => println!("[{state}] {kind} {}", group.name),
            }
            for tool in &group.tools {
                println!("        {}  {}", tool.name, tool.description);
            }
        }
    }
    if agent.registry().is_empty() {
        println!("no tools discovered");
    }
    Ok(())
}

fn read_attachments(files: &[PathBuf]) -> Result<Vec<Attachment>> {
    files
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(Attachment::new(name, content))
        })
        .collect()
}

async fn run_chat(agent: &mut Agent) -> Result<()> {
    let mut session = Session::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/exit" | "/quit" => break,
            "/reset" => {
                session.reset();
                println!("(history cleared)");
                continue;
            }
            "/reload" => {
                match agent.refresh().await {
                    Ok(()) => println!("({} tools discovered)", agent.registry().len()),
                    Err(e) => println!("(reload failed: {e})"),
                }
                continue;
            }
            _ => {}
        }

        let outcome = agent.run_turn(&mut session, line, &[]).await;
        for result in &outcome.tool_results {
            let mark = if result.success { "ok" } else { "failed" };
            println!("  · {} {mark} ({} ms)", result.tool_name, result.execution_time_ms);
        }
        println!("{}", outcome.text());
    }
    Ok(())
}

fn run_pref(prefs: Preferences, action: &PrefAction) -> Result<()> {
    match action {
        PrefAction::Get { name } => match prefs.get(name)? {
            Some(value) => println!("{value}"),
            None => bail!("preference '{name}' is not set"),
        },
        PrefAction::Set { name, value } => {
            let parsed = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.clone()));
            prefs.set(name, &parsed)?;
        }
        PrefAction::Unset { name } => {
            if !prefs.remove(name)? {
                bail!("preference '{name}' is not set");
            }
        }
        PrefAction::List => {
            for name in prefs.names()? {
                println!("{name}");
            }
        }
    }
    Ok(())
}
