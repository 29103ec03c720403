use anyhow::Context;
use boardkit::{
    init_logging, sample_board, Config, Document, EditorCoordinator, EventBus, JsonFileStore,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "boardkit", version, about = "Board editor core utilities")]
struct Cli {
    /// Configuration file (TOML or JSON); defaults to the platform config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overrides the configuration
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a sample board to a JSON file
    Sample {
        output: PathBuf,
    },
    /// Run the design rule check on a board
    Check {
        board: PathBuf,
        /// Only run the quick copper checks
        #[arg(long)]
        quick: bool,
        /// Approve every finding and store the approvals in the board file
        #[arg(long)]
        approve_all: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
    /// Compute plane fragments and print a summary
    Planes {
        board: PathBuf,
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => match Config::default_path() {
            Ok(path) => Config::load_or_default(&path)?,
            Err(_) => Config::default(),
        },
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    config.validate()?;
    Ok(config)
}

fn open(board: &Path, config: Config) -> anyhow::Result<EditorCoordinator> {
    let document = Document::load_json(board)
        .with_context(|| format!("Failed to open {}", board.display()))?;
    Ok(EditorCoordinator::new(
        document,
        Arc::new(config),
        Arc::new(EventBus::new()),
    ))
}

fn check(
    board: &Path,
    config: Config,
    quick: bool,
    approve_all: bool,
    json: bool,
    timeout: Duration,
) -> anyhow::Result<bool> {
    let mut editor = open(board, config)?;
    editor.set_store(Box::new(JsonFileStore::new(board)));
    editor.run_drc(quick);
    if !editor.wait_for_builds(timeout) {
        anyhow::bail!("Rule check did not finish within {:?}", timeout);
    }
    if let Some(error) = editor.drc_error() {
        anyhow::bail!("Rule check failed: {}", error);
    }

    if approve_all {
        for entry in editor.drc_messages() {
            editor.set_approved(entry.message.approval, true);
        }
    }

    let entries = editor.drc_messages();
    if json {
        let messages: Vec<_> = entries.iter().map(|e| &e.message).collect();
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else {
        for entry in &entries {
            let m = &entry.message;
            println!(
                "[{}]{} {}: {}",
                m.severity,
                if entry.approved { " (approved)" } else { "" },
                m.rule,
                m.message
            );
        }
        let snapshot = editor.snapshot();
        println!(
            "{} message(s), {} not approved",
            snapshot.message_count, snapshot.unapproved_count
        );
    }
    Ok(entries.iter().all(|e| e.approved))
}

fn planes(board: &Path, config: Config, timeout: Duration) -> anyhow::Result<()> {
    let mut editor = open(board, config)?;
    editor.rebuild_planes();
    if !editor.wait_for_builds(timeout) {
        anyhow::bail!("Plane rebuild did not finish within {:?}", timeout);
    }
    let doc = editor.document();
    for (item, plane) in doc.planes() {
        let net = plane
            .net
            .and_then(|id| doc.net(id))
            .map(|n| n.name.as_str())
            .unwrap_or("<no net>");
        println!(
            "{} on {}: {} fragment(s)",
            net,
            plane.layer.display_name(),
            doc.fragments(item.id).len()
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config.logging)?;
    tracing::debug!("boardkit {} built {}", boardkit::VERSION, boardkit::BUILD_DATE);

    match cli.command {
        Command::Sample { output } => {
            let doc = sample_board()?;
            doc.save_json(&output)?;
            println!("Wrote {}", output.display());
        }
        Command::Check {
            board,
            quick,
            approve_all,
            json,
            timeout_secs,
        } => {
            let clean = check(
                &board,
                config,
                quick,
                approve_all,
                json,
                Duration::from_secs(timeout_secs),
            )?;
            if !clean {
                std::process::exit(1);
            }
        }
        Command::Planes {
            board,
            timeout_secs,
        } => planes(&board, config, Duration::from_secs(timeout_secs))?,
    }
    Ok(())
}
