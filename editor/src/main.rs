//! Processor pipeline editor.
//!
//! Converts pipeline documents into id-carrying snapshots, applies batches of
//! edit commands to snapshots, and converts them back.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pipeline_editor::core::invariants::validate_invariants;
use pipeline_editor::core::reducer::apply_all;
use pipeline_editor::exit_codes;
use pipeline_editor::io::commands::load_commands;
use pipeline_editor::io::config::{DEFAULT_CONFIG_PATH, EditorConfig, load_config, write_config};
use pipeline_editor::io::document::{deserialize, serialize};
use pipeline_editor::io::pipeline_store::{
    load_document, load_pipeline, to_json, write_document, write_pipeline,
};
use pipeline_editor::logging;
use pipeline_editor::outline::render_outline;

#[derive(Parser)]
#[command(
    name = "pipeline-editor",
    version,
    about = "Structural editor for processor pipelines"
)]
struct Cli {
    /// Editor config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default editor config to the `--config` path.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
    /// Convert a pipeline document into a snapshot, assigning step ids.
    Import {
        document: PathBuf,
        /// Write here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert a snapshot back into a pipeline document.
    Export {
        snapshot: PathBuf,
        /// Write here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply a JSON array of edit commands to a snapshot.
    Apply {
        snapshot: PathBuf,
        #[arg(long)]
        commands: PathBuf,
        /// Write here instead of updating the snapshot in place.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a snapshot against the schema and structural invariants.
    Validate { snapshot: PathBuf },
    /// Print the step outline of a snapshot with selectors.
    Show { snapshot: PathBuf },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = || load_config(&cli.config).context("load config");
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Import { document, output } => {
            cmd_import(&config()?, &document, output.as_deref())
        }
        Command::Export { snapshot, output } => {
            cmd_export(&config()?, &snapshot, output.as_deref())
        }
        Command::Apply {
            snapshot,
            commands,
            output,
        } => cmd_apply(&config()?, &snapshot, &commands, output.as_deref()),
        Command::Validate { snapshot } => cmd_validate(&snapshot),
        Command::Show { snapshot } => cmd_show(&snapshot),
    }
}

fn cmd_init(config: &Path, force: bool) -> Result<i32> {
    if config.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config.display()
        );
    }
    write_config(config, &EditorConfig::default())?;
    println!("wrote {}", config.display());
    Ok(exit_codes::OK)
}

fn cmd_import(cfg: &EditorConfig, document: &Path, output: Option<&Path>) -> Result<i32> {
    let doc = load_document(document)?;
    let mut ids = cfg.id_generator();
    let pipeline = deserialize(&doc, ids.as_mut())
        .with_context(|| format!("convert document {}", document.display()))?;
    match output {
        Some(path) => write_pipeline(path, &pipeline, cfg.output.pretty)?,
        None => print_stdout(&to_json(&pipeline, cfg.output.pretty)?)?,
    }
    Ok(exit_codes::OK)
}

fn cmd_export(cfg: &EditorConfig, snapshot: &Path, output: Option<&Path>) -> Result<i32> {
    let pipeline = load_pipeline(snapshot)?;
    let doc = serialize(&pipeline)
        .with_context(|| format!("convert snapshot {}", snapshot.display()))?;
    match output {
        Some(path) => write_document(path, &doc, cfg.output.pretty)?,
        None => print_stdout(&to_json(&doc, cfg.output.pretty)?)?,
    }
    Ok(exit_codes::OK)
}

fn cmd_apply(
    cfg: &EditorConfig,
    snapshot: &Path,
    commands: &Path,
    output: Option<&Path>,
) -> Result<i32> {
    let pipeline = load_pipeline(snapshot)?;
    let commands = load_commands(commands)?;
    let mut ids = cfg.id_generator();
    let replay = apply_all(&pipeline, &commands, ids.as_mut())?;

    // Update takes caller-built steps verbatim, so the result is re-checked.
    let errors = validate_invariants(&replay.state);
    if !errors.is_empty() {
        bail!("edited snapshot is invalid:\n- {}", errors.join("\n- "));
    }

    write_pipeline(output.unwrap_or(snapshot), &replay.state, cfg.output.pretty)?;
    for (index, conflict) in &replay.rejected {
        eprintln!("command #{} skipped: {}", index, conflict);
    }
    println!(
        "applied {}, unchanged {}, rejected {}",
        replay.applied,
        replay.unchanged,
        replay.rejected.len()
    );

    if replay.rejected.is_empty() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::MOVES_REJECTED)
    }
}

fn cmd_validate(snapshot: &Path) -> Result<i32> {
    let pipeline = load_pipeline(snapshot)?;
    println!("ok: {} steps", pipeline.step_count());
    Ok(exit_codes::OK)
}

fn cmd_show(snapshot: &Path) -> Result<i32> {
    let pipeline = load_pipeline(snapshot)?;
    print_stdout(&render_outline(&pipeline))?;
    Ok(exit_codes::OK)
}

fn print_stdout(contents: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(contents.as_bytes())
        .context("write stdout")?;
    stdout.flush().context("flush stdout")
}
