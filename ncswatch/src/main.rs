//! ncswatch command line.
//!
//! ```text
//! ncswatch apply -f inventory.yml -u admin -s capture.zip
//! ncswatch schema -s ncswatch-schema.json
//! ```

use std::error::Error as StdError;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{error, info};

use ncswatch::config::schema_json;
use ncswatch::prompt::{PromptKind, PromptSpec, TerminalPrompter, fill_missing};
use ncswatch::transport::OpenSshConfig;
use ncswatch::{Batch, BatchOptions, CliConnector, Credentials, InventoryConfig};

/// Capture CLI diagnostics from NCS-55xx devices
#[derive(Parser, Debug)]
#[command(name = "ncswatch", author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the collection against every device in the inventory
    Apply(ApplyArgs),

    /// Write the JSON schema of the inventory file
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Inventory file (YAML)
    #[arg(short, long)]
    file: PathBuf,

    /// Device login username (prompted if not provided)
    #[arg(short, long, env = "NCSWATCH_USER")]
    user: Option<String>,

    /// Device login password (prompted if not provided)
    #[arg(short, long, env = "NCSWATCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// OpenSSH client config used for SSH connections
    #[arg(long)]
    ssh_config_file: Option<PathBuf>,

    /// Archive file to create (default: ncswatch-<timestamp>.zip)
    #[arg(short, long)]
    save: Option<PathBuf>,

    /// Keep the working directory after archiving
    #[arg(long)]
    keep_tmp: bool,

    /// Working directory, must not exist yet (default: a new UUID-named directory)
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Schema output file
    #[arg(short, long, default_value = "ncswatch-schema.json")]
    save: PathBuf,
}

/// Arguments requested interactively when left unset.
const PROMPTS: &[PromptSpec<ApplyArgs>] = &[
    PromptSpec {
        argument: "user",
        label: "Device username",
        kind: PromptKind::Text,
        is_set: |args| args.user.is_some(),
        set: |args, value| args.user = Some(value),
    },
    PromptSpec {
        argument: "password",
        label: "Device password",
        kind: PromptKind::Secret,
        is_set: |args| args.password.is_some(),
        set: |args, value| args.password = Some(value),
    },
];

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Command::Apply(args) => apply(args).await,
        Command::Schema(args) => schema(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn apply(mut args: ApplyArgs) -> Result<(), Box<dyn StdError>> {
    let started_at = Local::now().naive_local();

    let inventory = InventoryConfig::load(&args.file)
        .map_err(|e| format!("Failed loading inventory file: {}", e))?;

    fill_missing(&mut args, PROMPTS, &mut TerminalPrompter)?;
    let credentials = Credentials::new(
        args.user.take().unwrap_or_default(),
        args.password.take().unwrap_or_default(),
    );

    let mut connector = CliConnector::new(credentials);
    if let Some(path) = &args.ssh_config_file {
        connector = connector.with_transport_config(OpenSshConfig::load(path)?);
    }

    let mut options = BatchOptions::new(started_at).keep_work_dir(args.keep_tmp);
    if let Some(path) = args.save {
        options = options.with_archive_path(path);
    }
    if let Some(dir) = args.work_dir {
        options = options.with_work_dir(dir);
    }

    let report = Batch::new(connector, inventory, options).run().await?;

    let failed = report.failed().count();
    if failed > 0 {
        info!(
            "{} of {} devices did not complete",
            failed,
            report.outcomes.len()
        );
    }
    Ok(())
}

fn schema(args: SchemaArgs) -> Result<(), Box<dyn StdError>> {
    std::fs::write(&args.save, schema_json())?;
    info!("Saved inventory schema as '{}'", args.save.display());
    Ok(())
}
