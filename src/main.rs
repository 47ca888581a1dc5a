// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Cabletrace CLI - trace cable paths through a physical network topology

use anyhow::Result;
use cabletrace::commands::{self, cable::CableArgs, Session};
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cabletrace")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "CABLETRACE_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Data directory override
    #[arg(long, env = "CABLETRACE_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    no_color: bool,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load terminations and cables from a JSON document
    Import {
        /// Import document
        file: std::path::PathBuf,
    },

    /// Manage cables
    Cable {
        /// Action: connect, update, delete, list
        action: String,

        /// Cable id or id prefix (update, delete)
        cable: Option<String>,

        /// A-side termination (id, device:name or name); repeatable
        #[arg(short, long)]
        a: Vec<String>,

        /// B-side termination (id, device:name or name); repeatable
        #[arg(short, long)]
        b: Vec<String>,

        /// Status (connected, planned, decommissioning)
        #[arg(long)]
        status: Option<String>,

        /// Cable type (cat6, smf-os2, power, ...)
        #[arg(long = "type")]
        cable_type: Option<String>,

        /// Length
        #[arg(long)]
        length: Option<f64>,

        /// Length unit (km, m, cm, mi, ft, in)
        #[arg(long)]
        unit: Option<String>,

        /// Label
        #[arg(long)]
        label: Option<String>,

        /// Color (hex)
        #[arg(long)]
        color: Option<String>,
    },

    /// Show the cable path from a termination
    Trace {
        /// Termination (id, device:name or name)
        termination: String,
    },

    /// Inspect and rebuild stored cable paths
    Path {
        /// Action: list, show, retrace, rebuild, split-nodes, groups
        action: String,

        /// Path id or id prefix
        id: Option<String>,
    },

    /// Export the cable plant
    Export {
        /// Output format (dot, json)
        #[arg(short, long, default_value = "dot")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Show effective configuration
    Config {
        /// Configuration key (omit for all)
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = cabletrace::config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    // Initialize logging; RUST_LOG wins over flags and config
    let log_level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let session = Session {
        config,
        json: cli.json,
        color: !cli.no_color,
    };

    match cli.command {
        Commands::Import { file } => commands::import::run(&session, &file),
        Commands::Cable {
            action,
            cable,
            a,
            b,
            status,
            cable_type,
            length,
            unit,
            label,
            color,
        } => commands::cable::run(
            &session,
            &action,
            CableArgs {
                cable,
                a,
                b,
                status,
                cable_type,
                length,
                unit,
                label,
                color,
            },
        ),
        Commands::Trace { termination } => commands::trace::run(&session, &termination),
        Commands::Path { action, id } => commands::path::run(&session, &action, id),
        Commands::Export { format, output } => commands::export::run(&session, &format, output),
        Commands::Config { key } => commands::config::run(&session, key.as_deref()),
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }
}
