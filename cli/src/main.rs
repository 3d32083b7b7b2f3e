//! Formkit CLI
//!
//! Command-line interface for saved formkit forms.
//!
//! # Usage
//!
//! ```bash
//! formkit forms list
//! formkit forms import -f contact.json
//! formkit preview 6f1c... --set first=Ada --set last=Lovelace
//! formkit preview 6f1c... --input answers.json --today 2024-06-15 --format json
//! formkit config set derived_pass snapshot
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use formkit_core::FormkitConfig;
use formkit_store::{FileStore, FormRepository};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "formkit")]
#[command(author = "Formkit")]
#[command(version = "0.1.0")]
#[command(about = "Formkit Command Line Interface", long_about = None)]
struct Cli {
    /// Directory holding saved forms
    #[arg(long, env = "FORMKIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    format: output::OutputFormat,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage saved forms
    Forms {
        #[command(subcommand)]
        action: FormCommands,
    },
    /// Fill in a saved form and show derived values and errors
    Preview {
        /// Form id
        id: String,
        /// Field value as `<field-id>=<value>`; JSON values are parsed, anything else is text
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        sets: Vec<String>,
        /// JSON object of initial field values
        #[arg(long)]
        input: Option<PathBuf>,
        /// Date used as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum FormCommands {
    /// List saved forms
    List,
    /// Show a form's fields
    Show { id: String },
    /// Delete a saved form
    Delete { id: String },
    /// Delete every saved form
    Clear,
    /// Import forms from a JSON file (one form or an array)
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = FormkitConfig::load(cli.profile.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config not readable, using defaults");
        FormkitConfig::default()
    });
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    let open_repo = || {
        let data_dir = config.resolved_data_dir();
        tracing::debug!(data_dir = %data_dir.display(), "opening form store");
        FormRepository::with_storage_key(FileStore::new(data_dir), config.storage_key.clone())
    };

    let result = match cli.command {
        Commands::Forms { action } => commands::forms::handle(action, &open_repo(), cli.format),
        Commands::Preview { id, sets, input, today } => {
            let request = commands::preview::PreviewRequest { id, sets, input, today };
            commands::preview::handle(request, &open_repo(), &config, cli.format)
        }
        Commands::Config { action } => commands::config::handle(action, cli.profile.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
