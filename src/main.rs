//! # Folio CLI
//!
//! ```bash
//! # Export every exchange of a saved conversation
//! folio export conversation.json
//!
//! # Export only the selected pairs of curated chats, with a custom font
//! folio export chats.json --format chats --font SpaceMono.ttf -o table.pdf
//!
//! # Inspect the draw commands of a records file
//! folio layout records.json --format records
//!
//! # Turn statistics, the default layout, a sample input
//! folio stats conversation.json
//! folio config > layout.json
//! folio example > conversation.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use folio::config::TableLayoutConfig;
use folio::export::{export_file_name, records_from_pairs, render_records, ExportOptions};
use folio::import::{convert_exports, parse_exports, statistics, validate_turns};
use folio::layout::FlowEngine;
use folio::model::{Chat, ChatPair, Record};
use folio::pdf::{Metadata, PageTemplate, PdfDocument};

/// Folio - chat exchanges as a paginated PDF table
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render records to a PDF file
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Output file (defaults to a timestamped chatgpt-export-*.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Page template JSON (defaults to the table grid)
        #[arg(long, value_name = "FILE", conflicts_with = "blank")]
        template: Option<PathBuf>,

        /// Draw on blank pages
        #[arg(long)]
        blank: bool,

        /// TrueType font used instead of Courier
        #[arg(long, value_name = "FILE")]
        font: Option<PathBuf>,

        /// Fail instead of growing beyond this many pages
        #[arg(long, value_name = "N")]
        max_pages: Option<usize>,

        /// Document title
        #[arg(long)]
        title: Option<String>,
    },

    /// Print the draw commands for the input as JSON
    Layout {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print turn statistics of a saved conversation as JSON
    Stats {
        /// Saved conversation (single export or array)
        input: PathBuf,
    },

    /// Print the default layout configuration as JSON
    Config,

    /// Print a sample saved conversation
    Example,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Input JSON file
    input: PathBuf,

    /// What the input file holds
    #[arg(long, value_enum, default_value_t = InputFormat::Export)]
    format: InputFormat,

    /// Layout configuration JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// With --format chats, include pairs that are not selected
    #[arg(long)]
    all: bool,

    /// Keep only pairs answered by this model
    #[arg(long)]
    model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// A saved conversation, single or array
    Export,
    /// An array of curated chats with selections
    Chats,
    /// An array of ready records
    Records,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            template,
            blank,
            font,
            max_pages,
            title,
        } => {
            let config = load_config(input.config.as_deref())?;
            let records = load_records(&input, &config)?;

            let template = match (template, blank) {
                (Some(path), _) => Some(
                    PageTemplate::from_file(&path)
                        .with_context(|| format!("Failed to load template {}", path.display()))?,
                ),
                (None, true) => Some(PageTemplate::blank(config.page_size)),
                (None, false) => None,
            };
            let font = match font {
                Some(path) => {
                    Some(fs::read(&path).with_context(|| format!("Failed to read font {}", path.display()))?)
                }
                None => None,
            };

            let options = ExportOptions {
                config,
                template,
                font,
                metadata: Metadata {
                    title,
                    author: None,
                    subject: Some("Chat export".to_string()),
                },
                max_pages,
            };
            let pdf = render_records(&records, &options).await?;

            let output = output.unwrap_or_else(|| PathBuf::from(export_file_name(Utc::now())));
            fs::write(&output, &pdf).with_context(|| format!("Failed to write {}", output.display()))?;
            info!(bytes = pdf.len(), path = %output.display(), "wrote pdf");
        }

        Commands::Layout { input } => {
            let config = load_config(input.config.as_deref())?;
            let records = load_records(&input, &config)?;
            let mut document = PdfDocument::from_template(PageTemplate::table_grid(&config));
            let commands = FlowEngine::new(config)?.layout(&records, &mut document).await?;
            println!("{}", serde_json::to_string_pretty(&commands)?);
        }

        Commands::Stats { input } => {
            let exports = parse_exports(&read_input(&input)?)?;
            let turns: Vec<_> = exports.into_iter().flat_map(|e| e.turns).collect();
            let validation = validate_turns(&turns);
            if !validation.is_valid() {
                warn!(invalid = validation.errors.len(), "input has invalid turns");
            }
            println!("{}", serde_json::to_string_pretty(&statistics(&turns))?);
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&TableLayoutConfig::default())?);
        }

        Commands::Example => {
            print!("{}", example_export_json());
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<TableLayoutConfig> {
    match path {
        Some(path) => TableLayoutConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(TableLayoutConfig::default()),
    }
}

/// Read the input file as the chosen format and turn it into records.
fn load_records(input: &InputArgs, config: &TableLayoutConfig) -> Result<Vec<Record>> {
    let json = read_input(&input.input)?;
    let today = Local::now().date_naive();

    let (pairs, selected_only): (Vec<ChatPair>, bool) = match input.format {
        InputFormat::Records => {
            let records: Vec<Record> = serde_json::from_str(&json).context("Failed to parse records")?;
            return Ok(records);
        }
        InputFormat::Export => {
            let chats = convert_exports(&parse_exports(&json)?);
            (chats.into_iter().flat_map(|c| c.pairs).collect(), false)
        }
        InputFormat::Chats => {
            let chats: Vec<Chat> = serde_json::from_str(&json).context("Failed to parse chats")?;
            (chats.into_iter().flat_map(|c| c.pairs).collect(), !input.all)
        }
    };

    let pairs: Vec<ChatPair> = match &input.model {
        Some(model) => pairs
            .into_iter()
            .filter(|p| p.model.as_deref() == Some(model.as_str()))
            .collect(),
        None => pairs,
    };

    let records = records_from_pairs(&pairs, today, &config.field_mapping, selected_only);
    info!(pairs = pairs.len(), records = records.len(), "loaded input");
    Ok(records)
}

fn example_export_json() -> &'static str {
    r##"{
  "meta": {
    "timestamp": "2026-03-09T14:05:12.345Z",
    "url": "https://chatgpt.com/c/example",
    "title": "Rust Grundlagen"
  },
  "turns": [
    {
      "id": "t1",
      "role": "user",
      "model": "",
      "text": "Was ist Ownership in Rust?",
      "date": "2026-03-09T14:00:00Z"
    },
    {
      "id": "t2",
      "role": "assistant",
      "model": "gpt-4o",
      "text": "Jeder Wert hat genau einen Besitzer. Verlässt der Besitzer seinen Gültigkeitsbereich, wird der Wert freigegeben.",
      "date": "2026-03-09T14:00:05Z"
    },
    {
      "id": "t3",
      "role": "user",
      "model": "",
      "text": "Und Borrowing?",
      "date": "2026-03-09T14:01:00Z"
    },
    {
      "id": "t4",
      "role": "assistant",
      "model": "gpt-4o",
      "text": "",
      "html": "<p>Eine Referenz leiht einen Wert aus, <b>ohne</b> ihn zu besitzen.</p>",
      "date": "2026-03-09T14:01:04Z"
    }
  ]
}
"##
}
