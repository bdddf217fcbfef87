use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use tablex::core::ExtractionOptions;
use tablex::loader::PdfLoader;
use tablex::writer::write_tables_csv;

/// Reconstructs tabular structure from a PDF's content streams and writes
/// each table found to its own CSV file.
#[derive(Parser, Debug)]
#[command(name = "tablex", version, about)]
struct Cli {
    /// PDF file to extract tables from.
    input: String,

    /// Directory to write one CSV file per table into.
    #[arg(short, long, default_value = "tables")]
    output_dir: String,

    /// Confidence/tolerance preset.
    #[arg(long, value_enum, default_value = "balanced")]
    mode: Mode,

    /// Override the confidence threshold below which a candidate table is
    /// dropped, regardless of mode.
    #[arg(long)]
    confidence_threshold: Option<f64>,

    /// Restrict extraction to a single page (1-indexed). Defaults to all
    /// pages.
    #[arg(short, long)]
    page: Option<u32>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Mode {
    Fast,
    Balanced,
    Accurate,
}

impl From<Mode> for tablex::core::ProcessingMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Fast => tablex::core::ProcessingMode::Fast,
            Mode::Balanced => tablex::core::ProcessingMode::Balanced,
            Mode::Accurate => tablex::core::ProcessingMode::Accurate,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(table_count) => {
            info!(table_count, "extraction complete");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "extraction failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<usize> {
    let mut options = ExtractionOptions::for_mode(cli.mode.into());
    if let Some(threshold) = cli.confidence_threshold {
        options.confidence_threshold = threshold;
    }

    let loader = PdfLoader::open(&cli.input)?;

    let page_numbers: Vec<u32> = match cli.page {
        Some(p) => vec![p],
        None => (1..=loader.page_count() as u32).collect(),
    };

    let mut all_tables = Vec::new();
    for page_number in page_numbers {
        let page = match loader.load_page(page_number) {
            Ok(page) => page,
            Err(err) => {
                warn!(page_number, %err, "page failed to load, skipping");
                continue;
            }
        };
        let tables = match tablex::core::extract_tables(
            &page.content_stream,
            Some(&page.resources),
            &options,
            page_number,
        ) {
            Ok(tables) => tables,
            Err(err) => {
                warn!(page_number, %err, "page failed to extract, skipping");
                continue;
            }
        };
        info!(page_number, found = tables.len(), "page processed");
        all_tables.extend(tables);
    }

    let written = write_tables_csv(&all_tables, &cli.output_dir)?;
    for file_name in &written {
        info!(file_name, "wrote table");
    }

    Ok(all_tables.len())
}
