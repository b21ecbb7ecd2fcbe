//! warscan - Wireless scan-log cleaner & network map generator
//!
//! Reconciles raw wireless capture CSVs into one row per observed device
//! and renders the result as an interactive map.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use warscan::data::{columns, ColumnSet, ScanLoader, ScanProcessor, ScanTable, ScanWriter, Summary};
use warscan::map::MapRenderer;

const BANNER: &str = r"
 __        ___    ____  ____   ____    _    _   _
 \ \      / / \  |  _ \/ ___| / ___|  / \  | \ | |
  \ \ /\ / / _ \ | |_) \___ \| |     / _ \ |  \| |
   \ V  V / ___ \|  _ < ___) | |___ / ___ \| |\  |
    \_/\_/_/   \_\_| \_\____/ \____/_/   \_\_| \_|

        [ Wireless scan-log cleaner & network mapper ]
";

#[derive(Parser)]
#[command(name = "warscan", about = "Wireless scan-log cleaner & network map generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile a raw capture CSV into one row per observed device
    Clean {
        /// Input capture CSV
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output CSV (default: Done.csv next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip the file dialog and prompt on the terminal instead
        #[arg(long)]
        cli: bool,
    },
    /// Render a cleaned table as an interactive HTML map
    Map {
        /// Cleaned CSV to plot
        #[arg(short, long, default_value = "Done.csv")]
        input: PathBuf,
        /// Output HTML file
        #[arg(short, long, default_value = "network_map.html")]
        output: PathBuf,
        /// Do not open the map in the default browser
        #[arg(long)]
        no_open: bool,
    },
}

fn main() {
    print_banner();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Clean { input, output, cli } => run_clean(input, output, cli),
        Command::Map {
            input,
            output,
            no_open,
        } => run_map(&input, &output, no_open),
    };

    if let Err(e) = result {
        eprintln!("\n\u{274c} Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_banner() {
    // Print in blue
    println!("\x1b[94m{BANNER}\x1b[0m");
    println!("{}", "-".repeat(50));
}

fn run_clean(input: Option<PathBuf>, output: Option<PathBuf>, force_cli: bool) -> Result<()> {
    let input = match input {
        Some(path) => path,
        None => select_input_file(force_cli)?,
    };
    let output = output.unwrap_or_else(|| default_output_path(&input));

    println!("\nReading file: {}", input.display());
    let table = ScanLoader::load(&input, ColumnSet::WithGeo)?;
    let (canonical, summary) = ScanProcessor::process(table);
    ScanWriter::write(&canonical, &output)
        .with_context(|| format!("failed to save cleaned data to '{}'", output.display()))?;

    println!("\n\u{2713} Cleaned data saved to: {}", output.display());
    print_summary(&summary);
    print_sample(&canonical);
    Ok(())
}

fn run_map(input: &Path, output: &Path, no_open: bool) -> Result<()> {
    let table = ScanLoader::load(input, ColumnSet::WithGeo)?;
    MapRenderer::render_to_file(&table, output).context("failed to generate the network map")?;

    let shown = output
        .canonicalize()
        .unwrap_or_else(|_| output.to_path_buf());
    println!("\n\u{2713} The network map has been saved to: {}", shown.display());

    if !no_open {
        open::that(output).context("failed to open the map in a browser")?;
    }
    Ok(())
}

/// Pick the input file: native dialog first, terminal prompt as fallback.
fn select_input_file(force_cli: bool) -> Result<PathBuf> {
    if !force_cli {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            return Ok(path);
        }
    }
    prompt_input_file()
}

fn prompt_input_file() -> Result<PathBuf> {
    loop {
        print!("Enter the path to your CSV file (or 'q' to quit): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            anyhow::bail!("no input file selected");
        }
        let entry = line.trim();
        if entry.eq_ignore_ascii_case("q") {
            std::process::exit(0);
        }

        let path = PathBuf::from(entry);
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.exists() && is_csv {
            return Ok(path);
        }
        println!("Invalid file path. Enter a valid path to a CSV file.");
    }
}

fn default_output_path(input: &Path) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("Done.csv")
}

fn print_summary(summary: &Summary) {
    println!("\nSummary:");
    println!("\u{2713} Found {} unique access points", summary.access_points);
    println!("\u{2713} Found {} unique client devices", summary.clients);
    println!("\u{2713} Total entries processed: {}", summary.total_raw);
    println!(
        "\u{2713} Unique devices after processing: {}",
        summary.canonical
    );
    if summary.rejected.total() > 0 {
        println!(
            "\u{2713} Rows rejected by validity filter: {} ({} empty, {} zero)",
            summary.rejected.total(),
            summary.rejected.empty_field,
            summary.rejected.zero_field
        );
    }
}

/// Print the first few canonical rows, arrange-style.
fn print_sample(table: &ScanTable) {
    if table.is_empty() {
        return;
    }

    let sample_columns = [
        columns::LOCAL_TIME,
        columns::ESSID,
        columns::BSSID,
        columns::TYPE,
        columns::POWER,
    ];
    let indices: Vec<usize> = sample_columns
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect();
    if indices.len() != sample_columns.len() {
        return;
    }

    println!("\nSample of processed data:");
    println!("{}", "-".repeat(50));
    println!(
        "{:<20} {:<24} {:<18} {:<7} {:>6}",
        "LocalTime", "ESSID", "BSSID", "Type", "Power"
    );
    for row in table.rows.iter().take(5) {
        let cell = |i: usize| row.cells.get(i).and_then(|c| c.as_deref()).unwrap_or("");
        println!(
            "{:<20} {:<24} {:<18} {:<7} {:>6}",
            cell(indices[0]),
            truncate(cell(indices[1]), 24),
            cell(indices[2]),
            cell(indices[3]),
            cell(indices[4]),
        );
    }
    println!("{}", "-".repeat(50));
}

fn truncate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
