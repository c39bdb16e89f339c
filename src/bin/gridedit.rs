//! gridedit CLI - table grid inspection, numeric display and cell merging

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use gridedit::records::NewRecord;
use gridedit::{
    merge_range, Document, EditorController, EditorOptions, GridModel, MemoryRecordStore,
    Position, RecordStore,
};

#[derive(Parser)]
#[command(name = "gridedit")]
#[command(version)]
#[command(about = "gridedit - span-aware table grid editing for HTML table markup", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Keep plain numbers ungrouped when loading
    #[arg(long, global = true)]
    no_format: bool,

    /// Use `.` for grouping and `,` for decimals
    #[arg(long, global = true)]
    european: bool,

    /// Quiet mode: only errors are logged to stderr
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the logical matrix of every table
    Grid {
        /// Input file (reads from stdin if not provided)
        input: Option<String>,
    },

    /// Load markup and print its display form
    Format {
        input: Option<String>,

        #[arg(short, long)]
        output: Option<String>,
    },

    /// Load markup and print the form ready for storage
    Prepare {
        input: Option<String>,

        #[arg(short, long)]
        output: Option<String>,
    },

    /// Merge a rectangular range into one spanning cell
    Merge {
        input: Option<String>,

        /// First corner as ROW,COL
        #[arg(long, value_parser = parse_position)]
        from: Position,

        /// Opposite corner as ROW,COL
        #[arg(long, value_parser = parse_position)]
        to: Position,

        /// Zero-based table index
        #[arg(long, default_value_t = 0)]
        table: usize,

        #[arg(short, long)]
        output: Option<String>,
    },

    /// Concatenate JSONL files, validating every line
    JsonlMerge {
        /// At least two JSONL files
        #[arg(required = true)]
        files: Vec<String>,

        #[arg(short, long)]
        output: Option<String>,
    },

    /// Export markup files as JSONL records
    Export {
        #[arg(required = true)]
        files: Vec<String>,

        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show version and feature info
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let options = editor_options(&cli);
    match cli.command {
        Commands::Grid { input } => {
            let content = read_input(input.as_deref())?;
            print!("{}", describe_tables(&content)?);
        }

        Commands::Format { input, output } => {
            let content = read_input(input.as_deref())?;
            let editor = EditorController::with_markup(&content, options)?;
            write_output(output.as_deref(), &editor.markup())?;
        }

        Commands::Prepare { input, output } => {
            let content = read_input(input.as_deref())?;
            let mut editor = EditorController::with_markup(&content, options)?;
            write_output(output.as_deref(), &editor.save())?;
        }

        Commands::Merge {
            input,
            from,
            to,
            table,
            output,
        } => {
            let content = read_input(input.as_deref())?;
            let merged = merge_range(&content, table, from, to)
                .with_context(|| format!("cannot merge {} to {}", from, to))?;
            write_output(output.as_deref(), &merged)?;
        }

        Commands::JsonlMerge { files, output } => {
            let sources = files
                .iter()
                .map(|path| fs::read_to_string(path).with_context(|| format!("reading {}", path)))
                .collect::<Result<Vec<_>>>()?;
            let merged = gridedit::export::merge_jsonl(sources.as_slice())?;
            write_output(output.as_deref(), merged.trim_end())?;
            tracing::info!(files = files.len(), "merged JSONL sources");
        }

        Commands::Export { files, output } => {
            let mut store = MemoryRecordStore::new();
            let mut lines = Vec::with_capacity(files.len());
            for path in &files {
                let content =
                    fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
                let mut editor = EditorController::with_markup(&content, options.clone())
                    .with_context(|| format!("loading {}", path))?;
                let record = store.create_record(NewRecord::new(file_name(path), editor.save()))?;
                lines.push(gridedit::export::export_record(&record));
            }
            write_output(output.as_deref(), &lines.join("\n"))?;
        }

        Commands::Info => {
            println!("gridedit v{}", gridedit::version());
            println!();
            println!("Features:");
            println!("  - Span-aware logical grid for rowspan/colspan tables");
            println!("  - Rectangular drag selection and cell merging");
            println!("  - Inline edit sessions with commit and cancel");
            println!("  - Reversible thousands grouping for plain numbers");
            println!("  - JSONL export and merging");
            println!();
            println!("Logging: set RUST_LOG (e.g. RUST_LOG=gridedit=debug)");
        }
    }

    Ok(())
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "error" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn editor_options(cli: &Cli) -> EditorOptions {
    let mut options = if cli.european {
        EditorOptions::european()
    } else {
        EditorOptions::default()
    };
    if cli.no_format {
        options.auto_format = false;
    }
    options
}

fn parse_position(value: &str) -> Result<Position, String> {
    let (row, col) = value
        .split_once(',')
        .ok_or_else(|| format!("expected ROW,COL but got '{}'", value))?;
    let row = row
        .trim()
        .parse()
        .map_err(|_| format!("row '{}' is not a number", row.trim()))?;
    let col = col
        .trim()
        .parse()
        .map_err(|_| format!("column '{}' is not a number", col.trim()))?;
    Ok(Position::new(row, col))
}

fn describe_tables(content: &str) -> Result<String> {
    let doc = Document::parse(content)?;
    let tables = doc.tables();
    if tables.is_empty() {
        bail!("no table elements found");
    }

    let mut out = String::new();
    for (idx, table) in tables.into_iter().enumerate() {
        let grid = GridModel::build(&doc, table)?;
        for warning in grid.warnings() {
            tracing::warn!(table = idx, "{}", warning);
        }
        out.push_str(&format!(
            "table {} ({} x {})\n",
            idx,
            grid.row_count(),
            grid.col_count()
        ));
        out.push_str(&grid.describe(&|cell| doc.text_content(cell).trim().to_string()));
    }
    Ok(out)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path)),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, format!("{}\n", content))
                .with_context(|| format!("writing {}", path))?;
            eprintln!("✓ Output written to: {}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
