//! Crésus Import - CLI tool importing a Crésus journal export into a chart of accounts.

use ch_ledger::{
    import::describe_moves,
    store::{Chart, MemoryStore},
    CresusImport, Error, ImportResult, Move, Result,
};
use clap::{Parser, ValueEnum};
use std::fs::{self, File};
use std::io::{self, Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable listing of the moves
    Text,
    /// Moves as JSON
    Json,
}

#[derive(Parser)]
#[command(name = "ch_ledger_import")]
#[command(about = "Import a Crésus journal export as balanced accounting moves", long_about = None)]
struct Cli {
    /// Crésus export path (or stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Chart of accounts, taxes, analytic accounts and journals (JSON)
    #[arg(long)]
    chart: String,

    /// Code of the journal receiving the moves
    #[arg(long, default_value = "MISC")]
    journal: String,

    /// Output file path (or stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn main() {
    env_logger::init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    let chart = Chart::from_read(File::open(&cli.chart)?)?;
    let journal = chart
        .journal(&cli.journal)
        .cloned()
        .ok_or_else(|| Error::Store(format!("no journal with code {}", cli.journal)))?;

    let input = if let Some(ref input_path) = cli.input {
        fs::read(input_path)?
    } else {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        buffer
    };

    let mut store = MemoryStore::new(chart);
    let mut import = CresusImport::new(journal);

    let ids = match import.import_file(&input, &mut store) {
        ImportResult::Success(ids) => ids,
        ImportResult::Failure { .. } => {
            eprintln!("{}", import.report().unwrap_or_default());
            return Ok(false);
        }
    };

    let moves: Vec<&Move> = ids.iter().filter_map(|id| store.get_move(*id)).collect();

    if let Some(ref output_path) = cli.output {
        let mut file = File::create(output_path)?;
        write_output(&mut file, &moves, &import, cli.format)?;
    } else {
        let mut stdout = io::stdout();
        write_output(&mut stdout, &moves, &import, cli.format)?;
    }

    Ok(true)
}

fn write_output<W: Write>(
    writer: &mut W,
    moves: &[&Move],
    import: &CresusImport,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            describe_moves(writer, moves.iter().copied(), import.journal())?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, moves)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
