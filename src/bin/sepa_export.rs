//! SEPA Export - CLI tool rendering a payment order as a SEPA XML message.

use ch_ledger::{
    sepa::{MessageFormat, PaymentOrder},
    Result,
};
use clap::Parser;
use std::fs::File;
use std::io::{self, Write};

#[derive(Parser)]
#[command(name = "ch_ledger_sepa")]
#[command(about = "Render a payment order (JSON) as a validated SEPA message", long_about = None)]
struct Cli {
    /// Payment order path (or stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Message format (pain.001)
    #[arg(long = "message-format", default_value = "pain.001")]
    message_format: String,

    /// Output file path (or stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let format = cli.message_format.parse::<MessageFormat>()?;

    let order = if let Some(ref input_path) = cli.input {
        PaymentOrder::from_read(File::open(input_path)?)?
    } else {
        PaymentOrder::from_read(io::stdin())?
    };

    let xml = format.compute_export(&order)?;

    if let Some(ref output_path) = cli.output {
        let mut file = File::create(output_path)?;
        file.write_all(xml.as_bytes())?;
    } else {
        let mut stdout = io::stdout();
        stdout.write_all(xml.as_bytes())?;
        writeln!(stdout)?;
    }

    Ok(())
}
