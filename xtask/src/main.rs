mod check;
mod common;
mod convert;
mod table;

use clap::{Parser, Subcommand};

#[macro_use]
extern crate log;

fn main() {
    use Commands::*;
    let result = match Cli::parse().command {
        Convert(convert) => convert.invoke(),
        Check(check) => check.invoke(),
        Table(table) => table.invoke(),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[derive(Parser)]
#[clap(name = "bpe2spm")]
#[clap(version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert byte-level BPE merges into a SentencePiece model
    Convert(convert::ConvertArgs),
    /// Verify a converted model and print the sample texts
    Check(check::CheckArgs),
    /// Print the byte to unicode table
    Table(table::TableArgs),
}
