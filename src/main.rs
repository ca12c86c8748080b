//! Command-line front end: run one Knight program from an expression or a
//! file. Program output goes to stdout; diagnostics go to stderr and exit
//! nonzero.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};

#[derive(Debug, Parser)]
#[command(
    name = "knight",
    version,
    about = "Run Knight programs",
    group(ArgGroup::new("program").required(true).args(["expression", "file"]))
)]
struct Cli {
    /// Execute the given expression
    #[arg(short = 'e', value_name = "EXPR")]
    expression: Option<String>,

    /// Read the program from a file
    #[arg(short = 'f', value_name = "FILE")]
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = if let Some(expression) = cli.expression {
        expression
    } else if let Some(path) = cli.file {
        match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("[FATAL] cannot read {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        }
    } else {
        // The required arg group means clap never lets this through; keep
        // the usage line anyway rather than panicking.
        eprintln!("usage: knight (-e 'expr' | -f file)");
        return ExitCode::FAILURE;
    };

    match knight::evaluate(&source) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
