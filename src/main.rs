use clap::error::ErrorKind;
use clap::Parser;

mod cli;
mod commands;
mod domain;
mod rules;
mod services;

fn main() {
    // Usage errors exit 1 (same channel as a blocked gate) before any HTTP
    // activity; help/version remain a success.
    let parsed = match cli::Cli::try_parse() {
        Ok(parsed) => parsed,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    match commands::execute(&parsed) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
