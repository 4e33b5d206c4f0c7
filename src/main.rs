use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use rlox::{RunStatus, Session};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.len() {
        1 => run_prompt(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("Usage: rlox [script]");
            ExitCode::from(64)
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read {}: {}", path, err);
            return ExitCode::from(74);
        }
    };

    let mut session = Session::new();
    match session.run(&source) {
        RunStatus::Success => ExitCode::SUCCESS,
        RunStatus::StaticError => ExitCode::from(65),
        RunStatus::RuntimeError => ExitCode::from(70),
    }
}

fn run_prompt() -> ExitCode {
    let mut session = Session::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                // Errors were already reported; the prompt keeps going.
                session.run(line.trim());
            }
        }
    }
    ExitCode::SUCCESS
}
