use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use bunt_lang as bunt;

use bunt::error::BuntError;
use bunt::interpreter::Interpreter;
use bunt::parser::Parser;
use bunt::resolver::Resolver;
use bunt::scanner::Scanner;
use bunt::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Bunt language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Runs input from a file as a Bunt program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive session
    Repl,
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Write to file with module path and source line per record
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("bunt_lang::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Scan the whole buffer, printing every lexical error.  `None` means at
/// least one error was reported.
fn scan(buf: &[u8]) -> Option<Vec<Token>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut clean = true;

    for token in Scanner::new(buf) {
        match token {
            Ok(token) => tokens.push(token),
            Err(e) => {
                debug!("Scan debug: {}", e);
                eprintln!("{}", e);
                clean = false;
            }
        }
    }

    clean.then_some(tokens)
}

fn report_all(errors: &[BuntError]) {
    for e in errors {
        eprintln!("{}", e);
    }
}

fn run_file(filename: PathBuf) -> Result<()> {
    let buf = read_file(filename)?;

    let Some(tokens) = scan(&buf) else {
        debug!("Scanning failed, exiting with code 65");
        std::process::exit(65);
    };

    let mut parser = Parser::new(tokens);
    let statements = match parser.parse() {
        Ok(statements) => statements,
        Err(errors) => {
            debug!("Parsing failed with {} error(s)", errors.len());
            report_all(&errors);
            std::process::exit(65);
        }
    };

    let mut interpreter = Interpreter::new();

    if let Err(errors) = Resolver::new(&mut interpreter).resolve(&statements) {
        debug!("Resolution failed with {} error(s)", errors.len());
        report_all(&errors);
        std::process::exit(65);
    }

    match interpreter.interpret(&statements) {
        Ok(()) => {
            info!("Program executed successfully");
            Ok(())
        }
        Err(e) => {
            debug!("Runtime debug: {}", e);
            eprintln!("{}", e);
            std::process::exit(70);
        }
    }
}

/// One interpreter lives across the whole session; expression ids keep
/// counting up from line to line so resolution entries never collide.
fn repl() -> Result<()> {
    let mut interpreter = Interpreter::new();
    let mut next_expr_id: u32 = 0;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            info!("EOF on stdin, leaving repl");
            return Ok(());
        }

        if line.trim().is_empty() {
            continue;
        }

        let Some(tokens) = scan(line.as_bytes()) else {
            continue;
        };

        let mut parser = Parser::resuming_from(tokens, next_expr_id);
        let statements = match parser.parse() {
            Ok(statements) => statements,
            Err(errors) => {
                report_all(&errors);
                continue;
            }
        };
        next_expr_id = parser.next_expr_id();

        if let Err(errors) = Resolver::new(&mut interpreter).resolve(&statements) {
            report_all(&errors);
            continue;
        }

        if let Err(e) = interpreter.interpret(&statements) {
            eprintln!("{}", e);
        }
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => match filename {
            Some(filename) => {
                info!("Running Tokenize subcommand");
                let buf = read_file(filename)?;
                let mut tokenized = true;

                for token in Scanner::new(&buf) {
                    match token {
                        Ok(token) => {
                            debug!("Scanned token: {}", token);
                            println!("{}", token);
                        }

                        Err(e) => {
                            tokenized = false;
                            debug!("Tokenization debug: {}", e);
                            eprintln!("{}", e);
                        }
                    }
                }

                if !tokenized {
                    debug!("Tokenization failed, exiting with code 65");
                    std::process::exit(65);
                }

                info!("Tokenization completed successfully");
                Ok(())
            }
            None => {
                info!("No filepath provided for Tokenize");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                run_file(filename)
            }
            None => {
                info!("No filepath provided for Run");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Repl => {
            info!("Starting repl");
            repl()
        }
    }
}
