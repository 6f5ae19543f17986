//! Lumen CLI: execute files, evaluate snippets, or run the REPL.

use std::env;
use std::fs;
use std::process;

use colored::Colorize;

use lumen::{repl, run_with_options, ExecutionMode};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command to execute.
enum Command {
    /// Run a script file
    Run { file: String },
    /// Evaluate a string and print its value
    Eval { code: String },
    /// Start the REPL
    Repl,
}

/// CLI options parsed from arguments.
struct Options {
    command: Command,
    mode: ExecutionMode,
    disassemble: bool,
}

fn print_usage() {
    eprintln!("Lumen {}", VERSION);
    eprintln!();
    eprintln!("Usage: lumen [options] [script.lm]");
    eprintln!("       lumen -e <code>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -e <code>        Evaluate a snippet and print its value");
    eprintln!("  --treewalk       Use the tree-walking interpreter");
    eprintln!("  --disassemble    Print bytecode before executing");
    eprintln!("  -h, --help       Show this help");
    eprintln!();
    eprintln!("With no script, an interactive REPL starts.");
}

fn parse_args() -> Options {
    let mut command = Command::Repl;
    let mut mode = ExecutionMode::default();
    let mut disassemble = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "--treewalk" => mode = ExecutionMode::TreeWalk,
            "--disassemble" => disassemble = true,
            "-e" => match args.next() {
                Some(code) => command = Command::Eval { code },
                None => {
                    eprintln!("{}", "error: -e requires an argument".red());
                    process::exit(2);
                }
            },
            other if other.starts_with('-') => {
                eprintln!("{}", format!("error: unknown option {}", other).red());
                print_usage();
                process::exit(2);
            }
            file => command = Command::Run { file: file.to_string() },
        }
    }

    Options {
        command,
        mode,
        disassemble,
    }
}

fn main() {
    let options = parse_args();

    match options.command {
        Command::Run { file } => {
            let source = match fs::read_to_string(&file) {
                Ok(source) => source,
                Err(err) => {
                    eprintln!("{}", format!("error: failed to read '{}': {}", file, err).red());
                    process::exit(1);
                }
            };
            if let Err(err) = run_with_options(&source, options.mode, options.disassemble) {
                eprintln!("{}", format!("{}", err).red());
                process::exit(1);
            }
        }
        Command::Eval { code } => {
            match run_with_options(&code, options.mode, options.disassemble) {
                Ok(value) => println!("{}", value),
                Err(err) => {
                    eprintln!("{}", format!("{}", err).red());
                    process::exit(1);
                }
            }
        }
        Command::Repl => {
            println!("Lumen {} (exit with ctrl-d)", VERSION);
            if let Err(err) = repl::run(options.mode) {
                eprintln!("{}", format!("repl error: {}", err).red());
                process::exit(1);
            }
        }
    }
}
