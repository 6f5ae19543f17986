//! Interactive REPL.
//!
//! Each line runs the full pipeline. In bytecode mode the symbol table,
//! constant pool, and globals persist across lines; in tree-walk mode a
//! single interpreter keeps its global environment.

use std::path::PathBuf;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::interpreter::{Interpreter, Value};
use crate::lexer::Scanner;
use crate::parser::Parser;
use crate::vm::vm::GLOBALS_SIZE;
use crate::vm::{Compiler, SymbolTable, Vm};
use crate::ExecutionMode;

const PROMPT: &str = ">> ";
const HISTORY_FILE: &str = ".lumen_history";

/// Run the REPL until EOF or interrupt.
pub fn run(mode: ExecutionMode) -> rustyline::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let history_file = history_path();
    let _ = editor.load_history(&history_file);

    let mut session = Session::new(mode);

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                session.eval_line(&line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("readline error: {}", err).red());
                break;
            }
        }
    }

    let _ = editor.save_history(&history_file);
    Ok(())
}

fn history_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(HISTORY_FILE),
        None => PathBuf::from(HISTORY_FILE),
    }
}

/// REPL state that survives across lines.
enum Session {
    TreeWalk(Interpreter),
    Bytecode {
        symbol_table: SymbolTable,
        constants: Vec<Value>,
        globals: Vec<Value>,
    },
}

impl Session {
    fn new(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::TreeWalk => Session::TreeWalk(Interpreter::new()),
            ExecutionMode::Bytecode => {
                // Seed from a fresh compiler so the builtins are defined.
                let (symbol_table, constants) = Compiler::new().into_state();
                Session::Bytecode {
                    symbol_table,
                    constants,
                    globals: vec![Value::Null; GLOBALS_SIZE],
                }
            }
        }
    }

    fn eval_line(&mut self, line: &str) {
        let tokens = Scanner::new(line).scan_tokens();
        let program = match Parser::new(tokens).parse() {
            Ok(program) => program,
            Err(errors) => {
                for err in &errors.0 {
                    eprintln!("{}", format!("parse error: {}", err).red());
                }
                return;
            }
        };

        match self {
            Session::TreeWalk(interpreter) => match interpreter.interpret(&program) {
                Ok(value) => println!("{}", value),
                Err(err) => eprintln!("{}", format!("runtime error: {}", err).red()),
            },
            Session::Bytecode {
                symbol_table,
                constants,
                globals,
            } => {
                let mut compiler =
                    Compiler::with_state(std::mem::take(symbol_table), std::mem::take(constants));
                let result = compiler.compile(&program);
                let bytecode = compiler.bytecode();
                let (table, consts) = compiler.into_state();
                *symbol_table = table;
                *constants = consts;

                if let Err(err) = result {
                    eprintln!("{}", format!("compile error: {}", err).red());
                    return;
                }

                let mut vm = Vm::with_globals_store(bytecode, std::mem::take(globals));
                match vm.run() {
                    Ok(()) => println!("{}", vm.last_popped_stack_elem()),
                    Err(err) => eprintln!("{}", format!("runtime error: {}", err).red()),
                }
                *globals = vm.into_globals();
            }
        }
    }
}
