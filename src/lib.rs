//! Lumen: a small dynamically-typed expression language.
//!
//! This is the library root that exports all modules.
//!
//! # Execution Modes
//!
//! Lumen supports two execution modes over one pipeline:
//! - **Tree-walk interpreter**: direct AST interpretation, the
//!   reference semantics
//! - **Bytecode VM**: compilation to a byte-oriented instruction
//!   stream executed on a stack machine

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod span;
pub mod vm;

use error::LumenError;
use interpreter::{Interpreter, Value};
use vm::{Bytecode, Compiler, Vm};

/// Execution mode for running Lumen programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Tree-walking interpreter (reference semantics)
    TreeWalk,
    /// Bytecode virtual machine (faster)
    #[default]
    Bytecode,
}

/// Parse source code into an AST without executing.
pub fn parse(source: &str) -> Result<ast::Program, LumenError> {
    let tokens = lexer::Scanner::new(source).scan_tokens();
    let program = parser::Parser::new(tokens).parse()?;
    Ok(program)
}

/// Compile source code to bytecode without executing.
pub fn compile(source: &str) -> Result<Bytecode, LumenError> {
    let program = parse(source)?;
    let mut compiler = Compiler::new();
    compiler.compile(&program)?;
    Ok(compiler.bytecode())
}

/// Disassemble compiled bytecode to a string, nested functions included.
pub fn disassemble(bytecode: &Bytecode) -> String {
    let mut out = vm::code::disassemble(&bytecode.instructions);
    for (idx, constant) in bytecode.constants.iter().enumerate() {
        if let Value::CompiledFunction(func) = constant {
            out.push_str(&format!("-- fn constant {} --\n", idx));
            out.push_str(&vm::code::disassemble(&func.instructions));
        }
    }
    out
}

/// Run a Lumen program with the default execution mode, returning the
/// value of its last statement.
pub fn run(source: &str) -> Result<Value, LumenError> {
    run_with_options(source, ExecutionMode::default(), false)
}

/// Run a Lumen program with full control over execution options.
pub fn run_with_options(
    source: &str,
    mode: ExecutionMode,
    disassemble_output: bool,
) -> Result<Value, LumenError> {
    let program = parse(source)?;

    match mode {
        ExecutionMode::TreeWalk => {
            let mut interpreter = Interpreter::new();
            Ok(interpreter.interpret(&program)?)
        }
        ExecutionMode::Bytecode => {
            let mut compiler = Compiler::new();
            compiler.compile(&program)?;
            let bytecode = compiler.bytecode();

            if disassemble_output {
                println!("{}", disassemble(&bytecode));
                println!("---");
            }

            let mut vm = Vm::new(bytecode);
            vm.run()?;
            Ok(vm.last_popped_stack_elem())
        }
    }
}
