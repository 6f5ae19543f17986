//! AST-to-bytecode compiler.
//!
//! Single pass: walks the AST depth-first, emitting instructions into
//! the current compilation scope and values into the constant pool.
//! Each function literal gets its own scope; closing a scope yields the
//! function's instruction slice.

use std::rc::Rc;

use crate::ast::{BinaryOp, Block, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::error::CompileError;
use crate::interpreter::builtins::BUILTINS;
use crate::interpreter::value::{CompiledFunction, Value};
use crate::vm::code::{self, Opcode};
use crate::vm::symbol_table::{Symbol, SymbolScope, SymbolTable};

pub type CompileResult<T> = Result<T, CompileError>;

/// The compiler's product: an instruction stream plus its constant pool.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub instructions: Vec<u8>,
    pub constants: Vec<Value>,
}

/// The opcode and byte position of an emitted instruction, tracked for
/// peephole fixups.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

/// One instruction buffer: the top level or a function body.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Vec<u8>,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

/// The compiler: transforms an AST into `Bytecode`.
pub struct Compiler {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, def) in BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(index, def.name);
        }
        Self::with_state(symbol_table, Vec::new())
    }

    /// Resume with an existing symbol table and constant pool (REPL:
    /// each line compiles with the accumulated state of the session).
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Compile a program into the current scope.
    pub fn compile(&mut self, program: &Program) -> CompileResult<()> {
        for stmt in &program.statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    /// The compiled artifact for the main scope.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.scopes[0].instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    /// Hand the session state back for the next `with_state` call.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Let { name, value } => {
                // Defined before the value compiles so the name resolves
                // inside its own function body (global recursion).
                let symbol = self.symbol_table.define(name);
                self.compile_expr(value)?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::SetGlobal, &[symbol.index]),
                    _ => self.emit(Opcode::SetLocal, &[symbol.index]),
                };
                Ok(())
            }
            StmtKind::Return(value) => {
                self.compile_expr(value)?;
                self.emit(Opcode::ReturnValue, &[]);
                Ok(())
            }
            StmtKind::Expression(expr) => {
                self.compile_expr(expr)?;
                self.emit(Opcode::Pop, &[]);
                Ok(())
            }
        }
    }

    fn compile_block(&mut self, block: &Block) -> CompileResult<()> {
        for stmt in &block.statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::IntLiteral(n) => {
                let idx = self.add_constant(Value::Int(*n));
                self.emit(Opcode::Constant, &[idx]);
            }
            ExprKind::StringLiteral(s) => {
                let idx = self.add_constant(Value::Str(s.clone()));
                self.emit(Opcode::Constant, &[idx]);
            }
            ExprKind::BoolLiteral(true) => {
                self.emit(Opcode::True, &[]);
            }
            ExprKind::BoolLiteral(false) => {
                self.emit(Opcode::False, &[]);
            }
            ExprKind::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.load_symbol(&symbol);
            }
            ExprKind::Prefix { op, right } => {
                self.compile_expr(right)?;
                match op {
                    UnaryOp::Neg => self.emit(Opcode::Minus, &[]),
                    UnaryOp::Not => self.emit(Opcode::Bang, &[]),
                };
            }
            ExprKind::Infix { left, op, right } => {
                // `<` reuses OpGreaterThan with swapped operand order.
                if *op == BinaryOp::Less {
                    self.compile_expr(right)?;
                    self.compile_expr(left)?;
                    self.emit(Opcode::GreaterThan, &[]);
                    return Ok(());
                }
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                match op {
                    BinaryOp::Add => self.emit(Opcode::Add, &[]),
                    BinaryOp::Sub => self.emit(Opcode::Sub, &[]),
                    BinaryOp::Mul => self.emit(Opcode::Mul, &[]),
                    BinaryOp::Div => self.emit(Opcode::Div, &[]),
                    BinaryOp::Greater => self.emit(Opcode::GreaterThan, &[]),
                    BinaryOp::Eq => self.emit(Opcode::Equal, &[]),
                    BinaryOp::NotEq => self.emit(Opcode::NotEqual, &[]),
                    BinaryOp::Less => unreachable!("handled above"),
                };
            }
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expr(condition)?;
                // Placeholder target, patched once the consequence ends.
                let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[9999]);

                self.compile_block(consequence)?;
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last_pop();
                }

                let jump = self.emit(Opcode::Jump, &[9999]);
                let after_consequence = self.current_instructions().len();
                self.change_operand(jump_not_truthy, after_consequence);

                match alternative {
                    Some(alternative) => {
                        self.compile_block(alternative)?;
                        if self.last_instruction_is(Opcode::Pop) {
                            self.remove_last_pop();
                        }
                    }
                    None => {
                        self.emit(Opcode::Null, &[]);
                    }
                }
                let after_alternative = self.current_instructions().len();
                self.change_operand(jump, after_alternative);
            }
            ExprKind::Function { params, body } => {
                self.enter_scope();
                for param in params {
                    self.symbol_table.define(param);
                }
                self.compile_block(body)?;

                // Implicit return of the last expression; bodies that end
                // some other way fall back to returning null.
                if self.last_instruction_is(Opcode::Pop) {
                    self.replace_last_pop_with_return();
                }
                if !self.last_instruction_is(Opcode::ReturnValue) {
                    self.emit(Opcode::Return, &[]);
                }

                let free_symbols = self.symbol_table.free_symbols.clone();
                let num_locals = self.symbol_table.num_definitions;
                let instructions = self.leave_scope();

                let func = Value::CompiledFunction(Rc::new(CompiledFunction {
                    instructions,
                    num_locals,
                    num_parameters: params.len(),
                }));
                let idx = self.add_constant(func);

                if free_symbols.is_empty() {
                    self.emit(Opcode::Constant, &[idx]);
                } else {
                    for symbol in &free_symbols {
                        self.load_symbol(symbol);
                    }
                    self.emit(Opcode::Closure, &[idx, free_symbols.len()]);
                }
            }
            ExprKind::Call { callee, args } => {
                self.compile_expr(callee)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.emit(Opcode::Call, &[args.len()]);
            }
            ExprKind::Array(elements) => {
                for element in elements {
                    self.compile_expr(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }
            ExprKind::Hash(pairs) => {
                // Pairs compile in source order; the operand counts the
                // pushed values, two per pair.
                for (key, value) in pairs {
                    self.compile_expr(key)?;
                    self.compile_expr(value)?;
                }
                self.emit(Opcode::Hash, &[pairs.len() * 2]);
            }
            ExprKind::Index { left, index } => {
                self.compile_expr(left)?;
                self.compile_expr(index)?;
                self.emit(Opcode::Index, &[]);
            }
        }
        Ok(())
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Opcode::GetFree, &[symbol.index]),
        };
    }

    // ===== Emission =====

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = code::make(op, operands);
        let position = self.add_instruction(&instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn add_instruction(&mut self, instruction: &[u8]) -> usize {
        let scope = self.current_scope_mut();
        let position = scope.instructions.len();
        scope.instructions.extend_from_slice(instruction);
        position
    }

    fn set_last_instruction(&mut self, opcode: Opcode, position: usize) {
        let scope = self.current_scope_mut();
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode, position });
    }

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    // ===== Peephole fixups =====

    fn last_instruction_is(&self, op: Opcode) -> bool {
        self.current_scope()
            .last_instruction
            .map(|last| last.opcode == op)
            .unwrap_or(false)
    }

    /// Drop the trailing OpPop (an if-arm keeps its value on the stack).
    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        let last = scope.last_instruction.expect("no instruction to remove");
        scope.instructions.truncate(last.position);
        scope.last_instruction = scope.previous_instruction.take();
    }

    /// Rewrite the trailing OpPop into OpReturnValue (implicit return of
    /// a function body's last expression).
    fn replace_last_pop_with_return(&mut self) {
        let position = self
            .current_scope()
            .last_instruction
            .expect("no instruction to replace")
            .position;
        let instruction = code::make(Opcode::ReturnValue, &[]);
        self.replace_instruction(position, &instruction);
        if let Some(last) = self.current_scope_mut().last_instruction.as_mut() {
            last.opcode = Opcode::ReturnValue;
        }
    }

    /// Re-encode the instruction at `position` with a new operand.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let op = Opcode::from_u8(self.current_instructions()[position])
            .expect("patching an undefined opcode");
        let instruction = code::make(op, &[operand]);
        self.replace_instruction(position, &instruction);
    }

    fn replace_instruction(&mut self, position: usize, instruction: &[u8]) {
        let instructions = &mut self.current_scope_mut().instructions;
        instructions[position..position + instruction.len()].copy_from_slice(instruction);
    }

    // ===== Scopes =====

    fn current_scope(&self) -> &CompilationScope {
        self.scopes.last().expect("no compilation scope")
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("no compilation scope")
    }

    fn current_instructions(&self) -> &[u8] {
        &self.current_scope().instructions
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::enclosed(outer);
    }

    fn leave_scope(&mut self) -> Vec<u8> {
        let scope = self.scopes.pop().expect("no scope to leave");
        let table = std::mem::take(&mut self.symbol_table);
        self.symbol_table = table.into_outer().expect("leaving the outermost scope");
        scope.instructions
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Scanner;
    use crate::parser::Parser;
    use crate::vm::code::{disassemble, make};

    fn compile(source: &str) -> Bytecode {
        let tokens = Scanner::new(source).scan_tokens();
        let program = Parser::new(tokens).parse().expect("parse error");
        let mut compiler = Compiler::new();
        compiler.compile(&program).expect("compile error");
        compiler.bytecode()
    }

    fn concat(instructions: Vec<Vec<u8>>) -> Vec<u8> {
        instructions.into_iter().flatten().collect()
    }

    fn assert_instructions(source: &str, expected: Vec<Vec<u8>>) {
        let bytecode = compile(source);
        let expected = concat(expected);
        assert_eq!(
            bytecode.instructions,
            expected,
            "source: {}\nwant:\n{}\ngot:\n{}",
            source,
            disassemble(&expected),
            disassemble(&bytecode.instructions),
        );
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_instructions(
            "1 + 2",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::Pop, &[]),
            ],
        );
        assert_instructions(
            "1; 2",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Pop, &[]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Pop, &[]),
            ],
        );
        assert_instructions(
            "-1",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Minus, &[]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_boolean_expressions() {
        assert_instructions(
            "true",
            vec![make(Opcode::True, &[]), make(Opcode::Pop, &[])],
        );
        assert_instructions(
            "1 > 2",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::GreaterThan, &[]),
                make(Opcode::Pop, &[]),
            ],
        );
        assert_instructions(
            "!true",
            vec![
                make(Opcode::True, &[]),
                make(Opcode::Bang, &[]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_less_than_swaps_operands() {
        // 1 < 2 compiles the right side first, then OpGreaterThan.
        let bytecode = compile("1 < 2");
        assert_eq!(bytecode.constants, vec![Value::Int(2), Value::Int(1)]);
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::GreaterThan, &[]),
                make(Opcode::Pop, &[]),
            ])
        );
    }

    #[test]
    fn test_conditional_without_alternative() {
        assert_instructions(
            "if (true) { 10 }; 3333;",
            vec![
                // 0000
                make(Opcode::True, &[]),
                // 0001
                make(Opcode::JumpNotTruthy, &[10]),
                // 0004
                make(Opcode::Constant, &[0]),
                // 0007
                make(Opcode::Jump, &[11]),
                // 0010
                make(Opcode::Null, &[]),
                // 0011
                make(Opcode::Pop, &[]),
                // 0012
                make(Opcode::Constant, &[1]),
                // 0015
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_conditional_with_alternative() {
        assert_instructions(
            "if (true) { 10 } else { 20 }; 3333;",
            vec![
                // 0000
                make(Opcode::True, &[]),
                // 0001
                make(Opcode::JumpNotTruthy, &[10]),
                // 0004
                make(Opcode::Constant, &[0]),
                // 0007
                make(Opcode::Jump, &[13]),
                // 0010
                make(Opcode::Constant, &[1]),
                // 0013
                make(Opcode::Pop, &[]),
                // 0014
                make(Opcode::Constant, &[2]),
                // 0017
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_global_let_statements() {
        assert_instructions(
            "let one = 1; let two = 2;",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::SetGlobal, &[1]),
            ],
        );
        assert_instructions(
            "let one = 1; one;",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_string_expressions() {
        let bytecode = compile("\"lu\" + \"men\"");
        assert_eq!(
            bytecode.constants,
            vec![Value::Str("lu".to_string()), Value::Str("men".to_string())]
        );
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::Pop, &[]),
            ])
        );
    }

    #[test]
    fn test_array_literals() {
        assert_instructions(
            "[]",
            vec![make(Opcode::Array, &[0]), make(Opcode::Pop, &[])],
        );
        assert_instructions(
            "[1, 2, 3]",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Constant, &[2]),
                make(Opcode::Array, &[3]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_hash_literals() {
        assert_instructions(
            "{}",
            vec![make(Opcode::Hash, &[0]), make(Opcode::Pop, &[])],
        );
        // Pairs compile in source order, key then value.
        assert_instructions(
            "{1: 2, 3: 4}",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Constant, &[2]),
                make(Opcode::Constant, &[3]),
                make(Opcode::Hash, &[4]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_index_expressions() {
        assert_instructions(
            "[1, 2][1]",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Array, &[2]),
                make(Opcode::Constant, &[2]),
                make(Opcode::Index, &[]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_functions() {
        // Explicit and implicit returns compile identically.
        for source in ["fn() { return 5 + 10 }", "fn() { 5 + 10 }"] {
            let bytecode = compile(source);
            assert_eq!(bytecode.constants.len(), 3, "source: {}", source);
            match &bytecode.constants[2] {
                Value::CompiledFunction(func) => {
                    assert_eq!(
                        func.instructions,
                        concat(vec![
                            make(Opcode::Constant, &[0]),
                            make(Opcode::Constant, &[1]),
                            make(Opcode::Add, &[]),
                            make(Opcode::ReturnValue, &[]),
                        ]),
                        "source: {}",
                        source
                    );
                    assert_eq!(func.num_locals, 0);
                    assert_eq!(func.num_parameters, 0);
                }
                other => panic!("expected compiled function, got {:?}", other),
            }
            assert_eq!(
                bytecode.instructions,
                concat(vec![make(Opcode::Constant, &[2]), make(Opcode::Pop, &[])])
            );
        }
    }

    #[test]
    fn test_empty_function_returns_null() {
        let bytecode = compile("fn() { }");
        match &bytecode.constants[0] {
            Value::CompiledFunction(func) => {
                assert_eq!(func.instructions, make(Opcode::Return, &[]));
            }
            other => panic!("expected compiled function, got {:?}", other),
        }
    }

    #[test]
    fn test_function_calls() {
        assert_instructions(
            "fn() { 24 }();",
            vec![
                make(Opcode::Constant, &[1]),
                make(Opcode::Call, &[0]),
                make(Opcode::Pop, &[]),
            ],
        );
        assert_instructions(
            "let oneArg = fn(a) { a }; oneArg(24);",
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Call, &[1]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_let_scopes() {
        // A global referenced from a function body stays a global.
        let bytecode = compile("let num = 55; fn() { num }");
        match &bytecode.constants[1] {
            Value::CompiledFunction(func) => {
                assert_eq!(
                    func.instructions,
                    concat(vec![
                        make(Opcode::GetGlobal, &[0]),
                        make(Opcode::ReturnValue, &[]),
                    ])
                );
            }
            other => panic!("expected compiled function, got {:?}", other),
        }

        // A let inside a function allocates a local slot.
        let bytecode = compile("fn() { let num = 55; num }");
        match &bytecode.constants[1] {
            Value::CompiledFunction(func) => {
                assert_eq!(
                    func.instructions,
                    concat(vec![
                        make(Opcode::Constant, &[0]),
                        make(Opcode::SetLocal, &[0]),
                        make(Opcode::GetLocal, &[0]),
                        make(Opcode::ReturnValue, &[]),
                    ])
                );
                assert_eq!(func.num_locals, 1);
            }
            other => panic!("expected compiled function, got {:?}", other),
        }
    }

    #[test]
    fn test_builtins_resolve_by_registry_index() {
        assert_instructions(
            "len([]);",
            vec![
                make(Opcode::GetBuiltin, &[0]),
                make(Opcode::Array, &[0]),
                make(Opcode::Call, &[1]),
                make(Opcode::Pop, &[]),
            ],
        );
        assert_instructions(
            "push([], 1);",
            vec![
                make(Opcode::GetBuiltin, &[5]),
                make(Opcode::Array, &[0]),
                make(Opcode::Constant, &[0]),
                make(Opcode::Call, &[2]),
                make(Opcode::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_closures() {
        let bytecode = compile("fn(a) { fn(b) { a + b } }");

        // Inner function: `a` is free, `b` is local.
        match &bytecode.constants[0] {
            Value::CompiledFunction(func) => {
                assert_eq!(
                    func.instructions,
                    concat(vec![
                        make(Opcode::GetFree, &[0]),
                        make(Opcode::GetLocal, &[0]),
                        make(Opcode::Add, &[]),
                        make(Opcode::ReturnValue, &[]),
                    ])
                );
            }
            other => panic!("expected compiled function, got {:?}", other),
        }

        // Outer function pushes the captured local, then OpClosure.
        match &bytecode.constants[1] {
            Value::CompiledFunction(func) => {
                assert_eq!(
                    func.instructions,
                    concat(vec![
                        make(Opcode::GetLocal, &[0]),
                        make(Opcode::Closure, &[0, 1]),
                        make(Opcode::ReturnValue, &[]),
                    ])
                );
            }
            other => panic!("expected compiled function, got {:?}", other),
        }

        // The outer function captures nothing, so it loads as a constant.
        assert_eq!(
            bytecode.instructions,
            concat(vec![make(Opcode::Constant, &[1]), make(Opcode::Pop, &[])])
        );
    }

    #[test]
    fn test_undefined_variable() {
        let tokens = Scanner::new("foobar").scan_tokens();
        let program = Parser::new(tokens).parse().unwrap();
        let err = Compiler::new().compile(&program).unwrap_err();
        assert_eq!(err.to_string(), "undefined variable foobar");
    }

    #[test]
    fn test_compilation_scopes() {
        let mut compiler = Compiler::new();
        compiler.emit(Opcode::Mul, &[]);

        compiler.enter_scope();
        compiler.emit(Opcode::Sub, &[]);
        assert_eq!(compiler.current_instructions().len(), 1);
        assert!(compiler.last_instruction_is(Opcode::Sub));

        let instructions = compiler.leave_scope();
        assert_eq!(instructions, make(Opcode::Sub, &[]));
        assert!(compiler.last_instruction_is(Opcode::Mul));

        compiler.emit(Opcode::Add, &[]);
        assert_eq!(compiler.current_instructions().len(), 2);
        assert!(compiler.last_instruction_is(Opcode::Add));
    }
}
