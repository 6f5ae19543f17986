//! The tree-walking evaluator.
//!
//! This is the reference engine: the bytecode VM is tested against its
//! results. Evaluation recurses over the AST against a chain of shared
//! environments.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{BinaryOp, Block, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::error::RuntimeError;
use crate::interpreter::builtins;
use crate::interpreter::environment::Environment;
use crate::interpreter::value::{Function, HashKey, Value};

/// A non-local exit: an early `return` unwinding to the call boundary,
/// or a runtime error unwinding all the way out. Using the error
/// channel for `return` lets `?` propagate both.
pub(crate) enum Unwind {
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(err: RuntimeError) -> Self {
        Unwind::Error(err)
    }
}

type EvalResult = Result<Value, Unwind>;

/// The tree-walking interpreter.
pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            globals: Rc::new(RefCell::new(Environment::new())),
        }
    }

    /// Evaluate a program, returning the value of its last statement.
    /// The global environment persists across calls (REPL use).
    pub fn interpret(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        let env = self.globals.clone();
        let mut result = Value::Null;
        for stmt in &program.statements {
            match self.eval_stmt(stmt, &env) {
                Ok(value) => result = value,
                // A top-level `return` ends the program with its value.
                Err(Unwind::Return(value)) => return Ok(value),
                Err(Unwind::Error(err)) => return Err(err),
            }
        }
        Ok(result)
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: &Rc<RefCell<Environment>>) -> EvalResult {
        match &stmt.kind {
            StmtKind::Let { name, value } => {
                let value = self.eval_expr(value, env)?;
                env.borrow_mut().define(name.clone(), value);
                Ok(Value::Null)
            }
            StmtKind::Return(value) => {
                let value = self.eval_expr(value, env)?;
                Err(Unwind::Return(value))
            }
            StmtKind::Expression(expr) => self.eval_expr(expr, env),
        }
    }

    fn eval_block(&mut self, block: &Block, env: &Rc<RefCell<Environment>>) -> EvalResult {
        let mut result = Value::Null;
        for stmt in &block.statements {
            result = self.eval_stmt(stmt, env)?;
        }
        Ok(result)
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<RefCell<Environment>>) -> EvalResult {
        match &expr.kind {
            ExprKind::IntLiteral(n) => Ok(Value::Int(*n)),
            ExprKind::StringLiteral(s) => Ok(Value::Str(s.clone())),
            ExprKind::BoolLiteral(b) => Ok(Value::Bool(*b)),
            ExprKind::Identifier(name) => self.eval_identifier(name, env),
            ExprKind::Prefix { op, right } => {
                let right = self.eval_expr(right, env)?;
                Ok(self.eval_prefix(*op, right)?)
            }
            ExprKind::Infix { left, op, right } => {
                let left = self.eval_expr(left, env)?;
                let right = self.eval_expr(right, env)?;
                Ok(self.eval_infix(*op, left, right)?)
            }
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval_expr(condition, env)?;
                if condition.is_truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    Ok(Value::Null)
                }
            }
            ExprKind::Function { params, body } => Ok(Value::Function(Rc::new(Function {
                params: params.clone(),
                body: body.clone(),
                env: env.clone(),
            }))),
            ExprKind::Call { callee, args } => {
                let callee = self.eval_expr(callee, env)?;
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval_expr(arg, env)?);
                }
                self.apply_function(callee, evaluated)
            }
            ExprKind::Array(elements) => {
                let mut evaluated = Vec::with_capacity(elements.len());
                for element in elements {
                    evaluated.push(self.eval_expr(element, env)?);
                }
                Ok(Value::Array(Rc::new(evaluated)))
            }
            ExprKind::Index { left, index } => {
                let left = self.eval_expr(left, env)?;
                let index = self.eval_expr(index, env)?;
                Ok(self.eval_index(left, index)?)
            }
            ExprKind::Hash(pairs) => {
                let mut map = IndexMap::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = self.eval_expr(key, env)?;
                    let key = HashKey::from_value(&key).map_err(Unwind::Error)?;
                    let value = self.eval_expr(value, env)?;
                    map.insert(key, value);
                }
                Ok(Value::Hash(Rc::new(map)))
            }
        }
    }

    fn eval_identifier(&mut self, name: &str, env: &Rc<RefCell<Environment>>) -> EvalResult {
        if let Some(value) = env.borrow().get(name) {
            return Ok(value);
        }
        if let Some(def) = builtins::lookup(name) {
            return Ok(Value::Builtin(def));
        }
        Err(RuntimeError::IdentifierNotFound(name.to_string()).into())
    }

    fn eval_prefix(&mut self, op: UnaryOp, right: Value) -> Result<Value, RuntimeError> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
            UnaryOp::Neg => match right {
                Value::Int(n) => Ok(Value::Int(-n)),
                other => Err(RuntimeError::UnknownPrefixOperator {
                    op: op.to_string(),
                    operand: other.type_name(),
                }),
            },
        }
    }

    fn eval_infix(
        &mut self,
        op: BinaryOp,
        left: Value,
        right: Value,
    ) -> Result<Value, RuntimeError> {
        match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => self.eval_integer_infix(op, *a, *b),
            (Value::Bool(a), Value::Bool(b)) => match op {
                BinaryOp::Eq => Ok(Value::Bool(a == b)),
                BinaryOp::NotEq => Ok(Value::Bool(a != b)),
                _ => Err(RuntimeError::UnknownInfixOperator {
                    left: left.type_name(),
                    op: op.to_string(),
                    right: right.type_name(),
                }),
            },
            (Value::Str(a), Value::Str(b)) => match op {
                BinaryOp::Add => Ok(Value::Str(format!("{}{}", a, b))),
                _ => Err(RuntimeError::UnknownInfixOperator {
                    left: left.type_name(),
                    op: op.to_string(),
                    right: right.type_name(),
                }),
            },
            _ if left.type_name() != right.type_name() => Err(RuntimeError::TypeMismatch {
                left: left.type_name(),
                op: op.to_string(),
                right: right.type_name(),
            }),
            _ => Err(RuntimeError::UnknownInfixOperator {
                left: left.type_name(),
                op: op.to_string(),
                right: right.type_name(),
            }),
        }
    }

    fn eval_integer_infix(&mut self, op: BinaryOp, a: i64, b: i64) -> Result<Value, RuntimeError> {
        match op {
            BinaryOp::Add => Ok(Value::Int(a + b)),
            BinaryOp::Sub => Ok(Value::Int(a - b)),
            BinaryOp::Mul => Ok(Value::Int(a * b)),
            BinaryOp::Div => {
                if b == 0 {
                    Err(RuntimeError::DivisionByZero)
                } else {
                    Ok(Value::Int(a / b))
                }
            }
            BinaryOp::Less => Ok(Value::Bool(a < b)),
            BinaryOp::Greater => Ok(Value::Bool(a > b)),
            BinaryOp::Eq => Ok(Value::Bool(a == b)),
            BinaryOp::NotEq => Ok(Value::Bool(a != b)),
        }
    }

    fn eval_index(&mut self, left: Value, index: Value) -> Result<Value, RuntimeError> {
        match (&left, &index) {
            (Value::Array(elements), Value::Int(i)) => {
                if *i < 0 || *i as usize >= elements.len() {
                    Ok(Value::Null)
                } else {
                    Ok(elements[*i as usize].clone())
                }
            }
            (Value::Hash(map), key) => {
                let key = HashKey::from_value(key)?;
                Ok(map.get(&key).cloned().unwrap_or(Value::Null))
            }
            _ => Err(RuntimeError::IndexNotSupported(left.type_name())),
        }
    }

    fn apply_function(&mut self, callee: Value, args: Vec<Value>) -> EvalResult {
        match callee {
            Value::Function(func) => {
                if args.len() != func.params.len() {
                    return Err(RuntimeError::WrongNumberOfArguments {
                        want: func.params.len(),
                        got: args.len(),
                    }
                    .into());
                }
                let call_env = Rc::new(RefCell::new(Environment::with_enclosing(func.env.clone())));
                for (param, arg) in func.params.iter().zip(args) {
                    call_env.borrow_mut().define(param.clone(), arg);
                }
                match self.eval_block(&func.body, &call_env) {
                    Ok(value) => Ok(value),
                    // `return` unwinds to exactly this boundary.
                    Err(Unwind::Return(value)) => Ok(value),
                    Err(err) => Err(err),
                }
            }
            Value::Builtin(def) => Ok((def.func)(&args).map_err(Unwind::Error)?),
            other => Err(RuntimeError::NotAFunction(other.type_name()).into()),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Scanner;
    use crate::parser::Parser;

    fn eval(source: &str) -> Result<Value, RuntimeError> {
        let tokens = Scanner::new(source).scan_tokens();
        let program = Parser::new(tokens).parse().expect("parse error");
        Interpreter::new().interpret(&program)
    }

    fn eval_ok(source: &str) -> Value {
        eval(source).expect("runtime error")
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(eval_ok("5"), Value::Int(5));
        assert_eq!(eval_ok("-5"), Value::Int(-5));
        assert_eq!(eval_ok("1 + 2"), Value::Int(3));
        assert_eq!(eval_ok("2 * 2 * 2 * 2 * 2"), Value::Int(32));
        assert_eq!(eval_ok("50 / 2 * 2 + 10"), Value::Int(60));
        assert_eq!(eval_ok("(5 + 10 * 2 + 15 / 3) * 2 + -10"), Value::Int(50));
    }

    #[test]
    fn test_boolean_expressions() {
        assert_eq!(eval_ok("true"), Value::Bool(true));
        assert_eq!(eval_ok("1 < 2"), Value::Bool(true));
        assert_eq!(eval_ok("1 > 2"), Value::Bool(false));
        assert_eq!(eval_ok("1 == 1"), Value::Bool(true));
        assert_eq!(eval_ok("1 != 1"), Value::Bool(false));
        assert_eq!(eval_ok("true == true"), Value::Bool(true));
        assert_eq!(eval_ok("true != false"), Value::Bool(true));
        assert_eq!(eval_ok("(1 < 2) == true"), Value::Bool(true));
    }

    #[test]
    fn test_bang_operator() {
        assert_eq!(eval_ok("!true"), Value::Bool(false));
        assert_eq!(eval_ok("!5"), Value::Bool(false));
        assert_eq!(eval_ok("!!true"), Value::Bool(true));
        assert_eq!(eval_ok("!!5"), Value::Bool(true));
    }

    #[test]
    fn test_if_else() {
        assert_eq!(eval_ok("if (true) { 10 }"), Value::Int(10));
        assert_eq!(eval_ok("if (false) { 10 }"), Value::Null);
        assert_eq!(eval_ok("if (1) { 10 }"), Value::Int(10));
        assert_eq!(eval_ok("if (1 > 2) { 10 } else { 20 }"), Value::Int(20));
        assert_eq!(eval_ok("if (1 < 2) { 10 } else { 20 }"), Value::Int(10));
    }

    #[test]
    fn test_return_statements() {
        assert_eq!(eval_ok("return 10; 9;"), Value::Int(10));
        assert_eq!(eval_ok("2 * 5; return 10; 9;"), Value::Int(10));
        // Return unwinds out of nested blocks.
        assert_eq!(
            eval_ok("if (10 > 1) { if (10 > 1) { return 10; } return 1; }"),
            Value::Int(10)
        );
    }

    #[test]
    fn test_let_statements() {
        assert_eq!(eval_ok("let a = 5; a;"), Value::Int(5));
        assert_eq!(eval_ok("let a = 5 * 5; a;"), Value::Int(25));
        assert_eq!(eval_ok("let a = 5; let b = a; b;"), Value::Int(5));
        assert_eq!(
            eval_ok("let a = 5; let b = a; let c = a + b + 5; c;"),
            Value::Int(15)
        );
    }

    #[test]
    fn test_functions_and_calls() {
        assert_eq!(
            eval_ok("let identity = fn(x) { x; }; identity(5);"),
            Value::Int(5)
        );
        assert_eq!(
            eval_ok("let identity = fn(x) { return x; }; identity(5);"),
            Value::Int(5)
        );
        assert_eq!(
            eval_ok("let add = fn(a, b) { a + b }; add(5, 10)"),
            Value::Int(15)
        );
        assert_eq!(
            eval_ok("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));"),
            Value::Int(20)
        );
        assert_eq!(eval_ok("fn(x) { x; }(5)"), Value::Int(5));
    }

    #[test]
    fn test_closures() {
        assert_eq!(
            eval_ok(
                "let newAdder = fn(x) { fn(y) { x + y }; };
                 let addTwo = newAdder(2);
                 addTwo(2);"
            ),
            Value::Int(4)
        );
    }

    #[test]
    fn test_recursion() {
        assert_eq!(
            eval_ok(
                "let fib = fn(n) { if (n < 2) { n } else { fib(n - 1) + fib(n - 2) } };
                 fib(10)"
            ),
            Value::Int(55)
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            eval_ok("\"hello\" + \" \" + \"world\""),
            Value::Str("hello world".to_string())
        );
    }

    #[test]
    fn test_arrays() {
        assert_eq!(
            eval_ok("[1, 2 * 2, 3 + 3]"),
            Value::Array(Rc::new(vec![Value::Int(1), Value::Int(4), Value::Int(6)]))
        );
        assert_eq!(eval_ok("[1, 2, 3][1]"), Value::Int(2));
        assert_eq!(eval_ok("[1, 2, 3][0]"), Value::Int(1));
        assert_eq!(eval_ok("let i = 0; [1][i];"), Value::Int(1));
        assert_eq!(eval_ok("[1][3]"), Value::Null);
        assert_eq!(eval_ok("[1][-1]"), Value::Null);
    }

    #[test]
    fn test_hashes() {
        assert_eq!(eval_ok("{\"a\": 1, \"b\": 2}[\"b\"]"), Value::Int(2));
        assert_eq!(eval_ok("{}[1]"), Value::Null);
        assert_eq!(eval_ok("{1: 1, 2: 2}[2]"), Value::Int(2));
        assert_eq!(eval_ok("{true: 5}[true]"), Value::Int(5));
        assert_eq!(
            eval_ok("let key = \"foo\"; {\"foo\": 5}[key]"),
            Value::Int(5)
        );
    }

    #[test]
    fn test_builtin_functions() {
        assert_eq!(eval_ok("len(\"four\")"), Value::Int(4));
        assert_eq!(eval_ok("len([1, 2, 3])"), Value::Int(3));
        assert_eq!(eval_ok("first([])"), Value::Null);
        assert_eq!(eval_ok("first([7])"), Value::Int(7));
        assert_eq!(eval_ok("last([7])"), Value::Int(7));
        assert_eq!(
            eval_ok("push([1, 2], 3)"),
            Value::Array(Rc::new(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
        );
    }

    #[test]
    fn test_error_messages() {
        let cases = [
            ("5 + true;", "type mismatch: INTEGER + BOOLEAN"),
            ("-true", "unknown operator: -BOOLEAN"),
            ("true + false;", "unknown operator: BOOLEAN + BOOLEAN"),
            ("\"a\" - \"b\"", "unknown operator: STRING - STRING"),
            ("foobar", "identifier not found: foobar"),
            ("{\"k\": 1}[fn(x) { x }]", "unusable as hash key: FUNCTION"),
            ("5[0]", "index operator not supported: INTEGER"),
            ("5(1)", "not a function: INTEGER"),
            ("fn() { 1 }(1)", "wrong number of arguments: want=0, got=1"),
            ("1 / 0", "division by zero"),
        ];
        for (source, expected) in cases {
            let err = eval(source).expect_err(source);
            assert_eq!(err.to_string(), expected, "source: {}", source);
        }
    }

    #[test]
    fn test_error_short_circuits() {
        // The error from the condition propagates before the body runs.
        let err = eval("if (5 + true) { 10 }").unwrap_err();
        assert_eq!(err.to_string(), "type mismatch: INTEGER + BOOLEAN");
        // An error inside a nested call unwinds the whole evaluation.
        let err = eval("let f = fn() { -true }; f() + 1").unwrap_err();
        assert_eq!(err.to_string(), "unknown operator: -BOOLEAN");
    }

    #[test]
    fn test_globals_persist_across_interpret_calls() {
        let mut interpreter = Interpreter::new();
        let run = |interp: &mut Interpreter, src: &str| {
            let tokens = Scanner::new(src).scan_tokens();
            let program = Parser::new(tokens).parse().unwrap();
            interp.interpret(&program).unwrap()
        };
        run(&mut interpreter, "let a = 7;");
        assert_eq!(run(&mut interpreter, "a + 1"), Value::Int(8));
    }
}
