//! Runtime values shared by the tree-walking interpreter and the VM.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::Block;
use crate::error::RuntimeError;
use crate::interpreter::builtins::BuiltinDef;
use crate::interpreter::environment::Environment;

/// A hashable projection of a value, used as a hash-literal key.
/// Only integers, booleans, and strings are hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl HashKey {
    /// Convert a value to a key, or report it as unusable.
    pub fn from_value(value: &Value) -> Result<HashKey, RuntimeError> {
        match value {
            Value::Int(n) => Ok(HashKey::Int(*n)),
            Value::Bool(b) => Ok(HashKey::Bool(*b)),
            Value::Str(s) => Ok(HashKey::Str(s.clone())),
            other => Err(RuntimeError::UnusableHashKey(other.type_name())),
        }
    }

    /// Convert back to the value the key was built from.
    pub fn to_value(&self) -> Value {
        match self {
            HashKey::Int(n) => Value::Int(*n),
            HashKey::Bool(b) => Value::Bool(*b),
            HashKey::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashKey::Int(n) => write!(f, "{}", n),
            HashKey::Bool(b) => write!(f, "{}", b),
            HashKey::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A user function closed over its defining environment (tree-walker only).
#[derive(Debug)]
pub struct Function {
    pub params: Vec<String>,
    pub body: Block,
    pub env: Rc<RefCell<Environment>>,
}

/// A function compiled to bytecode (VM only).
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Vec<u8>,
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A compiled function paired with its captured free variables (VM only).
#[derive(Debug, Clone)]
pub struct Closure {
    pub func: Rc<CompiledFunction>,
    pub free: Vec<Value>,
}

/// A runtime value in Lumen.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    Null,
    /// Ordered, immutable element sequence. Builtins that "modify"
    /// arrays return fresh ones.
    Array(Rc<Vec<Value>>),
    /// Insertion-ordered map from hashable keys to values.
    Hash(Rc<IndexMap<HashKey, Value>>),
    /// Tree-walker closure.
    Function(Rc<Function>),
    /// Bytecode function without captures.
    CompiledFunction(Rc<CompiledFunction>),
    /// Bytecode function with captures.
    Closure(Rc<Closure>),
    /// Entry in the builtin registry.
    Builtin(&'static BuiltinDef),
}

impl Value {
    /// The stable type tag used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INTEGER",
            Value::Bool(_) => "BOOLEAN",
            Value::Str(_) => "STRING",
            Value::Null => "NULL",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "FUNCTION",
            Value::CompiledFunction(_) => "COMPILED_FUNCTION",
            Value::Closure(_) => "CLOSURE",
            Value::Builtin(_) => "BUILTIN",
        }
    }

    /// Everything except `false` and `null` is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            _ => true,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::CompiledFunction(a), Value::CompiledFunction(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Null => write!(f, "null"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "<fn({})>", func.params.join(", ")),
            Value::CompiledFunction(_) => write!(f, "<compiled fn>"),
            Value::Closure(_) => write!(f, "<closure>"),
            Value::Builtin(def) => write!(f, "<builtin {}>", def.name),
        }
    }
}
