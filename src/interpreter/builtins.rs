//! The builtin function registry.
//!
//! The table order is the VM's builtin index space: the compiler refers
//! to builtins by position here. The tree-walker resolves them by name.

use std::rc::Rc;

use crate::error::RuntimeError;
use crate::interpreter::value::Value;

pub type BuiltinFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// One entry in the registry.
#[derive(Debug)]
pub struct BuiltinDef {
    pub name: &'static str,
    pub func: BuiltinFn,
}

/// The fixed, ordered builtin registry. Indices are part of the
/// bytecode contract; only append. A `static` so every `Value::Builtin`
/// for the same entry shares one address.
pub static BUILTINS: &[BuiltinDef] = &[
    BuiltinDef {
        name: "len",
        func: builtin_len,
    },
    BuiltinDef {
        name: "puts",
        func: builtin_puts,
    },
    BuiltinDef {
        name: "first",
        func: builtin_first,
    },
    BuiltinDef {
        name: "last",
        func: builtin_last,
    },
    BuiltinDef {
        name: "rest",
        func: builtin_rest,
    },
    BuiltinDef {
        name: "push",
        func: builtin_push,
    },
];

/// Look up a builtin by name.
pub fn lookup(name: &str) -> Option<&'static BuiltinDef> {
    BUILTINS.iter().find(|def| def.name == name)
}

fn builtin_len(args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => Ok(Value::Int(elements.len() as i64)),
        Value::Str(s) => Ok(Value::Int(s.len() as i64)),
        other => Err(RuntimeError::builtin(format!(
            "argument to `len` not supported, got {}",
            other.type_name()
        ))),
    }
}

fn builtin_puts(args: &[Value]) -> Result<Value, RuntimeError> {
    for arg in args {
        println!("{}", arg);
    }
    Ok(Value::Null)
}

fn builtin_first(args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => Ok(elements.first().cloned().unwrap_or(Value::Null)),
        other => Err(RuntimeError::builtin(format!(
            "argument to `first` must be ARRAY, got {}",
            other.type_name()
        ))),
    }
}

fn builtin_last(args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => Ok(elements.last().cloned().unwrap_or(Value::Null)),
        other => Err(RuntimeError::builtin(format!(
            "argument to `last` must be ARRAY, got {}",
            other.type_name()
        ))),
    }
}

fn builtin_rest(args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => {
            if elements.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(Value::Array(Rc::new(elements[1..].to_vec())))
            }
        }
        other => Err(RuntimeError::builtin(format!(
            "argument to `rest` not supported, got {}",
            other.type_name()
        ))),
    }
}

fn builtin_push(args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 2)?;
    match &args[0] {
        Value::Array(elements) => {
            let mut next = elements.as_ref().clone();
            next.push(args[1].clone());
            Ok(Value::Array(Rc::new(next)))
        }
        other => Err(RuntimeError::builtin(format!(
            "argument to `push` must be ARRAY, got {}",
            other.type_name()
        ))),
    }
}

fn check_arity(args: &[Value], want: usize) -> Result<(), RuntimeError> {
    if args.len() != want {
        return Err(RuntimeError::builtin(format!(
            "wrong number of arguments. got={}, want={}",
            args.len(),
            want
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(values: Vec<Value>) -> Value {
        Value::Array(Rc::new(values))
    }

    #[test]
    fn test_len() {
        assert_eq!(
            builtin_len(&[Value::Str("four".to_string())]).unwrap(),
            Value::Int(4)
        );
        assert_eq!(
            builtin_len(&[array(vec![Value::Int(1), Value::Int(2)])]).unwrap(),
            Value::Int(2)
        );
        let err = builtin_len(&[Value::Int(1)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument to `len` not supported, got INTEGER"
        );
        let err = builtin_len(&[]).unwrap_err();
        assert_eq!(err.to_string(), "wrong number of arguments. got=0, want=1");
    }

    #[test]
    fn test_first_and_last() {
        assert_eq!(builtin_first(&[array(vec![])]).unwrap(), Value::Null);
        assert_eq!(builtin_last(&[array(vec![])]).unwrap(), Value::Null);
        // A single-element array yields its only element from both ends.
        let single = array(vec![Value::Int(7)]);
        assert_eq!(builtin_first(&[single.clone()]).unwrap(), Value::Int(7));
        assert_eq!(builtin_last(&[single]).unwrap(), Value::Int(7));

        let multi = array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(builtin_first(&[multi.clone()]).unwrap(), Value::Int(1));
        assert_eq!(builtin_last(&[multi]).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_rest() {
        assert_eq!(builtin_rest(&[array(vec![])]).unwrap(), Value::Null);
        assert_eq!(
            builtin_rest(&[array(vec![Value::Int(1)])]).unwrap(),
            array(vec![])
        );
        assert_eq!(
            builtin_rest(&[array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])]).unwrap(),
            array(vec![Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_push_returns_new_array() {
        let input = array(vec![Value::Int(1), Value::Int(2)]);
        let pushed = builtin_push(&[input.clone(), Value::Int(3)]).unwrap();
        assert_eq!(
            pushed,
            array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        // The input array is unchanged.
        assert_eq!(input, array(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_registry_order() {
        let names: Vec<_> = BUILTINS.iter().map(|def| def.name).collect();
        assert_eq!(names, vec!["len", "puts", "first", "last", "rest", "push"]);
        assert!(lookup("len").is_some());
        assert!(lookup("missing").is_none());
    }
}
