//! The bytecode virtual machine: a stack machine with call frames,
//! globals, and a fixed-size value stack.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::interpreter::builtins::BUILTINS;
use crate::interpreter::value::{Closure, CompiledFunction, HashKey, Value};
use crate::vm::code::{self, Opcode};
use crate::vm::compiler::Bytecode;
use crate::vm::frame::Frame;

/// Value stack depth.
pub const STACK_SIZE: usize = 2048;
/// Global variable slots.
pub const GLOBALS_SIZE: usize = 65536;
/// Call frame depth.
pub const MAX_FRAMES: usize = 1024;

/// The virtual machine. One instance owns its stack, globals, and
/// frames exclusively; nothing is shared between instances.
pub struct Vm {
    constants: Vec<Value>,
    stack: Vec<Value>,
    /// Points at the next free slot; the top of the stack is
    /// `stack[sp - 1]`. Popping leaves the old value in place above
    /// `sp`, which is what `last_popped_stack_elem` reads.
    sp: usize,
    globals: Vec<Value>,
    frames: Vec<Frame>,
}

impl Vm {
    pub fn new(bytecode: Bytecode) -> Self {
        Self::with_globals_store(bytecode, vec![Value::Null; GLOBALS_SIZE])
    }

    /// Build a VM reusing an existing globals store. The REPL threads
    /// the globals of the previous line through this; ownership
    /// transfers to the new VM.
    pub fn with_globals_store(bytecode: Bytecode, globals: Vec<Value>) -> Self {
        let main_func = Rc::new(CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        });
        let main_closure = Rc::new(Closure {
            func: main_func,
            free: Vec::new(),
        });
        let mut frames = Vec::with_capacity(MAX_FRAMES);
        frames.push(Frame::new(main_closure, 0));

        Self {
            constants: bytecode.constants,
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames,
        }
    }

    /// Hand the globals back for the next `with_globals_store` call.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The value the final OpPop consumed: the slot just above the top
    /// of the stack.
    pub fn last_popped_stack_elem(&self) -> Value {
        self.stack[self.sp].clone()
    }

    /// Run the main frame to completion.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.current_frame().ip < self.current_frame().instructions().len() as isize - 1 {
            self.current_frame_mut().ip += 1;

            let frame = self.current_frame();
            let ip = frame.ip as usize;
            let byte = frame.instructions()[ip];
            let Some(op) = Opcode::from_u8(byte) else {
                return Err(RuntimeError::builtin(format!("opcode {} undefined", byte)));
            };

            match op {
                Opcode::Constant => {
                    let idx = self.read_u16_operand();
                    let value = self.constants[idx].clone();
                    self.push(value)?;
                }
                Opcode::Pop => {
                    self.pop();
                }
                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    self.execute_binary_operation(op)?;
                }
                Opcode::True => self.push(Value::Bool(true))?,
                Opcode::False => self.push(Value::Bool(false))?,
                Opcode::Equal | Opcode::NotEqual | Opcode::GreaterThan => {
                    self.execute_comparison(op)?;
                }
                Opcode::Minus => {
                    let operand = self.pop();
                    match operand {
                        Value::Int(n) => self.push(Value::Int(-n))?,
                        other => {
                            return Err(RuntimeError::UnsupportedMinus(other.type_name()));
                        }
                    }
                }
                Opcode::Bang => {
                    let operand = self.pop();
                    self.push(Value::Bool(!operand.is_truthy()))?;
                }
                Opcode::Jump => {
                    let target = self.read_u16_operand();
                    // -1 compensates the loop's pre-increment.
                    self.current_frame_mut().ip = target as isize - 1;
                }
                Opcode::JumpNotTruthy => {
                    let target = self.read_u16_operand();
                    let condition = self.pop();
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target as isize - 1;
                    }
                }
                Opcode::Null => self.push(Value::Null)?,
                Opcode::SetGlobal => {
                    let idx = self.read_u16_operand();
                    self.globals[idx] = self.pop();
                }
                Opcode::GetGlobal => {
                    let idx = self.read_u16_operand();
                    let value = self.globals[idx].clone();
                    self.push(value)?;
                }
                Opcode::SetLocal => {
                    let idx = self.read_u16_operand();
                    let base = self.current_frame().base_pointer;
                    self.stack[base + idx] = self.pop();
                }
                Opcode::GetLocal => {
                    let idx = self.read_u16_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack[base + idx].clone();
                    self.push(value)?;
                }
                Opcode::Array => {
                    let count = self.read_u16_operand();
                    let elements = self.stack[self.sp - count..self.sp].to_vec();
                    self.sp -= count;
                    self.push(Value::Array(Rc::new(elements)))?;
                }
                Opcode::Hash => {
                    let count = self.read_u16_operand();
                    let hash = self.build_hash(self.sp - count, self.sp)?;
                    self.sp -= count;
                    self.push(hash)?;
                }
                Opcode::Index => {
                    let index = self.pop();
                    let left = self.pop();
                    let value = self.execute_index(left, index)?;
                    self.push(value)?;
                }
                Opcode::Call => {
                    let num_args = self.read_u16_operand();
                    self.execute_call(num_args)?;
                }
                Opcode::ReturnValue => {
                    let return_value = self.pop();
                    let frame = self.frames.pop().expect("no frame to pop");
                    if self.frames.is_empty() {
                        // Top-level return: execution ends with the value
                        // readable as the last-popped element.
                        self.stack[self.sp] = return_value;
                        return Ok(());
                    }
                    // Drops the callee and its arguments in one move.
                    self.sp = frame.base_pointer - 1;
                    self.push(return_value)?;
                }
                Opcode::Return => {
                    let frame = self.frames.pop().expect("no frame to pop");
                    if self.frames.is_empty() {
                        self.stack[self.sp] = Value::Null;
                        return Ok(());
                    }
                    self.sp = frame.base_pointer - 1;
                    self.push(Value::Null)?;
                }
                Opcode::GetBuiltin => {
                    let idx = self.read_u16_operand();
                    self.push(Value::Builtin(&BUILTINS[idx]))?;
                }
                Opcode::Closure => {
                    let (const_idx, num_free) = self.read_two_u16_operands();
                    self.push_closure(const_idx, num_free)?;
                }
                Opcode::GetFree => {
                    let idx = self.read_u16_operand();
                    let value = self.current_frame().closure.free[idx].clone();
                    self.push(value)?;
                }
            }
        }
        Ok(())
    }

    // ===== Operand reading =====

    fn read_u16_operand(&mut self) -> usize {
        let frame = self.frames.last_mut().expect("no current frame");
        let ip = frame.ip as usize;
        let value = code::read_u16(&frame.closure.func.instructions[ip + 1..]) as usize;
        frame.ip += 2;
        value
    }

    fn read_two_u16_operands(&mut self) -> (usize, usize) {
        let first = self.read_u16_operand();
        let second = self.read_u16_operand();
        (first, second)
    }

    // ===== Stack discipline =====

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    /// Pop without clearing the vacated slot: tests and the REPL read
    /// the last-popped value at `stack[sp]`.
    fn pop(&mut self) -> Value {
        self.sp -= 1;
        self.stack[self.sp].clone()
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("no current frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no current frame")
    }

    // ===== Operations =====

    fn execute_binary_operation(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop();
        let left = self.pop();
        let result = match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => match op {
                Opcode::Add => Value::Int(a + b),
                Opcode::Sub => Value::Int(a - b),
                Opcode::Mul => Value::Int(a * b),
                Opcode::Div => {
                    if *b == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    Value::Int(a / b)
                }
                _ => unreachable!("non-arithmetic opcode in binary operation"),
            },
            (Value::Str(a), Value::Str(b)) => match op {
                Opcode::Add => Value::Str(format!("{}{}", a, b)),
                _ => {
                    return Err(RuntimeError::UnknownStringOperator(
                        operator_symbol(op).to_string(),
                    ));
                }
            },
            _ => {
                return Err(RuntimeError::UnsupportedBinaryTypes(
                    left.type_name(),
                    right.type_name(),
                ));
            }
        };
        self.push(result)
    }

    fn execute_comparison(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop();
        let left = self.pop();
        let result = match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => match op {
                Opcode::Equal => a == b,
                Opcode::NotEqual => a != b,
                Opcode::GreaterThan => a > b,
                _ => unreachable!("non-comparison opcode in comparison"),
            },
            (Value::Bool(a), Value::Bool(b)) => match op {
                Opcode::Equal => a == b,
                Opcode::NotEqual => a != b,
                _ => {
                    return Err(RuntimeError::UnknownBooleanOperator(
                        operator_symbol(op).to_string(),
                    ));
                }
            },
            (Value::Str(_), Value::Str(_)) => {
                return Err(RuntimeError::UnknownStringOperator(
                    operator_symbol(op).to_string(),
                ));
            }
            _ => {
                return Err(RuntimeError::UnsupportedBinaryTypes(
                    left.type_name(),
                    right.type_name(),
                ));
            }
        };
        self.push(Value::Bool(result))
    }

    fn build_hash(&self, start: usize, end: usize) -> Result<Value, RuntimeError> {
        let mut map = IndexMap::with_capacity((end - start) / 2);
        let mut i = start;
        while i < end {
            let key = HashKey::from_value(&self.stack[i])?;
            let value = self.stack[i + 1].clone();
            map.insert(key, value);
            i += 2;
        }
        Ok(Value::Hash(Rc::new(map)))
    }

    fn execute_index(&mut self, left: Value, index: Value) -> Result<Value, RuntimeError> {
        match (&left, &index) {
            (Value::Array(elements), Value::Int(i)) => {
                // Out of range is null, never an error.
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

    fn execute_call(&mut self, num_args: usize) -> Result<(), RuntimeError> {
        let callee = self.stack[self.sp - 1 - num_args].clone();
        match callee {
            Value::Closure(closure) => self.call_closure(closure, num_args),
            Value::CompiledFunction(func) => {
                // A capture-free function is a closure with no frees.
                let closure = Rc::new(Closure {
                    func,
                    free: Vec::new(),
                });
                self.call_closure(closure, num_args)
            }
            Value::Builtin(def) => {
                let args = self.stack[self.sp - num_args..self.sp].to_vec();
                let result = (def.func)(&args)?;
                self.sp = self.sp - num_args - 1;
                self.push(result)
            }
            _ => Err(RuntimeError::CallingNonFunction),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, num_args: usize) -> Result<(), RuntimeError> {
        if num_args != closure.func.num_parameters {
            return Err(RuntimeError::WrongNumberOfArguments {
                want: closure.func.num_parameters,
                got: num_args,
            });
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::StackOverflow);
        }

        let frame = Frame::new(closure.clone(), self.sp - num_args);
        let new_sp = frame.base_pointer + closure.func.num_locals;
        if new_sp > STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.frames.push(frame);
        // Arguments already sit in slots 0..num_args; reserve the rest
        // of the locals region above them.
        self.sp = new_sp;
        Ok(())
    }

    fn push_closure(&mut self, const_idx: usize, num_free: usize) -> Result<(), RuntimeError> {
        let constant = self.constants[const_idx].clone();
        let Value::CompiledFunction(func) = constant else {
            return Err(RuntimeError::NotAFunction(constant.type_name()));
        };
        let free = self.stack[self.sp - num_free..self.sp].to_vec();
        self.sp -= num_free;
        self.push(Value::Closure(Rc::new(Closure { func, free })))
    }
}

fn operator_symbol(op: Opcode) -> &'static str {
    match op {
        Opcode::Add => "+",
        Opcode::Sub => "-",
        Opcode::Mul => "*",
        Opcode::Div => "/",
        Opcode::Equal => "==",
        Opcode::NotEqual => "!=",
        Opcode::GreaterThan => ">",
        _ => "?",
    }
}
