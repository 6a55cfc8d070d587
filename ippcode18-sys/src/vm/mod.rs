pub mod error;
mod operator;

use std::io::{BufRead, Write};

use crate::frame::FrameStore;
use crate::label::LabelIndex;
use crate::operand::Operand;
use crate::program::{Instruction, Opcode, Program};
use crate::value::{char_at, int_to_char, Value};

use error::{ErrorKind, RuntimeError};

/// Every way the interpreter can stop, from the driver's point of view.
#[derive(Debug)]
pub enum ExitType {
    Ok,
    Error(RuntimeError),
}

/// Owns all interpreter state for one run: frames, the two auxiliary
/// stacks, the program counter (as a `Vec` index, not a raw ordinal — see
/// `program.rs`/SPEC_FULL.md #9), and the I/O streams it reads from and
/// writes to. stdout and stderr are independent type parameters since a
/// real run wires them to `io::Stdout`/`io::Stderr`, two distinct types.
pub struct VirtualMachine<R: BufRead, W: Write, E: Write> {
    program: Program,
    labels: LabelIndex,
    frames: FrameStore,
    call_stack: Vec<usize>,
    value_stack: Vec<Value>,
    pc: usize,
    read: R,
    write: W,
    err: E,
}

impl<R: BufRead, W: Write, E: Write> VirtualMachine<R, W, E> {
    pub fn new(program: Program, read: R, write: W, err: E) -> Result<VirtualMachine<R, W, E>, RuntimeError> {
        let labels = build_label_index(&program)?;
        Ok(VirtualMachine {
            program,
            labels,
            frames: FrameStore::new(),
            call_stack: Vec::new(),
            value_stack: Vec::new(),
            pc: 0,
            read,
            write,
            err,
        })
    }

    pub fn run(&mut self) -> ExitType {
        while self.pc < self.program.instructions.len() {
            match self.step() {
                Ok(()) => {}
                Err(e) => return ExitType::Error(e),
            }
        }
        ExitType::Ok
    }

    fn step(&mut self) -> Result<(), RuntimeError> {
        let instruction = self.program.instructions[self.pc].clone();
        self.execute(&instruction)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(())
    }

    fn execute(&mut self, ins: &Instruction) -> Result<(), RuntimeError> {
        #[cfg(feature = "trace_interpreter")]
        eprintln!("trace: {:?} @ {}", ins.opcode, ins.order);

        let ops = &ins.operands;
        match ins.opcode {
            Opcode::Label => Ok(()),
            Opcode::Createframe => {
                self.frames.create_temp_frame();
                Ok(())
            }
            Opcode::Pushframe => self.frames.push_frame(),
            Opcode::Popframe => self.frames.pop_frame(),
            Opcode::Defvar => {
                let (tag, name) = ops[0].frame_and_name()?;
                self.frames.define(tag, name)
            }
            Opcode::Move => {
                let value = ops[1].as_value(&self.frames)?;
                self.write_dest(&ops[0], value)
            }
            Opcode::Call => {
                let target = self.labels.resolve(ops[0].label_name()?)?;
                self.call_stack.push(self.pc);
                #[cfg(feature = "trace_interpreter_stack")]
                eprintln!("trace: call stack depth -> {}", self.call_stack.len());
                self.pc = target.wrapping_sub(1);
                Ok(())
            }
            Opcode::Return => {
                let target = self.call_stack.pop().ok_or_else(|| RuntimeError::new(ErrorKind::MissingValue))?;
                #[cfg(feature = "trace_interpreter_stack")]
                eprintln!("trace: call stack depth -> {}", self.call_stack.len());
                self.pc = target;
                Ok(())
            }
            Opcode::Pushs => {
                let value = ops[0].as_value(&self.frames)?;
                self.value_stack.push(value);
                #[cfg(feature = "trace_interpreter_stack")]
                eprintln!("trace: value stack depth -> {}", self.value_stack.len());
                Ok(())
            }
            Opcode::Pops => {
                let value = self.value_stack.pop().ok_or_else(|| RuntimeError::new(ErrorKind::MissingValue))?;
                #[cfg(feature = "trace_interpreter_stack")]
                eprintln!("trace: value stack depth -> {}", self.value_stack.len());
                self.write_dest(&ops[0], value)
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Idiv => self.execute_arith(ins.opcode, ops),
            Opcode::Lt | Opcode::Gt | Opcode::Eq => self.execute_compare(ins.opcode, ops),
            Opcode::And | Opcode::Or => self.execute_logic(ins.opcode, ops),
            Opcode::Not => {
                let a = ops[1].as_value(&self.frames)?.as_bool().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
                self.write_dest(&ops[0], Value::Bool(!a))
            }
            Opcode::Int2char => {
                let code = ops[1].as_value(&self.frames)?.as_int().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
                let ch = int_to_char(code).ok_or_else(|| RuntimeError::new(ErrorKind::StringIndexOutOfRange))?;
                self.write_dest(&ops[0], Value::Str(ch.to_string()))
            }
            Opcode::Stri2int => {
                let s = ops[1].as_value(&self.frames)?;
                let s = s.as_str().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
                let idx = ops[2].as_value(&self.frames)?.as_int().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
                let ch = char_at(s, idx).ok_or_else(|| RuntimeError::new(ErrorKind::StringIndexOutOfRange))?;
                self.write_dest(&ops[0], Value::Int(ch as i64))
            }
            Opcode::Read => self.execute_read(ops),
            Opcode::Write => self.execute_write(ops),
            Opcode::Concat => {
                let a = ops[1].as_value(&self.frames)?;
                let b = ops[2].as_value(&self.frames)?;
                match (a.as_str(), b.as_str()) {
                    (Some(a), Some(b)) => self.write_dest(&ops[0], Value::Str(format!("{a}{b}"))),
                    _ => Err(RuntimeError::new(ErrorKind::TypeMismatch)),
                }
            }
            Opcode::Strlen => {
                let s = ops[1].as_value(&self.frames)?;
                let s = s.as_str().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
                self.write_dest(&ops[0], Value::Int(s.chars().count() as i64))
            }
            Opcode::Getchar => {
                let s = ops[1].as_value(&self.frames)?;
                let s = s.as_str().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
                let idx = ops[2].as_value(&self.frames)?.as_int().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
                let ch = char_at(s, idx).ok_or_else(|| RuntimeError::new(ErrorKind::StringIndexOutOfRange))?;
                self.write_dest(&ops[0], Value::Str(ch.to_string()))
            }
            Opcode::Setchar => self.execute_setchar(ops),
            Opcode::Type => {
                let tag = ops[1].type_tag_lenient(&self.frames)?;
                self.write_dest(&ops[0], Value::Str(tag))
            }
            Opcode::Jump => {
                let target = self.labels.resolve(ops[0].label_name()?)?;
                self.pc = target.wrapping_sub(1);
                Ok(())
            }
            Opcode::Jumpifeq | Opcode::Jumpifneq => self.execute_jumpif(ins.opcode, ops),
            Opcode::Dprint => {
                let v = ops[0].as_value(&self.frames)?;
                write!(self.err, "{}", v.render()).map_err(io_error)
            }
            Opcode::Break => self.execute_break(),
        }
    }

    fn write_dest(&mut self, dest: &Operand, value: Value) -> Result<(), RuntimeError> {
        let var = dest.resolve_var_mut(&mut self.frames)?;
        var.set(value);
        Ok(())
    }

    fn execute_arith(&mut self, op: Opcode, ops: &[Operand]) -> Result<(), RuntimeError> {
        let a = ops[1].as_value(&self.frames)?.as_int().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
        let b = ops[2].as_value(&self.frames)?.as_int().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
        let result = match op {
            Opcode::Add => operator::add(a, b),
            Opcode::Sub => operator::sub(a, b),
            Opcode::Mul => operator::mul(a, b),
            Opcode::Idiv => operator::idiv(a, b)?,
            _ => unreachable!(),
        };
        self.write_dest(&ops[0], Value::Int(result))
    }

    fn execute_compare(&mut self, op: Opcode, ops: &[Operand]) -> Result<(), RuntimeError> {
        let a = ops[1].as_value(&self.frames)?;
        let b = ops[2].as_value(&self.frames)?;
        let result = operator::compare(op, &a, &b)?;
        self.write_dest(&ops[0], Value::Bool(result))
    }

    fn execute_logic(&mut self, op: Opcode, ops: &[Operand]) -> Result<(), RuntimeError> {
        let a = ops[1].as_value(&self.frames)?.as_bool().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
        let b = ops[2].as_value(&self.frames)?.as_bool().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
        let result = match op {
            Opcode::And => a && b,
            Opcode::Or => a || b,
            _ => unreachable!(),
        };
        self.write_dest(&ops[0], Value::Bool(result))
    }

    fn execute_jumpif(&mut self, op: Opcode, ops: &[Operand]) -> Result<(), RuntimeError> {
        let a = ops[1].as_value(&self.frames)?;
        let b = ops[2].as_value(&self.frames)?;
        if a.kind() != b.kind() {
            return Err(RuntimeError::new(ErrorKind::TypeMismatch));
        }
        let equal = a == b;
        let taken = match op {
            Opcode::Jumpifeq => equal,
            Opcode::Jumpifneq => !equal,
            _ => unreachable!(),
        };
        if taken {
            let target = self.labels.resolve(ops[0].label_name()?)?;
            self.pc = target.wrapping_sub(1);
        }
        Ok(())
    }

    /// `SETCHAR R,i,s`: `R` is simultaneously the string being edited and
    /// the destination — its current value supplies the string, and the
    /// result (with the character at `i` replaced by the first character
    /// of `s`) is written back into it. This is a corrected redesign of
    /// the reference implementation's impossible in-place mutation.
    fn execute_setchar(&mut self, ops: &[Operand]) -> Result<(), RuntimeError> {
        let current = ops[0].as_value(&self.frames)?;
        let current = current.as_str().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
        let idx = ops[1].as_value(&self.frames)?.as_int().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
        let replacement = ops[2].as_value(&self.frames)?;
        let replacement = replacement.as_str().ok_or_else(|| RuntimeError::new(ErrorKind::TypeMismatch))?;
        let new_char = replacement.chars().next().ok_or_else(|| RuntimeError::new(ErrorKind::StringIndexOutOfRange))?;
        if idx < 0 || idx as usize >= current.chars().count() {
            return Err(RuntimeError::new(ErrorKind::StringIndexOutOfRange));
        }
        let edited: String =
            current.chars().enumerate().map(|(i, c)| if i == idx as usize { new_char } else { c }).collect();
        self.write_dest(&ops[0], Value::Str(edited))
    }

    fn execute_read(&mut self, ops: &[Operand]) -> Result<(), RuntimeError> {
        let requested = ops[1].type_literal()?;
        let mut line = String::new();
        let bytes_read = self.read.read_line(&mut line).map_err(io_error)?;
        let line = line.trim_end_matches(['\n', '\r']);
        let value = match requested {
            crate::value::PrimitiveType::Int => {
                if bytes_read == 0 {
                    Value::Int(0)
                } else {
                    line.parse::<i64>().map(Value::Int).unwrap_or(Value::Int(0))
                }
            }
            crate::value::PrimitiveType::Bool => Value::Bool(bytes_read != 0 && line.eq_ignore_ascii_case("true")),
            crate::value::PrimitiveType::Str => Value::Str(if bytes_read == 0 { String::new() } else { line.to_string() }),
        };
        self.write_dest(&ops[0], value)
    }

    fn execute_write(&mut self, ops: &[Operand]) -> Result<(), RuntimeError> {
        let value = ops[0].as_value(&self.frames)?;
        writeln!(self.write, "{}", value.render()).map_err(io_error)
    }

    fn execute_break(&mut self) -> Result<(), RuntimeError> {
        writeln!(self.err, "-- BREAK at instruction {} --", self.program.instructions[self.pc].order).map_err(io_error)?;
        writeln!(self.err, "call stack depth: {}", self.call_stack.len()).map_err(io_error)?;
        writeln!(self.err, "value stack depth: {}", self.value_stack.len()).map_err(io_error)?;
        for (name, var) in self.frames.global().iter() {
            writeln!(self.err, "GF@{name} = {:?}", var.value()).map_err(io_error)?;
        }
        if let Some(tf) = self.frames.temporary() {
            for (name, var) in tf.iter() {
                writeln!(self.err, "TF@{name} = {:?}", var.value()).map_err(io_error)?;
            }
        }
        if let Some(lf) = self.frames.locals().last() {
            for (name, var) in lf.iter() {
                writeln!(self.err, "LF@{name} = {:?}", var.value()).map_err(io_error)?;
            }
        }
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> RuntimeError {
    RuntimeError::with_detail(ErrorKind::Internal, e.to_string())
}

fn build_label_index(program: &Program) -> Result<LabelIndex, RuntimeError> {
    let mut labels = LabelIndex::new();
    for (index, ins) in program.instructions.iter().enumerate() {
        if ins.opcode == Opcode::Label {
            let name = ins.operands[0].label_name()?;
            labels.add(name, index)?;
        }
    }
    Ok(labels)
}
