//! Standalone arithmetic/comparison functions, kept separate from the
//! dispatch loop in `mod.rs` so each can be tested in isolation.

use crate::program::Opcode;
use crate::value::Value;

use super::error::{ErrorKind, RuntimeError};

pub fn add(a: i64, b: i64) -> i64 {
    a.wrapping_add(b)
}

pub fn sub(a: i64, b: i64) -> i64 {
    a.wrapping_sub(b)
}

pub fn mul(a: i64, b: i64) -> i64 {
    a.wrapping_mul(b)
}

/// Floor division, matching the reference implementation's use of
/// Python's `//` (which rounds toward negative infinity, not toward
/// zero as Rust's `/` does).
pub fn idiv(a: i64, b: i64) -> Result<i64, RuntimeError> {
    if b == 0 {
        return Err(RuntimeError::new(ErrorKind::DivisionByZero));
    }
    let q = a.wrapping_div(b);
    let r = a.wrapping_rem(b);
    Ok(if r != 0 && (r < 0) != (b < 0) { q.wrapping_sub(1) } else { q })
}

/// `LT`/`GT`/`EQ` over same-typed operands. Boolean ordering treats
/// `false < true`; string ordering is lexicographic by Unicode code point
/// (the same ordering `str`'s own `Ord` impl gives).
pub fn compare(op: Opcode, a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    if a.kind() != b.kind() {
        return Err(RuntimeError::new(ErrorKind::TypeMismatch));
    }
    let ordering = match (a, b) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => unreachable!("kinds matched above"),
    };
    Ok(match op {
        Opcode::Lt => ordering.is_lt(),
        Opcode::Gt => ordering.is_gt(),
        Opcode::Eq => ordering.is_eq(),
        _ => unreachable!(),
    })
}
