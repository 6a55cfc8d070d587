//! Centralizes rendering of a [`RuntimeError`] into the single diagnostic
//! line the CLI prints to stderr before exiting, rather than scattering
//! `eprintln!` calls through the loader and interpreter.

use crate::vm::error::RuntimeError;

pub trait AsError {
    fn format_error(&self) -> String;
}

impl AsError for RuntimeError {
    fn format_error(&self) -> String {
        format!("ippcode18: {self} (exit code {})", self.exit_code())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm::error::ErrorKind;

    #[test]
    fn test_format_error_includes_exit_code() {
        let err = RuntimeError::with_detail(ErrorKind::DivisionByZero, "GF@q / 0");
        assert_eq!(err.format_error(), "ippcode18: division by zero: GF@q / 0 (exit code 57)");
    }
}
