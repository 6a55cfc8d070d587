//! Core library for the IPPcode18 interpreter: the value/variable model,
//! frame store, operand resolution, label index, XML loader, and the
//! interpreter driver itself. The CLI front end (the `ippcode18` crate)
//! is a thin wrapper over this crate's `loader::load` and `vm::VirtualMachine`.

pub mod frame;
pub mod label;
pub mod loader;
pub mod operand;
pub mod program;
pub mod reporting;
pub mod value;
pub mod vm;
