use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::vm::error::{ErrorKind, RuntimeError};

/// Maps label names to the index (within the sorted instruction `Vec`) of
/// the instruction that carries them. Built by a pre-pass before execution
/// starts, so forward jumps resolve.
#[derive(Debug, Default)]
pub struct LabelIndex {
    targets: IndexMap<String, usize, FxBuildHasher>,
}

impl LabelIndex {
    pub fn new() -> LabelIndex {
        LabelIndex { targets: IndexMap::default() }
    }

    pub fn add(&mut self, name: &str, index: usize) -> Result<(), RuntimeError> {
        if self.targets.insert(name.to_string(), index).is_some() {
            return Err(RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("duplicate label `{name}`")));
        }
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<usize, RuntimeError> {
        self.targets
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("undefined label `{name}`")))
    }
}
