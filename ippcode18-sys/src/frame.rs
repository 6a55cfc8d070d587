use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::value::Value;
use crate::vm::error::{ErrorKind, RuntimeError};

/// A frame addressing tag, as it appears on the left of `FRAME@NAME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTag {
    Global,
    Local,
    Temporary,
}

impl FrameTag {
    pub fn from_prefix(prefix: &str) -> Option<FrameTag> {
        match prefix {
            "GF" => Some(FrameTag::Global),
            "LF" => Some(FrameTag::Local),
            "TF" => Some(FrameTag::Temporary),
            _ => None,
        }
    }
}

/// A named cell. Uninitialized until first assigned; assignment sets type
/// and value together, never one without the other.
#[derive(Debug, Clone)]
pub struct Variable {
    slot: Option<Value>,
}

impl Variable {
    fn new() -> Variable {
        Variable { slot: None }
    }

    pub fn value(&self) -> Option<&Value> {
        self.slot.as_ref()
    }

    pub fn set(&mut self, value: Value) {
        self.slot = Some(value);
    }
}

/// An ordered, name-unique collection of variables.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    vars: IndexMap<String, Variable, FxBuildHasher>,
}

impl Frame {
    pub fn new() -> Frame {
        Frame { vars: IndexMap::default() }
    }

    pub fn define(&mut self, name: &str) -> Result<(), RuntimeError> {
        if self.vars.contains_key(name) {
            return Err(RuntimeError::new(ErrorKind::VariableAlreadyExists));
        }
        self.vars.insert(name.to_string(), Variable::new());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Variable, RuntimeError> {
        self.vars.get(name).ok_or_else(|| RuntimeError::new(ErrorKind::VariableNotFound))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Variable, RuntimeError> {
        self.vars.get_mut(name).ok_or_else(|| RuntimeError::new(ErrorKind::VariableNotFound))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Owns the global frame, the detached temporary frame, and the frame
/// stack whose top is the local frame.
#[derive(Debug)]
pub struct FrameStore {
    global: Frame,
    temporary: Option<Frame>,
    stack: Vec<Frame>,
}

impl FrameStore {
    pub fn new() -> FrameStore {
        FrameStore { global: Frame::new(), temporary: None, stack: Vec::new() }
    }

    pub fn create_temp_frame(&mut self) {
        self.temporary = Some(Frame::new());
    }

    pub fn push_frame(&mut self) -> Result<(), RuntimeError> {
        let frame = self.temporary.take().ok_or_else(|| RuntimeError::new(ErrorKind::UndefinedFrame))?;
        self.stack.push(frame);
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Result<(), RuntimeError> {
        let frame = self.stack.pop().ok_or_else(|| RuntimeError::new(ErrorKind::UndefinedFrame))?;
        self.temporary = Some(frame);
        Ok(())
    }

    fn frame(&self, tag: FrameTag) -> Result<&Frame, RuntimeError> {
        match tag {
            FrameTag::Global => Ok(&self.global),
            FrameTag::Temporary => self.temporary.as_ref().ok_or_else(|| RuntimeError::new(ErrorKind::UndefinedFrame)),
            FrameTag::Local => self.stack.last().ok_or_else(|| RuntimeError::new(ErrorKind::UndefinedFrame)),
        }
    }

    fn frame_mut(&mut self, tag: FrameTag) -> Result<&mut Frame, RuntimeError> {
        match tag {
            FrameTag::Global => Ok(&mut self.global),
            FrameTag::Temporary => self.temporary.as_mut().ok_or_else(|| RuntimeError::new(ErrorKind::UndefinedFrame)),
            FrameTag::Local => self.stack.last_mut().ok_or_else(|| RuntimeError::new(ErrorKind::UndefinedFrame)),
        }
    }

    pub fn define(&mut self, tag: FrameTag, name: &str) -> Result<(), RuntimeError> {
        self.frame_mut(tag)?.define(name)
    }

    pub fn get(&self, tag: FrameTag, name: &str) -> Result<&Variable, RuntimeError> {
        self.frame(tag)?.get(name)
    }

    pub fn get_mut(&mut self, tag: FrameTag, name: &str) -> Result<&mut Variable, RuntimeError> {
        self.frame_mut(tag)?.get_mut(name)
    }

    pub fn global(&self) -> &Frame {
        &self.global
    }

    pub fn temporary(&self) -> Option<&Frame> {
        self.temporary.as_ref()
    }

    pub fn locals(&self) -> &[Frame] {
        &self.stack
    }
}
