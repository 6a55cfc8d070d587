use crate::frame::{Frame, FrameStore, FrameTag, Variable};
use crate::value::{PrimitiveType, Value};
use crate::vm::error::{ErrorKind, RuntimeError};

/// The syntactic kind an argument element declared via its `type`
/// attribute. `Var` and `Label` are not `Value` types themselves but name
/// something resolved through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Int,
    Bool,
    Str,
    Label,
    Type,
    Var,
}

impl OperandKind {
    pub fn from_tag(tag: &str) -> Option<OperandKind> {
        match tag {
            "int" => Some(OperandKind::Int),
            "bool" => Some(OperandKind::Bool),
            "string" => Some(OperandKind::Str),
            "label" => Some(OperandKind::Label),
            "type" => Some(OperandKind::Type),
            "var" => Some(OperandKind::Var),
            _ => None,
        }
    }
}

/// One argument of an instruction: a declared kind plus its raw textual
/// payload as it appeared in the source. Validation is performed lazily,
/// on first access, and is idempotent — re-validating is harmless.
#[derive(Debug, Clone)]
pub struct Operand {
    kind: OperandKind,
    raw: String,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '$' | '*' | '&' | '%' | '-')
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => {}
        _ => return false,
    }
    chars.all(is_ident_char)
}

fn is_valid_int_literal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    !body.is_empty() && body.chars().all(|c| c.is_ascii_digit())
}

impl Operand {
    pub fn new(kind: OperandKind, raw: impl Into<String>) -> Operand {
        Operand { kind, raw: raw.into() }
    }

    pub fn kind(&self) -> OperandKind {
        self.kind
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parses the `FRAME@NAME` shape of a `var` operand.
    fn parse_var(&self) -> Result<(FrameTag, &str), RuntimeError> {
        let (prefix, name) = self
            .raw
            .split_once('@')
            .ok_or_else(|| RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("malformed variable `{}`", self.raw)))?;
        let tag = FrameTag::from_prefix(prefix)
            .ok_or_else(|| RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("unknown frame `{prefix}`")))?;
        if !is_valid_identifier(name) {
            return Err(RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("invalid identifier `{name}`")));
        }
        Ok((tag, name))
    }

    /// Validates the operand's literal syntax against its declared kind.
    /// No-op (always `Ok`) for `Var`, whose validation is the identifier
    /// check inside `parse_var`.
    fn validate_literal(&self) -> Result<(), RuntimeError> {
        match self.kind {
            OperandKind::Int => {
                if is_valid_int_literal(&self.raw) {
                    Ok(())
                } else {
                    Err(RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("invalid int literal `{}`", self.raw)))
                }
            }
            OperandKind::Bool => {
                if self.raw == "true" || self.raw == "false" {
                    Ok(())
                } else {
                    Err(RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("invalid bool literal `{}`", self.raw)))
                }
            }
            OperandKind::Str => Ok(()),
            OperandKind::Label => {
                if is_valid_identifier(&self.raw) {
                    Ok(())
                } else {
                    Err(RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("invalid label `{}`", self.raw)))
                }
            }
            OperandKind::Type => match self.raw.as_str() {
                "int" | "bool" | "string" => Ok(()),
                _ => Err(RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("invalid type literal `{}`", self.raw))),
            },
            OperandKind::Var => Ok(()),
        }
    }

    /// Validated literal value, for operands that are not `var`/`label`.
    pub fn literal_value(&self) -> Result<Value, RuntimeError> {
        self.validate_literal()?;
        match self.kind {
            OperandKind::Int => Ok(Value::Int(self.raw.parse().map_err(|_| {
                RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("invalid int literal `{}`", self.raw))
            })?)),
            OperandKind::Bool => Ok(Value::Bool(self.raw == "true")),
            OperandKind::Str => Ok(Value::Str(self.raw.clone())),
            OperandKind::Type | OperandKind::Label | OperandKind::Var => {
                Err(RuntimeError::new(ErrorKind::TypeMismatch))
            }
        }
    }

    /// Validated label name.
    pub fn label_name(&self) -> Result<&str, RuntimeError> {
        if self.kind != OperandKind::Label {
            return Err(RuntimeError::new(ErrorKind::TypeMismatch));
        }
        self.validate_literal()?;
        Ok(&self.raw)
    }

    /// Validated `type` literal.
    pub fn type_literal(&self) -> Result<PrimitiveType, RuntimeError> {
        if self.kind != OperandKind::Type {
            return Err(RuntimeError::new(ErrorKind::TypeMismatch));
        }
        self.validate_literal()?;
        PrimitiveType::from_tag(&self.raw).ok_or_else(|| RuntimeError::new(ErrorKind::LexicalOrSemantic))
    }

    /// Resolves to the variable this operand names. Only valid for `var`
    /// operands.
    pub fn resolve_var<'a>(&self, frames: &'a FrameStore) -> Result<&'a Variable, RuntimeError> {
        if self.kind != OperandKind::Var {
            return Err(RuntimeError::new(ErrorKind::TypeMismatch));
        }
        let (tag, name) = self.parse_var()?;
        frames.get(tag, name)
    }

    pub fn resolve_var_mut<'a>(&self, frames: &'a mut FrameStore) -> Result<&'a mut Variable, RuntimeError> {
        if self.kind != OperandKind::Var {
            return Err(RuntimeError::new(ErrorKind::TypeMismatch));
        }
        let (tag, name) = self.parse_var()?;
        frames.get_mut(tag, name)
    }

    pub fn frame_and_name(&self) -> Result<(FrameTag, &str), RuntimeError> {
        if self.kind != OperandKind::Var {
            return Err(RuntimeError::new(ErrorKind::TypeMismatch));
        }
        self.parse_var()
    }

    /// Resolves to a concrete value: either the literal itself, or the
    /// current value of the variable it names (56 if uninitialized).
    pub fn as_value(&self, frames: &FrameStore) -> Result<Value, RuntimeError> {
        match self.kind {
            OperandKind::Var => {
                let var = self.resolve_var(frames)?;
                var.value().cloned().ok_or_else(|| RuntimeError::new(ErrorKind::MissingValue))
            }
            _ => self.literal_value(),
        }
    }

    /// `TYPE`'s special tolerant read: `""` for an uninitialized variable
    /// or a non-`var` operand's own declared kind, rather than failing.
    pub fn type_tag_lenient(&self, frames: &FrameStore) -> Result<String, RuntimeError> {
        match self.kind {
            OperandKind::Var => {
                let (tag, name) = self.parse_var()?;
                let frame = match tag {
                    FrameTag::Global => Some(frames.global()),
                    FrameTag::Temporary => frames.temporary(),
                    FrameTag::Local => frames.locals().last(),
                };
                let frame: &Frame = frame.ok_or_else(|| RuntimeError::new(ErrorKind::UndefinedFrame))?;
                let var = frame.get(name)?;
                Ok(var.value().map(|v| v.kind().tag().to_string()).unwrap_or_default())
            }
            _ => Ok(self.literal_value()?.kind().tag().to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_int_literal_valid() {
        assert_eq!(Operand::new(OperandKind::Int, "42").literal_value().unwrap(), Value::Int(42));
        assert_eq!(Operand::new(OperandKind::Int, "-42").literal_value().unwrap(), Value::Int(-42));
    }

    #[test]
    fn test_int_literal_rejects_bare_sign_and_empty() {
        assert!(Operand::new(OperandKind::Int, "-").literal_value().is_err());
        assert!(Operand::new(OperandKind::Int, "").literal_value().is_err());
    }

    #[test]
    fn test_bool_literal_membership() {
        assert!(Operand::new(OperandKind::Bool, "true").literal_value().is_ok());
        assert!(Operand::new(OperandKind::Bool, "false").literal_value().is_ok());
        assert!(Operand::new(OperandKind::Bool, "maybe").literal_value().is_err());
    }

    #[test]
    fn test_label_identifier_rules() {
        assert!(Operand::new(OperandKind::Label, "_start").label_name().is_ok());
        assert!(Operand::new(OperandKind::Label, "2cool").label_name().is_err());
    }

    #[test]
    fn test_identifier_first_char_is_ascii_only() {
        assert!(Operand::new(OperandKind::Label, "café").label_name().is_err());
        assert!(Operand::new(OperandKind::Var, "GF@Ω").parse_var().is_err());
    }

    #[test]
    fn test_var_parse() {
        let op = Operand::new(OperandKind::Var, "GF@counter");
        let (tag, name) = op.parse_var().unwrap();
        assert_eq!(tag, FrameTag::Global);
        assert_eq!(name, "counter");
    }

    #[test]
    fn test_var_parse_rejects_unknown_frame() {
        let op = Operand::new(OperandKind::Var, "XX@counter");
        assert!(op.parse_var().is_err());
    }

    #[test]
    fn test_as_value_uninitialized_is_missing() {
        let mut fs = FrameStore::new();
        fs.define(FrameTag::Global, "x").unwrap();
        let op = Operand::new(OperandKind::Var, "GF@x");
        let err = op.as_value(&fs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingValue);
    }

    #[test]
    fn test_type_tag_lenient_uninitialized_is_empty() {
        let mut fs = FrameStore::new();
        fs.define(FrameTag::Global, "x").unwrap();
        let op = Operand::new(OperandKind::Var, "GF@x");
        assert_eq!(op.type_tag_lenient(&fs).unwrap(), "");
    }
}
