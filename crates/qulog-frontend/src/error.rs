//! Compile-time errors surfaced by the frontend passes
//!
//! User-facing variants carry the source span of the offending construct;
//! the driver is responsible for prefixing the file name and position.

use crate::span::Span;
use crate::typeinf::VarType;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CompileError {
    #[error("unrecognized character {text:?}")]
    Lex { text: String, span: Span },

    #[error("expected {expected}, found {found}")]
    Parse {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("{construct} are not yet supported")]
    Unimplemented { construct: &'static str, span: Span },

    #[error("recursion is not supported ({name})")]
    Recursion { name: String, span: Span },

    #[error("polymorphic type signatures are not supported ({name})")]
    PolymorphicSignature { name: String, span: Span },

    #[error("{name} is polymorphic (in argument {argument}), which is not supported")]
    PolymorphicArgument {
        name: String,
        argument: usize,
        span: Span,
    },

    #[error("incompatible types for variable {variable}")]
    TypeConflict { variable: String, span: Span },

    #[error("cannot apply {op:?} to mixed types ({lhs} and {rhs})")]
    MixedEquality {
        op: String,
        lhs: VarType,
        rhs: VarType,
        span: Span,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl CompileError {
    /// Source position of the offending construct, when one is known
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lex { span, .. }
            | CompileError::Parse { span, .. }
            | CompileError::Unimplemented { span, .. }
            | CompileError::Recursion { span, .. }
            | CompileError::PolymorphicSignature { span, .. }
            | CompileError::PolymorphicArgument { span, .. }
            | CompileError::TypeConflict { span, .. }
            | CompileError::MixedEquality { span, .. } => Some(*span),
            CompileError::Internal(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
