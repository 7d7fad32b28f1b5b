//! QULOG code generation
//!
//! This crate handles:
//! - Verilog emission from the analyzed and typed AST
//! - Port and instance naming
//! - Rendering solver output back into source-level terms

pub mod names;
pub mod results;
pub mod verilog;

pub use verilog::write_verilog;

use qulog_frontend::error::CompileError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("too many parameters")]
    TooManyParameters,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CompileError> for EmitError {
    fn from(err: CompileError) -> Self {
        // Frontend errors reaching the emitter are invariant violations:
        // the analysis passes have already accepted the program.
        EmitError::Internal(err.to_string())
    }
}
