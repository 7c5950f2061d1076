// Copyright 2024 - 2026 The Gauntlet Authors

//! Engine-level error taxonomy.
//!
//! Mutant-level failures (timeouts, killed assertions) are statuses, not
//! errors; everything here aborts the session and maps to a distinct exit
//! code.

use crate::exit_code;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A source file could not be parsed by the frontend.
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// The rollback loop ran out of mutants to blame and the tree still
    /// does not compile.
    #[error("compilation failed with no mutant left to blame: {0}")]
    CompileUnrecoverable(String),

    /// The test host could not be reached, even after a retry with a fresh
    /// host.
    #[error("test host unreachable: {0}")]
    TestHostUnreachable(String),

    /// Tests fail without any mutation applied, so verdicts would be
    /// meaningless.
    #[error("tests failed in the unmutated build: {0}")]
    BaselineFailed(String),

    /// Options or configuration were rejected before any mutation work.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}

impl EngineError {
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Parse { .. } => exit_code::PARSE_ERROR,
            EngineError::CompileUnrecoverable(_) => exit_code::COMPILE_UNRECOVERABLE,
            EngineError::TestHostUnreachable(_) => exit_code::TEST_HOST_UNREACHABLE,
            EngineError::BaselineFailed(_) => exit_code::BASELINE_FAILED,
            EngineError::ConfigurationInvalid(_) => exit_code::USAGE,
        }
    }
}
