// Copyright 2023 - 2026 The Gauntlet Authors

//! Compile every mutant into one instrumented binary and see if your tests
//! catch them.
//!
//! The engine parses each source file through a language frontend, installs
//! every applicable mutation behind a runtime switch keyed on the active
//! mutant id, compiles the result once (rolling back mutants that break the
//! build), then measures per-test coverage and dispatches each mutant
//! against exactly the tests that reach it. Killed, survived, and timed-out
//! verdicts roll up into a mutation score checked against the break
//! threshold.
//!
//! Parsing, compilation, and test execution are supplied by collaborators
//! behind [`frontend::Frontend`] and [`platform::TestPlatform`]; a small
//! reference frontend lives in [`parse`].

pub mod ast;
pub mod collector;
pub mod console;
pub mod coverage;
pub mod error;
pub mod exit_code;
pub mod filter;
pub mod frontend;
pub mod interrupt;
pub mod lab;
pub mod list;
pub mod log_file;
pub mod mutant;
pub mod mutators;
pub mod options;
pub mod output;
pub mod parse;
pub mod place;
pub mod platform;
pub mod report;
pub mod rollback;
pub mod schedule;
pub mod score;
pub mod session;
pub mod span;
pub mod timeouts;
pub mod visit;

pub use anyhow::Result;

pub use crate::error::EngineError;
pub use crate::lab::{Lab, LabOutcome};
pub use crate::mutant::{Mutant, MutantId, MutantStatus, Mutation, MutationKind, MutationLevel};
pub use crate::options::{Args, Config, Options};
