// Copyright 2024 - 2026 The Gauntlet Authors

//! Mutation scoring and the break-threshold verdict.

use serde::Serialize;

use crate::exit_code;
use crate::mutant::{Mutant, MutantStatus};

/// Counts of mutants by terminal status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Score {
    pub killed: usize,
    pub timeout: usize,
    pub survived: usize,
    pub no_coverage: usize,
    pub compile_error: usize,
    pub ignored: usize,
    pub pending: usize,
    /// Whether uncovered mutants count as misses. Session configuration,
    /// not a count, so it stays out of the serialized totals.
    #[serde(skip)]
    count_uncovered: bool,
}

impl Score {
    pub fn from_mutants(mutants: &[Mutant], count_uncovered: bool) -> Score {
        let mut score = Score {
            count_uncovered,
            ..Score::default()
        };
        for mutant in mutants {
            match mutant.status {
                MutantStatus::Killed => score.killed += 1,
                MutantStatus::Timeout => score.timeout += 1,
                MutantStatus::Survived => score.survived += 1,
                MutantStatus::NoCoverage => score.no_coverage += 1,
                MutantStatus::CompileError => score.compile_error += 1,
                MutantStatus::Ignored => score.ignored += 1,
                MutantStatus::Pending => score.pending += 1,
            }
        }
        score
    }

    /// Mutants that received a test verdict. Timeouts count as caught;
    /// uncovered mutants join the denominator only when configured.
    pub fn denominator(&self) -> usize {
        let mut d = self.killed + self.timeout + self.survived;
        if self.count_uncovered {
            d += self.no_coverage;
        }
        d
    }

    /// The mutation score in [0, 1], or `None` when nothing was testable.
    pub fn value(&self) -> Option<f64> {
        let denominator = self.denominator();
        if denominator == 0 {
            None
        } else {
            Some((self.killed + self.timeout) as f64 / denominator as f64)
        }
    }

    /// Map the score against the break threshold (a percentage) to the
    /// process exit code. An undefined score never breaks the build.
    pub fn exit_code(&self, break_at: Option<f64>) -> i32 {
        match (self.value(), break_at) {
            (Some(value), Some(break_at)) if value * 100.0 < break_at => {
                exit_code::BREAK_THRESHOLD_VIOLATED
            }
            _ => exit_code::SUCCESS,
        }
    }
}
