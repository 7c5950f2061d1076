// Copyright 2023 - 2026 The Gauntlet Authors

//! Derivation of the per-mutant test timeout.
//!
//! A mutant that sends a loop spinning must be caught by the clock, so the
//! timeout is derived from the slowest test observed during the coverage
//! run, scaled and floored. A test exceeding it while a mutant is active is
//! attributed to that mutant.

use std::cmp::max;
use std::time::Duration;

use tracing::{info, warn};

use crate::options::Options;
use crate::platform::TestCaseResult;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Timeouts {
    pub test: Duration,
}

impl Timeouts {
    /// Derive from the coverage run: `max(floor, longest x multiplier)`,
    /// unless an explicit timeout was given.
    pub fn from_coverage_run(results: &[TestCaseResult], options: &Options) -> Timeouts {
        if let Some(explicit) = options.test_timeout {
            return Timeouts { test: explicit };
        }
        let longest = results.iter().map(|r| r.duration).max();
        match longest {
            Some(longest) => {
                let scaled = longest.mul_f64(options.timeout_multiplier);
                let test = max(options.minimum_test_timeout, scaled);
                info!(
                    "auto-set test timeout to {}",
                    humantime::format_duration(test)
                );
                Timeouts { test }
            }
            None => {
                warn!(
                    "no coverage durations to derive a timeout from; using the minimum {}",
                    humantime::format_duration(options.minimum_test_timeout)
                );
                Timeouts {
                    test: options.minimum_test_timeout,
                }
            }
        }
    }
}
