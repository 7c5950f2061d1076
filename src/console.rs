// Copyright 2023 - 2026 The Gauntlet Authors

//! Print mutant listings and session results on the terminal.

use std::time::Instant;

use console::{style, StyledObject};

use crate::mutant::{Mutant, MutantStatus};
use crate::score::Score;

/// Top-level UI object owning message output.
pub struct Console {
    start_time: Instant,
}

impl Default for Console {
    fn default() -> Self {
        Console::new()
    }
}

impl Console {
    pub fn new() -> Console {
        Console {
            start_time: Instant::now(),
        }
    }

    /// Print one line per mutant, optionally followed by its diff.
    pub fn list_mutants<'a>(
        &self,
        mutants: impl IntoIterator<Item = (&'a Mutant, Option<String>)>,
    ) {
        for (mutant, diff) in mutants {
            println!("{}", mutant.to_styled_string(true));
            if let Some(diff) = diff {
                println!("{diff}");
            }
        }
    }

    /// Print one mutant's final status.
    pub fn mutant_result(&self, mutant: &Mutant) {
        println!(
            "{} ... {}",
            mutant.to_styled_string(true),
            style_status(mutant.status)
        );
    }

    /// Print the end-of-session summary.
    pub fn summarize(&self, score: &Score) {
        let value = match score.value() {
            Some(value) => format!("{:.1}%", value * 100.0),
            None => "undefined (no testable mutants)".to_owned(),
        };
        println!(
            "{} killed, {} timed out, {} missed, {} uncovered, {} rolled back in {}: score {}",
            style(score.killed).green(),
            style(score.timeout).green(),
            style(score.survived).red().bold(),
            style(score.no_coverage).yellow(),
            score.compile_error,
            format_elapsed(self.start_time),
            style(value).bold(),
        );
    }

    pub fn print_error(&self, msg: &str) {
        println!("{}: {}", style("error").bold().red(), msg);
    }
}

/// A styled string reflecting the moral value of this status.
pub fn style_status(status: MutantStatus) -> StyledObject<&'static str> {
    use MutantStatus::*;
    match status {
        // good
        Killed => style("caught").green(),
        Timeout => style("timeout").green(),
        // neutral/inconclusive
        NoCoverage => style("no coverage").yellow(),
        CompileError => style("build broken").yellow(),
        Ignored => style("ignored").dim(),
        Pending => style("pending").dim(),
        // bad
        Survived => style("NOT CAUGHT").red().bold(),
    }
}

fn format_elapsed(since: Instant) -> String {
    format!("{:.3}s", since.elapsed().as_secs_f64())
}
