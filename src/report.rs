// Copyright 2024 - 2026 The Gauntlet Authors

//! The machine-readable session report.

use serde::Serialize;
use similar::TextDiff;

use crate::ast::{apply_replacement, render_unit, CompilationUnit, RenderOptions};
use crate::mutant::{Mutant, MutantId, MutantStatus, Mutation, MutationKind};
use crate::platform::TestId;
use crate::score::Score;
use crate::span::Span;

/// One mutant's final record.
#[derive(Clone, Debug, Serialize)]
pub struct MutantReport {
    pub id: MutantId,
    pub file: camino::Utf8PathBuf,
    pub span: Span,
    pub kind: MutationKind,
    pub display_name: String,
    pub scope: Option<String>,
    pub status: MutantStatus,
    pub status_reason: Option<String>,
    pub killing_tests: Vec<TestId>,
    pub covering_tests: Vec<TestId>,
}

impl From<&Mutant> for MutantReport {
    fn from(mutant: &Mutant) -> MutantReport {
        MutantReport {
            id: mutant.id,
            file: mutant.file.clone(),
            span: mutant.span,
            kind: mutant.kind,
            display_name: mutant.display.clone(),
            scope: mutant.scope.clone(),
            status: mutant.status,
            status_reason: mutant.status_reason.clone(),
            killing_tests: mutant.killing_tests.clone(),
            covering_tests: mutant.covering_tests.iter().cloned().collect(),
        }
    }
}

/// The whole session: per-mutant records plus totals and score.
#[derive(Clone, Debug, Serialize)]
pub struct SessionReport {
    pub mutants: Vec<MutantReport>,
    pub totals: Score,
    /// Mutation score in [0, 1]; absent when undefined.
    pub score: Option<f64>,
}

impl SessionReport {
    pub fn new(mutants: &[Mutant], count_uncovered: bool) -> SessionReport {
        let totals = Score::from_mutants(mutants, count_uncovered);
        SessionReport {
            mutants: mutants.iter().map(MutantReport::from).collect(),
            totals,
            score: totals.value(),
        }
    }
}

/// A unified diff showing one mutation applied to its file, without any
/// instrumentation scaffolding.
pub fn mutation_diff(
    unit: &CompilationUnit,
    mutation: &Mutation,
    label: &str,
    render_options: &RenderOptions,
) -> Option<String> {
    let patched = apply_replacement(unit, mutation.span, &mutation.replacement)?;
    let original = render_unit(unit, render_options).text;
    let mutated = render_unit(&patched, render_options).text;
    Some(
        TextDiff::from_lines(&original, &mutated)
            .unified_diff()
            .context_radius(8)
            .header(unit.path.as_str(), label)
            .to_string(),
    )
}
