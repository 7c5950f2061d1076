// Copyright 2024 - 2026 The Gauntlet Authors

//! The compile/rollback loop.
//!
//! Some placed mutants will not compile (a swapped operator can change an
//! expression's type, an unwrapped `checked` can feed a constant fold).
//! Rather than predicting viability, the loop compiles the instrumented
//! tree, maps each diagnostic back to the tightest enclosing placement,
//! excises the offending mutants, and retries. Each iteration strictly
//! shrinks the live set, so the loop ends within live-mutant-count rounds.

use std::collections::BTreeSet;

use anyhow::Result;
use camino::Utf8Path;
use tracing::{debug, info, warn};

use crate::ast::{excise_mutants, render_unit, RenderOptions, RenderedInjection};
use crate::error::EngineError;
use crate::frontend::{CompileOutcome, Diagnostic, Frontend, RenderedUnit};
use crate::interrupt::check_interrupted;
use crate::mutant::{MutantId, MutantStatus, MutatedFile};
use crate::session::Session;

/// The compiled instrumented binary.
#[derive(Clone, Debug)]
pub struct CompiledArtifact {
    pub binary: camino::Utf8PathBuf,
    pub symbols: Option<camino::Utf8PathBuf>,
}

/// Compile the mutated files, rolling back mutants that break the build,
/// until the tree compiles or no blame can be assigned.
pub fn compile_with_rollback(
    frontend: &dyn Frontend,
    files: &mut [MutatedFile],
    render_options: &RenderOptions,
    output: &Utf8Path,
    session: &mut Session,
) -> Result<CompiledArtifact> {
    // One extra round for the initial attempt; after that every iteration
    // must excise at least one mutant.
    let max_rounds = 2 + files.iter().map(|f| f.mutant_ids.len()).sum::<usize>();
    for round in 0..max_rounds {
        check_interrupted()?;
        let mut units = Vec::with_capacity(files.len());
        let mut injections = Vec::with_capacity(files.len());
        for file in files.iter() {
            let rendered = render_unit(&file.mutated, render_options);
            units.push(RenderedUnit {
                path: file.path.clone(),
                text: rendered.text,
            });
            injections.push(rendered.injections);
        }
        match frontend.compile(&units, output)? {
            CompileOutcome::Success { binary, symbols } => {
                debug!(round, "instrumented tree compiled");
                return Ok(CompiledArtifact { binary, symbols });
            }
            CompileOutcome::Failed(diagnostics) => {
                let offenders = blame(&diagnostics, files, &injections);
                if offenders.is_empty() {
                    let first = diagnostics
                        .first()
                        .map(describe_diagnostic)
                        .unwrap_or_else(|| "no diagnostics reported".to_owned());
                    return Err(EngineError::CompileUnrecoverable(first).into());
                }
                info!(
                    round,
                    rolled_back = offenders.len(),
                    "excising mutants that broke the build"
                );
                for (id, message) in &offenders {
                    session.set_status(
                        *id,
                        MutantStatus::CompileError,
                        Some(message.clone()),
                    );
                }
                let ids: BTreeSet<MutantId> = offenders.iter().map(|(id, _)| *id).collect();
                for file in files.iter_mut() {
                    excise_mutants(&mut file.mutated, &ids);
                }
            }
        }
    }
    Err(EngineError::CompileUnrecoverable(
        "rollback did not converge".to_owned(),
    )
    .into())
}

fn describe_diagnostic(d: &Diagnostic) -> String {
    format!("{}:{}: {}", d.path, d.span, d.message)
}

/// Map diagnostics to the mutants whose placements enclose them.
///
/// For each diagnostic the tightest enclosing injection wins; when several
/// injections tie for the same tightest span (a multi-arm switch reported
/// at its wrapper) all of them are blamed. Diagnostics outside any
/// placement blame nobody.
fn blame(
    diagnostics: &[Diagnostic],
    files: &[MutatedFile],
    injections: &[Vec<RenderedInjection>],
) -> Vec<(MutantId, String)> {
    let mut offenders: Vec<(MutantId, String)> = Vec::new();
    for diagnostic in diagnostics {
        let Some(file_index) = files.iter().position(|f| f.path == diagnostic.path) else {
            warn!(path = %diagnostic.path, "diagnostic for unknown file");
            continue;
        };
        let enclosing: Vec<&RenderedInjection> = injections[file_index]
            .iter()
            .filter(|inj| inj.span.contains(diagnostic.span.start))
            .collect();
        let Some(tightest) = enclosing
            .iter()
            .map(|inj| inj.span)
            .reduce(|best, candidate| {
                if candidate.tighter_than(&best) {
                    candidate
                } else {
                    best
                }
            })
        else {
            debug!(
                diagnostic = describe_diagnostic(diagnostic),
                "diagnostic outside any placement"
            );
            continue;
        };
        for inj in enclosing.iter().filter(|inj| inj.span == tightest) {
            if !offenders.iter().any(|(id, _)| *id == inj.mutant_id) {
                offenders.push((inj.mutant_id, describe_diagnostic(diagnostic)));
            }
        }
    }
    offenders
}
