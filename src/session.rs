// Copyright 2024 - 2026 The Gauntlet Authors

//! Session state: the id allocator, the mutant set, and status transitions.
//!
//! The session is the single writer of mutant ids and statuses. Scheduler
//! workers report results over a channel; only the thread owning the
//! `Session` applies verdicts, and a terminal status never changes again.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::coverage::CoverageMatrix;
use crate::mutant::{Mutant, MutantId, MutantStatus};
use crate::options::Options;
use crate::platform::{TestDescription, TestId};

/// Allocates session-global mutant ids in traversal order.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn next_id(&mut self) -> MutantId {
        let id = MutantId(self.next);
        self.next += 1;
        id
    }
}

/// One mutation session over a source tree.
pub struct Session {
    pub options: Options,
    pub mutants: Vec<Mutant>,
    pub tests: Vec<TestDescription>,
}

impl Session {
    pub fn new(options: Options) -> Session {
        Session {
            options,
            mutants: Vec::new(),
            tests: Vec::new(),
        }
    }

    pub fn mutant(&self, id: MutantId) -> Option<&Mutant> {
        self.mutants.iter().find(|m| m.id == id)
    }

    fn mutant_mut(&mut self, id: MutantId) -> Option<&mut Mutant> {
        self.mutants.iter_mut().find(|m| m.id == id)
    }

    /// Mutants still awaiting a verdict.
    pub fn pending(&self) -> impl Iterator<Item = &Mutant> {
        self.mutants
            .iter()
            .filter(|m| m.status == MutantStatus::Pending)
    }

    /// Apply a status transition. Transitions are monotonic: once a mutant
    /// is terminal, later transitions are rejected with a warning.
    pub fn set_status(&mut self, id: MutantId, status: MutantStatus, reason: Option<String>) {
        let Some(mutant) = self.mutant_mut(id) else {
            warn!(%id, "status for unknown mutant dropped");
            return;
        };
        if mutant.status.is_terminal() {
            warn!(
                %id,
                current = %mutant.status,
                rejected = %status,
                "transition after terminal status rejected"
            );
            return;
        }
        debug!(%id, %status, "mutant status");
        mutant.status = status;
        mutant.status_reason = reason;
    }

    /// Record which tests killed a mutant, for reason attribution.
    pub fn record_killers(&mut self, id: MutantId, killers: Vec<TestId>) {
        if let Some(mutant) = self.mutant_mut(id) {
            mutant.killing_tests = killers;
        }
    }

    /// Fold the coverage matrix into the mutant set: store covering tests,
    /// flag static mutants, and classify uncovered non-static mutants as
    /// `NoCoverage` immediately.
    pub fn apply_coverage(&mut self, matrix: &CoverageMatrix) {
        let no_coverage: Vec<MutantId> = self
            .mutants
            .iter_mut()
            .filter(|m| m.status == MutantStatus::Pending)
            .filter_map(|m| {
                if let Some(entry) = matrix.entry(m.id) {
                    m.covering_tests = entry.tests.clone();
                    m.static_covering = entry.static_tests.clone();
                    m.is_static = entry.is_static;
                }
                if m.covering_tests.is_empty() && !m.is_static {
                    Some(m.id)
                } else {
                    None
                }
            })
            .collect();
        for id in no_coverage {
            self.set_status(id, MutantStatus::NoCoverage, None);
        }
    }

    /// Ids of mutants that can still change the verdict: not yet terminal.
    pub fn live_ids(&self) -> BTreeSet<MutantId> {
        self.pending().map(|m| m.id).collect()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::mutant::{Mutation, MutationKind, Replacement};
    use crate::span::Span;

    use super::*;

    fn mutant(id: u32) -> Mutant {
        let mutation = Mutation {
            kind: MutationKind::Arithmetic,
            display: "replace + with -".to_owned(),
            replacement: Replacement::Expr(crate::ast::Expr::new(crate::ast::ExprKind::Int(0))),
            span: Span::quad(1, 1, 1, 2),
        };
        Mutant::new(MutantId(id), "src/a.gx", None, &mutation)
    }

    #[test]
    fn id_allocation_is_sequential() {
        let mut alloc = IdAllocator::default();
        assert_eq!(alloc.next_id(), MutantId(0));
        assert_eq!(alloc.next_id(), MutantId(1));
        assert_eq!(alloc.next_id(), MutantId(2));
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut session = Session::new(Options::default());
        session.mutants.push(mutant(0));
        session.set_status(MutantId(0), MutantStatus::Killed, None);
        session.set_status(MutantId(0), MutantStatus::Survived, None);
        assert_eq!(session.mutant(MutantId(0)).unwrap().status, MutantStatus::Killed);
    }

    #[test]
    fn unknown_mutant_status_is_dropped() {
        let mut session = Session::new(Options::default());
        session.set_status(MutantId(9), MutantStatus::Killed, None);
        assert!(session.mutant(MutantId(9)).is_none());
    }

    #[test]
    fn apply_coverage_marks_uncovered() {
        let mut session = Session::new(Options::default());
        session.mutants.push(mutant(0));
        session.mutants.push(mutant(1));
        let mut matrix = CoverageMatrix::default();
        matrix.record_normal(MutantId(0), &TestId::new("t1"));
        session.apply_coverage(&matrix);
        assert_eq!(session.mutant(MutantId(0)).unwrap().status, MutantStatus::Pending);
        assert_eq!(
            session.mutant(MutantId(1)).unwrap().status,
            MutantStatus::NoCoverage
        );
    }
}
