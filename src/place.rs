// Copyright 2023 - 2026 The Gauntlet Authors

//! Placement of mutants into the instrumented tree.
//!
//! All mutants of a session live in one binary; a placement is the runtime
//! switch that selects one mutated branch (or the original) based on the
//! process-wide active-mutant id. Expressions get a conditional chain,
//! statements an if/else chain, and every branch entry carries a coverage
//! probe. Placement metadata is recorded so the rollback loop can excise a
//! specific mutant without re-running the mutators.

use crate::ast::{
    Expr, ExprKind, ExprSwitch, HitKind, NodeKind, PlacementKind, Stmt, StmtKind, StmtSwitch,
    SwitchArm,
};
use crate::mutant::MutantId;

/// Syntactic context of a candidate placement.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceContext {
    /// Inside a `const` initializer: the value must stay a compile-time
    /// constant, so a runtime conditional cannot wrap it.
    pub in_const: bool,
    /// Inside a one-time initializer (static field, module initializer).
    /// Recognition is conservative; when in doubt callers set this.
    pub in_static_init: bool,
    /// Node kind of the parent, recorded for diagnostics.
    pub parent: NodeKind,
}

impl PlaceContext {
    pub fn hit_kind(&self) -> HitKind {
        if self.in_static_init {
            HitKind::Static
        } else {
            HitKind::Normal
        }
    }
}

/// Why a placement was refused.
pub const UNSUPPORTED_PLACEMENT: &str = "unsupported placement";

/// Per-mutant injection bookkeeping, captured at placement time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlacementMeta {
    pub mutant_id: MutantId,
    pub placement: PlacementKind,
    pub parent: NodeKind,
}

/// Installs placements and accumulates their metadata for one file.
#[derive(Debug, Default)]
pub struct Placer {
    records: Vec<PlacementMeta>,
}

impl Placer {
    pub fn new() -> Placer {
        Placer::default()
    }

    /// Whether a conditional can legally wrap this position. When this
    /// returns `Some(reason)` the candidate mutations are dropped.
    pub fn refusal(ctx: &PlaceContext) -> Option<&'static str> {
        if ctx.in_const {
            Some(UNSUPPORTED_PLACEMENT)
        } else {
            None
        }
    }

    /// Wrap an expression position. `original` is the child-rewritten
    /// original subtree; each arm body is the original with exactly one
    /// mutation applied.
    pub fn place_expr(
        &mut self,
        arms: Vec<(MutantId, Expr)>,
        original: Expr,
        ctx: &PlaceContext,
    ) -> Expr {
        debug_assert!(!arms.is_empty());
        for (mutant_id, _) in &arms {
            self.records.push(PlacementMeta {
                mutant_id: *mutant_id,
                placement: PlacementKind::Expression,
                parent: ctx.parent,
            });
        }
        let span = original.span;
        Expr::with_span(
            ExprKind::MutantSwitch(ExprSwitch {
                arms: arms
                    .into_iter()
                    .map(|(mutant_id, body)| SwitchArm { mutant_id, body })
                    .collect(),
                original: Box::new(original),
                hit: ctx.hit_kind(),
            }),
            span,
        )
    }

    /// Wrap a statement position.
    pub fn place_stmt(
        &mut self,
        arms: Vec<(MutantId, Stmt)>,
        original: Stmt,
        ctx: &PlaceContext,
    ) -> Stmt {
        debug_assert!(!arms.is_empty());
        for (mutant_id, _) in &arms {
            self.records.push(PlacementMeta {
                mutant_id: *mutant_id,
                placement: PlacementKind::Statement,
                parent: ctx.parent,
            });
        }
        let leading = original.leading.clone();
        let span = original.span;
        Stmt {
            kind: StmtKind::MutantSwitch(StmtSwitch {
                arms: arms
                    .into_iter()
                    .map(|(mutant_id, body)| SwitchArm { mutant_id, body })
                    .collect(),
                original: Box::new(original),
                hit: ctx.hit_kind(),
            }),
            span,
            leading,
        }
    }

    pub fn into_records(self) -> Vec<PlacementMeta> {
        self.records
    }
}
