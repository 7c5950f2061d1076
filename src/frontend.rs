// Copyright 2024 - 2026 The Gauntlet Authors

//! Contracts for the language-frontend collaborator.
//!
//! Parsing, semantic analysis, and compilation of the target language live
//! behind these traits. The engine only ever sees the [`crate::ast`] tree, a
//! [`Semantics`] model, and compiler diagnostics with source spans.

use std::collections::HashMap;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};

use crate::ast::{BinOp, CompilationUnit, Expr, ExprKind};
use crate::span::Span;

/// Coarse type classification, enough for the semantic rules the mutators
/// apply (e.g. `+` on strings is concatenation, not arithmetic).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeTag {
    Int,
    Bool,
    Str,
    List,
    Unknown,
}

/// Semantic information for one compilation unit.
///
/// Frontends with a real binder can fill this precisely; the reference
/// frontend derives it from declarations alone.
#[derive(Clone, Debug, Default)]
pub struct Semantics {
    var_types: HashMap<String, TypeTag>,
}

impl Semantics {
    pub fn empty() -> Semantics {
        Semantics::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, ty: TypeTag) {
        self.var_types.insert(name.into(), ty);
    }

    /// Best-effort type of an expression.
    pub fn expr_type(&self, e: &Expr) -> TypeTag {
        match &e.kind {
            ExprKind::Int(_) => TypeTag::Int,
            ExprKind::Bool(_) => TypeTag::Bool,
            ExprKind::Str(_) | ExprKind::Interp(_) => TypeTag::Str,
            ExprKind::Collection(_) => TypeTag::List,
            ExprKind::Ident(name) => self
                .var_types
                .get(name)
                .copied()
                .unwrap_or(TypeTag::Unknown),
            ExprKind::Checked(inner) => self.expr_type(inner),
            ExprKind::Unary { operand, .. } => self.expr_type(operand),
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
                | BinOp::And | BinOp::Or => TypeTag::Bool,
                BinOp::Add => {
                    // String concatenation is contagious.
                    if self.expr_type(lhs) == TypeTag::Str || self.expr_type(rhs) == TypeTag::Str {
                        TypeTag::Str
                    } else {
                        TypeTag::Int
                    }
                }
                _ => TypeTag::Int,
            },
            ExprKind::Conditional { then_expr, .. } => self.expr_type(then_expr),
            ExprKind::Call { .. } | ExprKind::Member { .. } => TypeTag::Unknown,
            ExprKind::MutantSwitch(switch) => self.expr_type(&switch.original),
        }
    }
}

/// A compiler diagnostic attributed to a span in a rendered unit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub path: Utf8PathBuf,
    pub span: Span,
    pub message: String,
}

/// The rendered text of one unit, ready to compile.
#[derive(Clone, Debug)]
pub struct RenderedUnit {
    pub path: Utf8PathBuf,
    pub text: String,
}

/// Result of one compile attempt.
#[derive(Clone, Debug)]
pub enum CompileOutcome {
    /// Compilation succeeded; the artifact was written to the requested
    /// output path, with debug symbols alongside when available.
    Success {
        binary: Utf8PathBuf,
        symbols: Option<Utf8PathBuf>,
    },
    Failed(Vec<Diagnostic>),
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileOutcome::Success { .. })
    }
}

/// The language-frontend collaborator.
pub trait Frontend {
    /// Parse one source file to a tree. A parse failure is fatal for that
    /// file and surfaces as an error.
    fn parse(&self, path: &Utf8Path) -> Result<CompilationUnit>;

    /// Semantic information for a parsed tree.
    fn semantics(&self, unit: &CompilationUnit) -> Semantics;

    /// Compile the rendered units into `output`.
    fn compile(&self, units: &[RenderedUnit], output: &Utf8Path) -> Result<CompileOutcome>;
}
