// Copyright 2023 - 2026 The Gauntlet Authors

//! The catalog of mutation rules.
//!
//! Every rule is pure: `apply` never mutates the node it inspects and
//! returns structurally identical output when called twice. Rules yield
//! nothing when the node kind matches but no semantic rule applies (for
//! example `+` on strings is concatenation and is left alone).

use std::collections::HashMap;

use tracing::trace;

use crate::ast::{
    AssignOp, BinOp, Expr, ExprKind, NodeKind, Stmt, StmtKind, Trivia, UnaryOp,
};
use crate::frontend::{Semantics, TypeTag};
use crate::mutant::{Mutation, MutationKind, MutationLevel, Replacement};

/// A syntax site a mutator may inspect.
#[derive(Clone, Copy, Debug)]
pub enum MutationSite<'a> {
    Expr(&'a Expr),
    Stmt(&'a Stmt),
}

impl MutationSite<'_> {
    pub fn node_kind(&self) -> NodeKind {
        match self {
            MutationSite::Expr(e) => e.node_kind(),
            MutationSite::Stmt(s) => s.node_kind(),
        }
    }
}

/// The mutation rules, as a tagged sum with a single dispatch function
/// rather than a trait-object hierarchy, so the registry stays data-driven
/// and each rule is trivially testable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mutator {
    Arithmetic,
    Equality,
    BooleanLiteral,
    StringLiteral,
    Update,
    CheckedRemoval,
    NullConditional,
    CollectionInit,
    Linq,
    AssignmentOp,
}

/// All rules, in registry order.
pub const ALL_MUTATORS: &[Mutator] = &[
    Mutator::Arithmetic,
    Mutator::Equality,
    Mutator::BooleanLiteral,
    Mutator::StringLiteral,
    Mutator::Update,
    Mutator::CheckedRemoval,
    Mutator::NullConditional,
    Mutator::CollectionInit,
    Mutator::Linq,
    Mutator::AssignmentOp,
];

impl Mutator {
    pub fn kind(self) -> MutationKind {
        match self {
            Mutator::Arithmetic => MutationKind::Arithmetic,
            Mutator::Equality => MutationKind::Equality,
            Mutator::BooleanLiteral => MutationKind::Boolean,
            Mutator::StringLiteral => MutationKind::String,
            Mutator::Update => MutationKind::Update,
            Mutator::CheckedRemoval => MutationKind::CheckedRemoval,
            Mutator::NullConditional => MutationKind::NullConditional,
            Mutator::CollectionInit => MutationKind::CollectionInit,
            Mutator::Linq => MutationKind::Linq,
            Mutator::AssignmentOp => MutationKind::Assignment,
        }
    }

    /// The node kinds this rule registers for.
    pub fn node_kinds(self) -> &'static [NodeKind] {
        match self {
            Mutator::Arithmetic | Mutator::Equality => &[NodeKind::Binary],
            Mutator::BooleanLiteral => &[NodeKind::BoolLiteral],
            Mutator::StringLiteral => &[NodeKind::StringLiteral, NodeKind::InterpolatedString],
            Mutator::Update => &[NodeKind::Unary],
            Mutator::CheckedRemoval => &[NodeKind::Checked],
            Mutator::NullConditional => &[NodeKind::Member, NodeKind::Call],
            Mutator::CollectionInit => &[NodeKind::Collection],
            Mutator::Linq => &[NodeKind::Call],
            Mutator::AssignmentOp => &[NodeKind::Assignment],
        }
    }

    /// Minimum session level at which this rule participates.
    pub fn min_level(self) -> MutationLevel {
        match self {
            Mutator::Arithmetic | Mutator::Equality | Mutator::BooleanLiteral => {
                MutationLevel::Basic
            }
            Mutator::Update | Mutator::StringLiteral | Mutator::AssignmentOp => {
                MutationLevel::Standard
            }
            Mutator::CheckedRemoval | Mutator::NullConditional | Mutator::CollectionInit => {
                MutationLevel::Advanced
            }
            Mutator::Linq => MutationLevel::Complete,
        }
    }

    /// Propose mutations for a site. Pure: the input node is never touched.
    pub fn apply(self, site: MutationSite<'_>, sem: &Semantics) -> Vec<Mutation> {
        match (self, site) {
            (Mutator::Arithmetic, MutationSite::Expr(e)) => arithmetic(e, sem),
            (Mutator::Equality, MutationSite::Expr(e)) => equality(e),
            (Mutator::BooleanLiteral, MutationSite::Expr(e)) => boolean_literal(e),
            (Mutator::StringLiteral, MutationSite::Expr(e)) => string_literal(e),
            (Mutator::Update, MutationSite::Expr(e)) => update(e),
            (Mutator::CheckedRemoval, MutationSite::Expr(e)) => checked_removal(e),
            (Mutator::NullConditional, MutationSite::Expr(e)) => null_conditional(e),
            (Mutator::CollectionInit, MutationSite::Expr(e)) => collection_init(e),
            (Mutator::Linq, MutationSite::Expr(e)) => linq(e),
            (Mutator::AssignmentOp, MutationSite::Stmt(s)) => assignment_op(s),
            _ => Vec::new(),
        }
    }
}

/// Rules indexed by the node kind they apply to.
pub struct MutatorRegistry {
    by_kind: HashMap<NodeKind, Vec<Mutator>>,
}

impl MutatorRegistry {
    pub fn standard() -> MutatorRegistry {
        MutatorRegistry::from_mutators(ALL_MUTATORS)
    }

    pub fn from_mutators(mutators: &[Mutator]) -> MutatorRegistry {
        let mut by_kind: HashMap<NodeKind, Vec<Mutator>> = HashMap::new();
        for &m in mutators {
            for &k in m.node_kinds() {
                by_kind.entry(k).or_default().push(m);
            }
        }
        MutatorRegistry { by_kind }
    }

    /// All mutations proposed for a site by rules at or below `level`,
    /// excluding any rule kinds the options disabled.
    pub fn mutations_for(
        &self,
        site: MutationSite<'_>,
        sem: &Semantics,
        level: MutationLevel,
        excluded: &[MutationKind],
    ) -> Vec<Mutation> {
        let Some(mutators) = self.by_kind.get(&site.node_kind()) else {
            return Vec::new();
        };
        let mut mutations = Vec::new();
        for m in mutators {
            if m.min_level() > level {
                trace!(mutator = ?m, ?level, "below session level, skipped");
                continue;
            }
            if excluded.contains(&m.kind()) {
                continue;
            }
            mutations.extend(m.apply(site, sem));
        }
        mutations
    }
}

/// A replacement expression: the original's shell with a new kind, trivia
/// carried over with comments stripped.
fn replace_expr(orig: &Expr, kind: ExprKind) -> Expr {
    Expr {
        kind,
        span: orig.span,
        trivia: Trivia::inherit(&orig.trivia),
    }
}

fn expr_mutation(orig: &Expr, kind: MutationKind, display: String, new: ExprKind) -> Mutation {
    Mutation {
        kind,
        display,
        replacement: Replacement::Expr(replace_expr(orig, new)),
        span: orig.span,
    }
}

fn arithmetic(e: &Expr, sem: &Semantics) -> Vec<Mutation> {
    let ExprKind::Binary { op, lhs, rhs } = &e.kind else {
        return Vec::new();
    };
    let swapped = match op {
        BinOp::Add => {
            // `+` on strings is concatenation; no arithmetic dual exists.
            if sem.expr_type(lhs) == TypeTag::Str || sem.expr_type(rhs) == TypeTag::Str {
                trace!("skip + on string operands");
                return Vec::new();
            }
            BinOp::Sub
        }
        BinOp::Sub => BinOp::Add,
        BinOp::Mul => BinOp::Div,
        BinOp::Div => BinOp::Mul,
        BinOp::Rem => BinOp::Mul,
        _ => return Vec::new(),
    };
    vec![expr_mutation(
        e,
        MutationKind::Arithmetic,
        format!("replace {op} with {swapped}"),
        ExprKind::Binary {
            op: swapped,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        },
    )]
}

fn equality(e: &Expr) -> Vec<Mutation> {
    let ExprKind::Binary { op, lhs, rhs } = &e.kind else {
        return Vec::new();
    };
    let swaps: &[BinOp] = match op {
        BinOp::Eq => &[BinOp::Ne],
        BinOp::Ne => &[BinOp::Eq],
        BinOp::Lt => &[BinOp::Le, BinOp::Ge],
        BinOp::Le => &[BinOp::Lt, BinOp::Gt],
        BinOp::Gt => &[BinOp::Ge, BinOp::Le],
        BinOp::Ge => &[BinOp::Gt, BinOp::Lt],
        _ => return Vec::new(),
    };
    swaps
        .iter()
        .map(|&swapped| {
            expr_mutation(
                e,
                MutationKind::Equality,
                format!("replace {op} with {swapped}"),
                ExprKind::Binary {
                    op: swapped,
                    lhs: lhs.clone(),
                    rhs: rhs.clone(),
                },
            )
        })
        .collect()
}

fn boolean_literal(e: &Expr) -> Vec<Mutation> {
    let ExprKind::Bool(value) = e.kind else {
        return Vec::new();
    };
    vec![expr_mutation(
        e,
        MutationKind::Boolean,
        format!("replace {value} with {}", !value),
        ExprKind::Bool(!value),
    )]
}

/// Filler for blanked-out empty strings, distinctive enough to notice.
const STRING_FILLER: &str = "xyzzy";

fn string_literal(e: &Expr) -> Vec<Mutation> {
    match &e.kind {
        ExprKind::Str(s) if s.is_empty() => vec![expr_mutation(
            e,
            MutationKind::String,
            format!("replace \"\" with \"{STRING_FILLER}\""),
            ExprKind::Str(STRING_FILLER.to_owned()),
        )],
        ExprKind::Str(s) => vec![expr_mutation(
            e,
            MutationKind::String,
            format!("replace \"{}\" with \"\"", elide(s)),
            ExprKind::Str(String::new()),
        )],
        ExprKind::Interp(_) => vec![expr_mutation(
            e,
            MutationKind::String,
            "replace interpolated string with \"\"".to_owned(),
            ExprKind::Str(String::new()),
        )],
        _ => Vec::new(),
    }
}

fn elide(s: &str) -> String {
    if s.chars().count() > 24 {
        let head: String = s.chars().take(21).collect();
        format!("{head}...")
    } else {
        s.to_owned()
    }
}

fn update(e: &Expr) -> Vec<Mutation> {
    let ExprKind::Unary {
        op,
        fixity,
        operand,
    } = &e.kind
    else {
        return Vec::new();
    };
    // Only increment/decrement swap; `!` and unary `-` are left unchanged.
    let swapped = match op {
        UnaryOp::Incr => UnaryOp::Decr,
        UnaryOp::Decr => UnaryOp::Incr,
        UnaryOp::Not | UnaryOp::Neg => return Vec::new(),
    };
    vec![expr_mutation(
        e,
        MutationKind::Update,
        format!("replace {} with {}", op.as_str(), swapped.as_str()),
        ExprKind::Unary {
            op: swapped,
            fixity: *fixity,
            operand: operand.clone(),
        },
    )]
}

fn checked_removal(e: &Expr) -> Vec<Mutation> {
    let ExprKind::Checked(inner) = &e.kind else {
        return Vec::new();
    };
    // Unwrap to the inner expression; the replacement root takes the
    // `checked` node's whitespace trivia, comments stripped.
    let mut replacement = (**inner).clone();
    replacement.trivia = Trivia::inherit(&e.trivia);
    replacement.span = e.span;
    vec![Mutation {
        kind: MutationKind::CheckedRemoval,
        display: "remove checked".to_owned(),
        replacement: Replacement::Expr(replacement),
        span: e.span,
    }]
}

fn null_conditional(e: &Expr) -> Vec<Mutation> {
    match &e.kind {
        ExprKind::Member {
            base,
            name,
            null_conditional: true,
        } => vec![expr_mutation(
            e,
            MutationKind::NullConditional,
            "replace ?. with .".to_owned(),
            ExprKind::Member {
                base: base.clone(),
                name: name.clone(),
                null_conditional: false,
            },
        )],
        ExprKind::Call {
            receiver,
            method,
            args,
            null_conditional: true,
        } => vec![expr_mutation(
            e,
            MutationKind::NullConditional,
            "replace ?. with .".to_owned(),
            ExprKind::Call {
                receiver: receiver.clone(),
                method: method.clone(),
                args: args.clone(),
                null_conditional: false,
            },
        )],
        _ => Vec::new(),
    }
}

fn collection_init(e: &Expr) -> Vec<Mutation> {
    match &e.kind {
        ExprKind::Collection(items) if !items.is_empty() => vec![expr_mutation(
            e,
            MutationKind::CollectionInit,
            "empty collection initializer".to_owned(),
            ExprKind::Collection(Vec::new()),
        )],
        _ => Vec::new(),
    }
}

/// Query-style method duals.
const LINQ_SWAPS: &[(&str, &str)] = &[
    ("First", "Last"),
    ("Last", "First"),
    ("FirstOrDefault", "LastOrDefault"),
    ("LastOrDefault", "FirstOrDefault"),
    ("Any", "All"),
    ("All", "Any"),
    ("Max", "Min"),
    ("Min", "Max"),
    ("Sum", "Count"),
    ("Count", "Sum"),
    ("OrderBy", "OrderByDescending"),
    ("OrderByDescending", "OrderBy"),
];

fn linq(e: &Expr) -> Vec<Mutation> {
    let ExprKind::Call {
        receiver: Some(receiver),
        method,
        args,
        null_conditional,
    } = &e.kind
    else {
        return Vec::new();
    };
    let Some(&(_, swapped)) = LINQ_SWAPS.iter().find(|(from, _)| from == method) else {
        return Vec::new();
    };
    vec![expr_mutation(
        e,
        MutationKind::Linq,
        format!("replace {method} with {swapped}"),
        ExprKind::Call {
            receiver: Some(receiver.clone()),
            method: swapped.to_owned(),
            args: args.clone(),
            null_conditional: *null_conditional,
        },
    )]
}

fn assignment_op(s: &Stmt) -> Vec<Mutation> {
    let StmtKind::Assign { target, op, value } = &s.kind else {
        return Vec::new();
    };
    let swapped = match op {
        AssignOp::AddAssign => AssignOp::SubAssign,
        AssignOp::SubAssign => AssignOp::AddAssign,
        AssignOp::MulAssign => AssignOp::DivAssign,
        AssignOp::DivAssign => AssignOp::MulAssign,
        AssignOp::RemAssign => AssignOp::MulAssign,
        AssignOp::ShlAssign => AssignOp::ShrAssign,
        AssignOp::ShrAssign => AssignOp::ShlAssign,
        // Plain `=` has no useful dual.
        AssignOp::Assign => return Vec::new(),
    };
    let replacement = Stmt {
        kind: StmtKind::Assign {
            target: target.clone(),
            op: swapped,
            value: value.clone(),
        },
        span: s.span,
        leading: crate::ast::strip_comments(&s.leading),
    };
    vec![Mutation {
        kind: MutationKind::Assignment,
        display: format!("replace {op} with {swapped}"),
        replacement: Replacement::Stmt(replacement),
        span: s.span,
    }]
}
