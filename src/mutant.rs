// Copyright 2023 - 2026 The Gauntlet Authors

//! Mutations proposed at syntax sites, and the tracked mutants made from them.

use std::collections::BTreeSet;
use std::fmt;

use console::{style, StyledObject};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::ast::{Expr, Stmt};
use crate::platform::TestId;
use crate::span::Span;

/// Globally unique mutant identifier, stable for a given source tree and
/// mutator set. Assigned in source-traversal order and never reused.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutantId(pub u32);

impl fmt::Display for MutantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Broad categories of mutation rules.
#[derive(
    Clone, Copy, Eq, PartialEq, Debug, Hash, Serialize, strum::Display, strum::EnumString,
)]
pub enum MutationKind {
    /// Swap an arithmetic binary operator, `+` to `-` and so on.
    Arithmetic,
    /// Flip an equality or relational operator.
    Equality,
    /// Flip a boolean literal.
    Boolean,
    /// Blank a string literal, or fill an empty one.
    String,
    /// Swap `++` for `--` in either fixity.
    Update,
    /// Unwrap a `checked(...)` region.
    CheckedRemoval,
    /// Collapse `?.` to `.`.
    NullConditional,
    /// Empty a collection initializer.
    CollectionInit,
    /// Swap a query-style method for its dual, `First` to `Last` etc.
    Linq,
    /// Swap a compound assignment operator.
    Assignment,
}

/// How deep a mutation session digs. Each mutator declares the minimum
/// level at which it participates.
#[derive(
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MutationLevel {
    Basic,
    #[default]
    Standard,
    Advanced,
    Complete,
}

/// A replacement subtree: expression-shaped or statement-shaped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Replacement {
    Expr(Expr),
    Stmt(Stmt),
}

/// A proposed edit at one syntax site. Immutable once created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mutation {
    /// Category of the rule that proposed this edit.
    pub kind: MutationKind,
    /// Human-readable description, like `replace ++ with --`.
    pub display: String,
    /// The synthesized replacement subtree.
    pub replacement: Replacement,
    /// Location of the original node in its source file.
    pub span: Span,
}

/// The terminal classification of a mutant.
#[derive(
    Clone,
    Copy,
    Eq,
    PartialEq,
    Debug,
    Default,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
pub enum MutantStatus {
    /// Not yet classified.
    #[default]
    Pending,
    /// Excluded by a filter or an unsupported placement.
    Ignored,
    /// Removed during the rollback loop because it broke the build.
    CompileError,
    /// No test executed this mutant's site during the coverage run.
    NoCoverage,
    /// A covering test failed while this mutant was active.
    Killed,
    /// Every covering test passed while this mutant was active.
    Survived,
    /// A covering test exceeded the timeout while this mutant was active.
    Timeout,
}

impl MutantStatus {
    /// Once a mutant leaves `Pending` it never transitions again.
    pub fn is_terminal(self) -> bool {
        self != MutantStatus::Pending
    }

    /// Timeouts count as caught for scoring purposes.
    pub fn counts_as_killed(self) -> bool {
        matches!(self, MutantStatus::Killed | MutantStatus::Timeout)
    }
}

/// A tracked instance of a [`Mutation`], identified by a stable id.
///
/// The originating node is referenced as a weak locator (path plus span),
/// never as an owning tree reference: the mutated tree owns its nodes
/// exclusively.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mutant {
    pub id: MutantId,
    pub file: camino::Utf8PathBuf,
    pub span: Span,
    pub kind: MutationKind,
    pub display: String,
    /// Name of the enclosing function or item, for display.
    pub scope: Option<String>,
    pub status: MutantStatus,
    pub status_reason: Option<String>,
    /// Tests whose execution reached this mutant's site.
    pub covering_tests: BTreeSet<TestId>,
    /// Tests that reached this site from a one-time initializer.
    pub static_covering: BTreeSet<TestId>,
    /// True when the site was first reached from a static context; such a
    /// mutant must be run against every test.
    pub is_static: bool,
    /// Tests that failed while this mutant was active.
    pub killing_tests: Vec<TestId>,
}

impl Mutant {
    pub fn new(
        id: MutantId,
        file: impl Into<camino::Utf8PathBuf>,
        scope: Option<String>,
        mutation: &Mutation,
    ) -> Mutant {
        Mutant {
            id,
            file: file.into(),
            span: mutation.span,
            kind: mutation.kind,
            display: mutation.display.clone(),
            scope,
            status: MutantStatus::Pending,
            status_reason: None,
            covering_tests: BTreeSet::new(),
            static_covering: BTreeSet::new(),
            is_static: false,
            killing_tests: Vec::new(),
        }
    }

    /// A one-line name, like
    /// `src/calc.gx:3:9: replace ++ with -- in bump`.
    pub fn name(&self, show_line_col: bool) -> String {
        let mut v = Vec::new();
        v.push(self.file.to_string());
        if show_line_col {
            v.push(format!(
                ":{}:{}: ",
                self.span.start.line, self.span.start.column
            ));
        } else {
            v.push(": ".to_owned());
        }
        v.extend(
            self.styled_parts()
                .into_iter()
                .map(|x| x.force_styling(false).to_string()),
        );
        v.join("")
    }

    /// The same name with coloring for terminal output.
    pub fn to_styled_string(&self, show_line_col: bool) -> String {
        let mut v = Vec::new();
        v.push(self.file.to_string());
        if show_line_col {
            v.push(format!(
                ":{}:{}",
                self.span.start.line, self.span.start.column
            ));
        }
        v.push(": ".to_owned());
        v.extend(self.styled_parts().into_iter().map(|x| x.to_string()));
        v.join("")
    }

    fn styled_parts(&self) -> Vec<StyledObject<String>> {
        // Like `impl Display` but with colors; the text content matches.
        fn s<S: ToString>(s: S) -> StyledObject<String> {
            style(s.to_string())
        }
        let mut v: Vec<StyledObject<String>> = vec![s(&self.display).yellow()];
        if let Some(scope) = &self.scope {
            v.push(s(" in "));
            v.push(s(scope).bright().magenta());
        }
        v
    }
}

impl fmt::Display for Mutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name(true))
    }
}

impl Serialize for Mutant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Custom serialize to omit inessential info and keep the report
        // shape stable.
        let mut ss = serializer.serialize_struct("Mutant", 9)?;
        ss.serialize_field("id", &self.id)?;
        ss.serialize_field("file", &self.file)?;
        ss.serialize_field("span", &self.span)?;
        ss.serialize_field("kind", &self.kind)?;
        ss.serialize_field("display", &self.display)?;
        ss.serialize_field("scope", &self.scope)?;
        ss.serialize_field("status", &self.status)?;
        ss.serialize_field("status_reason", &self.status_reason)?;
        ss.serialize_field("killing_tests", &self.killing_tests)?;
        ss.end()
    }
}

/// A source file together with its instrumented form and the mutants
/// produced from it.
#[derive(Clone, Debug)]
pub struct MutatedFile {
    pub path: camino::Utf8PathBuf,
    pub original: crate::ast::CompilationUnit,
    pub mutated: crate::ast::CompilationUnit,
    /// Ids of mutants placed in this file, in allocation order.
    pub mutant_ids: Vec<MutantId>,
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::ast::{Expr, ExprKind};

    use super::*;

    fn mutation() -> Mutation {
        Mutation {
            kind: MutationKind::Update,
            display: "replace x++ with x--".to_owned(),
            replacement: Replacement::Expr(Expr::new(ExprKind::Int(0))),
            span: Span::quad(3, 9, 3, 12),
        }
    }

    #[test]
    fn level_ordering() {
        use MutationLevel::*;
        assert!(Basic < Standard);
        assert!(Standard < Advanced);
        assert!(Advanced < Complete);
        assert_eq!(MutationLevel::default(), Standard);
    }

    #[test]
    fn level_from_str() {
        use std::str::FromStr;
        assert_eq!(
            MutationLevel::from_str("advanced").unwrap(),
            MutationLevel::Advanced
        );
        assert!(MutationLevel::from_str("extreme").is_err());
    }

    #[test]
    fn mutant_name_with_and_without_line_col() {
        let mutant = Mutant::new(
            MutantId(4),
            "src/calc.gx",
            Some("bump".to_owned()),
            &mutation(),
        );
        assert_eq!(
            mutant.name(true),
            "src/calc.gx:3:9: replace x++ with x-- in bump"
        );
        assert_eq!(
            mutant.name(false),
            "src/calc.gx: replace x++ with x-- in bump"
        );
    }

    #[test]
    fn status_terminality() {
        assert!(!MutantStatus::Pending.is_terminal());
        assert!(MutantStatus::Killed.is_terminal());
        assert!(MutantStatus::Ignored.is_terminal());
        assert!(MutantStatus::Timeout.counts_as_killed());
        assert!(!MutantStatus::Survived.counts_as_killed());
    }

    #[test]
    fn serialize_omits_coverage_sets() {
        let mutant = Mutant::new(MutantId(1), "src/calc.gx", None, &mutation());
        let json = serde_json::to_value(&mutant).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["kind"], "Update");
        assert_eq!(json["status"], "Pending");
        assert!(json.get("covering_tests").is_none());
    }
}
