// Copyright 2023 - 2026 The Gauntlet Authors

//! Syntax tree for the mutated target language.
//!
//! The engine does not parse Rust: the language under test is a statically
//! typed, managed-runtime language with a rich expression syntax (compound
//! assignment, pre/postfix increment, `checked` blocks, interpolated
//! strings, null-conditional access). The frontend collaborator produces
//! this tree; the orchestrator rewrites it; the renderer turns it back into
//! compilable text, tracking where every mutant placement landed so compile
//! errors can be blamed on specific mutants.
//!
//! Placements are explicit nodes ([`ExprKind::MutantSwitch`],
//! [`StmtKind::MutantSwitch`]) rather than ad-hoc text edits, so excising a
//! mutant after a compile error is a tree rewrite, not a re-run of the
//! mutators.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::mutant::MutantId;
use crate::span::{LineColumn, Span};

/// Whitespace and comments attached to a node's outermost tokens.
///
/// Mutators must carry the original node's trivia onto a replacement root,
/// with comments stripped, so that a mutated file differs from the original
/// only at the mutated site.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Trivia {
    pub leading: String,
    pub trailing: String,
}

impl Trivia {
    /// Trivia suitable for a replacement node: the original's whitespace and
    /// end-of-line structure, with comment text removed.
    pub fn inherit(original: &Trivia) -> Trivia {
        Trivia {
            leading: strip_comments(&original.leading),
            trailing: strip_comments(&original.trailing),
        }
    }
}

/// Remove `// ...` comment text from a trivia string, keeping all
/// whitespace and newlines.
pub fn strip_comments(trivia: &str) -> String {
    let mut out = String::with_capacity(trivia.len());
    let mut chars = trivia.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' && chars.peek() == Some(&'/') {
            for c in chars.by_ref() {
                if c == '\n' {
                    out.push('\n');
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Binary operators of the target language.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        use BinOp::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            And => "&&",
            Or => "||",
        }
    }

    /// Binding strength, higher binds tighter.
    fn precedence(self) -> u8 {
        use BinOp::*;
        match self {
            Or => 1,
            And => 2,
            Eq | Ne => 3,
            Lt | Le | Gt | Ge => 4,
            Add | Sub => 5,
            Mul | Div | Rem => 6,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operators; `Incr`/`Decr` occur in both fixities.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Incr,
    Decr,
    Not,
    Neg,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Incr => "++",
            UnaryOp::Decr => "--",
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fixity {
    Prefix,
    Postfix,
}

/// Assignment operators, including the compound forms.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ShlAssign,
    ShrAssign,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        use AssignOp::*;
        match self {
            Assign => "=",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            RemAssign => "%=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fragment of an interpolated string: literal text or a hole.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InterpPart {
    Text(String),
    Hole(Expr),
}

/// An expression with its source span and outer trivia.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub trivia: Trivia,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Expr {
        Expr {
            kind,
            span: Span::point(0, 0),
            trivia: Trivia::default(),
        }
    }

    pub fn with_span(kind: ExprKind, span: Span) -> Expr {
        Expr {
            kind,
            span,
            trivia: Trivia::default(),
        }
    }

    /// The registry dispatch key for this node, if any mutator could apply.
    pub fn node_kind(&self) -> NodeKind {
        match &self.kind {
            ExprKind::Int(_) => NodeKind::IntLiteral,
            ExprKind::Bool(_) => NodeKind::BoolLiteral,
            ExprKind::Str(_) => NodeKind::StringLiteral,
            ExprKind::Interp(_) => NodeKind::InterpolatedString,
            ExprKind::Ident(_) => NodeKind::Identifier,
            ExprKind::Binary { .. } => NodeKind::Binary,
            ExprKind::Unary { .. } => NodeKind::Unary,
            ExprKind::Checked(_) => NodeKind::Checked,
            ExprKind::Conditional { .. } => NodeKind::Conditional,
            ExprKind::Call { .. } => NodeKind::Call,
            ExprKind::Member { .. } => NodeKind::Member,
            ExprKind::Collection(_) => NodeKind::Collection,
            ExprKind::MutantSwitch(_) => NodeKind::Placement,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Bool(bool),
    Str(String),
    Interp(Vec<InterpPart>),
    Ident(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        fixity: Fixity,
        operand: Box<Expr>,
    },
    /// `checked(expr)`: overflow-checked arithmetic region.
    Checked(Box<Expr>),
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Call {
        receiver: Option<Box<Expr>>,
        method: String,
        args: Vec<Expr>,
        null_conditional: bool,
    },
    Member {
        base: Box<Expr>,
        name: String,
        null_conditional: bool,
    },
    /// `[a, b, c]` collection initializer.
    Collection(Vec<Expr>),
    /// A mutant placement: selects one arm or the original at runtime.
    MutantSwitch(ExprSwitch),
}

/// Which coverage probe a placement emits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HitKind {
    Normal,
    Static,
}

/// One candidate arm of a placement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwitchArm<T> {
    pub mutant_id: MutantId,
    pub body: T,
}

/// Expression placement: renders as a nested conditional chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExprSwitch {
    pub arms: Vec<SwitchArm<Expr>>,
    pub original: Box<Expr>,
    pub hit: HitKind,
}

/// Statement placement: renders as an if/else-if chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StmtSwitch {
    pub arms: Vec<SwitchArm<Stmt>>,
    pub original: Box<Stmt>,
    pub hit: HitKind,
}

/// A statement, carrying the verbatim leading trivia that preceded it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    pub leading: String,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            span: Span::point(0, 0),
            leading: String::new(),
        }
    }

    pub fn node_kind(&self) -> NodeKind {
        match &self.kind {
            StmtKind::Assign { .. } => NodeKind::Assignment,
            StmtKind::MutantSwitch(_) => NodeKind::Placement,
            _ => NodeKind::OtherStatement,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StmtKind {
    /// `int x = 0;` or `var y;`
    Decl {
        ty: String,
        name: String,
        init: Option<Expr>,
    },
    /// `x += 2;` and friends. Assignment is a statement in this language.
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    /// A bare expression statement, e.g. `x++;` or a call.
    Expr(Expr),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    Return(Option<Expr>),
    MutantSwitch(StmtSwitch),
}

/// A braced statement list; `close_leading` is the trivia before `}`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub close_leading: String,
}

/// A function parameter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
    pub ty: String,
    pub name: String,
}

/// A top-level item with its attributes (`@Name` markers).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    pub span: Span,
    pub leading: String,
    pub attrs: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ItemKind {
    Function {
        name: String,
        params: Vec<Param>,
        ret: Option<String>,
        body: Block,
    },
    /// `static int Counter = 0;`: the initializer runs once, before tests.
    StaticField {
        ty: String,
        name: String,
        init: Expr,
    },
    /// `const int Max = 10;` must stay a compile-time constant.
    ConstField {
        ty: String,
        name: String,
        init: Expr,
    },
    /// `init { ... }`, a module initializer block.
    ModuleInit(Block),
}

impl Item {
    pub fn name(&self) -> &str {
        match &self.kind {
            ItemKind::Function { name, .. }
            | ItemKind::StaticField { name, .. }
            | ItemKind::ConstField { name, .. } => name,
            ItemKind::ModuleInit(_) => "init",
        }
    }
}

/// One parsed source file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompilationUnit {
    pub path: camino::Utf8PathBuf,
    /// Text before the first item: header comments, generated-code markers.
    pub prologue: String,
    pub items: Vec<Item>,
    /// Trailing text after the last item.
    pub epilogue: String,
}

/// Node classification used to index the mutator registry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default, strum::Display)]
pub enum NodeKind {
    IntLiteral,
    BoolLiteral,
    StringLiteral,
    InterpolatedString,
    Identifier,
    Binary,
    Unary,
    Checked,
    Conditional,
    Call,
    Member,
    Collection,
    Assignment,
    Placement,
    #[default]
    OtherStatement,
}

/// Whether a placement wrapped an expression or a statement.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, strum::Display)]
pub enum PlacementKind {
    Expression,
    Statement,
}

/// Where a mutant's placement landed in the rendered output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderedInjection {
    pub mutant_id: MutantId,
    pub span: Span,
    pub placement: PlacementKind,
}

/// The rendered text of one mutated unit plus placement locations.
#[derive(Clone, Debug)]
pub struct Rendered {
    pub text: String,
    pub injections: Vec<RenderedInjection>,
}

/// Options controlling how the instrumented text is emitted.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Namespace of the runtime control type in the instrumented assembly.
    pub helper_namespace: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            helper_namespace: "Gauntlet".to_owned(),
        }
    }
}

/// Render a unit back to compilable text.
///
/// The returned [`Rendered`] records the emitted span of every placement so
/// the rollback loop can map compiler diagnostics to mutant ids.
pub fn render_unit(unit: &CompilationUnit, options: &RenderOptions) -> Rendered {
    let mut r = Renderer::new(options);
    r.push(&unit.prologue);
    for item in &unit.items {
        r.item(item);
    }
    r.push(&unit.epilogue);
    Rendered {
        text: r.out,
        injections: r.injections,
    }
}

struct Renderer<'o> {
    out: String,
    line: usize,
    column: usize,
    injections: Vec<RenderedInjection>,
    options: &'o RenderOptions,
}

impl<'o> Renderer<'o> {
    fn new(options: &'o RenderOptions) -> Self {
        Renderer {
            out: String::new(),
            line: 1,
            column: 1,
            injections: Vec::new(),
            options,
        }
    }

    fn pos(&self) -> LineColumn {
        LineColumn::new(self.line, self.column)
    }

    fn push(&mut self, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.out.push_str(s);
    }

    fn item(&mut self, item: &Item) {
        self.push(&item.leading);
        for attr in &item.attrs {
            self.push("@");
            self.push(attr);
            self.push(" ");
        }
        match &item.kind {
            ItemKind::Function {
                name,
                params,
                ret,
                body,
            } => {
                self.push("fn ");
                self.push(name);
                self.push("(");
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(&p.ty);
                    self.push(" ");
                    self.push(&p.name);
                }
                self.push(")");
                if let Some(ret) = ret {
                    self.push(": ");
                    self.push(ret);
                }
                self.push(" ");
                self.block(body);
            }
            ItemKind::StaticField { ty, name, init } => {
                self.push("static ");
                self.field(ty, name, init);
            }
            ItemKind::ConstField { ty, name, init } => {
                self.push("const ");
                self.field(ty, name, init);
            }
            ItemKind::ModuleInit(body) => {
                self.push("init ");
                self.block(body);
            }
        }
    }

    fn field(&mut self, ty: &str, name: &str, init: &Expr) {
        self.push(ty);
        self.push(" ");
        self.push(name);
        self.push(" = ");
        self.expr(init);
        self.push(";");
    }

    fn block(&mut self, block: &Block) {
        self.push("{");
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.push(&block.close_leading);
        self.push("}");
    }

    fn stmt(&mut self, stmt: &Stmt) {
        self.push(&stmt.leading);
        self.stmt_core(stmt);
    }

    /// The statement without its leading trivia; switch arms reuse this so
    /// the generated if/else stays on one line.
    fn stmt_core(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Decl { ty, name, init } => {
                self.push(ty);
                self.push(" ");
                self.push(name);
                if let Some(init) = init {
                    self.push(" = ");
                    self.expr(init);
                }
                self.push(";");
            }
            StmtKind::Assign { target, op, value } => {
                self.expr(target);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr(value);
                self.push(";");
            }
            StmtKind::Expr(e) => {
                self.expr(e);
                self.push(";");
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.push("if (");
                self.expr(cond);
                self.push(") ");
                self.block(then_block);
                if let Some(else_block) = else_block {
                    self.push(" else ");
                    self.block(else_block);
                }
            }
            StmtKind::Return(e) => {
                self.push("return");
                if let Some(e) = e {
                    self.push(" ");
                    self.expr(e);
                }
                self.push(";");
            }
            StmtKind::MutantSwitch(switch) => self.stmt_switch(switch),
        }
    }

    fn expr(&mut self, e: &Expr) {
        self.push(&e.trivia.leading);
        match &e.kind {
            ExprKind::Int(v) => self.push(&v.to_string()),
            ExprKind::Bool(v) => self.push(if *v { "true" } else { "false" }),
            ExprKind::Str(s) => {
                self.push("\"");
                self.push(&escape_str(s));
                self.push("\"");
            }
            ExprKind::Interp(parts) => {
                self.push("$\"");
                for part in parts {
                    match part {
                        InterpPart::Text(t) => self.push(&escape_str(t)),
                        InterpPart::Hole(e) => {
                            self.push("{");
                            self.expr(e);
                            self.push("}");
                        }
                    }
                }
                self.push("\"");
            }
            ExprKind::Ident(name) => self.push(name),
            ExprKind::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                self.expr_prec(lhs, prec, false);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr_prec(rhs, prec, true);
            }
            ExprKind::Unary {
                op,
                fixity,
                operand,
            } => match fixity {
                Fixity::Prefix => {
                    self.push(op.as_str());
                    self.expr_prec(operand, u8::MAX, true);
                }
                Fixity::Postfix => {
                    self.expr_prec(operand, u8::MAX, true);
                    self.push(op.as_str());
                }
            },
            ExprKind::Checked(inner) => {
                self.push("checked(");
                self.expr(inner);
                self.push(")");
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.push("(");
                self.expr(cond);
                self.push(" ? ");
                self.expr(then_expr);
                self.push(" : ");
                self.expr(else_expr);
                self.push(")");
            }
            ExprKind::Call {
                receiver,
                method,
                args,
                null_conditional,
            } => {
                if let Some(receiver) = receiver {
                    self.expr_prec(receiver, u8::MAX, true);
                    self.push(if *null_conditional { "?." } else { "." });
                }
                self.push(method);
                self.push("(");
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(a);
                }
                self.push(")");
            }
            ExprKind::Member {
                base,
                name,
                null_conditional,
            } => {
                self.expr_prec(base, u8::MAX, true);
                self.push(if *null_conditional { "?." } else { "." });
                self.push(name);
            }
            ExprKind::Collection(items) => {
                self.push("[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(item);
                }
                self.push("]");
            }
            ExprKind::MutantSwitch(switch) => self.expr_switch(switch),
        }
        self.push(&e.trivia.trailing);
    }

    /// Render a child expression, parenthesizing when its top-level operator
    /// binds no tighter than the parent context requires.
    fn expr_prec(&mut self, e: &Expr, parent_prec: u8, wrap_equal: bool) {
        let needs_parens = match &e.kind {
            ExprKind::Binary { op, .. } => {
                let child = op.precedence();
                child < parent_prec || (wrap_equal && child == parent_prec && parent_prec != u8::MAX)
            }
            ExprKind::Unary {
                fixity: Fixity::Prefix,
                ..
            } => parent_prec == u8::MAX,
            _ => false,
        };
        if needs_parens {
            self.push("(");
            self.expr(e);
            self.push(")");
        } else {
            self.expr(e);
        }
    }

    fn control(&mut self, method: &str) {
        self.push(&self.options.helper_namespace.clone());
        self.push(".MutantControl.");
        self.push(method);
    }

    fn hit_name(hit: HitKind) -> &'static str {
        match hit {
            HitKind::Normal => "HitNormal",
            HitKind::Static => "HitStatic",
        }
    }

    fn expr_switch(&mut self, switch: &ExprSwitch) {
        let start = self.pos();
        let hit = Self::hit_name(switch.hit);
        self.push("(");
        for arm in &switch.arms {
            let arm_start = self.pos();
            self.control("IsActive");
            self.push("(");
            self.push(&arm.mutant_id.to_string());
            self.push(") ? ");
            self.control(hit);
            self.push("(");
            self.push(&arm.mutant_id.to_string());
            self.push(", ");
            self.expr(&arm.body);
            self.push(") : ");
            // The arm's own segment: a diagnostic inside it blames this
            // mutant alone.
            self.injections.push(RenderedInjection {
                mutant_id: arm.mutant_id,
                span: Span {
                    start: arm_start,
                    end: self.pos(),
                },
                placement: PlacementKind::Expression,
            });
        }
        // Original branch: executing it still covers every mutant site here.
        for arm in &switch.arms {
            self.control(hit);
            self.push("(");
            self.push(&arm.mutant_id.to_string());
            self.push(", ");
        }
        self.expr(&switch.original);
        for _ in &switch.arms {
            self.push(")");
        }
        self.push(")");
        let span = Span {
            start,
            end: self.pos(),
        };
        // The whole construct, for diagnostics that point at the wrapper
        // itself (e.g. a branch-type mismatch reported at the open paren).
        for arm in &switch.arms {
            self.injections.push(RenderedInjection {
                mutant_id: arm.mutant_id,
                span,
                placement: PlacementKind::Expression,
            });
        }
    }

    fn stmt_switch(&mut self, switch: &StmtSwitch) {
        let start = self.pos();
        let hit = Self::hit_name(switch.hit);
        for (i, arm) in switch.arms.iter().enumerate() {
            if i > 0 {
                self.push(" else ");
            }
            let arm_start = self.pos();
            self.push("if (");
            self.control("IsActive");
            self.push("(");
            self.push(&arm.mutant_id.to_string());
            self.push(")) { ");
            self.control(hit);
            self.push("(");
            self.push(&arm.mutant_id.to_string());
            self.push("); ");
            self.stmt_core(&arm.body);
            self.push(" }");
            self.injections.push(RenderedInjection {
                mutant_id: arm.mutant_id,
                span: Span {
                    start: arm_start,
                    end: self.pos(),
                },
                placement: PlacementKind::Statement,
            });
        }
        self.push(" else { ");
        for arm in &switch.arms {
            self.control(hit);
            self.push("(");
            self.push(&arm.mutant_id.to_string());
            self.push("); ");
        }
        self.stmt_core(&switch.original);
        self.push(" }");
        let span = Span {
            start,
            end: self.pos(),
        };
        for arm in &switch.arms {
            self.injections.push(RenderedInjection {
                mutant_id: arm.mutant_id,
                span,
                placement: PlacementKind::Statement,
            });
        }
    }
}

fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Apply one replacement at its original site, without any placement
/// scaffolding. Used to show a mutant as a plain diff.
///
/// Returns `None` when no node with the given span exists (e.g. the tree
/// is not the one the mutation was generated from).
pub fn apply_replacement(
    unit: &CompilationUnit,
    span: Span,
    replacement: &crate::mutant::Replacement,
) -> Option<CompilationUnit> {
    let mut patched = unit.clone();
    let mut applied = false;
    for item in &mut patched.items {
        match &mut item.kind {
            ItemKind::Function { body, .. } | ItemKind::ModuleInit(body) => {
                patch_block(body, span, replacement, &mut applied);
            }
            ItemKind::StaticField { init, .. } | ItemKind::ConstField { init, .. } => {
                patch_expr(init, span, replacement, &mut applied);
            }
        }
    }
    applied.then_some(patched)
}

fn patch_block(
    block: &mut Block,
    span: Span,
    replacement: &crate::mutant::Replacement,
    applied: &mut bool,
) {
    for stmt in &mut block.stmts {
        patch_stmt(stmt, span, replacement, applied);
    }
}

fn patch_stmt(
    stmt: &mut Stmt,
    span: Span,
    replacement: &crate::mutant::Replacement,
    applied: &mut bool,
) {
    if *applied {
        return;
    }
    if stmt.span == span {
        if let crate::mutant::Replacement::Stmt(new) = replacement {
            let mut new = new.clone();
            new.leading = stmt.leading.clone();
            *stmt = new;
            *applied = true;
            return;
        }
    }
    match &mut stmt.kind {
        StmtKind::Decl { init, .. } => {
            if let Some(init) = init {
                patch_expr(init, span, replacement, applied);
            }
        }
        StmtKind::Assign { target, value, .. } => {
            patch_expr(target, span, replacement, applied);
            patch_expr(value, span, replacement, applied);
        }
        StmtKind::Expr(e) => patch_expr(e, span, replacement, applied),
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            patch_expr(cond, span, replacement, applied);
            patch_block(then_block, span, replacement, applied);
            if let Some(else_block) = else_block {
                patch_block(else_block, span, replacement, applied);
            }
        }
        StmtKind::Return(e) => {
            if let Some(e) = e {
                patch_expr(e, span, replacement, applied);
            }
        }
        StmtKind::MutantSwitch(_) => {}
    }
}

fn patch_expr(
    e: &mut Expr,
    span: Span,
    replacement: &crate::mutant::Replacement,
    applied: &mut bool,
) {
    if *applied {
        return;
    }
    if e.span == span {
        if let crate::mutant::Replacement::Expr(new) = replacement {
            *e = new.clone();
            *applied = true;
            return;
        }
    }
    match &mut e.kind {
        ExprKind::Int(_) | ExprKind::Bool(_) | ExprKind::Str(_) | ExprKind::Ident(_) => {}
        ExprKind::Interp(parts) => {
            for part in parts {
                if let InterpPart::Hole(h) = part {
                    patch_expr(h, span, replacement, applied);
                }
            }
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            patch_expr(lhs, span, replacement, applied);
            patch_expr(rhs, span, replacement, applied);
        }
        ExprKind::Unary { operand, .. } => patch_expr(operand, span, replacement, applied),
        ExprKind::Checked(inner) => patch_expr(inner, span, replacement, applied),
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            patch_expr(cond, span, replacement, applied);
            patch_expr(then_expr, span, replacement, applied);
            patch_expr(else_expr, span, replacement, applied);
        }
        ExprKind::Call { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                patch_expr(receiver, span, replacement, applied);
            }
            for a in args {
                patch_expr(a, span, replacement, applied);
            }
        }
        ExprKind::Member { base, .. } => patch_expr(base, span, replacement, applied),
        ExprKind::Collection(items) => {
            for item in items {
                patch_expr(item, span, replacement, applied);
            }
        }
        ExprKind::MutantSwitch(_) => {}
    }
}

/// Remove the given mutants' arms from every placement in the unit.
///
/// A placement left with no arms collapses back to its original subtree, so
/// repeated excision converges on the unmutated file.
pub fn excise_mutants(unit: &mut CompilationUnit, ids: &BTreeSet<MutantId>) {
    for item in &mut unit.items {
        match &mut item.kind {
            ItemKind::Function { body, .. } | ItemKind::ModuleInit(body) => {
                excise_block(body, ids);
            }
            ItemKind::StaticField { init, .. } | ItemKind::ConstField { init, .. } => {
                excise_expr(init, ids);
            }
        }
    }
}

fn excise_block(block: &mut Block, ids: &BTreeSet<MutantId>) {
    for stmt in &mut block.stmts {
        excise_stmt(stmt, ids);
    }
}

fn excise_stmt(stmt: &mut Stmt, ids: &BTreeSet<MutantId>) {
    match &mut stmt.kind {
        StmtKind::Decl { init, .. } => {
            if let Some(init) = init {
                excise_expr(init, ids);
            }
        }
        StmtKind::Assign { target, value, .. } => {
            excise_expr(target, ids);
            excise_expr(value, ids);
        }
        StmtKind::Expr(e) => excise_expr(e, ids),
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            excise_expr(cond, ids);
            excise_block(then_block, ids);
            if let Some(else_block) = else_block {
                excise_block(else_block, ids);
            }
        }
        StmtKind::Return(e) => {
            if let Some(e) = e {
                excise_expr(e, ids);
            }
        }
        StmtKind::MutantSwitch(switch) => {
            switch.arms.retain(|arm| !ids.contains(&arm.mutant_id));
            excise_stmt(&mut switch.original, ids);
            if switch.arms.is_empty() {
                let mut original = (*switch.original).clone();
                original.leading = std::mem::take(&mut stmt.leading);
                *stmt = original;
                excise_stmt(stmt, ids);
            }
        }
    }
}

fn excise_expr(e: &mut Expr, ids: &BTreeSet<MutantId>) {
    match &mut e.kind {
        ExprKind::Int(_) | ExprKind::Bool(_) | ExprKind::Str(_) | ExprKind::Ident(_) => {}
        ExprKind::Interp(parts) => {
            for part in parts {
                if let InterpPart::Hole(h) = part {
                    excise_expr(h, ids);
                }
            }
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            excise_expr(lhs, ids);
            excise_expr(rhs, ids);
        }
        ExprKind::Unary { operand, .. } => excise_expr(operand, ids),
        ExprKind::Checked(inner) => excise_expr(inner, ids),
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            excise_expr(cond, ids);
            excise_expr(then_expr, ids);
            excise_expr(else_expr, ids);
        }
        ExprKind::Call { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                excise_expr(receiver, ids);
            }
            for a in args {
                excise_expr(a, ids);
            }
        }
        ExprKind::Member { base, .. } => excise_expr(base, ids),
        ExprKind::Collection(items) => {
            for item in items {
                excise_expr(item, ids);
            }
        }
        ExprKind::MutantSwitch(switch) => {
            switch.arms.retain(|arm| !ids.contains(&arm.mutant_id));
            excise_expr(&mut switch.original, ids);
            if switch.arms.is_empty() {
                let original = (*switch.original).clone();
                *e = original;
                excise_expr(e, ids);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn int(v: i64) -> Expr {
        Expr::new(ExprKind::Int(v))
    }

    fn ident(name: &str) -> Expr {
        Expr::new(ExprKind::Ident(name.to_owned()))
    }

    fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn render_expr(e: &Expr) -> String {
        let mut r = Renderer::new_for_tests();
        r.expr(e);
        r.out
    }

    impl Renderer<'static> {
        fn new_for_tests() -> Renderer<'static> {
            static DEFAULTS: std::sync::OnceLock<RenderOptions> = std::sync::OnceLock::new();
            Renderer::new(DEFAULTS.get_or_init(RenderOptions::default))
        }
    }

    #[test]
    fn strip_comments_keeps_whitespace() {
        assert_eq!(strip_comments("  // note\n  "), "  \n  ");
        assert_eq!(strip_comments("\n\t"), "\n\t");
        assert_eq!(strip_comments("// eof comment"), "");
    }

    #[test]
    fn trivia_inherit_strips_comments() {
        let orig = Trivia {
            leading: " // why\n ".to_owned(),
            trailing: " ".to_owned(),
        };
        let inherited = Trivia::inherit(&orig);
        assert_eq!(inherited.leading, " \n ");
        assert_eq!(inherited.trailing, " ");
    }

    #[test]
    fn render_binary_precedence() {
        // a + b * c keeps its shape; (a + b) * c needs parens.
        let sum = binary(BinOp::Add, ident("a"), ident("b"));
        let prod = binary(BinOp::Mul, sum.clone(), ident("c"));
        assert_eq!(render_expr(&prod), "(a + b) * c");
        let prod2 = binary(BinOp::Mul, ident("b"), ident("c"));
        let sum2 = binary(BinOp::Add, ident("a"), prod2);
        assert_eq!(render_expr(&sum2), "a + b * c");
    }

    #[test]
    fn render_same_precedence_rhs_parenthesized() {
        // a - (b - c) must not render as a - b - c.
        let inner = binary(BinOp::Sub, ident("b"), ident("c"));
        let outer = binary(BinOp::Sub, ident("a"), inner);
        assert_eq!(render_expr(&outer), "a - (b - c)");
    }

    #[test]
    fn render_unary_forms() {
        let post = Expr::new(ExprKind::Unary {
            op: UnaryOp::Incr,
            fixity: Fixity::Postfix,
            operand: Box::new(ident("x")),
        });
        assert_eq!(render_expr(&post), "x++");
        let pre = Expr::new(ExprKind::Unary {
            op: UnaryOp::Decr,
            fixity: Fixity::Prefix,
            operand: Box::new(ident("x")),
        });
        assert_eq!(render_expr(&pre), "--x");
    }

    #[test]
    fn render_checked_and_interp() {
        let checked = Expr::new(ExprKind::Checked(Box::new(binary(
            BinOp::Add,
            ident("a"),
            ident("b"),
        ))));
        assert_eq!(render_expr(&checked), "checked(a + b)");
        let interp = Expr::new(ExprKind::Interp(vec![
            InterpPart::Text("n = ".to_owned()),
            InterpPart::Hole(ident("n")),
        ]));
        assert_eq!(render_expr(&interp), "$\"n = {n}\"");
    }

    #[test]
    fn render_null_conditional_member() {
        let member = Expr::new(ExprKind::Member {
            base: Box::new(ident("user")),
            name: "Name".to_owned(),
            null_conditional: true,
        });
        assert_eq!(render_expr(&member), "user?.Name");
    }

    #[test]
    fn render_expr_switch_probes_every_arm() {
        let switch = Expr::new(ExprKind::MutantSwitch(ExprSwitch {
            arms: vec![
                SwitchArm {
                    mutant_id: MutantId(0),
                    body: binary(BinOp::Sub, ident("a"), ident("b")),
                },
                SwitchArm {
                    mutant_id: MutantId(1),
                    body: binary(BinOp::Mul, ident("a"), ident("b")),
                },
            ],
            original: Box::new(binary(BinOp::Add, ident("a"), ident("b"))),
            hit: HitKind::Normal,
        }));
        assert_eq!(
            render_expr(&switch),
            "(Gauntlet.MutantControl.IsActive(0) ? Gauntlet.MutantControl.HitNormal(0, a - b) : \
             Gauntlet.MutantControl.IsActive(1) ? Gauntlet.MutantControl.HitNormal(1, a * b) : \
             Gauntlet.MutantControl.HitNormal(0, Gauntlet.MutantControl.HitNormal(1, a + b)))"
        );
    }

    #[test]
    fn rendered_injections_cover_switch_span() {
        let unit = CompilationUnit {
            path: "src/calc.gx".into(),
            prologue: String::new(),
            items: vec![Item {
                kind: ItemKind::StaticField {
                    ty: "int".to_owned(),
                    name: "X".to_owned(),
                    init: Expr::new(ExprKind::MutantSwitch(ExprSwitch {
                        arms: vec![SwitchArm {
                            mutant_id: MutantId(3),
                            body: int(1),
                        }],
                        original: Box::new(int(0)),
                        hit: HitKind::Static,
                    })),
                },
                span: Span::point(1, 1),
                leading: String::new(),
                attrs: Vec::new(),
            }],
            epilogue: String::new(),
        };
        let rendered = render_unit(&unit, &RenderOptions::default());
        // One record for the arm segment, one for the whole construct.
        assert_eq!(rendered.injections.len(), 2);
        let whole = &rendered.injections[1];
        assert_eq!(whole.mutant_id, MutantId(3));
        assert_eq!(whole.placement, PlacementKind::Expression);
        let emitted = whole.span.extract(&rendered.text);
        assert!(emitted.starts_with("(Gauntlet.MutantControl.IsActive(3)"));
        assert!(emitted.contains("HitStatic"));
        assert!(emitted.ends_with("))"));
        let arm = &rendered.injections[0];
        assert!(whole.span.encloses(&arm.span));
        assert!(arm.span.tighter_than(&whole.span));
    }

    #[test]
    fn excise_collapses_empty_switch() {
        let mut unit = CompilationUnit {
            path: "src/calc.gx".into(),
            prologue: String::new(),
            items: vec![Item {
                kind: ItemKind::StaticField {
                    ty: "int".to_owned(),
                    name: "X".to_owned(),
                    init: Expr::new(ExprKind::MutantSwitch(ExprSwitch {
                        arms: vec![SwitchArm {
                            mutant_id: MutantId(7),
                            body: int(1),
                        }],
                        original: Box::new(int(0)),
                        hit: HitKind::Normal,
                    })),
                },
                span: Span::point(1, 1),
                leading: String::new(),
                attrs: Vec::new(),
            }],
            epilogue: String::new(),
        };
        excise_mutants(&mut unit, &BTreeSet::from([MutantId(7)]));
        match &unit.items[0].kind {
            ItemKind::StaticField { init, .. } => assert_eq!(init.kind, ExprKind::Int(0)),
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn excise_keeps_other_arms() {
        let mut e = Expr::new(ExprKind::MutantSwitch(ExprSwitch {
            arms: vec![
                SwitchArm {
                    mutant_id: MutantId(1),
                    body: int(1),
                },
                SwitchArm {
                    mutant_id: MutantId(2),
                    body: int(2),
                },
            ],
            original: Box::new(int(0)),
            hit: HitKind::Normal,
        }));
        excise_expr(&mut e, &BTreeSet::from([MutantId(1)]));
        match &e.kind {
            ExprKind::MutantSwitch(switch) => {
                assert_eq!(switch.arms.len(), 1);
                assert_eq!(switch.arms[0].mutant_id, MutantId(2));
            }
            other => panic!("unexpected expr: {other:?}"),
        }
    }
}
