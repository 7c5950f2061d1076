// Copyright 2024 - 2026 The Gauntlet Authors

//! The reference language frontend.
//!
//! A small recursive-descent parser for the target-language subset the
//! engine mutates. Real deployments plug a full compiler in behind
//! [`crate::frontend::Frontend`]; this frontend backs `--list` runs and the
//! test suite, and its `compile` re-parses rendered output as a structural
//! check before writing the bundled artifact.
//!
//! Leading trivia (whitespace and `//` comments) is captured per token and
//! attached to statements and items, so an unmutated tree renders back to
//! its source text verbatim.

use anyhow::{anyhow, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::ast::{
    AssignOp, BinOp, Block, CompilationUnit, Expr, ExprKind, Fixity, InterpPart, Item, ItemKind,
    Param, Stmt, StmtKind, UnaryOp,
};
use crate::frontend::{
    CompileOutcome, Diagnostic, Frontend, RenderedUnit, Semantics, TypeTag,
};
use crate::span::{LineColumn, Span};

/// Parse one source string.
pub fn parse_source(code: &str, path: impl Into<Utf8PathBuf>) -> Result<CompilationUnit> {
    let path = path.into();
    parse_internal(code, path.clone())
        .map_err(|e| anyhow!("{path}:{}:{}: {}", e.pos.line, e.pos.column, e.message))
}

/// Parse a single expression; test and interpolation-hole helper.
pub fn parse_expr_str(code: &str) -> Result<Expr> {
    let mut parser = Parser::new(code, "<expr>".into()).map_err(|e| anyhow!(e.message))?;
    let expr = parser.expr().map_err(|e| anyhow!(e.message))?;
    parser.expect_eof().map_err(|e| anyhow!(e.message))?;
    Ok(expr)
}

/// Build the naive semantic model: types of statics, parameters, and local
/// declarations, keyed by name with no scoping.
pub fn infer_semantics(unit: &CompilationUnit) -> Semantics {
    let mut sem = Semantics::empty();
    // Statics and consts first, so function bodies can refer to them.
    for item in &unit.items {
        match &item.kind {
            ItemKind::StaticField { ty, name, init }
            | ItemKind::ConstField { ty, name, init } => {
                let tag = type_tag(ty, Some(init), &sem);
                sem.declare(name.clone(), tag);
            }
            _ => {}
        }
    }
    for item in &unit.items {
        match &item.kind {
            ItemKind::Function { params, body, .. } => {
                for p in params {
                    sem.declare(p.name.clone(), type_tag(&p.ty, None, &sem));
                }
                collect_block_types(body, &mut sem);
            }
            ItemKind::ModuleInit(body) => collect_block_types(body, &mut sem),
            _ => {}
        }
    }
    sem
}

fn collect_block_types(block: &Block, sem: &mut Semantics) {
    for stmt in &block.stmts {
        match &stmt.kind {
            StmtKind::Decl { ty, name, init } => {
                let tag = type_tag(ty, init.as_ref(), sem);
                sem.declare(name.clone(), tag);
            }
            StmtKind::If {
                then_block,
                else_block,
                ..
            } => {
                collect_block_types(then_block, sem);
                if let Some(else_block) = else_block {
                    collect_block_types(else_block, sem);
                }
            }
            _ => {}
        }
    }
}

fn type_tag(ty: &str, init: Option<&Expr>, sem: &Semantics) -> TypeTag {
    match ty {
        "int" => TypeTag::Int,
        "bool" => TypeTag::Bool,
        "string" => TypeTag::Str,
        "list" => TypeTag::List,
        "var" => init.map_or(TypeTag::Unknown, |e| sem.expr_type(e)),
        _ => TypeTag::Unknown,
    }
}

/// The reference frontend over files on disk.
pub struct TextFrontend;

impl TextFrontend {
    pub fn new() -> TextFrontend {
        TextFrontend
    }
}

impl Default for TextFrontend {
    fn default() -> Self {
        TextFrontend::new()
    }
}

impl Frontend for TextFrontend {
    fn parse(&self, path: &Utf8Path) -> Result<CompilationUnit> {
        let code = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read source of {path:?}"))?
            .replace("\r\n", "\n");
        parse_source(&code, path.to_owned())
    }

    fn semantics(&self, unit: &CompilationUnit) -> Semantics {
        infer_semantics(unit)
    }

    fn compile(&self, units: &[RenderedUnit], output: &Utf8Path) -> Result<CompileOutcome> {
        let mut diagnostics = Vec::new();
        for unit in units {
            if let Err(e) = parse_internal(&unit.text, unit.path.clone()) {
                diagnostics.push(Diagnostic {
                    path: unit.path.clone(),
                    span: Span::point(e.pos.line, e.pos.column),
                    message: e.message,
                });
            }
        }
        if !diagnostics.is_empty() {
            return Ok(CompileOutcome::Failed(diagnostics));
        }
        let mut bundle = String::new();
        for unit in units {
            bundle.push_str(&unit.text);
        }
        std::fs::write(output, bundle)
            .with_context(|| format!("failed to write artifact {output:?}"))?;
        debug!(%output, "artifact written");
        Ok(CompileOutcome::Success {
            binary: output.to_owned(),
            symbols: None,
        })
    }
}

struct RawError {
    pos: LineColumn,
    message: String,
}

fn parse_internal(code: &str, path: Utf8PathBuf) -> Result<CompilationUnit, RawError> {
    let mut parser = Parser::new(code, path)?;
    parser.unit()
}

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Str(String),
    /// Raw interpolated-string content, holes unexpanded.
    Interp(String),
    Punct(&'static str),
    Eof,
}

#[derive(Clone, Debug)]
struct Token {
    tok: Tok,
    leading: String,
    start: LineColumn,
    end: LineColumn,
}

const PUNCTS: &[&str] = &[
    "<<=", ">>=", "++", "--", "+=", "-=", "*=", "/=", "%=", "==", "!=", "<=", ">=", "&&", "||",
    "?.", "+", "-", "*", "/", "%", "<", ">", "=", "!", "?", ":", ";", ",", ".", "(", ")", "{",
    "}", "[", "]", "@",
];

fn lex(code: &str) -> Result<Vec<Token>, RawError> {
    let chars: Vec<char> = code.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;
    let mut col = 1;
    loop {
        // Leading trivia: whitespace and // comments.
        let mut leading = String::new();
        loop {
            match chars.get(i) {
                Some(&c) if c.is_whitespace() => {
                    leading.push(c);
                    if c == '\n' {
                        line += 1;
                        col = 1;
                    } else {
                        col += 1;
                    }
                    i += 1;
                }
                Some('/') if chars.get(i + 1) == Some(&'/') => {
                    while let Some(&c) = chars.get(i) {
                        if c == '\n' {
                            break;
                        }
                        leading.push(c);
                        col += 1;
                        i += 1;
                    }
                }
                _ => break,
            }
        }
        let start = LineColumn::new(line, col);
        let Some(&c) = chars.get(i) else {
            tokens.push(Token {
                tok: Tok::Eof,
                leading,
                start,
                end: start,
            });
            return Ok(tokens);
        };
        let tok = if c.is_ascii_digit() {
            let mut text = String::new();
            while let Some(&c) = chars.get(i) {
                if !c.is_ascii_digit() {
                    break;
                }
                text.push(c);
                i += 1;
                col += 1;
            }
            Tok::Int(text.parse().map_err(|_| RawError {
                pos: start,
                message: format!("integer literal out of range: {text}"),
            })?)
        } else if c.is_alphabetic() || c == '_' {
            let mut text = String::new();
            while let Some(&c) = chars.get(i) {
                if !c.is_alphanumeric() && c != '_' {
                    break;
                }
                text.push(c);
                i += 1;
                col += 1;
            }
            Tok::Ident(text)
        } else if c == '"' || (c == '$' && chars.get(i + 1) == Some(&'"')) {
            let interpolated = c == '$';
            if interpolated {
                i += 1;
                col += 1;
            }
            i += 1; // opening quote
            col += 1;
            let mut text = String::new();
            loop {
                match chars.get(i) {
                    None => {
                        return Err(RawError {
                            pos: start,
                            message: "unterminated string literal".to_owned(),
                        })
                    }
                    Some('"') => {
                        i += 1;
                        col += 1;
                        break;
                    }
                    Some('\\') => {
                        let escaped = chars.get(i + 1).ok_or(RawError {
                            pos: start,
                            message: "unterminated escape".to_owned(),
                        })?;
                        if interpolated {
                            // Holes are re-lexed later; keep escapes raw.
                            text.push('\\');
                            text.push(*escaped);
                        } else {
                            text.push(match escaped {
                                'n' => '\n',
                                '"' => '"',
                                '\\' => '\\',
                                other => {
                                    return Err(RawError {
                                        pos: start,
                                        message: format!("unknown escape \\{other}"),
                                    })
                                }
                            });
                        }
                        i += 2;
                        col += 2;
                    }
                    Some(&c) => {
                        text.push(c);
                        i += 1;
                        col += 1;
                    }
                }
            }
            if interpolated {
                Tok::Interp(text)
            } else {
                Tok::Str(text)
            }
        } else if let Some(&p) = PUNCTS
            .iter()
            .find(|p| chars[i..].starts_with(&p.chars().collect::<Vec<_>>()[..]))
        {
            i += p.len();
            col += p.len();
            Tok::Punct(p)
        } else {
            return Err(RawError {
                pos: start,
                message: format!("unexpected character {c:?}"),
            });
        };
        tokens.push(Token {
            tok,
            leading,
            start,
            end: LineColumn::new(line, col),
        });
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    path: Utf8PathBuf,
}

impl Parser {
    fn new(code: &str, path: Utf8PathBuf) -> Result<Parser, RawError> {
        Ok(Parser {
            tokens: lex(code)?,
            pos: 0,
            path,
        })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek2(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn prev_end(&self) -> LineColumn {
        if self.pos == 0 {
            self.peek().start
        } else {
            self.tokens[self.pos - 1].end
        }
    }

    fn error(&self, message: impl Into<String>) -> RawError {
        RawError {
            pos: self.peek().start,
            message: message.into(),
        }
    }

    fn at_punct(&self, p: &str) -> bool {
        matches!(&self.peek().tok, Tok::Punct(q) if *q == p)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.at_punct(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<Token, RawError> {
        if self.at_punct(p) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected `{p}`, found {:?}", self.peek().tok)))
        }
    }

    fn at_keyword(&self, kw: &str) -> bool {
        matches!(&self.peek().tok, Tok::Ident(name) if name == kw)
    }

    fn expect_ident(&mut self) -> Result<(String, Token), RawError> {
        match self.peek().tok.clone() {
            Tok::Ident(name) => {
                let token = self.bump();
                Ok((name, token))
            }
            other => Err(self.error(format!("expected identifier, found {other:?}"))),
        }
    }

    fn expect_eof(&mut self) -> Result<(), RawError> {
        if self.peek().tok == Tok::Eof {
            Ok(())
        } else {
            Err(self.error(format!("expected end of input, found {:?}", self.peek().tok)))
        }
    }

    fn unit(&mut self) -> Result<CompilationUnit, RawError> {
        let mut items = Vec::new();
        while self.peek().tok != Tok::Eof {
            items.push(self.item()?);
        }
        let epilogue = self.peek().leading.clone();
        // Text before the first item is the unit prologue, where header
        // markers like `<auto-generated>` live.
        let mut prologue = String::new();
        if let Some(first) = items.first_mut() {
            prologue = std::mem::take(&mut first.leading);
        }
        Ok(CompilationUnit {
            path: self.path.clone(),
            prologue,
            items,
            epilogue,
        })
    }

    fn item(&mut self) -> Result<Item, RawError> {
        let leading = self.peek().leading.clone();
        let start = self.peek().start;
        let mut attrs = Vec::new();
        while self.at_punct("@") {
            self.bump();
            let (name, _) = self.expect_ident()?;
            attrs.push(name);
        }
        let kind = if self.at_keyword("fn") {
            self.bump();
            let (name, _) = self.expect_ident()?;
            self.expect_punct("(")?;
            let mut params = Vec::new();
            while !self.at_punct(")") {
                if !params.is_empty() {
                    self.expect_punct(",")?;
                }
                let (ty, _) = self.expect_ident()?;
                let (name, _) = self.expect_ident()?;
                params.push(Param { ty, name });
            }
            self.expect_punct(")")?;
            let ret = if self.eat_punct(":") {
                Some(self.expect_ident()?.0)
            } else {
                None
            };
            let body = self.block()?;
            ItemKind::Function {
                name,
                params,
                ret,
                body,
            }
        } else if self.at_keyword("static") || self.at_keyword("const") {
            let is_const = self.at_keyword("const");
            self.bump();
            let (ty, _) = self.expect_ident()?;
            let (name, _) = self.expect_ident()?;
            self.expect_punct("=")?;
            let init = self.expr()?;
            self.expect_punct(";")?;
            if is_const {
                ItemKind::ConstField { ty, name, init }
            } else {
                ItemKind::StaticField { ty, name, init }
            }
        } else if self.at_keyword("init") {
            self.bump();
            ItemKind::ModuleInit(self.block()?)
        } else {
            return Err(self.error(format!(
                "expected `fn`, `static`, `const`, or `init`, found {:?}",
                self.peek().tok
            )));
        };
        Ok(Item {
            kind,
            span: Span {
                start,
                end: self.prev_end(),
            },
            leading,
            attrs,
        })
    }

    fn block(&mut self) -> Result<Block, RawError> {
        self.expect_punct("{")?;
        let mut stmts = Vec::new();
        while !self.at_punct("}") {
            if self.peek().tok == Tok::Eof {
                return Err(self.error("unclosed block"));
            }
            stmts.push(self.stmt()?);
        }
        let close = self.bump();
        Ok(Block {
            stmts,
            close_leading: close.leading,
        })
    }

    fn stmt(&mut self) -> Result<Stmt, RawError> {
        let leading = self.peek().leading.clone();
        let start = self.peek().start;
        let kind = if self.at_keyword("if") {
            self.if_stmt()?
        } else if self.at_keyword("return") {
            self.bump();
            let value = if self.at_punct(";") {
                None
            } else {
                Some(self.expr()?)
            };
            self.expect_punct(";")?;
            StmtKind::Return(value)
        } else if matches!(self.peek().tok, Tok::Ident(_))
            && matches!(self.peek2().tok, Tok::Ident(_))
        {
            // Two identifiers in a row start a declaration: `int x ...`.
            let (ty, _) = self.expect_ident()?;
            let (name, _) = self.expect_ident()?;
            let init = if self.eat_punct("=") {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect_punct(";")?;
            StmtKind::Decl { ty, name, init }
        } else {
            let target = self.expr()?;
            let assign_op = match &self.peek().tok {
                Tok::Punct("=") => Some(AssignOp::Assign),
                Tok::Punct("+=") => Some(AssignOp::AddAssign),
                Tok::Punct("-=") => Some(AssignOp::SubAssign),
                Tok::Punct("*=") => Some(AssignOp::MulAssign),
                Tok::Punct("/=") => Some(AssignOp::DivAssign),
                Tok::Punct("%=") => Some(AssignOp::RemAssign),
                Tok::Punct("<<=") => Some(AssignOp::ShlAssign),
                Tok::Punct(">>=") => Some(AssignOp::ShrAssign),
                _ => None,
            };
            if let Some(op) = assign_op {
                self.bump();
                let value = self.expr()?;
                self.expect_punct(";")?;
                StmtKind::Assign { target, op, value }
            } else {
                self.expect_punct(";")?;
                StmtKind::Expr(target)
            }
        };
        Ok(Stmt {
            kind,
            span: Span {
                start,
                end: self.prev_end(),
            },
            leading,
        })
    }

    fn if_stmt(&mut self) -> Result<StmtKind, RawError> {
        self.bump(); // `if`
        self.expect_punct("(")?;
        let cond = self.expr()?;
        self.expect_punct(")")?;
        let then_block = self.block()?;
        let else_block = if self.at_keyword("else") {
            self.bump();
            if self.at_keyword("if") {
                // `else if` chains become a nested single-statement block.
                let start = self.peek().start;
                let leading = self.peek().leading.clone();
                let kind = self.if_stmt()?;
                Some(Block {
                    stmts: vec![Stmt {
                        kind,
                        span: Span {
                            start,
                            end: self.prev_end(),
                        },
                        leading,
                    }],
                    close_leading: String::new(),
                })
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };
        Ok(StmtKind::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn expr(&mut self) -> Result<Expr, RawError> {
        let start = self.peek().start;
        let cond = self.binary(1)?;
        if self.eat_punct("?") {
            let then_expr = self.expr()?;
            self.expect_punct(":")?;
            let else_expr = self.expr()?;
            Ok(Expr::with_span(
                ExprKind::Conditional {
                    cond: Box::new(cond),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                Span {
                    start,
                    end: self.prev_end(),
                },
            ))
        } else {
            Ok(cond)
        }
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, RawError> {
        let start = self.peek().start;
        let mut lhs = self.unary()?;
        loop {
            let (op, prec) = match &self.peek().tok {
                Tok::Punct("||") => (BinOp::Or, 1),
                Tok::Punct("&&") => (BinOp::And, 2),
                Tok::Punct("==") => (BinOp::Eq, 3),
                Tok::Punct("!=") => (BinOp::Ne, 3),
                Tok::Punct("<") => (BinOp::Lt, 4),
                Tok::Punct("<=") => (BinOp::Le, 4),
                Tok::Punct(">") => (BinOp::Gt, 4),
                Tok::Punct(">=") => (BinOp::Ge, 4),
                Tok::Punct("+") => (BinOp::Add, 5),
                Tok::Punct("-") => (BinOp::Sub, 5),
                Tok::Punct("*") => (BinOp::Mul, 6),
                Tok::Punct("/") => (BinOp::Div, 6),
                Tok::Punct("%") => (BinOp::Rem, 6),
                _ => break,
            };
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.binary(prec + 1)?;
            lhs = Expr::with_span(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                Span {
                    start,
                    end: self.prev_end(),
                },
            );
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, RawError> {
        let start = self.peek().start;
        let op = match &self.peek().tok {
            Tok::Punct("++") => Some(UnaryOp::Incr),
            Tok::Punct("--") => Some(UnaryOp::Decr),
            Tok::Punct("!") => Some(UnaryOp::Not),
            Tok::Punct("-") => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.unary()?;
            return Ok(Expr::with_span(
                ExprKind::Unary {
                    op,
                    fixity: Fixity::Prefix,
                    operand: Box::new(operand),
                },
                Span {
                    start,
                    end: self.prev_end(),
                },
            ));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, RawError> {
        let start = self.peek().start;
        let mut e = self.primary()?;
        loop {
            match &self.peek().tok {
                Tok::Punct("++") | Tok::Punct("--") => {
                    let op = if self.at_punct("++") {
                        UnaryOp::Incr
                    } else {
                        UnaryOp::Decr
                    };
                    self.bump();
                    e = Expr::with_span(
                        ExprKind::Unary {
                            op,
                            fixity: Fixity::Postfix,
                            operand: Box::new(e),
                        },
                        Span {
                            start,
                            end: self.prev_end(),
                        },
                    );
                }
                Tok::Punct(".") | Tok::Punct("?.") => {
                    let null_conditional = self.at_punct("?.");
                    self.bump();
                    let (name, _) = self.expect_ident()?;
                    if self.at_punct("(") {
                        let args = self.call_args()?;
                        e = Expr::with_span(
                            ExprKind::Call {
                                receiver: Some(Box::new(e)),
                                method: name,
                                args,
                                null_conditional,
                            },
                            Span {
                                start,
                                end: self.prev_end(),
                            },
                        );
                    } else {
                        e = Expr::with_span(
                            ExprKind::Member {
                                base: Box::new(e),
                                name,
                                null_conditional,
                            },
                            Span {
                                start,
                                end: self.prev_end(),
                            },
                        );
                    }
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, RawError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.at_punct(")") {
            if !args.is_empty() {
                self.expect_punct(",")?;
            }
            args.push(self.expr()?);
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, RawError> {
        let start = self.peek().start;
        match self.peek().tok.clone() {
            Tok::Int(v) => {
                let token = self.bump();
                Ok(Expr::with_span(
                    ExprKind::Int(v),
                    Span {
                        start,
                        end: token.end,
                    },
                ))
            }
            Tok::Str(s) => {
                let token = self.bump();
                Ok(Expr::with_span(
                    ExprKind::Str(s),
                    Span {
                        start,
                        end: token.end,
                    },
                ))
            }
            Tok::Interp(raw) => {
                let token = self.bump();
                let parts = parse_interp_parts(&raw, start)?;
                Ok(Expr::with_span(
                    ExprKind::Interp(parts),
                    Span {
                        start,
                        end: token.end,
                    },
                ))
            }
            Tok::Ident(name) if name == "true" || name == "false" => {
                let token = self.bump();
                Ok(Expr::with_span(
                    ExprKind::Bool(name == "true"),
                    Span {
                        start,
                        end: token.end,
                    },
                ))
            }
            Tok::Ident(name) if name == "checked" => {
                self.bump();
                self.expect_punct("(")?;
                let inner = self.expr()?;
                self.expect_punct(")")?;
                Ok(Expr::with_span(
                    ExprKind::Checked(Box::new(inner)),
                    Span {
                        start,
                        end: self.prev_end(),
                    },
                ))
            }
            Tok::Ident(name) => {
                let token = self.bump();
                if self.at_punct("(") {
                    let args = self.call_args()?;
                    Ok(Expr::with_span(
                        ExprKind::Call {
                            receiver: None,
                            method: name,
                            args,
                            null_conditional: false,
                        },
                        Span {
                            start,
                            end: self.prev_end(),
                        },
                    ))
                } else {
                    Ok(Expr::with_span(
                        ExprKind::Ident(name),
                        Span {
                            start,
                            end: token.end,
                        },
                    ))
                }
            }
            Tok::Punct("(") => {
                self.bump();
                let inner = self.expr()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Tok::Punct("[") => {
                self.bump();
                let mut items = Vec::new();
                while !self.at_punct("]") {
                    if !items.is_empty() {
                        self.expect_punct(",")?;
                    }
                    items.push(self.expr()?);
                }
                self.expect_punct("]")?;
                Ok(Expr::with_span(
                    ExprKind::Collection(items),
                    Span {
                        start,
                        end: self.prev_end(),
                    },
                ))
            }
            other => Err(self.error(format!("expected expression, found {other:?}"))),
        }
    }
}

/// Split raw interpolated content on `{...}` holes and parse each hole.
fn parse_interp_parts(raw: &str, pos: LineColumn) -> Result<Vec<InterpPart>, RawError> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            if !text.is_empty() {
                parts.push(InterpPart::Text(unescape(&std::mem::take(&mut text))));
            }
            let mut hole = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                hole.push(c);
            }
            if !closed {
                return Err(RawError {
                    pos,
                    message: "unterminated interpolation hole".to_owned(),
                });
            }
            let expr = parse_expr_str(&hole).map_err(|e| RawError {
                pos,
                message: format!("in interpolation hole: {e}"),
            })?;
            parts.push(InterpPart::Hole(expr));
        } else {
            text.push(c);
        }
    }
    if !text.is_empty() {
        parts.push(InterpPart::Text(unescape(&text)));
    }
    Ok(parts)
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
