// Copyright 2023 - 2026 The Gauntlet Authors

//! Walk a parsed compilation unit and install every applicable mutant.
//!
//! Depth-first traversal over the tree: at each node, mutators keyed by the
//! node's kind propose mutations, ids are allocated from the session-global
//! counter in traversal order, and the placer wraps the node. Traversal then
//! continues into the *original* (pre-placement) children, so freshly placed
//! switches are never revisited.

use tracing::{debug, debug_span, trace};

use camino::Utf8PathBuf;

use crate::ast::{
    Block, CompilationUnit, Expr, ExprKind, InterpPart, Item, ItemKind, NodeKind, Stmt, StmtKind,
};
use crate::frontend::Semantics;
use crate::mutant::{MutatedFile, Mutant, MutantId, MutantStatus, Mutation, Replacement};
use crate::mutators::{MutationSite, MutatorRegistry};
use crate::options::Options;
use crate::place::{PlaceContext, Placer, PlacementMeta};
use crate::session::IdAllocator;

/// Attribute marking functions that run once at module load.
const MODULE_INITIALIZER_ATTR: &str = "ModuleInitializer";

/// Everything discovered and installed for one source file.
pub struct FileMutation {
    pub file: MutatedFile,
    pub mutants: Vec<Mutant>,
    /// The raw mutations, index-aligned with `mutants`; kept for diff
    /// listings, which need the replacement subtrees.
    pub mutations: Vec<Mutation>,
    pub placements: Vec<PlacementMeta>,
}

/// Mutate one unit, allocating ids from `alloc`.
pub fn mutate_unit(
    unit: &CompilationUnit,
    sem: &Semantics,
    registry: &MutatorRegistry,
    options: &Options,
    alloc: &mut IdAllocator,
) -> FileMutation {
    let _span = debug_span!("mutate_unit", path = unit.path.as_str()).entered();
    if options.is_generated(&unit.path, &unit.prologue) {
        debug!("generated file, skipped");
        return FileMutation {
            file: MutatedFile {
                path: unit.path.clone(),
                original: unit.clone(),
                mutated: unit.clone(),
                mutant_ids: Vec::new(),
            },
            mutants: Vec::new(),
            mutations: Vec::new(),
            placements: Vec::new(),
        };
    }
    let mut orchestrator = Orchestrator {
        registry,
        sem,
        options,
        alloc,
        placer: Placer::new(),
        mutants: Vec::new(),
        mutations: Vec::new(),
        scope_stack: Vec::new(),
        static_depth: 0,
        const_depth: 0,
        file: unit.path.clone(),
    };
    let mutated = CompilationUnit {
        path: unit.path.clone(),
        prologue: unit.prologue.clone(),
        items: unit.items.iter().map(|i| orchestrator.item(i)).collect(),
        epilogue: unit.epilogue.clone(),
    };
    debug!(mutants = orchestrator.mutants.len(), "unit mutated");
    FileMutation {
        file: MutatedFile {
            path: unit.path.clone(),
            original: unit.clone(),
            mutated,
            mutant_ids: orchestrator.mutants.iter().map(|m| m.id).collect(),
        },
        mutants: orchestrator.mutants,
        mutations: orchestrator.mutations,
        placements: orchestrator.placer.into_records(),
    }
}

struct Orchestrator<'o> {
    registry: &'o MutatorRegistry,
    sem: &'o Semantics,
    options: &'o Options,
    alloc: &'o mut IdAllocator,
    placer: Placer,
    mutants: Vec<Mutant>,
    mutations: Vec<Mutation>,
    /// Names of the enclosing items, outermost first.
    scope_stack: Vec<String>,
    /// Non-zero while inside a one-time initializer.
    static_depth: usize,
    /// Non-zero while inside a `const` initializer.
    const_depth: usize,
    file: Utf8PathBuf,
}

impl Orchestrator<'_> {
    fn scope(&self) -> Option<String> {
        if self.scope_stack.is_empty() {
            None
        } else {
            Some(self.scope_stack.join("::"))
        }
    }

    fn ctx(&self, parent: NodeKind) -> PlaceContext {
        PlaceContext {
            in_const: self.const_depth > 0,
            in_static_init: self.static_depth > 0,
            parent,
        }
    }

    fn item(&mut self, item: &Item) -> Item {
        if item
            .attrs
            .iter()
            .any(|a| a == &self.options.exclusion_marker)
        {
            trace!(item = item.name(), "excluded by marker attribute");
            return item.clone();
        }
        let mut rebuilt = item.clone();
        match (&item.kind, &mut rebuilt.kind) {
            (
                ItemKind::Function { name, body, .. },
                ItemKind::Function {
                    body: new_body, ..
                },
            ) => {
                self.scope_stack.push(name.clone());
                let one_time = item.attrs.iter().any(|a| a == MODULE_INITIALIZER_ATTR);
                if one_time {
                    self.static_depth += 1;
                }
                *new_body = self.block(body, NodeKind::OtherStatement);
                if one_time {
                    self.static_depth -= 1;
                }
                self.scope_stack.pop();
            }
            (ItemKind::StaticField { name, init, .. }, ItemKind::StaticField { init: new_init, .. }) => {
                self.scope_stack.push(name.clone());
                self.static_depth += 1;
                *new_init = self.expr(init, NodeKind::OtherStatement);
                self.static_depth -= 1;
                self.scope_stack.pop();
            }
            (ItemKind::ConstField { name, init, .. }, ItemKind::ConstField { init: new_init, .. }) => {
                self.scope_stack.push(name.clone());
                self.const_depth += 1;
                *new_init = self.expr(init, NodeKind::OtherStatement);
                self.const_depth -= 1;
                self.scope_stack.pop();
            }
            (ItemKind::ModuleInit(body), ItemKind::ModuleInit(new_body)) => {
                self.scope_stack.push("init".to_owned());
                self.static_depth += 1;
                *new_body = self.block(body, NodeKind::OtherStatement);
                self.static_depth -= 1;
                self.scope_stack.pop();
            }
            _ => unreachable!("rebuilt item kind diverged"),
        }
        rebuilt
    }

    fn block(&mut self, block: &Block, parent: NodeKind) -> Block {
        Block {
            stmts: block.stmts.iter().map(|s| self.stmt(s, parent)).collect(),
            close_leading: block.close_leading.clone(),
        }
    }

    fn stmt(&mut self, stmt: &Stmt, parent: NodeKind) -> Stmt {
        let ctx = self.ctx(parent);
        // Mutations for this statement come from the original node; ids are
        // allocated before descending so parents precede children.
        let arms = self.collect_stmt_arms(stmt, &ctx);
        let rebuilt = self.rebuild_stmt(stmt);
        if arms.is_empty() {
            rebuilt
        } else {
            self.placer.place_stmt(arms, rebuilt, &ctx)
        }
    }

    fn rebuild_stmt(&mut self, stmt: &Stmt) -> Stmt {
        let kind = match &stmt.kind {
            StmtKind::Decl { ty, name, init } => StmtKind::Decl {
                ty: ty.clone(),
                name: name.clone(),
                init: init.as_ref().map(|e| self.expr(e, NodeKind::OtherStatement)),
            },
            StmtKind::Assign { target, op, value } => StmtKind::Assign {
                // Assignment targets are storage locations, not mutation
                // sites; only the value side is visited.
                target: target.clone(),
                op: *op,
                value: self.expr(value, NodeKind::Assignment),
            },
            StmtKind::Expr(e) => StmtKind::Expr(self.expr(e, NodeKind::OtherStatement)),
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => StmtKind::If {
                cond: self.expr(cond, NodeKind::OtherStatement),
                then_block: self.block(then_block, NodeKind::OtherStatement),
                else_block: else_block
                    .as_ref()
                    .map(|b| self.block(b, NodeKind::OtherStatement)),
            },
            StmtKind::Return(e) => {
                StmtKind::Return(e.as_ref().map(|e| self.expr(e, NodeKind::OtherStatement)))
            }
            StmtKind::MutantSwitch(_) => unreachable!("placements are never revisited"),
        };
        Stmt {
            kind,
            span: stmt.span,
            leading: stmt.leading.clone(),
        }
    }

    fn expr(&mut self, e: &Expr, parent: NodeKind) -> Expr {
        let ctx = self.ctx(parent);
        let arms = self.collect_expr_arms(e, &ctx);
        let rebuilt = self.rebuild_expr(e);
        if arms.is_empty() {
            rebuilt
        } else {
            self.placer.place_expr(arms, rebuilt, &ctx)
        }
    }

    fn rebuild_expr(&mut self, e: &Expr) -> Expr {
        let parent = e.node_kind();
        let kind = match &e.kind {
            ExprKind::Int(_)
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Ident(_) => e.kind.clone(),
            ExprKind::Interp(parts) => ExprKind::Interp(
                parts
                    .iter()
                    .map(|p| match p {
                        InterpPart::Text(t) => InterpPart::Text(t.clone()),
                        InterpPart::Hole(h) => InterpPart::Hole(self.expr(h, parent)),
                    })
                    .collect(),
            ),
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: Box::new(self.expr(lhs, parent)),
                rhs: Box::new(self.expr(rhs, parent)),
            },
            ExprKind::Unary {
                op,
                fixity,
                operand,
            } => ExprKind::Unary {
                op: *op,
                fixity: *fixity,
                // The operand of ++/-- must stay a plain storage location.
                operand: operand.clone(),
            },
            ExprKind::Checked(inner) => ExprKind::Checked(Box::new(self.expr(inner, parent))),
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => ExprKind::Conditional {
                cond: Box::new(self.expr(cond, parent)),
                then_expr: Box::new(self.expr(then_expr, parent)),
                else_expr: Box::new(self.expr(else_expr, parent)),
            },
            ExprKind::Call {
                receiver,
                method,
                args,
                null_conditional,
            } => ExprKind::Call {
                receiver: receiver
                    .as_ref()
                    .map(|r| Box::new(self.expr(r, parent))),
                method: method.clone(),
                args: args.iter().map(|a| self.expr(a, parent)).collect(),
                null_conditional: *null_conditional,
            },
            ExprKind::Member {
                base,
                name,
                null_conditional,
            } => ExprKind::Member {
                base: Box::new(self.expr(base, parent)),
                name: name.clone(),
                null_conditional: *null_conditional,
            },
            ExprKind::Collection(items) => {
                ExprKind::Collection(items.iter().map(|i| self.expr(i, parent)).collect())
            }
            ExprKind::MutantSwitch(_) => unreachable!("placements are never revisited"),
        };
        Expr {
            kind,
            span: e.span,
            trivia: e.trivia.clone(),
        }
    }

    fn collect_expr_arms(&mut self, e: &Expr, ctx: &PlaceContext) -> Vec<(MutantId, Expr)> {
        let mutations = self.registry.mutations_for(
            MutationSite::Expr(e),
            self.sem,
            self.options.level,
            &self.options.excluded_mutations,
        );
        let mut arms = Vec::new();
        for mutation in mutations {
            let id = self.alloc.next_id();
            let mut mutant = Mutant::new(id, self.file.clone(), self.scope(), &mutation);
            if let Some(reason) = Placer::refusal(ctx) {
                trace!(%id, reason, "placement refused");
                mutant.status = MutantStatus::Ignored;
                mutant.status_reason = Some(reason.to_owned());
            } else if !self.options.allows_mutant(&mutant) {
                trace!(%id, "mutant filtered");
                mutant.status = MutantStatus::Ignored;
                mutant.status_reason = Some("filtered".to_owned());
            } else {
                match &mutation.replacement {
                    Replacement::Expr(replacement) => arms.push((id, replacement.clone())),
                    Replacement::Stmt(_) => {
                        unreachable!("statement replacement at expression site")
                    }
                }
            }
            self.mutants.push(mutant);
            self.mutations.push(mutation);
        }
        arms
    }

    fn collect_stmt_arms(&mut self, s: &Stmt, ctx: &PlaceContext) -> Vec<(MutantId, Stmt)> {
        let mutations = self.registry.mutations_for(
            MutationSite::Stmt(s),
            self.sem,
            self.options.level,
            &self.options.excluded_mutations,
        );
        let mut arms = Vec::new();
        for mutation in mutations {
            let id = self.alloc.next_id();
            let mut mutant = Mutant::new(id, self.file.clone(), self.scope(), &mutation);
            if let Some(reason) = Placer::refusal(ctx) {
                mutant.status = MutantStatus::Ignored;
                mutant.status_reason = Some(reason.to_owned());
            } else if !self.options.allows_mutant(&mutant) {
                mutant.status = MutantStatus::Ignored;
                mutant.status_reason = Some("filtered".to_owned());
            } else {
                match &mutation.replacement {
                    Replacement::Stmt(replacement) => arms.push((id, replacement.clone())),
                    Replacement::Expr(_) => {
                        unreachable!("expression replacement at statement site")
                    }
                }
            }
            self.mutants.push(mutant);
            self.mutations.push(mutation);
        }
        arms
    }
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    use crate::ast::{render_unit, RenderOptions};
    use crate::parse::parse_source;

    use super::*;

    /// Parse and mutate a source string with the given options.
    pub fn mutate_source_str(code: &str, options: &Options) -> FileMutation {
        let unit = parse_source(code, "src/main.gx").expect("parse test source");
        let sem = crate::parse::infer_semantics(&unit);
        let registry = MutatorRegistry::standard();
        let mut alloc = IdAllocator::default();
        mutate_unit(&unit, &sem, &registry, options, &mut alloc)
    }

    fn names(mutants: &[Mutant]) -> Vec<String> {
        mutants.iter().map(|m| m.name(true)).collect_vec()
    }

    #[test]
    fn discover_update_mutant_in_simple_function() {
        let fm = mutate_source_str(
            "fn main() {\n    int x = 0;\n    x++;\n}\n",
            &Options::default(),
        );
        assert_eq!(
            names(&fm.mutants),
            ["src/main.gx:3:5: replace ++ with -- in main"]
        );
        assert_eq!(fm.mutants[0].id, MutantId(0));
    }

    #[test]
    fn ids_are_stable_across_runs() {
        let code = "fn f(int a, int b): int {\n    int c = a + b * 2;\n    c++;\n    return c;\n}\n";
        let first = mutate_source_str(code, &Options::default());
        let second = mutate_source_str(code, &Options::default());
        assert_eq!(
            first.mutants.iter().map(|m| (m.id, m.display.clone())).collect_vec(),
            second.mutants.iter().map(|m| (m.id, m.display.clone())).collect_vec(),
        );
    }

    #[test]
    fn ids_allocated_parent_before_children() {
        // The outer `+` is visited before the inner `*`.
        let fm = mutate_source_str(
            "fn f(int a, int b): int {\n    return a + b * 2;\n}\n",
            &Options::default(),
        );
        let displays = fm.mutants.iter().map(|m| m.display.as_str()).collect_vec();
        assert_eq!(displays, ["replace + with -", "replace * with /"]);
        assert_eq!(
            fm.mutants.iter().map(|m| m.id).collect_vec(),
            [MutantId(0), MutantId(1)]
        );
    }

    #[test]
    fn exclusion_marker_skips_subtree() {
        let fm = mutate_source_str(
            "@ExcludeFromMutation fn noisy() {\n    int x = 1 + 2;\n}\nfn kept(): bool {\n    return true;\n}\n",
            &Options::default(),
        );
        assert_eq!(
            names(&fm.mutants),
            ["src/main.gx:5:12: replace true with false in kept"]
        );
    }

    #[test]
    fn const_initializer_mutants_are_ignored_unsupported() {
        let fm = mutate_source_str("const int Max = 2 + 3;\n", &Options::default());
        assert_eq!(fm.mutants.len(), 1);
        let mutant = &fm.mutants[0];
        assert_eq!(mutant.status, MutantStatus::Ignored);
        assert_eq!(
            mutant.status_reason.as_deref(),
            Some("unsupported placement")
        );
        // Nothing was placed, so the rendered file carries no probes.
        let rendered = render_unit(&fm.file.mutated, &RenderOptions::default());
        assert!(!rendered.text.contains("MutantControl"));
    }

    #[test]
    fn static_initializer_gets_static_probes() {
        let fm = mutate_source_str("static int Counter = 1 + 2;\n", &Options::default());
        assert_eq!(fm.mutants.len(), 1);
        let rendered = render_unit(&fm.file.mutated, &RenderOptions::default());
        assert!(rendered.text.contains("HitStatic"));
        assert!(!rendered.text.contains("HitNormal"));
    }

    #[test]
    fn module_initializer_attribute_is_static_context() {
        let fm = mutate_source_str(
            "@ModuleInitializer fn setup() {\n    int x = 1 + 2;\n}\n",
            &Options::default(),
        );
        let rendered = render_unit(&fm.file.mutated, &RenderOptions::default());
        assert!(rendered.text.contains("HitStatic"));
    }

    #[test]
    fn level_gating_drops_advanced_rules() {
        let code = "fn f(int a, int b): int {\n    return checked(a + b);\n}\n";
        let basic = mutate_source_str(code, &Options::from_arg_strs(["gauntlet", "--level", "basic"]));
        assert_eq!(
            basic.mutants.iter().map(|m| m.display.as_str()).collect_vec(),
            ["replace + with -"]
        );
        let advanced =
            mutate_source_str(code, &Options::from_arg_strs(["gauntlet", "--level", "advanced"]));
        assert_eq!(
            advanced
                .mutants
                .iter()
                .map(|m| m.display.as_str())
                .collect_vec(),
            ["remove checked", "replace + with -"]
        );
    }

    #[test]
    fn generated_file_produces_no_mutants() {
        let unit = parse_source(
            "// <auto-generated>\nfn f(int a): int {\n    return a + 1;\n}\n",
            "src/gen.gx",
        )
        .unwrap();
        let sem = crate::parse::infer_semantics(&unit);
        let registry = MutatorRegistry::standard();
        let mut alloc = IdAllocator::default();
        let fm = mutate_unit(&unit, &sem, &registry, &Options::default(), &mut alloc);
        assert_eq!(fm.mutants.len(), 0);
        assert_eq!(fm.file.mutated, fm.file.original);
    }

    #[test]
    fn assignment_stmt_placed_as_statement_switch() {
        let fm = mutate_source_str(
            "fn f() {\n    int x = 0;\n    x += 2;\n}\n",
            &Options::default(),
        );
        assert_eq!(
            fm.mutants.iter().map(|m| m.display.as_str()).collect_vec(),
            ["replace += with -="]
        );
        let rendered = render_unit(&fm.file.mutated, &RenderOptions::default());
        assert!(rendered.text.contains("if (Gauntlet.MutantControl.IsActive(0)"));
        assert!(rendered.text.contains("x -= 2;"));
        assert!(rendered.text.contains("x += 2;"));
    }
}
