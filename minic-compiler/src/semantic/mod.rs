//! Scoped semantic analysis.
//!
//! The analyzer walks the whole tree once after collecting every function
//! signature, and accumulates diagnostics instead of stopping at the first
//! problem. Analysis is a pure function of the program: running it twice on
//! the same tree yields the same list.

pub mod expr;
pub mod scope;
pub mod stmt;
pub mod types;

use crate::ast::{Function, Item, Line, Program, ScalarType, Type};
use crate::{Diagnostic, SemanticErrorKind};
use scope::{ScopeArena, Variable};
use std::collections::HashMap;

/// Names that resolve without a declaration.
pub const BUILTINS: &[&str] = &["cin", "cout", "endl", "abs", "true", "false", "NULL"];

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<ScalarType>,
    pub line: Line,
}

impl Signature {
    fn of(f: &Function) -> Self {
        Self {
            name: f.name.clone(),
            return_type: f.return_type,
            params: f.params.iter().map(|p| p.ty).collect(),
            line: f.line,
        }
    }
}

/// The function whose body is being analyzed.
#[derive(Debug, Clone)]
pub struct FunctionCtx {
    pub name: String,
    pub return_type: Type,
}

pub struct Analyzer {
    pub scopes: ScopeArena,
    pub functions: HashMap<String, Signature>,
    pub fn_ctx: Option<FunctionCtx>,
    /// Number of enclosing loops at the current point.
    pub loop_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            scopes: ScopeArena::new(),
            functions: HashMap::new(),
            fn_ctx: None,
            loop_depth: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn report(&mut self, kind: SemanticErrorKind, line: Line, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(kind, message, line);
        log::debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Run `f` inside a fresh child scope.
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.push();
        let result = f(self);
        self.scopes.pop();
        result
    }

    pub fn in_loop<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.loop_depth += 1;
        let result = f(self);
        self.loop_depth -= 1;
        result
    }

    pub fn analyze_program(&mut self, program: &Program) {
        // First pass: signatures, so calls may precede definitions.
        for f in program.functions() {
            if let Some(existing) = self.functions.get(&f.name) {
                let message = format!(
                    "Function '{}' already defined at line {}",
                    f.name, existing.line
                );
                self.report(SemanticErrorKind::FunctionRedefinition, f.line, message);
                continue;
            }
            self.functions.insert(f.name.clone(), Signature::of(f));
        }
        log::debug!("collected {} function signature(s)", self.functions.len());

        // Second pass: bodies and globals in source order.
        for item in &program.items {
            match item {
                Item::Global(s) => self.visit_stmt(s),
                Item::Function(f) => self.visit_function(f),
            }
        }
    }

    fn visit_function(&mut self, f: &Function) {
        log::trace!("analyzing function {}", f.name);
        let prev = self.fn_ctx.replace(FunctionCtx {
            name: f.name.clone(),
            return_type: f.return_type,
        });
        self.scoped(|this| {
            for p in &f.params {
                let mut var = Variable::new(&p.name, Type::from(p.ty), p.line);
                var.initialized = true;
                if this.scopes.declare(var).is_err() {
                    this.report(
                        SemanticErrorKind::ParameterRedefinition,
                        p.line,
                        format!("Parameter '{}' declared twice in '{}'", p.name, f.name),
                    );
                }
            }
            // Parameters and the top-level body share one scope.
            for s in &f.body {
                this.visit_stmt(s);
            }
        });
        self.fn_ctx = prev;
    }
}

/// Analyze a whole program and return every diagnostic found.
pub fn analyze(program: &Program) -> Vec<Diagnostic> {
    let mut analyzer = Analyzer::new();
    analyzer.analyze_program(program);
    let diagnostics = analyzer.finish();
    log::debug!("semantic analysis: {} diagnostic(s)", diagnostics.len());
    diagnostics
}
