use super::scope::{Resolution, Variable};
use super::types;
use super::Analyzer;
use crate::ast::{Expr, Line, OutputItem, ScalarType, Stmt, Type};
use crate::SemanticErrorKind;

impl Analyzer {
    pub fn visit_stmt(&mut self, s: &Stmt) {
        match s {
            Stmt::Block { stmts, .. } => self.scoped(|this| {
                for s in stmts {
                    this.visit_stmt(s);
                }
            }),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_condition(condition, "if");
                self.scoped(|this| this.visit_stmt(then_branch));
                if let Some(e) = else_branch {
                    self.scoped(|this| this.visit_stmt(e));
                }
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
                ..
            } => self.scoped(|this| {
                this.visit_stmt(init);
                this.in_loop(|this| {
                    this.check_condition(condition, "for");
                    this.scoped(|this| this.visit_stmt(body));
                    this.visit_stmt(step);
                });
            }),
            Stmt::While {
                condition, body, ..
            } => self.in_loop(|this| {
                this.check_condition(condition, "while");
                this.scoped(|this| this.visit_stmt(body));
            }),
            Stmt::DoWhile {
                body, condition, ..
            } => self.in_loop(|this| {
                this.scoped(|this| this.visit_stmt(body));
                this.check_condition(condition, "do-while");
            }),
            Stmt::VarDecl {
                line,
                ty,
                name,
                init,
            } => self.visit_var_decl(*line, *ty, name, init.as_ref()),
            Stmt::ArrayDecl {
                line,
                elem,
                name,
                size,
                init,
            } => self.visit_array_decl(*line, *elem, name, *size, init.as_deref()),
            Stmt::Input { line, target } => self.visit_input(*line, target),
            Stmt::Output { items, .. } => {
                for item in items {
                    if let OutputItem::Expr(e) = item {
                        let t = self.infer(e);
                        if !(t.is_scalar() || matches!(t, Type::Str | Type::Unknown)) {
                            self.report(
                                SemanticErrorKind::TypeMismatch,
                                e.line(),
                                format!("Cannot print a value of type '{}'", t),
                            );
                        }
                    }
                }
            }
            Stmt::IncDec { line, name, .. } => {
                // Built-in names are not storage and cannot be stepped.
                if let Some(t) = self.resolve_variable(*line, name).map(|v| v.ty) {
                    if !matches!(t, Type::Int | Type::Char | Type::Unknown) {
                        self.report(
                            SemanticErrorKind::TypeMismatch,
                            *line,
                            format!("Cannot increment or decrement '{}' of type '{}'", name, t),
                        );
                    }
                }
            }
            Stmt::Return { line, value } => self.visit_return(*line, value.as_ref()),
            Stmt::Expr { expr, .. } => {
                self.infer(expr);
            }
            Stmt::Empty { .. } => {}
        }
    }

    /// Conditions must be `bool` or coercible to it.
    fn check_condition(&mut self, condition: &Expr, construct: &str) {
        let t = self.infer(condition);
        if !types::coercible(t, Type::Bool) {
            self.report(
                SemanticErrorKind::ConditionType,
                condition.line(),
                format!("Condition of '{}' has type '{}', expected 'bool'", construct, t),
            );
        }
    }

    fn visit_var_decl(&mut self, line: Line, ty: ScalarType, name: &str, init: Option<&Expr>) {
        let declared = Type::from(ty);
        if let Some(init) = init {
            let t = self.infer(init);
            if !types::coercible(t, declared) {
                self.report(
                    SemanticErrorKind::TypeMismatch,
                    init.line(),
                    format!("Cannot initialize '{}' variable '{}' with '{}'", declared, name, t),
                );
            }
        }

        let mut var = Variable::new(name, declared, line);
        var.initialized = init.is_some();
        var.is_global = self.fn_ctx.is_none();
        if let Err(existing) = self.scopes.declare(var) {
            self.report(
                SemanticErrorKind::VariableRedefinition,
                line,
                format!(
                    "Variable '{}' already declared in this scope at line {}",
                    name, existing.line
                ),
            );
        }
    }

    fn visit_array_decl(
        &mut self,
        line: Line,
        elem: ScalarType,
        name: &str,
        size: usize,
        init: Option<&[Expr]>,
    ) {
        if size == 0 {
            self.report(
                SemanticErrorKind::InvalidArraySize,
                line,
                format!("Array '{}' must have a positive size", name),
            );
        }
        if let Some(values) = init {
            if values.len() > size {
                self.report(
                    SemanticErrorKind::InitializerTooLong,
                    line,
                    format!(
                        "Array '{}' has {} element(s) but {} initializer(s)",
                        name,
                        size,
                        values.len()
                    ),
                );
            }
            for value in values {
                let t = self.infer(value);
                if !types::exact(t, Type::from(elem)) {
                    self.report(
                        SemanticErrorKind::TypeMismatch,
                        value.line(),
                        format!("Array '{}' holds '{}', found '{}'", name, elem, t),
                    );
                }
            }
        }

        let mut var = Variable::new(name, Type::Array(elem), line);
        var.size = Some(size);
        var.initialized = true;
        var.is_global = self.fn_ctx.is_none();
        if let Err(existing) = self.scopes.declare(var) {
            self.report(
                SemanticErrorKind::ArrayRedefinition,
                line,
                format!(
                    "Array '{}' already declared in this scope at line {}",
                    name, existing.line
                ),
            );
        }
    }

    fn visit_input(&mut self, line: Line, target: &str) {
        let is_array = match self.scopes.resolve(target) {
            Resolution::Visible(var) => var.ty.is_array(),
            _ => {
                self.report_unresolved(line, target);
                return;
            }
        };
        if is_array {
            self.report(
                SemanticErrorKind::TypeMismatch,
                line,
                format!("Cannot read into array '{}'", target),
            );
        } else if let Some(var) = self.scopes.lookup_mut(target) {
            var.initialized = true;
        }
    }

    fn visit_return(&mut self, line: Line, value: Option<&Expr>) {
        let value_type = value.map(|v| (v.line(), self.infer(v)));
        let Some(ctx) = self.fn_ctx.clone() else {
            self.report(
                SemanticErrorKind::ReturnOutsideFunction,
                line,
                "Return statement outside of a function",
            );
            return;
        };

        match (value_type, ctx.return_type) {
            (None, Type::Void) => {}
            (None, expected) => self.report(
                SemanticErrorKind::ReturnValue,
                line,
                format!("Function '{}' must return a value of type '{}'", ctx.name, expected),
            ),
            (Some(_), Type::Void) => self.report(
                SemanticErrorKind::ReturnValue,
                line,
                format!("Void function '{}' cannot return a value", ctx.name),
            ),
            (Some((value_line, t)), expected) => {
                if !types::returnable(t, expected) {
                    self.report(
                        SemanticErrorKind::TypeMismatch,
                        value_line,
                        format!(
                            "Function '{}' returns '{}', found '{}'",
                            ctx.name, expected, t
                        ),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Function, Item, Program};
    use crate::semantic::analyze;

    fn program(items: Vec<Item>) -> Program {
        Program {
            includes: Vec::new(),
            usings: Vec::new(),
            items,
        }
    }

    #[test]
    fn return_at_file_scope_is_flagged() {
        let p = program(vec![Item::Global(Stmt::Return {
            line: 3,
            value: Some(Expr::Number(3, 1)),
        })]);
        let diagnostics = analyze(&p);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, SemanticErrorKind::ReturnOutsideFunction);
        assert_eq!(diagnostics[0].line, Some(3));
    }

    #[test]
    fn bare_return_in_void_function_is_fine() {
        let p = program(vec![Item::Function(Function {
            line: 1,
            return_type: Type::Void,
            name: "f".into(),
            params: Vec::new(),
            body: vec![Stmt::Return {
                line: 2,
                value: None,
            }],
        })]);
        assert!(analyze(&p).is_empty());
    }

    #[test]
    fn zero_sized_array_is_flagged() {
        let p = program(vec![Item::Global(Stmt::ArrayDecl {
            line: 1,
            elem: ScalarType::Int,
            name: "a".into(),
            size: 0,
            init: None,
        })]);
        let kinds: Vec<_> = analyze(&p).into_iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![SemanticErrorKind::InvalidArraySize]);
    }
}
