use super::scope::{Resolution, Variable};
use super::{types, Analyzer, BUILTINS};
use crate::ast::{Expr, LValue, Line, Type};
use crate::SemanticErrorKind;

fn builtin_type(name: &str) -> Option<Type> {
    match name {
        "NULL" => Some(Type::Int),
        other if BUILTINS.contains(&other) => Some(Type::Unknown),
        _ => None,
    }
}

impl Analyzer {
    /// Infer the type of `e`, reporting every problem found inside it.
    pub fn infer(&mut self, e: &Expr) -> Type {
        match e {
            Expr::Number(..) => Type::Int,
            Expr::Bool(..) => Type::Bool,
            Expr::Char(..) => Type::Char,
            Expr::Str(..) => Type::Str,
            Expr::Ident(line, name) => self.read_variable(*line, name).unwrap_or(Type::Unknown),
            Expr::Binary {
                line,
                op,
                left,
                right,
            } => {
                let l = self.infer(left);
                let r = self.infer(right);
                if l == Type::Unknown || r == Type::Unknown {
                    return Type::Unknown;
                }
                types::binary_result(*op, l, r).unwrap_or_else(|| {
                    self.report(
                        SemanticErrorKind::TypeMismatch,
                        *line,
                        format!("Operator '{}' cannot be applied to '{}' and '{}'", op, l, r),
                    );
                    Type::Unknown
                })
            }
            Expr::Unary { line, op, operand } => {
                let t = self.infer(operand);
                if t == Type::Unknown {
                    return Type::Unknown;
                }
                types::unary_result(*op, t).unwrap_or_else(|| {
                    self.report(
                        SemanticErrorKind::TypeMismatch,
                        *line,
                        format!("Operator '{}' cannot be applied to '{}'", op, t),
                    );
                    Type::Unknown
                })
            }
            Expr::Assign {
                line,
                target,
                value,
            } => self.visit_assign(*line, target, value),
            Expr::Call { line, name, args } => self.visit_call(*line, name, args),
            Expr::Index { line, name, index } => self
                .element_type(*line, name, index)
                .unwrap_or(Type::Unknown),
            Expr::SysCall {
                line, func, arg, ..
            } => {
                let t = self.infer(arg);
                if !types::coercible(t, Type::Int) {
                    self.report(
                        SemanticErrorKind::TypeMismatch,
                        *line,
                        format!("'{}' expects an int argument, found '{}'", func.name(), t),
                    );
                }
                Type::Int
            }
        }
    }

    /// Resolve a plain variable, reporting it when it is not visible.
    pub fn resolve_variable(&mut self, line: Line, name: &str) -> Option<Variable> {
        if let Resolution::Visible(var) = self.scopes.resolve(name) {
            return Some(var.clone());
        }
        self.report_unresolved(line, name);
        None
    }

    /// Type of a variable read, falling back to the built-in identifiers.
    pub fn read_variable(&mut self, line: Line, name: &str) -> Option<Type> {
        if !matches!(self.scopes.resolve(name), Resolution::Visible(_)) {
            if let Some(t) = builtin_type(name) {
                return Some(t);
            }
        }
        let var = self.resolve_variable(line, name)?;
        // Inside a loop a later iteration may have assigned it.
        if !var.initialized && !var.is_global && self.loop_depth == 0 {
            log::warn!("line {}: '{}' is read before it is initialized", line, name);
        }
        Some(var.ty)
    }

    pub fn report_unresolved(&mut self, line: Line, name: &str) {
        let declared_at = match self.scopes.resolve(name) {
            Resolution::OutOfScope(var) => Some(var.line),
            _ => None,
        };
        if let Some(declared_at) = declared_at {
            self.report(
                SemanticErrorKind::OutOfScope,
                line,
                format!(
                    "'{}' (declared at line {}) is no longer visible here",
                    name, declared_at
                ),
            );
        } else if self.functions.contains_key(name) {
            self.report(
                SemanticErrorKind::UndefinedVariable,
                line,
                format!("'{}' is a function, not a variable", name),
            );
        } else {
            self.report(
                SemanticErrorKind::UndefinedVariable,
                line,
                format!("Use of undeclared variable '{}'", name),
            );
        }
    }

    fn visit_assign(&mut self, line: Line, target: &LValue, value: &Expr) -> Type {
        let value_type = self.infer(value);
        let target_type = match target {
            LValue::Var(name) => self.resolve_variable(line, name).map(|v| v.ty),
            LValue::Index { name, index } => self.element_type(line, name, index),
        };
        let Some(target_type) = target_type else {
            return Type::Unknown;
        };

        if !types::coercible(value_type, target_type) {
            self.report(
                SemanticErrorKind::TypeMismatch,
                line,
                format!(
                    "Cannot assign '{}' to '{}' of type '{}'",
                    value_type,
                    target.name(),
                    target_type
                ),
            );
        }
        if let Some(var) = self.scopes.lookup_mut(target.name()) {
            var.initialized = true;
        }
        target_type
    }

    fn visit_call(&mut self, line: Line, name: &str, args: &[Expr]) -> Type {
        let arg_types: Vec<Type> = args.iter().map(|a| self.infer(a)).collect();

        let Some(sig) = self.functions.get(name).cloned() else {
            if self.scopes.lookup(name).is_some() {
                self.report(
                    SemanticErrorKind::NotAFunction,
                    line,
                    format!("'{}' is a variable, not a function", name),
                );
            } else {
                self.report(
                    SemanticErrorKind::UndefinedFunction,
                    line,
                    format!("Call to undefined function '{}'", name),
                );
            }
            return Type::Unknown;
        };

        if arg_types.len() != sig.params.len() {
            self.report(
                SemanticErrorKind::ArgumentCountMismatch,
                line,
                format!(
                    "Function '{}' expects {} argument(s), got {}",
                    name,
                    sig.params.len(),
                    arg_types.len()
                ),
            );
            return sig.return_type;
        }

        for (i, (arg, param)) in arg_types.iter().zip(&sig.params).enumerate() {
            if !types::exact(*arg, Type::from(*param)) {
                self.report(
                    SemanticErrorKind::ArgumentTypeMismatch,
                    args[i].line(),
                    format!(
                        "Argument {} of '{}' must be '{}', found '{}'",
                        i + 1,
                        name,
                        param,
                        arg
                    ),
                );
            }
        }
        sig.return_type
    }

    /// Element type of `name[index]`, checking the index along the way.
    fn element_type(&mut self, line: Line, name: &str, index: &Expr) -> Option<Type> {
        let var = self.resolve_variable(line, name);
        self.check_index(name, index, var.as_ref().and_then(|v| v.size));
        let var = var?;
        match var.ty {
            Type::Array(elem) => Some(Type::from(elem)),
            other => {
                self.report(
                    SemanticErrorKind::NotAnArray,
                    line,
                    format!("'{}' has type '{}' and cannot be indexed", name, other),
                );
                Some(Type::Unknown)
            }
        }
    }

    fn check_index(&mut self, name: &str, index: &Expr, size: Option<usize>) {
        let t = self.infer(index);
        if !types::exact(t, Type::Int) {
            self.report(
                SemanticErrorKind::IndexType,
                index.line(),
                format!("Index into '{}' must be 'int', found '{}'", name, t),
            );
        }
        if let (Some(n), Some(size)) = (index.as_int_literal(), size) {
            let in_range = usize::try_from(n).map_or(false, |n| n <= size);
            if !in_range {
                self.report(
                    SemanticErrorKind::IndexOutOfBounds,
                    index.line(),
                    format!("Index {} is outside '{}' of size {}", n, name, size),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::parse_to_ast;
    use crate::semantic::analyze;
    use crate::SemanticErrorKind;

    fn kinds(source: &str) -> Vec<SemanticErrorKind> {
        let parsed = parse_to_ast(source).unwrap();
        analyze(&parsed.program).into_iter().map(|d| d.kind).collect()
    }

    #[test]
    fn null_is_an_int() {
        assert!(kinds("int main() { int p = NULL; return p; }").is_empty());
    }

    #[test]
    fn unknown_operands_do_not_cascade() {
        assert_eq!(
            kinds("int main() { int x = missing + 1 * 2; return 0; }"),
            vec![SemanticErrorKind::UndefinedVariable]
        );
    }

    #[test]
    fn calling_a_variable() {
        assert_eq!(
            kinds("int main() { int f = 1; f(); return 0; }"),
            vec![SemanticErrorKind::NotAFunction]
        );
    }

    #[test]
    fn indexing_a_scalar() {
        assert_eq!(
            kinds("int main() { int x = 1; x[0] = 2; return 0; }"),
            vec![SemanticErrorKind::NotAnArray]
        );
    }

    #[test]
    fn negative_literal_index() {
        assert_eq!(
            kinds("int main() { int a[2]; return a[-1]; }"),
            vec![SemanticErrorKind::IndexOutOfBounds]
        );
    }

    #[test]
    fn void_result_used_as_value() {
        assert_eq!(
            kinds("void f() { } int main() { int x = f(); return x; }"),
            vec![SemanticErrorKind::TypeMismatch]
        );
    }
}
