use super::context::Gen;
use super::instr::{il_type, Instr};
use crate::ast::{Expr, IncDecOp, OutputItem, ScalarType, Stmt, Type};

const READ_LINE: &str = "string [mscorlib]System.Console::ReadLine()";
const PARSE_INT: &str = "int32 [mscorlib]System.Int32::Parse(string)";
const READ_CHAR: &str = "int32 [mscorlib]System.Console::Read()";
const WRITE_LINE: &str = "void [mscorlib]System.Console::WriteLine()";

impl Gen<'_> {
    pub fn lower_stmt(&mut self, s: &Stmt) {
        if self.options.comments {
            self.emit(Instr::Comment(format!("line {}", s.line())));
        }
        let before = self.depth();
        self.lower_stmt_inner(s);
        if self.depth() != before {
            log::warn!(
                "{}: statement at line {} changed stack depth {} -> {}",
                self.method.name,
                s.line(),
                before,
                self.depth()
            );
            self.method.unbalanced.push(s.line());
        }
    }

    fn lower_stmt_inner(&mut self, s: &Stmt) {
        match s {
            Stmt::Block { stmts, .. } => self.scoped(|g| {
                for s in stmts {
                    g.lower_stmt(s);
                }
            }),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.lower_expr(condition);
                match else_branch {
                    None => {
                        let end = self.new_label();
                        self.emit(Instr::Brfalse(end.clone()));
                        self.scoped(|g| g.lower_stmt(then_branch));
                        self.emit(Instr::Label(end));
                    }
                    Some(else_branch) => {
                        let otherwise = self.new_label();
                        let end = self.new_label();
                        self.emit(Instr::Brfalse(otherwise.clone()));
                        self.scoped(|g| g.lower_stmt(then_branch));
                        self.emit(Instr::Br(end.clone()));
                        self.emit(Instr::Label(otherwise));
                        self.scoped(|g| g.lower_stmt(else_branch));
                        self.emit(Instr::Label(end));
                    }
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                let start = self.new_label();
                let end = self.new_label();
                self.emit(Instr::Label(start.clone()));
                self.lower_expr(condition);
                self.emit(Instr::Brfalse(end.clone()));
                self.scoped(|g| g.lower_stmt(body));
                self.emit(Instr::Br(start));
                self.emit(Instr::Label(end));
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
                ..
            } => self.scoped(|g| {
                g.lower_stmt(init);
                let start = g.new_label();
                let end = g.new_label();
                g.emit(Instr::Label(start.clone()));
                g.lower_expr(condition);
                g.emit(Instr::Brfalse(end.clone()));
                g.scoped(|g| g.lower_stmt(body));
                g.lower_stmt(step);
                g.emit(Instr::Br(start));
                g.emit(Instr::Label(end));
            }),
            Stmt::DoWhile {
                body, condition, ..
            } => {
                let start = self.new_label();
                self.emit(Instr::Label(start.clone()));
                self.scoped(|g| g.lower_stmt(body));
                self.lower_expr(condition);
                self.emit(Instr::Brtrue(start));
            }
            Stmt::VarDecl { ty, name, init, .. } => {
                if let Some(init) = init {
                    self.lower_expr(init);
                }
                let slot = self.declare_local(name, Type::from(*ty));
                if init.is_some() {
                    self.emit(Instr::Stloc(slot));
                }
            }
            Stmt::ArrayDecl {
                elem,
                name,
                size,
                init,
                ..
            } => {
                let slot = self.declare_local(name, Type::Array(*elem));
                self.emit(Instr::LdcI4(*size as i64));
                self.emit(Instr::Newarr(*elem));
                self.emit(Instr::Stloc(slot));
                for (i, value) in init.iter().flatten().enumerate() {
                    self.emit(Instr::Ldloc(slot));
                    self.emit(Instr::LdcI4(i as i64));
                    self.lower_expr(value);
                    self.emit(Instr::Stelem(*elem));
                }
            }
            Stmt::Input { target, .. } => {
                let Some(storage) = self.lookup(target) else {
                    log::warn!("input into unresolved '{}' dropped", target);
                    return;
                };
                if storage.ty() == Type::Char {
                    self.call(READ_CHAR, 0, true);
                } else {
                    self.call(READ_LINE, 0, true);
                    self.call(PARSE_INT, 1, true);
                }
                self.store(storage, target);
            }
            Stmt::Output { items, .. } => {
                for item in items {
                    match item {
                        OutputItem::Expr(e) => {
                            let t = self.lower_expr(e);
                            let target =
                                format!("void [mscorlib]System.Console::Write({})", il_type(t));
                            self.call(&target, 1, false);
                        }
                        OutputItem::EndLine(_) => self.call(WRITE_LINE, 0, false),
                    }
                }
            }
            Stmt::IncDec { name, op, .. } => {
                let Some(storage) = self.lookup(name) else {
                    log::warn!("increment of unresolved '{}' dropped", name);
                    return;
                };
                self.load(storage, name);
                self.emit(Instr::LdcI4(1));
                self.emit(match op {
                    IncDecOp::Inc => Instr::Add,
                    IncDecOp::Dec => Instr::Sub,
                });
                self.store(storage, name);
            }
            Stmt::Return { value, .. } => {
                if let Some(v) = value {
                    self.lower_expr(v);
                }
                self.emit(Instr::Ret {
                    value: value.is_some(),
                });
            }
            Stmt::Expr { expr, .. } => match expr {
                Expr::Assign { target, value, .. } => {
                    self.lower_assign(target, value, false);
                }
                other => {
                    let t = self.lower_expr(other);
                    if t != Type::Void {
                        self.emit(Instr::Pop);
                    }
                }
            },
            Stmt::Empty { .. } => {}
        }
    }

    fn call(&mut self, target: &str, args: usize, returns_value: bool) {
        self.emit(Instr::Call {
            target: target.to_string(),
            args,
            returns_value,
        });
    }

    /// Store each initializer of a global array into the static field.
    pub fn init_global_array(&mut self, name: &str, elem: ScalarType, size: usize, init: &[Expr]) {
        let ty = Type::Array(elem);
        let field = self.field_ref(name, ty);
        self.emit(Instr::LdcI4(size as i64));
        self.emit(Instr::Newarr(elem));
        self.emit(Instr::Stsfld(field.clone()));
        for (i, value) in init.iter().enumerate() {
            self.emit(Instr::Ldsfld(field.clone()));
            self.emit(Instr::LdcI4(i as i64));
            self.lower_expr(value);
            self.emit(Instr::Stelem(elem));
        }
    }
}
