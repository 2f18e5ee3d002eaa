use super::context::Gen;
use super::instr::Instr;
use crate::ast::{BinOp, Expr, LValue, ScalarType, SysFunc, Type, UnOp};

/// Opcodes for a binary operator, applied to the two operands on the stack.
pub fn binop_instrs(op: BinOp) -> Vec<Instr> {
    match op {
        BinOp::Add => vec![Instr::Add],
        BinOp::Sub => vec![Instr::Sub],
        BinOp::Mul => vec![Instr::Mul],
        BinOp::Div => vec![Instr::Div],
        BinOp::Mod => vec![Instr::Rem],
        BinOp::Eq => vec![Instr::Ceq],
        BinOp::Neq => vec![Instr::Ceq, Instr::LdcI4(0), Instr::Ceq],
        BinOp::Lt => vec![Instr::Clt],
        BinOp::Gt => vec![Instr::Cgt],
        BinOp::Le => vec![Instr::Cgt, Instr::LdcI4(0), Instr::Ceq],
        BinOp::Ge => vec![Instr::Clt, Instr::LdcI4(0), Instr::Ceq],
        BinOp::And => vec![Instr::And],
        BinOp::Or => vec![Instr::Or],
    }
}

const ABS: &str = "int32 [mscorlib]System.Math::Abs(int32)";

impl Gen<'_> {
    /// Push the value of `e` and return its type.
    pub fn lower_expr(&mut self, e: &Expr) -> Type {
        match e {
            Expr::Number(_, n) => {
                self.emit(Instr::LdcI4(*n));
                Type::Int
            }
            Expr::Bool(_, b) => {
                self.emit(Instr::LdcI4(i64::from(*b)));
                Type::Bool
            }
            Expr::Char(_, c) => {
                self.emit(Instr::LdcI4(i64::from(u32::from(*c))));
                Type::Char
            }
            Expr::Str(_, s) => {
                self.emit(Instr::Ldstr(s.clone()));
                Type::Str
            }
            Expr::Ident(_, name) => match self.lookup(name) {
                Some(storage) => {
                    self.load(storage, name);
                    storage.ty()
                }
                None => {
                    if name != "NULL" {
                        log::warn!("unresolved identifier '{}' lowered as 0", name);
                    }
                    self.emit(Instr::LdcI4(0));
                    Type::Int
                }
            },
            Expr::Binary {
                op, left, right, ..
            } => {
                self.lower_expr(left);
                self.lower_expr(right);
                for instr in binop_instrs(*op) {
                    self.emit(instr);
                }
                match op {
                    BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => Type::Int,
                    _ => Type::Bool,
                }
            }
            Expr::Unary { op, operand, .. } => {
                self.lower_expr(operand);
                match op {
                    UnOp::Neg => {
                        self.emit(Instr::Neg);
                        Type::Int
                    }
                    UnOp::Not => {
                        self.emit(Instr::LdcI4(0));
                        self.emit(Instr::Ceq);
                        Type::Bool
                    }
                }
            }
            Expr::Assign { target, value, .. } => self.lower_assign(target, value, true),
            Expr::Call { name, args, .. } => self.lower_call(name, args),
            Expr::Index { name, index, .. } => {
                let elem = self.load_array(name);
                self.lower_expr(index);
                self.emit(Instr::Ldelem(elem));
                elem.into()
            }
            Expr::SysCall { func, arg, .. } => {
                self.lower_expr(arg);
                match func {
                    SysFunc::Abs => self.emit(Instr::Call {
                        target: ABS.to_string(),
                        args: 1,
                        returns_value: true,
                    }),
                }
                Type::Int
            }
        }
    }

    /// Lower an assignment. With `keep` the assigned value stays on the stack.
    pub fn lower_assign(&mut self, target: &LValue, value: &Expr, keep: bool) -> Type {
        match target {
            LValue::Var(name) => {
                let Some(storage) = self.lookup(name) else {
                    log::warn!("assignment to unresolved '{}' dropped", name);
                    let t = self.lower_expr(value);
                    if !keep {
                        self.emit(Instr::Pop);
                    }
                    return t;
                };
                self.lower_expr(value);
                if keep {
                    self.emit(Instr::Dup);
                }
                self.store(storage, name);
                storage.ty()
            }
            LValue::Index { name, index } => {
                let elem = self.load_array(name);
                self.lower_expr(index);
                self.lower_expr(value);
                if keep {
                    let tmp = self.scratch_local(elem.into());
                    self.emit(Instr::Dup);
                    self.emit(Instr::Stloc(tmp));
                    self.emit(Instr::Stelem(elem));
                    self.emit(Instr::Ldloc(tmp));
                } else {
                    self.emit(Instr::Stelem(elem));
                }
                elem.into()
            }
        }
    }

    /// Push the array reference bound to `name` and return its element type.
    fn load_array(&mut self, name: &str) -> ScalarType {
        match self.lookup(name) {
            Some(storage) => {
                self.load(storage, name);
                match storage.ty() {
                    Type::Array(elem) => elem,
                    other => {
                        log::warn!("'{}' of type '{}' indexed as an array", name, other);
                        ScalarType::Int
                    }
                }
            }
            None => {
                log::warn!("unresolved array '{}'", name);
                self.emit(Instr::LdcI4(0));
                ScalarType::Int
            }
        }
    }

    fn lower_call(&mut self, name: &str, args: &[Expr]) -> Type {
        for arg in args {
            self.lower_expr(arg);
        }
        let Some(sig) = self.signatures.get(name).cloned() else {
            log::warn!("call to unknown function '{}'", name);
            for _ in args {
                self.emit(Instr::Pop);
            }
            self.emit(Instr::LdcI4(0));
            return Type::Int;
        };
        let target = self.method_ref(name, &sig);
        self.emit(Instr::Call {
            target,
            args: args.len(),
            returns_value: sig.return_type != Type::Void,
        });
        sig.return_type
    }
}
