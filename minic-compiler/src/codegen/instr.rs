use crate::ast::{ScalarType, Type};
use std::fmt;

/// One stack-machine instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Label(String),
    Comment(String),

    LdcI4(i64),
    Ldstr(String),
    Ldloc(usize),
    Stloc(usize),
    Ldarg(usize),
    Starg(usize),
    /// Static field, as a full `type Class::name` reference.
    Ldsfld(String),
    Stsfld(String),

    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    And,
    Or,
    Ceq,
    Clt,
    Cgt,

    Br(String),
    Brfalse(String),
    Brtrue(String),

    /// `call` with the target signature and its stack effect.
    Call {
        target: String,
        args: usize,
        returns_value: bool,
    },
    Ret {
        value: bool,
    },

    Newarr(ScalarType),
    Ldelem(ScalarType),
    Stelem(ScalarType),

    Dup,
    Pop,
}

impl Instr {
    /// Number of values popped and pushed.
    pub fn stack_effect(&self) -> (usize, usize) {
        match self {
            Instr::Label(_) | Instr::Comment(_) | Instr::Br(_) => (0, 0),
            Instr::LdcI4(_)
            | Instr::Ldstr(_)
            | Instr::Ldloc(_)
            | Instr::Ldarg(_)
            | Instr::Ldsfld(_) => (0, 1),
            Instr::Stloc(_) | Instr::Starg(_) | Instr::Stsfld(_) => (1, 0),
            Instr::Add
            | Instr::Sub
            | Instr::Mul
            | Instr::Div
            | Instr::Rem
            | Instr::And
            | Instr::Or
            | Instr::Ceq
            | Instr::Clt
            | Instr::Cgt => (2, 1),
            Instr::Neg => (1, 1),
            Instr::Brfalse(_) | Instr::Brtrue(_) => (1, 0),
            Instr::Call {
                args,
                returns_value,
                ..
            } => (*args, usize::from(*returns_value)),
            Instr::Ret { value } => (usize::from(*value), 0),
            Instr::Newarr(_) => (1, 1),
            Instr::Ldelem(_) => (2, 1),
            Instr::Stelem(_) => (3, 0),
            Instr::Dup => (1, 2),
            Instr::Pop => (1, 0),
        }
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Instr::Label(_))
    }
}

/// IL spelling of a value type.
pub fn il_type(ty: Type) -> String {
    match ty {
        Type::Int | Type::Unknown => "int32".into(),
        Type::Bool => "bool".into(),
        Type::Char => "char".into(),
        Type::Str => "string".into(),
        Type::Void => "void".into(),
        Type::Array(elem) => format!("{}[]", il_type(elem.into())),
    }
}

fn elem_suffix(elem: ScalarType, store: bool) -> &'static str {
    match (elem, store) {
        (ScalarType::Int, _) => "i4",
        (ScalarType::Bool, false) => "u1",
        (ScalarType::Bool, true) => "i1",
        (ScalarType::Char, false) => "u2",
        (ScalarType::Char, true) => "i2",
    }
}

fn short_form(f: &mut fmt::Formatter<'_>, op: &str, n: usize, shortcuts: usize) -> fmt::Result {
    if n < shortcuts {
        write!(f, "{}.{}", op, n)
    } else if n < 256 {
        write!(f, "{}.s {}", op, n)
    } else {
        write!(f, "{} {}", op, n)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Label(l) => write!(f, "{}:", l),
            Instr::Comment(c) => write!(f, "// {}", c),
            Instr::LdcI4(n) => match *n {
                -1 => write!(f, "ldc.i4.m1"),
                0..=8 => write!(f, "ldc.i4.{}", n),
                -128..=127 => write!(f, "ldc.i4.s {}", n),
                _ => write!(f, "ldc.i4 {}", n),
            },
            Instr::Ldstr(s) => write!(f, "ldstr {:?}", s),
            Instr::Ldloc(n) => short_form(f, "ldloc", *n, 4),
            Instr::Stloc(n) => short_form(f, "stloc", *n, 4),
            Instr::Ldarg(n) => short_form(f, "ldarg", *n, 4),
            Instr::Starg(n) => short_form(f, "starg", *n, 0),
            Instr::Ldsfld(field) => write!(f, "ldsfld {}", field),
            Instr::Stsfld(field) => write!(f, "stsfld {}", field),
            Instr::Add => write!(f, "add"),
            Instr::Sub => write!(f, "sub"),
            Instr::Mul => write!(f, "mul"),
            Instr::Div => write!(f, "div"),
            Instr::Rem => write!(f, "rem"),
            Instr::Neg => write!(f, "neg"),
            Instr::And => write!(f, "and"),
            Instr::Or => write!(f, "or"),
            Instr::Ceq => write!(f, "ceq"),
            Instr::Clt => write!(f, "clt"),
            Instr::Cgt => write!(f, "cgt"),
            Instr::Br(l) => write!(f, "br {}", l),
            Instr::Brfalse(l) => write!(f, "brfalse {}", l),
            Instr::Brtrue(l) => write!(f, "brtrue {}", l),
            Instr::Call { target, .. } => write!(f, "call {}", target),
            Instr::Ret { .. } => write!(f, "ret"),
            Instr::Newarr(elem) => write!(f, "newarr {}", il_type((*elem).into())),
            Instr::Ldelem(elem) => write!(f, "ldelem.{}", elem_suffix(*elem, false)),
            Instr::Stelem(elem) => write!(f, "stelem.{}", elem_suffix(*elem, true)),
            Instr::Dup => write!(f, "dup"),
            Instr::Pop => write!(f, "pop"),
        }
    }
}
