//! Coercion and operator typing tables.

use crate::ast::{BinOp, Type, UnOp};

use Type::{Bool, Char, Int};

type Row = (Type, Type, Type);

const ARITHMETIC: &[Row] = &[
    (Int, Int, Int),
    (Char, Int, Int),
    (Int, Char, Int),
    (Char, Char, Int),
];

const COMPARISON: &[Row] = &[(Int, Int, Bool), (Char, Char, Bool), (Bool, Bool, Bool)];

const LOGICAL: &[Row] = &[(Bool, Bool, Bool)];

fn rows(op: BinOp) -> &'static [Row] {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => ARITHMETIC,
        BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => COMPARISON,
        BinOp::And | BinOp::Or => LOGICAL,
    }
}

/// Whether a value of type `from` may be stored where `to` is expected.
///
/// `Unknown` on either side is accepted so an earlier error does not cascade.
pub fn coercible(from: Type, to: Type) -> bool {
    match (from, to) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (a, b) if a == b => true,
        (Char, Int) | (Int, Bool) => true,
        _ => false,
    }
}

/// Exact match, still tolerant of `Unknown`. Used for call arguments and
/// array initializer elements.
pub fn exact(from: Type, to: Type) -> bool {
    from == to || from == Type::Unknown || to == Type::Unknown
}

/// A returned value must match the declared type; a `char` may widen to `int`.
pub fn returnable(from: Type, to: Type) -> bool {
    exact(from, to) || (from == Char && to == Int)
}

/// Look up `(left, right)` in the operator's table, then the swapped pair.
pub fn binary_result(op: BinOp, left: Type, right: Type) -> Option<Type> {
    let table = rows(op);
    let find = |a: Type, b: Type| {
        table
            .iter()
            .find(|(x, y, _)| *x == a && *y == b)
            .map(|(_, _, result)| *result)
    };
    find(left, right).or_else(|| find(right, left))
}

pub fn unary_result(op: UnOp, operand: Type) -> Option<Type> {
    match op {
        UnOp::Neg => matches!(operand, Int | Char).then_some(Int),
        UnOp::Not => (operand.is_scalar() && coercible(operand, Bool)).then_some(Bool),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ScalarType;
    use rstest::rstest;

    #[rstest]
    #[case(Int, Int, true)]
    #[case(Char, Int, true)]
    #[case(Int, Bool, true)]
    #[case(Bool, Int, false)]
    #[case(Int, Char, false)]
    #[case(Char, Bool, false)]
    #[case(Type::Str, Int, false)]
    #[case(Type::Array(ScalarType::Int), Int, false)]
    #[case(Type::Unknown, Char, true)]
    #[case(Bool, Type::Unknown, true)]
    fn coercion_table(#[case] from: Type, #[case] to: Type, #[case] ok: bool) {
        assert_eq!(coercible(from, to), ok);
    }

    #[rstest]
    #[case(BinOp::Add, Int, Char, Some(Int))]
    #[case(BinOp::Mul, Char, Char, Some(Int))]
    #[case(BinOp::Sub, Char, Bool, None)]
    #[case(BinOp::Add, Bool, Int, None)]
    #[case(BinOp::Gt, Int, Char, None)]
    #[case(BinOp::Eq, Bool, Bool, Some(Bool))]
    #[case(BinOp::Lt, Char, Char, Some(Bool))]
    #[case(BinOp::And, Bool, Bool, Some(Bool))]
    #[case(BinOp::Or, Int, Bool, None)]
    fn operator_table(
        #[case] op: BinOp,
        #[case] left: Type,
        #[case] right: Type,
        #[case] expected: Option<Type>,
    ) {
        assert_eq!(binary_result(op, left, right), expected);
    }

    #[test]
    fn unary_operators() {
        assert_eq!(unary_result(UnOp::Neg, Char), Some(Int));
        assert_eq!(unary_result(UnOp::Neg, Bool), None);
        assert_eq!(unary_result(UnOp::Not, Int), Some(Bool));
        assert_eq!(unary_result(UnOp::Not, Char), None);
        assert_eq!(unary_result(UnOp::Not, Type::Str), None);
    }

    #[test]
    fn returns_only_widen_char() {
        assert!(returnable(Char, Int));
        assert!(!returnable(Int, Bool));
        assert!(returnable(Bool, Bool));
    }
}
