use crate::frontend::lexer::{self, LexicalError, LineIndex};
use crate::frontend::grammar;
use crate::CompileError;
use std::fmt;

/// 1-based source line a node starts on.
pub type Line = usize;

/// Types a variable, parameter or array element can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int,
    Bool,
    Char,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Int => write!(f, "int"),
            ScalarType::Bool => write!(f, "bool"),
            ScalarType::Char => write!(f, "char"),
        }
    }
}

/// Statically inferred type of a value-producing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Bool,
    Char,
    Array(ScalarType),
    /// String literal; only printable.
    Str,
    /// Return type of a function that returns nothing.
    Void,
    /// Result of an expression that already produced a diagnostic.
    Unknown,
}

impl From<ScalarType> for Type {
    fn from(t: ScalarType) -> Self {
        match t {
            ScalarType::Int => Type::Int,
            ScalarType::Bool => Type::Bool,
            ScalarType::Char => Type::Char,
        }
    }
}

impl Type {
    pub fn is_array(self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_scalar(self) -> bool {
        matches!(self, Type::Int | Type::Bool | Type::Char)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Char => write!(f, "char"),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Str => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Unknown => write!(f, "<unknown>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Header names from `#include <...>` lines.
    pub includes: Vec<String>,
    /// Namespaces from `using namespace ...;` lines.
    pub usings: Vec<String>,
    pub items: Vec<Item>,
}

impl Program {
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(f) => Some(f),
            Item::Global(_) => None,
        })
    }

    /// The entry point, if the program defines one.
    pub fn main(&self) -> Option<&Function> {
        self.functions().find(|f| f.name == ENTRY_POINT)
    }
}

pub const ENTRY_POINT: &str = "main";

/// A top-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A declaration at file scope (the grammar only produces variable and
    /// array declarations here).
    Global(Stmt),
    Function(Function),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub line: Line,
    pub return_type: Type,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub line: Line,
    pub ty: ScalarType,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Brace-delimited statement list
    Block { line: Line, stmts: Vec<Stmt> },
    If {
        line: Line,
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// `for (init; condition; step) body`; `init` and `step` are
    /// declaration / expression statements without their semicolon.
    For {
        line: Line,
        init: Box<Stmt>,
        condition: Expr,
        step: Box<Stmt>,
        body: Box<Stmt>,
    },
    While {
        line: Line,
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        line: Line,
        body: Box<Stmt>,
        condition: Expr,
    },
    VarDecl {
        line: Line,
        ty: ScalarType,
        name: String,
        init: Option<Expr>,
    },
    /// `T name[size] = { ... };`
    ArrayDecl {
        line: Line,
        elem: ScalarType,
        name: String,
        size: usize,
        init: Option<Vec<Expr>>,
    },
    /// `cin >> target;`
    Input { line: Line, target: String },
    /// `cout << a << b << endl;`
    Output { line: Line, items: Vec<OutputItem> },
    /// `x++`, `++x`, `x--`, `--x`
    IncDec {
        line: Line,
        name: String,
        op: IncDecOp,
        prefix: bool,
    },
    Return { line: Line, value: Option<Expr> },
    /// Expression evaluated for its effect (assignments, calls, ...)
    Expr { line: Line, expr: Expr },
    /// A lone `;`
    Empty { line: Line },
}

impl Stmt {
    pub fn line(&self) -> Line {
        match self {
            Stmt::Block { line, .. } => *line,
            Stmt::If { line, .. } => *line,
            Stmt::For { line, .. } => *line,
            Stmt::While { line, .. } => *line,
            Stmt::DoWhile { line, .. } => *line,
            Stmt::VarDecl { line, .. } => *line,
            Stmt::ArrayDecl { line, .. } => *line,
            Stmt::Input { line, .. } => *line,
            Stmt::Output { line, .. } => *line,
            Stmt::IncDec { line, .. } => *line,
            Stmt::Return { line, .. } => *line,
            Stmt::Expr { line, .. } => *line,
            Stmt::Empty { line } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    Expr(Expr),
    /// `endl`
    EndLine(Line),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncDecOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Line, i64),
    Bool(Line, bool),
    Char(Line, char),
    Str(Line, String),
    Ident(Line, String),
    Binary {
        line: Line,
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        line: Line,
        op: UnOp,
        operand: Box<Expr>,
    },
    Assign {
        line: Line,
        target: LValue,
        value: Box<Expr>,
    },
    /// Function call: name(args)
    Call {
        line: Line,
        name: String,
        args: Vec<Expr>,
    },
    /// Array element read: name[index]
    Index {
        line: Line,
        name: String,
        index: Box<Expr>,
    },
    /// Built-in function such as `abs(x)`
    SysCall {
        line: Line,
        func: SysFunc,
        arg: Box<Expr>,
    },
}

impl Expr {
    pub fn line(&self) -> Line {
        match self {
            Expr::Number(line, _) => *line,
            Expr::Bool(line, _) => *line,
            Expr::Char(line, _) => *line,
            Expr::Str(line, _) => *line,
            Expr::Ident(line, _) => *line,
            Expr::Binary { line, .. } => *line,
            Expr::Unary { line, .. } => *line,
            Expr::Assign { line, .. } => *line,
            Expr::Call { line, .. } => *line,
            Expr::Index { line, .. } => *line,
            Expr::SysCall { line, .. } => *line,
        }
    }

    /// Value of an integer literal, optionally negated (`-3`).
    pub fn as_int_literal(&self) -> Option<i64> {
        match self {
            Expr::Number(_, n) => Some(*n),
            Expr::Unary {
                op: UnOp::Neg,
                operand,
                ..
            } => operand.as_int_literal().map(|n| -n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Not,
    Neg,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Not => write!(f, "!"),
            UnOp::Neg => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysFunc {
    Abs,
}

impl SysFunc {
    pub fn name(self) -> &'static str {
        match self {
            SysFunc::Abs => "abs",
        }
    }
}

/// Assignment target (lvalue)
#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    Var(String),
    Index { name: String, index: Box<Expr> },
}

impl LValue {
    pub fn name(&self) -> &str {
        match self {
            LValue::Var(name) => name,
            LValue::Index { name, .. } => name,
        }
    }
}

/// A borrowed view of any tree node, for generic traversal.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Program(&'a Program),
    Function(&'a Function),
    Param(&'a Param),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Target(&'a LValue),
    Output(&'a OutputItem),
}

impl<'a> Node<'a> {
    /// Short label for tree rendering.
    pub fn label(&self) -> String {
        match self {
            Node::Program(_) => "program".into(),
            Node::Function(f) => format!("{} {}()", f.return_type, f.name),
            Node::Param(p) => format!("{} {}", p.ty, p.name),
            Node::Stmt(s) => match s {
                Stmt::Block { .. } => "...".into(),
                Stmt::If { .. } => "if".into(),
                Stmt::For { .. } => "for".into(),
                Stmt::While { .. } => "while".into(),
                Stmt::DoWhile { .. } => "do while".into(),
                Stmt::VarDecl { ty, name, .. } => format!("{} {}", ty, name),
                Stmt::ArrayDecl {
                    elem, name, size, ..
                } => format!("{} {}[{}]", elem, name, size),
                Stmt::Input { target, .. } => format!("cin >> {}", target),
                Stmt::Output { .. } => "cout".into(),
                Stmt::IncDec {
                    name, op, prefix, ..
                } => {
                    let sym = match op {
                        IncDecOp::Inc => "++",
                        IncDecOp::Dec => "--",
                    };
                    if *prefix {
                        format!("{}{}", sym, name)
                    } else {
                        format!("{}{}", name, sym)
                    }
                }
                Stmt::Return { .. } => "return".into(),
                Stmt::Expr { .. } => "expr".into(),
                Stmt::Empty { .. } => ";".into(),
            },
            Node::Expr(e) => match e {
                Expr::Number(_, n) => n.to_string(),
                Expr::Bool(_, b) => b.to_string(),
                Expr::Char(_, c) => format!("{:?}", c),
                Expr::Str(_, s) => format!("\"{}\"", s),
                Expr::Ident(_, name) => name.clone(),
                Expr::Binary { op, .. } => op.to_string(),
                Expr::Unary { op, .. } => op.to_string(),
                Expr::Assign { .. } => "=".into(),
                Expr::Call { name, .. } => format!("{}()", name),
                Expr::Index { name, .. } => format!("{}[]", name),
                Expr::SysCall { func, .. } => format!("{}()", func.name()),
            },
            Node::Target(t) => match t {
                LValue::Var(name) => name.clone(),
                LValue::Index { name, .. } => format!("{}[]", name),
            },
            Node::Output(o) => match o {
                OutputItem::Expr(_) => "<<".into(),
                OutputItem::EndLine(_) => "endl".into(),
            },
        }
    }

    /// Direct children, in source order.
    pub fn children(&self) -> Vec<Node<'a>> {
        match *self {
            Node::Program(p) => p
                .items
                .iter()
                .map(|item| match item {
                    Item::Global(s) => Node::Stmt(s),
                    Item::Function(f) => Node::Function(f),
                })
                .collect(),
            Node::Function(f) => f
                .params
                .iter()
                .map(Node::Param)
                .chain(f.body.iter().map(Node::Stmt))
                .collect(),
            Node::Param(_) => Vec::new(),
            Node::Stmt(s) => match s {
                Stmt::Block { stmts, .. } => stmts.iter().map(Node::Stmt).collect(),
                Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                    ..
                } => {
                    let mut out = vec![Node::Expr(condition), Node::Stmt(then_branch)];
                    if let Some(e) = else_branch {
                        out.push(Node::Stmt(e));
                    }
                    out
                }
                Stmt::For {
                    init,
                    condition,
                    step,
                    body,
                    ..
                } => vec![
                    Node::Stmt(init),
                    Node::Expr(condition),
                    Node::Stmt(step),
                    Node::Stmt(body),
                ],
                Stmt::While {
                    condition, body, ..
                } => vec![Node::Expr(condition), Node::Stmt(body)],
                Stmt::DoWhile {
                    body, condition, ..
                } => vec![Node::Stmt(body), Node::Expr(condition)],
                Stmt::VarDecl { init, .. } => init.iter().map(Node::Expr).collect(),
                Stmt::ArrayDecl { init, .. } => init
                    .iter()
                    .flat_map(|values| values.iter().map(Node::Expr))
                    .collect(),
                Stmt::Output { items, .. } => items.iter().map(Node::Output).collect(),
                Stmt::Return { value, .. } => value.iter().map(Node::Expr).collect(),
                Stmt::Expr { expr, .. } => vec![Node::Expr(expr)],
                Stmt::Input { .. } | Stmt::IncDec { .. } | Stmt::Empty { .. } => Vec::new(),
            },
            Node::Expr(e) => match e {
                Expr::Binary { left, right, .. } => vec![Node::Expr(left), Node::Expr(right)],
                Expr::Unary { operand, .. } => vec![Node::Expr(operand)],
                Expr::Assign { target, value, .. } => {
                    vec![Node::Target(target), Node::Expr(value)]
                }
                Expr::Call { args, .. } => args.iter().map(Node::Expr).collect(),
                Expr::Index { index, .. } => vec![Node::Expr(index)],
                Expr::SysCall { arg, .. } => vec![Node::Expr(arg)],
                Expr::Number(..)
                | Expr::Bool(..)
                | Expr::Char(..)
                | Expr::Str(..)
                | Expr::Ident(..) => Vec::new(),
            },
            Node::Target(t) => match t {
                LValue::Var(_) => Vec::new(),
                LValue::Index { index, .. } => vec![Node::Expr(index)],
            },
            Node::Output(o) => match o {
                OutputItem::Expr(e) => vec![Node::Expr(e)],
                OutputItem::EndLine(_) => Vec::new(),
            },
        }
    }

    /// Render the subtree with box-drawing guides, one node per line.
    pub fn render_tree(&self) -> Vec<String> {
        let mut out = vec![self.label()];
        let children = self.children();
        let last = children.len().saturating_sub(1);
        for (i, child) in children.iter().enumerate() {
            let (head, rest) = if i == last { ("└", " ") } else { ("├", "│") };
            for (j, line) in child.render_tree().into_iter().enumerate() {
                let guide = if j == 0 { head } else { rest };
                out.push(format!("{} {}", guide, line));
            }
        }
        out
    }
}

/// Parsed program along with the lexical errors skipped while scanning it.
#[derive(Debug, Clone)]
pub struct ParsedAst {
    pub program: Program,
    pub lexical_errors: Vec<LexicalError>,
}

pub fn parse_to_ast(source: &str) -> Result<ParsedAst, CompileError> {
    use lalrpop_util::ParseError;

    let tokens = lexer::tokenize(source);
    let lines = LineIndex::new(source);

    let at = |offset: usize, message: String| {
        let (line, col) = lines.line_col(offset);
        CompileError::Parse {
            line,
            col,
            context: lines.line_text(source, offset).to_string(),
            message,
        }
    };
    let expected_list = |expected: &[String]| {
        expected
            .iter()
            .map(|s| lexer::friendly_token_name(s))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let program = grammar::ProgramParser::new()
        .parse(&lines, tokens.spanned())
        .map_err(|e| match e {
            ParseError::InvalidToken { location } => at(location, "Invalid token".to_string()),
            ParseError::UnrecognizedEof { location, expected } => at(
                location,
                format!(
                    "Unexpected end of input. Expected one of: {}",
                    expected_list(&expected)
                ),
            ),
            ParseError::UnrecognizedToken {
                token: (start, tok, _),
                expected,
            } => at(
                start,
                format!(
                    "Unexpected token '{}'. Expected one of: {}",
                    tok,
                    expected_list(&expected)
                ),
            ),
            ParseError::ExtraToken {
                token: (start, tok, _),
            } => at(start, format!("Extra token '{}'", tok)),
            ParseError::User { error } => match error {},
        })?;

    Ok(ParsedAst {
        program,
        lexical_errors: tokens.errors,
    })
}
