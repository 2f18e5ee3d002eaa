pub mod ast;
pub mod codegen;
pub mod frontend;
pub mod options;
pub mod semantic;

pub use options::CompileOptions;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Parse error at line {line}, column {col}: {message}\n  {context}")]
    Parse {
        line: usize,
        col: usize,
        context: String,
        message: String,
    },

    #[error("{} lexical error(s):\n{}", .0.len(), render_lines(.0))]
    Lexical(Vec<frontend::lexer::LexicalError>),

    #[error("{} semantic error(s):\n{}", .0.len(), render_lines(.0))]
    Semantic(Vec<Diagnostic>),
}

fn render_lines<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|d| format!("  {}", d))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SemanticErrorKind {
    VariableRedefinition,
    ArrayRedefinition,
    FunctionRedefinition,
    ParameterRedefinition,
    UndefinedVariable,
    OutOfScope,
    UndefinedFunction,
    NotAFunction,
    NotAnArray,
    TypeMismatch,
    ConditionType,
    ArgumentCountMismatch,
    ArgumentTypeMismatch,
    ReturnOutsideFunction,
    ReturnValue,
    IndexType,
    IndexOutOfBounds,
    InitializerTooLong,
    InvalidArraySize,
}

impl std::fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticErrorKind::VariableRedefinition => write!(f, "VariableRedefinition"),
            SemanticErrorKind::ArrayRedefinition => write!(f, "ArrayRedefinition"),
            SemanticErrorKind::FunctionRedefinition => write!(f, "FunctionRedefinition"),
            SemanticErrorKind::ParameterRedefinition => write!(f, "ParameterRedefinition"),
            SemanticErrorKind::UndefinedVariable => write!(f, "UndefinedVariable"),
            SemanticErrorKind::OutOfScope => write!(f, "OutOfScope"),
            SemanticErrorKind::UndefinedFunction => write!(f, "UndefinedFunction"),
            SemanticErrorKind::NotAFunction => write!(f, "NotAFunction"),
            SemanticErrorKind::NotAnArray => write!(f, "NotAnArray"),
            SemanticErrorKind::TypeMismatch => write!(f, "TypeMismatch"),
            SemanticErrorKind::ConditionType => write!(f, "ConditionType"),
            SemanticErrorKind::ArgumentCountMismatch => write!(f, "ArgumentCountMismatch"),
            SemanticErrorKind::ArgumentTypeMismatch => write!(f, "ArgumentTypeMismatch"),
            SemanticErrorKind::ReturnOutsideFunction => write!(f, "ReturnOutsideFunction"),
            SemanticErrorKind::ReturnValue => write!(f, "ReturnValue"),
            SemanticErrorKind::IndexType => write!(f, "IndexType"),
            SemanticErrorKind::IndexOutOfBounds => write!(f, "IndexOutOfBounds"),
            SemanticErrorKind::InitializerTooLong => write!(f, "InitializerTooLong"),
            SemanticErrorKind::InvalidArraySize => write!(f, "InvalidArraySize"),
        }
    }
}

/// One semantic problem found by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: SemanticErrorKind,
    pub message: String,
    /// Line of the offending node, when the node carries one.
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(kind: SemanticErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line: Some(line),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "SemanticError:{} (line {}) - {}", self.kind, line, self.message),
            None => write!(f, "SemanticError:{} - {}", self.kind, self.message),
        }
    }
}

/// Parse and analyze without generating code.
///
/// Syntax errors abort with `Err`; semantic problems are returned as a list,
/// empty when the program is valid. Characters the lexer skipped are kept in
/// `ParsedAst::lexical_errors` so callers can report them alongside.
pub fn check(source: &str) -> Result<(ast::ParsedAst, Vec<Diagnostic>), CompileError> {
    let parsed = ast::parse_to_ast(source)?;
    let diagnostics = semantic::analyze(&parsed.program);
    Ok((parsed, diagnostics))
}

/// Compile source text to stack-machine assembly with default options.
pub fn compile_to_il(source: &str) -> Result<String, CompileError> {
    compile_to_il_with(source, &CompileOptions::default())
}

pub fn compile_to_il_with(source: &str, options: &CompileOptions) -> Result<String, CompileError> {
    let (parsed, diagnostics) = check(source)?;
    if !parsed.lexical_errors.is_empty() {
        return Err(CompileError::Lexical(parsed.lexical_errors));
    }
    if !diagnostics.is_empty() {
        return Err(CompileError::Semantic(diagnostics));
    }
    Ok(codegen::generate_with(&parsed.program, options))
}
