//! Front end: the logos lexer and the LALRPOP grammar that builds the AST.

pub mod lexer;

// Generated from `frontend/grammar.lalrpop` by the build script.
lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all, unused_parens)]
    pub grammar,
    "/frontend/grammar.rs"
);
