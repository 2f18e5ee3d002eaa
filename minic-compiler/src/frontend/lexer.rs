use logos::Logos;
use std::convert::Infallible;
use std::fmt;

/// Largest integer literal the 32-bit target can load.
pub const MAX_LITERAL: i64 = i32::MAX as i64;

/// Decode the body of a character literal (the text between the quotes).
fn unescape_char(body: &str) -> Option<char> {
    let mut chars = body.chars();
    let c = match chars.next()? {
        '\\' => match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            _ => return None,
        },
        c => c,
    };
    chars.next().is_none().then_some(c)
}

#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\r\n\f]+")] // Whitespace
#[logos(skip r"//[^\n]*")] // Line comments
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")] // Block comments
pub enum Token {
    // --- Keywords ---
    #[token("int")]
    Int,
    #[token("bool")]
    Bool,
    #[token("char")]
    Char,
    #[token("void")]
    Void,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("return")]
    Return,
    #[token("cin")]
    Cin,
    #[token("cout")]
    Cout,
    #[token("endl")]
    Endl,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("abs")]
    Abs,
    #[token("using")]
    Using,
    #[token("namespace")]
    Namespace,

    /// `#include <name>`; carries the header name.
    #[regex(r"#[ \t]*include[ \t]*<[^>\n]*>", |lex| {
        let s = lex.slice();
        let open = s.find('<').unwrap_or(0);
        s[open + 1..s.len() - 1].trim().to_string()
    })]
    Include(String),

    // --- Identifiers and literals ---
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// Decimal literal; anything above `i32::MAX` fails to lex.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok().filter(|n| *n <= MAX_LITERAL))]
    Number(i64),

    #[regex(r"'([^'\\\n]|\\[^\n])'", |lex| {
        let s = lex.slice();
        unescape_char(&s[1..s.len() - 1])
    })]
    CharLit(char),

    #[regex(r#""[^"\n]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    StrLit(String),

    // --- Operators ---
    #[token("==")]
    Eq,
    #[token("!=")]
    Neq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&&")]
    #[token("&")]
    AndAnd,
    #[token("||")]
    #[token("|")]
    OrOr,
    #[token("!")]
    Not,
    #[token("=")]
    Assign,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Mul,
    #[token("/")]
    Div,
    #[token("%")]
    Mod,

    // --- Punctuation ---
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int => write!(f, "int"),
            Token::Bool => write!(f, "bool"),
            Token::Char => write!(f, "char"),
            Token::Void => write!(f, "void"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::For => write!(f, "for"),
            Token::While => write!(f, "while"),
            Token::Do => write!(f, "do"),
            Token::Return => write!(f, "return"),
            Token::Cin => write!(f, "cin"),
            Token::Cout => write!(f, "cout"),
            Token::Endl => write!(f, "endl"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Abs => write!(f, "abs"),
            Token::Using => write!(f, "using"),
            Token::Namespace => write!(f, "namespace"),
            Token::Include(s) => write!(f, "#include <{}>", s),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::CharLit(c) => write!(f, "{:?}", c),
            Token::StrLit(s) => write!(f, "\"{}\"", s),
            Token::Eq => write!(f, "=="),
            Token::Neq => write!(f, "!="),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Shl => write!(f, "<<"),
            Token::Shr => write!(f, ">>"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::Assign => write!(f, "="),
            Token::PlusPlus => write!(f, "++"),
            Token::MinusMinus => write!(f, "--"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Mul => write!(f, "*"),
            Token::Div => write!(f, "/"),
            Token::Mod => write!(f, "%"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
        }
    }
}

/// Map a LALRPOP expected-terminal name to something readable.
///
/// Quoted terminals (`"\"int\""`) come back as `'int'`; the named ones
/// (`Ident`, `Number`, ...) get a word.
pub fn friendly_token_name(name: &str) -> String {
    let inner = name.trim_matches('"');
    match inner {
        "Ident" => "identifier".into(),
        "Number" => "number".into(),
        "CharLit" => "character literal".into(),
        "StrLit" => "string literal".into(),
        "Include" => "#include".into(),
        other => format!("'{}'", other),
    }
}

/// Why a stretch of source could not be scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexicalErrorKind {
    UnexpectedChar,
    /// An integer literal that does not fit in 32 bits.
    LiteralOutOfRange,
}

/// A stretch of source the lexer skipped. Parsing carries on past it, but
/// code generation refuses a program that has any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalError {
    pub kind: LexicalErrorKind,
    pub location: usize,
    pub line: usize,
    pub column: usize,
    /// First character of the skipped text.
    pub unexpected_char: char,
    /// The skipped text itself.
    pub text: String,
    pub context: String,
}

impl fmt::Display for LexicalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LexicalErrorKind::UnexpectedChar => write!(
                f,
                "Unexpected character '{}' at line {}, column {}",
                self.unexpected_char, self.line, self.column
            )?,
            LexicalErrorKind::LiteralOutOfRange => write!(
                f,
                "Integer literal {} at line {}, column {} exceeds {}",
                self.text, self.line, self.column, MAX_LITERAL
            )?,
        }
        write!(f, "\n  Context: {}", self.context)
    }
}

impl std::error::Error for LexicalError {}

/// Byte offsets of every line start, for offset -> (line, column) lookups.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    /// 1-based (line, column); the column counts bytes from the line start.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line_of(offset);
        (line, offset - self.line_starts[line - 1] + 1)
    }

    /// The trimmed text of the line containing `offset`.
    pub fn line_text<'s>(&self, source: &'s str, offset: usize) -> &'s str {
        let offset = offset.min(source.len());
        let start = self.line_starts[self.line_of(offset) - 1];
        let end = source[start..]
            .find('\n')
            .map_or(source.len(), |i| start + i);
        source[start..end].trim()
    }
}

fn lexical_error(
    source: &str,
    lines: &LineIndex,
    kind: LexicalErrorKind,
    start: usize,
    end: usize,
) -> LexicalError {
    let (line, column) = lines.line_col(start);
    let text = &source[start..end];
    LexicalError {
        kind,
        location: start,
        line,
        column,
        unexpected_char: text.chars().next().unwrap_or('\0'),
        text: text.to_string(),
        context: lines.line_text(source, start).to_string(),
    }
}

/// A token together with its byte span and source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub token: Token,
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

/// The full result of scanning one source text.
#[derive(Debug, Clone, Default)]
pub struct Tokens {
    pub lexemes: Vec<Lexeme>,
    pub errors: Vec<LexicalError>,
}

// Shape LALRPOP expects from an external lexer.
pub type Spanned<Tok, Loc, Error> = Result<(Loc, Tok, Loc), Error>;

impl Tokens {
    /// Feed the scanned tokens to the generated parser. Lexical errors were
    /// already split off, so the stream cannot fail.
    pub fn spanned(&self) -> impl Iterator<Item = Spanned<Token, usize, Infallible>> + '_ {
        self.lexemes
            .iter()
            .map(|lx| Ok((lx.start, lx.token.clone(), lx.end)))
    }
}

/// Classify the text logos rejected at `start` and return where it ends.
///
/// A digit run is an out-of-range literal and is skipped whole; anything
/// else is a single unexpected character.
fn rejected_span(source: &str, start: usize) -> (LexicalErrorKind, usize) {
    let rest = &source[start..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        return (LexicalErrorKind::LiteralOutOfRange, start + digits);
    }
    let width = rest.chars().next().map_or(1, char::len_utf8);
    (LexicalErrorKind::UnexpectedChar, start + width)
}

/// Scan `source` into tokens.
///
/// Rejected text is recorded and skipped, and scanning resumes right after
/// it; the pass always reaches the end of the input.
pub fn tokenize(source: &str) -> Tokens {
    let lines = LineIndex::new(source);
    let mut out = Tokens::default();
    let mut base = 0;
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let (start, end) = (base + span.start, base + span.end);
        match result {
            Ok(token) => out.lexemes.push(Lexeme {
                token,
                start,
                end,
                line: lines.line_of(start),
            }),
            Err(()) => {
                let (kind, resume) = rejected_span(source, start);
                let err = lexical_error(source, &lines, kind, start, resume);
                log::warn!("{}", err);
                out.errors.push(err);

                // logos may stop short of, or run past, the rejected text.
                if resume != end {
                    base = resume;
                    lexer = Token::lexer(&source[base..]);
                }
            }
        }
    }

    log::debug!(
        "lexed {} tokens ({} lexical errors)",
        out.lexemes.len(),
        out.errors.len()
    );
    out
}
