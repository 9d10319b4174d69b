use derive_more::{Display, From};
use std::fmt;

// Lexemes longer than this are cut off when a token is printed
const MAX_DISPLAY_LEXEME: usize = 10;

// Tag identifying the kind of token. Negative tags are reserved for the lexer itself,
// grammars number their own token types from zero upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Display)]
#[display(fmt = "TokenType({})", _0)]
pub struct TokenType(pub i32);

impl TokenType {
    pub const ERROR: TokenType = TokenType(-1); // Emitted by Scanner::errorf
    pub const EOF: TokenType = TokenType(-2);   // End of input

    // Returns true for the tags owned by the lexer (error and eof)
    pub fn is_reserved(self) -> bool {
        self.0 < 0
    }
}

// A token as scanned by the lexer. Tokens are immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    typ: TokenType,     // Type of the token
    lexeme: String,     // Scanned lexeme, or the error message for error tokens
    pos: usize,         // Byte offset of the first rune in the source
    line: usize,        // Line of the first rune (1 based)
    column: usize,      // Column of the first rune on its line (1 based, in runes)
}

impl Token {
    pub fn new(typ: TokenType, lexeme: impl Into<String>, pos: usize, line: usize, column: usize) -> Self {
        Token {
            typ,
            lexeme: lexeme.into(),
            pos,
            line,
            column,
        }
    }

    // Creates a token without a source position. Used when building trees from fixtures.
    pub fn debug(typ: TokenType, lexeme: impl Into<String>) -> Self {
        Token::new(typ, lexeme, 0, 0, 0)
    }

    pub fn typ(&self) -> TokenType {
        self.typ
    }

    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn is_eof(&self) -> bool {
        self.typ == TokenType::EOF
    }

    pub fn is_error(&self) -> bool {
        self.typ == TokenType::ERROR
    }

    // Renders the token using the given display name for its type
    pub(crate) fn describe(&self, name: &str) -> String {
        if self.is_error() {
            return format!("{}({}:{} {})", name, self.line, self.column, self.lexeme);
        }

        if self.lexeme.chars().count() > MAX_DISPLAY_LEXEME {
            let head: String = self.lexeme.chars().take(MAX_DISPLAY_LEXEME).collect();
            return format!("{}({:?}...)", name, head);
        }

        format!("{}({:?})", name, self.lexeme)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.typ {
            TokenType::ERROR => "Error".to_string(),
            TokenType::EOF => "EOF".to_string(),
            typ => typ.to_string(),
        };
        write!(f, "{}", self.describe(&name))
    }
}
