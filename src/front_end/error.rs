use std::fmt;

use thiserror::Error;

use crate::front_end::node::NodeId;
use crate::front_end::token::Token;

// Location of an error in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,  // Byte offset in the source
    pub line: usize,    // Line number (1 based)
    pub col: usize,     // Column on the line (1 based)
}

impl Position {
    pub fn of(token: &Token) -> Self {
        Position {
            offset: token.pos(),
            line: token.line(),
            col: token.column(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The single failure a parse can end in. Productions return it through `?` and
/// [`Tree::parse`](crate::front_end::parser::Tree::parse) hands it to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ParseError {
    pub message: String,                // Parse message
    pub position: Option<Position>,     // Where in the source the error occurred, if known
    pub context: Option<String>,        // Source line with a caret under the offending token
    #[source]
    pub cause: Option<SymbolError>,     // Symbol table failure behind the error, if any
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            position: None,
            context: None,
            cause: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn caused_by(mut self, cause: SymbolError) -> Self {
        self.cause = Some(cause);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = &self.position {
            write!(f, "{} : ", pos)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(context) = &self.context {
            write!(f, "\n{}", context)?;
        }
        Ok(())
    }
}

// Misuse of the node graph. These are programming errors in the grammar driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("can't {action} children of node {node}, it is a terminal node")]
    TerminalHasNoChildren { node: NodeId, action: &'static str },

    #[error("node {child} is not a child of node {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("node {node} can't become a descendant of itself (below node {parent})")]
    WouldCreateCycle { parent: NodeId, node: NodeId },

    #[error("node {0} has no parent")]
    Detached(NodeId),

    #[error("node {0} does not exist in this tree")]
    NoSuchNode(NodeId),
}

// Lets productions use `?` on node graph operations
impl From<StructuralError> for ParseError {
    fn from(e: StructuralError) -> Self {
        ParseError::new(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("name {name:?} already defined in current scope")]
    Duplicate { name: String },
}

impl From<SymbolError> for ParseError {
    fn from(e: SymbolError) -> Self {
        ParseError::new(e.to_string()).caused_by(e)
    }
}

// Errors raised while building trees or symbol tables from fixture text
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("malformed fixture: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown node type {0:?}")]
    UnknownNodeType(String),

    #[error("unknown token type {0:?}")]
    UnknownTokenType(String),

    #[error("unnamed symbol in symbol table fixture")]
    UnnamedSymbol,

    #[error(transparent)]
    Symbol(#[from] SymbolError),

    #[error(transparent)]
    Structure(#[from] StructuralError),
}
