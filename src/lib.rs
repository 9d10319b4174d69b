//! Building blocks for a compiler front end: a state machine lexer running as a
//! concurrent producer, a backtracking parse tree with speculative commit and
//! rollback, and a hierarchical symbol table.
//!
//! The crate ships no grammar. A grammar driver supplies token and node types,
//! the lexer state functions and the parser productions.

#[macro_use]
extern crate serde_derive;

pub mod front_end;
