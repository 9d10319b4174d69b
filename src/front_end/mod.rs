pub mod token;
pub mod lexer;
pub mod names;
pub mod error;
pub mod node;
pub mod parser;
pub mod symbol;

pub mod input_stream;
mod node_arena;
