use std::borrow::Cow;
use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::front_end::node::NodeType;
use crate::front_end::token::{Token, TokenType};

lazy_static! {
    // Names of the token types owned by the lexer
    static ref RESERVED_TOKEN_NAMES: HashMap<TokenType, &'static str> = {
        let mut m = HashMap::new();
        m.insert(TokenType::ERROR, "Error");
        m.insert(TokenType::EOF, "EOF");
        m
    };

    // Names of the node types owned by the tree
    static ref RESERVED_NODE_NAMES: HashMap<NodeType, &'static str> = {
        let mut m = HashMap::new();
        m.insert(NodeType::ROOT, "Root");
        m
    };
}

// Naming context for a grammar. It maps token and node type tags onto display names and is
// passed explicitly to every printing and fixture loading call, so multiple grammars can live
// in one process.
#[derive(Debug, Clone, Default)]
pub struct Names {
    tokens: HashMap<TokenType, String>,
    nodes: HashMap<NodeType, String>,
}

impl Names {
    pub fn new() -> Self {
        Self::default()
    }

    // Builder style registration of a token type name
    pub fn with_token(mut self, typ: TokenType, name: &str) -> Self {
        self.add_token(typ, name);
        self
    }

    // Builder style registration of a node type name
    pub fn with_node(mut self, typ: NodeType, name: &str) -> Self {
        self.add_node(typ, name);
        self
    }

    pub fn add_token(&mut self, typ: TokenType, name: &str) {
        self.tokens.insert(typ, name.to_string());
    }

    pub fn add_node(&mut self, typ: NodeType, name: &str) {
        self.nodes.insert(typ, name.to_string());
    }

    // Returns the display name of a token type, falling back to the numeric tag
    pub fn token_name(&self, typ: TokenType) -> Cow<'_, str> {
        if let Some(name) = self.tokens.get(&typ) {
            return Cow::Borrowed(name.as_str());
        }
        match RESERVED_TOKEN_NAMES.get(&typ) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(typ.to_string()),
        }
    }

    // Returns the display name of a node type, falling back to the numeric tag
    pub fn node_name(&self, typ: NodeType) -> Cow<'_, str> {
        if let Some(name) = self.nodes.get(&typ) {
            return Cow::Borrowed(name.as_str());
        }
        match RESERVED_NODE_NAMES.get(&typ) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(typ.to_string()),
        }
    }

    // Reverse lookup, used by the fixture loaders
    pub fn token_type(&self, name: &str) -> Option<TokenType> {
        self.tokens
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(typ, _)| *typ)
            .or_else(|| RESERVED_TOKEN_NAMES.iter().find(|(_, n)| **n == name).map(|(typ, _)| *typ))
    }

    pub fn node_type(&self, name: &str) -> Option<NodeType> {
        self.nodes
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(typ, _)| *typ)
            .or_else(|| RESERVED_NODE_NAMES.iter().find(|(_, n)| **n == name).map(|(typ, _)| *typ))
    }

    // Renders a token with the name of its type, e.g. NUM("12")
    pub fn token(&self, token: &Token) -> String {
        token.describe(&self.token_name(token.typ()))
    }
}
