pub mod fixture;

// ------------------------------------------------------------

use std::fmt;

use tracing::{debug, trace};

use crate::front_end::error::{ParseError, Position, StructuralError};
use crate::front_end::lexer::TokenSource;
use crate::front_end::names::Names;
use crate::front_end::node::{Node, NodeId, NodeType, ParseStatus};
use crate::front_end::node_arena::NodeArena;
use crate::front_end::symbol::{ScopeId, SymbolId, SymbolTable};
use crate::front_end::token::{Token, TokenType};

pub type ParseResult<T> = Result<T, ParseError>;

/// One state of a recursive-descent parse. The returned production runs next; `Ok(None)`
/// ends the parse and an `Err` aborts it.
#[derive(Clone, Copy)]
pub struct Production(pub fn(&mut Tree) -> ParseResult<Option<Production>>);

// Returns early from a production with an error located at the current token
#[macro_export]
macro_rules! parse_bail {
    ($tree:expr, $($arg:tt)+) => {
        return Err($tree.errorf(format_args!($($arg)+)))
    };
}

// Initial sizes of the token buffer and the namespace stack
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub buffer_capacity: usize,
    pub namespace_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            buffer_capacity: 4,
            namespace_capacity: 4,
        }
    }
}

// Scope that was active before an enter_scope or enter_namespace
struct ScopeFrame {
    outer: ScopeId,
    is_namespace: bool,
}

pub struct Tree {
    name: String,
    arena: NodeArena,                       // All nodes of the tree
    root: NodeId,                           // Sentinel root, always committed
    current: NodeId,                        // Insertion point for new nodes
    buffer: Vec<Token>,                     // Tokens fetched so far, replayable
    pos: isize,                             // Index of the current token in buffer, -1 when nothing is read
    namespace: Vec<String>,                 // Names of the symbols whose namespace is entered
    frames: Vec<ScopeFrame>,                // Scopes to return to
    scope: ScopeId,                         // Scope new nodes and symbols belong to
    symbols: SymbolTable,
    source: Option<Box<dyn TokenSource>>,   // Where tokens come from during a parse
}

impl Tree {
    pub fn new(name: &str) -> Self {
        Self::with_options(name, None)
    }

    pub fn with_options(name: &str, options: Option<Options>) -> Self {
        let options = options.unwrap_or_default();
        let symbols = SymbolTable::new();

        let mut arena = NodeArena::new();
        let mut root = Node::new_non_terminal(NodeType::ROOT, symbols.root());
        root.status = ParseStatus::FullyParsed;
        let root_id = arena.add_node(root);

        Tree {
            name: name.to_string(),
            arena,
            root: root_id,
            current: root_id,
            buffer: Vec::with_capacity(options.buffer_capacity),
            pos: -1,
            namespace: Vec::with_capacity(options.namespace_capacity),
            frames: vec![],
            scope: symbols.root(),
            symbols,
            source: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // Runs productions starting at start until one of them returns Ok(None). The first error
    // ends the parse and is returned.
    pub fn parse(&mut self, source: impl TokenSource + 'static, start: Production) -> Result<(), ParseError> {
        debug!(tree = %self.name, "parse started");
        self.set_source(source);

        let mut state = Some(start);
        while let Some(Production(f)) = state {
            state = match f(self) {
                Ok(next) => next,
                Err(e) => {
                    debug!(tree = %self.name, error = %e, "parse failed");
                    return Err(e);
                }
            };
        }
        Ok(())
    }

    // Reads tokens from source from now on. The token buffer starts out empty.
    pub fn set_source(&mut self, source: impl TokenSource + 'static) {
        self.source = Some(Box::new(source));
        self.buffer.clear();
        self.pos = -1;
    }

    // Discards the tokens the source has not handed out yet, so a lexer can finish
    pub fn drain(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.drain();
        }
    }

    // ------------------------------------------------------------
    // Token buffer

    // Moves to the next token. Only when the cursor is at the end of the buffer a new token is
    // pulled from the source.
    pub fn next(&mut self) -> Token {
        if self.pos + 1 == self.buffer.len() as isize {
            let token = self.fetch();
            self.buffer.push(token);
        }
        self.pos += 1;
        self.buffer[self.pos as usize].clone()
    }

    // Returns the next token without consuming it
    pub fn peek(&mut self) -> Token {
        let token = self.next();
        self.back();
        token
    }

    // Moves the cursor back by one token. Buffered tokens are kept, so next() returns them again.
    pub fn back(&mut self) {
        if self.pos >= 0 {
            self.pos -= 1;
        }
    }

    // Moves the cursor back to the closest buffered token of the given type, starting at the
    // cursor itself. Returns false and leaves the cursor alone when there is no such token.
    pub fn back_until(&mut self, typ: TokenType) -> bool {
        if self.pos < 0 {
            return false;
        }
        match self.buffer[..=self.pos as usize].iter().rposition(|t| t.typ() == typ) {
            Some(idx) => {
                self.pos = idx as isize;
                true
            }
            None => false,
        }
    }

    // Drops the tokens at or before the cursor. Nothing before this point can be rewound to
    // afterwards.
    pub fn clear_buffer(&mut self) {
        let cleared = (self.pos + 1) as usize;
        self.buffer.drain(..cleared);
        self.pos = -1;
        trace!(tree = %self.name, cleared, "cleared token buffer");
    }

    // Token under the cursor, if any has been read
    pub fn current_token(&self) -> Option<&Token> {
        if self.pos < 0 {
            return None;
        }
        self.buffer.get(self.pos as usize)
    }

    pub fn buffer_pos(&self) -> isize {
        self.pos
    }

    pub fn buffered(&self) -> &[Token] {
        &self.buffer
    }

    fn fetch(&mut self) -> Token {
        match self.source.as_mut() {
            Some(source) => source.next_token(),
            None => Token::debug(TokenType::EOF, ""),
        }
    }

    // ------------------------------------------------------------
    // Nodes

    pub fn root(&self) -> NodeId {
        self.root
    }

    // Insertion point for new nodes
    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.arena.get_node(node_id)
    }

    // Binds the symbol a node refers to, e.g. the definition a name resolved to
    pub fn bind_symbol(&mut self, node_id: NodeId, symbol_id: SymbolId) -> Result<(), StructuralError> {
        let node = self.arena.get_mut_node(node_id).ok_or(StructuralError::NoSuchNode(node_id))?;
        node.symbol = Some(symbol_id);
        Ok(())
    }

    pub fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.arena.get_node(node_id).map(|n| n.children()).unwrap_or(&[])
    }

    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.arena.get_node(node_id).and_then(|n| n.parent())
    }

    // Number of nodes in the tree, the root included
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    // Appends a speculative non-terminal below the insertion point
    pub fn add_non_terminal(&mut self, typ: NodeType) -> Result<NodeId, StructuralError> {
        let node = Node::new_non_terminal(typ, self.scope);
        self.insert(node)
    }

    // Appends a speculative terminal below the insertion point
    pub fn add_terminal(&mut self, typ: NodeType, token: Token) -> Result<NodeId, StructuralError> {
        let node = Node::new_terminal(typ, token, self.scope);
        self.insert(node)
    }

    // Makes node_id the insertion point
    pub fn descend(&mut self, node_id: NodeId) -> Result<(), StructuralError> {
        self.set_current(node_id)
    }

    // Moves the insertion point to its parent. The root stays where it is.
    pub fn ascend(&mut self) -> NodeId {
        if let Some(parent) = self.parent(self.current) {
            self.current = parent;
        }
        self.current
    }

    pub fn set_current(&mut self, node_id: NodeId) -> Result<(), StructuralError> {
        let node = self.arena.get_node(node_id).ok_or(StructuralError::NoSuchNode(node_id))?;
        if node.is_terminal() {
            return Err(StructuralError::TerminalHasNoChildren { node: node_id, action: "add" });
        }
        self.current = node_id;
        Ok(())
    }

    pub fn commit(&mut self, node_id: NodeId) -> Result<(), StructuralError> {
        self.arena.commit(node_id)
    }

    pub fn commit_subtree(&mut self, node_id: NodeId) -> Result<(), StructuralError> {
        self.arena.commit_subtree(node_id)
    }

    // Cuts every speculative node in the subtree of node_id from the tree and returns how many
    // nodes were freed. Committed nodes stay where they are, also below a node that was cut.
    // When the insertion point is cut off it moves up to the closest ancestor still in the tree.
    pub fn rollback(&mut self, node_id: NodeId) -> Result<usize, StructuralError> {
        let ancestors: Vec<NodeId> = std::iter::successors(Some(self.current), |id| self.parent(*id)).collect();

        let freed = self.arena.rollback(node_id)?;

        if let Some(id) = ancestors.into_iter().find(|id| self.arena.is_ancestor(self.root, *id)) {
            self.current = id;
        }
        Ok(freed)
    }

    pub fn add_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<(), StructuralError> {
        self.arena.attach_node(parent_id, child_id)
    }

    pub fn add_children(&mut self, parent_id: NodeId, children: &[NodeId]) -> Result<(), StructuralError> {
        for child_id in children {
            self.arena.attach_node(parent_id, *child_id)?;
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<(), StructuralError> {
        self.arena.remove_child(parent_id, child_id)
    }

    pub fn replace_child(&mut self, parent_id: NodeId, old_id: NodeId, new_id: NodeId) -> Result<(), StructuralError> {
        self.arena.replace_child(parent_id, old_id, new_id)
    }

    // Puts new_id in the place of old_id below the parent of old_id
    pub fn replace_with(&mut self, old_id: NodeId, new_id: NodeId) -> Result<(), StructuralError> {
        let node = self.arena.get_node(old_id).ok_or(StructuralError::NoSuchNode(old_id))?;
        let parent_id = node.parent.ok_or(StructuralError::Detached(old_id))?;
        self.arena.replace_child(parent_id, old_id, new_id)
    }

    // Closest ancestor of node_id that is of the given type or is not committed yet
    pub fn first_uncommitted_ancestor(&self, node_id: NodeId, typ: NodeType) -> Option<NodeId> {
        self.arena.first_uncommitted_ancestor(node_id, typ)
    }

    fn insert(&mut self, node: Node) -> Result<NodeId, StructuralError> {
        let id = self.arena.add_node(node);
        self.arena.attach_node(self.current, id)?;
        Ok(id)
    }

    // ------------------------------------------------------------
    // Symbols

    // Defines name in the scope of the node and binds the new symbol to the node
    pub fn create_symbol(&mut self, node_id: NodeId, name: &str) -> ParseResult<SymbolId> {
        let node = self.arena.get_node(node_id).ok_or(StructuralError::NoSuchNode(node_id))?;
        let scope = node.scope;
        let token = node.token().cloned();

        match self.symbols.add(scope, name) {
            Ok(symbol_id) => {
                if let Some(node) = self.arena.get_mut_node(node_id) {
                    node.symbol = Some(symbol_id);
                }
                Ok(symbol_id)
            }
            Err(e) => {
                let err = match &token {
                    Some(token) => self.error_at_token(token, format_args!("{}", e)),
                    None => self.errorf(format_args!("{}", e)),
                };
                Err(err.caused_by(e))
            }
        }
    }

    // Opens a block scope nested in the current one
    pub fn enter_scope(&mut self) -> ScopeId {
        let block = self.symbols.sub_scope(self.scope);
        self.push_frame(block, false);
        block
    }

    // Leaves the innermost block scope. Returns the scope that was left, or None when the
    // innermost scope is not a block scope.
    pub fn exit_scope(&mut self) -> Option<ScopeId> {
        self.pop_frame(false)
    }

    // Continues in the namespace of the symbol
    pub fn enter_namespace(&mut self, symbol_id: SymbolId) -> ScopeId {
        let symbol = self.symbols.symbol(symbol_id);
        let namespace = symbol.namespace();
        self.namespace.push(symbol.name().to_string());
        self.push_frame(namespace, true);
        namespace
    }

    // Leaves the innermost namespace and returns its name
    pub fn exit_namespace(&mut self) -> Option<String> {
        self.pop_frame(true)?;
        self.namespace.pop()
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    // Names of the entered namespaces, outermost first
    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    // Looks up name from the current scope outwards
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.symbols.by_name(self.scope, name)
    }

    // Looks up a qualified name from the current scope outwards
    pub fn lookup_qualified<S: AsRef<str>>(&self, path: &[S]) -> Option<SymbolId> {
        self.symbols.by_qualified_name(self.scope, path)
    }

    fn push_frame(&mut self, scope: ScopeId, is_namespace: bool) {
        self.frames.push(ScopeFrame { outer: self.scope, is_namespace });
        self.scope = scope;
    }

    fn pop_frame(&mut self, is_namespace: bool) -> Option<ScopeId> {
        match self.frames.last() {
            Some(frame) if frame.is_namespace == is_namespace => {
                let left = self.scope;
                self.scope = frame.outer;
                self.frames.pop();
                Some(left)
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------
    // Errors

    // Error located at the current token, if one has been read
    pub fn errorf(&self, args: fmt::Arguments<'_>) -> ParseError {
        match self.current_token() {
            Some(token) => self.error_at_token(token, args),
            None => ParseError::new(fmt::format(args)),
        }
    }

    // Error located at the token, with the token shown in its source line when the source can
    // render it
    pub fn error_at_token(&self, token: &Token, args: fmt::Arguments<'_>) -> ParseError {
        let context = self.source.as_ref().and_then(|s| s.token_in_context(token));
        ParseError::new(fmt::format(args))
            .at(Position::of(token))
            .with_context(context)
    }

    // "expected {expected}, got {got}." at the current token
    pub fn unexpected(&self, got: impl fmt::Display, expected: impl fmt::Display) -> ParseError {
        self.errorf(format_args!("expected {}, got {}.", expected, got))
    }

    // ------------------------------------------------------------
    // Printing

    pub fn pprint(&self, names: &Names) {
        println!("{}", self.spprint(names).join("\n"));
    }

    // The tree in preorder, one node per line, indented by two spaces per level
    pub fn spprint(&self, names: &Names) -> Vec<String> {
        self.arena.spprint(self.root, names, 0)
    }
}
