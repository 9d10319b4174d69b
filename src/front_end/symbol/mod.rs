pub mod fixture;
mod pretty_print;

use std::collections::{BTreeMap, HashMap};

use derive_more::Display;
use serde_json::Value;
use tracing::debug;

use crate::front_end::error::SymbolError;

// Index of a scope in its symbol table. The root scope of a table is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Display)]
#[display(fmt = "scope#{}", _0)]
pub struct ScopeId(usize);

// Index of a symbol in its symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "symbol#{}", _0)]
pub struct SymbolId(usize);

// A named definition. Every symbol owns a namespace scope for the names defined inside it.
#[derive(Debug)]
pub struct Symbol {
    id: SymbolId,
    name: String,
    pub attributes: BTreeMap<String, Value>,   // Free form data attached by the grammar
    local_id: usize,                            // Unique within the defining scope
    global_id: Option<usize>,                   // Unique within the table, after resolve_global_ids()
    scope: ScopeId,                             // Scope the symbol is defined in
    namespace: ScopeId,                         // Scope owned by the symbol
}

impl Symbol {
    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_id(&self) -> usize {
        self.local_id
    }

    pub fn global_id(&self) -> Option<usize> {
        self.global_id
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn namespace(&self) -> ScopeId {
        self.namespace
    }
}

#[derive(Debug)]
pub struct Scope {
    id: ScopeId,
    parent: Option<ScopeId>,                // Enclosing scope, None for the root
    children: Vec<ScopeId>,                 // Sub scopes in creation order
    owner: Option<SymbolId>,                // Symbol whose namespace this is, None for block scopes
    by_name: HashMap<String, SymbolId>,
    by_local_id: Vec<SymbolId>,             // Indexed by local id
    by_global_id: HashMap<usize, SymbolId>,
}

impl Scope {
    fn new(id: ScopeId, parent: Option<ScopeId>) -> Self {
        Scope {
            id,
            parent,
            children: vec![],
            owner: None,
            by_name: HashMap::new(),
            by_local_id: vec![],
            by_global_id: HashMap::new(),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    pub fn owner(&self) -> Option<SymbolId> {
        self.owner
    }

    // Symbols defined in this scope, in local id order
    pub fn symbols(&self) -> &[SymbolId] {
        &self.by_local_id
    }

    pub fn len(&self) -> usize {
        self.by_local_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_local_id.is_empty()
    }
}

/// Hierarchical symbol table. Scopes and symbols live in the table and refer to each other by
/// id; every operation names the scope it works on.
///
/// ```
/// use frontkit::front_end::symbol::SymbolTable;
///
/// let mut table = SymbolTable::new();
/// let root = table.root();
/// let foo = table.add(root, "Foo").unwrap();
/// let ns = table.symbol(foo).namespace();
/// table.add(ns, "bar").unwrap();
///
/// assert!(table.by_qualified_name(root, &["Foo", "bar"]).is_some());
/// assert!(table.by_qualified_name(root, &["Foo", "baz"]).is_none());
/// ```
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    // Creates a table with an empty root scope
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope::new(ScopeId(0), None)],
            symbols: vec![],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    // Total number of symbols in the table
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    // Number of symbols defined directly in the scope
    pub fn num_symbols(&self, scope: ScopeId) -> usize {
        self.scope(scope).len()
    }

    // Defines name in the scope. Fails when the name is already defined in this very scope;
    // definitions in enclosing scopes are shadowed. The new symbol gets the next local id of
    // the scope and a fresh, empty namespace.
    pub fn add(&mut self, scope: ScopeId, name: &str) -> Result<SymbolId, SymbolError> {
        if self.scope(scope).by_name.contains_key(name) {
            debug!(%scope, name, "duplicate symbol");
            return Err(SymbolError::Duplicate { name: name.to_string() });
        }

        let id = SymbolId(self.symbols.len());
        let namespace = self.sub_scope(scope);
        self.scopes[namespace.0].owner = Some(id);

        let local_id = self.scope(scope).len();
        self.symbols.push(Symbol {
            id,
            name: name.to_string(),
            attributes: BTreeMap::new(),
            local_id,
            global_id: None,
            scope,
            namespace,
        });

        let s = &mut self.scopes[scope.0];
        s.by_name.insert(name.to_string(), id);
        s.by_local_id.push(id);
        Ok(id)
    }

    // Creates a new scope nested in the given one
    pub fn sub_scope(&mut self, scope: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(id, Some(scope)));
        self.scopes[scope.0].children.push(id);
        id
    }

    // Looks up name in the scope, then in its enclosing scopes
    pub fn by_name(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scope_chain(scope)
            .find_map(|s| self.scope(s).by_name.get(name).copied())
    }

    // Looks up a local id in this scope only
    pub fn by_local_id(&self, scope: ScopeId, local_id: usize) -> Option<SymbolId> {
        self.scope(scope).by_local_id.get(local_id).copied()
    }

    // Looks up a global id in the scope, then in its enclosing scopes
    pub fn by_global_id(&self, scope: ScopeId, global_id: usize) -> Option<SymbolId> {
        self.scope_chain(scope)
            .find_map(|s| self.scope(s).by_global_id.get(&global_id).copied())
    }

    // Resolves a path like ["A", "B"]: A in the scope, then B in the namespace of A. When the
    // path doesn't resolve, the whole path is tried again from the enclosing scope.
    pub fn by_qualified_name<S: AsRef<str>>(&self, scope: ScopeId, path: &[S]) -> Option<SymbolId> {
        if path.is_empty() {
            return None;
        }
        self.scope_chain(scope)
            .find_map(|s| self.resolve_path(s, path))
    }

    // Hands out global ids in preorder, starting at 0 in the root scope. Within a scope the
    // symbols are visited in local id order and each symbol's namespace is numbered right after
    // the symbol itself; block scopes follow after the symbols of their scope. Returns the
    // number of ids handed out.
    pub fn resolve_global_ids(&mut self) -> usize {
        for scope in self.scopes.iter_mut() {
            scope.by_global_id.clear();
        }

        let mut next = 0;
        self.assign_global_ids(self.root(), &mut next);

        debug!(symbols = next, "resolved global ids");
        next
    }

    pub fn set_attribute(&mut self, symbol: SymbolId, key: &str, value: Value) {
        self.symbol_mut(symbol).attributes.insert(key.to_string(), value);
    }

    pub fn attribute(&self, symbol: SymbolId, key: &str) -> Option<&Value> {
        self.symbol(symbol).attributes.get(key)
    }

    // The scope followed by all its enclosing scopes
    fn scope_chain(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |s| self.scope(*s).parent)
    }

    // Resolves the path starting in exactly this scope, descending through namespaces
    fn resolve_path<S: AsRef<str>>(&self, scope: ScopeId, path: &[S]) -> Option<SymbolId> {
        let mut current = scope;
        let mut found = None;
        for name in path {
            let id = *self.scope(current).by_name.get(name.as_ref())?;
            current = self.symbol(id).namespace;
            found = Some(id);
        }
        found
    }

    fn assign_global_ids(&mut self, scope: ScopeId, next: &mut usize) {
        for symbol_id in self.scope(scope).by_local_id.clone() {
            let global_id = *next;
            *next += 1;

            self.symbols[symbol_id.0].global_id = Some(global_id);
            self.scopes[scope.0].by_global_id.insert(global_id, symbol_id);

            let namespace = self.symbol(symbol_id).namespace;
            self.assign_global_ids(namespace, next);
        }

        let blocks: Vec<ScopeId> = self
            .scope(scope)
            .children
            .iter()
            .copied()
            .filter(|child| self.scope(*child).owner.is_none())
            .collect();
        for block in blocks {
            self.assign_global_ids(block, next);
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
