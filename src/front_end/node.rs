use derive_more::{Display, From};

use crate::front_end::names::Names;
use crate::front_end::symbol::{ScopeId, SymbolId};
use crate::front_end::token::Token;

// Index of a node in the arena of its tree
pub type NodeId = usize;

// Tag identifying the kind of node. Negative tags are reserved for the tree itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Display)]
#[display(fmt = "NodeType({})", _0)]
pub struct NodeType(pub i32);

impl NodeType {
    pub const ROOT: NodeType = NodeType(-1);    // Sentinel root of every tree
}

// Whether a node may still be removed by a rollback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Speculative,
    FullyParsed,
}

pub enum NodeData {
    Terminal { token: Token },
    NonTerminal { children: Vec<NodeId> },
}

pub struct Node {
    pub(crate) id: NodeId,                 // ID of the node, the root of a tree is always 0
    pub(crate) typ: NodeType,              // Type of the node, as defined by the grammar
    pub(crate) parent: Option<NodeId>,     // parent of the node, if any
    pub(crate) scope: ScopeId,             // Scope that was active when the node was created
    pub(crate) symbol: Option<SymbolId>,   // Symbol bound to this node, if any
    pub(crate) status: ParseStatus,        // Speculative until committed
    pub(crate) data: NodeData,             // Token or children
}

impl Node {
    pub fn new_non_terminal(typ: NodeType, scope: ScopeId) -> Self {
        Node {
            id: 0,
            typ,
            parent: None,
            scope,
            symbol: None,
            status: ParseStatus::Speculative,
            data: NodeData::NonTerminal { children: vec![] },
        }
    }

    pub fn new_terminal(typ: NodeType, token: Token, scope: ScopeId) -> Self {
        Node {
            id: 0,
            typ,
            parent: None,
            scope,
            symbol: None,
            status: ParseStatus::Speculative,
            data: NodeData::Terminal { token },
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn typ(&self) -> NodeType {
        self.typ
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn symbol(&self) -> Option<SymbolId> {
        self.symbol
    }

    pub fn status(&self) -> ParseStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.data, NodeData::Terminal { .. })
    }

    pub fn is_committed(&self) -> bool {
        self.status == ParseStatus::FullyParsed
    }

    // Token of a terminal node
    pub fn token(&self) -> Option<&Token> {
        match &self.data {
            NodeData::Terminal { token } => Some(token),
            NodeData::NonTerminal { .. } => None,
        }
    }

    // Children of the node. Terminals have none.
    pub fn children(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Terminal { .. } => &[],
            NodeData::NonTerminal { children } => children,
        }
    }

    // One line description, e.g. "Number: NUM("12")" for a terminal or "Expr" for a non-terminal
    pub fn describe(&self, names: &Names) -> String {
        match &self.data {
            NodeData::Terminal { token } => format!("{}: {}", names.node_name(self.typ), names.token(token)),
            NodeData::NonTerminal { .. } => names.node_name(self.typ).into_owned(),
        }
    }
}
