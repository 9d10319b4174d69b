use std::collections::HashMap;

use tracing::trace;

use crate::front_end::error::StructuralError;
use crate::front_end::names::Names;
use crate::front_end::node::{Node, NodeData, NodeId, NodeType, ParseStatus};

// Arena holding the node graph of a tree. Nodes refer to their parent and children by id, so
// the graph contains no owning cycles. Removing a node frees its slot; ids are never reused.
pub struct NodeArena {
    nodes: HashMap<NodeId, Node>,       // Current nodes
    next_id: NodeId,                    // next id to use
}

impl NodeArena {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub fn get_mut_node(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    // Adds a detached node to the arena and returns its id
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;

        node.id = id;
        node.parent = None;
        self.nodes.insert(id, node);
        id
    }

    // Appends node_id to the children of parent_id. A node that already has a parent is
    // detached from it first.
    pub fn attach_node(&mut self, parent_id: NodeId, node_id: NodeId) -> Result<(), StructuralError> {
        self.check_can_attach(parent_id, node_id)?;
        self.detach_node(node_id);

        self.children_mut(parent_id, "add")?.push(node_id);
        self.node_mut(node_id)?.parent = Some(parent_id);
        Ok(())
    }

    // Detaches child_id from parent_id. The child stays in the arena and can be attached again.
    pub fn remove_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<(), StructuralError> {
        let children = self.children_mut(parent_id, "remove")?;
        let idx = children
            .iter()
            .position(|&id| id == child_id)
            .ok_or(StructuralError::NotAChild { parent: parent_id, child: child_id })?;
        children.remove(idx);

        self.node_mut(child_id)?.parent = None;
        Ok(())
    }

    // Puts new_id in the place of old_id among the children of parent_id. The old node is
    // detached, the new one is detached from its own parent first.
    pub fn replace_child(&mut self, parent_id: NodeId, old_id: NodeId, new_id: NodeId) -> Result<(), StructuralError> {
        if old_id == new_id {
            return match self.node(old_id)?.parent {
                Some(p) if p == parent_id => Ok(()),
                _ => Err(StructuralError::NotAChild { parent: parent_id, child: old_id }),
            };
        }

        self.check_can_attach(parent_id, new_id)?;
        if !self.node(parent_id)?.children().contains(&old_id) {
            return Err(StructuralError::NotAChild { parent: parent_id, child: old_id });
        }

        self.detach_node(new_id);

        let children = self.children_mut(parent_id, "replace")?;
        if let Some(slot) = children.iter_mut().find(|id| **id == old_id) {
            *slot = new_id;
        }

        self.node_mut(new_id)?.parent = Some(parent_id);
        self.node_mut(old_id)?.parent = None;
        Ok(())
    }

    // Marks the node as fully parsed
    pub fn commit(&mut self, node_id: NodeId) -> Result<(), StructuralError> {
        self.node_mut(node_id)?.status = ParseStatus::FullyParsed;
        Ok(())
    }

    // Marks the node and all its descendants as fully parsed
    pub fn commit_subtree(&mut self, node_id: NodeId) -> Result<(), StructuralError> {
        let mut stack = vec![node_id];
        while let Some(id) = stack.pop() {
            let node = self.node_mut(id)?;
            node.status = ParseStatus::FullyParsed;
            stack.extend(node.children().iter().copied());
        }
        Ok(())
    }

    // Cuts every speculative node in the subtree of node_id from its parent. Committed nodes
    // keep their parent and their place among its children, also below a speculative node
    // that is cut. A cut node is freed when it has no children left.
    // Returns the number of nodes that were freed.
    pub fn rollback(&mut self, node_id: NodeId) -> Result<usize, StructuralError> {
        let node = self.node(node_id)?;
        let speculative = node.status == ParseStatus::Speculative;

        let mut freed = 0;
        for child_id in node.children().to_vec() {
            freed += self.rollback(child_id)?;
        }

        if speculative {
            self.detach_node(node_id);
            if self.node(node_id)?.children().is_empty() {
                self.nodes.remove(&node_id);
                freed += 1;
            }
            trace!(node = node_id, freed, "rolled back");
        }
        Ok(freed)
    }

    // Walks up from node_id and returns the first ancestor that is of the given type or is
    // still speculative
    pub fn first_uncommitted_ancestor(&self, node_id: NodeId, typ: NodeType) -> Option<NodeId> {
        let mut current = self.nodes.get(&node_id)?.parent;
        while let Some(id) = current {
            let node = self.nodes.get(&id)?;
            if node.typ == typ || node.status == ParseStatus::Speculative {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    // Returns true when ancestor_id is node_id or one of its ancestors
    pub fn is_ancestor(&self, ancestor_id: NodeId, node_id: NodeId) -> bool {
        let mut current = Some(node_id);
        while let Some(id) = current {
            if id == ancestor_id {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    // Pretty prints the subtree in preorder, two spaces of indent per level
    pub fn spprint(&self, node_id: NodeId, names: &Names, indent: usize) -> Vec<String> {
        let mut lines = vec![];
        let mut stack = vec![(node_id, indent)];
        while let Some((id, depth)) = stack.pop() {
            let node = match self.nodes.get(&id) {
                Some(node) => node,
                None => continue,
            };
            lines.push(format!("{}{}", "  ".repeat(depth), node.describe(names)));
            for child_id in node.children().iter().rev() {
                stack.push((*child_id, depth + 1));
            }
        }
        lines
    }

    fn node(&self, node_id: NodeId) -> Result<&Node, StructuralError> {
        self.nodes.get(&node_id).ok_or(StructuralError::NoSuchNode(node_id))
    }

    fn node_mut(&mut self, node_id: NodeId) -> Result<&mut Node, StructuralError> {
        self.nodes.get_mut(&node_id).ok_or(StructuralError::NoSuchNode(node_id))
    }

    fn children_mut(&mut self, node_id: NodeId, action: &'static str) -> Result<&mut Vec<NodeId>, StructuralError> {
        match &mut self.node_mut(node_id)?.data {
            NodeData::NonTerminal { children } => Ok(children),
            NodeData::Terminal { .. } => Err(StructuralError::TerminalHasNoChildren { node: node_id, action }),
        }
    }

    fn check_can_attach(&self, parent_id: NodeId, node_id: NodeId) -> Result<(), StructuralError> {
        if self.node(parent_id)?.is_terminal() {
            return Err(StructuralError::TerminalHasNoChildren { node: parent_id, action: "add" });
        }
        self.node(node_id)?;
        if self.is_ancestor(node_id, parent_id) {
            return Err(StructuralError::WouldCreateCycle { parent: parent_id, node: node_id });
        }
        Ok(())
    }

    fn detach_node(&mut self, node_id: NodeId) {
        let parent_id = match self.nodes.get(&node_id).and_then(|n| n.parent) {
            Some(p) => p,
            None => return,
        };
        if let Some(NodeData::NonTerminal { children }) = self.nodes.get_mut(&parent_id).map(|p| &mut p.data) {
            children.retain(|&id| id != node_id);
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.parent = None;
        }
    }
}
