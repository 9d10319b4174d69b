use crate::front_end::error::FixtureError;
use crate::front_end::names::Names;
use crate::front_end::node::{Node, NodeId};
use crate::front_end::parser::Tree;
use crate::front_end::symbol::ScopeId;
use crate::front_end::token::Token;

// One node in a tree fixture. A node with a token is a terminal.
#[derive(Deserialize)]
struct NodeFixture {
    node: String,
    token: Option<String>,
    #[serde(default)]
    lexeme: String,
    #[serde(default)]
    children: Vec<NodeFixture>,
}

// Builds a tree from fixture text, e.g.
//
//   {"node": "Expr", "children": [{"node": "Number", "token": "NUM", "lexeme": "12"}]}
//
// Node and token names are resolved through names. The fixture node becomes the only child
// of the root and every loaded node is committed.
pub fn load_tree(names: &Names, text: &str) -> Result<Tree, FixtureError> {
    let fixture: NodeFixture = serde_json::from_str(text)?;

    let mut tree = Tree::new("fixture");
    let scope = tree.scope();
    let top = build_node(&mut tree, names, fixture, scope)?;
    tree.arena.attach_node(tree.root, top)?;
    tree.arena.commit_subtree(top)?;
    Ok(tree)
}

fn build_node(tree: &mut Tree, names: &Names, fixture: NodeFixture, scope: ScopeId) -> Result<NodeId, FixtureError> {
    let typ = names
        .node_type(&fixture.node)
        .ok_or_else(|| FixtureError::UnknownNodeType(fixture.node.clone()))?;

    let node = match fixture.token {
        Some(token_name) => {
            let token_type = names
                .token_type(&token_name)
                .ok_or(FixtureError::UnknownTokenType(token_name))?;
            Node::new_terminal(typ, Token::debug(token_type, fixture.lexeme), scope)
        }
        None => Node::new_non_terminal(typ, scope),
    };

    let id = tree.arena.add_node(node);
    for child in fixture.children {
        let child_id = build_node(tree, names, child, scope)?;
        tree.arena.attach_node(id, child_id)?;
    }
    Ok(id)
}
