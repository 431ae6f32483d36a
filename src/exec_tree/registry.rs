use std::collections::HashMap;

/// Wrapped u32 identifier for `TreeNode`s in a `NodeRegistry` for type safety.
/// The value is the index of the node in the registry's `nodes` vec, which
/// also makes it the node's discovery order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named execution-tree node.  Children are ids into the owning registry so
/// a node can be listed under several parents without being copied.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub name: String,
    pub children: Vec<NodeId>,
}

/// Owns every node created while building one tree, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<TreeNode>,
    name_to_index: HashMap<String, u32>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        NodeRegistry {
            nodes: vec![],
            name_to_index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node_id: NodeId) -> &TreeNode {
        // Only the registry mints NodeIds, so the entry always exists.
        &self.nodes[node_id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<(NodeId, &TreeNode)> {
        let index = *self.name_to_index.get(name)?;
        self.nodes
            .get(index as usize)
            .map(|node| (NodeId(index), node))
    }

    /// Return the id of the node called `name`, creating a childless node on
    /// first reference.
    pub fn ensure_node(&mut self, name: &str) -> NodeId {
        if let Some(index) = self.name_to_index.get(name) {
            return NodeId(*index);
        }

        let index = self.nodes.len() as u32;
        self.nodes.push(TreeNode {
            name: name.to_string(),
            children: vec![],
        });
        self.name_to_index.insert(name.to_string(), index);
        NodeId(index)
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.push(child);
    }

    /// Nodes in insertion (discovery) order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index as u32), node))
    }

    pub fn child_names(&self, node_id: NodeId) -> Vec<&str> {
        self.get(node_id)
            .children
            .iter()
            .map(|child| self.get(*child).name.as_str())
            .collect()
    }
}
