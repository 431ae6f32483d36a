use std::io;

use serde::{
    ser::{Error, SerializeSeq, SerializeStruct},
    Serialize, Serializer,
};
use serde_json::ser::Formatter;

use super::registry::{NodeId, NodeRegistry};
use super::{ExecutionTree, MAX_VALUE_DEPTH};
use crate::error::Result;

// Ephemeral helpers that pair a NodeId with its registry so that the nested
// `{ name, children }` structure can be emitted straight from the registry
// without first materializing an owned tree.  Serde recurses once per level,
// so this path is only taken for trees no deeper than MAX_VALUE_DEPTH; files
// are written by `write_tree` below.
struct SerializingTreeNode<'a> {
    registry: &'a NodeRegistry,
    node_id: NodeId,
}

struct SerializingTreeChildren<'a> {
    registry: &'a NodeRegistry,
    children: &'a [NodeId],
}

/// A tree serializes as its root node.  Nodes reachable through more than one
/// parent are written out once per parent.
impl Serialize for ExecutionTree {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.depth > MAX_VALUE_DEPTH {
            return Err(S::Error::custom(format!(
                "tree is {} levels deep, serde output is limited to {}",
                self.depth, MAX_VALUE_DEPTH
            )));
        }
        SerializingTreeNode {
            registry: &self.registry,
            node_id: self.root,
        }
        .serialize(serializer)
    }
}

impl<'a> Serialize for SerializingTreeNode<'a> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let node = self.registry.get(self.node_id);
        let mut st = serializer.serialize_struct("TreeNode", 2)?;
        st.serialize_field("name", &node.name)?;
        st.serialize_field(
            "children",
            &SerializingTreeChildren {
                registry: self.registry,
                children: &node.children,
            },
        )?;
        st.end()
    }
}

impl<'a> Serialize for SerializingTreeChildren<'a> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.children.len()))?;
        for child in self.children {
            seq.serialize_element(&SerializingTreeNode {
                registry: self.registry,
                node_id: *child,
            })?;
        }
        seq.end()
    }
}

/// Emit `{"name":...,"children":[` for `node_id` and hand back the children
/// that still have to go inside the open array.
fn open_node<'a, W, F>(
    registry: &'a NodeRegistry,
    node_id: NodeId,
    writer: &mut W,
    formatter: &mut F,
) -> Result<&'a [NodeId]>
where
    W: io::Write,
    F: Formatter,
{
    let node = registry.get(node_id);
    formatter.begin_object(writer)?;

    formatter.begin_object_key(writer, true)?;
    serde_json::to_writer(&mut *writer, "name")?;
    formatter.end_object_key(writer)?;
    formatter.begin_object_value(writer)?;
    serde_json::to_writer(&mut *writer, &node.name)?;
    formatter.end_object_value(writer)?;

    formatter.begin_object_key(writer, false)?;
    serde_json::to_writer(&mut *writer, "children")?;
    formatter.end_object_key(writer)?;
    formatter.begin_object_value(writer)?;
    formatter.begin_array(writer)?;

    Ok(&node.children)
}

/// Write the tree through `formatter` without recursing, keeping one frame
/// per open `children` array.  Makes exactly the formatter calls the serde
/// path makes, so the bytes match for any tree both can handle.
pub fn write_tree<W, F>(tree: &ExecutionTree, mut writer: W, formatter: &mut F) -> Result<()>
where
    W: io::Write,
    F: Formatter,
{
    let registry = &tree.registry;
    let root_children = open_node(registry, tree.root, &mut writer, formatter)?;
    let mut stack = vec![(root_children, 0usize)];

    loop {
        let (children, next_child) = match stack.last_mut() {
            Some(top) => {
                let current = *top;
                top.1 += 1;
                current
            }
            None => break,
        };

        if next_child < children.len() {
            formatter.begin_array_value(&mut writer, next_child == 0)?;
            let grandchildren = open_node(registry, children[next_child], &mut writer, formatter)?;
            stack.push((grandchildren, 0));
            continue;
        }

        stack.pop();
        formatter.end_array(&mut writer)?;
        formatter.end_object_value(&mut writer)?;
        formatter.end_object(&mut writer)?;
        if !stack.is_empty() {
            formatter.end_array_value(&mut writer)?;
        }
    }

    Ok(())
}
