/*!
Execution-tree reconstruction from a `tree-dot` dump.

The tree-export utility describes the execution tree one statement per node:

```text
N0x5601->{N0x5602 N0x5603}
N0x5602->{N0x5604}
N0x5603->{}
```

Building happens in one pass over the parsed `EdgeRecord`s:

- Every name mentioned (as parent or child) gets exactly one `TreeNode` in a
  `NodeRegistry`, created on first mention.
- Children are appended to their parent in line order; a parent that shows up
  on several lines accumulates the children of all of them.
- The root is the node no statement lists as a child.  If there is none (the
  dump is empty or every node sits on a cycle) we fail with `NoRoot`.  If there
  are several, `RootPolicy` decides between taking the first one discovered
  and failing with `AmbiguousRoot`.
- Repeated children are kept as repeated edges, so a node reachable through
  two parents is serialized twice.  A cycle below the root would make the
  nested output infinite and is rejected with `Cycle` before we ever get to
  serialization.
- Output is written by an explicit-stack walk, so a chain of any length can
  be written to a file.  Only `to_json`, which goes through serde and builds a
  `serde_json::Value`, is capped at `MAX_VALUE_DEPTH` levels.
*/

use std::collections::HashSet;
use std::path::Path;

use itertools::Itertools;
use serde_json::ser::CompactFormatter;
use serde_json::Value;

use crate::error::{KvizError, Result};
use crate::file_utils::write_file_ensuring_parent_dir;
use crate::json_format::{output_to_string, IndentedFormatter};

pub mod edge;
mod registry;
mod serialize;

pub use edge::{parse_edge_line, parse_edges, EdgeRecord, ARROW};
pub use registry::{NodeId, NodeRegistry, TreeNode};
pub use serialize::write_tree;

/// Deepest tree `to_json` and the `Serialize` impl accept.  Both recurse once
/// per level, and so does dropping the resulting `Value`.
pub const MAX_VALUE_DEPTH: usize = 256;

/// What to do when more than one node is never listed as a child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RootPolicy {
    /// Use the root candidate discovered first and log the others.
    #[default]
    FirstFound,
    /// Refuse to pick and return `KvizError::AmbiguousRoot`.
    Strict,
}

/// A fully linked tree: the registry that owns the nodes plus the root.
#[derive(Clone, Debug)]
pub struct ExecutionTree {
    registry: NodeRegistry,
    root: NodeId,
    /// Number of nodes on the longest path down from the root.
    depth: usize,
}

/// All nodes that never appear in any node's child list, in discovery order.
pub fn find_roots(registry: &NodeRegistry) -> Vec<NodeId> {
    let mut listed = HashSet::new();
    for (_, node) in registry.iter() {
        listed.extend(node.children.iter().copied());
    }
    registry
        .iter()
        .map(|(node_id, _)| node_id)
        .filter(|node_id| !listed.contains(node_id))
        .collect()
}

#[derive(Clone, Copy, PartialEq)]
enum VisitMark {
    Unvisited,
    OnPath,
    Done,
}

/// Iterative depth-first walk from `root` that fails on the first node found
/// to be its own ancestor.  Nodes shared between subtrees are walked once.
/// Returns the height of the tree, counted in nodes.
fn check_acyclic(registry: &NodeRegistry, root: NodeId) -> Result<usize> {
    let mut marks = vec![VisitMark::Unvisited; registry.len()];
    let mut heights = vec![0usize; registry.len()];
    let mut stack = vec![(root, 0usize)];
    marks[root.index()] = VisitMark::OnPath;

    loop {
        let (node_id, next_child) = match stack.last_mut() {
            Some(top) => {
                let current = *top;
                top.1 += 1;
                current
            }
            None => break,
        };

        let children = &registry.get(node_id).children;
        if next_child >= children.len() {
            // Every child is Done by now, so its height is final.
            heights[node_id.index()] = 1 + children
                .iter()
                .map(|child| heights[child.index()])
                .max()
                .unwrap_or(0);
            marks[node_id.index()] = VisitMark::Done;
            stack.pop();
            continue;
        }

        let child = children[next_child];
        match marks[child.index()] {
            VisitMark::OnPath => {
                return Err(KvizError::Cycle {
                    name: registry.get(child).name.clone(),
                });
            }
            VisitMark::Done => {}
            VisitMark::Unvisited => {
                marks[child.index()] = VisitMark::OnPath;
                stack.push((child, 0));
            }
        }
    }

    Ok(heights[root.index()])
}

impl ExecutionTree {
    pub fn build(edges: &[EdgeRecord], policy: RootPolicy) -> Result<ExecutionTree> {
        let mut registry = NodeRegistry::new();
        for edge in edges {
            let parent = registry.ensure_node(&edge.parent);
            for child in &edge.children {
                let child = registry.ensure_node(child);
                registry.add_child(parent, child);
            }
        }

        let roots = find_roots(&registry);
        let root = match roots.as_slice() {
            [] => return Err(KvizError::NoRoot),
            [root] => *root,
            [root, ..] => {
                let names: Vec<String> = roots
                    .iter()
                    .map(|node_id| registry.get(*node_id).name.clone())
                    .collect();
                if policy == RootPolicy::Strict {
                    return Err(KvizError::AmbiguousRoot { roots: names });
                }
                warn!(
                    root = %names[0],
                    others = %names[1..].iter().join(", "),
                    "several nodes are never listed as a child; using the first"
                );
                *root
            }
        };

        let depth = check_acyclic(&registry, root)?;

        info!(
            nodes = registry.len(),
            edges = edges.len(),
            depth,
            root = %registry.get(root).name,
            "built execution tree"
        );
        Ok(ExecutionTree {
            registry,
            root,
            depth,
        })
    }

    /// Parse a raw `tree-dot` dump and build its tree.
    pub fn build_from_dump(dump: &str, policy: RootPolicy) -> Result<ExecutionTree> {
        let edges = parse_edges(dump);
        debug!(edges = edges.len(), "parsed tree dump");
        ExecutionTree::build(&edges, policy)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &TreeNode {
        self.registry.get(self.root)
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn node(&self, name: &str) -> Option<&TreeNode> {
        self.registry.lookup(name).map(|(_, node)| node)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn to_json(&self) -> Result<Value> {
        if self.depth > MAX_VALUE_DEPTH {
            return Err(KvizError::TooDeep {
                depth: self.depth,
                limit: MAX_VALUE_DEPTH,
            });
        }
        Ok(serde_json::to_value(self)?)
    }

    /// The `tree.json` layout.
    pub fn to_pretty_string(&self) -> Result<String> {
        let mut buf = Vec::with_capacity(128);
        write_tree(self, &mut buf, &mut IndentedFormatter::new())?;
        output_to_string(buf)
    }

    pub fn to_compact_string(&self) -> Result<String> {
        let mut buf = Vec::with_capacity(128);
        write_tree(self, &mut buf, &mut CompactFormatter)?;
        output_to_string(buf)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_file_ensuring_parent_dir(path, &self.to_pretty_string()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_format::to_string_indented;
    use serde_json::json;

    fn lines_to_dump(lines: &[&str]) -> String {
        lines.join("\n")
    }

    fn children_of<'a>(tree: &'a ExecutionTree, name: &str) -> Vec<&'a str> {
        let (node_id, _) = tree.registry().lookup(name).unwrap();
        tree.registry().child_names(node_id)
    }

    #[test]
    fn test_basic_tree() {
        let dump = lines_to_dump(&["a->{b c}", "b->{d}", "noise", "c->{}"]);
        let tree = ExecutionTree::build_from_dump(&dump, RootPolicy::Strict).unwrap();

        let names: Vec<&str> = tree
            .registry()
            .iter()
            .map(|(_, node)| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(children_of(&tree, "a"), vec!["b", "c"]);
        assert_eq!(children_of(&tree, "b"), vec!["d"]);
        assert!(children_of(&tree, "c").is_empty());
        assert!(children_of(&tree, "d").is_empty());
        assert_eq!(tree.root_node().name, "a");
        assert!(tree.node("noise").is_none());
    }

    #[test]
    fn test_cycle_has_no_root() {
        let dump = lines_to_dump(&["x->{y}", "y->{x}"]);
        match ExecutionTree::build_from_dump(&dump, RootPolicy::FirstFound) {
            Err(KvizError::NoRoot) => {}
            other => panic!("expected NoRoot, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_dump_has_no_root() {
        match ExecutionTree::build_from_dump("digraph {\n}\n", RootPolicy::FirstFound) {
            Err(KvizError::NoRoot) => {}
            other => panic!("expected NoRoot, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_below_root() {
        let dump = lines_to_dump(&["r->{a}", "a->{b}", "b->{a}"]);
        match ExecutionTree::build_from_dump(&dump, RootPolicy::FirstFound) {
            Err(KvizError::Cycle { name }) => assert_eq!(name, "a"),
            other => panic!("expected Cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_recurring_parent_accumulates() {
        let dump = lines_to_dump(&["a->{b}", "b->{}", "a->{c}"]);
        let tree = ExecutionTree::build_from_dump(&dump, RootPolicy::Strict).unwrap();
        assert_eq!(children_of(&tree, "a"), vec!["b", "c"]);
    }

    #[test]
    fn test_multiple_roots() {
        let dump = lines_to_dump(&["a->{b}", "z->{c}"]);
        let tree = ExecutionTree::build_from_dump(&dump, RootPolicy::FirstFound).unwrap();
        assert_eq!(tree.root_node().name, "a");

        match ExecutionTree::build_from_dump(&dump, RootPolicy::Strict) {
            Err(KvizError::AmbiguousRoot { roots }) => assert_eq!(roots, vec!["a", "z"]),
            other => panic!("expected AmbiguousRoot, got {:?}", other),
        }
    }

    #[test]
    fn test_diamond_is_duplicated() {
        let dump = lines_to_dump(&["a->{b c}", "b->{d}", "c->{d}"]);
        let tree = ExecutionTree::build_from_dump(&dump, RootPolicy::Strict).unwrap();
        assert_eq!(
            tree.to_json().unwrap(),
            json!({
                "name": "a",
                "children": [
                    { "name": "b", "children": [{ "name": "d", "children": [] }] },
                    { "name": "c", "children": [{ "name": "d", "children": [] }] },
                ]
            })
        );
    }

    #[test]
    fn test_serialization_is_stable() {
        let dump = lines_to_dump(&["a->{b c}", "b->{d}", "c->{}"]);
        let tree = ExecutionTree::build_from_dump(&dump, RootPolicy::Strict).unwrap();
        let first = tree.to_pretty_string().unwrap();
        let second = tree.to_pretty_string().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reordered_edges_same_tree() {
        let forward = lines_to_dump(&["a->{b c}", "b->{d e}", "c->{f}"]);
        let shuffled = lines_to_dump(&["c->{f}", "b->{d e}", "a->{b c}"]);
        let forward = ExecutionTree::build_from_dump(&forward, RootPolicy::Strict).unwrap();
        let shuffled = ExecutionTree::build_from_dump(&shuffled, RootPolicy::Strict).unwrap();
        assert_eq!(forward.to_json().unwrap(), shuffled.to_json().unwrap());
        assert_eq!(
            forward.to_pretty_string().unwrap(),
            shuffled.to_pretty_string().unwrap()
        );
    }

    #[test]
    fn test_find_roots_order() {
        let mut registry = NodeRegistry::new();
        let b = registry.ensure_node("b");
        let a = registry.ensure_node("a");
        let c = registry.ensure_node("c");
        registry.add_child(a, c);
        assert_eq!(find_roots(&registry), vec![b, a]);
    }

    fn chain(len: usize) -> Vec<EdgeRecord> {
        (0..len)
            .map(|i| EdgeRecord {
                parent: format!("N{}", i),
                children: vec![format!("N{}", i + 1)],
            })
            .collect()
    }

    #[test]
    fn test_depth() {
        let dump = lines_to_dump(&["a->{b c}", "b->{d}", "c->{}"]);
        let tree = ExecutionTree::build_from_dump(&dump, RootPolicy::Strict).unwrap();
        assert_eq!(tree.depth(), 3);
        let single = ExecutionTree::build_from_dump("a->{}", RootPolicy::Strict).unwrap();
        assert_eq!(single.depth(), 1);
    }

    #[test]
    fn test_deep_chain_is_written_without_recursion() {
        let tree = ExecutionTree::build(&chain(50_000), RootPolicy::Strict).unwrap();
        assert_eq!(tree.depth(), 50_001);

        let compact = tree.to_compact_string().unwrap();
        assert!(compact.starts_with(r#"{"name":"N0","children":[{"name":"N1","children":[{"#));
        let tail = format!(
            "{}{}",
            r#"{"name":"N50000","children":[]}"#,
            "]}".repeat(50_000)
        );
        assert!(compact.ends_with(&tail));
        assert_eq!(compact.matches(r#""name":"#).count(), 50_001);
    }

    #[test]
    fn test_deep_chain_refuses_json_value() {
        let tree = ExecutionTree::build(&chain(MAX_VALUE_DEPTH), RootPolicy::Strict).unwrap();
        match tree.to_json() {
            Err(KvizError::TooDeep { depth, limit }) => {
                assert_eq!(depth, MAX_VALUE_DEPTH + 1);
                assert_eq!(limit, MAX_VALUE_DEPTH);
            }
            other => panic!("expected TooDeep, got {:?}", other),
        }
        assert!(serde_json::to_string(&tree).is_err());

        let tree = ExecutionTree::build(&chain(MAX_VALUE_DEPTH - 1), RootPolicy::Strict).unwrap();
        assert!(tree.to_json().is_ok());
    }

    #[test]
    fn test_stack_writer_matches_serde() {
        let dump = lines_to_dump(&["a->{b c}", "b->{d e}", "c->{d}", "e->{}", "d->{f}"]);
        let tree = ExecutionTree::build_from_dump(&dump, RootPolicy::Strict).unwrap();
        assert_eq!(
            tree.to_compact_string().unwrap(),
            serde_json::to_string(&tree).unwrap()
        );
        assert_eq!(
            tree.to_pretty_string().unwrap(),
            to_string_indented(&tree).unwrap()
        );

        let leaf = ExecutionTree::build_from_dump("a->{}", RootPolicy::Strict).unwrap();
        assert_eq!(leaf.to_pretty_string().unwrap(), to_string_indented(&leaf).unwrap());
        assert_eq!(leaf.to_compact_string().unwrap(), r#"{"name":"a","children":[]}"#);
    }

    #[test]
    fn test_deep_chain_written_to_file() {
        let tmp = crate::utils::temp_dir::TempDir::new("kviz-deep-chain");
        let tree = ExecutionTree::build(&chain(500), RootPolicy::Strict).unwrap();
        let path = tmp.join("tree.json");
        tree.write_json(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("{\n    \"name\":\"N0\",\n    \"children\":[\n"));
        assert!(written.ends_with("\n}"));
        assert_eq!(written.matches("\"name\":").count(), 501);
    }
}
