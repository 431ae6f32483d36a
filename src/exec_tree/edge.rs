use regex::Regex;

/// One `parent->{child child ...}` statement of a tree dump.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRecord {
    pub parent: String,
    pub children: Vec<String>,
}

/// Marker a line must contain to be considered at all; everything else in the
/// dump is graph-description boilerplate.
pub const ARROW: &str = "->";

lazy_static! {
    // The parent is a single token that cannot contain braces or whitespace.
    // The children sit inside one pair of braces directly after the arrow.
    // Statement terminators (`;`) and surrounding whitespace are tolerated.
    static ref RE_EDGE: Regex =
        Regex::new(r"^\s*(?P<parent>[^\s{}]+?)\s*->\{(?P<children>[^{}]*)\}\s*;?\s*$").unwrap();
}

/// Parse a single dump line.  Returns `None` for anything that isn't an edge
/// statement with a bracketed child list.
pub fn parse_edge_line(line: &str) -> Option<EdgeRecord> {
    if !line.contains(ARROW) {
        return None;
    }
    let caps = RE_EDGE.captures(line)?;
    Some(EdgeRecord {
        parent: caps["parent"].to_string(),
        children: caps["children"]
            .split_whitespace()
            .map(|s| s.to_string())
            .collect(),
    })
}

/// Parse every edge statement of a dump, in order.  Lines that mention the
/// arrow but don't fit the grammar are dropped without complaint.
pub fn parse_edges(dump: &str) -> Vec<EdgeRecord> {
    let mut edges = vec![];
    for line in dump.lines().filter(|line| line.contains(ARROW)) {
        match parse_edge_line(line) {
            Some(edge) => edges.push(edge),
            None => trace!(line, "dropping malformed edge line"),
        }
    }
    edges
}
