//! Presentation tree: the filtered, expandable view of the team hierarchy.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. The whole
//! tree is rebuilt from the source on every filter change; only the
//! `expanded` flags are mutated in place afterwards.

use crate::highlight::matches_filter;
use crate::source::{SourceItem, SourceNode};

/// Index of a node inside one [`PresentationTree`]. Ids are not stable
/// across rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationNode {
    pub item: SourceItem,
    /// `Some` for team-level nodes, decided by the source shape at build time.
    pub children: Option<Vec<NodeId>>,
    pub expanded: bool,
    /// Back-reference for labels and selection only.
    pub parent: Option<NodeId>,
}

impl PresentationNode {
    pub fn is_team(&self) -> bool {
        self.children.is_some()
    }
}

/// One visible row of the flattened tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRow {
    pub node: NodeId,
    pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PresentationTree {
    nodes: Vec<PresentationNode>,
    roots: Vec<NodeId>,
}

impl PresentationTree {
    /// Build the tree for `filter`. A blank filter keeps every node collapsed;
    /// otherwise a node survives if its own name matches (then all of its
    /// descendants survive too) or if any descendant survives, and every
    /// surviving team is expanded.
    pub fn build(source: &[SourceNode], filter: &str) -> Self {
        let filter = if filter.trim().is_empty() { "" } else { filter };
        let mut tree = Self::default();
        tree.roots = tree.build_level(source, filter, None);
        tree
    }

    fn build_level(
        &mut self,
        source: &[SourceNode],
        filter: &str,
        parent: Option<NodeId>,
    ) -> Vec<NodeId> {
        source
            .iter()
            .filter_map(|node| self.build_node(node, filter, parent))
            .collect()
    }

    fn build_node(
        &mut self,
        node: &SourceNode,
        filter: &str,
        parent: Option<NodeId>,
    ) -> Option<NodeId> {
        let own_match = filter.is_empty() || matches_filter(&node.display_name, filter);
        if !own_match && node.children.is_none() {
            return None;
        }

        // Reserve the slot first so children can point back at it.
        let id = NodeId(self.nodes.len());
        self.nodes.push(PresentationNode {
            item: node.item(),
            children: None,
            expanded: false,
            parent,
        });

        let children = match &node.children {
            None => None,
            Some(source_children) => {
                let child_filter = if own_match { "" } else { filter };
                let ids = self.build_level(source_children, child_filter, Some(id));
                if !own_match && ids.is_empty() {
                    // Children are always pushed after their parent.
                    self.nodes.truncate(id.0);
                    return None;
                }
                Some(ids)
            }
        };

        let slot = &mut self.nodes[id.0];
        slot.expanded = children.is_some() && !filter.is_empty();
        slot.children = children;
        Some(id)
    }

    #[cfg(test)]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&PresentationNode> {
        self.nodes.get(id.0)
    }

    /// Total number of nodes, visible or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Flip a team's `expanded` flag. Returns the new state, or `None` when
    /// `id` is not a team.
    pub fn toggle_expanded(&mut self, id: NodeId) -> Option<bool> {
        let node = self.nodes.get_mut(id.0)?;
        if !node.is_team() {
            return None;
        }
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    /// Pre-order walk of the visible nodes: children are only entered when
    /// their parent is expanded.
    pub fn flatten(&self) -> Vec<FlatRow> {
        fn walk(tree: &PresentationTree, ids: &[NodeId], depth: usize, out: &mut Vec<FlatRow>) {
            for &id in ids {
                let Some(node) = tree.get(id) else {
                    continue;
                };
                out.push(FlatRow { node: id, depth });
                if let (true, Some(children)) = (node.expanded, &node.children) {
                    walk(tree, children, depth + 1, out);
                }
            }
        }

        let mut rows = Vec::new();
        walk(self, &self.roots, 0, &mut rows);
        rows
    }

    /// First channel (leaf) whose id is `channel_id`, in source order.
    pub fn find_leaf(&self, channel_id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| !n.is_team() && n.item.id == channel_id)
            .map(NodeId)
    }

    /// Indented outline of every node, collapsed or not.
    #[cfg(test)]
    pub fn outline(&self) -> String {
        fn walk(tree: &PresentationTree, ids: &[NodeId], depth: usize, out: &mut Vec<String>) {
            for &id in ids {
                let Some(node) = tree.get(id) else {
                    continue;
                };
                let marker = match (&node.children, node.expanded) {
                    (Some(_), true) => "▾ ",
                    (Some(_), false) => "▸ ",
                    (None, _) => "# ",
                };
                out.push(format!(
                    "{}{}{}",
                    "  ".repeat(depth),
                    marker,
                    node.item.display_name
                ));
                if let Some(children) = &node.children {
                    walk(tree, children, depth + 1, out);
                }
            }
        }

        let mut lines = Vec::new();
        walk(self, &self.roots, 0, &mut lines);
        lines.join("\n")
    }
}
