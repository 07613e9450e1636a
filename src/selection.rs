use serde::Serialize;

use crate::source::SourceItem;
use crate::tree::{NodeId, PresentationTree};

/// The externally visible selection: a channel and the team owning it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedChannel {
    pub channel: SourceItem,
    pub team: SourceItem,
}

impl SelectedChannel {
    /// Derive the pair from a leaf of `tree`. Teams and parentless nodes
    /// cannot be selected.
    pub fn from_leaf(tree: &PresentationTree, id: NodeId) -> Option<Self> {
        let leaf = tree.get(id)?;
        if leaf.is_team() {
            return None;
        }
        let team = tree.get(leaf.parent?)?;
        Some(Self {
            channel: leaf.item.clone(),
            team: team.item.clone(),
        })
    }

    /// "Team > Channel", as shown in the input while selected.
    pub fn label(&self) -> String {
        format!("{} > {}", self.team.display_name, self.channel.display_name)
    }
}

/// Change notification: empty when the selection was cleared, otherwise the
/// single new pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionChange(pub Vec<SelectedChannel>);

/// Single-selection model.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    current: Option<SelectedChannel>,
}

impl Selection {
    pub fn selected(&self) -> Option<&SelectedChannel> {
        self.current.as_ref()
    }

    /// Select the leaf `node` of `tree`, or clear with `None`. Team nodes are
    /// ignored.
    pub fn select(
        &mut self,
        tree: &PresentationTree,
        node: Option<NodeId>,
    ) -> Option<SelectionChange> {
        match node {
            Some(id) => {
                let picked = SelectedChannel::from_leaf(tree, id)?;
                self.set(Some(picked))
            }
            None => self.set(None),
        }
    }

    /// Replace the selection. Returns a notification only when it changed.
    pub fn set(&mut self, next: Option<SelectedChannel>) -> Option<SelectionChange> {
        if self.current == next {
            return None;
        }
        self.current = next;
        Some(SelectionChange(self.current.iter().cloned().collect()))
    }

    pub fn clear(&mut self) -> Option<SelectionChange> {
        self.set(None)
    }
}
