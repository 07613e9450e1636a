use std::time::Duration;

/// Delay between the last keystroke and re-filtering the tree.
pub const FILTER_DEBOUNCE: Duration = Duration::from_millis(400);

/// Which permission scopes a source must grant before teams are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ScopeSet {
    /// Narrow, Teams-specific read scopes.
    #[default]
    Teams,
    /// Broader user and group directory scopes.
    Graph,
}

impl ScopeSet {
    pub fn scopes(self) -> &'static [&'static str] {
        match self {
            ScopeSet::Teams => &["Team.ReadBasic.All", "Channel.ReadBasic.All"],
            ScopeSet::Graph => &["User.Read.All", "Group.Read.All"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScopeSet::Teams => "teams",
            ScopeSet::Graph => "graph",
        }
    }
}

/// Settings injected into the picker at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerConfig {
    pub scope_set: ScopeSet,
    pub debounce: Duration,
}

impl PickerConfig {
    pub fn new(scope_set: ScopeSet) -> Self {
        Self {
            scope_set,
            debounce: FILTER_DEBOUNCE,
        }
    }

    pub fn required_scopes(&self) -> &'static [&'static str] {
        self.scope_set.scopes()
    }
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self::new(ScopeSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_sets_are_disjoint() {
        let teams = ScopeSet::Teams.scopes();
        let graph = ScopeSet::Graph.scopes();
        assert_eq!(teams.len(), 2);
        assert!(teams.iter().all(|s| !graph.contains(s)));
    }

    #[test]
    fn test_default_config() {
        let config = PickerConfig::default();
        assert_eq!(config.scope_set, ScopeSet::Teams);
        assert_eq!(config.debounce, Duration::from_millis(400));
        assert_eq!(config.required_scopes(), ScopeSet::Teams.scopes());
    }
}
