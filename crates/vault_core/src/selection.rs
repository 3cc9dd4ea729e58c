//! Tracks which tree node is selected and which node a context action
//! targets. The two are independent: a right-click on a non-selected node
//! opens a context menu without changing which group's records are shown.

use shared::domain::GroupId;

/// Conventional key of the forest root sentinel in the rendered tree.
pub const ROOT_NODE_KEY: &str = "0";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_group_key: Option<String>,
    pub pending_context_key: Option<String>,
}

impl SelectionState {
    pub fn select(&mut self, key: impl Into<String>) {
        self.selected_group_key = Some(key.into());
    }

    pub fn selected_group_id(&self) -> Option<GroupId> {
        let key = self.selected_group_key.as_deref()?;
        key.parse().ok().map(GroupId)
    }

    pub fn set_context_target(&mut self, key: impl Into<String>) {
        self.pending_context_key = Some(key.into());
    }

    pub fn clear_context_target(&mut self) {
        self.pending_context_key = None;
    }

    /// Delete is only offered for a real context target; the root sentinel
    /// node cannot be deleted.
    pub fn can_delete_context_target(&self) -> bool {
        matches!(self.pending_context_key.as_deref(), Some(key) if key != ROOT_NODE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_target_is_independent_of_selection() {
        let mut selection = SelectionState::default();
        selection.select("3");
        selection.set_context_target("7");

        assert_eq!(selection.selected_group_key.as_deref(), Some("3"));
        assert_eq!(selection.pending_context_key.as_deref(), Some("7"));
        assert_eq!(selection.selected_group_id(), Some(GroupId(3)));

        selection.clear_context_target();
        assert_eq!(selection.selected_group_key.as_deref(), Some("3"));
        assert!(selection.pending_context_key.is_none());
    }

    #[test]
    fn root_sentinel_cannot_be_delete_target() {
        let mut selection = SelectionState::default();
        assert!(!selection.can_delete_context_target());

        selection.set_context_target(ROOT_NODE_KEY);
        assert!(!selection.can_delete_context_target());

        selection.set_context_target("5");
        assert!(selection.can_delete_context_target());
    }

    #[test]
    fn malformed_selected_key_yields_no_group_id() {
        let mut selection = SelectionState::default();
        selection.select("not-a-number");
        assert_eq!(selection.selected_group_id(), None);
    }
}
