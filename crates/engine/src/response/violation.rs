use std::sync::Arc;

use super::{ResponsePath, ResultSlot, ResultTree};
use crate::operation::Selection;

/// A non-null position of the result tree that ended up `null`.
#[derive(Debug)]
pub(crate) struct NonNullViolation {
    pub selection: Arc<Selection>,
    pub path: ResponsePath,
    pub slot: ResultSlot,
}

#[derive(Debug, Default)]
pub(crate) struct NonNullViolations(Vec<NonNullViolation>);

impl NonNullViolations {
    pub fn record(&mut self, selection: Arc<Selection>, path: ResponsePath, slot: ResultSlot) {
        tracing::trace!(%path, field = %selection.field_name(), "non-null violation");
        self.0.push(NonNullViolation { selection, path, slot });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Collapses every recorded violation into its nearest nullable ancestor, or the root.
    pub fn propagate(self, tree: &mut ResultTree) {
        for violation in self.0 {
            propagate_null(tree, violation.slot);
        }
    }
}

fn propagate_null(tree: &mut ResultTree, violating_slot: ResultSlot) {
    let mut container = tree.container_of(violating_slot);
    loop {
        if tree.is_nulled(container) {
            // A previous violation already collapsed this subtree and everything above it that
            // had to be.
            return;
        }
        tree.mark_nulled(container);
        let Some(parent_slot) = tree.parent_of(container) else {
            tree.null_data();
            return;
        };
        tree.overwrite_with_null(parent_slot);
        if tree.is_nullable(parent_slot) {
            return;
        }
        container = tree.container_of(parent_slot);
    }
}
