//! [`BoardBinding`] – which board the gateway currently talks to.
//!
//! Every command and read checks [`BoardBinding::current`] first.  While no
//! board is bound (or the bound id is empty) operations return immediately
//! without touching the network or the cache.

use std::sync::{PoisonError, RwLock};

/// Holds the currently configured board identifier.
#[derive(Debug, Default)]
pub struct BoardBinding {
    board_id: RwLock<Option<String>>,
}

impl BoardBinding {
    /// Create an unbound binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to `board_id`, replacing any previous binding.  No format
    /// validation is applied.
    pub fn bind(&self, board_id: impl Into<String>) {
        *self.board_id.write().unwrap_or_else(PoisonError::into_inner) = Some(board_id.into());
    }

    /// The bound board id, or `None` while unset or empty.
    pub fn current(&self) -> Option<String> {
        self.board_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|id| !id.is_empty())
            .cloned()
    }

    pub fn is_bound(&self) -> bool {
        self.current().is_some()
    }
}
