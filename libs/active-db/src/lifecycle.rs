//! Soft-delete lifecycle.
//!
//! ```text
//!            delete(Soft)
//!   Active ---------------> SoftDeleted
//!     ^  <---------------      |
//!     |    delete(Undelete)    |
//!     |                        | delete(Hard)
//!     +---- delete(Hard) ----> Removed
//! ```
//!
//! `Removed` is terminal: a hard delete consumes the model.

/// How [`crate::Session::delete`] treats a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Mark the row deleted and stamp `deleted_at`.
    #[default]
    Soft,
    /// Clear the deleted mark.
    Undelete,
    /// Remove the row.
    Hard,
}

impl DeleteMode {
    /// Map the `(soft, hard)` flag pair used by form handlers.
    ///
    /// `hard` wins; `soft = false` without `hard` means undelete.
    #[must_use]
    pub fn from_flags(soft: bool, hard: bool) -> Self {
        match (soft, hard) {
            (_, true) => Self::Hard,
            (true, false) => Self::Soft,
            (false, false) => Self::Undelete,
        }
    }
}

/// Where a model sits in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    SoftDeleted,
    Removed,
}

impl LifecycleState {
    /// Visible to reads that do not ask for deleted rows.
    #[must_use]
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Active)
    }
}
