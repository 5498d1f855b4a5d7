use thiserror::Error;

/// Errors from binding a grid page.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("Registration instance not found: {0}")]
    InstanceNotFound(i64),

    #[error("Registration template not found: {0}")]
    TemplateNotFound(i64),
}

/// Errors raised inside a group placement transaction.
///
/// Any of these aborts the whole batch. The placement action turns them into
/// a user-facing message instead of propagating them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("Placing '{person}' in the '{group}' group is not valid for the following reason: {}", .reasons.join("<br />"))]
    Invalid {
        person: String,
        group: String,
        reasons: Vec<String>,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}
