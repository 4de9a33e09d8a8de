//! Resource clients for projects, screenshot sets and diffs.
//!
//! Each operation validates its arguments before any request is sent, then
//! delegates to [`crate::Diffy`].

mod diff;
mod project;
mod screenshot;

pub use diff::Diff;
pub use project::{CompareParams, Project};
pub use screenshot::{CustomScreenshotItem, Screenshot, UploadRequest};

use crate::api::{ApiError, Result};

/// Reject a zero identifier, naming it in the error.
pub(crate) fn require_id(id: u64, label: &str) -> Result<()> {
    if id == 0 {
        return Err(ApiError::invalid(format!("{} can not be empty", label)));
    }
    Ok(())
}
