//! Diffy API client and types.
//!
//! This module provides the gateway for communicating with the Diffy REST API.

mod auth;
mod client;
pub mod error;
mod multipart;
pub mod types;

pub use auth::Credentials;
pub use client::{Diffy, RequestParams, DEFAULT_BASE_URL};
pub use error::{ApiError, Result};
pub use multipart::{FieldValue, MultipartField, FILE_PART_CONTENT_TYPE};
pub use types::{Data, DiffRecord, Environment, ScreenshotType, SnapshotRecord, SnapshotStatus, State};
