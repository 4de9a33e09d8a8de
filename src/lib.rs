//! Diffy - client SDK for the Diffy visual regression testing API.
//!
//! Build a [`Diffy`] client once; it exchanges the API key for a bearer token
//! and is then passed to every [`Project`], [`Screenshot`] and [`Diff`] call.
//! Operations validate their arguments locally and perform exactly one HTTP
//! request. Waiting for a screenshot set or diff to finish is up to the
//! caller.
//!
//! # Example
//!
//! ```no_run
//! use diffy::{CompareParams, Diff, Diffy, Project, Screenshot};
//!
//! # async fn example() -> Result<(), diffy::ApiError> {
//! let diffy = Diffy::new("my-api-key").await?;
//!
//! let projects = Project::all(&diffy, &[]).await?;
//! println!("{}", projects);
//!
//! let job = Project::compare(&diffy, 42, &CompareParams::new("prod", "stage")).await?;
//! println!("{}", job);
//!
//! let created = Screenshot::create(&diffy, 42, "production").await?;
//! let screenshot_id = created.as_u64().unwrap_or_default();
//!
//! let shot = Screenshot::retrieve(&diffy, screenshot_id).await?;
//! if !shot.is_completed() {
//!     println!("estimate: {}", shot.estimate()?);
//! }
//!
//! let diff = Diff::retrieve(&diffy, 7).await?;
//! let diff = diff.refresh(&diffy).await?;
//! println!("completed: {}", diff.is_completed());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod resources;

pub use api::{
    ApiError, Data, Diffy, Environment, MultipartField, RequestParams, ScreenshotType, State,
    DEFAULT_BASE_URL,
};
pub use config::{Config, ConfigError};
pub use error::Error;
pub use resources::{CompareParams, CustomScreenshotItem, Diff, Project, Screenshot, UploadRequest};

/// Load configuration from the default file and environment, then connect.
///
/// # Errors
///
/// Returns [`Error::Config`] for unreadable or invalid configuration and
/// [`Error::Api`] when the API key is missing or rejected.
pub async fn connect() -> error::Result<Diffy> {
    let config = Config::load_default()?;
    Ok(Diffy::from_config(&config).await?)
}
