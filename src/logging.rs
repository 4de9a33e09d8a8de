//! Optional file logging for applications embedding the SDK.
//!
//! The SDK only emits `tracing` spans and events (targets under `diffy`).
//! Applications that already install a subscriber need nothing from here.
//! [`FileLogging`] is for those that just want the SDK's request log written
//! to a directory they choose.

use std::path::PathBuf;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Filter used when neither an explicit filter nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "diffy=info,warn";

/// Builder for a non-blocking file subscriber.
///
/// Keep the returned [`WorkerGuard`] alive for as long as logs should be
/// written; dropping it flushes pending lines.
#[derive(Debug, Clone)]
pub struct FileLogging {
    directory: PathBuf,
    file_name: String,
    rotation: Rotation,
    filter: Option<String>,
}

impl FileLogging {
    /// Log to `diffy.log` in `directory`, rotated daily.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            file_name: "diffy.log".to_string(),
            rotation: Rotation::DAILY,
            filter: None,
        }
    }

    /// File name, or file name prefix when rotation is enabled.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Filter directives, e.g. `diffy=debug`. Overrides `RUST_LOG`.
    pub fn filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    /// Build the subscriber without installing it.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created, the appender cannot open its
    /// file, or the filter directives do not parse.
    pub fn build(self) -> anyhow::Result<(impl Subscriber + Send + Sync, WorkerGuard)> {
        std::fs::create_dir_all(&self.directory)?;

        let appender = RollingFileAppender::builder()
            .rotation(self.rotation)
            .filename_prefix(&self.file_name)
            .build(&self.directory)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let filter = match &self.filter {
            Some(directives) => EnvFilter::try_new(directives)?,
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        );

        Ok((subscriber, guard))
    }

    /// Build the subscriber and install it as the global default.
    ///
    /// # Errors
    ///
    /// Same as [`FileLogging::build`], plus failure when a global subscriber
    /// is already set.
    ///
    /// # Example
    ///
    /// ```no_run
    /// let _guard = diffy::logging::FileLogging::new("/var/log/my-app")
    ///     .filter("diffy=debug")
    ///     .init()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn init(self) -> anyhow::Result<WorkerGuard> {
        let directory = self.directory.clone();
        let (subscriber, guard) = self.build()?;
        tracing::subscriber::set_global_default(subscriber)?;
        tracing::debug!(log_dir = %directory.display(), "Diffy file logging enabled");
        Ok(guard)
    }
}
