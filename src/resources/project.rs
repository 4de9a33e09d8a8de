//! Projects.

use reqwest::Method;
use serde_json::{json, Value};
use tracing::instrument;

use super::require_id;
use crate::api::{ApiError, Diffy, Environment, RequestParams, Result};

/// Parameters of an environment comparison.
///
/// Both environments are required and must be one of `prod`, `stage`, `dev`
/// or `baseline`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareParams {
    pub env1: Option<String>,
    pub env2: Option<String>,
}

impl CompareParams {
    pub fn new(env1: impl Into<String>, env2: impl Into<String>) -> Self {
        Self {
            env1: Some(env1.into()),
            env2: Some(env2.into()),
        }
    }

    fn validate(&self) -> Result<(Environment, Environment)> {
        let env1 = self.env1.as_deref().ok_or_else(|| {
            ApiError::invalid(
                "Compare call requires \"env1\" as the first environment to compare.",
            )
        })?;
        let env2 = self.env2.as_deref().ok_or_else(|| {
            ApiError::invalid(
                "Compare call requires \"env2\" as the second environment to compare.",
            )
        })?;

        Ok((
            Environment::parse_field("env1", env1)?,
            Environment::parse_field("env2", env2)?,
        ))
    }
}

/// Operations on Diffy projects.
pub struct Project;

impl Project {
    /// List all projects visible to the API key.
    ///
    /// `params` are sent as query pairs; pass `&[]` for the plain listing.
    #[instrument(skip(diffy))]
    pub async fn all(diffy: &Diffy, params: &[(&str, &str)]) -> Result<Value> {
        diffy
            .request_with(
                Method::GET,
                "projects",
                Value::Null,
                RequestParams::with_query(params.iter().copied()),
            )
            .await
    }

    /// Start a comparison between two environments of a project.
    ///
    /// Returns the comparison job as sent by the API.
    #[instrument(skip(diffy))]
    pub async fn compare(diffy: &Diffy, project_id: u64, params: &CompareParams) -> Result<Value> {
        require_id(project_id, "Project ID")?;
        let (env1, env2) = params.validate()?;

        diffy
            .request(
                Method::POST,
                &format!("projects/{}/compare", project_id),
                json!({
                    "env1": env1,
                    "env2": env2,
                }),
            )
            .await
    }
}
