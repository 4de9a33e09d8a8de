//! Diffs between two screenshot sets.

use reqwest::Method;
use serde_json::{json, Value};
use tracing::instrument;

use super::require_id;
use crate::api::types::{decode_record, into_data};
use crate::api::{Data, DiffRecord, Diffy, Result, State};

/// States in which a diff counts as completed.
pub const COMPLETED_STATES: [State; 2] = [State::Completed, State::Zipfile];

/// A snapshot of a diff, as returned by `GET diffs/{id}`.
#[derive(Debug, Clone)]
pub struct Diff {
    id: u64,
    data: Data,
    record: DiffRecord,
}

impl Diff {
    /// Start computing a diff between two screenshot sets of a project.
    #[instrument(skip(diffy))]
    pub async fn create(
        diffy: &Diffy,
        project_id: u64,
        screenshot_id1: u64,
        screenshot_id2: u64,
    ) -> Result<Value> {
        require_id(project_id, "Project ID")?;
        require_id(screenshot_id1, "Screenshot 1 ID")?;
        require_id(screenshot_id2, "Screenshot 2 ID")?;

        diffy
            .request(
                Method::POST,
                &format!("projects/{}/diffs", project_id),
                json!({
                    "snapshot1": screenshot_id1,
                    "snapshot2": screenshot_id2,
                }),
            )
            .await
    }

    /// Fetch a diff.
    #[instrument(skip(diffy))]
    pub async fn retrieve(diffy: &Diffy, diff_id: u64) -> Result<Self> {
        require_id(diff_id, "Diff ID")?;
        let value = diffy
            .request(Method::GET, &format!("diffs/{}", diff_id), Value::Null)
            .await?;
        Self::from_response(diff_id, value)
    }

    /// Fetch the latest state of this diff as a new snapshot.
    pub async fn refresh(&self, diffy: &Diffy) -> Result<Self> {
        Self::retrieve(diffy, self.id).await
    }

    fn from_response(id: u64, value: Value) -> Result<Self> {
        let data = into_data(value)?;
        let record = decode_record(&data)?;
        Ok(Self { id, data, record })
    }

    /// The diff ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Raw data as returned by the API.
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Current processing state, if the API reported one.
    pub fn state(&self) -> Option<State> {
        self.record.state
    }

    /// Whether the diff reached `Completed` or `Zipfile`.
    pub fn is_completed(&self) -> bool {
        self.state()
            .is_some_and(|state| COMPLETED_STATES.contains(&state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::resources::test_support::client;
    use wiremock::matchers::{any, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn diff(state: i64) -> Diff {
        Diff::from_response(3, json!({ "id": 3, "state": state })).unwrap()
    }

    #[test]
    fn test_is_completed() {
        assert!(!diff(0).is_completed());
        assert!(!diff(1).is_completed());
        assert!(diff(2).is_completed());
        assert!(!diff(3).is_completed());
        assert!(diff(4).is_completed());
    }

    #[test]
    fn test_from_response_requires_object() {
        let err = Diff::from_response(3, json!("done")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_create_posts_snapshot_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/1/diffs"))
            .and(body_json(json!({ "snapshot1": 10, "snapshot2": 20 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(333)))
            .expect(1)
            .mount(&server)
            .await;

        let result = Diff::create(&client(&server), 1, 10, 20).await.unwrap();
        assert_eq!(result, json!(333));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_ids_without_request() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let diffy = client(&server);

        let err = Diff::create(&diffy, 0, 10, 20).await.unwrap_err();
        assert!(err.to_string().contains("Project ID can not be empty"));

        let err = Diff::create(&diffy, 1, 0, 20).await.unwrap_err();
        assert!(err.to_string().contains("Screenshot 1 ID can not be empty"));

        let err = Diff::create(&diffy, 1, 10, 0).await.unwrap_err();
        assert!(err.to_string().contains("Screenshot 2 ID can not be empty"));
    }

    #[tokio::test]
    async fn test_retrieve_then_refresh_overwrites_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/diffs/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3,
                "state": 1,
                "progress": 40
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/diffs/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3,
                "state": 2,
                "result": "https://app.diffy.website/diffs/3"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let diffy = client(&server);
        let pending = Diff::retrieve(&diffy, 3).await.unwrap();
        assert!(!pending.is_completed());

        let done = pending.refresh(&diffy).await.unwrap();
        assert!(done.is_completed());
        assert_eq!(done.id(), 3);
        assert!(done.data().get("progress").is_none());
        assert_eq!(done.data()["result"], "https://app.diffy.website/diffs/3");
    }
}
