//! Screenshot sets.
//!
//! A screenshot set moves through `NotStarted → Progress → Completed →
//! CompletedHookExecuted → Zipfile` on the server. The client only observes
//! the state by fetching a new snapshot.

use std::path::{Path, PathBuf};

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::require_id;
use crate::api::types::{decode_record, into_data};
use crate::api::{ApiError, Data, Diffy, MultipartField, Result, ScreenshotType, SnapshotRecord, State};

/// States in which a screenshot set counts as completed.
pub const COMPLETED_STATES: [State; 3] = [
    State::Completed,
    State::CompletedHookExecuted,
    State::Zipfile,
];

/// A snapshot of a screenshot set, as returned by `GET snapshots/{id}`.
#[derive(Debug, Clone)]
pub struct Screenshot {
    id: u64,
    data: Data,
    record: SnapshotRecord,
}

/// Images to upload as a new screenshot set.
///
/// `files`, `breakpoints` and `urls` are parallel lists: entry `i` of each
/// describes the same screenshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRequest {
    pub snapshot_name: Option<String>,
    pub files: Option<Vec<PathBuf>>,
    pub breakpoints: Option<Vec<u32>>,
    pub urls: Option<Vec<String>>,
}

impl UploadRequest {
    pub fn new(
        snapshot_name: impl Into<String>,
        files: Vec<PathBuf>,
        breakpoints: Vec<u32>,
        urls: Vec<String>,
    ) -> Self {
        Self {
            snapshot_name: Some(snapshot_name.into()),
            files: Some(files),
            breakpoints: Some(breakpoints),
            urls: Some(urls),
        }
    }

    /// Check presence and lengths, returning the three lists.
    fn validate(&self) -> Result<(&str, &[PathBuf], &[u32], &[String])> {
        let files = self
            .files
            .as_deref()
            .ok_or_else(|| ApiError::invalid("\"files\" property is missing or is not an array"))?;
        let snapshot_name = self
            .snapshot_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::invalid("\"snapshotName\" property is missing"))?;
        let breakpoints = self.breakpoints.as_deref().ok_or_else(|| {
            ApiError::invalid("\"breakpoints\" property is missing or is not an array")
        })?;
        let urls = self
            .urls
            .as_deref()
            .ok_or_else(|| ApiError::invalid("\"urls\" property is missing or is not an array"))?;

        if files.len() != urls.len() || urls.len() != breakpoints.len() {
            return Err(ApiError::invalid(
                "Number of \"urls\", \"breakpoints\" and \"files\" should be the same",
            ));
        }

        Ok((snapshot_name, files, breakpoints, urls))
    }
}

/// One screenshot of a custom screenshot set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomScreenshotItem {
    /// PNG image contents.
    pub file: Vec<u8>,
    /// The page the image was taken of.
    pub url: String,
    /// Viewport width in pixels.
    pub breakpoint: u32,
}

impl CustomScreenshotItem {
    pub fn new(file: Vec<u8>, url: impl Into<String>, breakpoint: u32) -> Self {
        Self {
            file,
            url: url.into(),
            breakpoint,
        }
    }

    fn is_complete(&self) -> bool {
        !self.file.is_empty() && !self.url.is_empty() && self.breakpoint != 0
    }
}

impl Screenshot {
    /// Start capturing a screenshot set of a project.
    ///
    /// `environment` must be one of `production`, `staging`, `development`,
    /// `custom` or `upload`.
    #[instrument(skip(diffy))]
    pub async fn create(diffy: &Diffy, project_id: u64, environment: &str) -> Result<Value> {
        require_id(project_id, "Project ID")?;
        let environment: ScreenshotType = environment.parse()?;

        diffy
            .request(
                Method::POST,
                &format!("projects/{}/screenshots", project_id),
                json!({ "environment": environment }),
            )
            .await
    }

    /// Mark a whole screenshot set as the project's baseline.
    #[instrument(skip(diffy))]
    pub async fn set_baseline_set(diffy: &Diffy, project_id: u64, screenshot_id: u64) -> Result<Value> {
        require_id(project_id, "Project ID")?;
        require_id(screenshot_id, "Screenshot ID")?;

        diffy
            .request(
                Method::PUT,
                &format!("projects/{}/set-base-line-set/{}", project_id, screenshot_id),
                Value::Null,
            )
            .await
    }

    /// Fetch a screenshot set.
    #[instrument(skip(diffy))]
    pub async fn retrieve(diffy: &Diffy, screenshot_id: u64) -> Result<Self> {
        require_id(screenshot_id, "Screenshot ID")?;
        let value = diffy
            .request(Method::GET, &format!("snapshots/{}", screenshot_id), Value::Null)
            .await?;
        Self::from_response(screenshot_id, value)
    }

    /// Fetch the latest state of this screenshot set as a new snapshot.
    pub async fn refresh(&self, diffy: &Diffy) -> Result<Self> {
        Self::retrieve(diffy, self.id).await
    }

    fn from_response(id: u64, value: Value) -> Result<Self> {
        let data = into_data(value)?;
        let record = decode_record(&data)?;
        Ok(Self { id, data, record })
    }

    /// The screenshot set ID.
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

    /// Whether the set reached `Completed`, `CompletedHookExecuted` or
    /// `Zipfile`.
    pub fn is_completed(&self) -> bool {
        self.state()
            .is_some_and(|state| COMPLETED_STATES.contains(&state))
    }

    /// The server's estimate of remaining work, from `status.estimate`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MissingField` when the data has no estimate.
    pub fn estimate(&self) -> Result<&Value> {
        self.record
            .status
            .as_ref()
            .and_then(|status| status.estimate.as_ref())
            .ok_or_else(|| ApiError::MissingField("status.estimate".to_string()))
    }

    /// Create a screenshot set from image files on disk.
    ///
    /// All arguments are checked before any file is read: the lists must be
    /// present and of equal length, and every file must exist.
    #[instrument(skip(diffy, upload))]
    pub async fn create_upload(diffy: &Diffy, project_id: u64, upload: &UploadRequest) -> Result<Value> {
        require_id(project_id, "Project ID")?;
        let (snapshot_name, files, breakpoints, urls) = upload.validate()?;

        for path in files {
            ensure_readable_file(path).await?;
        }

        let mut fields = Vec::with_capacity(1 + files.len() * 3);
        fields.push(MultipartField::text("snapshotName", snapshot_name));
        for (i, breakpoint) in breakpoints.iter().enumerate() {
            fields.push(MultipartField::text(
                format!("breakpoints[{}]", i),
                breakpoint.to_string(),
            ));
        }
        for (i, url) in urls.iter().enumerate() {
            fields.push(MultipartField::text(format!("urls[{}]", i), url.as_str()));
        }
        for (i, path) in files.iter().enumerate() {
            let contents = tokio::fs::read(path).await.map_err(|_| unreadable(path))?;
            debug!(file = %path.display(), bytes = contents.len(), "Attaching upload");
            fields.push(MultipartField::file(
                format!("files[{}]", i),
                base_filename(path),
                contents,
            ));
        }

        diffy
            .multipart_request(
                Method::POST,
                &format!("projects/{}/create-custom-snapshot", project_id),
                fields,
            )
            .await
    }

    /// Create a screenshot set from BrowserStack screenshots.
    #[instrument(skip(diffy, screenshots), fields(count = screenshots.len()))]
    pub async fn create_browser_stack_screenshot(
        diffy: &Diffy,
        project_id: u64,
        screenshots: &[Value],
    ) -> Result<Value> {
        require_id(project_id, "Project ID")?;
        if screenshots.is_empty() {
            return Err(ApiError::invalid("Screenshots list can not be empty"));
        }

        diffy
            .request(
                Method::POST,
                &format!("projects/{}/create-browser-stack-screenshot", project_id),
                json!({ "screenshots": screenshots }),
            )
            .await
    }

    /// Create a screenshot set from in-memory images.
    #[instrument(skip(diffy, items), fields(count = items.len()))]
    pub async fn create_custom_screenshot(
        diffy: &Diffy,
        project_id: u64,
        items: &[CustomScreenshotItem],
        screenshot_name: &str,
    ) -> Result<Value> {
        require_id(project_id, "Project ID")?;
        if items.is_empty() {
            return Err(ApiError::invalid("Data list can not be empty"));
        }

        let mut fields = Vec::with_capacity(1 + items.len() * 3);
        fields.push(MultipartField::text("snapshotName", screenshot_name));
        for (i, item) in items.iter().enumerate() {
            if !item.is_complete() {
                return Err(ApiError::invalid(
                    "Data list contain not valid data. Each item of list should have non-empty \
                     \"file\", \"url\" and \"breakpoint\"",
                ));
            }
            fields.push(MultipartField::bytes(format!("files[{}]", i), item.file.clone()));
            fields.push(MultipartField::text(format!("urls[{}]", i), item.url.as_str()));
            fields.push(MultipartField::text(
                format!("breakpoints[{}]", i),
                item.breakpoint.to_string(),
            ));
        }

        diffy
            .multipart_request(
                Method::POST,
                &format!("projects/{}/create-custom-snapshot", project_id),
                fields,
            )
            .await
    }
}

fn unreadable(path: &Path) -> ApiError {
    ApiError::invalid(format!(
        "File {} can not be found. Check file exists and readable.",
        path.display()
    ))
}

async fn ensure_readable_file(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(unreadable(path)),
    }
}

fn base_filename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::client;
    use wiremock::matchers::{any, body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn silent_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        server
    }

    fn snapshot(state: i64) -> Screenshot {
        Screenshot::from_response(1, json!({ "id": 1, "state": state })).unwrap()
    }

    #[test]
    fn test_is_completed_for_terminal_states() {
        assert!(!snapshot(0).is_completed());
        assert!(!snapshot(1).is_completed());
        assert!(snapshot(2).is_completed());
        assert!(snapshot(3).is_completed());
        assert!(snapshot(4).is_completed());
        assert!(!snapshot(7).is_completed());
    }

    #[test]
    fn test_is_completed_without_state() {
        let shot = Screenshot::from_response(1, json!({ "id": 1 })).unwrap();
        assert_eq!(shot.state(), None);
        assert!(!shot.is_completed());
    }

    #[test]
    fn test_estimate() {
        let shot = Screenshot::from_response(
            1,
            json!({ "state": 1, "status": { "estimate": "2 minutes" } }),
        )
        .unwrap();
        assert_eq!(shot.estimate().unwrap(), &json!("2 minutes"));
    }

    #[test]
    fn test_estimate_missing() {
        let err = snapshot(1).estimate().unwrap_err();
        assert!(matches!(err, ApiError::MissingField(ref f) if f == "status.estimate"));
    }

    #[test]
    fn test_odd_status_still_reports_state() {
        let shot = Screenshot::from_response(1, json!({ "state": 2, "status": "done" })).unwrap();
        assert!(shot.is_completed());

        let err = shot.estimate().unwrap_err();
        assert!(matches!(err, ApiError::MissingField(_)));
    }

    #[test]
    fn test_base_filename() {
        assert_eq!(base_filename(Path::new("/tmp/shots/home.png")), "home.png");
        assert_eq!(base_filename(Path::new("about.png")), "about.png");
    }

    #[tokio::test]
    async fn test_create_posts_environment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/42/screenshots"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({ "environment": "production" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(501)))
            .expect(1)
            .mount(&server)
            .await;

        let result = Screenshot::create(&client(&server), 42, "production")
            .await
            .unwrap();
        assert_eq!(result, json!(501));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_environment() {
        let server = silent_server().await;

        let err = Screenshot::create(&client(&server), 42, "bogus")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArguments(_)));
        assert!(err.to_string().contains("\"bogus\" is not a valid environment"));
    }

    #[tokio::test]
    async fn test_create_rejects_zero_project_id() {
        let server = silent_server().await;

        let err = Screenshot::create(&client(&server), 0, "production")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Project ID can not be empty"));
    }

    #[tokio::test]
    async fn test_set_baseline_set() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/projects/42/set-base-line-set/501"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
            .expect(1)
            .mount(&server)
            .await;

        let ack = Screenshot::set_baseline_set(&client(&server), 42, 501)
            .await
            .unwrap();
        assert_eq!(ack["status"], "ok");
    }

    #[tokio::test]
    async fn test_retrieve_and_refresh_replace_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshots/501"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 501,
                "state": 1,
                "status": { "estimate": 90 },
                "screenshots": 3
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/snapshots/501"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 501,
                "state": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let diffy = client(&server);
        let first = Screenshot::retrieve(&diffy, 501).await.unwrap();
        assert_eq!(first.id(), 501);
        assert!(!first.is_completed());
        assert_eq!(first.estimate().unwrap(), &json!(90));

        let second = first.refresh(&diffy).await.unwrap();
        assert!(second.is_completed());
        assert_eq!(second.state(), Some(State::CompletedHookExecuted));
        assert!(!second.data().contains_key("screenshots"));
        assert!(second.estimate().is_err());

        // The earlier snapshot is untouched.
        assert_eq!(first.state(), Some(State::Progress));
    }

    #[tokio::test]
    async fn test_create_upload_sends_indexed_fields() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home.png");
        let about = dir.path().join("about.png");
        std::fs::write(&home, b"HOMEPNG").unwrap();
        std::fs::write(&about, b"ABOUTPNG").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/42/create-custom-snapshot"))
            .and(header("authorization", "Bearer tok"))
            .and(body_string_contains("name=\"snapshotName\"\r\n\r\nRelease 1.2"))
            .and(body_string_contains("name=\"breakpoints[1]\"\r\n\r\n1200"))
            .and(body_string_contains("name=\"urls[0]\"\r\n\r\nhttps://example.com/"))
            .and(body_string_contains("name=\"files[0]\"; filename=\"home.png\""))
            .and(body_string_contains("name=\"files[1]\"; filename=\"about.png\""))
            .and(body_string_contains("ABOUTPNG"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 77 })))
            .expect(1)
            .mount(&server)
            .await;

        let upload = UploadRequest::new(
            "Release 1.2",
            vec![home, about],
            vec![640, 1200],
            vec![
                "https://example.com/".to_string(),
                "https://example.com/about".to_string(),
            ],
        );
        let result = Screenshot::create_upload(&client(&server), 42, &upload)
            .await
            .unwrap();
        assert_eq!(result["id"], 77);
    }

    #[tokio::test]
    async fn test_create_upload_mismatched_lengths() {
        let server = silent_server().await;
        // Paths do not exist: the length check must fire before disk access.
        let upload = UploadRequest::new(
            "Release",
            vec![PathBuf::from("/nonexistent/a.png"), PathBuf::from("/nonexistent/b.png")],
            vec![640, 1024, 1200],
            vec!["u1".to_string(), "u2".to_string(), "u3".to_string()],
        );

        let err = Screenshot::create_upload(&client(&server), 42, &upload)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("should be the same"));
    }

    #[tokio::test]
    async fn test_create_upload_missing_file() {
        let server = silent_server().await;
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.png");
        std::fs::write(&present, b"PNG").unwrap();
        let missing = dir.path().join("missing.png");

        let upload = UploadRequest::new(
            "Release",
            vec![present, missing.clone()],
            vec![640, 1200],
            vec!["u1".to_string(), "u2".to_string()],
        );

        let err = Screenshot::create_upload(&client(&server), 42, &upload)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArguments(_)));
        assert!(err.to_string().contains(&missing.display().to_string()));
    }

    #[tokio::test]
    async fn test_create_upload_requires_every_property() {
        let server = silent_server().await;
        let diffy = client(&server);
        let complete = UploadRequest::new("Release", vec![], vec![], vec![]);

        let cases = [
            (UploadRequest { files: None, ..complete.clone() }, "\"files\""),
            (UploadRequest { snapshot_name: None, ..complete.clone() }, "\"snapshotName\""),
            (
                UploadRequest { snapshot_name: Some(String::new()), ..complete.clone() },
                "\"snapshotName\"",
            ),
            (UploadRequest { breakpoints: None, ..complete.clone() }, "\"breakpoints\""),
            (UploadRequest { urls: None, ..complete.clone() }, "\"urls\""),
        ];

        for (upload, field) in cases {
            let err = Screenshot::create_upload(&diffy, 42, &upload)
                .await
                .unwrap_err();
            assert!(
                err.to_string().contains(field),
                "expected error naming {}, got {}",
                field,
                err
            );
        }
    }

    #[tokio::test]
    async fn test_create_browser_stack_screenshot() {
        let server = MockServer::start().await;
        let screenshots = vec![json!({ "url": "https://example.com", "browser": "chrome" })];
        Mock::given(method("POST"))
            .and(path("/projects/42/create-browser-stack-screenshot"))
            .and(body_json(json!({ "screenshots": screenshots })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 8 })))
            .expect(1)
            .mount(&server)
            .await;

        let result = Screenshot::create_browser_stack_screenshot(&client(&server), 42, &screenshots)
            .await
            .unwrap();
        assert_eq!(result["id"], 8);
    }

    #[tokio::test]
    async fn test_create_browser_stack_screenshot_requires_screenshots() {
        let server = silent_server().await;

        let err = Screenshot::create_browser_stack_screenshot(&client(&server), 42, &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Screenshots list can not be empty"));
    }

    #[tokio::test]
    async fn test_create_custom_screenshot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/42/create-custom-snapshot"))
            .and(body_string_contains("name=\"snapshotName\"\r\n\r\nNightly"))
            .and(body_string_contains("name=\"files[0]\""))
            .and(body_string_contains("IMAGEBYTES"))
            .and(body_string_contains("name=\"urls[0]\"\r\n\r\nhttps://example.com/"))
            .and(body_string_contains("name=\"breakpoints[0]\"\r\n\r\n1024"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 12 })))
            .expect(1)
            .mount(&server)
            .await;

        let items = vec![CustomScreenshotItem::new(
            b"IMAGEBYTES".to_vec(),
            "https://example.com/",
            1024,
        )];
        let result = Screenshot::create_custom_screenshot(&client(&server), 42, &items, "Nightly")
            .await
            .unwrap();
        assert_eq!(result["id"], 12);
    }

    #[tokio::test]
    async fn test_only_uploaded_files_carry_part_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home.png");
        std::fs::write(&home, b"HOMEPNG").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/42/create-custom-snapshot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
            .expect(2)
            .mount(&server)
            .await;
        let diffy = client(&server);

        let items = vec![CustomScreenshotItem::new(
            b"IMAGEBYTES".to_vec(),
            "https://example.com/",
            1024,
        )];
        Screenshot::create_custom_screenshot(&diffy, 42, &items, "Nightly")
            .await
            .unwrap();

        let upload = UploadRequest::new(
            "Release",
            vec![home],
            vec![640],
            vec!["https://example.com/".to_string()],
        );
        Screenshot::create_upload(&diffy, 42, &upload).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let custom_body = String::from_utf8_lossy(&requests[0].body).to_lowercase();
        let upload_body = String::from_utf8_lossy(&requests[1].body).to_lowercase();

        assert!(custom_body.contains("imagebytes"));
        assert!(!custom_body.contains("content-type: multipart/form-data"));
        assert!(upload_body.contains("content-type: multipart/form-data"));
    }

    #[tokio::test]
    async fn test_create_custom_screenshot_rejects_incomplete_item() {
        let server = silent_server().await;
        let diffy = client(&server);

        let err = Screenshot::create_custom_screenshot(&diffy, 42, &[], "Nightly")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Data list can not be empty"));

        let items = vec![
            CustomScreenshotItem::new(b"PNG".to_vec(), "https://example.com/", 1024),
            CustomScreenshotItem::new(b"PNG".to_vec(), "", 1024),
        ];
        let err = Screenshot::create_custom_screenshot(&diffy, 42, &items, "Nightly")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArguments(_)));
        assert!(err.to_string().contains("\"file\", \"url\" and \"breakpoint\""));
    }
}
