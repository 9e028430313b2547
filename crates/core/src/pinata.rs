//! Pinata pinning backend

use crate::error::{Error, Result};
use crate::files::{FileSource, WalkDirSource};
use crate::pinner::{assert_pinner, Pinner};
use crate::transport::{HttpResponse, HttpTransport, MultipartUpload, ReqwestTransport};
use async_trait::async_trait;
use futures::TryStreamExt;
use http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default Pinata API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.pinata.cloud";

const PIN_FILE_ENDPOINT: &str = "/pinning/pinFileToIPFS";
const PIN_HASH_ENDPOINT: &str = "/pinning/pinByHash";

const API_KEY_HEADER: &str = "pinata_api_key";
const SECRET_API_KEY_HEADER: &str = "pinata_secret_api_key";

const _: () = assert_pinner::<PinataPinner>();

/// Credentials accepted by [`PinataPinner::builder`]
///
/// Both fields are required; the builder rejects a missing or blank one.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinataOptions {
    pub api_key: Option<String>,
    pub secret_api_key: Option<String>,
}

impl PinataOptions {
    pub fn new(api_key: impl Into<String>, secret_api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            secret_api_key: Some(secret_api_key.into()),
        }
    }
}

impl std::fmt::Debug for PinataOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataOptions")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("secret_api_key", &self.secret_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Authenticated Pinata handle
#[derive(Clone)]
pub struct PinataApi {
    headers: HeaderMap,
}

impl PinataApi {
    /// Authentication headers sent with every request
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl std::fmt::Debug for PinataApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataApi").finish_non_exhaustive()
    }
}

/// Pinata backend
pub struct PinataPinner {
    transport: Arc<dyn HttpTransport>,
    files: Arc<dyn FileSource>,
    base_url: String,
}

impl PinataPinner {
    /// Create a backend using `reqwest` and the local filesystem
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let transport = ReqwestTransport::new(timeout)?;
        Ok(Self::with_parts(Arc::new(transport), Arc::new(WalkDirSource::new())))
    }

    /// Create a backend from explicit transport and file source
    pub fn with_parts(transport: Arc<dyn HttpTransport>, files: Arc<dyn FileSource>) -> Self {
        Self {
            transport,
            files,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the backend at another API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl Pinner for PinataPinner {
    type Options = PinataOptions;
    type Api = PinataApi;

    fn name(&self) -> &'static str {
        "Pinata"
    }

    fn slug(&self) -> &'static str {
        "pinata"
    }

    async fn builder(&self, options: PinataOptions) -> Result<PinataApi> {
        let api_key = required(options.api_key, "apiKey")?;
        let secret_api_key = required(options.secret_api_key, "secretApiKey")?;

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, header_value(&api_key, "apiKey")?);
        headers.insert(SECRET_API_KEY_HEADER, header_value(&secret_api_key, "secretApiKey")?);

        debug!("Pinata API handle built");
        Ok(PinataApi { headers })
    }

    #[instrument(skip(self, api, path), fields(path = %path.display()))]
    async fn pin_dir(&self, api: &PinataApi, path: &Path, tag: Option<&str>) -> Result<String> {
        let mut files = self.files.files(path);
        let mut upload = MultipartUpload::new();

        while let Some(file) = files.try_next().await? {
            let content_type = mime_guess::from_path(&file.relative_path)
                .first_or_octet_stream()
                .to_string();
            debug!(file = %file.relative_path, bytes = file.content.len(), "Adding file");
            upload.add_file("file", file.relative_path, content_type, file.content);
        }

        if upload.file_count() == 0 {
            return Err(Error::EmptyDirectory(path.to_path_buf()));
        }

        if let Some(tag) = tag {
            upload.add_text("pinataMetadata", serde_json::json!({ "name": tag }).to_string());
        }

        info!(
            files = upload.file_count(),
            bytes = upload.total_bytes(),
            "Uploading directory to Pinata"
        );

        let response = self
            .transport
            .post_multipart(&self.url(PIN_FILE_ENDPOINT), &api.headers, upload)
            .await?;
        let body: PinFileResponse = check_status(response)?.json()?;

        match body.ipfs_hash.filter(|hash| !hash.is_empty()) {
            Some(cid) => {
                info!(cid = %cid, pin_size = ?body.pin_size, "Directory pinned");
                Ok(cid)
            }
            None => Err(Error::MissingField("IpfsHash")),
        }
    }

    #[instrument(skip(self, api))]
    async fn pin_cid(&self, api: &PinataApi, cid: Option<&str>, tag: Option<&str>) -> Result<()> {
        let mut body = serde_json::json!({ "hashToPin": cid });
        if let Some(tag) = tag {
            body["pinataMetadata"] = serde_json::json!({ "name": tag });
        }

        let response = self
            .transport
            .post_json(&self.url(PIN_HASH_ENDPOINT), &api.headers, &body)
            .await?;
        check_status(response)?;

        info!("Pin by hash accepted");
        Ok(())
    }
}

/// Body of a successful `pinFileToIPFS` call
#[derive(Debug, Deserialize)]
struct PinFileResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
    #[serde(rename = "PinSize")]
    pin_size: Option<u64>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("Pinata '{}' is required", field))),
    }
}

fn header_value(value: &str, field: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| Error::Config(format!("Pinata '{}' contains invalid characters", field)))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Turn a non-success status into an error
fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    match response.status {
        _ if response.is_success() => Ok(response),
        401 => Err(Error::Authentication("Invalid Pinata API key or secret".to_string())),
        403 => Err(Error::Authentication(
            "Pinata key lacks permission for this endpoint".to_string(),
        )),
        status => {
            let message = error_message(&response);
            warn!(status, message = %message, "Pinata rejected the request");
            Err(Error::Service { status, message })
        }
    }
}

/// Extract Pinata's error description, falling back to the raw body
fn error_message(response: &HttpResponse) -> String {
    let parsed: Option<serde_json::Value> = response.json().ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    match error {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(obj) => obj
            .get("details")
            .or_else(|| obj.get("reason"))
            .and_then(|d| d.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| obj.to_string()),
        None => response.text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::files::SourceFile;
    use crate::pinner::has_right_format;
    use crate::transport::PartBody;
    use bytes::Bytes;
    use futures::stream::{self, BoxStream, StreamExt};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Clone)]
    enum Sent {
        Multipart { url: String, headers: HeaderMap, upload: MultipartUpload },
        Json { url: String, headers: HeaderMap, body: serde_json::Value },
    }

    enum Reply {
        Respond(u16, &'static str),
        Fail,
    }

    struct FakeTransport {
        reply: Reply,
        sent: Mutex<Vec<Sent>>,
    }

    impl FakeTransport {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn ok() -> Arc<Self> {
            Self::new(Reply::Respond(200, r#"{"IpfsHash":"QmHash","PinSize":42}"#))
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        fn answer(&self) -> Result<HttpResponse> {
            match self.reply {
                Reply::Respond(status, body) => Ok(HttpResponse::new(status, body)),
                Reply::Fail => Err(Error::Network("connection reset".to_string())),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn post_multipart(
            &self,
            url: &str,
            headers: &HeaderMap,
            upload: MultipartUpload,
        ) -> Result<HttpResponse> {
            self.sent.lock().unwrap().push(Sent::Multipart {
                url: url.to_string(),
                headers: headers.clone(),
                upload,
            });
            self.answer()
        }

        async fn post_json(
            &self,
            url: &str,
            headers: &HeaderMap,
            body: &serde_json::Value,
        ) -> Result<HttpResponse> {
            self.sent.lock().unwrap().push(Sent::Json {
                url: url.to_string(),
                headers: headers.clone(),
                body: body.clone(),
            });
            self.answer()
        }
    }

    struct FakeFiles {
        files: Vec<SourceFile>,
        fail: bool,
    }

    impl FakeFiles {
        fn with(paths: &[&str]) -> Arc<Self> {
            let files = paths
                .iter()
                .map(|p| SourceFile {
                    relative_path: p.to_string(),
                    content: Bytes::from(format!("content of {}", p)),
                })
                .collect();
            Arc::new(Self { files, fail: false })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                files: Vec::new(),
                fail: true,
            })
        }
    }

    impl FileSource for FakeFiles {
        fn files(&self, root: &Path) -> BoxStream<'static, Result<SourceFile>> {
            if self.fail {
                let err = Error::Walk {
                    path: root.to_path_buf(),
                    message: "permission denied".to_string(),
                };
                return stream::iter(vec![Err(err)]).boxed();
            }
            stream::iter(self.files.clone().into_iter().map(Ok)).boxed()
        }
    }

    fn pinner(transport: Arc<FakeTransport>, files: Arc<FakeFiles>) -> PinataPinner {
        PinataPinner::with_parts(transport, files)
    }

    async fn built(transport: Arc<FakeTransport>, files: Arc<FakeFiles>) -> (PinataPinner, PinataApi) {
        let pinata = pinner(transport, files);
        let api = pinata
            .builder(PinataOptions::new("apiKey", "secretApiKey"))
            .await
            .unwrap();
        (pinata, api)
    }

    #[test]
    fn test_pinata_has_right_format() {
        let pinata = pinner(FakeTransport::ok(), FakeFiles::with(&["dir/a"]));
        assert!(has_right_format(&pinata));
        assert_eq!(pinata.name(), "Pinata");
        assert_eq!(pinata.slug(), "pinata");
        assert_eq!(pinata.base_url(), DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn test_builder_rejects_missing_options_without_network() {
        let transport = FakeTransport::ok();
        let pinata = pinner(transport.clone(), FakeFiles::with(&["dir/a"]));

        let cases = vec![
            PinataOptions {
                api_key: Some("somewhere".to_string()),
                secret_api_key: None,
            },
            PinataOptions {
                api_key: None,
                secret_api_key: Some("secret".to_string()),
            },
            PinataOptions::default(),
            PinataOptions::new("", "secret"),
            PinataOptions::new("key", "   "),
        ];

        for options in cases {
            let err = pinata.builder(options).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config);
        }
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_builder_rejects_unencodable_key() {
        let pinata = pinner(FakeTransport::ok(), FakeFiles::with(&["dir/a"]));
        let err = pinata
            .builder(PinataOptions::new("bad\nkey", "secret"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_builder_succeeds_with_all_options() {
        let pinata = pinner(FakeTransport::ok(), FakeFiles::with(&["dir/a"]));
        let api = assert_ok!(pinata.builder(PinataOptions::new("k", "s")).await);

        assert_eq!(api.headers().get(API_KEY_HEADER).unwrap(), "k");
        assert_eq!(api.headers().get(SECRET_API_KEY_HEADER).unwrap(), "s");
        assert!(api.headers().get(SECRET_API_KEY_HEADER).unwrap().is_sensitive());
    }

    #[tokio::test]
    async fn test_pin_dir_returns_hash() {
        let transport = FakeTransport::ok();
        let (pinata, api) = built(
            transport.clone(),
            FakeFiles::with(&["dir/index.html", "dir/css/app.css"]),
        )
        .await;

        let cid = pinata.pin_dir(&api, Path::new("dir"), None).await.unwrap();
        assert_eq!(cid, "QmHash");

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Sent::Multipart { url, headers, upload } => {
                assert_eq!(url, "https://api.pinata.cloud/pinning/pinFileToIPFS");
                assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "apiKey");
                assert_eq!(upload.file_count(), 2);
                match &upload.parts()[0].body {
                    PartBody::File { file_name, content_type, .. } => {
                        assert_eq!(file_name, "dir/index.html");
                        assert_eq!(content_type, "text/html");
                    }
                    other => panic!("unexpected part {:?}", other),
                }
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pin_dir_sends_tag_as_metadata() {
        let transport = FakeTransport::ok();
        let (pinata, api) = built(transport.clone(), FakeFiles::with(&["dir/a.txt"])).await;

        pinata
            .pin_dir(&api, Path::new("dir"), Some("release-1"))
            .await
            .unwrap();

        match &transport.sent()[0] {
            Sent::Multipart { upload, .. } => {
                let meta = upload
                    .parts()
                    .iter()
                    .find(|p| p.name == "pinataMetadata")
                    .expect("metadata part");
                assert_eq!(meta.body, PartBody::Text(r#"{"name":"release-1"}"#.to_string()));
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pin_cid_succeeds_without_cid() {
        let transport = FakeTransport::new(Reply::Respond(200, "{}"));
        let (pinata, api) = built(transport.clone(), FakeFiles::with(&[])).await;

        assert_ok!(pinata.pin_cid(&api, None, None).await);

        match &transport.sent()[0] {
            Sent::Json { url, body, .. } => {
                assert_eq!(url, "https://api.pinata.cloud/pinning/pinByHash");
                assert_eq!(body, &serde_json::json!({ "hashToPin": null }));
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pin_cid_sends_hash_and_tag() {
        let transport = FakeTransport::new(Reply::Respond(200, "{}"));
        let (pinata, api) = built(transport.clone(), FakeFiles::with(&[])).await;

        pinata
            .pin_cid(&api, Some("QmExisting"), Some("backup"))
            .await
            .unwrap();

        match &transport.sent()[0] {
            Sent::Json { headers, body, .. } => {
                assert_eq!(headers.get(SECRET_API_KEY_HEADER).unwrap(), "secretApiKey");
                assert_eq!(
                    body,
                    &serde_json::json!({
                        "hashToPin": "QmExisting",
                        "pinataMetadata": { "name": "backup" }
                    })
                );
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pin_dir_fails_on_transport_failure() {
        let (pinata, api) = built(FakeTransport::new(Reply::Fail), FakeFiles::with(&["dir/a"])).await;
        let err = pinata.pin_dir(&api, Path::new("dir"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_pin_cid_fails_on_transport_failure() {
        let (pinata, api) = built(FakeTransport::new(Reply::Fail), FakeFiles::with(&[])).await;
        let err = pinata.pin_cid(&api, None, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_pin_dir_fails_on_file_system_failure_before_network() {
        let transport = FakeTransport::ok();
        let (pinata, api) = built(transport.clone(), FakeFiles::failing()).await;

        let err = pinata.pin_dir(&api, Path::new("dir"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_pin_dir_rejects_empty_directory() {
        let transport = FakeTransport::ok();
        let (pinata, api) = built(transport.clone(), FakeFiles::with(&[])).await;

        let err = pinata.pin_dir(&api, Path::new("empty"), None).await.unwrap_err();
        assert!(matches!(err, Error::EmptyDirectory(ref p) if p == &PathBuf::from("empty")));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_pin_dir_rejects_response_without_hash() {
        for body in [r#"{}"#, r#"{"IpfsHash":""}"#, r#"{"PinSize":1}"#, "null", "<html>"] {
            let transport = FakeTransport::new(Reply::Respond(200, body));
            let (pinata, api) = built(transport, FakeFiles::with(&["dir/a"])).await;

            let err = pinata.pin_dir(&api, Path::new("dir"), None).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedResponse, "body {}", body);
        }
    }

    #[tokio::test]
    async fn test_rejected_status_is_transport_error() {
        let transport = FakeTransport::new(Reply::Respond(401, r#"{"error":"Invalid API Keys"}"#));
        let (pinata, api) = built(transport, FakeFiles::with(&["dir/a"])).await;
        let err = pinata.pin_dir(&api, Path::new("dir"), None).await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
        assert_eq!(err.kind(), ErrorKind::Transport);

        let transport = FakeTransport::new(Reply::Respond(
            400,
            r#"{"error":{"reason":"INVALID_CID","details":"hashToPin is not a valid CID"}}"#,
        ));
        let (pinata, api) = built(transport, FakeFiles::with(&[])).await;
        let err = assert_err!(pinata.pin_cid(&api, Some("nope"), None).await);
        match err {
            Error::Service { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "hashToPin is not a valid CID");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handle_is_shared_across_concurrent_pins() {
        let transport = FakeTransport::ok();
        let (pinata, api) = built(transport.clone(), FakeFiles::with(&["dir/a"])).await;

        let (a, b, c) = tokio::join!(
            pinata.pin_dir(&api, Path::new("dir"), None),
            pinata.pin_dir(&api, Path::new("dir"), Some("tagged")),
            pinata.pin_cid(&api, Some("QmHash"), None),
        );

        assert_eq!(a.unwrap(), "QmHash");
        assert_eq!(b.unwrap(), "QmHash");
        assert!(c.is_ok());
        assert_eq!(transport.sent().len(), 3);
    }

    #[test]
    fn test_options_from_toml() {
        let options: PinataOptions =
            toml::from_str("api_key = \"k\"\nsecret_api_key = \"s\"").unwrap();
        assert_eq!(options.api_key.as_deref(), Some("k"));

        let unknown = toml::from_str::<PinataOptions>("api_key = \"k\"\njwt = \"x\"");
        assert!(unknown.is_err());
    }

    #[test]
    fn test_options_debug_hides_secrets() {
        let rendered = format!("{:?}", PinataOptions::new("visible-key", "visible-secret"));
        assert!(!rendered.contains("visible-key"));
        assert!(!rendered.contains("visible-secret"));
    }

    #[tokio::test]
    async fn test_pin_dir_end_to_end_over_http() {
        use wiremock::matchers::{body_string_contains, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pinning/pinFileToIPFS"))
            .and(header("pinata_api_key", "k"))
            .and(header("pinata_secret_api_key", "s"))
            .and(body_string_contains("site/index.html"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "IpfsHash": "QmSite" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let site = tmp.path().join("site");
        std::fs::create_dir_all(&site).unwrap();
        std::fs::write(site.join("index.html"), "<h1>hello</h1>").unwrap();

        let pinata = PinataPinner::new(Some(Duration::from_secs(10)))
            .unwrap()
            .with_base_url(format!("{}/", server.uri()));
        let api = pinata.builder(PinataOptions::new("k", "s")).await.unwrap();

        assert_eq!(pinata.pin_dir(&api, &site, None).await.unwrap(), "QmSite");
    }
}
