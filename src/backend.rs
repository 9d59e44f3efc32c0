//! Client for the solving backend.
//!
//! The backend exposes two multipart endpoints: `/latex`, which extracts a
//! formula from an image, and `/analyze`, which solves it. We make a single
//! attempt per request, and translate failures into messages that make sense
//! to the person holding the camera.

use std::{env, error, fmt};

use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;

use crate::{
    image_input::ImageInput,
    prelude::*,
    problem::{FormulaResponse, SolvedProblem},
};

/// Environment variable holding the backend's base URL.
pub const API_BASE_ENV_VAR: &str = "MATHSNAP_API_BASE";

/// Base URL to use when [`API_BASE_ENV_VAR`] is not set.
pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

/// An error talking to the backend. The [`fmt::Display`] output is meant for
/// end users.
#[derive(Debug)]
pub enum BackendError {
    /// We never got a response.
    Connect {
        api_base: String,
        source: reqwest::Error,
    },

    /// The backend returned an error status.
    Status {
        status: StatusCode,
        body: ErrorBody,
    },

    /// The backend succeeded, but we couldn't parse what it sent.
    Decode { source: reqwest::Error },

    /// We couldn't build the request.
    Request { source: reqwest::Error },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Connect { api_base, .. } => write!(
                f,
                "Unable to connect to the backend server. Check that it is running at {api_base}"
            ),
            BackendError::Status { status, body } => {
                write!(f, "{}", status_message(*status, body))
            }
            BackendError::Decode { .. } => {
                write!(f, "The backend returned an unreadable response.")
            }
            BackendError::Request { source } => {
                write!(f, "Could not build the backend request: {source}")
            }
        }
    }
}

impl error::Error for BackendError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            BackendError::Connect { source, .. }
            | BackendError::Decode { source }
            | BackendError::Request { source } => Some(source),
            BackendError::Status { .. } => None,
        }
    }
}

/// The useful parts of a backend error response. Either field may be
/// missing, and a body that isn't JSON leaves both empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub detail: Option<String>,
}

impl ErrorBody {
    /// Pull `message` and `detail` out of a JSON error response. Non-string
    /// values (such as validation error lists) are ignored.
    pub fn from_json(body: &Value) -> Self {
        let text = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        Self {
            message: text("message"),
            detail: text("detail"),
        }
    }

    /// `message`, falling back to `detail`.
    fn message_or_detail(&self) -> Option<&str> {
        self.message.as_deref().or(self.detail.as_deref())
    }

    /// `detail`, falling back to `message`.
    fn detail_or_message(&self) -> Option<&str> {
        self.detail.as_deref().or(self.message.as_deref())
    }
}

/// The user-facing message for an error status.
fn status_message(status: StatusCode, body: &ErrorBody) -> String {
    let or = |fallback: &str| {
        body.message_or_detail()
            .unwrap_or(fallback)
            .to_owned()
    };
    match status {
        StatusCode::BAD_REQUEST => or("Invalid request. Check your image."),
        StatusCode::PAYLOAD_TOO_LARGE => {
            "The image is too large. Please use a smaller image.".to_owned()
        }
        StatusCode::UNPROCESSABLE_ENTITY => {
            or("Could not detect a math equation in the image.")
        }
        StatusCode::TOO_MANY_REQUESTS => {
            "Too many requests. Please wait a moment.".to_owned()
        }
        StatusCode::INTERNAL_SERVER_ERROR => match body.detail_or_message() {
            Some(detail) if is_configuration_problem(detail) => format!(
                "Configuration error: {detail}. Check the API keys in the backend's .env file"
            ),
            Some(detail) => detail.to_owned(),
            None => "Server error. Please try again later.".to_owned(),
        },
        _ => or("An error occurred."),
    }
}

/// Does a server error look like missing keys or credentials?
fn is_configuration_problem(detail: &str) -> bool {
    ["credentials", "configur", "API"]
        .iter()
        .any(|needle| detail.contains(needle))
}

/// Client for the solving backend.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: reqwest::Client,
    api_base: String,
}

impl BackendClient {
    /// Create a client using [`API_BASE_ENV_VAR`], or [`DEFAULT_API_BASE`].
    pub fn from_env() -> Self {
        let api_base = env::var(API_BASE_ENV_VAR)
            .ok()
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_owned());
        let client = Self::new(api_base);
        debug!(api_base = client.api_base(), "Using backend");
        client
    }

    /// Create a client for the backend at `api_base`.
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim().trim_end_matches('/').to_owned();
        Self {
            client: reqwest::Client::new(),
            api_base,
        }
    }

    /// The base URL we send requests to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Extract a formula from an image.
    #[instrument(level = "debug", skip_all, fields(image = %image.file_name))]
    pub async fn extract_formula(
        &self,
        image: &ImageInput,
    ) -> Result<FormulaResponse, BackendError> {
        let form = Form::new().part("image", image_part(image)?);
        self.post_form("latex", form).await
    }

    /// Solve the problem in an image. If `latex` is provided, the backend
    /// uses it instead of extracting its own formula.
    #[instrument(level = "debug", skip_all, fields(image = %image.file_name))]
    pub async fn analyze(
        &self,
        image: &ImageInput,
        latex: Option<&str>,
    ) -> Result<SolvedProblem, BackendError> {
        let mut form = Form::new().part("image", image_part(image)?);
        if let Some(latex) = latex.map(str::trim).filter(|l| !l.is_empty()) {
            form = form.text("latex", latex.to_owned());
        }
        self.post_form("analyze", form).await
    }

    /// POST a multipart form to `endpoint` and decode the JSON response.
    async fn post_form<T>(&self, endpoint: &str, form: Form) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_base, endpoint);
        debug!(%url, "Sending request to backend");
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| {
                if source.is_builder() {
                    BackendError::Request { source }
                } else {
                    BackendError::Connect {
                        api_base: self.api_base.clone(),
                        source,
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .json::<Value>()
                .await
                .ok()
                .map(|body| ErrorBody::from_json(&body))
                .unwrap_or_default();
            warn!(%status, ?body, "Backend returned an error");
            return Err(BackendError::Status { status, body });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| BackendError::Decode { source })
    }
}

/// The `image` part of a request.
fn image_part(image: &ImageInput) -> Result<Part, BackendError> {
    Part::bytes(image.data.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.mime_type)
        .map_err(|source| BackendError::Request { source })
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt as _, AsyncWriteExt as _},
        net::TcpListener,
    };

    use super::*;

    fn png() -> ImageInput {
        ImageInput::from_bytes(None, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec(), 1024)
            .unwrap()
    }

    fn body(message: Option<&str>, detail: Option<&str>) -> ErrorBody {
        ErrorBody {
            message: message.map(str::to_owned),
            detail: detail.map(str::to_owned),
        }
    }

    /// Answer a single HTTP request with `status` and a JSON `body`, and
    /// return the base URL to use, plus a handle yielding the raw request.
    async fn serve_once(
        status: &str,
        body: &str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}/api/"), handle)
    }

    /// Have we read the headers and a `content-length` body?
    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    #[test]
    fn maps_statuses_to_user_messages() {
        let cases = [
            (400, body(None, None), "Invalid request. Check your image."),
            (400, body(None, Some("Le fichier est vide.")), "Le fichier est vide."),
            (413, body(Some("ignored"), None), "The image is too large. Please use a smaller image."),
            (422, body(None, None), "Could not detect a math equation in the image."),
            (422, body(Some("No math here"), None), "No math here"),
            (429, body(None, None), "Too many requests. Please wait a moment."),
            (500, body(None, None), "Server error. Please try again later."),
            (500, body(None, Some("Solver crashed")), "Solver crashed"),
            (
                500,
                body(None, Some("Missing credentials")),
                "Configuration error: Missing credentials. Check the API keys in the backend's .env file",
            ),
            (503, body(None, None), "An error occurred."),
            (503, body(Some("Down for maintenance"), None), "Down for maintenance"),
        ];
        for (status, body, expected) in cases {
            let err = BackendError::Status {
                status: StatusCode::from_u16(status).unwrap(),
                body,
            };
            assert_eq!(err.to_string(), expected, "status {status}");
        }
    }

    #[test]
    fn parses_error_bodies() {
        let parsed = ErrorBody::from_json(&json!({ "detail": "bad image" }));
        assert_eq!(parsed, body(None, Some("bad image")));
        let parsed = ErrorBody::from_json(&json!({ "detail": [{ "loc": ["image"] }] }));
        assert_eq!(parsed, ErrorBody::default());
        let parsed = ErrorBody::from_json(&json!("oops"));
        assert_eq!(parsed, ErrorBody::default());
    }

    #[test]
    fn normalizes_the_base_url() {
        let client = BackendClient::new(" http://example.com/api/ ");
        assert_eq!(client.api_base(), "http://example.com/api");
    }

    #[tokio::test]
    async fn reports_connection_failures() {
        // Grab a free port, then close it again.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = BackendClient::new(format!("http://127.0.0.1:{port}/api"));
        let err = client.extract_formula(&png()).await.unwrap_err();
        assert!(matches!(err, BackendError::Connect { .. }));
        assert!(
            err.to_string()
                .starts_with("Unable to connect to the backend server.")
        );
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}/api")));
    }

    #[tokio::test]
    async fn extracts_a_formula() {
        let (base, server) =
            serve_once("200 OK", r#"{"latex": "x^2 = 4", "confidence": 0.93}"#).await;
        let client = BackendClient::new(base);
        let response = client.extract_formula(&png()).await.unwrap();
        assert_eq!(response.formula(), "x^2 = 4");
        assert_eq!(response.confidence, 0.93);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/latex "));
        assert!(request.contains("name=\"image\""));
        assert!(request.contains("filename=\"image.png\""));
    }

    #[tokio::test]
    async fn sends_confirmed_latex_when_analyzing() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"problem": "x^2=4", "solution": "x=2", "steps": null}"#,
        )
        .await;
        let client = BackendClient::new(base);
        let problem = client.analyze(&png(), Some("x^2=4")).await.unwrap();
        assert_eq!(problem.solution, "x=2");
        assert!(problem.steps.is_empty());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/analyze "));
        assert!(request.contains("name=\"latex\""));
    }

    #[tokio::test]
    async fn reports_configuration_errors() {
        let (base, _server) = serve_once(
            "500 Internal Server Error",
            r#"{"detail": "Invalid API key"}"#,
        )
        .await;
        let err = BackendClient::new(base)
            .analyze(&png(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                ..
            }
        ));
        assert!(err.to_string().starts_with("Configuration error: Invalid API key."));
    }

    #[tokio::test]
    async fn reports_unreadable_responses() {
        let (base, _server) = serve_once("200 OK", "not json").await;
        let err = BackendClient::new(base)
            .extract_formula(&png())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Decode { .. }));
        assert_eq!(err.to_string(), "The backend returned an unreadable response.");
    }
}
