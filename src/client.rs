//! Prediction service client
//!
//! One request per analysis: the selected file goes up as a multipart form
//! field and the JSON reply is classified into a result or an error.

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

use crate::config::AppConfig;

/// A successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub role: String,
    pub match_percentage: f64,
    pub ai_feedback: String,
    /// Name the server stored the upload under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The server answered with an `error` field
    #[error("{0}")]
    Application(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl AnalyzeError {
    /// Anything that is not an application error is a transport failure
    pub fn is_transport(&self) -> bool {
        !matches!(self, AnalyzeError::Application(_))
    }
}

#[derive(Debug, Clone)]
pub struct PredictClient {
    http: reqwest::Client,
    url: String,
    field_name: String,
}

impl PredictClient {
    pub fn new(url: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            field_name: field_name.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.predict_url(), config.field_name.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Upload `path` and wait for the prediction. No retry, no timeout.
    pub async fn predict(&self, path: &Path) -> Result<AnalysisResult, AnalyzeError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());

        tracing::info!("Uploading {} ({} bytes) to {}", file_name, bytes.len(), self.url);

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(guess_mime(path))?;
        let form = Form::new().part(self.field_name.clone(), part);

        let response = self.http.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("Prediction service answered {} ({} bytes)", status, body.len());

        // The body is read as JSON whatever the status: errors come back as
        // 400 with an `error` field.
        let value: Value = serde_json::from_str(&body).map_err(|e| {
            AnalyzeError::InvalidResponse(format!("HTTP {}: {}", status, e))
        })?;

        classify_response(value)
    }
}

/// Sort a decoded reply into a result or an application error
pub fn classify_response(value: Value) -> Result<AnalysisResult, AnalyzeError> {
    if let Some(error) = value.get("error").filter(|e| is_truthy(e)) {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(AnalyzeError::Application(message));
    }

    serde_json::from_value(value).map_err(|e| AnalyzeError::InvalidResponse(e.to_string()))
}

/// Loose truthiness: `null`, `false`, `0` and `""` do not count as an error
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// MIME type for the upload part, from the extension only
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("doc") => "application/msword",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Multipart, http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_classify_success() {
        let result = classify_response(json!({
            "role": "HR",
            "match_percentage": 42.5,
            "ai_feedback": "ok",
            "filename": "cv.txt"
        }))
        .unwrap();

        assert_eq!(result.role, "HR");
        assert_eq!(result.match_percentage, 42.5);
        assert_eq!(result.filename.as_deref(), Some("cv.txt"));
    }

    #[test]
    fn test_classify_error_field() {
        let err = classify_response(json!({ "error": "No file uploaded" })).unwrap_err();
        assert!(matches!(err, AnalyzeError::Application(ref m) if m == "No file uploaded"));
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "No file uploaded");
    }

    #[test]
    fn test_classify_error_wins_over_fields() {
        let err = classify_response(json!({
            "role": "HR",
            "match_percentage": 10,
            "ai_feedback": "",
            "error": "quota exceeded"
        }))
        .unwrap_err();
        assert!(matches!(err, AnalyzeError::Application(_)));
    }

    #[test]
    fn test_classify_falsy_error_is_ignored() {
        for error in [json!(null), json!(""), json!(false), json!(0)] {
            let result = classify_response(json!({
                "role": "Sales",
                "match_percentage": 10,
                "ai_feedback": "",
                "error": error
            }));
            assert!(result.is_ok());
        }
    }

    #[test]
    fn test_classify_non_string_error() {
        let err = classify_response(json!({ "error": 500 })).unwrap_err();
        assert_eq!(err.to_string(), "500");
    }

    #[test]
    fn test_classify_missing_fields_is_transport() {
        let err = classify_response(json!({ "role": "HR" })).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("cv.PDF")), "application/pdf");
        assert_eq!(guess_mime(Path::new("notes.txt")), "text/plain");
        assert_eq!(guess_mime(Path::new("noext")), "application/octet-stream");
    }

    async fn fake_predict(mut multipart: Multipart) -> (StatusCode, Json<Value>) {
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() != Some("resume") {
                continue;
            }
            let name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap_or_default();
            if name.is_empty() {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": "No file selected" })));
            }
            return (
                StatusCode::OK,
                Json(json!({
                    "role": "Python Developer",
                    "match_percentage": 63.21,
                    "ai_feedback": format!("**Size**: {}", bytes.len()),
                    "filename": name
                })),
            );
        }
        (StatusCode::BAD_REQUEST, Json(json!({ "error": "No file uploaded" })))
    }

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn resume_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("resume")
            .suffix(".txt")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_predict_uploads_resume_field() {
        let base = spawn_server(Router::new().route("/predict", post(fake_predict))).await;
        let file = resume_file("python django flask");

        let client = PredictClient::new(format!("{}/predict", base), "resume");
        let result = client.predict(file.path()).await.unwrap();

        let expected_name = file.path().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(result.role, "Python Developer");
        assert_eq!(result.filename, Some(expected_name));
        assert_eq!(result.ai_feedback, "**Size**: 19");
    }

    #[tokio::test]
    async fn test_predict_wrong_field_gets_application_error() {
        let base = spawn_server(Router::new().route("/predict", post(fake_predict))).await;
        let file = resume_file("x");

        let client = PredictClient::new(format!("{}/predict", base), "document");
        let err = client.predict(file.path()).await.unwrap_err();
        assert!(matches!(err, AnalyzeError::Application(ref m) if m == "No file uploaded"));
    }

    #[tokio::test]
    async fn test_predict_non_json_is_transport() {
        let router = Router::new().route("/predict", post(|| async { "<html>oops</html>" }));
        let base = spawn_server(router).await;
        let file = resume_file("x");

        let client = PredictClient::new(format!("{}/predict", base), "resume");
        let err = client.predict(file.path()).await.unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_predict_missing_file_is_transport() {
        let client = PredictClient::new("http://127.0.0.1:9/predict", "resume");
        let err = client
            .predict(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::Io(_)));
        assert!(err.is_transport());
    }
}
