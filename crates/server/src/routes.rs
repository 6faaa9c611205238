use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use scrivener_assist::{EditGoal, EmailRequest, SummaryLength};
use scrivener_ocr::{OcrBackend, ReceiptPipeline};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;

pub type SharedPipeline = Arc<ReceiptPipeline<Box<dyn OcrBackend>>>;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: SharedPipeline,
    /// Name of the recognizer backend, reported by `/api/about`.
    pub engine: &'static str,
}

pub struct RouterOptions {
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
}

pub fn router(state: AppState, options: &RouterOptions) -> Router {
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/about", get(about))
        .route("/api/email", post(email))
        .route("/api/summary", post(summary))
        .route("/api/edit", post(edit))
        .route("/api/documents/extract", post(extract_document))
        .route("/api/ocr", post(ocr))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(options.max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    let origins: Vec<HeaderValue> = options
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    if origins.is_empty() {
        return app;
    }
    app.layer(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

// ── Output format ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    /// Plain-text download.
    Txt,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FormatQuery {
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct TextResponse {
    text: String,
}

fn text_output(format: OutputFormat, file_name: &str, text: String) -> Response {
    match format {
        OutputFormat::Json => Json(TextResponse { text }).into_response(),
        OutputFormat::Txt => attachment(file_name, text),
    }
}

fn attachment(file_name: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        body,
    )
        .into_response()
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
struct About {
    name: &'static str,
    version: &'static str,
    features: [&'static str; 4],
    ocr_engine: &'static str,
    ocr_cleaning: bool,
}

async fn about(State(state): State<AppState>) -> Json<About> {
    Json(About {
        name: "Scrivener",
        version: env!("CARGO_PKG_VERSION"),
        features: [
            "Email drafting",
            "Document summarization",
            "Editorial support",
            "Image to text (receipts, invoices, notes)",
        ],
        ocr_engine: state.engine,
        ocr_cleaning: state.pipeline.cleaning_enabled(),
    })
}

async fn email(
    Query(q): Query<FormatQuery>,
    Json(req): Json<EmailRequest>,
) -> Result<Response, ApiError> {
    let text = scrivener_assist::draft_email(&req)?;
    info!(tone = %req.tone, "Email drafted");
    Ok(text_output(q.format, "email_draft.txt", text))
}

#[derive(Debug, Deserialize)]
struct SummaryRequest {
    text: String,
    #[serde(default)]
    length: SummaryLength,
}

async fn summary(
    Query(q): Query<FormatQuery>,
    Json(req): Json<SummaryRequest>,
) -> Result<Response, ApiError> {
    let text = scrivener_assist::summarize(&req.text, req.length)?;
    info!(length = ?req.length, input_chars = req.text.len(), "Summary generated");
    Ok(text_output(q.format, "summary.txt", text))
}

#[derive(Debug, Deserialize)]
struct EditRequest {
    text: String,
    goal: EditGoal,
}

async fn edit(
    Query(q): Query<FormatQuery>,
    Json(req): Json<EditRequest>,
) -> Result<Response, ApiError> {
    let text = scrivener_assist::editorial_support(&req.text, req.goal)?;
    info!(goal = ?req.goal, "Text edited");
    Ok(text_output(q.format, "edited_text.txt", text))
}

#[derive(Debug, Serialize)]
struct ExtractedDocument {
    file_name: String,
    text: String,
}

async fn extract_document(multipart: Multipart) -> Result<Json<ExtractedDocument>, ApiError> {
    let (file_name, data) = read_upload(multipart).await?;
    let name = file_name.clone();
    let text =
        tokio::task::spawn_blocking(move || scrivener_assist::extract_text(&name, &data)).await??;
    info!(file_name = %file_name, chars = text.len(), "Document extracted");
    Ok(Json(ExtractedDocument { file_name, text }))
}

async fn ocr(
    State(state): State<AppState>,
    Query(q): Query<FormatQuery>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let (file_name, data) = read_upload(multipart).await?;
    let pipeline = state.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.scan_bytes(&data)).await??;
    info!(file_name = %file_name, failed = outcome.is_failure(), "Receipt scanned");

    Ok(match q.format {
        OutputFormat::Json => Json(outcome).into_response(),
        OutputFormat::Txt => attachment("ocr_extracted.txt", outcome.report),
    })
}

/// First multipart field named `file`.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await?;
        return Ok((file_name, data.to_vec()));
    }
    Err(ApiError::BadRequest("missing multipart field 'file'".to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use scrivener_ocr::{MockRecognizer, UnavailableRecognizer, WARNING_MARKER};
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "scrivener-test-boundary";

    fn app_with(recognizer: Box<dyn OcrBackend>) -> Router {
        let state = AppState { pipeline: Arc::new(ReceiptPipeline::new(recognizer)), engine: "mock" };
        router(
            state,
            &RouterOptions { max_upload_bytes: 1024 * 1024, allowed_origins: vec![] },
        )
    }

    fn app() -> Router {
        app_with(Box::new(MockRecognizer::new(
            "WALMART STORE\n01/15/2024\nMilk 2.99\nBread 1.50\nTotal $4.49",
        )))
    }

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let resp = app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn about_reports_engine() {
        let resp = app()
            .oneshot(Request::builder().uri("/api/about").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["ocr_engine"], "mock");
        assert_eq!(json["ocr_cleaning"], false);
        assert_eq!(json["features"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn email_is_drafted() {
        let req = json_request(
            "/api/email",
            serde_json::json!({
                "subject": "Invoice 42",
                "recipient": "Ana",
                "tone": "apologetic",
                "details": "The shipment is late."
            }),
        );
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_json(resp).await["text"].as_str().unwrap().to_string();
        assert!(text.starts_with("Subject: Invoice 42\n\nDear Ana,"));
        assert!(text.contains("sincere apologies"));
    }

    #[tokio::test]
    async fn email_missing_field_is_bad_request() {
        let req = json_request(
            "/api/email",
            serde_json::json!({ "subject": "", "recipient": "Ana", "details": "x" }),
        );
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Missing required field: subject");
    }

    #[tokio::test]
    async fn email_download_as_text() {
        let req = json_request(
            "/api/email?format=txt",
            serde_json::json!({ "subject": "Hi", "recipient": "Bo", "details": "Lunch?" }),
        );
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"email_draft.txt\""
        );
        assert!(body_text(resp).await.contains("Dear Bo,"));
    }

    #[tokio::test]
    async fn summary_truncates() {
        let req = json_request(
            "/api/summary",
            serde_json::json!({ "text": "A. B. C. D", "length": "very_short" }),
        );
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(body_json(resp).await["text"], "A. B...");
    }

    #[tokio::test]
    async fn summary_of_blank_text_is_rejected() {
        let req = json_request("/api/summary", serde_json::json!({ "text": "   " }));
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn edit_applies_goal() {
        let req = json_request(
            "/api/edit",
            serde_json::json!({ "text": "i dont know", "goal": "grammar" }),
        );
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(body_json(resp).await["text"], "I don't know");
    }

    #[tokio::test]
    async fn document_text_is_extracted() {
        let req = multipart_request("/api/documents/extract", "file", "notes.txt", b"  quarterly numbers \n");
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["file_name"], "notes.txt");
        assert_eq!(json["text"], "quarterly numbers");
    }

    #[tokio::test]
    async fn unsupported_document_is_415() {
        let req = multipart_request("/api/documents/extract", "file", "notes.odt", b"x");
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn missing_file_field_is_bad_request() {
        let req = multipart_request("/api/ocr", "attachment", "r.png", &tiny_png());
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ocr_returns_report_and_fields() {
        let req = multipart_request("/api/ocr", "file", "receipt.png", &tiny_png());
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["fields"]["total"], "4.49");
        assert_eq!(json["fields"]["date"], "01/15/2024");
        assert_eq!(json["fields"]["items"], serde_json::json!(["Milk 2.99", "Bread 1.50"]));
        assert_eq!(json["total_amount"], "4.49");
        assert!(json["report"].as_str().unwrap().contains("💰 Total: $4.49"));
    }

    #[tokio::test]
    async fn ocr_download_is_the_report() {
        let req = multipart_request("/api/ocr?format=txt", "file", "receipt.png", &tiny_png());
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"ocr_extracted.txt\""
        );
        assert!(body_text(resp).await.contains("1. Milk 2.99"));
    }

    #[tokio::test]
    async fn ocr_undecodable_image_is_422() {
        let req = multipart_request("/api/ocr", "file", "receipt.png", b"not an image");
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn ocr_engine_failure_degrades_to_warning() {
        let req = multipart_request("/api/ocr", "file", "receipt.png", &tiny_png());
        let resp = app_with(Box::new(UnavailableRecognizer)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert!(json["fields"].is_null());
        assert!(json["total_amount"].is_null());
        assert!(json["report"].as_str().unwrap().starts_with(WARNING_MARKER));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let state = AppState {
            pipeline: Arc::new(ReceiptPipeline::new(Box::new(UnavailableRecognizer) as Box<dyn OcrBackend>)),
            engine: "none",
        };
        let app = router(state, &RouterOptions { max_upload_bytes: 64, allowed_origins: vec![] });
        let req = multipart_request("/api/documents/extract", "file", "big.txt", &[b'a'; 4096]);
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn cors_headers_for_allowed_origin() {
        let state = AppState {
            pipeline: Arc::new(ReceiptPipeline::new(Box::new(UnavailableRecognizer) as Box<dyn OcrBackend>)),
            engine: "none",
        };
        let app = router(
            state,
            &RouterOptions {
                max_upload_bytes: 1024,
                allowed_origins: vec!["http://localhost:5173".into()],
            },
        );
        let req = Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:5173");
    }
}
