//! HTTP surface: one `POST` route per effect.
//!
//! Every effect route runs the same pipeline:
//!
//! 1. parse the query string into an [`Effect`](crate::imaging::Effect)
//! 2. read the uploaded image from the multipart body
//! 3. wait for a processing permit
//! 4. decode, apply and encode on the blocking pool
//! 5. answer `200 image/png`
//!
//! Anything that goes wrong becomes an [`ApiError`] with a JSON body.

mod error;

pub use error::ApiError;

use crate::config::{ServiceConfig, effective_jobs};
use crate::effects::{EffectDefaults, EffectInfo, EffectKind, describe_all, parse_effect};
use crate::imaging::{ImageBackend, operations};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, RawQuery, Request, State, multipart::MultipartRejection},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ImageBackend>,
    pub defaults: Arc<EffectDefaults>,
    /// Bounds the number of effects running at once.
    pub jobs: Arc<Semaphore>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(backend: Arc<dyn ImageBackend>, config: &ServiceConfig) -> Self {
        Self {
            backend,
            defaults: Arc::new(config.effect_defaults()),
            jobs: Arc::new(Semaphore::new(effective_jobs(&config.processing))),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}

/// Pull the image out of the multipart body.
///
/// The part named `file` wins; otherwise the first part carrying a filename
/// is used.
async fn read_upload(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    let mut fallback = None;
    while let Some(field) = multipart.next_field().await? {
        let named_file = field.name() == Some("file");
        if !named_file && (fallback.is_some() || field.file_name().is_none()) {
            continue;
        }
        fallback = Some(field.bytes().await?);
        if named_file {
            break;
        }
    }

    let bytes = fallback.ok_or(ApiError::MissingFile)?;
    if bytes.is_empty() {
        return Err(ApiError::EmptyFile);
    }
    Ok(bytes)
}

async fn effect_endpoint(
    kind: EffectKind,
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let effect = parse_effect(kind, raw.as_deref().unwrap_or(""), &state.defaults)?;
    let upload = read_upload(multipart?).await?;

    let permit = state.jobs.clone().acquire_owned().await?;
    let backend = state.backend.clone();
    let processed = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        operations::process(backend.as_ref(), &upload, &effect)
    })
    .await??;

    tracing::info!(
        effect = kind.name(),
        input = %processed.input,
        output = %processed.output,
        "effect applied"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.png\"", kind.name()),
            ),
        ],
        processed.png,
    )
        .into_response())
}

async fn health_endpoint() -> &'static str {
    "ok"
}

async fn effects_endpoint() -> Json<Vec<EffectInfo>> {
    Json(describe_all())
}

async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    tracing::info!(
        "{} {} {} - {:.1}ms",
        method,
        uri.path(),
        response.status().as_u16(),
        elapsed.as_secs_f64() * 1000.0
    );

    response
}

fn effect_route(kind: EffectKind) -> axum::routing::MethodRouter<AppState> {
    post(
        move |state: State<AppState>,
              query: RawQuery,
              multipart: Result<Multipart, MultipartRejection>| {
            effect_endpoint(kind, state, query, multipart)
        },
    )
}

pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;
    let mut router = Router::new()
        .route("/health", get(health_endpoint))
        .route("/effects", get(effects_endpoint));

    for kind in EffectKind::ALL {
        router = router.route(&kind.path(), effect_route(kind));
    }
    // Older clients post to `/remove-bg/` with a trailing slash.
    router = router.route("/remove-bg/", effect_route(EffectKind::RemoveBg));

    router
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn(logging_middleware))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn run_server(
    config: &ServiceConfig,
    backend: Arc<dyn ImageBackend>,
) -> std::io::Result<()> {
    let state = AppState::new(backend, config);
    let jobs = state.jobs.available_permits();
    let app = create_router(state);

    let address = config.server.address();
    let listener = TcpListener::bind(&address).await?;
    tracing::info!(
        "photofx listening on http://{} ({} effects, {} concurrent jobs)",
        listener.local_addr()?,
        EffectKind::ALL.len(),
        jobs
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{BackendError, ColorFilter, Effect};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "photofx-test-boundary";

    fn multipart_body(field: &str, filename: Option<&str>, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"");
        if let Some(name) = filename {
            body.push_str(&format!("; filename=\"{name}\""));
        }
        body.push_str("\r\nContent-Type: application/octet-stream\r\n\r\n");
        let mut body = body.into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(uri: &str, field: &str, filename: Option<&str>, bytes: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field, filename, bytes)))
            .unwrap()
    }

    fn app_with(mock: Arc<MockBackend>, config: &ServiceConfig) -> Router {
        let backend: Arc<dyn ImageBackend> = mock;
        create_router(AppState::new(backend, config))
    }

    fn app(mock: Arc<MockBackend>) -> Router {
        app_with(mock, &ServiceConfig::default())
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_says_ok() {
        let response = app(Arc::new(MockBackend::new()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn effects_lists_every_route() {
        let response = app(Arc::new(MockBackend::new()))
            .oneshot(Request::get("/effects").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let list = json.as_array().unwrap();
        assert_eq!(list.len(), EffectKind::ALL.len());
        assert_eq!(list[0]["path"], "/remove-bg");
        assert!(list.iter().any(|e| e["name"] == "oil-paint"));
    }

    #[tokio::test]
    async fn effect_returns_png_and_runs_pipeline() {
        let mock = Arc::new(MockBackend::new());
        let response = app(mock.clone())
            .oneshot(upload(
                "/filter?filter_type=sepia",
                "file",
                Some("cat.jpg"),
                b"jpegbytes",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");
        assert_eq!(
            response.headers()["content-disposition"],
            "inline; filename=\"filter.png\""
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"\x89PNG mock");

        let ops = mock.get_operations();
        assert_eq!(ops[0], RecordedOp::Decode(9));
        assert_eq!(ops[1], RecordedOp::Apply(Effect::Filter(ColorFilter::Sepia)));
        assert!(matches!(ops[2], RecordedOp::Encode(_)));
    }

    #[tokio::test]
    async fn trailing_slash_remove_bg_is_routed() {
        let mock = Arc::new(MockBackend::new());
        let response = app(mock.clone())
            .oneshot(upload("/remove-bg/", "file", Some("a.png"), b"png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(matches!(
            mock.get_operations()[1],
            RecordedOp::Apply(Effect::RemoveBackground { fit: None, .. })
        ));
    }

    #[tokio::test]
    async fn bad_params_are_rejected_before_decoding() {
        let mock = Arc::new(MockBackend::new());
        let response = app(mock.clone())
            .oneshot(upload("/resize?width=10", "file", Some("a.png"), b"png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("height"));
        assert!(mock.get_operations().is_empty());
    }

    #[tokio::test]
    async fn unknown_param_is_bad_request() {
        let response = app(Arc::new(MockBackend::new()))
            .oneshot(upload("/sketch?radius=3", "file", Some("a.png"), b"png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_file_is_bad_request() {
        let response = app(Arc::new(MockBackend::new()))
            .oneshot(upload("/sketch", "comment", None, b"hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("file"));
    }

    #[tokio::test]
    async fn any_part_with_filename_is_accepted() {
        let mock = Arc::new(MockBackend::new());
        let response = app(mock.clone())
            .oneshot(upload("/sharpen", "image", Some("x.png"), b"abcd"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(mock.get_operations()[0], RecordedOp::Decode(4));
    }

    #[tokio::test]
    async fn empty_file_is_bad_request() {
        let response = app(Arc::new(MockBackend::new()))
            .oneshot(upload("/sketch", "file", Some("a.png"), b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_multipart_body_is_rejected_as_json() {
        let request = Request::builder()
            .method("POST")
            .uri("/sketch")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app(Arc::new(MockBackend::new()))
            .oneshot(request)
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        let json = json_body(response).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn undecodable_upload_is_bad_request() {
        let response = app(Arc::new(MockBackend::failing_decode()))
            .oneshot(upload("/sketch", "file", Some("a.png"), b"junk"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversize_upload_is_payload_too_large() {
        let mut config = ServiceConfig::default();
        config.server.max_upload_bytes = 256;
        let response = app_with(Arc::new(MockBackend::new()), &config)
            .oneshot(upload("/sketch", "file", Some("a.png"), &[7u8; 4096]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn get_on_effect_route_is_method_not_allowed() {
        let response = app(Arc::new(MockBackend::new()))
            .oneshot(Request::get("/sketch").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = app(Arc::new(MockBackend::new()))
            .oneshot(upload("/vignette", "file", Some("a.png"), b"png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    /// Mock that tracks how many `apply` calls overlap.
    #[derive(Default)]
    struct CountingBackend {
        inner: MockBackend,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ImageBackend for CountingBackend {
        fn decode(&self, bytes: &[u8]) -> Result<image::DynamicImage, BackendError> {
            self.inner.decode(bytes)
        }

        fn apply(
            &self,
            image: image::DynamicImage,
            effect: &Effect,
        ) -> Result<image::DynamicImage, BackendError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(40));
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.inner.apply(image, effect)
        }

        fn encode_png(&self, image: &image::DynamicImage) -> Result<Vec<u8>, BackendError> {
            self.inner.encode_png(image)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn permits_bound_concurrent_jobs() {
        let counting = Arc::new(CountingBackend::default());
        let backend: Arc<dyn ImageBackend> = counting.clone();
        let mut state = AppState::new(backend, &ServiceConfig::default());
        state.jobs = Arc::new(Semaphore::new(2));
        let router = create_router(state);

        let requests: Vec<_> = (0..6)
            .map(|_| {
                let router = router.clone();
                tokio::spawn(async move {
                    router
                        .oneshot(upload("/sketch", "file", Some("a.png"), b"png"))
                        .await
                        .unwrap()
                        .status()
                })
            })
            .collect();
        for request in requests {
            assert_eq!(request.await.unwrap(), StatusCode::OK);
        }

        let peak = counting.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak concurrency was {peak}");
        let applied = counting
            .inner
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::Apply(_)))
            .count();
        assert_eq!(applied, 6);
    }

    #[tokio::test]
    async fn closed_job_queue_is_service_unavailable() {
        let mock = Arc::new(MockBackend::new());
        let backend: Arc<dyn ImageBackend> = mock.clone();
        let state = AppState::new(backend, &ServiceConfig::default());
        state.jobs.close();

        let response = create_router(state)
            .oneshot(upload("/sketch", "file", Some("a.png"), b"png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = json_body(response).await;
        assert_eq!(json["error"], "server is shutting down");
        assert!(mock.get_operations().is_empty());
    }
}
