use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, Responder, get, middleware::Logger, web};
use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::config::{DEFAULT_ORDER_TOKEN, ServerConfig};
use crate::dto::{ErrorDto, HealthDto, TranscriptDto};
use crate::error::TranscriptError;
use crate::outcome_log::{Outcome, OutcomeLogger};
use crate::transcript::{LanguageResolver, assemble};
use crate::youtube::fetcher::YoutubeFetcher;

pub const SERVICE_NAME: &str = "youtube-transcript-api";

pub struct AppState {
    pub resolver: LanguageResolver,
    pub logger: Arc<OutcomeLogger>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRequest {
    pub video_id: String,
    pub order_token: String,
}

impl TranscriptRequest {
    pub fn new(video_id: String, order: Option<String>) -> Self {
        Self {
            video_id,
            order_token: order.unwrap_or_else(|| DEFAULT_ORDER_TOKEN.to_string()),
        }
    }
}

#[get("/health")]
pub async fn health_check() -> impl Responder {
    debug!("Health check endpoint called");
    HttpResponse::Ok().json(HealthDto {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

#[get("/transcript/{video_id}")]
pub async fn get_transcript(
    data: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> impl Responder {
    let order = first_query_value(req.query_string(), "order");
    let request = TranscriptRequest::new(path.into_inner(), order);
    handle_transcript(&data, request).await
}

/// First value given for `key`. A repeated key keeps its first value and a
/// query string that does not parse counts as absent, so the request still
/// reaches the handler.
fn first_query_value(query: &str, key: &str) -> Option<String> {
    web::Query::<Vec<(String, String)>>::from_query(query)
        .ok()?
        .into_inner()
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

/// Resolves, assembles and logs one transcript request. Every call ends in
/// exactly one response and one outcome entry.
pub async fn handle_transcript(state: &AppState, request: TranscriptRequest) -> HttpResponse {
    let TranscriptRequest {
        video_id,
        order_token,
    } = request;
    debug!("Transcript request: order={order_token} video_id={video_id}");

    match state.resolver.resolve(&video_id).await {
        Ok(fragments) => {
            let transcript = assemble(&fragments);
            let span = fragments.last().map_or(0.0, |f| f.start + f.duration);
            info!(
                "Assembled transcript for {video_id}: {} fragments, {} characters, {:.1}s",
                fragments.len(),
                transcript.len(),
                span
            );
            state
                .logger
                .record(&order_token, &video_id, Outcome::Success, None);
            HttpResponse::Ok().json(TranscriptDto {
                video_id,
                transcript,
            })
        }
        Err(err) => {
            let message = err.to_string();
            warn!("Transcript fetch for {video_id} failed ({})", err.kind());
            state
                .logger
                .record(&order_token, &video_id, Outcome::Failure, Some(&message));
            HttpResponse::build(failure_status(&err)).json(ErrorDto { error: message })
        }
    }
}

fn failure_status(err: &TranscriptError) -> StatusCode {
    // callers only distinguish found / not found
    match err {
        TranscriptError::NoCaptionsAvailable { .. }
        | TranscriptError::VideoUnavailable { .. }
        | TranscriptError::UpstreamConnectivity(_)
        | TranscriptError::UnexpectedResponse(_) => StatusCode::NOT_FOUND,
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check).service(get_transcript);
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    info!("Starting YouTube transcript service");
    info!(
        "Using configuration: languages={:?}, proxy={}, upstream_timeout={:?}, log_dir={:?}",
        config.languages,
        config.proxy.is_some(),
        config.upstream_timeout,
        config.log_dir
    );

    let logger = Arc::new(OutcomeLogger::open(&config.log_dir).await?);
    info!("Writing transcript outcomes to {}", logger.path().display());
    let fetcher = YoutubeFetcher::new(config.fetcher_config())?;
    let resolver = LanguageResolver::new(Arc::new(fetcher), config.languages.clone());

    let app_state = web::Data::new(AppState { resolver, logger });

    let host = config.host;
    let port = config.port;
    info!("Starting HTTP server on {host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("Failed to bind {host}:{port}"))?
    .run()
    .await
    .context("HTTP server error")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use actix_web::test;
    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::error::TranscriptResult;
    use crate::youtube::config::{FetcherConfig, ProxyConfig};
    use crate::youtube::{CaptionFragment, TranscriptProvider};

    struct StubProvider {
        videos: HashMap<String, TranscriptResult<Vec<CaptionFragment>>>,
        calls: Mutex<usize>,
    }

    impl StubProvider {
        fn new() -> Self {
            let mut videos = HashMap::new();
            videos.insert(
                "abc123".to_string(),
                Ok(vec![fragment("안녕", 0.0), fragment("하세요", 1.2)]),
            );
            videos.insert(
                "private1".to_string(),
                Err(TranscriptError::unavailable("private1", "This video is private")),
            );
            videos.insert("silent".to_string(), Ok(Vec::new()));
            Self {
                videos,
                calls: Mutex::new(0),
            }
        }
    }

    fn fragment(text: &str, start: f64) -> CaptionFragment {
        CaptionFragment {
            text: text.to_string(),
            start,
            duration: 1.2,
        }
    }

    #[async_trait]
    impl TranscriptProvider for StubProvider {
        async fn fetch(
            &self,
            video_id: &str,
            _languages: &[String],
        ) -> TranscriptResult<Vec<CaptionFragment>> {
            *self.calls.lock().unwrap() += 1;
            self.videos
                .get(video_id)
                .cloned()
                .unwrap_or_else(|| Err(TranscriptError::no_captions(video_id, "none")))
        }
    }

    async fn state_with(provider: Arc<dyn TranscriptProvider>) -> (web::Data<AppState>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(OutcomeLogger::open(dir.path()).await.unwrap());
        let resolver = LanguageResolver::new(provider, crate::transcript::default_languages());
        (web::Data::new(AppState { resolver, logger }), dir)
    }

    fn log_lines(state: &AppState) -> Vec<String> {
        std::fs::read_to_string(state.logger.path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[actix_web::test]
    async fn transcript_success() {
        let (state, _dir) = state_with(Arc::new(StubProvider::new())).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/transcript/abc123?order=17")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: TranscriptDto = test::read_body_json(resp).await;
        assert_eq!(
            body,
            TranscriptDto {
                video_id: "abc123".to_string(),
                transcript: "안녕 하세요".to_string(),
            }
        );

        let lines = log_lines(&state);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(" - INFO - ✅ Transcript success: 17 - abc123"));
    }

    #[actix_web::test]
    async fn private_video_is_not_found() {
        let (state, _dir) = state_with(Arc::new(StubProvider::new())).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/transcript/private1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: ErrorDto = test::read_body_json(resp).await;
        assert!(body.error.contains("This video is private"));

        let lines = log_lines(&state);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(" - ERROR - ❌ Transcript failed: unknown - private1 - "));
        assert!(lines[0].contains(&body.error));
    }

    #[actix_web::test]
    async fn empty_transcript_is_success() {
        let (state, _dir) = state_with(Arc::new(StubProvider::new())).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/transcript/silent").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: TranscriptDto = test::read_body_json(resp).await;
        assert_eq!(body.transcript, "");
    }

    #[actix_web::test]
    async fn health_does_not_log() {
        let (state, _dir) = state_with(Arc::new(StubProvider::new())).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: HealthDto = test::read_body_json(resp).await;
        assert_eq!(body.status, "healthy");
        assert_eq!(body.service, "youtube-transcript-api");
        assert!(log_lines(&state).is_empty());
    }

    #[actix_web::test]
    async fn repeated_requests_are_identical_and_each_logged() {
        let provider = Arc::new(StubProvider::new());
        let (state, _dir) = state_with(provider.clone()).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let mut transcripts = Vec::new();
        for _ in 0..2 {
            let req = test::TestRequest::get()
                .uri("/transcript/abc123")
                .to_request();
            let body: TranscriptDto = test::call_and_read_body_json(&app, req).await;
            transcripts.push(body.transcript);
        }
        assert_eq!(transcripts[0], transcripts[1]);
        assert_eq!(*provider.calls.lock().unwrap(), 2);

        let lines = log_lines(&state);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.contains("success: unknown - abc123")));
    }

    #[actix_web::test]
    async fn outcome_matches_status() {
        let (state, _dir) = state_with(Arc::new(StubProvider::new())).await;

        for (video_id, status, level) in [
            ("abc123", StatusCode::OK, "INFO"),
            ("private1", StatusCode::NOT_FOUND, "ERROR"),
            ("nothing", StatusCode::NOT_FOUND, "ERROR"),
        ] {
            let resp = handle_transcript(&state, TranscriptRequest::new(video_id.into(), None)).await;
            assert_eq!(resp.status(), status);
            let lines = log_lines(&state);
            let last = lines.last().unwrap();
            assert!(last.contains(&format!(" - {level} - ")));
            assert!(last.contains(video_id));
        }
        assert_eq!(log_lines(&state).len(), 3);
    }

    #[actix_web::test]
    async fn unreachable_proxy_fails_with_connectivity_message() {
        let fetcher = YoutubeFetcher::new(FetcherConfig {
            proxy: Some(ProxyConfig::new("http://127.0.0.1:1".into(), None)),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let (state, _dir) = state_with(Arc::new(fetcher)).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/transcript/abc123?order=9")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: ErrorDto = test::read_body_json(resp).await;
        assert!(body.error.starts_with("Upstream connectivity failure"));

        let lines = log_lines(&state);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("❌ Transcript failed: 9 - abc123 - Upstream connectivity failure"));
    }

    #[actix_web::test]
    async fn order_defaults_to_unknown() {
        let request = TranscriptRequest::new("abc123".into(), None);
        assert_eq!(request.order_token, "unknown");
        let request = TranscriptRequest::new("abc123".into(), Some("5".into()));
        assert_eq!(request.order_token, "5");
    }

    #[actix_web::test]
    async fn first_order_value_wins() {
        assert_eq!(first_query_value("order=1&order=2", "order").as_deref(), Some("1"));
        assert_eq!(first_query_value("lang=ko&order=a%20b", "order").as_deref(), Some("a b"));
        assert_eq!(first_query_value("", "order"), None);
        assert_eq!(first_query_value("lang=ko", "order"), None);
    }

    #[actix_web::test]
    async fn repeated_order_still_answers_json_and_logs_once() {
        let (state, _dir) = state_with(Arc::new(StubProvider::new())).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/transcript/abc123?order=1&order=2")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: TranscriptDto = test::read_body_json(resp).await;
        assert_eq!(body.transcript, "안녕 하세요");

        let lines = log_lines(&state);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("✅ Transcript success: 1 - abc123"));
    }

    #[actix_web::test]
    async fn repeated_order_on_failure_logs_once() {
        let (state, _dir) = state_with(Arc::new(StubProvider::new())).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/transcript/private1?order=x&order=y")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ErrorDto = test::read_body_json(resp).await;
        assert!(body.error.contains("private"));

        let lines = log_lines(&state);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("❌ Transcript failed: x - private1"));
    }
}
