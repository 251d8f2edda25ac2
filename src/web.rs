use crate::client::{ClientConfig, LookupClient, LookupError};
use crate::lookup::LookupResponse;
use crate::route::{ViewMode, char_from_path, char_href, char_path, normalize_input};
use crate::view::{EMPTY, LookupView};
use askama::Html as HtmlEscaper;
use askama::{MarkupDisplay, Template};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use include_dir::{Dir, include_dir};
use markdown::{Options as MarkdownOptions, to_html_with_options};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;

static ASSETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/static");

const FRAGMENT_PREFIX: &str = "/fragment";

#[derive(Clone)]
pub struct AppState {
    pub client: LookupClient,
    pub theme: WebTheme,
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum WebTheme {
    #[default]
    Bulma,
    Tailwind,
}

impl fmt::Display for WebTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebTheme::Bulma => write!(f, "bulma"),
            WebTheme::Tailwind => write!(f, "tailwind"),
        }
    }
}

impl FromStr for WebTheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bulma" => Ok(WebTheme::Bulma),
            "tailwind" => Ok(WebTheme::Tailwind),
            other => Err(format!(
                "unknown theme {other:?} (expected `bulma` or `tailwind`)"
            )),
        }
    }
}

/// CSS class hooks for one theme.
#[derive(Debug, Clone, Copy)]
struct Chrome {
    use_bulma: bool,
    use_tailwind: bool,
    body_class: &'static str,
    main_class: &'static str,
    container_class: &'static str,
    title_class: &'static str,
    subtitle_class: &'static str,
    form_class: &'static str,
    input_class: &'static str,
    button_class: &'static str,
    box_class: &'static str,
    heading_class: &'static str,
    list_class: &'static str,
    tag_class: &'static str,
    table_class: &'static str,
    toggle_class: &'static str,
    error_class: &'static str,
}

impl Chrome {
    fn new(theme: WebTheme) -> Self {
        match theme {
            WebTheme::Bulma => Self {
                use_bulma: true,
                use_tailwind: false,
                body_class: "has-background-light",
                main_class: "section",
                container_class: "container is-max-desktop",
                title_class: "title is-2",
                subtitle_class: "subtitle is-5 has-text-grey",
                form_class: "field has-addons mb-5",
                input_class: "input is-large",
                button_class: "button is-primary is-large",
                box_class: "box",
                heading_class: "title is-5",
                list_class: "content",
                tag_class: "tag is-light is-medium tag-char",
                table_class: "table is-fullwidth is-striped",
                toggle_class: "button is-small is-link is-light",
                error_class: "notification is-danger is-light",
            },
            WebTheme::Tailwind => Self {
                use_bulma: false,
                use_tailwind: true,
                body_class: "bg-slate-50 text-slate-900",
                main_class: "min-h-screen flex flex-col items-center py-10 px-4",
                container_class: "max-w-3xl w-full space-y-6",
                title_class: "text-4xl font-extrabold tracking-tight",
                subtitle_class: "text-lg text-slate-600",
                form_class: "flex gap-3",
                input_class: "flex-1 rounded-md border border-slate-300 px-4 py-2 text-2xl",
                button_class: "inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold shadow hover:bg-slate-800",
                box_class: "bg-white shadow rounded p-4",
                heading_class: "text-xl font-semibold mb-2",
                list_class: "space-y-1",
                tag_class: "inline-flex items-center justify-center w-10 h-10 rounded bg-slate-100 text-xl tag-char",
                table_class: "w-full text-left border-collapse",
                toggle_class: "text-sm font-semibold text-sky-700 hover:underline",
                error_class: "rounded border border-red-300 bg-red-50 p-4 text-red-800",
            },
        }
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub theme: WebTheme,
    pub base_url: String,
    pub client: ClientConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            theme: WebTheme::default(),
            base_url: "http://127.0.0.1:8080".to_string(),
            client: ClientConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to build lookup client: {0}")]
    Client(#[from] LookupError),
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let client = LookupClient::new(config.client.clone())?;
    let state = Arc::new(AppState {
        client,
        theme: config.theme,
        base_url: config.base_url.trim_end_matches('/').to_string(),
    });
    let router = build_router(state);
    info!(
        %config.addr,
        theme = %config.theme,
        api = %config.client.api_base_url,
        base = %config.base_url,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        Self {
            status: lookup_failure_status(&err),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

/// Upstream statuses pass through; anything else is a gateway failure.
fn lookup_failure_status(err: &LookupError) -> StatusCode {
    match err {
        LookupError::EmptyQuery => StatusCode::BAD_REQUEST,
        other => other.upstream_status().unwrap_or(StatusCode::BAD_GATEWAY),
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/index.html", get(home))
        .route("/lookup", get(lookup_submit))
        .route("/char/", get(char_page))
        .route("/char/*ch", get(char_page))
        .route("/fragment/char/", get(char_fragment))
        .route("/fragment/char/*ch", get(char_fragment))
        .route("/api/lookup", get(api_lookup))
        .route("/healthz", get(health))
        .route("/static/*path", get(static_asset))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[derive(Debug, Deserialize)]
struct LookupParams {
    char: Option<String>,
    view: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ViewParams {
    view: Option<String>,
}

async fn home(State(state): State<SharedState>) -> impl IntoResponse {
    Html(render_page(&state, "", ViewMode::List, String::new()))
}

async fn lookup_submit(Query(params): Query<LookupParams>) -> Redirect {
    let view = ViewMode::from_query(params.view.as_deref());
    match params.char.as_deref().and_then(normalize_input) {
        Some(ch) => Redirect::to(&char_href(ch, view)),
        None => Redirect::to("/"),
    }
}

async fn char_page(
    State(state): State<SharedState>,
    uri: Uri,
    Query(params): Query<ViewParams>,
) -> impl IntoResponse {
    let view = ViewMode::from_query(params.view.as_deref());
    let Some(ch) = char_from_path(uri.path()) else {
        return Html(render_page(&state, "", view, String::new()));
    };
    let Some(ch) = normalize_input(&ch) else {
        return Html(render_page(&state, "", view, String::new()));
    };
    let chrome = Chrome::new(state.theme);
    let results_html = match state.client.lookup(ch).await {
        Ok(response) => render_results(chrome, ch, &response, view),
        Err(err) => {
            warn!(error = %err, char = ch, "Lookup failed");
            render_error_fragment(chrome, &err.to_string())
        }
    };
    Html(render_page(&state, ch, view, results_html))
}

async fn char_fragment(
    State(state): State<SharedState>,
    uri: Uri,
    Query(params): Query<ViewParams>,
) -> Response {
    let view = ViewMode::from_query(params.view.as_deref());
    let chrome = Chrome::new(state.theme);
    let ch = uri
        .path()
        .strip_prefix(FRAGMENT_PREFIX)
        .and_then(char_from_path);
    let Some(ch) = ch.as_deref().and_then(normalize_input) else {
        return (
            StatusCode::BAD_REQUEST,
            Html(render_error_fragment(chrome, "Invalid character path")),
        )
            .into_response();
    };
    match state.client.lookup(ch).await {
        Ok(response) => Html(render_results(chrome, ch, &response, view)).into_response(),
        Err(err) => {
            warn!(error = %err, char = ch, "Lookup failed");
            let status = if matches!(err, LookupError::EmptyQuery) {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::BAD_GATEWAY
            };
            (
                status,
                Html(render_error_fragment(chrome, &err.to_string())),
            )
                .into_response()
        }
    }
}

async fn api_lookup(
    State(state): State<SharedState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<LookupResponse>, ApiError> {
    let ch = params
        .char
        .as_deref()
        .and_then(normalize_input)
        .ok_or_else(|| ApiError::bad_request("Query parameter 'char' is required"))?;
    Ok(Json(state.client.lookup(ch).await?))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "learncjk-web" }))
}

async fn static_asset(Path(path): Path<String>) -> Response {
    match ASSETS.get_file(path.trim_start_matches('/')) {
        Some(file) => (
            [
                (header::CONTENT_TYPE, content_type_for(&path).to_string()),
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
            file.contents(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

fn content_type_for(path: &str) -> mime::Mime {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" => mime::TEXT_HTML_UTF_8,
        "js" | "mjs" => mime::TEXT_JAVASCRIPT,
        "css" => mime::TEXT_CSS_UTF_8,
        "json" | "map" => mime::APPLICATION_JSON,
        "svg" => mime::IMAGE_SVG,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "txt" => mime::TEXT_PLAIN_UTF_8,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

fn render_page(state: &AppState, input_value: &str, view: ViewMode, results_html: String) -> String {
    let chrome = Chrome::new(state.theme);
    let (title, canonical_url) = if input_value.is_empty() {
        ("learnCJK.dev • Character lookup".to_string(), None)
    } else {
        (
            format!("learnCJK.dev • {input_value}"),
            Some(format!("{}{}", state.base_url, char_path(input_value))),
        )
    };
    let template = PageTemplate {
        chrome,
        title,
        canonical_url,
        input_value,
        view,
        results_html,
        version: env!("CARGO_PKG_VERSION"),
    };
    template
        .render()
        .unwrap_or_else(|err| render_error_page(state.theme, err.to_string()))
}

fn render_results(chrome: Chrome, ch: &str, response: &LookupResponse, view: ViewMode) -> String {
    let lookup = LookupView::from_response(response, view);
    let notes_html = lookup.notes_markdown.as_deref().and_then(render_markdown_str);
    let template = ResultsTemplate {
        chrome,
        study_text: lookup.study_text(),
        toggle_href: char_href(ch, view.toggled()),
        toggle_view: view.toggled().query_value(),
        toggle_label: view.toggle_label(),
        lookup: &lookup,
        ch,
        notes_html,
        empty: EMPTY,
    };
    template
        .render()
        .unwrap_or_else(|err| render_error_fragment(chrome, &err.to_string()))
}

fn render_error_fragment(chrome: Chrome, message: &str) -> String {
    format!(
        r#"<div id="error" class="{error_class}" role="alert">{message}</div>"#,
        error_class = chrome.error_class,
        message = MarkupDisplay::new_unsafe(message, HtmlEscaper),
    )
}

fn render_error_page(theme: WebTheme, message: impl Into<String>) -> String {
    let chrome = Chrome::new(theme);
    let message = message.into();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>learnCJK.dev • Error</title>
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <div class="{container_class}">
        <h1 class="{title_class}">Something went wrong</h1>
        {error}
        <a href="/" class="{button_class}">Back to home</a>
      </div>
    </main>
  </body>
</html>"#,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        container_class = chrome.container_class,
        title_class = chrome.title_class,
        button_class = chrome.button_class,
        error = render_error_fragment(chrome, &message),
    )
}

fn render_markdown_str(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Summaries come from a remote service, so raw HTML stays escaped.
    let options = MarkdownOptions::gfm();
    to_html_with_options(trimmed, &options).ok()
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{ title }}</title>
    {% if chrome.use_bulma %}
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bulma@1.0.2/css/bulma.min.css">
    {% endif %}
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    <link rel="stylesheet" href="/static/app.css">
    {% if canonical_url.is_some() %}
    <link rel="canonical" href="{{ canonical_url.as_ref().unwrap() }}">
    {% endif %}
    <script src="/static/router.js" defer></script>
    <script src="/static/app.js" defer></script>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.container_class }}">
        <header class="mb-5">
          <p class="eyebrow">learnCJK.dev v{{ version }}</p>
          <h1 class="{{ chrome.title_class }}">How to name a CJK character</h1>
          <p class="{{ chrome.subtitle_class }}">Enter a character to see its Japanese, Simplified and Traditional forms, its components, and its variants.</p>
        </header>
        <form id="lookupForm" action="/lookup" method="get" class="{{ chrome.form_class }}">
          <div class="control is-expanded">
            <input id="charInput" name="char" type="text" value="{{ input_value }}" placeholder="価" autocomplete="off" class="{{ chrome.input_class }}" required>
          </div>
          {% if view.is_table() %}
          <input type="hidden" name="view" value="table">
          {% endif %}
          <div class="control">
            <button id="lookupBtn" type="submit" class="{{ chrome.button_class }}">Look up</button>
          </div>
        </form>
        <div id="results" data-view="{{ view.query_value() }}" aria-live="polite">{{ results_html|safe }}</div>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct PageTemplate<'a> {
    chrome: Chrome,
    title: String,
    canonical_url: Option<String>,
    input_value: &'a str,
    view: ViewMode,
    results_html: String,
    version: &'static str,
}

#[derive(Template)]
#[template(
    source = r#"<section id="summary" class="{{ chrome.box_class }}">
  <div class="summary-row">
    <span id="summaryChar" class="summary-char">{{ lookup.char }}</span>
    <span class="summary-lang" data-lang="{{ lookup.lang_code }}">Detected input: <strong id="summaryLang">{{ lookup.lang }}</strong></span>
  </div>
  <a id="viewToggle" class="{{ chrome.toggle_class }}" href="{{ toggle_href }}" data-char="{{ ch }}" data-view="{{ toggle_view }}">{{ toggle_label }}</a>
</section>
{% if lookup.view.is_table() %}
<section class="{{ chrome.box_class }}">
  <h2 class="{{ chrome.heading_class }}">Regional forms</h2>
  <table id="regionTable" class="{{ chrome.table_class }}">
    <thead>
      <tr><th>Region</th><th>Script</th><th>Form</th><th>Same as input</th></tr>
    </thead>
    <tbody>
      {% for row in lookup.regions %}
      <tr>
        <td>{{ row.region }}</td>
        <td>{{ row.script }}</td>
        <td>
          {% if row.chip.is_some() %}
          <a class="char-chip" data-char="{{ row.chip.as_ref().unwrap().ch }}" href="{{ row.chip.as_ref().unwrap().href }}" title="{{ row.chip.as_ref().unwrap().ch }}"><span class="{{ chrome.tag_class }}">{{ row.chip.as_ref().unwrap().ch }}</span></a>
          {% else %}
          {{ empty }}
          {% endif %}
        </td>
        <td>{% if row.same_as_input %}same{% else %}diff{% endif %}</td>
      </tr>
      {% endfor %}
    </tbody>
  </table>
</section>
{% else %}
<section class="{{ chrome.box_class }}">
  <h2 class="{{ chrome.heading_class }}">Forms</h2>
  <ul id="forms" class="{{ chrome.list_class }}">
    {% for row in lookup.forms %}
    <li><strong>{{ row.label }}:</strong> {{ row.value }}</li>
    {% endfor %}
  </ul>
</section>
{% endif %}
<section class="{{ chrome.box_class }}">
  <h2 class="{{ chrome.heading_class }}">Composition</h2>
  <ul id="composition" class="{{ chrome.list_class }}">
    {% for row in lookup.composition %}
    <li><strong>{{ row.label }}:</strong>
      {% if row.is_empty() %}
      {{ empty }}
      {% else %}
      {% for chip in row.chips %}
      <a class="char-chip" data-char="{{ chip.ch }}" href="{{ chip.href }}" title="{{ chip.ch }}"><span class="{{ chrome.tag_class }}">{{ chip.ch }}</span></a>
      {% endfor %}
      {% endif %}
    </li>
    {% endfor %}
  </ul>
</section>
<section class="{{ chrome.box_class }}">
  <h2 class="{{ chrome.heading_class }}">Variants</h2>
  {% if lookup.variants.is_empty() %}
  <p id="variants">{{ empty }}</p>
  {% else %}
  <ul id="variants" class="chip-list">
    {% for chip in lookup.variants %}
    <li><a class="char-chip" data-char="{{ chip.ch }}" href="{{ chip.href }}" title="{{ chip.ch }}"><span class="{{ chrome.tag_class }}">{{ chip.ch }}</span></a></li>
    {% endfor %}
  </ul>
  {% endif %}
</section>
<section class="{{ chrome.box_class }}">
  <h2 class="{{ chrome.heading_class }}">Unihan definition</h2>
  <p id="unihan">{{ lookup.definition }}</p>
</section>
<section class="{{ chrome.box_class }}">
  <h2 class="{{ chrome.heading_class }}">Study lists</h2>
  <pre id="cjklearn">{{ study_text }}</pre>
</section>
{% if notes_html.is_some() %}
<section id="notes" class="{{ chrome.box_class }}">
  <div class="content">{{ notes_html.as_ref().unwrap()|safe }}</div>
</section>
{% endif %}"#,
    ext = "html"
)]
struct ResultsTemplate<'a> {
    chrome: Chrome,
    lookup: &'a LookupView,
    ch: &'a str,
    toggle_href: String,
    toggle_view: &'static str,
    toggle_label: &'static str,
    study_text: String,
    notes_html: Option<String>,
    empty: &'static str,
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use axum::{body, body::Body, http::Request};
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_payload() -> serde_json::Value {
        json!({
            "char": "価",
            "detected_input_lang": "jp",
            "japanese": { "char": "価", "same_as_input": true },
            "simplified": { "char": "价", "same_as_input": false },
            "traditional": { "char": "價", "same_as_input": false },
            "composition": {
                "decomposition": ["亻", "西"],
                "jp_supercompositions": [],
                "zh_supercompositions": [],
                "merged_supercompositions": []
            },
            "variants": ["贾"],
            "unihan_definition": "price, value",
            "cjk_learn": { "keyword_rtk": "value", "index_rtk": 1464 }
        })
    }

    fn test_router(server: &MockServer, markdown: bool) -> Router {
        let client = LookupClient::new(ClientConfig {
            api_base_url: server.uri(),
            timeout: Duration::from_secs(5),
            markdown,
        })
        .unwrap();
        let state = Arc::new(AppState {
            client,
            theme: WebTheme::Bulma,
            base_url: "http://127.0.0.1:8080".to_string(),
        });
        build_router(state)
    }

    async fn mount_lookup(server: &MockServer, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/lookup"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String, Option<String>) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|value| value.to_str().unwrap().to_string());
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap(), location)
    }

    #[tokio::test]
    async fn home_renders_lookup_form() {
        let server = MockServer::start().await;
        let (status, html, _) = get(test_router(&server, false), "/").await;
        assert!(status.is_success());
        assert!(html.contains(r#"id="lookupForm""#));
        assert!(html.contains(r#"id="charInput""#));
        assert!(html.contains("router.js"));
        assert!(!html.contains(r#"id="summary""#));
    }

    #[tokio::test]
    async fn form_submit_redirects_to_char_path() {
        let server = MockServer::start().await;
        let (status, _, location) =
            get(test_router(&server, false), "/lookup?char=%20%E4%BE%A1%20").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/char/%E4%BE%A1"));
    }

    #[tokio::test]
    async fn form_submit_keeps_table_view() {
        let server = MockServer::start().await;
        let (status, _, location) =
            get(test_router(&server, false), "/lookup?char=%E6%9C%A8&view=table").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/char/%E6%9C%A8?view=table"));
    }

    #[tokio::test]
    async fn blank_submit_goes_home() {
        let server = MockServer::start().await;
        let (status, _, location) = get(test_router(&server, false), "/lookup?char=%20%20").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn char_page_renders_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/lookup"))
            .and(query_param("char", "価"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let (status, html, _) = get(test_router(&server, false), "/char/%E4%BE%A1").await;
        assert!(status.is_success());
        assert!(html.contains(r#"id="forms""#));
        assert!(html.contains("价 (diff)"));
        assert!(html.contains(r#"data-lang="jp""#));
        assert!(html.contains("価 (same)"));
        assert!(html.contains("Merged supercompositions"));
        assert!(html.contains("price, value"));
        assert!(html.contains("keyword_rtk: value"));
        assert!(html.contains("Show region table"));
        assert!(!html.contains(r#"id="regionTable""#));
    }

    #[tokio::test]
    async fn table_view_renders_region_table() {
        let server = MockServer::start().await;
        mount_lookup(&server, 200, sample_payload()).await;

        let (status, html, _) =
            get(test_router(&server, false), "/char/%E4%BE%A1?view=table").await;
        assert!(status.is_success());
        assert!(html.contains(r#"id="regionTable""#));
        assert!(html.contains("Hong Kong"));
        assert!(html.contains("Show list"));
        assert!(!html.contains(r#"id="forms""#));
    }

    #[tokio::test]
    async fn upstream_failure_shows_error_and_keeps_form() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/lookup"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (status, html, _) = get(test_router(&server, false), "/char/%E6%9C%A8").await;
        assert!(status.is_success());
        assert!(html.contains(r#"id="error""#));
        assert!(html.contains("API error: 500"));
        assert!(html.contains(r#"id="lookupForm""#));
    }

    #[tokio::test]
    async fn api_text_is_escaped() {
        let server = MockServer::start().await;
        mount_lookup(
            &server,
            200,
            json!({ "char": "木", "unihan_definition": "<script>alert(1)</script>" }),
        )
        .await;

        let (_, html, _) = get(test_router(&server, false), "/char/%E6%9C%A8").await;
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert(1)</script>"));
    }

    #[tokio::test]
    async fn undecodable_char_path_renders_home() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (status, html, _) = get(test_router(&server, false), "/char/%FF%FE").await;
        assert!(status.is_success());
        assert!(html.contains(r#"id="lookupForm""#));
        assert!(!html.contains(r#"id="error""#));
    }

    #[tokio::test]
    async fn malformed_escape_renders_home_without_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for uri in ["/char/%ZZ", "/char/%", "/char/%E"] {
            let (status, html, _) = get(test_router(&server, false), uri).await;
            assert!(status.is_success(), "{uri}");
            assert!(html.contains(r#"id="lookupForm""#), "{uri}");
            assert!(!html.contains(r#"id="summary""#), "{uri}");
        }
    }

    #[tokio::test]
    async fn empty_char_path_renders_home() {
        let server = MockServer::start().await;
        let (status, html, _) = get(test_router(&server, false), "/char/").await;
        assert!(status.is_success());
        assert!(html.contains(r#"id="lookupForm""#));
        assert!(!html.contains(r#"id="error""#));
    }

    #[tokio::test]
    async fn empty_fragment_path_is_bad_request() {
        let server = MockServer::start().await;
        let (status, html, _) = get(test_router(&server, false), "/fragment/char/").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(html.contains("Invalid character path"));
    }

    #[tokio::test]
    async fn malformed_fragment_escape_is_bad_request() {
        let server = MockServer::start().await;
        let (status, _, _) = get(test_router(&server, false), "/fragment/char/%ZZ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fragment_contains_results_only() {
        let server = MockServer::start().await;
        mount_lookup(&server, 200, sample_payload()).await;

        let (status, html, _) =
            get(test_router(&server, false), "/fragment/char/%E4%BE%A1").await;
        assert!(status.is_success());
        assert!(html.contains(r#"id="summary""#));
        assert!(!html.contains("<!DOCTYPE html>"));
        assert!(!html.contains(r#"id="lookupForm""#));
    }

    #[tokio::test]
    async fn fragment_reports_gateway_failure() {
        let server = MockServer::start().await;
        mount_lookup(&server, 404, json!({ "detail": "Not Found" })).await;

        let (status, html, _) =
            get(test_router(&server, false), "/fragment/char/%E4%BE%A1").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(html.contains("API error: 404"));
    }

    #[tokio::test]
    async fn fragment_rejects_bad_path() {
        let server = MockServer::start().await;
        let (status, html, _) = get(test_router(&server, false), "/fragment/char/%FF").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(html.contains("Invalid character path"));
    }

    #[tokio::test]
    async fn markdown_notes_render_as_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/lookup"))
            .and(query_param("output_format", "md"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "char": "価",
                "md": "# How to name a CJK character\n- Input character: 価"
            })))
            .mount(&server)
            .await;

        let (_, html, _) = get(test_router(&server, true), "/char/%E4%BE%A1").await;
        assert!(html.contains(r#"id="notes""#));
        assert!(html.contains("<h1>How to name a CJK character</h1>"));
    }

    #[tokio::test]
    async fn api_lookup_requires_char() {
        let server = MockServer::start().await;
        let (status, body, _) = get(test_router(&server, false), "/api/lookup").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload["error"], "Query parameter 'char' is required");
    }

    #[tokio::test]
    async fn api_lookup_passes_response_through() {
        let server = MockServer::start().await;
        mount_lookup(&server, 200, sample_payload()).await;

        let (status, body, _) =
            get(test_router(&server, false), "/api/lookup?char=%E4%BE%A1").await;
        assert!(status.is_success());
        let payload: LookupResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(payload.traditional.char, "價");
        assert_eq!(payload.variants, vec!["贾"]);
    }

    #[tokio::test]
    async fn api_lookup_keeps_upstream_status() {
        let server = MockServer::start().await;
        mount_lookup(&server, 404, json!({})).await;

        let (status, body, _) =
            get(test_router(&server, false), "/api/lookup?char=%E4%BE%A1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("API error: 404"));
    }

    #[tokio::test]
    async fn health_reports_service() {
        let server = MockServer::start().await;
        let (status, body, _) = get(test_router(&server, false), "/healthz").await;
        assert!(status.is_success());
        assert!(body.contains("learncjk-web"));
    }

    #[tokio::test]
    async fn router_script_is_served() {
        let server = MockServer::start().await;
        let response = test_router(&server, false)
            .oneshot(Request::get("/static/router.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/javascript"));
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let script = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(script.contains("history.pushState"));
        assert!(script.contains("popstate"));
    }

    #[tokio::test]
    async fn fetch_transport_script_is_served() {
        let server = MockServer::start().await;
        let (status, script, _) = get(test_router(&server, false), "/static/app.js").await;
        assert!(status.is_success());
        assert!(script.contains("AbortController"));
        assert!(script.contains("startCharRouter(requestFragment)"));
    }

    #[test]
    fn failure_status_prefers_upstream_status() {
        assert_eq!(
            lookup_failure_status(&LookupError::EmptyQuery),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            lookup_failure_status(&LookupError::Status {
                status: StatusCode::NOT_FOUND
            }),
            StatusCode::NOT_FOUND
        );
        let decode = serde_json::from_str::<LookupResponse>("{").unwrap_err();
        assert_eq!(
            lookup_failure_status(&LookupError::Decode(decode)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn missing_asset_is_not_found() {
        let server = MockServer::start().await;
        let (status, _, _) = get(test_router(&server, false), "/static/nope.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn theme_parses_case_insensitively() {
        assert_eq!("Tailwind".parse::<WebTheme>().unwrap(), WebTheme::Tailwind);
        assert_eq!("bulma".parse::<WebTheme>().unwrap(), WebTheme::Bulma);
        assert!("bootstrap".parse::<WebTheme>().is_err());
    }

    #[test]
    fn render_markdown_str_escapes_raw_html() {
        let html = render_markdown_str("<script>x</script>\n\n**bold**").expect("rendered");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(!html.contains("<script>"));
    }
}
