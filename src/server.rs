use std::path::PathBuf;

use axum::{
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use crate::presentation::{Action, Presentation};

const NO_STORE_HEADERS: [(&str, &str); 4] = [
    ("Content-Type", "application/json"),
    ("Cache-Control", "no-store"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub route: String,
}

#[derive(Debug, Deserialize)]
pub struct HoverRequest {
    pub index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TableRequest {
    pub open: bool,
}

pub fn presentation_router(presentation: Presentation, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/state.json", get(get_state_json))
        .route("/participants.json", get(get_participants_json))
        .route("/action/:name", post(post_action))
        .route("/navigate", post(post_navigate))
        .route("/hover", post(post_hover))
        .route("/table", post(post_table))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(presentation)
}

pub async fn start_presentation_server(presentation: Presentation, static_dir: PathBuf, addr: &str) {
    let app = presentation_router(presentation.clone(), static_dir);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("presentation server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("presentation server listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("presentation server error: {e}");
    }
    presentation.shutdown();
}

fn no_store_json(body: String) -> Response {
    (NO_STORE_HEADERS, body).into_response()
}

fn rejected(status: StatusCode, message: String) -> Response {
    warn!("rejected request: {message}");
    (status, Json(json!({ "error": message }))).into_response()
}

async fn get_state_json(AxumState(presentation): AxumState<Presentation>) -> Response {
    let body = serde_json::to_string(&presentation.snapshot()).unwrap_or_else(|_| "{}".to_string());
    no_store_json(body)
}

async fn get_participants_json(AxumState(presentation): AxumState<Presentation>) -> Response {
    let body = serde_json::to_string(&presentation.participants()).unwrap_or_else(|_| "[]".to_string());
    no_store_json(body)
}

async fn post_action(
    AxumState(presentation): AxumState<Presentation>,
    Path(name): Path<String>,
) -> Response {
    let action = match Action::from_name(&name) {
        Some(action) => action,
        None => return rejected(StatusCode::NOT_FOUND, format!("unknown action {name}")),
    };
    match presentation.dispatch(action) {
        Ok(_) => Json(presentation.snapshot()).into_response(),
        Err(e) => rejected(StatusCode::CONFLICT, e),
    }
}

async fn post_navigate(
    AxumState(presentation): AxumState<Presentation>,
    Json(request): Json<NavigateRequest>,
) -> Response {
    presentation.navigate(&request.route);
    Json(presentation.snapshot()).into_response()
}

async fn post_hover(
    AxumState(presentation): AxumState<Presentation>,
    Json(request): Json<HoverRequest>,
) -> Response {
    match presentation.hover_alternate(request.index) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => rejected(StatusCode::CONFLICT, e),
    }
}

async fn post_table(
    AxumState(presentation): AxumState<Presentation>,
    Json(request): Json<TableRequest>,
) -> Response {
    match presentation.set_table_open(request.open) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => rejected(StatusCode::CONFLICT, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::{StageSettings, View};
    use crate::source::EntrySource;
    use crate::types::*;
    use std::time::Duration;

    fn presentation() -> Presentation {
        let config = AppConfig {
            draw_seed: Some(3),
            ..AppConfig::default()
        };
        let mut settings = StageSettings::from_config(&config);
        settings.source = EntrySource::Inline("Player ID,Player Login\nC1,alice\nC2,bob\n".to_string());
        Presentation::new(settings)
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_endpoint_statuses() {
        let p = presentation();

        let resp = post_action(AxumState(p.clone()), Path("dance".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = post_action(AxumState(p.clone()), Path("back".to_string())).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = post_action(AxumState(p.clone()), Path("start".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(p.view(), View::Loading);

        tokio::time::sleep(Duration::from_millis(2001)).await;
        assert_eq!(p.view(), View::Results);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_json_is_not_cached() {
        let resp = get_state_json(AxumState(presentation())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Cache-Control").and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_hover_and_table_endpoints() {
        let p = presentation();

        let resp = post_navigate(
            AxumState(p.clone()),
            Json(NavigateRequest { route: "/missing".to_string() }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(p.view(), View::NotFound);

        let resp = post_hover(AxumState(p.clone()), Json(HoverRequest { index: Some(0) })).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = post_hover(AxumState(p.clone()), Json(HoverRequest { index: None })).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = post_table(AxumState(p.clone()), Json(TableRequest { open: true })).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
