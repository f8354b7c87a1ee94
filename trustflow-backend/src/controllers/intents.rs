//! Intent endpoints: submit, dry-run, status and listing.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::IntentError;
use crate::models::{Intent, IntentStatus};
use crate::AppState;

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/intent").route(web::post().to(submit_intent)))
        .service(web::resource("/simulate").route(web::post().to(simulate_intent)))
        .service(web::resource("/status/{id}").route(web::get().to(get_status)))
        .service(web::resource("/intents").route(web::get().to(list_intents)));
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

fn error_response(err: &IntentError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    if err.is_client_error() {
        HttpResponse::BadRequest().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

/// POST /intent - run an intent to completion
async fn submit_intent(state: web::Data<AppState>, body: web::Json<Intent>) -> HttpResponse {
    let intent = body.into_inner();
    let orchestrator = state.orchestrator.clone();
    let timeout = state.config.intent_timeout;

    // Detached so a client disconnect cannot drop the workflow halfway
    let handle = tokio::spawn(async move {
        orchestrator
            .process_intent_with_timeout(intent, timeout)
            .await
    });

    match handle.await {
        Ok(Ok(response)) => match response.status {
            IntentStatus::Success => HttpResponse::Ok().json(response),
            _ => HttpResponse::UnprocessableEntity().json(response),
        },
        Ok(Err(e)) => {
            log::warn!("[intents] Intent rejected: {}", e);
            error_response(&e)
        }
        Err(e) => {
            log::error!("[intents] Intent task aborted: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "intent processing aborted"
            }))
        }
    }
}

/// POST /simulate - dry-run the first step, nothing is persisted
async fn simulate_intent(state: web::Data<AppState>, body: web::Json<Intent>) -> HttpResponse {
    let result = state.orchestrator.dry_run_intent(&body).await;
    HttpResponse::Ok().json(result)
}

/// GET /status/{id}
async fn get_status(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    match state.orchestrator.get_intent_status(&id) {
        Ok(Some(intent)) => HttpResponse::Ok().json(intent),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": IntentError::NotFound(id).to_string()
        })),
        Err(e) => {
            log::error!("[intents] Failed to load intent {}: {}", id, e);
            error_response(&e)
        }
    }
}

/// GET /intents?limit=N - most recent first
async fn list_intents(state: web::Data<AppState>, query: web::Query<ListQuery>) -> HttpResponse {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    match state.orchestrator.list_intents(limit) {
        Ok(intents) => HttpResponse::Ok().json(intents),
        Err(e) => {
            log::error!("[intents] Failed to list intents: {}", e);
            error_response(&e)
        }
    }
}
