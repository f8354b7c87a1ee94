pub mod health;
pub mod intents;

use actix_web::{error::InternalError, web, HttpResponse};

/// JSON extractor config: malformed bodies become `400 {"error": ...}`
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Invalid JSON: {}", err)
        }));
        InternalError::from_response(err, response).into()
    })
}
