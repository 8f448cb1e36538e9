//! Liveness endpoint

use actix_web::{web, HttpResponse, Result};

use crate::models::HealthResponse;
use crate::session::SessionManager;

pub async fn health(manager: web::Data<SessionManager>) -> Result<HttpResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        message: "Sessionvault is running".to_string(),
        sessions: manager.session_count(),
    };
    Ok(HttpResponse::Ok().json(response))
}
