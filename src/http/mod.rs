//! HTTP surface: the relay fan-out endpoint, local-backend file
//! upload/download, and a health check. The websocket upgrade route lives
//! alongside these in `main.rs`, where the `Addr<Registry>` is assembled.

pub mod file;
pub mod relay;

use actix_web::{web, HttpResponse};

pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthz", web::get().to(healthz))
        .service(web::resource("/api/relay").route(web::post().to(relay::relay)))
        .service(web::resource("/api/file/upload_auth").route(web::post().to(file::upload_auth)))
        .service(web::resource("/api/file/upload/{key}").route(web::put().to(file::upload_local)))
        .service(web::resource("/api/file/download/{key}").route(web::get().to(file::download_local)));
}
