//! File relay endpoints: `upload_auth` issues a slot against whichever
//! backend is configured; `upload`/`download` only ever get real traffic
//! when that backend is the local-disk one.

use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::error::CoordinatorError;
use crate::object_store::ObjectStore;

#[derive(Debug, Deserialize)]
pub struct UploadAuthRequest {
    filename: String,
    #[serde(default = "default_content_type")]
    content_type: String,
}

fn default_content_type() -> String {
    "application/octet-stream".to_owned()
}

pub async fn upload_auth(
    store: web::Data<Arc<dyn ObjectStore>>,
    body: web::Json<UploadAuthRequest>,
) -> Result<HttpResponse, CoordinatorError> {
    let slot = store.issue_upload_slot(&body.filename, &body.content_type).await?;
    Ok(HttpResponse::Ok().json(slot))
}

pub async fn upload_local(
    store: web::Data<Arc<dyn ObjectStore>>,
    path: web::Path<String>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, CoordinatorError> {
    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    store.write(&path.into_inner(), &body, content_type).await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn download_local(
    store: web::Data<Arc<dyn ObjectStore>>,
    path: web::Path<String>,
) -> Result<HttpResponse, CoordinatorError> {
    let (bytes, content_type) = store.read(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().content_type(content_type).body(bytes))
}
