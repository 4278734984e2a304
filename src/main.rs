//! Process entry point: loads configuration, starts the Registry actor,
//! and serves the websocket and HTTP surfaces.

use std::sync::Arc;

use actix::Actor;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use pairsync_coordinator::{
    clock::Clock,
    config::{Settings, StorageBackend},
    http,
    logging,
    object_store::{local::LocalObjectStore, s3::S3Presigner, ObjectStore},
    push::NullPushNotifier,
    registry::Registry,
    session::WsSession,
};
use slog::{info, o};

async fn ws_route(
    req: HttpRequest,
    stream: web::Payload,
    registry: web::Data<actix::Addr<Registry>>,
    clock: web::Data<Arc<Clock>>,
    log: web::Data<slog::Logger>,
    settings: web::Data<Arc<Settings>>,
) -> Result<HttpResponse, actix_web::Error> {
    let sid = clock.next_socket_id();
    let session = WsSession::new(sid, registry.get_ref().clone(), log.get_ref().clone(), &settings.signal);
    actix_web_actors::ws::start(session, &req, stream)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    let log = logging::init();

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("failed to load configuration, using compiled defaults: {e}");
        Settings::default()
    });
    let settings = Arc::new(settings);
    let clock = Arc::new(Clock::new());

    info!(log, "starting pairsync-coordinator"; "bind_addr" => &settings.server.bind_addr);

    let store: Arc<dyn ObjectStore> = match settings.storage.backend {
        StorageBackend::Local => {
            let local = LocalObjectStore::new(
                settings.storage.local_dir.clone(),
                settings.server.bind_addr.clone(),
                settings.storage.object_ttl_s,
            );
            local
                .ensure_root()
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            let housekeeper_store = LocalObjectStore::new(
                settings.storage.local_dir.clone(),
                settings.server.bind_addr.clone(),
                settings.storage.object_ttl_s,
            );
            let housekeeper_log = log.new(o!("component" => "housekeeper"));
            let cleanup_interval_s = settings.storage.cleanup_interval_s;
            tokio::spawn(async move {
                housekeeper_store.run_housekeeper(cleanup_interval_s, housekeeper_log).await;
            });
            Arc::new(local)
        }
        StorageBackend::S3 => Arc::new(S3Presigner::new(
            settings.storage.s3_endpoint.clone().unwrap_or_default(),
            settings.storage.s3_bucket.clone().unwrap_or_default(),
            settings.storage.s3_region.clone().unwrap_or_default(),
            settings.storage.s3_access_key.clone().unwrap_or_default(),
            settings.storage.s3_secret_key.clone().unwrap_or_default(),
            settings.storage.s3_put_ttl_s,
            settings.storage.s3_get_ttl_s,
        )),
    };

    let registry_log = log.new(o!("component" => "registry"));
    let registry = Registry::new(clock.clone(), settings.clone(), Arc::new(NullPushNotifier), registry_log);
    let registry_addr = registry.start();

    let bind_addr = settings.server.bind_addr.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(registry_addr.clone()))
            .app_data(web::Data::new(clock.clone()))
            .app_data(web::Data::new(log.clone()))
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(settings.clone()))
            .route("/ws", web::get().to(ws_route))
            .configure(http::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
