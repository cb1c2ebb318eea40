use crate::config::Config;
use crate::services::player::{MetaCache, PlayerRegistry, RodioAudioBackend};
use crate::storage::OnDiskStorage;
use actix_rt::signal::unix;
use actix_web::web::Data;
use actix_web::{web, App, HttpServer};
use futures_lite::FutureExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use ytdlp_client::YtDlpClient;

mod config;
mod http;
mod impls;
mod services;
mod storage;
mod types;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    let mut terminate = unix::signal(unix::SignalKind::terminate())?;
    let mut interrupt = unix::signal(unix::SignalKind::interrupt())?;

    dotenv::dotenv().ok();
    env_logger::init();

    let config = Arc::from(Config::from_env());

    info!("Starting application...");

    let cache_dir = PathBuf::from(&config.cache_dir);
    tokio::fs::create_dir_all(&cache_dir).await?;

    let cache_storage = OnDiskStorage::create(cache_dir.join("meta.json"));
    let meta_cache = Arc::new(MetaCache::create(Arc::new(cache_storage)).await);
    let ytdlp_client = YtDlpClient::new(config.ytdlp_binary.clone());
    let audio_backend = RodioAudioBackend::initialize()
        .expect("Unable to initialize audio output");

    let player_registry = Arc::new(PlayerRegistry::new(
        Arc::new(ytdlp_client),
        Arc::new(audio_backend),
        meta_cache,
        cache_dir,
    ));

    let shutdown_timeout = config.shutdown_timeout;
    let bind_address = config.bind_address.clone();

    let server = HttpServer::new({
        move || {
            App::new()
                .app_data(Data::new(Arc::clone(&player_registry)))
                .service(web::resource("/health").route(web::get().to(http::readiness_check)))
                .service(
                    web::scope("/channels/{channel_id}")
                        .service(web::resource("/join").route(web::post().to(http::join_channel)))
                        .service(web::resource("/leave").route(web::post().to(http::leave_channel)))
                        .service(
                            web::resource("/queue")
                                .route(web::post().to(http::queue_media))
                                .route(web::get().to(http::get_queue)),
                        )
                        .service(web::resource("/play").route(web::post().to(http::start_playback)))
                        .service(
                            web::resource("/pause").route(web::post().to(http::pause_playback)),
                        )
                        .service(
                            web::resource("/resume").route(web::post().to(http::resume_playback)),
                        )
                        .service(web::resource("/stop").route(web::post().to(http::stop_playback)))
                        .service(web::resource("/skip").route(web::post().to(http::skip_items)))
                        .service(
                            web::resource("/remove").route(web::post().to(http::remove_from_queue)),
                        )
                        .service(web::resource("/clear").route(web::post().to(http::clear_queue)))
                        .service(web::resource("/loop").route(web::post().to(http::set_loop)))
                        .service(
                            web::resource("/loop/cycle").route(web::post().to(http::cycle_loop)),
                        ),
                )
        }
    })
    .shutdown_timeout(shutdown_timeout)
    .bind(bind_address)?
    .run();

    let server_handle = server.handle();

    actix_rt::spawn({
        async move {
            if let Err(error) = server.await {
                error!(?error, "Error on http server");
            }
        }
    });

    info!("Application started");

    interrupt.recv().or(terminate.recv()).await;

    info!("Received shutdown signal. Shutting down gracefully...");

    server_handle.stop(true).await;

    Ok(())
}
