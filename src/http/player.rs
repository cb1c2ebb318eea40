use crate::services::player::{AddOutcome, ControllerError, LoopMode, PlayerRegistry};
use crate::types::ChannelId;
use actix_web::web::{Data, Json, Path, Query};
use actix_web::{HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

const QUEUE_PAGE_BUDGET: usize = 1000;

#[derive(Deserialize)]
pub(crate) struct JoinRequest {
    target: String,
}

#[derive(Deserialize)]
pub(crate) struct QueueRequest {
    url: String,
}

#[derive(Deserialize)]
pub(crate) struct SkipRequest {
    #[serde(default = "default_skip_count")]
    count: usize,
}

fn default_skip_count() -> usize {
    1
}

#[derive(Deserialize)]
pub(crate) struct LoopRequest {
    mode: String,
}

#[derive(Deserialize)]
pub(crate) struct QueueViewParams {
    #[serde(default = "default_page_budget")]
    page_budget: usize,
}

fn default_page_budget() -> usize {
    QUEUE_PAGE_BUDGET
}

fn outcome(status: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": status }))
}

fn controller_outcome(result: Result<(), ControllerError>, ok_status: &str) -> HttpResponse {
    match result {
        Ok(()) => outcome(ok_status),
        Err(ControllerError::AlreadyConnected { current }) => HttpResponse::Conflict().json(json!({
            "status": "already connected",
            "current": current,
        })),
        Err(ControllerError::NotConnected) => outcome("not connected"),
        Err(ControllerError::AudioBackend(error)) => {
            error!(?error, "Audio backend failure");
            outcome("audio output unavailable")
        }
    }
}

pub(crate) async fn join_channel(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
    request: Json<JoinRequest>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));

    controller_outcome(controller.join(&request.target).await, "joined")
}

pub(crate) async fn leave_channel(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));

    controller_outcome(controller.leave().await, "left")
}

pub(crate) async fn queue_media(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
    request: Json<QueueRequest>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));

    match controller.queue_url(&request.url) {
        AddOutcome::QueuedTrack => outcome("queued"),
        AddOutcome::LoadingCollection => outcome("loading collection"),
    }
}

pub(crate) async fn start_playback(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));

    controller_outcome(controller.play().await, "playing")
}

pub(crate) async fn pause_playback(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));

    controller_outcome(controller.pause().await, "paused")
}

pub(crate) async fn resume_playback(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));

    controller_outcome(controller.resume().await, "resumed")
}

pub(crate) async fn stop_playback(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));

    controller_outcome(controller.stop().await, "stopped")
}

pub(crate) async fn skip_items(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
    request: Json<SkipRequest>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));

    controller.skip(request.count).await;

    outcome("skipped")
}

#[derive(Deserialize)]
pub(crate) struct RemoveRequest {
    index: Option<usize>,
    url: Option<String>,
}

pub(crate) async fn remove_from_queue(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
    request: Json<RemoveRequest>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));

    let removed = match (&request.index, &request.url) {
        (Some(index), _) => controller.remove_from_queue_by_index(*index),
        (None, Some(url)) => controller.remove_from_queue_by_url(url),
        (None, None) => return outcome("nothing to remove"),
    };

    if removed {
        outcome("removed")
    } else {
        outcome("out of range")
    }
}

pub(crate) async fn clear_queue(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));

    controller.clear_queue();

    outcome("cleared")
}

pub(crate) async fn set_loop(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
    request: Json<LoopRequest>,
) -> impl Responder {
    let mode = match request.mode.as_str() {
        "off" => LoopMode::Off,
        "current" => LoopMode::Current,
        "all" => LoopMode::All,
        _ => return outcome("unknown loop mode"),
    };

    let controller = registry.controller(ChannelId(*channel_id));
    controller.set_loop_mode(mode);

    outcome("loop mode set")
}

pub(crate) async fn cycle_loop(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));
    let mode = controller.cycle_loop_mode();

    let label = match mode {
        LoopMode::Off => "off",
        LoopMode::Current => "current",
        LoopMode::All => "all",
    };

    HttpResponse::Ok().json(json!({ "status": "loop mode cycled", "mode": label }))
}

pub(crate) async fn get_queue(
    registry: Data<Arc<PlayerRegistry>>,
    channel_id: Path<u64>,
    params: Query<QueueViewParams>,
) -> impl Responder {
    let controller = registry.controller(ChannelId(*channel_id));
    let view = controller.queue_view(params.page_budget);

    HttpResponse::Ok().json(json!({
        "pages": view.pages,
        "pending_count": view.pending_count,
    }))
}
