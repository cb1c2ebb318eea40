mod health;
mod player;

pub(crate) use health::readiness_check;
pub(crate) use player::{
    clear_queue, cycle_loop, get_queue, join_channel, leave_channel, pause_playback, queue_media,
    remove_from_queue, resume_playback, set_loop, skip_items, start_playback, stop_playback,
};
