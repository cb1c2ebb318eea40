use crate::services::player::{
    AddOutcome, AudioBackend, AudioBackendError, AudioSink, LoopMode, PlayerEvent,
    SegmentNotifier, TrackQueue,
};
use crate::types::ChannelId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub(crate) enum ControllerError {
    #[error("Already connected to {current}")]
    AlreadyConnected { current: String },
    #[error("Not connected to any audio output")]
    NotConnected,
    #[error(transparent)]
    AudioBackend(#[from] AudioBackendError),
}

struct Connection {
    target: String,
    sink: Arc<dyn AudioSink + Send + Sync>,
}

/// Per-channel playback state machine: disconnected, connected and idle, or
/// playing. Owns the play loop task and the audio connection.
pub(crate) struct PlaybackController {
    channel_id: ChannelId,
    queue: Arc<TrackQueue>,
    audio_backend: Arc<dyn AudioBackend + Send + Sync>,
    connection: async_lock::Mutex<Option<Connection>>,
    play_task: Mutex<Option<actix_rt::task::JoinHandle<()>>>,
    // Set by a user skip so the following segment completion does not also
    // advance the cursor.
    skip_pending: AtomicBool,
}

impl PlaybackController {
    pub(crate) fn new(
        channel_id: ChannelId,
        queue: Arc<TrackQueue>,
        audio_backend: Arc<dyn AudioBackend + Send + Sync>,
    ) -> Self {
        Self {
            channel_id,
            queue,
            audio_backend,
            connection: async_lock::Mutex::new(None),
            play_task: Mutex::new(None),
            skip_pending: AtomicBool::new(false),
        }
    }

    pub(crate) async fn join(&self, target: &str) -> Result<(), ControllerError> {
        let mut connection = self.connection.lock().await;

        if let Some(existing) = connection.as_ref() {
            if existing.target == target {
                return Ok(());
            }

            return Err(ControllerError::AlreadyConnected {
                current: existing.target.clone(),
            });
        }

        let sink = self.audio_backend.connect(target).await?;
        *connection = Some(Connection {
            target: target.to_string(),
            sink,
        });

        info!(channel_id = %self.channel_id, target, "Connected audio output");

        Ok(())
    }

    pub(crate) async fn leave(&self) -> Result<(), ControllerError> {
        self.cancel_play_task();

        let mut connection = self.connection.lock().await;

        match connection.take() {
            Some(existing) => {
                existing.sink.stop();
                self.audio_backend.disconnect(&existing.target).await?;
                self.queue.clear();

                info!(channel_id = %self.channel_id, target = existing.target, "Disconnected audio output");

                Ok(())
            }
            None => Err(ControllerError::NotConnected),
        }
    }

    /// Starts the play loop. Idempotent while a loop is already running.
    pub(crate) async fn play(self: &Arc<Self>) -> Result<(), ControllerError> {
        if self.connection.lock().await.is_none() {
            return Err(ControllerError::NotConnected);
        }

        let mut play_task = self.play_task.lock().unwrap();

        if let Some(handle) = play_task.as_ref() {
            if !handle.is_finished() {
                debug!(channel_id = %self.channel_id, "Play loop already running");
                return Ok(());
            }
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let notifier = SegmentNotifier::new(sender);

        *play_task = Some(actix_rt::spawn({
            let controller = Arc::clone(self);

            async move {
                controller.play_loop(receiver, notifier).await;
            }
        }));

        Ok(())
    }

    async fn play_loop(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<PlayerEvent>,
        notifier: SegmentNotifier,
    ) {
        loop {
            let path = match self.queue.get().await {
                Ok(Some(path)) => path,
                Ok(None) => {
                    info!(channel_id = %self.channel_id, "Queue exhausted, stopping play loop");
                    break;
                }
                Err(error) => {
                    warn!(channel_id = %self.channel_id, ?error, "Skipping unplayable item");
                    self.queue.skip(1);
                    continue;
                }
            };

            let sink = {
                let connection = self.connection.lock().await;

                match connection.as_ref() {
                    Some(existing) => Arc::clone(&existing.sink),
                    None => break,
                }
            };

            self.skip_pending.store(false, Ordering::SeqCst);

            if let Err(error) = sink.play(&path, notifier.clone()).await {
                error!(channel_id = %self.channel_id, ?error, "Unable to start segment playback");
                break;
            }

            match events.recv().await {
                Some(PlayerEvent::SegmentFinished) => {
                    if !self.skip_pending.swap(false, Ordering::SeqCst) {
                        self.queue.advance();
                    }
                }
                None => break,
            }
        }

        self.finalize().await;
    }

    async fn finalize(&self) {
        let connection = self.connection.lock().await;

        if let Some(existing) = connection.as_ref() {
            if existing.sink.is_playing() {
                existing.sink.stop();
            }
        }
    }

    /// Cancels playback, stops the audio output, and disconnects.
    pub(crate) async fn stop(&self) -> Result<(), ControllerError> {
        self.cancel_play_task();

        {
            let connection = self.connection.lock().await;

            if let Some(existing) = connection.as_ref() {
                existing.sink.stop();
            }
        }

        self.leave().await
    }

    /// Skips the given number of items, interrupting the current segment.
    pub(crate) async fn skip(&self, count: usize) {
        self.skip_pending.store(true, Ordering::SeqCst);
        self.queue.skip(count);

        let connection = self.connection.lock().await;

        if let Some(existing) = connection.as_ref() {
            if existing.sink.is_playing() || existing.sink.is_paused() {
                existing.sink.stop();
            }
        }
    }

    pub(crate) async fn pause(&self) -> Result<(), ControllerError> {
        let connection = self.connection.lock().await;

        match connection.as_ref() {
            Some(existing) => {
                existing.sink.pause();
                Ok(())
            }
            None => Err(ControllerError::NotConnected),
        }
    }

    pub(crate) async fn resume(&self) -> Result<(), ControllerError> {
        let connection = self.connection.lock().await;

        match connection.as_ref() {
            Some(existing) => {
                existing.sink.resume();
                Ok(())
            }
            None => Err(ControllerError::NotConnected),
        }
    }

    pub(crate) async fn is_playing(&self) -> bool {
        let connection = self.connection.lock().await;

        connection
            .as_ref()
            .map(|existing| existing.sink.is_playing())
            .unwrap_or(false)
    }

    pub(crate) async fn is_paused(&self) -> bool {
        let connection = self.connection.lock().await;

        connection
            .as_ref()
            .map(|existing| existing.sink.is_paused())
            .unwrap_or(false)
    }

    pub(crate) fn queue_url(&self, url: &str) -> AddOutcome {
        self.queue.add(url)
    }

    pub(crate) fn clear_queue(&self) {
        self.queue.clear();
    }

    pub(crate) fn remove_from_queue_by_index(&self, index: usize) -> bool {
        self.queue.remove_by_index(index)
    }

    pub(crate) fn remove_from_queue_by_url(&self, url: &str) -> bool {
        self.queue.remove_by_url(url)
    }

    pub(crate) fn loop_mode(&self) -> LoopMode {
        self.queue.loop_mode()
    }

    pub(crate) fn set_loop_mode(&self, mode: LoopMode) {
        self.queue.set_loop_mode(mode)
    }

    pub(crate) fn cycle_loop_mode(&self) -> LoopMode {
        self.queue.cycle_loop_mode()
    }

    /// Human-readable queue listing split into pages of at most `page_budget`
    /// characters, with a trailer for items still being fetched.
    pub(crate) fn queue_view(&self, page_budget: usize) -> QueueView {
        let snapshot = self.queue.resolved_entries();

        let mut pages: Vec<String> = Vec::new();
        let mut page = String::new();

        for entry in &snapshot.entries {
            let marker = if Some(entry.index) == snapshot.current_index {
                "-> "
            } else {
                "   "
            };
            let line = format!(
                "{}{}. {} ({})\n",
                marker,
                entry.index + 1,
                entry.metadata.title,
                format_duration(entry.metadata.duration)
            );

            if !page.is_empty() && page.len() + line.len() > page_budget {
                pages.push(std::mem::take(&mut page));
            }

            page.push_str(&line);
        }

        if !page.is_empty() {
            pages.push(page);
        }

        if snapshot.pending_count > 0 {
            let trailer = format!(
                "{} more songs, which are still being fetched",
                snapshot.pending_count
            );

            match pages.last_mut() {
                Some(last) if last.len() + trailer.len() <= page_budget => {
                    last.push_str(&trailer);
                }
                _ => pages.push(trailer),
            }
        }

        QueueView {
            pages,
            pending_count: snapshot.pending_count,
        }
    }

    fn cancel_play_task(&self) {
        if let Some(handle) = self.play_task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

pub(crate) struct QueueView {
    pub(crate) pages: Vec<String>,
    pub(crate) pending_count: usize,
}

fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
