use crate::services::player::{AudioBackend, AudioBackendError, AudioSink, SegmentNotifier};
use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Audio backend playing through the default local output device. The
/// output stream is owned by a dedicated thread because it cannot leave the
/// thread it was created on; sinks hand out from its handle.
pub(crate) struct RodioAudioBackend {
    handle: OutputStreamHandle,
}

impl RodioAudioBackend {
    pub(crate) fn initialize() -> Result<Self, AudioBackendError> {
        let (sender, receiver) = std::sync::mpsc::channel();

        std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    if sender.send(Ok(handle)).is_err() {
                        return;
                    }

                    // The stream must outlive every sink created from it.
                    let _stream = stream;

                    loop {
                        std::thread::park();
                    }
                }
                Err(error) => {
                    let _ = sender.send(Err(error));
                }
            })
            .map_err(AudioBackendError::new)?;

        let handle = receiver
            .recv()
            .map_err(AudioBackendError::new)?
            .map_err(AudioBackendError::new)?;

        Ok(Self { handle })
    }
}

#[async_trait]
impl AudioBackend for RodioAudioBackend {
    async fn connect(
        &self,
        target: &str,
    ) -> Result<Arc<dyn AudioSink + Send + Sync>, AudioBackendError> {
        let sink = Sink::try_new(&self.handle).map_err(AudioBackendError::new)?;

        debug!(target, "Created audio sink");

        Ok(Arc::new(RodioSink {
            sink: Arc::new(sink),
        }))
    }

    async fn disconnect(&self, target: &str) -> Result<(), AudioBackendError> {
        debug!(target, "Released audio sink");

        Ok(())
    }
}

pub(crate) struct RodioSink {
    sink: Arc<Sink>,
}

#[async_trait]
impl AudioSink for RodioSink {
    async fn play(
        &self,
        path: &Path,
        notifier: SegmentNotifier,
    ) -> Result<(), AudioBackendError> {
        let source = tokio::task::spawn_blocking({
            let path = path.to_path_buf();

            move || -> Result<_, AudioBackendError> {
                let file = std::fs::File::open(&path).map_err(AudioBackendError::new)?;
                let source =
                    Decoder::new(std::io::BufReader::new(file)).map_err(AudioBackendError::new)?;

                Ok(source)
            }
        })
        .await
        .map_err(AudioBackendError::new)??;

        self.sink.append(source);
        self.sink.play();

        // sleep_until_end blocks a foreign thread; completion is redirected
        // into the play loop through the notifier.
        tokio::task::spawn_blocking({
            let sink = Arc::clone(&self.sink);

            move || {
                sink.sleep_until_end();
                notifier.segment_finished();
            }
        });

        Ok(())
    }

    fn stop(&self) {
        self.sink.stop();
    }

    fn pause(&self) {
        self.sink.pause();
    }

    fn resume(&self) {
        self.sink.play();
    }

    fn is_playing(&self) -> bool {
        !self.sink.empty() && !self.sink.is_paused()
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }
}
