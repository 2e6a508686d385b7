//! Audio output on the default device via rodio.
//!
//! rodio's `OutputStream` must stay alive for as long as anything plays and
//! cannot leave the thread that opened it, so a dedicated thread owns the
//! stream and the current `Sink`. [`RodioAudioOutput`] talks to it through a
//! command channel and keeps a mirror of the channel state for the
//! synchronous trait getters.
//!
//! Every attach and detach starts a new attachment. The thread only applies
//! commands and emits events for the attachment that is current at the time,
//! checked under the delivery lock, so nothing about a detached buffer is
//! delivered once `detach` returns.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{AudioData, AudioOutput, OutputEvent, OutputListener, StreamInfo};
use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Position report interval while playing.
const TICK: Duration = Duration::from_millis(200);

enum Command {
    Attach {
        attachment: u64,
        data: AudioData,
        reply: oneshot::Sender<Result<StreamInfo>>,
    },
    Play {
        attachment: u64,
        reply: oneshot::Sender<Result<()>>,
    },
    Pause {
        attachment: u64,
    },
    Detach,
    Seek {
        attachment: u64,
        position: Duration,
    },
    SetVolume(f32),
    Shutdown,
}

/// Mirror of the channel, readable without a round trip to the audio thread.
#[derive(Debug, Clone, PartialEq)]
struct Status {
    attachment: u64,
    has_source: bool,
    paused: bool,
    position: Duration,
    duration: Option<Duration>,
    volume: f32,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            attachment: 0,
            has_source: false,
            paused: true,
            position: Duration::ZERO,
            duration: None,
            volume: 1.0,
        }
    }
}

#[derive(Default)]
struct Shared {
    status: Mutex<Status>,
    listener: Mutex<Option<Arc<dyn OutputListener>>>,
    /// Held while an event is delivered and while the attachment changes.
    /// Always taken before `status`.
    delivery: Mutex<()>,
}

impl Shared {
    /// Start a new, empty attachment and return its id.
    fn next_attachment(&self) -> u64 {
        let _delivery = self.delivery.lock();
        let mut status = self.status.lock();
        let volume = status.volume;
        *status = Status {
            attachment: status.attachment + 1,
            volume,
            ..Status::default()
        };
        status.attachment
    }

    fn current_attachment(&self) -> u64 {
        self.status.lock().attachment
    }

    /// Apply `update` when `attachment` is still current.
    fn update<R>(&self, attachment: u64, update: impl FnOnce(&mut Status) -> R) -> Option<R> {
        let mut status = self.status.lock();
        (status.attachment == attachment).then(|| update(&mut status))
    }

    fn emit(&self, attachment: u64, event: OutputEvent) {
        let _delivery = self.delivery.lock();
        if self.current_attachment() != attachment {
            return;
        }
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_event(event);
        }
    }
}

/// [`AudioOutput`] playing through the default output device.
///
/// Listeners run on the audio thread and must not call `attach`, `detach`
/// or `play` on this output from inside `on_event`.
pub struct RodioAudioOutput {
    shared: Arc<Shared>,
    commands: Mutex<Sender<Command>>,
}

impl RodioAudioOutput {
    /// Open the default output device. Fails when the host has none.
    pub fn open_default() -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let (commands, receiver) = mpsc::channel();
        let (ready, opened) = mpsc::channel::<std::result::Result<(), String>>();

        let thread_shared = Arc::clone(&shared);
        std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => {
                        let _ = ready.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready.send(Err(e.to_string()));
                        return;
                    }
                };
                AudioThread::new(stream, thread_shared).run(receiver);
            })
            .map_err(|e| BridgeError::NotAvailable(format!("audio thread: {}", e)))?;

        match opened.recv() {
            Ok(Ok(())) => {
                info!("Opened default audio output");
                Ok(Self {
                    shared,
                    commands: Mutex::new(commands),
                })
            }
            Ok(Err(message)) => Err(BridgeError::NotAvailable(format!(
                "no default audio device: {}",
                message
            ))),
            Err(_) => Err(BridgeError::NotAvailable(
                "audio thread exited during startup".to_string(),
            )),
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .lock()
            .send(command)
            .map_err(|_| thread_gone())
    }
}

fn thread_gone() -> BridgeError {
    BridgeError::OperationFailed("audio thread is not running".to_string())
}

impl Drop for RodioAudioOutput {
    fn drop(&mut self) {
        let _ = self.send(Command::Shutdown);
    }
}

#[async_trait]
impl AudioOutput for RodioAudioOutput {
    fn set_listener(&self, listener: Arc<dyn OutputListener>) {
        *self.shared.listener.lock() = Some(listener);
    }

    async fn attach(&self, data: AudioData) -> Result<StreamInfo> {
        let attachment = self.shared.next_attachment();
        let (reply, response) = oneshot::channel();
        self.send(Command::Attach {
            attachment,
            data,
            reply,
        })?;
        response.await.map_err(|_| thread_gone())?
    }

    async fn play(&self) -> Result<()> {
        let attachment = {
            let status = self.shared.status.lock();
            if !status.has_source {
                return Err(BridgeError::OperationFailed("no audio attached".to_string()));
            }
            status.attachment
        };
        let (reply, response) = oneshot::channel();
        self.send(Command::Play { attachment, reply })?;
        response.await.map_err(|_| thread_gone())?
    }

    fn pause(&self) {
        let attachment = {
            let mut status = self.shared.status.lock();
            if !status.has_source || status.paused {
                return;
            }
            status.paused = true;
            status.attachment
        };
        if let Err(e) = self.send(Command::Pause { attachment }) {
            warn!(error = %e, "Pause not delivered");
        }
    }

    fn detach(&self) {
        self.shared.next_attachment();
        if let Err(e) = self.send(Command::Detach) {
            debug!(error = %e, "Detach not delivered");
        }
    }

    fn seek(&self, position: Duration) -> Result<()> {
        let attachment = {
            let mut status = self.shared.status.lock();
            if !status.has_source {
                return Err(BridgeError::OperationFailed("no audio attached".to_string()));
            }
            status.position = match status.duration {
                Some(duration) => position.min(duration),
                None => position,
            };
            status.attachment
        };
        self.send(Command::Seek {
            attachment,
            position,
        })
    }

    fn position(&self) -> Duration {
        self.shared.status.lock().position
    }

    fn duration(&self) -> Option<Duration> {
        self.shared.status.lock().duration
    }

    fn set_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.shared.status.lock().volume = volume;
        if let Err(e) = self.send(Command::SetVolume(volume)) {
            debug!(error = %e, "Volume change not delivered");
        }
    }

    fn volume(&self) -> f32 {
        self.shared.status.lock().volume
    }

    fn is_paused(&self) -> bool {
        self.shared.status.lock().paused
    }

    fn has_source(&self) -> bool {
        self.shared.status.lock().has_source
    }
}

/// What the audio thread has loaded for one attachment.
struct Loaded {
    attachment: u64,
    sink: Sink,
    /// Kept to rebuild the source after it played out.
    data: AudioData,
    ended: bool,
}

/// Owner of the stream and sink. Lives on the audio thread.
struct AudioThread {
    stream: OutputStream,
    shared: Arc<Shared>,
    current: Option<Loaded>,
}

impl AudioThread {
    fn new(stream: OutputStream, shared: Arc<Shared>) -> Self {
        Self {
            stream,
            shared,
            current: None,
        }
    }

    fn run(&mut self, commands: Receiver<Command>) {
        loop {
            match commands.recv_timeout(TICK) {
                Ok(command) => {
                    if self.handle(command) {
                        break;
                    }
                    while let Ok(command) = commands.try_recv() {
                        if self.handle(command) {
                            self.unload();
                            return;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            self.tick();
        }

        self.unload();
        debug!("Audio thread stopped");
    }

    /// Returns `true` on shutdown.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Attach {
                attachment,
                data,
                reply,
            } => {
                let result = self.attach(attachment, data);
                let duration = result.as_ref().ok().and_then(|info| info.duration);
                let attached = result.is_ok();
                let _ = reply.send(result);
                if attached {
                    self.shared
                        .emit(attachment, OutputEvent::MetadataLoaded { duration });
                }
            }
            Command::Play { attachment, reply } => {
                let _ = reply.send(self.play(attachment));
            }
            Command::Pause { attachment } => {
                if let Some(loaded) = self.loaded(attachment) {
                    loaded.sink.pause();
                }
            }
            Command::Detach => self.unload(),
            Command::Seek {
                attachment,
                position,
            } => self.seek(attachment, position),
            Command::SetVolume(volume) => {
                if let Some(loaded) = &self.current {
                    loaded.sink.set_volume(volume);
                }
            }
            Command::Shutdown => return true,
        }
        false
    }

    fn loaded(&mut self, attachment: u64) -> Option<&mut Loaded> {
        self.current
            .as_mut()
            .filter(|loaded| loaded.attachment == attachment)
    }

    fn attach(&mut self, attachment: u64, data: AudioData) -> Result<StreamInfo> {
        self.unload();
        if self.shared.current_attachment() != attachment {
            return Err(BridgeError::OperationFailed(
                "detached before the audio was ready".to_string(),
            ));
        }

        let volume = self.shared.status.lock().volume;
        let (sink, duration) = self.build_sink(&data, volume)?;
        let applied = self.shared.update(attachment, |status| {
            status.has_source = true;
            status.paused = true;
            status.position = Duration::ZERO;
            status.duration = duration;
        });
        if applied.is_none() {
            sink.stop();
            return Err(BridgeError::OperationFailed(
                "detached before the audio was ready".to_string(),
            ));
        }

        debug!(attachment, bytes = data.len(), ?duration, "Attached audio");
        self.current = Some(Loaded {
            attachment,
            sink,
            data,
            ended: false,
        });
        Ok(StreamInfo::default().with_duration(duration))
    }

    /// Paused sink holding a fresh decoder over `data`.
    fn build_sink(&self, data: &AudioData, volume: f32) -> Result<(Sink, Option<Duration>)> {
        let decoder = Decoder::new(Cursor::new(data.bytes.clone()))
            .map_err(|e| BridgeError::Undecodable(e.to_string()))?;
        let duration = decoder.total_duration();

        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.set_volume(volume);
        sink.append(decoder);
        Ok((sink, duration))
    }

    /// Played-out sources are gone from the sink; reload from the start.
    fn rewind_if_ended(&mut self, attachment: u64) -> Result<()> {
        let Some(loaded) = self.current.as_ref() else {
            return Ok(());
        };
        if loaded.attachment != attachment || !loaded.ended {
            return Ok(());
        }
        let volume = self.shared.status.lock().volume;
        let (sink, _) = self.build_sink(&loaded.data, volume)?;
        if let Some(loaded) = self.current.as_mut() {
            loaded.sink.stop();
            loaded.sink = sink;
            loaded.ended = false;
        }
        Ok(())
    }

    fn play(&mut self, attachment: u64) -> Result<()> {
        self.rewind_if_ended(attachment)?;
        let Some(loaded) = self.loaded(attachment) else {
            return Err(BridgeError::OperationFailed("no audio attached".to_string()));
        };
        loaded.sink.play();
        self.shared.update(attachment, |status| status.paused = false);
        Ok(())
    }

    fn seek(&mut self, attachment: u64, position: Duration) {
        if let Err(e) = self.rewind_if_ended(attachment) {
            warn!(error = %e, "Could not reload audio for seek");
            return;
        }
        if let Some(loaded) = self.loaded(attachment) {
            if let Err(e) = loaded.sink.try_seek(position) {
                warn!(error = %e, ?position, "Seek failed");
            }
        }
    }

    fn unload(&mut self) {
        if let Some(loaded) = self.current.take() {
            loaded.sink.stop();
        }
    }

    fn tick(&mut self) {
        let Some(loaded) = self.current.as_mut() else {
            return;
        };
        if loaded.ended {
            return;
        }

        let attachment = loaded.attachment;
        let position = loaded.sink.get_pos();
        let finished = loaded.sink.empty();
        let playing = self.shared.update(attachment, |status| {
            if finished {
                status.paused = true;
                status.position = status.duration.unwrap_or(position);
            } else if !status.paused {
                status.position = position;
            }
            !status.paused
        });

        match playing {
            None => {}
            Some(_) if finished => {
                loaded.ended = true;
                debug!(attachment, "Audio played to its end");
                self.shared.emit(attachment, OutputEvent::Ended);
            }
            Some(true) => self
                .shared
                .emit(attachment, OutputEvent::TimeUpdate { position }),
            Some(false) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<OutputEvent>>,
    }

    impl OutputListener for Recorder {
        fn on_event(&self, event: OutputEvent) {
            self.events.lock().push(event);
        }
    }

    fn shared_with_listener() -> (Shared, Arc<Recorder>) {
        let shared = Shared::default();
        let recorder = Arc::new(Recorder::default());
        *shared.listener.lock() = Some(recorder.clone());
        (shared, recorder)
    }

    #[test]
    fn test_status_defaults_to_paused_full_volume() {
        let status = Status::default();
        assert!(status.paused);
        assert!(!status.has_source);
        assert_eq!(status.volume, 1.0);
    }

    #[test]
    fn test_events_for_current_attachment_are_delivered() {
        let (shared, recorder) = shared_with_listener();
        let attachment = shared.next_attachment();

        shared.emit(attachment, OutputEvent::Ended);
        assert_eq!(*recorder.events.lock(), vec![OutputEvent::Ended]);
    }

    #[test]
    fn test_events_after_detach_are_dropped() {
        let (shared, recorder) = shared_with_listener();
        let attached = shared.next_attachment();
        shared.next_attachment();

        shared.emit(attached, OutputEvent::Ended);
        shared.emit(
            attached,
            OutputEvent::TimeUpdate {
                position: Duration::from_secs(1),
            },
        );
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_new_attachment_resets_status_but_keeps_volume() {
        let shared = Shared::default();
        let first = shared.next_attachment();
        shared.update(first, |status| {
            status.has_source = true;
            status.paused = false;
            status.position = Duration::from_secs(9);
            status.volume = 0.3;
        });

        let second = shared.next_attachment();
        let status = shared.status.lock().clone();
        assert_eq!(status.attachment, second);
        assert!(!status.has_source);
        assert!(status.paused);
        assert_eq!(status.position, Duration::ZERO);
        assert_eq!(status.volume, 0.3);
    }

    #[test]
    fn test_stale_updates_are_ignored() {
        let shared = Shared::default();
        let first = shared.next_attachment();
        shared.next_attachment();

        assert_eq!(shared.update(first, |status| status.has_source = true), None);
        assert!(!shared.status.lock().has_source);
    }
}
