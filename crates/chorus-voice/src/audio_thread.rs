//! Dedicated audio output thread - isolates `!Send` rodio resources from the
//! async runtime.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. Rather than reaching
//! for `unsafe impl Send`, the stream lives on one OS thread for its whole
//! lifetime and [`RodioPlayback`] talks to it over a command channel.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use crate::audio_io::{PlaybackDriver, PlaybackEvent, PlaybackEvents};
use crate::backend::SpeechAudio;
use crate::error::VoiceError;

// ── Commands ───────────────────────────────────────────────────────

enum AudioCommand {
    /// Decode and play a clip, replacing whatever is playing.
    Play {
        audio: SpeechAudio,
        events: PlaybackEvents,
    },

    /// Stop the current clip (fire-and-forget).
    Stop,

    /// Release the output device and exit.
    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// [`PlaybackDriver`] that plays clips on the default output device.
pub struct RodioPlayback {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioPlayback {
    /// Spawn the audio thread and open the default output device.
    ///
    /// Device errors are reported back through a one-shot init channel.
    pub fn spawn() -> Result<Self, VoiceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), VoiceError>>();

        let thread = thread::Builder::new()
            .name("chorus-audio".into())
            .spawn(move || run(&cmd_rx, &init_tx))
            .map_err(|e| VoiceError::OutputStream(format!("failed to spawn audio thread: {e}")))?;

        init_rx.recv().map_err(|_| VoiceError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }
}

impl PlaybackDriver for RodioPlayback {
    fn play(&self, audio: SpeechAudio, events: PlaybackEvents) -> Result<(), VoiceError> {
        self.cmd_tx
            .send(AudioCommand::Play { audio, events })
            .map_err(|_| VoiceError::AudioThreadDied)
    }

    fn stop(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }
}

impl Drop for RodioPlayback {
    fn drop(&mut self) {
        // Best-effort shutdown; the thread may already be dead.
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

// ── Audio thread ───────────────────────────────────────────────────

/// The clip currently owned by the audio thread.
struct ActiveClip {
    sink: Arc<Sink>,
    /// Cleared by whoever reports the terminal event first.
    playing: Arc<AtomicBool>,
    events: PlaybackEvents,
}

impl ActiveClip {
    fn stop(self) {
        self.sink.stop();
        if self.playing.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(PlaybackEvent::Finished);
        }
    }
}

fn run(cmd_rx: &mpsc::Receiver<AudioCommand>, init_tx: &mpsc::Sender<Result<(), VoiceError>>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = init_tx.send(Err(VoiceError::OutputStream(e.to_string())));
            return;
        }
    };

    if init_tx.send(Ok(())).is_err() {
        return;
    }
    tracing::info!("Audio playback initialized on default output device");

    let mut active: Option<ActiveClip> = None;

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            AudioCommand::Play { audio, events } => {
                if let Some(clip) = active.take() {
                    clip.stop();
                }
                active = start_clip(&handle, audio, events);
            }
            AudioCommand::Stop => {
                if let Some(clip) = active.take() {
                    clip.stop();
                    tracing::debug!("Audio playback stopped");
                }
            }
            AudioCommand::Shutdown => break,
        }
    }

    if let Some(clip) = active.take() {
        clip.stop();
    }
    tracing::debug!("Audio thread shutting down");
}

fn start_clip(
    handle: &OutputStreamHandle,
    audio: SpeechAudio,
    events: PlaybackEvents,
) -> Option<ActiveClip> {
    let source = match Decoder::new(Cursor::new(audio.data)) {
        Ok(source) => source,
        Err(e) => {
            let _ = events.send(PlaybackEvent::Failed(format!("decode: {e}")));
            return None;
        }
    };

    let sink = match Sink::try_new(handle) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            let _ = events.send(PlaybackEvent::Failed(e.to_string()));
            return None;
        }
    };

    sink.append(source);
    let playing = Arc::new(AtomicBool::new(true));
    let _ = events.send(PlaybackEvent::Started);
    tracing::debug!("Audio playback started");

    spawn_completion_watcher(Arc::clone(&sink), Arc::clone(&playing), events.clone());

    Some(ActiveClip {
        sink,
        playing,
        events,
    })
}

/// Block a helper thread on the sink until it drains or is stopped.
///
/// `stop()` empties the sink, so `sleep_until_end` returns in both cases; the
/// `playing` flag decides which side reports `Finished`.
fn spawn_completion_watcher(sink: Arc<Sink>, playing: Arc<AtomicBool>, events: PlaybackEvents) {
    thread::spawn(move || {
        sink.sleep_until_end();
        if playing.swap(false, Ordering::SeqCst) {
            tracing::debug!("Playback finished naturally");
            let _ = events.send(PlaybackEvent::Finished);
        }
    });
}
