//! Speech sequencing queue.
//!
//! Agents' lines are synthesized and played strictly one at a time, in the
//! order they were enqueued. A single worker task owns the loop:
//!
//! ```text
//! pop ─► on_begin ─► synthesize ─► play ─► Started ─► on_start
//!                        │           │                   │
//!                        └── error ──┴──── Failed ───────┴─► on_failed
//!                                                             │
//!                         Finished / stop() / timeout ───────►on_end ─► pause ─► pop
//! ```
//!
//! Every dequeued request gets exactly one `on_end`, whatever happened to
//! it. Requests dropped from the pending list by [`SpeechQueue::stop`] get no
//! callbacks at all.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chorus_core::{
    ConversationEvent, ConversationObserver, ConversationSettings, SpeechRequestId,
};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio_io::{PlaybackDriver, PlaybackEvent};
use crate::backend::SpeechSynthesizer;
use crate::error::VoiceError;

// ── Callbacks ──────────────────────────────────────────────────────

/// One-shot hook run by the queue worker.
pub type SpeechCallback = Box<dyn FnOnce() + Send + 'static>;

/// One-shot hook receiving the failure that ended a request.
pub type FailureCallback = Box<dyn FnOnce(&VoiceError) + Send + 'static>;

/// One-shot hook receiving the queue status right after a request ended.
pub type EndCallback = Box<dyn FnOnce(QueueStatus) + Send + 'static>;

/// Hooks attached to a single speech request.
///
/// All hooks run on the worker task and must not block.
#[derive(Default)]
pub struct SpeechCallbacks {
    on_begin: Option<SpeechCallback>,
    on_start: Option<SpeechCallback>,
    on_failed: Option<FailureCallback>,
    on_end: Option<EndCallback>,
}

impl SpeechCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The request was taken off the queue and synthesis is about to begin.
    #[must_use]
    pub fn on_begin(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_begin = Some(Box::new(f));
        self
    }

    /// Audio became audible.
    #[must_use]
    pub fn on_start(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Synthesis or playback failed. Not called for `stop()`.
    #[must_use]
    pub fn on_failed(mut self, f: impl FnOnce(&VoiceError) + Send + 'static) -> Self {
        self.on_failed = Some(Box::new(f));
        self
    }

    /// The request is over. Always called once for a dequeued request.
    #[must_use]
    pub fn on_end(mut self, f: impl FnOnce(QueueStatus) + Send + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for SpeechCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechCallbacks")
            .field("on_begin", &self.on_begin.is_some())
            .field("on_start", &self.on_start.is_some())
            .field("on_failed", &self.on_failed.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

// ── Requests & status ──────────────────────────────────────────────

/// A line waiting to be spoken.
#[derive(Debug)]
pub struct SpeechRequest {
    pub id: SpeechRequestId,
    /// Text sent to the synthesizer, tags included.
    pub text: String,
    pub voice_id: String,
    pub speaker_name: String,
    callbacks: SpeechCallbacks,
}

impl SpeechRequest {
    pub fn new(
        text: impl Into<String>,
        voice_id: impl Into<String>,
        speaker_name: impl Into<String>,
        callbacks: SpeechCallbacks,
    ) -> Self {
        Self {
            id: SpeechRequestId::next(),
            text: text.into(),
            voice_id: voice_id.into(),
            speaker_name: speaker_name.into(),
            callbacks,
        }
    }
}

/// Snapshot of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStatus {
    /// A request is between dequeue and `on_end`.
    pub is_playing: bool,
    /// Requests still waiting.
    pub queue_length: usize,
}

/// Timing knobs for the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Silence inserted after every request.
    pub inter_item_pause: Duration,
    pub synthesis_timeout: Duration,
    pub playback_timeout: Duration,
}

impl QueueConfig {
    #[must_use]
    pub fn from_settings(settings: &ConversationSettings) -> Self {
        Self {
            inter_item_pause: settings.effective_inter_item_pause(),
            synthesis_timeout: settings.effective_synthesis_timeout(),
            playback_timeout: settings.effective_playback_timeout(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::from_settings(&ConversationSettings::with_defaults())
    }
}

// ── Queue ──────────────────────────────────────────────────────────

struct ActiveRequest {
    id: SpeechRequestId,
    cancel: CancellationToken,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<SpeechRequest>,
    active: Option<ActiveRequest>,
}

impl QueueState {
    fn status(&self) -> QueueStatus {
        QueueStatus {
            is_playing: self.active.is_some(),
            queue_length: self.pending.len(),
        }
    }

    fn is_active(&self, id: SpeechRequestId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == id)
    }
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Notify,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: Arc<dyn PlaybackDriver>,
    observer: Arc<dyn ConversationObserver>,
    config: QueueConfig,
}

/// FIFO queue that speaks one request at a time.
///
/// Construction spawns the worker task, so it must happen inside a tokio
/// runtime. Dropping the queue aborts the worker and silences playback.
pub struct SpeechQueue {
    shared: Arc<Shared>,
    worker: JoinHandle<()>,
}

impl SpeechQueue {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        playback: Arc<dyn PlaybackDriver>,
        observer: Arc<dyn ConversationObserver>,
        config: QueueConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
            synthesizer,
            playback,
            observer,
            config,
        });
        let worker = tokio::spawn(run_worker(Arc::clone(&shared)));

        tracing::debug!(
            synthesizer = shared.synthesizer.name(),
            pause = ?config.inter_item_pause,
            "Speech queue started"
        );

        Self { shared, worker }
    }

    /// Append a request and return immediately.
    pub fn enqueue(&self, request: SpeechRequest) -> SpeechRequestId {
        let id = request.id;
        let speaker = request.speaker_name.clone();

        let queue_len = {
            let mut state = self.shared.lock();
            state.pending.push_back(request);
            state.pending.len()
        };
        self.shared.wake.notify_one();

        tracing::debug!(%id, %speaker, queue_len, "Speech enqueued");
        self.shared.observer.emit(ConversationEvent::SpeechQueued {
            request_id: id,
            speaker,
            queue_len,
        });
        id
    }

    /// Drop everything pending and interrupt the active request.
    ///
    /// The active request still receives `on_end` (from the worker, shortly
    /// after). Safe to call repeatedly.
    pub fn stop(&self) {
        let (dropped, active) = {
            let mut state = self.shared.lock();
            let dropped: Vec<SpeechRequest> = state.pending.drain(..).collect();
            (dropped, state.active.take())
        };

        if let Some(active) = active {
            active.cancel.cancel();
            tracing::info!(id = %active.id, dropped = dropped.len(), "Speech queue stopped");
        } else if !dropped.is_empty() {
            tracing::info!(dropped = dropped.len(), "Speech queue cleared");
        }
        // The pending requests' callbacks are released here, outside the lock.
        drop(dropped);
    }

    #[must_use]
    pub fn status(&self) -> QueueStatus {
        self.shared.lock().status()
    }

    /// Id of the request currently being synthesized or played.
    #[must_use]
    pub fn active_request(&self) -> Option<SpeechRequestId> {
        self.shared.lock().active.as_ref().map(|active| active.id)
    }

    #[must_use]
    pub fn config(&self) -> QueueConfig {
        self.shared.config
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        self.worker.abort();
        self.shared.playback.stop();
    }
}

impl std::fmt::Debug for SpeechQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechQueue")
            .field("status", &self.status())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

// ── Worker ─────────────────────────────────────────────────────────

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pop the next request and mark it active.
    fn take_next(&self) -> Option<(SpeechRequest, CancellationToken)> {
        let mut state = self.lock();
        let request = state.pending.pop_front()?;
        let cancel = CancellationToken::new();
        state.active = Some(ActiveRequest {
            id: request.id,
            cancel: cancel.clone(),
        });
        Some((request, cancel))
    }

    /// Run `on_start` only if `id` was not stopped in the meantime.
    ///
    /// Holding the lock here orders the hook against `stop()`: either the
    /// hook runs first, or it never runs.
    fn begin_audible(&self, id: SpeechRequestId, on_start: Option<SpeechCallback>) -> bool {
        let state = self.lock();
        if !state.is_active(id) {
            return false;
        }
        if let Some(on_start) = on_start {
            on_start();
        }
        drop(state);
        true
    }

    /// Clear the active slot (if still ours) and report the resulting status.
    fn finish(&self, id: SpeechRequestId) -> QueueStatus {
        let mut state = self.lock();
        if state.is_active(id) {
            state.active = None;
        }
        state.status()
    }

    async fn process(&self, request: SpeechRequest, cancel: &CancellationToken) {
        let SpeechRequest {
            id,
            text,
            voice_id,
            speaker_name,
            callbacks,
        } = request;
        let SpeechCallbacks {
            on_begin,
            on_start,
            on_failed,
            on_end,
        } = callbacks;

        if let Some(on_begin) = on_begin {
            on_begin();
        }

        let outcome = self
            .speak(id, &text, &voice_id, &speaker_name, on_start, cancel)
            .await;

        match outcome {
            Ok(()) => {
                tracing::debug!(%id, speaker = %speaker_name, "Speech finished");
                self.observer
                    .emit(ConversationEvent::SpeechFinished { request_id: id });
            }
            Err(VoiceError::Cancelled) => {
                tracing::debug!(%id, speaker = %speaker_name, "Speech cancelled");
                self.observer
                    .emit(ConversationEvent::SpeechFinished { request_id: id });
            }
            Err(e) => {
                tracing::warn!(%id, speaker = %speaker_name, error = %e, "Speech request failed, skipping");
                self.observer.emit(ConversationEvent::SpeechFailed {
                    request_id: id,
                    speaker: speaker_name.clone(),
                    error: e.to_string(),
                });
                if let Some(on_failed) = on_failed {
                    on_failed(&e);
                }
            }
        }

        let status = self.finish(id);
        if let Some(on_end) = on_end {
            on_end(status);
        }
    }

    async fn speak(
        &self,
        id: SpeechRequestId,
        text: &str,
        voice_id: &str,
        speaker_name: &str,
        on_start: Option<SpeechCallback>,
        cancel: &CancellationToken,
    ) -> Result<(), VoiceError> {
        let limit = self.config.synthesis_timeout;
        let audio = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(VoiceError::Cancelled),
            result = tokio::time::timeout(limit, self.synthesizer.synthesize(text, voice_id)) => {
                result.map_err(|_| VoiceError::SynthesisTimeout(limit))??
            }
        };

        if audio.is_empty() {
            return Err(VoiceError::EmptyAudio);
        }
        if cancel.is_cancelled() {
            return Err(VoiceError::Cancelled);
        }

        let (events_tx, mut events) = mpsc::unbounded_channel();
        self.playback.play(audio, events_tx)?;

        let deadline = tokio::time::sleep(self.config.playback_timeout);
        tokio::pin!(deadline);
        let mut on_start = Some(on_start);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.playback.stop();
                    return Err(VoiceError::Cancelled);
                }
                () = &mut deadline => {
                    self.playback.stop();
                    return Err(VoiceError::PlaybackTimeout(self.config.playback_timeout));
                }
                event = events.recv() => match event {
                    Some(PlaybackEvent::Started) => {
                        let Some(hook) = on_start.take() else { continue };
                        if !self.begin_audible(id, hook) {
                            self.playback.stop();
                            return Err(VoiceError::Cancelled);
                        }
                        tracing::debug!(%id, speaker = %speaker_name, "Speech audible");
                        self.observer.emit(ConversationEvent::SpeechStarted {
                            request_id: id,
                            speaker: speaker_name.to_owned(),
                        });
                    }
                    Some(PlaybackEvent::Finished) if on_start.is_none() => return Ok(()),
                    Some(PlaybackEvent::Finished) => {
                        return Err(VoiceError::Playback(
                            "playback ended before audio started".into(),
                        ));
                    }
                    None => {
                        return Err(VoiceError::Playback(
                            "playback driver hung up without finishing".into(),
                        ));
                    }
                    Some(PlaybackEvent::Failed(reason)) => {
                        return Err(VoiceError::Playback(reason));
                    }
                },
            }
        }
    }
}

async fn run_worker(shared: Arc<Shared>) {
    loop {
        let Some((request, cancel)) = shared.take_next() else {
            shared.wake.notified().await;
            continue;
        };

        shared.process(request, &cancel).await;

        if !cancel.is_cancelled() && !shared.config.inter_item_pause.is_zero() {
            tokio::time::sleep(shared.config.inter_item_pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chorus_core::ChannelObserver;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::backend::{AudioFormat, SpeechAudio};
    use crate::playback::TimedPlayback;

    /// Synthesizer with per-text latency and failures.
    #[derive(Default)]
    struct FakeSynth {
        delays: HashMap<&'static str, Duration>,
        failing: Vec<&'static str>,
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynth {
        async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<SpeechAudio, VoiceError> {
            if let Some(delay) = self.delays.get(text) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.iter().any(|failing| *failing == text) {
                return Err(VoiceError::Synthesis(format!("cannot say {text}")));
            }
            // One second of audio at 128 kbit/s.
            Ok(SpeechAudio::new(
                vec![0; 16_000],
                AudioFormat::Mp3 { bitrate: 128_000 },
            ))
        }
    }

    fn queue_with(
        synth: FakeSynth,
        config: QueueConfig,
    ) -> (SpeechQueue, UnboundedReceiver<ConversationEvent>) {
        let (observer, rx) = ChannelObserver::new();
        let queue = SpeechQueue::new(
            Arc::new(synth),
            Arc::new(TimedPlayback::new()),
            Arc::new(observer),
            config,
        );
        (queue, rx)
    }

    fn request(text: &str, callbacks: SpeechCallbacks) -> SpeechRequest {
        SpeechRequest::new(text, "voice", format!("speaker-{text}"), callbacks)
    }

    /// Drain events until `count` requests have ended.
    async fn collect_until_ended(
        rx: &mut UnboundedReceiver<ConversationEvent>,
        count: usize,
    ) -> Vec<ConversationEvent> {
        let mut events = Vec::new();
        let mut ended = 0;
        while ended < count {
            let event = tokio::time::timeout(Duration::from_secs(600), rx.recv())
                .await
                .expect("queue stalled")
                .expect("observer closed");
            if matches!(
                event,
                ConversationEvent::SpeechFinished { .. } | ConversationEvent::SpeechFailed { .. }
            ) {
                ended += 1;
            }
            events.push(event);
        }
        events
    }

    fn lifecycle(events: &[ConversationEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                ConversationEvent::SpeechStarted { speaker, .. } => Some(format!("start:{speaker}")),
                ConversationEvent::SpeechFinished { request_id } => Some(format!("end:{request_id}")),
                ConversationEvent::SpeechFailed { speaker, .. } => Some(format!("fail:{speaker}")),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn plays_in_enqueue_order_despite_latency() {
        let synth = FakeSynth {
            delays: HashMap::from([
                ("a", Duration::from_secs(3)),
                ("b", Duration::from_millis(100)),
                ("c", Duration::from_secs(1)),
            ]),
            ..FakeSynth::default()
        };
        let (queue, mut rx) = queue_with(synth, QueueConfig::default());

        let a = queue.enqueue(request("a", SpeechCallbacks::new()));
        let b = queue.enqueue(request("b", SpeechCallbacks::new()));
        let c = queue.enqueue(request("c", SpeechCallbacks::new()));

        let events = collect_until_ended(&mut rx, 3).await;
        assert_eq!(
            lifecycle(&events),
            vec![
                "start:speaker-a".to_string(),
                format!("end:{a}"),
                "start:speaker-b".to_string(),
                format!("end:{b}"),
                "start:speaker-c".to_string(),
                format!("end:{c}"),
            ]
        );
        assert_eq!(queue.status(), QueueStatus::default());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_skipped_and_still_ends() {
        let synth = FakeSynth {
            failing: vec!["b"],
            ..FakeSynth::default()
        };
        let (queue, mut rx) = queue_with(synth, QueueConfig::default());
        let ends = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));

        for text in ["a", "b", "c"] {
            let ends = Arc::clone(&ends);
            let failures = Arc::clone(&failures);
            queue.enqueue(request(
                text,
                SpeechCallbacks::new()
                    .on_failed(move |_| {
                        failures.fetch_add(1, Ordering::SeqCst);
                    })
                    .on_end(move |_| {
                        ends.fetch_add(1, Ordering::SeqCst);
                    }),
            ));
        }

        let events = collect_until_ended(&mut rx, 3).await;
        let steps = lifecycle(&events);
        assert_eq!(steps[0], "start:speaker-a");
        assert_eq!(steps[2], "fail:speaker-b");
        assert_eq!(steps[3], "start:speaker-c");
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert_eq!(ends.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_synthesis_times_out() {
        let synth = FakeSynth {
            delays: HashMap::from([("slow", Duration::from_secs(30))]),
            ..FakeSynth::default()
        };
        let config = QueueConfig {
            synthesis_timeout: Duration::from_secs(2),
            ..QueueConfig::default()
        };
        let (queue, mut rx) = queue_with(synth, config);
        let started = Arc::new(AtomicUsize::new(0));
        let started_hook = Arc::clone(&started);

        queue.enqueue(request(
            "slow",
            SpeechCallbacks::new().on_start(move || {
                started_hook.fetch_add(1, Ordering::SeqCst);
            }),
        ));

        let events = collect_until_ended(&mut rx, 1).await;
        let Some(ConversationEvent::SpeechFailed { error, .. }) = events.last() else {
            panic!("expected a failure, got {events:?}");
        };
        assert!(error.contains("timed out"), "{error}");
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_drops_pending_and_ends_active() {
        let (queue, mut rx) = queue_with(FakeSynth::default(), QueueConfig::default());
        let begun = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));

        for text in ["a", "b", "c"] {
            let begun = Arc::clone(&begun);
            let ends = Arc::clone(&ends);
            queue.enqueue(request(
                text,
                SpeechCallbacks::new()
                    .on_begin(move || {
                        begun.fetch_add(1, Ordering::SeqCst);
                    })
                    .on_end(move |_| {
                        ends.fetch_add(1, Ordering::SeqCst);
                    }),
            ));
        }

        loop {
            if let Some(ConversationEvent::SpeechStarted { .. }) = rx.recv().await {
                break;
            }
        }
        queue.stop();
        queue.stop();

        collect_until_ended(&mut rx, 1).await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(begun.load(Ordering::SeqCst), 1);
        assert_eq!(ends.load(Ordering::SeqCst), 1);
        assert_eq!(queue.status(), QueueStatus::default());
        while let Ok(event) = rx.try_recv() {
            assert!(
                !matches!(event, ConversationEvent::SpeechStarted { .. }),
                "nothing may start after stop: {event:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_synthesis_never_starts() {
        let synth = FakeSynth {
            delays: HashMap::from([("a", Duration::from_secs(5))]),
            ..FakeSynth::default()
        };
        let (queue, mut rx) = queue_with(synth, QueueConfig::default());
        let started = Arc::new(AtomicUsize::new(0));
        let ended = Arc::new(AtomicUsize::new(0));
        let started_hook = Arc::clone(&started);
        let ended_hook = Arc::clone(&ended);

        queue.enqueue(request(
            "a",
            SpeechCallbacks::new()
                .on_start(move || {
                    started_hook.fetch_add(1, Ordering::SeqCst);
                })
                .on_end(move |_| {
                    ended_hook.fetch_add(1, Ordering::SeqCst);
                }),
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(queue.status().is_playing);
        queue.stop();

        collect_until_ended(&mut rx, 1).await;
        assert_eq!(started.load(Ordering::SeqCst), 0);
        assert_eq!(ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn end_reports_remaining_queue() {
        let (queue, mut rx) = queue_with(FakeSynth::default(), QueueConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for text in ["a", "b"] {
            let seen = Arc::clone(&seen);
            queue.enqueue(request(
                text,
                SpeechCallbacks::new().on_end(move |status| {
                    seen.lock().unwrap().push(status.queue_length);
                }),
            ));
        }

        collect_until_ended(&mut rx, 2).await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 0]);
    }
}
