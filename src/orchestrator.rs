//! Per-frame driver
//!
//! Runs on the capture thread, once per audio frame: transcribe the frame,
//! feed the hypothesis to the endpointer, then act on the verdict. A changed
//! transcript interrupts both workers (barge-in); a completed turn enqueues a
//! filler acknowledgment and the generation task, then resets the
//! transcriber for the next utterance. Everything here must return well
//! within one frame period - the heavy lifting lives on the worker threads.

use crate::collab::Transcriber;
use crate::endpoint::{Endpointer, Verdict, FRAME_MS, SILENCE_THRESHOLD_MS};
use crate::workers::{ResponseWorker, SpeakWorker};
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Short acknowledgments spoken while the real response is being generated.
pub const FILLER_ACKS: [&str; 6] = [
    "Ummm.",
    "OK.",
    "Thanks for the info.",
    "Got it.",
    "I see.",
    "Right.",
];

/// Pick a filler acknowledgment uniformly at random.
///
/// The range stops one short of the set, so the final entry is never chosen.
pub fn pick_filler() -> &'static str {
    FILLER_ACKS[rand::rng().random_range(0..FILLER_ACKS.len() - 1)]
}

/// Tunable cadence for the frame loop and endpointer.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Period of one capture frame.
    pub frame: Duration,
    /// Accumulated silence credit required to close a turn.
    pub silence_threshold: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame: Duration::from_millis(FRAME_MS),
            silence_threshold: Duration::from_millis(SILENCE_THRESHOLD_MS),
        }
    }
}

pub struct Orchestrator {
    endpointer: Endpointer,
    transcriber: Box<dyn Transcriber>,
    speak: SpeakWorker,
    responder: ResponseWorker,
    frame: Duration,
}

impl Orchestrator {
    pub fn new(
        transcriber: Box<dyn Transcriber>,
        speak: SpeakWorker,
        responder: ResponseWorker,
    ) -> Self {
        Self::with_config(transcriber, speak, responder, EngineConfig::default())
    }

    pub fn with_config(
        transcriber: Box<dyn Transcriber>,
        speak: SpeakWorker,
        responder: ResponseWorker,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            endpointer: Endpointer::with_threshold(cfg.silence_threshold),
            transcriber,
            speak,
            responder,
            frame: cfg.frame,
        }
    }

    /// Process one frame of 16 kHz mono PCM. Invoked on the capture thread.
    pub fn on_frame(&mut self, pcm: &[i16]) {
        let start = Instant::now();
        let text = match self.transcriber.transcribe_chunk(pcm) {
            Ok(text) => text,
            Err(e) => {
                // One bad frame is not worth stalling the pipeline over.
                error!("Transcription failed, skipping frame: {:#}", e);
                return;
            }
        };
        debug!("STT latency: {:?}", start.elapsed());

        match self.endpointer.observe(&text, self.frame) {
            Verdict::Changed => {
                // New speech invalidates anything queued for the previous
                // utterance. In-flight collaborator calls still finish.
                self.speak.interrupt();
                self.responder.interrupt();
            }
            Verdict::Holding => {}
            Verdict::TurnComplete(utterance) => {
                info!("USER: {}", utterance);
                self.speak.enqueue(pick_filler().to_string());
                self.responder.enqueue(utterance);
                self.transcriber.reset_cache();
            }
        }
    }

    /// Whether the speak worker believes it is mid-playback. Observability
    /// only; never used for coordination.
    pub fn is_speaking(&self) -> bool {
        self.speak.is_speaking()
    }
}
