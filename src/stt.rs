//! Whisper-backed streaming transcription
//!
//! Keeps a rolling buffer of the utterance in progress and re-decodes the
//! whole buffer on every frame, so each call returns the latest hypothesis
//! for the same stretch of speech. `reset_cache` drops the buffer and the
//! decode state, starting a fresh utterance.

use crate::collab::Transcriber;
use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperState};

/// Sample rate the engine runs at (and the only one Whisper accepts).
pub const SAMPLE_RATE: usize = 16_000;

/// Cap on the utterance buffer. A speaker who never pauses gets the most
/// recent window transcribed, not an unbounded buffer.
const MAX_UTTERANCE_SECS: usize = 30;

#[derive(Debug, thiserror::Error)]
pub enum SttError {
    #[error("failed to load whisper model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("whisper decode failed: {0}")]
    Decode(String),
}

pub struct WhisperTranscriber {
    ctx: WhisperContext,
    state: WhisperState,
    /// Samples of the utterance in progress, f32 normalized.
    buffer: Vec<f32>,
}

impl WhisperTranscriber {
    /// Load the model at `path` and prepare a decode state.
    pub fn new(path: &Path) -> Result<Self, SttError> {
        let path_str = path.to_str().ok_or_else(|| SttError::ModelLoad {
            path: path.display().to_string(),
            reason: "model path is not valid UTF-8".to_string(),
        })?;

        info!("Loading whisper model from {}", path_str);
        let ctx =
            WhisperContext::new_with_params(path_str, Default::default()).map_err(|e| {
                SttError::ModelLoad {
                    path: path_str.to_string(),
                    reason: e.to_string(),
                }
            })?;
        let state = ctx.create_state().map_err(|e| SttError::ModelLoad {
            path: path_str.to_string(),
            reason: format!("failed to create decode state: {}", e),
        })?;

        Ok(Self {
            ctx,
            state,
            buffer: Vec::with_capacity(SAMPLE_RATE * 2),
        })
    }

    fn decode_params() -> FullParams<'static, 'static> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_token_timestamps(false);
        params.set_language(Some("en"));
        params.set_translate(false);
        params.set_no_context(true);
        params.set_single_segment(true);
        params
    }

    fn decode(&mut self) -> Result<String, SttError> {
        // Whisper wants a minimum window; pad short utterances with silence.
        let mut samples = self.buffer.clone();
        if samples.len() < SAMPLE_RATE {
            samples.resize(SAMPLE_RATE, 0.0);
        }

        self.state
            .full(Self::decode_params(), &samples)
            .map_err(|e| SttError::Decode(e.to_string()))?;

        let n_segments = self
            .state
            .full_n_segments()
            .map_err(|e| SttError::Decode(e.to_string()))?;
        let mut text = String::new();
        for i in 0..n_segments {
            let segment = self
                .state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Decode(e.to_string()))?;
            text.push_str(&segment);
        }
        Ok(text.trim().to_string())
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe_chunk(&mut self, frame: &[i16]) -> Result<String> {
        self.buffer
            .extend(frame.iter().map(|&s| s as f32 / 32768.0));

        let max_samples = SAMPLE_RATE * MAX_UTTERANCE_SECS;
        if self.buffer.len() > max_samples {
            let excess = self.buffer.len() - max_samples;
            self.buffer.drain(..excess);
        }

        let text = self.decode()?;
        debug!("Hypothesis over {} samples: {:?}", self.buffer.len(), text);
        Ok(text)
    }

    fn reset_cache(&mut self) {
        self.buffer.clear();
        // A fresh decode state drops any carried-over context too.
        match self.ctx.create_state() {
            Ok(state) => self.state = state,
            Err(e) => debug!("Failed to recreate whisper state, reusing: {}", e),
        }
    }
}
