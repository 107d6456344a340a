//! Collaborator boundary
//!
//! The engine drives three external components: a streaming transcriber, a
//! speech synthesizer and a response generator. All three are consumed as
//! trait objects so the core never depends on a particular model or vendor.
//! Synthesis and generation are blocking calls that may take arbitrary
//! wall-clock time; the worker queues exist precisely so that latency never
//! stalls the audio pipeline.

use anyhow::Result;

/// Incremental speech-to-text over the current utterance.
///
/// `transcribe_chunk` is called once per audio frame on the capture thread
/// and must return promptly (well within one frame period) to keep the audio
/// device fed.
pub trait Transcriber: Send {
    /// Feed one frame of 16 kHz mono PCM and return the current partial
    /// transcript hypothesis for the utterance in progress.
    fn transcribe_chunk(&mut self, frame: &[i16]) -> Result<String>;

    /// Drop accumulated context and start a fresh utterance hypothesis.
    fn reset_cache(&mut self);
}

/// Text-to-speech playback. `speak` blocks until playback of `text` has
/// completed (or failed).
pub trait Synthesizer: Send + Sync {
    fn speak(&self, text: &str) -> Result<()>;
}

/// Conversational reply generation. Blocking.
pub trait Generator: Send + Sync {
    fn generate(&self, text: &str) -> Result<String>;
}
