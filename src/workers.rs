//! Worker threads for synthesis and response generation
//!
//! Each worker is one long-lived OS thread consuming one [`CancellableQueue`].
//! The collaborator call in the middle of the loop blocks for as long as it
//! likes; barge-in is handled by clearing the queue, never by preempting the
//! call in progress. A collaborator error drops that single task and the loop
//! keeps running - a dead worker thread would silently stop half the pipeline,
//! so the loop is not allowed to die to a task failure.
//!
//! The busy flags are for observability only. Coordination relies solely on
//! queue interruption.

use crate::collab::{Generator, Synthesizer};
use crate::queue::CancellableQueue;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Handle to the speech playback worker. Cloneable; all clones share the
/// same queue and thread.
#[derive(Clone)]
pub struct SpeakWorker {
    queue: Arc<CancellableQueue<String>>,
    speaking: Arc<AtomicBool>,
}

impl SpeakWorker {
    /// Spawn the playback thread. It runs until `close` is called.
    pub fn spawn(synthesizer: Arc<dyn Synthesizer>) -> Result<Self> {
        let worker = Self {
            queue: Arc::new(CancellableQueue::new()),
            speaking: Arc::new(AtomicBool::new(false)),
        };
        let handle = worker.clone();
        std::thread::Builder::new()
            .name("speak-worker".to_string())
            .spawn(move || handle.run(synthesizer))
            .context("failed to spawn speak worker thread")?;
        Ok(worker)
    }

    fn run(self, synthesizer: Arc<dyn Synthesizer>) {
        info!("Speak worker started");
        while let Some(text) = self.queue.pop() {
            info!("SPEAK: {}", text);
            self.speaking.store(true, Ordering::SeqCst);
            let start = Instant::now();
            match synthesizer.speak(&text) {
                Ok(()) => debug!("TTS latency: {:?}", start.elapsed()),
                Err(e) => error!("Synthesis failed, dropping utterance: {:#}", e),
            }
            self.speaking.store(false, Ordering::SeqCst);
        }
        info!("Speak worker shut down");
    }

    pub fn enqueue(&self, text: String) {
        self.queue.push(text);
    }

    /// Discard all queued utterances. An utterance already being synthesized
    /// keeps playing - cancellation here is best-effort queue invalidation.
    /// Also clears the speaking flag optimistically; it is a UI signal, not a
    /// correctness guarantee.
    pub fn interrupt(&self) -> usize {
        let dropped = self.queue.interrupt();
        self.speaking.store(false, Ordering::SeqCst);
        if dropped > 0 {
            debug!("Interrupted speak worker, dropped {} queued utterances", dropped);
        }
        dropped
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn close(&self) {
        self.queue.close();
    }
}

/// Handle to the response generation worker. Replies are forwarded into the
/// speak worker's queue.
#[derive(Clone)]
pub struct ResponseWorker {
    queue: Arc<CancellableQueue<String>>,
    busy: Arc<AtomicBool>,
}

impl ResponseWorker {
    pub fn spawn(generator: Arc<dyn Generator>, speak: SpeakWorker) -> Result<Self> {
        let worker = Self {
            queue: Arc::new(CancellableQueue::new()),
            busy: Arc::new(AtomicBool::new(false)),
        };
        let handle = worker.clone();
        std::thread::Builder::new()
            .name("response-worker".to_string())
            .spawn(move || handle.run(generator, speak))
            .context("failed to spawn response worker thread")?;
        Ok(worker)
    }

    fn run(self, generator: Arc<dyn Generator>, speak: SpeakWorker) {
        info!("Response worker started");
        while let Some(text) = self.queue.pop() {
            self.busy.store(true, Ordering::SeqCst);
            let start = Instant::now();
            match generator.generate(&text) {
                Ok(reply) => {
                    debug!("Response generation latency: {:?}", start.elapsed());
                    info!("AI: {}", reply);
                    speak.enqueue(reply);
                }
                Err(e) => error!("Generation failed, dropping task: {:#}", e),
            }
            self.busy.store(false, Ordering::SeqCst);
        }
        info!("Response worker shut down");
    }

    pub fn enqueue(&self, text: String) {
        self.queue.push(text);
    }

    /// Discard all queued generation tasks. A generation already running
    /// completes and its reply is still forwarded downstream.
    pub fn interrupt(&self) -> usize {
        let dropped = self.queue.interrupt();
        if dropped > 0 {
            debug!("Interrupted response worker, dropped {} queued tasks", dropped);
        }
        dropped
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn close(&self) {
        self.queue.close();
    }
}
