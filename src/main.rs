//! voxturn - real-time conversational turn-taking engine
//!
//! Listens to a microphone, decides when the speaker has finished a turn
//! (endpointing on transcript stability), and coordinates two cancellable
//! pipelines - response generation and speech playback - so that new speech
//! can barge in on a response that is still being produced.

#![forbid(unsafe_code)]

/// Microphone capture and device listing (PulseAudio)
pub mod audio;
/// Collaborator traits: transcriber, synthesizer, generator
pub mod collab;
/// Turn-boundary detection from transcript stability
pub mod endpoint;
/// Per-frame driver wiring endpointing to the workers
pub mod orchestrator;
/// Cancellable work queue shared between capture side and workers
pub mod queue;
/// Whisper-backed streaming transcriber
pub mod stt;
/// Playback and generation worker threads
pub mod workers;

use anyhow::{Context, Result};
use audio::{AudioCapturer, AudioDevice, SAMPLES_PER_FRAME};
use collab::{Generator, Synthesizer};
use endpoint::FRAME_MS;
use orchestrator::Orchestrator;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stt::WhisperTranscriber;
use tokio::time::interval;
use tracing::{error, info};
use workers::{ResponseWorker, SpeakWorker};

const APP_NAME: &str = "voxturn";

/// Playback through the espeak CLI. Blocks until the utterance has been
/// spoken, which is exactly the contract the speak worker expects.
struct EspeakSynthesizer;

impl Synthesizer for EspeakSynthesizer {
    fn speak(&self, text: &str) -> Result<()> {
        let status = Command::new("espeak")
            .arg(text)
            .status()
            .context("failed to launch espeak")?;
        anyhow::ensure!(status.success(), "espeak exited with {}", status);
        Ok(())
    }
}

/// Stand-in reply generation so the engine runs end to end without a model
/// backend. A deployment swaps this for a real [`Generator`].
#[derive(Default)]
struct CannedGenerator {
    calls: AtomicUsize,
}

const CANNED_REPLIES: [&str; 4] = [
    "That's interesting, tell me more.",
    "I hear you.",
    "Could you expand on that?",
    "Let's keep going.",
];

impl Generator for CannedGenerator {
    fn generate(&self, _text: &str) -> Result<String> {
        let i = self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(CANNED_REPLIES[i % CANNED_REPLIES.len()].to_string())
    }
}

fn prompt_for_device(devices: &[AudioDevice]) -> Result<&AudioDevice> {
    println!("Available audio input devices:");
    for (i, device) in devices.iter().enumerate() {
        println!("{} {} ({})", i, device.description, device.name);
    }
    loop {
        println!("Please type input device ID:");
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("failed to read device selection")?;
        match line.trim().parse::<usize>() {
            Ok(idx) if idx < devices.len() => return Ok(&devices[idx]),
            _ => println!("Not a valid device ID, try again."),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    info!("Starting voxturn");

    // No usable input device is fatal; report and exit cleanly.
    let devices = audio::list_input_devices(APP_NAME)?;
    let device = prompt_for_device(&devices)?;
    let mut capturer = AudioCapturer::with_device(APP_NAME, &device.name)?;

    let model_path = std::env::var("WHISPER_MODEL_PATH")
        .context("WHISPER_MODEL_PATH must point to a ggml whisper model")?;
    let transcriber = WhisperTranscriber::new(Path::new(&model_path))?;

    let speak = SpeakWorker::spawn(Arc::new(EspeakSynthesizer))?;
    let responder = ResponseWorker::spawn(
        Arc::new(CannedGenerator::default()),
        speak.clone(),
    )?;
    let mut orchestrator =
        Orchestrator::new(Box::new(transcriber), speak.clone(), responder.clone());

    info!("Listening...");
    let mut ticker = interval(Duration::from_millis(FRAME_MS));
    let mut frame = vec![0i16; SAMPLES_PER_FRAME];

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = capturer.read_frame(&mut frame) {
                    error!("Audio read error: {}", e);
                    continue;
                }
                orchestrator.on_frame(&frame);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    responder.close();
    speak.close();
    info!("voxturn stopped");
    Ok(())
}
