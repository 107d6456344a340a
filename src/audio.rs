//! Audio capture
//!
//! Microphone input via PulseAudio. The engine consumes fixed-size frames of
//! 16-bit little-endian PCM at 16 kHz mono; everything here exists to hand
//! those frames to the capture loop with a blocking per-frame read.

use crate::endpoint::FRAME_MS;
use libpulse_binding::callbacks::ListResult;
use libpulse_binding::context::{Context, FlagSet as ContextFlagSet, State as ContextState};
use libpulse_binding::def::Retval;
use libpulse_binding::mainloop::standard::{IterateResult, Mainloop};
use libpulse_binding::proplist::Proplist;
use libpulse_binding::sample::{Format, Spec};
use libpulse_binding::stream::Direction;
use libpulse_simple_binding::Simple;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Samples in one capture frame at 16 kHz.
pub const SAMPLES_PER_FRAME: usize = (16_000 * FRAME_MS as usize) / 1000;

/// An input device as reported by PulseAudio introspection.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// PulseAudio source name, used to open the stream.
    pub name: String,
    /// Human-readable description for the selection prompt.
    pub description: String,
    pub sample_rate: u32,
    pub channels: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio input devices found")]
    NoDevicesFound,

    #[error("PulseAudio setup failed: {0}")]
    Setup(String),

    #[error("PulseAudio connection failed: {0}")]
    Connection(String),

    #[error("audio read failed: {0}")]
    Read(String),
}

/// Blocking microphone capture, 16 kHz mono S16LE.
pub struct AudioCapturer {
    simple: Simple,
    device_name: Option<String>,
}

impl AudioCapturer {
    /// Open the default input device.
    pub fn new(app_name: &str) -> Result<Self, AudioError> {
        Self::open(app_name, None)
    }

    /// Open a specific input device by PulseAudio source name.
    pub fn with_device(app_name: &str, device_name: &str) -> Result<Self, AudioError> {
        Self::open(app_name, Some(device_name))
    }

    fn open(app_name: &str, device_name: Option<&str>) -> Result<Self, AudioError> {
        let spec = Spec {
            format: Format::S16le,
            channels: 1,
            rate: 16_000,
        };
        let simple = Simple::new(
            None,
            app_name,
            Direction::Record,
            device_name,
            "capture",
            &spec,
            None,
            None,
        )
        .map_err(|e| AudioError::Connection(format!("{e}")))?;

        if let Some(name) = device_name {
            info!("Capturing from device: {}", name);
        } else {
            info!("Capturing from default input device");
        }
        Ok(Self {
            simple,
            device_name: device_name.map(|s| s.to_string()),
        })
    }

    /// Blocking read of one frame of PCM samples into `frame`.
    pub fn read_frame(&mut self, frame: &mut [i16]) -> Result<(), AudioError> {
        let mut bytes = vec![0u8; frame.len() * 2];
        self.simple
            .read(&mut bytes)
            .map_err(|e| AudioError::Read(format!("{e}")))?;
        for (sample, pair) in frame.iter_mut().zip(bytes.chunks_exact(2)) {
            *sample = i16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(())
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }
}

/// List input devices, excluding monitors of playback sinks.
///
/// Fails with [`AudioError::NoDevicesFound`] when no microphone is present;
/// that is a fatal startup condition for the caller.
pub fn list_input_devices(app_name: &str) -> Result<Vec<AudioDevice>, AudioError> {
    let devices = Arc::new(Mutex::new(Vec::new()));
    let devices_cb = devices.clone();

    let mut proplist =
        Proplist::new().ok_or_else(|| AudioError::Setup("failed to create proplist".into()))?;
    proplist
        .set_str(
            libpulse_binding::proplist::properties::APPLICATION_NAME,
            app_name,
        )
        .map_err(|_| AudioError::Setup("failed to set application name".into()))?;

    let mut mainloop =
        Mainloop::new().ok_or_else(|| AudioError::Setup("failed to create mainloop".into()))?;
    let mut context = Context::new_with_proplist(&mainloop, app_name, &proplist)
        .ok_or_else(|| AudioError::Setup("failed to create context".into()))?;

    context
        .connect(None, ContextFlagSet::NOFLAGS, None)
        .map_err(|e| AudioError::Connection(format!("{e}")))?;

    // Pump the mainloop until the context is ready.
    loop {
        match mainloop.iterate(false) {
            IterateResult::Quit(_) | IterateResult::Err(_) => {
                return Err(AudioError::Connection("mainloop iterate failed".into()));
            }
            IterateResult::Success(_) => {}
        }
        match context.get_state() {
            ContextState::Ready => break,
            ContextState::Failed | ContextState::Terminated => {
                return Err(AudioError::Connection("context connection failed".into()));
            }
            _ => {}
        }
    }

    let done = Arc::new(Mutex::new(false));
    let done_cb = done.clone();

    let introspector = context.introspect();
    let _op = introspector.get_source_info_list(move |result| match result {
        ListResult::Item(source) => {
            let is_monitor = source.monitor_of_sink.is_some()
                || source
                    .name
                    .as_ref()
                    .map(|name| name.contains("monitor"))
                    .unwrap_or(false);
            if is_monitor {
                return;
            }
            if let (Some(name), Some(description)) = (
                source.name.as_ref().map(|s| s.to_string()),
                source.description.as_ref().map(|s| s.to_string()),
            ) {
                if let Ok(mut devices) = devices_cb.lock() {
                    devices.push(AudioDevice {
                        name,
                        description,
                        sample_rate: source.sample_spec.rate,
                        channels: source.sample_spec.channels,
                    });
                }
            }
        }
        ListResult::End => {
            if let Ok(mut done) = done_cb.lock() {
                *done = true;
            }
        }
        ListResult::Error => {
            error!("Error listing audio input devices");
            if let Ok(mut done) = done_cb.lock() {
                *done = true;
            }
        }
    });

    loop {
        match mainloop.iterate(false) {
            IterateResult::Quit(_) | IterateResult::Err(_) => {
                return Err(AudioError::Setup("mainloop iterate failed".into()));
            }
            IterateResult::Success(_) => {}
        }
        if let Ok(done) = done.lock() {
            if *done {
                break;
            }
        }
    }

    context.disconnect();
    mainloop.quit(Retval(0));

    let devices = devices
        .lock()
        .map(|d| d.clone())
        .map_err(|_| AudioError::Setup("device list poisoned".into()))?;
    if devices.is_empty() {
        return Err(AudioError::NoDevicesFound);
    }
    Ok(devices)
}
