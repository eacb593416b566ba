//! Host settings handed to the instrument backend at startup.

use std::fmt;

use crate::error::Result;

/// Output channel layout requested from the synth backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SynthChannels {
    Mono,
    #[default]
    Stereo,
    Quad,
    Count(u16),
}

impl SynthChannels {
    pub fn count(&self) -> u16 {
        match self {
            SynthChannels::Mono => 1,
            SynthChannels::Stereo => 2,
            SynthChannels::Quad => 4,
            SynthChannels::Count(n) => *n,
        }
    }
}

impl fmt::Display for SynthChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthChannels::Mono => write!(f, "mono"),
            SynthChannels::Stereo => write!(f, "stereo"),
            SynthChannels::Quad => write!(f, "quad"),
            SynthChannels::Count(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClockSettings {
    /// Audio driver name passed to the synth backend
    pub synth_audio_device: String,
    pub synth_channels: SynthChannels,
}

impl ClockSettings {
    /// Audio driver conventionally available on this platform
    pub fn platform_audio_device() -> &'static str {
        if cfg!(target_os = "macos") {
            "coreaudio"
        } else if cfg!(target_os = "linux") {
            "alsa"
        } else {
            "portaudio"
        }
    }
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            synth_audio_device: Self::platform_audio_device().to_string(),
            synth_channels: SynthChannels::default(),
        }
    }
}

/// Hook for whatever produces sound from clock callbacks.
///
/// The clock calls `init` once from `start()`; an error is logged and the
/// clock starts anyway.
pub trait InstrumentBackend {
    fn init(&mut self, settings: &ClockSettings) -> Result<()>;
}
