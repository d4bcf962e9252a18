//! Remote controller data model.
//!
//! These are the plain data objects the controller serializes into response
//! payloads. They carry no behavior beyond small derived views.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Application configuration of the remote controller.
///
/// Kept as the raw property map the controller was started with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Configuration properties.
    pub properties: BTreeMap<String, String>,
}

impl ApplicationConfig {
    /// Number of physical output screens.
    pub const NR_OF_SCREENS: &'static str = "output.screens";
    /// Number of visuals beyond one per screen plus the preview.
    pub const ADDITIONAL_VISUALS: &'static str = "additional.visual.screens";
    /// Whether payloads sent to remote clients are compressed.
    pub const REMOTE_COMPRESSION: &'static str = "osc.remote.compression";

    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Gets a property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    fn get_usize(&self, key: &str, default: usize) -> usize {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Number of output screens. Defaults to 1.
    pub fn nr_of_screens(&self) -> usize {
        self.get_usize(Self::NR_OF_SCREENS, 1)
    }

    /// Number of additional visuals. Defaults to 0.
    pub fn nr_of_additional_visuals(&self) -> usize {
        self.get_usize(Self::ADDITIONAL_VISUALS, 0)
    }

    /// Whether the controller compresses remote payloads. Defaults to false.
    pub fn use_remote_compression(&self) -> bool {
        self.get(Self::REMOTE_COMPRESSION)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Geometry of the LED matrix and of the internal render buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatrixData {
    /// Device width in pixels.
    pub device_x_size: u32,
    /// Device height in pixels.
    pub device_y_size: u32,
    /// Render buffer width in pixels.
    pub buffer_x_size: u32,
    /// Render buffer height in pixels.
    pub buffer_y_size: u32,
}

impl MatrixData {
    /// Pixels per device frame.
    pub fn device_pixels(&self) -> usize {
        self.device_x_size as usize * self.device_y_size as usize
    }

    /// Pixels per render buffer frame.
    pub fn buffer_pixels(&self) -> usize {
        self.buffer_x_size as usize * self.buffer_y_size as usize
    }
}

/// A named color palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSet {
    /// Palette name.
    pub name: String,
    /// RGB colors, `0xRRGGBB`.
    pub colors: Vec<u32>,
}

/// Maps an output screen to a visual and its fader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMapping {
    /// Visual shown on the screen.
    pub visual_id: u32,
    /// Fader used when switching visuals.
    pub fader_id: u32,
}

/// Description of the output device the controller drives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputDescriptor {
    /// Human-readable device name.
    pub name: String,
    /// Device type identifier.
    pub device_type: String,
    /// Whether the device is connected.
    pub connected: bool,
    /// Gamma correction applied to the output.
    pub gamma: f32,
}

/// UI state of the controller, as ordered `KEY value` entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuiState(pub Vec<String>);

impl GuiState {
    /// Returns the entries.
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Returns the value of the first entry whose key is `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find_map(|entry| {
            let (k, v) = entry.split_once(' ')?;
            (k == key).then(|| v.trim())
        })
    }
}

/// Currently loaded preset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PresetSettings {
    /// Selected preset slot.
    pub selected_preset: u32,
    /// Preset name.
    pub name: String,
    /// Stored commands of the preset.
    pub entries: Vec<String>,
}

/// Runtime statistics of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RuntimeStatistics {
    /// Current frames per second.
    pub current_fps: f32,
    /// Frames rendered since start.
    pub frame_count: u64,
    /// Controller start time, milliseconds since the Unix epoch.
    pub start_time_millis: u64,
    /// Control packets received by the controller.
    pub received_packets: u64,
    /// Control bytes received by the controller.
    pub received_bytes: u64,
}

/// Where the controller keeps its files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileLocation {
    /// Installation root.
    pub root_directory: String,
    /// Data directory (presets, images, fonts).
    pub data_directory: String,
}

/// Pixel buffers of every output and every visual.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageBuffer {
    /// One buffer per output screen.
    pub output_buffers: Vec<Vec<u32>>,
    /// One buffer per visual.
    pub visual_buffers: Vec<Vec<u32>>,
}

impl ImageBuffer {
    /// Buffer of output screen `nr`.
    pub fn output_buffer(&self, nr: usize) -> Option<&[u32]> {
        self.output_buffers.get(nr).map(Vec::as_slice)
    }

    /// Buffer of visual `nr`.
    pub fn visual_buffer(&self, nr: usize) -> Option<&[u32]> {
        self.visual_buffers.get(nr).map(Vec::as_slice)
    }
}
