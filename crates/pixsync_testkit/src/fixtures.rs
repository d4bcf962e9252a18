//! Sample controller state and test helpers.
//!
//! Provides a realistic snapshot of a small PixelController setup and
//! client configurations with short timings.

use pixsync_client::{ClientConfig, HandshakeConfig};
use pixsync_protocol::{
    ApplicationConfig, ColorSet, Command, FileLocation, GuiState, ImageBuffer, MatrixData,
    OutputDescriptor, OutputMapping, PresetSettings, Response, RuntimeStatistics,
};
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound for waits in tests.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// The full state a simulated controller serves.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerFixture {
    /// Controller version.
    pub version: String,
    /// Application configuration.
    pub config: ApplicationConfig,
    /// Matrix geometry.
    pub matrix: MatrixData,
    /// Color palettes.
    pub color_sets: Vec<ColorSet>,
    /// Output mappings.
    pub output_mappings: Vec<OutputMapping>,
    /// Output device.
    pub output: OutputDescriptor,
    /// UI state.
    pub gui_state: GuiState,
    /// Preset settings.
    pub preset_settings: PresetSettings,
    /// Runtime statistics.
    pub statistics: RuntimeStatistics,
    /// File locations.
    pub file_location: FileLocation,
    /// Pixel buffers.
    pub image_buffer: ImageBuffer,
}

impl ControllerFixture {
    /// A controller with two 8x8 screens and one additional visual.
    pub fn new() -> Self {
        let matrix = MatrixData {
            device_x_size: 8,
            device_y_size: 8,
            buffer_x_size: 8,
            buffer_y_size: 8,
        };
        let pixels = matrix.buffer_pixels();
        Self {
            version: "3.0.1".to_string(),
            config: ApplicationConfig::new()
                .with_property(ApplicationConfig::NR_OF_SCREENS, "2")
                .with_property(ApplicationConfig::ADDITIONAL_VISUALS, "1")
                .with_property(ApplicationConfig::REMOTE_COMPRESSION, "false"),
            matrix,
            color_sets: vec![
                ColorSet {
                    name: "RGB".to_string(),
                    colors: vec![0xff0000, 0x00ff00, 0x0000ff],
                },
                ColorSet {
                    name: "MiamiVice".to_string(),
                    colors: vec![0x1b3e85, 0xff00ff, 0x00ffff, 0xffffff],
                },
            ],
            output_mappings: vec![
                OutputMapping {
                    visual_id: 0,
                    fader_id: 0,
                },
                OutputMapping {
                    visual_id: 1,
                    fader_id: 2,
                },
            ],
            output: OutputDescriptor {
                name: "Null Output".to_string(),
                device_type: "NULL".to_string(),
                connected: true,
                gamma: 2.2,
            },
            gui_state: GuiState(vec![
                "CURRENT_VISUAL 0".to_string(),
                "CHANGE_GENERATOR_A 1".to_string(),
                "CHANGE_EFFECT_A 0".to_string(),
            ]),
            preset_settings: PresetSettings {
                selected_preset: 3,
                name: "disco".to_string(),
                entries: vec!["CHANGE_GENERATOR_A 4".to_string()],
            },
            statistics: RuntimeStatistics {
                current_fps: 25.0,
                frame_count: 0,
                start_time_millis: 1_700_000_000_000,
                received_packets: 0,
                received_bytes: 0,
            },
            file_location: FileLocation {
                root_directory: "/opt/pixelcontroller".to_string(),
                data_directory: "/opt/pixelcontroller/data".to_string(),
            },
            image_buffer: ImageBuffer {
                output_buffers: vec![vec![0; pixels]; 2],
                visual_buffers: vec![vec![0; pixels]; 4],
            },
        }
    }

    /// Sets whether the controller compresses payloads.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.config = self
            .config
            .with_property(ApplicationConfig::REMOTE_COMPRESSION, enabled.to_string());
        self
    }

    /// The response this controller sends for `command`.
    pub fn response(&self, command: Command) -> Response {
        match command {
            Command::GetVersion => Response::Version(self.version.clone()),
            Command::GetConfiguration => Response::Configuration(self.config.clone()),
            Command::GetMatrixData => Response::MatrixData(self.matrix),
            Command::GetColorSets => Response::ColorSets(self.color_sets.clone()),
            Command::GetOutputMapping => Response::OutputMappings(self.output_mappings.clone()),
            Command::GetOutput => Response::Output(self.output.clone()),
            Command::GetGuiState => Response::GuiState(self.gui_state.clone()),
            Command::GetPresetSettings => Response::PresetSettings(self.preset_settings.clone()),
            Command::GetJmxStatistics => Response::Statistics(self.statistics),
            Command::GetFileLocation => Response::FileLocation(self.file_location.clone()),
            Command::GetImageBuffer => Response::ImageBuffer(self.image_buffer.clone()),
            Command::RegisterVisualObserver => Response::VisualObserverRegistered,
        }
    }

    /// Renders one frame: every pixel takes the frame number as its value.
    pub fn advance_frame(&mut self) {
        self.statistics.frame_count += 1;
        let frame = self.statistics.frame_count as u32;
        for buffer in self
            .image_buffer
            .output_buffers
            .iter_mut()
            .chain(self.image_buffer.visual_buffers.iter_mut())
        {
            buffer.iter_mut().for_each(|pixel| *pixel = frame);
        }
    }
}

impl Default for ControllerFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A client configuration with millisecond timings for tests.
pub fn fast_config() -> ClientConfig {
    ClientConfig::new()
        .with_discovery_timeout(Duration::from_millis(10))
        .with_handshake(HandshakeConfig::new(5, Duration::from_millis(25)))
        .with_poll_interval(Duration::from_millis(5))
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if condition() {
            return true;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}
