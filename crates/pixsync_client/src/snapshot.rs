//! Cached copy of the remote controller state.
//!
//! Every response-bearing command owns one slot. A slot holds the most
//! recent successfully decoded value behind its own lock; readers get a
//! shared handle to a complete value, never a partially written one.

use parking_lot::RwLock;
use pixsync_protocol::{
    ApplicationConfig, ColorSet, Command, CommandSet, FileLocation, GuiState, ImageBuffer,
    MatrixData, OutputDescriptor, OutputMapping, PresetSettings, Response, RuntimeStatistics,
};
use std::sync::Arc;

struct Slot<T>(RwLock<Option<Arc<T>>>);

impl<T> Slot<T> {
    fn new() -> Self {
        Self(RwLock::new(None))
    }

    fn get(&self) -> Option<Arc<T>> {
        self.0.read().clone()
    }

    fn set(&self, value: Arc<T>) {
        *self.0.write() = Some(value);
    }

    fn is_set(&self) -> bool {
        self.0.read().is_some()
    }
}

/// The latest known remote state, one slot per response-bearing command.
pub struct SnapshotStore {
    version: Slot<String>,
    config: Slot<ApplicationConfig>,
    matrix: Slot<MatrixData>,
    color_sets: Slot<Vec<ColorSet>>,
    output_mappings: Slot<Vec<OutputMapping>>,
    output: Slot<OutputDescriptor>,
    gui_state: Slot<GuiState>,
    preset_settings: Slot<PresetSettings>,
    statistics: Slot<RuntimeStatistics>,
    file_location: Slot<FileLocation>,
    image_buffer: Slot<ImageBuffer>,
}

impl SnapshotStore {
    /// Creates a store with every slot unset.
    pub fn new() -> Self {
        Self {
            version: Slot::new(),
            config: Slot::new(),
            matrix: Slot::new(),
            color_sets: Slot::new(),
            output_mappings: Slot::new(),
            output: Slot::new(),
            gui_state: Slot::new(),
            preset_settings: Slot::new(),
            statistics: Slot::new(),
            file_location: Slot::new(),
            image_buffer: Slot::new(),
        }
    }

    /// Stores a decoded response in its slot.
    ///
    /// Returns the new UI state if `response` was a UI-state update, so the
    /// caller can push exactly this value to observers.
    pub fn apply(&self, response: Response) -> Option<Arc<GuiState>> {
        match response {
            Response::Version(v) => self.version.set(Arc::new(v)),
            Response::Configuration(v) => self.config.set(Arc::new(v)),
            Response::MatrixData(v) => self.matrix.set(Arc::new(v)),
            Response::ColorSets(v) => self.color_sets.set(Arc::new(v)),
            Response::OutputMappings(v) => self.output_mappings.set(Arc::new(v)),
            Response::Output(v) => self.output.set(Arc::new(v)),
            Response::GuiState(v) => {
                let state = Arc::new(v);
                self.gui_state.set(Arc::clone(&state));
                return Some(state);
            }
            Response::PresetSettings(v) => self.preset_settings.set(Arc::new(v)),
            Response::Statistics(v) => self.statistics.set(Arc::new(v)),
            Response::FileLocation(v) => self.file_location.set(Arc::new(v)),
            Response::ImageBuffer(v) => self.image_buffer.set(Arc::new(v)),
            Response::VisualObserverRegistered => {}
        }
        None
    }

    /// Returns true if the slot of `command` holds a value.
    ///
    /// Commands without a slot (the observer registration) are never set.
    pub fn is_set(&self, command: Command) -> bool {
        match command {
            Command::GetVersion => self.version.is_set(),
            Command::GetConfiguration => self.config.is_set(),
            Command::GetMatrixData => self.matrix.is_set(),
            Command::GetColorSets => self.color_sets.is_set(),
            Command::GetOutputMapping => self.output_mappings.is_set(),
            Command::GetOutput => self.output.is_set(),
            Command::GetGuiState => self.gui_state.is_set(),
            Command::GetPresetSettings => self.preset_settings.is_set(),
            Command::GetJmxStatistics => self.statistics.is_set(),
            Command::GetFileLocation => self.file_location.is_set(),
            Command::GetImageBuffer => self.image_buffer.is_set(),
            Command::RegisterVisualObserver => false,
        }
    }

    /// The set of commands whose slot holds a value.
    pub fn populated(&self) -> CommandSet {
        Command::ALL
            .into_iter()
            .filter(|c| self.is_set(*c))
            .collect()
    }

    /// Controller version.
    pub fn version(&self) -> Option<Arc<String>> {
        self.version.get()
    }

    /// Application configuration.
    pub fn config(&self) -> Option<Arc<ApplicationConfig>> {
        self.config.get()
    }

    /// Matrix geometry.
    pub fn matrix(&self) -> Option<Arc<MatrixData>> {
        self.matrix.get()
    }

    /// Color palettes.
    pub fn color_sets(&self) -> Option<Arc<Vec<ColorSet>>> {
        self.color_sets.get()
    }

    /// Output mappings.
    pub fn output_mappings(&self) -> Option<Arc<Vec<OutputMapping>>> {
        self.output_mappings.get()
    }

    /// Output device descriptor.
    pub fn output(&self) -> Option<Arc<OutputDescriptor>> {
        self.output.get()
    }

    /// UI state.
    pub fn gui_state(&self) -> Option<Arc<GuiState>> {
        self.gui_state.get()
    }

    /// Preset settings.
    pub fn preset_settings(&self) -> Option<Arc<PresetSettings>> {
        self.preset_settings.get()
    }

    /// Runtime statistics.
    pub fn statistics(&self) -> Option<Arc<RuntimeStatistics>> {
        self.statistics.get()
    }

    /// File location descriptor.
    pub fn file_location(&self) -> Option<Arc<FileLocation>> {
        self.file_location.get()
    }

    /// Pixel buffers.
    pub fn image_buffer(&self) -> Option<Arc<ImageBuffer>> {
        self.image_buffer.get()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
