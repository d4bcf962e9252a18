//! Typed responses, one variant per command.

use crate::command::Command;
use crate::envelope::Envelope;
use crate::error::{ProtocolError, ProtocolResult};
use crate::model::{
    ApplicationConfig, ColorSet, FileLocation, GuiState, ImageBuffer, MatrixData,
    OutputDescriptor, OutputMapping, PresetSettings, RuntimeStatistics,
};
use pixsync_codec::{pack, unpack, BlockDecoder, Compression};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A decoded response from the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Controller version.
    Version(String),
    /// Application configuration.
    Configuration(ApplicationConfig),
    /// Matrix geometry.
    MatrixData(MatrixData),
    /// Color palettes.
    ColorSets(Vec<ColorSet>),
    /// Output mappings.
    OutputMappings(Vec<OutputMapping>),
    /// Output device descriptor.
    Output(OutputDescriptor),
    /// UI state.
    GuiState(GuiState),
    /// Preset settings.
    PresetSettings(PresetSettings),
    /// Runtime statistics.
    Statistics(RuntimeStatistics),
    /// File location descriptor.
    FileLocation(FileLocation),
    /// Pixel buffers.
    ImageBuffer(ImageBuffer),
    /// Observer registration acknowledged.
    VisualObserverRegistered,
}

impl Response {
    /// Returns the command this response answers.
    pub fn command(&self) -> Command {
        match self {
            Response::Version(_) => Command::GetVersion,
            Response::Configuration(_) => Command::GetConfiguration,
            Response::MatrixData(_) => Command::GetMatrixData,
            Response::ColorSets(_) => Command::GetColorSets,
            Response::OutputMappings(_) => Command::GetOutputMapping,
            Response::Output(_) => Command::GetOutput,
            Response::GuiState(_) => Command::GetGuiState,
            Response::PresetSettings(_) => Command::GetPresetSettings,
            Response::Statistics(_) => Command::GetJmxStatistics,
            Response::FileLocation(_) => Command::GetFileLocation,
            Response::ImageBuffer(_) => Command::GetImageBuffer,
            Response::VisualObserverRegistered => Command::RegisterVisualObserver,
        }
    }

    /// Decodes the payload of `envelope` as the response to `command`.
    ///
    /// The version is echoed as the first text argument; every other
    /// state-bearing command carries a serialized (and possibly compressed)
    /// blob. `decoder` provides the fixed-capacity decompression buffer.
    pub fn decode(
        command: Command,
        envelope: &Envelope,
        decoder: &mut BlockDecoder,
        compression: Compression,
    ) -> ProtocolResult<Self> {
        let mut blob = BlobReader {
            command,
            envelope,
            decoder,
            compression,
        };

        let response = match command {
            Command::GetVersion => envelope
                .args
                .first()
                .cloned()
                .map(Response::Version)
                .ok_or(ProtocolError::MissingArgument { command })?,
            Command::GetConfiguration => Response::Configuration(blob.read()?),
            Command::GetMatrixData => Response::MatrixData(blob.read()?),
            Command::GetColorSets => Response::ColorSets(blob.read()?),
            Command::GetOutputMapping => Response::OutputMappings(blob.read()?),
            Command::GetOutput => Response::Output(blob.read()?),
            Command::GetGuiState => Response::GuiState(blob.read()?),
            Command::GetPresetSettings => Response::PresetSettings(blob.read()?),
            Command::GetJmxStatistics => Response::Statistics(blob.read()?),
            Command::GetFileLocation => Response::FileLocation(blob.read()?),
            Command::GetImageBuffer => Response::ImageBuffer(blob.read()?),
            Command::RegisterVisualObserver => Response::VisualObserverRegistered,
        };
        Ok(response)
    }

    /// Encodes this response the way the controller sends it.
    ///
    /// `capacity` is the receiver's decode buffer size.
    pub fn encode(&self, compression: Compression, capacity: usize) -> ProtocolResult<Envelope> {
        let envelope = Envelope::request(self.command());
        let blob = match self {
            Response::Version(version) => return Ok(envelope.with_arg(version.clone())),
            Response::VisualObserverRegistered => return Ok(envelope),
            Response::Configuration(v) => pack(v, compression, capacity),
            Response::MatrixData(v) => pack(v, compression, capacity),
            Response::ColorSets(v) => pack(v, compression, capacity),
            Response::OutputMappings(v) => pack(v, compression, capacity),
            Response::Output(v) => pack(v, compression, capacity),
            Response::GuiState(v) => pack(v, compression, capacity),
            Response::PresetSettings(v) => pack(v, compression, capacity),
            Response::Statistics(v) => pack(v, compression, capacity),
            Response::FileLocation(v) => pack(v, compression, capacity),
            Response::ImageBuffer(v) => pack(v, compression, capacity),
        }?;
        Ok(envelope.with_blob(blob))
    }
}

struct BlobReader<'a> {
    command: Command,
    envelope: &'a Envelope,
    decoder: &'a mut BlockDecoder,
    compression: Compression,
}

impl BlobReader<'_> {
    fn read<T: DeserializeOwned>(&mut self) -> ProtocolResult<T> {
        let blob = self.envelope.blob().ok_or(ProtocolError::MissingBlob {
            command: self.command,
        })?;
        Ok(unpack(&mut *self.decoder, self.compression, blob)?)
    }
}

/// Serializes a value into a blob envelope for `command`.
pub fn blob_envelope<T: Serialize>(
    command: Command,
    value: &T,
    compression: Compression,
    capacity: usize,
) -> ProtocolResult<Envelope> {
    let blob = pack(value, compression, capacity)?;
    Ok(Envelope::request(command).with_blob(blob))
}
