//! The command vocabulary.

use crate::error::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// A request/response identifier understood by the remote controller.
///
/// The same pattern is used for the request and for its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    /// Controller version, echoed as a text argument.
    GetVersion,
    /// Application configuration.
    GetConfiguration,
    /// Matrix geometry.
    GetMatrixData,
    /// Color palettes.
    GetColorSets,
    /// Visual to output mapping.
    GetOutputMapping,
    /// Output device descriptor.
    GetOutput,
    /// UI state entries.
    GetGuiState,
    /// Current preset settings.
    GetPresetSettings,
    /// Runtime statistics.
    GetJmxStatistics,
    /// File location descriptor.
    GetFileLocation,
    /// Output and visual pixel buffers.
    GetImageBuffer,
    /// Registers this client for visual state pushes. Acknowledged without payload.
    RegisterVisualObserver,
}

impl Command {
    /// Every command, in declaration order.
    pub const ALL: [Command; 12] = [
        Command::GetVersion,
        Command::GetConfiguration,
        Command::GetMatrixData,
        Command::GetColorSets,
        Command::GetOutputMapping,
        Command::GetOutput,
        Command::GetGuiState,
        Command::GetPresetSettings,
        Command::GetJmxStatistics,
        Command::GetFileLocation,
        Command::GetImageBuffer,
        Command::RegisterVisualObserver,
    ];

    /// Returns the wire pattern.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::GetVersion => "GET_VERSION",
            Command::GetConfiguration => "GET_CONFIGURATION",
            Command::GetMatrixData => "GET_MATRIXDATA",
            Command::GetColorSets => "GET_COLORSETS",
            Command::GetOutputMapping => "GET_OUTPUTMAPPING",
            Command::GetOutput => "GET_OUTPUT",
            Command::GetGuiState => "GET_GUISTATE",
            Command::GetPresetSettings => "GET_PRESETSETTINGS",
            Command::GetJmxStatistics => "GET_JMXSTATISTICS",
            Command::GetFileLocation => "GET_FILELOCATION",
            Command::GetImageBuffer => "GET_IMAGEBUFFER",
            Command::RegisterVisualObserver => "REGISTER_VISUALOBSERVER",
        }
    }

    /// Resolves a wire pattern. Returns `None` for anything outside the vocabulary.
    pub fn parse(pattern: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == pattern)
    }

    /// Returns true if the response carries a binary payload.
    pub fn carries_blob(&self) -> bool {
        !matches!(
            self,
            Command::GetVersion | Command::RegisterVisualObserver
        )
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ProtocolError::UnknownCommand(s.to_string()))
    }
}

/// A set of commands stored as a bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandSet(u32);

impl CommandSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The set of every command.
    pub fn all() -> Self {
        Command::ALL.into_iter().collect()
    }

    /// Rebuilds a set from raw bits, dropping bits that name no command.
    pub fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::all().0)
    }

    /// Returns the raw bits.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Adds a command. Returns true if it was not present.
    pub fn insert(&mut self, command: Command) -> bool {
        let added = !self.contains(command);
        self.0 |= command.bit();
        added
    }

    /// Returns true if the command is in the set.
    pub fn contains(&self, command: Command) -> bool {
        self.0 & command.bit() != 0
    }

    /// Returns true if every command of `other` is in this set.
    pub fn is_superset(&self, other: &CommandSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Commands in this set that are not in `other`.
    pub fn difference(&self, other: &CommandSet) -> CommandSet {
        Self(self.0 & !other.0)
    }

    /// Number of commands in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates the commands in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Command> + '_ {
        Command::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Command> for CommandSet {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        let mut set = CommandSet::empty();
        set.extend(iter);
        set
    }
}

impl Extend<Command> for CommandSet {
    fn extend<I: IntoIterator<Item = Command>>(&mut self, iter: I) {
        for command in iter {
            self.insert(command);
        }
    }
}

impl fmt::Debug for CommandSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_roundtrip() {
        for command in Command::ALL {
            assert_eq!(Command::parse(command.as_str()), Some(command));
            assert_eq!(command.to_string().parse::<Command>().unwrap(), command);
        }
    }

    #[test]
    fn unknown_pattern() {
        assert_eq!(Command::parse("GET_WEATHER"), None);
        assert_eq!(Command::parse("get_version"), None);
        assert_eq!(Command::parse(""), None);
        assert!(matches!(
            "CHANGE_GENERATOR_A".parse::<Command>(),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn blob_bearing_commands() {
        assert!(!Command::GetVersion.carries_blob());
        assert!(!Command::RegisterVisualObserver.carries_blob());
        assert!(Command::GetImageBuffer.carries_blob());
        assert_eq!(Command::ALL.iter().filter(|c| c.carries_blob()).count(), 10);
    }

    #[test]
    fn command_set_operations() {
        let mut set = CommandSet::empty();
        assert!(set.is_empty());
        assert!(set.insert(Command::GetVersion));
        assert!(!set.insert(Command::GetVersion));
        assert!(set.insert(Command::GetImageBuffer));
        assert_eq!(set.len(), 2);
        assert!(set.contains(Command::GetImageBuffer));
        assert!(!set.contains(Command::GetOutput));

        let all = CommandSet::all();
        assert_eq!(all.len(), 12);
        assert!(all.is_superset(&set));
        assert!(!set.is_superset(&all));
        assert_eq!(all.difference(&set).len(), 10);
        assert!(!all.difference(&set).contains(Command::GetVersion));
    }

    #[test]
    fn command_set_iterates_in_declaration_order() {
        let set: CommandSet = [Command::GetImageBuffer, Command::GetVersion, Command::GetOutput]
            .into_iter()
            .collect();
        let ordered: Vec<_> = set.iter().collect();
        assert_eq!(
            ordered,
            vec![Command::GetVersion, Command::GetOutput, Command::GetImageBuffer]
        );
    }

    #[test]
    fn command_set_bits() {
        let set = CommandSet::all();
        assert_eq!(CommandSet::from_bits_truncate(set.bits()), set);
        assert_eq!(CommandSet::from_bits_truncate(u32::MAX), set);
        assert_eq!(format!("{:?}", CommandSet::empty()), "{}");
    }
}
