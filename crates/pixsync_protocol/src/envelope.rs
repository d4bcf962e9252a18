//! The message envelope exchanged over the control channel.

use crate::command::Command;
use crate::error::{ProtocolError, ProtocolResult};
use bytes::Bytes;

/// One discrete protocol message: a pattern, optional text arguments and an
/// optional binary payload.
///
/// The pattern is kept as text so that messages outside the vocabulary can
/// still be represented (and discarded) by the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Message pattern.
    pub pattern: String,
    /// Text arguments, in order.
    pub args: Vec<String>,
    /// Binary payload.
    pub blob: Option<Bytes>,
}

impl Envelope {
    /// Creates an envelope with a pattern and nothing else.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            args: Vec::new(),
            blob: None,
        }
    }

    /// Creates a bare request for `command`.
    pub fn request(command: Command) -> Self {
        Self::new(command.as_str())
    }

    /// Builds an envelope from command-line style tokens: the first token is
    /// the pattern, the rest are arguments.
    pub fn from_tokens<I, S>(tokens: I) -> ProtocolResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = tokens.into_iter();
        let pattern = tokens
            .next()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or(ProtocolError::EmptyMessage)?;
        Ok(Self::new(pattern).with_args(tokens))
    }

    /// Appends one argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    /// Sets the binary payload.
    pub fn with_blob(mut self, blob: impl Into<Bytes>) -> Self {
        self.blob = Some(blob.into());
        self
    }

    /// Resolves the pattern against the vocabulary.
    pub fn command(&self) -> Option<Command> {
        Command::parse(&self.pattern)
    }

    /// Returns true if the pattern is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.pattern.trim().is_empty()
    }

    /// Returns the payload bytes, if any.
    pub fn blob(&self) -> Option<&[u8]> {
        self.blob.as_deref()
    }

    /// Size of the binary payload in bytes.
    pub fn payload_len(&self) -> usize {
        self.blob.as_ref().map_or(0, Bytes::len)
    }
}
