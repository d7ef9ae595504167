use std::error::Error;
use std::fmt;

/// Failure while decoding a single VarInt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarIntError {
    /// Input ended before a byte without the continuation bit.
    Truncated,
    /// More than five bytes carried the continuation bit.
    TooLong,
}

impl fmt::Display for VarIntError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarIntError::Truncated => write!(f, "EOF while reading VarInt"),
            VarIntError::TooLong => write!(f, "VarInt too big"),
        }
    }
}

impl Error for VarIntError {}

#[derive(Debug)]
pub enum SchemError {
    IoError(std::io::Error),
    /// A required field is absent or has the wrong shape.
    MalformedDocument(String),
    /// Version outside 1..=3, or a feature the version forbids.
    UnsupportedVersion(String),
    /// The block registry rejected a block-state string.
    RegistryParse { state: String, reason: String },
    VarInt(VarIntError),
    /// Cell data that does not match its palette or dimensions.
    EncodingInvariant(String),
}

impl fmt::Display for SchemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemError::IoError(err) => write!(f, "IO error: {}", err),
            SchemError::MalformedDocument(msg) => write!(f, "Malformed document: {}", msg),
            SchemError::UnsupportedVersion(msg) => write!(f, "Unsupported version: {}", msg),
            SchemError::RegistryParse { state, reason } => {
                write!(f, "Unknown block state '{}': {}", state, reason)
            }
            SchemError::VarInt(err) => write!(f, "Invalid cell data: {}", err),
            SchemError::EncodingInvariant(msg) => write!(f, "Encoding invariant violated: {}", msg),
        }
    }
}

impl Error for SchemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SchemError::IoError(err) => Some(err),
            SchemError::VarInt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SchemError {
    fn from(err: std::io::Error) -> Self {
        SchemError::IoError(err)
    }
}

impl From<VarIntError> for SchemError {
    fn from(err: VarIntError) -> Self {
        SchemError::VarInt(err)
    }
}

/// Terminal error of a schematic read. Wraps whichever [`SchemError`] stopped the
/// decode; nothing is ever partially returned.
#[derive(Debug)]
pub struct SchematicReadError {
    context: &'static str,
    cause: SchemError,
}

impl SchematicReadError {
    pub fn new(context: &'static str, cause: SchemError) -> Self {
        Self { context, cause }
    }

    pub fn cause(&self) -> &SchemError {
        &self.cause
    }

    pub fn into_cause(self) -> SchemError {
        self.cause
    }
}

impl fmt::Display for SchematicReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.cause)
    }
}

impl Error for SchematicReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}
