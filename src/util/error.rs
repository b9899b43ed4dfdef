//! Error types for the RenderWare library.

use thiserror::Error;

/// Main error type for RenderWare operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The 28 magic bytes at the start of the file do not match
    #[error("Invalid RenderWare file: magic bytes do not match")]
    InvalidMagic,

    /// The header declares a file kind we do not know
    #[error("Unknown RenderWare kind: {0:#x}")]
    UnknownKind(u32),

    /// A length, count or sentinel does not have the shape the format requires
    #[error("Malformed data at offset {offset:#x}: {message}")]
    Malformed { offset: u64, message: String },

    /// A reference value names an unknown index space or an out-of-range slot
    #[error("Undefined reference {0:#010x}")]
    InvalidIndex(u32),

    /// An object handle does not belong to the container
    #[error("Object #{0} is not part of this RenderWare")]
    DanglingObject(usize),

    /// An object searched by identity is not in the container
    #[error("Object is not part of this RenderWare")]
    ObjectNotFound,

    /// Error raised while reading or writing one section
    #[error("Section {index} (type {type_code:#x}, offset {offset:#x}): {source}")]
    Section {
        index: usize,
        type_code: u32,
        offset: u64,
        #[source]
        source: Box<Error>,
    },

    /// The container cannot be converted to a texture
    #[error("Not a texture: {0}")]
    NotTexture(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a malformed-data error at the given stream offset.
    pub fn malformed(offset: u64, msg: impl Into<String>) -> Self {
        Self::Malformed { offset, message: msg.into() }
    }

    /// Attach the identity of the section being processed.
    ///
    /// Errors that already carry a section are returned unchanged.
    pub fn in_section(self, index: usize, type_code: u32, offset: u64) -> Self {
        match self {
            Self::Section { .. } => self,
            other => Self::Section { index, type_code, offset, source: Box::new(other) },
        }
    }
}

/// Result type alias for RenderWare operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = Error::malformed(0x40, "bad length");
        assert!(e.to_string().contains("0x40"));
        assert!(e.to_string().contains("bad length"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_in_section_wraps_once() {
        let err = Error::InvalidIndex(0xFFFF_FFFF).in_section(3, 0x2000B, 0x200);
        let text = err.to_string();
        assert!(text.contains("Section 3"));
        assert!(text.contains("0x2000b"));

        let again = err.in_section(9, 0, 0);
        assert!(matches!(again, Error::Section { index: 3, .. }));
    }
}
