//! Error types for class-file parsing.

/// Errors that can occur while parsing a JVM class file.
#[derive(Debug, thiserror::Error)]
pub enum ClassFileError {
    /// The class file could not be read from disk.
    #[error("failed to read class file: {0}")]
    Io(#[from] std::io::Error),

    /// The input ended before a complete structure was read.
    #[error("unexpected end of class file")]
    UnexpectedEof,

    /// The file does not start with `0xCAFEBABE`.
    #[error("invalid class file magic: {0:#010x}")]
    InvalidMagic(u32),

    /// A constant-pool index is zero, out of range, or points at the
    /// unusable second slot of a long/double entry.
    #[error("invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),

    /// A constant-pool entry has an unknown tag.
    #[error("invalid constant pool tag: {0}")]
    InvalidConstantPoolTag(u8),

    /// A constant-pool entry is of a different kind than the one required.
    #[error("constant pool entry {index} is {found}, expected {expected}")]
    ConstantPoolTypeMismatch {
        /// The offending index.
        index: u16,
        /// The kind the caller required.
        expected: &'static str,
        /// The kind found at `index`.
        found: &'static str,
    },

    /// A `CONSTANT_Utf8` entry is not valid modified UTF-8.
    #[error("invalid modified UTF-8 in constant pool")]
    InvalidModifiedUtf8,

    /// An attribute body does not match its declared layout.
    #[error("malformed {0} attribute")]
    MalformedAttribute(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_magic() {
        let err = ClassFileError::InvalidMagic(0xDEADBEEF);
        assert_eq!(err.to_string(), "invalid class file magic: 0xdeadbeef");
    }

    #[test]
    fn display_type_mismatch() {
        let err = ClassFileError::ConstantPoolTypeMismatch {
            index: 7,
            expected: "Utf8",
            found: "Integer",
        };
        assert_eq!(
            err.to_string(),
            "constant pool entry 7 is Integer, expected Utf8"
        );
    }

    #[test]
    fn display_malformed_attribute() {
        let err = ClassFileError::MalformedAttribute("Exceptions");
        assert_eq!(err.to_string(), "malformed Exceptions attribute");
    }
}
