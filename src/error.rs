use parsing::InvalidSidFormat;
use thiserror::Error;

/// Errors produced while decoding, encoding or transforming security data.
///
/// Binary errors carry the byte offset of the fault and text errors the character
/// position, so callers can point at the malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A SID string is malformed.
    #[error("invalid SID string: {0}")]
    Format(#[from] InvalidSidFormat),

    /// The buffer ends before a structure is complete.
    #[error("buffer truncated at offset {offset}: {needed} bytes needed, {available} available")]
    TruncatedBuffer {
        /// Offset at which the read was attempted.
        offset: usize,
        /// Number of bytes the structure requires.
        needed: usize,
        /// Number of bytes left in the buffer.
        available: usize,
    },

    /// A structure declares an unsupported revision.
    #[error("unsupported revision {revision} at offset {offset}")]
    InvalidRevision {
        /// Offset of the revision byte.
        offset: usize,
        /// Revision found.
        revision: u8,
    },

    /// A binary SID declares more than 15 sub-authorities.
    #[error("SID at offset {offset} declares {count} sub-authorities")]
    TooManySubAuthorities {
        /// Offset of the SID.
        offset: usize,
        /// Declared count.
        count: u8,
    },

    /// An embedded offset points outside the buffer.
    #[error("{component} offset {offset:#x} is outside of a {len}-byte buffer")]
    InvalidOffset {
        /// Component the offset refers to.
        component: &'static str,
        /// Offending offset.
        offset: usize,
        /// Buffer length.
        len: usize,
    },

    /// An ACE body is shorter than its declared size allows.
    #[error("ACE at offset {offset} declares {declared} bytes but its body needs {consumed}")]
    InconsistentSize {
        /// Offset of the ACE header.
        offset: usize,
        /// Size declared in the header.
        declared: usize,
        /// Bytes actually consumed by header and body.
        consumed: usize,
    },

    /// An ACE type byte is not recognized.
    #[error("unknown ACE type {ace_type:#04x} at offset {offset}")]
    UnknownAceType {
        /// Offset of the ACE header.
        offset: usize,
        /// Type byte found.
        ace_type: u8,
    },

    /// A conditional expression contains an unknown token.
    #[error("invalid conditional expression opcode {opcode:#04x} at offset {offset}")]
    InvalidOpcode {
        /// Offset of the token.
        offset: usize,
        /// Opcode byte found.
        opcode: u8,
    },

    /// A conditional expression does not start with the `artx` signature.
    #[error("conditional expression does not start with the \"artx\" signature")]
    InvalidConditionSignature,

    /// A conditional expression token stream does not reduce to a single expression.
    #[error("conditional expression is unbalanced at offset {offset}")]
    UnbalancedExpression {
        /// Offset where the imbalance was detected.
        offset: usize,
    },

    /// A conditional expression nests deeper than [`MAX_DEPTH`](crate::condition::MAX_DEPTH).
    #[error("conditional expression nests too deeply at offset {offset}")]
    NestingTooDeep {
        /// Offset of the token that went past the limit.
        offset: usize,
    },

    /// A structure is too large for the size field of its binary form.
    #[error("{component} of {len} bytes does not fit a size field limited to {max}")]
    TooLarge {
        /// Structure being written.
        component: &'static str,
        /// Its serialized length.
        len: usize,
        /// Largest length the field can hold.
        max: usize,
    },

    /// A length-prefixed or NUL-terminated string is not valid UTF-16.
    #[error("invalid UTF-16 string at offset {offset}")]
    InvalidUtf16 {
        /// Offset of the string.
        offset: usize,
    },

    /// A value has no representation in the requested output form.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(&'static str),

    /// SDDL or conditional expression text is malformed.
    #[error("syntax error at position {position}: {message}")]
    Syntax {
        /// Character position of the fault.
        position: usize,
        /// Human readable reason.
        message: String,
    },

    /// A generic mapping is required but none was supplied or cached.
    #[error("no generic mapping supplied and none cached on the descriptor")]
    NullMapping,

    /// An ACL would break one of its invariants.
    #[error("invalid ACL: {0}")]
    InvalidAcl(&'static str),

    /// A security descriptor component required by the operation is absent.
    #[error("security descriptor has no {0}")]
    MissingComponent(&'static str),
}

impl Error {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
