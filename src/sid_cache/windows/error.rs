use core::num::NonZeroU32;

use windows_sys::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_BAD_NETPATH, ERROR_INSUFFICIENT_BUFFER, ERROR_INVALID_PARAMETER,
    ERROR_INVALID_SID, ERROR_NO_SUCH_DOMAIN, ERROR_NONE_MAPPED, ERROR_TRUSTED_DOMAIN_FAILURE,
};

/// Failure of an account lookup, by Win32 error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum LookupError {
    /// `ERROR_INVALID_SID`.
    #[error("the SID is not valid")]
    InvalidSid,
    /// `ERROR_INVALID_PARAMETER`.
    #[error("invalid parameter")]
    InvalidParameter,
    /// `ERROR_NONE_MAPPED`: no account has this SID on the target system.
    #[error("no account is mapped to the SID")]
    NoneMapped,
    /// `ERROR_ACCESS_DENIED`.
    #[error("access denied")]
    AccessDenied,
    /// `ERROR_BAD_NETPATH`: the machine could not be reached.
    #[error("the machine could not be reached")]
    NetworkPathNotFound,
    /// `ERROR_NO_SUCH_DOMAIN`.
    #[error("the domain does not exist or could not be contacted")]
    NoSuchDomain,
    /// `ERROR_TRUSTED_DOMAIN_FAILURE`.
    #[error("trust relationship failure")]
    TrustedRelationshipFailure,
    /// `ERROR_INSUFFICIENT_BUFFER`.
    #[error("insufficient buffer")]
    InsufficientBuffer,
    /// Any other Win32 error code.
    #[error("Win32 error {0}")]
    Other(u32),
}

impl From<NonZeroU32> for LookupError {
    #[inline]
    fn from(code: NonZeroU32) -> Self {
        match code.get() {
            ERROR_INVALID_SID => Self::InvalidSid,
            ERROR_INVALID_PARAMETER => Self::InvalidParameter,
            ERROR_NONE_MAPPED => Self::NoneMapped,
            ERROR_ACCESS_DENIED => Self::AccessDenied,
            ERROR_BAD_NETPATH => Self::NetworkPathNotFound,
            ERROR_NO_SUCH_DOMAIN => Self::NoSuchDomain,
            ERROR_TRUSTED_DOMAIN_FAILURE => Self::TrustedRelationshipFailure,
            ERROR_INSUFFICIENT_BUFFER => Self::InsufficientBuffer,
            other => Self::Other(other),
        }
    }
}

impl From<LookupError> for u32 {
    #[inline]
    fn from(error: LookupError) -> Self {
        match error {
            LookupError::InvalidSid => ERROR_INVALID_SID,
            LookupError::InvalidParameter => ERROR_INVALID_PARAMETER,
            LookupError::NoneMapped => ERROR_NONE_MAPPED,
            LookupError::AccessDenied => ERROR_ACCESS_DENIED,
            LookupError::NetworkPathNotFound => ERROR_BAD_NETPATH,
            LookupError::NoSuchDomain => ERROR_NO_SUCH_DOMAIN,
            LookupError::TrustedRelationshipFailure => ERROR_TRUSTED_DOMAIN_FAILURE,
            LookupError::InsufficientBuffer => ERROR_INSUFFICIENT_BUFFER,
            LookupError::Other(other) => other,
        }
    }
}

#[cfg(feature = "windows_result")]
impl From<LookupError> for windows_result::HRESULT {
    #[inline]
    fn from(value: LookupError) -> Self {
        Self::from_win32(value.into())
    }
}

#[cfg(feature = "windows_result")]
impl From<LookupError> for windows_result::Error {
    #[inline]
    fn from(value: LookupError) -> Self {
        Self::from_hresult(value.into())
    }
}
