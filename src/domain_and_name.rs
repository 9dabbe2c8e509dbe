//! `DOMAIN\Name` account names as returned by SID resolution.
//!
//! - `Display` prints `DOMAIN\Name`, or just `Name` when the domain is empty.
//! - `FromStr` accepts `DOMAIN\Name` and a bare `Name`.

use core::fmt::{self, Display};
use core::str::FromStr;

use thiserror::Error;

/// Which component an error refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Component {
    /// The part before `\`.
    Domain,
    /// The part after `\`.
    Name,
}

impl Display for Component {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain => f.write_str("domain"),
            Self::Name => f.write_str("name"),
        }
    }
}

/// Errors parsing a `DOMAIN\Name` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainParsingError {
    /// Input contained more than one `\` separator.
    #[error("Too many '\\' separators")]
    TooManySeparators,

    /// The name part is empty.
    #[error("Name is empty")]
    EmptyName,

    /// A NUL character was found.
    #[error("NUL character in {which} at index {index}")]
    NulCharacter {
        /// Offending component.
        which: Component,
        /// Character index inside that component.
        index: usize,
    },
}

/// Account name split into its authority and account parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DomainAndName {
    /// The domain part (before the `\`); empty for names such as `Everyone`.
    pub domain: String,
    /// The name part (after the `\`).
    pub name: String,
}

impl DomainAndName {
    /// Non-validating constructor (domain, then name).
    #[inline]
    pub fn new<D: Into<String>, N: Into<String>>(domain: D, name: N) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }

    fn check(which: Component, part: &str) -> Result<(), DomainParsingError> {
        match part.chars().position(|c| c == '\0') {
            Some(index) => Err(DomainParsingError::NulCharacter { which, index }),
            None => Ok(()),
        }
    }
}

impl Display for DomainAndName {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.domain.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}\\{}", self.domain, self.name)
        }
    }
}

impl FromStr for DomainAndName {
    type Err = DomainParsingError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut iter = s.splitn(3, '\\');
        let first = iter.next().unwrap_or_default();
        let (domain, name) = match iter.next() {
            Some(name) => (first, name),
            None => ("", first),
        };
        if iter.next().is_some() {
            return Err(DomainParsingError::TooManySeparators);
        }
        if name.is_empty() {
            return Err(DomainParsingError::EmptyName);
        }
        Self::check(Component::Domain, domain)?;
        Self::check(Component::Name, name)?;
        Ok(Self::new(domain, name))
    }
}
