//! # Windows security descriptors for Rust
//!
//! A platform-independent model of Windows access-control data with its binary and
//! text codecs:
//! - [`Sid`]: a fixed-capacity, `Copy` security identifier with its `S-1-...` string
//!   form and binary wire form, plus the [`sid!`] macro for compile-time literals.
//! - [`Ace`] and [`Acl`]: access control entries of every Windows ACE type, including
//!   object, callback, mandatory-label and resource-attribute ACEs.
//! - [`SecurityDescriptor`]: owner, group, DACL and SACL with the self-relative
//!   binary layout and the control word derived from its components.
//! - [`sddl`]: the Security Descriptor Definition Language in both directions.
//! - [`condition`]: conditional-ACE expressions, as text and as the binary
//!   `artx` program stored in callback ACEs.
//! - Canonical ordering, generic-right mapping ([`generic_mapping`]) and
//!   auto-inheritance from a parent descriptor.
//! - [`sid_cache`]: a SID to account-name cache with pluggable resolvers.
//!
//! ## Examples
//! ### Parse and write SDDL
//! ```rust
//! use win_security_descriptor::{
//!     SecurityDescriptor, SecurityDescriptorControl, SecurityInformation, sddl, well_known,
//! };
//!
//! let sd: SecurityDescriptor = "O:BAG:SYD:PAI(A;OICI;FA;;;SY)(A;;0x1200a9;;;WD)".parse().unwrap();
//! assert_eq!(sd.owner.as_ref().map(|entry| entry.sid), Some(well_known::BUILTIN_ADMINISTRATORS));
//! assert!(sd.control().contains(SecurityDescriptorControl::DACL_PROTECTED));
//!
//! let text = sddl::to_sddl(&sd, SecurityInformation::OWNER | SecurityInformation::DACL).unwrap();
//! assert_eq!(text, "O:BAD:PAI(A;OICI;0x1f01ff;;;SY)(A;;0x1200a9;;;WD)");
//! ```
//!
//! ### Binary round trip
//! ```rust
//! use win_security_descriptor::SecurityDescriptor;
//!
//! let sd: SecurityDescriptor = "O:SYG:SYD:(A;;GA;;;WD)".parse().unwrap();
//! let bytes = sd.to_self_relative().unwrap();
//! assert_eq!(SecurityDescriptor::from_self_relative(&bytes).unwrap(), sd);
//! ```
//!
//! ### Building SIDs
//! ```rust
//! use win_security_descriptor::{Sid, SidIdentifierAuthority, well_known};
//!
//! let administrators = Sid::try_new(SidIdentifierAuthority::NT_AUTHORITY, [32, 544]).unwrap();
//! assert_eq!(administrators, well_known::BUILTIN_ADMINISTRATORS);
//! assert_eq!(administrators.to_string(), "S-1-5-32-544");
//! ```
//!
//! Inside `const` items, the [`sid!`] macro checks a literal at compile time instead.
//!
//! ## Windows-only functionality
//! *Available behind `cfg(windows)`.*
//!
//! [`sid_cache`] gains an account resolver backed by `LookupAccountSidW`. Everything
//! else is pure Rust and behaves identically on every platform.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]

pub mod ace;
pub mod acl;
pub mod claim;
pub mod condition;
pub mod domain_and_name;
mod error;
pub mod generic_mapping;
mod guid;
pub mod sddl;
pub mod security_descriptor;
mod sid;
pub mod sid_cache;
mod sid_identifier_authority;
mod sid_type;
pub(crate) mod utils;
pub mod well_known;

#[cfg(feature = "serde")]
mod serde_impl;

pub use ace::{
    Ace, AceFlags, AceKind, AceType, CallbackAce, CallbackObjectAce, CompoundAce, ObjectAce, ObjectAceFlags,
    ResourceAttributeAce,
};
pub use acl::{Acl, AclConfig, AclFlags};
pub use claim::{ClaimAttribute, ClaimAttributeFlags, ClaimValueType, ClaimValues};
pub use domain_and_name::{DomainAndName, DomainParsingError};
pub use error::{Error, Result};
pub use generic_mapping::GenericMapping;
pub use guid::Guid;
pub use security_descriptor::{
    AutoInheritFlags, SecurityDescriptor, SecurityDescriptorControl, SecurityInformation, SidEntry,
};
pub use sid::{InvalidSidFormat, MAX_SUBAUTHORITY_COUNT, MIN_SUBAUTHORITY_COUNT, Sid};

/// Identifier authority component of a SID (6-byte value).
///
/// See also: [`Sid::identifier_authority`].
pub use sid_identifier_authority::SidIdentifierAuthority;

/// Rust representation of `SID_NAME_USE`.
pub use sid_type::SidType;

/// Parses a SID literal at compile time into a `const` [`Sid`].
pub use sid_macro::sid;
