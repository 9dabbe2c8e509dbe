//! Access rights, generic mappings and per-object-type right tables.

/// Delete the object.
pub const DELETE: u32 = 0x0001_0000;
/// Read the security descriptor, SACL excluded.
pub const READ_CONTROL: u32 = 0x0002_0000;
/// Modify the DACL.
pub const WRITE_DAC: u32 = 0x0004_0000;
/// Change the owner.
pub const WRITE_OWNER: u32 = 0x0008_0000;
/// Wait on the object.
pub const SYNCHRONIZE: u32 = 0x0010_0000;
/// `DELETE | READ_CONTROL | WRITE_DAC | WRITE_OWNER`
pub const STANDARD_RIGHTS_REQUIRED: u32 = 0x000F_0000;
/// Standard rights plus `SYNCHRONIZE`.
pub const STANDARD_RIGHTS_ALL: u32 = 0x001F_0000;
/// Low 16 bits, interpreted per object type.
pub const SPECIFIC_RIGHTS_ALL: u32 = 0x0000_FFFF;
/// Read or write the SACL.
pub const ACCESS_SYSTEM_SECURITY: u32 = 0x0100_0000;
/// Request every right the caller can get.
pub const MAXIMUM_ALLOWED: u32 = 0x0200_0000;
/// Generic all.
pub const GENERIC_ALL: u32 = 0x1000_0000;
/// Generic execute.
pub const GENERIC_EXECUTE: u32 = 0x2000_0000;
/// Generic write.
pub const GENERIC_WRITE: u32 = 0x4000_0000;
/// Generic read.
pub const GENERIC_READ: u32 = 0x8000_0000;
/// All four generic bits.
pub const GENERIC_RIGHTS: u32 = GENERIC_ALL | GENERIC_EXECUTE | GENERIC_WRITE | GENERIC_READ;

/// Mandatory-label policy: no write up.
pub const NO_WRITE_UP: u32 = 0x1;
/// Mandatory-label policy: no read up.
pub const NO_READ_UP: u32 = 0x2;
/// Mandatory-label policy: no execute up.
pub const NO_EXECUTE_UP: u32 = 0x4;

/// Specific rights of files and directories.
pub mod file {
    /// Read data / list directory.
    pub const READ_DATA: u32 = 0x0001;
    /// Write data / add file.
    pub const WRITE_DATA: u32 = 0x0002;
    /// Append data / add subdirectory.
    pub const APPEND_DATA: u32 = 0x0004;
    /// Read extended attributes.
    pub const READ_EA: u32 = 0x0008;
    /// Write extended attributes.
    pub const WRITE_EA: u32 = 0x0010;
    /// Execute / traverse.
    pub const EXECUTE: u32 = 0x0020;
    /// Delete children of a directory.
    pub const DELETE_CHILD: u32 = 0x0040;
    /// Read attributes.
    pub const READ_ATTRIBUTES: u32 = 0x0080;
    /// Write attributes.
    pub const WRITE_ATTRIBUTES: u32 = 0x0100;
    /// `FILE_ALL_ACCESS`
    pub const ALL_ACCESS: u32 = 0x001F_01FF;
    /// `FILE_GENERIC_READ`
    pub const GENERIC_READ: u32 = 0x0012_0089;
    /// `FILE_GENERIC_WRITE`
    pub const GENERIC_WRITE: u32 = 0x0012_0116;
    /// `FILE_GENERIC_EXECUTE`
    pub const GENERIC_EXECUTE: u32 = 0x0012_00A0;
}

/// Specific rights of registry keys.
pub mod registry {
    /// Query values.
    pub const QUERY_VALUE: u32 = 0x0001;
    /// Set values.
    pub const SET_VALUE: u32 = 0x0002;
    /// Create subkeys.
    pub const CREATE_SUB_KEY: u32 = 0x0004;
    /// Enumerate subkeys.
    pub const ENUMERATE_SUB_KEYS: u32 = 0x0008;
    /// Change notifications.
    pub const NOTIFY: u32 = 0x0010;
    /// Create symbolic links.
    pub const CREATE_LINK: u32 = 0x0020;
    /// `KEY_READ`
    pub const READ: u32 = 0x0002_0019;
    /// `KEY_WRITE`
    pub const WRITE: u32 = 0x0002_0006;
    /// `KEY_EXECUTE`
    pub const EXECUTE: u32 = 0x0002_0019;
    /// `KEY_ALL_ACCESS`
    pub const ALL_ACCESS: u32 = 0x000F_003F;
}

/// Specific rights of directory-service objects.
pub mod ds {
    /// Create child objects.
    pub const CREATE_CHILD: u32 = 0x0001;
    /// Delete child objects.
    pub const DELETE_CHILD: u32 = 0x0002;
    /// List children.
    pub const LIST: u32 = 0x0004;
    /// Validated write.
    pub const SELF: u32 = 0x0008;
    /// Read properties.
    pub const READ_PROPERTY: u32 = 0x0010;
    /// Write properties.
    pub const WRITE_PROPERTY: u32 = 0x0020;
    /// Delete the subtree.
    pub const DELETE_TREE: u32 = 0x0040;
    /// List the object.
    pub const LIST_OBJECT: u32 = 0x0080;
    /// Extended rights.
    pub const CONTROL_ACCESS: u32 = 0x0100;
}

/// Translation of the four generic rights into type-specific rights.
///
/// ```rust
/// # use win_security_descriptor::{GenericMapping, generic_mapping::GENERIC_ALL};
/// let mapping = GenericMapping { generic_all: 0xF000_0000, ..GenericMapping::default() };
/// assert_eq!(mapping.map(GENERIC_ALL), 0xF000_0000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GenericMapping {
    /// Rights granted by `GENERIC_READ`.
    pub generic_read: u32,
    /// Rights granted by `GENERIC_WRITE`.
    pub generic_write: u32,
    /// Rights granted by `GENERIC_EXECUTE`.
    pub generic_execute: u32,
    /// Rights granted by `GENERIC_ALL`.
    pub generic_all: u32,
}

impl GenericMapping {
    /// Creates a mapping.
    #[inline]
    #[must_use]
    pub const fn new(generic_read: u32, generic_write: u32, generic_execute: u32, generic_all: u32) -> Self {
        Self {
            generic_read,
            generic_write,
            generic_execute,
            generic_all,
        }
    }

    /// `(generic bit, specific rights)`, `GENERIC_ALL` first.
    const fn pairs(&self) -> [(u32, u32); 4] {
        [
            (GENERIC_ALL, self.generic_all),
            (GENERIC_READ, self.generic_read),
            (GENERIC_WRITE, self.generic_write),
            (GENERIC_EXECUTE, self.generic_execute),
        ]
    }

    /// Clears the generic bits of `mask` and ORs in the rights they stand for.
    ///
    /// Masks without generic bits are returned unchanged.
    #[inline]
    #[must_use]
    pub const fn map(&self, mask: u32) -> u32 {
        let pairs = self.pairs();
        let mut mapped = mask & !GENERIC_RIGHTS;
        let mut i = 0;
        while i < pairs.len() {
            let (generic, specific) = pairs[i];
            if mask & generic != 0 {
                mapped |= specific;
            }
            i += 1;
        }
        mapped
    }

    /// Best-effort inverse of [`GenericMapping::map`].
    ///
    /// A generic bit is set only when every right of its mapping is present in `mask`; those
    /// rights are then cleared. Partial overlaps are left as they are. When `GENERIC_ALL`
    /// matches, the other generic bits are not considered.
    ///
    /// ```rust
    /// # use win_security_descriptor::generic_mapping::{FILE, GENERIC_READ, file};
    /// let mapping = FILE.mapping;
    /// assert_eq!(mapping.unmap(file::GENERIC_READ | file::WRITE_DATA), GENERIC_READ | file::WRITE_DATA);
    /// assert_eq!(mapping.unmap(file::READ_DATA), file::READ_DATA);
    /// ```
    #[inline]
    #[must_use]
    pub const fn unmap(&self, mask: u32) -> u32 {
        let pairs = self.pairs();
        let mut generic = 0;
        let mut covered = 0;
        let mut i = 0;
        while i < pairs.len() {
            let (bit, specific) = pairs[i];
            if specific != 0 && mask & specific == specific {
                generic |= bit;
                covered |= specific;
                if bit == GENERIC_ALL {
                    break;
                }
            }
            i += 1;
        }
        (mask & !covered) | generic
    }
}

/// SDDL abbreviations valid for every object type.
pub static STANDARD_RIGHTS: &[(&str, u32)] = &[
    ("GA", GENERIC_ALL),
    ("GR", GENERIC_READ),
    ("GW", GENERIC_WRITE),
    ("GX", GENERIC_EXECUTE),
    ("RC", READ_CONTROL),
    ("SD", DELETE),
    ("WD", WRITE_DAC),
    ("WO", WRITE_OWNER),
];

/// SDDL abbreviations of mandatory-label policies.
pub static MANDATORY_LABEL_RIGHTS: &[(&str, u32)] = &[
    ("NW", NO_WRITE_UP),
    ("NR", NO_READ_UP),
    ("NX", NO_EXECUTE_UP),
];

static FILE_RIGHTS: &[(&str, u32)] = &[
    ("FA", file::ALL_ACCESS),
    ("FR", file::GENERIC_READ),
    ("FW", file::GENERIC_WRITE),
    ("FX", file::GENERIC_EXECUTE),
];

static REGISTRY_RIGHTS: &[(&str, u32)] = &[
    ("KA", registry::ALL_ACCESS),
    ("KR", registry::READ),
    ("KW", registry::WRITE),
];

static DS_RIGHTS: &[(&str, u32)] = &[
    ("CC", ds::CREATE_CHILD),
    ("DC", ds::DELETE_CHILD),
    ("LC", ds::LIST),
    ("SW", ds::SELF),
    ("RP", ds::READ_PROPERTY),
    ("WP", ds::WRITE_PROPERTY),
    ("DT", ds::DELETE_TREE),
    ("LO", ds::LIST_OBJECT),
    ("CR", ds::CONTROL_ACCESS),
];

/// Description of a kind of securable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityObjectType {
    /// Display name.
    pub name: &'static str,
    /// Generic mapping of the type.
    pub mapping: GenericMapping,
    /// Type-specific SDDL right abbreviations, composite rights first.
    pub rights: &'static [(&'static str, u32)],
    /// Whether objects of this type can have children.
    pub container: bool,
}

/// Files.
pub const FILE: SecurityObjectType = SecurityObjectType {
    name: "File",
    mapping: GenericMapping::new(
        file::GENERIC_READ,
        file::GENERIC_WRITE,
        file::GENERIC_EXECUTE,
        file::ALL_ACCESS,
    ),
    rights: FILE_RIGHTS,
    container: false,
};

/// Directories; same rights as files.
pub const DIRECTORY: SecurityObjectType = SecurityObjectType {
    name: "Directory",
    container: true,
    ..FILE
};

/// Registry keys.
pub const REGISTRY_KEY: SecurityObjectType = SecurityObjectType {
    name: "Key",
    mapping: GenericMapping::new(
        registry::READ,
        registry::WRITE,
        registry::EXECUTE,
        registry::ALL_ACCESS,
    ),
    rights: REGISTRY_RIGHTS,
    container: true,
};

/// Directory-service objects.
pub const DIRECTORY_SERVICE: SecurityObjectType = SecurityObjectType {
    name: "DirectoryService",
    mapping: GenericMapping::new(
        READ_CONTROL | ds::LIST | ds::READ_PROPERTY | ds::LIST_OBJECT,
        READ_CONTROL | ds::SELF | ds::WRITE_PROPERTY,
        READ_CONTROL | ds::LIST,
        STANDARD_RIGHTS_REQUIRED
            | ds::CREATE_CHILD
            | ds::DELETE_CHILD
            | ds::LIST
            | ds::SELF
            | ds::READ_PROPERTY
            | ds::WRITE_PROPERTY
            | ds::DELETE_TREE
            | ds::LIST_OBJECT
            | ds::CONTROL_ACCESS,
    ),
    rights: DS_RIGHTS,
    container: true,
};

impl SecurityObjectType {
    /// Looks up a right abbreviation, type-specific ones first.
    #[inline]
    #[must_use]
    pub fn right(&self, abbreviation: &str) -> Option<u32> {
        self.rights
            .iter()
            .chain(STANDARD_RIGHTS)
            .find(|(name, _)| name.eq_ignore_ascii_case(abbreviation))
            .map(|(_, mask)| *mask)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generic_all_example() {
        let mapping = GenericMapping {
            generic_all: 0xF000_0000,
            ..GenericMapping::default()
        };
        assert_eq!(mapping.map(0x1000_0000), 0xF000_0000);
        assert_eq!(mapping.unmap(0xF000_0000), GENERIC_ALL);
    }

    #[test]
    fn file_mapping() {
        let mapping = FILE.mapping;
        assert_eq!(mapping.map(GENERIC_READ | GENERIC_EXECUTE), 0x0012_00A9);
        assert_eq!(mapping.map(GENERIC_ALL | DELETE), file::ALL_ACCESS);
        assert_eq!(mapping.unmap(file::ALL_ACCESS), GENERIC_ALL);
        assert_eq!(
            mapping.unmap(file::GENERIC_READ | file::GENERIC_WRITE),
            GENERIC_READ | GENERIC_WRITE
        );
    }

    #[test]
    fn partial_overlap_is_left_alone() {
        let mapping = REGISTRY_KEY.mapping;
        let partial = registry::QUERY_VALUE | READ_CONTROL;
        assert_eq!(mapping.unmap(partial), partial);
    }

    #[test]
    fn abbreviations() {
        assert_eq!(DIRECTORY.right("fa"), Some(file::ALL_ACCESS));
        assert_eq!(DIRECTORY_SERVICE.right("RP"), Some(ds::READ_PROPERTY));
        assert_eq!(REGISTRY_KEY.right("GA"), Some(GENERIC_ALL));
        assert_eq!(REGISTRY_KEY.right("FA"), None);
    }

    proptest! {
        #[test]
        fn map_is_idempotent_on_specific_masks(mask in any::<u32>()) {
            let mask = mask & !GENERIC_RIGHTS;
            prop_assert_eq!(FILE.mapping.map(mask), mask);
            prop_assert_eq!(DIRECTORY_SERVICE.mapping.map(FILE.mapping.map(mask)), mask);
        }

        #[test]
        fn map_leaves_no_generic_bits_for_specific_mappings(mask in any::<u32>()) {
            prop_assert_eq!(REGISTRY_KEY.mapping.map(mask) & GENERIC_RIGHTS, 0);
        }
    }
}
