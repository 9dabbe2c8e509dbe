use log::debug;

use super::{AutoInheritFlags, SecurityDescriptor, SecurityInformation, remap};
use crate::ace::Ace;
use crate::acl::{Acl, AclFlags};
use crate::error::{Error, Result};
use crate::generic_mapping::GenericMapping;

/// How one list of the delta replaces the current one.
struct ListUpdate {
    protect: bool,
    unprotect: bool,
    auto_inherit: bool,
    dacl: bool,
}

impl ListUpdate {
    fn apply(
        &self,
        current: Option<&Acl>,
        replacement: Option<&Acl>,
        mapping: Option<&GenericMapping>,
    ) -> Result<Option<Acl>> {
        if self.protect && self.unprotect {
            return Err(Error::InvalidAcl("cannot both protect and unprotect a list"));
        }
        let Some(replacement) = replacement else {
            return Ok(None);
        };
        let mut acl = replacement.clone();
        if let Some(mapping) = mapping {
            remap(&mut acl, |mask| mapping.map(mask));
        }
        let mut flags = acl.flags();
        if self.protect {
            flags |= AclFlags::PROTECTED;
        } else if self.unprotect {
            flags -= AclFlags::PROTECTED;
        }
        if self.auto_inherit && !acl.is_null() {
            acl.remove_where(Ace::is_inherited);
            if !flags.contains(AclFlags::PROTECTED) {
                let inherited = current
                    .into_iter()
                    .flat_map(Acl::iter)
                    .filter(|ace| ace.is_inherited())
                    .cloned();
                acl.extend_entries(inherited);
            }
            flags |= AclFlags::AUTO_INHERITED;
            if self.dacl {
                acl.canonicalize_dacl();
            } else {
                acl.canonicalize_sacl();
            }
        }
        acl.set_flags(flags);
        Ok(Some(acl))
    }
}

/// Replaces the ACEs of `current` whose type `information` selects by those of `delta`.
fn merge_partial_sacl(
    current: Option<&Acl>,
    delta: Option<&Acl>,
    information: SecurityInformation,
) -> Option<Acl> {
    let mut acl = match current {
        Some(acl) if !acl.is_null() => acl.clone(),
        Some(acl) => {
            let mut fresh = Acl::new();
            fresh.set_flags(acl.flags());
            fresh
        }
        None => Acl::new(),
    };
    let removed = acl.remove_where(|ace| information.selects(ace.ace_type()));
    let added: Vec<Ace> = delta
        .into_iter()
        .flat_map(Acl::iter)
        .filter(|ace| information.selects(ace.ace_type()))
        .cloned()
        .collect();
    debug!("partial SACL update: {removed} ACEs removed, {} added", added.len());
    acl.extend_entries(added);
    acl.canonicalize_sacl();
    if acl.is_empty() && current.is_none() {
        return None;
    }
    Some(acl)
}

impl SecurityDescriptor {
    /// Replaces the components selected by `information` with those of `delta`.
    ///
    /// - `OWNER` and `GROUP` copy the delta's entry.
    /// - `DACL` and `SACL` replace the list; a `None` delta list removes it and a null one
    ///   stays null. Generic rights are mapped with `mapping` (or the cached mapping) when one
    ///   is available. With the matching [`AutoInheritFlags`] bit, inherited ACEs of the new
    ///   list are discarded and the current inherited ACEs are kept unless the new list is
    ///   protected; the result is canonical and flagged [`AclFlags::AUTO_INHERITED`].
    /// - `PROTECTED_*`/`UNPROTECTED_*` set or clear the protected bit of the new list.
    /// - Without `SACL`, the selectors of [`SecurityInformation::PARTIAL_SACL`] replace only
    ///   the SACL ACEs of their type, leaving the other ACEs in place.
    ///
    /// The descriptor is unchanged when an error is returned.
    ///
    /// ```rust
    /// # use win_security_descriptor::{Ace, AceFlags, AutoInheritFlags, SecurityDescriptor, SecurityInformation, SidEntry, well_known};
    /// let mut sd = SecurityDescriptor::new();
    /// let mut delta = SecurityDescriptor::new();
    /// delta.owner = Some(SidEntry::new(well_known::LOCAL_SYSTEM));
    /// sd.modify(&delta, SecurityInformation::OWNER, AutoInheritFlags::empty(), None).unwrap();
    /// assert_eq!(sd.owner.unwrap().sid, well_known::LOCAL_SYSTEM);
    /// ```
    ///
    /// # Errors
    /// [`Error::MissingComponent`] when `OWNER` or `GROUP` is selected and `delta` lacks it,
    /// [`Error::InvalidAcl`] when a list is both protected and unprotected.
    #[inline]
    pub fn modify(
        &mut self,
        delta: &Self,
        information: SecurityInformation,
        flags: AutoInheritFlags,
        mapping: Option<&GenericMapping>,
    ) -> Result<()> {
        let mapping = mapping.copied().or(self.generic_mapping);
        let mut next = self.clone();

        if information.contains(SecurityInformation::OWNER) {
            next.owner = Some(delta.owner.ok_or(Error::MissingComponent("owner"))?);
        }
        if information.contains(SecurityInformation::GROUP) {
            next.group = Some(delta.group.ok_or(Error::MissingComponent("group"))?);
        }
        if information.contains(SecurityInformation::DACL) {
            let update = ListUpdate {
                protect: information.contains(SecurityInformation::PROTECTED_DACL),
                unprotect: information.contains(SecurityInformation::UNPROTECTED_DACL),
                auto_inherit: flags.contains(AutoInheritFlags::DACL_AUTO_INHERIT),
                dacl: true,
            };
            next.dacl = update.apply(self.dacl.as_ref(), delta.dacl.as_ref(), mapping.as_ref())?;
        }
        if information.contains(SecurityInformation::SACL) {
            let update = ListUpdate {
                protect: information.contains(SecurityInformation::PROTECTED_SACL),
                unprotect: information.contains(SecurityInformation::UNPROTECTED_SACL),
                auto_inherit: flags.contains(AutoInheritFlags::SACL_AUTO_INHERIT),
                dacl: false,
            };
            next.sacl = update.apply(self.sacl.as_ref(), delta.sacl.as_ref(), mapping.as_ref())?;
        } else if information.intersects(SecurityInformation::PARTIAL_SACL) {
            next.sacl = merge_partial_sacl(self.sacl.as_ref(), delta.sacl.as_ref(), information);
        }

        *self = next;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
mod test {
    use super::*;
    use crate::ace::AceFlags;
    use crate::generic_mapping::{FILE, GENERIC_READ, NO_WRITE_UP, file};
    use crate::security_descriptor::SidEntry;
    use crate::well_known::{
        BUILTIN_ADMINISTRATORS, BUILTIN_USERS, HIGH_MANDATORY_LEVEL, LOCAL_SYSTEM, MEDIUM_MANDATORY_LEVEL, WORLD,
    };

    const ID: AceFlags = AceFlags::INHERITED;
    const NONE: AceFlags = AceFlags::empty();

    fn list(aces: impl IntoIterator<Item = Ace>) -> Option<Acl> {
        Some(aces.into_iter().collect())
    }

    fn object() -> SecurityDescriptor {
        let mut sd = SecurityDescriptor::new();
        sd.owner = Some(SidEntry::new(BUILTIN_ADMINISTRATORS));
        sd.dacl = list([
            Ace::allowed(BUILTIN_USERS, 1, NONE),
            Ace::allowed(WORLD, 1, ID),
        ]);
        sd.sacl = list([
            Ace::audit(WORLD, 1, NONE),
            Ace::mandatory_label(MEDIUM_MANDATORY_LEVEL, NO_WRITE_UP, NONE),
        ]);
        sd
    }

    #[test]
    fn owner_and_group() {
        let mut sd = object();
        let mut delta = SecurityDescriptor::new();
        delta.owner = Some(SidEntry::new(LOCAL_SYSTEM));
        let before = sd.clone();
        assert_eq!(
            sd.modify(
                &delta,
                SecurityInformation::OWNER | SecurityInformation::GROUP,
                AutoInheritFlags::empty(),
                None
            ),
            Err(Error::MissingComponent("group"))
        );
        assert_eq!(sd, before);
        sd.modify(&delta, SecurityInformation::OWNER, AutoInheritFlags::empty(), None)
            .unwrap();
        assert_eq!(sd.owner.unwrap().sid, LOCAL_SYSTEM);
        assert_eq!(sd.dacl, before.dacl);
    }

    #[test]
    fn dacl_replacement_keeps_inherited_aces() {
        let mut sd = object();
        let mut delta = SecurityDescriptor::new();
        delta.dacl = list([
            Ace::allowed(LOCAL_SYSTEM, 1, NONE),
            Ace::denied(BUILTIN_USERS, 1, NONE),
            Ace::allowed(BUILTIN_ADMINISTRATORS, 1, ID),
        ]);
        sd.modify(
            &delta,
            SecurityInformation::DACL,
            AutoInheritFlags::DACL_AUTO_INHERIT,
            None,
        )
        .unwrap();
        let dacl = sd.dacl.unwrap();
        assert_eq!(
            dacl.entries(),
            [
                Ace::denied(BUILTIN_USERS, 1, NONE),
                Ace::allowed(LOCAL_SYSTEM, 1, NONE),
                Ace::allowed(WORLD, 1, ID),
            ]
        );
        assert!(dacl.flags().contains(AclFlags::AUTO_INHERITED));
    }

    #[test]
    fn plain_replacement_and_protection() {
        let mut sd = object();
        let mut delta = SecurityDescriptor::new();
        delta.dacl = list([Ace::allowed(LOCAL_SYSTEM, GENERIC_READ, NONE)]);
        sd.modify(
            &delta,
            SecurityInformation::DACL | SecurityInformation::PROTECTED_DACL,
            AutoInheritFlags::DACL_AUTO_INHERIT,
            Some(&FILE.mapping),
        )
        .unwrap();
        let dacl = sd.dacl.as_ref().unwrap();
        assert_eq!(dacl.entries(), [Ace::allowed(LOCAL_SYSTEM, file::GENERIC_READ, NONE)]);
        assert!(dacl.flags().contains(AclFlags::PROTECTED));

        assert_eq!(
            sd.modify(
                &delta,
                SecurityInformation::DACL
                    | SecurityInformation::PROTECTED_DACL
                    | SecurityInformation::UNPROTECTED_DACL,
                AutoInheritFlags::empty(),
                None,
            ),
            Err(Error::InvalidAcl("cannot both protect and unprotect a list"))
        );

        delta.dacl = Some(Acl::null());
        sd.modify(&delta, SecurityInformation::DACL, AutoInheritFlags::empty(), None)
            .unwrap();
        assert!(sd.dacl.as_ref().unwrap().is_null());
        delta.dacl = None;
        sd.modify(&delta, SecurityInformation::DACL, AutoInheritFlags::empty(), None)
            .unwrap();
        assert!(sd.dacl.is_none());
    }

    #[test]
    fn label_only_update() {
        let mut sd = object();
        let mut delta = SecurityDescriptor::new();
        delta.sacl = list([
            Ace::mandatory_label(HIGH_MANDATORY_LEVEL, NO_WRITE_UP, NONE),
            Ace::audit(LOCAL_SYSTEM, 1, NONE),
        ]);
        sd.modify(&delta, SecurityInformation::LABEL, AutoInheritFlags::empty(), None)
            .unwrap();
        assert_eq!(
            sd.sacl.unwrap().entries(),
            [
                Ace::audit(WORLD, 1, NONE),
                Ace::mandatory_label(HIGH_MANDATORY_LEVEL, NO_WRITE_UP, NONE),
            ]
        );

        let mut bare = SecurityDescriptor::new();
        bare.modify(&SecurityDescriptor::new(), SecurityInformation::LABEL, AutoInheritFlags::empty(), None)
            .unwrap();
        assert!(bare.sacl.is_none());
    }
}
