use log::{debug, warn};

use super::SecurityDescriptor;
use crate::ace::{Ace, AceFlags, AceType};
use crate::acl::{Acl, AclFlags};
use crate::generic_mapping::GenericMapping;
use crate::{Guid, Sid, well_known};

/// Properties of the object receiving the inherited ACEs.
struct Target<'a> {
    object_type: Option<Guid>,
    container: bool,
    mapping: Option<GenericMapping>,
    owner: Option<&'a Sid>,
    group: Option<&'a Sid>,
}

impl Target<'_> {
    /// The ACE as it takes effect on the target: generic rights mapped and creator SIDs
    /// replaced by the target's owner and group.
    fn effective(&self, ace: &Ace) -> Ace {
        let mut effective = ace.clone();
        if let Some(mapping) = &self.mapping
            && ace.ace_type() != AceType::SystemMandatoryLabel
        {
            effective.mask = mapping.map(effective.mask);
        }
        let sid = ace.sid();
        let substitute = if *sid == well_known::CREATOR_OWNER {
            self.owner
        } else if *sid == well_known::CREATOR_GROUP {
            self.group
        } else {
            None
        };
        if let Some(sid) = substitute {
            *effective.sid_mut() = *sid;
        }
        effective
    }

    /// Appends what `ace` of the parent list becomes on the target.
    fn inherit(&self, ace: &Ace, out: &mut Vec<Ace>) {
        let inheritable = ace.flags & (AceFlags::OBJECT_INHERIT | AceFlags::CONTAINER_INHERIT);
        if inheritable.is_empty() {
            return;
        }
        let type_matches = ace
            .inherited_object_type()
            .is_none_or(|wanted| self.object_type == Some(wanted));
        let applies = type_matches
            && ace.flags.contains(if self.container {
                AceFlags::CONTAINER_INHERIT
            } else {
                AceFlags::OBJECT_INHERIT
            });
        let propagates = self.container && !ace.flags.contains(AceFlags::NO_PROPAGATE_INHERIT);
        let base = (ace.flags - AceFlags::INHERITANCE) | AceFlags::INHERITED;

        let pass_through = |flags: AceFlags| {
            let mut copy = ace.clone();
            copy.flags = flags;
            copy
        };
        match (applies, propagates) {
            (true, false) => {
                let mut effective = self.effective(ace);
                effective.flags = base;
                out.push(effective);
            }
            (false, true) => out.push(pass_through(base | inheritable | AceFlags::INHERIT_ONLY)),
            (true, true) => {
                let effective = self.effective(ace);
                if effective.mask == ace.mask && effective.sid() == ace.sid() {
                    out.push(pass_through(base | inheritable));
                } else {
                    // One ACE for the target, one carrying the original for its children.
                    out.push(Ace {
                        flags: base,
                        ..effective
                    });
                    out.push(pass_through(base | inheritable | AceFlags::INHERIT_ONLY));
                }
            }
            (false, false) => {}
        }
    }

    fn inherited_from(&self, parent: &Acl) -> Vec<Ace> {
        let mut out = Vec::new();
        for ace in parent {
            self.inherit(ace, &mut out);
        }
        out
    }

    fn auto_inherit(&self, current: Option<&Acl>, parent: Option<&Acl>, dacl: bool) -> Option<Acl> {
        let derived = parent
            .filter(|acl| !acl.is_null())
            .map(|acl| self.inherited_from(acl))
            .unwrap_or_default();
        let mut acl = match current {
            Some(acl) if acl.is_null() || acl.flags().contains(AclFlags::PROTECTED) => {
                let mut kept = acl.clone();
                kept.set_flags(kept.flags() | AclFlags::AUTO_INHERITED);
                return Some(kept);
            }
            Some(acl) => acl.clone(),
            None if derived.is_empty() => return None,
            None => Acl::new(),
        };
        let stale = acl
            .iter()
            .filter(|ace| ace.is_inherited() && !derived.contains(ace))
            .count();
        if stale > 0 {
            warn!(
                "dropping {stale} inherited {} ACEs not derivable from the parent",
                if dacl { "DACL" } else { "SACL" }
            );
        }
        acl.remove_where(Ace::is_inherited);
        debug!("appending {} inherited ACEs", derived.len());
        acl.extend_entries(derived);
        if dacl {
            acl.canonicalize_dacl();
        } else {
            acl.canonicalize_sacl();
        }
        acl.set_flags(acl.flags() | AclFlags::AUTO_INHERITED);
        Some(acl)
    }
}

impl SecurityDescriptor {
    /// Recomputes the inherited ACEs of this descriptor from `parent`.
    ///
    /// Explicit ACEs are kept in order. Inheritable ACEs of the parent lists are added with
    /// the `INHERITED` flag: `CONTAINER_INHERIT` ones when `container`, `OBJECT_INHERIT` ones
    /// otherwise, object ACEs only when their inherited object type is `object_type`.
    /// Containers also receive inherit-only copies for their own children unless
    /// `NO_PROPAGATE_INHERIT` is set. Generic rights of the effective ACEs are mapped with
    /// `mapping` (or [`SecurityDescriptor::generic_mapping`]) and `CREATOR OWNER`/`CREATOR GROUP`
    /// are replaced by this descriptor's owner and group. Previously inherited ACEs are
    /// replaced. Protected and null lists are kept as they are. Both resulting lists are
    /// canonical and flagged [`AclFlags::AUTO_INHERITED`].
    ///
    /// ```rust
    /// # use win_security_descriptor::{Ace, AceFlags, Acl, AclFlags, SecurityDescriptor, well_known};
    /// let user = well_known::BUILTIN_USERS;
    /// let mut parent = SecurityDescriptor::new();
    /// parent.dacl = Some([Ace::allowed(user, 0x1F01FF, AceFlags::CONTAINER_INHERIT)].into_iter().collect());
    /// let mut child = SecurityDescriptor::new();
    /// child.dacl = Some(Acl::new());
    ///
    /// let child = child.convert_to_auto_inherit(Some(&parent), None, true, None);
    /// let dacl = child.dacl.unwrap();
    /// assert_eq!(dacl.entries(), [Ace::allowed(user, 0x1F01FF, AceFlags::CONTAINER_INHERIT | AceFlags::INHERITED)]);
    /// assert!(dacl.flags().contains(AclFlags::AUTO_INHERITED));
    /// ```
    #[inline]
    #[must_use]
    pub fn convert_to_auto_inherit(
        &self,
        parent: Option<&Self>,
        object_type: Option<Guid>,
        container: bool,
        mapping: Option<&GenericMapping>,
    ) -> Self {
        let target = Target {
            object_type,
            container,
            mapping: mapping.copied().or(self.generic_mapping),
            owner: self.owner.as_ref().map(|owner| &owner.sid),
            group: self.group.as_ref().map(|group| &group.sid),
        };
        let dacl = target.auto_inherit(
            self.dacl.as_ref(),
            parent.and_then(|parent| parent.dacl.as_ref()),
            true,
        );
        let sacl = target.auto_inherit(
            self.sacl.as_ref(),
            parent.and_then(|parent| parent.sacl.as_ref()),
            false,
        );
        Self {
            dacl,
            sacl,
            ..self.clone()
        }
    }
}
