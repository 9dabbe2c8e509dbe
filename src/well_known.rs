//! Well-known SIDs and the SDDL two-letter alias table.
//!
//! Source: <https://learn.microsoft.com/windows/win32/secauthz/well-known-sids> and
//! <https://learn.microsoft.com/windows/win32/secauthz/sid-strings>.
//!
//! Every constant is a plain [`Sid`] built at compile time with the `sid!` macro.
//! Aliases such as `DA` or `LA` are relative to a domain; they resolve only when a
//! domain SID is supplied.

use sid_macro::sid;

use crate::{Sid, SidType};

// ---- Basic Authorities ----

/// Null SID (S-1-0-0)
pub const NULL: Sid = sid!("S-1-0-0");
/// Everyone (S-1-1-0)
pub const WORLD: Sid = sid!("S-1-1-0");
/// Local (S-1-2-0)
pub const LOCAL: Sid = sid!("S-1-2-0");
/// Console logon (S-1-2-1)
pub const CONSOLE_LOGON: Sid = sid!("S-1-2-1");
/// Creator Owner (S-1-3-0)
pub const CREATOR_OWNER: Sid = sid!("S-1-3-0");
/// Creator Group (S-1-3-1)
pub const CREATOR_GROUP: Sid = sid!("S-1-3-1");
/// Creator Owner Server (S-1-3-2)
pub const CREATOR_OWNER_SERVER: Sid = sid!("S-1-3-2");
/// Creator Group Server (S-1-3-3)
pub const CREATOR_GROUP_SERVER: Sid = sid!("S-1-3-3");
/// Owner Rights (S-1-3-4)
pub const OWNER_RIGHTS: Sid = sid!("S-1-3-4");

// ---- NT Authority (S-1-5) ----

/// Network (S-1-5-2)
pub const NETWORK: Sid = sid!("S-1-5-2");
/// Batch (S-1-5-3)
pub const BATCH: Sid = sid!("S-1-5-3");
/// Interactive (S-1-5-4)
pub const INTERACTIVE: Sid = sid!("S-1-5-4");
/// Service (S-1-5-6)
pub const SERVICE: Sid = sid!("S-1-5-6");
/// Anonymous logon (S-1-5-7)
pub const ANONYMOUS: Sid = sid!("S-1-5-7");
/// Enterprise domain controllers (S-1-5-9)
pub const ENTERPRISE_DOMAIN_CONTROLLERS: Sid = sid!("S-1-5-9");
/// Principal Self (S-1-5-10)
pub const PRINCIPAL_SELF: Sid = sid!("S-1-5-10");
/// Authenticated Users (S-1-5-11)
pub const AUTHENTICATED_USERS: Sid = sid!("S-1-5-11");
/// Restricted code (S-1-5-12)
pub const RESTRICTED_CODE: Sid = sid!("S-1-5-12");
/// Terminal server user (S-1-5-13)
pub const TERMINAL_SERVER_USER: Sid = sid!("S-1-5-13");
/// This organization (S-1-5-15)
pub const THIS_ORGANIZATION: Sid = sid!("S-1-5-15");
/// Local System (S-1-5-18)
pub const LOCAL_SYSTEM: Sid = sid!("S-1-5-18");
/// Local Service (S-1-5-19)
pub const LOCAL_SERVICE: Sid = sid!("S-1-5-19");
/// Network Service (S-1-5-20)
pub const NETWORK_SERVICE: Sid = sid!("S-1-5-20");
/// Write restricted code (S-1-5-33)
pub const WRITE_RESTRICTED_CODE: Sid = sid!("S-1-5-33");
/// User-mode drivers (S-1-5-84-0-0-0-0-0)
pub const USER_MODE_DRIVERS: Sid = sid!("S-1-5-84-0-0-0-0-0");
/// Trusted installer (S-1-5-80-956008885-3418522649-1831038044-1853292631-2271478464)
pub const TRUSTED_INSTALLER: Sid =
    sid!("S-1-5-80-956008885-3418522649-1831038044-1853292631-2271478464");

// ---- BUILTIN Domain (S-1-5-32) ----

/// BUILTIN domain (S-1-5-32)
pub const BUILTIN: Sid = sid!("S-1-5-32");
/// BUILTIN\Administrators (S-1-5-32-544)
pub const BUILTIN_ADMINISTRATORS: Sid = sid!("S-1-5-32-544");
/// BUILTIN\Users (S-1-5-32-545)
pub const BUILTIN_USERS: Sid = sid!("S-1-5-32-545");
/// BUILTIN\Guests (S-1-5-32-546)
pub const BUILTIN_GUESTS: Sid = sid!("S-1-5-32-546");
/// BUILTIN\Power Users (S-1-5-32-547)
pub const BUILTIN_POWER_USERS: Sid = sid!("S-1-5-32-547");
/// BUILTIN\Account Operators (S-1-5-32-548)
pub const BUILTIN_ACCOUNT_OPERATORS: Sid = sid!("S-1-5-32-548");
/// BUILTIN\Server Operators (S-1-5-32-549)
pub const BUILTIN_SERVER_OPERATORS: Sid = sid!("S-1-5-32-549");
/// BUILTIN\Print Operators (S-1-5-32-550)
pub const BUILTIN_PRINT_OPERATORS: Sid = sid!("S-1-5-32-550");
/// BUILTIN\Backup Operators (S-1-5-32-551)
pub const BUILTIN_BACKUP_OPERATORS: Sid = sid!("S-1-5-32-551");
/// BUILTIN\Replicator (S-1-5-32-552)
pub const BUILTIN_REPLICATOR: Sid = sid!("S-1-5-32-552");
/// BUILTIN\Pre-Windows 2000 Compatible Access (S-1-5-32-554)
pub const BUILTIN_PRE_WINDOWS_2000: Sid = sid!("S-1-5-32-554");
/// BUILTIN\Remote Desktop Users (S-1-5-32-555)
pub const BUILTIN_REMOTE_DESKTOP_USERS: Sid = sid!("S-1-5-32-555");
/// BUILTIN\Network Configuration Operators (S-1-5-32-556)
pub const BUILTIN_NETWORK_CONFIGURATION_OPERATORS: Sid = sid!("S-1-5-32-556");
/// BUILTIN\Performance Monitor Users (S-1-5-32-558)
pub const BUILTIN_PERFORMANCE_MONITOR_USERS: Sid = sid!("S-1-5-32-558");
/// BUILTIN\Performance Log Users (S-1-5-32-559)
pub const BUILTIN_PERFORMANCE_LOG_USERS: Sid = sid!("S-1-5-32-559");
/// BUILTIN\IIS_IUSRS (S-1-5-32-568)
pub const BUILTIN_IIS_USERS: Sid = sid!("S-1-5-32-568");
/// BUILTIN\Cryptographic Operators (S-1-5-32-569)
pub const BUILTIN_CRYPTO_OPERATORS: Sid = sid!("S-1-5-32-569");
/// BUILTIN\Event Log Readers (S-1-5-32-573)
pub const BUILTIN_EVENT_LOG_READERS: Sid = sid!("S-1-5-32-573");
/// BUILTIN\Certificate Service DCOM Access (S-1-5-32-574)
pub const BUILTIN_CERTSVC_DCOM_ACCESS: Sid = sid!("S-1-5-32-574");
/// BUILTIN\RDS Remote Access Servers (S-1-5-32-575)
pub const BUILTIN_RDS_REMOTE_ACCESS_SERVERS: Sid = sid!("S-1-5-32-575");
/// BUILTIN\RDS Endpoint Servers (S-1-5-32-576)
pub const BUILTIN_RDS_ENDPOINT_SERVERS: Sid = sid!("S-1-5-32-576");
/// BUILTIN\Hyper-V Administrators (S-1-5-32-578)
pub const BUILTIN_HYPER_V_ADMINS: Sid = sid!("S-1-5-32-578");
/// BUILTIN\Access Control Assistance Operators (S-1-5-32-579)
pub const BUILTIN_ACCESS_CONTROL_ASSISTANCE_OPERATORS: Sid = sid!("S-1-5-32-579");
/// BUILTIN\Remote Management Users (S-1-5-32-580)
pub const BUILTIN_REMOTE_MANAGEMENT_USERS: Sid = sid!("S-1-5-32-580");

// ---- App packages, mandatory labels, authentication ----

/// ALL APPLICATION PACKAGES (S-1-15-2-1)
pub const ALL_APP_PACKAGES: Sid = sid!("S-1-15-2-1");
/// Untrusted integrity level (S-1-16-0)
pub const UNTRUSTED_MANDATORY_LEVEL: Sid = sid!("S-1-16-0");
/// Low integrity level (S-1-16-4096)
pub const LOW_MANDATORY_LEVEL: Sid = sid!("S-1-16-4096");
/// Medium integrity level (S-1-16-8192)
pub const MEDIUM_MANDATORY_LEVEL: Sid = sid!("S-1-16-8192");
/// Medium-plus integrity level (S-1-16-8448)
pub const MEDIUM_PLUS_MANDATORY_LEVEL: Sid = sid!("S-1-16-8448");
/// High integrity level (S-1-16-12288)
pub const HIGH_MANDATORY_LEVEL: Sid = sid!("S-1-16-12288");
/// System integrity level (S-1-16-16384)
pub const SYSTEM_MANDATORY_LEVEL: Sid = sid!("S-1-16-16384");
/// Protected-process integrity level (S-1-16-20480)
pub const PROTECTED_PROCESS_MANDATORY_LEVEL: Sid = sid!("S-1-16-20480");
/// Authentication authority asserted identity (S-1-18-1)
pub const AUTHENTICATION_AUTHORITY_ASSERTED: Sid = sid!("S-1-18-1");
/// Service asserted identity (S-1-18-2)
pub const SERVICE_ASSERTED: Sid = sid!("S-1-18-2");

// ---- Domain-relative RIDs ----

/// RID of the built-in Administrator account.
pub const DOMAIN_ADMINISTRATOR_RID: u32 = 500;
/// RID of the built-in Guest account.
pub const DOMAIN_GUEST_RID: u32 = 501;
/// RID of the Domain Admins group.
pub const DOMAIN_ADMINS_RID: u32 = 512;
/// RID of the Domain Users group.
pub const DOMAIN_USERS_RID: u32 = 513;

/// What an SDDL alias stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasTarget {
    /// A fixed SID.
    Fixed(Sid),
    /// A RID appended to the caller's domain SID.
    DomainRelative(u32),
}

/// SDDL two-letter SID aliases.
pub static SDDL_ALIASES: &[(&str, AliasTarget)] = &[
    ("AA", AliasTarget::Fixed(BUILTIN_ACCESS_CONTROL_ASSISTANCE_OPERATORS)),
    ("AC", AliasTarget::Fixed(ALL_APP_PACKAGES)),
    ("AN", AliasTarget::Fixed(ANONYMOUS)),
    ("AO", AliasTarget::Fixed(BUILTIN_ACCOUNT_OPERATORS)),
    ("AP", AliasTarget::DomainRelative(525)),
    ("AS", AliasTarget::Fixed(AUTHENTICATION_AUTHORITY_ASSERTED)),
    ("AU", AliasTarget::Fixed(AUTHENTICATED_USERS)),
    ("BA", AliasTarget::Fixed(BUILTIN_ADMINISTRATORS)),
    ("BG", AliasTarget::Fixed(BUILTIN_GUESTS)),
    ("BO", AliasTarget::Fixed(BUILTIN_BACKUP_OPERATORS)),
    ("BU", AliasTarget::Fixed(BUILTIN_USERS)),
    ("CA", AliasTarget::DomainRelative(517)),
    ("CD", AliasTarget::Fixed(BUILTIN_CERTSVC_DCOM_ACCESS)),
    ("CG", AliasTarget::Fixed(CREATOR_GROUP)),
    ("CN", AliasTarget::DomainRelative(522)),
    ("CO", AliasTarget::Fixed(CREATOR_OWNER)),
    ("CY", AliasTarget::Fixed(BUILTIN_CRYPTO_OPERATORS)),
    ("DA", AliasTarget::DomainRelative(DOMAIN_ADMINS_RID)),
    ("DC", AliasTarget::DomainRelative(515)),
    ("DD", AliasTarget::DomainRelative(516)),
    ("DG", AliasTarget::DomainRelative(514)),
    ("DU", AliasTarget::DomainRelative(DOMAIN_USERS_RID)),
    ("EA", AliasTarget::DomainRelative(519)),
    ("ED", AliasTarget::Fixed(ENTERPRISE_DOMAIN_CONTROLLERS)),
    ("EK", AliasTarget::DomainRelative(527)),
    ("ER", AliasTarget::Fixed(BUILTIN_EVENT_LOG_READERS)),
    ("ES", AliasTarget::Fixed(BUILTIN_RDS_ENDPOINT_SERVERS)),
    ("HA", AliasTarget::Fixed(BUILTIN_HYPER_V_ADMINS)),
    ("HI", AliasTarget::Fixed(HIGH_MANDATORY_LEVEL)),
    ("IS", AliasTarget::Fixed(BUILTIN_IIS_USERS)),
    ("IU", AliasTarget::Fixed(INTERACTIVE)),
    ("KA", AliasTarget::DomainRelative(526)),
    ("LA", AliasTarget::DomainRelative(DOMAIN_ADMINISTRATOR_RID)),
    ("LG", AliasTarget::DomainRelative(DOMAIN_GUEST_RID)),
    ("LS", AliasTarget::Fixed(LOCAL_SERVICE)),
    ("LU", AliasTarget::Fixed(BUILTIN_PERFORMANCE_LOG_USERS)),
    ("LW", AliasTarget::Fixed(LOW_MANDATORY_LEVEL)),
    ("ME", AliasTarget::Fixed(MEDIUM_MANDATORY_LEVEL)),
    ("MP", AliasTarget::Fixed(MEDIUM_PLUS_MANDATORY_LEVEL)),
    ("MU", AliasTarget::Fixed(BUILTIN_PERFORMANCE_MONITOR_USERS)),
    ("NO", AliasTarget::Fixed(BUILTIN_NETWORK_CONFIGURATION_OPERATORS)),
    ("NS", AliasTarget::Fixed(NETWORK_SERVICE)),
    ("NU", AliasTarget::Fixed(NETWORK)),
    ("OW", AliasTarget::Fixed(OWNER_RIGHTS)),
    ("PA", AliasTarget::DomainRelative(520)),
    ("PO", AliasTarget::Fixed(BUILTIN_PRINT_OPERATORS)),
    ("PS", AliasTarget::Fixed(PRINCIPAL_SELF)),
    ("PU", AliasTarget::Fixed(BUILTIN_POWER_USERS)),
    ("RA", AliasTarget::Fixed(BUILTIN_RDS_REMOTE_ACCESS_SERVERS)),
    ("RC", AliasTarget::Fixed(RESTRICTED_CODE)),
    ("RD", AliasTarget::Fixed(BUILTIN_REMOTE_DESKTOP_USERS)),
    ("RE", AliasTarget::Fixed(BUILTIN_REPLICATOR)),
    ("RM", AliasTarget::Fixed(BUILTIN_REMOTE_MANAGEMENT_USERS)),
    ("RO", AliasTarget::DomainRelative(498)),
    ("RS", AliasTarget::DomainRelative(553)),
    ("RU", AliasTarget::Fixed(BUILTIN_PRE_WINDOWS_2000)),
    ("SA", AliasTarget::DomainRelative(518)),
    ("SI", AliasTarget::Fixed(SYSTEM_MANDATORY_LEVEL)),
    ("SO", AliasTarget::Fixed(BUILTIN_SERVER_OPERATORS)),
    ("SS", AliasTarget::Fixed(SERVICE_ASSERTED)),
    ("SU", AliasTarget::Fixed(SERVICE)),
    ("SY", AliasTarget::Fixed(LOCAL_SYSTEM)),
    ("UD", AliasTarget::Fixed(USER_MODE_DRIVERS)),
    ("WD", AliasTarget::Fixed(WORLD)),
    ("WR", AliasTarget::Fixed(WRITE_RESTRICTED_CODE)),
];

/// Resolves a two-letter SDDL alias.
///
/// Domain-relative aliases need `domain`; without it they resolve to `None`.
///
/// ```rust
/// # use win_security_descriptor::well_known::{self, alias_to_sid};
/// assert_eq!(alias_to_sid("SY", None), Some(well_known::LOCAL_SYSTEM));
/// let domain = "S-1-5-21-1-2-3".parse().unwrap();
/// assert_eq!(alias_to_sid("DA", Some(&domain)).unwrap().to_string(), "S-1-5-21-1-2-3-512");
/// assert_eq!(alias_to_sid("DA", None), None);
/// ```
#[inline]
#[must_use]
pub fn alias_to_sid(alias: &str, domain: Option<&Sid>) -> Option<Sid> {
    let (_, target) = SDDL_ALIASES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(alias))?;
    match *target {
        AliasTarget::Fixed(sid) => Some(sid),
        AliasTarget::DomainRelative(rid) => {
            let sid = domain.and_then(|domain| domain.with_rid(rid));
            if sid.is_none() {
                log::warn!("SDDL alias {alias} needs a domain SID");
            }
            sid
        }
    }
}

/// The SDDL alias of `sid`, if any.
///
/// Domain-relative aliases are only produced when `sid` belongs to `domain`.
#[inline]
#[must_use]
pub fn sid_to_alias(sid: &Sid, domain: Option<&Sid>) -> Option<&'static str> {
    SDDL_ALIASES
        .iter()
        .find(|(_, target)| match *target {
            AliasTarget::Fixed(fixed) => fixed == *sid,
            AliasTarget::DomainRelative(rid) => domain
                .and_then(|domain| domain.with_rid(rid))
                .is_some_and(|candidate| candidate == *sid),
        })
        .map(|(alias, _)| *alias)
}

/// Account naming for a well-known SID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnownName {
    /// The SID.
    pub sid: Sid,
    /// Authority part of the account name (may be empty).
    pub domain: &'static str,
    /// Account name.
    pub name: &'static str,
    /// Account kind.
    pub sid_type: SidType,
}

const fn named(sid: Sid, domain: &'static str, name: &'static str, sid_type: SidType) -> WellKnownName {
    WellKnownName {
        sid,
        domain,
        name,
        sid_type,
    }
}

/// Display names of well-known principals, as reported by an English Windows install.
pub static WELL_KNOWN_NAMES: &[WellKnownName] = &[
    named(NULL, "", "NULL SID", SidType::WellKnownGroup),
    named(WORLD, "", "Everyone", SidType::WellKnownGroup),
    named(LOCAL, "", "LOCAL", SidType::WellKnownGroup),
    named(CONSOLE_LOGON, "", "CONSOLE LOGON", SidType::WellKnownGroup),
    named(CREATOR_OWNER, "", "CREATOR OWNER", SidType::WellKnownGroup),
    named(CREATOR_GROUP, "", "CREATOR GROUP", SidType::WellKnownGroup),
    named(CREATOR_OWNER_SERVER, "", "CREATOR OWNER SERVER", SidType::WellKnownGroup),
    named(CREATOR_GROUP_SERVER, "", "CREATOR GROUP SERVER", SidType::WellKnownGroup),
    named(OWNER_RIGHTS, "", "OWNER RIGHTS", SidType::WellKnownGroup),
    named(NETWORK, "NT AUTHORITY", "NETWORK", SidType::WellKnownGroup),
    named(BATCH, "NT AUTHORITY", "BATCH", SidType::WellKnownGroup),
    named(INTERACTIVE, "NT AUTHORITY", "INTERACTIVE", SidType::WellKnownGroup),
    named(SERVICE, "NT AUTHORITY", "SERVICE", SidType::WellKnownGroup),
    named(ANONYMOUS, "NT AUTHORITY", "ANONYMOUS LOGON", SidType::WellKnownGroup),
    named(
        ENTERPRISE_DOMAIN_CONTROLLERS,
        "NT AUTHORITY",
        "ENTERPRISE DOMAIN CONTROLLERS",
        SidType::WellKnownGroup,
    ),
    named(PRINCIPAL_SELF, "NT AUTHORITY", "SELF", SidType::WellKnownGroup),
    named(AUTHENTICATED_USERS, "NT AUTHORITY", "Authenticated Users", SidType::WellKnownGroup),
    named(RESTRICTED_CODE, "NT AUTHORITY", "RESTRICTED", SidType::WellKnownGroup),
    named(TERMINAL_SERVER_USER, "NT AUTHORITY", "TERMINAL SERVER USER", SidType::WellKnownGroup),
    named(THIS_ORGANIZATION, "NT AUTHORITY", "This Organization", SidType::WellKnownGroup),
    named(LOCAL_SYSTEM, "NT AUTHORITY", "SYSTEM", SidType::WellKnownGroup),
    named(LOCAL_SERVICE, "NT AUTHORITY", "LOCAL SERVICE", SidType::WellKnownGroup),
    named(NETWORK_SERVICE, "NT AUTHORITY", "NETWORK SERVICE", SidType::WellKnownGroup),
    named(WRITE_RESTRICTED_CODE, "NT AUTHORITY", "WRITE RESTRICTED", SidType::WellKnownGroup),
    named(USER_MODE_DRIVERS, "NT AUTHORITY", "USER MODE DRIVERS", SidType::WellKnownGroup),
    named(TRUSTED_INSTALLER, "NT SERVICE", "TrustedInstaller", SidType::WellKnownGroup),
    named(BUILTIN, "BUILTIN", "", SidType::Domain),
    named(BUILTIN_ADMINISTRATORS, "BUILTIN", "Administrators", SidType::Alias),
    named(BUILTIN_USERS, "BUILTIN", "Users", SidType::Alias),
    named(BUILTIN_GUESTS, "BUILTIN", "Guests", SidType::Alias),
    named(BUILTIN_POWER_USERS, "BUILTIN", "Power Users", SidType::Alias),
    named(BUILTIN_ACCOUNT_OPERATORS, "BUILTIN", "Account Operators", SidType::Alias),
    named(BUILTIN_SERVER_OPERATORS, "BUILTIN", "Server Operators", SidType::Alias),
    named(BUILTIN_PRINT_OPERATORS, "BUILTIN", "Print Operators", SidType::Alias),
    named(BUILTIN_BACKUP_OPERATORS, "BUILTIN", "Backup Operators", SidType::Alias),
    named(BUILTIN_REPLICATOR, "BUILTIN", "Replicator", SidType::Alias),
    named(
        BUILTIN_PRE_WINDOWS_2000,
        "BUILTIN",
        "Pre-Windows 2000 Compatible Access",
        SidType::Alias,
    ),
    named(BUILTIN_REMOTE_DESKTOP_USERS, "BUILTIN", "Remote Desktop Users", SidType::Alias),
    named(
        BUILTIN_NETWORK_CONFIGURATION_OPERATORS,
        "BUILTIN",
        "Network Configuration Operators",
        SidType::Alias,
    ),
    named(
        BUILTIN_PERFORMANCE_MONITOR_USERS,
        "BUILTIN",
        "Performance Monitor Users",
        SidType::Alias,
    ),
    named(BUILTIN_PERFORMANCE_LOG_USERS, "BUILTIN", "Performance Log Users", SidType::Alias),
    named(BUILTIN_IIS_USERS, "BUILTIN", "IIS_IUSRS", SidType::Alias),
    named(BUILTIN_CRYPTO_OPERATORS, "BUILTIN", "Cryptographic Operators", SidType::Alias),
    named(BUILTIN_EVENT_LOG_READERS, "BUILTIN", "Event Log Readers", SidType::Alias),
    named(
        BUILTIN_CERTSVC_DCOM_ACCESS,
        "BUILTIN",
        "Certificate Service DCOM Access",
        SidType::Alias,
    ),
    named(
        BUILTIN_RDS_REMOTE_ACCESS_SERVERS,
        "BUILTIN",
        "RDS Remote Access Servers",
        SidType::Alias,
    ),
    named(BUILTIN_RDS_ENDPOINT_SERVERS, "BUILTIN", "RDS Endpoint Servers", SidType::Alias),
    named(BUILTIN_HYPER_V_ADMINS, "BUILTIN", "Hyper-V Administrators", SidType::Alias),
    named(
        BUILTIN_ACCESS_CONTROL_ASSISTANCE_OPERATORS,
        "BUILTIN",
        "Access Control Assistance Operators",
        SidType::Alias,
    ),
    named(
        BUILTIN_REMOTE_MANAGEMENT_USERS,
        "BUILTIN",
        "Remote Management Users",
        SidType::Alias,
    ),
    named(
        ALL_APP_PACKAGES,
        "APPLICATION PACKAGE AUTHORITY",
        "ALL APPLICATION PACKAGES",
        SidType::WellKnownGroup,
    ),
    named(
        UNTRUSTED_MANDATORY_LEVEL,
        "Mandatory Label",
        "Untrusted Mandatory Level",
        SidType::Label,
    ),
    named(LOW_MANDATORY_LEVEL, "Mandatory Label", "Low Mandatory Level", SidType::Label),
    named(MEDIUM_MANDATORY_LEVEL, "Mandatory Label", "Medium Mandatory Level", SidType::Label),
    named(
        MEDIUM_PLUS_MANDATORY_LEVEL,
        "Mandatory Label",
        "Medium Plus Mandatory Level",
        SidType::Label,
    ),
    named(HIGH_MANDATORY_LEVEL, "Mandatory Label", "High Mandatory Level", SidType::Label),
    named(SYSTEM_MANDATORY_LEVEL, "Mandatory Label", "System Mandatory Level", SidType::Label),
    named(
        PROTECTED_PROCESS_MANDATORY_LEVEL,
        "Mandatory Label",
        "Protected Process Mandatory Level",
        SidType::Label,
    ),
    named(
        AUTHENTICATION_AUTHORITY_ASSERTED,
        "",
        "Authentication authority asserted identity",
        SidType::WellKnownGroup,
    ),
    named(SERVICE_ASSERTED, "", "Service asserted identity", SidType::WellKnownGroup),
];

/// Looks up the display name of a well-known SID.
#[inline]
#[must_use]
pub fn well_known_name(sid: &Sid) -> Option<&'static WellKnownName> {
    WELL_KNOWN_NAMES.iter().find(|entry| entry.sid == *sid)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
mod test {
    use super::*;

    #[test]
    fn constants_match_their_string_form() {
        assert_eq!(LOCAL_SYSTEM.to_string(), "S-1-5-18");
        assert_eq!(BUILTIN_ADMINISTRATORS.to_string(), "S-1-5-32-544");
        assert_eq!(USER_MODE_DRIVERS.sub_authority_count(), 6);
        assert_eq!(
            TRUSTED_INSTALLER,
            "S-1-5-80-956008885-3418522649-1831038044-1853292631-2271478464"
                .parse()
                .unwrap()
        );
    }

    #[test]
    fn aliases_are_unique_and_sorted() {
        assert!(
            SDDL_ALIASES.windows(2).all(|pair| pair[0].0 < pair[1].0),
            "alias table must stay sorted without duplicates"
        );
    }

    #[test]
    fn every_fixed_alias_round_trips() {
        for (alias, target) in SDDL_ALIASES {
            if let AliasTarget::Fixed(sid) = target {
                assert_eq!(sid_to_alias(sid, None), Some(*alias), "alias {alias}");
                assert_eq!(alias_to_sid(alias, None), Some(*sid), "alias {alias}");
            }
        }
    }

    #[test]
    fn domain_relative_aliases() {
        let domain: Sid = "S-1-5-21-1004336348-1177238915-682003330".parse().unwrap();
        let admin = alias_to_sid("LA", Some(&domain)).unwrap();
        assert_eq!(admin.rid(), Some(500));
        assert_eq!(sid_to_alias(&admin, Some(&domain)), Some("LA"));
        assert_eq!(sid_to_alias(&admin, None), None);
        let other: Sid = "S-1-5-21-9-9-9".parse().unwrap();
        assert_eq!(sid_to_alias(&admin, Some(&other)), None);
    }

    #[test]
    fn names() {
        let entry = well_known_name(&LOCAL_SYSTEM).unwrap();
        assert_eq!((entry.domain, entry.name), ("NT AUTHORITY", "SYSTEM"));
        assert!(well_known_name(&"S-1-5-21-1-2-3-1000".parse().unwrap()).is_none());
    }
}
