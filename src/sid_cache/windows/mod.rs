mod error;

use core::num::NonZeroU32;
use core::ptr::{null, null_mut};

use log::debug;
use num_enum::TryFromPrimitive;
use smallvec::{SmallVec, smallvec};
use widestring::U16CString;
use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::Security::LookupAccountSidW;

pub use error::LookupError;

use super::{SidName, SidNameResolver, SidNameSource};
use crate::{DomainAndName, Sid, SidType};

type WideBuffer = SmallVec<[u16; 256]>;

/// Resolves account names with `LookupAccountSidW`.
#[derive(Debug, Clone, Default)]
pub struct AccountSidResolver {
    machine_name: Option<U16CString>,
}

impl AccountSidResolver {
    /// Looks SIDs up on the local machine.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { machine_name: None }
    }

    /// Looks SIDs up on a remote machine.
    #[inline]
    #[must_use]
    pub const fn remote(machine_name: U16CString) -> Self {
        Self {
            machine_name: Some(machine_name),
        }
    }

    /// Looks `sid` up.
    /// # Errors
    /// Returns the Win32 failure of `LookupAccountSidW`, [`LookupError::NoneMapped`]
    /// for a SID without an account.
    #[inline]
    pub fn lookup(&self, sid: &Sid) -> Result<SidName, LookupError> {
        let mut raw_sid = sid.to_bytes();
        let mut name_len = 0u32;
        let mut domain_len = 0u32;
        let mut sid_type_raw = 0i32;
        // Sizing call; fails with ERROR_INSUFFICIENT_BUFFER when the SID is mapped.
        match self.call(&mut raw_sid, None, &mut name_len, None, &mut domain_len, &mut sid_type_raw) {
            Ok(()) | Err(LookupError::InsufficientBuffer) => {}
            Err(err) => return Err(err),
        }
        loop {
            let mut name: WideBuffer = smallvec![0; name_len as usize];
            let mut domain: WideBuffer = smallvec![0; domain_len as usize];
            match self.call(
                &mut raw_sid,
                Some(&mut name),
                &mut name_len,
                Some(&mut domain),
                &mut domain_len,
                &mut sid_type_raw,
            ) {
                Ok(()) => {
                    name.truncate(name_len as usize);
                    domain.truncate(domain_len as usize);
                    let account =
                        DomainAndName::new(String::from_utf16_lossy(&domain), String::from_utf16_lossy(&name));
                    let sid_type = SidType::try_from_primitive(sid_type_raw).ok();
                    return Ok(SidName::new(account, SidNameSource::Account, sid_type));
                }
                Err(LookupError::InsufficientBuffer) => {}
                Err(err) => return Err(err),
            }
        }
    }

    fn call(
        &self,
        raw_sid: &mut [u8],
        name: Option<&mut WideBuffer>,
        name_len: &mut u32,
        domain: Option<&mut WideBuffer>,
        domain_len: &mut u32,
        sid_type_raw: &mut i32,
    ) -> Result<(), LookupError> {
        let machine_name = self.machine_name.as_ref().map_or(null(), |s| s.as_ptr());
        // Safety: the SID buffer holds a valid self-contained SID, and each output buffer holds at least
        // as many elements as its length argument announces.
        let result = unsafe {
            LookupAccountSidW(
                machine_name,
                raw_sid.as_mut_ptr().cast(),
                name.map_or(null_mut(), |b| b.as_mut_ptr()),
                name_len,
                domain.map_or(null_mut(), |b| b.as_mut_ptr()),
                domain_len,
                sid_type_raw,
            )
        };
        if result != 0 {
            return Ok(());
        }
        // Safety: `GetLastError` is always safe to call.
        let code = unsafe { GetLastError() };
        Err(NonZeroU32::new(code).map_or(LookupError::Other(0), LookupError::from))
    }
}

impl SidNameResolver for AccountSidResolver {
    #[inline]
    fn resolve(&self, sid: &Sid) -> Option<SidName> {
        self.lookup(sid)
            .inspect_err(|err| debug!("account lookup of {sid} failed: {err}"))
            .ok()
    }
}
