// Windows-only integration test resolving the current user through the account cache
#![cfg(windows)]
#![allow(clippy::expect_used, reason = "Expect is not an issue in tests")]
#![allow(clippy::unwrap_used, reason = "Unwrap is not an issue in tests")]

use serde::Deserialize;
use std::process::{Command, Stdio};
use win_security_descriptor::sid_cache::{AccountSidResolver, SidNameCache, SidNameSource};
use win_security_descriptor::{DomainAndName, Sid, SidType};

const PS_SCRIPT: &str = "$id = [System.Security.Principal.WindowsIdentity]::GetCurrent(); \
    @{ sid = $id.User.Value; account = $id.Name } | ConvertTo-Json -Compress";

#[derive(Debug, Deserialize)]
struct PsUser {
    sid: Sid,
    account: DomainAndName,
}

fn run_powershell(args: &[&str]) -> std::io::Result<std::process::Output> {
    Command::new("pwsh")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .or_else(|_| {
            Command::new("powershell")
                .args(args)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output()
        })
}

#[test]
fn current_user_resolves_through_the_cache() {
    let args = &[
        "-NoLogo",
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-Command",
        PS_SCRIPT,
    ];
    let out = run_powershell(args).expect("Failed to launch PowerShell");
    assert!(
        out.status.success(),
        "PowerShell failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let user: PsUser = serde_json::from_slice(out.stdout.as_slice()).expect("Invalid JSON from PowerShell");

    let cache = SidNameCache::new();
    let resolver = AccountSidResolver::new();
    let name = cache.lookup(&user.sid, &resolver, false).expect("current user must resolve");

    assert_eq!(name.source, SidNameSource::Account);
    assert_eq!(name.sid_type, Some(SidType::User), "current user must be a user account");
    assert!(
        name.account.to_string().eq_ignore_ascii_case(&user.account.to_string()),
        "{} does not match {}",
        name.account,
        user.account
    );
    assert_eq!(cache.get(&user.sid), Some(name), "resolved name must be cached");
}
