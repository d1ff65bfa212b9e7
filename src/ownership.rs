//! Symbolic user/group name resolution for file ownership changes (§4.C).
//!
//! The local file stream's ownership mutator accepts either a symbolic
//! username/group name or a numeric id encoded as decimal text; a name with
//! no matching passwd/group entry is taken literally as the numeric id, per
//! spec. Resolution goes through `getpwnam`/`getgrnam` so it honors NSS
//! (LDAP, etc.), not just `/etc/passwd`.

use crate::error::{Error, Result};

/// Resolve a symbolic user name or decimal uid string to a numeric uid.
#[cfg(unix)]
pub fn resolve_uid(name: &str) -> Result<u32> {
    if let Ok(id) = name.parse::<u32>() {
        return Ok(id);
    }
    resolve_via_getpwnam(name)
}

/// Resolve a symbolic group name or decimal gid string to a numeric gid.
#[cfg(unix)]
pub fn resolve_gid(name: &str) -> Result<u32> {
    if let Ok(id) = name.parse::<u32>() {
        return Ok(id);
    }
    resolve_via_getgrnam(name)
}

#[cfg(unix)]
fn resolve_via_getpwnam(name: &str) -> Result<u32> {
    use std::ffi::CString;
    let cname = CString::new(name).map_err(|_| Error::range("user name contains a NUL byte"))?;
    // SAFETY: `cname` stays alive for the duration of the call; getpwnam
    // returns a pointer into thread-local/static storage we only read from.
    let passwd = unsafe { libc::getpwnam(cname.as_ptr()) };
    if passwd.is_null() {
        return Err(Error::range(format!("no such user: {name}")));
    }
    // SAFETY: passwd is non-null and was just returned by getpwnam.
    Ok(unsafe { (*passwd).pw_uid })
}

#[cfg(unix)]
fn resolve_via_getgrnam(name: &str) -> Result<u32> {
    use std::ffi::CString;
    let cname = CString::new(name).map_err(|_| Error::range("group name contains a NUL byte"))?;
    // SAFETY: `cname` stays alive for the duration of the call; getgrnam
    // returns a pointer into thread-local/static storage we only read from.
    let group = unsafe { libc::getgrnam(cname.as_ptr()) };
    if group.is_null() {
        return Err(Error::range(format!("no such group: {name}")));
    }
    // SAFETY: group is non-null and was just returned by getgrnam.
    Ok(unsafe { (*group).gr_gid })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_uid_is_taken_literally() {
        assert_eq!(resolve_uid("1000").unwrap(), 1000);
    }

    #[test]
    fn numeric_gid_is_taken_literally() {
        assert_eq!(resolve_gid("1000").unwrap(), 1000);
    }

    #[test]
    fn root_user_resolves() {
        assert_eq!(resolve_uid("root").unwrap(), 0);
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert!(resolve_uid("no-such-user-surely-zzz").is_err());
    }
}
