//! Session token value and its on-disk residence.
//!
//! The session file holds the raw token bytes with no trailing newline,
//! mode 0600. A missing or empty file means "unauthenticated". Reads
//! return the content unmodified, except that one trailing line ending
//! (left by a hand edit) is dropped. Writes
//! replace the whole file through a rename so a reader never observes a
//! partially written token.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

/// Opaque authentication credential issued by the secret store.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Read the cached token, if there is a usable one.
///
/// Returns `Ok(None)` when the file is absent or empty.
pub fn read_token(path: &Path) -> io::Result<Option<SessionToken>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => Zeroizing::new(raw),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let token = raw.strip_suffix('\n').unwrap_or(raw.as_str());
    let token = token.strip_suffix('\r').unwrap_or(token);
    if token.is_empty() {
        return Ok(None);
    }
    Ok(Some(SessionToken::new(token)))
}

/// Persist `token` to `path` with owner-only permissions, replacing any
/// previous content.
pub fn write_token(path: &Path, token: &SessionToken) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
            }
        }
    }

    let tmp = staging_path(path);
    let mut oo = OpenOptions::new();
    oo.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        oo.mode(0o600);
    }
    {
        let mut file = oo.open(&tmp)?;
        // `mode` only applies on creation; a leftover staging file keeps
        // whatever it had.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(token.as_str().as_bytes())?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Delete the session file. Returns whether a file was removed; absence
/// is not an error.
pub fn remove_token(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "session".into());
    name.push(".tmp");
    path.with_file_name(name)
}
