//! Session directory lock
//!
//! The WhatsApp client session on disk is an exclusive resource: exactly
//! one process per session directory. The lock file carries the owner's
//! pid and is removed on drop.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const LOCK_FILE: &str = "session.lock";

/// Exclusive hold on one session directory
#[derive(Debug)]
pub struct SessionLock {
    path: PathBuf,
}

impl SessionLock {
    /// Acquire the lock for `client_id` under `base_dir`, creating the
    /// session directory if needed. Fails when another process holds it.
    pub fn acquire(base_dir: &Path, client_id: &str) -> io::Result<Self> {
        let session_dir = base_dir.join(client_id);
        fs::create_dir_all(&session_dir)?;

        let path = session_dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!(
                            "session directory {} is held by another process",
                            session_dir.display()
                        ),
                    )
                } else {
                    e
                }
            })?;

        writeln!(file, "{}", std::process::id())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), %error, "failed to release session lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kargo-session-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_lock_is_exclusive() {
        let dir = scratch_dir("exclusive");

        let lock = SessionLock::acquire(&dir, "default").unwrap();
        let second = SessionLock::acquire(&dir, "default");
        assert!(second.is_err());

        drop(lock);
        let third = SessionLock::acquire(&dir, "default");
        assert!(third.is_ok());
    }

    #[test]
    fn test_distinct_clients_do_not_contend() {
        let dir = scratch_dir("distinct");

        let _first = SessionLock::acquire(&dir, "client-a").unwrap();
        let second = SessionLock::acquire(&dir, "client-b");
        assert!(second.is_ok());
    }
}
