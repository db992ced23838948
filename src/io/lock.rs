//! Lock file management for single-instance enforcement.
//!
//! One kenban process drives a screen. The lock file in the runtime directory holds
//! the owner's PID so a lock left behind by a crashed process can be told apart
//! from a live one.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::utils;

/// Path of the lock file: `$XDG_RUNTIME_DIR/kenban.lock`, or `/tmp` without one.
pub fn lock_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("kenban.lock")
}

/// A held instance lock. Dropping it releases the lock and removes the file.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Acquire the instance lock at [`lock_path`].
pub fn acquire_lock() -> Result<InstanceLock> {
    acquire_lock_at(&lock_path())
}

/// Acquire an exclusive lock on `path`, replacing a stale one.
///
/// Fails when another live kenban process holds the lock.
pub fn acquire_lock_at(path: &Path) -> Result<InstanceLock> {
    if let Ok(lock) = try_lock(path) {
        return Ok(lock);
    }

    // Locked, or unreadable: a stale holder is cleaned up and we retry once
    handle_lock_conflict(path)?;
    try_lock(path).with_context(|| {
        format!(
            "Failed to acquire lock after cleanup attempt: {}",
            utils::private_path(path)
        )
    })
}

fn try_lock(path: &Path) -> Result<InstanceLock> {
    // Open without truncating so a live holder's PID survives a failed attempt
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", utils::private_path(path)))?;

    file.try_lock_exclusive()
        .with_context(|| format!("Lock file {} is held", utils::private_path(path)))?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(&file, "{}", std::process::id())?;
    file.flush()?;

    Ok(InstanceLock {
        file,
        path: path.to_path_buf(),
    })
}

/// Remove the lock file if its owner is gone; fail if it is still running.
fn handle_lock_conflict(path: &Path) -> Result<()> {
    let Some(pid) = read_lock_pid(path) else {
        log_warning!("Lock file contains invalid PID, removing stale lock");
        let _ = std::fs::remove_file(path);
        return Ok(());
    };

    if !utils::is_process_running(pid) {
        log_warning!("Removing stale lock file (process {pid} no longer running)");
        let _ = std::fs::remove_file(path);
        return Ok(());
    }

    anyhow::bail!("kenban is already running (PID: {pid})")
}

fn read_lock_pid(path: &Path) -> Option<u32> {
    let content = std::fs::read_to_string(path).ok()?;
    content.lines().next()?.trim().parse().ok()
}

/// PID of a live kenban process holding the lock, if any.
pub fn running_instance_pid() -> Option<u32> {
    let pid = read_lock_pid(&lock_path())?;
    (pid != std::process::id() && utils::is_process_running(pid)).then_some(pid)
}
