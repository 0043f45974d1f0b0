//! Advisory vault lock files
//!
//! A `<vault>.lock` file guards against cross-process races (in-process
//! synchronization is the vault's own mutex). Live locks are tracked in a
//! process-global registry so an application-installed exit hook can
//! release them on abrupt shutdown; nothing here installs hooks on its own.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::SdkError;

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(200);

fn registry() -> &'static Mutex<HashSet<PathBuf>> {
    static REGISTRY: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Remove every lock file this process is still holding.
///
/// Safe to call at any time; locks released here are also forgotten by
/// their guards.
pub fn release_all_locks() {
    let paths: Vec<PathBuf> = registry().lock().drain().collect();
    for path in paths {
        let _ = std::fs::remove_file(&path);
    }
}

/// Install a process-wide panic hook that releases all vault locks before
/// delegating to the previous hook. Idempotent; call it once from
/// application setup. Orderly shutdown does not need it: dropping (or
/// closing) a vault releases its lock.
pub fn install_exit_handler() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            release_all_locks();
            previous(info);
        }));
    });
}

/// A held advisory lock; removing the file on drop.
#[derive(Debug)]
pub struct VaultLock {
    lock_path: PathBuf,
    released: bool,
}

impl VaultLock {
    /// Acquire the lock for a vault path, waiting up to `timeout` in 200 ms
    /// steps while another process holds it.
    pub async fn acquire(vault_path: &Path, timeout: Duration) -> Result<Self, SdkError> {
        let lock_path = lock_path_for(vault_path);
        let started = Instant::now();

        loop {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let _ = write!(file, "{}", std::process::id());
                    registry().lock().insert(lock_path.clone());
                    return Ok(Self {
                        lock_path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if started.elapsed() >= timeout {
                        return Err(SdkError::Vault(format!(
                            "vault is locked by another process ({})",
                            lock_path.display()
                        )));
                    }
                    tokio::time::sleep(LOCK_RETRY_INTERVAL).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Release the lock early.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            registry().lock().remove(&self.lock_path);
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock_path_for(vault_path: &Path) -> PathBuf {
    let mut name = vault_path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    vault_path.with_file_name(name)
}
