use std::{
    fs,
    io::{self, Write},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use tempfile::NamedTempFile;
use tracing::warn;

use crate::{Error, domain::Config};

/// How often a file operation is attempted when it fails with a transient
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    /// Total attempts, including the first. Treated as at least one.
    pub attempts: u32,
    /// Delay before the first retry. Doubles on each further retry.
    pub backoff: Duration,
}

impl Retry {
    /// A single attempt.
    pub const NONE: Self = Self {
        attempts: 1,
        backoff: Duration::ZERO,
    };
}

impl Default for Retry {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for Retry {
    fn from(config: &Config) -> Self {
        Self {
            attempts: config.max_io_attempts(),
            backoff: config.retry_backoff(),
        }
    }
}

/// A flag for abandoning a load.
///
/// Clones share the flag. A load checks it after reading the file and after
/// parsing it, and stops with [`Error::Cancelled`] if it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(super) fn check(token: Option<&Self>) -> Result<(), Error> {
        if token.is_some_and(Self::is_cancelled) {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Errors another process may clear by releasing the file.
fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ResourceBusy
    )
}

/// Runs `operation` until it succeeds, fails with a permanent error, or
/// runs out of attempts.
pub(super) fn retry<T>(
    path: &Path,
    policy: Retry,
    mut operation: impl FnMut() -> io::Result<T>,
) -> Result<T, Error> {
    let attempts = policy.attempts.max(1);
    let mut delay = policy.backoff;
    let mut attempt = 1;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(source) if is_transient(&source) && attempt < attempts => {
                warn!(
                    path = %path.display(),
                    attempt,
                    error = %source,
                    "transient I/O error, retrying"
                );
                thread::sleep(delay);
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    attempts: attempt,
                    source,
                });
            }
        }
    }
}

pub(super) fn read(path: &Path, policy: Retry) -> Result<Vec<u8>, Error> {
    retry(path, policy, || fs::read(path))
}

/// Replaces the file at `path` with `bytes`.
///
/// The bytes are written to a temporary file in the same directory, which is
/// then renamed over the destination, so readers see either the old file or
/// the new one.
pub(super) fn write_atomic(path: &Path, bytes: &[u8], policy: Retry) -> Result<(), Error> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    retry(path, policy, || {
        let mut file = NamedTempFile::new_in(directory)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|error| error.error)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn transient_errors_are_retried_up_to_the_limit() {
        let calls = Cell::new(0);
        let policy = Retry {
            attempts: 3,
            backoff: Duration::ZERO,
        };
        let result: Result<(), Error> = retry(Path::new("locked.reqif"), policy, || {
            calls.set(calls.get() + 1);
            Err(io::Error::from(io::ErrorKind::WouldBlock))
        });

        assert_eq!(calls.get(), 3);
        let Err(Error::Io { attempts, .. }) = result else {
            panic!("expected an I/O error");
        };
        assert_eq!(attempts, 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), Error> = retry(Path::new("missing.reqif"), Retry::default(), || {
            calls.set(calls.get() + 1);
            Err(io::Error::from(io::ErrorKind::NotFound))
        });

        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(Error::Io { attempts: 1, .. })));
    }

    #[test]
    fn a_retry_can_succeed() {
        let calls = Cell::new(0);
        let value = retry(Path::new("busy.reqif"), Retry::default(), || {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Err(io::Error::from(io::ErrorKind::Interrupted))
            } else {
                Ok(42)
            }
        })
        .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn atomic_write_replaces_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.reqif");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new", Retry::NONE).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(CancelToken::check(Some(&token)).is_ok());
        clone.cancel();
        assert!(matches!(CancelToken::check(Some(&token)), Err(Error::Cancelled)));
        assert!(CancelToken::check(None).is_ok());
    }
}
