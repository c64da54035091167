use crate::core::currency::CurrencyCode;
use crate::core::stock::StockLevels;
use crate::ledger::error::{LedgerError, Result};
use crate::ledger::lock::LockTable;
use crate::ledger::store::LedgerStore;
use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// On-disk record for one currency.
#[derive(Debug, Serialize, Deserialize)]
struct StockFile {
    currency: CurrencyCode,
    updated_at: DateTime<Utc>,
    stock: StockLevels,
}

/// Stock ledger kept as one JSON file per currency in a directory.
///
/// ```text
/// <dir>/EUR.json   {"currency":"EUR","updated_at":"…","stock":{"200":"1000000000",…}}
/// <dir>/EUR.lock   empty file carrying the advisory lock for EUR
/// ```
///
/// Exclusion combines a per-currency in-process lock with an exclusive
/// advisory lock (`flock` on Unix, `LockFileEx` on Windows) on the
/// currency's `.lock` file, so separate handles and separate processes
/// sharing the directory are serialised too. The lock file itself is never
/// removed; the OS drops the lock when the handle closes, including when
/// the holding process dies. Writes go to a fresh temporary file in the
/// same directory which is then renamed over the record, so a crash leaves
/// either the old or the new record.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    locks: LockTable,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: LockTable::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `currency`.
    pub fn record_path(&self, currency: &CurrencyCode) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(currency)))
    }

    fn lock_path(&self, currency: &CurrencyCode) -> PathBuf {
        self.dir.join(format!("{}.lock", file_stem(currency)))
    }
}

fn file_stem(currency: &CurrencyCode) -> String {
    currency
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

impl LedgerStore for JsonFileStore {
    fn read(&self, currency: &CurrencyCode) -> Result<Option<StockLevels>> {
        let path = self.record_path(currency);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LedgerError::Read {
                    currency: currency.clone(),
                    source,
                })
            }
        };
        let file: StockFile = serde_json::from_str(&json).map_err(|e| LedgerError::Corrupt {
            currency: currency.clone(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        if &file.currency != currency {
            return Err(LedgerError::Corrupt {
                currency: currency.clone(),
                reason: format!("{} holds stock for {}", path.display(), file.currency),
            });
        }
        Ok(Some(file.stock))
    }

    fn replace(&self, currency: &CurrencyCode, levels: &StockLevels) -> Result<()> {
        let record = StockFile {
            currency: currency.clone(),
            updated_at: Utc::now(),
            stock: levels.clone(),
        };
        write_atomically(&self.dir, &self.record_path(currency), &record).map_err(|source| {
            LedgerError::CommitFailed {
                currency: currency.clone(),
                source,
            }
        })
    }

    fn exclusive<T, F>(&self, currency: &CurrencyCode, timeout: Duration, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let deadline = Instant::now() + timeout;
        self.locks.with_lock(currency, timeout, || {
            with_file_lock(currency, &self.lock_path(currency), deadline, timeout, f)
        })
    }
}

fn write_atomically(dir: &Path, path: &Path, record: &StockFile) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, record)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Run `f` while holding the advisory lock on `path`, polling until
/// `deadline` while another handle holds it.
fn with_file_lock<T, F>(
    currency: &CurrencyCode,
    path: &Path,
    deadline: Instant,
    timeout: Duration,
    f: F,
) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let lock_error = |source: io::Error| LedgerError::Lock {
        currency: currency.clone(),
        path: path.to_path_buf(),
        source,
    };
    let file = open_lock_file(path).map_err(lock_error)?;
    let mut lock = RwLock::new(file);
    loop {
        match lock.try_write() {
            // Released when the guard drops, on every exit path of `f`.
            Ok(_guard) => return f(),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    log::warn!(
                        "{}: lock on {} still held after {:?}",
                        currency,
                        path.display(),
                        timeout
                    );
                    return Err(LedgerError::LockTimeout {
                        currency: currency.clone(),
                        waited: timeout,
                    });
                }
                thread::sleep(LOCK_POLL_INTERVAL);
            }
            Err(source) => return Err(lock_error(source)),
        }
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amount::Amount;
    use tempfile::TempDir;

    fn levels(pairs: &[(u64, u64)]) -> StockLevels {
        pairs
            .iter()
            .map(|&(d, n)| (Amount::from(d), Amount::from(n)))
            .collect()
    }

    #[test]
    fn test_missing_record_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.read(&CurrencyCode::new("EUR")).unwrap(), None);
    }

    #[test]
    fn test_replace_then_read() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let eur = CurrencyCode::new("EUR");
        let stock = levels(&[(200, 5), (1, 1_000_000_000)]);

        store.replace(&eur, &stock).unwrap();
        assert_eq!(store.read(&eur).unwrap(), Some(stock));

        let raw = fs::read_to_string(store.record_path(&eur)).unwrap();
        assert!(raw.contains("\"currency\": \"EUR\""));
        assert!(raw.contains("\"1\": \"1000000000\""));
        // No temporary files are left next to the record.
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_unparsable_record_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let eur = CurrencyCode::new("EUR");
        fs::write(store.record_path(&eur), "{ not json").unwrap();
        assert!(matches!(
            store.read(&eur).unwrap_err(),
            LedgerError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_negative_count_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let eur = CurrencyCode::new("EUR");
        fs::write(
            store.record_path(&eur),
            r#"{"currency":"EUR","updated_at":"2024-01-01T00:00:00Z","stock":{"100":"-3"}}"#,
        )
        .unwrap();
        assert!(matches!(
            store.read(&eur).unwrap_err(),
            LedgerError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_record_for_other_currency_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let usd = CurrencyCode::new("USD");
        store.replace(&usd, &levels(&[(1, 1)])).unwrap();
        fs::copy(store.record_path(&usd), store.record_path(&CurrencyCode::new("EUR"))).unwrap();
        let err = store.read(&CurrencyCode::new("EUR")).unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt { .. }));
    }

    #[test]
    fn test_lock_released_after_exclusive() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let other = JsonFileStore::open(dir.path()).unwrap();
        let eur = CurrencyCode::new("EUR");
        let lock_path = store.lock_path(&eur);

        store
            .exclusive(&eur, Duration::from_millis(100), || {
                assert!(lock_path.exists());
                Ok(())
            })
            .unwrap();
        // The file stays; only the lock on it is released.
        assert!(lock_path.exists());
        assert!(other.exclusive(&eur, Duration::from_millis(30), || Ok(())).is_ok());

        let _ = store.exclusive::<(), _>(&eur, Duration::from_millis(100), || {
            Err(LedgerError::Corrupt {
                currency: CurrencyCode::new("EUR"),
                reason: "boom".into(),
            })
        });
        assert!(other.exclusive(&eur, Duration::from_millis(30), || Ok(())).is_ok());
    }

    #[test]
    fn test_leftover_lock_file_does_not_block() {
        let dir = TempDir::new().unwrap();
        let eur = CurrencyCode::new("EUR");
        // What a killed holder leaves behind: the file, but no lock on it.
        fs::write(dir.path().join("EUR.lock"), "4242").unwrap();

        for _ in 0..3 {
            let store = JsonFileStore::open(dir.path()).unwrap();
            store
                .exclusive(&eur, Duration::from_millis(100), || {
                    store.replace(&eur, &levels(&[(1, 1)]))
                })
                .unwrap();
        }
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.read(&eur).unwrap(), Some(levels(&[(1, 1)])));
    }

    #[test]
    fn test_unopenable_lock_file_is_lock_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let eur = CurrencyCode::new("EUR");
        fs::create_dir(store.lock_path(&eur)).unwrap();

        let err = store
            .exclusive(&eur, Duration::from_millis(30), || Ok(()))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Lock { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_foreign_lock_file_times_out() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let eur = CurrencyCode::new("EUR");
        // Simulates a second process (or a second handle) holding the lock.
        let other = JsonFileStore::open(dir.path()).unwrap();

        other
            .exclusive(&eur, Duration::from_millis(100), || {
                let err = store
                    .exclusive(&eur, Duration::from_millis(30), || Ok(()))
                    .unwrap_err();
                assert!(matches!(err, LedgerError::LockTimeout { .. }));
                Ok(())
            })
            .unwrap();

        assert!(store.exclusive(&eur, Duration::from_millis(30), || Ok(())).is_ok());
    }

    #[test]
    fn test_file_stem_is_sanitised() {
        assert_eq!(file_stem(&CurrencyCode::new("../x")), "___X");
    }
}
