use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::predict::Coordinate;

pub const DEFAULT_TTL: Duration = Duration::hours(1);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Encode error: {0}")]
    Encode(#[from] bincode::Error),
}

/// Reference point and radius, quantised so equal queries share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    latitude_microdeg: i64,
    longitude_microdeg: i64,
    radius_m: i64,
}

impl CacheKey {
    pub fn new(reference: Coordinate, radius_km: f64) -> Self {
        Self {
            latitude_microdeg: (reference.latitude * 1e6).round() as i64,
            longitude_microdeg: (reference.longitude * 1e6).round() as i64,
            radius_m: (radius_km * 1e3).round() as i64,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}) within {:.3} km",
            self.latitude_microdeg as f64 / 1e6,
            self.longitude_microdeg as f64 / 1e6,
            self.radius_m as f64 / 1e3
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    timestamp: DateTime<Utc>,
    satellite_names: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheRecord {
    entries: BTreeMap<CacheKey, CacheEntry>,
}

/// File-backed, TTL-bounded memo of visible satellite names per key.
pub struct VisibilityCache {
    path: PathBuf,
    ttl: Duration,
    write_lock: Mutex<()>,
    slots: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl VisibilityCache {
    pub fn new(path: PathBuf, ttl: Duration) -> Self {
        Self {
            path,
            ttl,
            write_lock: Mutex::new(()),
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.timestamp < self.ttl
    }

    /// Stored names for `key` if saved less than one TTL before `now`.
    /// Any problem reading the file counts as a miss.
    pub fn load(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Vec<String>> {
        let mut record = self.read_record();
        let entry = record.entries.remove(key)?;
        if self.is_fresh(&entry, now) {
            Some(entry.satellite_names)
        } else {
            None
        }
    }

    /// Replace the entry for `key` and drop expired ones.
    pub fn save(
        &self,
        key: &CacheKey,
        names: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = self.read_record();
        record.entries.retain(|_, entry| self.is_fresh(entry, now));
        record.entries.insert(
            *key,
            CacheEntry {
                timestamp: now,
                satellite_names: names.to_vec(),
            },
        );

        let encoded = bincode::serialize(&record)?;
        let folder = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(folder)?;

        // Unique temp name: another process may be saving to the same file.
        let mut temp = NamedTempFile::new_in(folder)?;
        temp.write_all(&encoded)?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Run `f` while holding the lock for `key`; callers for the same key
    /// queue behind each other.
    pub fn coalesce<T>(&self, key: &CacheKey, f: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(*key).or_default().clone()
        };

        let result = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        drop(slot);
        if slots.get(key).is_some_and(|s| Arc::strong_count(s) == 1) {
            slots.remove(key);
        }
        result
    }

    fn read_record(&self) -> CacheRecord {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return CacheRecord::default(),
            Err(e) => {
                log::warn!("Failed to read cache {}: {}", self.path.display(), e);
                return CacheRecord::default();
            }
        };

        match bincode::deserialize(&bytes) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Ignoring corrupt cache {}: {}", self.path.display(), e);
                CacheRecord::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    const FUKUOKA: Coordinate = Coordinate {
        latitude: 33.5902,
        longitude: 130.4017,
    };

    fn saved_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 3, 8, 0, 0).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn cache(dir: &tempfile::TempDir) -> VisibilityCache {
        VisibilityCache::new(dir.path().join("visibility.bin"), DEFAULT_TTL)
    }

    #[test]
    fn round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let key = CacheKey::new(FUKUOKA, 1633.0);
        let stored = names(&["GPS BIII-6", "QZS-2", "BEIDOU-3 M1", "GALILEO 12"]);

        cache.save(&key, &stored, saved_at()).unwrap();
        assert_eq!(cache.load(&key, saved_at()), Some(stored));
    }

    #[test]
    fn ttl_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let key = CacheKey::new(FUKUOKA, 1633.0);
        cache.save(&key, &names(&["QZS-3"]), saved_at()).unwrap();

        let just_before = saved_at() + Duration::minutes(59) + Duration::seconds(59);
        assert!(cache.load(&key, just_before).is_some());

        let exactly = saved_at() + Duration::hours(1);
        assert!(cache.load(&key, exactly).is_none());

        let just_after = saved_at() + Duration::minutes(60) + Duration::seconds(1);
        assert!(cache.load(&key, just_after).is_none());
    }

    #[test]
    fn missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let key = CacheKey::new(FUKUOKA, 1633.0);
        assert!(cache(&dir).load(&key, saved_at()).is_none());
    }

    #[test]
    fn corrupt_file_is_a_miss_and_gets_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let key = CacheKey::new(FUKUOKA, 1633.0);
        fs::write(dir.path().join("visibility.bin"), b"\xff\xfe not a record").unwrap();

        assert!(cache.load(&key, saved_at()).is_none());

        cache.save(&key, &names(&["QZS-1R"]), saved_at()).unwrap();
        assert_eq!(cache.load(&key, saved_at()), Some(names(&["QZS-1R"])));
    }

    #[test]
    fn entries_are_keyed_by_reference_and_radius() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let fukuoka = CacheKey::new(FUKUOKA, 1633.0);
        let wider = CacheKey::new(FUKUOKA, 3000.0);
        let tokyo = CacheKey::new(Coordinate::new(35.6895, 139.6917), 1633.0);

        cache.save(&fukuoka, &names(&["A"]), saved_at()).unwrap();
        cache.save(&tokyo, &names(&["B"]), saved_at()).unwrap();

        assert_eq!(cache.load(&fukuoka, saved_at()), Some(names(&["A"])));
        assert_eq!(cache.load(&tokyo, saved_at()), Some(names(&["B"])));
        assert!(cache.load(&wider, saved_at()).is_none());
    }

    #[test]
    fn save_overwrites_and_prunes_expired() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let key = CacheKey::new(FUKUOKA, 1633.0);
        let other = CacheKey::new(Coordinate::new(0.0, 0.0), 1633.0);

        cache.save(&other, &names(&["OLD"]), saved_at()).unwrap();
        cache.save(&key, &names(&["FIRST"]), saved_at()).unwrap();

        let later = saved_at() + Duration::hours(2);
        cache.save(&key, &names(&["SECOND"]), later).unwrap();

        assert_eq!(cache.load(&key, later), Some(names(&["SECOND"])));
        assert!(cache.read_record().entries.get(&other).is_none());
    }

    #[test]
    fn coalesce_serialises_callers_for_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let key = CacheKey::new(FUKUOKA, 1633.0);
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    cache.coalesce(&key, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                });
            }
        });

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(cache.slots.lock().unwrap().is_empty());
    }

    #[test]
    fn independent_writers_never_leave_a_torn_record() {
        let dir = tempfile::tempdir().unwrap();
        let server = cache(&dir);
        let cli = cache(&dir);
        let fukuoka = CacheKey::new(FUKUOKA, 1633.0);
        let tokyo = CacheKey::new(Coordinate::new(35.6895, 139.6917), 1633.0);
        let many: Vec<String> = (0..5_000).map(|i| format!("SAT {i}")).collect();

        thread::scope(|scope| {
            for (writer, key) in [(&server, fukuoka), (&cli, tokyo)] {
                let many = &many;
                scope.spawn(move || {
                    for _ in 0..20 {
                        writer.save(&key, many, saved_at()).unwrap();
                    }
                });
            }
        });

        let record = server.read_record();
        assert!(!record.entries.is_empty());
        for entry in record.entries.values() {
            assert_eq!(entry.satellite_names, many);
        }

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|name| name != "visibility.bin")
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }
}
