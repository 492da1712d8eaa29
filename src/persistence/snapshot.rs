use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::humidity::{HumidityDefaults, HumidityStore, StoreRecord};
use crate::world::HostWorld;

/// Extension of every store snapshot file.
const SNAPSHOT_EXTENSION: &str = ".hum";

/// A saved humidity store together with the world and step it was taken at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub world: String,
    pub tick_count: u64,
    pub record: StoreRecord,
}

/// A snapshot file found on disk, described by its name alone.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    pub path: PathBuf,
    pub world: String,
    pub tick_count: u64,
    /// Milliseconds since the Unix epoch.
    pub saved_at: u64,
    pub size_bytes: u64,
}

/// Errors that can occur during snapshot operations.
#[derive(Debug)]
pub enum SnapshotError {
    Io(io::Error),
    Serialize(String),
    Deserialize(String),
    Corrupt(PathBuf, String),
    /// The world is a client-side view; its humidity is owned elsewhere.
    NotAuthoritative(String),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "I/O error: {}", e),
            SnapshotError::Serialize(e) => write!(f, "Serialization error: {}", e),
            SnapshotError::Deserialize(e) => write!(f, "Deserialization error: {}", e),
            SnapshotError::Corrupt(path, reason) => {
                write!(f, "Corrupt snapshot {}: {}", path.display(), reason)
            }
            SnapshotError::NotAuthoritative(world) => {
                write!(
                    f,
                    "World '{}' is not authoritative; humidity data is only available on the server",
                    world
                )
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        SnapshotError::Io(e)
    }
}

/// Percent-encode a world name so it is safe in a file name and contains no `.`.
///
/// The encoding is reversible, so two worlds never share a file prefix.
fn encode_world(world: &str) -> String {
    let mut encoded = String::with_capacity(world.len());
    for byte in world.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

fn decode_world(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

/// `{world}.t{tick}.{saved_at}.hum`, with the world percent-encoded.
fn snapshot_file_name(world: &str, tick_count: u64, saved_at: u64) -> String {
    format!(
        "{}.t{}.{}{}",
        encode_world(world),
        tick_count,
        saved_at,
        SNAPSHOT_EXTENSION
    )
}

/// Inverse of [`snapshot_file_name`]: `(world, tick_count, saved_at)`.
fn parse_snapshot_file_name(name: &str) -> Option<(String, u64, u64)> {
    let stem = name.strip_suffix(SNAPSHOT_EXTENSION)?;
    let mut parts = stem.rsplitn(3, '.');
    let saved_at = parts.next()?.parse().ok()?;
    let tick_count = parts.next()?.strip_prefix('t')?.parse().ok()?;
    let world = decode_world(parts.next()?)?;
    Some((world, tick_count, saved_at))
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Write `bytes` next to `target` under a hidden name, then rename into place.
fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    let target = dir.join(file_name);
    let partial = dir.join(format!(".{}.partial", file_name));
    let result = fs::write(&partial, bytes).and_then(|()| fs::rename(&partial, &target));
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result.map(|()| target)
}

/// Save a store snapshot into `snapshot_dir`, creating the directory when needed.
///
/// An existing snapshot is never replaced by a partial write.
pub fn save_snapshot(snapshot: &StoreSnapshot, snapshot_dir: &Path) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(snapshot_dir)?;

    let encoded =
        bincode::serialize(snapshot).map_err(|e| SnapshotError::Serialize(e.to_string()))?;
    let file_name = snapshot_file_name(&snapshot.world, snapshot.tick_count, unix_millis_now());
    let path = write_atomically(snapshot_dir, &file_name, &encoded)?;

    debug!(path = %path.display(), bytes = encoded.len(), "Wrote store snapshot");
    Ok(path)
}

/// Load a store snapshot from a file.
///
/// Rejects records with duplicate regions or zero statue counts.
pub fn load_snapshot(path: &Path) -> Result<StoreSnapshot, SnapshotError> {
    let data = fs::read(path)?;
    let snapshot: StoreSnapshot =
        bincode::deserialize(&data).map_err(|e| SnapshotError::Deserialize(e.to_string()))?;

    // Validation only; the defaults do not matter here.
    let defaults = HumidityDefaults {
        base_percent: 0.0,
        threshold: 0,
        use_downfall: false,
    };
    HumidityStore::from_record(&snapshot.record, defaults)
        .map_err(|reason| SnapshotError::Corrupt(path.to_path_buf(), reason))?;

    Ok(snapshot)
}

/// Every snapshot file in `snapshot_dir` across all worlds, newest first.
///
/// Files whose names do not parse are not snapshots and are left out. A missing directory
/// holds no snapshots.
pub fn list_snapshots(snapshot_dir: &Path) -> Result<Vec<SnapshotFile>, SnapshotError> {
    let entries = match fs::read_dir(snapshot_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let Some((world, tick_count, saved_at)) = parse_snapshot_file_name(&name) else {
            continue;
        };
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        files.push(SnapshotFile {
            path: entry.path(),
            world,
            tick_count,
            saved_at,
            size_bytes: metadata.len(),
        });
    }

    files.sort_by(|a, b| {
        b.saved_at
            .cmp(&a.saved_at)
            .then(b.tick_count.cmp(&a.tick_count))
    });
    Ok(files)
}

/// Snapshot files of one world, newest first.
pub fn world_snapshots(snapshot_dir: &Path, world: &str) -> Result<Vec<SnapshotFile>, SnapshotError> {
    let mut files = list_snapshots(snapshot_dir)?;
    files.retain(|file| file.world == world);
    Ok(files)
}

/// Delete all but the `keep` newest snapshots of `world`. Other worlds' files are untouched.
///
/// Returns the deleted paths.
pub fn prune_snapshots(
    snapshot_dir: &Path,
    world: &str,
    keep: usize,
) -> Result<Vec<PathBuf>, SnapshotError> {
    let files = world_snapshots(snapshot_dir, world)?;
    let mut deleted = Vec::new();
    for file in files.into_iter().skip(keep) {
        fs::remove_file(&file.path)?;
        debug!(path = %file.path.display(), world, "Pruned store snapshot");
        deleted.push(file.path);
    }
    Ok(deleted)
}

/// The newest readable snapshot of `world`, or `None` when it has none.
///
/// Unreadable or corrupt files are skipped in favor of older ones of the same world.
pub fn latest_snapshot(snapshot_dir: &Path, world: &str) -> Result<Option<StoreSnapshot>, SnapshotError> {
    for file in world_snapshots(snapshot_dir, world)? {
        match load_snapshot(&file.path) {
            Ok(snapshot) if snapshot.world == world => return Ok(Some(snapshot)),
            Ok(snapshot) => {
                warn!(
                    path = %file.path.display(),
                    recorded = %snapshot.world,
                    "Snapshot name and contents disagree on the world, skipping"
                );
            }
            Err(e) => {
                warn!(
                    path = %file.path.display(),
                    error = %e,
                    "Unreadable snapshot, trying an older one"
                );
            }
        }
    }
    Ok(None)
}

/// Open the humidity store for a world: its newest readable snapshot, or an empty store when
/// there is none. Fails for non-authoritative worlds.
///
/// Returns the store and the step count it was saved at.
pub fn load_store<W: HostWorld + ?Sized>(
    world: &W,
    snapshot_dir: &Path,
    defaults: HumidityDefaults,
) -> Result<(HumidityStore, u64), SnapshotError> {
    if !world.is_authoritative() {
        return Err(SnapshotError::NotAuthoritative(world.name().to_string()));
    }

    let Some(snapshot) = latest_snapshot(snapshot_dir, world.name())? else {
        debug!(world = %world.name(), "No snapshot of this world, starting empty");
        return Ok((HumidityStore::new(defaults), 0));
    };

    let store = HumidityStore::from_record(&snapshot.record, defaults)
        .map_err(|reason| SnapshotError::Corrupt(snapshot_dir.to_path_buf(), reason))?;
    info!(
        world = %snapshot.world,
        tick = snapshot.tick_count,
        regions = snapshot.record.humidity.len(),
        "Loaded humidity store"
    );
    Ok((store, snapshot.tick_count))
}
