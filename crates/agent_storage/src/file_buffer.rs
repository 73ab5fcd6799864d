use agent_domain::{DomainResult, TelemetrySample};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Marker suffix for buffer entries; anything else in the storage root
/// (temp files, `.DS_Store`, ...) is ignored by listings.
const FILE_MARKER: &str = "_data.json";

/// Append-only file-per-sample buffer between collection and
/// transmission.
///
/// Each entry is one JSON-serialized sample named by its creation time
/// in epoch milliseconds. Writes go to a temporary name first and are
/// renamed into place, so a reader observes an entry either whole or
/// not at all. A drain lists once, reads the listed entries in creation
/// order, deletes them, and returns the samples; entries appended after
/// the listing are left for the next drain.
pub struct FileBuffer {
    root: PathBuf,
}

impl FileBuffer {
    pub async fn open(root: impl Into<PathBuf>) -> DomainResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "durable buffer ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append one sample as a new buffer entry.
    pub async fn append(&self, sample: &TelemetrySample) -> DomainResult<()> {
        let body = serde_json::to_vec(sample)?;
        let name = self.next_entry_name().await?;
        let final_path = self.root.join(&name);
        let tmp_path = self.root.join(format!("{name}.tmp"));

        fs::write(&tmp_path, &body).await?;
        fs::rename(&tmp_path, &final_path).await?;

        debug!(entry = %name, "buffered sample");
        Ok(())
    }

    /// Atomically read and remove all entries present at call time,
    /// in creation order.
    pub async fn drain(&self) -> DomainResult<Vec<TelemetrySample>> {
        let entries = self.list_entries().await?;

        let mut samples = Vec::with_capacity(entries.len());
        for (_, path) in &entries {
            let body = fs::read(path).await?;
            samples.push(serde_json::from_slice(&body)?);
        }
        for (_, path) in &entries {
            fs::remove_file(path).await?;
        }

        if !samples.is_empty() {
            debug!(count = samples.len(), "drained buffer");
        }
        Ok(samples)
    }

    /// Number of pending entries; used by tests and diagnostics.
    pub async fn pending(&self) -> DomainResult<usize> {
        Ok(self.list_entries().await?.len())
    }

    /// Snapshot of buffer entries sorted by creation timestamp.
    async fn list_entries(&self) -> DomainResult<Vec<(u64, PathBuf)>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(stamp) = name.strip_suffix(FILE_MARKER) else {
                continue;
            };
            match stamp.parse::<u64>() {
                Ok(ts) => entries.push((ts, entry.path())),
                Err(_) => warn!(entry = %name, "ignoring entry with malformed timestamp"),
            }
        }
        entries.sort_by_key(|(ts, _)| *ts);
        Ok(entries)
    }

    /// Entry names carry a monotonically increasing timestamp; bump the
    /// millisecond until the name is free so sub-millisecond appends
    /// cannot collide.
    async fn next_entry_name(&self) -> DomainResult<String> {
        let mut ts = Utc::now().timestamp_millis().max(0) as u64;
        loop {
            let name = format!("{ts}{FILE_MARKER}");
            if !fs::try_exists(self.root.join(&name)).await? {
                return Ok(name);
            }
            ts += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_domain::ObdReading;
    use tempfile::tempdir;

    fn sample(speed: f64) -> TelemetrySample {
        TelemetrySample::new(
            "vin-001",
            "dev-001",
            ObdReading {
                fuel_rate: 1.0,
                vehicle_speed: speed,
                engine_speed: 1.0,
                relative_accel_pos: 1.0,
            },
        )
    }

    #[tokio::test]
    async fn test_append_then_drain_returns_samples_in_order() {
        let dir = tempdir().unwrap();
        let buffer = FileBuffer::open(dir.path()).await.unwrap();

        for speed in [1.0, 2.0, 3.0] {
            buffer.append(&sample(speed)).await.unwrap();
        }

        let drained = buffer.drain().await.unwrap();
        assert_eq!(drained.len(), 3);
        let speeds: Vec<f64> = drained.iter().map(|s| s.obd_data.vehicle_speed).collect();
        assert_eq!(speeds, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_drain_deletes_entries_exactly_once() {
        let dir = tempdir().unwrap();
        let buffer = FileBuffer::open(dir.path()).await.unwrap();

        buffer.append(&sample(1.0)).await.unwrap();
        assert_eq!(buffer.pending().await.unwrap(), 1);

        let first = buffer.drain().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(buffer.pending().await.unwrap(), 0);

        let second = buffer.drain().await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_entries_written_after_drain_survive_for_the_next_one() {
        let dir = tempdir().unwrap();
        let buffer = FileBuffer::open(dir.path()).await.unwrap();

        buffer.append(&sample(1.0)).await.unwrap();
        buffer.drain().await.unwrap();
        buffer.append(&sample(2.0)).await.unwrap();

        let drained = buffer.drain().await.unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].obd_data.vehicle_speed, 2.0);
    }

    #[tokio::test]
    async fn test_listing_ignores_foreign_files() {
        let dir = tempdir().unwrap();
        let buffer = FileBuffer::open(dir.path()).await.unwrap();

        tokio::fs::write(dir.path().join(".DS_Store"), b"junk")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("123_data.json.tmp"), b"partial")
            .await
            .unwrap();
        buffer.append(&sample(1.0)).await.unwrap();

        let drained = buffer.drain().await.unwrap();
        assert_eq!(drained.len(), 1);
        // Foreign files stay untouched
        assert!(dir.path().join(".DS_Store").exists());
    }

    #[tokio::test]
    async fn test_rapid_appends_never_collide() {
        let dir = tempdir().unwrap();
        let buffer = FileBuffer::open(dir.path()).await.unwrap();

        for speed in 0..10 {
            buffer.append(&sample(speed as f64)).await.unwrap();
        }

        let drained = buffer.drain().await.unwrap();
        assert_eq!(drained.len(), 10);
        let speeds: Vec<f64> = drained.iter().map(|s| s.obd_data.vehicle_speed).collect();
        assert_eq!(speeds, (0..10).map(|s| s as f64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_open_creates_missing_root() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested/data");
        let buffer = FileBuffer::open(&nested).await.unwrap();
        assert_eq!(buffer.pending().await.unwrap(), 0);
        assert!(nested.is_dir());
    }
}
