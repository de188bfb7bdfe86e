//! Content-addressed disk cache for pairwise judgments.
//!
//! One JSON file per key under the cache directory. The cache is strictly an
//! optimization: read misses, corrupt files and write failures never surface
//! as errors. Writes go through a temp file + rename so a crash cannot leave
//! a half-written entry behind.

use crate::types::Judgment;
use agri_claims::AgriClaim;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persistent judgment cache keyed by the md5 of both claims' identity
/// strings. The pair is ordered; call sites pass (i, j) with i < j.
#[derive(Debug, Clone)]
pub struct JudgeCache {
    dir: PathBuf,
}

impl JudgeCache {
    /// Open (and create if needed) a cache directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            debug!(dir = %dir.display(), error = %e, "judge cache directory unavailable");
        }
        Self { dir }
    }

    /// Stable key over `(subject, predicate, object)` of both claims.
    /// Confidence and context deliberately do not participate.
    pub fn key(a: &AgriClaim, b: &AgriClaim) -> String {
        let material = format!(
            "{}|{}|{}|{}|{}|{}",
            a.subject,
            a.predicate,
            a.object.as_deref().unwrap_or(""),
            b.subject,
            b.predicate,
            b.object.as_deref().unwrap_or(""),
        );
        format!("{:x}", md5::compute(material.as_bytes()))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Best-effort read; any failure is a miss.
    pub fn get(&self, key: &str) -> Option<Judgment> {
        let path = self.entry_path(key);
        let payload = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&payload) {
            Ok(judgment) => Some(judgment),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "corrupt judge cache entry treated as miss");
                None
            }
        }
    }

    /// Best-effort atomic write; failures are logged and swallowed.
    pub fn put(&self, key: &str, judgment: &Judgment) {
        let payload = match serde_json::to_vec(judgment) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "judgment serialization failed, skipping cache write");
                return;
            }
        };

        let final_path = self.entry_path(key);
        let tmp_path = self.dir.join(format!("{key}.tmp"));
        if let Err(e) = write_atomic(&tmp_path, &final_path, &payload) {
            debug!(path = %final_path.display(), error = %e, "judge cache write failed");
        }
    }
}

fn write_atomic(tmp: &Path, dest: &Path, payload: &[u8]) -> std::io::Result<()> {
    fs::write(tmp, payload)?;
    fs::rename(tmp, dest)
}
