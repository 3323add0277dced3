use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::core::errors::{PoolError, Result};

const PREFIX: &str = "backup_";
const EXTENSION: &str = "db";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_LEN: usize = 15;

/// A backup file found in the backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub file_name: String,
    pub path: PathBuf,
    pub created: NaiveDateTime,
    pub size: u64,
    pub has_checksum: bool,
}

/// Compute the SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Check `data` against a sidecar in `sha256sum` format:
/// `<hex_hash>  <file_name>`.
pub fn verify_sha256(data: &[u8], file_name: &str, sidecar: &str) -> Result<()> {
    let computed = sha256_hex(data);

    let expected = sidecar
        .lines()
        .find_map(|line| {
            let mut parts = line.splitn(2, "  ");
            let hash = parts.next()?.trim();
            let name = parts.next()?.trim();
            (name == file_name).then(|| hash.to_string())
        })
        .ok_or_else(|| PoolError::Backup {
            detail: format!("checksum file does not list '{file_name}'"),
        })?;

    if computed != expected {
        return Err(PoolError::Backup {
            detail: format!(
                "SHA-256 mismatch for {file_name}\n\n  \
                 File hash:     {computed}\n  \
                 Expected hash: {expected}\n\n  \
                 The backup may be corrupted. Pick another one with 'poolboard backup list'."
            ),
        });
    }
    Ok(())
}

fn sidecar_path(backup: &Path) -> PathBuf {
    let mut name = backup.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

fn parse_stamp(file_name: &str) -> Option<NaiveDateTime> {
    let rest = file_name.strip_prefix(PREFIX)?;
    let stem = rest.strip_suffix(&format!(".{EXTENSION}"))?;
    let stamp = stem.get(..STAMP_LEN)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}

/// Timestamped database copies with checksum sidecars.
pub struct BackupManager {
    dir: PathBuf,
    retention_days: u32,
}

impl BackupManager {
    pub fn new(dir: PathBuf, retention_days: u32) -> Self {
        Self {
            dir,
            retention_days,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `database` into the backup directory and write its checksum.
    pub fn create(&self, database: &Path, now: NaiveDateTime) -> Result<BackupInfo> {
        if !database.is_file() {
            return Err(PoolError::Backup {
                detail: format!("database not found at {}", database.display()),
            });
        }
        fs::create_dir_all(&self.dir)?;

        let stamp = now.format(STAMP_FORMAT).to_string();
        let mut file_name = format!("{PREFIX}{stamp}.{EXTENSION}");
        let mut suffix = 2;
        while self.dir.join(&file_name).exists() {
            file_name = format!("{PREFIX}{stamp}_{suffix}.{EXTENSION}");
            suffix += 1;
        }
        let path = self.dir.join(&file_name);

        let data = fs::read(database)?;
        fs::write(&path, &data)?;
        fs::write(
            sidecar_path(&path),
            format!("{}  {file_name}\n", sha256_hex(&data)),
        )?;
        info!(backup = %path.display(), bytes = data.len(), "backup created");

        Ok(BackupInfo {
            file_name,
            path,
            created: now,
            size: data.len() as u64,
            has_checksum: true,
        })
    }

    /// Backups in the directory, newest first. Unrelated files are ignored.
    pub fn list(&self) -> Result<Vec<BackupInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(created) = parse_stamp(&file_name) else {
                continue;
            };
            let path = entry.path();
            backups.push(BackupInfo {
                has_checksum: sidecar_path(&path).is_file(),
                size: entry.metadata()?.len(),
                file_name,
                path,
                created,
            });
        }
        backups.sort_by(|a, b| b.created.cmp(&a.created).then(b.file_name.cmp(&a.file_name)));
        Ok(backups)
    }

    /// Delete backups older than the retention window. A retention of zero
    /// keeps everything. Returns the removed file names.
    pub fn prune(&self, now: NaiveDateTime) -> Result<Vec<String>> {
        if self.retention_days == 0 {
            return Ok(Vec::new());
        }
        let cutoff = now - Duration::days(i64::from(self.retention_days));
        let mut removed = Vec::new();
        for backup in self.list()?.into_iter().filter(|b| b.created < cutoff) {
            fs::remove_file(&backup.path)?;
            let sidecar = sidecar_path(&backup.path);
            if sidecar.exists() {
                fs::remove_file(sidecar)?;
            }
            debug!(backup = %backup.file_name, "expired backup removed");
            removed.push(backup.file_name);
        }
        if !removed.is_empty() {
            info!(count = removed.len(), "old backups pruned");
        }
        Ok(removed)
    }

    /// Verify `file_name` against its checksum and copy it over `database`.
    ///
    /// The copy is written to a temporary file next to the database and
    /// renamed into place, so a failed restore leaves the database intact.
    pub fn restore(&self, file_name: &str, database: &Path) -> Result<()> {
        if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
            return Err(PoolError::Backup {
                detail: format!("'{file_name}' is not a backup file name"),
            });
        }
        let path = self.dir.join(file_name);
        if !path.is_file() {
            return Err(PoolError::Backup {
                detail: format!(
                    "backup '{file_name}' not found in {}\n\n  \
                     Run 'poolboard backup list' to see available backups.",
                    self.dir.display()
                ),
            });
        }

        let data = fs::read(&path)?;
        let sidecar = fs::read_to_string(sidecar_path(&path)).map_err(|_| PoolError::Backup {
            detail: format!("checksum file for '{file_name}' is missing; refusing to restore"),
        })?;
        verify_sha256(&data, file_name, &sidecar)?;

        let parent = database
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(&data)?;
        tmp.persist(database).map_err(|e| PoolError::Io(e.error))?;

        info!(backup = %file_name, database = %database.display(), "backup restored");
        Ok(())
    }
}
