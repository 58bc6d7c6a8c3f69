mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::*;
use crate::repository::{RoadmapRepository, VersionedRoadmap};

/// Raised by [`Database::save_roadmap`] when the stored roadmap moved past the
/// version the caller loaded. Reload, reapply the change and save again.
#[derive(Debug, thiserror::Error)]
#[error("Roadmap {roadmap_id} was modified concurrently (expected version {expected_version})")]
pub struct VersionConflict {
    pub roadmap_id: Uuid,
    pub expected_version: u64,
}

/// Listing row for a stored roadmap, read without loading the aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapSummary {
    pub id: Uuid,
    pub key: u32,
    pub name: String,
    pub visibility: Visibility,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Roadmap queries
    // ============================================================

    pub fn list_roadmaps(&self) -> Result<Vec<RoadmapSummary>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, key, name, visibility, version, updated_at
             FROM roadmaps ORDER BY key",
        )?;

        let roadmaps = stmt
            .query_map([], summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(roadmaps)
    }

    /// Roadmaps the employee can change, ordered by key.
    pub fn list_managed_roadmaps(&self, employee_id: Uuid) -> Result<Vec<RoadmapSummary>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT r.id, r.key, r.name, r.visibility, r.version, r.updated_at
             FROM roadmaps r
             JOIN roadmap_managers m ON m.roadmap_id = r.id
             WHERE m.manager_id = ?
             ORDER BY r.key",
        )?;

        let roadmaps = stmt
            .query_map([employee_id.to_string()], summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(roadmaps)
    }

    pub fn get_roadmap(&self, id: Uuid) -> Result<Option<VersionedRoadmap>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT document, version FROM roadmaps WHERE id = ?")?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(versioned_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_roadmap_by_key(&self, key: u32) -> Result<Option<VersionedRoadmap>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT document, version FROM roadmaps WHERE key = ?")?;

        let mut rows = stmt.query([i64::from(key)])?;
        if let Some(row) = rows.next()? {
            Ok(Some(versioned_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn next_roadmap_key(&self) -> Result<u32> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let key: i64 = conn.query_row(
            "SELECT COALESCE(MAX(key), 0) + 1 FROM roadmaps",
            [],
            |row| row.get(0),
        )?;
        u32::try_from(key).context("Roadmap keys exhausted")
    }

    // ============================================================
    // Roadmap writes
    // ============================================================

    /// Store the whole aggregate in one transaction and return its new version.
    ///
    /// With `expected_version = None` the roadmap is inserted at version 1.
    /// Otherwise the write only succeeds if the stored version still equals
    /// `expected_version`; a mismatch fails with [`VersionConflict`].
    pub fn save_roadmap(&self, roadmap: &Roadmap, expected_version: Option<u64>) -> Result<u64> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let document = serde_json::to_string(roadmap)?;

        let version = match expected_version {
            None => {
                tx.execute(
                    "INSERT INTO roadmaps (id, key, name, visibility, version, document, created_at, updated_at)
                     VALUES (?, ?, ?, ?, 1, ?, ?, ?)",
                    (
                        roadmap.id().to_string(),
                        i64::from(roadmap.key()),
                        roadmap.name(),
                        roadmap.visibility().as_str(),
                        &document,
                        &now,
                        &now,
                    ),
                )
                .with_context(|| format!("Failed to insert roadmap {}", roadmap.key()))?;
                1
            }
            Some(expected) => {
                let expected_column =
                    i64::try_from(expected).context("Roadmap version out of range")?;
                let rows = tx.execute(
                    "UPDATE roadmaps SET name = ?, visibility = ?, version = version + 1, document = ?, updated_at = ?
                     WHERE id = ? AND version = ?",
                    (
                        roadmap.name(),
                        roadmap.visibility().as_str(),
                        &document,
                        &now,
                        roadmap.id().to_string(),
                        expected_column,
                    ),
                )?;
                if rows == 0 {
                    tracing::warn!(
                        "Rejected stale save of roadmap {} at version {}",
                        roadmap.id(),
                        expected
                    );
                    return Err(VersionConflict {
                        roadmap_id: roadmap.id(),
                        expected_version: expected,
                    }
                    .into());
                }
                expected + 1
            }
        };

        tx.execute(
            "DELETE FROM roadmap_managers WHERE roadmap_id = ?",
            [roadmap.id().to_string()],
        )?;
        for manager in roadmap.managers() {
            tx.execute(
                "INSERT INTO roadmap_managers (roadmap_id, manager_id) VALUES (?, ?)",
                (roadmap.id().to_string(), manager.manager_id.to_string()),
            )?;
        }

        tx.commit()?;
        tracing::info!("Saved roadmap {} at version {}", roadmap.key(), version);
        Ok(version)
    }

    pub fn delete_roadmap(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "DELETE FROM roadmap_managers WHERE roadmap_id = ?",
            [id.to_string()],
        )?;
        let rows = conn.execute("DELETE FROM roadmaps WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }
}

impl RoadmapRepository for Database {
    type Error = anyhow::Error;

    fn load(&self, id: Uuid) -> Result<Option<VersionedRoadmap>> {
        self.get_roadmap(id)
    }

    fn save(&self, roadmap: &Roadmap, expected_version: Option<u64>) -> Result<u64> {
        self.save_roadmap(roadmap, expected_version)
    }

    fn next_key(&self) -> Result<u32> {
        self.next_roadmap_key()
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// `<data dir>/roadmaps.db` for the current user.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "roadmaps")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("roadmaps.db"))
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoadmapSummary> {
    Ok(RoadmapSummary {
        id: parse_uuid(row.get::<_, String>(0)?),
        key: column_int(row, 1)?,
        name: row.get(2)?,
        visibility: Visibility::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(Visibility::Private),
        version: column_int(row, 4)?,
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn versioned_from_row(row: &rusqlite::Row<'_>) -> Result<VersionedRoadmap> {
    let document: String = row.get(0)?;
    let roadmap: Roadmap =
        serde_json::from_str(&document).context("Failed to parse stored roadmap")?;
    Ok(VersionedRoadmap {
        roadmap,
        version: column_int(row, 1)?,
    })
}

/// Read an INTEGER column into a narrower or unsigned type, failing on values
/// that do not fit instead of truncating them.
fn column_int<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: TryFrom<i64>,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    let value: i64 = row.get(idx)?;
    T::try_from(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Integer, Box::new(e))
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
