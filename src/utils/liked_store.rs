//! Viewer-local record of which items this device has liked
//!
//! A cache of viewer intent used for the filled/outline heart. It is never
//! consulted for the shared like count.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CoreError, CoreResult};
use crate::utils::error_handling::safe_lock;

pub trait LikedStore: Send + Sync {
    /// Read failures count as "not liked"
    fn is_liked(&self, item_id: u64) -> bool;

    fn set_liked(&self, item_id: u64, liked: bool) -> CoreResult<()>;

    fn liked_ids(&self) -> Vec<u64>;
}

/// SQLite-backed liked flags, one row per liked item
pub struct LikedStickersDB {
    conn: Mutex<Connection>,
}

impl LikedStickersDB {
    /// Open (or create) the database file, creating parent directories as needed
    pub fn open(path: &Path) -> CoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoreError::Persistence(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        log::debug!("[LikedStore] Opening {}", path.display());
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> CoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> CoreResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS liked_items (
                item_id INTEGER PRIMARY KEY,
                liked_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> CoreResult<std::sync::MutexGuard<'_, Connection>> {
        safe_lock(&self.conn, "LikedStore")
            .ok_or_else(|| CoreError::Persistence("liked store lock unavailable".to_string()))
    }
}

impl LikedStore for LikedStickersDB {
    fn is_liked(&self, item_id: u64) -> bool {
        let lookup = self.conn().and_then(|conn| {
            conn.query_row(
                "SELECT 1 FROM liked_items WHERE item_id = ?1",
                params![item_id as i64],
                |_| Ok(()),
            )
            .optional()
            .map_err(CoreError::from)
        });

        match lookup {
            Ok(found) => found.is_some(),
            Err(e) => {
                log::warn!("[LikedStore] Failed to read flag for {}: {}", item_id, e);
                false
            }
        }
    }

    fn set_liked(&self, item_id: u64, liked: bool) -> CoreResult<()> {
        let conn = self.conn()?;
        if liked {
            conn.execute(
                "INSERT OR IGNORE INTO liked_items (item_id, liked_at) VALUES (?1, ?2)",
                params![item_id as i64, chrono::Utc::now().timestamp()],
            )?;
        } else {
            conn.execute(
                "DELETE FROM liked_items WHERE item_id = ?1",
                params![item_id as i64],
            )?;
        }
        Ok(())
    }

    fn liked_ids(&self) -> Vec<u64> {
        let result = self.conn().and_then(|conn| {
            let mut stmt = conn.prepare("SELECT item_id FROM liked_items ORDER BY item_id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids.into_iter().map(|id| id as u64).collect::<Vec<u64>>())
        });

        result.unwrap_or_else(|e| {
            log::warn!("[LikedStore] Failed to list liked items: {}", e);
            Vec::new()
        })
    }
}

/// Liked flags held in memory only
#[derive(Default)]
pub struct MemoryLikedStore {
    ids: Mutex<BTreeSet<u64>>,
}

impl MemoryLikedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LikedStore for MemoryLikedStore {
    fn is_liked(&self, item_id: u64) -> bool {
        safe_lock(&self.ids, "LikedStore")
            .map(|ids| ids.contains(&item_id))
            .unwrap_or(false)
    }

    fn set_liked(&self, item_id: u64, liked: bool) -> CoreResult<()> {
        let mut ids = safe_lock(&self.ids, "LikedStore")
            .ok_or_else(|| CoreError::Persistence("liked store lock unavailable".to_string()))?;
        if liked {
            ids.insert(item_id);
        } else {
            ids.remove(&item_id);
        }
        Ok(())
    }

    fn liked_ids(&self) -> Vec<u64> {
        safe_lock(&self.ids, "LikedStore")
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }
}
