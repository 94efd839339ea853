use rusqlite::{Connection, OptionalExtension, Result as SqlResult};
use std::path::PathBuf;

use super::history::{HistoryEntry, HistoryRecord};

/// Maximum number of persisted history records; the oldest are dropped
pub const HISTORY_CAP: usize = 50;

/// Default model requested from the backend
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Default upstream API address forwarded to the backend
pub const DEFAULT_API_BASE_URL: &str = "https://newapi.aicohere.org/v1/chat/completions";

/// Default address of the collaborator /edit-image endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/edit-image";

const KEY_API_KEY: &str = "api_key";
const KEY_MODEL: &str = "model";
const KEY_API_BASE_URL: &str = "api_base_url";
const KEY_ENDPOINT: &str = "endpoint";

/// User settings, persisted on each successful submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub api_base_url: String,
    pub endpoint: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// The Store manages the SQLite database holding settings and the bounded
/// history list. History records carry stable autoincrement ids, so deleting
/// one never shifts the identity of another.
pub struct Store {
    conn: Connection,
    db_path: PathBuf,
}

impl Store {
    /// Create a Store at the default location and initialize the schema.
    ///
    /// The database file is created in the user's data directory:
    /// - Linux: ~/.local/share/retouch-studio/retouch_studio.db
    /// - macOS: ~/Library/Application Support/retouch-studio/retouch_studio.db
    /// - Windows: %APPDATA%\retouch-studio\retouch_studio.db
    pub fn new() -> SqlResult<Self> {
        Self::open(Self::default_db_path())
    }

    /// Open (or create) a Store at an explicit path
    pub fn open(db_path: PathBuf) -> SqlResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .expect("Failed to create application data directory");
        }

        let conn = Connection::open(&db_path)?;

        log::info!("📁 Database initialized at: {}", db_path.display());

        let mut store = Store { conn, db_path };
        store.init_schema()?;

        Ok(store)
    }

    /// Get the path where the database should be stored
    fn default_db_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .expect("Could not determine user data directory");

        path.push("retouch-studio");
        path.push("retouch_studio.db");
        path
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&mut self) -> SqlResult<()> {
        // Settings are a plain key-value table; each key falls back to a
        // hardcoded default when absent
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL
            )",
            [],
        )?;

        // History records, newest first by id
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at          INTEGER NOT NULL,
                prompt              TEXT NOT NULL,
                model               TEXT NOT NULL,
                processing_time_ms  INTEGER NOT NULL,
                output_dimensions   TEXT NOT NULL,
                image_url           TEXT NOT NULL,
                original_width      INTEGER,
                original_height     INTEGER
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_created_at
             ON history(created_at DESC)",
            [],
        )?;

        log::info!("✅ Database schema initialized");

        Ok(())
    }

    /// Load settings, substituting the default for each absent key
    pub fn settings(&self) -> SqlResult<Settings> {
        let defaults = Settings::default();
        Ok(Settings {
            api_key: self.setting(KEY_API_KEY)?.unwrap_or(defaults.api_key),
            model: self.setting(KEY_MODEL)?.unwrap_or(defaults.model),
            api_base_url: self
                .setting(KEY_API_BASE_URL)?
                .unwrap_or(defaults.api_base_url),
            endpoint: self.setting(KEY_ENDPOINT)?.unwrap_or(defaults.endpoint),
        })
    }

    /// Persist all settings
    pub fn save_settings(&self, settings: &Settings) -> SqlResult<()> {
        self.set_setting(KEY_API_KEY, &settings.api_key)?;
        self.set_setting(KEY_MODEL, &settings.model)?;
        self.set_setting(KEY_API_BASE_URL, &settings.api_base_url)?;
        self.set_setting(KEY_ENDPOINT, &settings.endpoint)?;
        Ok(())
    }

    fn setting(&self, key: &str) -> SqlResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
    }

    fn set_setting(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Get all history records, newest first
    pub fn history(&self) -> SqlResult<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, prompt, model, processing_time_ms,
                    output_dimensions, image_url, original_width, original_height
             FROM history ORDER BY id DESC",
        )?;

        let record_iter = stmt.query_map([], |row| {
            Ok(HistoryRecord {
                id: row.get(0)?,
                timestamp_ms: row.get(1)?,
                prompt: row.get(2)?,
                model: row.get(3)?,
                processing_time_ms: row.get(4)?,
                output_dimensions: row.get(5)?,
                image_url: row.get(6)?,
                original_width: row.get(7)?,
                original_height: row.get(8)?,
            })
        })?;

        let mut records = Vec::new();
        for record in record_iter {
            records.push(record?);
        }

        Ok(records)
    }

    /// Get a count of history records
    pub fn history_count(&self) -> SqlResult<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Append a history record and prune to the cap.
    /// Returns the new record's id.
    pub fn append_history(&self, entry: &HistoryEntry) -> SqlResult<i64> {
        self.conn.execute(
            "INSERT INTO history (created_at, prompt, model, processing_time_ms,
                                  output_dimensions, image_url, original_width, original_height)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                entry.timestamp_ms,
                entry.prompt,
                entry.model,
                entry.processing_time_ms,
                entry.output_dimensions,
                entry.image_url,
                entry.original_width,
                entry.original_height,
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        let pruned = self.conn.execute(
            "DELETE FROM history WHERE id NOT IN
                (SELECT id FROM history ORDER BY id DESC LIMIT ?1)",
            [HISTORY_CAP as i64],
        )?;
        if pruned > 0 {
            log::info!("🔄 Pruned {} history records past the cap", pruned);
        }

        Ok(id)
    }

    /// Delete a single history record by its stable id.
    /// Returns true when a record was actually removed.
    pub fn delete_history(&self, id: i64) -> SqlResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM history WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Delete all history records, returning how many were removed
    pub fn clear_history(&self) -> SqlResult<usize> {
        self.conn.execute("DELETE FROM history", [])
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = Store::open(dir.path().join("test.db")).expect("open store");
        (dir, store)
    }

    fn entry(prompt: &str) -> HistoryEntry {
        HistoryEntry {
            timestamp_ms: 1_700_000_000_000,
            prompt: prompt.to_string(),
            model: DEFAULT_MODEL.to_string(),
            processing_time_ms: 1234,
            output_dimensions: "2000 × 1500 像素".to_string(),
            image_url: "data:image/png;base64,AAAA".to_string(),
            original_width: Some(2000),
            original_height: Some(1500),
        }
    }

    #[test]
    fn test_settings_default_when_absent() {
        let (_dir, store) = temp_store();
        let settings = store.settings().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.api_key.is_empty());
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_settings_roundtrip() {
        let (_dir, store) = temp_store();
        let settings = Settings {
            api_key: "sk-test".to_string(),
            model: "custom-model".to_string(),
            api_base_url: "https://api.example/v1".to_string(),
            endpoint: "http://localhost:9999/edit-image".to_string(),
        };
        store.save_settings(&settings).unwrap();
        assert_eq!(store.settings().unwrap(), settings);

        // Saving again overwrites rather than duplicating
        store.save_settings(&settings).unwrap();
        assert_eq!(store.settings().unwrap(), settings);
    }

    #[test]
    fn test_history_appends_newest_first() {
        let (_dir, store) = temp_store();
        store.append_history(&entry("first")).unwrap();
        store.append_history(&entry("second")).unwrap();

        let records = store.history().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].prompt, "second");
        assert_eq!(records[1].prompt, "first");
        assert_eq!(records[0].output_dimensions, "2000 × 1500 像素");
    }

    #[test]
    fn test_history_cap_drops_oldest() {
        let (_dir, store) = temp_store();
        for i in 0..HISTORY_CAP + 5 {
            store.append_history(&entry(&format!("prompt {}", i))).unwrap();
        }

        let records = store.history().unwrap();
        assert_eq!(records.len(), HISTORY_CAP);
        // The newest survives, the first five are gone
        assert_eq!(records[0].prompt, format!("prompt {}", HISTORY_CAP + 4));
        assert_eq!(
            records.last().unwrap().prompt,
            "prompt 5".to_string()
        );
    }

    #[test]
    fn test_delete_by_id_removes_exactly_one() {
        let (_dir, store) = temp_store();
        store.append_history(&entry("a")).unwrap();
        let middle = store.append_history(&entry("b")).unwrap();
        store.append_history(&entry("c")).unwrap();

        assert!(store.delete_history(middle).unwrap());
        let records = store.history().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].prompt, "c");
        assert_eq!(records[1].prompt, "a");

        // Ids are stable: deleting again finds nothing
        assert!(!store.delete_history(middle).unwrap());
    }

    #[test]
    fn test_clear_history_empties_the_list() {
        let (_dir, store) = temp_store();
        store.append_history(&entry("a")).unwrap();
        store.append_history(&entry("b")).unwrap();

        assert_eq!(store.clear_history().unwrap(), 2);
        assert_eq!(store.history_count().unwrap(), 0);
        assert!(store.history().unwrap().is_empty());
    }
}
