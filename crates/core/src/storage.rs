//! Host-mirrored key-value storage.
//!
//! The page keeps backup records in its local storage; the host mirrors
//! those writes here so background sync can read them without a page.

use crate::Error;
use crate::cache::CacheDb;
use serde_json::Value;
use tokio_rusqlite::{params, rusqlite};

impl CacheDb {
    /// Read a value. Returns None if the key was never set or was removed.
    pub async fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                match conn.query_row("SELECT value FROM local_storage WHERE key = ?1", params![key], |row| row.get(0)) {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a value.
    pub async fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO local_storage (key, value, updated_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, value, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a value. Returns false if nothing was stored under `key`.
    pub async fn remove_item(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Read a JSON array of records. A missing key reads as an empty list.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the stored value is not a JSON array.
    pub async fn get_records(&self, key: &str) -> Result<Vec<Value>, Error> {
        let Some(raw) = self.get_item(key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(records)) => Ok(records),
            Ok(other) => Err(Error::Storage(format!("{key}: expected a JSON array, found {}", kind(&other)))),
            Err(e) => Err(Error::Storage(format!("{key}: {e}"))),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_item("k").await.unwrap().is_none());

        db.set_item("k", "v1").await.unwrap();
        db.set_item("k", "v2").await.unwrap();
        assert_eq!(db.get_item("k").await.unwrap().as_deref(), Some("v2"));

        assert!(db.remove_item("k").await.unwrap());
        assert!(!db.remove_item("k").await.unwrap());
        assert!(db.get_item("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_records_missing_is_empty() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_records("requests_backup").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_array() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set_item("requests_backup", r#"[{"id":1},{"id":2}]"#).await.unwrap();

        let records = db.get_records("requests_backup").await.unwrap();
        assert_eq!(records, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[tokio::test]
    async fn test_records_malformed() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set_item("requests_backup", "{not json").await.unwrap();
        assert!(matches!(db.get_records("requests_backup").await, Err(Error::Storage(_))));

        db.set_item("requests_backup", r#"{"id":1}"#).await.unwrap();
        let err = db.get_records("requests_backup").await.unwrap_err();
        assert!(err.to_string().contains("an object"));
    }
}
