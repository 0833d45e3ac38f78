//! Cache entry reads and writes.
//!
//! Writes are single-transaction UPSERTs, so an entry is either fully stored
//! or absent. Concurrent writers of the same key race and the last one wins.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::key::CacheKey;
use crate::{Error, Response, ResponseType};
use tokio_rusqlite::{params, rusqlite};

const SELECT_RESPONSE: &str = "SELECT e.status, e.status_text, e.headers_json, e.body, e.response_type, e.response_url
    FROM cache_entries e";

type ResponseRow = (u16, String, String, Vec<u8>, String, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResponseRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

fn into_response(row: ResponseRow) -> Result<Response, Error> {
    let (status, status_text, headers_json, body, response_type, url) = row;
    let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)
        .map_err(|e| Error::InvalidInput(format!("corrupt cached headers: {e}")))?;
    Ok(Response { status, status_text, headers, body, response_type: ResponseType::parse(&response_type), url })
}

impl CacheDb {
    /// Store `response` under `key` in the named store, creating the store if needed.
    pub async fn put(&self, cache_name: &str, key: &CacheKey, response: &Response) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        let key_hash = key.digest();
        let method = key.method().to_string();
        let url = key.url().to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let now = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![cache_name, now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                    cache_name, key_hash, method, url, status, status_text,
                    response_type, headers_json, body, response_url, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    status_text = excluded.status_text,
                    response_type = excluded.response_type,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    response_url = excluded.response_url,
                    stored_at = excluded.stored_at",
                    params![
                        cache_name,
                        key_hash,
                        method,
                        url,
                        response.status,
                        response.status_text,
                        response.response_type.as_str(),
                        headers_json,
                        response.body,
                        response.url,
                        now,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` in one named store.
    pub async fn match_in(&self, cache_name: &str, key: &CacheKey) -> Result<Option<Response>, Error> {
        let cache_name = cache_name.to_string();
        let key_hash = key.digest();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let sql = format!("{SELECT_RESPONSE} WHERE e.cache_name = ?1 AND e.key_hash = ?2");
                let mut stmt = conn.prepare(&sql)?;
                match stmt.query_row(params![cache_name, key_hash], read_row) {
                    Ok(row) => into_response(row).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` across every store, oldest store first.
    pub async fn match_any(&self, key: &CacheKey) -> Result<Option<Response>, Error> {
        let key_hash = key.digest();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let sql = format!(
                    "{SELECT_RESPONSE} JOIN cache_stores s ON s.name = e.cache_name
                     WHERE e.key_hash = ?1 ORDER BY s.seq ASC LIMIT 1"
                );
                let mut stmt = conn.prepare(&sql)?;
                match stmt.query_row(params![key_hash], read_row) {
                    Ok(row) => into_response(row).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a named store, oldest write first.
    pub async fn keys(&self, cache_name: &str) -> Result<Vec<String>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM cache_entries WHERE cache_name = ?1 ORDER BY stored_at ASC, url ASC")?;
                let urls = stmt
                    .query_map(params![cache_name], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
