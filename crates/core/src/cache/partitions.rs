//! Partition and entry operations on the SQLite store.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Transaction};

use super::{CacheStore, connection::CacheDb};
use crate::Error;
use crate::http::{CachedResponse, FetchRequest};

/// Listing row for a stored entry; the body itself is not loaded.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryMeta {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub body_len: i64,
    pub stored_at: String,
}

/// Owned copy of one row to insert, built before entering the connection thread.
struct Row {
    key: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl Row {
    fn new(request: &FetchRequest, response: &CachedResponse) -> Result<Self, Error> {
        Ok(Self {
            key: request.key(),
            method: request.method.to_ascii_uppercase(),
            url: request.url.to_string(),
            status: response.status,
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

fn ensure_partition(tx: &Transaction<'_>, partition: &str, now: &str) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO partitions (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![partition, now],
    )?;
    Ok(())
}

fn upsert_row(tx: &Transaction<'_>, partition: &str, row: &Row, now: &str) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO entries (partition, key, method, url, status, headers_json, body, body_len, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(partition, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            body_len = excluded.body_len,
            stored_at = excluded.stored_at",
        params![
            partition,
            &row.key,
            &row.method,
            &row.url,
            row.status,
            &row.headers_json,
            &row.body,
            row.body.len() as i64,
            now,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    async fn write_rows(&self, partition: &str, rows: Vec<Row>) -> Result<(), Error> {
        let partition = partition.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &partition, &now)?;
                for row in &rows {
                    upsert_row(&tx, &partition, row, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.write_rows(partition, Vec::new()).await
    }

    async fn put(&self, partition: &str, request: &FetchRequest, response: &CachedResponse) -> Result<(), Error> {
        let row = Row::new(request, response)?;
        self.write_rows(partition, vec![row]).await?;
        tracing::debug!(partition, url = %request.url, status = response.status, "stored response");
        Ok(())
    }

    async fn put_all(&self, partition: &str, entries: &[(FetchRequest, CachedResponse)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(request, response)| Row::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let count = rows.len();
        self.write_rows(partition, rows).await?;
        tracing::debug!(partition, count, "stored response batch");
        Ok(())
    }

    async fn match_request(&self, partition: &str, request: &FetchRequest) -> Result<Option<CachedResponse>, Error> {
        let partition = partition.to_string();
        let key = request.key();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT url, status, headers_json, body FROM entries WHERE partition = ?1 AND key = ?2",
                        params![partition, key],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, u16>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, Vec<u8>>(3)?,
                            ))
                        },
                    )
                    .optional()?;

                match row {
                    Some((url, status, headers_json, body)) => Ok(Some(CachedResponse {
                        url,
                        status,
                        headers: serde_json::from_str(&headers_json)?,
                        body: Bytes::from(body),
                    })),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, partition: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![partition])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_except(&self, keep: &[String]) -> Result<Vec<String>, Error> {
        let keep = keep.to_vec();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let stale: Vec<String> = {
                    let mut stmt = tx.prepare("SELECT name FROM partitions ORDER BY name ASC")?;
                    stmt.query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?
                        .into_iter()
                        .filter(|name| !keep.contains(name))
                        .collect()
                };
                for name in &stale {
                    tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                }
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(Error::from)
    }

    async fn entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, body_len, stored_at FROM entries
                     WHERE partition = ?1 ORDER BY url ASC",
                )?;
                let rows = stmt
                    .query_map(params![partition], |row| {
                        Ok(EntryMeta {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get(2)?,
                            body_len: row.get(3)?,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}
