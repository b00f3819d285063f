//! SQLite-backed store. Each `<database>.<collection>` is a table of JSON documents.

use super::{ID_FIELD, RecordStore, StoreConnection};
use crate::data::source::DataBatch;
use crate::error::StoreError;
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Store backed by a single SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        let db_path = self.db_path.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let conn = Connection::open(&db_path)?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::connection(format!("SQLite task join error: {e}")))??;

        Ok(Box::new(SqliteConnection {
            conn: Arc::new(Mutex::new(Some(conn))),
        }))
    }

    fn describe(&self) -> String {
        format!("sqlite://{}", self.db_path.display())
    }
}

pub struct SqliteConnection {
    conn: Arc<Mutex<Option<Connection>>>,
}

/// Quoted identifier for `<database>.<collection>`.
fn table_name(database: &str, collection: &str) -> String {
    format!("\"{}.{}\"", database.replace('"', "\"\""), collection.replace('"', "\"\""))
}

fn table_exists(conn: &Connection, database: &str, collection: &str) -> Result<bool, StoreError> {
    let name = format!("{database}.{collection}");
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [&name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

impl SqliteConnection {
    /// Run `f` against the open connection on a blocking thread.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let shared = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = shared
                .lock()
                .map_err(|_| StoreError::query("SQLite connection lock poisoned"))?;
            let conn = guard
                .as_mut()
                .ok_or_else(|| StoreError::connection("connection is closed"))?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::query(format!("SQLite task join error: {e}")))?
    }
}

#[async_trait]
impl StoreConnection for SqliteConnection {
    async fn fetch_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<DataBatch, StoreError> {
        let (database, collection) = (database.to_string(), collection.to_string());
        self.with_conn(move |conn| {
            if !table_exists(conn, &database, &collection)? {
                return Ok(DataBatch::empty());
            }
            let sql = format!(
                "SELECT _id, doc FROM {} ORDER BY _id",
                table_name(&database, &collection)
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let mut docs = Vec::new();
            while let Some(row) = rows.next()? {
                let id: i64 = row.get(0)?;
                let raw: String = row.get(1)?;
                let mut doc: Map<String, Value> = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::query(format!("document {id}: {e}")))?;
                doc.insert(ID_FIELD.to_string(), Value::from(id));
                docs.push(doc);
            }
            Ok(DataBatch::from_documents(docs))
        })
        .await
    }

    async fn count(&self, database: &str, collection: &str) -> Result<usize, StoreError> {
        let (database, collection) = (database.to_string(), collection.to_string());
        self.with_conn(move |conn| {
            if !table_exists(conn, &database, &collection)? {
                return Ok(0);
            }
            let sql = format!("SELECT COUNT(*) FROM {}", table_name(&database, &collection));
            let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(n as usize)
        })
        .await
    }

    async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        batch: &DataBatch,
    ) -> Result<usize, StoreError> {
        let table = table_name(database, collection);
        let docs = batch
            .to_documents()
            .into_iter()
            .map(|doc| serde_json::to_string(&doc))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::query(e.to_string()))?;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {table} (_id INTEGER PRIMARY KEY, doc TEXT NOT NULL)"
                ),
                [],
            )?;
            {
                let mut stmt = tx.prepare(&format!("INSERT INTO {table} (doc) VALUES (?1)"))?;
                for doc in &docs {
                    stmt.execute([doc])?;
                }
            }
            tx.commit()?;
            Ok(docs.len())
        })
        .await
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        let shared = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = shared
                .lock()
                .map_err(|_| StoreError::query("SQLite connection lock poisoned"))?;
            if let Some(conn) = guard.take() {
                conn.close().map_err(|(_, e)| StoreError::from(e))?;
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::query(format!("SQLite task join error: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_table_name_is_quoted() {
        assert_eq!(table_name("NETWORK", "NetworkData"), "\"NETWORK.NetworkData\"");
        assert_eq!(table_name("a\"b", "c"), "\"a\"\"b.c\"");
    }

    #[tokio::test]
    async fn test_roundtrip_through_sqlite() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("records.db"));
        let mut conn = store.connect().await.unwrap();
        assert_eq!(conn.count("NETWORK", "NetworkData").await.unwrap(), 0);

        let batch = DataBatch::new(
            vec!["protocol".into(), "bytes".into()],
            vec![vec![json!("TCP"), json!(120)], vec![json!("UDP"), json!(48.5)]],
        );
        assert_eq!(conn.insert_many("NETWORK", "NetworkData", &batch).await.unwrap(), 2);
        assert_eq!(conn.count("NETWORK", "NetworkData").await.unwrap(), 2);

        let fetched = conn.fetch_collection("NETWORK", "NetworkData").await.unwrap();
        assert_eq!(fetched.columns, vec!["protocol", "bytes", "_id"]);
        assert_eq!(fetched.rows[1][1], json!(48.5));
        assert_eq!(fetched.rows[0][2], json!(1));

        conn.close().await.unwrap();
        assert!(conn.count("NETWORK", "NetworkData").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_table_is_empty() {
        let dir = TempDir::new().unwrap();
        let conn = SqliteStore::new(dir.path().join("empty.db"))
            .connect()
            .await
            .unwrap();
        assert!(conn.fetch_collection("x", "y").await.unwrap().is_empty());
    }
}
