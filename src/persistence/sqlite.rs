use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection};

use super::{ArticleRow, ArticleStore};
use crate::error::PersistenceError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS content (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT,
        text        TEXT
    );

    CREATE TABLE IF NOT EXISTS articles (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        main_category TEXT NOT NULL,
        sub_category  TEXT,
        list_name     TEXT,
        article_id    TEXT NOT NULL,
        article_name  TEXT NOT NULL,
        h2_name       TEXT NOT NULL,
        h3_name       TEXT NOT NULL,
        keywords      TEXT,
        content_id    INTEGER NOT NULL REFERENCES content(id)
    );
    CREATE INDEX IF NOT EXISTS idx_articles_article_id ON articles(article_id);
";

const INSERT_CONTENT: &str = "INSERT INTO content (description, text) VALUES (?1, ?2)";

const INSERT_ARTICLE: &str = "INSERT INTO articles
     (main_category, sub_category, list_name, article_id, article_name,
      h2_name, h3_name, keywords, content_id)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

/// SQLite-backed store. Clones share one connection. Statements run on the
/// blocking pool under the connection lock, and only once the returned future
/// is polled.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    echo: bool,
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
    conn.lock().map_err(|_| PersistenceError::Poisoned)
}

fn echo(enabled: bool, sql: &str) {
    if enabled {
        tracing::debug!(sql = sql.trim(), "Executing statement");
    }
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P, echo: bool) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(SqliteStore::from_connection(conn, echo))
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(SqliteStore::from_connection(conn, false))
    }

    fn from_connection(conn: Connection, echo: bool) -> Self {
        SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
            echo,
        }
    }

    /// Runs `op` against the connection on tokio's blocking pool.
    fn run<R, F>(
        &self,
        sql: &'static str,
        op: F,
    ) -> impl Future<Output = Result<R, PersistenceError>> + Send
    where
        R: Send + 'static,
        F: FnOnce(&Connection) -> Result<R, PersistenceError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let enabled = self.echo;
        async move {
            tokio::task::spawn_blocking(move || {
                echo(enabled, sql);
                let conn = lock(&conn)?;
                op(&conn)
            })
            .await
            .map_err(|err| PersistenceError::Task(err.to_string()))?
        }
    }

    #[cfg(test)]
    pub fn content_count(&self) -> i64 {
        lock(&self.conn)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM content", [], |row| row.get(0))
            .unwrap()
    }

    #[cfg(test)]
    pub fn stored_rows(&self) -> Vec<(String, String, String, String)> {
        let conn = lock(&self.conn).unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT a.sub_category, a.article_id, c.description, c.text
                 FROM articles a JOIN content c ON c.id = a.content_id
                 ORDER BY a.id",
            )
            .unwrap();
        stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
    }
}

impl ArticleStore for SqliteStore {
    fn ensure_schema(&self) -> impl Future<Output = Result<(), PersistenceError>> + Send {
        self.run(SCHEMA, |conn| Ok(conn.execute_batch(SCHEMA)?))
    }

    fn insert_content(
        &self,
        description: &str,
        text: &str,
    ) -> impl Future<Output = Result<i64, PersistenceError>> + Send {
        let description = description.to_string();
        let text = text.to_string();
        self.run(INSERT_CONTENT, move |conn| {
            conn.execute(INSERT_CONTENT, params![description, text])?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn insert_article(
        &self,
        row: &ArticleRow,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send {
        let row = row.clone();
        self.run(INSERT_ARTICLE, move |conn| {
            conn.execute(
                INSERT_ARTICLE,
                params![
                    row.main_category,
                    row.sub_category,
                    row.list_name,
                    row.article_id,
                    row.article_name,
                    row.h2_name,
                    row.h3_name,
                    row.keywords,
                    row.content_id,
                ],
            )?;
            Ok(())
        })
    }
}
