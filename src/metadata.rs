//! SQLite persistence for collected video rows.
//!
//! Each run replaces the whole table: the previous snapshot is dropped and
//! the new rows are inserted inside one transaction, so readers either see
//! the old table or the complete new one.

use std::path::Path;

use anyhow::{Context, Result, bail};
use libsql::{Builder, Connection, Row, params};

use crate::record::{COLUMNS, VideoRecord};

/// Only pragmas that return no rows may go here; `execute_batch` rejects
/// statements that produce a result set (such as `journal_mode`).
async fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA synchronous=NORMAL;").await?;
    Ok(())
}

/// Quotes a table name for use as an SQL identifier.
fn quote_identifier(name: &str) -> Result<String> {
    if name.trim().is_empty() {
        bail!("table name must not be empty");
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

fn create_table_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE {table} (
            "video_id" TEXT,
            "title" TEXT,
            "description" TEXT,
            "tags" TEXT,
            "published_at" TEXT,
            "channel_id" TEXT,
            "channel_title" TEXT,
            "category_id" TEXT,
            "duration" TEXT,
            "definition" TEXT,
            "viewCount" INTEGER NOT NULL,
            "likeCount" INTEGER,
            "commentCount" INTEGER
        )
        "#
    )
}

fn column_list() -> String {
    COLUMNS
        .iter()
        .map(|column| format!("\"{column}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Wrapper around the SQLite-compatible connection that owns the output table.
pub struct MetadataStore {
    conn: Connection,
    table: String,
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl MetadataStore {
    /// Opens (and if necessary creates) the database file. The table itself
    /// is only created by [`MetadataStore::replace_all`].
    pub async fn open(path: &Path, table: &str) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .with_context(|| format!("opening database {}", path.display()))?;

        let conn = db.connect()?;
        configure_connection(&conn).await?;

        Ok(Self {
            conn,
            table: quote_identifier(table)?,
        })
    }

    /// Drops any previous table of the same name and writes `rows` in its place.
    pub async fn replace_all(&self, rows: &[VideoRecord]) -> Result<usize> {
        let table = &self.table;
        let insert = format!(
            "INSERT INTO {table} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            column_list()
        );

        let tx = self.conn.transaction().await?;
        tx.execute(&format!("DROP TABLE IF EXISTS {table}"), params![])
            .await
            .with_context(|| format!("dropping {table}"))?;
        tx.execute(&create_table_sql(table), params![])
            .await
            .with_context(|| format!("creating {table}"))?;

        for row in rows {
            tx.execute(
                &insert,
                params![
                    row.video_id.as_str(),
                    row.title.as_deref(),
                    row.description.as_deref(),
                    row.tags.as_str(),
                    row.published_at.as_deref(),
                    row.channel_id.as_deref(),
                    row.channel_title.as_deref(),
                    row.category_id.as_deref(),
                    row.duration.as_deref(),
                    row.definition.as_deref(),
                    row.view_count,
                    row.like_count,
                    row.comment_count,
                ],
            )
            .await
            .with_context(|| format!("inserting video {}", row.video_id))?;
        }

        tx.commit().await?;
        Ok(rows.len())
    }

    /// Reads the table back in insertion order.
    pub async fn load_all(&self) -> Result<Vec<VideoRecord>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid ASC",
            column_list(),
            self.table
        );
        let mut rows = self.conn.query(&sql, params![]).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_video_record(&row)?);
        }
        Ok(records)
    }

    pub async fn count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let mut rows = self.conn.query(&sql, params![]).await?;
        let row = rows.next().await?.context("missing count row")?;
        Ok(row.get(0)?)
    }
}

/// Column order must match `COLUMNS`.
fn row_to_video_record(row: &Row) -> Result<VideoRecord> {
    Ok(VideoRecord {
        video_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        tags: row.get(3)?,
        published_at: row.get(4)?,
        channel_id: row.get(5)?,
        channel_title: row.get(6)?,
        category_id: row.get(7)?,
        duration: row.get(8)?,
        definition: row.get(9)?,
        view_count: row.get(10)?,
        like_count: row.get(11)?,
        comment_count: row.get(12)?,
    })
}
