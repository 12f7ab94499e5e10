use crate::models::db_operations::posts_db_operations::{
    CHRONOLOGICAL_INDEX, COUNTERS, POSTS, UPDATED_INDEX,
};
use redb::{CommitError, Database, StorageError, TableError, TransactionError};
use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
}

/// Creates the SQLite tables for the settings singleton and user accounts.
/// Safe to run against an existing database.
pub fn setup_site_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    log::info!("Creating 'users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('admin', 'author')),
            is_active INTEGER NOT NULL DEFAULT 1,
            last_login_time TEXT
        )",
        [],
    )?;

    log::info!("Creating 'blog_settings' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS blog_settings (
            id INTEGER PRIMARY KEY CHECK(id = 1),
            blog_url TEXT NOT NULL,
            blog_title TEXT NOT NULL,
            blog_subtitle TEXT NOT NULL,
            author_name TEXT NOT NULL,
            author_url TEXT NOT NULL,
            posts_per_page INTEGER NOT NULL DEFAULT 10,
            disqus_enabled INTEGER NOT NULL DEFAULT 0,
            disqus_blog_id TEXT,
            created TEXT NOT NULL,
            updated TEXT NOT NULL
        )",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

/// Creates every redb table the post store reads from. Read transactions fail
/// on tables that were never opened for writing.
pub fn setup_posts_db(db: &Database) -> Result<(), SetupError> {
    let write_txn = db.begin_write()?;
    {
        log::info!("Creating 'posts' table in Redb...");
        write_txn.open_table(POSTS)?;

        log::info!("Creating 'chronological_index' table in Redb...");
        write_txn.open_table(CHRONOLOGICAL_INDEX)?;

        log::info!("Creating 'updated_index' table in Redb...");
        write_txn.open_table(UPDATED_INDEX)?;

        write_txn.open_table(COUNTERS)?;
    }
    write_txn.commit()?;
    Ok(())
}
