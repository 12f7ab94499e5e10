use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError,
};
use crate::models::{Post, PostFields};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Redb database error: {0}")]
    RedbDatabase(#[from] DatabaseError),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Invalid post: {0}")]
    Validation(String),
    #[error("Item not found in database: {0}")]
    NotFound(String),
}

pub const POSTS: TableDefinition<u64, &str> = TableDefinition::new("posts");
// Keys are (-published micros, u64::MAX - id): iteration yields newest first,
// and posts sharing a timestamp come out newest id first.
pub const CHRONOLOGICAL_INDEX: TableDefinition<(i64, u64), ()> = TableDefinition::new("chronological_index");
pub const UPDATED_INDEX: TableDefinition<(i64, u64), ()> = TableDefinition::new("updated_index");
pub const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

const NEXT_POST_ID: &str = "next_post_id";

fn index_key(at: &DateTime<Utc>, id: u64) -> (i64, u64) {
    (-at.timestamp_micros(), u64::MAX - id)
}

fn validate(fields: &PostFields) -> Result<(), DbError> {
    if fields.title.trim().is_empty() {
        return Err(DbError::Validation("Title is required.".to_string()));
    }
    if fields.body.trim().is_empty() {
        return Err(DbError::Validation("Body is required.".to_string()));
    }
    if fields.author_name.trim().is_empty() {
        return Err(DbError::Validation("Author name is required.".to_string()));
    }
    Ok(())
}

fn normalize_url(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn create_post(db: &Database, fields: &PostFields) -> Result<Post, DbError> {
    validate(fields)?;
    let now = Utc::now();

    let write_txn = db.begin_write()?;
    let post = {
        let mut counters = write_txn.open_table(COUNTERS)?;
        let mut posts_table = write_txn.open_table(POSTS)?;
        let mut chrono_index = write_txn.open_table(CHRONOLOGICAL_INDEX)?;
        let mut updated_index = write_txn.open_table(UPDATED_INDEX)?;

        // Ids start at 1 and are never reused.
        let id = counters.get(NEXT_POST_ID)?.map(|guard| guard.value()).unwrap_or(1);
        counters.insert(NEXT_POST_ID, id + 1)?;

        let post = Post {
            id,
            title: fields.title.trim().to_string(),
            body: fields.body.clone(),
            author_name: fields.author_name.trim().to_string(),
            author_url: normalize_url(fields.author_url.as_deref()),
            published: now,
            updated: now,
            is_draft: None,
        };
        let post_json = serde_json::to_string(&post)?;

        posts_table.insert(id, post_json.as_str())?;
        chrono_index.insert(index_key(&post.published, id), ())?;
        updated_index.insert(index_key(&post.updated, id), ())?;
        post
    };
    write_txn.commit()?;

    log::info!("Created post {} ('{}')", post.id, post.title);
    Ok(post)
}

pub fn read_post(db: &Database, id: u64) -> Result<Option<Post>, DbError> {
    let read_txn = db.begin_read()?;
    let posts_table = read_txn.open_table(POSTS)?;

    let post = match posts_table.get(id)? {
        Some(guard) => Some(serde_json::from_str(guard.value())?),
        None => None,
    };
    Ok(post)
}

/// Unknown ids fail with `NotFound` before the fields are validated.
pub fn update_post(db: &Database, id: u64, fields: &PostFields) -> Result<Post, DbError> {
    let write_txn = db.begin_write()?;
    let post = {
        let mut posts_table = write_txn.open_table(POSTS)?;
        let mut updated_index = write_txn.open_table(UPDATED_INDEX)?;

        let old: Post = {
            let guard = posts_table.get(id)?.ok_or_else(|| DbError::NotFound(format!("post {}", id)))?;
            serde_json::from_str(guard.value())?
        };
        validate(fields)?;

        // Never move backwards, even if the clock does.
        let updated = Utc::now().max(old.updated);

        let post = Post {
            title: fields.title.trim().to_string(),
            body: fields.body.clone(),
            author_name: fields.author_name.trim().to_string(),
            author_url: normalize_url(fields.author_url.as_deref()),
            updated,
            ..old.clone()
        };
        let post_json = serde_json::to_string(&post)?;

        posts_table.insert(id, post_json.as_str())?;
        updated_index.remove(index_key(&old.updated, id))?;
        updated_index.insert(index_key(&post.updated, id), ())?;
        post
    };
    write_txn.commit()?;

    log::info!("Updated post {}", id);
    Ok(post)
}

/// Posts ordered by published time, newest first. `None` returns every post.
pub fn read_latest_posts(db: &Database, limit: Option<usize>) -> Result<Vec<Post>, DbError> {
    let read_txn = db.begin_read()?;
    let chrono_index = read_txn.open_table(CHRONOLOGICAL_INDEX)?;
    let posts_table = read_txn.open_table(POSTS)?;

    let mut posts = Vec::new();
    for item in chrono_index.iter()? {
        if limit.map_or(false, |limit| posts.len() >= limit) {
            break;
        }
        let (key, _value) = item?;
        let id = u64::MAX - key.value().1;
        match posts_table.get(id)? {
            Some(guard) => posts.push(serde_json::from_str(guard.value())?),
            None => log::warn!("Chronological index points at missing post {}", id),
        }
    }
    Ok(posts)
}

pub fn read_most_recently_updated(db: &Database) -> Result<Option<Post>, DbError> {
    let read_txn = db.begin_read()?;
    let updated_index = read_txn.open_table(UPDATED_INDEX)?;
    let posts_table = read_txn.open_table(POSTS)?;

    let id = match updated_index.iter()?.next() {
        Some(item) => u64::MAX - item?.0.value().1,
        None => return Ok(None),
    };
    let post = match posts_table.get(id)? {
        Some(guard) => serde_json::from_str(guard.value())?,
        None => return Err(DbError::NotFound(format!("post {} referenced by updated index", id))),
    };
    Ok(Some(post))
}
