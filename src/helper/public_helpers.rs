use crate::helper::HelperError;
use crate::models::db_operations::{posts_db_operations, settings_db_operations};
use crate::models::{Post, Settings};
use crate::DbPool;
use chrono::{DateTime, Utc};
use redb::Database;

fn get_conn(pool: &DbPool) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, HelperError> {
    pool.get().map_err(HelperError::Pool)
}

pub fn fetch_settings(pool: &DbPool) -> Result<Settings, HelperError> {
    let conn = get_conn(pool)?;
    Ok(settings_db_operations::get_or_create_settings(&conn)?)
}

pub fn fetch_post_by_id(db: &Database, id: u64) -> Result<Option<Post>, HelperError> {
    Ok(posts_db_operations::read_post(db, id)?)
}

pub fn fetch_latest_posts(db: &Database, limit: u32) -> Result<Vec<Post>, HelperError> {
    Ok(posts_db_operations::read_latest_posts(db, Some(limit as usize))?)
}

pub fn fetch_all_posts(db: &Database) -> Result<Vec<Post>, HelperError> {
    Ok(posts_db_operations::read_latest_posts(db, None)?)
}

/// Reported as the feed's `<updated>` when there are no posts yet: 0001-01-01T00:00:00Z.
pub fn feed_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(-62_135_596_800, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// The feed is as fresh as its most recently touched post.
pub fn fetch_feed_updated(db: &Database) -> Result<DateTime<Utc>, HelperError> {
    Ok(posts_db_operations::read_most_recently_updated(db)?
        .map(|post| post.updated)
        .unwrap_or_else(feed_epoch))
}
