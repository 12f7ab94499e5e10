use crate::helper::HelperError;
use crate::models::db_operations::{posts_db_operations, settings_db_operations, users_db_operations};
use crate::models::{Post, PostFields, Settings, SettingsUpdate};
use crate::DbPool;
use redb::Database;
use std::collections::HashMap;

fn get_conn(pool: &DbPool) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, HelperError> {
    pool.get().map_err(HelperError::Pool)
}

pub fn verify_credentials(pool: &DbPool, username: &str, password: &str) -> Option<(String, String)> {
    match pool.get() {
        Ok(conn) => users_db_operations::verify_credentials(&conn, username, password),
        Err(e) => {
            log::error!("Could not get DB connection to verify credentials: {}", e);
            None
        }
    }
}

pub fn record_login(pool: &DbPool, username: &str) -> Result<(), HelperError> {
    let conn = get_conn(pool)?;
    users_db_operations::update_last_login_time(&conn, username)?;
    Ok(())
}

pub fn create_post(db: &Database, fields: &PostFields) -> Result<Post, HelperError> {
    Ok(posts_db_operations::create_post(db, fields)?)
}

pub fn update_post(db: &Database, id: u64, fields: &PostFields) -> Result<Post, HelperError> {
    Ok(posts_db_operations::update_post(db, id, fields)?)
}

pub fn update_settings(pool: &DbPool, changes: &SettingsUpdate) -> Result<Settings, HelperError> {
    let conn = get_conn(pool)?;
    Ok(settings_db_operations::update_settings(&conn, changes)?)
}

/// Reads the post form fields (`title`, `body`, `authorName`, `authorUrl`).
pub fn post_fields_from_form(parsed: &HashMap<String, String>) -> PostFields {
    PostFields {
        title: parsed.get("title").cloned().unwrap_or_default(),
        body: parsed.get("body").cloned().unwrap_or_default(),
        author_name: parsed.get("authorName").cloned().unwrap_or_default(),
        author_url: parsed.get("authorUrl").cloned(),
    }
}

/// Turns the settings form into a partial update. Blank text fields keep their
/// stored value; the checkbox is absent from the form when unticked.
pub fn settings_update_from_form(parsed: &HashMap<String, String>) -> Result<SettingsUpdate, String> {
    let text = |key: &str| {
        parsed
            .get(key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let posts_per_page = match text("postsPerPage") {
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n > 0 => Some(n),
            _ => return Err("Posts per page must be a whole number greater than zero.".to_string()),
        },
        None => None,
    };

    Ok(SettingsUpdate {
        // Feed and Disqus links are built as `{blog_url}posts/{id}`.
        blog_url: text("blogUrl").map(|url| if url.ends_with('/') { url } else { format!("{}/", url) }),
        blog_title: text("blogTitle"),
        blog_subtitle: text("blogSubtitle"),
        author_name: text("authorName"),
        author_url: text("authorUrl"),
        posts_per_page,
        disqus_enabled: Some(parsed.contains_key("disqusEnabled")),
        disqus_blog_id: Some(text("disqusBlogId")),
    })
}
