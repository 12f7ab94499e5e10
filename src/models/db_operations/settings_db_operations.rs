use crate::models::{Settings, SettingsUpdate};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Error as RusqliteError, Row};

pub const DEFAULT_BLOG_URL: &str = "http://www.yourdomain.com/blog/";
pub const DEFAULT_BLOG_TITLE: &str = "Your Blog's Title";
pub const DEFAULT_BLOG_SUBTITLE: &str = "A Snazzy Tagline for Your Blog";
pub const DEFAULT_AUTHOR_NAME: &str = "BlogMotor";
pub const DEFAULT_AUTHOR_URL: &str = "http://www.gaborcselle.com/";
pub const DEFAULT_POSTS_PER_PAGE: u32 = 10;

// The table only admits the row with id 1, so the conditional insert below
// is the whole get-or-create protocol.
const SINGLETON_ID: i64 = 1;

const SELECT_SETTINGS: &str = "SELECT blog_url, blog_title, blog_subtitle, author_name, author_url, posts_per_page, disqus_enabled, disqus_blog_id, created, updated FROM blog_settings WHERE id = ?1";

fn row_to_settings(row: &Row) -> rusqlite::Result<Settings> {
    Ok(Settings {
        blog_url: row.get(0)?,
        blog_title: row.get(1)?,
        blog_subtitle: row.get(2)?,
        author_name: row.get(3)?,
        author_url: row.get(4)?,
        posts_per_page: row.get(5)?,
        disqus_enabled: row.get(6)?,
        disqus_blog_id: row.get(7)?,
        created: parse_timestamp(row.get::<_, String>(8)?)?,
        updated: parse_timestamp(row.get::<_, String>(9)?)?,
    })
}

fn parse_timestamp(value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RusqliteError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

/// Returns the settings record, creating it with defaults if this is the first access.
pub fn get_or_create_settings(conn: &Connection) -> Result<Settings, RusqliteError> {
    let now = Utc::now().to_rfc3339();
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO blog_settings (id, blog_url, blog_title, blog_subtitle, author_name, author_url, posts_per_page, disqus_enabled, disqus_blog_id, created, updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, ?8, ?8)",
        params![
            SINGLETON_ID,
            DEFAULT_BLOG_URL,
            DEFAULT_BLOG_TITLE,
            DEFAULT_BLOG_SUBTITLE,
            DEFAULT_AUTHOR_NAME,
            DEFAULT_AUTHOR_URL,
            DEFAULT_POSTS_PER_PAGE,
            now,
        ],
    )?;
    if inserted > 0 {
        log::info!("Created default blog settings.");
    }

    conn.query_row(SELECT_SETTINGS, [SINGLETON_ID], row_to_settings)
}

pub fn update_settings(conn: &Connection, changes: &SettingsUpdate) -> Result<Settings, RusqliteError> {
    let current = get_or_create_settings(conn)?;

    let merged = Settings {
        blog_url: changes.blog_url.clone().unwrap_or(current.blog_url),
        blog_title: changes.blog_title.clone().unwrap_or(current.blog_title),
        blog_subtitle: changes.blog_subtitle.clone().unwrap_or(current.blog_subtitle),
        author_name: changes.author_name.clone().unwrap_or(current.author_name),
        author_url: changes.author_url.clone().unwrap_or(current.author_url),
        posts_per_page: changes.posts_per_page.unwrap_or(current.posts_per_page),
        disqus_enabled: changes.disqus_enabled.unwrap_or(current.disqus_enabled),
        disqus_blog_id: changes.disqus_blog_id.clone().unwrap_or(current.disqus_blog_id),
        created: current.created,
        updated: Utc::now().max(current.updated),
    };

    conn.execute(
        "UPDATE blog_settings SET blog_url = ?1, blog_title = ?2, blog_subtitle = ?3, author_name = ?4, author_url = ?5, posts_per_page = ?6, disqus_enabled = ?7, disqus_blog_id = ?8, updated = ?9 WHERE id = ?10",
        params![
            merged.blog_url,
            merged.blog_title,
            merged.blog_subtitle,
            merged.author_name,
            merged.author_url,
            merged.posts_per_page,
            merged.disqus_enabled,
            merged.disqus_blog_id,
            merged.updated.to_rfc3339(),
            SINGLETON_ID,
        ],
    )?;
    Ok(merged)
}

pub fn count_settings_rows(conn: &Connection) -> Result<i64, RusqliteError> {
    conn.query_row("SELECT COUNT(*) FROM blog_settings", [], |row| row.get(0))
}
