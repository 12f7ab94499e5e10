use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One blog entry as stored in the posts database.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub author_name: String,
    pub author_url: Option<String>,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Stored for completeness; listings and the feed never filter on it.
    pub is_draft: Option<bool>,
}

impl Post {
    pub fn permalink(&self) -> String {
        permalink(self.id)
    }
}

pub fn permalink(id: u64) -> String {
    format!("/blog/posts/{}", id)
}

/// The editable fields of a post, as submitted by the admin forms.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PostFields {
    pub title: String,
    pub body: String,
    pub author_name: String,
    pub author_url: Option<String>,
}

/// The blog-wide configuration record. Exactly one exists once anything has asked for it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub blog_url: String,
    pub blog_title: String,
    pub blog_subtitle: String,
    pub author_name: String,
    pub author_url: String,
    pub posts_per_page: u32,
    pub disqus_enabled: bool,
    pub disqus_blog_id: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// A partial change to [`Settings`]. `None` leaves the stored value alone.
#[derive(Debug, Default, Clone)]
pub struct SettingsUpdate {
    pub blog_url: Option<String>,
    pub blog_title: Option<String>,
    pub blog_subtitle: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub posts_per_page: Option<u32>,
    pub disqus_enabled: Option<bool>,
    /// `Some(None)` clears the stored id.
    pub disqus_blog_id: Option<Option<String>>,
}

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_AUTHOR: &str = "author";

#[derive(Debug, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub is_active: bool,
    pub last_login_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub message: String,
    pub r#type: String, // 'success' or 'error'
}

pub mod db_operations;
