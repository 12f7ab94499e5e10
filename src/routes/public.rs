use crate::helper::public_helpers;
use crate::helper::template_helpers::{error_response, not_found, redirect, render, render_with, ATOM};
use crate::DbPool;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use chrono::SecondsFormat;
use redb::Database;
use tera::{Context, Tera};

pub async fn root_redirect() -> HttpResponse {
    redirect("/blog/")
}

pub async fn blog_redirect() -> HttpResponse {
    redirect("/blog/")
}

/// `/blog/posts/{id}/` → `/blog/posts/{id}`, keeping the id exactly as requested.
pub async fn blog_post_redirect(id: web::Path<String>) -> HttpResponse {
    redirect(&format!("/blog/posts/{}", id.into_inner()))
}

pub async fn not_found_page() -> HttpResponse {
    not_found()
}

pub async fn blog_index(
    tera: web::Data<Tera>,
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
) -> HttpResponse {
    let blog_settings = match public_helpers::fetch_settings(&pool) {
        Ok(settings) => settings,
        Err(e) => return error_response("Failed to load blog settings", e),
    };

    let entries = match public_helpers::fetch_latest_posts(&db, blog_settings.posts_per_page) {
        Ok(posts) => posts,
        Err(e) => return error_response("Failed to fetch latest posts", e),
    };

    let mut ctx = Context::new();
    ctx.insert("entries", &entries);
    ctx.insert("post_page", &false);
    ctx.insert("blog_settings", &blog_settings);
    render(&tera, "blog/index.html", &ctx)
}

pub async fn blog_post(
    id: web::Path<String>,
    tera: web::Data<Tera>,
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
) -> HttpResponse {
    // Digit runs too long for a u64 cannot name a post.
    let Ok(id) = id.parse::<u64>() else {
        return not_found();
    };
    let entry = match public_helpers::fetch_post_by_id(&db, id) {
        Ok(Some(post)) => post,
        Ok(None) => return not_found(),
        Err(e) => return error_response(&format!("Failed to fetch post {}", id), e),
    };

    let blog_settings = match public_helpers::fetch_settings(&pool) {
        Ok(settings) => settings,
        Err(e) => return error_response("Failed to load blog settings", e),
    };

    let mut ctx = Context::new();
    ctx.insert("entries", &[entry]);
    ctx.insert("post_page", &true);
    ctx.insert("blog_settings", &blog_settings);
    render(&tera, "blog/index.html", &ctx)
}

pub async fn atom_feed(
    tera: web::Data<Tera>,
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
) -> HttpResponse {
    let blog_settings = match public_helpers::fetch_settings(&pool) {
        Ok(settings) => settings,
        Err(e) => return error_response("Failed to load blog settings", e),
    };

    let entries = match public_helpers::fetch_all_posts(&db) {
        Ok(posts) => posts,
        Err(e) => return error_response("Failed to fetch posts for the feed", e),
    };

    let blog_updated = match public_helpers::fetch_feed_updated(&db) {
        Ok(updated) => updated,
        Err(e) => return error_response("Failed to compute feed update time", e),
    };

    let mut ctx = Context::new();
    ctx.insert("entries", &entries);
    ctx.insert("blog_updated", &blog_updated.to_rfc3339_opts(SecondsFormat::Secs, true));
    ctx.insert("blog_settings", &blog_settings);
    render_with(&tera, "blog/atom.xml", &ctx, StatusCode::OK, ATOM)
}
