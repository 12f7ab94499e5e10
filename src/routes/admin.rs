use crate::helper::template_helpers::{error_response, not_found, redirect, render, render_with, HTML};
use crate::helper::{admin_helpers, form_helpers, public_helpers, HelperError};
use crate::middleware::{login_url, AdminGate, CurrentUser};
use crate::models::db_operations::posts_db_operations::DbError;
use crate::models::{Notification, PostFields};
use crate::routes::read_route;
use crate::DbPool;
use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use redb::Database;
use serde::Deserialize;
use tera::{Context, Tera};

const ADMIN_HOME: &str = "/admin/blog/";
const SETTINGS_URL: &str = "/admin/blog/settings/";

#[derive(Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "continue")]
    continue_to: Option<String>,
}

/// Admin pages, each wrapped in the [`AdminGate`]. The gate sits on the
/// resources rather than on a scope so unknown `/admin/...` paths still 404.
pub fn config_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/admin/blog/")
            .wrap(AdminGate)
            .route(read_route().to(admin_list)),
    )
    .service(
        web::resource("/admin/blog/settings/")
            .wrap(AdminGate)
            .route(read_route().to(show_settings))
            .route(web::post().to(save_settings)),
    )
    .service(
        web::resource("/admin/blog/new/")
            .wrap(AdminGate)
            .route(read_route().to(show_new_post))
            .route(web::post().to(create_post_action)),
    )
    .service(
        web::resource("/admin/blog/edit/{id:\\d+}")
            .wrap(AdminGate)
            .route(read_route().to(show_edit_post))
            .route(web::post().to(update_post_action)),
    );
}

pub fn config_login(cfg: &mut web::ServiceConfig) {
    cfg.route("/admin/login", read_route().to(show_login_form))
        .route("/admin/login", web::post().to(handle_login))
        .route("/admin/logout", web::post().to(handle_logout));
}

fn set_notification(session: &Session, message: &str, r#type: &str) {
    let notification = Notification { message: message.to_string(), r#type: r#type.to_string() };
    if let Err(e) = session.insert("notification", &notification) {
        log::error!("Failed to store notification in session: {}", e);
    }
}

fn take_notification(session: &Session, ctx: &mut Context) {
    if let Ok(Some(notification)) = session.get::<Notification>("notification") {
        ctx.insert("notification", &notification);
        session.remove("notification");
    }
}

/// Only same-site paths are accepted as post-login destinations.
fn safe_destination(continue_to: Option<&str>) -> String {
    match continue_to {
        Some(dest) if dest.starts_with('/') && !dest.starts_with("//") && !dest.contains('\\') => dest.to_string(),
        _ => ADMIN_HOME.to_string(),
    }
}

async fn admin_list(
    user: CurrentUser,
    tera: web::Data<Tera>,
    db: web::Data<Database>,
) -> HttpResponse {
    let posts = match public_helpers::fetch_all_posts(&db) {
        Ok(posts) => posts,
        Err(e) => return error_response("Failed to fetch posts for admin list", e),
    };

    let mut ctx = Context::new();
    ctx.insert("user", &user);
    ctx.insert("posts", &posts);
    render(&tera, "admin/list.html", &ctx)
}

async fn show_new_post(tera: web::Data<Tera>, pool: web::Data<DbPool>) -> HttpResponse {
    let settings = match public_helpers::fetch_settings(&pool) {
        Ok(settings) => settings,
        Err(e) => return error_response("Failed to load blog settings", e),
    };

    let blank = PostFields {
        author_name: settings.author_name,
        author_url: Some(settings.author_url),
        ..Default::default()
    };

    let mut ctx = Context::new();
    ctx.insert("y", &blank);
    render(&tera, "admin/new.html", &ctx)
}

async fn create_post_action(
    tera: web::Data<Tera>,
    db: web::Data<Database>,
    form: web::Bytes,
) -> HttpResponse {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let fields = admin_helpers::post_fields_from_form(&parsed);

    match admin_helpers::create_post(&db, &fields) {
        Ok(post) => redirect(&post.permalink()),
        Err(HelperError::RedbDatabase(DbError::Validation(msg))) => {
            let mut ctx = Context::new();
            ctx.insert("y", &fields);
            ctx.insert("error", &msg);
            render_with(&tera, "admin/new.html", &ctx, StatusCode::BAD_REQUEST, HTML)
        }
        Err(e) => error_response("Failed to create post", e),
    }
}

async fn show_edit_post(
    id: web::Path<String>,
    tera: web::Data<Tera>,
    db: web::Data<Database>,
) -> HttpResponse {
    let Ok(id) = id.parse::<u64>() else {
        return not_found();
    };
    let post = match public_helpers::fetch_post_by_id(&db, id) {
        Ok(Some(post)) => post,
        Ok(None) => return not_found(),
        Err(e) => return error_response(&format!("Failed to fetch post {} for editing", id), e),
    };

    let mut ctx = Context::new();
    ctx.insert("post_id", &post.id);
    ctx.insert("y", &post);
    render(&tera, "admin/edit.html", &ctx)
}

async fn update_post_action(
    path_id: web::Path<String>,
    tera: web::Data<Tera>,
    db: web::Data<Database>,
    form: web::Bytes,
) -> HttpResponse {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    // The form's hidden `id` field wins over the path when both are present.
    let Some(id) = form_helpers::parse_post_id(&parsed, "id").or_else(|| path_id.parse::<u64>().ok()) else {
        return not_found();
    };
    let fields = admin_helpers::post_fields_from_form(&parsed);

    match admin_helpers::update_post(&db, id, &fields) {
        Ok(post) => redirect(&post.permalink()),
        Err(HelperError::RedbDatabase(DbError::Validation(msg))) => {
            let mut ctx = Context::new();
            ctx.insert("post_id", &id);
            ctx.insert("y", &fields);
            ctx.insert("error", &msg);
            render_with(&tera, "admin/edit.html", &ctx, StatusCode::BAD_REQUEST, HTML)
        }
        Err(e) => error_response(&format!("Failed to update post {}", id), e),
    }
}

async fn show_settings(
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
) -> HttpResponse {
    let settings = match public_helpers::fetch_settings(&pool) {
        Ok(settings) => settings,
        Err(e) => return error_response("Failed to load blog settings", e),
    };

    let mut ctx = Context::new();
    ctx.insert("settings", &settings);
    take_notification(&session, &mut ctx);
    render(&tera, "admin/settings.html", &ctx)
}

async fn save_settings(
    session: Session,
    pool: web::Data<DbPool>,
    form: web::Bytes,
) -> HttpResponse {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };

    match admin_helpers::settings_update_from_form(&parsed) {
        Ok(changes) => match admin_helpers::update_settings(&pool, &changes) {
            Ok(_) => set_notification(&session, "Settings saved.", "success"),
            Err(e) => {
                log::error!("Failed to update blog settings: {}", e);
                set_notification(&session, "Failed to save settings.", "error");
            }
        },
        Err(msg) => set_notification(&session, &msg, "error"),
    }
    redirect(SETTINGS_URL)
}

async fn show_login_form(
    session: Session,
    tera: web::Data<Tera>,
    query: web::Query<LoginQuery>,
) -> HttpResponse {
    let destination = safe_destination(query.continue_to.as_deref());

    if CurrentUser::from_session(&session).map_or(false, |user| user.is_admin()) {
        return redirect(&destination);
    }

    let mut ctx = Context::new();
    ctx.insert("continue_to", &destination);
    if let Ok(Some(error)) = session.get::<String>("error") {
        ctx.insert("error", &error);
        session.remove("error");
    }
    render(&tera, "admin/login.html", &ctx)
}

async fn handle_login(
    session: Session,
    pool: web::Data<DbPool>,
    form: web::Bytes,
) -> HttpResponse {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let username = parsed.get("username").map_or("", |s| s.trim());
    let password = parsed.get("password").map_or("", |s| s.as_str());
    let destination = safe_destination(parsed.get("continue").map(String::as_str));

    match admin_helpers::verify_credentials(&pool, username, password) {
        Some((username, role)) => {
            session.renew();
            if let Err(e) = session
                .insert("username", &username)
                .and_then(|_| session.insert("role", &role))
            {
                log::error!("Failed to write login session for '{}': {}", username, e);
                return HttpResponse::InternalServerError().body("Internal Server Error");
            }
            if let Err(e) = admin_helpers::record_login(&pool, &username) {
                log::warn!("Could not record last login time for '{}': {}", username, e);
            }
            log::info!("User '{}' logged in as {}", username, role);
            redirect(&destination)
        }
        None => {
            log::warn!("Failed login attempt for '{}'", username);
            if let Err(e) = session.insert("error", "Invalid credentials or account suspended.") {
                log::error!("Failed to store login error in session: {}", e);
            }
            redirect(&login_url(&destination))
        }
    }
}

async fn handle_logout(session: Session) -> HttpResponse {
    session.purge();
    redirect("/blog/")
}
