use crate::helper::HelperError;
use crate::models::db_operations::posts_db_operations::DbError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use tera::{Context, Tera};

pub const HTML: &str = "text/html; charset=utf-8";
pub const ATOM: &str = "application/atom+xml";

const NOT_FOUND_PAGE: &str = "<html><title>404 - Page Not Found</title><body>404 - page not found</body></html>";

pub fn not_found() -> HttpResponse {
    HttpResponse::NotFound().content_type(HTML).body(NOT_FOUND_PAGE)
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found().append_header(("location", location)).finish()
}

pub fn render(tera: &Tera, template: &str, ctx: &Context) -> HttpResponse {
    render_with(tera, template, ctx, StatusCode::OK, HTML)
}

pub fn render_with(
    tera: &Tera,
    template: &str,
    ctx: &Context,
    status: StatusCode,
    content_type: &str,
) -> HttpResponse {
    match tera.render(template, ctx) {
        Ok(rendered) => HttpResponse::build(status).content_type(content_type).body(rendered),
        Err(err) => {
            log::error!("Template rendering error in '{}': {:?}", template, err);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

/// Maps a store failure onto a response. Validation errors are handled by
/// the form handlers before they get here.
pub fn error_response(context: &str, err: HelperError) -> HttpResponse {
    match err {
        HelperError::RedbDatabase(DbError::NotFound(_)) => not_found(),
        HelperError::RedbDatabase(DbError::Validation(msg)) => {
            HttpResponse::BadRequest().content_type(HTML).body(msg)
        }
        other => {
            log::error!("{}: {}", context, other);
            HttpResponse::InternalServerError().body("Internal Server Error")
        }
    }
}
