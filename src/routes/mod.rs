use actix_web::{guard, web, Route};

pub mod admin;
pub mod public;

#[cfg(test)]
mod tests;

/// A route answering GET, and HEAD the same way.
pub fn read_route() -> Route {
    web::route().guard(guard::Any(guard::Get()).or(guard::Head()))
}

/// The whole URL table. Patterns are tried in declaration order; anything
/// left over gets the 404 page.
pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.route("/blog", read_route().to(public::blog_redirect))
        .route("/blog/", read_route().to(public::blog_index))
        .route("/blog/posts/{id:\\d+}", read_route().to(public::blog_post))
        .route("/blog/posts/{id:\\d+}/", read_route().to(public::blog_post_redirect))
        .route("/blog/atom.xml", read_route().to(public::atom_feed))
        .configure(admin::config_admin)
        .configure(admin::config_login)
        .route("/", read_route().to(public::root_redirect))
        .default_service(web::to(public::not_found_page));
}
