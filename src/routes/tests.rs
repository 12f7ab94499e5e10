use crate::models::db_operations::{posts_db_operations, settings_db_operations};
use crate::models::{PostFields, SettingsUpdate, ROLE_ADMIN, ROLE_AUTHOR};
use crate::routes::config_app;
use crate::setup::db_setup;
use crate::{sqlite_manager, DbPool};
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use r2d2::Pool;
use redb::Database;
use rusqlite::params;
use tempfile::TempDir;
use tera::Tera;

struct TestEnv {
    _tmp: TempDir,
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
    tera: web::Data<Tera>,
    key: Key,
}

fn test_env() -> TestEnv {
    let tmp = TempDir::new().unwrap();

    let db = Database::create(tmp.path().join("posts.db")).unwrap();
    db_setup::setup_posts_db(&db).unwrap();

    let site_path = tmp.path().join("site.db");
    let pool = Pool::builder().max_size(4).build(sqlite_manager(&site_path)).unwrap();
    {
        let mut conn = pool.get().unwrap();
        db_setup::setup_site_db(&mut conn).unwrap();
        // Low bcrypt cost keeps the suite fast; verification does not care.
        for (username, role) in [("admin", ROLE_ADMIN), ("author", ROLE_AUTHOR)] {
            let hashed = bcrypt::hash("password", 4).unwrap();
            conn.execute(
                "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)",
                params![username, hashed, role],
            )
            .unwrap();
        }
    }

    let tera = Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*")).unwrap();

    TestEnv {
        _tmp: tmp,
        db: web::Data::new(db),
        pool: web::Data::new(pool),
        tera: web::Data::new(tera),
        key: Key::generate(),
    }
}

fn post_fields(title: &str) -> PostFields {
    PostFields {
        title: title.to_string(),
        body: format!("<p>Body of {}</p>", title),
        author_name: "Alice".to_string(),
        author_url: None,
    }
}

macro_rules! init_app {
    ($env:expr) => {
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), $env.key.clone())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data($env.tera.clone())
                .app_data($env.db.clone())
                .app_data($env.pool.clone())
                .configure(config_app),
        )
        .await
    };
}

macro_rules! login {
    ($app:expr, $username:expr) => {{
        let req = test::TestRequest::post()
            .uri("/admin/login")
            .set_form(&[("username", $username), ("password", "password"), ("continue", "/admin/blog/")])
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/admin/blog/");
        let cookie: Cookie<'static> = resp
            .response()
            .cookies()
            .next()
            .expect("login should set a session cookie")
            .into_owned();
        cookie
    }};
}

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn body_text(bytes: &web::Bytes) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[actix_web::test]
async fn test_redirects() {
    let env = test_env();
    let app = init_app!(env);

    for (path, expected) in [
        ("/", "/blog/"),
        ("/blog", "/blog/"),
        ("/blog/posts/42/", "/blog/posts/42"),
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(path).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{}", path);
        assert_eq!(location(&resp), expected, "{}", path);
    }
}

#[actix_web::test]
async fn test_unknown_paths_get_404_page() {
    let env = test_env();
    let app = init_app!(env);

    for path in ["/nope", "/blog/posts/abc", "/admin/blog/unknown", "/admin/blog"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(path).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", path);
        let body = body_text(&test::read_body(resp).await);
        assert!(body.contains("404 - page not found"), "{}", path);
    }
}

#[actix_web::test]
async fn test_blog_index_respects_posts_per_page() {
    let env = test_env();
    posts_db_operations::create_post(&env.db, &post_fields("Oldest entry")).unwrap();
    posts_db_operations::create_post(&env.db, &post_fields("Middle entry")).unwrap();
    posts_db_operations::create_post(&env.db, &post_fields("Newest entry")).unwrap();
    {
        let conn = env.pool.get().unwrap();
        settings_db_operations::update_settings(
            &conn,
            &SettingsUpdate { posts_per_page: Some(2), ..Default::default() },
        )
        .unwrap();
    }
    let app = init_app!(env);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/blog/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Newest entry"));
    assert!(body.contains("Middle entry"));
    assert!(!body.contains("Oldest entry"));
    assert!(body.find("Newest entry") < body.find("Middle entry"));
}

#[actix_web::test]
async fn test_head_is_served_like_get() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::HEAD)
        .uri("/blog/")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_single_post_page() {
    let env = test_env();
    let post = posts_db_operations::create_post(&env.db, &post_fields("Permalink test")).unwrap();
    let app = init_app!(env);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&post.permalink()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Permalink test"));
    assert!(body.contains("<p>Body of Permalink test</p>"));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/blog/posts/999").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_atom_feed() {
    let env = test_env();
    let app = init_app!(env);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/blog/atom.xml").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/atom+xml")
    );
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("<feed xmlns=\"http://www.w3.org/2005/Atom\">"));
    assert!(body.contains("<updated>0001-01-01T00:00:00Z</updated>"));

    let post = posts_db_operations::create_post(&env.db, &post_fields("Feed & friends")).unwrap();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/blog/atom.xml").to_request()).await;
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Feed &amp; friends"));
    assert!(!body.contains("0001-01-01T00:00:00Z"));
    assert!(body.contains(&format!("<updated>{}</updated>", post.updated.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))));
}

#[actix_web::test]
async fn test_anonymous_admin_read_redirects_to_login() {
    let env = test_env();
    let app = init_app!(env);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/admin/blog/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = location(&resp);
    assert!(location.starts_with("/admin/login?"));
    assert!(location.contains("continue=%2Fadmin%2Fblog%2F"));
}

#[actix_web::test]
async fn test_anonymous_admin_write_is_forbidden() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/admin/blog/new/")
        .set_form(&[("title", "Hello"), ("body", "World"), ("authorName", "Alice")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(posts_db_operations::read_latest_posts(&env.db, None).unwrap().is_empty());
}

#[actix_web::test]
async fn test_non_admin_is_forbidden() {
    let env = test_env();
    let app = init_app!(env);
    let cookie = login!(app, "author");

    let req = test::TestRequest::get().uri("/admin/blog/").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_text(&test::read_body(resp).await);
    assert!(!body.contains("<table"));
}

#[actix_web::test]
async fn test_wrong_password_returns_to_login() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/admin/login")
        .set_form(&[("username", "admin"), ("password", "nope"), ("continue", "/admin/blog/new/")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin/login?continue=%2Fadmin%2Fblog%2Fnew%2F");
}

#[actix_web::test]
async fn test_admin_list_shows_posts() {
    let env = test_env();
    posts_db_operations::create_post(&env.db, &post_fields("Listed post")).unwrap();
    let app = init_app!(env);
    let cookie = login!(app, "admin");

    let req = test::TestRequest::get().uri("/admin/blog/").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Listed post"));
    assert!(body.contains("/admin/blog/edit/1"));
}

#[actix_web::test]
async fn test_admin_creates_post() {
    let env = test_env();
    let app = init_app!(env);
    let cookie = login!(app, "admin");

    let req = test::TestRequest::get().uri("/admin/blog/new/").cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/admin/blog/new/")
        .cookie(cookie)
        .set_form(&[("title", "Hello"), ("body", "World"), ("authorName", "Alice"), ("authorUrl", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let posts = posts_db_operations::read_latest_posts(&env.db, None).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Hello");
    assert_eq!(posts[0].body, "World");
    assert_eq!(posts[0].author_name, "Alice");
    assert_eq!(location(&resp), format!("/blog/posts/{}", posts[0].id));
}

#[actix_web::test]
async fn test_admin_create_rejects_missing_title() {
    let env = test_env();
    let app = init_app!(env);
    let cookie = login!(app, "admin");

    let req = test::TestRequest::post()
        .uri("/admin/blog/new/")
        .cookie(cookie)
        .set_form(&[("title", ""), ("body", "World"), ("authorName", "Alice")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Title is required."));
    assert!(posts_db_operations::read_latest_posts(&env.db, None).unwrap().is_empty());
}

#[actix_web::test]
async fn test_admin_edit_unknown_post_is_404() {
    let env = test_env();
    let app = init_app!(env);
    let cookie = login!(app, "admin");

    let req = test::TestRequest::get().uri("/admin/blog/edit/999").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_text(&test::read_body(resp).await);
    assert_eq!(body, "<html><title>404 - Page Not Found</title><body>404 - page not found</body></html>");
}

#[actix_web::test]
async fn test_admin_edits_post() {
    let env = test_env();
    let post = posts_db_operations::create_post(&env.db, &post_fields("Before")).unwrap();
    let app = init_app!(env);
    let cookie = login!(app, "admin");

    let edit_url = format!("/admin/blog/edit/{}", post.id);
    let req = test::TestRequest::get().uri(&edit_url).cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("value=\"Before\""));

    let id = post.id.to_string();
    let req = test::TestRequest::post()
        .uri(&edit_url)
        .cookie(cookie)
        .set_form(&[
            ("id", id.as_str()),
            ("title", "After"),
            ("body", "New body"),
            ("authorName", "Bob"),
            ("authorUrl", "https://bob.example/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), post.permalink());

    let stored = posts_db_operations::read_post(&env.db, post.id).unwrap().unwrap();
    assert_eq!(stored.title, "After");
    assert_eq!(stored.author_name, "Bob");
    assert_eq!(stored.author_url.as_deref(), Some("https://bob.example/"));
    assert_eq!(stored.published, post.published);
}

#[actix_web::test]
async fn test_admin_saves_settings() {
    let env = test_env();
    let app = init_app!(env);
    let cookie = login!(app, "admin");

    let req = test::TestRequest::post()
        .uri("/admin/blog/settings/")
        .cookie(cookie.clone())
        .set_form(&[("blogTitle", "Rust Notes"), ("postsPerPage", "3"), ("disqusEnabled", "on"), ("disqusBlogId", "rustnotes")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin/blog/settings/");

    let conn = env.pool.get().unwrap();
    let settings = settings_db_operations::get_or_create_settings(&conn).unwrap();
    assert_eq!(settings.blog_title, "Rust Notes");
    assert_eq!(settings.posts_per_page, 3);
    assert!(settings.disqus_enabled);
    assert_eq!(settings.disqus_blog_id.as_deref(), Some("rustnotes"));
    assert_eq!(settings_db_operations::count_settings_rows(&conn).unwrap(), 1);
}

#[actix_web::test]
async fn test_oversized_ids_get_404_page() {
    let env = test_env();
    let app = init_app!(env);
    let cookie = login!(app, "admin");

    for path in ["/blog/posts/99999999999999999999999", "/admin/blog/edit/99999999999999999999999"] {
        let req = test::TestRequest::get().uri(path).cookie(cookie.clone()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", path);
        let body = body_text(&test::read_body(resp).await);
        assert!(body.contains("404 - page not found"), "{}", path);
    }

    let req = test::TestRequest::post()
        .uri("/admin/blog/edit/99999999999999999999999")
        .cookie(cookie)
        .set_form(&[("title", "T"), ("body", "B"), ("authorName", "A")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_edit_unknown_post_with_blank_title_is_404() {
    let env = test_env();
    let app = init_app!(env);
    let cookie = login!(app, "admin");

    let req = test::TestRequest::post()
        .uri("/admin/blog/edit/999")
        .cookie(cookie)
        .set_form(&[("id", "999"), ("title", ""), ("body", "B"), ("authorName", "A")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("404 - page not found"));
}
