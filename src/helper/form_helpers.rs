use actix_web::{web, HttpResponse};
use std::collections::HashMap;
use url::form_urlencoded;

/// Parses URL-encoded form data from bytes. Invalid UTF-8 is answered with 400.
pub fn parse_form(form_bytes: &web::Bytes) -> Result<HashMap<String, String>, HttpResponse> {
    let body = match std::str::from_utf8(form_bytes) {
        Ok(s) => s,
        Err(_) => return Err(HttpResponse::BadRequest().body("Invalid UTF-8 in request body.")),
    };
    Ok(form_urlencoded::parse(body.as_bytes()).into_owned().collect())
}

/// Reads a numeric post id from a form field, ignoring blanks and junk.
pub fn parse_post_id(parsed: &HashMap<String, String>, key: &str) -> Option<u64> {
    parsed.get(key).and_then(|id| id.trim().parse::<u64>().ok())
}
