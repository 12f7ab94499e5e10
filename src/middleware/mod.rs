use actix_web::{
    body::EitherBody,
    dev::{self, forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error, FromRequest, HttpRequest, HttpResponse,
};
use actix_session::{Session, SessionExt};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use serde::Serialize;
use std::future::{ready, Ready as StdReady};
use url::form_urlencoded;
use crate::models::ROLE_ADMIN;

pub const LOGIN_PATH: &str = "/admin/login";

const FORBIDDEN_PAGE: &str = "<html><title>403 - Forbidden</title><body>403 - forbidden</body></html>";

/// The identity stored in the session by the login handler.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub username: String,
    pub role: String,
}

impl CurrentUser {
    pub fn from_session(session: &Session) -> Option<Self> {
        match (session.get::<String>("username"), session.get::<String>("role")) {
            (Ok(Some(username)), Ok(Some(role))) => Some(CurrentUser { username, role }),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        match CurrentUser::from_session(&req.get_session()) {
            Some(user) => ready(Ok(user)),
            None => ready(Err(actix_web::error::ErrorUnauthorized("Not logged in."))),
        }
    }
}

/// Builds the login URL that sends the user back to `destination` afterwards.
pub fn login_url(destination: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("continue", destination)
        .finish();
    format!("{}?{}", LOGIN_PATH, query)
}

pub fn forbidden() -> HttpResponse {
    HttpResponse::Forbidden()
        .content_type("text/html; charset=utf-8")
        .body(FORBIDDEN_PAGE)
}

enum GateDecision {
    Allow,
    Login(String),
    Deny,
}

fn decide(user: Option<&CurrentUser>, method: &Method, uri: &str) -> GateDecision {
    match user {
        None if method == Method::GET || method == Method::HEAD => GateDecision::Login(login_url(uri)),
        None => GateDecision::Deny,
        Some(user) if !user.is_admin() => GateDecision::Deny,
        Some(_) => GateDecision::Allow,
    }
}

/// Admin-only access. Anonymous reads are sent to the login page; anything
/// else without the admin role is answered with 403.
pub struct AdminGate;

impl<S, B> Transform<S, ServiceRequest> for AdminGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminGateMiddleware { service })
    }
}

pub struct AdminGateMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AdminGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user = CurrentUser::from_session(&req.get_session());
        let uri = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());

        match decide(user.as_ref(), req.method(), &uri) {
            GateDecision::Allow => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_left_body())
                })
            }
            GateDecision::Login(location) => Box::pin(async move {
                let (http_req, _payload) = req.into_parts();
                let res = HttpResponse::Found()
                    .append_header(("location", location))
                    .finish()
                    .map_into_right_body();
                Ok(ServiceResponse::new(http_req, res))
            }),
            GateDecision::Deny => {
                match &user {
                    Some(user) => log::warn!("User '{}' denied access to {}", user.username, uri),
                    None => log::warn!("Anonymous {} to {} rejected", req.method(), uri),
                }
                Box::pin(async move {
                    let (http_req, _payload) = req.into_parts();
                    let res = forbidden().map_into_right_body();
                    Ok(ServiceResponse::new(http_req, res))
                })
            }
        }
    }
}
