use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use html_escape::{encode_double_quoted_attribute, encode_text};
use shared_types::User;

use crate::auth::{current_user, AFTER_LOGIN_PATH};
use crate::error::ApiResult;
use crate::AppState;

/// Landing page. Logged-in users go straight to the dashboard.
pub async fn landing(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    if current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to(AFTER_LOGIN_PATH).into_response());
    }

    Ok(Html(render_landing()).into_response())
}

/// Protected page; `require_login` has already attached the user.
pub async fn dashboard(Extension(user): Extension<User>) -> Html<String> {
    Html(render_dashboard(&user))
}

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        encode_text(title),
        body
    )
}

fn render_landing() -> String {
    page(
        "Welcome",
        "<h1>Welcome</h1>\n<p><a href=\"/auth/google\">Sign in with Google</a></p>",
    )
}

fn render_dashboard(user: &User) -> String {
    let avatar = user
        .image_url
        .as_deref()
        .map(|url| {
            format!(
                "<img src=\"{}\" alt=\"avatar\" width=\"96\" height=\"96\">\n",
                encode_double_quoted_attribute(url)
            )
        })
        .unwrap_or_default();

    let body = format!(
        "<h1>Dashboard</h1>\n{}<p>Signed in as <strong>{}</strong></p>\n\
         <p>{}</p>\n<p><a href=\"/logout\">Log out</a></p>",
        avatar,
        encode_text(&user.display_name),
        encode_text(&user.email),
    );

    page("Dashboard", &body)
}
