use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    models::CurrentUser,
    services::auth_service::{self, FieldErrors},
};

use super::{field_errors, unauthorized};

fn is_valid_email(email: &str) -> bool {
    let re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    re.is_match(email)
}

// ---------------- LOGIN ----------------

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

// POST /auth/login
pub async fn post_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Response {
    let email = body.email.trim().to_string();
    let password = body.password.trim().to_string();

    let mut errs = FieldErrors::new();

    if email.is_empty() {
        errs.insert("email".into(), "Email is required.".into());
    } else if !is_valid_email(&email) {
        errs.insert("email".into(), "Invalid email.".into());
    }

    if password.is_empty() {
        errs.insert("password".into(), "Password is required.".into());
    }

    if !errs.is_empty() {
        return field_errors(errs);
    }

    let user = match auth_service::login_user(&state, &email, &password).await {
        Ok(u) => u,
        Err(errs) => return field_errors(errs),
    };

    let token = match auth_service::make_jwt_with_days(&state, &user.id, 7) {
        Ok(t) => t,
        Err(e) => {
            errs.insert("_form".into(), format!("Auth error: {e}"));
            return field_errors(errs);
        }
    };

    let jar = jar.add(auth_service::auth_cookie(&state, token));

    (
        jar,
        Json(json!({
            "id": user.id.to_hex(),
            "email": user.email,
            "username": user.username,
        })),
    )
        .into_response()
}

// ---------------- REGISTER ----------------

#[derive(Deserialize)]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
}

// POST /auth/register
pub async fn post_register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterBody>,
) -> Response {
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_string();
    let password = body.password.trim().to_string();

    let mut errs = FieldErrors::new();

    if username.is_empty() {
        errs.insert("username".into(), "Username is required.".into());
    } else if username.len() < 2 {
        errs.insert("username".into(), "Username must be at least 2 characters.".into());
    }

    if email.is_empty() {
        errs.insert("email".into(), "Email is required.".into());
    } else if !is_valid_email(&email) {
        errs.insert("email".into(), "Invalid email.".into());
    }

    if password.is_empty() {
        errs.insert("password".into(), "Password is required.".into());
    } else if password.len() < 6 {
        errs.insert("password".into(), "Password must be at least 6 characters.".into());
    }

    if !errs.is_empty() {
        return field_errors(errs);
    }

    let user_id = match auth_service::register_user(&state, &username, &email, &password).await {
        Ok(id) => id,
        Err(errs) => return field_errors(errs),
    };

    let token = match auth_service::make_jwt_with_days(&state, &user_id, 7) {
        Ok(t) => t,
        Err(e) => {
            errs.insert("_form".into(), format!("Auth error: {e}"));
            return field_errors(errs);
        }
    };

    let jar = jar.add(auth_service::auth_cookie(&state, token));

    (
        jar,
        (
            StatusCode::CREATED,
            Json(json!({
                "id": user_id.to_hex(),
                "email": email,
                "username": username,
            })),
        ),
    )
        .into_response()
}

// ---------------- LOGOUT / ME ----------------

// POST /auth/logout
pub async fn post_logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(auth_service::clear_auth_cookie(&state));
    (jar, Json(json!({ "ok": true })))
}

// GET /auth/me
pub async fn get_me(user: Option<Extension<CurrentUser>>) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    Json(json!({
        "id": u.id.to_hex(),
        "email": u.email,
        "username": u.username,
    }))
    .into_response()
}
