use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
            MessageResponse, PublicUser, RegisterRequest, UserResponse,
        },
        jwt::JwtKeys,
        password::{check_password_rules, hash_password, verify_password},
    },
    error::{AppError, AppResult},
    state::AppState,
    store::NewUser,
    validation::{is_valid_email, is_valid_pan},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgotpass", post(forgot_password))
        .route("/change-pass", post(change_password))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    payload.email = payload.email.trim().to_lowercase();
    payload.pannum = payload.pannum.trim().to_string();

    let fields = [
        &payload.fname,
        &payload.lname,
        &payload.email,
        &payload.phone,
        &payload.pannum,
        &payload.pass,
    ];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(AppError::validation("All fields are required"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    if !is_valid_pan(&payload.pannum) {
        return Err(AppError::validation(format!(
            "Invalid PAN Card Number: {}",
            payload.pannum
        )));
    }
    check_password_rules(&payload.pass)?;

    if state
        .store
        .find_user_by_email_or_pan(&payload.email, &payload.pannum)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email or pan already registered");
        return Err(AppError::conflict("Email or PAN card number already exists"));
    }

    let password_hash = hash_password(&payload.pass)?;
    let user = state
        .store
        .insert_user(NewUser {
            first_name: payload.fname.trim().to_string(),
            last_name: payload.lname.trim().to_string(),
            email: payload.email,
            phone: payload.phone.trim().to_string(),
            pan: payload.pannum,
            password_hash,
            is_admin: false,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User registered successfully",
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = payload.email.trim().to_lowercase();

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::not_found("User not found"));
    };

    if !verify_password(&payload.pass, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::validation("Incorrect password"));
    }

    let token = JwtKeys::from_ref(&state).sign(&user)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        user: PublicUser::from(&user),
    }))
}

/// Identity check before a password reset: the PAN must belong to the
/// account holding `email`.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<UserResponse>> {
    let email = payload.email.trim().to_lowercase();
    let pan = payload.pan.trim();

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !is_valid_pan(pan) {
        return Err(AppError::validation(format!("Invalid PAN Card Number: {pan}")));
    }
    if user.pan != pan {
        warn!(user_id = %user.id, "pan mismatch on password reset");
        return Err(AppError::validation("PAN number is incorrect"));
    }

    Ok(Json(UserResponse {
        message: "Details verified",
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    check_password_rules(&payload.newpass)?;
    let hash = hash_password(&payload.newpass)?;

    if !state.store.update_password(payload.user_id, &hash).await? {
        return Err(AppError::not_found("User not found"));
    }

    info!(user_id = %payload.user_id, "password changed");
    Ok(Json(MessageResponse {
        message: "Password change successful",
    }))
}
