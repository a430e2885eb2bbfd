use crate::error::{HttpApiError, bad_request, not_found, unauthorized};
use crate::extractors::AuthUser;
use crate::responses;
use crate::schemas::{
    ChangePasswordInput, LoginInput, OtpLoginInput, RegisterInput, SendOtpInput,
};
use crate::state::AppState;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use auth::{hash_password, sha256_hex, sign_access, sign_refresh, verify_password};
use chrono::{Duration, Utc};
use db::sessions::{get_refresh_by_jti, insert_refresh, revoke_refresh, take_otp, upsert_otp};
use db::users::{NewUser, UserRow, find_by_id, find_by_phone, insert_user, mark_verified, set_password};
use serde_json::json;
use validator::Validate;

const ACCESS_COOKIE: &str = "access_token";
const REFRESH_COOKIE: &str = "refresh_token";

/// Signs an access/refresh pair and stores the refresh fingerprint for
/// rotation.
async fn issue_tokens(
    state: &AppState,
    user: &UserRow,
) -> Result<(String, String), HttpApiError> {
    let role = user.role.map(|r| r.as_str());
    let access = sign_access(
        &state.jwt,
        user.id,
        user.user_type.as_str(),
        role,
        state.access_ttl,
    )
    .map_err(|_| HttpApiError::Auth)?;
    let (refresh_token, claims) = sign_refresh(
        &state.jwt,
        user.id,
        user.user_type.as_str(),
        role,
        state.refresh_ttl,
    )
    .map_err(|_| HttpApiError::Auth)?;

    let token_hash = format!("sha256:{}", sha256_hex(&refresh_token));
    let expires_at = Utc::now() + Duration::seconds(state.refresh_ttl);
    insert_refresh(&state.db, user.id, &claims.jti, &token_hash, expires_at).await?;

    Ok((access, refresh_token))
}

fn refresh_cookie(state: &AppState, value: String) -> actix_web::cookie::Cookie<'static> {
    actix_web::cookie::Cookie::build(REFRESH_COOKIE, value)
        .domain(state.cookie_domain.clone())
        .secure(state.cookie_secure)
        .http_only(true)
        .path("/")
        .finish()
}

fn auth_payload(user: &UserRow, access: &str, refresh_token: &str) -> serde_json::Value {
    json!({
        "user": user,
        "tokens": { "access": access, "refresh": refresh_token }
    })
}

#[post("/auth/register")]
pub async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    if find_by_phone(&data.db, &payload.phone).await?.is_some() {
        return Err(bad_request("phone number already registered"));
    }

    let password_hash = match &payload.password {
        Some(raw) => Some(hash_password(raw).map_err(|_| HttpApiError::Auth)?),
        None => None,
    };

    // The phone pre-check above is advisory; the UNIQUE constraint decides
    // under concurrent registrations.
    let user = insert_user(
        &data.db,
        &NewUser {
            phone: payload.phone,
            name: payload.name,
            user_type: payload.user_type,
            role: payload.role,
            blood_group: payload.blood_group,
            hospital_name: payload.hospital_name,
            hospital_id: payload.hospital_id,
            email: payload.email,
            address: payload.address,
            password_hash,
        },
    )
    .await
    .map_err(|e| {
        if e.is_unique_violation() {
            bad_request("phone number already registered")
        } else {
            HttpApiError::Db(e)
        }
    })?;

    tracing::info!(user_id = %user.id, user_type = %user.user_type.as_str(), "registered");

    let (access, refresh_token) = issue_tokens(&data, &user).await?;
    let cookie = refresh_cookie(&data, refresh_token.clone());
    let mut resp = responses::created("registered", auth_payload(&user, &access, &refresh_token));
    resp.add_cookie(&cookie).ok();
    Ok(resp)
}

#[post("/auth/login")]
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let user = find_by_phone(&data.db, &payload.phone)
        .await?
        .ok_or_else(unauthorized)?;
    let hash = user.password_hash.as_deref().ok_or_else(unauthorized)?;
    if !verify_password(&payload.password, hash) {
        return Err(unauthorized());
    }

    let (access, refresh_token) = issue_tokens(&data, &user).await?;
    let cookie = refresh_cookie(&data, refresh_token.clone());
    let mut resp = responses::ok("logged in", auth_payload(&user, &access, &refresh_token));
    resp.add_cookie(&cookie).ok();
    Ok(resp)
}

/// Issues a one-time code for a registered phone. Only the sha256 fingerprint
/// is stored; the plain code goes to the delivery channel (logged at debug
/// level until an SMS gateway is wired up) and is never echoed in the
/// response.
#[post("/auth/send-otp")]
pub async fn send_otp(
    data: web::Data<AppState>,
    payload: web::Json<SendOtpInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    if find_by_phone(&data.db, &payload.phone).await?.is_none() {
        return Err(not_found());
    }

    let code = auth::new_otp_code();
    let expires_at = Utc::now() + Duration::seconds(data.otp_ttl);
    upsert_otp(&data.db, &payload.phone, &sha256_hex(&code), expires_at).await?;

    tracing::debug!(phone = %payload.phone, code = %code, "otp issued");

    Ok(responses::ok(
        "verification code sent",
        json!({ "expires_in": data.otp_ttl }),
    ))
}

#[post("/auth/login-otp")]
pub async fn login_otp(
    data: web::Data<AppState>,
    payload: web::Json<OtpLoginInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    // Consuming the row first makes every code single-use, valid or not.
    let row = take_otp(&data.db, &payload.phone)
        .await?
        .ok_or_else(unauthorized)?;
    if row.expires_at <= Utc::now() || row.code_hash != sha256_hex(&payload.otp) {
        return Err(unauthorized());
    }

    let user = find_by_phone(&data.db, &payload.phone)
        .await?
        .ok_or_else(unauthorized)?;

    // A correct code proves phone ownership.
    if !user.verified {
        mark_verified(&data.db, user.id).await?;
    }

    let (access, refresh_token) = issue_tokens(&data, &user).await?;
    let cookie = refresh_cookie(&data, refresh_token.clone());
    let mut resp = responses::ok("logged in", auth_payload(&user, &access, &refresh_token));
    resp.add_cookie(&cookie).ok();
    Ok(resp)
}

#[post("/auth/refresh")]
pub async fn refresh(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    let refresh_cookie_in = req.cookie(REFRESH_COOKIE).ok_or(HttpApiError::Auth)?;
    let token = refresh_cookie_in.value().to_string();
    let claims = auth::verify(&data.jwt, &token).map_err(|_| HttpApiError::Auth)?;

    let row = get_refresh_by_jti(&data.db, &claims.jti)
        .await?
        .ok_or(HttpApiError::Auth)?;
    if row.revoked {
        tracing::warn!(jti = %claims.jti, "revoked refresh token presented");
        return Err(HttpApiError::Auth);
    }
    let given_hash = format!("sha256:{}", sha256_hex(&token));
    if given_hash != row.token_hash {
        return Err(HttpApiError::Auth);
    }

    // Rotation: the presented token is dead from here on.
    revoke_refresh(&data.db, &claims.jti).await?;

    let access = sign_access(
        &data.jwt,
        claims.sub,
        &claims.user_type,
        claims.role.as_deref(),
        data.access_ttl,
    )
    .map_err(|_| HttpApiError::Auth)?;
    let (refresh_new, claims_new) = sign_refresh(
        &data.jwt,
        claims.sub,
        &claims.user_type,
        claims.role.as_deref(),
        data.refresh_ttl,
    )
    .map_err(|_| HttpApiError::Auth)?;

    let token_hash = format!("sha256:{}", sha256_hex(&refresh_new));
    let expires_at = Utc::now() + Duration::seconds(data.refresh_ttl);
    insert_refresh(&data.db, claims.sub, &claims_new.jti, &token_hash, expires_at).await?;

    let cookie = refresh_cookie(&data, refresh_new);
    let mut resp = responses::ok("token refreshed", json!({ "access_token": access }));
    resp.add_cookie(&cookie).ok();
    Ok(resp)
}

#[post("/auth/change-password")]
pub async fn change_password(
    user: AuthUser,
    data: web::Data<AppState>,
    payload: web::Json<ChangePasswordInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let row = find_by_id(&data.db, user.user_id)
        .await?
        .ok_or_else(unauthorized)?;

    if let Some(existing) = row.password_hash.as_deref() {
        let current = payload.current_password.as_deref().ok_or_else(unauthorized)?;
        if !verify_password(current, existing) {
            return Err(unauthorized());
        }
    }

    let hash = hash_password(&payload.new_password).map_err(|_| HttpApiError::Auth)?;
    set_password(&data.db, user.user_id, &hash).await?;
    Ok(responses::ok("password changed", json!({})))
}

#[post("/auth/logout")]
pub async fn logout(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    if let Some(c) = req.cookie(REFRESH_COOKIE) {
        if let Ok(claims) = auth::verify(&data.jwt, c.value()) {
            revoke_refresh(&data.db, &claims.jti).await?;
        }
    }
    let clear = |name: &'static str| {
        actix_web::cookie::Cookie::build(name, "")
            .path("/")
            .domain(data.cookie_domain.clone())
            .secure(data.cookie_secure)
            .http_only(true)
            .max_age(actix_web::cookie::time::Duration::seconds(0))
            .finish()
    };
    let mut resp = responses::ok("logged out", json!({}));
    resp.add_cookie(&clear(ACCESS_COOKIE)).ok();
    resp.add_cookie(&clear(REFRESH_COOKIE)).ok();
    Ok(resp)
}

#[get("/auth/me")]
pub async fn me(
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    let row = find_by_id(&data.db, user.user_id)
        .await?
        .ok_or_else(unauthorized)?;
    Ok(responses::ok("profile", row))
}
