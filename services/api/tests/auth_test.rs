use actix_web::test;
use api::create_app;
use api::state::AppState;
use auth::{JwtKeys, sha256_hex};
use chrono::{Duration, Utc};
use serde_json::json;
use std::env;

async fn test_db() -> Option<db::Db> {
    dotenvy::dotenv().ok();
    let url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()?;
    let db = db::connect(&url, 5).await.ok()?;
    db::migrate(&db).await.ok()?;
    Some(db)
}

fn test_state(db: db::Db) -> AppState {
    AppState {
        db,
        jwt: JwtKeys::from_secret("test_secret_key"),
        access_ttl: 3600,
        refresh_ttl: 60 * 60 * 24 * 7,
        otp_ttl: 300,
        cookie_domain: "localhost".into(),
        cookie_secure: false,
    }
}

fn unique_phone(prefix: &str) -> String {
    format!("{prefix}{:09}", Utc::now().timestamp_subsec_nanos())
}

#[actix_web::test]
async fn test_register_login_refresh_logout() {
    let Some(db) = test_db().await else {
        eprintln!("skipping: no DATABASE_URL configured");
        return;
    };
    let state = test_state(db);
    let app = test::init_service(create_app(state.clone())).await;

    let phone = unique_phone("91");
    let register_payload = json!({
        "phone": phone,
        "name": "Temuulen",
        "user_type": "individual",
        "role": "donor",
        "blood_group": "O+",
        "password": "supersecret"
    });

    // Register
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201, "register failed");
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    let access = body["data"]["tokens"]["access"].as_str().unwrap().to_string();
    assert!(access.starts_with("ey"));
    // Password hashes never leak.
    assert!(body["data"]["user"].get("password_hash").is_none());

    // Duplicate phone registers as a 400.
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);

    // The UNIQUE constraint backs that check when two registrations race
    // past the pre-check; the handler maps this violation to the same 400.
    let err = db::users::insert_user(
        &state.db,
        &db::users::NewUser {
            phone: phone.clone(),
            name: "Temuulen".into(),
            user_type: common::UserType::Individual,
            role: Some(common::UserRole::Donor),
            blood_group: None,
            hospital_name: None,
            hospital_id: None,
            email: None,
            address: None,
            password_hash: None,
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_unique_violation());

    // Wrong password
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "phone": phone, "password": "not-the-password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    // Login
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "phone": phone, "password": "supersecret" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "login failed");
    let body: serde_json::Value = test::read_body_json(resp).await;
    let refresh = body["data"]["tokens"]["refresh"].as_str().unwrap().to_string();

    // Refresh rotates
    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .cookie(
            actix_web::cookie::Cookie::build("refresh_token", refresh.clone())
                .path("/")
                .finish(),
        )
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "refresh failed");
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["data"]["access_token"].as_str().unwrap().starts_with("ey"));

    // The rotated-out token is dead.
    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .cookie(
            actix_web::cookie::Cookie::build("refresh_token", refresh.clone())
                .path("/")
                .finish(),
        )
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401, "revoked refresh token accepted");

    // /auth/me with bearer access token
    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(("Authorization", format!("Bearer {access}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["phone"], phone.as_str());

    // Logout
    let req = test::TestRequest::post().uri("/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn test_otp_login_flow() {
    let Some(db) = test_db().await else {
        eprintln!("skipping: no DATABASE_URL configured");
        return;
    };
    let state = test_state(db.clone());
    let app = test::init_service(create_app(state.clone())).await;

    let phone = unique_phone("92");
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({
            "phone": phone,
            "name": "Saraa",
            "user_type": "individual",
            "role": "seeker"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201);

    // Unregistered phone gets no code.
    let req = test::TestRequest::post()
        .uri("/auth/send-otp")
        .set_json(json!({ "phone": "80000000000" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);

    // Issue: the code never appears in the response body.
    let req = test::TestRequest::post()
        .uri("/auth/send-otp")
        .set_json(json!({ "phone": phone }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["data"].get("otp").is_none());
    assert!(body["data"].get("code").is_none());

    // Seed a known code directly, as the delivery channel would.
    let seed = |code: &str| {
        let hash = sha256_hex(code);
        (hash, Utc::now() + Duration::seconds(300))
    };
    let (hash, exp) = seed("654321");
    db::sessions::upsert_otp(&db, &phone, &hash, exp).await.unwrap();

    // Wrong code is rejected and consumes the outstanding code.
    let req = test::TestRequest::post()
        .uri("/auth/login-otp")
        .set_json(json!({ "phone": phone, "otp": "111111" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    // The right code after a failed attempt is also rejected (single use).
    let req = test::TestRequest::post()
        .uri("/auth/login-otp")
        .set_json(json!({ "phone": phone, "otp": "654321" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    // Fresh code logs in.
    let (hash, exp) = seed("654321");
    db::sessions::upsert_otp(&db, &phone, &hash, exp).await.unwrap();
    let req = test::TestRequest::post()
        .uri("/auth/login-otp")
        .set_json(json!({ "phone": phone, "otp": "654321" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "otp login failed");
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["data"]["tokens"]["access"].as_str().unwrap().starts_with("ey"));
    // Proving phone ownership flips the verified flag.
    assert_eq!(body["data"]["user"]["verified"], true);

    // Expired codes fail.
    let hash = sha256_hex("654321");
    db::sessions::upsert_otp(&db, &phone, &hash, Utc::now() - Duration::seconds(1))
        .await
        .unwrap();
    let req = test::TestRequest::post()
        .uri("/auth/login-otp")
        .set_json(json!({ "phone": phone, "otp": "654321" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}
