use actix_web::test;
use api::create_app;
use api::state::AppState;
use auth::JwtKeys;
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

macro_rules! register {
    ($app:expr, $payload:expr $(,)?) => {{
        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json($payload)
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status().as_u16(), 201, "register failed");
        let body: serde_json::Value = test::read_body_json(resp).await;
        (
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
            body["data"]["tokens"]["access"].as_str().unwrap().to_string(),
        )
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

#[actix_web::test]
async fn test_request_lifecycle_end_to_end() {
    let Some(db) = test_db().await else {
        eprintln!("skipping: no DATABASE_URL configured");
        return;
    };
    let state = test_state(db);
    let app = test::init_service(create_app(state.clone())).await;

    let (_seeker_id, seeker_token) = register!(
        &app,
        json!({
            "phone": unique_phone("93"),
            "name": "Seeker",
            "user_type": "individual",
            "role": "seeker"
        }),
    );
    let (_donor_id, donor_token) = register!(
        &app,
        json!({
            "phone": unique_phone("94"),
            "name": "Donor O+",
            "user_type": "individual",
            "role": "donor",
            "blood_group": "O+"
        }),
    );
    let (_, wrong_donor_token) = register!(
        &app,
        json!({
            "phone": unique_phone("95"),
            "name": "Donor A-",
            "user_type": "individual",
            "role": "donor",
            "blood_group": "A-"
        }),
    );

    // A past deadline is rejected outright.
    let req = test::TestRequest::post()
        .uri("/requests")
        .insert_header(bearer(&seeker_token))
        .set_json(json!({
            "patient_name": "Patient",
            "blood_group": "O+",
            "units_needed": 2,
            "urgency": "critical",
            "hospital_name": "Central Hospital",
            "contact_number": "97611112222",
            "required_by": (Utc::now() - Duration::hours(1)).to_rfc3339()
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400, "past required_by accepted");

    // Unauthenticated creation is rejected.
    let req = test::TestRequest::post()
        .uri("/requests")
        .set_json(json!({
            "patient_name": "Patient",
            "blood_group": "O+",
            "units_needed": 2,
            "urgency": "critical",
            "hospital_name": "Central Hospital",
            "contact_number": "97611112222",
            "required_by": (Utc::now() + Duration::days(1)).to_rfc3339()
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    // Valid creation.
    let req = test::TestRequest::post()
        .uri("/requests")
        .insert_header(bearer(&seeker_token))
        .set_json(json!({
            "patient_name": "Patient",
            "blood_group": "O+",
            "units_needed": 2,
            "urgency": "critical",
            "hospital_name": "Central Hospital",
            "contact_number": "97611112222",
            "required_by": (Utc::now() + Duration::days(1)).to_rfc3339()
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let request_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "active");

    // Visible to a donor browsing nearby, hidden from its owner there.
    let req = test::TestRequest::get()
        .uri("/requests/nearby")
        .insert_header(bearer(&donor_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(
        body["data"].as_array().unwrap().iter().any(|r| r["id"] == request_id.as_str()),
        "donor does not see the open request"
    );
    let req = test::TestRequest::get()
        .uri("/requests/nearby")
        .insert_header(bearer(&seeker_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(
        body["data"].as_array().unwrap().iter().all(|r| r["id"] != request_id.as_str()),
        "owner sees their own request in nearby"
    );

    // Critical requests show up in the urgent feed.
    let req = test::TestRequest::get().uri("/requests/urgent").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"].as_array().unwrap().iter().any(|r| r["id"] == request_id.as_str()));

    // A stranger without a completed donation cannot fulfil it.
    let req = test::TestRequest::patch()
        .uri(&format!("/requests/{request_id}"))
        .insert_header(bearer(&donor_token))
        .set_json(json!({ "status": "fulfilled" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);

    // A no-change PATCH from a stranger is still forbidden, not a 200.
    let req = test::TestRequest::patch()
        .uri(&format!("/requests/{request_id}"))
        .insert_header(bearer(&donor_token))
        .set_json(json!({ "status": "active" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403, "stranger no-op status change allowed");

    // Donor accepts; a second accept is a conflict.
    let req = test::TestRequest::post()
        .uri(&format!("/requests/{request_id}/accept"))
        .insert_header(bearer(&donor_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201, "accept failed");
    let req = test::TestRequest::post()
        .uri(&format!("/requests/{request_id}/accept"))
        .insert_header(bearer(&donor_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 409, "duplicate accept not rejected");

    // Acceptance left a notification for the requester.
    let req = test::TestRequest::get()
        .uri("/notifications?unread=true")
        .insert_header(bearer(&seeker_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(!body["data"].as_array().unwrap().is_empty());

    // The accepted feed shows it for the donor.
    let req = test::TestRequest::get()
        .uri("/requests/accepted")
        .insert_header(bearer(&donor_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"].as_array().unwrap().iter().any(|r| r["id"] == request_id.as_str()));

    // Blood groups must match exactly.
    let donation_payload = |token_units: i32| {
        json!({
            "request_id": request_id,
            "hospital_name": "Central Hospital",
            "donation_date": (Utc::now() + Duration::hours(6)).to_rfc3339(),
            "units": token_units
        })
    };
    let req = test::TestRequest::post()
        .uri("/donations")
        .insert_header(bearer(&wrong_donor_token))
        .set_json(donation_payload(1))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400, "mismatched blood group accepted");

    // Seekers cannot schedule donations at all.
    let req = test::TestRequest::post()
        .uri("/donations")
        .insert_header(bearer(&seeker_token))
        .set_json(donation_payload(1))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);

    // Matching donor schedules.
    let req = test::TestRequest::post()
        .uri("/donations")
        .insert_header(bearer(&donor_token))
        .set_json(donation_payload(2))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201, "donation create failed");
    let body: serde_json::Value = test::read_body_json(resp).await;
    let donation_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "scheduled");

    // Completing cascades the request to fulfilled.
    let req = test::TestRequest::patch()
        .uri(&format!("/donations/{donation_id}"))
        .insert_header(bearer(&donor_token))
        .set_json(json!({ "status": "completed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "completion failed");

    let req = test::TestRequest::get()
        .uri(&format!("/requests/{request_id}"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "fulfilled");

    // Repeating the completion is a no-op success, not a second cascade.
    let req = test::TestRequest::patch()
        .uri(&format!("/donations/{donation_id}"))
        .insert_header(bearer(&donor_token))
        .set_json(json!({ "status": "completed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    // The donor got exactly one confirmation, even after the retry.
    let req = test::TestRequest::get()
        .uri("/notifications")
        .insert_header(bearer(&donor_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let confirmations = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| {
            n["notification_type"] == "donation_confirmed"
                && n["reference_id"] == donation_id.as_str()
        })
        .count();
    assert_eq!(confirmations, 1, "donation confirmation missing or duplicated");

    // Units counted exactly once.
    let req = test::TestRequest::get()
        .uri("/donations/stats/donor")
        .insert_header(bearer(&donor_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["completed_donations"], 1);
    assert_eq!(body["data"]["total_units"], 2);

    // Fulfilled requests leave the open feeds.
    let req = test::TestRequest::get().uri("/requests").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"].as_array().unwrap().iter().all(|r| r["id"] != request_id.as_str()));

    // Completed feed shows it for both sides.
    for token in [&seeker_token, &donor_token] {
        let req = test::TestRequest::get()
            .uri("/requests/completed")
            .insert_header(bearer(token))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"].as_array().unwrap().iter().any(|r| r["id"] == request_id.as_str()));
    }

    // Edits to a fulfilled request are frozen.
    let req = test::TestRequest::put()
        .uri(&format!("/requests/{request_id}"))
        .insert_header(bearer(&seeker_token))
        .set_json(json!({ "units_needed": 3 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 409);

    // A completed donation cannot be edited or deleted.
    let req = test::TestRequest::delete()
        .uri(&format!("/donations/{donation_id}"))
        .insert_header(bearer(&donor_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 409);
}

#[actix_web::test]
async fn test_expired_requests_are_filtered_not_served() {
    let Some(db) = test_db().await else {
        eprintln!("skipping: no DATABASE_URL configured");
        return;
    };
    let state = test_state(db.clone());
    let app = test::init_service(create_app(state.clone())).await;

    let (seeker_id, seeker_token) = register!(
        &app,
        json!({
            "phone": unique_phone("96"),
            "name": "Seeker",
            "user_type": "individual",
            "role": "seeker"
        }),
    );
    let (_, donor_token) = register!(
        &app,
        json!({
            "phone": unique_phone("97"),
            "name": "Donor",
            "user_type": "individual",
            "role": "donor",
            "blood_group": "B+"
        }),
    );

    // Create an active request, then push its deadline into the past
    // directly in the database.
    let req = test::TestRequest::post()
        .uri("/requests")
        .insert_header(bearer(&seeker_token))
        .set_json(json!({
            "patient_name": "Patient",
            "blood_group": "B+",
            "units_needed": 1,
            "urgency": "high",
            "hospital_name": "District Clinic",
            "contact_number": "97633334444",
            "required_by": (Utc::now() + Duration::days(1)).to_rfc3339()
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    sqlx::query("UPDATE blood_requests SET required_by = NOW() - INTERVAL '1 hour' WHERE id = $1::uuid")
        .bind(&request_id)
        .execute(&db.0)
        .await
        .unwrap();

    // Gone from every open feed.
    for uri in ["/requests", "/requests/nearby", "/requests/urgent"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(
            body["data"].as_array().unwrap().iter().all(|r| r["id"] != request_id.as_str()),
            "expired request served on {uri}"
        );
    }

    // And no longer acceptable.
    let req = test::TestRequest::post()
        .uri(&format!("/requests/{request_id}/accept"))
        .insert_header(bearer(&donor_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);

    // Still listed under the owner's requests though.
    let req = test::TestRequest::get()
        .uri("/requests/user/mine")
        .insert_header(bearer(&seeker_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let mine = body["data"].as_array().unwrap();
    assert!(mine.iter().any(|r| r["id"] == request_id.as_str()));
    assert!(mine.iter().all(|r| r["requester_id"] == seeker_id.as_str()));
}
