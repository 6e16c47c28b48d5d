mod common;

use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use common::{bearer, premium_request, send, test_app, user};
use rojgaar_backend::models::premium_request::RequestStatus;
use rojgaar_backend::store::RecordStore;
use rojgaar_backend::utils::time::Clock;

#[tokio::test]
async fn approving_a_timed_plan_activates_premium() {
    let t = test_app();
    let admin = user("admin");
    let member = user("learner");
    let request = premium_request(member.id, "7_DAYS");

    t.store.seed_user(admin.clone());
    t.store.seed_user(member.clone());
    t.store.seed_premium_request(request.clone());

    let (status, body) = send(
        &t.app,
        "PUT",
        "/admin/premium-requests",
        Some(&bearer(&admin)),
        Some(json!({ "id": request.id, "status": "APPROVED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["request"]["status"], json!("APPROVED"));
    assert_eq!(body["user"]["isPremium"], json!(true));

    let updated = t.store.user_by_id(member.id).await.unwrap().unwrap();
    assert!(updated.is_premium);
    assert!(updated.is_verified);
    assert_eq!(updated.job_limit, 1000);
    assert_eq!(updated.talent_limit, 1000);
    assert_eq!(
        updated.premium_expires_at,
        Some(t.clock.now() + Duration::days(7))
    );

    let request = t
        .store
        .premium_request_by_id(request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status, RequestStatus::Approved);
    assert_eq!(request.decided_at, Some(t.clock.now()));

    let notifications = t.store.notifications_for(member.id);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Premium request approved");
}

#[tokio::test]
async fn upload_packs_accumulate_across_approvals() {
    let t = test_app();
    let admin = user("admin");
    let member = user("learner");
    let first = premium_request(member.id, "15_UPLOADS");
    let second = premium_request(member.id, "15_UPLOADS");

    t.store.seed_user(admin.clone());
    t.store.seed_user(member.clone());
    t.store.seed_premium_request(first.clone());
    t.store.seed_premium_request(second.clone());

    for request in [&first, &second] {
        let (status, _) = send(
            &t.app,
            "PUT",
            "/admin/premium-requests",
            Some(&bearer(&admin)),
            Some(json!({ "id": request.id, "status": "APPROVED" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let updated = t.store.user_by_id(member.id).await.unwrap().unwrap();
    assert_eq!(updated.job_limit, 30);
    assert_eq!(updated.talent_limit, 30);
    // Upload packs do not flip the premium flags.
    assert!(!updated.is_premium);
    assert!(!updated.is_verified);
    assert_eq!(
        updated.premium_expires_at,
        Some(t.clock.now() + Duration::days(30))
    );
}

#[tokio::test]
async fn rejection_notifies_without_mutating_the_account() {
    let t = test_app();
    let admin = user("admin");
    let member = user("learner");
    let request = premium_request(member.id, "30_DAYS");

    t.store.seed_user(admin.clone());
    t.store.seed_user(member.clone());
    t.store.seed_premium_request(request.clone());

    let (status, body) = send(
        &t.app,
        "PUT",
        "/admin/premium-requests",
        Some(&bearer(&admin)),
        Some(json!({ "id": request.id, "status": "REJECTED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], json!("REJECTED"));
    assert!(body.get("user").is_none());

    let untouched = t.store.user_by_id(member.id).await.unwrap().unwrap();
    assert!(!untouched.is_premium);
    assert!(!untouched.is_verified);
    assert_eq!(untouched.job_limit, 0);
    assert_eq!(untouched.premium_expires_at, None);

    let notifications = t.store.notifications_for(member.id);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Premium request rejected");
}

#[tokio::test]
async fn custom_plans_extend_premium_without_touching_limits() {
    let t = test_app();
    let admin = user("admin");
    let member = user("learner");
    let request = premium_request(member.id, "CAMPAIGN_SPECIAL");

    t.store.seed_user(admin.clone());
    t.store.seed_user(member.clone());
    t.store.seed_premium_request(request.clone());

    let (status, _) = send(
        &t.app,
        "PUT",
        "/admin/premium-requests",
        Some(&bearer(&admin)),
        Some(json!({ "id": request.id, "status": "APPROVED", "durationDays": 45 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let updated = t.store.user_by_id(member.id).await.unwrap().unwrap();
    assert!(updated.is_premium);
    assert!(updated.is_verified);
    assert_eq!(updated.job_limit, 0);
    assert_eq!(updated.talent_limit, 0);
    assert_eq!(
        updated.premium_expires_at,
        Some(t.clock.now() + Duration::days(45))
    );
}

#[tokio::test]
async fn only_admins_may_decide() {
    let t = test_app();
    let learner = user("learner");
    let request = premium_request(learner.id, "7_DAYS");
    t.store.seed_user(learner.clone());
    t.store.seed_premium_request(request.clone());

    let payload = json!({ "id": request.id, "status": "APPROVED" });

    let (status, _) = send(
        &t.app,
        "PUT",
        "/admin/premium-requests",
        Some(&bearer(&learner)),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&t.app, "PUT", "/admin/premium-requests", None, Some(payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_decisions_are_rejected_up_front() {
    let t = test_app();
    let admin = user("admin");
    let member = user("learner");
    let request = premium_request(member.id, "7_DAYS");
    t.store.seed_user(admin.clone());
    t.store.seed_user(member.clone());
    t.store.seed_premium_request(request.clone());

    // PENDING is not a decision.
    let (status, _) = send(
        &t.app,
        "PUT",
        "/admin/premium-requests",
        Some(&bearer(&admin)),
        Some(json!({ "id": request.id, "status": "PENDING" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown request id.
    let (status, _) = send(
        &t.app,
        "PUT",
        "/admin/premium-requests",
        Some(&bearer(&admin)),
        Some(json!({ "id": Uuid::new_v4(), "status": "APPROVED" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Zero-day durations fail validation.
    let (status, _) = send(
        &t.app,
        "PUT",
        "/admin/premium-requests",
        Some(&bearer(&admin)),
        Some(json!({ "id": request.id, "status": "APPROVED", "durationDays": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
