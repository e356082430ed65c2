#[cfg(test)]
mod tests {
    use crate::helpers::{auth_header, live_event, make_test_app};
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::Utc;
    use db::models::join_request;
    use db::models::user;
    use db::test_utils::{add_member, seed_club};
    use serde_json::{Value, json};
    use serial_test::serial;
    use services::rotating_code::generate_code;
    use tower::ServiceExt;

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn scan(event_id: i64, user_id: i64, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/events/{event_id}/attendance"))
            .header(header::AUTHORIZATION, auth_header(user_id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn scan_records_present_then_conflicts() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let member = add_member(&t.db, &club, "alice", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;

        let code = generate_code(&event.secret, Utc::now().timestamp());
        let (status, json) = send(&t.app, scan(event.id, member.user_id, json!({ "code": code }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "PRESENT");
        assert_eq!(json["data"]["membership_id"], member.id);
        assert_eq!(json["data"]["is_modified"], false);

        let code = generate_code(&event.secret, Utc::now().timestamp());
        let (status, json) = send(&t.app, scan(event.id, member.user_id, json!({ "code": code }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "ALREADY_CHECKED_IN");
    }

    #[tokio::test]
    #[serial]
    async fn scan_without_token_is_unauthorized() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let event = live_event(&t.db, club.generation.id).await;

        let req = Request::builder()
            .method("POST")
            .uri(format!("/api/events/{}/attendance", event.id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "code": "whatever" }).to_string()))
            .unwrap();
        let (status, json) = send(&t.app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    #[serial]
    async fn wrong_code_is_rejected() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let member = add_member(&t.db, &club, "bob", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;

        let stale = generate_code(&event.secret, Utc::now().timestamp() - 3_600);
        let (status, json) = send(&t.app, scan(event.id, member.user_id, json!({ "code": stale }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_CODE");
    }

    #[tokio::test]
    #[serial]
    async fn applicants_and_strangers_are_refused() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let event = live_event(&t.db, club.generation.id).await;
        let applicant = user::Model::create(&t.db, "applicant").await.unwrap();
        join_request::Model::create(&t.db, applicant.id, club.generation.id)
            .await
            .unwrap();
        let stranger = user::Model::create(&t.db, "stranger").await.unwrap();

        let code = generate_code(&event.secret, Utc::now().timestamp());
        let (status, json) = send(&t.app, scan(event.id, applicant.id, json!({ "code": code }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["code"], "WAITING_FOR_APPROVAL");

        let (status, json) = send(&t.app, scan(event.id, stranger.id, json!({ "code": code }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["code"], "NOT_REGISTERED_CLUB");
    }

    #[tokio::test]
    #[serial]
    async fn unknown_event_is_not_found() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let member = add_member(&t.db, &club, "carol", club.member_role.id).await;

        let (status, json) = send(&t.app, scan(9_999, member.user_id, json!({ "code": "x" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "NOT_FOUND");
    }

    #[tokio::test]
    #[serial]
    async fn my_attendance_follows_the_scan() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let member = add_member(&t.db, &club, "dana", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;

        let me = || {
            Request::builder()
                .method("GET")
                .uri(format!("/api/events/{}/attendance/me", event.id))
                .header(header::AUTHORIZATION, auth_header(member.user_id))
                .body(Body::empty())
                .unwrap()
        };

        let (status, json) = send(&t.app, me()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "UNCHECKED");
        assert_eq!(json["data"]["id"], Value::Null);

        let code = generate_code(&event.secret, Utc::now().timestamp());
        let (status, _) = send(&t.app, scan(event.id, member.user_id, json!({ "code": code }))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, json) = send(&t.app, me()).await;
        assert_eq!(json["data"]["status"], "PRESENT");
    }

    #[tokio::test]
    #[serial]
    async fn shared_device_is_flagged_for_admins() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let officer = add_member(&t.db, &club, "officer", club.admin_role.id).await;
        let first = add_member(&t.db, &club, "erin", club.member_role.id).await;
        let second = add_member(&t.db, &club, "finn", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;

        for member in [&first, &second] {
            let code = generate_code(&event.secret, Utc::now().timestamp());
            let body = json!({ "code": code, "device_id": "shared-phone", "device_model": "Pixel 8" });
            let (status, _) = send(&t.app, scan(event.id, member.user_id, body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let req = Request::builder()
            .method("GET")
            .uri(format!("/api/events/{}/abuse-flags", event.id))
            .header(header::AUTHORIZATION, auth_header(officer.user_id))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&t.app, req).await;
        assert_eq!(status, StatusCode::OK);
        let flags = json["data"].as_array().unwrap();
        assert_eq!(flags.len(), 1);
        let reason = flags[0]["reason"].as_str().unwrap();
        assert!(reason.contains("erin"));
        assert!(reason.contains("finn"));
    }
}
