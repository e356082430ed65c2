#[cfg(test)]
mod tests {
    use crate::helpers::{auth_header, live_event, make_test_app};
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::Utc;
    use db::test_utils::{add_member, seed_club};
    use serde_json::{Value, json};
    use serial_test::serial;
    use services::rotating_code;
    use tower::ServiceExt;

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn request(method: &str, uri: String, user_id: i64, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, auth_header(user_id));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    #[serial]
    async fn override_requires_event_admin() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let member = add_member(&t.db, &club, "gus", club.member_role.id).await;
        let peer = add_member(&t.db, &club, "hana", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;

        let body = json!({ "member_id": peer.id, "status": "PRESENT" });
        let (status, json) = send(
            &t.app,
            request("PUT", format!("/api/events/{}/attendance", event.id), member.user_id, Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["code"], "FORBIDDEN");
        assert!(t.notifier.calls().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn override_appends_and_notifies_once() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let officer = add_member(&t.db, &club, "ivy", club.admin_role.id).await;
        let member = add_member(&t.db, &club, "jon", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;
        let uri = format!("/api/events/{}/attendance", event.id);

        let body = json!({ "memberId": member.id, "newStatus": "LATE" });
        let (status, json) = send(&t.app, request("PUT", uri.clone(), officer.user_id, Some(body.clone()))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["changed"], true);
        assert_eq!(json["data"]["attendance"]["status"], "LATE");
        assert_eq!(json["data"]["attendance"]["is_modified"], true);
        assert_eq!(json["data"]["attendance"]["modifier_name"], "ivy");

        let (status, json) = send(&t.app, request("PUT", uri, officer.user_id, Some(body))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["changed"], false);
        assert_eq!(json["message"], "Attendance unchanged");

        let calls = t.notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec![member.user_id]);
    }

    #[tokio::test]
    #[serial]
    async fn override_of_unknown_member_is_not_found() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let officer = add_member(&t.db, &club, "kai", club.admin_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;

        let body = json!({ "member_id": 9_999, "status": "ABSENT" });
        let (status, json) = send(
            &t.app,
            request("PUT", format!("/api/events/{}/attendance", event.id), officer.user_id, Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Membership not found");
    }

    #[tokio::test]
    #[serial]
    async fn admin_routes_on_unknown_event_are_not_found() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let officer = add_member(&t.db, &club, "lin", club.admin_role.id).await;

        let (status, json) = send(&t.app, request("GET", "/api/events/9999/code".into(), officer.user_id, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Event not found");
    }

    #[tokio::test]
    #[serial]
    async fn code_is_shown_to_admins_only() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let officer = add_member(&t.db, &club, "max", club.admin_role.id).await;
        let member = add_member(&t.db, &club, "noa", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;
        let uri = format!("/api/events/{}/code", event.id);

        let (status, _) = send(&t.app, request("GET", uri.clone(), member.user_id, None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = send(&t.app, request("GET", uri, officer.user_id, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["valid_for_seconds"], 10);
        let code = json["data"]["code"].as_str().unwrap();
        assert_eq!(code.len(), 10);
        assert!(rotating_code::verify(code, &event.secret, Utc::now().timestamp(), 10));
    }

    #[tokio::test]
    #[serial]
    async fn attend_all_marks_everyone_present() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let officer = add_member(&t.db, &club, "oli", club.admin_role.id).await;
        add_member(&t.db, &club, "pia", club.member_role.id).await;
        add_member(&t.db, &club, "quin", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;
        let uri = format!("/api/events/{}/attendance/all", event.id);

        let (status, json) = send(&t.app, request("POST", uri.clone(), officer.user_id, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["changed"].as_array().unwrap().len(), 3);
        assert_eq!(json["data"]["unchanged"], 0);
        assert_eq!(t.notifier.calls().len(), 1);
        assert_eq!(t.notifier.calls()[0].0.len(), 3);

        let (_, json) = send(&t.app, request("POST", uri, officer.user_id, None)).await;
        assert_eq!(json["data"]["changed"].as_array().unwrap().len(), 0);
        assert_eq!(json["data"]["unchanged"], 3);
        assert_eq!(t.notifier.calls().len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn member_log_shows_override_and_scan() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let officer = add_member(&t.db, &club, "rae", club.admin_role.id).await;
        let member = add_member(&t.db, &club, "sol", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;

        let code = rotating_code::generate_code(&event.secret, Utc::now().timestamp());
        let (status, _) = send(
            &t.app,
            request(
                "POST",
                format!("/api/events/{}/attendance", event.id),
                member.user_id,
                Some(json!({ "code": code })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &t.app,
            request(
                "PUT",
                format!("/api/events/{}/attendance", event.id),
                officer.user_id,
                Some(json!({ "member_id": member.id, "status": "ABSENT" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(
            &t.app,
            request(
                "GET",
                format!("/api/events/{}/attendance/{}/log", event.id, member.id),
                officer.user_id,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["username"], "sol");
        assert_eq!(json["data"]["unmodified"]["status"], "PRESENT");
        assert_eq!(json["data"]["modified"]["status"], "ABSENT");
        assert_eq!(json["data"]["modified"]["modifier_name"], "rae");
    }
}
