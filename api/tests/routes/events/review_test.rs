#[cfg(test)]
mod tests {
    use crate::helpers::{auth_header, live_event, make_test_app};
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use db::models::attendance;
    use db::test_utils::{add_member, seed_club};
    use serde_json::{Value, json};
    use serial_test::serial;
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
    async fn approved_edit_request_overrides_attendance() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let officer = add_member(&t.db, &club, "oli", club.admin_role.id).await;
        let member = add_member(&t.db, &club, "pia", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;
        let base = format!("/api/events/{}/edit-requests", event.id);

        let body = json!({ "reason": "phone died at the door" });
        let (status, json) = send(&t.app, request("POST", base.clone(), member.user_id, Some(body))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["state"], "PENDING");
        assert_eq!(json["data"]["status"], "PRESENT");
        let request_id = json["data"]["id"].as_i64().unwrap();

        let (status, json) = send(&t.app, request("GET", format!("{base}/me"), member.user_id, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["id"], request_id);

        let approve = format!("{base}/{request_id}/approve");
        let (status, _) = send(&t.app, request("POST", approve.clone(), member.user_id, None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = send(&t.app, request("POST", approve.clone(), officer.user_id, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["request"]["state"], "APPROVED");
        assert_eq!(json["data"]["attendance"]["status"], "PRESENT");
        assert_eq!(json["data"]["attendance"]["modifier_name"], "oli");

        let latest = attendance::Model::latest_for(&t.db, event.id, member.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.modifier_membership_id, Some(officer.id));

        let calls = t.notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec![member.user_id]);
        assert_eq!(calls[0].1.title, "Edit request approved");

        let (status, json) = send(&t.app, request("POST", approve, officer.user_id, None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "ALREADY_REVIEWED");

        let (status, json) = send(&t.app, request("GET", base, officer.user_id, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn edit_request_without_reason_is_rejected() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let member = add_member(&t.db, &club, "quin", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;

        let body = json!({ "reason": " ", "status": "LATE" });
        let (status, json) = send(
            &t.app,
            request("POST", format!("/api/events/{}/edit-requests", event.id), member.user_id, Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    #[serial]
    async fn absence_application_round_trip_notifies_both_sides() {
        let t = make_test_app().await;
        let club = seed_club(&t.db).await;
        let officer = add_member(&t.db, &club, "rae", club.admin_role.id).await;
        let member = add_member(&t.db, &club, "sol", club.member_role.id).await;
        let event = live_event(&t.db, club.generation.id).await;
        let base = format!("/api/events/{}/absence-applications", event.id);

        let body = json!({ "reason": "exam week", "status": "LATE" });
        let (status, json) = send(&t.app, request("POST", base.clone(), member.user_id, Some(body))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["status"], "LATE");
        let application_id = json["data"]["id"].as_i64().unwrap();

        let (status, _) = send(&t.app, request("GET", base.clone(), member.user_id, None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let reject = format!("{base}/{application_id}/reject");
        let (status, json) = send(&t.app, request("POST", reject, officer.user_id, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["state"], "REJECTED");
        assert_eq!(json["message"], "Absence application rejected");

        let (status, json) = send(&t.app, request("GET", format!("{base}/me"), member.user_id, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["state"], "REJECTED");

        let calls = t.notifier.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].0.contains(&officer.user_id));
        assert!(!calls[0].0.contains(&member.user_id));
        assert_eq!(calls[1].0, vec![member.user_id]);
        assert_eq!(calls[1].1.title, "LATE application rejected");
        assert_eq!(
            attendance::Model::count_for_pair(&t.db, event.id, member.id).await.unwrap(),
            0
        );
    }
}
