use super::*;

// =============================================================
// Helpers
// =============================================================

fn ts(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap()
}

fn make_user() -> User {
    User {
        id: "1".to_owned(),
        email: "jane@example.com".to_owned(),
        username: "jane".to_owned(),
        name: Some("Jane".to_owned()),
        avatar: None,
        created_at: ts("2024-01-02T03:04:05Z"),
        updated_at: ts("2024-01-02T03:04:05Z"),
    }
}

fn make_poll(is_active: bool, ends_at: Option<&str>) -> Poll {
    Poll {
        id: "p1".to_owned(),
        title: "Favorite language?".to_owned(),
        description: None,
        options: Vec::new(),
        created_by: "1".to_owned(),
        created_at: ts("2024-01-01T00:00:00Z"),
        updated_at: ts("2024-01-01T00:00:00Z"),
        ends_at: ends_at.map(ts),
        is_active,
        allow_multiple_choices: false,
        require_auth: true,
        total_votes: 0,
    }
}

// =============================================================
// User / AuthUser
// =============================================================

#[test]
fn user_deserializes_camel_case_and_skips_missing_optionals() {
    let json = serde_json::json!({
        "id": "1",
        "email": "jane@example.com",
        "username": "jane",
        "createdAt": "2024-01-02T03:04:05Z",
        "updatedAt": "2024-01-02T03:04:05Z"
    });
    let user: User = serde_json::from_value(json).unwrap();
    assert_eq!(user.email, "jane@example.com");
    assert!(user.name.is_none());
    assert!(user.avatar.is_none());

    let out = serde_json::to_value(&user).unwrap();
    assert!(out.get("name").is_none());
    assert!(out.get("createdAt").is_some());
}

#[test]
fn auth_user_serializes_flat_with_flag() {
    let auth = AuthUser::authenticated(make_user());
    let json = serde_json::to_value(&auth).unwrap();
    assert_eq!(json["isAuthenticated"], true);
    assert_eq!(json["email"], "jane@example.com");
    assert!(json.get("user").is_none());
}

#[test]
fn auth_user_derefs_to_user() {
    let auth = AuthUser::authenticated(make_user());
    assert_eq!(auth.username, "jane");
    assert!(auth.is_authenticated);
}

#[test]
fn credentials_debug_redacts_password() {
    let login = LoginCredentials { email: "a@b.com".to_owned(), password: "hunter2".to_owned() };
    let debug = format!("{login:?}");
    assert!(debug.contains("a@b.com"));
    assert!(!debug.contains("hunter2"));

    let register = RegisterCredentials {
        email: "a@b.com".to_owned(),
        username: "ab".to_owned(),
        password: "hunter2".to_owned(),
        name: None,
    };
    assert!(!format!("{register:?}").contains("hunter2"));
}

#[test]
fn register_credentials_omit_missing_name() {
    let register = RegisterCredentials {
        email: "a@b.com".to_owned(),
        username: "ab".to_owned(),
        password: "pw".to_owned(),
        name: None,
    };
    let json = serde_json::to_value(&register).unwrap();
    assert!(json.get("name").is_none());
    assert_eq!(json["username"], "ab");
}

// =============================================================
// Poll
// =============================================================

#[test]
fn poll_open_without_deadline_when_active() {
    assert!(make_poll(true, None).is_open_at(ts("2030-01-01T00:00:00Z")));
}

#[test]
fn poll_closed_when_inactive() {
    assert!(!make_poll(false, None).is_open_at(ts("2024-06-01T00:00:00Z")));
}

#[test]
fn poll_closed_after_deadline() {
    let poll = make_poll(true, Some("2024-06-01T00:00:00Z"));
    assert!(poll.is_open_at(ts("2024-05-31T23:59:59Z")));
    assert!(!poll.is_open_at(ts("2024-06-01T00:00:00Z")));
}

#[test]
fn update_poll_data_only_serializes_set_fields() {
    let update = UpdatePollData { is_active: Some(false), ..UpdatePollData::default() };
    let json = serde_json::to_value(&update).unwrap();
    assert_eq!(json, serde_json::json!({ "isActive": false }));
}

#[test]
fn vote_data_uses_camel_case() {
    let vote = VoteData { poll_id: "p1".to_owned(), option_ids: vec!["o1".to_owned()] };
    let json = serde_json::to_value(&vote).unwrap();
    assert_eq!(json, serde_json::json!({ "pollId": "p1", "optionIds": ["o1"] }));
}

// =============================================================
// Envelopes
// =============================================================

#[test]
fn pagination_middle_page() {
    let p = Pagination::new(2, 10, 35);
    assert_eq!(p.total_pages, 4);
    assert!(p.has_next);
    assert!(p.has_prev);
}

#[test]
fn pagination_last_page_has_no_next() {
    let p = Pagination::new(4, 10, 35);
    assert!(!p.has_next);
    assert!(p.has_prev);
}

#[test]
fn pagination_exact_multiple() {
    assert_eq!(Pagination::new(1, 10, 30).total_pages, 3);
}

#[test]
fn pagination_empty_and_zero_limit() {
    let empty = Pagination::new(1, 10, 0);
    assert_eq!(empty.total_pages, 0);
    assert!(!empty.has_next);
    assert!(!empty.has_prev);

    let zero_limit = Pagination::new(1, 0, 50);
    assert_eq!(zero_limit.total_pages, 0);
    assert!(!zero_limit.has_next);
}

#[test]
fn paginated_response_wire_shape() {
    let resp = PaginatedResponse::new(vec![1, 2], 1, 2, 5);
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["pagination"]["totalPages"], 3);
    assert_eq!(json["pagination"]["hasNext"], true);
    assert_eq!(json["data"], serde_json::json!([1, 2]));
}

#[test]
fn api_response_ok_and_err() {
    let ok = ApiResponse::ok(7, Some("done".to_owned()));
    assert!(ok.success);
    assert_eq!(ok.data, Some(7));

    let err: ApiResponse<i32> = ApiResponse::err("nope");
    assert!(!err.success);
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json, serde_json::json!({ "success": false, "error": "nope" }));
}

#[test]
fn api_response_tolerates_missing_data() {
    let parsed: ApiResponse<String> = serde_json::from_str(r#"{"success":true}"#).unwrap();
    assert!(parsed.data.is_none());
}
