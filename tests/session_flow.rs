use auth_tkt::app::build_app;
use auth_tkt::config::{AppEnv, Config};
use auth_tkt::services::auth::ticket::Ticket;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

const HOST: &str = "www.example.com";

fn config() -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        app_env: AppEnv::Development,
        server_name: "localhost".to_string(),
        cors_allowed_origins: Vec::new(),
        auth_tkt_secret: "integration-secret".to_string(),
        auth_tkt_cookie_name: "auth_tkt".to_string(),
        auth_tkt_secure: false,
        auth_tkt_include_ip: false,
        auth_tkt_timeout_seconds: None,
        auth_tkt_reissue_seconds: None,
        auth_tkt_allowed_userids: Vec::new(),
    }
}

fn app(config: &Config) -> Router {
    build_app(config).expect("app builds")
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

fn login(body: Value) -> Request<Body> {
    Request::post("/api/v1/session")
        .header(header::HOST, HOST)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn me(ticket: Option<&str>) -> Request<Body> {
    let mut builder = Request::get("/api/v1/me").header(header::HOST, HOST);
    if let Some(ticket) = ticket {
        builder = builder.header(header::COOKIE, format!("auth_tkt=\"{ticket}\""));
    }
    builder.body(Body::empty()).unwrap()
}

fn set_cookies(res: &Response<Body>) -> Vec<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn ticket_value(set_cookie: &str) -> String {
    let start = set_cookie.find('"').unwrap() + 1;
    let end = start + set_cookie[start..].find('"').unwrap();
    set_cookie[start..end].to_string()
}

async fn json_body(res: Response<Body>) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = app(&config());
    let res = send(&app, Request::get("/api/v1/health").body(Body::empty()).unwrap()).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn login_then_me_then_logout() {
    let app = app(&config());

    let res = send(&app, login(json!({"userid": 42, "tokens": ["admin"]}))).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        res.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );

    let cookies = set_cookies(&res);
    assert_eq!(cookies.len(), 3);
    assert!(cookies[0].starts_with("auth_tkt=\"") && cookies[0].ends_with("; Path=/"));
    assert!(cookies[1].ends_with("; Path=/; Domain=www.example.com"));
    assert!(cookies[2].ends_with("; Path=/; Domain=.example.com"));

    let ticket = ticket_value(&cookies[0]);
    let res = send(&app, me(Some(&ticket))).await;
    assert_eq!(res.status(), StatusCode::OK);
    // unchanged identity, no reissue window configured
    assert!(set_cookies(&res).is_empty());

    let body = json_body(res).await;
    assert_eq!(body["userid"], json!(42));
    assert_eq!(body["tokens"], json!(["admin"]));
    assert_eq!(body["userdata"], json!("userid_type:int"));
    assert_eq!(body["auth_type"], json!("cookie"));
    assert!(body["issued_at"].is_i64());

    let logout = Request::delete("/api/v1/session")
        .header(header::HOST, HOST)
        .header(header::COOKIE, format!("auth_tkt=\"{ticket}\""))
        .body(Body::empty())
        .unwrap();
    let res = send(&app, logout).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let cookies = set_cookies(&res);
    assert_eq!(cookies.len(), 3);
    for cookie in &cookies {
        assert!(cookie.starts_with("auth_tkt=\"INVALID\"; Path=/"));
        assert!(cookie.contains("; Max-Age=0; Expires="));
    }
}

#[tokio::test]
async fn text_userid_round_trips_through_http() {
    let app = app(&config());

    let res = send(&app, login(json!({"userid": "42", "userdata": "lang=en"}))).await;
    let ticket = ticket_value(&set_cookies(&res)[0]);

    let body = json_body(send(&app, me(Some(&ticket))).await).await;
    assert_eq!(body["userid"], json!("42"));
    assert_eq!(body["userdata"], json!("userid_type:unicode|lang=en"));
}

#[tokio::test]
async fn userids_needing_percent_encoding_survive_the_cookie_header() {
    let app = app(&config());

    for userid in ["alice@example.com", "zoë", "a b"] {
        let res = send(&app, login(json!({ "userid": userid }))).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let ticket = ticket_value(&set_cookies(&res)[0]);
        assert!(ticket.contains('%'), "{userid} is stored encoded: {ticket}");

        let res = send(&app, me(Some(&ticket))).await;
        assert_eq!(res.status(), StatusCode::OK, "{userid}");
        assert_eq!(json_body(res).await["userid"], json!(userid));
    }
}

#[tokio::test]
async fn me_reissues_a_ticket_that_no_longer_matches_the_identity() {
    let app = app(&config());

    // minted elsewhere without the userid type tag
    let stale = Ticket::new(1_700_000_000, "bob", Vec::<String>::new(), "")
        .sign(b"integration-secret", "0.0.0.0".parse().unwrap())
        .unwrap();

    let res = send(&app, me(Some(&stale))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let cookies = set_cookies(&res);
    assert_eq!(cookies.len(), 3);
    assert!(cookies[1].ends_with("; Path=/; Domain=www.example.com"));
    let fresh = ticket_value(&cookies[0]);
    assert_ne!(fresh, stale);
    assert_eq!(json_body(res).await["userid"], json!("bob"));

    let res = send(&app, me(Some(&fresh))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(set_cookies(&res).is_empty());
    assert_eq!(json_body(res).await["userdata"], json!("userid_type:unicode"));
}

#[tokio::test]
async fn missing_or_tampered_cookie_is_unauthorized() {
    let app = app(&config());

    let res = send(&app, me(None)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await["error"]["code"], json!("UNAUTHORIZED"));

    let res = send(&app, login(json!({"userid": "bob"}))).await;
    let ticket = ticket_value(&set_cookies(&res)[0]);
    let tampered = ticket.replacen("bob", "rob", 1);

    let res = send(&app, me(Some(&tampered))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ticket_from_another_secret_is_unauthorized() {
    let issuer = app(&config());
    let res = send(&issuer, login(json!({"userid": "bob"}))).await;
    let ticket = ticket_value(&set_cookies(&res)[0]);

    let mut other = config();
    other.auth_tkt_secret = "another-secret".to_string();
    let res = send(&app(&other), me(Some(&ticket))).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn allow_list_gates_login_and_me() {
    let mut config = config();
    config.auth_tkt_allowed_userids = vec!["alice".to_string(), "7".to_string()];
    let app = app(&config);

    let res = send(&app, login(json!({"userid": "mallory"}))).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(set_cookies(&res).is_empty());

    let res = send(&app, login(json!({"userid": 7}))).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = send(&app, login(json!({"userid": "alice"}))).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let ticket = ticket_value(&set_cookies(&res)[0]);

    // the same ticket is rejected once alice is no longer allowed
    let mut narrowed = config.clone();
    narrowed.auth_tkt_allowed_userids = vec!["7".to_string()];
    let res = send(&build_app(&narrowed).unwrap(), me(Some(&ticket))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_login_body_is_bad_request() {
    let app = app(&config());

    let res = send(&app, login(json!({"userid": "a", "tokens": ["x,y"]}))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"]["code"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn login_with_max_age_and_secure_cookie() {
    let mut config = config();
    config.auth_tkt_secure = true;
    let app = app(&config);

    let res = send(&app, login(json!({"userid": "carol", "max_age": 3600}))).await;
    for cookie in set_cookies(&res) {
        assert!(cookie.contains("; Max-Age=3600; Expires="));
        assert!(cookie.ends_with("; secure; HttpOnly"));
    }
}

#[test]
fn reissue_time_must_be_below_timeout() {
    let mut config = config();
    config.auth_tkt_timeout_seconds = Some(600);
    config.auth_tkt_reissue_seconds = Some(700);
    let err = build_app(&config).unwrap_err();
    assert_eq!(
        format!("{err:#}"),
        "invalid auth_tkt configuration: \
         when timeout is specified, reissue_time must be set to a lower value"
    );

    config.auth_tkt_reissue_seconds = Some(300);
    assert!(build_app(&config).is_ok());
}
