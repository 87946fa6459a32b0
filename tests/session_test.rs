use axum::Router;
use axum::http::{HeaderMap, StatusCode, header::COOKIE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use gridlog::config::GatewayConfig;
use gridlog::sampler::Sampler;
use gridlog::session::{
    AGGREGATES_PATH, DeviceApi, FetchOutcome, GRID_STATUS_PATH, LOGIN_PATH, NoDataReason,
    SOE_PATH, SessionClient,
};
use gridlog::timeseries::format_record;
use serde_json::{Value, json};

const TOKEN: &str = "tok-123==";

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        hostname: "127.0.0.1".to_string(),
        password: "pw".to_string(),
        request_timeout_secs: 2,
        accept_invalid_certs: true,
    }
}

async fn spawn_device(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn login_ok(Json(body): Json<Value>) -> Response {
    if body["username"] == "customer"
        && body["password"] == "pw"
        && body["email"] == "nobody@example.com"
        && body["force_sm_off"] == false
    {
        Json(json!({"email": "nobody@example.com", "token": TOKEN})).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("AuthCookie={}", TOKEN))
}

fn healthy_device() -> Router {
    Router::new()
        .route(LOGIN_PATH, post(login_ok))
        .route(
            GRID_STATUS_PATH,
            get(|headers: HeaderMap| async move {
                if !authorized(&headers) {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                Json(json!({"grid_status": "SystemGridConnected"})).into_response()
            }),
        )
        .route(
            SOE_PATH,
            get(|headers: HeaderMap| async move {
                if !authorized(&headers) {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                Json(json!({"percentage": 76.28})).into_response()
            }),
        )
        .route(
            AGGREGATES_PATH,
            get(|headers: HeaderMap| async move {
                if !authorized(&headers) {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                Json(json!({
                    "site": {"instant_power": -150.2},
                    "solar": {"instant_power": 900.9},
                    "battery": {"instant_power": -50.1},
                    "load": {"instant_power": 700.6}
                }))
                .into_response()
            }),
        )
}

#[tokio::test]
async fn login_attaches_cookie_to_fetches() {
    let base = spawn_device(healthy_device()).await;
    let client = SessionClient::login_with_base_url(&base, &gateway_config())
        .await
        .unwrap();
    assert!(client.has_token());
    assert_eq!(client.hostname(), "127.0.0.1");

    let outcome = client.fetch_json(SOE_PATH, None).await;
    assert_eq!(outcome, FetchOutcome::Data(json!({"percentage": 76.28})));
}

#[tokio::test]
async fn end_to_end_sample_and_record() {
    let base = spawn_device(healthy_device()).await;
    let client = SessionClient::login_with_base_url(&base, &gateway_config())
        .await
        .unwrap();

    let sample = Sampler::new().sample(&client).await;
    assert!(sample.grid_up);
    assert_eq!(sample.percentage, Some(76.3));
    assert_eq!(sample.grid_watts, Some(-150));
    assert_eq!(sample.solar_watts, Some(901));
    assert_eq!(sample.powerwall_watts, Some(-50));
    assert_eq!(sample.home_watts, Some(701));

    let expected_ts = sample.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string();
    assert_eq!(
        format_record(&sample),
        format!("{}\t76.3\ttrue\t-150\t901\t-50\t701\n", expected_ts)
    );
}

#[tokio::test]
async fn post_body_is_forwarded() {
    let router = Router::new().route(LOGIN_PATH, post(login_ok)).route(
        "/api/echo",
        post(|Json(body): Json<Value>| async move { Json(json!({"echo": body})) }),
    );
    let base = spawn_device(router).await;
    let client = SessionClient::login_with_base_url(&base, &gateway_config())
        .await
        .unwrap();

    let outcome = client
        .fetch_json("/api/echo", Some(&json!({"x": 1})))
        .await;
    assert_eq!(outcome.data(), Some(&json!({"echo": {"x": 1}})));
}

#[tokio::test]
async fn bad_responses_are_no_data() {
    let router = Router::new()
        .route(LOGIN_PATH, post(login_ok))
        .route(
            "/api/error",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "{}") }),
        )
        .route("/api/empty", get(|| async { StatusCode::OK }))
        .route("/api/garbage", get(|| async { (StatusCode::OK, "{not json") }));
    let base = spawn_device(router).await;
    let client = SessionClient::login_with_base_url(&base, &gateway_config())
        .await
        .unwrap();

    assert_eq!(
        client.fetch_json("/api/error", None).await,
        FetchOutcome::NoData(NoDataReason::Status(500))
    );
    assert_eq!(
        client.fetch_json("/api/empty", None).await,
        FetchOutcome::NoData(NoDataReason::EmptyBody)
    );
    assert!(matches!(
        client.fetch_json("/api/garbage", None).await,
        FetchOutcome::NoData(NoDataReason::InvalidJson(_))
    ));
    assert_eq!(
        client.fetch_json("/api/missing", None).await,
        FetchOutcome::NoData(NoDataReason::Status(404))
    );
}

#[tokio::test]
async fn failing_metric_does_not_block_the_others() {
    let router = Router::new()
        .route(LOGIN_PATH, post(login_ok))
        .route(
            GRID_STATUS_PATH,
            get(|| async { Json(json!({"grid_status": "SystemGridConnected"})) }),
        )
        .route(
            SOE_PATH,
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route(
            AGGREGATES_PATH,
            get(|| async { Json(json!({"solar": {"instant_power": 321.4}})) }),
        );
    let base = spawn_device(router).await;
    let client = SessionClient::login_with_base_url(&base, &gateway_config())
        .await
        .unwrap();

    let sample = Sampler::new().sample(&client).await;
    assert!(sample.grid_up);
    assert_eq!(sample.percentage, None);
    assert_eq!(sample.solar_watts, Some(321));
    assert_eq!(sample.grid_watts, None);
    assert_eq!(sample.home_watts, None);
}

#[tokio::test]
async fn login_rejected_is_an_auth_error() {
    let base = spawn_device(healthy_device()).await;
    let mut cfg = gateway_config();
    cfg.password = "wrong".to_string();
    let err = SessionClient::login_with_base_url(&base, &cfg)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn login_without_token_fails() {
    let router = Router::new().route(
        LOGIN_PATH,
        post(|| async { Json(json!({"email": "nobody@example.com"})) }),
    );
    let base = spawn_device(router).await;
    let err = SessionClient::login_with_base_url(&base, &gateway_config())
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("token"));
}

#[tokio::test]
async fn login_with_unparsable_body_fails() {
    let router = Router::new().route(LOGIN_PATH, post(|| async { "<html></html>" }));
    let base = spawn_device(router).await;
    let err = SessionClient::login_with_base_url(&base, &gateway_config())
        .await
        .err()
        .unwrap();
    assert!(err.to_string().starts_with("Authentication error"));
}

#[tokio::test]
async fn login_to_unreachable_gateway_fails() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result =
        SessionClient::login_with_base_url(&format!("http://{}", addr), &gateway_config()).await;
    assert!(result.is_err());
}
