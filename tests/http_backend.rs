//! Adapters and orchestrators against a local HTTP server

use cscan_rs::config::{EngineConfig, Settings};
use cscan_rs::engines::{fofa, hunter, quake, zone, EngineLoader, HttpBackend};
use cscan_rs::network::HttpClient;
use cscan_rs::{
    AssetKind, Backend, CompanyBackend, CompanySearch, Engine, EngineError, Search, Target,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend<E: Engine + 'static>(mut engine: E, config: EngineConfig) -> HttpBackend {
    engine.init(&config).unwrap();
    engine.validate(&config).unwrap();
    HttpBackend::new(Arc::new(engine), HttpClient::new().unwrap())
}

fn fofa_row(host: &str, ip: &str, port: &str) -> serde_json::Value {
    json!([host, ip, port, "http", "Home", "", "中国", "北京", "北京"])
}

#[tokio::test]
async fn fofa_parses_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search/all"))
        .and(query_param("email", "me@example.com"))
        .and(query_param("key", "secret"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": false,
            "results": [
                fofa_row("a.example.com", "1.1.1.1", "80"),
                fofa_row("b.example.com", "1.1.1.2", "443"),
                ["short", "row"],
            ],
        })))
        .mount(&server)
        .await;

    let fofa = backend(
        fofa::Fofa::new(),
        EngineConfig::new("fofa")
            .with_api_key("secret")
            .with_email("me@example.com")
            .with_base_url(server.uri()),
    );

    let assets = assert_ok!(fofa.search(r#"domain="example.com""#, 1, 100).await);
    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].domain.as_deref(), Some("a.example.com"));
    assert_eq!(assets[1].port, Some(443));
    assert_eq!(assets[0].location.as_deref(), Some("中国 北京 北京"));
    assert_eq!(assets[0].source, "fofa");
}

#[tokio::test]
async fn fofa_error_payload() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v1/search/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": true,
            "errmsg": "[820031] F点余额不足",
        })))
        .mount(&server)
        .await;

    let fofa = backend(
        fofa::Fofa::new(),
        EngineConfig::new("fofa")
            .with_api_key("secret")
            .with_email("me@example.com")
            .with_base_url(server.uri()),
    );

    let err = assert_err!(fofa.search("ip=\"1.1.1.1\"", 1, 100).await);
    assert_eq!(err, EngineError::Api("[820031] F点余额不足".to_string()));
}

#[tokio::test]
async fn hunter_codes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openApi/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {
                "arr": [{
                    "ip": "2.2.2.2",
                    "domain": "www.example.com",
                    "port": 8080,
                    "protocol": "http",
                    "web_title": "Login",
                    "status_code": 200,
                    "country": "中国",
                    "province": "浙江",
                    "city": "杭州",
                }],
            },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/openApi/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 429,
            "message": "请求太多啦，稍后再试试",
        })))
        .mount(&server)
        .await;

    let hunter = backend(
        hunter::Hunter::new(),
        EngineConfig::new("hunter")
            .with_api_key("secret")
            .with_base_url(server.uri()),
    );

    let assets = assert_ok!(hunter.search("ip=\"2.2.2.2\"", 1, 10).await);
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].port, Some(8080));
    assert_eq!(assets[0].title.as_deref(), Some("Login"));
    assert_eq!(assets[0].location.as_deref(), Some("中国 浙江 杭州"));

    let err = assert_err!(hunter.search("ip=\"2.2.2.2\"", 2, 10).await);
    assert!(matches!(err, EngineError::RateLimited(_)));
}

#[tokio::test]
async fn quake_posts_json_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/search/quake_service"))
        .and(header("X-QuakeToken", "token"))
        .and(body_partial_json(json!({"start": 20, "size": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "Successful.",
            "data": [{
                "ip": "3.3.3.3",
                "port": 22,
                "service": {"name": "ssh"},
                "location": {"country_cn": "中国", "province_cn": "上海", "city_cn": "上海"},
            }],
        })))
        .mount(&server)
        .await;

    let quake = backend(
        quake::Quake::new(),
        EngineConfig::new("quake")
            .with_api_key("token")
            .with_base_url(server.uri()),
    );

    let assets = assert_ok!(quake.search("ip:3.3.3.3", 3, 10).await);
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].service.as_deref(), Some("ssh"));
    assert_eq!(assets[0].port, Some(22));
}

#[tokio::test]
async fn http_status_maps_to_engine_error() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/search/quake_service"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let quake = backend(
        quake::Quake::new(),
        EngineConfig::new("quake")
            .with_api_key("token")
            .with_base_url(server.uri()),
    );

    let err = assert_err!(quake.search("ip:3.3.3.3", 1, 10).await);
    assert_eq!(err, EngineError::RateLimited("slow down".to_string()));
}

#[tokio::test]
async fn zone_permission_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/data/member"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1,
            "message": "该账号无权限查询此类数据",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/data/email"))
        .and(body_partial_json(json!({"query_type": "email", "zone_key_id": "zkey"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": [
                {"email": "ops@example.com", "source": "https://example.com/contact", "company": ["Acme"]},
                {"source": "https://example.com/empty"},
            ],
        })))
        .mount(&server)
        .await;

    let zone = backend(
        zone::Zone::new(),
        EngineConfig::new("zone")
            .with_api_key("zkey")
            .with_base_url(server.uri()),
    );

    let err = assert_err!(zone.search_kind("company==\"Acme\"", AssetKind::Member, 1, 40).await);
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let assets = assert_ok!(zone.search_kind("company==\"Acme\"", AssetKind::Email, 1, 40).await);
    assert_eq!(assets.len(), 2);
    assert!(!AssetKind::Email.accepts(&assets[1]));
    assert_eq!(assets[0].email.as_deref(), Some("ops@example.com"));
    assert_eq!(assets[0].icp_org.as_deref(), Some("Acme"));
}

fn settings_for(engines: Vec<EngineConfig>) -> Settings {
    let mut settings = Settings {
        engines,
        ..Settings::default()
    };
    settings.search.max_page = 3;
    settings.search.page_size = 2;
    settings.search.concurrency = 2;
    settings.search.company_pause = 0.0;
    settings
}

#[tokio::test]
async fn target_search_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v1/search/all"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": false,
            "results": [
                fofa_row("a.example.com", "1.1.1.1", "80"),
                fofa_row("b.example.com", "1.1.1.1", "443"),
            ],
        })))
        .mount(&server)
        .await;
    Mock::given(path("/api/v1/search/all"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": false,
            "results": [],
        })))
        .mount(&server)
        .await;

    let mut config = EngineConfig::new("fofa")
        .with_api_key("secret")
        .with_email("me@example.com")
        .with_base_url(server.uri());
    config.interval = Some(0.0);
    let settings = settings_for(vec![config]);

    let client = HttpClient::with_settings(&settings.outgoing).unwrap();
    let registry = EngineLoader::load(&settings);
    let search = Search::from_registry(&registry, &client, &settings);
    assert_eq!(search.backend_names(), vec!["fofa"]);

    let targets = vec![Target::ip("1.1.1.1"), Target::domain("example.com")];
    let outcome = search
        .search_targets(&targets, 3, 2, &CancellationToken::new())
        .await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.results.len(), 4);

    // two targets, two pages each
    let stats = search.metrics().get_backend_stats();
    assert_eq!(stats["fofa"].requests, 4);
    assert_eq!(stats["fofa"].assets, 4);
}

#[tokio::test]
async fn company_search_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/data/site"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": [{
                "ip": "5.5.5.5",
                "port": "443",
                "url": "https://portal.example.com/login",
                "company": "Acme",
            }],
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1,
            "message": "无权限",
        })))
        .mount(&server)
        .await;

    let mut config = EngineConfig::new("zone")
        .with_api_key("zkey")
        .with_base_url(server.uri());
    config.interval = Some(0.0);
    let settings = settings_for(vec![config]);

    let client = HttpClient::with_settings(&settings.outgoing).unwrap();
    let registry = EngineLoader::load(&settings);
    let search = CompanySearch::from_registry(&registry, &client, &settings);

    let outcome = search
        .search_companies(&["Acme".to_string()], 1, 10, &CancellationToken::new())
        .await;

    assert!(outcome.error.is_none());
    let sites = outcome.results.get(AssetKind::Site);
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].domain.as_deref(), Some("portal.example.com"));
    assert_eq!(sites[0].port, Some(443));

    for kind in [AssetKind::Domain, AssetKind::Email, AssetKind::Member] {
        let assets = outcome.results.get(kind);
        assert_eq!(assets.len(), 1, "{} placeholder", kind);
        assert!(assets[0].is_placeholder());
    }
}

#[tokio::test]
async fn cancelled_search_returns_partial() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v1/search/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": false,
            "results": [fofa_row("a.example.com", "1.1.1.1", "80")],
        })))
        .mount(&server)
        .await;

    let mut config = EngineConfig::new("fofa")
        .with_api_key("secret")
        .with_email("me@example.com")
        .with_base_url(server.uri());
    config.interval = Some(0.0);
    let settings = settings_for(vec![config]);

    let client = HttpClient::with_settings(&settings.outgoing).unwrap();
    let search = Search::from_registry(&EngineLoader::load(&settings), &client, &settings);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = search
        .search_targets(&[Target::ip("1.1.1.1")], 3, 2, &cancel)
        .await;

    assert!(outcome.cancelled);
    assert!(outcome.results.is_empty());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
