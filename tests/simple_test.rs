mod common;

use actix_web::test;
use serde_json::Value;
use serial_test::serial;

use common::TestApp;

#[actix_rt::test]
#[serial]
async fn test_health_endpoint() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["message"], "TripTrackr API is running");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["database"], "In-memory");
    assert_eq!(body["services"]["storage"]["status"], "fallback");
    assert_eq!(body["services"]["routing"]["details"], "Routing via OSRM");
}

#[actix_rt::test]
#[serial]
async fn test_unknown_route_is_404() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    for uri in ["/api/unknown", "/nothing/here"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Route not found");
    }
}

#[actix_rt::test]
#[serial]
async fn test_security_headers() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get().uri("/api/maps/config").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(resp.headers().get("x-frame-options").unwrap(), "SAMEORIGIN");
}

#[actix_rt::test]
#[serial]
async fn test_malformed_json_is_400() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/itineraries")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"title\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid JSON body");
}

#[actix_rt::test]
#[serial]
async fn test_api_is_rate_limited() {
    let test_app = TestApp::new().with_rate_limit(2);
    let app = test::init_service(test_app.create_app()).await;

    for _ in 0..2 {
        let req = test::TestRequest::get().uri("/api/maps/config").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    let req = test::TestRequest::get().uri("/api/maps/config").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().contains_key("retry-after"));
}
