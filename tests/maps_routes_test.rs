mod common;

use actix_web::test;
use serde_json::Value;
use serial_test::serial;

use common::TestApp;

#[actix_rt::test]
#[serial]
async fn test_config_reports_capabilities() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get().uri("/api/maps/config").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["routing"], true);
    assert_eq!(body["routing_provider"], "OSRM");
    assert_eq!(body["places"], false);
}

#[actix_rt::test]
#[serial]
async fn test_geocode_falls_through_to_open_data() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get().uri("/api/maps/geocode/Goa").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["address"], "Goa, India");
    assert_eq!(body["coordinates"]["lng"], 73.82);

    let req = test::TestRequest::get().uri("/api/maps/geocode/Nowhere").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unable to geocode address");
}

#[actix_rt::test]
#[serial]
async fn test_search_filters_administrative_places() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get().uri("/api/maps/places/museums?source=osm").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["query"], "museums");
    assert_eq!(body["total_results"], 1);
    assert_eq!(body["results"][0]["name"], "Goa State Museum");
}

#[actix_rt::test]
#[serial]
async fn test_place_details() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get().uri("/api/maps/place/osm-node-1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["place_id"], "osm-node-1");
    assert_eq!(body["reviews"].as_array().unwrap().len(), 0);

    let req = test::TestRequest::get().uri("/api/maps/place/unknown").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
#[serial]
async fn test_directions() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/maps/directions?origin=15.49,73.82&destination=15.5,73.83&mode=walking")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["summary"], "Fake route");
    assert_eq!(body["distance"]["text"], "1.0 km");
    assert_eq!(body["start_address"], "15.49,73.82");

    let req = test::TestRequest::get().uri("/api/maps/directions?origin=Panaji").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Origin and destination are required");

    let req = test::TestRequest::get()
        .uri("/api/maps/directions?origin=Panaji&destination=Margao")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid coordinates for routing");
}

#[actix_rt::test]
#[serial]
async fn test_nearby_resolves_free_text_center() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get().uri("/api/maps/nearby?query=Goa&radius=2000").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["center"], "15.49,73.82");
    assert_eq!(body["radius"], 2000.0);
    assert_eq!(body["source"], "OSM");
    assert_eq!(body["total_results"], 1);
    assert_eq!(body["results"][0]["place_id"], "osm-node-1");
}

#[actix_rt::test]
#[serial]
async fn test_nearby_parameter_errors() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    for (uri, message) in [
        ("/api/maps/nearby", "Provide either location or query"),
        ("/api/maps/nearby?location=north-goa", "Location must be in lat,lng format"),
        ("/api/maps/nearby?query=Atlantis", "Unable to resolve location"),
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], message);
    }
}

#[actix_rt::test]
#[serial]
async fn test_accommodations_near_coordinates() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/maps/accommodations?location=15.49,73.82")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["radius"], 3000.0);
    assert_eq!(body["total_results"], 1);
    assert_eq!(body["results"][0]["name"], "Mandovi Hotel");
}
