//! Integration tests for `CatalogClient` against a mocked catalog service.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vistet_core::ScrapedProduct;
use vistet_scraper::{CatalogClient, ScraperError};

fn client_for(server: &MockServer) -> CatalogClient {
    CatalogClient::new(&format!("{}/api/", server.uri()), "vistet-test/0.1", 5, 5)
        .expect("failed to build catalog client")
}

fn product(id: i64, title: &str) -> ScrapedProduct {
    ScrapedProduct::from_value(&json!({
        "id": id,
        "gid": format!("gid://shopify/Product/{id}"),
        "vendor": "REHAB CLO.",
        "type": "Shorts",
        "title": title,
        "variants": [{"id": 1, "price": 3_799_000, "name": format!("{title} - S"), "public_title": "S", "sku": ""}],
        "image_url": "https://rehabclo.cl/cdn/a.jpg"
    }))
    .expect("valid fixture")
}

#[tokio::test]
async fn created_product_reports_201() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/clothe/from-scraped/"))
        .and(body_partial_json(json!({"id": 7, "title": "Jorts", "type": "Shorts"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1, "name": "Jorts"})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .submit_product(&product(7, "Jorts"))
        .await
        .expect("submission should succeed");

    assert!(outcome.created);
    assert_eq!(outcome.id, 1);
    assert_eq!(outcome.name, "Jorts");
}

#[tokio::test]
async fn updated_product_reports_200() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/clothe/from-scraped/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Jorts"})))
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .submit_product(&product(7, "Jorts"))
        .await
        .unwrap();

    assert!(!outcome.created);
}

#[tokio::test]
async fn validation_failure_keeps_field_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/clothe/from-scraped/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": "validation_error",
                "message": "invalid product",
                "fields": {"image_url": ["Enter a valid URL."]}
            },
            "meta": {"request_id": "abc", "timestamp": "2026-10-19T00:00:00Z"}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit_product(&product(7, "Jorts"))
        .await
        .unwrap_err();

    match &err {
        ScraperError::Rejected { status, message, .. } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "invalid product");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert!(err.field_errors().is_some_and(|f| f.contains("image_url")));
}

#[tokio::test]
async fn submissions_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit_product(&product(7, "Jorts"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScraperError::UnexpectedStatus { status: 503, .. }
    ));
}

#[tokio::test]
async fn slow_catalog_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": 1, "name": "Jorts"}))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = CatalogClient::new(&format!("{}/api/", server.uri()), "vistet-test/0.1", 1, 1)
        .expect("failed to build catalog client");
    let err = client.submit_product(&product(7, "Jorts")).await.unwrap_err();

    match err {
        ScraperError::Http(e) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn bulk_submission_wraps_products_and_reads_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/clothe/bulk-from-scraped/"))
        .and(body_partial_json(json!({"products": [{"id": 1}, {"id": 2}]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "Processed 2 products",
            "created": 1,
            "updated": 1,
            "skipped": [],
            "created_items": [{"id": 10, "name": "A"}],
            "updated_items": [{"id": 11, "name": "B"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .submit_bulk(&[product(1, "A"), product(2, "B")])
        .await
        .expect("bulk submission should succeed");

    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.updated, 1);
    assert!(outcome.skipped.is_empty());
    assert_eq!(outcome.message, "Processed 2 products");
}

#[tokio::test]
async fn bulk_submission_reports_skipped_entries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/clothe/bulk-from-scraped/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Processed 1 products",
            "created": 0,
            "updated": 1,
            "skipped": [{"index": 1, "title": "", "error": "title: This field may not be blank."}],
            "created_items": [],
            "updated_items": [{"id": 11, "name": "B"}]
        })))
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .submit_bulk(&[product(1, "B")])
        .await
        .unwrap();

    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].index, 1);
}

#[tokio::test]
async fn bulk_success_with_garbage_body_is_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).submit_bulk(&[]).await.unwrap_err();
    assert!(matches!(err, ScraperError::Deserialize { .. }));
}
