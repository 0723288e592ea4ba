#![allow(clippy::unwrap_used)]
// Integration tests for `RestClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use thr_api::types::{CONTROL_SELECT, ControlPatch, ControlWrite};
use thr_api::{Direction, Error, Nulls, Query, RestClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestClient) {
    let server = MockServer::start().await;
    let client = RestClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn control_json(id: &str, tech_id: &str, ranking: Option<i32>) -> serde_json::Value {
    json!({
        "id": id,
        "tech_id": tech_id,
        "control_family": "Access Control",
        "control_type": "Technical",
        "ranking": ranking,
        "monitor_id": null,
        "description": "Lockout threshold",
        "statement": "Account lockout is enforced",
        "recommendation": "Set threshold to 5",
        "thr_code": "lockout: 5",
        "comments": null,
        "created_at": "2024-05-01T09:00:00+00:00",
        "updated_at": "2024-05-02T09:00:00.123456",
        "Tech": {
            "id": tech_id,
            "title": "Windows 11",
            "tech_family_id": "os",
            "TechFamily": { "id": "os", "title": "Operating Systems" }
        }
    })
}

fn patch_body() -> ControlPatch {
    ControlPatch {
        control_family: "Access Control".into(),
        control_type: "Technical".into(),
        ranking: None,
        monitor_id: None,
        description: "d".into(),
        statement: "s".into(),
        recommendation: "r".into(),
        thr_code: "c".into(),
        comments: None,
        updated_at: "2024-06-01T00:00:00Z".into(),
    }
}

// ── Directory ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_families_ordered_by_title() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/TechFamily"))
        .and(query_param("order", "title.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "db", "title": "Databases", "created_at": null },
            { "id": "os", "title": "Operating Systems" },
        ])))
        .mount(&server)
        .await;

    let families = client.list_families().await.unwrap();

    assert_eq!(families.len(), 2);
    assert_eq!(families[0].id, "db");
    assert_eq!(families[1].title, "Operating Systems");
}

#[tokio::test]
async fn test_list_technologies_filters_by_family() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/Tech"))
        .and(query_param("tech_family_id", "eq.os"))
        .and(query_param("order", "title.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "rhel-9", "title": "RHEL 9", "tech_family_id": "os" },
            { "id": "win-11", "title": "Windows 11", "tech_family_id": "os" },
        ])))
        .mount(&server)
        .await;

    let techs = client.list_technologies(Some("os")).await.unwrap();

    assert_eq!(techs.len(), 2);
    assert_eq!(techs[1].id, "win-11");
    assert_eq!(techs[1].tech_family_id, "os");
}

// ── Controls ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_controls_sends_select_filter_order_and_limit() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/Controls"))
        .and(query_param("select", CONTROL_SELECT))
        .and(query_param("tech_id", "eq.win-11"))
        .and(query_param("order", "ranking.asc.nullslast,id.asc"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            control_json("OS-WIN-001", "win-11", Some(1)),
            control_json("OS-WIN-002", "win-11", None),
        ])))
        .mount(&server)
        .await;

    let query = Query::new()
        .eq("tech_id", "win-11")
        .order_nulls("ranking", Direction::Asc, Nulls::Last)
        .order("id", Direction::Asc)
        .limit(50);
    let rows = client.list_controls(&query).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].ranking, Some(1));
    assert_eq!(rows[1].ranking, None);
    let tech = rows[0].tech.as_ref().unwrap();
    assert_eq!(tech.title, "Windows 11");
    assert_eq!(tech.family.as_ref().unwrap().title, "Operating Systems");
}

#[tokio::test]
async fn test_list_controls_search_uses_or_group() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/Controls"))
        .and(query_param(
            "or",
            r#"(id.ilike."*tde*",statement.ilike."*tde*",description.ilike."*tde*")"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let query = Query::new().any_ilike(&["id", "statement", "description"], "tde");
    let rows = client.list_controls(&query).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_get_control_missing_returns_none() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/Controls"))
        .and(query_param("id", "eq.NOPE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(client.get_control("NOPE").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_control_asks_for_representation() {
    let (server, client) = setup().await;
    let body = patch_body();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/Controls"))
        .and(query_param("id", "eq.OS-WIN-001"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(&body))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([control_json("OS-WIN-001", "win-11", None)])),
        )
        .mount(&server)
        .await;

    let rows = client.update_control("OS-WIN-001", &body).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "OS-WIN-001");
}

#[tokio::test]
async fn test_update_missing_control_returns_no_rows() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/Controls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let rows = client.update_control("NEW-1", &patch_body()).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_insert_control_posts_body() {
    let (server, client) = setup().await;
    let body = ControlWrite {
        id: "NEW-1".into(),
        tech_id: "win-11".into(),
        control_family: "Audit".into(),
        control_type: "Technical".into(),
        ranking: Some(3),
        monitor_id: None,
        description: "d".into(),
        statement: "s".into(),
        recommendation: "r".into(),
        thr_code: "c".into(),
        comments: Some("note".into()),
        updated_at: None,
    };

    Mock::given(method("POST"))
        .and(path("/rest/v1/Controls"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(&body))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([control_json("NEW-1", "win-11", Some(3))])),
        )
        .mount(&server)
        .await;

    let rows = client.insert_control(&body).await.unwrap();
    assert_eq!(rows[0].id, "NEW-1");
}

#[tokio::test]
async fn test_delete_control() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/Controls"))
        .and(query_param("id", "eq.OS-WIN-003"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_control("OS-WIN-003").await.unwrap();
}

// ── Auth headers ────────────────────────────────────────────────────

#[tokio::test]
async fn test_api_key_headers_are_sent() {
    let server = MockServer::start().await;
    let key = SecretString::from(String::from("anon-key"));
    let client =
        RestClient::from_api_key(&server.uri(), &key, &TransportConfig::default()).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/TechFamily"))
        .and(header("apikey", "anon-key"))
        .and(header("Authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.list_families().await.unwrap().is_empty());
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_invalid_api_key() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/TechFamily"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid API key"
        })))
        .mount(&server)
        .await;

    let err = client.list_families().await.unwrap_err();
    assert!(matches!(err, Error::InvalidApiKey));
}

#[tokio::test]
async fn test_store_error_is_parsed() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/Controls"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "details": "Key (id)=(NEW-1) already exists.",
            "hint": null,
            "message": "duplicate key value violates unique constraint \"Controls_pkey\""
        })))
        .mount(&server)
        .await;

    let body = ControlWrite {
        id: "NEW-1".into(),
        tech_id: "win-11".into(),
        control_family: "a".into(),
        control_type: "b".into(),
        ranking: None,
        monitor_id: None,
        description: "d".into(),
        statement: "s".into(),
        recommendation: "r".into(),
        thr_code: "c".into(),
        comments: None,
        updated_at: None,
    };
    let err = client.insert_control(&body).await.unwrap_err();

    assert!(err.is_conflict());
    match err {
        Error::Api {
            status,
            message,
            code,
            ..
        } => {
            assert_eq!(status, 409);
            assert_eq!(code.as_deref(), Some("23505"));
            assert!(message.contains("duplicate key"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/Tech"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client.list_technologies(Some("os")).await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert!(body.contains("gateway")),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plain_text_error_body_is_kept() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/Controls"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client.delete_control("X").await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 503, .. }));
    assert!(err.to_string().contains("upstream down"));
}
