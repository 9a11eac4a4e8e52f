// SPDX-License-Identifier: MIT

use super::*;
use crate::chunk::FileChunk;
use crate::test_http::TestHttpServer;
use serde_json::json;

fn chunk(id: &str, file_path: &str) -> FileChunk {
    FileChunk {
        id: id.to_string(),
        file_path: file_path.to_string(),
        language: "typescript".to_string(),
        start_line: 1,
        end_line: 4,
        text: "const x = 1;".to_string(),
        indexed_at: 1000,
    }
}

async fn client_against(server: &TestHttpServer) -> VectorStoreClient {
    VectorStoreClient::new(VectorStoreConfig {
        base_url: server.base_url(),
        collection: "test-code".to_string(),
    })
}

#[test]
fn point_uuids_are_deterministic() {
    let first = point_uuid("src/a.ts:1");
    let second = point_uuid("src/a.ts:1");
    assert_eq!(first, second);
    assert_ne!(first, point_uuid("src/a.ts:2"));

    // Shape check: parses as a UUID.
    assert!(uuid::Uuid::parse_str(&first).is_ok());
}

#[tokio::test]
async fn init_collection_skips_creation_when_present() {
    let server = TestHttpServer::start().await;
    server.route("GET", "/collections/test-code", 200, json!({"result": {}}));

    let client = client_against(&server).await;
    client.init_collection(768).await.unwrap();

    assert!(server.requests_for("PUT", "/collections/test-code").is_empty());
}

#[tokio::test]
async fn init_collection_creates_with_cosine_distance() {
    let server = TestHttpServer::start().await;
    server.route("GET", "/collections/test-code", 404, json!({}));
    server.route("PUT", "/collections/test-code", 200, json!({"result": true}));

    let client = client_against(&server).await;
    client.init_collection(768).await.unwrap();

    let creations = server.requests_for("PUT", "/collections/test-code");
    assert_eq!(creations.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&creations[0].body).unwrap();
    assert_eq!(body["vectors"]["size"], 768);
    assert_eq!(body["vectors"]["distance"], "Cosine");
}

#[tokio::test]
async fn init_collection_surfaces_creation_failure() {
    let server = TestHttpServer::start().await;
    server.route("GET", "/collections/test-code", 404, json!({}));
    server.route("PUT", "/collections/test-code", 500, json!({}));

    let client = client_against(&server).await;
    assert!(matches!(
        client.init_collection(768).await,
        Err(IndexError::Http { status: 500, .. })
    ));
}

#[tokio::test]
async fn upsert_sends_uuid_ids_with_original_id_in_payload() {
    let server = TestHttpServer::start().await;
    server.route("PUT", "/collections/test-code/points", 200, json!({"result": {}}));

    let client = client_against(&server).await;
    let point = UpsertPoint {
        id: "src/a.ts:1".to_string(),
        vector: vec![0.5, 0.5],
        chunk: chunk("src/a.ts:1", "src/a.ts"),
    };
    client.upsert(&[point]).await.unwrap();

    let requests = server.requests_for("PUT", "/collections/test-code/points");
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    let sent = &body["points"][0];

    assert_eq!(sent["id"], point_uuid("src/a.ts:1"));
    assert_eq!(sent["payload"]["id"], "src/a.ts:1");
    assert_eq!(sent["payload"]["filePath"], "src/a.ts");
    assert_eq!(sent["vector"], json!([0.5, 0.5]));
}

#[tokio::test]
async fn upsert_of_nothing_is_a_no_op() {
    let server = TestHttpServer::start().await;
    let client = client_against(&server).await;
    client.upsert(&[]).await.unwrap();
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn search_maps_hits_to_chunks_and_scores() {
    let server = TestHttpServer::start().await;
    server.route(
        "POST",
        "/collections/test-code/points/search",
        200,
        json!({
            "result": [
                { "id": "u1", "score": 0.91, "payload": chunk("src/a.ts:1", "src/a.ts") },
                { "id": "u2", "score": 0.40, "payload": chunk("src/b.ts:9", "src/b.ts") }
            ]
        }),
    );

    let client = client_against(&server).await;
    let hits = client.search(&[0.1, 0.2], 5).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.file_path, "src/a.ts");
    assert!((hits[0].score - 0.91).abs() < 1e-4);

    let request = &server.requests_for("POST", "/collections/test-code/points/search")[0];
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["with_payload"], true);
    assert_eq!(body["limit"], 5);
}

#[tokio::test]
async fn delete_by_file_path_sends_exact_match_filter() {
    let server = TestHttpServer::start().await;
    server.route("POST", "/collections/test-code/points/delete", 200, json!({"result": {}}));

    let client = client_against(&server).await;
    client.delete_by_file_path("src/gone.ts").await.unwrap();

    let request = &server.requests_for("POST", "/collections/test-code/points/delete")[0];
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        body["filter"]["must"],
        json!([{ "key": "filePath", "match": { "value": "src/gone.ts" } }])
    );
}

#[tokio::test]
async fn clear_collection_tolerates_absence() {
    let server = TestHttpServer::start().await;
    server.route("DELETE", "/collections/test-code", 404, json!({}));

    let client = client_against(&server).await;
    client.clear_collection().await.unwrap();
}

#[tokio::test]
async fn collection_info_parses_counts() {
    let server = TestHttpServer::start().await;
    server.route(
        "GET",
        "/collections/test-code",
        200,
        json!({
            "result": {
                "points_count": 42,
                "config": { "params": { "vectors": { "size": 768 } } }
            }
        }),
    );

    let client = client_against(&server).await;
    let info = client.get_collection_info().await.unwrap();
    assert_eq!(info, CollectionInfo { points_count: 42, vector_size: 768 });
}

#[tokio::test]
async fn collection_info_is_none_on_failure() {
    let server = TestHttpServer::start().await;
    server.route("GET", "/collections/test-code", 500, json!({}));
    let client = client_against(&server).await;
    assert!(client.get_collection_info().await.is_none());

    let dead = VectorStoreClient::new(VectorStoreConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        collection: "x".to_string(),
    });
    assert!(dead.get_collection_info().await.is_none());
}
