mod common;

use common::*;
use serial_test::serial;

#[test]
#[serial]
fn test_storage_blob_write_read_roundtrip() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let resp = client.post("/v2/store/blobs/uploads/").send().unwrap();
    let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();

    let blob = sample_blob();
    let resp = client.patch(extract_path(&location)).body(blob.clone()).send().unwrap();
    let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();

    let digest = sample_blob_digest();
    let resp = client
        .put(&format!("{}?digest={}", extract_path(&location), digest))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client.get(&format!("/v2/store/blobs/{}", digest)).send().unwrap();
    assert_eq!(resp.bytes().unwrap().as_ref(), blob.as_slice());
}

#[test]
#[serial]
fn test_storage_blob_metadata_via_head() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let resp = client.post("/v2/store/blobs/uploads/").send().unwrap();
    let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();
    let resp = client.patch(extract_path(&location)).body(sample_blob()).send().unwrap();
    let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();
    let digest = sample_blob_digest();
    client
        .put(&format!("{}?digest={}", extract_path(&location), digest))
        .send()
        .unwrap();

    let resp = client.head(&format!("/v2/store/blobs/{}", digest)).send().unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-length").unwrap(),
        &sample_blob().len().to_string()
    );
    assert_eq!(resp.headers().get("docker-content-digest").unwrap(), &digest);
}

#[test]
#[serial]
fn test_storage_digest_mismatch_rejected_on_finalize() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let resp = client.post("/v2/store/blobs/uploads/").send().unwrap();
    let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();
    let resp = client.patch(extract_path(&location)).body(b"content".to_vec()).send().unwrap();
    let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();

    let bogus = "sha256:1111111111111111111111111111111111111111111111111111111111111111";
    let resp = client
        .put(&format!("{}?digest={}", extract_path(&location), bogus))
        .send()
        .unwrap();

    assert_eq!(resp.status(), 400);
}

#[test]
#[serial]
fn test_storage_upload_session_multi_chunk_append() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let resp = client.post("/v2/store/blobs/uploads/").send().unwrap();
    let mut location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();

    let chunk_a = b"hello ".to_vec();
    let resp = client
        .patch(extract_path(&location))
        .header("Content-Range", "0-5")
        .body(chunk_a.clone())
        .send()
        .unwrap();
    assert_eq!(resp.status(), 202);
    assert_eq!(resp.headers().get("range").unwrap(), "0-5");
    location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();

    let chunk_b = b"world".to_vec();
    let resp = client
        .patch(extract_path(&location))
        .header("Content-Range", "6-10")
        .body(chunk_b.clone())
        .send()
        .unwrap();
    assert_eq!(resp.status(), 202);
    assert_eq!(resp.headers().get("range").unwrap(), "0-10");
    location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();

    let full = [chunk_a, chunk_b].concat();
    let digest = format!("sha256:{}", sha256::digest(full.as_slice()));
    let resp = client
        .put(&format!("{}?digest={}", extract_path(&location), digest))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client.get(&format!("/v2/store/blobs/{}", digest)).send().unwrap();
    assert_eq!(resp.bytes().unwrap().as_ref(), full.as_slice());
}

#[test]
#[serial]
fn test_storage_append_rejects_non_contiguous_range() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let resp = client.post("/v2/store/blobs/uploads/").send().unwrap();
    let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();

    client
        .patch(extract_path(&location))
        .header("Content-Range", "0-3")
        .body(b"abcd".to_vec())
        .send()
        .unwrap();

    // Second chunk claims to start at byte 0 again instead of byte 4 (I5).
    let resp = client
        .patch(extract_path(&location))
        .header("Content-Range", "0-3")
        .body(b"efgh".to_vec())
        .send()
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["errors"][0]["code"], "BLOB_UPLOAD_INVALID");
}

#[test]
#[serial]
fn test_storage_append_to_unknown_session() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let resp = client
        .patch("/v2/store/blobs/uploads/00000000000000000000000000000000")
        .body(b"data".to_vec())
        .send()
        .unwrap();

    assert_eq!(resp.status(), 404);
}

#[test]
#[serial]
fn test_storage_manifest_write_read_roundtrip() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let manifest = sample_manifest();
    let put_resp = client
        .put("/v2/store/manifests/latest")
        .header("Content-Type", "application/vnd.oci.image.manifest.v1+json")
        .json(&manifest)
        .send()
        .unwrap();
    let digest = put_resp
        .headers()
        .get("docker-content-digest")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let by_tag = client.get("/v2/store/manifests/latest").send().unwrap();
    let by_digest = client.get(&format!("/v2/store/manifests/{}", digest)).send().unwrap();

    assert_eq!(by_tag.status(), 200);
    assert_eq!(by_digest.status(), 200);
    let tag_body = by_tag.bytes().unwrap();
    let digest_body = by_digest.bytes().unwrap();
    assert_eq!(tag_body.as_ref(), digest_body.as_ref());
}

#[test]
#[serial]
fn test_storage_manifest_digest_fallback_scan() {
    // An image index isn't hardlinked to any tag, so resolving it by
    // digest must fall back to scanning the repo's manifest files.
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let index = sample_image_index();
    let put_resp = client
        .put("/v2/store/manifests/indexonly")
        .header("Content-Type", "application/vnd.oci.image.index.v1+json")
        .json(&index)
        .send()
        .unwrap();
    assert_eq!(put_resp.status(), 201);
    let digest = put_resp
        .headers()
        .get("docker-content-digest")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let resp = client.get(&format!("/v2/store/manifests/{}", digest)).send().unwrap();
    assert_eq!(resp.status(), 200);
}

#[test]
#[serial]
fn test_storage_media_type_injection_on_get() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let manifest_without_media_type = serde_json::json!({
        "schemaVersion": 2,
        "config": { "mediaType": "application/vnd.oci.image.config.v1+json", "size": 27, "digest": sample_blob_digest() },
        "layers": []
    });

    client
        .put("/v2/store/manifests/bare")
        .header("Content-Type", "application/vnd.oci.image.manifest.v1+json")
        .json(&manifest_without_media_type)
        .send()
        .unwrap();

    let resp = client.get("/v2/store/manifests/bare").send().unwrap();
    let json: serde_json::Value = resp.json().unwrap();
    assert!(json.get("mediaType").is_some());
}

#[test]
#[serial]
fn test_storage_malformed_path_does_not_match_manifest_route() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let resp = client.get("/v2/../../etc/passwd/manifests/latest").send().unwrap();

    assert_ne!(resp.status(), 200);
}

#[test]
#[serial]
fn test_storage_concurrent_uploads_same_repo_are_independent() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    let resp_a = client.post("/v2/store/blobs/uploads/").send().unwrap();
    let resp_b = client.post("/v2/store/blobs/uploads/").send().unwrap();

    let uuid_a = resp_a.headers().get("docker-upload-uuid").unwrap().to_str().unwrap().to_string();
    let uuid_b = resp_b.headers().get("docker-upload-uuid").unwrap().to_str().unwrap().to_string();
    assert_ne!(uuid_a, uuid_b);

    let location_a = resp_a.headers().get("location").unwrap().to_str().unwrap().to_string();
    let location_b = resp_b.headers().get("location").unwrap().to_str().unwrap().to_string();

    client.patch(extract_path(&location_a)).body(b"first".to_vec()).send().unwrap();
    client.patch(extract_path(&location_b)).body(b"second".to_vec()).send().unwrap();

    let digest_a = format!("sha256:{}", sha256::digest("first"));
    let digest_b = format!("sha256:{}", sha256::digest("second"));

    let resp_a = client
        .put(&format!("/v2/store/blobs/uploads/{}?digest={}", uuid_a, digest_a))
        .send()
        .unwrap();
    let resp_b = client
        .put(&format!("/v2/store/blobs/uploads/{}?digest={}", uuid_b, digest_b))
        .send()
        .unwrap();

    assert_eq!(resp_a.status(), 201);
    assert_eq!(resp_b.status(), 201);
}

#[test]
#[serial]
fn test_storage_finalize_dedups_identical_content() {
    let mut server = TestServer::new();
    server.start();
    let client = server.client();

    for _ in 0..2 {
        let resp = client.post("/v2/store/blobs/uploads/").send().unwrap();
        let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();
        let resp = client.patch(extract_path(&location)).body(sample_blob()).send().unwrap();
        let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();
        let digest = sample_blob_digest();
        let resp = client
            .put(&format!("{}?digest={}", extract_path(&location), digest))
            .send()
            .unwrap();
        assert_eq!(resp.status(), 201);
    }
}
