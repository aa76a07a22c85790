use std::net::TcpListener;
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

#[allow(dead_code)]
pub struct TestServer {
    pub base_url: String,
    pub host: String,
    pub port: u16,
    pub temp_dir: TempDir,
    process: Option<Child>,
}

impl TestServer {
    pub fn new() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind to random port");
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let host = format!("127.0.0.1:{}", port);
        let base_url = format!("http://{}", host);

        let temp_dir = TempDir::new().expect("failed to create temp dir");

        TestServer {
            base_url,
            host,
            port,
            temp_dir,
            process: None,
        }
    }

    pub fn start(&mut self) {
        let workspace_root = std::env::current_dir().expect("failed to get current directory");

        let build_status = Command::new("cargo")
            .args(["build", "--bin", "cratereg"])
            .current_dir(&workspace_root)
            .status()
            .expect("failed to build cratereg");
        assert!(build_status.success(), "failed to build cratereg binary");

        let binary_path = workspace_root.join("target/debug/cratereg");
        assert!(binary_path.exists(), "cratereg binary not found at {:?}", binary_path);

        let child = Command::new(binary_path)
            .args([
                "--host",
                &self.host,
                "--data-dir",
                self.temp_dir.path().to_str().unwrap(),
            ])
            .spawn()
            .expect("failed to start cratereg server");

        let client = reqwest::blocking::Client::new();
        let url = format!("{}/v2/", self.base_url);

        let mut child = child;
        for _ in 0..50 {
            thread::sleep(Duration::from_millis(100));

            if let Ok(Some(_)) = child.try_wait() {
                panic!("server process exited prematurely");
            }

            if client.get(&url).send().is_ok() {
                self.process = Some(child);
                return;
            }
        }

        let _ = child.kill();
        panic!("server failed to start within timeout");
    }

    pub fn stop(&mut self) {
        if let Some(mut process) = self.process.take() {
            let _ = process.kill();
            let _ = process.wait();
        }
    }

    pub fn client(&self) -> TestClient {
        TestClient {
            base_url: self.base_url.clone(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct TestClient {
    pub base_url: String,
    client: reqwest::blocking::Client,
}

#[allow(dead_code)]
impl TestClient {
    fn full(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    pub fn get(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client.get(self.full(path))
    }

    pub fn head(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client.head(self.full(path))
    }

    pub fn post(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client.post(self.full(path))
    }

    pub fn put(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client.put(self.full(path))
    }

    pub fn patch(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client.patch(self.full(path))
    }

    pub fn delete(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client.delete(self.full(path))
    }
}

pub fn sample_blob() -> Vec<u8> {
    b"This is a test blob content".to_vec()
}

pub fn sample_blob_digest() -> String {
    format!("sha256:{}", sha256::digest("This is a test blob content"))
}

pub fn sample_manifest() -> serde_json::Value {
    let blob_digest = sample_blob_digest();
    serde_json::json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.manifest.v1+json",
        "config": {
            "mediaType": "application/vnd.oci.image.config.v1+json",
            "size": 27,
            "digest": blob_digest
        },
        "layers": [
            {
                "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip",
                "size": 27,
                "digest": blob_digest
            }
        ]
    })
}

pub fn sample_manifest_digest(manifest: &serde_json::Value) -> String {
    let manifest_bytes = serde_json::to_vec(manifest).unwrap();
    format!("sha256:{}", sha256::digest(&manifest_bytes))
}

pub fn sample_image_index() -> serde_json::Value {
    let manifest_digest = sample_manifest_digest(&sample_manifest());
    serde_json::json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.index.v1+json",
        "manifests": [
            {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "size": 500,
                "digest": manifest_digest,
                "platform": {
                    "architecture": "amd64",
                    "os": "linux"
                }
            }
        ]
    })
}

/// Extract the path+query portion from an absolute `Location` header value,
/// since the test client already knows its own base URL.
pub fn extract_path(location: &str) -> &str {
    location
        .find("://")
        .and_then(|proto_end| {
            location[proto_end + 3..]
                .find('/')
                .map(|path_start| &location[proto_end + 3 + path_start..])
        })
        .unwrap_or(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_lifecycle() {
        let mut server = TestServer::new();
        server.start();

        let client = server.client();
        let resp = client.get("/v2/").send().unwrap();
        assert_eq!(resp.status(), 200);

        server.stop();
    }

    #[test]
    fn test_sample_data() {
        let blob = sample_blob();
        assert!(!blob.is_empty());

        let digest = sample_blob_digest();
        assert!(digest.starts_with("sha256:"));

        let manifest = sample_manifest();
        assert_eq!(manifest["schemaVersion"], 2);

        let index = sample_image_index();
        assert_eq!(index["schemaVersion"], 2);
    }
}
