use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use devin_api::{
    AttachmentRecord, CreateSessionRequest, DevinApiClient, DevinApiConfig, DevinApiError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn allow_local_integration() -> bool {
    std::env::var("DEVIN_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
struct Route {
    path: &'static str,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

fn route(path: &'static str, status: u16, content_type: &'static str, body: &[u8]) -> Route {
    Route {
        path,
        status,
        content_type,
        body: body.to_vec(),
    }
}

#[derive(Debug, Clone)]
struct CapturedRequest {
    method: String,
    path: String,
    head: String,
    body: Vec<u8>,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(routes: Vec<Route>) -> Self {
        let routes = Arc::new(routes);
        let request_count = Arc::new(AtomicUsize::new(0));
        let captured = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}/v1/");

        let handle = tokio::spawn({
            let routes = Arc::clone(&routes);
            let request_count = Arc::clone(&request_count);
            let captured = Arc::clone(&captured);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let routes = Arc::clone(&routes);
                    let request_count = Arc::clone(&request_count);
                    let captured = Arc::clone(&captured);
                    tokio::spawn(async move {
                        serve_one(socket, routes, request_count, captured).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            captured,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches("v1/"), path.trim_start_matches('/'))
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn captured(&self) -> Vec<CapturedRequest> {
        self.captured.lock().expect("captured lock").clone()
    }

    fn client(&self) -> DevinApiClient {
        DevinApiClient::new(DevinApiConfig::new("tok").with_base_url(&self.base_url))
            .expect("client")
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

async fn serve_one(
    mut socket: TcpStream,
    routes: Arc<Vec<Route>>,
    request_count: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    request_count.fetch_add(1, Ordering::AcqRel);

    let route = routes
        .iter()
        .find(|route| route.path == request.path)
        .cloned()
        .unwrap_or_else(|| route("", 404, "text/plain", b""));
    captured.lock().expect("captured lock").push(request);

    let head = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        route.content_type,
        route.body.len()
    );
    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(&route.body).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(position) = find(&buffer, b"\r\n\r\n") {
            break position + 4;
        }
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < head_end + content_length {
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    Some(CapturedRequest {
        method,
        path,
        head,
        body: buffer[head_end..].to_vec(),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[tokio::test]
async fn session_integration_success_maps_response() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![route(
        "/v1/sessions",
        200,
        "application/json",
        br#"{"session_id":"devin-123","url":"https://app.devin.ai/sessions/123","is_new_session":null}"#,
    )])
    .await;

    let created = server
        .client()
        .create_session(&CreateSessionRequest::new("Title", "Prompt"))
        .await
        .expect("session should be created");

    assert_eq!(created.session_id, "devin-123");
    assert_eq!(created.session_url, "https://app.devin.ai/sessions/123");
    assert_eq!(created.is_new_session, None);

    let captured = server.captured();
    assert_eq!(captured[0].method, "POST");
    assert!(captured[0]
        .head
        .to_ascii_lowercase()
        .contains("authorization: bearer tok"));
    let body: serde_json::Value = serde_json::from_slice(&captured[0].body).expect("json body");
    assert_eq!(body["idempotent"], true);

    server.shutdown();
}

#[tokio::test]
async fn session_integration_error_detail_is_surfaced() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![route(
        "/v1/sessions",
        403,
        "application/json",
        br#"{"detail":"Repository not connected"}"#,
    )])
    .await;

    let error = server
        .client()
        .create_session(&CreateSessionRequest::new("Title", "Prompt"))
        .await
        .expect_err("request should fail");

    assert_eq!(error.to_string(), "Repository not connected");
    assert_eq!(server.request_count(), 1);

    server.shutdown();
}

#[tokio::test]
async fn session_integration_malformed_success_is_invalid_response() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![route(
        "/v1/sessions",
        200,
        "application/json",
        br#"{"session_id":"devin-123"}"#,
    )])
    .await;

    let error = server
        .client()
        .create_session(&CreateSessionRequest::new("Title", "Prompt"))
        .await
        .expect_err("response should be rejected");

    assert!(matches!(error, DevinApiError::InvalidResponse(_)));
    assert_eq!(error.to_string(), "Invalid response from Devin API");

    server.shutdown();
}

#[tokio::test]
async fn upload_integration_downloads_then_posts_multipart() {
    if !allow_local_integration() {
        return;
    }

    let file_bytes = [0u8, 159, 146, 150, 255];
    let server = ScriptedServer::new(vec![
        route("/files/a.bin", 200, "application/octet-stream", &file_bytes),
        route(
            "/v1/attachments",
            200,
            "text/plain",
            b"  https://devin/attachments/a.bin\n",
        ),
    ])
    .await;

    let attachment = AttachmentRecord::new(
        "a.bin",
        "application/octet-stream",
        server.url("/files/a.bin"),
    );
    let url = server
        .client()
        .upload_attachment(&attachment)
        .await
        .expect("upload should succeed");
    assert_eq!(url, "https://devin/attachments/a.bin");

    let captured = server.captured();
    let upload = captured
        .iter()
        .find(|request| request.path == "/v1/attachments")
        .expect("upload request");
    assert!(upload
        .head
        .to_ascii_lowercase()
        .contains("content-type: multipart/form-data; boundary=----formboundary"));
    assert!(find(&upload.body, &file_bytes).is_some());
    assert!(upload.body.ends_with(b"--\r\n"));

    server.shutdown();
}

#[tokio::test]
async fn upload_integration_empty_body_is_an_error() {
    if !allow_local_integration() {
        return;
    }

    let server =
        ScriptedServer::new(vec![route("/v1/attachments", 200, "text/plain", b"  ")]).await;
    let attachment = AttachmentRecord::new("a.txt", "text/plain", "unused")
        .with_raw_bytes(b"inline".to_vec());

    let error = server
        .client()
        .upload_attachment(&attachment)
        .await
        .expect_err("empty body should fail");
    assert!(matches!(error, DevinApiError::EmptyUploadUrl));
    assert_eq!(server.request_count(), 1);

    server.shutdown();
}

#[tokio::test]
async fn upload_integration_fails_fast_on_missing_download() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![
        route("/files/ok.txt", 200, "text/plain", b"ok"),
        route("/v1/attachments", 200, "text/plain", b"https://devin/ok"),
    ])
    .await;

    let attachments = vec![
        AttachmentRecord::new("ok.txt", "text/plain", server.url("/files/ok.txt")),
        AttachmentRecord::new("gone.txt", "text/plain", server.url("/files/gone.txt")),
    ];
    let error = server
        .client()
        .upload_attachments(&attachments)
        .await
        .expect_err("missing download should fail the batch");

    assert_eq!(error.to_string(), "Failed to fetch attachment gone.txt: 404");

    server.shutdown();
}
