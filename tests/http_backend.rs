mod support;

use std::sync::{Arc, Mutex};

use authsync::{RoleResolver, RoleSet, Session, SessionStore, SyncOptions};
use backend_api::BackendApiConfig;
use identity_backend_http::HttpIdentityBackend;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use support::{lock_unpoisoned, wait_until};

/// Answers by request path; records every request line.
struct RoutedServer {
    base_url: String,
    request_lines: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl RoutedServer {
    async fn new(user_body: &'static str, roles_body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let request_lines = Arc::new(Mutex::new(Vec::new()));

        let handle = tokio::spawn({
            let request_lines = Arc::clone(&request_lines);
            async move {
                while let Ok((socket, _)) = listener.accept().await {
                    let request_lines = Arc::clone(&request_lines);
                    tokio::spawn(async move {
                        serve_one(socket, user_body, roles_body, request_lines).await;
                    });
                }
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            request_lines,
            handle,
        }
    }

    fn request_lines(&self) -> Vec<String> {
        lock_unpoisoned(&self.request_lines).clone()
    }

    fn backend(&self) -> Arc<HttpIdentityBackend> {
        Arc::new(
            HttpIdentityBackend::new(BackendApiConfig::new(&self.base_url, "anon-key"))
                .expect("backend client"),
        )
    }
}

impl Drop for RoutedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn token_lifecycle_drives_session_and_roles_over_http() {
    let server = RoutedServer::new(
        r#"{"id":"u1","email":"ada@example.com"}"#,
        r#"[{"role":"admin"},{"role":"moderator"},{"role":"admin"}]"#,
    )
    .await;
    let backend = server.backend();
    let store = SessionStore::new(backend.clone(), SyncOptions::default());
    let resolver =
        RoleResolver::attach(&store, backend.clone(), SyncOptions::default()).expect("attach");

    let initial = store.initialize().await.expect("initialize");
    assert_eq!(initial.session, Session::Unauthenticated);
    assert!(server.request_lines().is_empty());

    backend.set_access_token("session-jwt");
    wait_until(|| store.current() == Session::authenticated("u1")).await;
    wait_until(|| !resolver.loading()).await;
    assert_eq!(resolver.current(), RoleSet::from_names(["admin", "moderator"]));

    backend.clear_access_token();
    wait_until(|| store.current() == Session::Unauthenticated).await;
    assert_eq!(resolver.current(), RoleSet::empty());

    assert_eq!(
        server.request_lines(),
        vec![
            "GET /auth/v1/user HTTP/1.1".to_string(),
            "GET /rest/v1/user_roles?select=role&user_id=eq.u1 HTTP/1.1".to_string(),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_token_resolves_to_unauthenticated() {
    let server = RoutedServer::new("", "[]").await;
    let backend = server.backend();
    let store = SessionStore::new(backend.clone(), SyncOptions::default());
    store.initialize().await.expect("initialize");

    backend.set_access_token("expired-jwt");
    wait_until(|| !server.request_lines().is_empty()).await;
    support::settle().await;

    assert_eq!(store.current(), Session::Unauthenticated);
    assert_eq!(store.current_transition().seq, 1);
}

async fn serve_one(
    mut socket: TcpStream,
    user_body: &'static str,
    roles_body: &'static str,
    request_lines: Arc<Mutex<Vec<String>>>,
) {
    let Ok(request_line) = read_request_line(&mut socket).await else {
        return;
    };
    lock_unpoisoned(&request_lines).push(request_line.clone());

    let path = request_line.split_whitespace().nth(1).unwrap_or_default();
    let (status, reason, body) = if path.starts_with("/auth/v1/user") {
        if user_body.is_empty() {
            (401, "Unauthorized", r#"{"msg":"invalid JWT"}"#)
        } else {
            (200, "OK", user_body)
        }
    } else if path.starts_with("/rest/v1/user_roles") {
        (200, "OK", roles_body)
    } else {
        (404, "Not Found", r#"{"message":"unknown route"}"#)
    };

    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len(),
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }
    let _ = socket.write_all(body.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request_line(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
        if request.windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
    }

    let text = String::from_utf8_lossy(&request);
    Ok(text.lines().next().unwrap_or_default().to_string())
}
