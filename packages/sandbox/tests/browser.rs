// ABOUTME: Integration tests for browser navigation against a fake devtools endpoint
// ABOUTME: Fakes the /json target surface with wiremock and the command socket with a local WebSocket server

use serde_json::json;
use std::net::TcpListener;
use std::thread;
use tokio_tungstenite::tungstenite::{accept, Message};
use warden_sandbox::BrowserClient;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAKE_PAGE: &str = "<html><body>hi from the fake page</body></html>";

/// Minimal devtools command socket: answers Page.enable, Page.navigate
/// (followed by the load event), and Runtime.evaluate, then hangs up.
fn spawn_fake_devtools() -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut ws = accept(stream).unwrap();

        loop {
            let message = match ws.read() {
                Ok(message) if message.is_text() => message,
                Ok(_) => continue,
                Err(_) => break,
            };

            let frame: serde_json::Value =
                serde_json::from_str(message.to_text().unwrap()).unwrap();
            let id = frame["id"].as_u64().unwrap_or(0);

            match frame["method"].as_str().unwrap_or("") {
                "Page.enable" => {
                    ws.send(Message::Text(json!({ "id": id, "result": {} }).to_string()))
                        .unwrap();
                }
                "Page.navigate" => {
                    ws.send(Message::Text(
                        json!({ "id": id, "result": { "frameId": "frame-1" } }).to_string(),
                    ))
                    .unwrap();
                    ws.send(Message::Text(
                        json!({ "method": "Page.loadEventFired", "params": { "timestamp": 1.0 } })
                            .to_string(),
                    ))
                    .unwrap();
                }
                "Runtime.evaluate" => {
                    ws.send(Message::Text(
                        json!({
                            "id": id,
                            "result": { "result": { "type": "string", "value": FAKE_PAGE } },
                        })
                        .to_string(),
                    ))
                    .unwrap();
                    break;
                }
                _ => {}
            }
        }
    });

    (port, handle)
}

#[tokio::test]
async fn test_navigate_returns_page_content() {
    let (ws_port, ws_thread) = spawn_fake_devtools();

    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/json/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "target-1",
            "type": "page",
            "webSocketDebuggerUrl": format!("ws://127.0.0.1:{}/devtools/page/target-1", ws_port),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BrowserClient::from_base_url(server.uri()).unwrap();
    let result = client.navigate("https://example.com/?q=a&b=c").await;

    assert!(result.success, "navigation failed: {:?}", result.error);
    let data = result.data.unwrap();
    assert_eq!(data["url"], "https://example.com/?q=a&b=c");
    assert!(data["content"]
        .as_str()
        .unwrap()
        .contains("hi from the fake page"));

    ws_thread.join().unwrap();
}

#[tokio::test]
async fn test_current_page_reports_active_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "type": "background_page", "url": "chrome-extension://x", "title": "ext" },
            { "type": "page", "url": "https://example.com/", "title": "Example Domain" },
        ])))
        .mount(&server)
        .await;

    let client = BrowserClient::from_base_url(server.uri()).unwrap();
    let result = client.current_page().await;

    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data["url"], "https://example.com/");
    assert_eq!(data["title"], "Example Domain");
}

#[tokio::test]
async fn test_target_creation_failure_folds_into_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/json/new"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = BrowserClient::from_base_url(server.uri()).unwrap();
    let result = client.navigate("https://example.com").await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("500"));
}
