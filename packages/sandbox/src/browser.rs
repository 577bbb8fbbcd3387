// ABOUTME: Browser navigation driven over the sandbox's Chrome debugging endpoint
// ABOUTME: Creates a page target over the /json HTTP surface and speaks the devtools protocol via WebSocket

use crate::error::HandleError;
use crate::types::{Sandbox, ToolResult};
use futures_util::{SinkExt, StreamExt};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

/// Port the in-sandbox Chrome exposes its debugging protocol on.
pub const CDP_PORT: u16 = 9222;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Drives the sandbox's browser through its remote-debugging endpoint.
///
/// The browser is not behind the tool HTTP API: once the sandbox's
/// address is known, Chrome is controlled directly over its own protocol.
/// Failures fold into `ToolResult` like every other tool operation.
#[derive(Debug, Clone)]
pub struct BrowserClient {
    http: Client,
    base_url: String,
}

impl BrowserClient {
    pub fn new(sandbox: &Sandbox) -> Result<Self, HandleError> {
        Self::from_base_url(format!("http://{}:{}", sandbox.addr, CDP_PORT))
    }

    pub fn from_base_url(base_url: impl Into<String>) -> Result<Self, HandleError> {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Navigate to a URL and return the resulting page content.
    pub async fn navigate(&self, url: &str) -> ToolResult {
        if url.is_empty() {
            return ToolResult::failure("required field 'url' is empty");
        }

        match tokio::time::timeout(NAVIGATION_TIMEOUT, self.navigate_inner(url)).await {
            Ok(Ok(content)) => ToolResult::success(
                format!("Navigated to {}", url),
                Some(json!({ "url": url, "content": content })),
            ),
            Ok(Err(error)) => ToolResult::failure(format!("Browser navigation failed: {}", error)),
            Err(_) => ToolResult::failure(format!(
                "Browser navigation to {} timed out after {:?}",
                url, NAVIGATION_TIMEOUT
            )),
        }
    }

    /// Report the active page target's URL and title.
    pub async fn current_page(&self) -> ToolResult {
        let url = format!("{}/json/list", self.base_url);
        let targets: Vec<Value> = match self.http.get(&url).send().await {
            Ok(response) => match response.json().await {
                Ok(targets) => targets,
                Err(e) => {
                    return ToolResult::failure(format!("Malformed target list: {}", e));
                }
            },
            Err(e) => return ToolResult::failure(format!("Browser endpoint unreachable: {}", e)),
        };

        let page = targets
            .iter()
            .find(|target| target["type"].as_str() == Some("page"));

        match page {
            Some(page) => ToolResult::success(
                "Current page",
                Some(json!({
                    "url": page["url"],
                    "title": page["title"],
                })),
            ),
            None => ToolResult::failure("No page target open"),
        }
    }

    async fn navigate_inner(&self, url: &str) -> Result<String, String> {
        let target = self.create_target(url).await?;
        let ws_url = target["webSocketDebuggerUrl"]
            .as_str()
            .ok_or("target has no webSocketDebuggerUrl")?;

        debug!("Attaching to browser target {}", ws_url);
        let (mut ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| format!("devtools socket: {}", e))?;

        let result = drive_navigation(&mut ws, url).await;
        let _ = ws.close(None).await;
        result
    }

    /// Open a new page target already pointed at the URL.
    async fn create_target(&self, url: &str) -> Result<Value, String> {
        let encoded = utf8_percent_encode(url, NON_ALPHANUMERIC);
        let endpoint = format!("{}/json/new?{}", self.base_url, encoded);

        let response = self
            .http
            .put(&endpoint)
            .send()
            .await
            .map_err(|e| format!("browser endpoint unreachable: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("target creation returned HTTP {}", response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| format!("malformed target description: {}", e))
    }
}

async fn drive_navigation(ws: &mut WsStream, url: &str) -> Result<String, String> {
    call(ws, 1, "Page.enable", json!({})).await?;
    call(ws, 2, "Page.navigate", json!({ "url": url })).await?;
    wait_for_event(ws, "Page.loadEventFired").await?;

    let evaluated = call(
        ws,
        3,
        "Runtime.evaluate",
        json!({
            "expression": "document.documentElement.outerHTML",
            "returnByValue": true,
        }),
    )
    .await?;

    evaluated["result"]["result"]["value"]
        .as_str()
        .map(|content| content.to_string())
        .ok_or_else(|| "page content evaluation returned no value".to_string())
}

/// Issue one devtools command and read frames until its response arrives.
/// Event frames that interleave are skipped; `wait_for_event` picks them up.
async fn call(ws: &mut WsStream, id: u64, method: &str, params: Value) -> Result<Value, String> {
    let command = json!({ "id": id, "method": method, "params": params });
    ws.send(WsMessage::Text(command.to_string()))
        .await
        .map_err(|e| format!("{} send: {}", method, e))?;

    loop {
        let frame = next_json(ws, method).await?;
        if frame["id"].as_u64() == Some(id) {
            if let Some(error) = frame.get("error") {
                return Err(format!("{} failed: {}", method, error));
            }
            return Ok(frame);
        }
    }
}

async fn wait_for_event(ws: &mut WsStream, event: &str) -> Result<(), String> {
    loop {
        let frame = next_json(ws, event).await?;
        if frame["method"].as_str() == Some(event) {
            return Ok(());
        }
    }
}

async fn next_json(ws: &mut WsStream, context: &str) -> Result<Value, String> {
    loop {
        let message = ws
            .next()
            .await
            .ok_or_else(|| format!("{}: devtools socket closed", context))?
            .map_err(|e| format!("{}: {}", context, e))?;

        if let WsMessage::Text(text) = message {
            return serde_json::from_str(&text).map_err(|e| format!("{}: {}", context, e));
        }
    }
}
