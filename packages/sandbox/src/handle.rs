// ABOUTME: Typed tool-call surface bound to one sandbox's HTTP API
// ABOUTME: Validates inputs, issues one HTTP request per operation, and folds failures into ToolResult

use crate::error::HandleError;
use crate::types::{Sandbox, SupervisorStatus, ToolResult};
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Port the in-sandbox tool API listens on.
pub const API_PORT: u16 = 8080;

/// Timeout for file and shell control calls.
const SHORT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for calls that may legitimately run long (command execution).
const LONG_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Handle to one provisioned sandbox.
///
/// Owns the HTTP client bound to the sandbox's address. The client
/// supports concurrent in-flight requests, so the owning session may
/// overlap calls (a status check while a long command runs). Operations
/// against the *same* shell session id are expected to be issued
/// sequentially by the caller; this layer does not serialize them.
#[derive(Debug, Clone)]
pub struct SandboxHandle {
    name: String,
    base_url: String,
    client: Client,
}

impl SandboxHandle {
    /// Bind a handle to a provisioned sandbox's address.
    pub fn new(sandbox: &Sandbox) -> Result<Self, HandleError> {
        Self::from_parts(&sandbox.name, format!("http://{}:{}", sandbox.addr, API_PORT))
    }

    /// Bind a handle to an explicit base URL.
    pub fn from_parts(name: &str, base_url: impl Into<String>) -> Result<Self, HandleError> {
        let client = Client::builder()
            .timeout(LONG_CALL_TIMEOUT)
            .build()?;

        Ok(Self {
            name: name.to_string(),
            base_url: base_url.into(),
            client,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the in-sandbox supervisor for the state of every service.
    ///
    /// Typed, unlike the tool methods: the readiness probe branches on the
    /// per-service states rather than on a success flag.
    pub async fn supervisor_status(&self) -> Result<SupervisorStatus, HandleError> {
        let url = format!("{}/api/v1/supervisor/status", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(SHORT_CALL_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HandleError::Malformed(format!(
                "supervisor status returned HTTP {}",
                response.status()
            )));
        }

        Ok(response.json::<SupervisorStatus>().await?)
    }

    // File operations

    pub async fn file_write(
        &self,
        file: &str,
        content: &str,
        append: bool,
        sudo: bool,
    ) -> ToolResult {
        if let Some(invalid) = require("file", file) {
            return invalid;
        }

        #[derive(Serialize)]
        struct Body<'a> {
            file: &'a str,
            content: &'a str,
            append: bool,
            sudo: bool,
        }

        self.post_tool(
            "/api/v1/file/write",
            &Body {
                file,
                content,
                append,
                sudo,
            },
            SHORT_CALL_TIMEOUT,
        )
        .await
    }

    pub async fn file_read(
        &self,
        file: &str,
        start_line: Option<i64>,
        end_line: Option<i64>,
        sudo: bool,
    ) -> ToolResult {
        if let Some(invalid) = require("file", file) {
            return invalid;
        }

        #[derive(Serialize)]
        struct Body<'a> {
            file: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            start_line: Option<i64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            end_line: Option<i64>,
            sudo: bool,
        }

        self.post_tool(
            "/api/v1/file/read",
            &Body {
                file,
                start_line,
                end_line,
                sudo,
            },
            SHORT_CALL_TIMEOUT,
        )
        .await
    }

    pub async fn file_list(&self, path: &str) -> ToolResult {
        if let Some(invalid) = require("path", path) {
            return invalid;
        }

        #[derive(Serialize)]
        struct Body<'a> {
            path: &'a str,
        }

        self.post_tool("/api/v1/file/list", &Body { path }, SHORT_CALL_TIMEOUT)
            .await
    }

    pub async fn file_find(&self, path: &str, glob: &str) -> ToolResult {
        if let Some(invalid) = require("path", path) {
            return invalid;
        }
        if let Some(invalid) = require("glob", glob) {
            return invalid;
        }

        #[derive(Serialize)]
        struct Body<'a> {
            path: &'a str,
            glob: &'a str,
        }

        self.post_tool("/api/v1/file/find", &Body { path, glob }, SHORT_CALL_TIMEOUT)
            .await
    }

    pub async fn file_replace(&self, file: &str, old_str: &str, new_str: &str) -> ToolResult {
        if let Some(invalid) = require("file", file) {
            return invalid;
        }

        #[derive(Serialize)]
        struct Body<'a> {
            file: &'a str,
            old_str: &'a str,
            new_str: &'a str,
        }

        self.post_tool(
            "/api/v1/file/replace",
            &Body {
                file,
                old_str,
                new_str,
            },
            SHORT_CALL_TIMEOUT,
        )
        .await
    }

    /// Upload a file as multipart form data.
    pub async fn file_upload(&self, path: &str, file_name: &str, content: Vec<u8>) -> ToolResult {
        if let Some(invalid) = require("path", path) {
            return invalid;
        }

        let part = reqwest::multipart::Part::bytes(content).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("path", path.to_string())
            .part("file", part);

        let url = format!("{}/api/v1/file/upload", self.base_url);
        let response = match self
            .client
            .post(&url)
            .timeout(LONG_CALL_TIMEOUT)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure("file/upload", &e),
        };

        parse_tool_response("file/upload", response).await
    }

    /// Download a file as a raw byte stream.
    ///
    /// Binary payloads do not fit the JSON envelope; failures still follow
    /// the tool-failure-is-data rule by arriving as the `Err` envelope
    /// rather than a transport error.
    pub async fn file_download(&self, path: &str) -> Result<Bytes, ToolResult> {
        if let Some(invalid) = require("path", path) {
            return Err(invalid);
        }

        let url = format!("{}/api/v1/file/download", self.base_url);
        let response = match self
            .client
            .get(&url)
            .query(&[("path", path)])
            .timeout(LONG_CALL_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(transport_failure("file/download", &e)),
        };

        if !response.status().is_success() {
            return Err(ToolResult::failure(format!(
                "file/download returned HTTP {}",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| transport_failure("file/download", &e))
    }

    // Shell operations
    //
    // Every call is keyed by a caller-supplied session id so concurrent,
    // resumable shell interactions within one sandbox stay attributable.

    /// Run a command in the named shell session, creating it on first use.
    pub async fn shell_exec(&self, id: &str, exec_dir: &str, command: &str) -> ToolResult {
        if let Some(invalid) = require("id", id) {
            return invalid;
        }
        if let Some(invalid) = require("command", command) {
            return invalid;
        }

        #[derive(Serialize)]
        struct Body<'a> {
            id: &'a str,
            exec_dir: &'a str,
            command: &'a str,
        }

        self.post_tool(
            "/api/v1/shell/exec",
            &Body {
                id,
                exec_dir,
                command,
            },
            LONG_CALL_TIMEOUT,
        )
        .await
    }

    /// View a session's output, optionally with full console history.
    pub async fn shell_view(&self, id: &str, console: bool) -> ToolResult {
        if let Some(invalid) = require("id", id) {
            return invalid;
        }

        #[derive(Serialize)]
        struct Body<'a> {
            id: &'a str,
            console: bool,
        }

        self.post_tool("/api/v1/shell/view", &Body { id, console }, SHORT_CALL_TIMEOUT)
            .await
    }

    /// Block until the session's current command finishes or `seconds` elapse.
    pub async fn shell_wait(&self, id: &str, seconds: Option<u64>) -> ToolResult {
        if let Some(invalid) = require("id", id) {
            return invalid;
        }

        #[derive(Serialize)]
        struct Body<'a> {
            id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            seconds: Option<u64>,
        }

        // The HTTP timeout must outlive the remote wait itself.
        let timeout = Duration::from_secs(seconds.unwrap_or(60) + 10);

        self.post_tool("/api/v1/shell/wait", &Body { id, seconds }, timeout)
            .await
    }

    /// Send input to a running interactive command.
    pub async fn shell_write(&self, id: &str, input: &str, press_enter: bool) -> ToolResult {
        if let Some(invalid) = require("id", id) {
            return invalid;
        }

        #[derive(Serialize)]
        struct Body<'a> {
            id: &'a str,
            input: &'a str,
            press_enter: bool,
        }

        self.post_tool(
            "/api/v1/shell/write",
            &Body {
                id,
                input,
                press_enter,
            },
            SHORT_CALL_TIMEOUT,
        )
        .await
    }

    /// Terminate the session's running process and free the session id.
    /// Killing an already-terminated session is a success no-op remotely.
    pub async fn shell_kill(&self, id: &str) -> ToolResult {
        if let Some(invalid) = require("id", id) {
            return invalid;
        }

        #[derive(Serialize)]
        struct Body<'a> {
            id: &'a str,
        }

        self.post_tool("/api/v1/shell/kill", &Body { id }, SHORT_CALL_TIMEOUT)
            .await
    }

    async fn post_tool<B: Serialize>(&self, path: &str, body: &B, timeout: Duration) -> ToolResult {
        let url = format!("{}{}", self.base_url, path);
        debug!("Tool call {} on sandbox {}", path, self.name);

        let response = match self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(path, &e),
        };

        parse_tool_response(path, response).await
    }
}

/// Reject an empty required field before any network I/O happens.
fn require(field: &str, value: &str) -> Option<ToolResult> {
    if value.is_empty() {
        Some(ToolResult::failure(format!(
            "required field '{}' is empty",
            field
        )))
    } else {
        None
    }
}

fn transport_failure(path: &str, error: &dyn std::fmt::Display) -> ToolResult {
    ToolResult::failure(format!("{} request failed: {}", path, error))
}

/// Parse an HTTP response into the tool envelope.
///
/// A non-2xx response with a parseable envelope passes through as-is; the
/// in-sandbox service reports tool-level failures that way. Only an
/// unparseable body becomes a synthesized failure.
async fn parse_tool_response(path: &str, response: reqwest::Response) -> ToolResult {
    let status = response.status();

    match response.json::<ToolResult>().await {
        Ok(result) => result,
        Err(_) if !status.is_success() => {
            ToolResult::failure(format!("{} returned HTTP {}", path, status))
        }
        Err(e) => ToolResult::failure(format!("{} returned malformed body: {}", path, e)),
    }
}
