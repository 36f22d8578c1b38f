use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{self, BufRead, Read, Write};
use std::sync::{Arc, Mutex};

#[derive(Debug, Serialize, Deserialize)]
pub struct DapMessage {
    pub seq: u64,
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(flatten)]
    pub content: DapMessageContent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DapMessageContent {
    Request {
        command: String,
        arguments: Option<Value>,
    },
    Response {
        request_seq: u64,
        success: bool,
        command: String,
        message: Option<String>,
        body: Option<Value>,
    },
    Event {
        event: String,
        body: Option<Value>,
    },
}

/// Launch configuration sent by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchArguments {
    /// Must start with the interpreter invocation prefix `cabal repl`.
    pub program: Option<String>,
    pub active_file: Option<String>,
    pub cwd: Option<String>,
    pub stop_on_entry: Option<bool>,
    pub show_io: Option<bool>,
    pub run_main: Option<bool>,
    pub run_function: Option<String>,
    pub cabal_project_root: Option<String>,
}

/// Serializes responses and events onto stdout with Content-Length framing.
///
/// Shared behind a mutex between the request loop and the interpreter's
/// reader threads, so frames from different threads never interleave.
pub struct MessageWriter {
    seq: u64,
}

pub type SharedWriter = Arc<Mutex<MessageWriter>>;

pub fn shared_writer() -> SharedWriter {
    Arc::new(Mutex::new(MessageWriter::new()))
}

impl MessageWriter {
    pub fn new() -> Self {
        Self { seq: 0 }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn send_response(
        &mut self,
        request_seq: u64,
        command: String,
        success: bool,
        body: Option<Value>,
    ) {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "response".to_string(),
            content: DapMessageContent::Response {
                request_seq,
                success,
                command,
                message: None,
                body,
            },
        };
        self.send_message(&msg);
    }

    /// Error response carrying a fixed numeric id per call site.
    pub fn send_error_response(&mut self, request_seq: u64, command: String, id: u64, format: &str) {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "response".to_string(),
            content: DapMessageContent::Response {
                request_seq,
                success: false,
                command,
                message: Some(format.to_string()),
                body: Some(json!({ "error": { "id": id, "format": format } })),
            },
        };
        self.send_message(&msg);
    }

    pub fn send_event(&mut self, event: &str, body: Option<Value>) {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "event".to_string(),
            content: DapMessageContent::Event {
                event: event.to_string(),
                body,
            },
        };
        self.send_message(&msg);
    }

    pub fn output(&mut self, category: &str, text: &str) {
        self.send_event(
            "output",
            Some(json!({ "category": category, "output": text })),
        );
    }

    pub fn stopped(&mut self, reason: &str, thread_id: u64) {
        self.send_event(
            "stopped",
            Some(json!({
                "reason": reason,
                "threadId": thread_id,
                "allThreadsStopped": true
            })),
        );
    }

    pub fn terminated(&mut self) {
        self.send_event("terminated", None);
    }

    fn send_message(&self, msg: &DapMessage) {
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("failed to encode DAP message: {}", e);
                return;
            }
        };

        // The frame must be exactly "Content-Length: {len}\r\n\r\n{json}".
        print!("Content-Length: {}\r\n\r\n{}", json.len(), json);
        let _ = io::stdout().flush();
    }
}

impl Default for MessageWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one Content-Length framed message from stdin. `None` on EOF or on a
/// frame that cannot be decoded.
pub fn read_message() -> Option<DapMessage> {
    let stdin = io::stdin();
    let mut handle = stdin.lock();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        match handle.read_line(&mut line) {
            Ok(0) => return None,
            Ok(_) => {
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some(rest) = line.strip_prefix("Content-Length:") {
                    content_length = rest.trim().parse().unwrap_or(0);
                }
            }
            Err(_) => return None,
        }
    }

    if content_length == 0 {
        return None;
    }

    let mut buffer = vec![0u8; content_length];
    handle.read_exact(&mut buffer).ok()?;
    serde_json::from_slice(&buffer).ok()
}
