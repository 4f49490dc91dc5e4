//! # Wire Protocol
//!
//! Line-oriented, UTF-8, newline-terminated (spec §6). A line is either a
//! client command (`SET`, `GET`, ...) or, when its first non-whitespace
//! character is `{`, a JSON peer message carrying a `"type"` field (spec
//! §4.3/§9). This generalizes the teacher's single space-delimited
//! `Message::parse` into the two-tier grammar the full protocol needs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::store::Operation;

/// A client request, parsed from a non-JSON line.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
    Ping,
    Status,
    Shutdown,
    Flush,
    Snapshot,
}

/// A peer-to-peer message, parsed from a JSON object line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PeerMessage {
    #[serde(rename = "REGISTER_NODE")]
    RegisterNode {
        node_id: String,
        host: String,
        port: u16,
    },
    #[serde(rename = "REPLICATE")]
    Replicate {
        operation: Operation,
        key: String,
        value: Option<Value>,
    },
    #[serde(rename = "HEARTBEAT")]
    Heartbeat { from_node: String },
    #[serde(rename = "ELECTION")]
    Election { candidate_id: String, term: u64 },
    #[serde(rename = "SYNC")]
    Sync {
        from_node: String,
        since_timestamp: f64,
    },
}

/// Either a parsed client command or a parsed peer message.
#[derive(Debug)]
pub enum Request {
    Client(ClientCommand),
    Peer(PeerMessage),
}

/// Parse one protocol line. Peer messages are JSON objects; everything else
/// is tokenized as a client command. Parse failures are reported as the
/// `MalformedRequest`/`UnknownCommand` kinds of spec §7.
pub fn parse_line(line: &str) -> Result<Request, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::MalformedRequest("empty request".to_string()));
    }
    if trimmed.starts_with('{') {
        let msg: PeerMessage = serde_json::from_str(trimmed)
            .map_err(|e| ProtocolError::MalformedRequest(format!("invalid peer message: {e}")))?;
        return Ok(Request::Peer(msg));
    }
    parse_client_command(trimmed).map(Request::Client)
}

fn parse_client_command(line: &str) -> Result<ClientCommand, ProtocolError> {
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim_start()),
        None => (line, ""),
    };
    match cmd.to_ascii_uppercase().as_str() {
        "SET" => {
            let (key, value_rest) = rest.split_once(char::is_whitespace).ok_or_else(|| {
                ProtocolError::MalformedRequest("SET requires a key and a value".to_string())
            })?;
            if key.is_empty() {
                return Err(ProtocolError::MalformedRequest(
                    "SET requires a non-empty key".to_string(),
                ));
            }
            Ok(ClientCommand::Set {
                key: key.to_string(),
                value: parse_value(value_rest.trim()),
            })
        }
        "GET" => {
            if rest.is_empty() {
                return Err(ProtocolError::MalformedRequest(
                    "GET requires a key".to_string(),
                ));
            }
            Ok(ClientCommand::Get {
                key: rest.to_string(),
            })
        }
        "DELETE" => {
            if rest.is_empty() {
                return Err(ProtocolError::MalformedRequest(
                    "DELETE requires a key".to_string(),
                ));
            }
            Ok(ClientCommand::Delete {
                key: rest.to_string(),
            })
        }
        "PING" => Ok(ClientCommand::Ping),
        "STATUS" => Ok(ClientCommand::Status),
        "SHUTDOWN" => Ok(ClientCommand::Shutdown),
        "FLUSH" => Ok(ClientCommand::Flush),
        "SNAPSHOT" => Ok(ClientCommand::Snapshot),
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

/// Decode the value-rest-of-line as JSON if possible; otherwise store it as
/// a raw string, stripping optional surrounding double quotes (spec §6).
fn parse_value(raw: &str) -> Value {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return v;
    }
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    Value::String(unquoted.to_string())
}

/// Build a `{"status":"OK", ...}` / `{"status":"ERROR", ...}` response
/// envelope (spec §6).
pub struct Response;

impl Response {
    pub fn ok() -> Value {
        serde_json::json!({ "status": "OK" })
    }

    pub fn ok_with(fields: Value) -> Value {
        let mut obj = serde_json::json!({ "status": "OK" });
        merge(&mut obj, fields);
        obj
    }

    pub fn error(message: impl Into<String>) -> Value {
        serde_json::json!({ "status": "ERROR", "message": message.into() })
    }

    pub fn error_with(message: impl Into<String>, fields: Value) -> Value {
        let mut obj = Self::error(message);
        merge(&mut obj, fields);
        obj
    }
}

fn merge(base: &mut Value, extra: Value) {
    if let (Some(base_obj), Value::Object(extra_obj)) = (base.as_object_mut(), extra) {
        base_obj.extend(extra_obj);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_set_with_json_value() {
        let req = parse_line(r#"SET user:1 {"name":"Alice"}"#).unwrap();
        match req {
            Request::Client(ClientCommand::Set { key, value }) => {
                assert_eq!(key, "user:1");
                assert_eq!(value, json!({"name": "Alice"}));
            }
            _ => panic!("expected SET"),
        }
    }

    #[test]
    fn parses_set_with_raw_string_value() {
        let req = parse_line("SET greeting hello").unwrap();
        match req {
            Request::Client(ClientCommand::Set { key, value }) => {
                assert_eq!(key, "greeting");
                assert_eq!(value, json!("hello"));
            }
            _ => panic!("expected SET"),
        }
    }

    #[test]
    fn parses_set_with_quoted_string_value() {
        let req = parse_line(r#"SET greeting "hello world""#).unwrap();
        match req {
            Request::Client(ClientCommand::Set { key, value }) => {
                assert_eq!(value, json!("hello world"));
            }
            _ => panic!("expected SET"),
        }
    }

    #[test]
    fn parses_set_with_numeric_and_array_values() {
        match parse_line("SET n 42").unwrap() {
            Request::Client(ClientCommand::Set { value, .. }) => assert_eq!(value, json!(42)),
            _ => panic!(),
        }
        match parse_line("SET arr [1,2,3]").unwrap() {
            Request::Client(ClientCommand::Set { value, .. }) => {
                assert_eq!(value, json!([1, 2, 3]))
            }
            _ => panic!(),
        }
    }

    #[test]
    fn parses_get_delete_ping_status() {
        assert!(matches!(
            parse_line("GET k").unwrap(),
            Request::Client(ClientCommand::Get { key }) if key == "k"
        ));
        assert!(matches!(
            parse_line("DELETE k").unwrap(),
            Request::Client(ClientCommand::Delete { key }) if key == "k"
        ));
        assert!(matches!(
            parse_line("PING").unwrap(),
            Request::Client(ClientCommand::Ping)
        ));
        assert!(matches!(
            parse_line("status").unwrap(),
            Request::Client(ClientCommand::Status)
        ));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = parse_line("FROB k").unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommand(cmd) if cmd == "FROB"));
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert!(matches!(
            parse_line("").unwrap_err(),
            ProtocolError::MalformedRequest(_)
        ));
        assert!(matches!(
            parse_line("SET k").unwrap_err(),
            ProtocolError::MalformedRequest(_)
        ));
        assert!(matches!(
            parse_line("{not json").unwrap_err(),
            ProtocolError::MalformedRequest(_)
        ));
    }

    #[test]
    fn parses_peer_messages() {
        let req = parse_line(r#"{"type":"HEARTBEAT","from_node":"node1"}"#).unwrap();
        assert!(matches!(
            req,
            Request::Peer(PeerMessage::Heartbeat { from_node }) if from_node == "node1"
        ));

        let req = parse_line(r#"{"type":"ELECTION","candidate_id":"node2","term":3}"#).unwrap();
        assert!(matches!(
            req,
            Request::Peer(PeerMessage::Election { candidate_id, term })
                if candidate_id == "node2" && term == 3
        ));
    }

    #[test]
    fn response_envelopes_merge_extra_fields() {
        let r = Response::ok_with(json!({"value": 1}));
        assert_eq!(r, json!({"status": "OK", "value": 1}));
        let r = Response::error_with("bad", json!({"term": 5}));
        assert_eq!(r, json!({"status": "ERROR", "message": "bad", "term": 5}));
    }
}
