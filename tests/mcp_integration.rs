//! Integration tests for MCP protocol handling.
//!
//! These tests verify the JSON-RPC 2.0 envelope handling and drive real
//! sessions over a TCP listener on the loopback interface.

use std::sync::Arc;

use serde_json::{json, Value};
use student_records_mcp::mcp::protocol::{
    parse_request, ErrorCode, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use student_records_mcp::mcp::{Dispatcher, McpServer};
use student_records_mcp::store::{sample, MemoryStore, NewStudent, RecordStore};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let req = parse_request(json).unwrap();
    assert_eq!(req.method, "initialize");
    assert_eq!(req.id, Some(RequestId::from(1)));
    assert!(!req.is_notification());
}

#[test]
fn test_parse_notification() {
    let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;

    let req = parse_request(json).unwrap();
    assert!(req.is_notification());
}

#[test]
fn test_notification_with_id_is_still_notification() {
    let json = r#"{"jsonrpc": "2.0", "id": 7, "method": "notifications/cancelled"}"#;

    let req = parse_request(json).unwrap();
    assert!(req.is_notification());
}

#[test]
fn test_built_request_parses_back() {
    let request = JsonRpcRequest::new(
        Some(RequestId::from("req-1")),
        "tools/call",
        Some(json!({ "name": "list_students" })),
    );
    let line = serde_json::to_string(&request).unwrap();
    assert!(line.contains(r#""jsonrpc":"2.0""#));

    let parsed = parse_request(&line).unwrap();
    assert_eq!(parsed, request);
}

#[test]
fn test_parse_invalid_json() {
    let err = parse_request("not valid json").unwrap_err();
    assert_eq!(err.code, ErrorCode::ParseError.code());
}

#[test]
fn test_null_id_is_absent() {
    let req = parse_request(r#"{"jsonrpc": "2.0", "id": null, "method": "tools/list"}"#).unwrap();
    assert_eq!(req.id, None);
    assert_eq!(req.response_id(), RequestId::from("unknown"));
}

#[test]
fn test_response_has_exactly_one_outcome() {
    let ok = serde_json::to_value(JsonRpcResponse::success(RequestId::from(1), json!({})))
        .unwrap();
    assert!(ok.get("result").is_some());
    assert!(ok.get("error").is_none());

    let err = serde_json::to_value(JsonRpcResponse::parse_error(
        parse_request("{").unwrap_err(),
    ))
    .unwrap();
    assert!(err.get("result").is_none());
    assert_eq!(err["id"], "error");
    assert_eq!(err["error"]["code"], -32700);
}

// =============================================================================
// End-to-end Tests over TCP
// =============================================================================

struct TestServer {
    addr: std::net::SocketAddr,
    stop: oneshot::Sender<()>,
    serving: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(store: Arc<dyn RecordStore>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = McpServer::new(Dispatcher::new(store));
        let (stop, stopped) = oneshot::channel::<()>();

        let serving = tokio::spawn(async move {
            server
                .serve_tcp(listener, async {
                    let _ = stopped.await;
                })
                .await
        });

        Self {
            addr,
            stop,
            serving,
        }
    }

    async fn connect(&self) -> Client {
        let (reader, writer) = TcpStream::connect(self.addr).await.unwrap().into_split();
        Client {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn stop(self) {
        self.stop.send(()).unwrap();
        self.serving.await.unwrap().unwrap();
    }
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = self.lines.next_line().await.unwrap().unwrap();
        serde_json::from_str(&line).unwrap()
    }

    async fn request(&mut self, line: &str) -> Value {
        self.send(line).await;
        self.recv().await
    }

    async fn call_tool(&mut self, id: i64, name: &str, arguments: Value) -> Value {
        let request = JsonRpcRequest::new(
            Some(RequestId::from(id)),
            "tools/call",
            Some(json!({ "name": name, "arguments": arguments })),
        );
        self.request(&serde_json::to_string(&request).unwrap()).await
    }
}

/// Extracts the JSON payload carried in a tool call's text content.
fn tool_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

fn seeded_store() -> Arc<dyn RecordStore> {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    sample::seed(store.as_ref()).unwrap();
    store
}

#[tokio::test]
async fn test_initialize_and_list_tools() {
    let server = TestServer::start(seeded_store()).await;
    let mut client = server.connect().await;

    let init = client
        .request(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
        .await;
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["result"]["serverInfo"]["name"], "student-records-mcp");

    let list = client
        .request(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
        .await;
    let names: Vec<&str> = list["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        [
            "list_students",
            "get_student_by_name",
            "get_student_grades",
            "get_subject_grades",
            "calculate_student_average",
            "add_student",
        ]
    );

    server.stop().await;
}

#[tokio::test]
async fn test_subject_grades_skip_students_without_subject() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let with = |name: &str, subjects: &[(&str, f64)]| {
        NewStudent::new(
            name,
            subjects
                .iter()
                .map(|(subject, grade)| ((*subject).to_string(), *grade))
                .collect(),
        )
    };
    store.insert(with("Ana", &[("historia", 9.0)])).unwrap();
    store.insert(with("Luis", &[("historia", 7.0), ("ingles", 6.0)])).unwrap();
    store.insert(with("Sofía", &[("ingles", 8.0)])).unwrap();

    let server = TestServer::start(store).await;
    let mut client = server.connect().await;

    let response = client
        .call_tool(1, "get_subject_grades", json!({ "subject": "historia" }))
        .await;
    let payload = tool_payload(&response);

    assert_eq!(payload["subject"], "historia");
    let grades = payload["grades"].as_array().unwrap();
    assert_eq!(grades.len(), 2);
    assert_eq!(grades[0]["student"], "Ana");
    assert_eq!(grades[0]["grade"].as_f64(), Some(9.0));
    assert_eq!(grades[1]["student"], "Luis");
    assert_eq!(grades[1]["grade"].as_f64(), Some(7.0));

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_grade_stores_nothing() {
    let store = seeded_store();
    let before = store.find_all().unwrap().len();
    let server = TestServer::start(Arc::clone(&store)).await;
    let mut client = server.connect().await;

    let response = client
        .call_tool(
            1,
            "add_student",
            json!({ "name": "Nadia", "subjects": { "matematicas": 9, "historia": "x" } }),
        )
        .await;
    assert_eq!(response["id"], 1);
    assert_eq!(response["error"]["code"], -32602);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("historia"));

    assert_eq!(store.find_all().unwrap().len(), before);
    assert!(store.find_by_name("Nadia").unwrap().is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_added_student_is_visible_to_other_connections() {
    let server = TestServer::start(seeded_store()).await;
    let mut writer = server.connect().await;
    let mut reader = server.connect().await;

    let added = writer
        .call_tool(
            1,
            "add_student",
            json!({ "name": "Nadia", "subjects": { "matematicas": "8.5", "historia": 7 } }),
        )
        .await;
    let payload = tool_payload(&added);
    assert_eq!(payload["name"], "Nadia");
    assert!(payload["student_id"].as_str().is_some_and(|id| !id.is_empty()));

    let average = reader
        .call_tool(1, "calculate_student_average", json!({ "name": "Nadia" }))
        .await;
    let payload = tool_payload(&average);
    assert_eq!(payload["average"].as_f64(), Some(7.75));
    assert_eq!(payload["total_grades"], 2);

    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_clients() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let server = TestServer::start(Arc::clone(&store)).await;

    let mut tasks = Vec::new();
    for n in 0..8_i64 {
        let mut client = server.connect().await;
        tasks.push(tokio::spawn(async move {
            let name = format!("student-{n}");
            let response = client
                .call_tool(n, "add_student", json!({ "name": name, "subjects": { "arte": n } }))
                .await;
            assert_eq!(response["id"], n);
            assert!(response.get("result").is_some(), "{response}");
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.find_all().unwrap().len(), 8);
    server.stop().await;
}

#[tokio::test]
async fn test_notification_does_not_desync_responses() {
    let server = TestServer::start(seeded_store()).await;
    let mut client = server.connect().await;

    client
        .send(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;
    let response = client
        .request(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
        .await;
    assert_eq!(response["id"], 2);

    server.stop().await;
}

#[tokio::test]
async fn test_parse_error_then_recovery() {
    let server = TestServer::start(seeded_store()).await;
    let mut client = server.connect().await;

    let error = client.request("{ this is not json").await;
    assert_eq!(error["id"], "error");
    assert_eq!(error["error"]["code"], -32700);

    let missing_id = client.request(r#"{"jsonrpc":"2.0","method":"tools/list"}"#).await;
    assert_eq!(missing_id["id"], "unknown");
    assert!(missing_id["result"]["tools"].is_array());

    let unknown = client
        .request(r#"{"jsonrpc":"2.0","id":"abc","method":"resources/list"}"#)
        .await;
    assert_eq!(unknown["id"], "abc");
    assert_eq!(unknown["error"]["code"], -32601);

    server.stop().await;
}

#[tokio::test]
async fn test_missing_student_is_internal_error() {
    let server = TestServer::start(seeded_store()).await;
    let mut client = server.connect().await;

    let response = client
        .call_tool(5, "get_student_grades", json!({ "name": "Nobody" }))
        .await;
    assert_eq!(response["id"], 5);
    assert_eq!(response["error"]["code"], -32603);
    assert_eq!(response["error"]["data"]["kind"], "not_found");

    server.stop().await;
}
