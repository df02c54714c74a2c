//! End-to-end behaviour of `Bridge::handle` and `Bridge::handle_mcp`.

use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use toolbridge::envelope::decode;
use toolbridge::registry::{Registry, RegistryError};
use toolbridge::schema::{InputSchema, Parameter, ValueType};
use toolbridge::tools::{Arguments, Tool, ToolCallError, ToolDefinition};
use toolbridge::{Bridge, BridgeConfig};

// ============================================================================
// Fixtures
// ============================================================================

struct Echo;

impl Tool for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Returns its input"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new(vec![
            Parameter::required("text", ValueType::String, "Text to echo"),
            Parameter::optional("times", ValueType::Integer, "Repetitions"),
        ])
    }

    fn return_type(&self) -> ValueType {
        ValueType::String
    }

    fn call(&self, arguments: Arguments) -> Result<Value, ToolCallError> {
        let text: String = arguments.get("text")?;
        let times: usize = arguments.get_opt("times")?.unwrap_or(1);
        Ok(json!(text.repeat(times)))
    }
}

fn registry() -> Registry {
    let mut builder = Registry::builder();
    builder
        .register(
            ToolDefinition::builder("add")
                .description("Add two integers")
                .param("a", ValueType::Integer, "First addend")
                .param("b", ValueType::Integer, "Second addend")
                .returns(ValueType::Integer)
                .handler(|args| Ok(args.get::<i64>("a")? + args.get::<i64>("b")?)),
        )
        .unwrap()
        .register(
            ToolDefinition::builder("divide")
                .description("Divide two integers")
                .param("a", ValueType::Integer, "Dividend")
                .param("b", ValueType::Integer, "Divisor")
                .returns(ValueType::Integer)
                .handler(|args| {
                    let a: i64 = args.get("a")?;
                    let b: i64 = args.get("b")?;
                    a.checked_div(b)
                        .ok_or_else(|| ToolCallError::new("division by zero"))
                }),
        )
        .unwrap()
        .register(
            ToolDefinition::builder("sleep")
                .description("Sleeps for the given number of milliseconds")
                .param("ms", ValueType::Integer, "Duration")
                .handler(|args| {
                    thread::sleep(Duration::from_millis(args.get("ms")?));
                    Ok(())
                }),
        )
        .unwrap()
        .tool(Echo)
        .unwrap();
    builder.build()
}

fn bridge() -> Bridge {
    Bridge::new(registry(), BridgeConfig::default()).unwrap()
}

fn call(bridge: &Bridge, request: Value) -> Value {
    let bytes = bridge.handle(request.to_string().as_bytes());
    serde_json::from_slice(&bytes).unwrap()
}

fn mcp(bridge: &Bridge, message: Value) -> Value {
    let bytes = bridge
        .handle_mcp(message.to_string().as_bytes())
        .expect("request should be answered");
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Envelope protocol
// ============================================================================

#[test]
fn add_returns_sum() {
    let response = call(
        &bridge(),
        json!({"procedure": "add", "arguments": {"a": 2, "b": 3}}),
    );
    assert_eq!(response, json!({"status": "ok", "result": 5}));
}

#[test]
fn wrong_type_names_the_parameter() {
    let response = call(
        &bridge(),
        json!({"procedure": "add", "arguments": {"a": 2, "b": "x"}}),
    );
    assert_eq!(
        response,
        json!({
            "status": "error",
            "errorKind": "SchemaMismatch",
            "message": "b: expected integer, got string"
        })
    );
}

#[test]
fn integer_above_i64_range_is_a_mismatch() {
    let response = call(
        &bridge(),
        json!({"procedure": "add", "arguments": {"a": u64::MAX, "b": 0}}),
    );
    assert_eq!(
        response,
        json!({
            "status": "error",
            "errorKind": "SchemaMismatch",
            "message": "a: expected integer, got number"
        })
    );
}

#[test]
fn missing_parameter_names_the_parameter() {
    let response = call(&bridge(), json!({"procedure": "add", "arguments": {"b": 1}}));
    assert_eq!(response["errorKind"], "SchemaMismatch");
    assert!(response["message"].as_str().unwrap().starts_with("a:"));
}

#[test]
fn unregistered_procedure() {
    let response = call(
        &bridge(),
        json!({"procedure": "subtract", "arguments": {"a": 2, "b": 3}}),
    );
    assert_eq!(response["status"], "error");
    assert_eq!(response["errorKind"], "UnknownProcedure");
}

#[test]
fn faulting_handler() {
    let response = call(
        &bridge(),
        json!({"procedure": "divide", "arguments": {"a": 7, "b": 0}}),
    );
    assert_eq!(response["errorKind"], "HandlerError");
    assert_eq!(response["message"], "division by zero");
}

#[test]
fn malformed_bodies() {
    let bridge = bridge();
    let bodies: [&[u8]; 4] = [b"", b"{", b"[]", br#"{"arguments":{}}"#];
    for body in bodies {
        let response: Value = serde_json::from_slice(&bridge.handle(body)).unwrap();
        assert_eq!(response["errorKind"], "MalformedEnvelope");
    }
}

#[test]
fn correlation_id_is_echoed() {
    let bridge = bridge();
    let ok = call(
        &bridge,
        json!({"procedure": "add", "arguments": {"a": 1, "b": 1}, "correlationId": "r-1"}),
    );
    assert_eq!(ok["correlationId"], "r-1");
    let err = call(&bridge, json!({"procedure": "nope", "correlationId": "r-2"}));
    assert_eq!(err["correlationId"], "r-2");
}

#[test]
fn trait_tools_and_optional_parameters() {
    let bridge = bridge();
    let once = call(&bridge, json!({"procedure": "echo", "arguments": {"text": "hi"}}));
    assert_eq!(once["result"], "hi");
    let thrice = call(
        &bridge,
        json!({"procedure": "echo", "arguments": {"text": "hi", "times": 3}}),
    );
    assert_eq!(thrice["result"], "hihihi");
}

#[test]
fn decoding_is_deterministic() {
    let body = br#"{"procedure":"add","arguments":{"a":2,"b":3},"correlationId":"x"}"#;
    assert_eq!(decode(body).unwrap(), decode(body).unwrap());
}

#[test]
fn requests_do_not_affect_each_other() {
    let bridge = bridge();
    let b = json!({"procedure": "add", "arguments": {"a": 10, "b": 20}});
    let alone = call(&bridge, b.clone());
    call(&bridge, json!({"procedure": "divide", "arguments": {"a": 1, "b": 0}}));
    call(&bridge, json!({"procedure": "add", "arguments": {"a": 1, "b": "bad"}}));
    assert_eq!(call(&bridge, b), alone);
}

#[test]
fn overrunning_handler_times_out() {
    let config = BridgeConfig::default().with_timeout(Duration::from_millis(100));
    let bridge = Bridge::new(registry(), config).unwrap();
    let start = Instant::now();
    let response = call(&bridge, json!({"procedure": "sleep", "arguments": {"ms": 5000}}));
    assert_eq!(response["errorKind"], "Timeout");
    assert!(start.elapsed() < Duration::from_secs(3));

    // the abandoned worker's result never shows up in a later answer
    let next = call(&bridge, json!({"procedure": "add", "arguments": {"a": 1, "b": 2}}));
    assert_eq!(next, json!({"status": "ok", "result": 3}));
}

#[test]
fn concurrent_requests_share_one_registry() {
    let bridge = bridge();
    let completed = Arc::new(AtomicUsize::new(0));
    let workers: Vec<_> = (0..8)
        .map(|i| {
            let bridge = bridge.clone();
            let completed = Arc::clone(&completed);
            thread::spawn(move || {
                let response = call(
                    &bridge,
                    json!({"procedure": "add", "arguments": {"a": i, "b": i}}),
                );
                assert_eq!(response["result"], json!(i * 2));
                completed.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(completed.load(Ordering::SeqCst), 8);
}

#[test]
fn duplicate_registration_fails_startup() {
    let mut builder = Registry::builder();
    builder.tool(Echo).unwrap();
    assert_eq!(
        builder.tool(Echo).unwrap_err(),
        RegistryError::DuplicateName("echo".to_string())
    );
}

// ============================================================================
// MCP surface
// ============================================================================

#[test]
fn mcp_initialize_and_list() {
    let bridge = bridge();
    let init = mcp(
        &bridge,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
               "params": {"protocolVersion": "2025-06-18", "capabilities": {},
                          "clientInfo": {"name": "test", "version": "0"}}}),
    );
    assert_eq!(init["result"]["protocolVersion"], "2025-06-18");
    assert_eq!(init["result"]["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));

    let list = mcp(&bridge, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}));
    let names: Vec<&str> = list["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["add", "divide", "sleep", "echo"]);
    assert_eq!(
        list["result"]["tools"][3]["inputSchema"],
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Text to echo"},
                "times": {"type": "integer", "description": "Repetitions"}
            },
            "required": ["text"]
        })
    );
}

#[test]
fn mcp_call_success() {
    let reply = mcp(
        &bridge(),
        json!({"jsonrpc": "2.0", "id": "c", "method": "tools/call",
               "params": {"name": "add", "arguments": {"a": 2, "b": 3}}}),
    );
    assert_eq!(
        reply,
        json!({
            "jsonrpc": "2.0",
            "id": "c",
            "result": {
                "content": [{"type": "text", "text": "5"}],
                "structuredContent": {"result": 5},
                "isError": false
            }
        })
    );
}

#[test]
fn mcp_schema_mismatch_is_tool_error() {
    let reply = mcp(
        &bridge(),
        json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call",
               "params": {"name": "add", "arguments": {"a": 2, "b": "x"}}}),
    );
    assert_eq!(reply["result"]["isError"], true);
    assert_eq!(
        reply["result"]["content"][0]["text"],
        "SchemaMismatch: b: expected integer, got string"
    );
}

#[test]
fn mcp_unknown_tool_is_protocol_error() {
    let reply = mcp(
        &bridge(),
        json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call",
               "params": {"name": "subtract", "arguments": {}}}),
    );
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["error"]["message"], "Unknown tool: subtract");
}

#[test]
fn mcp_notifications_get_no_body() {
    let bridge = bridge();
    for method in ["notifications/initialized", "notifications/cancelled"] {
        let message = json!({"jsonrpc": "2.0", "method": method});
        assert!(bridge.handle_mcp(message.to_string().as_bytes()).is_none());
    }
}
