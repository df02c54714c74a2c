/*!
A stateless, single-shot JSON dispatcher for typed tools.

toolbridge turns a set of named, typed procedures ("tools") into a function from request bytes
to response bytes. It is meant for hosts that hand over one fully-buffered request at a time,
such as serverless functions, CGI-style workers or a plain thread-per-connection listener, and
expect one complete response back.

# Overview

Tools are registered once, at startup, into an immutable [`Registry`](registry::Registry). A
[`Bridge`] wraps that registry and answers requests. Each request goes through the same linear
pipeline:

1. decode the envelope
2. resolve the procedure name
3. validate the arguments against the declared parameters
4. execute the handler under a wall-clock budget
5. encode the outcome

The first stage that fails produces a [`Fault`](error::Fault), which is encoded like any other
outcome. Nothing is remembered between requests.

# Key Features

- **Stateless**: no sessions, no caches, no mutable globals; one registry shared by reference
- **Typed tools**: parameters and results carry declared JSON types, checked on every call
- **Bounded execution**: handlers that overrun their budget become `Timeout` faults
- **No async runtime required**: handlers run on plain threads
- **MCP surface**: the same tools are served as Model Context Protocol `tools/list` and
  `tools/call` in stateless JSON-response mode

# Quick Start

```
use toolbridge::{Bridge, BridgeConfig};
use toolbridge::registry::Registry;
use toolbridge::schema::ValueType;
use toolbridge::tools::{ToolCallError, ToolDefinition};
use serde_json::{Value, json};

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
                a.checked_div(b).ok_or_else(|| ToolCallError::new("division by zero"))
            }),
    )
    .unwrap();

let bridge = Bridge::new(builder.build(), BridgeConfig::default()).unwrap();

let ok: Value = serde_json::from_slice(
    &bridge.handle(br#"{"procedure":"add","arguments":{"a":2,"b":3}}"#)
).unwrap();
assert_eq!(ok, json!({"status": "ok", "result": 5}));

let bad: Value = serde_json::from_slice(
    &bridge.handle(br#"{"procedure":"add","arguments":{"a":2,"b":"x"}}"#)
).unwrap();
assert_eq!(bad["errorKind"], "SchemaMismatch");
assert_eq!(bad["message"], "b: expected integer, got string");

let failed: Value = serde_json::from_slice(
    &bridge.handle(br#"{"procedure":"divide","arguments":{"a":1,"b":0}}"#)
).unwrap();
assert_eq!(failed["errorKind"], "HandlerError");
```

# Fault Kinds

| `errorKind`          | Raised when                                            |
|----------------------|--------------------------------------------------------|
| `MalformedEnvelope`  | the body is not a valid request envelope               |
| `UnknownProcedure`   | no tool has the requested name                         |
| `SchemaMismatch`     | an argument is missing, unexpected or mistyped         |
| `HandlerError`       | the handler returned an error or panicked              |
| `Timeout`            | the handler did not finish within the budget           |
| `SerializationError` | the result does not fit the declared return type       |

# Architecture

## Why threads?

The executor needs exactly one suspension point: "wait for the handler, but not longer than
the budget". A worker thread and a channel receive with a deadline does that without pulling
an async runtime into every host. A handler that overruns keeps its thread until it finishes;
its result is dropped.

## Why is the registry immutable?

So that any number of concurrent requests can resolve against it without locks, and so that
no request can change what a later request sees.

# Feature Flags

- `http` - Enables the reference HTTP listener (`toolbridge::http`) and the
  `toolbridge_serve` binary

# Module Organization

- [`registry`] - Tool registration and lookup
- [`tools`] - Tool definitions, the [`Tool`](tools::Tool) trait and handler arguments
- [`schema`] - Declared parameter and result types
- [`validate`] - Argument validation
- [`envelope`] - Request decoding and response encoding
- [`executor`] - Bounded handler execution
- [`error`] - The fault taxonomy
- [`config`] - Host-supplied settings
- [`jrpc`] - JSON-RPC 2.0 message types
- [`mcp`] - The MCP surface
*/
mod bridge;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
#[cfg(feature = "http")]
pub mod http;
pub mod jrpc;
pub mod mcp;
pub mod registry;
pub mod schema;
pub mod tools;
pub mod validate;

pub use bridge::{Bridge, Stage};
pub use config::BridgeConfig;
