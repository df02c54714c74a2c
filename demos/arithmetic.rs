//! Drives a bridge from stdin: one request envelope per line, one response per line.
//!
//! ```text
//! $ echo '{"procedure":"add","arguments":{"a":2,"b":3}}' | cargo run --example arithmetic
//! {"status":"ok","result":5}
//! ```

use std::io::{BufRead, Write};
use toolbridge::registry::Registry;
use toolbridge::schema::ValueType;
use toolbridge::tools::{ToolCallError, ToolDefinition};
use toolbridge::{Bridge, BridgeConfig};

const OVERFLOW: &str = "integer overflow";

fn binary(
    name: &str,
    description: &str,
    op: fn(i64, i64) -> Option<i64>,
    failure: &'static str,
) -> ToolDefinition {
    ToolDefinition::builder(name)
        .description(description)
        .param("a", ValueType::Integer, "Left operand")
        .param("b", ValueType::Integer, "Right operand")
        .returns(ValueType::Integer)
        .handler(move |args| {
            let a: i64 = args.get("a")?;
            let b: i64 = args.get("b")?;
            op(a, b).ok_or_else(|| ToolCallError::new(failure))
        })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Registry::builder();
    builder
        .register(binary("add", "Add two integers", i64::checked_add, OVERFLOW))?
        .register(binary("multiply", "Multiply two integers", i64::checked_mul, OVERFLOW))?
        .register(binary("divide", "Divide two integers", i64::checked_div, "division by zero"))?;
    let bridge = Bridge::new(builder.build(), BridgeConfig::default())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.write_all(&bridge.handle(line.as_bytes()))?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
