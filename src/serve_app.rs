#![cfg(feature = "http")]

//! Serves a small arithmetic toolset over HTTP.
//!
//! `TOOLBRIDGE_ADDR` sets the listen address (default `127.0.0.1:8000`) and
//! `TOOLBRIDGE_TIMEOUT_MS` the per-call budget.

use std::process::ExitCode;
use toolbridge::http::Server;
use toolbridge::registry::{Registry, RegistryError};
use toolbridge::schema::ValueType;
use toolbridge::tools::{ToolCallError, ToolDefinition};
use toolbridge::{Bridge, BridgeConfig};

const DEFAULT_ADDR: &str = "127.0.0.1:8000";

fn registry() -> Result<Registry, RegistryError> {
    let mut builder = Registry::builder();
    builder
        .register(
            ToolDefinition::builder("add")
                .description("Add two integers")
                .param("a", ValueType::Integer, "First addend")
                .param("b", ValueType::Integer, "Second addend")
                .returns(ValueType::Integer)
                .handler(|args| {
                    let a: i64 = args.get("a")?;
                    let b: i64 = args.get("b")?;
                    a.checked_add(b)
                        .ok_or_else(|| ToolCallError::new("integer overflow"))
                }),
        )?
        .register(
            ToolDefinition::builder("multiply")
                .description("Multiply two integers")
                .param("a", ValueType::Integer, "First factor")
                .param("b", ValueType::Integer, "Second factor")
                .returns(ValueType::Integer)
                .handler(|args| {
                    let a: i64 = args.get("a")?;
                    let b: i64 = args.get("b")?;
                    a.checked_mul(b)
                        .ok_or_else(|| ToolCallError::new("integer overflow"))
                }),
        )?;
    Ok(builder.build())
}

fn config() -> Result<BridgeConfig, String> {
    let mut config = BridgeConfig::default();
    if let Ok(value) = std::env::var("TOOLBRIDGE_TIMEOUT_MS") {
        config.timeout_ms = value
            .parse()
            .map_err(|e| format!("TOOLBRIDGE_TIMEOUT_MS={value}: {e}"))?;
    }
    Ok(config)
}

fn main() -> ExitCode {
    let config = match config() {
        Ok(config) => config,
        Err(e) => {
            logwise::error_sync!("bad configuration: {error}", error = e);
            return ExitCode::FAILURE;
        }
    };
    let registry = match registry() {
        Ok(registry) => registry,
        Err(e) => {
            logwise::error_sync!("could not register tools: {error}", error = e.to_string());
            return ExitCode::FAILURE;
        }
    };
    let addr = std::env::var("TOOLBRIDGE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let bridge = match Bridge::new(registry, config) {
        Ok(bridge) => bridge,
        Err(e) => {
            logwise::error_sync!("bad configuration: {error}", error = e.to_string());
            return ExitCode::FAILURE;
        }
    };
    match Server::bind(addr.as_str(), bridge) {
        Ok(server) => {
            logwise::info_sync!("serving on {addr}", addr = server.local_addr().to_string());
        }
        Err(e) => {
            logwise::error_sync!(
                "could not listen on {addr}: {error}",
                addr = addr,
                error = e.to_string()
            );
            return ExitCode::FAILURE;
        }
    }
    loop {
        std::thread::park();
    }
}
