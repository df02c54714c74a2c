//! The immutable tool registry.
//!
//! Tools are registered once, through a [`RegistryBuilder`], before any request
//! is served. [`RegistryBuilder::build`] produces a [`Registry`] that can no
//! longer change, so resolution needs no locking and one registry can be
//! shared across any number of concurrent requests.
//!
//! # Examples
//!
//! ```
//! use toolbridge::registry::{Registry, RegistryError};
//! use toolbridge::tools::ToolDefinition;
//! use toolbridge::schema::ValueType;
//!
//! fn add() -> ToolDefinition {
//!     ToolDefinition::builder("add")
//!         .param("a", ValueType::Integer, "First addend")
//!         .param("b", ValueType::Integer, "Second addend")
//!         .returns(ValueType::Integer)
//!         .handler(|args| Ok(args.get::<i64>("a")? + args.get::<i64>("b")?))
//! }
//!
//! let mut builder = Registry::builder();
//! builder.register(add()).unwrap();
//!
//! // names are unique
//! assert_eq!(
//!     builder.register(add()).unwrap_err(),
//!     RegistryError::DuplicateName("add".to_string())
//! );
//!
//! let registry = builder.build();
//! assert!(registry.resolve("add").is_ok());
//! assert_eq!(
//!     registry.resolve("subtract").unwrap_err(),
//!     RegistryError::NotFound("subtract".to_string())
//! );
//! ```

use crate::tools::{Tool, ToolDefinition};
use std::collections::HashMap;

/// Errors raised while building or querying a [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A tool with this name was already registered.
    #[error("a tool named `{0}` is already registered")]
    DuplicateName(String),
    /// A tool declares the same parameter twice.
    #[error("tool `{tool}` declares parameter `{parameter}` more than once")]
    DuplicateParameter { tool: String, parameter: String },
    /// The name is empty or contains control characters.
    #[error("{0:?} is not a valid tool name")]
    InvalidName(String),
    /// No tool is registered under this name.
    #[error("no tool named `{0}`")]
    NotFound(String),
}

/// Collects tool definitions during startup.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidName`] if the name is empty or holds control
    /// characters, [`RegistryError::DuplicateName`] if the name is taken, and
    /// [`RegistryError::DuplicateParameter`] if the definition declares a
    /// parameter twice.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<&mut Self, RegistryError> {
        let name = definition.name();
        if name.is_empty() || name.chars().any(char::is_control) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.index.contains_key(definition.name()) {
            return Err(RegistryError::DuplicateName(definition.name().to_string()));
        }
        if let Some(parameter) = definition.input_schema().duplicate_name() {
            return Err(RegistryError::DuplicateParameter {
                tool: definition.name().to_string(),
                parameter: parameter.to_string(),
            });
        }
        self.index
            .insert(definition.name().to_string(), self.tools.len());
        self.tools.push(definition);
        Ok(self)
    }

    /// Adds a [`Tool`] implementation.
    pub fn tool<T: Tool + 'static>(&mut self, tool: T) -> Result<&mut Self, RegistryError> {
        self.register(ToolDefinition::from_tool(tool))
    }

    /// Freezes the registry.
    pub fn build(self) -> Registry {
        logwise::info_sync!(
            "tool registry built with {count} tools",
            count = self.tools.len().to_string()
        );
        Registry {
            tools: self.tools,
            index: self.index,
        }
    }
}

/// A frozen set of tools, in registration order.
#[derive(Debug)]
pub struct Registry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Finds the tool registered under `name`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if there is none.
    pub fn resolve(&self, name: &str) -> Result<&ToolDefinition, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// All tools, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValueType;

    fn noop(name: &str) -> ToolDefinition {
        ToolDefinition::builder(name).handler(|_| Ok(()))
    }

    #[test]
    fn keeps_registration_order() {
        let mut builder = Registry::builder();
        builder
            .register(noop("zeta"))
            .unwrap()
            .register(noop("alpha"))
            .unwrap();
        let registry = builder.build();
        let names: Vec<&str> = registry.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn rejects_duplicate_parameters() {
        let tool = ToolDefinition::builder("dup")
            .param("x", ValueType::Integer, "")
            .optional("x", ValueType::String, "")
            .handler(|_| Ok(()));
        let mut builder = Registry::builder();
        assert_eq!(
            builder.register(tool).unwrap_err(),
            RegistryError::DuplicateParameter {
                tool: "dup".to_string(),
                parameter: "x".to_string()
            }
        );
        assert!(builder.build().is_empty());
    }

    #[test]
    fn rejects_empty_and_control_character_names() {
        let mut builder = Registry::builder();
        for name in ["", "bad\0name", "line\nbreak"] {
            assert_eq!(
                builder.register(noop(name)).unwrap_err(),
                RegistryError::InvalidName(name.to_string())
            );
        }
        builder.register(noop("fine.name-1")).unwrap();
        assert_eq!(builder.build().len(), 1);
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
