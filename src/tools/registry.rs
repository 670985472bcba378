use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::context_retrieval;
use crate::core::errors::ApiError;
use crate::llm::ToolDefinition;

/// Every tool the model can be offered. Adding a tool means adding a
/// variant here and a handler at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ContextRetrieval,
}

impl ToolKind {
    pub const ALL: [ToolKind; 1] = [ToolKind::ContextRetrieval];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ContextRetrieval => context_retrieval::CONTEXT_RETRIEVAL_TOOL,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn definition(self) -> ToolDefinition {
        match self {
            ToolKind::ContextRetrieval => context_retrieval::definition(),
        }
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// Run the tool with already-decoded JSON arguments.
    async fn invoke(&self, arguments: &Value) -> Result<String, ApiError>;
}

/// Static name -> handler map, complete for every `ToolKind` once built.
#[derive(Clone)]
pub struct ToolRegistry {
    handlers: HashMap<ToolKind, Arc<dyn ToolHandler>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(|k| k.name()).collect();
        names.sort_unstable();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}

impl ToolRegistry {
    pub fn new(handlers: Vec<Arc<dyn ToolHandler>>) -> Result<Self, ApiError> {
        let mut map: HashMap<ToolKind, Arc<dyn ToolHandler>> = HashMap::new();
        for handler in handlers {
            let kind = handler.kind();
            if map.insert(kind, handler).is_some() {
                return Err(ApiError::Configuration(format!(
                    "Tool `{}` registered twice",
                    kind.name()
                )));
            }
        }

        for kind in ToolKind::ALL {
            if !map.contains_key(&kind) {
                return Err(ApiError::Configuration(format!(
                    "No handler registered for tool `{}`",
                    kind.name()
                )));
            }
        }

        Ok(Self { handlers: map })
    }

    /// Definitions for every registered tool, in `ToolKind::ALL` order.
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        ToolKind::ALL
            .into_iter()
            .filter(|kind| self.handlers.contains_key(kind))
            .map(ToolKind::definition)
            .collect()
    }

    /// Fails when a catalog entry names a tool this registry cannot run.
    pub fn validate_catalog(&self, catalog: &[ToolDefinition]) -> Result<(), ApiError> {
        for def in catalog {
            self.resolve(def.name()).map_err(|_| {
                ApiError::Configuration(format!(
                    "Tool catalog advertises `{}` but no handler is registered",
                    def.name()
                ))
            })?;
        }
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn ToolHandler>, ApiError> {
        ToolKind::from_name(name)
            .and_then(|kind| self.handlers.get(&kind))
            .ok_or_else(|| ApiError::UnknownTool(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EchoTool;
    use serde_json::json;

    #[test]
    fn empty_registry_is_a_configuration_error() {
        let err = ToolRegistry::new(Vec::new()).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn duplicate_handler_is_rejected() {
        let err = ToolRegistry::new(vec![EchoTool::shared(), EchoTool::shared()]).unwrap_err();
        assert!(err.to_string().contains("registered twice"));
    }

    #[test]
    fn catalog_lists_context_retrieval() {
        let registry = ToolRegistry::new(vec![EchoTool::shared()]).unwrap();
        let catalog = registry.catalog();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name(), "context_retrieval");
        assert!(registry.validate_catalog(&catalog).is_ok());
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        let registry = ToolRegistry::new(vec![EchoTool::shared()]).unwrap();

        assert!(matches!(
            registry.resolve("web_search"),
            Err(ApiError::UnknownTool(name)) if name == "web_search"
        ));

        let bogus = ToolDefinition::function("web_search", "d", json!({}));
        assert!(registry.validate_catalog(&[bogus]).is_err());
    }
}
