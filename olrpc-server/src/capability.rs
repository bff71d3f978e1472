//! Capability descriptor advertised at handshake

use crate::schema::SchemaCatalog;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One advertised method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Methods a client may call, with their input shapes
///
/// Generated from the advertised entries of a [`SchemaCatalog`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub tools: Vec<ToolDescriptor>,
}

impl CapabilityDescriptor {
    /// Build from the catalog's advertised methods, in catalog order
    pub fn from_catalog(catalog: &SchemaCatalog) -> Self {
        let tools = catalog
            .advertised()
            .map(|schema| ToolDescriptor {
                name: schema.name.clone(),
                description: schema.description.clone(),
                input_schema: schema.input_schema(),
            })
            .collect();
        Self { tools }
    }

    /// Whether a tool with this name is advertised
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    /// Advertised tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Name and version reported to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_lists_advertised_tools() {
        let descriptor = CapabilityDescriptor::from_catalog(&SchemaCatalog::mailbox());

        assert_eq!(descriptor.tools.len(), 4);
        assert!(descriptor.has_tool("search_emails"));
        assert!(!descriptor.has_tool("send_email"));
    }

    #[test]
    fn test_descriptor_matches_catalog_shapes() {
        let catalog = SchemaCatalog::mailbox();
        let descriptor = CapabilityDescriptor::from_catalog(&catalog);

        for tool in &descriptor.tools {
            let schema = catalog.get(&tool.name).unwrap();
            assert_eq!(tool.input_schema, schema.input_schema());
        }
    }

    #[test]
    fn test_serialized_field_names() {
        let descriptor = CapabilityDescriptor::from_catalog(&SchemaCatalog::mailbox());
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["tools"][0]["name"], "list_emails");
        assert!(value["tools"][0]["inputSchema"]["properties"].is_object());
    }
}
