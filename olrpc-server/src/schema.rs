//! Method parameter schemas
//!
//! One [`SchemaCatalog`] describes every method the server knows about. The
//! router validates against it and the session advertises its `advertised`
//! entries as the capability descriptor, so the two views cannot drift.
//!
//! Each parameter's constraints are a tagged variant ([`ParamKind`]), one case
//! per JSON type.

use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Largest limit accepted by listing and search methods
pub const MAX_RESULT_LIMIT: i64 = 1000;
/// Limit used when a listing or search omits one
pub const DEFAULT_RESULT_LIMIT: i64 = 50;
/// Largest number of addresses in one recipient list
pub const MAX_RECIPIENTS: usize = 100;
/// Largest number of attachments on one message
pub const MAX_ATTACHMENTS: usize = 20;

/// Semantic rule applied to a string parameter after its length check
#[derive(Debug, Clone, PartialEq)]
pub enum StringRule {
    /// Length bounds only
    Plain,
    /// Opaque store identifier; no control characters, none of `<>"'&`
    Identifier,
    /// Folder display name; identifier rules plus none of `/\:*?"<>|`
    FolderName,
    /// Free-text query; trimmed before its length is checked
    SearchQuery,
    /// One of a fixed set, compared case-insensitively
    OneOf(&'static [&'static str]),
}

/// Constraints for a string parameter (lengths in characters)
#[derive(Debug, Clone, PartialEq)]
pub struct StringConstraints {
    pub min_len: usize,
    pub max_len: usize,
    pub rule: StringRule,
}

/// Inclusive bounds for an integer parameter
#[derive(Debug, Clone, PartialEq)]
pub struct IntegerConstraints {
    pub min: i64,
    pub max: i64,
}

/// Element rule for list parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListItem {
    /// `local@domain.tld`
    EmailAddress,
    /// Filesystem path of a file to attach
    AttachmentPath,
    /// Any string
    Text,
}

/// Constraints for a list parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ListConstraints {
    pub min_items: usize,
    pub max_items: usize,
    pub item: ListItem,
}

/// Type and constraints of one parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    String(StringConstraints),
    Integer(IntegerConstraints),
    List(ListConstraints),
}

impl ParamKind {
    /// JSON-schema type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamKind::String(_) => "string",
            ParamKind::Integer(_) => "integer",
            ParamKind::List(_) => "array",
        }
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
    pub kind: ParamKind,
}

impl ParamSpec {
    /// A required string parameter
    pub fn string(
        name: impl Into<String>,
        description: impl Into<String>,
        min_len: usize,
        max_len: usize,
        rule: StringRule,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            default: None,
            kind: ParamKind::String(StringConstraints {
                min_len,
                max_len,
                rule,
            }),
        }
    }

    /// A required integer parameter
    pub fn integer(name: impl Into<String>, description: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            default: None,
            kind: ParamKind::Integer(IntegerConstraints { min, max }),
        }
    }

    /// A required list parameter
    pub fn list(
        name: impl Into<String>,
        description: impl Into<String>,
        min_items: usize,
        max_items: usize,
        item: ListItem,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            default: None,
            kind: ParamKind::List(ListConstraints {
                min_items,
                max_items,
                item,
            }),
        }
    }

    /// Mark the parameter optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Mark the parameter optional with a default
    pub fn with_default(mut self, default: Value) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }

    /// JSON-schema-like property description
    pub fn to_json_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.kind.type_name()));
        prop.insert("description".into(), json!(self.description));
        match &self.kind {
            ParamKind::String(c) => {
                prop.insert("minLength".into(), json!(c.min_len));
                prop.insert("maxLength".into(), json!(c.max_len));
                if let StringRule::OneOf(allowed) = &c.rule {
                    prop.insert("enum".into(), json!(allowed));
                }
            }
            ParamKind::Integer(c) => {
                prop.insert("minimum".into(), json!(c.min));
                prop.insert("maximum".into(), json!(c.max));
            }
            ParamKind::List(c) => {
                prop.insert("items".into(), json!({"type": "string"}));
                prop.insert("minItems".into(), json!(c.min_items));
                prop.insert("maxItems".into(), json!(c.max_items));
            }
        }
        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        Value::Object(prop)
    }
}

/// Declared parameters of one method, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSchema {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    /// Whether the method is offered to clients at handshake
    pub advertised: bool,
}

impl MethodSchema {
    /// An advertised method with no parameters yet
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            advertised: true,
        }
    }

    /// Append a parameter
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Keep the method out of the capability descriptor
    pub fn unadvertised(mut self) -> Self {
        self.advertised = false;
        self
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON-schema-like input shape
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Ordered set of method schemas
///
/// Shared read-only between the router and the session once the server is
/// built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaCatalog {
    methods: Vec<MethodSchema>,
}

impl SchemaCatalog {
    /// An empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a schema, keeping the original position on replace
    pub fn insert(&mut self, schema: MethodSchema) {
        match self.methods.iter_mut().find(|m| m.name == schema.name) {
            Some(existing) => *existing = schema,
            None => self.methods.push(schema),
        }
    }

    /// Builder-style `insert`
    pub fn with(mut self, schema: MethodSchema) -> Self {
        self.insert(schema);
        self
    }

    /// Remove a schema
    pub fn remove(&mut self, name: &str) -> Option<MethodSchema> {
        let pos = self.methods.iter().position(|m| m.name == name)?;
        Some(self.methods.remove(pos))
    }

    /// Look up a schema
    pub fn get(&self, name: &str) -> Option<&MethodSchema> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// All schemas in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &MethodSchema> {
        self.methods.iter()
    }

    /// Schemas offered to clients
    pub fn advertised(&self) -> impl Iterator<Item = &MethodSchema> {
        self.methods.iter().filter(|m| m.advertised)
    }

    /// Number of schemas
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True when no schema is declared
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Wrap for sharing
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// The mailbox methods
    ///
    /// `list_emails`, `get_email`, `search_emails` and `get_folders` are
    /// advertised; `send_email` is routable but not advertised.
    pub fn mailbox() -> Self {
        let limit = || {
            ParamSpec::integer("limit", "Maximum number of messages to return", 1, MAX_RESULT_LIMIT)
                .with_default(json!(DEFAULT_RESULT_LIMIT))
        };
        let folder = || {
            ParamSpec::string(
                "folder",
                "Folder name; the default inbox when omitted",
                1,
                255,
                StringRule::FolderName,
            )
            .optional()
        };

        Self::new()
            .with(
                MethodSchema::new("list_emails", "List recent messages in a folder")
                    .param(folder())
                    .param(limit()),
            )
            .with(
                MethodSchema::new("get_email", "Fetch one message by its identifier").param(
                    ParamSpec::string(
                        "email_id",
                        "Store identifier of the message",
                        1,
                        255,
                        StringRule::Identifier,
                    ),
                ),
            )
            .with(
                MethodSchema::new("search_emails", "Search messages by subject, sender or body")
                    .param(ParamSpec::string(
                        "query",
                        "Text to search for",
                        1,
                        1000,
                        StringRule::SearchQuery,
                    ))
                    .param(folder())
                    .param(limit()),
            )
            .with(MethodSchema::new("get_folders", "List the mailbox folder tree"))
            .with(
                MethodSchema::new("send_email", "Compose and send a message")
                    .unadvertised()
                    .param(ParamSpec::list(
                        "to",
                        "Primary recipients",
                        1,
                        MAX_RECIPIENTS,
                        ListItem::EmailAddress,
                    ))
                    .param(
                        ParamSpec::list("cc", "Copy recipients", 0, MAX_RECIPIENTS, ListItem::EmailAddress)
                            .optional(),
                    )
                    .param(
                        ParamSpec::list(
                            "bcc",
                            "Blind copy recipients",
                            0,
                            MAX_RECIPIENTS,
                            ListItem::EmailAddress,
                        )
                        .optional(),
                    )
                    .param(ParamSpec::string("subject", "Subject line", 0, 255, StringRule::Plain))
                    .param(ParamSpec::string("body", "Message body", 0, 1_000_000, StringRule::Plain))
                    .param(
                        ParamSpec::string(
                            "body_format",
                            "Body format",
                            1,
                            16,
                            StringRule::OneOf(&["text", "html"]),
                        )
                        .with_default(json!("text")),
                    )
                    .param(
                        ParamSpec::string(
                            "importance",
                            "Message importance",
                            1,
                            16,
                            StringRule::OneOf(&["low", "normal", "high"]),
                        )
                        .with_default(json!("normal")),
                    )
                    .param(
                        ParamSpec::list(
                            "attachments",
                            "Paths of files to attach",
                            0,
                            MAX_ATTACHMENTS,
                            ListItem::AttachmentPath,
                        )
                        .optional(),
                    ),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailbox_catalog_contents() {
        let catalog = SchemaCatalog::mailbox();
        assert_eq!(catalog.len(), 5);

        let advertised: Vec<_> = catalog.advertised().map(|m| m.name.as_str()).collect();
        assert_eq!(
            advertised,
            vec!["list_emails", "get_email", "search_emails", "get_folders"]
        );
        assert!(!catalog.get("send_email").unwrap().advertised);
    }

    #[test]
    fn test_input_schema_reflects_constraints() {
        let catalog = SchemaCatalog::mailbox();
        let schema = catalog.get("list_emails").unwrap().input_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
        assert_eq!(schema["properties"]["limit"]["maximum"], 1000);
        assert_eq!(schema["properties"]["limit"]["default"], 50);
        assert_eq!(schema["required"], json!([]));

        let get_email = catalog.get("get_email").unwrap().input_schema();
        assert_eq!(get_email["required"], json!(["email_id"]));
        assert_eq!(get_email["properties"]["email_id"]["maxLength"], 255);
    }

    #[test]
    fn test_enum_rule_is_advertised() {
        let catalog = SchemaCatalog::mailbox();
        let schema = catalog.get("send_email").unwrap().input_schema();
        assert_eq!(schema["properties"]["importance"]["enum"], json!(["low", "normal", "high"]));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut catalog = SchemaCatalog::mailbox();
        catalog.insert(MethodSchema::new("get_email", "replaced"));

        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.iter().nth(1).unwrap().description, "replaced");
        assert!(catalog.remove("get_email").is_some());
        assert!(catalog.get("get_email").is_none());
    }
}
