//! Schema types and builders
//!
//! Resources, data sources and the provider itself describe their
//! configuration surface with a [`Schema`]: a root block of typed
//! attributes plus nested blocks. Attributes carry the plan-time behaviors
//! the framework enforces — validators, force-new replacement, static
//! defaults and diff suppression.

use crate::types::Dynamic;
use crate::validator::Validator;
use std::collections::HashMap;
use std::sync::Arc;

/// Terraform's attribute type system.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    /// Renders the type in Terraform's JSON type notation, as required by
    /// the wire protocol's schema encoding.
    pub fn to_wire_json(&self) -> Vec<u8> {
        fn render(t: &AttributeType) -> serde_json::Value {
            match t {
                AttributeType::String => serde_json::Value::String("string".into()),
                AttributeType::Number => serde_json::Value::String("number".into()),
                AttributeType::Bool => serde_json::Value::String("bool".into()),
                AttributeType::List(elem) => {
                    serde_json::json!(["list", render(elem)])
                }
                AttributeType::Set(elem) => {
                    serde_json::json!(["set", render(elem)])
                }
                AttributeType::Map(elem) => {
                    serde_json::json!(["map", render(elem)])
                }
                AttributeType::Object(attrs) => {
                    let mut fields = serde_json::Map::new();
                    for (name, t) in attrs {
                        fields.insert(name.clone(), render(t));
                    }
                    serde_json::json!(["object", fields])
                }
            }
        }

        serde_json::to_vec(&render(self)).expect("type encoding is infallible")
    }
}

/// Suppresses a planned change when old and new values are equivalent.
///
/// Mirrors the diff-suppression hook of Terraform's plugin SDK: when the
/// prior state value and the configured value are "the same" for the
/// remote API's purposes, the prior value is kept in the plan.
pub trait DiffSuppress: Send + Sync {
    fn suppress(&self, key: &str, old: &str, new: &str) -> bool;
}

/// Case-insensitive string equality suppression.
pub struct CaseDifference;

impl DiffSuppress for CaseDifference {
    fn suppress(&self, _key: &str, old: &str, new: &str) -> bool {
        old.eq_ignore_ascii_case(new)
    }
}

/// Adapts a plain function to [`DiffSuppress`].
pub struct SuppressFn(pub fn(&str, &str, &str) -> bool);

impl DiffSuppress for SuppressFn {
    fn suppress(&self, key: &str, old: &str, new: &str) -> bool {
        (self.0)(key, old, new)
    }
}

/// Schema returned by providers/resources/data sources.
#[derive(Clone)]
pub struct Schema {
    /// Increment when schema changes require state migration
    pub version: i64,
    pub block: Block,
}

#[derive(Clone, Default)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn block_type(&self, name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|b| b.type_name == name)
    }
}

/// A single configuration attribute.
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// A change to this attribute requires replacing the resource.
    pub force_new: bool,
    pub deprecated: bool,
    /// Static default applied when the attribute is absent from config.
    pub default: Option<Dynamic>,
    pub validators: Vec<Arc<dyn Validator>>,
    pub diff_suppress: Option<Arc<dyn DiffSuppress>>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("force_new", &self.force_new)
            .field("validators", &self.validators.len())
            .field("diff_suppress", &self.diff_suppress.is_some())
            .finish()
    }
}

/// A nested configuration block.
#[derive(Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    /// 0 means unbounded
    pub max_items: i64,
    /// Replacing any item requires replacing the resource.
    pub force_new: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Single,
    List,
    Set,
}

/// Fluent attribute construction; use this instead of building [`Attribute`]
/// by hand.
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, r#type: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                force_new: false,
                deprecated: false,
                default: None,
                validators: Vec::new(),
                diff_suppress: None,
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.attribute.force_new = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn default_value(mut self, value: Dynamic) -> Self {
        self.attribute.default = Some(value);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn diff_suppress(mut self, suppress: Arc<dyn DiffSuppress>) -> Self {
        self.attribute.diff_suppress = Some(suppress);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// Fluent block construction for nested blocks.
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self {
            block: Block::default(),
        }
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, nested: NestedBlock) -> Self {
        self.block.block_types.push(nested);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block.description = desc.to_string();
        self
    }

    pub fn build_nested(self, type_name: &str, nesting: NestingMode) -> NestedBlockBuilder {
        NestedBlockBuilder {
            nested: NestedBlock {
                type_name: type_name.to_string(),
                block: self.block,
                nesting,
                min_items: 0,
                max_items: 0,
                force_new: false,
            },
        }
    }

    pub fn build(self) -> Block {
        self.block
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct NestedBlockBuilder {
    nested: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn min_items(mut self, min: i64) -> Self {
        self.nested.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.nested.max_items = max;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.nested.force_new = true;
        self
    }

    pub fn build(self) -> NestedBlock {
        self.nested
    }
}

/// Fluent schema construction.
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::default(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, nested: NestedBlock) -> Self {
        self.schema.block.block_types.push(nested);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::string("name")
            .description("The name of the resource")
            .required()
            .force_new()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert!(attr.force_new);
    }

    #[test]
    fn schema_builder_collects_attributes_and_blocks() {
        let schema = SchemaBuilder::new()
            .version(1)
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().build())
            .block(
                BlockBuilder::new()
                    .attribute(AttributeBuilder::string("username").required().build())
                    .build_nested("gateway", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .build(),
            )
            .build();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.block.attributes.len(), 2);
        assert!(schema.block.block_type("gateway").is_some());
        assert!(schema.block.attribute("id").unwrap().computed);
    }

    #[test]
    fn case_difference_suppresses_case_only_changes() {
        let s = CaseDifference;
        assert!(s.suppress("tier", "Standard", "standard"));
        assert!(!s.suppress("tier", "Standard", "Premium"));
    }

    #[test]
    fn wire_type_notation() {
        assert_eq!(AttributeType::String.to_wire_json(), b"\"string\"".to_vec());

        let list = AttributeType::List(Box::new(AttributeType::Number));
        assert_eq!(
            String::from_utf8(list.to_wire_json()).unwrap(),
            r#"["list","number"]"#
        );
    }
}
