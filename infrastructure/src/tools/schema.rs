//! JSON Schema tool converter.
//!
//! Default implementation of [`ToolSchemaPort`] producing provider-neutral
//! JSON Schema for native tool-use APIs.

use nova_application::ToolSchemaPort;
use nova_domain::{ParamKind, ToolDescriptor};
use serde_json::{Map, Value, json};

/// Default implementation producing provider-neutral JSON Schema.
///
/// Parameter kind → JSON Schema type:
/// - `string`, `path` → `"string"`
/// - `url` → `"string"` with `"format": "uri"`
/// - `number` → `"number"`
/// - `boolean` → `"boolean"`
pub struct JsonSchemaToolConverter;

impl ToolSchemaPort for JsonSchemaToolConverter {
    fn tool_to_schema(&self, tool: &ToolDescriptor) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in tool.schema.params() {
            let mut prop = Map::new();
            let schema_type = match param.kind {
                ParamKind::String | ParamKind::Path | ParamKind::Url => "string",
                ParamKind::Number => "number",
                ParamKind::Boolean => "boolean",
            };
            prop.insert("type".to_string(), json!(schema_type));
            if param.kind == ParamKind::Url {
                prop.insert("format".to_string(), json!("uri"));
            }
            prop.insert("description".to_string(), json!(param.description));
            if let Some(default) = &param.default {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));

            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": {
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }
        })
    }
}
