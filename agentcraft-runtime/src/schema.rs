//! # Tool schemas
//!
//! The static contract advertised to the model: tool name, description and
//! parameter shape. Built once at startup and never mutated.

use serde_json::{json, Map, Value};

/// Type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    StringArray,
}

/// One named parameter of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub description: &'static str,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: &'static str, ty: ParamType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            description,
            required: true,
        }
    }

    pub fn optional(name: &'static str, ty: ParamType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            description,
            required: false,
        }
    }
}

/// Declared schema of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolSchema {
    pub fn new(name: &'static str, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Names of the required parameters, in declaration order
    pub fn required(&self) -> Vec<&'static str> {
        self.params.iter().filter(|p| p.required).map(|p| p.name).collect()
    }

    /// Standard JSON Schema object for the parameters (OpenAI style)
    pub fn to_json_schema(&self) -> Value {
        self.parameters_with(|ty| match ty {
            ParamType::String => json!({ "type": "string" }),
            ParamType::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
        }, "object")
    }

    /// Gemini's OpenAPI subset uses upper-case type names
    pub fn to_gemini_schema(&self) -> Value {
        self.parameters_with(|ty| match ty {
            ParamType::String => json!({ "type": "STRING" }),
            ParamType::StringArray => json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
        }, "OBJECT")
    }

    fn parameters_with(&self, type_of: impl Fn(ParamType) -> Value, object: &str) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut prop = type_of(param.ty);
            prop["description"] = Value::String(param.description.to_string());
            properties.insert(param.name.to_string(), prop);
        }
        json!({
            "type": object,
            "properties": properties,
            "required": self.required(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_schema() -> ToolSchema {
        ToolSchema::new("run_python_file", "Run a script")
            .with_param(ParamSpec::required("file_path", ParamType::String, "Script path"))
            .with_param(ParamSpec::optional("args", ParamType::StringArray, "Arguments"))
    }

    #[test]
    fn test_required_params() {
        assert_eq!(run_schema().required(), vec!["file_path"]);
    }

    #[test]
    fn test_json_schema() {
        let schema = run_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["file_path"]["type"], "string");
        assert_eq!(schema["properties"]["args"]["type"], "array");
        assert_eq!(schema["properties"]["args"]["items"]["type"], "string");
        assert_eq!(schema["required"], json!(["file_path"]));
    }

    #[test]
    fn test_gemini_schema() {
        let schema = run_schema().to_gemini_schema();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["args"]["type"], "ARRAY");
        assert_eq!(schema["properties"]["file_path"]["description"], "Script path");
    }

    #[test]
    fn test_no_params() {
        let schema = ToolSchema::new("noop", "Nothing").to_json_schema();
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(schema["required"], json!([]));
    }
}
