// SPDX-License-Identifier: MIT

//! Tool capability interface and schema-checked dispatch.
//!
//! Tools declare a JSON-Schema fragment for their parameters; the
//! dispatcher validates arguments against it before the tool runs, so a
//! malformed call fails as `Validation` without touching the tool. The
//! validator covers what the fragments actually use (object shape,
//! required fields, primitive property types, enums), one level deep.

use async_trait::async_trait;
use hew_core::{EngineError, EngineResult, ToolContext};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON-Schema fragment for the arguments object. Usually generated
    /// with [`schema_for`].
    fn parameters_schema(&self) -> Value;
    async fn run(&self, ctx: &ToolContext, args: Value) -> EngineResult<String>;
}

/// Schema for a parameters struct, as plain data.
pub fn schema_for<T: schemars::JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.tools.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Validate and run one tool invocation.
    pub async fn dispatch(
        &self,
        name: &str,
        ctx: &ToolContext,
        args: Value,
    ) -> EngineResult<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| EngineError::validation(format!("unknown tool: {name}")))?;
        validate_args(&tool.parameters_schema(), &args)?;
        ctx.check_cancelled()?;

        tracing::debug!(tool = name, session = %ctx.session_id, "dispatching tool");
        tool.run(ctx, args).await
    }
}

/// Check an arguments object against a declared schema fragment.
pub fn validate_args(schema: &Value, args: &Value) -> EngineResult<()> {
    let Some(object) = args.as_object() else {
        return Err(EngineError::validation("arguments must be a JSON object"));
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(field) {
                return Err(EngineError::validation(format!("missing required field: {field}")));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, declared) in properties {
        let Some(value) = object.get(key) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Some(expected) = declared.get("type") {
            if !type_matches(expected, value) {
                return Err(EngineError::validation(format!(
                    "field `{key}` has the wrong type: expected {expected}"
                )));
            }
        }
        if let Some(allowed) = declared.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                return Err(EngineError::validation(format!(
                    "field `{key}` must be one of {allowed:?}"
                )));
            }
        }
    }
    Ok(())
}

/// `type` in a fragment may be a string or a list of strings (nullable
/// fields generate `["string", "null"]`).
fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => type_name_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| type_name_matches(name, value)),
        _ => true,
    }
}

fn type_name_matches(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
