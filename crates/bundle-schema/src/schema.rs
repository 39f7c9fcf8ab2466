//! JSON schema for the configuration document.

/// JSON Schema for bundlecheck configuration files (YAML or JSON).
pub const CONFIG_SCHEMA: &str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "Bundlecheck Configuration",
  "type": "object",
  "required": ["application"],
  "properties": {
    "application": {
      "type": "object",
      "required": ["bundles_source"],
      "properties": {
        "bundles_source": { "type": "string" },
        "source_directory": { "type": ["string", "null"] },
        "working_directory": { "type": ["string", "null"] },
        "enable_colors": { "type": "boolean" },
        "exempt_extensions": {
          "type": "array",
          "items": { "type": "string" }
        },
        "nested_failure": {
          "type": "string",
          "enum": ["abort_run", "skip_package"]
        },
        "packages": {
          "type": "array",
          "items": { "$ref": "#/definitions/package" }
        }
      }
    },
    "logging": {
      "type": "object",
      "properties": {
        "level": {
          "type": "string",
          "enum": ["trace", "debug", "info", "warn", "error"]
        },
        "file": { "type": ["string", "null"] }
      }
    }
  },
  "definitions": {
    "package": {
      "type": "object",
      "required": ["name"],
      "properties": {
        "name": { "type": "string" },
        "children_packages": {
          "type": "array",
          "items": { "$ref": "#/definitions/package" }
        },
        "signature_files": {
          "type": "array",
          "items": { "type": "string" }
        },
        "package_directory": { "type": ["string", "null"] },
        "authority_source": { "type": ["string", "null"] }
      }
    }
  }
}"##;

/// Get the configuration schema as a parsed JSON value.
pub fn config_schema() -> serde_json::Value {
    serde_json::from_str(CONFIG_SCHEMA).expect("Invalid configuration schema")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_schema_parses() {
        let schema = config_schema();
        assert_eq!(schema["title"], "Bundlecheck Configuration");
        assert!(schema["definitions"]["package"].is_object());
    }
}
