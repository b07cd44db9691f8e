use std::fmt;

use super::JsonMap;

/// A structured error as found in the `errors` list of a GraphQL response.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<JsonMap>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Field(String),
}

impl From<&str> for PathSegment {
    fn from(field: &str) -> Self {
        PathSegment::Field(field.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(field: String) -> Self {
        PathSegment::Field(field)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl GraphqlError {
    pub fn new(message: impl Into<String>) -> Self {
        GraphqlError {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.locations.push(Location { line, column });
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl IntoIterator<Item = PathSegment>) -> Self {
        self.path.extend(path);
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extensions
            .get_or_insert_with(Default::default)
            .insert(key.into(), value.into());
        self
    }

    // ------------- //
    // Common errors //
    // ------------- //

    pub fn unidentified_operation() -> Self {
        GraphqlError::new("Unable to identify operation")
    }

    pub fn subscriber_already_exists(id: &str) -> Self {
        GraphqlError::new(format!("Subscriber for {id} already exists"))
    }

    pub fn internal_server_error() -> Self {
        GraphqlError::new("Internal server error")
    }
}

impl fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_like_a_graphql_response_error() {
        let error = GraphqlError::new("Cannot query field \"nope\" on type \"Query\".")
            .with_location(1, 3)
            .with_path(["users".into(), 0.into(), "name".into()])
            .with_extension("code", "OPERATION_VALIDATION_ERROR");

        insta::assert_json_snapshot!(error, @r#"
        {
          "message": "Cannot query field \"nope\" on type \"Query\".",
          "locations": [
            {
              "line": 1,
              "column": 3
            }
          ],
          "path": [
            "users",
            0,
            "name"
          ],
          "extensions": {
            "code": "OPERATION_VALIDATION_ERROR"
          }
        }
        "#);
    }

    #[test]
    fn minimal_error_only_has_a_message() {
        let error: GraphqlError = serde_json::from_value(json!({"message": "boom"})).unwrap();

        assert_eq!(error, GraphqlError::new("boom"));
        assert_eq!(serde_json::to_value(&error).unwrap(), json!({"message": "boom"}));
    }
}
