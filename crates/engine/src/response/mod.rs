mod path;
mod tree;
mod violation;

pub use error::{ErrorCode, GraphqlError};
pub use path::{PathSegment, ResponsePath};
pub(crate) use tree::*;
pub(crate) use violation::*;

/// Final result of an execution: whatever data could be computed and every localized failure.
///
/// `data` is only `None` if a non-null violation propagated up to the root.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Response {
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub errors: Vec<GraphqlError>,
}

impl Response {
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    pub fn errors(&self) -> &[GraphqlError] {
        &self.errors
    }

    pub fn from_error(error: impl Into<GraphqlError>) -> Self {
        Self {
            data: None,
            errors: vec![error.into()],
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
