use std::sync::Arc;

use error::{ErrorPath, ErrorPathSegment};
use itertools::Itertools;

/// Path of a value within the response, from the root.
///
/// Backed by a persistent vector so that every task can own its path while sharing the common
/// prefix with its siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePath(im::Vector<PathSegment>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(Arc<str>),
    Index(usize),
}

impl ResponsePath {
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child_field(&self, key: &Arc<str>) -> Self {
        let mut path = self.clone();
        path.0.push_back(PathSegment::Field(key.clone()));
        path
    }

    #[must_use]
    pub fn child_index(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.0.push_back(PathSegment::Index(index));
        path
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathSegment> + '_ {
        self.0.iter()
    }

    pub fn to_error_path(&self) -> ErrorPath {
        self.0
            .iter()
            .map(|segment| match segment {
                PathSegment::Field(key) => ErrorPathSegment::Field(key.clone()),
                PathSegment::Index(index) => ErrorPathSegment::Index(*index),
            })
            .collect()
    }
}

impl std::fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().format("."))
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Field(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl serde::Serialize for ResponsePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}

impl serde::Serialize for PathSegment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            PathSegment::Field(key) => serializer.serialize_str(key),
            PathSegment::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}
