use std::sync::Arc;

/// Response path of a field error, from the root of `data`.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct ErrorPath(Vec<ErrorPathSegment>);

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorPathSegment {
    Field(Arc<str>),
    Index(usize),
}

impl ErrorPath {
    pub fn push(&mut self, segment: impl Into<ErrorPathSegment>) {
        self.0.push(segment.into());
    }
}

impl std::ops::Deref for ErrorPath {
    type Target = [ErrorPathSegment];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl serde::Serialize for ErrorPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}

impl serde::Serialize for ErrorPathSegment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ErrorPathSegment::Field(name) => serializer.serialize_str(name),
            ErrorPathSegment::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

impl From<&str> for ErrorPathSegment {
    fn from(name: &str) -> Self {
        ErrorPathSegment::Field(name.into())
    }
}

impl From<String> for ErrorPathSegment {
    fn from(name: String) -> Self {
        ErrorPathSegment::Field(name.into())
    }
}

impl From<Arc<str>> for ErrorPathSegment {
    fn from(name: Arc<str>) -> Self {
        ErrorPathSegment::Field(name)
    }
}

impl From<usize> for ErrorPathSegment {
    fn from(index: usize) -> Self {
        ErrorPathSegment::Index(index)
    }
}

// A single field at the root.
impl From<&str> for ErrorPath {
    fn from(name: &str) -> Self {
        ErrorPath(vec![name.into()])
    }
}

impl From<String> for ErrorPath {
    fn from(name: String) -> Self {
        ErrorPath(vec![name.into()])
    }
}

impl<const N: usize> From<[ErrorPathSegment; N]> for ErrorPath {
    fn from(segments: [ErrorPathSegment; N]) -> Self {
        ErrorPath(segments.into())
    }
}

impl FromIterator<ErrorPathSegment> for ErrorPath {
    fn from_iter<I: IntoIterator<Item = ErrorPathSegment>>(iter: I) -> Self {
        ErrorPath(iter.into_iter().collect())
    }
}
