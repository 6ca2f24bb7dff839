use std::sync::Arc;

use serde_json::{Number, Value};

pub type ScalarSerializeFn = Arc<dyn Fn(&Value) -> Result<Value, ScalarError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScalarError {
    #[error("{scalar} cannot represent value: {value}")]
    CannotRepresent { scalar: Arc<str>, value: String },
    #[error("{0}")]
    Custom(String),
}

#[derive(Clone)]
pub enum ScalarKind {
    Int,
    Float,
    String,
    Boolean,
    Id,
    /// Serialized by a user function, accepted as-is on input.
    Custom(Option<ScalarSerializeFn>),
}

#[derive(Clone)]
pub struct ScalarType {
    pub(crate) name: Arc<str>,
    pub(crate) kind: ScalarKind,
}

impl std::fmt::Debug for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarType").field("name", &self.name).finish_non_exhaustive()
    }
}

impl ScalarType {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            kind: ScalarKind::Custom(None),
        }
    }

    #[must_use]
    pub fn serialize_with(
        mut self,
        serialize: impl Fn(&Value) -> Result<Value, ScalarError> + Send + Sync + 'static,
    ) -> Self {
        self.kind = ScalarKind::Custom(Some(Arc::new(serialize)));
        self
    }

    pub(crate) fn builtins() -> [ScalarType; 5] {
        [
            ScalarType::builtin("Int", ScalarKind::Int),
            ScalarType::builtin("Float", ScalarKind::Float),
            ScalarType::builtin("String", ScalarKind::String),
            ScalarType::builtin("Boolean", ScalarKind::Boolean),
            ScalarType::builtin("ID", ScalarKind::Id),
        ]
    }

    fn builtin(name: &'static str, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Result coercion: turns a resolver value into what the response may contain.
    pub fn serialize(&self, value: &Value) -> Result<Value, ScalarError> {
        match &self.kind {
            ScalarKind::Int => match value {
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|n| i32::try_from(n).ok())
                    .or_else(|| {
                        // Integral floats such as 2.0 are accepted.
                        n.as_f64()
                            .filter(|f| f.fract() == 0.0 && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX))
                            .map(|f| f as i32)
                    })
                    .map(Value::from)
                    .ok_or_else(|| self.cannot_represent(value)),
                Value::Bool(b) => Ok(Value::from(i32::from(*b))),
                _ => Err(self.cannot_represent(value)),
            },
            ScalarKind::Float => match value {
                Value::Number(n) => n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| self.cannot_represent(value)),
                _ => Err(self.cannot_represent(value)),
            },
            ScalarKind::String => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err(self.cannot_represent(value)),
            },
            ScalarKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err(self.cannot_represent(value)),
            },
            ScalarKind::Id => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
                _ => Err(self.cannot_represent(value)),
            },
            ScalarKind::Custom(Some(serialize)) => serialize(value),
            ScalarKind::Custom(None) => Ok(value.clone()),
        }
    }

    /// Input coercion of an argument value.
    pub fn parse(&self, value: &Value) -> Result<Value, ScalarError> {
        match (&self.kind, value) {
            (ScalarKind::Int, Value::Number(n)) if n.as_i64().is_some_and(|n| i32::try_from(n).is_ok()) => {
                Ok(value.clone())
            }
            (ScalarKind::Float, Value::Number(_)) => Ok(value.clone()),
            (ScalarKind::String, Value::String(_)) => Ok(value.clone()),
            (ScalarKind::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (ScalarKind::Id, Value::String(_)) => Ok(value.clone()),
            (ScalarKind::Id, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
            (ScalarKind::Custom(_), _) => Ok(value.clone()),
            _ => Err(self.cannot_represent(value)),
        }
    }

    fn cannot_represent(&self, value: &Value) -> ScalarError {
        ScalarError::CannotRepresent {
            scalar: self.name.clone(),
            value: value.to_string(),
        }
    }
}
