use std::sync::Arc;

use error::{ErrorCode, GraphqlError};
use indexmap::IndexMap;
use serde_json::Value;

use super::{OperationError, Variables};
use crate::schema::{EnumType, FieldType, InputValueDefinition, NamedType, ScalarType, Schema};

/// Argument as written in the operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    Literal(Value),
    Variable(Arc<str>),
}

impl ArgumentValue {
    pub fn variable(name: impl Into<Arc<str>>) -> Self {
        ArgumentValue::Variable(name.into())
    }
}

/// Coerced arguments handed to resolvers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(IndexMap<Arc<str>, Value>);

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.0.iter().map(|(name, value)| (name.as_ref(), value))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoercionError {
    #[error("Missing required argument '{argument}' of type {ty}")]
    MissingArgument { argument: Arc<str>, ty: String },
    #[error("Argument '{argument}' of type {ty} cannot be null")]
    NullArgument { argument: Arc<str>, ty: String },
    #[error("Invalid value for argument '{argument}': {reason}")]
    InvalidValue { argument: Arc<str>, reason: String },
}

impl From<CoercionError> for GraphqlError {
    fn from(err: CoercionError) -> Self {
        GraphqlError::new(err.to_string(), ErrorCode::ArgumentCoercionError)
    }
}

#[derive(Debug, Clone)]
enum InputKind {
    Scalar(ScalarType),
    Enum(EnumType),
}

#[derive(Debug, Clone)]
struct ArgumentSlot {
    name: Arc<str>,
    ty: FieldType,
    input: InputKind,
    default_value: Option<Value>,
    value: Option<ArgumentValue>,
}

/// Arguments of one selection. When all of them are literals they are coerced once while
/// building the operation, and tasks skip coercion entirely.
#[derive(Debug, Clone, Default)]
pub struct ArgumentMap {
    arguments: Vec<ArgumentSlot>,
    coerced: Option<Arc<Arguments>>,
}

impl ArgumentMap {
    pub(crate) fn new(
        schema: &Schema,
        field: &str,
        definitions: &[InputValueDefinition],
        provided: &[(Arc<str>, ArgumentValue)],
    ) -> Result<Self, OperationError> {
        if let Some((name, _)) = provided
            .iter()
            .find(|(name, _)| !definitions.iter().any(|def| def.name == *name))
        {
            return Err(OperationError::UnknownArgument {
                field: field.into(),
                argument: name.clone(),
            });
        }

        let mut arguments = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let input = match schema.named_type(&definition.ty.name) {
                Some(NamedType::Scalar(scalar)) => InputKind::Scalar(scalar.clone()),
                Some(NamedType::Enum(enum_type)) => InputKind::Enum(enum_type.clone()),
                _ => return Err(OperationError::UnknownType(definition.ty.name.clone())),
            };
            let value = provided
                .iter()
                .find(|(name, _)| *name == definition.name)
                .map(|(_, value)| value.clone());
            arguments.push(ArgumentSlot {
                name: definition.name.clone(),
                ty: definition.ty.clone(),
                input,
                default_value: definition.default_value.clone(),
                value,
            });
        }

        let mut map = ArgumentMap {
            arguments,
            coerced: None,
        };
        let only_literals = map
            .arguments
            .iter()
            .all(|argument| !matches!(argument.value, Some(ArgumentValue::Variable(_))));
        if only_literals {
            map.coerced = map.coerce(&Variables::default()).ok().map(Arc::new);
        }
        Ok(map)
    }

    /// Whether arguments were already coerced without error and can be used as-is.
    pub fn is_final_no_errors(&self) -> bool {
        self.coerced.is_some()
    }

    pub fn try_coerce(&self, variables: &Variables) -> Result<Arc<Arguments>, CoercionError> {
        match &self.coerced {
            Some(arguments) => Ok(arguments.clone()),
            None => self.coerce(variables).map(Arc::new),
        }
    }

    fn coerce(&self, variables: &Variables) -> Result<Arguments, CoercionError> {
        let mut coerced = IndexMap::with_capacity(self.arguments.len());
        for argument in &self.arguments {
            let value = match &argument.value {
                Some(ArgumentValue::Literal(value)) => Some(value.clone()),
                Some(ArgumentValue::Variable(name)) => variables
                    .get(name)
                    .cloned()
                    .or_else(|| argument.default_value.clone()),
                None => argument.default_value.clone(),
            };
            match value {
                Some(value) => {
                    let value = coerce_input(&argument.name, &argument.ty, &argument.input, value)?;
                    coerced.insert(argument.name.clone(), value);
                }
                None if argument.ty.is_required() => {
                    return Err(CoercionError::MissingArgument {
                        argument: argument.name.clone(),
                        ty: argument.ty.to_string(),
                    })
                }
                None => {}
            }
        }
        Ok(Arguments(coerced))
    }
}

fn coerce_input(argument: &Arc<str>, ty: &FieldType, input: &InputKind, value: Value) -> Result<Value, CoercionError> {
    if value.is_null() {
        if ty.is_required() {
            return Err(CoercionError::NullArgument {
                argument: argument.clone(),
                ty: ty.to_string(),
            });
        }
        return Ok(Value::Null);
    }

    if let Some(item_type) = ty.item_type() {
        return match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| coerce_input(argument, &item_type, input, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            // A single item is accepted where a list is expected.
            value => coerce_input(argument, &item_type, input, value).map(|item| Value::Array(vec![item])),
        };
    }

    match input {
        InputKind::Scalar(scalar) => scalar.parse(&value).map_err(|err| CoercionError::InvalidValue {
            argument: argument.clone(),
            reason: err.to_string(),
        }),
        InputKind::Enum(enum_type) => match value.as_str() {
            Some(name) if enum_type.contains(name) => Ok(value),
            _ => Err(CoercionError::InvalidValue {
                argument: argument.clone(),
                reason: format!("{} has no value {value}", enum_type.name()),
            }),
        },
    }
}
