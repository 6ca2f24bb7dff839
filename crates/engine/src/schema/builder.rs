use std::sync::Arc;

use indexmap::IndexMap;

use super::{AbstractType, EnumType, NamedType, ObjectType, ScalarType, Schema};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Type '{0}' is defined more than once")]
    DuplicateType(Arc<str>),
    #[error("Root type '{0}' is not an object type")]
    InvalidRootType(Arc<str>),
    #[error("Field '{object}.{field}' references unknown type '{ty}'")]
    UnknownFieldType { object: Arc<str>, field: Arc<str>, ty: Arc<str> },
    #[error("Argument '{field}({argument})' must have an input type, not '{ty}'")]
    InvalidArgumentType {
        field: Arc<str>,
        argument: Arc<str>,
        ty: Arc<str>,
    },
    #[error("'{0}' implements '{1}' which is not an interface")]
    InvalidInterface(Arc<str>, Arc<str>),
    #[error("Union '{0}' has a member '{1}' which is not an object type")]
    InvalidUnionMember(Arc<str>, Arc<str>),
}

pub struct SchemaBuilder {
    query_type: Arc<str>,
    mutation_type: Option<Arc<str>>,
    subscription_type: Option<Arc<str>>,
    types: Vec<NamedType>,
}

impl SchemaBuilder {
    pub(super) fn new(query_type: Arc<str>) -> Self {
        Self {
            query_type,
            mutation_type: None,
            subscription_type: None,
            types: ScalarType::builtins().into_iter().map(NamedType::Scalar).collect(),
        }
    }

    #[must_use]
    pub fn mutation_type(mut self, name: impl Into<Arc<str>>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    #[must_use]
    pub fn subscription_type(mut self, name: impl Into<Arc<str>>) -> Self {
        self.subscription_type = Some(name.into());
        self
    }

    #[must_use]
    pub fn object(mut self, object: ObjectType) -> Self {
        self.types.push(NamedType::Object(object));
        self
    }

    #[must_use]
    pub fn interface(mut self, interface: AbstractType) -> Self {
        self.types.push(NamedType::Interface(interface));
        self
    }

    #[must_use]
    pub fn union(mut self, union: AbstractType) -> Self {
        self.types.push(NamedType::Union(union));
        self
    }

    #[must_use]
    pub fn enum_type(mut self, enum_type: EnumType) -> Self {
        self.types.push(NamedType::Enum(enum_type));
        self
    }

    #[must_use]
    pub fn scalar(mut self, scalar: ScalarType) -> Self {
        self.types.push(NamedType::Scalar(scalar));
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut types = IndexMap::with_capacity(self.types.len());
        for ty in self.types {
            let name: Arc<str> = ty.name().into();
            if types.insert(name.clone(), ty).is_some() {
                return Err(SchemaError::DuplicateType(name));
            }
        }

        // Interface possible types are the objects declaring them.
        let implementations = types
            .values()
            .filter_map(|ty| match ty {
                NamedType::Object(object) => Some(object),
                _ => None,
            })
            .flat_map(|object| {
                object
                    .interfaces
                    .iter()
                    .map(|interface| (interface.clone(), object.name.clone()))
            })
            .collect::<Vec<_>>();
        for (interface, object) in implementations {
            match types.get_mut(&interface) {
                Some(NamedType::Interface(abstract_type)) => {
                    if !abstract_type.is_possible_type(&object) {
                        abstract_type.possible_types.push(object);
                    }
                }
                _ => return Err(SchemaError::InvalidInterface(object, interface)),
            }
        }

        let schema = Schema {
            types,
            query_type: self.query_type,
            mutation_type: self.mutation_type,
            subscription_type: self.subscription_type,
        };
        schema.validate()?;
        Ok(schema)
    }
}

impl Schema {
    fn validate(&self) -> Result<(), SchemaError> {
        for root in std::iter::once(&self.query_type)
            .chain(self.mutation_type.as_ref())
            .chain(self.subscription_type.as_ref()) {
            if self.object(root).is_none() {
                return Err(SchemaError::InvalidRootType(root.clone()));
            }
        }

        for ty in self.types.values() {
            match ty {
                NamedType::Object(object) => {
                    for field in object.fields.values() {
                        if self.named_type(&field.ty.name).is_none() {
                            return Err(SchemaError::UnknownFieldType {
                                object: object.name.clone(),
                                field: field.name.clone(),
                                ty: field.ty.name.clone(),
                            });
                        }
                        for argument in &field.arguments {
                            if !self.named_type(&argument.ty.name).is_some_and(NamedType::is_input) {
                                return Err(SchemaError::InvalidArgumentType {
                                    field: field.name.clone(),
                                    argument: argument.name.clone(),
                                    ty: argument.ty.name.clone(),
                                });
                            }
                        }
                    }
                }
                NamedType::Union(union) => {
                    for member in &union.possible_types {
                        if self.object(member).is_none() {
                            return Err(SchemaError::InvalidUnionMember(union.name.clone(), member.clone()));
                        }
                    }
                }
                NamedType::Scalar(_) | NamedType::Enum(_) | NamedType::Interface(_) => {}
            }
        }

        Ok(())
    }
}
