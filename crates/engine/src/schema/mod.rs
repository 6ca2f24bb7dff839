//! The slice of the type system value completion needs: named types, field definitions with
//! their resolvers, and runtime type resolution for abstract types.

mod builder;
mod scalar;

use std::sync::Arc;

use indexmap::IndexMap;
use wrapping::Wrapping;

pub use builder::{SchemaBuilder, SchemaError};
pub use scalar::{ScalarError, ScalarSerializeFn, ScalarType};

use crate::resolver::{ParentValue, Resolver};

pub type ResolveTypeFn = Arc<dyn Fn(&ParentValue) -> Option<Arc<str>> + Send + Sync>;

#[derive(Debug)]
pub struct Schema {
    types: IndexMap<Arc<str>, NamedType>,
    query_type: Arc<str>,
    mutation_type: Option<Arc<str>>,
    subscription_type: Option<Arc<str>>,
}

impl Schema {
    pub fn builder(query_type: impl Into<Arc<str>>) -> SchemaBuilder {
        SchemaBuilder::new(query_type.into())
    }

    pub fn named_type(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name)? {
            NamedType::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn query_type(&self) -> Option<&ObjectType> {
        self.object(&self.query_type)
    }

    pub fn mutation_type(&self) -> Option<&ObjectType> {
        self.mutation_type.as_deref().and_then(|name| self.object(name))
    }

    pub fn subscription_type(&self) -> Option<&ObjectType> {
        self.subscription_type.as_deref().and_then(|name| self.object(name))
    }

    /// Object types a value of the given type may have at runtime.
    pub fn possible_types<'a>(&'a self, name: &str) -> Vec<&'a ObjectType> {
        match self.types.get(name) {
            Some(NamedType::Object(object)) => vec![object],
            Some(NamedType::Interface(abstract_type) | NamedType::Union(abstract_type)) => abstract_type
                .possible_types
                .iter()
                .filter_map(|name| self.object(name))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether a fragment with the given type condition applies to objects of `object_type`.
    pub fn type_condition_applies(&self, type_condition: &str, object_type: &str) -> bool {
        if type_condition == object_type {
            return true;
        }
        match self.types.get(type_condition) {
            Some(NamedType::Interface(abstract_type) | NamedType::Union(abstract_type)) => {
                abstract_type.is_possible_type(object_type)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NamedType {
    Scalar(ScalarType),
    Enum(EnumType),
    Object(ObjectType),
    Interface(AbstractType),
    Union(AbstractType),
}

impl NamedType {
    pub fn name(&self) -> &str {
        match self {
            NamedType::Scalar(scalar) => &scalar.name,
            NamedType::Enum(enum_type) => &enum_type.name,
            NamedType::Object(object) => &object.name,
            NamedType::Interface(abstract_type) | NamedType::Union(abstract_type) => &abstract_type.name,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            NamedType::Object(_) | NamedType::Interface(_) | NamedType::Union(_)
        )
    }

    pub fn is_input(&self) -> bool {
        matches!(self, NamedType::Scalar(_) | NamedType::Enum(_))
    }
}

/// Reference to a named type with its list and non-null modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub name: Arc<str>,
    pub wrapping: Wrapping,
}

impl FieldType {
    pub fn new(name: impl Into<Arc<str>>, wrapping: Wrapping) -> Self {
        Self {
            name: name.into(),
            wrapping,
        }
    }

    /// Parses a type reference such as `[Int!]!`. Returns `None` if it isn't well-formed.
    pub fn parse(ty: &str) -> Option<Self> {
        wrapping::parse_type(ty).map(|(name, wrapping)| Self::new(name, wrapping))
    }

    pub fn is_required(&self) -> bool {
        self.wrapping.is_required()
    }

    pub fn is_list(&self) -> bool {
        self.wrapping.is_list()
    }

    /// Type of the items if this is a list type.
    pub fn item_type(&self) -> Option<FieldType> {
        self.wrapping.without_list().map(|wrapping| FieldType {
            name: self.name.clone(),
            wrapping,
        })
    }
}

impl From<&str> for FieldType {
    // Malformed references keep their text as type name and are reported as unknown types by the
    // schema builder.
    fn from(ty: &str) -> Self {
        FieldType::parse(ty).unwrap_or_else(|| FieldType::new(ty, Wrapping::nullable()))
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.wrapping.type_display(&self.name), f)
    }
}

#[derive(Debug, Clone)]
pub struct EnumType {
    pub(crate) name: Arc<str>,
    pub(crate) values: Vec<Arc<str>>,
}

impl EnumType {
    pub fn new<V: Into<Arc<str>>>(name: impl Into<Arc<str>>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.as_ref() == value)
    }
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub(crate) name: Arc<str>,
    pub(crate) fields: IndexMap<Arc<str>, Arc<FieldDefinition>>,
    pub(crate) interfaces: Vec<Arc<str>>,
}

impl ObjectType {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            interfaces: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), Arc::new(field));
        self
    }

    #[must_use]
    pub fn implements(mut self, interface: impl Into<Arc<str>>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    pub fn field_definition(&self, name: &str) -> Option<&Arc<FieldDefinition>> {
        self.fields.get(name)
    }
}

/// Interface or union.
#[derive(Clone)]
pub struct AbstractType {
    pub(crate) name: Arc<str>,
    pub(crate) possible_types: Vec<Arc<str>>,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
}

impl std::fmt::Debug for AbstractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbstractType")
            .field("name", &self.name)
            .field("possible_types", &self.possible_types)
            .finish_non_exhaustive()
    }
}

impl AbstractType {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            possible_types: Vec::new(),
            resolve_type: None,
        }
    }

    #[must_use]
    pub fn member(mut self, object: impl Into<Arc<str>>) -> Self {
        self.possible_types.push(object.into());
        self
    }

    #[must_use]
    pub fn resolve_type_with(
        mut self,
        resolve: impl Fn(&ParentValue) -> Option<Arc<str>> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(resolve));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_possible_type(&self, object: &str) -> bool {
        self.possible_types.iter().any(|name| name.as_ref() == object)
    }

    /// Concrete object type of `value`. Without a custom resolver, the `__typename` of JSON
    /// values or the type name attached to opaque objects is used.
    pub fn resolve_type(&self, value: &ParentValue) -> Option<Arc<str>> {
        let name = match &self.resolve_type {
            Some(resolve) => resolve(value),
            None => value.typename(),
        }?;
        self.is_possible_type(&name).then_some(name)
    }
}

#[derive(Clone)]
pub struct FieldDefinition {
    pub(crate) name: Arc<str>,
    pub(crate) ty: FieldType,
    pub(crate) arguments: Vec<InputValueDefinition>,
    pub(crate) resolver: Resolver,
    pub(crate) maybe_stream: bool,
}

impl std::fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("arguments", &self.arguments)
            .field("resolver", &self.resolver)
            .field("maybe_stream", &self.maybe_stream)
            .finish()
    }
}

impl FieldDefinition {
    /// Field resolved by the default resolver, reading `name` from a JSON parent.
    pub fn new(name: impl Into<Arc<str>>, ty: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            arguments: Vec::new(),
            resolver: Resolver::Default,
            maybe_stream: false,
        }
    }

    pub(crate) fn typename() -> Self {
        Self {
            name: "__typename".into(),
            ty: FieldType::new("String", Wrapping::required()),
            arguments: Vec::new(),
            resolver: Resolver::Typename,
            maybe_stream: false,
        }
    }

    #[must_use]
    pub fn resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn argument(mut self, argument: InputValueDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    /// The resolver may return an asynchronous stream for this list field.
    #[must_use]
    pub fn maybe_stream(mut self) -> Self {
        self.maybe_stream = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn is_maybe_stream(&self) -> bool {
        self.maybe_stream
    }
}

#[derive(Debug, Clone)]
pub struct InputValueDefinition {
    pub(crate) name: Arc<str>,
    pub(crate) ty: FieldType,
    pub(crate) default_value: Option<serde_json::Value>,
}

impl InputValueDefinition {
    pub fn new(name: impl Into<Arc<str>>, ty: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            default_value: None,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
