//! Operations ready for execution: immutable selection sets bound to the schema, built once and
//! shared by every request executing them.

mod arguments;
mod collect;
mod node;
mod selection;
mod variables;

use std::sync::Arc;

pub use arguments::{ArgumentMap, ArgumentValue, Arguments, CoercionError};
pub use node::{field, fragment, DeferNode, FieldNode, InlineFragmentNode, SelectionNode, StreamNode};
pub use selection::{
    Condition, DeferredFragmentDefinition, IncludeCondition, Selection, SelectionSet, SelectionStrategy,
    StreamDirective,
};
pub(crate) use selection::FieldCondition;
pub use variables::Variables;

use crate::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
    /// Root fields run once, the event stream itself is left to the transport.
    Subscription,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    #[error("Schema does not define a {0} root type")]
    MissingRootType(OperationType),
    #[error("Type '{ty}' has no field '{field}'")]
    UnknownField { ty: Arc<str>, field: Arc<str> },
    #[error("Unknown type '{0}'")]
    UnknownType(Arc<str>),
    #[error("Field '{field}' has no argument '{argument}'")]
    UnknownArgument { field: Arc<str>, argument: Arc<str> },
}

#[derive(Debug)]
pub struct Operation {
    ty: OperationType,
    root_type: Arc<str>,
    selection_set: Arc<SelectionSet>,
}

impl Operation {
    pub fn query(
        schema: &Schema,
        selections: impl IntoIterator<Item = impl Into<SelectionNode>>,
    ) -> Result<Self, OperationError> {
        Self::build(schema, OperationType::Query, selections)
    }

    pub fn mutation(
        schema: &Schema,
        selections: impl IntoIterator<Item = impl Into<SelectionNode>>,
    ) -> Result<Self, OperationError> {
        Self::build(schema, OperationType::Mutation, selections)
    }

    pub fn build(
        schema: &Schema,
        ty: OperationType,
        selections: impl IntoIterator<Item = impl Into<SelectionNode>>,
    ) -> Result<Self, OperationError> {
        let root = match ty {
            OperationType::Query => schema.query_type(),
            OperationType::Mutation => schema.mutation_type(),
            OperationType::Subscription => schema.subscription_type(),
        }
        .ok_or(OperationError::MissingRootType(ty))?;

        let nodes = selections.into_iter().map(Into::into).collect::<Vec<SelectionNode>>();
        let nodes = nodes.iter().collect::<Vec<_>>();
        let selection_set = collect::FieldCollector::new(schema, ty).build_selection_set(root, &nodes, true)?;

        Ok(Self {
            ty,
            root_type: root.name_arc().clone(),
            selection_set: Arc::new(selection_set),
        })
    }

    pub fn ty(&self) -> OperationType {
        self.ty
    }

    pub fn root_type(&self) -> &Arc<str> {
        &self.root_type
    }

    pub fn selection_set(&self) -> &Arc<SelectionSet> {
        &self.selection_set
    }
}
