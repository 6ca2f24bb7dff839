use std::sync::Arc;

use error::Location;
use indexmap::IndexMap;

use super::{ArgumentMap, Variables};
use crate::schema::{FieldDefinition, FieldType};

/// How the scheduler runs the task resolving a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
pub enum SelectionStrategy {
    /// Synchronous resolver, executed inline while enqueuing.
    Pure,
    /// Asynchronous resolver, awaited concurrently with its siblings.
    Parallel,
    /// Starts only once everything scheduled before it has completed.
    Serial,
}

/// Boolean directive argument, either literal or a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Literal(bool),
    Variable(Arc<str>),
}

impl Condition {
    pub fn variable(name: impl Into<Arc<str>>) -> Self {
        Condition::Variable(name.into())
    }

    /// Missing or non-boolean variables evaluate to `false`.
    pub fn evaluate(&self, variables: &Variables) -> bool {
        match self {
            Condition::Literal(value) => *value,
            Condition::Variable(name) => variables
                .get(name)
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
        }
    }
}

impl From<bool> for Condition {
    fn from(value: bool) -> Self {
        Condition::Literal(value)
    }
}

/// `@skip` and `@include` of one occurrence of a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FieldCondition {
    pub(crate) skip: Option<Condition>,
    pub(crate) include: Option<Condition>,
}

impl FieldCondition {
    fn is_included(&self, variables: &Variables) -> bool {
        let skipped = self.skip.as_ref().is_some_and(|c| c.evaluate(variables));
        let included = self.include.as_ref().map_or(true, |c| c.evaluate(variables));
        !skipped && included
    }
}

/// Conditions of every occurrence of a merged field, which is included if any occurrence is.
/// Empty when one occurrence has no condition at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncludeCondition(pub(crate) Vec<FieldCondition>);

impl IncludeCondition {
    pub fn is_included(&self, variables: &Variables) -> bool {
        self.0.is_empty() || self.0.iter().any(|occurrence| occurrence.is_included(variables))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamDirective {
    pub(crate) label: Option<Arc<str>>,
    pub(crate) initial_count: usize,
    pub(crate) condition: Condition,
}

impl StreamDirective {
    pub fn label(&self) -> Option<&Arc<str>> {
        self.label.as_ref()
    }

    pub fn initial_count(&self) -> usize {
        self.initial_count
    }
}

/// One field to resolve on one concrete object type.
#[derive(Debug)]
pub struct Selection {
    pub(crate) response_key: Arc<str>,
    pub(crate) definition: Arc<FieldDefinition>,
    pub(crate) parent_type: Arc<str>,
    pub(crate) arguments: ArgumentMap,
    pub(crate) include: IncludeCondition,
    /// Set when the selection comes from a `@defer` fragment: it only runs with its parent when
    /// the defer is disabled, otherwise it is delivered later with the fragment.
    pub(crate) deferred_if: Option<Condition>,
    pub(crate) stream: Option<StreamDirective>,
    pub(crate) strategy: SelectionStrategy,
    pub(crate) location: Option<Location>,
    /// Child selection sets, per concrete object type.
    pub(crate) children: IndexMap<Arc<str>, Arc<SelectionSet>>,
}

impl Selection {
    pub fn response_key(&self) -> &Arc<str> {
        &self.response_key
    }

    pub fn field_name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &Arc<FieldDefinition> {
        &self.definition
    }

    pub fn parent_type(&self) -> &Arc<str> {
        &self.parent_type
    }

    pub fn ty(&self) -> &FieldType {
        &self.definition.ty
    }

    pub fn arguments(&self) -> &ArgumentMap {
        &self.arguments
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub fn stream(&self) -> Option<&StreamDirective> {
        self.stream.as_ref()
    }

    pub fn is_list(&self) -> bool {
        self.definition.ty.is_list()
    }

    /// List field carrying a `@stream` directive.
    pub fn is_streamable(&self) -> bool {
        self.is_list() && self.stream.is_some()
    }

    /// The resolver may return an asynchronous stream.
    pub fn maybe_stream(&self) -> bool {
        self.definition.maybe_stream
    }

    /// `@stream` directive if streaming was requested for this request.
    pub fn active_stream(&self, variables: &Variables) -> Option<&StreamDirective> {
        self.stream
            .as_ref()
            .filter(|stream| self.is_list() && stream.condition.evaluate(variables))
    }

    pub fn is_included(&self, variables: &Variables) -> bool {
        self.include.is_included(variables)
            && !self
                .deferred_if
                .as_ref()
                .is_some_and(|condition| condition.evaluate(variables))
    }

    pub fn selection_set_for(&self, object_type: &str) -> Option<&Arc<SelectionSet>> {
        self.children.get(object_type)
    }
}

/// Fields to resolve on one concrete object type, in declaration order.
#[derive(Debug)]
pub struct SelectionSet {
    pub(crate) type_name: Arc<str>,
    pub(crate) selections: Vec<Arc<Selection>>,
    pub(crate) deferred: Vec<Arc<DeferredFragmentDefinition>>,
}

impl SelectionSet {
    pub(crate) fn empty(type_name: Arc<str>) -> Self {
        Self {
            type_name,
            selections: Vec::new(),
            deferred: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &Arc<str> {
        &self.type_name
    }

    pub fn selections(&self) -> &[Arc<Selection>] {
        &self.selections
    }

    pub fn deferred_fragments(&self) -> &[Arc<DeferredFragmentDefinition>] {
        &self.deferred
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}

/// `... @defer { }` fragment collected for a concrete type.
#[derive(Debug)]
pub struct DeferredFragmentDefinition {
    pub(crate) label: Option<Arc<str>>,
    pub(crate) condition: Condition,
    pub(crate) selection_set: Arc<SelectionSet>,
}

impl DeferredFragmentDefinition {
    pub fn label(&self) -> Option<&Arc<str>> {
        self.label.as_ref()
    }

    pub fn is_active(&self, variables: &Variables) -> bool {
        self.condition.evaluate(variables)
    }

    pub fn selection_set(&self) -> &Arc<SelectionSet> {
        &self.selection_set
    }
}
