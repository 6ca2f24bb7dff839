//! Selections as written in the operation document, before field collection.

use std::sync::Arc;

use error::Location;
use serde_json::Value;

use super::{ArgumentValue, Condition};

#[derive(Debug, Clone)]
pub enum SelectionNode {
    Field(FieldNode),
    InlineFragment(InlineFragmentNode),
}

#[derive(Debug, Clone)]
pub struct FieldNode {
    pub(crate) name: Arc<str>,
    pub(crate) alias: Option<Arc<str>>,
    pub(crate) arguments: Vec<(Arc<str>, ArgumentValue)>,
    pub(crate) skip: Option<Condition>,
    pub(crate) include: Option<Condition>,
    pub(crate) stream: Option<StreamNode>,
    pub(crate) location: Option<Location>,
    pub(crate) selections: Vec<SelectionNode>,
}

#[derive(Debug, Clone)]
pub struct InlineFragmentNode {
    pub(crate) type_condition: Option<Arc<str>>,
    pub(crate) defer: Option<DeferNode>,
    pub(crate) selections: Vec<SelectionNode>,
}

#[derive(Debug, Clone)]
pub struct DeferNode {
    pub(crate) label: Option<Arc<str>>,
    pub(crate) condition: Condition,
}

#[derive(Debug, Clone)]
pub struct StreamNode {
    pub(crate) label: Option<Arc<str>>,
    pub(crate) initial_count: usize,
    pub(crate) condition: Condition,
}

/// `name`, the start of every field selection.
pub fn field(name: impl Into<Arc<str>>) -> FieldNode {
    FieldNode {
        name: name.into(),
        alias: None,
        arguments: Vec::new(),
        skip: None,
        include: None,
        stream: None,
        location: None,
        selections: Vec::new(),
    }
}

/// `... { }`, an inline fragment without type condition.
pub fn fragment() -> InlineFragmentNode {
    InlineFragmentNode {
        type_condition: None,
        defer: None,
        selections: Vec::new(),
    }
}

impl FieldNode {
    #[must_use]
    pub fn alias(mut self, alias: impl Into<Arc<str>>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn argument(mut self, name: impl Into<Arc<str>>, value: impl Into<ArgumentValue>) -> Self {
        self.arguments.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn skip_if(mut self, condition: impl Into<Condition>) -> Self {
        self.skip = Some(condition.into());
        self
    }

    #[must_use]
    pub fn include_if(mut self, condition: impl Into<Condition>) -> Self {
        self.include = Some(condition.into());
        self
    }

    /// `@stream(initialCount: n)`
    #[must_use]
    pub fn stream(self, initial_count: usize) -> Self {
        self.stream_with(None::<Arc<str>>, initial_count, true)
    }

    #[must_use]
    pub fn stream_with(
        mut self,
        label: Option<impl Into<Arc<str>>>,
        initial_count: usize,
        condition: impl Into<Condition>,
    ) -> Self {
        self.stream = Some(StreamNode {
            label: label.map(Into::into),
            initial_count,
            condition: condition.into(),
        });
        self
    }

    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.location = Some(Location::new(line, column));
        self
    }

    #[must_use]
    pub fn selections(mut self, selections: impl IntoIterator<Item = impl Into<SelectionNode>>) -> Self {
        self.selections.extend(selections.into_iter().map(Into::into));
        self
    }

    pub fn response_key(&self) -> &Arc<str> {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

impl InlineFragmentNode {
    #[must_use]
    pub fn on(mut self, type_condition: impl Into<Arc<str>>) -> Self {
        self.type_condition = Some(type_condition.into());
        self
    }

    /// `@defer`
    #[must_use]
    pub fn defer(self) -> Self {
        self.defer_with(None::<Arc<str>>, true)
    }

    #[must_use]
    pub fn defer_with(mut self, label: Option<impl Into<Arc<str>>>, condition: impl Into<Condition>) -> Self {
        self.defer = Some(DeferNode {
            label: label.map(Into::into),
            condition: condition.into(),
        });
        self
    }

    #[must_use]
    pub fn selections(mut self, selections: impl IntoIterator<Item = impl Into<SelectionNode>>) -> Self {
        self.selections.extend(selections.into_iter().map(Into::into));
        self
    }
}

impl From<FieldNode> for SelectionNode {
    fn from(field: FieldNode) -> Self {
        SelectionNode::Field(field)
    }
}

impl From<InlineFragmentNode> for SelectionNode {
    fn from(fragment: InlineFragmentNode) -> Self {
        SelectionNode::InlineFragment(fragment)
    }
}

impl From<Value> for ArgumentValue {
    fn from(value: Value) -> Self {
        ArgumentValue::Literal(value)
    }
}
