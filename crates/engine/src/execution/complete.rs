//! Value completion: turns raw resolver values into result tree nodes according to the declared
//! type, growing the tree with new tasks for nested selection sets.

use std::sync::Arc;

use error::{ErrorCode, GraphqlError};
use serde_json::Value;

use super::Execution;
use crate::{
    operation::Selection,
    resolver::{ParentValue, ResolvedValue, ScopedContext},
    response::{ResponsePath, ResultSlot, ResultValue},
    schema::{AbstractType, EnumType, FieldType, NamedType, ScalarType},
};

pub(super) enum Completed {
    Value(ResultValue),
    Null,
    Failed(GraphqlError),
}

impl Execution {
    pub(super) fn complete_value(
        &mut self,
        selection: &Arc<Selection>,
        path: &ResponsePath,
        ty: &FieldType,
        slot: ResultSlot,
        value: ResolvedValue,
        scoped: &ScopedContext,
    ) -> Completed {
        let value = match value {
            ResolvedValue::Scoped(inner, entries) => {
                let scoped = scoped.extend(entries);
                return self.complete_value(selection, path, ty, slot, *inner, &scoped);
            }
            ResolvedValue::Error(error) => return Completed::Failed(error),
            value if value.is_null() => return Completed::Null,
            value => value,
        };

        if let Some(item_type) = ty.item_type() {
            return self.complete_list(selection, path, &item_type, slot, value, scoped);
        }

        let ctx = self.ctx.clone();
        match ctx.schema.named_type(&ty.name) {
            Some(NamedType::Scalar(scalar)) => complete_scalar(selection, scalar, value),
            Some(NamedType::Enum(enum_type)) => complete_enum(selection, enum_type, value),
            Some(NamedType::Object(object)) => {
                self.complete_object(selection, path, object.name_arc().clone(), slot, value, scoped)
            }
            Some(NamedType::Interface(abstract_type) | NamedType::Union(abstract_type)) => {
                self.complete_abstract(selection, path, abstract_type, slot, value, scoped)
            }
            None => {
                tracing::error!(ty = %ty, "field type missing from the schema");
                Completed::Failed(GraphqlError::internal_server_error())
            }
        }
    }

    fn complete_list(
        &mut self,
        selection: &Arc<Selection>,
        path: &ResponsePath,
        item_type: &FieldType,
        slot: ResultSlot,
        value: ResolvedValue,
        scoped: &ScopedContext,
    ) -> Completed {
        let items = match value {
            ResolvedValue::List(items) => items,
            ResolvedValue::Value(Value::Array(items)) => items.into_iter().map(ResolvedValue::Value).collect(),
            value => return Completed::Failed(invalid_value(selection, "list", &value)),
        };

        let list = self.tree.new_list(Some(slot), items.len(), !item_type.is_required());
        for (index, item) in items.into_iter().enumerate() {
            let item_slot = ResultSlot::Item {
                list,
                index: index as u32,
            };
            let item_path = path.child_index(index);
            let completed = self.complete_value(selection, &item_path, item_type, item_slot, item, scoped);
            self.write_completed(selection, &item_path, item_type, item_slot, completed);
        }
        Completed::Value(ResultValue::List(list))
    }

    fn complete_abstract(
        &mut self,
        selection: &Arc<Selection>,
        path: &ResponsePath,
        abstract_type: &AbstractType,
        slot: ResultSlot,
        value: ResolvedValue,
        scoped: &ScopedContext,
    ) -> Completed {
        let parent = match into_parent_value(selection, value) {
            Ok(parent) => parent,
            Err(error) => return Completed::Failed(error),
        };
        let Some(object_type) = abstract_type.resolve_type(&parent) else {
            return Completed::Failed(GraphqlError::new(
                format!(
                    "Could not determine the object type of the value returned for {}, of abstract type {}",
                    selection.response_key(),
                    abstract_type.name()
                ),
                ErrorCode::UnknownRuntimeType,
            ));
        };
        self.complete_selection_set(selection, path, &object_type, slot, parent, scoped)
    }

    fn complete_object(
        &mut self,
        selection: &Arc<Selection>,
        path: &ResponsePath,
        object_type: Arc<str>,
        slot: ResultSlot,
        value: ResolvedValue,
        scoped: &ScopedContext,
    ) -> Completed {
        match into_parent_value(selection, value) {
            Ok(parent) => self.complete_selection_set(selection, path, &object_type, slot, parent, scoped),
            Err(error) => Completed::Failed(error),
        }
    }

    fn complete_selection_set(
        &mut self,
        selection: &Arc<Selection>,
        path: &ResponsePath,
        object_type: &str,
        slot: ResultSlot,
        parent: ParentValue,
        scoped: &ScopedContext,
    ) -> Completed {
        let Some(selection_set) = selection.selection_set_for(object_type).cloned() else {
            return Completed::Failed(GraphqlError::new(
                format!("Unknown object type {object_type}"),
                ErrorCode::UnknownRuntimeType,
            ));
        };
        // The map knows its parent slot right away: a violation below it can be propagated
        // while its siblings are still pending.
        let map = self.enqueue_resolver_tasks(&selection_set, parent, path, scoped, Some(slot));
        Completed::Value(ResultValue::Map(map))
    }

    /// Writes a completed value into its slot, reporting errors and non-null violations. A
    /// violation is recorded once, where `null` meets a non-null type.
    pub(super) fn write_completed(
        &mut self,
        selection: &Arc<Selection>,
        path: &ResponsePath,
        ty: &FieldType,
        slot: ResultSlot,
        completed: Completed,
    ) {
        match completed {
            Completed::Value(value) => self.tree.set(slot, value),
            Completed::Null => {
                self.tree.set(slot, ResultValue::Null);
                if ty.is_required() {
                    self.errors.push(
                        GraphqlError::non_null_violation(selection.parent_type(), selection.field_name())
                            .with_path_if_missing(|| path.to_error_path())
                            .with_locations(selection.location()),
                    );
                    self.violations.record(selection.clone(), path.clone(), slot);
                }
            }
            Completed::Failed(error) => {
                tracing::debug!(%path, code = %error.code, "field error: {}", error.message);
                let error = error.with_path_if_missing(|| path.to_error_path());
                let error = if error.locations.is_empty() {
                    error.with_locations(selection.location())
                } else {
                    error
                };
                self.errors.push(error);
                self.tree.set(slot, ResultValue::Null);
                if ty.is_required() {
                    self.violations.record(selection.clone(), path.clone(), slot);
                }
            }
        }
    }
}

fn complete_scalar(selection: &Selection, scalar: &ScalarType, value: ResolvedValue) -> Completed {
    let value = match value {
        ResolvedValue::Value(value) => value,
        ResolvedValue::Object(object) => match object.as_json() {
            Some(value) => value.clone(),
            None => return Completed::Failed(invalid_value(selection, scalar.name(), &ResolvedValue::Object(object))),
        },
        value => return Completed::Failed(invalid_value(selection, scalar.name(), &value)),
    };
    match scalar.serialize(&value) {
        Ok(value) => Completed::Value(ResultValue::Leaf(value)),
        Err(err) => Completed::Failed(GraphqlError::new(err.to_string(), ErrorCode::ScalarSerializationError)),
    }
}

fn complete_enum(selection: &Selection, enum_type: &EnumType, value: ResolvedValue) -> Completed {
    match value {
        ResolvedValue::Value(Value::String(name)) if enum_type.contains(&name) => {
            Completed::Value(ResultValue::Leaf(Value::String(name)))
        }
        ResolvedValue::Value(value) => Completed::Failed(GraphqlError::new(
            format!("Enum {} cannot represent value: {value}", enum_type.name()),
            ErrorCode::ScalarSerializationError,
        )),
        value => Completed::Failed(invalid_value(selection, enum_type.name(), &value)),
    }
}

fn into_parent_value(selection: &Selection, value: ResolvedValue) -> Result<ParentValue, GraphqlError> {
    match value {
        ResolvedValue::Value(value @ Value::Object(_)) => Ok(ParentValue::Json(Arc::new(value))),
        ResolvedValue::Object(object) => Ok(ParentValue::Object(object)),
        value => Err(invalid_value(selection, "object", &value)),
    }
}

fn invalid_value(selection: &Selection, expected: &str, value: &ResolvedValue) -> GraphqlError {
    GraphqlError::new(
        format!(
            "Expected a value of type {expected} for field {}.{}, got {}",
            selection.parent_type(),
            selection.field_name(),
            value.kind()
        ),
        ErrorCode::InvalidResolverValue,
    )
}
