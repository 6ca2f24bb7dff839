use std::sync::Arc;

use indexmap::IndexMap;

use super::{
    node::{FieldNode, SelectionNode},
    ArgumentMap, Condition, DeferredFragmentDefinition, FieldCondition, IncludeCondition, OperationError,
    OperationType, Selection, SelectionSet, SelectionStrategy, StreamDirective,
};
use crate::schema::{FieldDefinition, ObjectType, Schema};

/// Occurrences of one response key within a selection set.
struct FieldGroup<'n> {
    nodes: Vec<&'n FieldNode>,
    deferred_if: Option<&'n Condition>,
    has_eager_occurrence: bool,
}

/// Builds the per-concrete-type selection sets of an operation, merging fields sharing a
/// response key and splitting `@defer` fragments out.
pub(super) struct FieldCollector<'a> {
    schema: &'a Schema,
    operation_type: OperationType,
    typename: Arc<FieldDefinition>,
}

impl<'a> FieldCollector<'a> {
    pub fn new(schema: &'a Schema, operation_type: OperationType) -> Self {
        Self {
            schema,
            operation_type,
            typename: Arc::new(FieldDefinition::typename()),
        }
    }

    pub fn build_selection_set(
        &self,
        object: &ObjectType,
        nodes: &[&SelectionNode],
        is_root: bool,
    ) -> Result<SelectionSet, OperationError> {
        let mut groups = IndexMap::<Arc<str>, FieldGroup<'_>>::new();
        let mut deferred = Vec::new();
        self.collect(object, nodes, None, &mut groups, &mut deferred)?;

        let mut selections = Vec::with_capacity(groups.len());
        for (response_key, group) in groups {
            selections.push(Arc::new(self.build_selection(object, response_key, group, is_root)?));
        }

        Ok(SelectionSet {
            type_name: object.name_arc().clone(),
            selections,
            deferred,
        })
    }

    fn collect<'n>(
        &self,
        object: &ObjectType,
        nodes: &[&'n SelectionNode],
        deferred_if: Option<&'n Condition>,
        groups: &mut IndexMap<Arc<str>, FieldGroup<'n>>,
        deferred: &mut Vec<Arc<DeferredFragmentDefinition>>,
    ) -> Result<(), OperationError> {
        for &node in nodes {
            match node {
                SelectionNode::Field(field) => {
                    let group = groups.entry(field.response_key().clone()).or_insert_with(|| FieldGroup {
                        nodes: Vec::new(),
                        deferred_if,
                        has_eager_occurrence: false,
                    });
                    group.nodes.push(field);
                    group.has_eager_occurrence |= deferred_if.is_none();
                }
                SelectionNode::InlineFragment(fragment) => {
                    if let Some(type_condition) = &fragment.type_condition {
                        if self.schema.named_type(type_condition).is_none() {
                            return Err(OperationError::UnknownType(type_condition.clone()));
                        }
                        if !self.schema.type_condition_applies(type_condition, object.name()) {
                            continue;
                        }
                    }
                    let children = fragment.selections.iter().collect::<Vec<_>>();
                    match (&fragment.defer, deferred_if) {
                        (Some(defer), None) => {
                            let selection_set = self.build_selection_set(object, &children, false)?;
                            tracing::trace!(object = object.name(), label = ?defer.label, "collected deferred fragment");
                            deferred.push(Arc::new(DeferredFragmentDefinition {
                                label: defer.label.clone(),
                                condition: defer.condition.clone(),
                                selection_set: Arc::new(selection_set),
                            }));
                            // Executed with the parent whenever the defer is disabled at runtime.
                            self.collect(object, &children, Some(&defer.condition), groups, deferred)?;
                        }
                        // Nested defers of a disabled defer run inline with it.
                        _ => self.collect(object, &children, deferred_if, groups, deferred)?,
                    }
                }
            }
        }
        Ok(())
    }

    fn build_selection(
        &self,
        object: &ObjectType,
        response_key: Arc<str>,
        group: FieldGroup<'_>,
        is_root: bool,
    ) -> Result<Selection, OperationError> {
        let Some(&first) = group.nodes.first() else {
            return Err(OperationError::UnknownField {
                ty: object.name_arc().clone(),
                field: response_key,
            });
        };

        let definition = if first.name.as_ref() == "__typename" {
            self.typename.clone()
        } else {
            object
                .field_definition(&first.name)
                .cloned()
                .ok_or_else(|| OperationError::UnknownField {
                    ty: object.name_arc().clone(),
                    field: first.name.clone(),
                })?
        };

        let arguments = ArgumentMap::new(self.schema, &first.name, &definition.arguments, &first.arguments)?;

        // A field is included if any of its occurrences is.
        let include = if group.nodes.iter().any(|node| node.skip.is_none() && node.include.is_none()) {
            IncludeCondition::default()
        } else {
            IncludeCondition(
                group
                    .nodes
                    .iter()
                    .map(|node| FieldCondition {
                        skip: node.skip.clone(),
                        include: node.include.clone(),
                    })
                    .collect(),
            )
        };

        let stream = group
            .nodes
            .iter()
            .find_map(|node| node.stream.as_ref())
            .map(|stream| StreamDirective {
                label: stream.label.clone(),
                initial_count: stream.initial_count,
                condition: stream.condition.clone(),
            });

        let strategy = if is_root && self.operation_type == OperationType::Mutation {
            SelectionStrategy::Serial
        } else if definition.resolver.is_pure() && stream.is_none() && !definition.maybe_stream {
            SelectionStrategy::Pure
        } else {
            SelectionStrategy::Parallel
        };

        let mut children = IndexMap::new();
        if self
            .schema
            .named_type(&definition.ty.name)
            .is_some_and(|ty| ty.is_composite())
        {
            let nodes = group
                .nodes
                .iter()
                .flat_map(|node| node.selections.iter())
                .collect::<Vec<_>>();
            for possible_type in self.schema.possible_types(&definition.ty.name) {
                let selection_set = self.build_selection_set(possible_type, &nodes, false)?;
                children.insert(possible_type.name_arc().clone(), Arc::new(selection_set));
            }
        }

        Ok(Selection {
            response_key,
            parent_type: object.name_arc().clone(),
            arguments,
            include,
            deferred_if: if group.has_eager_occurrence {
                None
            } else {
                group.deferred_if.cloned()
            },
            stream,
            strategy,
            location: first.location,
            children,
            definition,
        })
    }
}
