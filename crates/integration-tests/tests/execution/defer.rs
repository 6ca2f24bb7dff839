use std::{sync::Arc, time::Duration};

use engine::{
    operation::{field, fragment, Condition, SelectionNode},
    schema::{FieldDefinition, ObjectType, Schema},
    IncrementalData,
};
use integration_tests::{collect_payloads, delayed, query, runtime, TestRequest};
use pretty_assertions::assert_eq;
use serde_json::json;

fn schema() -> Arc<Schema> {
    let schema = Schema::builder("Query")
        .object(
            ObjectType::new("Query")
                .field(FieldDefinition::new("user", "User"))
                .field(FieldDefinition::new("version", "Int")),
        )
        .object(
            ObjectType::new("User")
                .field(FieldDefinition::new("id", "ID!"))
                .field(FieldDefinition::new("name", "String"))
                .field(
                    FieldDefinition::new("friendCount", "Int!")
                        .resolver(delayed(Duration::from_millis(5), json!(42))),
                ),
        )
        .build()
        .unwrap();
    Arc::new(schema)
}

fn root() -> serde_json::Value {
    json!({"user": {"id": "1", "name": "Ada"}, "version": 3})
}

#[test]
fn deferred_fragment_is_delivered_after_the_primary_response() {
    let schema = schema();

    let (response, payloads) = runtime().block_on(async move {
        let operation = query(
            &schema,
            [field("user").selections([
                SelectionNode::from(field("id")),
                fragment()
                    .defer()
                    .selections([field("name"), field("friendCount")])
                    .into(),
            ])],
        );
        let output = TestRequest::new(&schema, operation).root_value(root()).execute().await;
        assert_eq!(output.deferred.pending_fragments(), 1);
        (output.response, collect_payloads(output.deferred).await)
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "user": {
          "id": "1"
        }
      }
    }
    "#);
    insta::assert_json_snapshot!(payloads, @r#"
    [
      {
        "data": {
          "name": "Ada",
          "friendCount": 42
        },
        "path": [
          "user"
        ],
        "hasNext": false
      }
    ]
    "#);
}

#[test]
fn labels_and_nested_defers() {
    let schema = schema();

    let payloads = runtime().block_on(async move {
        let operation = query(
            &schema,
            [
                SelectionNode::from(field("version")),
                fragment()
                    .defer_with(Some("outer"), true)
                    .selections([
                        SelectionNode::from(field("user").selections([
                            SelectionNode::from(field("id")),
                            fragment()
                                .defer_with(Some("inner"), true)
                                .selections([field("name")])
                                .into(),
                        ])),
                    ])
                    .into(),
            ],
        );
        let output = TestRequest::new(&schema, operation).root_value(root()).execute().await;
        assert_eq!(output.response.data, Some(json!({"version": 3})));
        collect_payloads(output.deferred).await
    });

    let summary = payloads
        .iter()
        .map(|payload| {
            (
                payload.label.as_deref().map(str::to_string),
                payload.path.to_string(),
                payload.data().cloned(),
                payload.has_next,
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        [
            (
                Some("outer".to_string()),
                String::new(),
                Some(json!({"user": {"id": "1"}})),
                true
            ),
            (
                Some("inner".to_string()),
                "user".to_string(),
                Some(json!({"name": "Ada"})),
                false
            ),
        ]
    );
}

#[test]
fn disabled_defer_runs_inline() {
    let schema = schema();

    let output = runtime().block_on(async move {
        let operation = query(
            &schema,
            [field("user").selections([
                SelectionNode::from(field("id")),
                fragment()
                    .defer_with(Some("slow"), Condition::variable("shouldDefer"))
                    .selections([field("name")])
                    .into(),
            ])],
        );
        TestRequest::new(&schema, operation)
            .root_value(root())
            .variables(json!({"shouldDefer": false}))
            .execute()
            .await
    });

    insta::assert_json_snapshot!(output.response, @r#"
    {
      "data": {
        "user": {
          "id": "1",
          "name": "Ada"
        }
      }
    }
    "#);
    assert!(output.deferred.is_empty());
}

#[test]
fn errors_of_deferred_fragments_stay_in_their_payload() {
    let schema = schema();

    let (response, payloads) = runtime().block_on(async move {
        let operation = query(
            &schema,
            [field("user").selections([
                SelectionNode::from(field("name")),
                fragment().defer().selections([field("id")]).into(),
            ])],
        );
        let output = TestRequest::new(&schema, operation)
            .root_value(json!({"user": {"name": "Ada"}}))
            .execute()
            .await;
        (output.response, collect_payloads(output.deferred).await)
    });

    assert!(response.errors.is_empty());
    assert_eq!(response.data, Some(json!({"user": {"name": "Ada"}})));

    let [payload] = payloads.as_slice() else {
        unreachable!("expected a single payload, got {payloads:?}");
    };
    // The violation reaches the root of the fragment.
    assert_eq!(payload.data, IncrementalData::Data(None));
    insta::assert_json_snapshot!(payload.errors, @r#"
    [
      {
        "message": "Cannot return null for non-nullable field User.id.",
        "path": [
          "user",
          "id"
        ],
        "extensions": {
          "code": "NON_NULL_VIOLATION"
        }
      }
    ]
    "#);
}

#[test]
fn fragments_below_a_nulled_object_are_dropped() {
    let schema = schema();

    let (response, pending_fragments, payloads) = runtime().block_on(async move {
        let operation = query(
            &schema,
            [
                SelectionNode::from(field("user").selections([
                    SelectionNode::from(field("id")),
                    fragment().defer().selections([field("name")]).into(),
                ])),
                field("version").into(),
            ],
        );
        let output = TestRequest::new(&schema, operation)
            .root_value(json!({"user": {"name": "Ada"}, "version": 3}))
            .execute()
            .await;
        let pending_fragments = output.deferred.pending_fragments();
        (output.response, pending_fragments, collect_payloads(output.deferred).await)
    });

    assert_eq!(response.data, Some(json!({"user": null, "version": 3})));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(pending_fragments, 0);
    assert!(payloads.is_empty());
}
