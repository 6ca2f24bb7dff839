use std::sync::Arc;

use engine::{
    operation::{field, Condition},
    resolver::{ResolvedValue, Resolver, ResolverError},
    schema::{FieldDefinition, ObjectType, Schema},
    ExecutionConfig,
};
use futures::stream;
use integration_tests::{collect_payloads, query, runtime, TestRequest};
use serde_json::json;

fn numbers() -> impl Iterator<Item = ResolvedValue> {
    (1..=5).map(|n| ResolvedValue::Value(json!(n)))
}

fn schema() -> Arc<Schema> {
    let schema = Schema::builder("Query")
        .object(
            ObjectType::new("Query")
                .field(
                    FieldDefinition::new("numbers", "[Int!]!")
                        .maybe_stream()
                        .resolver(Resolver::from_async(|_| async {
                            Ok::<_, ResolverError>(ResolvedValue::stream(stream::iter(numbers())))
                        })),
                )
                .field(
                    FieldDefinition::new("lazyNumbers", "[Int!]")
                        .resolver(Resolver::pure(|_| Ok(ResolvedValue::lazy(numbers().collect::<Vec<_>>())))),
                )
                .field(
                    FieldDefinition::new("users", "[User]")
                        .resolver(Resolver::pure(|_| {
                            Ok(ResolvedValue::list([
                                json!({"name": "Ada"}),
                                json!({"name": "Grace"}),
                                json!({"name": null}),
                            ]))
                        })),
                ),
        )
        .object(ObjectType::new("User").field(FieldDefinition::new("name", "String!")))
        .build()
        .unwrap();
    Arc::new(schema)
}

#[test]
fn stream_delivers_the_initial_count_eagerly() {
    let schema = schema();

    let (response, pending_streams, payloads) = runtime().block_on(async move {
        let operation = query(&schema, [field("numbers").stream(2)]);
        let output = TestRequest::new(&schema, operation).execute().await;
        let pending_streams = output.deferred.pending_streams();
        (output.response, pending_streams, collect_payloads(output.deferred).await)
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "numbers": [
          1,
          2
        ]
      }
    }
    "#);
    assert_eq!(pending_streams, 1);
    insta::assert_json_snapshot!(payloads, @r#"
    [
      {
        "items": [
          3
        ],
        "path": [
          "numbers",
          2
        ],
        "hasNext": true
      },
      {
        "items": [
          4
        ],
        "path": [
          "numbers",
          3
        ],
        "hasNext": true
      },
      {
        "items": [
          5
        ],
        "path": [
          "numbers",
          4
        ],
        "hasNext": false
      }
    ]
    "#);
}

#[test]
fn streams_are_drained_when_not_requested() {
    let schema = schema();

    let output = runtime().block_on(async move {
        let operation = query(
            &schema,
            [
                field("numbers"),
                field("numbers")
                    .alias("disabled")
                    .stream_with(Some("never"), 1, Condition::variable("enabled")),
            ],
        );
        TestRequest::new(&schema, operation)
            .variables(json!({"enabled": false}))
            .execute()
            .await
    });

    insta::assert_json_snapshot!(output.response, @r#"
    {
      "data": {
        "numbers": [
          1,
          2,
          3,
          4,
          5
        ],
        "disabled": [
          1,
          2,
          3,
          4,
          5
        ]
      }
    }
    "#);
    assert!(output.deferred.is_empty());
}

#[test]
fn lazy_lists_are_materialized() {
    for offload_lazy_lists in [true, false] {
        let schema = schema();
        let config = ExecutionConfig {
            offload_lazy_lists,
            ..Default::default()
        };

        let response = runtime().block_on(async move {
            let operation = query(
                &schema,
                [
                    field("lazyNumbers"),
                    field("lazyNumbers").alias("streamed").stream(3),
                ],
            );
            TestRequest::new(&schema, operation)
                .engine(engine::Engine::new(config))
                .execute()
                .await
                .response
        });

        insta::allow_duplicates! {
            insta::assert_json_snapshot!(response, @r#"
            {
              "data": {
                "lazyNumbers": [
                  1,
                  2,
                  3,
                  4,
                  5
                ],
                "streamed": [
                  1,
                  2,
                  3
                ]
              }
            }
            "#);
        }
    }
}

#[test]
fn streamed_objects_are_completed_with_their_selection_set() {
    let schema = schema();

    let (response, payloads) = runtime().block_on(async move {
        let operation = query(&schema, [field("users").stream_with(Some("users"), 1, true).selections([field("name")])]);
        let output = TestRequest::new(&schema, operation).execute().await;
        (output.response, collect_payloads(output.deferred).await)
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "users": [
          {
            "name": "Ada"
          }
        ]
      }
    }
    "#);
    insta::assert_json_snapshot!(payloads, @r#"
    [
      {
        "items": [
          {
            "name": "Grace"
          }
        ],
        "path": [
          "users",
          1
        ],
        "label": "users",
        "hasNext": true
      },
      {
        "items": [
          null
        ],
        "path": [
          "users",
          2
        ],
        "label": "users",
        "errors": [
          {
            "message": "Cannot return null for non-nullable field User.name.",
            "path": [
              "users",
              2,
              "name"
            ],
            "extensions": {
              "code": "NON_NULL_VIOLATION"
            }
          }
        ],
        "hasNext": false
      }
    ]
    "#);
}

#[test]
fn streams_below_a_nulled_object_are_dropped() {
    let schema = Schema::builder("Query")
        .object(ObjectType::new("Query").field(FieldDefinition::new("wrapper", "Wrapper")))
        .object(
            ObjectType::new("Wrapper")
                .field(FieldDefinition::new("bad", "Int!"))
                .field(
                    FieldDefinition::new("numbers", "[Int!]!")
                        .maybe_stream()
                        .resolver(Resolver::from_async(|_| async {
                            Ok::<_, ResolverError>(ResolvedValue::stream(stream::iter(numbers())))
                        })),
                ),
        )
        .build()
        .unwrap();
    let schema = Arc::new(schema);

    let (response, pending_streams, payloads) = runtime().block_on(async move {
        let operation = query(
            &schema,
            [field("wrapper").selections([field("bad"), field("numbers").stream(1)])],
        );
        let output = TestRequest::new(&schema, operation)
            .root_value(json!({"wrapper": {"bad": null}}))
            .execute()
            .await;
        let pending_streams = output.deferred.pending_streams();
        (output.response, pending_streams, collect_payloads(output.deferred).await)
    });

    assert_eq!(response.data, Some(json!({"wrapper": null})));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(pending_streams, 0);
    assert!(payloads.is_empty());
}
