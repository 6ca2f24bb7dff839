use std::{sync::Arc, time::Duration};

use engine::{
    operation::{field, ArgumentValue, Condition},
    resolver::{ResolvedValue, Resolver, ResolverError},
    schema::{FieldDefinition, InputValueDefinition, ObjectType, Schema},
    Engine, ExecutionConfig,
};
use integration_tests::{constant, delayed, query, runtime, CountingDiagnostics, TestRequest};
use serde_json::{json, Value};

fn scalars_schema(resolver: impl Fn(Value) -> Resolver) -> Arc<Schema> {
    let schema = Schema::builder("Query")
        .object(
            ObjectType::new("Query")
                .field(FieldDefinition::new("int", "Int").resolver(resolver(json!(1))))
                .field(FieldDefinition::new("string", "String").resolver(resolver(json!("two"))))
                .field(FieldDefinition::new("boolean", "Boolean!").resolver(resolver(json!(true))))
                .field(FieldDefinition::new("float", "Float").resolver(resolver(json!(1.5))))
                .field(FieldDefinition::new("id", "ID").resolver(resolver(json!(7)))),
        )
        .build()
        .unwrap();
    Arc::new(schema)
}

#[test]
fn pure_and_parallel_fields_produce_identical_responses() {
    let selections = || {
        [
            field("int"),
            field("string"),
            field("boolean"),
            field("float").alias("number"),
            field("id"),
        ]
    };

    let (pure, parallel) = runtime().block_on(async move {
        let schema = scalars_schema(constant);
        let pure = TestRequest::new(&schema, query(&schema, selections())).execute().await;

        let schema = scalars_schema(|value| delayed(Duration::from_millis(1), value));
        let parallel = TestRequest::new(&schema, query(&schema, selections())).execute().await;

        (pure.response, parallel.response)
    });

    assert_eq!(
        serde_json::to_string(&pure).unwrap(),
        serde_json::to_string(&parallel).unwrap()
    );
    insta::assert_json_snapshot!(pure, @r#"
    {
      "data": {
        "int": 1,
        "string": "two",
        "boolean": true,
        "number": 1.5,
        "id": "7"
      }
    }
    "#);
}

#[test]
fn response_keys_follow_selection_order_whatever_the_completion_order() {
    let schema = Schema::builder("Query")
        .object(
            ObjectType::new("Query")
                .field(FieldDefinition::new("slow", "Int").resolver(delayed(Duration::from_millis(60), json!(1))))
                .field(FieldDefinition::new("medium", "Int").resolver(delayed(Duration::from_millis(30), json!(2))))
                .field(FieldDefinition::new("pure", "Int").resolver(constant(json!(3))))
                .field(FieldDefinition::new("fast", "Int").resolver(delayed(Duration::from_millis(1), json!(4)))),
        )
        .build()
        .unwrap();
    let schema = Arc::new(schema);
    let diagnostics = CountingDiagnostics::default();

    let output = runtime().block_on({
        let diagnostics = diagnostics.clone();
        async move {
            let operation = query(&schema, [field("slow"), field("medium"), field("pure"), field("fast")]);
            TestRequest::new(&schema, operation)
                .engine(Engine::new(ExecutionConfig::default()).with_diagnostics(diagnostics))
                .execute()
                .await
        }
    });

    insta::assert_json_snapshot!(output.response, @r#"
    {
      "data": {
        "slow": 1,
        "medium": 2,
        "pure": 3,
        "fast": 4
      }
    }
    "#);
    // Pure fields run before any asynchronous sibling is started.
    assert_eq!(diagnostics.started(), ["pure", "slow", "medium", "fast"]);
}

#[test]
fn skip_and_include() {
    let schema = scalars_schema(constant);

    let response = runtime().block_on(async move {
        let operation = query(
            &schema,
            [
                field("int").skip_if(Condition::variable("skipInt")),
                field("string").include_if(false),
                field("boolean").include_if(Condition::variable("withBoolean")),
                field("id").skip_if(Condition::variable("missing")),
            ],
        );
        TestRequest::new(&schema, operation)
            .variables(json!({"skipInt": true, "withBoolean": true}))
            .execute()
            .await
            .response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "boolean": true,
        "id": "7"
      }
    }
    "#);
}

#[test]
fn merged_field_is_included_if_any_occurrence_is() {
    let schema = scalars_schema(constant);

    let response = runtime().block_on(async move {
        let operation = query(
            &schema,
            [
                field("int").skip_if(true),
                field("int").include_if(Condition::variable("withInt")),
                field("string").skip_if(true),
                field("string").include_if(false),
            ],
        );
        TestRequest::new(&schema, operation)
            .variables(json!({"withInt": true}))
            .execute()
            .await
            .response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "int": 1
      }
    }
    "#);
}

#[test]
fn arguments_are_coerced_from_literals_and_variables() {
    let greet = Resolver::pure(|ctx| {
        let name = ctx.argument::<String>("name")?;
        let punctuation = ctx.argument::<String>("punctuation")?;
        Ok(ResolvedValue::Value(json!(format!("Hello {name}{punctuation}"))))
    });
    let schema = Schema::builder("Query")
        .object(
            ObjectType::new("Query").field(
                FieldDefinition::new("greet", "String!")
                    .argument(InputValueDefinition::new("name", "String!"))
                    .argument(InputValueDefinition::new("punctuation", "String").default_value(json!("!")))
                    .resolver(greet),
            ),
        )
        .build()
        .unwrap();
    let schema = Arc::new(schema);

    let response = runtime().block_on(async move {
        let operation = query(
            &schema,
            [
                field("greet").alias("literal").argument("name", json!("Ada")),
                field("greet")
                    .alias("variable")
                    .argument("name", ArgumentValue::variable("name"))
                    .argument("punctuation", json!("?")),
            ],
        );
        TestRequest::new(&schema, operation)
            .variables(json!({"name": "Grace"}))
            .execute()
            .await
            .response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "literal": "Hello Ada!",
        "variable": "Hello Grace?"
      }
    }
    "#);
}

#[test]
fn scoped_context_flows_down_the_tree() {
    let read_scoped = |key: &'static str| {
        Resolver::pure(move |ctx| Ok(ResolvedValue::Value(ctx.scoped_value(key).cloned().unwrap_or(Value::Null))))
    };
    let schema = Schema::builder("Query")
        .object(
            ObjectType::new("Query")
                .field(FieldDefinition::new("tenant", "String").resolver(read_scoped("tenant")))
                .field(FieldDefinition::new("viewer", "Viewer").resolver(Resolver::from_async(|_| async {
                    Ok::<_, ResolverError>(
                        ResolvedValue::Value(json!({"name": "Ada"})).with_scoped_value("role", json!("admin")),
                    )
                }))),
        )
        .object(
            ObjectType::new("Viewer")
                .field(FieldDefinition::new("name", "String"))
                .field(FieldDefinition::new("role", "String").resolver(read_scoped("role")))
                .field(FieldDefinition::new("tenant", "String").resolver(read_scoped("tenant"))),
        )
        .build()
        .unwrap();
    let schema = Arc::new(schema);

    let response = runtime().block_on(async move {
        let operation = query(
            &schema,
            [
                field("tenant"),
                field("viewer").selections([field("name"), field("role"), field("tenant")]),
            ],
        );
        TestRequest::new(&schema, operation)
            .with_request(|request| request.scoped_value("tenant", json!("acme")))
            .execute()
            .await
            .response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "tenant": "acme",
        "viewer": {
          "name": "Ada",
          "role": "admin",
          "tenant": "acme"
        }
      }
    }
    "#);
}

#[test]
fn root_value_and_nested_lists() {
    let schema = Schema::builder("Query")
        .object(ObjectType::new("Query").field(FieldDefinition::new("users", "[User!]!")))
        .object(
            ObjectType::new("User")
                .field(FieldDefinition::new("name", "String!"))
                .field(FieldDefinition::new("tags", "[[String]]")),
        )
        .build()
        .unwrap();
    let schema = Arc::new(schema);

    let response = runtime().block_on(async move {
        let operation = query(
            &schema,
            [field("users").selections([field("name"), field("__typename"), field("tags")])],
        );
        TestRequest::new(&schema, operation)
            .root_value(json!({
                "users": [
                    {"name": "Ada", "tags": [["a", null], []]},
                    {"name": "Grace"}
                ]
            }))
            .execute()
            .await
            .response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "users": [
          {
            "name": "Ada",
            "__typename": "User",
            "tags": [
              [
                "a",
                null
              ],
              []
            ]
          },
          {
            "name": "Grace",
            "__typename": "User",
            "tags": null
          }
        ]
      }
    }
    "#);
}
