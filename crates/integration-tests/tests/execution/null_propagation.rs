use std::sync::Arc;

use engine::{
    operation::field,
    schema::{FieldDefinition, ObjectType, Schema},
    Response,
};
use integration_tests::{query, runtime, TestRequest};
use serde_json::json;

/// `a: A`, `b: B`, `c: C!` with `c` resolving to `null`.
fn execute(a: &str, b: &str) -> Response {
    let schema = Schema::builder("Query")
        .object(
            ObjectType::new("Query")
                .field(FieldDefinition::new("a", a))
                .field(FieldDefinition::new("other", "Int")),
        )
        .object(
            ObjectType::new("A")
                .field(FieldDefinition::new("b", b))
                .field(FieldDefinition::new("sibling", "String")),
        )
        .object(ObjectType::new("B").field(FieldDefinition::new("c", "C!")))
        .object(ObjectType::new("C").field(FieldDefinition::new("id", "ID")))
        .build()
        .unwrap();
    let schema = Arc::new(schema);

    runtime().block_on(async move {
        let operation = query(
            &schema,
            [
                field("a").selections([
                    field("b").selections([field("c").at(4, 9).selections([field("id")])]),
                    field("sibling"),
                ]),
                field("other"),
            ],
        );
        TestRequest::new(&schema, operation)
            .root_value(json!({
                "a": {"b": {"c": null}, "sibling": "kept"},
                "other": 1
            }))
            .execute()
            .await
            .response
    })
}

#[test]
fn violation_stops_at_the_nearest_nullable_field() {
    let response = execute("A!", "B");

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "a": {
          "b": null,
          "sibling": "kept"
        },
        "other": 1
      },
      "errors": [
        {
          "message": "Cannot return null for non-nullable field B.c.",
          "locations": [
            {
              "line": 4,
              "column": 9
            }
          ],
          "path": [
            "a",
            "b",
            "c"
          ],
          "extensions": {
            "code": "NON_NULL_VIOLATION"
          }
        }
      ]
    }
    "#);
}

#[test]
fn violation_walks_up_non_null_parents() {
    let response = execute("A", "B!");

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "a": null,
        "other": 1
      },
      "errors": [
        {
          "message": "Cannot return null for non-nullable field B.c.",
          "locations": [
            {
              "line": 4,
              "column": 9
            }
          ],
          "path": [
            "a",
            "b",
            "c"
          ],
          "extensions": {
            "code": "NON_NULL_VIOLATION"
          }
        }
      ]
    }
    "#);
}

#[test]
fn violation_reaching_the_root_nulls_data() {
    let response = execute("A!", "B!");

    assert_eq!(response.data, None);
    assert_eq!(response.errors.len(), 1);
    insta::assert_json_snapshot!(response.to_json()["data"], @"null");
}

#[test]
fn violations_in_list_items() {
    let schema = Schema::builder("Query")
        .object(
            ObjectType::new("Query")
                .field(FieldDefinition::new("nullableItems", "[Int]!"))
                .field(FieldDefinition::new("requiredItems", "[Int!]"))
                .field(FieldDefinition::new("everythingRequired", "[Int!]!"))
                .field(FieldDefinition::new("after", "Int")),
        )
        .build()
        .unwrap();
    let schema = Arc::new(schema);

    let response = runtime().block_on(async move {
        let operation = query(
            &schema,
            [field("nullableItems"), field("requiredItems"), field("after")],
        );
        TestRequest::new(&schema, operation)
            .root_value(json!({
                "nullableItems": [1, null, 3],
                "requiredItems": [1, null, 3],
                "after": 2
            }))
            .execute()
            .await
            .response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "nullableItems": [
          1,
          null,
          3
        ],
        "requiredItems": null,
        "after": 2
      },
      "errors": [
        {
          "message": "Cannot return null for non-nullable field Query.requiredItems.",
          "path": [
            "requiredItems",
            1
          ],
          "extensions": {
            "code": "NON_NULL_VIOLATION"
          }
        }
      ]
    }
    "#);
}

#[test]
fn independent_violations_are_all_reported() {
    let schema = Schema::builder("Query")
        .object(ObjectType::new("Query").field(FieldDefinition::new("users", "[User]")))
        .object(ObjectType::new("User").field(FieldDefinition::new("name", "String!")))
        .build()
        .unwrap();
    let schema = Arc::new(schema);

    let response = runtime().block_on(async move {
        let operation = query(&schema, [field("users").selections([field("name")])]);
        TestRequest::new(&schema, operation)
            .root_value(json!({"users": [{"name": null}, {"name": "Ada"}, {}]}))
            .execute()
            .await
            .response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "users": [
          null,
          {
            "name": "Ada"
          },
          null
        ]
      },
      "errors": [
        {
          "message": "Cannot return null for non-nullable field User.name.",
          "path": [
            "users",
            0,
            "name"
          ],
          "extensions": {
            "code": "NON_NULL_VIOLATION"
          }
        },
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
      ]
    }
    "#);
}
