use std::sync::Arc;

use engine::{
    operation::{field, fragment, SelectionNode},
    resolver::{ObjectValue, ParentValue, ResolvedValue, Resolver},
    schema::{AbstractType, FieldDefinition, ObjectType, Schema},
};
use integration_tests::{query, runtime, TestRequest};
use serde_json::json;

struct Post {
    title: &'static str,
}

fn schema() -> Arc<Schema> {
    let schema = Schema::builder("Query")
        .object(
            ObjectType::new("Query")
                .field(FieldDefinition::new("nodes", "[Node]"))
                .field(FieldDefinition::new("search", "[SearchResult!]!").resolver(Resolver::pure(|_| {
                    Ok(ResolvedValue::list([
                        ObjectValue::json("User", json!({"id": "1", "name": "Ada"})),
                        ObjectValue::new(Post { title: "Notes" }).with_typename("Post"),
                    ]))
                }))),
        )
        .interface(AbstractType::new("Node"))
        .union(AbstractType::new("SearchResult").member("User").member("Post"))
        .object(
            ObjectType::new("User")
                .implements("Node")
                .field(FieldDefinition::new("id", "ID!"))
                .field(FieldDefinition::new("name", "String")),
        )
        .object(
            ObjectType::new("Post")
                .implements("Node")
                .field(FieldDefinition::new("id", "ID!"))
                .field(
                    FieldDefinition::new("title", "String").resolver(Resolver::pure(|ctx| {
                        let title = ctx.parent_object::<Post>().map(|post| post.title);
                        Ok(ResolvedValue::Value(json!(title)))
                    })),
                ),
        )
        .build()
        .unwrap();
    Arc::new(schema)
}

#[test]
fn interfaces_are_resolved_from_the_typename() {
    let schema = schema();

    let response = runtime().block_on(async move {
        let operation = query(
            &schema,
            [field("nodes").selections([
                SelectionNode::from(field("__typename")),
                fragment().on("User").selections([field("name")]).into(),
                fragment().on("Post").selections([field("id").alias("postId")]).into(),
            ])],
        );
        TestRequest::new(&schema, operation)
            .root_value(json!({
                "nodes": [
                    {"__typename": "User", "id": "1", "name": "Ada"},
                    {"__typename": "Post", "id": "2"},
                    {"__typename": "Comment", "id": "3"},
                    null
                ]
            }))
            .execute()
            .await
            .response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "nodes": [
          {
            "__typename": "User",
            "name": "Ada"
          },
          {
            "__typename": "Post",
            "postId": "2"
          },
          null,
          null
        ]
      },
      "errors": [
        {
          "message": "Could not determine the object type of the value returned for nodes, of abstract type Node",
          "path": [
            "nodes",
            2
          ],
          "extensions": {
            "code": "UNKNOWN_RUNTIME_TYPE"
          }
        }
      ]
    }
    "#);
}

#[test]
fn unions_of_opaque_objects() {
    let schema = schema();

    let response = runtime().block_on(async move {
        let operation = query(
            &schema,
            [field("search").selections([
                SelectionNode::from(field("__typename")),
                fragment().on("User").selections([field("name")]).into(),
                fragment().on("Post").selections([field("title")]).into(),
            ])],
        );
        TestRequest::new(&schema, operation).execute().await.response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "search": [
          {
            "__typename": "User",
            "name": "Ada"
          },
          {
            "__typename": "Post",
            "title": "Notes"
          }
        ]
      }
    }
    "#);
}

#[test]
fn custom_type_resolution() {
    let schema = Schema::builder("Query")
        .object(ObjectType::new("Query").field(FieldDefinition::new("pet", "Pet")))
        .union(
            AbstractType::new("Pet")
                .member("Cat")
                .member("Dog")
                .resolve_type_with(|value: &ParentValue| {
                    let barks = value.as_json()?.get("barks")?.as_bool()?;
                    Some(if barks { "Dog" } else { "Cat" }.into())
                }),
        )
        .object(ObjectType::new("Cat").field(FieldDefinition::new("name", "String")))
        .object(ObjectType::new("Dog").field(FieldDefinition::new("name", "String")))
        .build()
        .unwrap();
    let schema = Arc::new(schema);

    let response = runtime().block_on(async move {
        let operation = query(
            &schema,
            [field("pet").selections([field("__typename"), field("name")])],
        );
        TestRequest::new(&schema, operation)
            .root_value(json!({"pet": {"name": "Rex", "barks": true}}))
            .execute()
            .await
            .response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "pet": {
          "__typename": "Dog",
          "name": "Rex"
        }
      }
    }
    "#);
}
