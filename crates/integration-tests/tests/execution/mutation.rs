use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use engine::{
    operation::field,
    resolver::{ResolvedValue, Resolver, ResolverError},
    schema::{FieldDefinition, InputValueDefinition, ObjectType, Schema},
};
use integration_tests::{mutation, runtime, TestRequest};
use pretty_assertions::assert_eq;
use serde_json::json;

type Log = Arc<Mutex<Vec<String>>>;

/// Logs its start and end around `delay`.
fn logged(log: &Log, name: &'static str, delay: u64) -> Resolver {
    let log = log.clone();
    Resolver::from_async(move |ctx| {
        let log = log.clone();
        let amount = ctx.argument::<i64>("amount");
        async move {
            log.lock().unwrap().push(format!("start {name}"));
            tokio::time::sleep(Duration::from_millis(delay)).await;
            log.lock().unwrap().push(format!("end {name}"));
            amount.map(|amount| ResolvedValue::Value(json!({"balance": amount})))
        }
    })
}

fn schema(log: &Log) -> Arc<Schema> {
    let amount = || InputValueDefinition::new("amount", "Int!");
    let schema = Schema::builder("Query")
        .mutation_type("Mutation")
        .object(ObjectType::new("Query").field(FieldDefinition::new("ping", "Boolean")))
        .object(
            ObjectType::new("Mutation")
                .field(
                    FieldDefinition::new("deposit", "Account")
                        .argument(amount())
                        .resolver(logged(log, "deposit", 30)),
                )
                .field(
                    FieldDefinition::new("withdraw", "Account")
                        .argument(amount())
                        .resolver(logged(log, "withdraw", 10)),
                )
                .field(
                    FieldDefinition::new("transfer", "Account!")
                        .argument(amount())
                        .resolver(logged(log, "transfer", 1)),
                ),
        )
        .object(
            ObjectType::new("Account").field(FieldDefinition::new("balance", "Int!")).field(
                FieldDefinition::new("audited", "Boolean").resolver({
                    let log = log.clone();
                    Resolver::from_async(move |ctx| {
                        let log = log.clone();
                        let path = ctx.path().to_string();
                        async move {
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            log.lock().unwrap().push(format!("audited {path}"));
                            Ok::<_, ResolverError>(ResolvedValue::Value(json!(true)))
                        }
                    })
                }),
            ),
        )
        .build()
        .unwrap();
    Arc::new(schema)
}

#[test]
fn root_mutation_fields_run_one_after_the_other() {
    let log = Log::default();
    let schema = schema(&log);

    let response = runtime().block_on(async move {
        let operation = mutation(
            &schema,
            [
                field("deposit")
                    .argument("amount", json!(100))
                    .selections([field("balance"), field("audited")]),
                field("withdraw")
                    .argument("amount", json!(20))
                    .selections([field("balance"), field("audited")]),
                field("transfer")
                    .alias("last")
                    .argument("amount", json!(5))
                    .selections([field("balance")]),
            ],
        );
        TestRequest::new(&schema, operation).execute().await.response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "deposit": {
          "balance": 100,
          "audited": true
        },
        "withdraw": {
          "balance": 20,
          "audited": true
        },
        "last": {
          "balance": 5
        }
      }
    }
    "#);
    // Each root field, subtree included, completes before the next one starts.
    assert_eq!(
        *log.lock().unwrap(),
        [
            "start deposit",
            "end deposit",
            "audited deposit.audited",
            "start withdraw",
            "end withdraw",
            "audited withdraw.audited",
            "start transfer",
            "end transfer",
        ]
    );
}

#[test]
fn a_failed_mutation_field_does_not_stop_the_next_ones() {
    let log = Log::default();
    let schema = schema(&log);

    let response = runtime().block_on(async move {
        let operation = mutation(
            &schema,
            [
                field("deposit").selections([field("balance")]),
                field("withdraw").argument("amount", json!(1)).selections([field("balance")]),
            ],
        );
        TestRequest::new(&schema, operation).execute().await.response
    });

    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "deposit": null,
        "withdraw": {
          "balance": 1
        }
      },
      "errors": [
        {
          "message": "Missing required argument 'amount' of type Int!",
          "path": [
            "deposit"
          ],
          "extensions": {
            "code": "ARGUMENT_COERCION_ERROR"
          }
        }
      ]
    }
    "#);
    assert_eq!(*log.lock().unwrap(), ["start withdraw", "end withdraw"]);
}
