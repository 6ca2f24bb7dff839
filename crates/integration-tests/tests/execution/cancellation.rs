use std::{sync::Arc, time::Duration};

use engine::{
    operation::{field, fragment, SelectionNode},
    resolver::{ResolvedValue, Resolver, ResolverError},
    schema::{FieldDefinition, ObjectType, Schema},
    Engine, ExecutionConfig,
};
use futures::StreamExt;
use integration_tests::{constant, delayed, query, runtime, CountingDiagnostics, TestRequest};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn schema() -> Arc<Schema> {
    let schema = Schema::builder("Query")
        .object(
            ObjectType::new("Query")
                .field(FieldDefinition::new("fast", "Int").resolver(constant(json!(1))))
                .field(FieldDefinition::new("slow", "Int").resolver(delayed(Duration::from_secs(10), json!(2))))
                .field(FieldDefinition::new("later", "Int").resolver(delayed(Duration::from_millis(1), json!(3)))),
        )
        .build()
        .unwrap();
    Arc::new(schema)
}

#[test]
fn cancelled_fields_are_left_null_without_errors() {
    let schema = schema();
    let diagnostics = CountingDiagnostics::default();
    let cancellation = CancellationToken::new();

    let (output, payloads) = runtime().block_on({
        let diagnostics = diagnostics.clone();
        async move {
            tokio::spawn({
                let cancellation = cancellation.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    cancellation.cancel();
                }
            });

            let operation = query(
                &schema,
                [
                    SelectionNode::from(field("fast")),
                    field("slow").into(),
                    fragment().defer().selections([field("later")]).into(),
                ],
            );
            let started = std::time::Instant::now();
            let mut output = TestRequest::new(&schema, operation)
                .engine(Engine::new(ExecutionConfig::default()).with_diagnostics(diagnostics))
                .with_request(|request| request.cancellation_token(cancellation))
                .execute()
                .await;
            assert!(started.elapsed() < Duration::from_secs(5));

            let mut payloads = Vec::new();
            while let Some(payload) = output.deferred.next_payload().await {
                payloads.push(payload);
            }
            (output, payloads)
        }
    });

    insta::assert_json_snapshot!(output.response, @r#"
    {
      "data": {
        "fast": 1,
        "slow": null
      }
    }
    "#);
    assert!(payloads.is_empty());
    assert!(output.deferred.is_empty());
    assert_eq!(output.pool_statistics().outstanding(), 0);
    assert_eq!(diagnostics.opened(), diagnostics.released());
}

#[test]
fn cancelling_before_execution_runs_nothing_asynchronous() {
    let schema = schema();
    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let output = runtime().block_on(async move {
        let operation = query(&schema, [field("slow"), field("later")]);
        TestRequest::new(&schema, operation)
            .with_request(|request| request.cancellation_token(cancellation))
            .execute()
            .await
    });

    assert_eq!(output.response.data, Some(json!({"slow": null, "later": null})));
    assert!(output.response.errors.is_empty());
    assert_eq!(output.pool_statistics().outstanding(), 0);
}

#[test]
fn stream_stops_when_cancelled() {
    let schema = Schema::builder("Query")
        .object(ObjectType::new("Query").field(
            FieldDefinition::new("ticks", "[Int!]!")
                .maybe_stream()
                .resolver(Resolver::from_async(|_| async {
                    let ticks = futures::stream::iter(0..).then(|tick| async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        ResolvedValue::Value(json!(tick))
                    });
                    Ok::<_, ResolverError>(ResolvedValue::stream(ticks))
                })),
        ))
        .build()
        .unwrap();
    let schema = Arc::new(schema);
    let cancellation = CancellationToken::new();

    let payloads = runtime().block_on(async move {
        let operation = query(&schema, [field("ticks").stream(1)]);
        let mut output = TestRequest::new(&schema, operation)
            .with_request(|request| request.cancellation_token(cancellation.clone()))
            .execute()
            .await;
        assert_eq!(output.response.data, Some(json!({"ticks": [0]})));

        let mut payloads = Vec::new();
        while let Some(payload) = output.deferred.next_payload().await {
            payloads.push(payload);
            if payloads.len() == 3 {
                cancellation.cancel();
            }
        }
        payloads
    });

    assert_eq!(payloads.len(), 3);
    assert!(payloads.iter().all(|payload| payload.has_next));
}
