mod common;

use std::sync::Arc;
use std::time::Duration;

use batchllm::{BatchConfig, BatchDispatcher, GatewayClient};
use common::{succeed, Behavior, ScriptedClient};

fn dispatcher(
  client: &Arc<ScriptedClient>
, config: &BatchConfig
) -> BatchDispatcher
{   let dispatcher = BatchDispatcher::from_config(client.clone(), config);
    match dispatcher
    {   Ok(d) => d
      , Err(e) => panic!("dispatcher config rejected: {}", e)
    }
}

fn limited(concurrency_limit: usize) -> BatchConfig
{   BatchConfig
    {   concurrency_limit
      , ..BatchConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_output_order_matches_input_order()
{   let texts: Vec<String> = (0..25).map(|i| format!("note {}", i)).collect();
    // Later prompts answer sooner, so completion order is reversed
    let mut client = ScriptedClient::new(Behavior::Echo);
    for (i, text) in texts.iter().enumerate()
    {   client = client.delay(text, Duration::from_millis(10 * (25 - i as u64)));
    }
    let client = Arc::new(client);
    let dispatcher = dispatcher(&client, &limited(8));

    let records = dispatcher.run_batch(texts.clone()).await;

    assert_eq!(records.len(), texts.len());
    for (record, text) in records.iter().zip(&texts)
    {   assert_eq!(&record.prompt, text);
        assert_eq!(&record.response, text);
    }
}

#[tokio::test]
async fn test_empty_batch_yields_empty_output()
{   let client = Arc::new(ScriptedClient::new(Behavior::Echo));
    let dispatcher = dispatcher(&client, &BatchConfig::default());

    let records = dispatcher.run_batch(Vec::<String>::new()).await;

    assert!(records.is_empty());
    assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_calls_never_exceed_limit()
{   let client = Arc::new(
      ScriptedClient::new(Behavior::Echo)
        .latency(Duration::from_millis(100))
    );
    let dispatcher = dispatcher(&client, &limited(10));
    let texts: Vec<String> = (0..50).map(|i| format!("p{}", i)).collect();

    let records = dispatcher.run_batch(texts).await;

    assert_eq!(records.len(), 50);
    assert_eq!(client.calls().len(), 50);
    assert!(client.max_in_flight() <= 10, "saw {}", client.max_in_flight());
    assert_eq!(client.max_in_flight(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_does_not_hold_a_slot()
{   let client = Arc::new(
      ScriptedClient::new(Behavior::Echo)
        .on("flaky", Behavior::TransientForever)
    );
    let config = BatchConfig
    {   concurrency_limit: 1
      , max_attempts: 2
      , base_delay_secs: 10
      , ..BatchConfig::default()
    };
    let dispatcher = dispatcher(&client, &config);
    let started = tokio::time::Instant::now();

    let records = dispatcher.run_batch(["flaky", "steady"]).await;

    let steady = client.calls_for("steady");
    assert_eq!(steady.len(), 1);
    assert!(steady[0].at - started < Duration::from_secs(10));
    assert_eq!(client.calls_for("flaky").len(), 2);
    assert!(records[0].is_degraded());
    assert_eq!(records[1].response, "steady");
}

#[tokio::test]
async fn test_failures_do_not_abort_siblings()
{   let client = Arc::new(
      ScriptedClient::new(Behavior::Echo)
        .on("bad auth", Behavior::FatalForever)
        .on("boom", Behavior::Panic)
        .on("busy", Behavior::TransientForever)
    );
    let dispatcher = dispatcher(&client, &limited(4));

    let records = dispatcher
      .run_batch(["a", "bad auth", "boom", "busy", "b"])
      .await;

    let prompts: Vec<&str> = records.iter().map(|r| r.prompt.as_str()).collect();
    assert_eq!(prompts, ["a", "bad auth", "boom", "busy", "b"]);
    let degraded: Vec<bool> = records.iter().map(|r| r.is_degraded()).collect();
    assert_eq!(degraded, [false, true, true, true, false]);
}

#[tokio::test]
async fn test_end_to_end_notes()
{   let client = Arc::new(
      ScriptedClient::new(Behavior::TransientForever)
        .on("note A", succeed("gpt-35-turbo-16k", "no symptoms"))
    );
    let config = BatchConfig
    {   concurrency_limit: 2
      , max_attempts: 1
      , ..BatchConfig::default()
    };
    let dispatcher = dispatcher(&client, &config);

    let records = dispatcher.run_batch(["note A", "note B"]).await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].prompt, "note A");
    assert_eq!(records[0].response, "no symptoms");
    assert_eq!(records[0].model, "gpt-35-turbo-16k");
    assert_eq!(records[1].prompt, "note B");
    assert_eq!(records[1].response, "");
    assert_eq!(records[1].model, "");
    assert_eq!(client.calls_for("note B").len(), 1);
}

#[test]
fn test_blocking_batch_from_sync_caller()
{   let client = Arc::new(ScriptedClient::new(Behavior::Echo));
    let dispatcher = dispatcher(&client, &limited(3));

    let records = dispatcher
      .run_batch_blocking(vec!["x", "y", "z"])
      .unwrap();

    let responses: Vec<&str> = records.iter()
      .map(|r| r.response.as_str())
      .collect();
    assert_eq!(responses, ["x", "y", "z"]);
}

#[tokio::test]
async fn test_blocking_batch_inside_runtime_is_an_error()
{   let client = Arc::new(ScriptedClient::new(Behavior::Echo));
    let dispatcher = dispatcher(&client, &limited(2));

    let result = dispatcher.run_batch_blocking(["x"]);

    assert!(matches!(result, Err(batchllm::Error::Other(_))));
    assert!(client.calls().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_gateway_send_batch()
{   let mut config = BatchConfig::default();
    config.apply_env();
    if std::env::var(batchllm::config::GATEWAY_URI_ENV).is_err()
    {   println!(
          "Skipping: {} not set"
        , batchllm::config::GATEWAY_URI_ENV
        );
        return;
    }
    config.gateway.api_key_env = std::env::var("BATCHLLM_API_KEY_ENV").ok();
    if let Ok(route) = std::env::var("BATCHLLM_ROUTE")
    {   config.route = route;
    }

    let client = match GatewayClient::from_config(&config.gateway)
    {   Ok(c) => c
      , Err(e) => {
          println!("Skipping: {}", e);
          return;
        }
    };
    let dispatcher = BatchDispatcher::from_config(Arc::new(client), &config)
      .unwrap();

    let records = dispatcher
      .run_batch(["Patient reports a mild headache since Monday."])
      .await;

    assert_eq!(records.len(), 1);
    println!("Response: {:?}", records[0]);
}
