//! End-to-end tests against real backends on loopback.

use std::time::Duration;

mod common;

const TRACE_HEADER: &str = "lb-from";

#[tokio::test]
async fn test_round_robin_across_backends() {
    let b1 = common::start_mock_backend().await;
    let b2 = common::start_mock_backend().await;
    let b3 = common::start_mock_backend().await;
    let (proxy, shutdown) =
        common::start_balancer(common::balancer_config(&[b1.addr, b2.addr, b3.addr], true)).await;

    let client = common::client();
    let mut served = Vec::new();
    for _ in 0..6 {
        let res = client.get(format!("http://{}/work", proxy)).send().await.unwrap();
        assert_eq!(res.status(), 200);
        served.push(res.headers()[TRACE_HEADER].to_str().unwrap().to_string());
    }

    // Each backend exactly twice, repeating with period three.
    assert_eq!(served[0..3], served[3..6]);
    let mut first_cycle = served[0..3].to_vec();
    first_cycle.sort();
    let mut expected = vec![b1.addr.to_string(), b2.addr.to_string(), b3.addr.to_string()];
    expected.sort();
    assert_eq!(first_cycle, expected);
    assert_eq!((b1.hits(), b2.hits(), b3.hits()), (2, 2, 2));

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_is_relayed_verbatim() {
    let b1 = common::start_mock_backend().await;
    let (proxy, shutdown) = common::start_balancer(common::balancer_config(&[b1.addr], false)).await;

    let res = common::client()
        .post(format!("http://{}/submit?x=1", proxy))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().get(TRACE_HEADER).is_none());
    assert_eq!(res.headers()["x-backend-host"], b1.addr.to_string().as_str());
    assert_eq!(res.text().await.unwrap(), format!("hello from {}", b1.addr));

    shutdown.trigger();
}

#[tokio::test]
async fn test_all_backends_down_returns_503() {
    let dead = common::dead_address().await;
    let (proxy, shutdown) = common::start_balancer(common::balancer_config(&[dead], true)).await;

    let res = common::client().get(format!("http://{}/", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert!(res.headers().get(TRACE_HEADER).is_none());
    assert_eq!(res.text().await.unwrap(), "Service Unavailable");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unhealthy_backend_is_evicted_and_recovers() {
    let b1 = common::start_mock_backend().await;
    let b2 = common::start_mock_backend().await;
    let (proxy, shutdown) =
        common::start_balancer(common::balancer_config(&[b1.addr, b2.addr], true)).await;
    let client = common::client();

    b2.set_healthy(false);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    for _ in 0..4 {
        let res = client.get(format!("http://{}/", proxy)).send().await.unwrap();
        assert_eq!(res.headers()[TRACE_HEADER], b1.addr.to_string().as_str());
    }

    b2.set_healthy(true);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let mut seen = std::collections::HashSet::new();
    for _ in 0..2 {
        let res = client.get(format!("http://{}/", proxy)).send().await.unwrap();
        seen.insert(res.headers()[TRACE_HEADER].to_str().unwrap().to_string());
    }
    assert_eq!(seen.len(), 2);

    shutdown.trigger();
}
