//! End-to-end lifecycle tests against real sockets.

use std::time::Duration;

use any_business::http;
use any_business::lifecycle::{
    signals, ExitOutcome, LifecycleError, LifecyclePhase, ServerHandle, TerminationSignal,
};

mod common;

#[tokio::test]
async fn test_bind_conflict_fails_without_serving() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = common::test_config();
    config.listener.port = occupied.local_addr().unwrap().port();

    let handle = ServerHandle::new(&config, http::app(&config, None));
    let mut phase = handle.phase_watch();
    let (_tx, rx) = signals::channel();

    let result = handle.run(rx).await;
    assert!(matches!(result, Err(LifecycleError::Bind(_))));
    assert_eq!(phase.phase(), LifecyclePhase::Failed);
    assert!(phase.wait_for(LifecyclePhase::Serving).await.is_none());
}

#[tokio::test]
async fn test_signal_stops_cleanly() {
    let config = common::test_config();
    let server = common::start(&config, http::app(&config, None)).await;

    let body = common::client()
        .get(server.url("/ping"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "pong");

    assert!(server.signals.send(TerminationSignal::Interrupt));
    let outcome = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(outcome, ExitOutcome::Clean);
    assert_eq!(server.phase.phase(), LifecyclePhase::Stopped);
    assert!(tokio::net::TcpStream::connect(server.addr).await.is_err());
}

#[tokio::test]
async fn test_every_termination_signal_triggers_shutdown() {
    for signal in [
        TerminationSignal::Terminate,
        TerminationSignal::HangUp,
        TerminationSignal::Quit,
    ] {
        let config = common::test_config();
        let server = common::start(&config, http::app(&config, None)).await;

        server.signals.send(signal);
        let outcome = tokio::time::timeout(Duration::from_secs(5), server.task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome, ExitOutcome::Clean, "{signal}");
    }
}

#[tokio::test]
async fn test_in_flight_request_drains_within_grace() {
    let config = common::test_config();
    let app = common::app_with_slow_route(&config, Duration::from_millis(500));
    let server = common::start(&config, app).await;

    let request = tokio::spawn(common::client().get(server.url("/slow")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;

    server.signals.send(TerminationSignal::Terminate);
    let outcome = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ExitOutcome::Clean);

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "done");
}

#[tokio::test]
async fn test_grace_period_elapsed_forces_close() {
    let mut config = common::test_config();
    config.timeouts.shutdown_grace = Duration::from_millis(200);
    let app = common::app_with_slow_route(&config, Duration::from_secs(20));
    let mut server = common::start(&config, app).await;

    let request = tokio::spawn(common::client().get(server.url("/slow")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;

    server.signals.send(TerminationSignal::Interrupt);
    let outcome = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("forced close must return promptly")
        .unwrap()
        .unwrap();

    assert_eq!(outcome, ExitOutcome::Forced);
    let state = server.phase.wait_terminal().await.unwrap();
    assert_eq!(state.phase, LifecyclePhase::Stopped);

    // The abandoned request sees its connection dropped.
    let abandoned = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .unwrap()
        .unwrap();
    assert!(abandoned.is_err());
}

#[tokio::test]
async fn test_second_signal_escalates_to_forced_close() {
    let mut config = common::test_config();
    config.timeouts.shutdown_grace = Duration::from_secs(30);
    let app = common::app_with_slow_route(&config, Duration::from_secs(20));
    let mut server = common::start(&config, app).await;

    let _request = tokio::spawn(common::client().get(server.url("/slow")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;

    server.signals.send(TerminationSignal::Terminate);
    tokio::time::timeout(
        Duration::from_secs(5),
        server.phase.wait_for(LifecyclePhase::GracefulShutdown),
    )
    .await
    .unwrap()
    .unwrap();

    server.signals.send(TerminationSignal::Interrupt);
    let outcome = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("second signal must not wait for the grace period")
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ExitOutcome::Forced);
}

#[tokio::test]
async fn test_readiness_in_development_then_interrupt() {
    let mut config = common::test_config();
    config.environment = "development".parse().unwrap();
    config.listener.host = "localhost".into();
    let server = common::start(&config, http::app(&config, None)).await;

    let response = common::client().get(server.url("/ready")).send().await.unwrap();
    assert_eq!(response.status(), 204);
    assert_eq!(
        response.headers()["content-type"],
        "text/html; charset=utf-8"
    );

    server.signals.send(TerminationSignal::Interrupt);
    let outcome = tokio::time::timeout(config.timeouts.shutdown_grace, server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ExitOutcome::Clean);
    assert_eq!(server.phase.phase(), LifecyclePhase::Stopped);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected_over_the_wire() {
    let mut config = common::test_config();
    config.security.max_body_size = 64;
    let server = common::start(&config, http::app(&config, None)).await;

    let response = common::client()
        .post(server.url("/ping"))
        .body(vec![b'x'; 4096])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);

    // The server keeps serving after rejecting the upload.
    let response = common::client().get(server.url("/ping")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    server.signals.send(TerminationSignal::Interrupt);
    let outcome = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ExitOutcome::Clean);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_listener_failure_shuts_down_once() {
    use any_business::net::Listener;
    use std::os::fd::AsRawFd;

    let config = common::test_config();
    let listener = Listener::bind("127.0.0.1:0", 8).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let fd = listener.as_raw_fd();

    let handle = ServerHandle::new(&config, http::app(&config, None));
    let mut phase = handle.phase_watch();
    let (tx, rx) = signals::channel();
    let task = tokio::spawn(handle.run_on(listener, rx));

    let mut seen = Vec::new();
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), phase.changed())
            .await
            .unwrap()
            .unwrap();
        seen.push(next);
        if next == LifecyclePhase::Serving {
            break;
        }
    }

    let response = common::client()
        .get(format!("http://{addr}/ping"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Every accept on a shut down listening socket fails with EINVAL.
    assert_eq!(unsafe { libc::shutdown(fd, libc::SHUT_RDWR) }, 0);

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("listener failure must end the run")
        .unwrap();
    assert_eq!(outcome, ExitOutcome::Clean);

    while let Some(next) = phase.changed().await {
        seen.push(next);
    }
    assert_eq!(seen.last(), Some(&LifecyclePhase::Stopped));
    let graceful = seen
        .iter()
        .filter(|p| **p == LifecyclePhase::GracefulShutdown)
        .count();
    assert!(graceful <= 1, "phases: {seen:?}");
    assert!(!seen.contains(&LifecyclePhase::ForcedClose), "phases: {seen:?}");

    // The signal watcher is gone with the run.
    tokio::time::timeout(Duration::from_secs(5), tx.closed())
        .await
        .unwrap();
    assert!(!tx.send(TerminationSignal::Interrupt));
}
