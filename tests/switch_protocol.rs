//! End-to-end tests of the reset protocol over TCP.

use std::sync::Arc;
use std::time::{Duration, Instant};

use deadswitch::client::ResetClient;
use deadswitch::switch::SwitchExit;

mod common;

use common::{send_raw, start_switch, CountingEngine};

#[tokio::test]
async fn unknown_command_is_echoed() {
    let engine = Arc::new(CountingEngine::default());
    let running = start_switch(Duration::from_secs(60), engine, true).await;

    assert_eq!(send_raw(running.addr, b"PING\n").await, "Unknown command: PING\n");

    assert_eq!(running.stop().await, SwitchExit::Shutdown);
}

#[tokio::test]
async fn empty_line_is_rejected() {
    let engine = Arc::new(CountingEngine::default());
    let running = start_switch(Duration::from_secs(60), engine, true).await;

    assert_eq!(send_raw(running.addr, b"\n").await, "Empty command\n");

    running.stop().await;
}

#[tokio::test]
async fn oversized_command_does_not_stop_the_server() {
    let engine = Arc::new(CountingEngine::default());
    let running = start_switch(Duration::from_secs(60), engine, true).await;

    let flood = vec![b'X'; 300];
    assert_eq!(send_raw(running.addr, &flood).await, "Command too long\n");

    let follow_up = send_raw(running.addr, b"RESET\n").await;
    assert_eq!(follow_up, "Timer reset successfully. Remaining: 1m\n");

    running.stop().await;
}

#[tokio::test]
async fn reset_without_timer() {
    let engine = Arc::new(CountingEngine::default());
    let running = start_switch(Duration::from_secs(60), engine, false).await;

    assert_eq!(send_raw(running.addr, b"RESET\n").await, "No timer is running\n");

    running.stop().await;
}

#[tokio::test]
async fn silent_peer_gets_read_error_after_deadline() {
    let engine = Arc::new(CountingEngine::default());
    let running = start_switch(Duration::from_secs(60), engine, true).await;

    // Partial command, no newline, connection held open.
    let started = Instant::now();
    let mut stream = tokio::net::TcpStream::connect(running.addr).await.unwrap();
    tokio::io::AsyncWriteExt::write_all(&mut stream, b"RES").await.unwrap();
    let mut out = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut out)
        .await
        .unwrap();

    assert_eq!(out, "Error reading command\n");
    assert!(started.elapsed() >= Duration::from_millis(400));

    running.stop().await;
}

#[tokio::test]
async fn reset_rearms_from_the_reset_instant() {
    let engine = Arc::new(CountingEngine::default());
    let running = start_switch(Duration::from_millis(200), engine.clone(), true).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let response = ResetClient::new(running.addr.to_string()).reset().await.unwrap();
    let reset_at = Instant::now();
    assert!(
        response.starts_with("Timer reset successfully. Remaining: 200ms"),
        "{response}"
    );

    // The original deadline (200ms after arming) has passed; the new one has not.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(engine.runs(), 0, "fired on the original deadline");

    let exit = running.serving.await.unwrap();
    assert_eq!(exit, SwitchExit::Triggered(deadswitch::RunOutcome::Completed));
    assert_eq!(engine.runs(), 1);
    assert!(reset_at.elapsed() >= Duration::from_millis(190));
}

#[tokio::test]
async fn reset_after_expiry_reports_expired() {
    let engine = Arc::new(CountingEngine::default());
    let running = start_switch(Duration::from_millis(30), engine.clone(), true).await;

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(running.switch.reset().await, deadswitch::ResetOutcome::AlreadyExpired);
    assert_eq!(engine.runs(), 1);
}

#[tokio::test]
async fn external_cancellation_ends_serving_without_firing() {
    let engine = Arc::new(CountingEngine::default());
    let running = start_switch(Duration::from_millis(300), engine.clone(), true).await;

    running.cancel.trigger();
    let exit = running.serving.await.unwrap();
    assert_eq!(exit, SwitchExit::Cancelled);

    running.switch.shutdown().await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(engine.runs(), 0);
}
