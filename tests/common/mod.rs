//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use deadswitch::capability::{CapabilityError, Destructor, Disabler, Failsafe, Saver};
use deadswitch::config::ListenerConfig;
use deadswitch::engine::{RunOutcome, Trigger};
use deadswitch::lifecycle::Shutdown;
use deadswitch::switch::{Switch, SwitchExit};

/// Ordered record of capability invocations.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A capability that records its call and optionally fails.
pub struct MockCapability {
    pub tag: String,
    pub log: CallLog,
    pub fail: bool,
}

impl MockCapability {
    pub fn ok(tag: &str, log: &CallLog) -> Self {
        Self {
            tag: tag.to_string(),
            log: log.clone(),
            fail: false,
        }
    }

    pub fn failing(tag: &str, log: &CallLog) -> Self {
        Self {
            fail: true,
            ..Self::ok(tag, log)
        }
    }

    fn call(&self) -> Result<(), CapabilityError> {
        self.log.push(self.tag.clone());
        if self.fail {
            Err(CapabilityError::Other(format!("{} exploded", self.tag)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Failsafe for MockCapability {
    async fn trigger(&self) -> Result<(), CapabilityError> {
        self.call()
    }
}

#[async_trait]
impl Saver for MockCapability {
    async fn save(&self) -> Result<(), CapabilityError> {
        self.call()
    }
}

#[async_trait]
impl Disabler for MockCapability {
    async fn disable(&self) -> Result<(), CapabilityError> {
        self.call()
    }
}

#[async_trait]
impl Destructor for MockCapability {
    async fn destroy(&self) -> Result<(), CapabilityError> {
        self.call()
    }
}

/// Engine stand-in that counts runs.
#[derive(Default)]
pub struct CountingEngine {
    runs: AtomicUsize,
}

impl CountingEngine {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Trigger for CountingEngine {
    async fn run(&self) -> RunOutcome {
        self.runs.fetch_add(1, Ordering::SeqCst);
        RunOutcome::Completed
    }
}

/// A bound, armed switch serving on an ephemeral port.
pub struct RunningSwitch {
    pub switch: Arc<Switch>,
    pub addr: SocketAddr,
    pub cancel: Shutdown,
    pub serving: tokio::task::JoinHandle<SwitchExit>,
}

impl RunningSwitch {
    pub async fn stop(self) -> SwitchExit {
        self.switch.shutdown().await;
        self.serving.await.unwrap()
    }
}

pub async fn start_switch(duration: Duration, engine: Arc<dyn Trigger>, arm: bool) -> RunningSwitch {
    let config = ListenerConfig {
        bind_address: "127.0.0.1:0".into(),
        read_timeout_ms: 500,
        ..ListenerConfig::default()
    };
    let switch = Arc::new(Switch::new(config, duration, engine));
    let addr = switch.bind().await.unwrap();
    if arm {
        switch.arm().await;
    }

    let cancel = Shutdown::new();
    let signal = cancel.subscribe();
    let serving = {
        let switch = Arc::clone(&switch);
        tokio::spawn(async move { switch.serve(signal).await.unwrap() })
    };

    RunningSwitch {
        switch,
        addr,
        cancel,
        serving,
    }
}

/// Send raw bytes and return everything the server writes back.
pub async fn send_raw(addr: SocketAddr, payload: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(payload).await.unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    out
}
