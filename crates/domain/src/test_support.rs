//! Fakes shared by the domain unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::driver::{
    DeviceAccess, DeviceConnection, DeviceHandle, DeviceInfo, Frame, ParameterSet,
};
use crate::error::{DomainError, Result};
use crate::interface::{CommandInput, InterfaceContext, OutputInterface};
use crate::storage::{DataRecord, ProducerId};

pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct StubConnection;

#[async_trait]
impl DeviceConnection for StubConnection {
    fn device_id(&self) -> &str {
        "stub0"
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            device_id: "stub0".to_string(),
            name: "Stub".to_string(),
            driver: "stub".to_string(),
            formats: vec!["GREY".to_string()],
        }
    }

    async fn configure(&self, _params: &ParameterSet) -> Result<()> {
        Ok(())
    }

    async fn read_frame(&self) -> Result<Frame> {
        Err(DomainError::Disconnected("stub has no frames".to_string()))
    }

    fn close(&self) {}
}

pub struct StubAccess;

#[async_trait]
impl DeviceAccess for StubAccess {
    async fn open(&self, _device_id: &str) -> Result<Arc<dyn DeviceConnection>> {
        Ok(Arc::new(StubConnection))
    }
}

/// A context over a live stub device. Keep the handle alive for as long as
/// the context is used.
pub async fn live_context() -> (InterfaceContext, DeviceHandle) {
    let handle = DeviceHandle::acquire(&StubAccess, "stub0")
        .await
        .expect("stub access never fails");
    let ctx = InterfaceContext {
        driver_id: "stub-driver".to_string(),
        producer_id: ProducerId::new("stub-driver").expect("valid producer id"),
        device: handle.device_ref(),
        params: ParameterSet::default(),
    };
    (ctx, handle)
}

pub struct FakeOutput {
    name: String,
    active: AtomicBool,
    fail_init: bool,
    fail_stop: bool,
    inits: AtomicUsize,
    journal: Option<Journal>,
}

impl FakeOutput {
    fn build(name: &str, fail_init: bool, fail_stop: bool, journal: Option<Journal>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            active: AtomicBool::new(false),
            fail_init,
            fail_stop,
            inits: AtomicUsize::new(0),
            journal,
        })
    }

    pub fn new(name: &str) -> Arc<Self> {
        Self::build(name, false, false, None)
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Self::build(name, true, false, None)
    }

    pub fn failing_stop(name: &str) -> Arc<Self> {
        Self::build(name, false, true, None)
    }

    pub fn with_journal(name: &str, journal: Journal) -> Arc<Self> {
        Self::build(name, false, false, Some(journal))
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutputInterface for FakeOutput {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, _ctx: &InterfaceContext) -> Result<()> {
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(format!("init {}", self.name));
        }
        if self.fail_init {
            return Err(DomainError::ParamApply("unsupported format".to_string()));
        }
        self.inits.fetch_add(1, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        if self.fail_stop && was_active {
            return Err(DomainError::Disconnected("stop failed".to_string()));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn latest_record(&self) -> Option<DataRecord> {
        None
    }

    fn records_emitted(&self) -> u64 {
        0
    }

    fn sampling_period(&self) -> Option<Duration> {
        None
    }
}

pub struct FakeInput {
    name: String,
    active: AtomicBool,
    inits: AtomicUsize,
    journal: Option<Journal>,
}

impl FakeInput {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            active: AtomicBool::new(false),
            inits: AtomicUsize::new(0),
            journal: None,
        })
    }

    pub fn with_journal(name: &str, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            active: AtomicBool::new(false),
            inits: AtomicUsize::new(0),
            journal: Some(journal),
        })
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandInput for FakeInput {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, _ctx: &InterfaceContext) -> Result<()> {
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(format!("init {}", self.name));
        }
        self.inits.fetch_add(1, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn execute(&self, _command: Value) -> Result<ParameterSet> {
        Ok(ParameterSet::default())
    }
}
