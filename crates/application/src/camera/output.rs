use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use domain::DomainError;
use domain::driver::{DeviceRef, Frame};
use domain::event::SensorEvent;
use domain::interface::{InterfaceContext, OutputInterface};
use domain::storage::{DataRecord, ProducerId};
use infrastructure::messaging::EventBus;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Read errors tolerated in a row before the capture loop gives up
const MAX_CONSECUTIVE_ERRORS: u32 = 5;

struct CaptureRun {
    cancel: CancellationToken,
    task: JoinHandle<Result<(), DomainError>>,
}

/// Why a capture loop returned
enum CaptureExit {
    Cancelled,
    Failed(String),
}

#[derive(Default)]
struct Latest {
    record: Option<DataRecord>,
    frame: Option<Frame>,
}

/// Video output: reads frames from the device on a dedicated task and
/// publishes one `NewData` event per frame.
pub struct CameraOutput {
    name: String,
    events: Arc<EventBus>,
    run: Mutex<Option<CaptureRun>>,
    latest: Arc<Mutex<Latest>>,
    emitted: Arc<AtomicU64>,
    period: Mutex<Option<Duration>>,
}

impl CameraOutput {
    pub fn new(name: impl Into<String>, events: Arc<EventBus>) -> Self {
        Self {
            name: name.into(),
            events,
            run: Mutex::new(None),
            latest: Arc::new(Mutex::new(Latest::default())),
            emitted: Arc::new(AtomicU64::new(0)),
            period: Mutex::new(None),
        }
    }

    /// Raw frame behind the latest record
    pub fn latest_frame(&self) -> Option<Frame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .frame
            .clone()
    }

    fn take_run(&self) -> Option<CaptureRun> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Record published for a frame. Pixels stay with the output; the record
/// carries a summary.
pub fn frame_record(producer_id: &ProducerId, frame: &Frame) -> DataRecord {
    let mean = if frame.pixels.is_empty() {
        0.0
    } else {
        let sum: u64 = frame.pixels.iter().map(|&p| u64::from(p)).sum();
        (sum as f64 / frame.pixels.len() as f64 * 100.0).round() / 100.0
    };

    DataRecord::new(
        producer_id.clone(),
        frame.timestamp,
        json!({
            "sequence": frame.sequence,
            "width": frame.width,
            "height": frame.height,
            "pixel_format": frame.pixel_format,
            "byte_count": frame.pixels.len(),
            "mean": mean,
        }),
    )
}

struct CaptureLoop {
    driver_id: String,
    output: String,
    producer_id: ProducerId,
    device: DeviceRef,
    retry_delay: Duration,
    events: Arc<EventBus>,
    latest: Arc<Mutex<Latest>>,
    emitted: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl CaptureLoop {
    async fn execute(self) -> CaptureExit {
        let mut consecutive_errors = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!(driver_id = %self.driver_id, output = %self.output, "Capture cancelled");
                    return CaptureExit::Cancelled;
                }
                frame = self.device.read_frame() => match frame {
                    Ok(frame) => {
                        consecutive_errors = 0;
                        self.publish(frame).await;
                        tokio::task::yield_now().await;
                    }
                    Err(DomainError::Disconnected(reason)) => {
                        tracing::warn!(driver_id = %self.driver_id, reason = %reason, "Device released under capture loop");
                        return CaptureExit::Failed(format!("device released: {}", reason));
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        tracing::error!(
                            driver_id = %self.driver_id,
                            error = %e,
                            attempt = consecutive_errors,
                            "Frame read error"
                        );
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            tracing::error!(driver_id = %self.driver_id, "Too many read errors, capture halted");
                            return CaptureExit::Failed(format!(
                                "{} consecutive read errors, last: {}",
                                consecutive_errors, e
                            ));
                        }
                        tokio::select! {
                            _ = self.cancel.cancelled() => return CaptureExit::Cancelled,
                            _ = tokio::time::sleep(self.retry_delay) => {}
                        }
                    }
                }
            }
        }
    }

    async fn publish(&self, frame: Frame) {
        let record = frame_record(&self.producer_id, &frame);
        {
            let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
            latest.record = Some(record.clone());
            latest.frame = Some(frame);
        }
        self.emitted.fetch_add(1, Ordering::Relaxed);

        let event = SensorEvent::new_data(self.driver_id.clone(), self.output.clone(), record);
        let report = self.events.dispatch(&event).await;
        if report.failed > 0 {
            tracing::warn!(
                driver_id = %self.driver_id,
                failed = report.failed,
                "Some listeners rejected a frame"
            );
        }
    }
}

#[async_trait]
impl OutputInterface for CameraOutput {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, ctx: &InterfaceContext) -> Result<(), DomainError> {
        // Restart when already running
        self.stop().await?;

        let info = ctx.device.info()?;
        if !info.formats.is_empty() && !info.formats.contains(&ctx.params.pixel_format) {
            return Err(DomainError::ParamApply(format!(
                "Device {} cannot deliver {}",
                info.device_id, ctx.params.pixel_format
            )));
        }

        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Latest::default();
        self.emitted.store(0, Ordering::Relaxed);
        *self.period.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(ctx.params.frame_interval());

        let cancel = CancellationToken::new();
        let capture = CaptureLoop {
            driver_id: ctx.driver_id.clone(),
            output: self.name.clone(),
            producer_id: ctx.producer_id.clone(),
            device: ctx.device.clone(),
            retry_delay: ctx.params.frame_interval(),
            events: self.events.clone(),
            latest: self.latest.clone(),
            emitted: self.emitted.clone(),
            cancel: cancel.clone(),
        };

        let driver_id = ctx.driver_id.clone();
        let output = self.name.clone();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tracing::info!(driver_id = %driver_id, "Starting capture");
            // Inner task so a panic while capturing is still reported
            let (failure, result) = match tokio::spawn(capture.execute()).await {
                Ok(CaptureExit::Cancelled) => (None, Ok(())),
                Ok(CaptureExit::Failed(reason)) => (Some(reason), Ok(())),
                Err(e) => {
                    let reason = e.to_string();
                    let failed = DomainError::CaptureFailed(format!("{}: {}", output, reason));
                    (Some(reason), Err(failed))
                }
            };

            if let Some(reason) = failure {
                tracing::error!(driver_id = %driver_id, output = %output, reason = %reason, "Capture ended unexpectedly");
                let event = SensorEvent::driver_error(
                    driver_id.clone(),
                    format!("Capture on {} ended: {}", output, reason),
                );
                events.dispatch(&event).await;
            }
            tracing::info!(driver_id = %driver_id, "Capture stopped");
            result
        });

        *self.run.lock().unwrap_or_else(PoisonError::into_inner) = Some(CaptureRun { cancel, task });
        Ok(())
    }

    async fn stop(&self) -> Result<(), DomainError> {
        let Some(run) = self.take_run() else {
            return Ok(());
        };

        run.cancel.cancel();
        *self.period.lock().unwrap_or_else(PoisonError::into_inner) = None;
        run.task
            .await
            .map_err(|e| DomainError::CaptureFailed(format!("{}: {}", self.name, e)))?
    }

    fn is_active(&self) -> bool {
        self.run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|run| !run.task.is_finished())
    }

    fn latest_record(&self) -> Option<DataRecord> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record
            .clone()
    }

    fn records_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    fn sampling_period(&self) -> Option<Duration> {
        *self.period.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
