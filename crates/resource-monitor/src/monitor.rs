// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Background performance monitor.
//!
//! A [`PerformanceMonitor`] owns one sampling thread at a time. Each
//! iteration takes a sample, appends it to a bounded history, checks the
//! alert thresholds and then waits for the sampling interval or a stop
//! signal, whichever comes first. Stopping joins the thread, so no sample
//! is recorded after [`PerformanceMonitor::stop_monitoring`] returns.
//!
//! All state lives behind a single mutex; readers receive copies.

use crate::{
    Alert, AlertThresholds, MonitorError, MonitoringConfig, PerformanceReport, PerformanceSample,
    SampleSource, SystemSampler,
};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Callback invoked once per threshold crossing.
pub type AlertCallback = Arc<dyn Fn(&Alert) + Send + Sync>;

struct MonitorState {
    config: MonitoringConfig,
    current: Option<PerformanceSample>,
    history: VecDeque<PerformanceSample>,
    thresholds: AlertThresholds,
    callbacks: Vec<AlertCallback>,
}

struct Worker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Periodic sampler with threshold alerts and JSON export.
pub struct PerformanceMonitor {
    state: Arc<Mutex<MonitorState>>,
    worker: Option<Worker>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("monitoring", &self.is_monitoring())
            .field("samples", &lock(&self.state).history.len())
            .finish()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        let config = MonitoringConfig::default();
        Self {
            state: Arc::new(Mutex::new(MonitorState {
                thresholds: config.thresholds,
                config,
                current: None,
                history: VecDeque::new(),
                callbacks: Vec::new(),
            })),
            worker: None,
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Starts sampling the live system on a background thread.
    ///
    /// Installs `config`, including its thresholds. Does nothing (with a
    /// warning) if monitoring is already running.
    pub fn start_monitoring(&mut self, config: MonitoringConfig) {
        self.start_with_source(config, Box::new(SystemSampler::new()));
    }

    /// Like [`start_monitoring`](Self::start_monitoring) with a custom sample source.
    pub fn start_with_source(
        &mut self,
        config: MonitoringConfig,
        mut source: Box<dyn SampleSource>,
    ) {
        if self.worker.is_some() {
            warn!("performance monitoring already running; start ignored");
            return;
        }

        let interval = config.sampling_interval();
        {
            let mut state = lock(&self.state);
            state.thresholds = config.thresholds;
            state.config = config;
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let state = Arc::clone(&self.state);
        let handle = std::thread::spawn(move || loop {
            let config = lock(&state).config.clone();
            let sample = source.sample(&config);
            record(&state, sample);

            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        info!(interval_ms = interval.as_millis() as u64, "performance monitoring started");
        self.worker = Some(Worker { stop_tx, handle });
    }

    /// Stops the sampling thread and waits for it to exit.
    ///
    /// If the active config names a `log_file`, the history is exported
    /// there. Calling this while stopped does nothing.
    pub fn stop_monitoring(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.stop_tx.send(());
        if worker.handle.join().is_err() {
            warn!("performance monitor thread panicked");
        }
        info!(samples = lock(&self.state).history.len(), "performance monitoring stopped");

        let log_file = lock(&self.state).config.log_file.clone();
        if let Some(path) = log_file {
            if let Err(e) = self.export_metrics(&path) {
                warn!(error = %e, "failed to write monitoring log file");
            }
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.worker.is_some()
    }

    // ── Samples ────────────────────────────────────────────────

    /// Records a sample as if the sampling thread had taken it.
    ///
    /// Returns the alerts it raised, after every callback has seen them.
    pub fn record_sample(&self, sample: PerformanceSample) -> Vec<Alert> {
        record(&self.state, sample)
    }

    /// The most recent sample, if any has been taken.
    pub fn current_metrics(&self) -> Option<PerformanceSample> {
        lock(&self.state).current
    }

    /// A copy of the sample history, oldest first.
    pub fn metrics_history(&self) -> Vec<PerformanceSample> {
        lock(&self.state).history.iter().copied().collect()
    }

    pub fn clear_history(&self) {
        let mut state = lock(&self.state);
        state.history.clear();
        state.current = None;
    }

    // ── Aggregates ─────────────────────────────────────────────

    /// Mean CPU percentage over the history, 0 when empty.
    pub fn average_cpu_usage(&self) -> f64 {
        self.report().average_cpu_usage
    }

    /// Highest memory percentage over the history, 0 when empty.
    pub fn peak_memory_usage(&self) -> f64 {
        self.report().peak_memory_usage
    }

    /// Mean power draw in mW over the history, 0 when empty.
    pub fn average_power_consumption(&self) -> f64 {
        self.report().average_power_consumption
    }

    /// Aggregates computed from a single consistent view of the history.
    pub fn report(&self) -> PerformanceReport {
        PerformanceReport::from_samples(lock(&self.state).history.iter())
    }

    /// The report as a JSON string.
    pub fn generate_report(&self) -> Result<String, MonitorError> {
        Ok(serde_json::to_string_pretty(&self.report())?)
    }

    // ── Export ─────────────────────────────────────────────────

    /// Writes the sample history to `path` as a JSON array.
    pub fn export_metrics(&self, path: impl AsRef<Path>) -> Result<(), MonitorError> {
        let json = serde_json::to_string_pretty(&self.metrics_history())?;
        write_export(path.as_ref(), &json)
    }

    /// Writes the aggregate report to `path`.
    pub fn export_report(&self, path: impl AsRef<Path>) -> Result<(), MonitorError> {
        write_export(path.as_ref(), &self.generate_report()?)
    }

    // ── Thresholds & alerts ────────────────────────────────────

    /// Takes effect from the next sample. A later `start_monitoring`
    /// installs the thresholds of its config instead.
    pub fn set_cpu_threshold(&self, percent: f64) {
        lock(&self.state).thresholds.cpu_percent = percent;
    }

    pub fn set_memory_threshold(&self, percent: f64) {
        lock(&self.state).thresholds.memory_percent = percent;
    }

    pub fn set_temperature_threshold(&self, celsius: f64) {
        lock(&self.state).thresholds.temperature_celsius = celsius;
    }

    pub fn thresholds(&self) -> AlertThresholds {
        lock(&self.state).thresholds
    }

    /// Registers a callback for every future alert.
    ///
    /// Callbacks run on the sampling thread, outside the monitor lock. A
    /// panicking callback is logged and does not affect the others.
    pub fn register_alert_callback<F>(&self, callback: F)
    where
        F: Fn(&Alert) + Send + Sync + 'static,
    {
        lock(&self.state).callbacks.push(Arc::new(callback));
    }
}

impl Drop for PerformanceMonitor {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

fn lock(state: &Mutex<MonitorState>) -> MutexGuard<'_, MonitorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record(state: &Mutex<MonitorState>, sample: PerformanceSample) -> Vec<Alert> {
    let (alerts, callbacks) = {
        let mut state = lock(state);
        state.current = Some(sample);
        state.history.push_back(sample);
        while state.history.len() > state.config.max_history {
            state.history.pop_front();
        }
        let alerts = sample.alerts(&state.thresholds);
        let callbacks = if alerts.is_empty() {
            Vec::new()
        } else {
            state.callbacks.clone()
        };
        (alerts, callbacks)
    };

    for alert in &alerts {
        debug!(kind = ?alert.kind, value = alert.value, "threshold crossed");
        for callback in &callbacks {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(alert))).is_err() {
                warn!(kind = ?alert.kind, "alert callback panicked");
            }
        }
    }
    alerts
}

fn write_export(path: &Path, contents: &str) -> Result<(), MonitorError> {
    let export_err = |source| MonitorError::ExportError {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(export_err)?;
    }
    std::fs::write(path, contents).map_err(export_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlertKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays fixed samples in order, repeating the last one.
    struct Scripted {
        samples: Vec<PerformanceSample>,
        next: usize,
    }

    impl Scripted {
        fn constant(cpu: f64) -> Box<Self> {
            Box::new(Self {
                samples: vec![PerformanceSample {
                    cpu_percent: cpu,
                    memory_percent: 40.0,
                    power_mw: 1500.0,
                    ..Default::default()
                }],
                next: 0,
            })
        }
    }

    impl SampleSource for Scripted {
        fn sample(&mut self, _config: &MonitoringConfig) -> PerformanceSample {
            let idx = self.next.min(self.samples.len() - 1);
            self.next += 1;
            let mut sample = self.samples[idx];
            sample.timestamp_ms = crate::unix_millis();
            sample
        }
    }

    fn cpu_sample(cpu: f64) -> PerformanceSample {
        PerformanceSample {
            cpu_percent: cpu,
            ..Default::default()
        }
    }

    #[test]
    fn test_sample_count_over_time() {
        let mut monitor = PerformanceMonitor::new();
        let config = MonitoringConfig::default().with_interval(Duration::from_millis(100));
        monitor.start_with_source(config, Scripted::constant(10.0));
        assert!(monitor.is_monitoring());

        std::thread::sleep(Duration::from_millis(350));
        monitor.stop_monitoring();

        let count = monitor.metrics_history().len();
        assert!((3..=4).contains(&count), "got {count} samples");
    }

    #[test]
    fn test_no_samples_after_stop() {
        let mut monitor = PerformanceMonitor::new();
        let config = MonitoringConfig::default().with_interval(Duration::from_millis(10));
        monitor.start_with_source(config, Scripted::constant(10.0));
        std::thread::sleep(Duration::from_millis(50));
        monitor.stop_monitoring();
        assert!(!monitor.is_monitoring());

        let count = monitor.metrics_history().len();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(monitor.metrics_history().len(), count);
    }

    #[test]
    fn test_second_start_ignored() {
        let mut monitor = PerformanceMonitor::new();
        let config = MonitoringConfig::default().with_interval(Duration::from_secs(10));
        monitor.start_with_source(config.clone(), Scripted::constant(10.0));
        monitor.start_with_source(config, Scripted::constant(99.0));
        std::thread::sleep(Duration::from_millis(50));
        monitor.stop_monitoring();

        let history = monitor.metrics_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].cpu_percent, 10.0);
    }

    #[test]
    fn test_one_alert_above_threshold() {
        let monitor = PerformanceMonitor::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        monitor.register_alert_callback(move |alert| {
            assert_eq!(alert.kind, AlertKind::Cpu);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        monitor.set_cpu_threshold(50.0);

        assert_eq!(monitor.record_sample(cpu_sample(75.0)).len(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(monitor.record_sample(cpu_sample(50.0)).is_empty());
        assert!(monitor.record_sample(cpu_sample(20.0)).is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_callback_isolated() {
        let monitor = PerformanceMonitor::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        monitor.register_alert_callback(|_| panic!("callback failure"));
        monitor.register_alert_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        monitor.record_sample(cpu_sample(95.0));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.metrics_history().len(), 1);
    }

    #[test]
    fn test_history_bounded() {
        let mut monitor = PerformanceMonitor::new();
        let config = MonitoringConfig {
            max_history: 3,
            sampling_interval_ms: 60_000,
            ..Default::default()
        };
        monitor.start_with_source(config, Scripted::constant(0.0));
        monitor.stop_monitoring();

        for cpu in [1.0, 2.0, 3.0, 4.0] {
            monitor.record_sample(cpu_sample(cpu));
        }
        let cpus: Vec<f64> = monitor.metrics_history().iter().map(|s| s.cpu_percent).collect();
        assert_eq!(cpus, vec![2.0, 3.0, 4.0]);
        assert_eq!(monitor.current_metrics().map(|s| s.cpu_percent), Some(4.0));
    }

    #[test]
    fn test_aggregates() {
        let monitor = PerformanceMonitor::new();
        assert_eq!(monitor.average_cpu_usage(), 0.0);
        for (cpu, mem, power) in [(10.0, 30.0, 1000.0), (30.0, 60.0, 2000.0)] {
            monitor.record_sample(PerformanceSample {
                cpu_percent: cpu,
                memory_percent: mem,
                power_mw: power,
                ..Default::default()
            });
        }
        assert!((monitor.average_cpu_usage() - 20.0).abs() < 1e-9);
        assert!((monitor.peak_memory_usage() - 60.0).abs() < 1e-9);
        assert!((monitor.average_power_consumption() - 1500.0).abs() < 1e-9);

        let report: PerformanceReport =
            serde_json::from_str(&monitor.generate_report().unwrap()).unwrap();
        assert_eq!(report.total_samples, 2);
    }

    #[test]
    fn test_export_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("metrics.json");
        let monitor = PerformanceMonitor::new();
        monitor.record_sample(cpu_sample(12.5));
        monitor.export_metrics(&path).unwrap();

        let parsed: Vec<PerformanceSample> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].cpu_percent, 12.5);
    }

    #[test]
    fn test_log_file_written_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.json");
        let mut monitor = PerformanceMonitor::new();
        let config = MonitoringConfig::default()
            .with_interval(Duration::from_secs(10))
            .with_log_file(&path);
        monitor.start_with_source(config, Scripted::constant(5.0));
        std::thread::sleep(Duration::from_millis(30));
        monitor.stop_monitoring();
        assert!(path.exists());
    }

    #[test]
    fn test_drop_stops_thread() {
        let mut monitor = PerformanceMonitor::new();
        monitor.start_with_source(
            MonitoringConfig::default().with_interval(Duration::from_millis(5)),
            Scripted::constant(1.0),
        );
        drop(monitor);
    }
}
