//! Prometheus exporter for inverter telemetry.
//!
//! [`Exporter`] is the metrics sink shared by the [`Supervisor`] (writer) and
//! the HTTP server (reader). It owns its own registry; nothing is registered
//! globally.
//!
//! [`Supervisor`]: crate::supervisor::Supervisor

mod http;

use std::sync::{PoisonError, RwLock};

use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::Result;
use crate::supervisor::TelemetrySink;
use crate::types::{ModuleReading, TelemetryFrame};

pub use http::{INVERTER_PATH, router, serve};

/// Prefix of every exported metric.
pub const NAMESPACE: &str = "openevt";

const MODULE_LABELS: &[&str] = &["address", "inverter_id", "module", "module_id"];
const INVERTER_LABELS: &[&str] = &["address", "inverter_id"];

/// Per-module gauges, one per physical quantity.
struct ModuleGauges {
    input_voltage_dc: GaugeVec,
    output_power_ac: GaugeVec,
    total_energy: GaugeVec,
    temperature: GaugeVec,
    output_voltage_ac: GaugeVec,
    output_frequency_ac: GaugeVec,
}

impl ModuleGauges {
    fn new(registry: &Registry) -> Result<Self> {
        Ok(Self {
            input_voltage_dc: module_gauge(registry, "input_voltage_dc_volts", "DC input voltage")?,
            output_power_ac: module_gauge(registry, "output_power_ac_watts", "AC output power")?,
            total_energy: module_gauge(
                registry,
                "total_energy_kilowatt_hours",
                "Cumulative energy produced",
            )?,
            temperature: module_gauge(registry, "temperature_celsius", "Module temperature")?,
            output_voltage_ac: module_gauge(
                registry,
                "output_voltage_ac_volts",
                "AC output voltage",
            )?,
            output_frequency_ac: module_gauge(
                registry,
                "output_frequency_ac_hertz",
                "AC output frequency",
            )?,
        })
    }

    fn set(&self, labels: &[&str], reading: &ModuleReading) {
        self.input_voltage_dc
            .with_label_values(labels)
            .set(reading.input_voltage_dc);
        self.output_power_ac
            .with_label_values(labels)
            .set(reading.output_power_ac);
        self.total_energy
            .with_label_values(labels)
            .set(reading.total_energy);
        self.temperature
            .with_label_values(labels)
            .set(reading.temperature);
        self.output_voltage_ac
            .with_label_values(labels)
            .set(reading.output_voltage_ac);
        self.output_frequency_ac
            .with_label_values(labels)
            .set(reading.output_frequency_ac);
    }
}

fn module_gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(
        Opts::new(name, help).namespace(NAMESPACE).subsystem("module"),
        MODULE_LABELS,
    )?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Metrics sink and latest-value store for one process.
pub struct Exporter {
    registry: Registry,
    modules: ModuleGauges,
    connected: GaugeVec,
    frames: IntCounterVec,
    latest: RwLock<Option<TelemetryFrame>>,
}

impl Exporter {
    /// Creates an exporter with a fresh registry.
    ///
    /// With `process_metrics`, resident memory, CPU time and file descriptor
    /// metrics of this process are exported as well (Linux only).
    pub fn new(process_metrics: bool) -> Result<Self> {
        let registry = Registry::new();

        let modules = ModuleGauges::new(&registry)?;

        let connected = GaugeVec::new(
            Opts::new(
                "inverter_connected",
                "Inverter connection status (1=connected, 0=disconnected)",
            )
            .namespace(NAMESPACE),
            INVERTER_LABELS,
        )?;
        registry.register(Box::new(connected.clone()))?;

        let frames = IntCounterVec::new(
            Opts::new("frames_total", "Status frames decoded").namespace(NAMESPACE),
            INVERTER_LABELS,
        )?;
        registry.register(Box::new(frames.clone()))?;

        if process_metrics {
            register_process_collector(&registry)?;
        }

        Ok(Self {
            registry,
            modules,
            connected,
            frames,
            latest: RwLock::new(None),
        })
    }

    /// Returns the most recently published frame.
    #[must_use]
    pub fn latest(&self) -> Option<TelemetryFrame> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Renders all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(target_os = "linux")]
fn register_process_collector(registry: &Registry) -> Result<()> {
    let collector = prometheus::process_collector::ProcessCollector::for_self();
    registry.register(Box::new(collector))?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_registry: &Registry) -> Result<()> {
    tracing::debug!("process metrics are only available on Linux");
    Ok(())
}

impl TelemetrySink for Exporter {
    fn publish(&self, address: &str, frame: &TelemetryFrame) {
        for (module, reading) in ["1", "2"].into_iter().zip(frame.modules()) {
            self.modules.set(
                &[address, &frame.inverter_id, module, &reading.module_id],
                reading,
            );
        }
        self.frames
            .with_label_values(&[address, &frame.inverter_id])
            .inc();

        let mut latest = self
            .latest
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *latest = Some(frame.clone());
    }

    fn connection_status(&self, address: &str, inverter_id: &str, connected: bool) {
        self.connected
            .with_label_values(&[address, inverter_id])
            .set(if connected { 1.0 } else { 0.0 });
    }
}
