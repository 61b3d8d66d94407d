//! Decoded inverter telemetry.

use std::fmt;

use serde::Serialize;

/// Snapshot of one inverter at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryFrame {
    /// Inverter identifier as lowercase hex.
    pub inverter_id: String,
    /// First DC input channel.
    pub module1: ModuleReading,
    /// Second DC input channel.
    pub module2: ModuleReading,
}

impl TelemetryFrame {
    /// Both module readings, in channel order.
    #[must_use]
    pub const fn modules(&self) -> [&ModuleReading; 2] {
        [&self.module1, &self.module2]
    }

    /// Combined AC output power in watts.
    #[must_use]
    pub fn total_power_ac(&self) -> f64 {
        self.module1.output_power_ac + self.module2.output_power_ac
    }

    /// Combined cumulative energy in kilowatt-hours.
    #[must_use]
    pub fn total_energy(&self) -> f64 {
        self.module1.total_energy + self.module2.total_energy
    }
}

impl fmt::Display for TelemetryFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Inverter [{}] Status", self.inverter_id)?;
        writeln!(f, ">>>>        Total Energy: {:.6}kWh", self.total_energy())?;
        writeln!(f, ">>>>       Current Power: {:.6}W", self.total_power_ac())?;
        write!(f, "{}{}", self.module1, self.module2)
    }
}

/// Readings of one DC input channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleReading {
    /// Module identifier as lowercase hex.
    pub module_id: String,
    /// Firmware version as `major/minor`.
    pub firmware_version: String,
    /// DC input voltage (V).
    pub input_voltage_dc: f64,
    /// AC output power (W).
    pub output_power_ac: f64,
    /// Cumulative energy (kWh).
    pub total_energy: f64,
    /// Temperature (°C).
    pub temperature: f64,
    /// AC output voltage (V).
    pub output_voltage_ac: f64,
    /// AC output frequency (Hz).
    pub output_frequency_ac: f64,
}

impl fmt::Display for ModuleReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "> Module [{}]", self.module_id)?;
        writeln!(f, ">>>>    Firmware Version: {}", self.firmware_version)?;
        writeln!(f, ">>>>        Total Energy: {:.6}kWh", self.total_energy)?;
        writeln!(f, ">>>>    Input Voltage DC: {:.6}V", self.input_voltage_dc)?;
        writeln!(f, ">>>>   Output Voltage AC: {:.6}V", self.output_voltage_ac)?;
        writeln!(f, ">>>>     Output Power AC: {:.6}W", self.output_power_ac)?;
        writeln!(f, ">>>> Output Frequency AC: {:.6}Hz", self.output_frequency_ac)?;
        writeln!(f, ">>>>         Temperature: {:.6}°C", self.temperature)
    }
}
