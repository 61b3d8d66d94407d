//! Command-line configuration for the `openevt` binary.

use std::time::Duration;

use clap::Parser;

use crate::error::{Error, Result};
use crate::exporter::INVERTER_PATH;

/// Envertec EVT microinverter exporter.
#[derive(Debug, Clone, Parser)]
#[command(name = "openevt", version, about)]
pub struct Args {
    /// Serial number of your microinverter (e.g. 31583078)
    #[arg(long = "serial-number", env = "OPENEVT_SERIAL_NUMBER")]
    pub serial_number: String,

    /// Address and port of the microinverter (e.g. 192.0.2.1:14889)
    #[arg(long = "addr", env = "OPENEVT_ADDR")]
    pub address: String,

    /// Poll the inverter whenever it stays silent this long (0s waits indefinitely)
    #[arg(
        long = "poll-interval",
        env = "OPENEVT_POLL_INTERVAL",
        default_value = "0s",
        value_parser = humantime::parse_duration
    )]
    pub poll_interval: Duration,

    /// Interval between connection attempts (e.g. 1m)
    #[arg(
        long = "reconnect-interval",
        env = "OPENEVT_RECONNECT_INTERVAL",
        default_value = "1m",
        value_parser = humantime::parse_duration
    )]
    pub reconnect_interval: Duration,

    /// Address on which to expose metrics
    #[arg(
        long = "web.listen-address",
        env = "OPENEVT_LISTEN_ADDRESS",
        default_value = ":9090"
    )]
    pub listen_address: String,

    /// Path under which to expose metrics
    #[arg(
        long = "web.telemetry-path",
        env = "OPENEVT_TELEMETRY_PATH",
        default_value = "/metrics"
    )]
    pub telemetry_path: String,

    /// Exclude metrics about the exporter process itself
    #[arg(
        long = "web.disable-exporter-metrics",
        env = "OPENEVT_DISABLE_EXPORTER_METRICS"
    )]
    pub disable_exporter_metrics: bool,
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Inverter `host:port`.
    pub address: String,
    /// Inverter serial number, validated when the client is built.
    pub serial_number: String,
    /// Read deadline; zero blocks indefinitely.
    pub poll_interval: Duration,
    /// Wait between connection attempts.
    pub reconnect_interval: Duration,
    /// Exporter listen address in `host:port` form.
    pub listen_address: String,
    /// Metrics path.
    pub telemetry_path: String,
    /// Export process metrics.
    pub process_metrics: bool,
}

impl Args {
    /// Validates the arguments into a [`Config`].
    pub fn into_config(self) -> Result<Config> {
        if self.address.trim().is_empty() {
            return Err(config_error("--addr must not be empty"));
        }
        if !self.telemetry_path.starts_with('/') {
            return Err(config_error(format!(
                "--web.telemetry-path must start with '/', got {:?}",
                self.telemetry_path
            )));
        }
        if self.telemetry_path == INVERTER_PATH {
            return Err(config_error(format!(
                "--web.telemetry-path must not be {INVERTER_PATH}"
            )));
        }

        Ok(Config {
            address: self.address,
            serial_number: self.serial_number,
            poll_interval: self.poll_interval,
            reconnect_interval: self.reconnect_interval,
            listen_address: normalize_listen_address(&self.listen_address),
            telemetry_path: self.telemetry_path,
            process_metrics: !self.disable_exporter_metrics,
        })
    }
}

/// Expands a bare `:port` to all interfaces.
fn normalize_listen_address(address: &str) -> String {
    if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_owned()
    }
}

fn config_error(message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "openevt",
            "--serial-number",
            "31583078",
            "--addr",
            "192.0.2.1:14889",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).into_config().unwrap();
        assert_eq!(config.address, "192.0.2.1:14889");
        assert_eq!(config.serial_number, "31583078");
        assert_eq!(config.poll_interval, Duration::ZERO);
        assert_eq!(config.reconnect_interval, Duration::from_secs(60));
        assert_eq!(config.listen_address, "0.0.0.0:9090");
        assert_eq!(config.telemetry_path, "/metrics");
        assert!(config.process_metrics);
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--poll-interval",
            "30s",
            "--reconnect-interval",
            "5m",
            "--web.listen-address",
            "127.0.0.1:8080",
            "--web.telemetry-path",
            "/probe",
            "--web.disable-exporter-metrics",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.reconnect_interval, Duration::from_secs(300));
        assert_eq!(config.listen_address, "127.0.0.1:8080");
        assert_eq!(config.telemetry_path, "/probe");
        assert!(!config.process_metrics);
    }

    #[test]
    fn test_serial_is_not_validated_here() {
        let args = Args::try_parse_from(["openevt", "--serial-number", "abc", "--addr", "h:1"])
            .unwrap();
        assert!(args.into_config().is_ok());
    }

    #[test]
    fn test_rejects_bad_paths() {
        for path in ["metrics", "/inverter"] {
            let err = parse(&["--web.telemetry-path", path])
                .into_config()
                .unwrap_err();
            assert!(matches!(err, Error::Config { .. }));
        }
    }

    #[test]
    fn test_rejects_bad_duration() {
        assert!(
            Args::try_parse_from([
                "openevt",
                "--serial-number",
                "31583078",
                "--addr",
                "h:1",
                "--poll-interval",
                "soon"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_missing_required_flags() {
        assert!(Args::try_parse_from(["openevt", "--addr", "h:1"]).is_err());
    }
}
