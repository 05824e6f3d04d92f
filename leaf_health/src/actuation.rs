// THEORY:
// A classification is often the trigger for something physical: a watering pump
// behind a small HTTP board, or a microcontroller listening on a serial line.
// This module holds the policy side of that (which command a label maps to)
// and fans a result out to a set of actuators, keeping their failures next to
// (never inside) the classification.
//
// Anything that can turn a label into a side effect implements `Actuator`.
// Two come built in: `PumpSwitch` reports the pump state, and `SerialLine`
// writes a command line to any `Write` sink, typically a serial device node.

use crate::core_modules::decision::HealthLabel;
use crate::error::ActuationError;
use crate::pipeline::ClassificationResult;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

pub const ENV_CMD_HEALTHY: &str = "LEAF_CMD_HEALTHY";
pub const ENV_CMD_MODERATE: &str = "LEAF_CMD_MODERATE";
pub const ENV_CMD_UNHEALTHY: &str = "LEAF_CMD_UNHEALTHY";

/// Desired pump state. Anything short of healthy asks for water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpCommand {
    On,
    Off,
}

impl PumpCommand {
    pub fn for_label(label: HealthLabel) -> Self {
        match label {
            HealthLabel::Unhealthy | HealthLabel::Moderate => PumpCommand::On,
            HealthLabel::Healthy => PumpCommand::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PumpCommand::On => "on",
            PumpCommand::Off => "off",
        }
    }
}

impl fmt::Display for PumpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label to text command for line-oriented serial devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialCommandMap {
    pub healthy: String,
    pub moderate: String,
    pub unhealthy: String,
}

impl Default for SerialCommandMap {
    fn default() -> Self {
        Self {
            healthy: HealthLabel::Healthy.as_str().to_owned(),
            moderate: HealthLabel::Moderate.as_str().to_owned(),
            unhealthy: HealthLabel::Unhealthy.as_str().to_owned(),
        }
    }
}

impl SerialCommandMap {
    /// Reads overrides from `LEAF_CMD_HEALTHY`, `LEAF_CMD_MODERATE` and
    /// `LEAF_CMD_UNHEALTHY`; unset variables keep the label name.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            healthy: lookup(ENV_CMD_HEALTHY).unwrap_or(defaults.healthy),
            moderate: lookup(ENV_CMD_MODERATE).unwrap_or(defaults.moderate),
            unhealthy: lookup(ENV_CMD_UNHEALTHY).unwrap_or(defaults.unhealthy),
        }
    }

    pub fn command_for(&self, label: HealthLabel) -> &str {
        match label {
            HealthLabel::Healthy => &self.healthy,
            HealthLabel::Moderate => &self.moderate,
            HealthLabel::Unhealthy => &self.unhealthy,
        }
    }

    /// Newline-terminated bytes ready to write to the wire.
    pub fn payload_for(&self, label: HealthLabel) -> Vec<u8> {
        let mut payload = self.command_for(label).as_bytes().to_vec();
        payload.push(b'\n');
        payload
    }
}

/// Something that turns a health label into a side effect.
pub trait Actuator {
    fn name(&self) -> &str;

    /// Performs the action and returns the command that was sent.
    fn actuate(&self, label: HealthLabel) -> Result<String, ActuationError>;
}

/// Reports the pump state a label calls for. The pump board itself is reached
/// by whoever consumes the outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct PumpSwitch;

impl Actuator for PumpSwitch {
    fn name(&self) -> &str {
        "pump"
    }

    fn actuate(&self, label: HealthLabel) -> Result<String, ActuationError> {
        Ok(PumpCommand::for_label(label).to_string())
    }
}

/// Writes the mapped command, newline terminated, to a line-oriented sink such
/// as a serial device node.
pub struct SerialLine<W: Write> {
    name: String,
    commands: SerialCommandMap,
    sink: RefCell<W>,
}

impl<W: Write> SerialLine<W> {
    pub fn new(name: impl Into<String>, commands: SerialCommandMap, sink: W) -> Self {
        Self {
            name: name.into(),
            commands,
            sink: RefCell::new(sink),
        }
    }

    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }
}

impl<W: Write + 'static> SerialLine<W> {
    /// Erases the sink type so lines over different sinks can share a binding.
    pub fn boxed(self) -> SerialLine<Box<dyn Write>> {
        SerialLine {
            name: self.name,
            commands: self.commands,
            sink: RefCell::new(Box::new(self.sink.into_inner())),
        }
    }
}

impl SerialLine<File> {
    /// Opens an existing device (or file) for writing.
    pub fn open(path: &Path, commands: SerialCommandMap) -> Result<Self, ActuationError> {
        let name = format!("serial:{}", path.display());
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|err| ActuationError::Unavailable {
                actuator: name.clone(),
                reason: err.to_string(),
            })?;
        Ok(Self::new(name, commands, file))
    }
}

impl<W: Write> Actuator for SerialLine<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn actuate(&self, label: HealthLabel) -> Result<String, ActuationError> {
        let command = self.commands.command_for(label).to_owned();
        let mut sink = self.sink.borrow_mut();
        sink.write_all(&self.commands.payload_for(label))
            .and_then(|_| sink.flush())
            .map_err(|err| ActuationError::Rejected {
                actuator: self.name.clone(),
                command: command.clone(),
                reason: err.to_string(),
            })?;
        Ok(command)
    }
}

/// What happened when one actuator was asked to act on a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActuationOutcome {
    pub actuator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs every actuator once, in order. One failing actuator does not stop the
/// others.
pub fn dispatch(result: &ClassificationResult, actuators: &[&dyn Actuator]) -> Vec<ActuationOutcome> {
    actuators
        .iter()
        .map(|actuator| match actuator.actuate(result.label) {
            Ok(command) => {
                info!(actuator = actuator.name(), %command, label = %result.label, "actuated");
                ActuationOutcome {
                    actuator: actuator.name().to_owned(),
                    command: Some(command),
                    error: None,
                }
            }
            Err(err) => {
                warn!(actuator = actuator.name(), error = %err, "actuation failed");
                ActuationOutcome {
                    actuator: actuator.name().to_owned(),
                    command: None,
                    error: Some(err.to_string()),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::HealthMetrics;
    use std::collections::HashMap;

    fn result_with(label: HealthLabel) -> ClassificationResult {
        ClassificationResult {
            label,
            confidence: 0.8,
            metrics: HealthMetrics {
                green_ratio: 0.5,
                yellow_ratio: 0.2,
                necrosis_ratio: 0.1,
                stress_ratio: 0.3,
                edge_ratio: 0.1,
                pixels: 100,
            },
        }
    }

    struct Recorder {
        sent: RefCell<Vec<String>>,
    }

    impl Actuator for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn actuate(&self, label: HealthLabel) -> Result<String, ActuationError> {
            let command = PumpCommand::for_label(label).to_string();
            self.sent.borrow_mut().push(command.clone());
            Ok(command)
        }
    }

    struct Offline;

    impl Actuator for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn actuate(&self, _label: HealthLabel) -> Result<String, ActuationError> {
            Err(ActuationError::Unavailable {
                actuator: "offline".into(),
                reason: "no device".into(),
            })
        }
    }

    #[test]
    fn pump_runs_unless_healthy() {
        assert_eq!(PumpCommand::for_label(HealthLabel::Unhealthy), PumpCommand::On);
        assert_eq!(PumpCommand::for_label(HealthLabel::Moderate), PumpCommand::On);
        assert_eq!(PumpCommand::for_label(HealthLabel::Healthy), PumpCommand::Off);
        assert_eq!(PumpCommand::On.to_string(), "on");
        assert_eq!(serde_json::to_string(&PumpCommand::Off).unwrap(), "\"off\"");
    }

    #[test]
    fn serial_map_defaults_and_overrides() {
        let defaults = SerialCommandMap::default();
        assert_eq!(defaults.command_for(HealthLabel::Moderate), "moderate");

        let env: HashMap<&str, &str> = [(ENV_CMD_UNHEALTHY, "WATER")].into_iter().collect();
        let map = SerialCommandMap::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(map.command_for(HealthLabel::Unhealthy), "WATER");
        assert_eq!(map.command_for(HealthLabel::Healthy), "healthy");
        assert_eq!(map.payload_for(HealthLabel::Unhealthy), b"WATER\n".to_vec());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "device gone"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn serial_line_writes_terminated_commands() {
        let line = SerialLine::new("serial", SerialCommandMap::default(), Vec::new());
        assert_eq!(line.actuate(HealthLabel::Healthy).unwrap(), "healthy");
        assert_eq!(line.actuate(HealthLabel::Unhealthy).unwrap(), "unhealthy");
        assert_eq!(line.into_inner(), b"healthy\nunhealthy\n".to_vec());
    }

    #[test]
    fn serial_write_failure_is_reported_next_to_the_result() {
        let result = result_with(HealthLabel::Unhealthy);
        let line = SerialLine::new("serial", SerialCommandMap::default(), BrokenPipe);
        let outcomes = dispatch(&result, &[&PumpSwitch, &line]);

        assert_eq!(outcomes[0].actuator, "pump");
        assert_eq!(outcomes[0].command.as_deref(), Some("on"));
        assert_eq!(outcomes[1].actuator, "serial");
        assert!(outcomes[1].command.is_none());
        let error = outcomes[1].error.as_deref().unwrap();
        assert!(error.contains("unhealthy") && error.contains("device gone"), "{error}");
    }

    #[test]
    fn boxed_line_keeps_name_and_commands() {
        let env: HashMap<&str, &str> = [(ENV_CMD_HEALTHY, "DRY")].into_iter().collect();
        let map = SerialCommandMap::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        let line = SerialLine::new("bench", map, std::io::sink()).boxed();
        assert_eq!(line.name(), "bench");
        assert_eq!(line.actuate(HealthLabel::Healthy).unwrap(), "DRY");
    }

    #[test]
    fn missing_serial_device_is_unavailable() {
        let err = SerialLine::open(Path::new("/nonexistent/tty-leaf"), SerialCommandMap::default())
            .err()
            .unwrap();
        assert!(matches!(err, ActuationError::Unavailable { .. }));
    }

    #[test]
    fn dispatch_reports_each_actuator() {
        let recorder = Recorder {
            sent: RefCell::new(Vec::new()),
        };
        let result = result_with(HealthLabel::Moderate);
        let outcomes = dispatch(&result, &[&Offline, &recorder]);

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].actuator, "offline");
        assert!(outcomes[0].command.is_none());
        assert!(outcomes[0].error.as_deref().unwrap().contains("no device"));
        assert_eq!(outcomes[1].command.as_deref(), Some("on"));
        assert_eq!(*recorder.sent.borrow(), vec!["on".to_string()]);
        // The result itself is untouched.
        assert_eq!(result, result_with(HealthLabel::Moderate));
    }
}
