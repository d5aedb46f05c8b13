//! Making sense of printer status reports.

use std::{collections::BTreeMap, fmt};

use bambulabs::{message::PushStatus, Report};
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Printer model, as far as it can be told from the serial number.
#[derive(Copy, Clone, Debug, Deserialize, Serialize, Display, FromStr, PartialEq, Eq)]
pub enum PrinterModel {
    /// A1.
    A1,
    /// A1 mini.
    #[serde(rename = "A1 mini")]
    #[display("A1 mini")]
    A1Mini,
    /// P1P.
    P1P,
    /// P1S.
    P1S,
    /// X1.
    X1,
    /// X1E.
    X1E,
    /// X1 Carbon.
    #[serde(rename = "X1 Carbon")]
    #[display("X1 Carbon")]
    X1Carbon,
}

/// Serial prefixes, per <https://wiki.bambulab.com/en/general/find-sn>.
const SERIAL_PREFIXES: [(&str, PrinterModel); 7] = [
    ("039", PrinterModel::A1),
    ("030", PrinterModel::A1Mini),
    ("01S", PrinterModel::P1P),
    ("01P", PrinterModel::P1S),
    ("03W", PrinterModel::X1E),
    ("00W", PrinterModel::X1),
    ("00M", PrinterModel::X1Carbon),
];

impl PrinterModel {
    /// Look the model up by serial prefix.
    pub fn from_serial(serial: &str) -> Option<Self> {
        let serial = serial.trim().to_ascii_uppercase();
        SERIAL_PREFIXES
            .iter()
            .find(|(prefix, _)| serial.starts_with(prefix))
            .map(|(_, model)| *model)
    }
}

/// Scalar fields of the `print` object worth showing.
pub const USEFUL_FIELDS: &[&str] = &[
    "printer_type",
    "model",
    "gcode_state",
    "print_type",
    "home_flag",
    "bed_temper",
    "bed_target_temper",
    "nozzle_temper",
    "nozzle_target_temper",
    "chamber_temper",
    "sub1g_bed_target_temper",
    "ams_status",
    "ams_rfid_status",
    "cali_flag",
    "wifi_signal",
    "module_offline",
    "fan_gear",
    "aux_part_fan",
    "chamber_fan",
    "print_error",
    "print_process_remain",
    "print_real_action",
    "command",
    "camera_nozzle_vision_calibration",
    "lifecycle",
    "design_name",
    "design_checksum",
    "model_id",
    "build_plate",
    "build_plate_type",
];

/// The useful fields of a report, plus `serial` and `ip`. Objects and arrays
/// are left out.
pub fn extract_printer_info(report: &Report, host: &str) -> BTreeMap<String, Value> {
    let mut info = BTreeMap::new();
    if let Some(serial) = &report.serial {
        info.insert("serial".to_string(), Value::from(serial.as_str()));
    }
    info.insert("ip".to_string(), Value::from(host));

    if let Some(print) = report.print_object() {
        for field in USEFUL_FIELDS {
            match print.get(*field) {
                Some(Value::Object(_) | Value::Array(_)) | None => {}
                Some(value) => {
                    info.insert(field.to_string(), value.clone());
                }
            }
        }
    }

    info
}

const MAX_SUBKEYS: usize = 10;
const MAX_STRING_CHARS: usize = 50;

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        _ => None,
    }
}

/// An overview of the top-level keys of a payload, one line per entry,
/// sorted by key.
pub fn describe_fields(value: &Value) -> Vec<String> {
    let Some(object) = value.as_object() else {
        return vec![format!("payload is a {}", kind(value))];
    };

    let mut keys: Vec<&String> = object.keys().collect();
    keys.sort();

    let mut lines = Vec::new();
    for key in keys {
        match &object[key.as_str()] {
            Value::Object(inner) => {
                lines.push(format!("{}: {{dict with {} keys}}", key, inner.len()));
                let mut subkeys: Vec<&String> = inner.keys().collect();
                subkeys.sort();
                for subkey in subkeys.iter().take(MAX_SUBKEYS) {
                    let sub = &inner[subkey.as_str()];
                    let shown = scalar(sub).unwrap_or_else(|| kind(sub).to_string());
                    lines.push(format!("  - {}: {}", subkey, shown));
                }
                if inner.len() > MAX_SUBKEYS {
                    lines.push(format!("  ... and {} more keys", inner.len() - MAX_SUBKEYS));
                }
            }
            Value::Array(items) => lines.push(format!("{}: [list with {} items]", key, items.len())),
            Value::String(s) if s.chars().count() > MAX_STRING_CHARS => {
                let head: String = s.chars().take(MAX_STRING_CHARS).collect();
                lines.push(format!("{}: '{}...'", key, head));
            }
            Value::String(s) => lines.push(format!("{}: '{}'", key, s)),
            other => lines.push(format!("{}: {}", key, other)),
        }
    }
    lines
}

/// Human readable summary of the key print fields.
#[derive(Debug, Clone, Copy)]
pub struct StatusSummary<'a>(pub &'a PushStatus);

fn or_zero<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "0".to_string(), |v| v.to_string())
}

impl fmt::Display for StatusSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        writeln!(f, "State: {}", s.gcode_state.as_deref().unwrap_or("unknown"))?;
        writeln!(f, "Progress: {}%", or_zero(s.mc_percent))?;
        writeln!(f, "Layer: {}/{}", or_zero(s.layer_num), or_zero(s.total_layer_num))?;
        writeln!(f, "Remaining: {} min", or_zero(s.mc_remaining_time))?;
        writeln!(
            f,
            "Nozzle: {}°C / {}°C",
            or_zero(s.nozzle_temper),
            or_zero(s.nozzle_target_temper)
        )?;
        writeln!(f, "Bed: {}°C / {}°C", or_zero(s.bed_temper), or_zero(s.bed_target_temper))?;
        writeln!(f, "File: {}", s.gcode_file.as_deref().unwrap_or("none"))?;
        write!(f, "WiFi: {}", s.wifi_signal.as_deref().unwrap_or("unknown"))
    }
}
