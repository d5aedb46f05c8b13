//! A message from the printer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sequence_id::SequenceId;

/// A message published by the printer on its report topic.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Message {
    /// A print message.
    Print(Print),
    /// Valid JSON that is not one of the messages modelled here.
    Json(Value),
    /// The message could not be parsed. The `Option<String>` contains the raw message.
    /// If the message could not be parsed as a string, the `Option` will be `None`.
    Unknown(Option<String>),
}

impl Message {
    /// Returns the sequence id of the message.
    pub fn sequence_id(&self) -> Option<SequenceId> {
        match self {
            Message::Print(print) => Some(print.sequence_id()),
            Message::Json(_) | Message::Unknown(_) => None,
        }
    }

    /// Returns the push status carried by this message, if any.
    pub fn push_status(&self) -> Option<&PushStatus> {
        match self {
            Message::Print(Print::PushStatus(status)) => Some(status),
            _ => None,
        }
    }
}

impl From<Print> for Message {
    fn from(print: Print) -> Self {
        Message::Print(print)
    }
}

/// A print message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum Print {
    /// The status of the printer and the current job.
    PushStatus(PushStatus),
}

impl Print {
    /// Returns the sequence id of the message.
    pub fn sequence_id(&self) -> SequenceId {
        match self {
            Print::PushStatus(push_status) => push_status.sequence_id.clone(),
        }
    }
}

/// A push status message.
///
/// Printers send the full object in answer to `pushall` and partial updates
/// afterwards, so everything except the sequence id is optional. Fields that
/// are not modelled are kept in `other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushStatus {
    /// The sequence id.
    pub sequence_id: SequenceId,
    /// The gcode state, e.g. `RUNNING`, `PAUSE`, `FINISH` or `IDLE`.
    pub gcode_state: Option<String>,
    /// The percentage of the print completed.
    pub mc_percent: Option<i64>,
    /// The remaining time of the print, in minutes.
    pub mc_remaining_time: Option<i64>,
    /// The layer num.
    pub layer_num: Option<i64>,
    /// The total layer num.
    pub total_layer_num: Option<i64>,
    /// The nozzle temperature.
    pub nozzle_temper: Option<f64>,
    /// The target nozzle temperature.
    pub nozzle_target_temper: Option<f64>,
    /// The bed temperature.
    pub bed_temper: Option<f64>,
    /// The target bed temperature.
    pub bed_target_temper: Option<f64>,
    /// The chamber temperature.
    pub chamber_temper: Option<f64>,
    /// The gcode file.
    pub gcode_file: Option<String>,
    /// When the current job started, as unix seconds in a string.
    pub gcode_start_time: Option<String>,
    /// The subtask name.
    pub subtask_name: Option<String>,
    /// The wifi signal, e.g. `-59dBm`.
    pub wifi_signal: Option<String>,
    /// The print type.
    pub print_type: Option<String>,
    /// The home flag.
    pub home_flag: Option<i64>,
    /// The print error.
    pub print_error: Option<i64>,
    /// The lifecycle.
    pub lifecycle: Option<String>,
    /// The ams status.
    pub ams_status: Option<i64>,
    /// The ams rfid status.
    pub ams_rfid_status: Option<i64>,
    /// The fan gear.
    pub fan_gear: Option<i64>,
    /// The aux part fan.
    pub aux_part_fan: Option<bool>,
    /// The nozzle diameter.
    pub nozzle_diameter: Option<String>,
    /// Sdcard?
    pub sdcard: Option<bool>,
    /// The ipcam.
    pub ipcam: Option<PrintIpcam>,
    #[serde(flatten)]
    other: BTreeMap<String, Value>,
}

impl PushStatus {
    /// Fields present in the report that are not modelled above.
    pub fn other(&self) -> &BTreeMap<String, Value> {
        &self.other
    }
}

/// The print ipcam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintIpcam {
    /// The ipcam dev.
    pub ipcam_dev: Option<String>,
    /// Whether camera recording (and so the thumbnail store) is enabled.
    pub ipcam_record: Option<String>,
    /// The timelapse.
    pub timelapse: Option<String>,
    /// The mode bits.
    pub mode_bits: Option<i64>,
    #[serde(flatten)]
    other: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_deserialize_message_json() {
        let message = r#"{ "hello": "world" }"#;

        let result = serde_json::from_str::<Message>(message);

        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_message_print() {
        let message = r#"{ "print": { "bed_temper": 17.40625, "wifi_signal": "-59dBm", "command": "push_status", "msg": 1, "sequence_id": "2" }}"#;

        let message = serde_json::from_str::<Message>(message).unwrap();

        let status = message.push_status().unwrap();
        assert_eq!(status.bed_temper, Some(17.40625));
        assert_eq!(status.wifi_signal.as_deref(), Some("-59dBm"));
        assert_eq!(status.other().get("msg"), Some(&Value::from(1)));
        assert_eq!(message.sequence_id(), Some(SequenceId::String("2".to_string())));
    }

    #[test]
    fn test_deserialize_other_print_command_fails() {
        let message = r#"{ "print": { "command": "gcode_line", "param": "G28", "sequence_id": 3 }}"#;

        assert!(serde_json::from_str::<Message>(message).is_err());
    }

    #[test]
    fn test_deserialize_full_status() {
        let message = r#"{
            "print": {
                "command": "push_status",
                "sequence_id": "20",
                "gcode_state": "RUNNING",
                "mc_percent": 42,
                "mc_remaining_time": 73,
                "layer_num": 12,
                "total_layer_num": 150,
                "nozzle_temper": 219.9,
                "nozzle_target_temper": 220,
                "bed_temper": 55.0,
                "bed_target_temper": 55,
                "gcode_file": "/data/Metadata/plate_1.gcode",
                "gcode_start_time": "1717236000",
                "ipcam": { "ipcam_record": "enable", "timelapse": "disable", "resolution": "1080p" },
                "hms": []
            }
        }"#;

        let message = serde_json::from_str::<Message>(message).unwrap();
        let status = message.push_status().unwrap();

        assert_eq!(status.gcode_state.as_deref(), Some("RUNNING"));
        assert_eq!(status.mc_percent, Some(42));
        assert_eq!(status.nozzle_target_temper, Some(220.0));
        assert_eq!(status.gcode_start_time.as_deref(), Some("1717236000"));
        assert_eq!(
            status.ipcam.as_ref().and_then(|i| i.ipcam_record.as_deref()),
            Some("enable")
        );
        assert!(status.other().contains_key("hms"));
    }
}
