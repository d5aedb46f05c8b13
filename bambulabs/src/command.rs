//! The requests that can be sent to the printer's `device/<serial>/request`
//! topic.

use serde::{Deserialize, Serialize};

use crate::sequence_id::SequenceId;

/// The commands that can be sent to the printer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// A pushing command.
    Pushing(Pushing),
}

impl Command {
    /// Get the sequence ID.
    pub fn sequence_id(&self) -> &SequenceId {
        match self {
            Command::Pushing(pushing) => pushing.sequence_id(),
        }
    }

    /// Return a command asking the printer to publish its full status.
    ///
    /// Idle printers only publish deltas, so without this a fresh subscriber
    /// may wait a long time for its first report.
    pub fn push_all() -> Self {
        Command::Pushing(Pushing::Pushall(Pushall {
            sequence_id: SequenceId::new(),
        }))
    }
}

/// A pushing command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum Pushing {
    /// Get all device information.
    Pushall(Pushall),
}

impl Pushing {
    /// Get the sequence ID.
    pub fn sequence_id(&self) -> &SequenceId {
        match self {
            Pushing::Pushall(Pushall { sequence_id }) => sequence_id,
        }
    }
}

/// The payload for getting all device information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pushall {
    /// The sequence ID.
    pub sequence_id: SequenceId,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_serialize_pushall() {
        let command = Command::Pushing(Pushing::Pushall(Pushall {
            sequence_id: SequenceId::String("0".to_string()),
        }));
        let payload = serde_json::to_string(&command).unwrap();
        assert_eq!(payload, r#"{"pushing":{"command":"pushall","sequence_id":"0"}}"#);
    }

    #[test]
    fn test_deserialize_pushall_with_numeric_id() {
        let payload = r#"{"pushing": {"sequence_id": 12, "command": "pushall"}}"#;
        let command: Command = serde_json::from_str(payload).unwrap();
        let Command::Pushing(Pushing::Pushall(Pushall { sequence_id })) = command;
        assert_eq!(sequence_id, SequenceId::Integer(12));
    }

    #[test]
    fn test_push_all_carries_its_sequence_id() {
        let command = Command::push_all();
        let payload = serde_json::to_value(&command).unwrap();
        assert_eq!(
            payload["pushing"]["sequence_id"],
            serde_json::to_value(command.sequence_id()).unwrap()
        );
    }
}
