//! The message parser.

use serde_json::Value;

use crate::message::Message;

/// A single publish received on a `device/<serial>/report` topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// The topic the report arrived on.
    pub topic: String,
    /// The printer serial, taken from the second topic segment.
    pub serial: Option<String>,
    /// The size of the raw payload, in bytes.
    pub payload_len: usize,
    /// The payload as untyped JSON, when it is JSON at all.
    pub raw: Option<Value>,
    /// The payload as a typed message.
    pub message: Message,
}

impl Report {
    /// The `print` object of the raw payload, if there is one.
    pub fn print_object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.raw.as_ref()?.get("print")?.as_object()
    }
}

/// Extract the serial from a `device/<serial>/report` topic.
pub fn serial_from_topic(topic: &str) -> Option<&str> {
    let mut parts = topic.split('/');
    parts.next()?;
    parts.next().filter(|serial| !serial.is_empty())
}

/// Turn an event from the MQTT event loop into a [`Report`]. Anything other
/// than an incoming publish yields `None`.
pub fn parse_report(event: &rumqttc::Event) -> Option<Report> {
    match event {
        rumqttc::Event::Incoming(rumqttc::Packet::Publish(publish)) => {
            Some(parse_publish(&publish.topic, &publish.payload))
        }
        _ => None,
    }
}

pub(crate) fn parse_publish(topic: &str, payload: &[u8]) -> Report {
    Report {
        topic: topic.to_string(),
        serial: serial_from_topic(topic).map(str::to_string),
        payload_len: payload.len(),
        raw: serde_json::from_slice::<Value>(payload).ok(),
        message: parse_message(payload),
    }
}

pub(crate) fn parse_message(payload: &[u8]) -> Message {
    let Ok(payload) = std::str::from_utf8(payload) else {
        return Message::Unknown(None);
    };

    match serde_json::from_str::<Message>(payload)
        .map_err(|err| format_serde_error::SerdeError::new(payload.to_string(), err))
    {
        Ok(message) => message,
        Err(err) => {
            tracing::debug!("report is not a modelled message: {}", err);
            match serde_json::from_str::<Value>(payload) {
                Ok(value) => Message::Json(value),
                Err(_) => Message::Unknown(Some(payload.to_string())),
            }
        }
    }
}
