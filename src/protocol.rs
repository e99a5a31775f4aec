// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder notification messages

use serde::Deserialize;

use crate::event::NotificationEvent;

/// Notification message prefixes, as produced by AlarmDecoder's default
/// custom-notification templates.
///
/// ```text
/// The alarm system has been triggered on zone {zone_name} ({zone})!
/// The alarm system has stopped signaling the alarm for zone {zone_name} ({zone}).
/// The alarm system has been armed.
/// The alarm system has been disarmed.
/// There is a fire!
/// Zone {zone_name} ({zone}) has been faulted.
/// Zone {zone_name} ({zone}) has been restored.
/// ```
pub const PANEL_STATUS_PREFIX: &str = "The alarm system has";
pub const FIRE_PREFIX: &str = "There is a fire!";
pub const ZONE_PREFIX: &str = "Zone ";

const ZONE_STATE_MARKER: &str = ") has been ";

/// Parse a notification message into a typed event. The first matching
/// prefix wins; unknown messages are [`NotificationEvent::Unrecognized`].
pub fn parse_notification(message: &str) -> NotificationEvent {
    if message.starts_with(PANEL_STATUS_PREFIX) {
        NotificationEvent::PanelStatusChanged
    } else if message.starts_with(FIRE_PREFIX) {
        NotificationEvent::FireAlarm
    } else if message.starts_with(ZONE_PREFIX) {
        match parse_zone_message(message) {
            Some((fullname, id, word)) => NotificationEvent::ZoneChanged {
                fullname: fullname.to_string(),
                id: id.to_string(),
                faulted: word == "faulted",
            },
            None => NotificationEvent::Unrecognized {
                raw: message.to_string(),
                parse_failed: true,
            },
        }
    } else {
        NotificationEvent::Unrecognized {
            raw: message.to_string(),
            parse_failed: false,
        }
    }
}

/// Match `Zone <fullname> (<id>) has been <word>`.
///
/// The name is greedy, so the last `(<digits>) has been` in the message is
/// the one used. The id is one or more ASCII digits kept verbatim; the word
/// is zero or more word characters (`restored.` yields `restored`).
/// Returns (fullname, id, word).
pub fn parse_zone_message(message: &str) -> Option<(&str, &str, &str)> {
    let rest = message.strip_prefix(ZONE_PREFIX)?;

    for (pos, _) in rest.rmatch_indices(ZONE_STATE_MARKER) {
        let head = &rest[..pos];
        let Some(open) = head.rfind(" (") else {
            continue;
        };
        let id = &head[open + 2..];
        let fullname = &head[..open];
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if fullname.is_empty() || fullname.contains(['\n', '\r']) {
            continue;
        }

        let tail = &rest[pos + ZONE_STATE_MARKER.len()..];
        let word_len = tail
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        return Some((fullname, id, &tail[..word_len]));
    }
    None
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

/// Extract the `message` field from a notification request body.
///
/// JSON and `application/x-www-form-urlencoded` bodies are accepted. When
/// the content type is missing or unknown, JSON is tried first.
pub fn decode_message_body(content_type: Option<&str>, body: &[u8]) -> Option<String> {
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    if content_type.contains("x-www-form-urlencoded") {
        decode_form(body)
    } else if content_type.contains("json") {
        decode_json(body)
    } else {
        decode_json(body).or_else(|| decode_form(body))
    }
}

fn decode_json(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<MessageBody>(body)
        .ok()
        .map(|b| b.message)
}

fn decode_form(body: &[u8]) -> Option<String> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
        .ok()?
        .into_iter()
        .find(|(key, _)| key == "message")
        .map(|(_, value)| value)
}
