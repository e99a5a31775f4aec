// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder bridge

/// A typed AlarmDecoder notification.
///
/// The notification listener parses incoming messages into these and hands
/// them to the bridge through a [`NotificationSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// "The alarm system has ..." (armed, disarmed, triggered, stopped signaling).
    /// Carries no payload: the panel state is re-read from the controller.
    PanelStatusChanged,
    /// "There is a fire!"
    FireAlarm,
    /// "Zone <fullname> (<id>) has been <faulted|restored>."
    ZoneChanged {
        fullname: String,
        id: String,
        faulted: bool,
    },
    /// Anything else. `parse_failed` is set when the message looked like a
    /// zone notification but did not match its pattern.
    Unrecognized { raw: String, parse_failed: bool },
}

/// Type alias for the notification sender.
pub type NotificationSender = tokio::sync::mpsc::Sender<NotificationEvent>;

/// Type alias for the notification receiver.
pub type NotificationReceiver = tokio::sync::mpsc::Receiver<NotificationEvent>;

/// Create a new notification channel with the given capacity.
pub fn notification_channel(capacity: usize) -> (NotificationSender, NotificationReceiver) {
    tokio::sync::mpsc::channel(capacity)
}
