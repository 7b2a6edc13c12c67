use serde::Serialize;
use serde_json::Value;

/// Every kind of event that can be sent to a group.
///
/// Each kind maps to exactly one render routine in
/// [`Consumer::render`](crate::consumer::Consumer::render); adding a kind
/// without handling it there is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SendProductNotification,
}

impl EventKind {
    /// Name of the subscriber-side handler for this kind.
    pub fn handler_name(&self) -> &'static str {
        match self {
            EventKind::SendProductNotification => "send_product_notification",
        }
    }
}

/// An ephemeral event published to a group. Never stored; subscribers that
/// join after it has been fanned out do not see it.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEvent {
    pub kind: EventKind,
    pub message: Value,
}

impl GroupEvent {
    pub fn new(kind: EventKind, message: Value) -> Self {
        Self { kind, message }
    }
}

/// Text frame body sent to a websocket client: `{"message": <message>}`.
#[derive(Debug, Serialize)]
pub(crate) struct Frame<'a> {
    pub(crate) message: &'a Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_notification_handler_name_is_stable() {
        assert_eq!(
            EventKind::SendProductNotification.handler_name(),
            "send_product_notification"
        );
    }
}
