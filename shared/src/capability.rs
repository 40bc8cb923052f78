//! Device capability checks.

use crate::event::InboundEvent;

/// Interface name of the HTML rendering surface.
pub const HTML: &str = "Alexa.Presentation.HTML";

/// Whether the device that sent `event` supports `capability`.
///
/// Missing capability info counts as unsupported.
pub fn has_capability(event: &InboundEvent, capability: &str) -> bool {
    event
        .capabilities()
        .is_some_and(|caps| caps.contains(capability))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn test_present_capability() {
        let event = InboundEvent::builder(EventKind::Launch)
            .capabilities([HTML, "AudioPlayer"])
            .build();
        assert!(has_capability(&event, HTML));
        assert!(!has_capability(&event, "VideoApp"));
    }

    #[test]
    fn test_absent_capability_info_is_unsupported() {
        let event = InboundEvent::builder(EventKind::Launch).build();
        assert!(!has_capability(&event, HTML));
    }
}
