use crate::authz::types::Protocol;

/// Channel name used by the HTTP transport.
pub const CHANNEL_REST: &str = "rest";

/// Derive the protocol tag from the transport channel and encryption flag.
/// Every channel other than REST is a websocket.
pub fn classify(channel: &str, encrypted: bool) -> Protocol {
    match (channel == CHANNEL_REST, encrypted) {
        (true, true) => Protocol::E2eRest,
        (true, false) => Protocol::Rest,
        (false, _) => Protocol::Wss,
    }
}
