//! Adapters to the outside world: the gateway and the event transport.

#[cfg(feature = "http")]
pub mod hue_bridge;
#[cfg(feature = "transport_mqtt")]
pub mod mqtt;
