//! Philips Hue bridge connector.

mod connector;
pub mod ids;
pub mod models;

use linkme::distributed_slice;

pub use connector::HueConnector;

use super::Connector;
use super::CONNECTORS;

#[distributed_slice(CONNECTORS)]
fn hue_connector() -> Box<dyn Connector> {
    Box::new(HueConnector::new())
}
