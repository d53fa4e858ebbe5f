//! Domain layer: payment entities, gateway value types and the ports the
//! application layer depends on.

pub mod gateway;
pub mod invoice;
pub mod membership;
pub mod money;
pub mod ports;
pub mod transaction;
