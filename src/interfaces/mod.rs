//! Outer adapters: the CSV replay format and the runner that drives the
//! application layer from it.

pub mod csv;
pub mod scenario;
