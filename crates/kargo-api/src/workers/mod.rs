//! Background workers

pub mod dispatcher;

pub use dispatcher::{EventHandler, GroupDispatcher};
