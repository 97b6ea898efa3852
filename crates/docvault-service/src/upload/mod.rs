//! Two-phase upload protocol.

pub mod coordinator;
