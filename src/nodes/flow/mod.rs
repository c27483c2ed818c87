//! Routing nodes (no transformation of their input)

mod forward;

pub use forward::Forward;
