//! Effect nodes (transform audio buffers)

mod amplitude;

pub use amplitude::{ports as amplitude_ports, Amplitude, DEFAULT_GAIN, DEFAULT_MAX_SAMPLES};
