//! Configuration management for portscan.
//!
//! Layers an optional XDG-located settings file over built-in defaults.

mod settings;

pub use settings::{Paths, Settings, DEFAULT_HOSTS};
