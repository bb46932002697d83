//! Rendering Pipeline
//!
//! Connects component definitions to a live document.
//!
//! ```text
//! render_component(def) → host view → component view → embedded views
//!                           │
//!                           └─ detect_changes(): update pass (+ check pass in dev mode)
//! ```
//!
//! - `config`: runtime settings (dev mode)
//! - `mount`: root component handle

pub mod config;
pub mod mount;

pub use config::{dev_mode, dev_mode_signal, load_from_env, set_dev_mode, DEV_MODE_ENV};
pub use mount::{detect_changes, render_component, render_component_in, ComponentHandle};
