//! # Rudder
//!
//! Application-scaffolding utilities for terminal apps:
//!
//! - [`http`]: an HTTP status-code taxonomy with range classification.
//! - [`coordinator`]: a scene/navigation coordinator that keeps
//!   application logic out of the display tree, over the minimal
//!   [`host`] layer (window, navigation stacks, modal presentation).
//! - [`store`]: a persistent object-store façade with a single dedicated
//!   write queue and live result sets.
//! - [`defaults`]: a reactive preference relay over a TOML key-value
//!   store.
//!
//! Transitions and writes report back through [`completion::Completion`],
//! a one-shot fire-then-finish signal.

pub mod completion;
pub mod coordinator;
pub mod defaults;
pub mod host;
pub mod http;
pub mod store;
