//! Storage infrastructure: settings persistence.
//!
//! - **`settings`** – The on-disk JSON settings file: last-used host address
//!   and the key substitution table.  Missing files and fields load as
//!   defaults so a first run needs no setup.
//!
//! - **`memory`** – An in-memory store with the same interface, used by
//!   tests.

pub mod memory;
pub mod settings;
