//! Network infrastructure.
//!
//! # Sub-modules
//!
//! - **`relay_channel`** – The UDP socket both roles use: best-effort sends,
//!   a background receive task feeding a queue, and idempotent close.
//!
//! - **`local_address`** – Finds the IPv4 address a client announces to the
//!   host.

pub mod local_address;
pub mod relay_channel;

pub use local_address::{AddressError, FixedAddressResolver, LocalAddressResolver, SystemAddressResolver};
pub use relay_channel::{ChannelError, Datagram, RelayChannel};
