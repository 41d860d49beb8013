//! Wireless uplink abstraction.
//!
//! The relay network is only reachable while the node's IP uplink (usually
//! Wi-Fi) is associated. The gateway does not associate itself; it only asks
//! whether the link is up and requests single reconnect attempts. Retry and
//! backoff belong to the caller.

use async_trait::async_trait;

use crate::error::{Error, Result};

/// An IP uplink that can be queried and re-associated.
#[async_trait]
pub trait Uplink: Send + Sync {
    /// Whether the uplink is currently usable.
    fn is_up(&self) -> bool;

    /// Make one reconnect attempt.
    async fn reconnect(&mut self) -> Result<()>;
}

/// An uplink with a fixed state, for hosts whose networking the OS manages.
///
/// Fixed stations use [`StaticUplink::up`]; client nodes, which never
/// associate with a network, use [`StaticUplink::down`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticUplink {
    up: bool,
}

impl StaticUplink {
    /// An uplink that is always up.
    pub fn up() -> Self {
        Self { up: true }
    }

    /// An uplink that is always down.
    pub fn down() -> Self {
        Self { up: false }
    }
}

#[async_trait]
impl Uplink for StaticUplink {
    fn is_up(&self) -> bool {
        self.up
    }

    async fn reconnect(&mut self) -> Result<()> {
        if self.up { Ok(()) } else { Err(Error::UplinkDown) }
    }
}
