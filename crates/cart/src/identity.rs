//! Identity sources.
//!
//! [`WatchIdentity`] is the live provider: whoever owns authentication
//! publishes new identities through an [`IdentityPublisher`], and the host
//! loop awaits [`WatchIdentity::changed`] before calling
//! [`crate::CartEngine::sync_identity`].

use tokio::sync::watch;

use harvest_core::Identity;

use crate::ports::IdentitySource;

/// Publishing half of a watched identity.
#[derive(Debug)]
pub struct IdentityPublisher {
    tx: watch::Sender<Identity>,
}

impl IdentityPublisher {
    /// Replace the current identity and notify watchers.
    pub fn publish(&self, identity: Identity) {
        self.tx.send_replace(identity);
    }

    /// Publish a signed-out identity.
    pub fn sign_out(&self) {
        self.publish(Identity::anonymous());
    }
}

/// Identity source backed by a `tokio::sync::watch` channel.
#[derive(Debug, Clone)]
pub struct WatchIdentity {
    rx: watch::Receiver<Identity>,
}

impl WatchIdentity {
    /// Create a publisher/source pair starting at `initial`.
    #[must_use]
    pub fn channel(initial: Identity) -> (IdentityPublisher, Self) {
        let (tx, rx) = watch::channel(initial);
        (IdentityPublisher { tx }, Self { rx })
    }

    /// Wait for the next published identity.
    ///
    /// # Errors
    ///
    /// Returns an error once the publisher has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

impl IdentitySource for WatchIdentity {
    fn current(&self) -> Identity {
        self.rx.borrow().clone()
    }
}

/// Fixed identity, for one-shot processes such as the CLI.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    identity: Identity,
}

impl StaticIdentity {
    /// Wrap an identity.
    #[must_use]
    pub const fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

impl IdentitySource for StaticIdentity {
    fn current(&self) -> Identity {
        self.identity.clone()
    }
}
