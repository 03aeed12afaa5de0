//! Dual-mode cart engine.
//!
//! # Modes
//!
//! - **Guest**: no session, or a session whose role is not `client`. Lines
//!   live in the [`LocalCartStore`] and every change is written back to it.
//! - **Authenticated**: valid client session. The backend owns the cart.
//!   Every mutation is sent to the backend and followed by a full refetch;
//!   nothing is merged locally and nothing is written to the local store.
//!
//! The mode is re-derived from the [`IdentitySource`] at the start of every
//! operation. When the `(mode, user)` pair changes the engine reloads from
//! the new source of truth. Guest lines are never carried into an
//! authenticated cart.
//!
//! # Ordering
//!
//! Operations may interleave while they wait on the network. Each
//! state-refreshing call takes a ticket from a refresh gate right before
//! the read that produces its state (after the backend mutation, for
//! authenticated writes). Its result, or its failure, is written only if
//! no newer call has already written. After [`CartEngine::detach`], results are still returned but
//! never written.
//!
//! # Failures
//!
//! Validation errors are raised before any I/O. A failed mutation leaves
//! the cart untouched. A failed authenticated fetch falls back to the last
//! local-store snapshot and marks the snapshot stale. Every failure is
//! recorded in [`CartEngine::last_error`] unless a newer result has
//! superseded it, and returned; nothing retries on its own.

mod command;
mod view;

pub use command::CartCommand;
pub use view::{CartLineView, CartSnapshot};

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use harvest_core::{
    BatchId, Cart, CartLine, CartMode, DeliveryInfo, Identity, LineId, Money, Order, Product,
    Quantity, QuantityError, Role, Session, UserId, stock,
};

use crate::catalog::CatalogStore;
use crate::error::CartError;
use crate::gate::{RefreshGate, Ticket, Watermark};
use crate::ports::{AddToCart, CartBackend, IdentitySource, LocalCartStore};

/// Identity facts that decide which cart is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IdentityKey {
    mode: CartMode,
    user: Option<UserId>,
}

#[derive(Debug, Default)]
struct EngineState {
    cart: Cart,
    identity: Option<IdentityKey>,
    stale: bool,
    last_error: Option<CartError>,
    watermark: Watermark,
}

/// Cart service with injected identity, backend and local store.
pub struct CartEngine {
    identity: Arc<dyn IdentitySource>,
    backend: Arc<dyn CartBackend>,
    store: Arc<dyn LocalCartStore>,
    gate: RefreshGate,
    state: Mutex<EngineState>,
}

impl std::fmt::Debug for CartEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartEngine")
            .field("gate", &self.gate)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CartEngine {
    /// Create an engine. The cart is loaded lazily by the first operation
    /// or by [`CartEngine::sync_identity`].
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentitySource>,
        backend: Arc<dyn CartBackend>,
        store: Arc<dyn LocalCartStore>,
    ) -> Self {
        Self {
            identity,
            backend,
            store,
            gate: RefreshGate::new(),
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Create an engine and load the cart for the current identity.
    ///
    /// A failed initial load is recorded in [`CartEngine::last_error`].
    pub async fn start(
        identity: Arc<dyn IdentitySource>,
        backend: Arc<dyn CartBackend>,
        store: Arc<dyn LocalCartStore>,
    ) -> Self {
        let engine = Self::new(identity, backend, store);
        engine.sync_identity().await;
        engine
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// Current cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.state.lock().cart.clone()
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> CartMode {
        self.state.lock().cart.mode
    }

    /// Cart plus health flags.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        let state = self.state.lock();
        CartSnapshot {
            cart: state.cart.clone(),
            stale: state.stale,
            last_error: state.last_error.clone(),
        }
    }

    /// Most recent failure.
    #[must_use]
    pub fn last_error(&self) -> Option<CartError> {
        self.state.lock().last_error.clone()
    }

    /// Forget the recorded failure.
    pub fn clear_error(&self) {
        self.state.lock().last_error = None;
    }

    /// `Σ unit_price × quantity`. Display only.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.state.lock().cart.total_price()
    }

    /// `Σ quantity`.
    #[must_use]
    pub fn item_count(&self) -> Decimal {
        self.state.lock().cart.item_count()
    }

    /// Lines joined with the mirrored catalog.
    #[must_use]
    pub fn line_views(&self, catalog: &CatalogStore) -> Vec<CartLineView> {
        let cart = self.cart();
        cart.lines
            .iter()
            .map(|line| CartLineView::join(line, catalog))
            .collect()
    }

    /// Stop writing results into this engine. Calls already in flight may
    /// complete; their results are returned but not applied.
    pub fn detach(&self) {
        info!("Cart engine detached");
        self.gate.detach();
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Re-derive the mode from the identity source and reload if the
    /// `(mode, user)` pair changed.
    #[instrument(skip(self))]
    pub async fn sync_identity(&self) -> CartMode {
        let identity = self.identity.current();
        let key = identity_key(&identity);

        {
            let mut state = self.state.lock();
            if state.identity == Some(key) {
                return key.mode;
            }
            info!(mode = %key.mode, user = ?key.user, "Identity changed, reloading cart");
            state.identity = Some(key);
        }

        match key.mode {
            CartMode::Guest => {
                let ticket = self.gate.begin();
                // A failure is already recorded
                let _ = self.reload_guest(ticket);
            }
            CartMode::Authenticated => {
                if let Some(session) = client_session(&identity) {
                    let ticket = self.gate.begin();
                    let _ = self.refresh_remote(ticket, &session).await;
                }
            }
        }

        key.mode
    }

    /// Reload the cart from the current source of truth.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after falling back to the local snapshot.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<Cart, CartError> {
        self.ensure_active()?;
        let mode = self.sync_identity().await;
        let ticket = self.gate.begin();
        match mode {
            CartMode::Guest => self.reload_guest(ticket),
            CartMode::Authenticated => {
                let session = self.require_session()?;
                self.refresh_remote(ticket, &session).await
            }
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Add `quantity` of `product` (optionally a specific batch).
    ///
    /// Guest mode merges into an existing line with the same product and
    /// batch. Authenticated mode sends the line to the backend and refetches.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidQuantity`] if the quantity is not a positive
    ///   number (checked before any I/O).
    /// - Backend or local-store errors; the cart is unchanged.
    #[instrument(skip(self, product, quantity), fields(product_id = %product.id))]
    pub async fn add_line<Q>(
        &self,
        product: &Product,
        quantity: Q,
        batch_id: Option<BatchId>,
        is_antigaspi: bool,
    ) -> Result<Cart, CartError>
    where
        Q: TryInto<Quantity, Error = QuantityError>,
    {
        let quantity = quantity.try_into().map_err(CartError::from)?;
        self.ensure_active()?;

        match self.sync_identity().await {
            CartMode::Guest => {
                let ticket = self.gate.begin();
                self.mutate_guest(ticket, |lines| {
                    add_guest_line(lines, product, quantity, batch_id, is_antigaspi);
                    Ok(())
                })
            }
            CartMode::Authenticated => {
                self.execute_remote(CartCommand::Add(AddToCart {
                    product_id: product.id,
                    quantity,
                    batch_id,
                    is_antigaspi,
                }))
                .await
            }
        }
    }

    /// Remove a line. Removing an unknown line is a no-op in guest mode.
    ///
    /// # Errors
    ///
    /// Backend or local-store errors; the cart is unchanged.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_line(&self, line_id: &LineId) -> Result<Cart, CartError> {
        self.ensure_active()?;

        match self.sync_identity().await {
            CartMode::Guest => {
                let ticket = self.gate.begin();
                self.mutate_guest(ticket, |lines| {
                    lines.retain(|l| &l.id != line_id);
                    Ok(())
                })
            }
            CartMode::Authenticated => {
                self.execute_remote(CartCommand::Remove(line_id.clone()))
                    .await
            }
        }
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// - [`CartError::LineNotFound`] in guest mode if the line is unknown.
    /// - Backend or local-store errors; the cart is unchanged.
    #[instrument(skip(self), fields(line_id = %line_id, quantity = %quantity))]
    pub async fn update_quantity(
        &self,
        line_id: &LineId,
        quantity: Decimal,
    ) -> Result<Cart, CartError> {
        let Ok(quantity) = Quantity::new(quantity) else {
            return self.remove_line(line_id).await;
        };
        self.ensure_active()?;

        match self.sync_identity().await {
            CartMode::Guest => {
                let ticket = self.gate.begin();
                self.mutate_guest(ticket, |lines| {
                    let line = lines
                        .iter_mut()
                        .find(|l| &l.id == line_id)
                        .ok_or_else(|| CartError::LineNotFound(line_id.clone()))?;
                    line.quantity = quantity;
                    Ok(())
                })
            }
            CartMode::Authenticated => {
                self.execute_remote(CartCommand::Update {
                    line_id: line_id.clone(),
                    quantity,
                })
                .await
            }
        }
    }

    /// Empty the cart.
    ///
    /// Authenticated mode clears on the backend first and only empties the
    /// mirror on success.
    ///
    /// # Errors
    ///
    /// Backend or local-store errors; the cart is unchanged.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Cart, CartError> {
        self.ensure_active()?;

        match self.sync_identity().await {
            CartMode::Guest => {
                let ticket = self.gate.begin();
                if let Err(e) = self.store.clear() {
                    return Err(self.fail(e.into()));
                }
                Ok(self.commit(ticket, Cart::empty(CartMode::Guest)))
            }
            CartMode::Authenticated => self.execute_remote(CartCommand::Clear).await,
        }
    }

    /// Place an order for the authenticated cart.
    ///
    /// The order total is the backend's; the cart is emptied only on
    /// success.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotAuthenticated`] in guest mode (no I/O).
    /// - Backend errors; the cart is unchanged.
    #[instrument(skip(self, delivery))]
    pub async fn checkout(&self, delivery: &DeliveryInfo) -> Result<Order, CartError> {
        self.ensure_active()?;

        if self.sync_identity().await != CartMode::Authenticated {
            return Err(self.fail(CartError::NotAuthenticated));
        }
        let session = self.require_session()?;

        match self.backend.checkout(&session, delivery).await {
            Ok(order) => {
                info!(order_id = %order.id, total = %order.total, "Order placed");
                let ticket = self.gate.begin();
                if self.gate.is_active() {
                    if let Err(e) = self.store.clear() {
                        warn!(error = %e, "Failed to clear local cart slot after checkout");
                    }
                }
                self.commit(ticket, Cart::empty(CartMode::Authenticated));
                Ok(order)
            }
            Err(e) => {
                warn!(error = %e, "Checkout failed");
                Err(self.fail(e.into()))
            }
        }
    }

    /// Run a server-side mutation, then refetch the cart.
    ///
    /// The returned cart is the backend's view after the mutation. It is
    /// adopted as the engine state unless a newer call has already written.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotAuthenticated`] without a valid client session.
    /// - The mutation's error; the cart is unchanged.
    /// - The refetch error, after falling back to the local snapshot.
    #[instrument(skip(self, command), fields(command = command.name()))]
    pub async fn execute_remote(&self, command: CartCommand) -> Result<Cart, CartError> {
        self.ensure_active()?;
        self.sync_identity().await;
        let session = self.require_session()?;

        if let Err(e) = command.send(self.backend.as_ref(), &session).await {
            warn!(error = %e, "Cart mutation rejected");
            return Err(self.fail(e.into()));
        }

        // Ordered after the mutation so an earlier read cannot outrank it
        let ticket = self.gate.begin();

        if command.empties_cart() {
            return Ok(self.commit(ticket, Cart::empty(CartMode::Authenticated)));
        }

        self.refresh_remote(ticket, &session).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_active(&self) -> Result<(), CartError> {
        if self.gate.is_active() {
            Ok(())
        } else {
            Err(CartError::Detached)
        }
    }

    fn require_session(&self) -> Result<Session, CartError> {
        client_session(&self.identity.current()).ok_or_else(|| self.fail(CartError::NotAuthenticated))
    }

    /// Record a failure and hand it back.
    fn fail(&self, err: CartError) -> CartError {
        if self.gate.is_active() {
            self.state.lock().last_error = Some(err.clone());
        }
        err
    }

    /// Write `cart` if `ticket` is the newest result and the engine is live.
    /// Returns `cart` either way.
    fn commit(&self, ticket: Ticket, cart: Cart) -> Cart {
        if !self.gate.is_active() {
            debug!(seq = ticket.seq(), "Engine detached, dropping result");
            return cart;
        }

        let mut state = self.state.lock();
        if state.watermark.admit(ticket) {
            state.cart = cart.clone();
            state.stale = false;
            state.last_error = None;
        } else {
            debug!(seq = ticket.seq(), "Discarding stale cart result");
        }
        cart
    }

    /// Write a fallback `cart` marked stale and record `err`, both only if
    /// `ticket` is still the newest result.
    fn commit_failure(&self, ticket: Ticket, cart: Cart, err: CartError) -> CartError {
        if !self.gate.is_active() {
            return err;
        }

        let mut state = self.state.lock();
        if state.watermark.admit(ticket) {
            state.cart = cart;
            state.stale = true;
            state.last_error = Some(err.clone());
        } else {
            debug!(seq = ticket.seq(), "Discarding stale cart failure");
        }
        err
    }

    fn reload_guest(&self, ticket: Ticket) -> Result<Cart, CartError> {
        match self.store.load() {
            Ok(lines) => Ok(self.commit(ticket, Cart::with_lines(CartMode::Guest, lines))),
            Err(e) => {
                warn!(error = %e, "Failed to load guest cart");
                Err(self.commit_failure(ticket, Cart::empty(CartMode::Guest), e.into()))
            }
        }
    }

    /// Apply `edit` to a copy of the guest lines, persist, then write.
    fn mutate_guest<F>(&self, ticket: Ticket, edit: F) -> Result<Cart, CartError>
    where
        F: FnOnce(&mut Vec<CartLine>) -> Result<(), CartError>,
    {
        let mut lines = self.state.lock().cart.lines.clone();
        if let Err(e) = edit(&mut lines) {
            return Err(self.fail(e));
        }
        if let Err(e) = self.store.save(&lines) {
            warn!(error = %e, "Failed to persist guest cart");
            return Err(self.fail(e.into()));
        }
        Ok(self.commit(ticket, Cart::with_lines(CartMode::Guest, lines)))
    }

    /// Fetch the authenticated cart; on failure fall back to the local
    /// snapshot and mark it stale.
    async fn refresh_remote(&self, ticket: Ticket, session: &Session) -> Result<Cart, CartError> {
        match self.backend.get_cart(session).await {
            Ok(lines) => Ok(self.commit(ticket, Cart::with_lines(CartMode::Authenticated, lines))),
            Err(e) => {
                warn!(error = %e, "Failed to fetch cart, using local snapshot");
                let fallback = self.store.load().unwrap_or_default();
                Err(self.commit_failure(
                    ticket,
                    Cart::with_lines(CartMode::Authenticated, fallback),
                    e.into(),
                ))
            }
        }
    }
}

/// Merge into the line with the same product and batch, or append a new
/// line priced from the catalog product.
fn add_guest_line(
    lines: &mut Vec<CartLine>,
    product: &Product,
    quantity: Quantity,
    batch_id: Option<BatchId>,
    is_antigaspi: bool,
) {
    if let Some(existing) = lines.iter_mut().find(|l| l.matches(product.id, batch_id)) {
        existing.quantity = existing.quantity.saturating_add(quantity);
        return;
    }

    let discounted = is_antigaspi && stock::has_antigaspi(product);
    lines.push(CartLine {
        id: LineId::generate(),
        product_id: product.id,
        batch_id,
        quantity,
        unit_price: stock::effective_price(product, is_antigaspi),
        is_antigaspi: discounted,
    });
}

fn client_session(identity: &Identity) -> Option<Session> {
    identity
        .session_with_role(Role::Client, Utc::now())
        .cloned()
}

fn identity_key(identity: &Identity) -> IdentityKey {
    let now = Utc::now();
    let mode = identity.cart_mode(now);
    let user = match mode {
        CartMode::Authenticated => identity.valid_session(now).map(|s| s.user_id),
        CartMode::Guest => None,
    };
    IdentityKey { mode, user }
}
