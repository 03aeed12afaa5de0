//! Integration test support for Harvest.
//!
//! [`FakeBackend`] is an in-memory stand-in for the Harvest backend that
//! implements every backend port. It keeps one cart per user, prices lines
//! the way the real backend does, and lets tests inject failures or hold a
//! call open to exercise interleavings.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p harvest-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio::sync::oneshot;

use harvest_cart::{
    AddToCart, BackendError, CartBackend, CatalogBackend, InventoryBackend, LocalCartStore,
    MemoryStore, StoreError,
};
use harvest_core::{
    Batch, BatchId, CartLine, DeliveryInfo, Identity, Inventory, LineId, Money, NewBatch, Order,
    OrderId, OrderStatus, Product, ProductId, Quantity, Role, Session, UserId, stock,
};

// =============================================================================
// Backend operations
// =============================================================================

/// Backend operations, for failure injection and call assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetCart,
    AddToCart,
    RemoveFromCart,
    UpdateCartItem,
    ClearCart,
    Checkout,
    ListProducts,
    GetProductDetails,
    SearchProducts,
    AddBatch,
    UpdateBatchStock,
    UpdateDryStock,
}

/// Handle on a call held open by [`FakeBackend::pause_next`].
#[derive(Debug)]
pub struct Paused {
    reached: oneshot::Receiver<()>,
    release: oneshot::Sender<()>,
}

impl Paused {
    /// Wait until the held call has taken its snapshot and is waiting.
    pub async fn reached(&mut self) {
        let _ = (&mut self.reached).await;
    }

    /// Let the held call return.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

struct Hold {
    reached: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

#[derive(Default)]
struct FakeState {
    products: Vec<Product>,
    carts: HashMap<UserId, Vec<CartLine>>,
    failures: HashMap<Op, BackendError>,
    holds: HashMap<Op, Hold>,
    calls: Vec<Op>,
    next_batch: i32,
    next_order: i32,
}

/// In-memory Harvest backend.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    /// Backend serving `products`.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Arc<Self> {
        let backend = Self::default();
        {
            let mut state = backend.state.lock();
            state.products = products;
            state.next_batch = 1000;
            state.next_order = 1;
        }
        Arc::new(backend)
    }

    /// Put `lines` in `user`'s server-side cart.
    pub fn seed_cart(&self, user: UserId, lines: Vec<CartLine>) {
        self.state.lock().carts.insert(user, lines);
    }

    /// `user`'s server-side cart.
    #[must_use]
    pub fn server_cart(&self, user: UserId) -> Vec<CartLine> {
        self.state
            .lock()
            .carts
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }

    /// Current product list.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.state.lock().products.clone()
    }

    /// Make the next call to `op` fail with `err`.
    pub fn fail_next(&self, op: Op, err: BackendError) {
        self.state.lock().failures.insert(op, err);
    }

    /// Hold the next call to `op` open. Reads are held after they have
    /// read their data, failing or not; writes are held before they apply.
    pub fn pause_next(&self, op: Op) -> Paused {
        let (reached_tx, reached_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.state.lock().holds.insert(
            op,
            Hold {
                reached: reached_tx,
                release: release_rx,
            },
        );
        Paused {
            reached: reached_rx,
            release: release_tx,
        }
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Op> {
        self.state.lock().calls.clone()
    }

    /// Number of calls to `op`.
    #[must_use]
    pub fn call_count(&self, op: Op) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// Record the call and return an injected failure, if any.
    fn enter(&self, op: Op) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(op);
        state.failures.remove(&op).map_or(Ok(()), Err)
    }

    async fn hold(&self, op: Op) {
        let hold = self.state.lock().holds.remove(&op);
        if let Some(hold) = hold {
            let _ = hold.reached.send(());
            let _ = hold.release.await;
        }
    }

    fn product(state: &FakeState, id: ProductId) -> Result<&Product, BackendError> {
        state
            .products
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("Product {id} not found")))
    }
}

#[async_trait]
impl CartBackend for FakeBackend {
    async fn get_cart(&self, session: &Session) -> Result<Vec<CartLine>, BackendError> {
        let entered = self.enter(Op::GetCart);
        let lines = self.server_cart(session.user_id);
        self.hold(Op::GetCart).await;
        entered.map(|()| lines)
    }

    async fn add_to_cart(&self, session: &Session, item: &AddToCart) -> Result<(), BackendError> {
        self.enter(Op::AddToCart)?;
        let mut state = self.state.lock();
        let product = Self::product(&state, item.product_id)?.clone();

        let lines = state.carts.entry(session.user_id).or_default();
        let in_cart: Decimal = lines
            .iter()
            .filter(|l| l.product_id == item.product_id)
            .map(|l| l.quantity.value())
            .sum();
        if in_cart + item.quantity.value() > stock::total_stock(&product) {
            return Err(BackendError::Rejected(format!(
                "Stock insuffisant pour {}",
                product.name
            )));
        }

        if let Some(line) = lines
            .iter_mut()
            .find(|l| l.matches(item.product_id, item.batch_id))
        {
            line.quantity = line.quantity.saturating_add(item.quantity);
            return Ok(());
        }

        let discounted = item.is_antigaspi && stock::has_antigaspi(&product);
        lines.push(CartLine {
            id: LineId::generate(),
            product_id: item.product_id,
            batch_id: item.batch_id,
            quantity: item.quantity,
            unit_price: stock::effective_price(&product, item.is_antigaspi),
            is_antigaspi: discounted,
        });
        Ok(())
    }

    async fn remove_from_cart(
        &self,
        session: &Session,
        line_id: &LineId,
    ) -> Result<(), BackendError> {
        self.enter(Op::RemoveFromCart)?;
        let mut state = self.state.lock();
        let lines = state.carts.entry(session.user_id).or_default();
        let before = lines.len();
        lines.retain(|l| &l.id != line_id);
        if lines.len() == before {
            return Err(BackendError::NotFound(format!("Line {line_id} not found")));
        }
        Ok(())
    }

    async fn update_cart_item(
        &self,
        session: &Session,
        line_id: &LineId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        self.enter(Op::UpdateCartItem)?;
        self.hold(Op::UpdateCartItem).await;
        let mut state = self.state.lock();
        let line = state
            .carts
            .entry(session.user_id)
            .or_default()
            .iter_mut()
            .find(|l| &l.id == line_id)
            .ok_or_else(|| BackendError::NotFound(format!("Line {line_id} not found")))?;
        line.quantity = quantity;
        Ok(())
    }

    async fn clear_cart(&self, session: &Session) -> Result<(), BackendError> {
        self.enter(Op::ClearCart)?;
        self.state.lock().carts.remove(&session.user_id);
        Ok(())
    }

    async fn checkout(
        &self,
        session: &Session,
        _delivery: &DeliveryInfo,
    ) -> Result<Order, BackendError> {
        self.enter(Op::Checkout)?;
        self.hold(Op::Checkout).await;
        let mut state = self.state.lock();
        let lines = state.carts.remove(&session.user_id).unwrap_or_default();
        if lines.is_empty() {
            return Err(BackendError::Rejected("Le panier est vide".to_string()));
        }

        let id = OrderId::new(state.next_order);
        state.next_order += 1;
        Ok(Order {
            id,
            status: OrderStatus::Pending,
            total: lines.iter().map(CartLine::line_total).sum(),
            lines,
            created_at: Utc::now(),
        })
    }
}

#[async_trait]
impl CatalogBackend for FakeBackend {
    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        let entered = self.enter(Op::ListProducts);
        let products = self.products();
        self.hold(Op::ListProducts).await;
        entered.map(|()| products)
    }

    async fn get_product_details(&self, id: ProductId) -> Result<Product, BackendError> {
        self.enter(Op::GetProductDetails)?;
        let state = self.state.lock();
        Self::product(&state, id).cloned()
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>, BackendError> {
        self.enter(Op::SearchProducts)?;
        let needle = query.to_lowercase();
        Ok(self
            .products()
            .into_iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .collect())
    }
}

#[async_trait]
impl InventoryBackend for FakeBackend {
    async fn add_batch(
        &self,
        _session: &Session,
        product_id: ProductId,
        batch: &NewBatch,
    ) -> Result<Batch, BackendError> {
        self.enter(Op::AddBatch)?;
        let mut state = self.state.lock();
        let id = BatchId::new(state.next_batch);
        state.next_batch += 1;

        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| BackendError::NotFound(format!("Product {product_id} not found")))?;
        let Inventory::Fresh { batches, .. } = &mut product.inventory else {
            return Err(BackendError::Rejected(
                "Only fresh products have batches".to_string(),
            ));
        };

        let created = Batch {
            id,
            stock: batch.stock,
            is_antigaspi: batch.is_antigaspi,
            harvest_date: batch.harvest_date,
        };
        batches.push(created.clone());
        Ok(created)
    }

    async fn update_batch_stock(
        &self,
        _session: &Session,
        batch_id: BatchId,
        new_stock: Decimal,
    ) -> Result<(), BackendError> {
        self.enter(Op::UpdateBatchStock)?;
        let mut state = self.state.lock();
        let batch = state
            .products
            .iter_mut()
            .filter_map(|p| match &mut p.inventory {
                Inventory::Fresh { batches, .. } => Some(batches),
                Inventory::Dry { .. } => None,
            })
            .flat_map(|batches| batches.iter_mut())
            .find(|b| b.id == batch_id)
            .ok_or_else(|| BackendError::NotFound(format!("Batch {batch_id} not found")))?;
        batch.stock = new_stock;
        Ok(())
    }

    async fn update_dry_stock(
        &self,
        _session: &Session,
        product_id: ProductId,
        new_stock: Decimal,
    ) -> Result<(), BackendError> {
        self.enter(Op::UpdateDryStock)?;
        let mut state = self.state.lock();
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| BackendError::NotFound(format!("Product {product_id} not found")))?;
        match &mut product.inventory {
            Inventory::Dry { stock } => {
                *stock = new_stock;
                Ok(())
            }
            Inventory::Fresh { .. } => Err(BackendError::Rejected(
                "Product is not a dry product".to_string(),
            )),
        }
    }
}

// =============================================================================
// Local store with write failures
// =============================================================================

/// [`MemoryStore`] whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    #[must_use]
    pub fn with_lines(lines: Vec<CartLine>) -> Self {
        Self {
            inner: MemoryStore::with_lines(lines),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: PathBuf::from("memory"),
                source: std::io::Error::other("disk full"),
            });
        }
        Ok(())
    }
}

impl LocalCartStore for FlakyStore {
    fn load(&self) -> Result<Vec<CartLine>, StoreError> {
        self.inner.load()
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), StoreError> {
        self.check()?;
        self.inner.save(lines)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.check()?;
        self.inner.clear()
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A session for `user` expiring in a day.
#[must_use]
pub fn session(user: i32) -> Session {
    Session {
        user_id: UserId::new(user),
        access_token: SecretString::from(format!("token-{user}")),
        expires_at: Some(Utc::now() + Duration::days(1)),
    }
}

/// A signed-in client.
#[must_use]
pub fn client(user: i32) -> Identity {
    Identity::signed_in(session(user), Role::Client)
}

/// A signed-in producer.
#[must_use]
pub fn producer(user: i32) -> Identity {
    Identity::signed_in(session(user), Role::Producer)
}

/// A batch harvested `days_ago` days before now.
#[must_use]
pub fn batch(id: i32, stock: i64, days_ago: i64) -> Batch {
    let harvest_date = Utc::now() - Duration::days(days_ago);
    Batch {
        id: BatchId::new(id),
        stock: Decimal::from(stock),
        is_antigaspi: stock::is_antigaspi_eligible(harvest_date, Utc::now()),
        harvest_date,
    }
}

/// Fresh product priced `price` per kg.
#[must_use]
pub fn fresh(id: i32, name: &str, price: i64, batches: Vec<Batch>) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Money::from_units(price),
        sale_unit: "kg".to_string(),
        inventory: Inventory::Fresh {
            batches,
            declared_stock: None,
        },
    }
}

/// Dry product priced `price` per unit.
#[must_use]
pub fn dry(id: i32, name: &str, price: i64, stock: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Money::from_units(price),
        sale_unit: "unit".to_string(),
        inventory: Inventory::Dry {
            stock: Decimal::from(stock),
        },
    }
}

/// Standard catalog: carrots with one old and one new batch, a dry
/// product, and a fresh product without anti-waste stock.
#[must_use]
pub fn sample_catalog() -> Vec<Product> {
    vec![
        fresh(1, "Carottes", 4, vec![batch(10, 6, 3), batch(11, 20, 0)]),
        dry(2, "Lentilles vertes", 5, 40),
        fresh(3, "Radis", 2, vec![batch(30, 15, 1)]),
    ]
}

/// A line for seeding server or local carts.
///
/// # Panics
///
/// Panics if `quantity` is not positive.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn line(id: &str, product: i32, unit_price: i64, quantity: i64) -> CartLine {
    CartLine {
        id: LineId::from(id),
        product_id: ProductId::new(product),
        batch_id: None,
        quantity: Quantity::try_from(quantity).unwrap(),
        unit_price: Money::from_units(unit_price),
        is_antigaspi: false,
    }
}
