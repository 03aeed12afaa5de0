//! Cart and order endpoints.

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use harvest_core::{CartLine, DeliveryInfo, LineId, Order, Quantity, Session};

use super::HttpBackend;
use super::records::{CartResponse, CheckoutBody, UpdateQuantityBody};
use crate::ports::{AddToCart, BackendError, CartBackend};

#[async_trait]
impl CartBackend for HttpBackend {
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn get_cart(&self, session: &Session) -> Result<Vec<CartLine>, BackendError> {
        let cart: CartResponse = self
            .fetch(self.request(Method::GET, "cart", Some(session)))
            .await?;
        Ok(cart.items)
    }

    #[instrument(skip(self, session, item), fields(product_id = %item.product_id))]
    async fn add_to_cart(&self, session: &Session, item: &AddToCart) -> Result<(), BackendError> {
        self.execute(self.request(Method::POST, "cart/items", Some(session)).json(item))
            .await
    }

    #[instrument(skip(self, session), fields(line_id = %line_id))]
    async fn remove_from_cart(
        &self,
        session: &Session,
        line_id: &LineId,
    ) -> Result<(), BackendError> {
        let path = format!("cart/items/{line_id}");
        self.execute(self.request(Method::DELETE, &path, Some(session)))
            .await
    }

    #[instrument(skip(self, session), fields(line_id = %line_id, quantity = %quantity))]
    async fn update_cart_item(
        &self,
        session: &Session,
        line_id: &LineId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let path = format!("cart/items/{line_id}");
        self.execute(
            self.request(Method::PATCH, &path, Some(session))
                .json(&UpdateQuantityBody { quantity }),
        )
        .await
    }

    #[instrument(skip(self, session))]
    async fn clear_cart(&self, session: &Session) -> Result<(), BackendError> {
        self.execute(self.request(Method::DELETE, "cart", Some(session)))
            .await
    }

    #[instrument(skip(self, session, delivery))]
    async fn checkout(
        &self,
        session: &Session,
        delivery: &DeliveryInfo,
    ) -> Result<Order, BackendError> {
        self.fetch(
            self.request(Method::POST, "orders", Some(session))
                .json(&CheckoutBody {
                    delivery_info: delivery,
                }),
        )
        .await
    }
}
