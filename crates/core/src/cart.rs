//! Per-user shopping cart over a pluggable keyed storage.
//!
//! The cart never touches ambient global state: every [`CartStore`] is bound
//! to one (optional) user and one [`CartStorage`], and every mutation is
//! written through to the storage under that user's id. Switching users means
//! building a new `CartStore`, so carts cannot leak between accounts.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::LineInput;
use crate::types::{ProductId, UserId};

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product in the catalog.
    #[serde(rename = "producto")]
    pub product_id: ProductId,
    /// Product name at the time it was added.
    pub title: String,
    /// Unit price at the time it was added.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Product image URL.
    pub image: Option<String>,
    /// Units of this product, always at least 1.
    #[serde(rename = "cantidad")]
    pub quantity: u32,
}

/// The product details needed to put something in a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartProduct {
    /// Product id.
    pub id: ProductId,
    /// Display name.
    pub title: String,
    /// Unit price.
    pub price: Decimal,
    /// Image URL.
    pub image: Option<String>,
}

/// Errors from cart operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// No user is bound to this cart.
    #[error("authentication required to modify the cart")]
    Unauthenticated,
    /// Quantity below 1 (or overflowing).
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    ItemNotFound(ProductId),
}

/// Keyed storage behind the cart.
///
/// Implementations only need last-write-wins semantics per user.
pub trait CartStorage: Send + Sync {
    /// Current cart of `user`, empty if none was stored.
    fn get(&self, user: UserId) -> Vec<CartItem>;

    /// Replace the cart of `user`.
    fn set(&self, user: UserId, cart: Vec<CartItem>);
}

/// In-process [`CartStorage`] backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryCartStorage {
    carts: Mutex<HashMap<UserId, Vec<CartItem>>>,
}

impl MemoryCartStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryCartStorage {
    fn get(&self, user: UserId) -> Vec<CartItem> {
        self.carts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }

    fn set(&self, user: UserId, cart: Vec<CartItem>) {
        let mut carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        if cart.is_empty() {
            carts.remove(&user);
        } else {
            carts.insert(user, cart);
        }
    }
}

/// Cart operations for one user over a [`CartStorage`].
pub struct CartStore<'a, S: CartStorage + ?Sized> {
    storage: &'a S,
    user: Option<UserId>,
}

impl<'a, S: CartStorage + ?Sized> CartStore<'a, S> {
    /// Bind a cart to `user` (or to an anonymous context when `None`).
    #[must_use]
    pub const fn new(storage: &'a S, user: Option<UserId>) -> Self {
        Self { storage, user }
    }

    fn require_user(&self) -> Result<UserId, CartError> {
        self.user.ok_or(CartError::Unauthenticated)
    }

    /// Lines in insertion order. Anonymous contexts see an empty cart.
    #[must_use]
    pub fn contents(&self) -> Vec<CartItem> {
        self.user
            .map(|user| self.storage.get(user))
            .unwrap_or_default()
    }

    /// Add `quantity` units of `product`, merging with an existing line.
    ///
    /// # Errors
    ///
    /// [`CartError::Unauthenticated`] without a user,
    /// [`CartError::InvalidQuantity`] if `quantity` is 0 or the merged
    /// quantity overflows.
    pub fn add_item(&self, product: CartProduct, quantity: u32) -> Result<Vec<CartItem>, CartError> {
        let user = self.require_user()?;
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let mut cart = self.storage.get(user);
        if let Some(line) = cart.iter_mut().find(|line| line.product_id == product.id) {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::InvalidQuantity)?;
        } else {
            cart.push(CartItem {
                product_id: product.id,
                title: product.title,
                price: product.price,
                image: product.image,
                quantity,
            });
        }

        self.storage.set(user, cart.clone());
        Ok(cart)
    }

    /// Set the quantity of a line. Zero is rejected, not treated as removal.
    ///
    /// # Errors
    ///
    /// [`CartError::Unauthenticated`], [`CartError::InvalidQuantity`], or
    /// [`CartError::ItemNotFound`] if the product is not in the cart.
    pub fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<CartItem>, CartError> {
        let user = self.require_user()?;
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let mut cart = self.storage.get(user);
        let line = cart
            .iter_mut()
            .find(|line| line.product_id == product_id)
            .ok_or(CartError::ItemNotFound(product_id))?;
        line.quantity = quantity;

        self.storage.set(user, cart.clone());
        Ok(cart)
    }

    /// Remove a product's line. Removing an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// [`CartError::Unauthenticated`] without a user.
    pub fn remove_item(&self, product_id: ProductId) -> Result<Vec<CartItem>, CartError> {
        let user = self.require_user()?;
        let mut cart = self.storage.get(user);
        cart.retain(|line| line.product_id != product_id);
        self.storage.set(user, cart.clone());
        Ok(cart)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// [`CartError::Unauthenticated`] without a user.
    pub fn clear(&self) -> Result<(), CartError> {
        let user = self.require_user()?;
        self.storage.set(user, Vec::new());
        Ok(())
    }

    /// Refresh every line from `catalog`, keeping order and quantities.
    ///
    /// Lines whose product `catalog` no longer knows are dropped. The result
    /// is written back, so later reads see the current names and prices.
    ///
    /// # Errors
    ///
    /// [`CartError::Unauthenticated`] without a user.
    pub fn reprice<F>(&self, catalog: F) -> Result<Vec<CartItem>, CartError>
    where
        F: Fn(ProductId) -> Option<CartProduct>,
    {
        let user = self.require_user()?;
        let cart: Vec<CartItem> = self
            .storage
            .get(user)
            .into_iter()
            .filter_map(|line| {
                catalog(line.product_id).map(|product| CartItem {
                    product_id: product.id,
                    title: product.title,
                    price: product.price,
                    image: product.image,
                    quantity: line.quantity,
                })
            })
            .collect();

        self.storage.set(user, cart.clone());
        Ok(cart)
    }

    /// The cart as pricing lines.
    #[must_use]
    pub fn lines(&self) -> Vec<LineInput> {
        self.contents()
            .into_iter()
            .map(|item| LineInput::new(item.title, item.price, item.quantity))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(title: &str, price: i64) -> CartProduct {
        CartProduct {
            id: ProductId::generate(),
            title: title.to_owned(),
            price: Decimal::from(price),
            image: None,
        }
    }

    #[test]
    fn test_add_merges_quantities() {
        let storage = MemoryCartStorage::new();
        let cart = CartStore::new(&storage, Some(UserId::generate()));
        let mochila = product("Mochila", 100_000);

        cart.add_item(mochila.clone(), 1).unwrap();
        let items = cart.add_item(mochila.clone(), 2).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let storage = MemoryCartStorage::new();
        let cart = CartStore::new(&storage, Some(UserId::generate()));
        let a = product("a", 1);
        let b = product("b", 2);

        cart.add_item(b.clone(), 1).unwrap();
        cart.add_item(a.clone(), 1).unwrap();
        cart.add_item(b.clone(), 1).unwrap();

        let ids: Vec<_> = cart.contents().iter().map(|i| i.product_id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_anonymous_cannot_add() {
        let storage = MemoryCartStorage::new();
        let cart = CartStore::new(&storage, None);

        assert_eq!(
            cart.add_item(product("a", 1), 1).unwrap_err(),
            CartError::Unauthenticated
        );
        assert!(cart.contents().is_empty());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let storage = MemoryCartStorage::new();
        let cart = CartStore::new(&storage, Some(UserId::generate()));
        let a = product("a", 1);

        assert_eq!(
            cart.add_item(a.clone(), 0).unwrap_err(),
            CartError::InvalidQuantity
        );
        cart.add_item(a.clone(), 2).unwrap();
        assert_eq!(
            cart.update_quantity(a.id, 0).unwrap_err(),
            CartError::InvalidQuantity
        );
        assert_eq!(cart.contents()[0].quantity, 2);
    }

    #[test]
    fn test_update_quantity() {
        let storage = MemoryCartStorage::new();
        let cart = CartStore::new(&storage, Some(UserId::generate()));
        let a = product("a", 1);
        cart.add_item(a.clone(), 1).unwrap();

        let items = cart.update_quantity(a.id, 5).unwrap();
        assert_eq!(items[0].quantity, 5);

        let missing = ProductId::generate();
        assert_eq!(
            cart.update_quantity(missing, 1).unwrap_err(),
            CartError::ItemNotFound(missing)
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let storage = MemoryCartStorage::new();
        let cart = CartStore::new(&storage, Some(UserId::generate()));
        cart.add_item(product("a", 1), 1).unwrap();
        let absent = ProductId::generate();

        let first = cart.remove_item(absent).unwrap();
        let second = cart.remove_item(absent).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_carts_are_isolated_per_user() {
        let storage = MemoryCartStorage::new();
        let ana = CartStore::new(&storage, Some(UserId::generate()));
        let luis = CartStore::new(&storage, Some(UserId::generate()));

        ana.add_item(product("a", 1), 1).unwrap();
        assert!(luis.contents().is_empty());

        luis.clear().unwrap();
        assert_eq!(ana.contents().len(), 1);
    }

    #[test]
    fn test_reprice_follows_catalog() {
        let storage = MemoryCartStorage::new();
        let cart = CartStore::new(&storage, Some(UserId::generate()));
        let mochila = product("Mochila", 100_000);
        let ruana = product("Ruana", 90_000);
        cart.add_item(mochila.clone(), 2).unwrap();
        cart.add_item(ruana.clone(), 1).unwrap();

        let items = cart
            .reprice(|id| {
                (id == mochila.id).then(|| CartProduct {
                    price: Decimal::from(150_000),
                    ..mochila.clone()
                })
            })
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price, Decimal::from(150_000));
        assert_eq!(items[0].quantity, 2);
        assert_eq!(cart.contents(), items);
    }

    #[test]
    fn test_clear_and_lines() {
        let storage = MemoryCartStorage::new();
        let cart = CartStore::new(&storage, Some(UserId::generate()));
        cart.add_item(product("Mochila", 100_000), 2).unwrap();

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);

        cart.clear().unwrap();
        assert!(cart.contents().is_empty());
    }
}
