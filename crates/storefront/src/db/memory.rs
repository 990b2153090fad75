//! In-process store implementations.
//!
//! Same contracts as the `PostgreSQL` repositories (unique emails, keyset
//! ordering, compare-and-set status updates), held in `tokio` locks. Used by
//! the integration tests and for running the API without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use pacande_core::{Email, ProductId, Role, ShipmentId, ShipmentStatus, UserId};

use super::{ProductStore, RepositoryError, ShipmentStore, UserStore};
use crate::models::{
    NewUser, Product, ProductDraft, ProductFilter, Shipment, ShipmentCursor, User, UserChanges,
};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

/// Accounts kept in memory, in creation order.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<StoredUser>>,
}

fn email_taken(users: &[StoredUser], email: &Email, except: Option<UserId>) -> bool {
    users
        .iter()
        .any(|stored| &stored.user.email == email && Some(stored.user.id) != except)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let created = User {
            id: UserId::generate(),
            name: user.name,
            email: user.email,
            role: user.role,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        };
        users.push(StoredUser {
            user: created.clone(),
            password_hash: user.password_hash,
        });
        Ok(created)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|stored| stored.user.id == id)
            .map(|stored| stored.user.clone()))
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|stored| &stored.user.email == email)
            .map(|stored| (stored.user.clone(), stored.password_hash.clone())))
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|stored| stored.user.id == id)
            .map(|stored| stored.password_hash.clone()))
    }

    async fn list(&self, role: Option<Role>) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|stored| role.is_none_or(|r| stored.user.role == r))
            .map(|stored| stored.user.clone())
            .collect())
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if let Some(email) = &changes.email
            && email_taken(&users, email, Some(id))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let stored = users
            .iter_mut()
            .find(|stored| stored.user.id == id)
            .ok_or(RepositoryError::NotFound)?;

        if let Some(name) = changes.name {
            stored.user.name = name;
        }
        if let Some(email) = changes.email {
            stored.user.email = email;
        }
        if let Some(role) = changes.role {
            stored.user.role = role;
        }
        if let Some(hash) = changes.password_hash {
            stored.password_hash = hash;
        }
        if let Some(picture) = changes.profile_picture {
            stored.user.profile_picture = Some(picture);
        }
        stored.user.updated_at = Utc::now();

        Ok(stored.user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|stored| stored.user.id != id);
        Ok(users.len() < before)
    }
}

/// Catalog kept in memory.
#[derive(Debug, Default)]
pub struct MemoryProductStore {
    products: RwLock<HashMap<ProductId, Product>>,
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut matching: Vec<Product> = products
            .values()
            .filter(|product| filter.matches(product))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(matching)
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            name: draft.name,
            description: draft.description,
            price: draft.price,
            category: draft.category,
            subcategory: draft.subcategory,
            image_url: draft.image_url,
            discount: draft.discount,
            created_at: now,
            updated_at: now,
        };
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&id) else {
            return Ok(None);
        };
        product.name = draft.name;
        product.description = draft.description;
        product.price = draft.price;
        product.category = draft.category;
        product.subcategory = draft.subcategory;
        product.image_url = draft.image_url;
        product.discount = draft.discount;
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.products.write().await.remove(&id).is_some())
    }
}

/// Shipments kept in memory.
#[derive(Debug, Default)]
pub struct MemoryShipmentStore {
    shipments: RwLock<HashMap<ShipmentId, Shipment>>,
}

#[async_trait]
impl ShipmentStore for MemoryShipmentStore {
    async fn insert(&self, shipment: &Shipment) -> Result<(), RepositoryError> {
        let mut shipments = self.shipments.write().await;
        if shipments.contains_key(&shipment.id) {
            return Err(RepositoryError::Conflict("shipment id already exists".to_owned()));
        }
        shipments.insert(shipment.id, shipment.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
        Ok(self.shipments.read().await.get(&id).cloned())
    }

    async fn list_page(
        &self,
        client: Option<UserId>,
        after: Option<ShipmentCursor>,
        limit: u32,
    ) -> Result<Vec<Shipment>, RepositoryError> {
        let shipments = self.shipments.read().await;
        let mut page: Vec<Shipment> = shipments
            .values()
            .filter(|s| client.is_none_or(|c| s.client_id == c))
            .filter(|s| after.is_none_or(|cursor| cursor.precedes(s)))
            .cloned()
            .collect();
        page.sort_by(|a, b| (b.ship_date, b.id).cmp(&(a.ship_date, a.id)));
        page.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(page)
    }

    async fn update_status(
        &self,
        id: ShipmentId,
        from: ShipmentStatus,
        to: ShipmentStatus,
    ) -> Result<Option<Shipment>, RepositoryError> {
        let mut shipments = self.shipments.write().await;
        match shipments.get_mut(&id) {
            Some(shipment) if shipment.status == from => {
                shipment.status = to;
                Ok(Some(shipment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: ShipmentId) -> Result<bool, RepositoryError> {
        Ok(self.shipments.write().await.remove(&id).is_some())
    }
}
