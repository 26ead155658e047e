//! Client-side copy of a user's cart with optimistic writes.
//!
//! The server stays the source of truth: `refresh` replaces local state
//! wholesale, and every optimistic change is either confirmed once the
//! backend accepts it or rolled back when the call fails.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    domain::cart::{self, CartEntry, CartSummary},
    models::CartItem,
};

use super::api::ClientError;

#[automock]
#[async_trait]
pub trait CartBackend: Send + Sync {
    async fn fetch_cart(&self) -> Result<Vec<CartEntry>, ClientError>;
    async fn add_to_cart(&self, product_id: i32) -> Result<CartItem, ClientError>;
    async fn remove_from_cart(&self, product_id: i32) -> Result<(), ClientError>;
}

#[derive(Debug, Clone)]
struct Row {
    entry: CartEntry,
    pending: Option<u64>,
}

/// Handle for an optimistic change not yet acknowledged by the server.
#[derive(Debug)]
#[must_use = "a pending change must be confirmed or rolled back"]
pub struct PendingChange {
    token: u64,
    kind: ChangeKind,
}

#[derive(Debug)]
enum ChangeKind {
    Added { product_id: i32 },
    Removed { product_id: i32, rows: Vec<(usize, Row)> },
}

impl PendingChange {
    pub fn product_id(&self) -> i32 {
        match &self.kind {
            ChangeKind::Added { product_id } | ChangeKind::Removed { product_id, .. } => *product_id,
        }
    }
}

#[derive(Debug)]
pub struct CartMirror {
    rows: Vec<Row>,
    stale: bool,
    next_token: u64,
}

impl Default for CartMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl CartMirror {
    /// An empty mirror that has never been fetched, so it starts stale.
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            stale: true,
            next_token: 0,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &CartEntry> {
        self.rows.iter().map(|row| &row.entry)
    }

    pub fn summary(&self) -> CartSummary {
        cart::aggregate(self.entries())
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    pub fn has_pending(&self) -> bool {
        self.rows.iter().any(|row| row.pending.is_some())
    }

    /// Replace local state with the server's rows.
    pub async fn refresh<B>(&mut self, backend: &B) -> Result<(), ClientError>
    where
        B: CartBackend + ?Sized,
    {
        let entries = backend.fetch_cart().await?;
        tracing::debug!(rows = entries.len(), "cart mirror refreshed");
        self.rows = entries
            .into_iter()
            .map(|entry| Row {
                entry,
                pending: None,
            })
            .collect();
        self.stale = false;
        Ok(())
    }

    pub fn add_optimistic(&mut self, mut entry: CartEntry) -> PendingChange {
        let token = self.take_token();
        let product_id = entry.product_id;
        entry.id = None;
        self.rows.push(Row {
            entry,
            pending: Some(token),
        });
        PendingChange {
            token,
            kind: ChangeKind::Added { product_id },
        }
    }

    /// Drop every row of `product_id`, remembering where they sat.
    pub fn remove_optimistic(&mut self, product_id: i32) -> PendingChange {
        let token = self.take_token();
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.rows.len());
        for (index, row) in std::mem::take(&mut self.rows).into_iter().enumerate() {
            if row.entry.product_id == product_id {
                removed.push((index, row));
            } else {
                kept.push(row);
            }
        }
        self.rows = kept;
        PendingChange {
            token,
            kind: ChangeKind::Removed {
                product_id,
                rows: removed,
            },
        }
    }

    /// Undo an optimistic change, leaving other pending changes in place.
    pub fn rollback(&mut self, change: PendingChange) {
        match change.kind {
            ChangeKind::Added { .. } => {
                self.rows.retain(|row| row.pending != Some(change.token));
            }
            ChangeKind::Removed { rows, .. } => {
                for (index, row) in rows {
                    let at = index.min(self.rows.len());
                    self.rows.insert(at, row);
                }
            }
        }
    }

    /// Accept a change the server acknowledged. `row_id` is the id of the row
    /// the server created for an add.
    pub fn confirm(&mut self, change: PendingChange, row_id: Option<i32>) {
        if let ChangeKind::Added { .. } = change.kind {
            if let Some(row) = self
                .rows
                .iter_mut()
                .find(|row| row.pending == Some(change.token))
            {
                row.pending = None;
                row.entry.id = row_id;
            }
        }
    }

    pub async fn add<B>(&mut self, backend: &B, entry: CartEntry) -> Result<(), ClientError>
    where
        B: CartBackend + ?Sized,
    {
        let change = self.add_optimistic(entry);
        match backend.add_to_cart(change.product_id()).await {
            Ok(item) => {
                self.confirm(change, Some(item.id));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(product_id = change.product_id(), error = %err, "add to cart failed, rolling back");
                self.rollback(change);
                Err(err)
            }
        }
    }

    pub async fn remove<B>(&mut self, backend: &B, product_id: i32) -> Result<(), ClientError>
    where
        B: CartBackend + ?Sized,
    {
        let change = self.remove_optimistic(product_id);
        match backend.remove_from_cart(product_id).await {
            Ok(()) => {
                self.confirm(change, None);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(product_id, error = %err, "remove from cart failed, rolling back");
                self.rollback(change);
                Err(err)
            }
        }
    }

    fn take_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Price, parse_lenient};
    use mockall::predicate::eq;
    use rust_decimal::dec;

    fn entry(product_id: i32, price: &str) -> CartEntry {
        CartEntry {
            id: None,
            product_id,
            title: format!("Product {product_id}"),
            price: Price::from(parse_lenient(price)),
            original_price: None,
            category: None,
            image_url: None,
            product_url: None,
        }
    }

    fn server_row(id: i32, product_id: i32) -> CartItem {
        CartItem {
            id,
            product_id,
            user_id: "user_1".into(),
            quantity: 1,
            created_at: chrono::Utc::now().fixed_offset(),
        }
    }

    fn stored(id: i32, product_id: i32, price: &str) -> CartEntry {
        CartEntry {
            id: Some(id),
            ..entry(product_id, price)
        }
    }

    #[tokio::test]
    async fn refresh_replaces_local_state() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_fetch_cart()
            .times(1)
            .returning(|| Ok(vec![stored(1, 7, "10"), stored(2, 7, "10"), stored(3, 9, "5")]));

        let mut mirror = CartMirror::new();
        assert!(mirror.is_stale());
        let _pending = mirror.add_optimistic(entry(42, "1"));

        mirror.refresh(&backend).await.unwrap();
        assert!(!mirror.is_stale());
        assert!(!mirror.has_pending());
        assert_eq!(mirror.entries().count(), 3);

        let summary = mirror.summary();
        assert_eq!(summary.grand_total(), dec!(25.00));
        assert_eq!(summary.get(7).map(|line| line.quantity), Some(2));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_flag() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_fetch_cart()
            .returning(|| Err(ClientError::Status { status: 500, message: "boom".into() }));

        let mut mirror = CartMirror::new();
        assert!(mirror.refresh(&backend).await.is_err());
        assert!(mirror.is_stale());
    }

    #[tokio::test]
    async fn confirmed_add_takes_server_row_id() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_add_to_cart()
            .with(eq(7))
            .times(1)
            .returning(|product_id| Ok(server_row(55, product_id)));

        let mut mirror = CartMirror::new();
        mirror.add(&backend, entry(7, "10")).await.unwrap();

        let rows: Vec<_> = mirror.entries().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, Some(55));
        assert!(!mirror.has_pending());
    }

    #[tokio::test]
    async fn failed_add_rolls_back() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_add_to_cart()
            .returning(|_| Err(ClientError::NotFound));

        let mut mirror = CartMirror::new();
        mirror.rows.push(Row {
            entry: stored(1, 3, "4"),
            pending: None,
        });

        let err = mirror.add(&backend, entry(7, "10")).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound));
        assert_eq!(mirror.entries().map(|e| e.product_id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn failed_remove_restores_rows_in_place() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_fetch_cart()
            .returning(|| Ok(vec![stored(1, 7, "10"), stored(2, 9, "5"), stored(3, 7, "10")]));
        backend
            .expect_remove_from_cart()
            .with(eq(7))
            .returning(|_| Err(ClientError::Status { status: 502, message: "down".into() }));

        let mut mirror = CartMirror::new();
        mirror.refresh(&backend).await.unwrap();
        assert!(mirror.remove(&backend, 7).await.is_err());

        let ids: Vec<_> = mirror.entries().map(|e| e.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn successful_remove_drops_every_row_of_product() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_fetch_cart()
            .returning(|| Ok(vec![stored(1, 7, "10"), stored(2, 9, "5"), stored(3, 7, "10")]));
        backend.expect_remove_from_cart().returning(|_| Ok(()));

        let mut mirror = CartMirror::new();
        mirror.refresh(&backend).await.unwrap();
        mirror.remove(&backend, 7).await.unwrap();

        assert_eq!(mirror.summary().grand_total(), dec!(5.00));
    }

    #[test]
    fn rollback_of_one_add_keeps_other_pending_adds() {
        let mut mirror = CartMirror::new();
        let first = mirror.add_optimistic(entry(1, "2"));
        let second = mirror.add_optimistic(entry(2, "3"));

        mirror.rollback(first);
        assert_eq!(mirror.entries().map(|e| e.product_id).collect::<Vec<_>>(), vec![2]);

        mirror.confirm(second, Some(10));
        assert!(!mirror.has_pending());
    }

    #[test]
    fn invalidate_marks_stale() {
        let mut mirror = CartMirror::new();
        mirror.stale = false;
        mirror.invalidate();
        assert!(mirror.is_stale());
    }
}
