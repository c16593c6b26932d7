//! redb-based storage for the order lifecycle
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `products` | `product_id` | `Product` | Catalog incl. authoritative stock |
//! | `orders` | `order_id` | `Order` | Committed orders |
//! | `consumed_payments` | `payment_intent_id` | `order_id` | At-most-once payment binding |
//! | `counters` | name | `u64` | Order id / order number counters |
//! | `pending_reconciliation` | `payment_intent_id` | `PendingReconciliation` | Charged-but-uncommitted queue |
//!
//! # Atomicity
//!
//! redb serializes write transactions, so the whole commit sequence
//! (duplicate-payment check, stock re-validation, stock decrement, order
//! insert, payment binding) runs inside a single transaction: two commits
//! racing on the last unit of stock cannot both observe it available.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::models::Product;
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Catalog table: key = product id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("products");

/// Orders table: key = order id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("orders");

/// Consumed payment references: key = payment intent id, value = order id
const CONSUMED_PAYMENTS_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("consumed_payments");

/// Counters table: key = "order_id" | "order_count", value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// Reconciliation queue: key = payment intent id, value = JSON entry
const RECONCILIATION_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("pending_reconciliation");

const ORDER_ID_KEY: &str = "order_id";
const ORDER_COUNT_KEY: &str = "order_count";

/// A charge that succeeded without a corresponding order commit
///
/// Written in its own transaction when a commit fails after payment
/// authorization, so it survives the aborted commit. Consumed by the
/// admin reconciliation view.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReconciliation {
    pub payment_intent_id: String,
    pub customer_id: u64,
    pub reason: String,
    pub created_at: i64,
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    #[error("Product not found: {0}")]
    ProductNotFound(u64),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl OrderStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and ephemeral dev runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(CONSUMED_PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(RECONCILIATION_TABLE)?;
            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(ORDER_ID_KEY)?.is_none() {
                counters.insert(ORDER_ID_KEY, 0u64)?;
            }
            if counters.get(ORDER_COUNT_KEY)?.is_none() {
                counters.insert(ORDER_COUNT_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Counter Operations (within transaction) ==========

    /// Increment and return the next order id
    pub fn next_order_id_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        self.bump_counter(txn, ORDER_ID_KEY)
    }

    /// Increment and return the daily-ish order counter (order number suffix)
    pub fn next_order_count_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        self.bump_counter(txn, ORDER_COUNT_KEY)
    }

    fn bump_counter(&self, txn: &WriteTransaction, key: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(key)?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next)
    }

    // ========== Product Operations ==========

    /// Insert or replace a product
    pub fn upsert_product(&self, product: &Product) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.put_product_txn(&txn, product)?;
        txn.commit()?;
        Ok(())
    }

    /// Write a product row within a transaction
    pub fn put_product_txn(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let bytes = serde_json::to_vec(product)?;
        table.insert(product.id, bytes.as_slice())?;
        Ok(())
    }

    /// Read a product row within a write transaction
    pub fn get_product_txn(
        &self,
        txn: &WriteTransaction,
        product_id: u64,
    ) -> StorageResult<Option<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        match table.get(product_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Read a product (read-only)
    pub fn get_product(&self, product_id: u64) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(product_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All products (catalog listing)
    pub fn list_products(&self) -> StorageResult<Vec<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        let mut products = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            products.push(serde_json::from_slice(value.value())?);
        }
        Ok(products)
    }

    // ========== Payment Binding ==========

    /// Whether a payment reference was already consumed (within txn)
    pub fn is_payment_consumed_txn(
        &self,
        txn: &WriteTransaction,
        payment_intent_id: &str,
    ) -> StorageResult<Option<u64>> {
        let table = txn.open_table(CONSUMED_PAYMENTS_TABLE)?;
        Ok(table.get(payment_intent_id)?.map(|g| g.value()))
    }

    /// Bind a payment reference to an order (within txn)
    pub fn bind_payment_txn(
        &self,
        txn: &WriteTransaction,
        payment_intent_id: &str,
        order_id: u64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CONSUMED_PAYMENTS_TABLE)?;
        table.insert(payment_intent_id, order_id)?;
        Ok(())
    }

    /// Look up the order bound to a payment reference (read-only)
    pub fn order_for_payment(&self, payment_intent_id: &str) -> StorageResult<Option<u64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONSUMED_PAYMENTS_TABLE)?;
        Ok(table.get(payment_intent_id)?.map(|g| g.value()))
    }

    // ========== Order Operations ==========

    /// Write an order row within a transaction
    pub fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let bytes = serde_json::to_vec(order)?;
        table.insert(order.id, bytes.as_slice())?;
        Ok(())
    }

    /// Read an order row within a write transaction
    pub fn get_order_txn(&self, txn: &WriteTransaction, order_id: u64) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Read an order (read-only)
    pub fn get_order(&self, order_id: u64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All orders matching a predicate, newest first
    ///
    /// The order book of a single bakery stays small; a table scan keeps
    /// the storage schema to one table without secondary indexes.
    pub fn find_orders<F>(&self, predicate: F) -> StorageResult<Vec<Order>>
    where
        F: Fn(&Order) -> bool,
    {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let order: Order = serde_json::from_slice(value.value())?;
            if predicate(&order) {
                orders.push(order);
            }
        }
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    // ========== Reconciliation Queue ==========

    /// Record a charged-but-uncommitted payment
    ///
    /// Runs in its own transaction: it must survive the failed commit
    /// that triggered it.
    pub fn push_reconciliation(&self, entry: &PendingReconciliation) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(RECONCILIATION_TABLE)?;
            let bytes = serde_json::to_vec(entry)?;
            table.insert(entry.payment_intent_id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// All pending reconciliation entries
    pub fn list_reconciliations(&self) -> StorageResult<Vec<PendingReconciliation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECONCILIATION_TABLE)?;
        let mut entries = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}
