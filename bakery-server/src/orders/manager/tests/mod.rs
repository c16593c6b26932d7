use super::*;
use crate::notify::{NotifyError, TicketSender};
use crate::orders::storage::OrderStorage;
use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::Product;
use shared::order::CartLine;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

fn create_test_manager() -> OrdersManager {
    let storage = OrderStorage::open_in_memory().unwrap();
    OrdersManager::new(storage, Arc::new(crate::notify::LogTicketSender))
}

fn create_test_manager_with_sender(sender: Arc<dyn TicketSender>) -> OrdersManager {
    let storage = OrderStorage::open_in_memory().unwrap();
    OrdersManager::new(storage, sender)
}

/// Ticket sender that records calls and can be told to fail
#[derive(Default)]
struct RecordingSender {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingSender {
    fn failing() -> Self {
        let s = Self::default();
        s.fail.store(true, Ordering::SeqCst);
        s
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketSender for RecordingSender {
    async fn send(&self, _order: &shared::order::Order) -> Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            Err(NotifyError::Delivery("smtp unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn eur(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn seed_product(manager: &OrdersManager, id: u64, name: &str, price_cents: i64, stock: i32) {
    let product = Product {
        id,
        name: name.to_string(),
        price: eur(price_cents),
        stock,
        category: "bread".to_string(),
        image: None,
        is_active: true,
    };
    manager.storage().upsert_product(&product).unwrap();
}

fn cart(lines: &[(u64, i32)]) -> Vec<CartLine> {
    lines
        .iter()
        .map(|&(product_id, quantity)| CartLine::new(product_id, quantity))
        .collect()
}

fn stock_of(manager: &OrdersManager, product_id: u64) -> i32 {
    manager
        .storage()
        .get_product(product_id)
        .unwrap()
        .unwrap()
        .stock
}

mod test_concurrency;
mod test_transitions;
