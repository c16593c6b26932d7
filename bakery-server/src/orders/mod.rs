//! Order lifecycle: storage and manager

pub mod manager;
pub mod storage;

pub use manager::{ManagerError, ManagerResult, OrdersManager, StockShortage};
pub use storage::{OrderStorage, PendingReconciliation, StorageError};
