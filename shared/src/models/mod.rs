//! Data models shared between server and clients

mod product;

pub use product::Product;
