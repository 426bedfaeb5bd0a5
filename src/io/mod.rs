pub mod config_io;
pub mod journal;
pub mod lock;
pub mod store;

pub use store::{DocumentStore, StoreError};
