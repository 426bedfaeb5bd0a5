pub mod edit_ops;
pub mod error;
pub mod project_ops;
pub mod settle;
pub mod week_ops;

pub use edit_ops::{InsertAnchor, MovePosition};
pub use error::{DocError, ErrorKind};
pub use settle::{SettleOutcome, settle_week};
