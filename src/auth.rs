//! Access-token model and the per-client token store.

pub mod store;
pub mod token;

pub use store::*;
pub use token::*;
