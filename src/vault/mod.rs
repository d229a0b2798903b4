//! Vault domain model, persistence, and CRUD surface

pub mod handler;
pub mod store;
pub mod types;

pub use handler::{vault_router, VaultState};
pub use store::{FileVaultStore, VaultStore};
