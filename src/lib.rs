//! Heirloom - Digital legacy vault release and access-control engine
//!
//! Heirloom stores personal memories (video/audio/photo/text) and
//! releases them to others under time- or event-based conditions. This
//! crate is the engine deciding, for any (viewer, memory) pair, whether
//! the memory is currently visible, plus the machinery that promotes
//! pending memories to released over time.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API layer (axum)                        │
//! │   viewer id from the identity gateway (x-viewer-id header)   │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//! ┌──────▼────────┐   ┌─────────▼─────────┐   ┌─────────▼────────┐
//! │    Access     │   │    Share-Link     │   │     Release      │
//! │   Evaluator   │   │ Issuer/Verifier   │   │     Sweeper      │
//! │ ordered gates │   │ capability tokens │   │ timer + death    │
//! └──────┬────────┘   └─────────┬─────────┘   │ trigger, emit-   │
//!        │                      │             │ once discipline  │
//! ┌──────▼──────────────────────▼───┐         └────────┬─────────┘
//! │         Policy Resolver         │                  │
//! │  snapshot → effective rule +    │         ┌────────▼─────────┐
//! │  concrete gate time (pure)      │         │     Notifier     │
//! └──────┬──────────────────────────┘         │ webhook dispatch │
//!        │                                    └──────────────────┘
//! ┌──────▼──────────────────────────────────────────────────────┐
//! │            Vault store (JSON-file-backed, trait seam)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Visibility rules
//!
//! Checks run in a fixed order: owner bypass, then the global death and
//! time gates, then public/shared membership. Denials are result values
//! with reason codes, never errors. Share links bypass ownership and
//! sharing but still honor both gates.
//!
//! ## Modules
//!
//! - [`release`]: policy resolver, access evaluator, release sweeper
//! - [`sharing`]: share-link issuance, verification, revocation
//! - [`vault`]: data model and store
//! - [`notify`]: release-event dispatch
//! - [`clock`]: injectable time source
//! - [`config`]: configuration management

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod release;
pub mod sharing;
pub mod vault;

pub use config::HeirloomConfig;
pub use error::{Error, Result};
