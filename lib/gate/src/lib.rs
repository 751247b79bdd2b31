//! Identity-session gate for authgate.
//!
//! This crate provides:
//! - `AuthGate`: the state machine over the current user (sign-in, link,
//!   unlink, sign-out, delete) with startup re-validation
//! - `ValidationPolicy`: which linked identities to re-validate and how to
//!   react when one fails
//! - `CredentialProvider` / `ProviderRegistry`: the provider capability
//!   interface and its lookup table
//! - `IdentityStore` / `HintStore`: the backend collaborators the gate calls
//! - `GateFacade`: optional process-wide access to an installed gate
//! - In-memory collaborators (`MemoryIdentityStore`, `MemoryHintStore`,
//!   `VirtualProvider`) for development without a real backend
//!
//! # Example
//!
//! ```
//! use authgate::{
//!     AuthGate, GateConfig, MemoryHintStore, MemoryIdentityStore, ProviderRegistry,
//!     VirtualProvider,
//! };
//! use authgate_core::ProviderId;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = ProviderRegistry::new()
//!     .with(Arc::new(VirtualProvider::new(ProviderId::google())))
//!     .expect("unique provider ids");
//! let gate = AuthGate::new(
//!     registry,
//!     Arc::new(MemoryIdentityStore::new()),
//!     Arc::new(MemoryHintStore::new()),
//!     &GateConfig::default(),
//! );
//!
//! let initialized = gate.initialize().await.expect("initialize");
//! assert!(!initialized.session.is_valid());
//!
//! let session = gate.sign_in(&ProviderId::google()).await.expect("sign in");
//! assert!(session.is_valid());
//! assert_eq!(gate.latest_provider(), Some(ProviderId::google()));
//! # });
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod gate;
pub mod identity;
pub mod memory;
pub mod policy;
pub mod provider;
pub mod session;
pub mod store;
pub mod virtual_provider;

// Re-export main types at crate root
pub use config::{DEFAULT_HINT_KEY, GateConfig, load_layered};
pub use error::{GateError, IdentityStoreError, ProviderError, RegistryError};
pub use facade::GateFacade;
pub use gate::{AuthGate, Initialized};
pub use identity::{Account, Credential, LinkOutcome, LinkedIdentity};
pub use memory::{MemoryHintStore, MemoryIdentityStore, MemoryState};
pub use policy::{ValidationPolicy, ValidationReport, ValidationWarning};
pub use provider::{CredentialProvider, ProviderRegistry};
pub use session::{GateState, UserSession};
pub use store::{HintStore, IdentityStore, LatestProviderHint, StoreOperation};
pub use virtual_provider::{SignInBehavior, ValidateBehavior, VirtualProvider};
