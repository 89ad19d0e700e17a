//! # NodeSet Directory Mock
//!
//! In-memory stand-in for the NodeSet staking directory. Test suites use it
//! to register node operators, upload deposit data and signed exits, drive
//! deposit data sets through StakeWise vaults, and reset everything between
//! cases with named snapshots.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          HTTP (handlers)                             │
//! │  /api/*  /api/dev/*  /admin/*    envelope, bearer auth, errors       │
//! └───────────────────────────────┬──────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                     NodeSetManager (manager)                         │
//! │      signature checks ──► RwLock<SnapshotManager>                    │
//! │                                                                      │
//! │   ┌────────────────────────────────────────────────────────────┐     │
//! │   │ SnapshotManager (snapshot)                                 │     │
//! │   │   live ──► DirectoryState { Directory, SessionStore }      │     │
//! │   │   names ──► retained states                                │     │
//! │   └────────────────────────────────────────────────────────────┘     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | `directory` | users, nodes, validators, vaults and their invariants |
//! | `allocator` | deposit data set selection and vault hand-off |
//! | `session` | nonces, bearer tokens, login state |
//! | `snapshot` | named state versions and revert |
//! | `manager` | locking facade used by the HTTP layer |
//! | `handlers` | axum router |
//! | `server` | `MockServer`, the embeddable in-process server |
//! | `config`, `cli` | server configuration and command line |
//! | `error` | `DirectoryError` and its HTTP mapping |
//!
//! ## Invariants
//!
//! - Every operation fully applies or fully rejects.
//! - No panic on client input.
//! - A node address belongs to at most one user.

pub mod allocator;
pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod manager;
pub mod server;
pub mod session;
pub mod snapshot;

pub use config::ServerConfig;
pub use directory::{Directory, Node, StakeWiseVault, User, Validator};
pub use error::DirectoryError;
pub use handlers::{build_router, AppState};
pub use manager::NodeSetManager;
pub use server::MockServer;
pub use session::{Session, SessionStore};
pub use snapshot::{DirectoryState, SnapshotManager};
