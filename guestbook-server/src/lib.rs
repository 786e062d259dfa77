//! guestbook-server: HTTP routing for the guestbook
//!
//! Maps `/lrange`, `/rpush`, `/info` and `/env` onto the primary and replica
//! store pools, settling every failure through one deployment-wide
//! [`ErrorPolicy`].

pub mod env;
pub mod error;
pub mod http;
pub mod policy;
pub mod state;

pub use env::EnvironmentSnapshot;
pub use error::{FailureKind, GuestbookError};
pub use http::{build_router, run_server, ServerConfig, ServerError};
pub use policy::{ErrorPolicy, Failure, ProcessExit, Resolution, Terminator};
pub use state::AppState;
