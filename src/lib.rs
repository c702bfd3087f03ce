//! Client-side authorization state synchronization.
//!
//! Invariant: role membership is only ever observable for the session that
//! produced it. A role answer for a superseded session is discarded.
//!
//! # Public API Overview
//! - Track the signed-in user through [`SessionStore`], backed by any
//!   [`IdentityClient`].
//! - Derive the user's roles with [`RoleResolver`], backed by any
//!   [`RoleQueryService`].
//! - Follow realtime liveness through [`ConnectivitySignal`] on an explicit
//!   [`EventBus`].
//! - Contain render panics of a component subtree with [`FaultBoundary`].
//! - Configure from the environment with [`EnvConfig`] and install logging
//!   with [`init_logging`].

pub mod config;
pub mod error;
pub mod logging;

pub mod core;
pub mod platform;
pub mod runtime;
pub mod widgets;

/// Backend contract re-exports.
pub use identity_backend::{
    Identity, IdentityChangeCallback, IdentityClient, IdentityListenerHandle, QueryError,
    RoleQueryService, RoleRow, UserId,
};

/// Configuration and logging setup.
pub use crate::config::EnvConfig;
pub use crate::error::SyncError;
pub use crate::logging::init_logging;

/// Data model.
pub use crate::core::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::component::Component;
pub use crate::core::roles::{Role, RoleSet};
pub use crate::core::session::{Session, SessionStatus, SessionTransition};

/// Synchronization runtime.
pub use crate::runtime::{
    BusEvent, ConnectivityOptions, ConnectivitySignal, ConnectivityState, EventBus, RoleResolver,
    SessionStore, SubscriberId, Subscription, SyncOptions, DEFAULT_QUERY_TIMEOUT, LIVENESS_EVENT,
};

/// Fault containment.
pub use crate::widgets::{
    BoundaryId, BoundaryState, Container, FallbackView, FaultBoundary, FaultRecord,
    GenericFallback, RenderError,
};
