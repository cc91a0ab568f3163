//! Frame routing and host address bookkeeping.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event_router` | [`NetworkEventRouter`], the star delegate |
//! | `ip_table` | Host → candidate IP lists |
//! | `notification` | Status observers |
//! | `registry` | Controllers and push receivers |

// ============================================================================
// Submodules
// ============================================================================

/// The router itself.
pub mod event_router;

/// Host → candidate IP lists.
pub mod ip_table;

/// In-process status notifications.
pub mod notification;

/// Controller and push-receiver registries.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use event_router::{Dispatch, NetworkEventRouter};
pub use ip_table::IpTable;
pub use notification::{CONNECTION_STATUS_CHANGED, Notification, NotificationCenter, Observer};
pub use registry::{Controller, ControllerRegistry, PushNotifyDelegate, PushRegistry};
