//! Gateway subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → per-prefix router (most specific prefix wins)
//!     → request.rs (query params, cache key, tile coords)
//!     → route cache (get-or-create compiled route, single-flight)
//!     → entry.rs (render template, resolve source)
//!     → resolved source serves the tile / metadata
//!
//! Overlay probing (at configuration load, per prefix, in the background):
//!     defaults render → resolve → probe format
//!     → vector? publish overlay entry, making <prefix>/_ servable
//! ```

pub mod entry;
pub mod middleware;
pub mod overlay;
pub mod request;
pub mod server;

pub use entry::{RouteBuildError, RouteEntry};
pub use overlay::OverlayEntry;
pub use server::{Gateway, GatewayError, PrefixState};
