//! Sessions: orchestrators wired to persistence, suggestions and HTTP.

pub mod manager;
pub mod registry;
pub mod routes;

pub use manager::{BlueprintSession, SaveStatus, SessionStatus};
pub use registry::{SessionRegistry, SharedSession};
pub use routes::{BlueprintRouteState, blueprint_routes};
