mod registry;
mod types;

pub use registry::{ConnectionRegistry, RegistryStats};
pub use types::{ConnectionHandle, ConnectionId};
