//! Client side of the graph: the cached Graph Store and the backends it talks to.

pub mod backend;
pub mod error;
pub mod remote;
pub mod store;

pub use backend::{EmbeddedBackend, GraphBackend};
pub use error::{StoreError, StoreResult};
pub use remote::RemoteBackend;
pub use store::{build_properties, GraphStore};
