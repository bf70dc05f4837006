pub mod cancel;
pub mod cli;
pub mod config;
pub mod git;
pub mod install;
pub mod model;
pub mod resolver;
pub mod transport;

mod api;
mod flock;

pub use api::{Repofetch, RepofetchBuilder};
pub use cancel::{Cancellation, Cancelled};
pub use install::{InstallError, InstallOptions, Installer, Phase};
pub use model::{ResolvedRevision, RevisionSpecifier};
pub use resolver::{RemoteRevisionResolver, ResolveError, RevisionResolver};
pub use transport::{MemoryTransport, Transport, TransportError};
