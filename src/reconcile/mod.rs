pub mod engine;
pub mod error;
pub mod pass;

pub use engine::{connect, new_process_executor, ClusterClient, ExternalObservation};
pub use error::ReconcileError;
pub use pass::{reconcile_once, PassOutcome};
