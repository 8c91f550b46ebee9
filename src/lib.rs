pub mod build_id;
pub mod classify;
pub mod config;
pub mod error;
pub mod http_client;
pub mod prober;
pub mod report;
pub mod transport;

pub use crate::classify::{Classification, Classifier, PatternCountClassifier};
pub use crate::config::ProbeConfig;
pub use crate::prober::{PermitPool, Prober};
pub use crate::report::{MatchResult, ProbeEvent, Report};
pub use crate::transport::{RequestOutcome, Transport};
