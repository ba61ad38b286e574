//! Ensemble dispatcher for conclave
//!
//! Fans one prompt out to every credentialed backend at once and folds the
//! survivors into an [`EnsembleResponses`] kept in registry order. Backend
//! failures are logged and dropped here; only [`Ensemble::dispatch_one`]
//! reports an error to its caller.

mod ensemble;
mod responses;
mod summary;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use ensemble::{DispatchSettings, Ensemble};
pub use responses::EnsembleResponses;
pub use summary::{NO_BACKENDS_SENTINEL, summarize};
