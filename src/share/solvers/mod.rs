//! Challenge solver module registry.
//!
//! Each submodule handles one of the service's interstitials.

pub mod acw_sc;
pub mod verification;

pub use acw_sc::{ACW_COOKIE_NAME, AcwScV2Solver};
pub use verification::{DownloadVerification, VERIFICATION_MARKER, VerificationTokens};

/// Common solver interface.
pub trait ChallengeSolver {
    fn name(&self) -> &'static str;
}
