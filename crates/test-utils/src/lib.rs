//! # Test Fixtures
//!
//! Key material and credentials for the holder, the Verifier, and a
//! credential Issuer.

pub mod issuer;
pub mod verifier;
pub mod wallet;

use std::sync::Once;

pub use issuer::Issuer;
pub use verifier::Verifier;
pub use wallet::Wallet;

static INIT: Once = Once::new();

/// Install a `fmt` subscriber filtered by `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracer() {
    INIT.call_once(|| {
        let _ = tracing::subscriber::set_global_default(
            tracing_subscriber::FmtSubscriber::builder()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .compact()
                .finish(),
        );
    });
}
