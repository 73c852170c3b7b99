#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Disposable `MongoDB` collections for integration tests.
//!
//! A [`TestDb`] is configured with a connection string, a database name and a
//! connect timeout. After [`TestDb::connect`] it hands out collections with
//! random `test_XXXXXXXX` names so concurrently running tests never share
//! state. Callers drop those collections and close the fixture themselves.
//!
//! Layout: `config.rs` (fixture settings and env overrides), `naming.rs`
//! (random collection names), `error.rs` (error type and duplicate-key
//! classification), `fixture.rs` (`TestDb`), `logging.rs` (test subscriber).

pub mod config;
pub mod error;
pub mod fixture;
pub mod logging;
pub mod naming;

pub use config::{ENV_TEST_MONGO_DB, ENV_TEST_MONGO_URL, EnvOverrides, FixtureConfig};
pub use error::{DUPLICATE_KEY_CODE, FixtureError, FixtureResult, is_duplicate_key_error};
pub use fixture::{NO_INDEXES, TestDb};
pub use naming::random_collection_name;

pub use mongodb;
