//! `credex-core` drives a native, handle-based credential-exchange library
//! through its asynchronous call/completion protocol.
//!
//! The crate is organised leaf-first:
//!
//! - [`error`]: native result codes and the typed [`CredexError`].
//! - [`dispatch`]: the command dispatcher, the pending-completion registry and
//!   the completion bridge the native library calls back into.
//! - [`native`]: the native boundary ([`NativeLibrary`]), the static operation
//!   table and the two implementations (the linked C library behind the
//!   `native` feature and the in-process [`InMemoryLibrary`]).
//! - [`Runtime`]: owns the dispatcher and the library for the lifetime of the
//!   process.
//! - [`entity`]: the generic lifecycle contract shared by every entity kind,
//!   and the five kinds built on it ([`Connection`], [`Schema`],
//!   [`CredentialDef`], [`IssuerCredential`], [`Proof`]).
//! - [`ffi`]: the `UniFFI` objects foreign callers use, and [`logger`] for
//!   forwarding the crate's `tracing` output to them.
//!
//! ```rust,no_run
//! use credex_core::{Connection, ConnectOptions, Runtime, RuntimeConfig, TEST_MODE_CONFIG};
//!
//! # async fn run() -> credex_core::Result<()> {
//! let runtime = Runtime::in_memory(RuntimeConfig::default());
//! runtime.init(TEST_MODE_CONFIG).await?;
//!
//! let mut connection = Connection::create(&runtime, "123").await?;
//! let invitation = connection.connect(ConnectOptions::sms("8019119191")).await?;
//! assert!(!invitation.is_empty());
//! # Ok(())
//! # }
//! ```

mod config;
pub use config::RuntimeConfig;

mod defaults;
pub use defaults::{DEFAULT_CALL_TIMEOUT, DEFAULT_SIMULATED_LATENCY, TEST_MODE_CONFIG};

pub mod dispatch;

pub mod entity;
pub use entity::{Entity, EntityRecord, Kind, KindDescriptor};

pub mod error;
pub use error::{CredexError, ErrorCode, Result};

pub mod ffi;

pub mod logger;

pub mod native;
pub use native::{InMemoryLibrary, NativeLibrary};

mod runtime;
pub use runtime::Runtime;

mod types;
pub use types::*;

mod connection;
pub use connection::{ConnectOptions, Connection, ConnectionFields, ConnectionKind, ConnectionRecord};

mod credential_def;
pub use credential_def::{
    CredentialDef, CredentialDefFields, CredentialDefKind, CredentialDefRecord,
};

mod issuer_credential;
pub use issuer_credential::{
    IssuerCredential, IssuerCredentialFields, IssuerCredentialKind, IssuerCredentialRecord,
};

mod proof;
pub use proof::{Proof, ProofFields, ProofKind, ProofRecord, RequestedAttribute};

mod schema;
pub use schema::{Schema, SchemaData, SchemaFields, SchemaKind, SchemaRecord};

uniffi::setup_scaffolding!("credex_core");
