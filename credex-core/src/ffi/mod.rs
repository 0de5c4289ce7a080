//! Foreign-language surface exported through `UniFFI`.
//!
//! The core entities take `&mut self` for operations that change their state.
//! Foreign callers share objects freely, so every entity is wrapped in a
//! [`tokio::sync::Mutex`] and operations on one object run one at a time.
//! Operations on different objects still run concurrently.
//!
//! ## Swift
//!
//! ```swift
//! let runtime = try CredexRuntime.inMemory(configJson: nil)
//! try await runtime.initialize(config: "ENABLE_TEST_MODE")
//!
//! let connection = try await Connection.create(runtime: runtime, sourceId: "alice")
//! let invite = try await connection.connect(options: ConnectOptions(phone: nil))
//! ```

mod entities;
pub use entities::{Connection, CredentialDef, IssuerCredential, Proof, ProofResult, Schema};

mod runtime;
pub use runtime::CredexRuntime;
