//! Native result codes and the typed errors they map to.

use strum::{Display, FromRepr};
use thiserror::Error;

use crate::types::EntityKind;

/// Result codes reported by the native library, either as the immediate
/// status of a call or through its completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u32)]
pub enum ErrorCode {
    /// The call succeeded.
    Success = 0,
    /// Unclassified failure.
    UnknownError = 1001,
    /// The agency could not be reached.
    ConnectionError = 1002,
    /// No connection with that handle.
    InvalidConnectionHandle = 1003,
    /// The library configuration was rejected.
    InvalidConfiguration = 1004,
    /// The object is not in a state that allows the call.
    NotReady = 1005,
    /// An option or argument was rejected.
    InvalidOption = 1007,
    /// A DID did not parse.
    InvalidDid = 1008,
    /// No issuer credential with that handle.
    InvalidIssuerCredentialHandle = 1015,
    /// A JSON argument did not parse.
    InvalidJson = 1016,
    /// No proof with that handle.
    InvalidProofHandle = 1017,
    /// Credential attributes had the wrong shape.
    InvalidAttributesStructure = 1021,
    /// The presented proof did not decode.
    InvalidProof = 1023,
    /// The schema was rejected or not found.
    InvalidSchema = 1031,
    /// Failure inside the underlying wallet and ledger library.
    UnknownLibindyError = 1035,
    /// The credential definition was rejected.
    InvalidCredentialDef = 1036,
    /// No credential definition with that handle.
    InvalidCredentialDefHandle = 1037,
    /// The underlying library timed out.
    TimeoutLibindyError = 1038,
    /// No schema with that sequence number.
    InvalidSchemaSequenceNumber = 1040,
    /// No schema with that handle.
    InvalidSchemaHandle = 1042,
    /// The library was already initialized.
    AlreadyInitialized = 1044,
}

impl ErrorCode {
    /// Raw code as seen on the native boundary.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Looks up a known native code.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_repr(code)
    }

    /// Human readable message the native library associates with the code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::UnknownError => "Unknown Error",
            Self::ConnectionError => "Error with Connection",
            Self::InvalidConnectionHandle => "Invalid Connection Handle",
            Self::InvalidConfiguration => "Invalid Configuration",
            Self::NotReady => "Object not ready for specified action",
            Self::InvalidOption => "Invalid Option",
            Self::InvalidDid => "Invalid DID",
            Self::InvalidIssuerCredentialHandle => "Invalid Credential Issuer Handle",
            Self::InvalidJson => "Invalid JSON string",
            Self::InvalidProofHandle => "Invalid Proof Handle",
            Self::InvalidAttributesStructure => "Attributes provided to Credential Offer are not correct, possibly malformed",
            Self::InvalidProof => "Proof had invalid format",
            Self::InvalidSchema => "Invalid Schema",
            Self::UnknownLibindyError => "Unknown libindy error",
            Self::InvalidCredentialDef => "Call to create Credential Definition failed",
            Self::InvalidCredentialDefHandle => "Invalid Credential Definition handle",
            Self::TimeoutLibindyError => "Waiting for callback timed out",
            Self::InvalidSchemaSequenceNumber => "No Schema for that schema sequence number",
            Self::InvalidSchemaHandle => "Invalid Schema Handle",
            Self::AlreadyInitialized => "Library already initialized",
        }
    }
}

/// Error outputs from `credex`.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum CredexError {
    /// The native library reported a code it does not document, or a generic failure.
    #[error("unknown_error: native code {code}")]
    Unknown {
        /// The raw native code.
        code: u32,
    },
    /// The remote party could not be reached.
    #[error("connection_error")]
    Connection,
    /// The handle does not identify a live object of this kind.
    #[error("invalid_handle: {kind}")]
    InvalidHandle {
        /// The kind the handle was expected to reference.
        kind: EntityKind,
    },
    /// Configuration rejected by the native library, or a create that yielded no handle.
    #[error("invalid_configuration")]
    InvalidConfiguration,
    /// The object is not in a state that allows the requested action.
    #[error("not_ready")]
    NotReady,
    /// An argument was rejected by the native library.
    #[error("invalid_option")]
    InvalidOption,
    /// A DID argument was rejected by the native library.
    #[error("invalid_did")]
    InvalidDid,
    /// Input could not be parsed or is missing required fields.
    #[error("invalid_input: {reason}")]
    InvalidInput {
        /// What was wrong with the input.
        reason: String,
    },
    /// The credential attribute structure is malformed.
    #[error("invalid_attributes")]
    InvalidAttributes,
    /// The received proof is malformed.
    #[error("invalid_proof")]
    InvalidProof,
    /// The schema does not exist or could not be read.
    #[error("invalid_schema")]
    InvalidSchema,
    /// The credential definition could not be created.
    #[error("invalid_credential_definition")]
    InvalidCredentialDef,
    /// A failure inside the library the native side itself depends on.
    #[error("underlying_library_error: native code {code}")]
    UnderlyingLibrary {
        /// The raw native code.
        code: u32,
    },
    /// `init` was already completed in this process.
    #[error("already_initialized")]
    AlreadyInitialized,
    /// No completion arrived within the configured call timeout.
    #[error("timeout: {operation}")]
    Timeout {
        /// The native operation that timed out.
        operation: String,
    },
    /// The call was abandoned before a completion was delivered.
    #[error("abandoned: {operation}")]
    Abandoned {
        /// The native operation that was abandoned.
        operation: String,
    },
    /// The runtime has been shut down.
    #[error("shut_down")]
    ShutDown,
    /// The native library broke the completion protocol.
    #[error("protocol_error: {operation}: {reason}")]
    Protocol {
        /// The native operation whose completion was malformed.
        operation: String,
        /// What was malformed.
        reason: String,
    },
}

impl CredexError {
    /// Translates a non-zero native code into a typed error.
    ///
    /// A zero code is not an error; callers only invoke this after checking
    /// for success. It maps to [`CredexError::Unknown`] if they do not.
    #[must_use]
    pub fn from_native_code(code: u32) -> Self {
        let Some(known) = ErrorCode::from_code(code) else {
            return Self::Unknown { code };
        };

        match known {
            ErrorCode::Success | ErrorCode::UnknownError => Self::Unknown { code },
            ErrorCode::ConnectionError => Self::Connection,
            ErrorCode::InvalidConnectionHandle => Self::InvalidHandle {
                kind: EntityKind::Connection,
            },
            ErrorCode::InvalidConfiguration => Self::InvalidConfiguration,
            ErrorCode::NotReady => Self::NotReady,
            ErrorCode::InvalidOption => Self::InvalidOption,
            ErrorCode::InvalidDid => Self::InvalidDid,
            ErrorCode::InvalidIssuerCredentialHandle => Self::InvalidHandle {
                kind: EntityKind::IssuerCredential,
            },
            ErrorCode::InvalidJson => Self::InvalidInput {
                reason: known.message().to_string(),
            },
            ErrorCode::InvalidProofHandle => Self::InvalidHandle {
                kind: EntityKind::Proof,
            },
            ErrorCode::InvalidAttributesStructure => Self::InvalidAttributes,
            ErrorCode::InvalidProof => Self::InvalidProof,
            ErrorCode::InvalidSchema | ErrorCode::InvalidSchemaSequenceNumber => {
                Self::InvalidSchema
            }
            ErrorCode::UnknownLibindyError | ErrorCode::TimeoutLibindyError => {
                Self::UnderlyingLibrary { code }
            }
            ErrorCode::InvalidCredentialDef => Self::InvalidCredentialDef,
            ErrorCode::InvalidCredentialDefHandle => Self::InvalidHandle {
                kind: EntityKind::CredentialDef,
            },
            ErrorCode::InvalidSchemaHandle => Self::InvalidHandle {
                kind: EntityKind::Schema,
            },
            ErrorCode::AlreadyInitialized => Self::AlreadyInitialized,
        }
    }

    /// The native code this error corresponds to, if it originated on (or has
    /// an equivalent on) the native side.
    #[must_use]
    pub const fn native_code(&self) -> Option<u32> {
        let code = match self {
            Self::Unknown { code } | Self::UnderlyingLibrary { code } => return Some(*code),
            Self::Connection => ErrorCode::ConnectionError,
            Self::InvalidHandle { kind } => kind.invalid_handle_code(),
            Self::InvalidConfiguration => ErrorCode::InvalidConfiguration,
            Self::NotReady => ErrorCode::NotReady,
            Self::InvalidOption => ErrorCode::InvalidOption,
            Self::InvalidDid => ErrorCode::InvalidDid,
            Self::InvalidInput { .. } => ErrorCode::InvalidJson,
            Self::InvalidAttributes => ErrorCode::InvalidAttributesStructure,
            Self::InvalidProof => ErrorCode::InvalidProof,
            Self::InvalidSchema => ErrorCode::InvalidSchema,
            Self::InvalidCredentialDef => ErrorCode::InvalidCredentialDef,
            Self::AlreadyInitialized => ErrorCode::AlreadyInitialized,
            Self::Timeout { .. }
            | Self::Abandoned { .. }
            | Self::ShutDown
            | Self::Protocol { .. } => return None,
        };
        Some(code.code())
    }

    /// Error for an operation attempted on a released or never-assigned handle.
    #[must_use]
    pub const fn invalid_handle(kind: EntityKind) -> Self {
        Self::InvalidHandle { kind }
    }

    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn protocol(operation: &str, reason: impl Into<String>) -> Self {
        Self::Protocol {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CredexError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidInput {
            reason: error.to_string(),
        }
    }
}

/// Crate-wide result type.
pub type Result<T, E = CredexError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(1003, CredexError::InvalidHandle { kind: EntityKind::Connection })]
    #[test_case(1015, CredexError::InvalidHandle { kind: EntityKind::IssuerCredential })]
    #[test_case(1017, CredexError::InvalidHandle { kind: EntityKind::Proof })]
    #[test_case(1037, CredexError::InvalidHandle { kind: EntityKind::CredentialDef })]
    #[test_case(1042, CredexError::InvalidHandle { kind: EntityKind::Schema })]
    #[test_case(1002, CredexError::Connection)]
    #[test_case(1004, CredexError::InvalidConfiguration)]
    #[test_case(1005, CredexError::NotReady)]
    #[test_case(1021, CredexError::InvalidAttributes)]
    #[test_case(1031, CredexError::InvalidSchema)]
    #[test_case(1040, CredexError::InvalidSchema)]
    #[test_case(1035, CredexError::UnderlyingLibrary { code: 1035 })]
    #[test_case(1038, CredexError::UnderlyingLibrary { code: 1038 })]
    #[test_case(1044, CredexError::AlreadyInitialized)]
    #[test_case(4242, CredexError::Unknown { code: 4242 })]
    fn test_native_code_mapping(code: u32, expected: CredexError) {
        assert_eq!(CredexError::from_native_code(code), expected);
    }

    #[test]
    fn test_invalid_json_maps_to_invalid_input() {
        let error = CredexError::from_native_code(1016);
        assert!(matches!(error, CredexError::InvalidInput { .. }));
        assert_eq!(error.native_code(), Some(1016));
    }

    #[test]
    fn test_native_code_round_trip_for_handles() {
        for code in [1003, 1015, 1017, 1037, 1042] {
            assert_eq!(CredexError::from_native_code(code).native_code(), Some(code));
        }
    }

    #[test]
    fn test_local_errors_have_no_native_code() {
        assert_eq!(CredexError::ShutDown.native_code(), None);
        assert_eq!(
            CredexError::Timeout {
                operation: "vcx_init".to_string()
            }
            .native_code(),
            None
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ErrorCode::InvalidConnectionHandle.message(),
            "Invalid Connection Handle"
        );
        assert_eq!(ErrorCode::from_code(1044), Some(ErrorCode::AlreadyInitialized));
        assert_eq!(ErrorCode::from_code(1006), None);
    }
}
