use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::ErrorCode;

/// Opaque reference to an object instance owned by the native library.
///
/// Zero is reserved and never identifies a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u32);

impl Handle {
    /// The reserved "no handle" value.
    pub const INVALID: Self = Self(0);

    /// Wraps a raw native handle.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value passed across the native boundary.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this handle may refer to a live native object.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates one in-flight native call with its eventual completion.
///
/// Minted by the dispatcher and only ever handed to the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandHandle(u32);

impl CommandHandle {
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value passed across the native boundary.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for CommandHandle {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of stateful objects the native library manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    /// A pairwise connection with a remote party.
    Connection,
    /// A credential schema published on the ledger.
    Schema,
    /// A credential definition bound to a schema.
    #[strum(serialize = "credential_definition")]
    CredentialDef,
    /// A credential offered and issued by this party.
    IssuerCredential,
    /// A proof requested from a remote party.
    Proof,
}

impl EntityKind {
    /// The native code reported when an operation targets a handle of this kind
    /// that is not (or no longer) live.
    #[must_use]
    pub const fn invalid_handle_code(self) -> ErrorCode {
        match self {
            Self::Connection => ErrorCode::InvalidConnectionHandle,
            Self::Schema => ErrorCode::InvalidSchemaHandle,
            Self::CredentialDef => ErrorCode::InvalidCredentialDefHandle,
            Self::IssuerCredential => ErrorCode::InvalidIssuerCredentialHandle,
            Self::Proof => ErrorCode::InvalidProofHandle,
        }
    }
}

/// Protocol stage of an entity.
///
/// The authoritative value lives in the native library; entities cache the
/// last value observed through `update_state`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, Serialize, Deserialize,
    uniffi::Enum,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum State {
    /// No native object backs the entity.
    #[default]
    None,
    /// Created, nothing sent yet.
    Initialized,
    /// An offer or request was sent to the remote party.
    OfferSent,
    /// The remote party answered with a request or presentation.
    RequestReceived,
    /// The exchange completed.
    Accepted,
    /// The remote party could not fulfil the request.
    Unfulfilled,
    /// The exchange timed out.
    Expired,
    /// The issued credential was revoked.
    Revoked,
}

impl State {
    /// Numeric code used by the native library.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Initialized => 1,
            Self::OfferSent => 2,
            Self::RequestReceived => 3,
            Self::Accepted => 4,
            Self::Unfulfilled => 5,
            Self::Expired => 6,
            Self::Revoked => 7,
        }
    }

    /// Decodes a native state code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::None,
            1 => Self::Initialized,
            2 => Self::OfferSent,
            3 => Self::RequestReceived,
            4 => Self::Accepted,
            5 => Self::Unfulfilled,
            6 => Self::Expired,
            7 => Self::Revoked,
            _ => return None,
        })
    }
}

impl From<State> for u32 {
    fn from(state: State) -> Self {
        state.code()
    }
}

impl TryFrom<u32> for State {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown state code {code}"))
    }
}

/// Verification outcome of a received proof, independent of [`State`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, Serialize, Deserialize,
    uniffi::Enum,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum ProofState {
    /// No proof has been verified yet.
    #[default]
    Undefined,
    /// The proof verified.
    Verified,
    /// The proof failed verification.
    Invalid,
}

impl ProofState {
    /// Numeric code used by the native library.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Undefined => 0,
            Self::Verified => 1,
            Self::Invalid => 2,
        }
    }

    /// Decodes a native proof-state code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Undefined,
            1 => Self::Verified,
            2 => Self::Invalid,
            _ => return None,
        })
    }
}

impl From<ProofState> for u32 {
    fn from(state: ProofState) -> Self {
        state.code()
    }
}

impl TryFrom<u32> for ProofState {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown proof state code {code}"))
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_state_codes_round_trip() {
        for state in State::iter() {
            assert_eq!(State::from_code(state.code()), Some(state));
        }
        assert_eq!(State::from_code(8), None);
    }

    #[test]
    fn test_state_serializes_as_native_code() {
        assert_eq!(serde_json::to_string(&State::OfferSent).unwrap(), "2");
        let state: State = serde_json::from_str("4").unwrap();
        assert_eq!(state, State::Accepted);
        assert!(serde_json::from_str::<State>("42").is_err());
    }

    #[test]
    fn test_proof_state_codes() {
        for state in ProofState::iter() {
            assert_eq!(ProofState::from_code(state.code()), Some(state));
        }
        assert_eq!(ProofState::from_code(3), None);
    }

    #[test]
    fn test_zero_handle_is_invalid() {
        assert!(!Handle::INVALID.is_valid());
        assert!(!Handle::default().is_valid());
        assert!(Handle::new(7).is_valid());
        assert_eq!(serde_json::to_string(&Handle::new(7)).unwrap(), "7");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(EntityKind::CredentialDef.to_string(), "credential_definition");
        assert_eq!(EntityKind::IssuerCredential.to_string(), "issuer_credential");
    }
}
