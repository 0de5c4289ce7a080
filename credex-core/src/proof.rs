use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    connection::Connection,
    entity::{entity_record, Entity, Kind, KindDescriptor},
    error::{CredexError, Result},
    native::{ops, NativeArg},
    runtime::Runtime,
    types::{Handle, ProofState, State},
};

/// A proof requested from a remote party.
pub type Proof = Entity<ProofKind>;

/// Marker for [`Proof`].
#[derive(Debug)]
pub struct ProofKind;

/// An attribute the remote party must disclose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct RequestedAttribute {
    /// Attribute name.
    pub name: String,
    /// Restricts the proof to credentials from this issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<String>,
    /// Restricts the proof to credentials of this schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_seq_no: Option<u32>,
}

impl RequestedAttribute {
    /// An unrestricted attribute.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issuer_did: None,
            schema_seq_no: None,
        }
    }
}

/// Proof data kept next to the handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofFields {
    /// Proof request name.
    pub name: String,
    /// Attributes requested from the remote party.
    pub requested_attrs: Vec<RequestedAttribute>,
    /// Verification outcome of the last received proof.
    pub proof_state: ProofState,
}

/// Serialized form of a [`Proof`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofRecord {
    /// Caller-supplied correlation id.
    pub source_id: String,
    /// Native handle at serialization time.
    pub handle: Handle,
    /// State at serialization time.
    pub state: State,
    /// Verification outcome at serialization time.
    #[serde(default)]
    pub proof_state: ProofState,
    /// Proof request name.
    pub name: String,
    /// Attributes requested from the remote party.
    pub requested_attrs: Vec<RequestedAttribute>,
    /// Native fields not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

entity_record!(ProofRecord);

impl Kind for ProofKind {
    type Record = ProofRecord;
    type Fields = ProofFields;

    fn descriptor() -> &'static KindDescriptor {
        &ops::PROOF
    }

    fn fields_from_record(record: &ProofRecord) -> ProofFields {
        ProofFields {
            name: record.name.clone(),
            requested_attrs: record.requested_attrs.clone(),
            proof_state: record.proof_state,
        }
    }
}

impl Entity<ProofKind> {
    /// Creates a proof request named `name` for the given attributes. No
    /// predicates are requested.
    ///
    /// # Errors
    ///
    /// Any error the native create operation reports.
    pub async fn create(
        runtime: &Arc<Runtime>,
        source_id: &str,
        name: &str,
        requested_attrs: Vec<RequestedAttribute>,
    ) -> Result<Self> {
        let encoded = serde_json::to_string(&requested_attrs)?;
        Self::create_with(
            runtime,
            source_id,
            &ops::PROOF_CREATE,
            vec![
                NativeArg::Str(source_id.to_string()),
                NativeArg::Str(encoded),
                NativeArg::Str("[]".to_string()),
                NativeArg::Str(name.to_string()),
            ],
            ProofFields {
                name: name.to_string(),
                requested_attrs,
                proof_state: ProofState::Undefined,
            },
        )
        .await
    }

    /// Sends the proof request over `connection`, then refreshes the state.
    ///
    /// # Errors
    ///
    /// The connection's invalid-handle error if it was released,
    /// [`CredexError::NotReady`] if it never connected, or any other error the
    /// native call reports.
    pub async fn request_proof(&mut self, connection: &Connection) -> Result<()> {
        self.call::<()>(&ops::PROOF_SEND_REQUEST, vec![connection.connection_arg()?])
            .await?;
        self.update_state().await?;
        Ok(())
    }

    /// Retrieves the proof the remote party presented, records its
    /// verification outcome in [`Proof::proof_state`] and returns the proof.
    ///
    /// # Errors
    ///
    /// [`CredexError::NotReady`] before a presentation arrived,
    /// [`CredexError::InvalidProof`] if the proof does not decode, or any
    /// other error the native call reports.
    pub async fn get_proof(&mut self, connection: &Connection) -> Result<Value> {
        let (code, proof): (u32, String) = self
            .call(&ops::PROOF_GET_PROOF, vec![connection.connection_arg()?])
            .await?;
        let proof_state = ProofState::from_code(code).ok_or_else(|| {
            CredexError::protocol(ops::PROOF_GET_PROOF.name, format!("unknown proof state {code}"))
        })?;
        self.fields_mut().proof_state = proof_state;

        serde_json::from_str(&proof).map_err(|_| CredexError::InvalidProof)
    }

    /// Verification outcome of the last received proof.
    #[must_use]
    pub fn proof_state(&self) -> ProofState {
        self.fields().proof_state
    }

    /// Attributes requested from the remote party.
    #[must_use]
    pub fn requested_attrs(&self) -> &[RequestedAttribute] {
        &self.fields().requested_attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_attribute_encoding() {
        let attrs = vec![
            RequestedAttribute::named("name"),
            RequestedAttribute {
                name: "degree".to_string(),
                issuer_did: Some("8XFh8yBzrpJQmNyZzgoTqB".to_string()),
                schema_seq_no: Some(44),
            },
        ];
        let encoded = serde_json::to_string(&attrs).unwrap();
        assert_eq!(
            encoded,
            r#"[{"name":"name"},{"name":"degree","issuer_did":"8XFh8yBzrpJQmNyZzgoTqB","schema_seq_no":44}]"#
        );
    }

    #[test]
    fn test_record_defaults_proof_state() {
        let record: ProofRecord = serde_json::from_str(
            r#"{"source_id":"p","handle":9,"state":2,"name":"n","requested_attrs":[]}"#,
        )
        .unwrap();
        assert_eq!(record.proof_state, ProofState::Undefined);
        assert_eq!(record.state, State::OfferSent);
    }
}
