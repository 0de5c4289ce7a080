//! Static table of the native operations and their completion shapes.

use super::ResultShape;
use crate::types::EntityKind;

/// A named native entry point together with the shape of its completion.
///
/// Synchronous entry points (the `*_release` family) use [`ResultShape::Unit`]
/// and never produce a completion.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Operation {
    /// The native symbol name.
    pub name: &'static str,
    /// The values the completion carries.
    pub shape: ResultShape,
}

impl Operation {
    const fn new(name: &'static str, shape: ResultShape) -> Self {
        Self { name, shape }
    }
}

/// The lifecycle operations every entity kind exposes.
#[derive(Debug)]
pub struct KindDescriptor {
    /// The kind these operations manage.
    pub kind: EntityKind,
    /// Rebuilds a native object from a serialized payload; completes with a handle.
    pub deserialize: &'static Operation,
    /// Serializes a native object; completes with JSON.
    pub serialize: &'static Operation,
    /// Synchronously frees a native object.
    pub release: &'static Operation,
    /// Polls the remote party and refreshes the state; completes with the state code.
    pub update_state: &'static Operation,
    /// Reads the current state without refreshing it; completes with the state code.
    pub get_state: &'static Operation,
}

use ResultShape::{Text, U32Text, Unit, U32};

/// `vcx_init(config)`.
pub static INIT: Operation = Operation::new("vcx_init", Unit);

/// `vcx_connection_create(source_id) -> handle`.
pub static CONNECTION_CREATE: Operation = Operation::new("vcx_connection_create", U32);
/// `vcx_connection_connect(handle, options_json) -> invite_details`.
pub static CONNECTION_CONNECT: Operation = Operation::new("vcx_connection_connect", Text);
/// `vcx_connection_invite_details(handle, abbreviated) -> invite_details`.
pub static CONNECTION_INVITE_DETAILS: Operation =
    Operation::new("vcx_connection_invite_details", Text);
/// `vcx_connection_delete_connection(handle)`.
pub static CONNECTION_DELETE: Operation =
    Operation::new("vcx_connection_delete_connection", Unit);
static CONNECTION_SERIALIZE: Operation = Operation::new("vcx_connection_serialize", Text);
static CONNECTION_DESERIALIZE: Operation = Operation::new("vcx_connection_deserialize", U32);
static CONNECTION_RELEASE: Operation = Operation::new("vcx_connection_release", Unit);
static CONNECTION_UPDATE_STATE: Operation = Operation::new("vcx_connection_update_state", U32);
static CONNECTION_GET_STATE: Operation = Operation::new("vcx_connection_get_state", U32);

/// `vcx_schema_create(source_id, name, attr_names_json) -> handle`.
pub static SCHEMA_CREATE: Operation = Operation::new("vcx_schema_create", U32);
/// `vcx_schema_get_attributes(source_id, sequence_number) -> schema_json`.
pub static SCHEMA_GET_ATTRIBUTES: Operation = Operation::new("vcx_schema_get_attributes", Text);
static SCHEMA_SERIALIZE: Operation = Operation::new("vcx_schema_serialize", Text);
static SCHEMA_DESERIALIZE: Operation = Operation::new("vcx_schema_deserialize", U32);
static SCHEMA_RELEASE: Operation = Operation::new("vcx_schema_release", Unit);
static SCHEMA_UPDATE_STATE: Operation = Operation::new("vcx_schema_update_state", U32);
static SCHEMA_GET_STATE: Operation = Operation::new("vcx_schema_get_state", U32);

/// `vcx_credentialdef_create(source_id, name, schema_seq_no, issuer_did, revocation) -> handle`.
pub static CREDENTIAL_DEF_CREATE: Operation = Operation::new("vcx_credentialdef_create", U32);
static CREDENTIAL_DEF_SERIALIZE: Operation = Operation::new("vcx_credentialdef_serialize", Text);
static CREDENTIAL_DEF_DESERIALIZE: Operation =
    Operation::new("vcx_credentialdef_deserialize", U32);
static CREDENTIAL_DEF_RELEASE: Operation = Operation::new("vcx_credentialdef_release", Unit);
static CREDENTIAL_DEF_UPDATE_STATE: Operation =
    Operation::new("vcx_credentialdef_update_state", U32);
static CREDENTIAL_DEF_GET_STATE: Operation = Operation::new("vcx_credentialdef_get_state", U32);

/// `vcx_issuer_create_credential(source_id, schema_seq_no, issuer_did, attributes_json, name) -> handle`.
pub static ISSUER_CREDENTIAL_CREATE: Operation =
    Operation::new("vcx_issuer_create_credential", U32);
/// `vcx_issuer_send_credential_offer(handle, connection_handle)`.
pub static ISSUER_CREDENTIAL_SEND_OFFER: Operation =
    Operation::new("vcx_issuer_send_credential_offer", Unit);
/// `vcx_issuer_send_credential(handle, connection_handle)`.
pub static ISSUER_CREDENTIAL_SEND_CREDENTIAL: Operation =
    Operation::new("vcx_issuer_send_credential", Unit);
static ISSUER_CREDENTIAL_SERIALIZE: Operation =
    Operation::new("vcx_issuer_credential_serialize", Text);
static ISSUER_CREDENTIAL_DESERIALIZE: Operation =
    Operation::new("vcx_issuer_credential_deserialize", U32);
static ISSUER_CREDENTIAL_RELEASE: Operation =
    Operation::new("vcx_issuer_credential_release", Unit);
static ISSUER_CREDENTIAL_UPDATE_STATE: Operation =
    Operation::new("vcx_issuer_credential_update_state", U32);
static ISSUER_CREDENTIAL_GET_STATE: Operation =
    Operation::new("vcx_issuer_credential_get_state", U32);

/// `vcx_proof_create(source_id, requested_attrs_json, requested_predicates_json, name) -> handle`.
pub static PROOF_CREATE: Operation = Operation::new("vcx_proof_create", U32);
/// `vcx_proof_send_request(handle, connection_handle)`.
pub static PROOF_SEND_REQUEST: Operation = Operation::new("vcx_proof_send_request", Unit);
/// `vcx_get_proof(handle, connection_handle) -> (proof_state, proof_json)`.
pub static PROOF_GET_PROOF: Operation = Operation::new("vcx_get_proof", U32Text);
static PROOF_SERIALIZE: Operation = Operation::new("vcx_proof_serialize", Text);
static PROOF_DESERIALIZE: Operation = Operation::new("vcx_proof_deserialize", U32);
static PROOF_RELEASE: Operation = Operation::new("vcx_proof_release", Unit);
static PROOF_UPDATE_STATE: Operation = Operation::new("vcx_proof_update_state", U32);
static PROOF_GET_STATE: Operation = Operation::new("vcx_proof_get_state", U32);

/// Lifecycle operations of [`EntityKind::Connection`].
pub static CONNECTION: KindDescriptor = KindDescriptor {
    kind: EntityKind::Connection,
    deserialize: &CONNECTION_DESERIALIZE,
    serialize: &CONNECTION_SERIALIZE,
    release: &CONNECTION_RELEASE,
    update_state: &CONNECTION_UPDATE_STATE,
    get_state: &CONNECTION_GET_STATE,
};

/// Lifecycle operations of [`EntityKind::Schema`].
pub static SCHEMA: KindDescriptor = KindDescriptor {
    kind: EntityKind::Schema,
    deserialize: &SCHEMA_DESERIALIZE,
    serialize: &SCHEMA_SERIALIZE,
    release: &SCHEMA_RELEASE,
    update_state: &SCHEMA_UPDATE_STATE,
    get_state: &SCHEMA_GET_STATE,
};

/// Lifecycle operations of [`EntityKind::CredentialDef`].
pub static CREDENTIAL_DEF: KindDescriptor = KindDescriptor {
    kind: EntityKind::CredentialDef,
    deserialize: &CREDENTIAL_DEF_DESERIALIZE,
    serialize: &CREDENTIAL_DEF_SERIALIZE,
    release: &CREDENTIAL_DEF_RELEASE,
    update_state: &CREDENTIAL_DEF_UPDATE_STATE,
    get_state: &CREDENTIAL_DEF_GET_STATE,
};

/// Lifecycle operations of [`EntityKind::IssuerCredential`].
pub static ISSUER_CREDENTIAL: KindDescriptor = KindDescriptor {
    kind: EntityKind::IssuerCredential,
    deserialize: &ISSUER_CREDENTIAL_DESERIALIZE,
    serialize: &ISSUER_CREDENTIAL_SERIALIZE,
    release: &ISSUER_CREDENTIAL_RELEASE,
    update_state: &ISSUER_CREDENTIAL_UPDATE_STATE,
    get_state: &ISSUER_CREDENTIAL_GET_STATE,
};

/// Lifecycle operations of [`EntityKind::Proof`].
pub static PROOF: KindDescriptor = KindDescriptor {
    kind: EntityKind::Proof,
    deserialize: &PROOF_DESERIALIZE,
    serialize: &PROOF_SERIALIZE,
    release: &PROOF_RELEASE,
    update_state: &PROOF_UPDATE_STATE,
    get_state: &PROOF_GET_STATE,
};

/// Every native entry point this crate calls.
pub static ALL_OPERATIONS: &[&Operation] = &[
    &INIT,
    &CONNECTION_CREATE,
    &CONNECTION_CONNECT,
    &CONNECTION_INVITE_DETAILS,
    &CONNECTION_DELETE,
    &CONNECTION_SERIALIZE,
    &CONNECTION_DESERIALIZE,
    &CONNECTION_RELEASE,
    &CONNECTION_UPDATE_STATE,
    &CONNECTION_GET_STATE,
    &SCHEMA_CREATE,
    &SCHEMA_GET_ATTRIBUTES,
    &SCHEMA_SERIALIZE,
    &SCHEMA_DESERIALIZE,
    &SCHEMA_RELEASE,
    &SCHEMA_UPDATE_STATE,
    &SCHEMA_GET_STATE,
    &CREDENTIAL_DEF_CREATE,
    &CREDENTIAL_DEF_SERIALIZE,
    &CREDENTIAL_DEF_DESERIALIZE,
    &CREDENTIAL_DEF_RELEASE,
    &CREDENTIAL_DEF_UPDATE_STATE,
    &CREDENTIAL_DEF_GET_STATE,
    &ISSUER_CREDENTIAL_CREATE,
    &ISSUER_CREDENTIAL_SEND_OFFER,
    &ISSUER_CREDENTIAL_SEND_CREDENTIAL,
    &ISSUER_CREDENTIAL_SERIALIZE,
    &ISSUER_CREDENTIAL_DESERIALIZE,
    &ISSUER_CREDENTIAL_RELEASE,
    &ISSUER_CREDENTIAL_UPDATE_STATE,
    &ISSUER_CREDENTIAL_GET_STATE,
    &PROOF_CREATE,
    &PROOF_SEND_REQUEST,
    &PROOF_GET_PROOF,
    &PROOF_SERIALIZE,
    &PROOF_DESERIALIZE,
    &PROOF_RELEASE,
    &PROOF_UPDATE_STATE,
    &PROOF_GET_STATE,
];

/// The descriptor for `kind`.
#[must_use]
pub const fn descriptor(kind: EntityKind) -> &'static KindDescriptor {
    match kind {
        EntityKind::Connection => &CONNECTION,
        EntityKind::Schema => &SCHEMA,
        EntityKind::CredentialDef => &CREDENTIAL_DEF,
        EntityKind::IssuerCredential => &ISSUER_CREDENTIAL,
        EntityKind::Proof => &PROOF,
    }
}

/// Finds the kind whose lifecycle operation this is, if any.
#[must_use]
pub fn lifecycle_kind(operation: &Operation) -> Option<EntityKind> {
    use strum::IntoEnumIterator;

    EntityKind::iter().find(|kind| {
        let d = descriptor(*kind);
        [d.deserialize, d.serialize, d.release, d.update_state, d.get_state]
            .iter()
            .any(|op| std::ptr::eq(*op, operation))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_operation_names_are_unique() {
        let names: HashSet<_> = ALL_OPERATIONS.iter().map(|op| op.name).collect();
        assert_eq!(names.len(), ALL_OPERATIONS.len());
    }

    #[test]
    fn test_descriptors_are_listed() {
        for kind in EntityKind::iter() {
            let d = descriptor(kind);
            assert_eq!(d.kind, kind);
            for op in [d.deserialize, d.serialize, d.release, d.update_state, d.get_state] {
                assert!(ALL_OPERATIONS.iter().any(|listed| std::ptr::eq(*listed, op)));
                assert_eq!(lifecycle_kind(op), Some(kind));
            }
            assert_eq!(d.serialize.shape, ResultShape::Text);
            assert_eq!(d.get_state.shape, ResultShape::U32);
        }
        assert_eq!(lifecycle_kind(&INIT), None);
    }
}
