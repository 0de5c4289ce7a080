use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use super::CredexRuntime;
use crate::{
    connection::{self, ConnectOptions},
    credential_def, issuer_credential,
    error::CredexError,
    proof::{self, RequestedAttribute},
    schema,
    types::{ProofState, State},
};

/// Declares a foreign object around a core entity together with the
/// operations every entity kind shares.
macro_rules! entity_object {
    ($(#[$meta:meta])* $name:ident($core:ty)) => {
        $(#[$meta])*
        #[derive(Debug, uniffi::Object)]
        pub struct $name(Mutex<$core>);

        impl $name {
            fn wrap(entity: $core) -> Self {
                Self(Mutex::new(entity))
            }
        }

        #[uniffi::export(async_runtime = "tokio")]
        impl $name {
            /// Restores an object from the output of `serialize`.
            ///
            /// # Errors
            ///
            /// [`CredexError::InvalidInput`] if `data` is not a serialized
            /// object of this kind, or any error the native deserialize reports.
            #[uniffi::constructor]
            #[allow(clippy::needless_pass_by_value)]
            pub async fn deserialize(
                runtime: Arc<CredexRuntime>,
                data: String,
            ) -> Result<Self, CredexError> {
                <$core>::deserialize(runtime.inner(), &data).await.map(Self::wrap)
            }

            /// The native JSON form of the object.
            ///
            /// # Errors
            ///
            /// [`CredexError::InvalidHandle`] once released.
            pub async fn serialize(&self) -> Result<String, CredexError> {
                self.0.lock().await.serialize_json().await
            }

            /// Refreshes the state from the remote party.
            ///
            /// # Errors
            ///
            /// [`CredexError::InvalidHandle`] once released.
            pub async fn update_state(&self) -> Result<State, CredexError> {
                self.0.lock().await.update_state().await
            }

            /// Reads the state without refreshing it.
            ///
            /// # Errors
            ///
            /// [`CredexError::InvalidHandle`] once released.
            pub async fn get_state(&self) -> Result<State, CredexError> {
                self.0.lock().await.get_state().await
            }

            /// The state observed by the last refresh.
            pub async fn state(&self) -> State {
                self.0.lock().await.state()
            }

            /// The native handle; zero once released.
            pub async fn handle(&self) -> u32 {
                self.0.lock().await.handle().get()
            }

            /// The caller-supplied correlation id.
            pub async fn source_id(&self) -> String {
                self.0.lock().await.source_id().to_string()
            }

            /// Frees the native object. Idempotent.
            pub async fn release(&self) {
                self.0.lock().await.release();
            }
        }
    };
}

entity_object!(
    /// A pairwise connection with a remote party.
    Connection(connection::Connection)
);

entity_object!(
    /// A credential schema on the ledger.
    Schema(schema::Schema)
);

entity_object!(
    /// A credential definition bound to a schema.
    CredentialDef(credential_def::CredentialDef)
);

entity_object!(
    /// A credential this party offers and issues.
    IssuerCredential(issuer_credential::IssuerCredential)
);

entity_object!(
    /// A proof requested from a remote party.
    Proof(proof::Proof)
);

/// A proof presented by the remote party.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ProofResult {
    /// Verification outcome.
    pub proof_state: ProofState,
    /// The proof in JSON form.
    pub proof_json: String,
}

#[uniffi::export(async_runtime = "tokio")]
impl Connection {
    /// Creates a connection object.
    ///
    /// # Errors
    ///
    /// Any error the native create reports.
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub async fn create(
        runtime: Arc<CredexRuntime>,
        source_id: String,
    ) -> Result<Self, CredexError> {
        connection::Connection::create(runtime.inner(), &source_id)
            .await
            .map(Self::wrap)
    }

    /// Sends the invitation and returns its details.
    ///
    /// # Errors
    ///
    /// As for the core connection: invalid options or a released handle.
    pub async fn connect(&self, options: ConnectOptions) -> Result<String, CredexError> {
        self.0.lock().await.connect(options).await
    }

    /// The invitation details, abbreviated for QR codes when requested.
    ///
    /// # Errors
    ///
    /// [`CredexError::NotReady`] before `connect`.
    pub async fn invite_details(&self, abbreviated: bool) -> Result<String, CredexError> {
        self.0.lock().await.invite_details(abbreviated).await
    }

    /// Deletes the connection and frees the native object.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidHandle`] once released.
    pub async fn delete(&self) -> Result<(), CredexError> {
        self.0.lock().await.delete().await
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl Schema {
    /// Publishes a schema.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidSchema`] for unusable attribute names, or any
    /// error the native create reports.
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub async fn create(
        runtime: Arc<CredexRuntime>,
        source_id: String,
        name: String,
        attr_names: Vec<String>,
    ) -> Result<Self, CredexError> {
        schema::Schema::create(runtime.inner(), &source_id, &name, &attr_names)
            .await
            .map(Self::wrap)
    }

    /// Looks up a published schema by its ledger sequence number.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidSchema`] if there is no such schema.
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub async fn lookup(
        runtime: Arc<CredexRuntime>,
        source_id: String,
        sequence_num: u32,
    ) -> Result<Self, CredexError> {
        schema::Schema::lookup(runtime.inner(), &source_id, sequence_num)
            .await
            .map(Self::wrap)
    }

    /// Schema name.
    pub async fn name(&self) -> String {
        self.0.lock().await.name().to_string()
    }

    /// Ledger sequence number, once known.
    pub async fn sequence_number(&self) -> Option<u32> {
        self.0.lock().await.sequence_number()
    }

    /// Attribute names of the schema.
    pub async fn attr_names(&self) -> Vec<String> {
        self.0.lock().await.attr_names().to_vec()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl CredentialDef {
    /// Creates a credential definition for a published schema.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidSchema`] for an unknown schema, or any error the
    /// native create reports.
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub async fn create(
        runtime: Arc<CredexRuntime>,
        source_id: String,
        name: String,
        schema_seq_no: u32,
        revocation_enabled: bool,
    ) -> Result<Self, CredexError> {
        credential_def::CredentialDef::create(
            runtime.inner(),
            &source_id,
            &name,
            schema_seq_no,
            revocation_enabled,
        )
        .await
        .map(Self::wrap)
    }

    /// Definition name.
    pub async fn name(&self) -> String {
        self.0.lock().await.name().to_string()
    }

    /// Sequence number of the schema the definition is for.
    pub async fn schema_seq_no(&self) -> u32 {
        self.0.lock().await.schema_seq_no()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl IssuerCredential {
    /// Creates a credential with one value per attribute name.
    ///
    /// # Errors
    ///
    /// Any error the native create reports.
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub async fn create(
        runtime: Arc<CredexRuntime>,
        source_id: String,
        attributes: HashMap<String, String>,
        schema_seq_no: u32,
        name: String,
    ) -> Result<Self, CredexError> {
        issuer_credential::IssuerCredential::create(
            runtime.inner(),
            &source_id,
            attributes.into_iter().collect(),
            schema_seq_no,
            &name,
        )
        .await
        .map(Self::wrap)
    }

    /// Sends the credential offer over `connection`.
    ///
    /// # Errors
    ///
    /// [`CredexError::NotReady`] if the connection is not established.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn send_offer(&self, connection: Arc<Connection>) -> Result<(), CredexError> {
        let mut credential = self.0.lock().await;
        let connection = connection.0.lock().await;
        credential.send_offer(&connection).await
    }

    /// Sends the credential over `connection` once it was requested.
    ///
    /// # Errors
    ///
    /// [`CredexError::NotReady`] before the credential request arrived.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn send_credential(&self, connection: Arc<Connection>) -> Result<(), CredexError> {
        let mut credential = self.0.lock().await;
        let connection = connection.0.lock().await;
        credential.send_credential(&connection).await
    }

    /// Attribute values, one per attribute name.
    pub async fn attributes(&self) -> HashMap<String, String> {
        self.0
            .lock()
            .await
            .attributes()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl Proof {
    /// Creates a proof request for the given attributes.
    ///
    /// # Errors
    ///
    /// Any error the native create reports.
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub async fn create(
        runtime: Arc<CredexRuntime>,
        source_id: String,
        name: String,
        requested_attrs: Vec<RequestedAttribute>,
    ) -> Result<Self, CredexError> {
        proof::Proof::create(runtime.inner(), &source_id, &name, requested_attrs)
            .await
            .map(Self::wrap)
    }

    /// Sends the proof request over `connection`.
    ///
    /// # Errors
    ///
    /// [`CredexError::NotReady`] if the connection is not established.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn request_proof(&self, connection: Arc<Connection>) -> Result<(), CredexError> {
        let mut proof = self.0.lock().await;
        let connection = connection.0.lock().await;
        proof.request_proof(&connection).await
    }

    /// Retrieves the proof the remote party presented.
    ///
    /// # Errors
    ///
    /// [`CredexError::NotReady`] before a presentation arrived, or
    /// [`CredexError::InvalidProof`] if the proof does not decode.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn get_proof(&self, connection: Arc<Connection>) -> Result<ProofResult, CredexError> {
        let mut proof = self.0.lock().await;
        let connection = connection.0.lock().await;
        let proof_json = proof.get_proof(&connection).await?.to_string();
        Ok(ProofResult {
            proof_state: proof.proof_state(),
            proof_json,
        })
    }

    /// Verification outcome of the last received proof.
    pub async fn proof_state(&self) -> ProofState {
        self.0.lock().await.proof_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::TEST_MODE_CONFIG;

    async fn runtime() -> Arc<CredexRuntime> {
        let runtime = Arc::new(CredexRuntime::in_memory(None).unwrap());
        runtime.initialize(TEST_MODE_CONFIG.to_string()).await.unwrap();
        runtime
    }

    #[tokio::test]
    async fn test_connection_round_trip() {
        let runtime = runtime().await;
        let connection = Connection::create(Arc::clone(&runtime), "alice".to_string())
            .await
            .unwrap();
        connection.connect(ConnectOptions::qr()).await.unwrap();
        assert_eq!(connection.state().await, State::OfferSent);

        let data = connection.serialize().await.unwrap();
        let copy = Connection::deserialize(Arc::clone(&runtime), data).await.unwrap();
        assert_ne!(copy.handle().await, connection.handle().await);
        assert_eq!(copy.source_id().await, "alice");
        assert_eq!(copy.get_state().await, Ok(State::OfferSent));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let runtime = runtime().await;
        let schema = Schema::lookup(Arc::clone(&runtime), "s".to_string(), 22)
            .await
            .unwrap();

        schema.release().await;
        schema.release().await;
        assert_eq!(schema.handle().await, 0);
        assert!(matches!(
            schema.serialize().await,
            Err(CredexError::InvalidHandle { .. })
        ));
    }

    #[tokio::test]
    async fn test_proof_request_needs_connected_connection() {
        let runtime = runtime().await;
        let connection = Arc::new(
            Connection::create(Arc::clone(&runtime), "bob".to_string())
                .await
                .unwrap(),
        );
        let proof = Proof::create(
            Arc::clone(&runtime),
            "p".to_string(),
            "Employment".to_string(),
            vec![RequestedAttribute::named("name")],
        )
        .await
        .unwrap();

        let early = proof.request_proof(Arc::clone(&connection)).await;
        assert_eq!(early, Err(CredexError::NotReady));

        connection.connect(ConnectOptions::qr()).await.unwrap();
        proof.request_proof(Arc::clone(&connection)).await.unwrap();
        assert_eq!(proof.state().await, State::OfferSent);
    }
}
