//! Credential issuance flow integration tests.

mod common;

use std::collections::BTreeMap;

use credex_core::{
    Connection, CredentialDef, CredexError, IssuerCredential, Schema, State,
};

fn attributes() -> BTreeMap<String, String> {
    [
        ("name", "Alice"),
        ("sex", "female"),
        ("height", "175"),
        ("age", "28"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

#[tokio::test]
async fn test_issue_credential() {
    let (runtime, library) = common::setup().await;
    let connection = common::accepted_connection(&runtime, &library, "alice").await;

    let schema = Schema::lookup(&runtime, "schema", 22).await.unwrap();
    let sequence_num = schema.sequence_number().unwrap();
    let definition = CredentialDef::create(&runtime, "cred_def", "Faber", sequence_num, false)
        .await
        .unwrap();
    assert_eq!(definition.schema_seq_no(), sequence_num);

    let mut credential =
        IssuerCredential::create(&runtime, "credential", attributes(), sequence_num, "Student")
            .await
            .unwrap();
    assert_eq!(credential.state(), State::Initialized);
    assert_eq!(credential.attributes(), &attributes());

    credential.send_offer(&connection).await.unwrap();
    assert_eq!(credential.state(), State::OfferSent);

    // The holder has not asked for the credential yet.
    assert_eq!(
        credential.send_credential(&connection).await,
        Err(CredexError::NotReady)
    );

    assert!(library.simulate_remote_state(credential.handle(), State::RequestReceived));
    assert_eq!(credential.update_state().await, Ok(State::RequestReceived));

    credential.send_credential(&connection).await.unwrap();
    assert_eq!(credential.state(), State::Accepted);

    let record = credential.serialize().await.unwrap();
    assert_eq!(record.credential_attributes["name"], vec!["Alice".to_string()]);
}

#[tokio::test]
async fn test_offer_needs_an_established_connection() {
    let (runtime, _library) = common::setup().await;
    let connection = Connection::create(&runtime, "pending").await.unwrap();
    let mut credential = IssuerCredential::create(&runtime, "credential", attributes(), 22, "Student")
        .await
        .unwrap();

    assert_eq!(credential.send_offer(&connection).await, Err(CredexError::NotReady));
    assert_eq!(credential.state(), State::Initialized);
}

#[tokio::test]
async fn test_offer_over_released_connection() {
    let (runtime, library) = common::setup().await;
    let mut connection = common::accepted_connection(&runtime, &library, "gone").await;
    let mut credential = IssuerCredential::create(&runtime, "credential", attributes(), 22, "Student")
        .await
        .unwrap();
    let before = library.invocation_count();

    connection.release();
    assert_eq!(
        credential.send_offer(&connection).await,
        Err(CredexError::invalid_handle(connection.kind()))
    );
    assert_eq!(library.invocation_count(), before);
}

#[tokio::test]
async fn test_published_schema_can_be_used() {
    let (runtime, _library) = common::setup().await;
    let attr_names = vec!["employer".to_string(), "salary".to_string()];
    let schema = Schema::create(&runtime, "schema", "Employment", &attr_names)
        .await
        .unwrap();
    let sequence_num = schema.sequence_number().unwrap();

    let definition = CredentialDef::create(&runtime, "cred_def", "Employer", sequence_num, true)
        .await
        .unwrap();
    assert_eq!(definition.name(), "Employer");

    let unknown = CredentialDef::create(&runtime, "cred_def", "Nope", sequence_num + 1, true).await;
    assert_eq!(unknown.unwrap_err(), CredexError::InvalidSchema);
}

#[tokio::test]
async fn test_schema_without_attributes_is_rejected() {
    let (runtime, _library) = common::setup().await;
    let result = Schema::create(&runtime, "schema", "Empty", &[]).await;
    assert_eq!(result.unwrap_err(), CredexError::InvalidSchema);
}
