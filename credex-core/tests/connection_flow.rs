//! Connection flow integration tests.

mod common;

use credex_core::{ConnectOptions, Connection, CredexError, EntityKind, Handle, State};
use serde_json::Value;

#[tokio::test]
async fn test_connect_by_sms_and_accept() {
    let (runtime, library) = common::setup().await;
    let mut connection = Connection::create(&runtime, "123").await.unwrap();
    assert_eq!(connection.state(), State::Initialized);

    let details = connection
        .connect(ConnectOptions::sms(common::PHONE))
        .await
        .unwrap();
    assert_eq!(connection.state(), State::OfferSent);

    let full: Value = serde_json::from_str(&details).unwrap();
    assert_eq!(full["senderDetail"]["name"], "123");
    assert_eq!(connection.invite_details(false).await.unwrap(), details);

    let short: Value =
        serde_json::from_str(&connection.invite_details(true).await.unwrap()).unwrap();
    assert_eq!(short["sc"], full["statusCode"]);
    assert_eq!(short["s"]["n"], "123");

    // The remote side accepts out of band; only a refresh observes it.
    assert!(library.simulate_remote_state(connection.handle(), State::Accepted));
    assert_eq!(connection.get_state().await, Ok(State::OfferSent));
    assert_eq!(connection.update_state().await, Ok(State::Accepted));
    assert_eq!(connection.state(), State::Accepted);
}

#[tokio::test]
async fn test_invite_details_before_connect() {
    let (runtime, _library) = common::setup().await;
    let connection = Connection::create(&runtime, "123").await.unwrap();
    assert_eq!(connection.invite_details(false).await, Err(CredexError::NotReady));
}

#[tokio::test]
async fn test_sms_without_number_is_rejected() {
    let (runtime, _library) = common::setup().await;
    let mut connection = Connection::create(&runtime, "123").await.unwrap();
    let result = connection.connect(ConnectOptions::sms("")).await;
    assert_eq!(result, Err(CredexError::InvalidOption));
    assert_eq!(connection.state(), State::Initialized);
}

#[tokio::test]
async fn test_serialized_connection_keeps_invitation() {
    let (runtime, _library) = common::setup().await;
    let mut connection = Connection::create(&runtime, "123").await.unwrap();
    let details = connection.connect(ConnectOptions::qr()).await.unwrap();

    let record = connection.serialize().await.unwrap();
    assert_eq!(record.invite_detail.as_deref(), Some(details.as_str()));
    assert!(record.extra.contains_key("pw_did"));

    let data = connection.serialize_json().await.unwrap();
    let copy = Connection::deserialize(&runtime, &data).await.unwrap();
    assert_ne!(copy.handle(), connection.handle());
    assert_eq!(copy.state(), State::OfferSent);
    assert_eq!(copy.get_state().await, Ok(State::OfferSent));
    assert_eq!(copy.fields().invite_details.as_deref(), Some(details.as_str()));
}

#[tokio::test]
async fn test_copy_does_not_share_the_native_object() {
    let (runtime, library) = common::setup().await;
    let mut original = Connection::create(&runtime, "123").await.unwrap();
    let data = original.serialize_json().await.unwrap();
    let mut copy = Connection::deserialize(&runtime, &data).await.unwrap();
    assert_ne!(copy.handle(), original.handle());

    copy.connect(ConnectOptions::qr()).await.unwrap();
    assert_eq!(copy.get_state().await, Ok(State::OfferSent));
    assert_eq!(original.get_state().await, Ok(State::Initialized));

    copy.delete().await.unwrap();
    assert!(library.is_live(original.handle()));
    assert_eq!(original.update_state().await, Ok(State::Initialized));
}

#[tokio::test]
async fn test_delete_frees_the_native_object() {
    let (runtime, library) = common::setup().await;
    let mut connection = common::accepted_connection(&runtime, &library, "123").await;
    let handle = connection.handle();

    connection.delete().await.unwrap();
    assert!(!library.is_live(handle));
    assert_eq!(connection.handle(), Handle::INVALID);
    assert_eq!(
        connection.delete().await,
        Err(CredexError::InvalidHandle {
            kind: EntityKind::Connection
        })
    );
}
