//! Proof flow integration tests.

mod common;

use credex_core::{Connection, CredexError, Proof, ProofState, RequestedAttribute, State};
use serde_json::json;
use test_case::test_case;

fn requested() -> Vec<RequestedAttribute> {
    vec![
        RequestedAttribute::named("name"),
        RequestedAttribute {
            name: "degree".to_string(),
            issuer_did: None,
            schema_seq_no: Some(44),
        },
    ]
}

#[test_case(ProofState::Verified ; "verified")]
#[test_case(ProofState::Invalid ; "invalid")]
#[tokio::test]
async fn test_request_and_receive_proof(outcome: ProofState) {
    let (runtime, library) = common::setup().await;
    let connection = common::accepted_connection(&runtime, &library, "bob").await;

    let mut proof = Proof::create(&runtime, "proof", "Degree check", requested())
        .await
        .unwrap();
    assert_eq!(proof.state(), State::Initialized);
    assert_eq!(proof.proof_state(), ProofState::Undefined);

    proof.request_proof(&connection).await.unwrap();
    assert_eq!(proof.state(), State::OfferSent);
    assert_eq!(proof.get_proof(&connection).await, Err(CredexError::NotReady));

    let presented = json!({ "requested_proof": { "revealed_attrs": { "name": ["Bob"] } } });
    assert!(library.simulate_presentation(proof.handle(), &presented, outcome));
    assert_eq!(proof.update_state().await, Ok(State::Accepted));

    let received = proof.get_proof(&connection).await.unwrap();
    assert_eq!(received, presented);
    assert_eq!(proof.proof_state(), outcome);
    assert_eq!(proof.serialize().await.unwrap().proof_state, outcome);
}

#[tokio::test]
async fn test_request_needs_an_established_connection() {
    let (runtime, _library) = common::setup().await;
    let connection = Connection::create(&runtime, "pending").await.unwrap();
    let mut proof = Proof::create(&runtime, "proof", "Degree check", requested())
        .await
        .unwrap();

    assert_eq!(proof.request_proof(&connection).await, Err(CredexError::NotReady));
    assert_eq!(proof.state(), State::Initialized);
}

#[tokio::test]
async fn test_requested_attributes_survive_round_trip() {
    let (runtime, _library) = common::setup().await;
    let proof = Proof::create(&runtime, "proof", "Degree check", requested())
        .await
        .unwrap();

    let data = proof.serialize_json().await.unwrap();
    let copy = Proof::deserialize(&runtime, &data).await.unwrap();
    assert_eq!(copy.requested_attrs(), requested().as_slice());
    assert_eq!(copy.fields().name, "Degree check");
}
