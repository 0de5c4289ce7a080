//! In-process implementation of the native library.
//!
//! Mirrors the native library's test mode: objects live in a process-local
//! table, nothing talks to an agency or a ledger, and remote activity is
//! driven explicitly through the simulation hooks. Used by the test suites
//! and by hosts that run without the native library linked in.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use rand::Rng;
use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use super::{ops, CompletionPayload, NativeArg, NativeLibrary, Operation, ResultShape};
use crate::{
    defaults::{DEFAULT_SIMULATED_LATENCY, TEST_MODE_CONFIG},
    dispatch::CompletionBridge,
    error::ErrorCode,
    types::{CommandHandle, EntityKind, Handle, ProofState, State},
};

/// Schemas present on the simulated ledger from the start:
/// `(sequence number, name, version, attribute names)`.
const LEDGER_SCHEMA_FIXTURES: &[(u32, &str, &str, &[&str])] = &[
    (22, "Faber Student Info", "1.0", &["name", "sex", "height", "age"]),
    (44, "Degree", "2.1", &["student_name", "degree", "status", "year"]),
];

/// Sequence number handed to the first schema published through `create`.
const FIRST_PUBLISHED_SEQUENCE_NUMBER: u32 = 100;

const DEFAULT_ISSUER_DID: &str = "2hoqvcwupRTUNkXn6ArYzs";
const AGENCY_DID: &str = "BDSmVkzxRYGE4HKyMKxd1H";
const AGENCY_VERKEY: &str = "6yUatReYWNSUfEtC2ABgRXmmLaxCyQqsjLwv2BomxsxD";
const AGENCY_ENDPOINT: &str = "https://agency.example.org";

/// How completions are handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Completions are delivered before `invoke` returns, on the caller's thread.
    #[default]
    Inline,
    /// Completions are delivered from a separate thread after a random delay.
    WorkerThread,
}

/// Failure outside of a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Reported as the immediate status of `invoke`; no completion follows.
    Immediate(ErrorCode),
    /// Reported through the completion.
    Completion(ErrorCode),
}

type Reply = Result<CompletionPayload, Fault>;

/// Builder for [`InMemoryLibrary`].
#[derive(Debug, Clone)]
pub struct InMemoryLibraryBuilder {
    delivery: DeliveryMode,
    max_latency: Duration,
    drop_completions: bool,
    duplicate_completions: bool,
}

impl Default for InMemoryLibraryBuilder {
    fn default() -> Self {
        Self {
            delivery: DeliveryMode::Inline,
            max_latency: DEFAULT_SIMULATED_LATENCY,
            drop_completions: false,
            duplicate_completions: false,
        }
    }
}

impl InMemoryLibraryBuilder {
    /// Selects how completions are delivered.
    #[must_use]
    pub const fn delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    /// Upper bound of the random delay used with [`DeliveryMode::WorkerThread`].
    #[must_use]
    pub const fn max_latency(mut self, max_latency: Duration) -> Self {
        self.max_latency = max_latency;
        self
    }

    /// Accept calls but never deliver their completions.
    #[must_use]
    pub const fn drop_completions(mut self, drop: bool) -> Self {
        self.drop_completions = drop;
        self
    }

    /// Deliver every completion twice.
    #[must_use]
    pub const fn duplicate_completions(mut self, duplicate: bool) -> Self {
        self.duplicate_completions = duplicate;
        self
    }

    /// Builds the library.
    #[must_use]
    pub fn build(self) -> InMemoryLibrary {
        InMemoryLibrary {
            delivery: self.delivery,
            max_latency: self.max_latency,
            drop_completions: AtomicBool::new(self.drop_completions),
            duplicate_completions: AtomicBool::new(self.duplicate_completions),
            invocations: AtomicUsize::new(0),
            ledger: Mutex::new(Ledger::new()),
        }
    }
}

/// The native library's test mode, implemented in Rust.
#[derive(Debug)]
pub struct InMemoryLibrary {
    delivery: DeliveryMode,
    max_latency: Duration,
    drop_completions: AtomicBool,
    duplicate_completions: AtomicBool,
    invocations: AtomicUsize,
    ledger: Mutex<Ledger>,
}

impl Default for InMemoryLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLibrary {
    /// A library delivering completions inline.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a library.
    #[must_use]
    pub fn builder() -> InMemoryLibraryBuilder {
        InMemoryLibraryBuilder::default()
    }

    /// Number of asynchronous operations issued so far.
    #[must_use]
    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Number of live native objects.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.lock().objects.len()
    }

    /// Whether `handle` refers to a live native object.
    #[must_use]
    pub fn is_live(&self, handle: Handle) -> bool {
        self.lock().objects.contains_key(&handle.get())
    }

    /// Toggles whether completions are silently dropped.
    pub fn set_drop_completions(&self, drop: bool) {
        self.drop_completions.store(drop, Ordering::Relaxed);
    }

    /// Toggles whether completions are delivered twice.
    pub fn set_duplicate_completions(&self, duplicate: bool) {
        self.duplicate_completions.store(duplicate, Ordering::Relaxed);
    }

    /// Forgets a native object as if the native side had lost it.
    pub fn evict(&self, handle: Handle) -> bool {
        self.lock().objects.remove(&handle.get()).is_some()
    }

    /// Queues a state change made by the remote party. It becomes visible on
    /// the object's next `update_state`.
    pub fn simulate_remote_state(&self, handle: Handle, state: State) -> bool {
        self.lock()
            .objects
            .get_mut(&handle.get())
            .map(|object| object.queued_state = Some(state))
            .is_some()
    }

    /// Queues a proof presentation from the remote party for a proof object.
    /// The proof moves to [`State::Accepted`] on its next `update_state`.
    pub fn simulate_presentation(
        &self,
        handle: Handle,
        proof: &Value,
        proof_state: ProofState,
    ) -> bool {
        let mut ledger = self.lock();
        let Some(object) = ledger
            .objects
            .get_mut(&handle.get())
            .filter(|object| object.kind == EntityKind::Proof)
        else {
            return false;
        };
        object.presentation = Some(Presentation {
            proof: proof.to_string(),
            proof_state,
        });
        object.queued_state = Some(State::Accepted);
        true
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, completion: CompletionBridge, command_handle: CommandHandle, code: u32, payload: CompletionPayload) {
        if self.drop_completions.load(Ordering::Relaxed) {
            debug!(command_handle = %command_handle, "dropping completion");
            return;
        }
        let duplicate = self.duplicate_completions.load(Ordering::Relaxed);

        match self.delivery {
            DeliveryMode::Inline => {
                if duplicate {
                    completion.complete(command_handle, code, payload.clone());
                }
                completion.complete(command_handle, code, payload);
            }
            DeliveryMode::WorkerThread => {
                let max_latency = self.max_latency;
                std::thread::spawn(move || {
                    if !max_latency.is_zero() {
                        let micros = u64::try_from(max_latency.as_micros()).unwrap_or(u64::MAX);
                        let delay = rand::thread_rng().gen_range(0..=micros);
                        std::thread::sleep(Duration::from_micros(delay));
                    }
                    if duplicate {
                        completion.complete(command_handle, code, payload.clone());
                    }
                    completion.complete(command_handle, code, payload);
                });
            }
        }
    }

    fn execute(&self, operation: &'static Operation, args: Vec<NativeArg>) -> Reply {
        let is = |candidate: &Operation| std::ptr::eq(operation, candidate);
        let mut args = ArgReader::new(args);
        let mut ledger = self.lock();

        if is(&ops::INIT) {
            return ledger.init(&args.text()?);
        }
        if !ledger.initialized {
            return Err(Fault::Completion(ErrorCode::UnknownLibindyError));
        }

        if let Some(kind) = ops::lifecycle_kind(operation) {
            let descriptor = ops::descriptor(kind);
            return if is(descriptor.serialize) {
                ledger.serialize(kind, args.handle()?)
            } else if is(descriptor.deserialize) {
                ledger.deserialize(kind, &args.text()?)
            } else if is(descriptor.update_state) {
                ledger.update_state(kind, args.handle()?)
            } else if is(descriptor.get_state) {
                ledger.get_state(kind, args.handle()?)
            } else {
                // Release is synchronous and never goes through `invoke`.
                Err(Fault::Immediate(ErrorCode::InvalidOption))
            };
        }

        if is(&ops::CONNECTION_CREATE) {
            let source_id = args.text()?;
            Ok(ledger.create_connection(&source_id))
        } else if is(&ops::CONNECTION_CONNECT) {
            let handle = args.handle()?;
            ledger.connect(handle, &args.text()?)
        } else if is(&ops::CONNECTION_INVITE_DETAILS) {
            let handle = args.handle()?;
            ledger.invite_details(handle, args.flag()?)
        } else if is(&ops::CONNECTION_DELETE) {
            ledger.delete_connection(args.handle()?)
        } else if is(&ops::SCHEMA_CREATE) {
            let (source_id, name, attr_names) = (args.text()?, args.text()?, args.text()?);
            ledger.create_schema(&source_id, &name, &attr_names)
        } else if is(&ops::SCHEMA_GET_ATTRIBUTES) {
            let source_id = args.text()?;
            ledger.schema_attributes(&source_id, args.number()?)
        } else if is(&ops::CREDENTIAL_DEF_CREATE) {
            let (source_id, name, schema_seq_no) = (args.text()?, args.text()?, args.number()?);
            let (issuer_did, revocation) = (args.optional_text()?, args.flag()?);
            ledger.create_credential_def(&source_id, &name, schema_seq_no, issuer_did, revocation)
        } else if is(&ops::ISSUER_CREDENTIAL_CREATE) {
            let (source_id, schema_seq_no) = (args.text()?, args.number()?);
            let (issuer_did, attributes, name) =
                (args.optional_text()?, args.text()?, args.text()?);
            ledger.create_issuer_credential(&source_id, schema_seq_no, issuer_did, &attributes, &name)
        } else if is(&ops::ISSUER_CREDENTIAL_SEND_OFFER) {
            let handle = args.handle()?;
            ledger.send_offer(handle, args.handle()?)
        } else if is(&ops::ISSUER_CREDENTIAL_SEND_CREDENTIAL) {
            let handle = args.handle()?;
            ledger.send_credential(handle, args.handle()?)
        } else if is(&ops::PROOF_CREATE) {
            let (source_id, attrs, predicates, name) =
                (args.text()?, args.text()?, args.text()?, args.text()?);
            ledger.create_proof(&source_id, &attrs, &predicates, &name)
        } else if is(&ops::PROOF_SEND_REQUEST) {
            let handle = args.handle()?;
            ledger.send_proof_request(handle, args.handle()?)
        } else if is(&ops::PROOF_GET_PROOF) {
            let handle = args.handle()?;
            ledger.get_proof(handle, args.handle()?)
        } else {
            Err(Fault::Immediate(ErrorCode::InvalidOption))
        }
    }
}

impl NativeLibrary for InMemoryLibrary {
    fn invoke(
        &self,
        command_handle: CommandHandle,
        operation: &'static Operation,
        args: Vec<NativeArg>,
        completion: CompletionBridge,
    ) -> u32 {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        trace!(command_handle = %command_handle, operation = operation.name, "in-memory invoke");

        let (code, payload) = match self.execute(operation, args) {
            Ok(payload) => (0, payload),
            Err(Fault::Immediate(code)) => return code.code(),
            Err(Fault::Completion(code)) => (code.code(), empty_payload(operation.shape)),
        };

        self.deliver(completion, command_handle, code, payload);
        0
    }

    fn release(&self, operation: &'static Operation, handle: Handle) -> u32 {
        let Some(kind) = ops::lifecycle_kind(operation) else {
            return ErrorCode::InvalidOption.code();
        };

        match self.lock().release(kind, handle.get()) {
            Ok(()) => 0,
            Err(code) => code.code(),
        }
    }
}

/// The payload a native completion carries alongside a non-zero code.
const fn empty_payload(shape: ResultShape) -> CompletionPayload {
    match shape {
        ResultShape::Unit => CompletionPayload::Unit,
        ResultShape::U32 => CompletionPayload::U32(0),
        ResultShape::Text => CompletionPayload::Text(None),
        ResultShape::U32Text => CompletionPayload::U32Text(0, None),
    }
}

/// Positional access to the arguments of a call; a missing or mistyped
/// argument fails the call immediately.
struct ArgReader {
    args: std::vec::IntoIter<NativeArg>,
}

impl ArgReader {
    fn new(args: Vec<NativeArg>) -> Self {
        Self {
            args: args.into_iter(),
        }
    }

    const fn malformed() -> Fault {
        Fault::Immediate(ErrorCode::InvalidOption)
    }

    fn handle(&mut self) -> Result<u32, Fault> {
        match self.args.next() {
            Some(NativeArg::Handle(handle)) => Ok(handle.get()),
            _ => Err(Self::malformed()),
        }
    }

    fn number(&mut self) -> Result<u32, Fault> {
        match self.args.next() {
            Some(NativeArg::U32(value)) => Ok(value),
            _ => Err(Self::malformed()),
        }
    }

    fn flag(&mut self) -> Result<bool, Fault> {
        match self.args.next() {
            Some(NativeArg::Bool(value)) => Ok(value),
            _ => Err(Self::malformed()),
        }
    }

    fn text(&mut self) -> Result<String, Fault> {
        match self.args.next() {
            Some(NativeArg::Str(value)) => Ok(value),
            _ => Err(Self::malformed()),
        }
    }

    fn optional_text(&mut self) -> Result<Option<String>, Fault> {
        match self.args.next() {
            Some(NativeArg::OptStr(value)) => Ok(value),
            _ => Err(Self::malformed()),
        }
    }
}

#[derive(Debug, Clone)]
struct Presentation {
    proof: String,
    proof_state: ProofState,
}

#[derive(Debug)]
struct StoredObject {
    kind: EntityKind,
    record: Map<String, Value>,
    queued_state: Option<State>,
    presentation: Option<Presentation>,
}

impl StoredObject {
    fn state(&self) -> State {
        self.record
            .get("state")
            .and_then(Value::as_u64)
            .and_then(|code| u32::try_from(code).ok())
            .and_then(State::from_code)
            .unwrap_or_default()
    }

    fn set_state(&mut self, state: State) {
        self.record.insert("state".to_string(), state.code().into());
    }

    fn serialized(&self) -> String {
        Value::Object(self.record.clone()).to_string()
    }
}

#[derive(Debug)]
struct LedgerSchema {
    name: String,
    version: String,
    attr_names: Vec<String>,
}

#[derive(Debug)]
struct Ledger {
    initialized: bool,
    objects: HashMap<u32, StoredObject>,
    schemas: BTreeMap<u32, LedgerSchema>,
}

impl Ledger {
    fn new() -> Self {
        let schemas = LEDGER_SCHEMA_FIXTURES
            .iter()
            .map(|(seq_no, name, version, attr_names)| {
                (
                    *seq_no,
                    LedgerSchema {
                        name: (*name).to_string(),
                        version: (*version).to_string(),
                        attr_names: attr_names.iter().map(ToString::to_string).collect(),
                    },
                )
            })
            .collect();

        Self {
            initialized: false,
            objects: HashMap::new(),
            schemas,
        }
    }

    fn init(&mut self, config: &str) -> Reply {
        if self.initialized {
            return Err(Fault::Completion(ErrorCode::AlreadyInitialized));
        }
        let config = config.trim();
        let accepted = config == TEST_MODE_CONFIG
            || serde_json::from_str::<Value>(config).is_ok_and(|value| value.is_object());
        if !accepted {
            return Err(Fault::Completion(ErrorCode::InvalidConfiguration));
        }

        self.initialized = true;
        debug!("in-memory library initialized");
        Ok(CompletionPayload::Unit)
    }

    fn new_handle(&self) -> u32 {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = rng.gen_range(1..=u32::MAX);
            if !self.objects.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn insert(&mut self, kind: EntityKind, mut record: Map<String, Value>) -> u32 {
        let handle = self.new_handle();
        record.insert("handle".to_string(), handle.into());
        self.objects.insert(
            handle,
            StoredObject {
                kind,
                record,
                queued_state: None,
                presentation: None,
            },
        );
        handle
    }

    fn object(&self, kind: EntityKind, handle: u32) -> Result<&StoredObject, Fault> {
        self.objects
            .get(&handle)
            .filter(|object| object.kind == kind)
            .ok_or(Fault::Completion(kind.invalid_handle_code()))
    }

    fn object_mut(&mut self, kind: EntityKind, handle: u32) -> Result<&mut StoredObject, Fault> {
        self.objects
            .get_mut(&handle)
            .filter(|object| object.kind == kind)
            .ok_or(Fault::Completion(kind.invalid_handle_code()))
    }

    /// Connection that has sent its invitation.
    fn connected(&self, connection: u32) -> Result<(), Fault> {
        let state = self.object(EntityKind::Connection, connection)?.state();
        if state == State::Initialized || state == State::None {
            return Err(Fault::Completion(ErrorCode::NotReady));
        }
        Ok(())
    }

    fn serialize(&self, kind: EntityKind, handle: u32) -> Reply {
        let object = self.object(kind, handle)?;
        Ok(CompletionPayload::Text(Some(object.serialized())))
    }

    fn deserialize(&mut self, kind: EntityKind, data: &str) -> Reply {
        let invalid_json = Fault::Completion(ErrorCode::InvalidJson);
        let Ok(Value::Object(record)) = serde_json::from_str::<Value>(data) else {
            return Err(invalid_json);
        };
        let has_handle = record
            .get("handle")
            .and_then(Value::as_u64)
            .is_some_and(|handle| u32::try_from(handle).is_ok());
        let has_state = record
            .get("state")
            .and_then(Value::as_u64)
            .and_then(|code| u32::try_from(code).ok())
            .and_then(State::from_code)
            .is_some();
        if !record.get("source_id").is_some_and(Value::is_string) || !has_handle || !has_state {
            return Err(invalid_json);
        }

        // The payload is stored verbatim, so its `handle` field keeps naming
        // the object it was serialized from and the bytes round-trip.
        let handle = self.new_handle();
        self.objects.insert(
            handle,
            StoredObject {
                kind,
                record,
                queued_state: None,
                presentation: None,
            },
        );
        Ok(CompletionPayload::U32(handle))
    }

    fn release(&mut self, kind: EntityKind, handle: u32) -> Result<(), ErrorCode> {
        self.object(kind, handle).map_err(|_| kind.invalid_handle_code())?;
        self.objects.remove(&handle);
        Ok(())
    }

    fn update_state(&mut self, kind: EntityKind, handle: u32) -> Reply {
        let object = self.object_mut(kind, handle)?;
        if let Some(state) = object.queued_state.take() {
            object.set_state(state);
        }
        Ok(CompletionPayload::U32(object.state().code()))
    }

    fn get_state(&self, kind: EntityKind, handle: u32) -> Reply {
        Ok(CompletionPayload::U32(self.object(kind, handle)?.state().code()))
    }

    fn create_connection(&mut self, source_id: &str) -> CompletionPayload {
        let record = json!({
            "source_id": source_id,
            "state": State::Initialized.code(),
            "pw_did": DEFAULT_ISSUER_DID,
            "uuid": uuid::Uuid::new_v4().to_string(),
            "endpoint": AGENCY_ENDPOINT,
        });
        CompletionPayload::U32(self.insert(EntityKind::Connection, into_map(record)))
    }

    fn connect(&mut self, handle: u32, options: &str) -> Reply {
        let object = self.object_mut(EntityKind::Connection, handle)?;
        let options: Value = if options.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(options).map_err(|_| Fault::Completion(ErrorCode::InvalidOption))?
        };
        let connection_type = options
            .get("connection_type")
            .and_then(Value::as_str)
            .unwrap_or("QR");
        let phone = options.get("phone").and_then(Value::as_str);
        match (connection_type, phone) {
            ("SMS", Some(phone)) if !phone.is_empty() => {}
            ("QR", _) => {}
            _ => return Err(Fault::Completion(ErrorCode::InvalidOption)),
        }

        let source_id = object
            .record
            .get("source_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let request_id = object
            .record
            .get("uuid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let details = json!({
            "statusCode": "MS-101",
            "connReqId": request_id,
            "senderDetail": {
                "name": source_id,
                "DID": DEFAULT_ISSUER_DID,
                "logoUrl": "",
                "verKey": AGENCY_VERKEY,
            },
            "senderAgencyDetail": {
                "DID": AGENCY_DID,
                "verKey": AGENCY_VERKEY,
                "endpoint": AGENCY_ENDPOINT,
            },
            "targetName": "there",
            "statusMsg": "message sent",
        })
        .to_string();

        object
            .record
            .insert("invite_detail".to_string(), Value::String(details.clone()));
        object.set_state(State::OfferSent);
        Ok(CompletionPayload::Text(Some(details)))
    }

    fn invite_details(&self, handle: u32, abbreviated: bool) -> Reply {
        let object = self.object(EntityKind::Connection, handle)?;
        let Some(details) = object.record.get("invite_detail").and_then(Value::as_str) else {
            return Err(Fault::Completion(ErrorCode::NotReady));
        };
        if !abbreviated {
            return Ok(CompletionPayload::Text(Some(details.to_string())));
        }

        let full: Value =
            serde_json::from_str(details).map_err(|_| Fault::Completion(ErrorCode::InvalidJson))?;
        let sender = &full["senderDetail"];
        let agency = &full["senderAgencyDetail"];
        let short = json!({
            "sc": full["statusCode"],
            "id": full["connReqId"],
            "s": {
                "n": sender["name"],
                "d": sender["DID"],
                "l": sender["logoUrl"],
                "v": sender["verKey"],
            },
            "sa": {
                "d": agency["DID"],
                "v": agency["verKey"],
                "e": agency["endpoint"],
            },
            "t": full["targetName"],
            "sm": full["statusMsg"],
        });
        Ok(CompletionPayload::Text(Some(short.to_string())))
    }

    fn delete_connection(&mut self, handle: u32) -> Reply {
        self.object(EntityKind::Connection, handle)?;
        self.objects.remove(&handle);
        Ok(CompletionPayload::Unit)
    }

    fn create_schema(&mut self, source_id: &str, name: &str, attr_names: &str) -> Reply {
        let attr_names: Vec<String> = serde_json::from_str(attr_names)
            .map_err(|_| Fault::Completion(ErrorCode::InvalidSchema))?;
        if name.is_empty() || attr_names.is_empty() {
            return Err(Fault::Completion(ErrorCode::InvalidSchema));
        }

        let sequence_num = self
            .schemas
            .keys()
            .next_back()
            .map_or(FIRST_PUBLISHED_SEQUENCE_NUMBER, |last| {
                (*last + 1).max(FIRST_PUBLISHED_SEQUENCE_NUMBER)
            });
        let schema = LedgerSchema {
            name: name.to_string(),
            version: "1.0".to_string(),
            attr_names,
        };
        let record = schema_record(source_id, sequence_num, &schema);
        self.schemas.insert(sequence_num, schema);

        Ok(CompletionPayload::U32(self.insert(EntityKind::Schema, record)))
    }

    fn schema_attributes(&mut self, source_id: &str, sequence_num: u32) -> Reply {
        let schema = self
            .schemas
            .get(&sequence_num)
            .ok_or(Fault::Completion(ErrorCode::InvalidSchemaSequenceNumber))?;
        let record = schema_record(source_id, sequence_num, schema);
        let handle = self.insert(EntityKind::Schema, record);
        self.serialize(EntityKind::Schema, handle)
    }

    fn create_credential_def(
        &mut self,
        source_id: &str,
        name: &str,
        schema_seq_no: u32,
        issuer_did: Option<String>,
        revocation_enabled: bool,
    ) -> Reply {
        if !self.schemas.contains_key(&schema_seq_no) {
            return Err(Fault::Completion(ErrorCode::InvalidSchemaSequenceNumber));
        }
        let issuer_did = issuer_did.unwrap_or_else(|| DEFAULT_ISSUER_DID.to_string());
        if issuer_did.is_empty() {
            return Err(Fault::Completion(ErrorCode::InvalidDid));
        }

        let record = json!({
            "source_id": source_id,
            "state": State::Initialized.code(),
            "name": name,
            "schema_seq_no": schema_seq_no,
            "revocation_enabled": revocation_enabled,
            "issuer_did": issuer_did,
            "cred_def_id": format!("{issuer_did}:3:CL:{schema_seq_no}"),
        });
        Ok(CompletionPayload::U32(
            self.insert(EntityKind::CredentialDef, into_map(record)),
        ))
    }

    fn create_issuer_credential(
        &mut self,
        source_id: &str,
        schema_seq_no: u32,
        issuer_did: Option<String>,
        attributes: &str,
        name: &str,
    ) -> Reply {
        let attributes: BTreeMap<String, Vec<String>> = serde_json::from_str(attributes)
            .map_err(|_| Fault::Completion(ErrorCode::InvalidAttributesStructure))?;
        if attributes.values().any(|values| values.len() != 1) {
            return Err(Fault::Completion(ErrorCode::InvalidAttributesStructure));
        }
        let issuer_did = issuer_did.unwrap_or_else(|| DEFAULT_ISSUER_DID.to_string());

        let record = json!({
            "source_id": source_id,
            "state": State::Initialized.code(),
            "credential_name": name,
            "schema_seq_no": schema_seq_no,
            "credential_attributes": attributes,
            "issuer_did": issuer_did,
        });
        Ok(CompletionPayload::U32(
            self.insert(EntityKind::IssuerCredential, into_map(record)),
        ))
    }

    fn send_offer(&mut self, handle: u32, connection: u32) -> Reply {
        let state = self.object(EntityKind::IssuerCredential, handle)?.state();
        self.connected(connection)?;
        if state != State::Initialized {
            return Err(Fault::Completion(ErrorCode::NotReady));
        }
        self.object_mut(EntityKind::IssuerCredential, handle)?
            .set_state(State::OfferSent);
        Ok(CompletionPayload::Unit)
    }

    fn send_credential(&mut self, handle: u32, connection: u32) -> Reply {
        let state = self.object(EntityKind::IssuerCredential, handle)?.state();
        self.connected(connection)?;
        if state != State::RequestReceived {
            return Err(Fault::Completion(ErrorCode::NotReady));
        }
        self.object_mut(EntityKind::IssuerCredential, handle)?
            .set_state(State::Accepted);
        Ok(CompletionPayload::Unit)
    }

    fn create_proof(&mut self, source_id: &str, attrs: &str, predicates: &str, name: &str) -> Reply {
        let invalid_json = Fault::Completion(ErrorCode::InvalidJson);
        let Ok(Value::Array(requested_attrs)) = serde_json::from_str::<Value>(attrs) else {
            return Err(invalid_json);
        };
        let Ok(Value::Array(requested_predicates)) = serde_json::from_str::<Value>(predicates) else {
            return Err(invalid_json);
        };
        if requested_attrs
            .iter()
            .any(|attr| !attr.get("name").is_some_and(Value::is_string))
        {
            return Err(invalid_json);
        }

        let record = json!({
            "source_id": source_id,
            "state": State::Initialized.code(),
            "proof_state": ProofState::Undefined.code(),
            "name": name,
            "requested_attrs": requested_attrs,
            "requested_predicates": requested_predicates,
        });
        Ok(CompletionPayload::U32(
            self.insert(EntityKind::Proof, into_map(record)),
        ))
    }

    fn send_proof_request(&mut self, handle: u32, connection: u32) -> Reply {
        let state = self.object(EntityKind::Proof, handle)?.state();
        self.connected(connection)?;
        if state != State::Initialized {
            return Err(Fault::Completion(ErrorCode::NotReady));
        }
        self.object_mut(EntityKind::Proof, handle)?
            .set_state(State::OfferSent);
        Ok(CompletionPayload::Unit)
    }

    fn get_proof(&mut self, handle: u32, connection: u32) -> Reply {
        self.object(EntityKind::Connection, connection)?;
        let object = self.object_mut(EntityKind::Proof, handle)?;
        let presentation = match (&object.presentation, object.state()) {
            (Some(presentation), State::Accepted) => presentation.clone(),
            _ => return Err(Fault::Completion(ErrorCode::NotReady)),
        };
        if serde_json::from_str::<Value>(&presentation.proof).is_err() {
            return Err(Fault::Completion(ErrorCode::InvalidProof));
        }

        object.record.insert(
            "proof_state".to_string(),
            presentation.proof_state.code().into(),
        );
        Ok(CompletionPayload::U32Text(
            presentation.proof_state.code(),
            Some(presentation.proof),
        ))
    }
}

fn schema_record(source_id: &str, sequence_num: u32, schema: &LedgerSchema) -> Map<String, Value> {
    into_map(json!({
        "source_id": source_id,
        "state": State::Initialized.code(),
        "name": schema.name,
        "sequence_num": sequence_num,
        "data": {
            "name": schema.name,
            "version": schema.version,
            "attr_names": schema.attr_names,
        },
    }))
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
