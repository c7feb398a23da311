//! Inbound frame dispatch: the router is the single place that applies the
//! per-header verify/strip policy before handing a frame to its handler, and
//! owns the directory-backed RGST/GETU/PUTU handlers, RQQB's EPR-source
//! behaviour (only meaningful when this node plays the registry role), and
//! spawning a follower-role protocol task off of an inbound PTCL frame.

use crate::error::RouterError;
use crate::mailbox::Mailbox;
use qchat_crypto::{Signer, Verifier};
use qchat_directory::{Directory, UserUpdate};
use qchat_net::{send_message, ControlQueues, OutboundQueue};
use qchat_protocol::{
    BB84Purified, Diqkd, Role, Session, SuperDenseCoding, BB84_PURIFIED, DIQKD, SUPERDENSE,
};
use qchat_quantum::{Qubit, QuantumLink};
use qchat_types::Endpoint;
use qchat_wire::{encode, Frame, HeaderTag};
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared state a running [`Router`] hands to every handler and spawned
/// protocol task. Cloning a `Router` clones this `Arc`, not the state.
struct Inner<L: QuantumLink> {
    own_name: String,
    registry_name: String,
    directory: Arc<Directory>,
    signer: Arc<Signer>,
    mailbox: Arc<Mailbox>,
    control: Arc<ControlQueues>,
    outbound: Arc<OutboundQueue>,
    link: Arc<L>,
    allow_invalid_signatures: bool,
    is_registry: bool,
    intercept_probability: f64,
}

/// Cheaply cloneable handle to a node's inbound dispatch logic.
pub struct Router<L: QuantumLink>(Arc<Inner<L>>);

impl<L: QuantumLink> Clone for Router<L> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<L: QuantumLink + Send + Sync + 'static> Router<L> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        own_name: impl Into<String>,
        registry_name: impl Into<String>,
        directory: Arc<Directory>,
        signer: Arc<Signer>,
        mailbox: Arc<Mailbox>,
        control: Arc<ControlQueues>,
        outbound: Arc<OutboundQueue>,
        link: Arc<L>,
        allow_invalid_signatures: bool,
        is_registry: bool,
    ) -> Self {
        Self::with_intercept_probability(
            own_name,
            registry_name,
            directory,
            signer,
            mailbox,
            control,
            outbound,
            link,
            allow_invalid_signatures,
            is_registry,
            0.0,
        )
    }

    /// As [`Self::new`], but with an explicit probability (0.0–1.0) that
    /// this node, when playing the registry role, intercepts and
    /// re-measures an RQQB'd EPR half before forwarding it rather than
    /// relaying the genuine entangled qubit. Meaningless on a non-registry
    /// node. Exists only to model an eavesdropping attacker in tests.
    #[allow(clippy::too_many_arguments)]
    pub fn with_intercept_probability(
        own_name: impl Into<String>,
        registry_name: impl Into<String>,
        directory: Arc<Directory>,
        signer: Arc<Signer>,
        mailbox: Arc<Mailbox>,
        control: Arc<ControlQueues>,
        outbound: Arc<OutboundQueue>,
        link: Arc<L>,
        allow_invalid_signatures: bool,
        is_registry: bool,
        intercept_probability: f64,
    ) -> Self {
        Self(Arc::new(Inner {
            own_name: own_name.into(),
            registry_name: registry_name.into(),
            directory,
            signer,
            mailbox,
            control,
            outbound,
            link,
            allow_invalid_signatures,
            is_registry,
            intercept_probability,
        }))
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.0.mailbox
    }

    pub fn directory(&self) -> &Arc<Directory> {
        &self.0.directory
    }

    /// Signs `frame`'s wire encoding (with no `sig` field present yet) and
    /// inserts the result as a latin1-encoded `sig` field.
    pub fn sign_frame(&self, frame: &mut Frame) -> Result<(), RouterError> {
        let bytes = encode(frame)?;
        let sig = self.0.signer.sign(&bytes);
        let obj = frame.payload_object_mut().ok_or_else(|| {
            RouterError::Malformed(frame.header, "payload is not an object".to_string())
        })?;
        obj.insert("sig".to_string(), json!(qchat_wire::to_latin1(&sig)));
        Ok(())
    }

    /// The router's main entrypoint: applies verify/strip policy, then
    /// dispatches to the per-header handler.
    pub async fn dispatch(&self, mut frame: Frame) -> Result<(), RouterError> {
        debug!(header = ?frame.header, sender = %frame.sender, "dispatching inbound frame");

        if frame.header.requires_verify() {
            let sig = extract_signature(&mut frame)?;
            if !self.0.allow_invalid_signatures {
                let pubkey = self.0.directory.public_key(&frame.sender)?;
                let verifier = Verifier::from_pkcs1_der(&pubkey)
                    .map_err(|_| RouterError::BadSignature(frame.sender.clone()))?;
                let bytes = encode(&frame)?;
                if !verifier.verify(&bytes, &sig) {
                    return Err(RouterError::BadSignature(frame.sender));
                }
            } else {
                warn!("signature verification disabled, accepting frame on faith");
            }
        } else if frame.header.requires_strip() {
            let _ = extract_signature(&mut frame);
        }

        match frame.header {
            HeaderTag::Rgst => self.handle_register(frame),
            HeaderTag::Getu => self.handle_getu(frame).await,
            HeaderTag::Putu => self.handle_putu(frame),
            HeaderTag::Ptcl => {
                self.spawn_follower(frame);
                Ok(())
            }
            HeaderTag::Rqqb => self.handle_rqqb(frame).await,
            HeaderTag::Qcht => {
                self.0.mailbox.store(frame);
                Ok(())
            }
            HeaderTag::Bb84 | HeaderTag::Dqkd | HeaderTag::Spds | HeaderTag::Mssg | HeaderTag::Auth => {
                self.0.control.push(&frame.sender, frame);
                Ok(())
            }
        }
    }

    fn handle_register(&self, frame: Frame) -> Result<(), RouterError> {
        let user = require_str(&frame, "user")?.to_string();
        let update = parse_user_update(&frame)?;
        self.0.directory.register(&user, update)?;
        debug!(%user, "registered new user");
        Ok(())
    }

    fn handle_putu(&self, frame: Frame) -> Result<(), RouterError> {
        let user = require_str(&frame, "user")?;
        if user == "*" {
            let entries = frame
                .payload
                .get("info")
                .and_then(Value::as_array)
                .ok_or_else(|| RouterError::Malformed(frame.header, "missing info array".to_string()))?;
            for entry in entries {
                let name = entry
                    .get("user")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RouterError::Malformed(frame.header, "entry missing user".to_string()))?;
                if !self.0.directory.has(name) {
                    self.0.directory.add(name, parse_user_update_value(entry)?);
                }
            }
        } else {
            self.0.directory.add(user, parse_user_update(&frame)?);
        }
        Ok(())
    }

    async fn handle_getu(&self, frame: Frame) -> Result<(), RouterError> {
        let requested_user = require_str(&frame, "user")?.to_string();
        let reply_to = parse_endpoint(&frame, "connection")?;

        let info = self.0.directory.public_info(&requested_user)?;
        let mut reply = Frame::new(HeaderTag::Putu, self.0.own_name.clone(), info);
        self.sign_frame(&mut reply)?;

        send_message(&reply_to.host, reply_to.port, &reply).await?;
        Ok(())
    }

    /// Only meaningful when this router is running as the root registry:
    /// acts as an EPR source by creating a pair and routing one half back
    /// to the requester and the other to the named peer. With probability
    /// `intercept_probability`, measures the outbound half in the
    /// computational basis and sends a freshly prepared qubit in that
    /// outcome instead of the genuine entangled half, modelling an
    /// intercept-resend attacker: this destroys the entanglement, so the
    /// two peers' bases will agree by chance alone and their sifted bits
    /// will disagree at the usual 25% rate.
    async fn handle_rqqb(&self, frame: Frame) -> Result<(), RouterError> {
        if !self.0.is_registry {
            warn!(sender = %frame.sender, "got RQQB but this node is not the registry, ignoring");
            return Ok(());
        }
        let peer = require_str(&frame, "user")?.to_string();
        debug!(requester = %frame.sender, %peer, "distributing EPR pair");

        let half = self.0.link.create_epr(&frame.sender).await?;
        if self.0.intercept_probability > 0.0 && rand::thread_rng().gen_bool(self.0.intercept_probability) {
            warn!(requester = %frame.sender, %peer, "intercepting EPR pair before forwarding");
            let eavesdrop_basis = u8::from(rand::thread_rng().gen_bool(0.5));
            let outcome = measure_in_basis(half, eavesdrop_basis);
            let mut fresh = self.0.link.new_qubit().await?;
            if outcome == 1 {
                fresh.x();
            }
            if eavesdrop_basis == 1 {
                fresh.h();
            }
            self.0.link.send_qubit(fresh, &peer).await?;
        } else {
            self.0.link.send_qubit(half, &peer).await?;
        }
        Ok(())
    }

    /// Spawns a background task that assumes the follower role in whatever
    /// protocol the PTCL frame named, running to completion and storing
    /// the result (a derived message key, or a decoded plaintext) once
    /// done.
    fn spawn_follower(&self, frame: Frame) {
        let Some(name) = frame.payload.get("name").and_then(Value::as_str).map(str::to_string) else {
            warn!(sender = %frame.sender, "PTCL frame missing protocol name");
            return;
        };
        let key_size =
            frame.payload.get("key_size").and_then(Value::as_u64).map(|v| v as usize).unwrap_or(16);
        let peer = frame.sender.clone();
        let router = self.clone();

        tokio::spawn(async move {
            let header = match name.as_str() {
                BB84_PURIFIED => HeaderTag::Bb84,
                DIQKD => HeaderTag::Dqkd,
                SUPERDENSE => HeaderTag::Spds,
                other => {
                    warn!(protocol = other, "unknown protocol name in PTCL frame");
                    return;
                }
            };

            let session = Session::new(
                router.0.own_name.clone(),
                peer.clone(),
                router.0.registry_name.clone(),
                Role::Follower,
                header,
                router.0.control.clone(),
                router.0.outbound.clone(),
                router.0.link.clone(),
            );

            match name.as_str() {
                BB84_PURIFIED => match BB84Purified::new(session).execute(key_size).await {
                    Ok(key) => router.store_message_key(&peer, key),
                    Err(e) => warn!(%peer, error = %e, "BB84 follower session failed"),
                },
                DIQKD => match Diqkd::new(session).execute(key_size).await {
                    Ok(key) => router.store_message_key(&peer, key),
                    Err(e) => warn!(%peer, error = %e, "DIQKD follower session failed"),
                },
                SUPERDENSE => match SuperDenseCoding::new(session).receive().await {
                    Ok(plaintext) => {
                        let text = String::from_utf8_lossy(&plaintext).into_owned();
                        router.0.mailbox.store(Frame::new(HeaderTag::Spds, peer.clone(), json!({"plaintext": text})));
                    }
                    Err(e) => warn!(%peer, error = %e, "superdense follower session failed"),
                },
                _ => unreachable!(),
            }
        });
    }

    fn store_message_key(&self, peer: &str, key: Vec<u8>) {
        if key.len() != qchat_types::MESSAGE_KEY_LENGTH {
            warn!(%peer, got = key.len(), "derived key has unexpected length, discarding");
            return;
        }
        let mut fixed = [0u8; qchat_types::MESSAGE_KEY_LENGTH];
        fixed.copy_from_slice(&key);
        self.0.directory.change(peer, UserUpdate { message_key: Some(fixed), ..Default::default() });
        debug!(%peer, "established message key");
    }
}

/// Measures `half` in the standard basis (`basis=0`) or the Hadamard basis
/// (`basis=1`), the same convention the leader's own measurement device
/// uses, so an intercepted qubit is classically indistinguishable from one
/// measured by the genuine recipient.
fn measure_in_basis<Q: Qubit>(mut half: Q, basis: u8) -> u8 {
    if basis == 1 {
        half.h();
    }
    half.measure()
}

fn require_str<'a>(frame: &'a Frame, field: &str) -> Result<&'a str, RouterError> {
    frame
        .payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RouterError::Malformed(frame.header, format!("missing field {field}")))
}

fn parse_endpoint(frame: &Frame, field: &str) -> Result<Endpoint, RouterError> {
    let conn = frame
        .payload
        .get(field)
        .ok_or_else(|| RouterError::Malformed(frame.header, format!("missing field {field}")))?;
    parse_endpoint_value(frame.header, conn)
}

fn parse_endpoint_value(header: HeaderTag, conn: &Value) -> Result<Endpoint, RouterError> {
    let host = conn
        .get("host")
        .and_then(Value::as_str)
        .ok_or_else(|| RouterError::Malformed(header, "connection missing host".to_string()))?
        .to_string();
    let port = conn
        .get("port")
        .and_then(Value::as_u64)
        .ok_or_else(|| RouterError::Malformed(header, "connection missing port".to_string()))? as u16;
    Ok(Endpoint { host, port })
}

fn parse_user_update(frame: &Frame) -> Result<UserUpdate, RouterError> {
    parse_user_update_value(&frame.payload).map_err(|_| {
        RouterError::Malformed(frame.header, "malformed user update payload".to_string())
    })
}

fn parse_user_update_value(value: &Value) -> Result<UserUpdate, RouterError> {
    let public_key = match value.get("pub").and_then(Value::as_str) {
        Some(s) => Some(qchat_wire::from_latin1(s)?),
        None => None,
    };
    let connection = match value.get("connection") {
        Some(conn) => Some(parse_endpoint_value(HeaderTag::Putu, conn)?),
        None => None,
    };
    Ok(UserUpdate { public_key, connection, message_key: None })
}

fn extract_signature(frame: &mut Frame) -> Result<Vec<u8>, RouterError> {
    let header = frame.header;
    let obj = frame
        .payload_object_mut()
        .ok_or_else(|| RouterError::Malformed(header, "payload is not an object".to_string()))?;
    let sig_value = obj.remove("sig").ok_or(RouterError::MissingSignature)?;
    let sig_str = sig_value
        .as_str()
        .ok_or_else(|| RouterError::Malformed(header, "sig field is not a string".to_string()))?;
    Ok(qchat_wire::from_latin1(sig_str)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qchat_quantum::sim::LocalQuantumLink;

    fn test_router(allow_invalid_signatures: bool) -> (Router<LocalQuantumLink>, Signer) {
        let hub = qchat_quantum::sim::LocalQuantumHub::new();
        let link = Arc::new(LocalQuantumLink::new("Registry", hub));
        let signer = Signer::generate(1024).unwrap();
        let router = Router::new(
            "Registry",
            "Registry",
            Arc::new(Directory::new()),
            Arc::new(Signer::generate(1024).unwrap()),
            Arc::new(Mailbox::new()),
            Arc::new(ControlQueues::new()),
            Arc::new(OutboundQueue::new()),
            link,
            allow_invalid_signatures,
            true,
        );
        (router, signer)
    }

    #[tokio::test]
    async fn test_registers_a_new_user() {
        let (router, _) = test_router(false);
        let frame = Frame::new(
            HeaderTag::Rgst,
            "Alice",
            json!({"user": "Alice", "pub": qchat_wire::to_latin1(b"pubkey"), "connection": {"host": "127.0.0.1", "port": 9000}}),
        );
        router.dispatch(frame).await.unwrap();
        assert!(router.directory().has("Alice"));
        assert_eq!(router.directory().public_key("Alice").unwrap(), b"pubkey");
    }

    #[tokio::test]
    async fn test_putu_wildcard_adds_only_unknown_users() {
        let (router, _) = test_router(false);
        router.directory().register(
            "Alice",
            UserUpdate {
                public_key: Some(b"already-known".to_vec()),
                connection: Some(Endpoint::new("127.0.0.1", 1000)),
                message_key: None,
            },
        ).unwrap();

        let frame = Frame::new(
            HeaderTag::Putu,
            "Registry",
            json!({
                "user": "*",
                "info": [
                    {"user": "Alice", "pub": qchat_wire::to_latin1(b"new-key"), "connection": {"host": "10.0.0.1", "port": 2000}},
                    {"user": "Bob", "pub": qchat_wire::to_latin1(b"bob-key"), "connection": {"host": "10.0.0.2", "port": 2001}},
                ],
            }),
        );
        router.dispatch(frame).await.unwrap();

        assert_eq!(router.directory().public_key("Alice").unwrap(), b"already-known");
        assert_eq!(router.directory().public_key("Bob").unwrap(), b"bob-key");
    }

    #[tokio::test]
    async fn test_dispatch_rejects_a_tampered_signature() {
        let (router, _) = test_router(false);
        let signer = Signer::generate(1024).unwrap();
        router.directory().register(
            "Alice",
            UserUpdate {
                public_key: Some(signer.public_key_der().unwrap()),
                connection: Some(Endpoint::new("127.0.0.1", 1000)),
                message_key: None,
            },
        ).unwrap();

        let mut frame = Frame::new(HeaderTag::Qcht, "Alice", json!({"nonce": "x"}));
        let bytes = encode(&frame).unwrap();
        let sig = signer.sign(&bytes);
        frame.payload_object_mut().unwrap().insert("sig".to_string(), json!(qchat_wire::to_latin1(&sig)));
        // Tamper with the payload after signing.
        frame.payload_object_mut().unwrap().insert("nonce".to_string(), json!("y"));

        assert!(matches!(router.dispatch(frame).await, Err(RouterError::BadSignature(_))));
    }

    #[tokio::test]
    async fn test_rqqb_intercept_degrades_correlation_to_the_classic_eavesdropping_rate() {
        let hub = qchat_quantum::sim::LocalQuantumHub::new();
        let registry_link = Arc::new(LocalQuantumLink::new("Registry", hub.clone()));
        let alice_link = LocalQuantumLink::new("Alice", hub.clone());
        let bob_link = LocalQuantumLink::new("Bob", hub.clone());

        let router = Router::with_intercept_probability(
            "Registry",
            "Registry",
            Arc::new(Directory::new()),
            Arc::new(Signer::generate(1024).unwrap()),
            Arc::new(Mailbox::new()),
            Arc::new(ControlQueues::new()),
            Arc::new(OutboundQueue::new()),
            registry_link,
            false,
            true,
            1.0,
        );

        let trials = 200;
        let mut agreements = 0;
        for _ in 0..trials {
            let frame = Frame::new(HeaderTag::Rqqb, "Alice", json!({"user": "Bob"}));
            router.dispatch(frame).await.unwrap();
            let mut alice_half = alice_link.recv_epr().await.unwrap();
            let mut bob_half = bob_link.recv_qubit().await.unwrap();
            if alice_half.measure() == bob_half.measure() {
                agreements += 1;
            }
        }

        // A full intercept-resend attack leaves Alice and Bob correlated
        // only when the eavesdropper happened to measure in their shared
        // basis (50% of the time); otherwise their outcomes are
        // independent coin flips. Net agreement settles at 75%, the
        // textbook BB84 eavesdropping signature.
        let rate = agreements as f64 / trials as f64;
        assert!((rate - 0.75).abs() < 0.1, "agreement rate was {rate}, expected ~0.75");
    }

    #[tokio::test]
    async fn test_rqqb_forwards_the_genuine_pair_when_interception_is_disabled() {
        let hub = qchat_quantum::sim::LocalQuantumHub::new();
        let registry_link = Arc::new(LocalQuantumLink::new("Registry", hub.clone()));
        let alice_link = LocalQuantumLink::new("Alice", hub.clone());
        let bob_link = LocalQuantumLink::new("Bob", hub.clone());

        let router = Router::new(
            "Registry",
            "Registry",
            Arc::new(Directory::new()),
            Arc::new(Signer::generate(1024).unwrap()),
            Arc::new(Mailbox::new()),
            Arc::new(ControlQueues::new()),
            Arc::new(OutboundQueue::new()),
            registry_link,
            false,
            true,
        );

        for _ in 0..50 {
            let frame = Frame::new(HeaderTag::Rqqb, "Alice", json!({"user": "Bob"}));
            router.dispatch(frame).await.unwrap();
            let mut alice_half = alice_link.recv_epr().await.unwrap();
            let mut bob_half = bob_link.recv_qubit().await.unwrap();
            assert_eq!(alice_half.measure(), bob_half.measure());
        }
    }
}
