//! Node lifecycle: wires the directory, router, and net queues together,
//! runs the registry handshake, and exposes the send/receive API a CLI or
//! RPC shell calls into.

use crate::config::NodeConfig;
use crate::error::NodeError;
use qchat_crypto::{decrypt, encrypt, SecretKey, Signer};
use qchat_directory::{Directory, UserUpdate};
use qchat_net::{listen, send_message, ControlQueues, Inbox, OutboundQueue};
use qchat_protocol::{BB84Purified, Role, Session, SuperDenseCoding};
use qchat_quantum::QuantumLink;
use qchat_router::{Mailbox, Router};
use qchat_types::MESSAGE_KEY_LENGTH;
use qchat_wire::{encode, from_latin1, to_latin1, Frame, HeaderTag};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_INFO_TIMEOUT: Duration = Duration::from_secs(10);
const MESSAGE_KEY_SIZE: usize = MESSAGE_KEY_LENGTH;

/// A running qchat peer: owns its directory, signer, mailbox, and the
/// queues a connection and protocol sessions talk through, plus the router
/// that dispatches inbound frames onto them.
pub struct NodeCore<L: QuantumLink> {
    config: NodeConfig,
    signer: Arc<Signer>,
    directory: Arc<Directory>,
    mailbox: Arc<Mailbox>,
    inbox: Arc<Inbox>,
    control: Arc<ControlQueues>,
    outbound: Arc<OutboundQueue>,
    link: Arc<L>,
    router: Router<L>,
}

impl<L: QuantumLink + Send + Sync + 'static> NodeCore<L> {
    /// Builds a node from its resolved config and a quantum backend handle,
    /// generating a fresh signing key and self-registering in its own
    /// directory (mirroring what a node does with its own name/key/address
    /// before it ever talks to the registry).
    pub fn new(config: NodeConfig, link: Arc<L>, allow_invalid_signatures: bool) -> Result<Self, NodeError> {
        Self::with_intercept_probability(config, link, allow_invalid_signatures, 0.0)
    }

    /// As [`Self::new`], but with an explicit probability (0.0-1.0) that
    /// this node, when it is the registry, intercepts and re-measures an
    /// RQQB'd EPR half before forwarding it. Meaningless on a non-registry
    /// node; exists only to model an eavesdropping attacker in tests.
    pub fn with_intercept_probability(
        config: NodeConfig,
        link: Arc<L>,
        allow_invalid_signatures: bool,
        intercept_probability: f64,
    ) -> Result<Self, NodeError> {
        let signer = Arc::new(Signer::generate(qchat_crypto::DEFAULT_KEY_BITS)?);
        let directory = Arc::new(Directory::new());
        let mailbox = Arc::new(Mailbox::new());
        let inbox = Arc::new(Inbox::new());
        let control = Arc::new(ControlQueues::new());
        let outbound = Arc::new(OutboundQueue::new());

        directory.add(
            &config.name,
            UserUpdate {
                public_key: Some(signer.public_key_der()?),
                connection: Some(config.endpoint.clone()),
                message_key: None,
            },
        );
        if !config.is_registry() {
            directory.add(
                &config.registry_name,
                UserUpdate {
                    public_key: None,
                    connection: Some(config.registry_endpoint.clone()),
                    message_key: None,
                },
            );
        }

        let router = Router::with_intercept_probability(
            config.name.clone(),
            config.registry_name.clone(),
            directory.clone(),
            signer.clone(),
            mailbox.clone(),
            control.clone(),
            outbound.clone(),
            link.clone(),
            allow_invalid_signatures,
            config.is_registry(),
            intercept_probability,
        );

        Ok(Self { config, signer, directory, mailbox, inbox, control, outbound, link, router })
    }

    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Starts the acceptor, the inbox drainer, and the outbound-queue
    /// sender, then registers with the root registry (a no-op if this node
    /// is the registry). Runs the background loops forever; callers spawn
    /// this and keep the handle alive for the node's lifetime.
    pub async fn run(self: Arc<Self>) -> Result<(), NodeError> {
        let listener = {
            let inbox = self.inbox.clone();
            let endpoint = self.config.endpoint.clone();
            tokio::spawn(async move {
                if let Err(e) = listen(&endpoint.host, endpoint.port, inbox).await {
                    warn!(error = %e, "listener stopped");
                }
            })
        };

        let inbox_drainer = {
            let node = self.clone();
            tokio::spawn(async move { node.drain_inbox().await })
        };

        let outbound_sender = {
            let node = self.clone();
            tokio::spawn(async move { node.drain_outbound().await })
        };

        self.register_with_root().await;

        let _ = tokio::join!(listener, inbox_drainer, outbound_sender);
        Ok(())
    }

    async fn drain_inbox(&self) {
        loop {
            match self.inbox.pop() {
                Some(frame) => {
                    let router = self.router.clone();
                    tokio::spawn(async move {
                        if let Err(e) = router.dispatch(frame).await {
                            warn!(error = %e, "failed to dispatch inbound frame");
                        }
                    });
                }
                None => tokio::time::sleep(Duration::from_millis(1)).await,
            }
        }
    }

    async fn drain_outbound(&self) {
        loop {
            let Some(item) = self.outbound.pop().await else { break };
            let mut frame = item.frame;
            if let Err(e) = self.router.sign_frame(&mut frame) {
                warn!(destination = %item.destination, error = %e, "failed to sign outbound frame");
                continue;
            }
            let endpoint = match self.directory.connection(&item.destination) {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    warn!(destination = %item.destination, error = %e, "no known address, dropping outbound frame");
                    continue;
                }
            };
            if let Err(e) = send_message(&endpoint.host, endpoint.port, &frame).await {
                warn!(destination = %item.destination, error = %e, "failed to send outbound frame");
            }
        }
    }

    /// Registers this node's name, public key, and address with the root
    /// registry. A no-op when this node is the registry. Unlike every
    /// other outbound message, registration carries no signature: the
    /// registry has no public key for us yet to verify it with.
    pub async fn register_with_root(&self) {
        if self.config.is_registry() {
            debug!("running as registry, no registration needed");
            return;
        }

        let payload = json!({
            "user": self.config.name,
            "pub": to_latin1(&self.signer.public_key_der().unwrap_or_default()),
            "connection": {"host": self.config.endpoint.host, "port": self.config.endpoint.port},
        });
        let frame = Frame::new(HeaderTag::Rgst, self.config.name.clone(), payload);

        let endpoint = &self.config.registry_endpoint;
        if let Err(e) = send_message(&endpoint.host, endpoint.port, &frame).await {
            info!(error = %e, "failed to register with root server, is it running?");
        }
    }

    /// Requests `user`'s directory record from the registry and waits (up
    /// to 10s) for it to land. A no-op if already known.
    pub async fn request_user_info(&self, user: &str) -> Result<(), NodeError> {
        if self.directory.has(user) {
            return Ok(());
        }

        let payload = json!({
            "user": user,
            "connection": {"host": self.config.endpoint.host, "port": self.config.endpoint.port},
        });
        let mut frame = Frame::new(HeaderTag::Getu, self.config.name.clone(), payload);
        self.sign(&mut frame)?;

        let endpoint = &self.config.registry_endpoint;
        send_message(&endpoint.host, endpoint.port, &frame).await?;

        let deadline = tokio::time::Instant::now() + USER_INFO_TIMEOUT;
        while !self.directory.has(user) {
            if tokio::time::Instant::now() >= deadline {
                return Err(NodeError::DirectoryTimeout(user.to_string()));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }

    fn sign(&self, frame: &mut Frame) -> Result<(), NodeError> {
        let bytes = encode(frame)?;
        let sig = self.signer.sign(&bytes);
        if let Some(obj) = frame.payload_object_mut() {
            obj.insert("sig".to_string(), json!(to_latin1(&sig)));
        }
        Ok(())
    }

    fn session(&self, peer: &str, header: HeaderTag, role: Role) -> Session<L> {
        Session::new(
            self.config.name.clone(),
            peer.to_string(),
            self.config.registry_name.clone(),
            role,
            header,
            self.control.clone(),
            self.outbound.clone(),
            self.link.clone(),
        )
    }

    /// Leads a BB84-Purified key establishment with `peer` and stores the
    /// derived key in the directory.
    pub async fn establish_key(&self, peer: &str, key_size: usize) -> Result<(), NodeError> {
        self.request_user_info(peer).await?;
        let session = self.session(peer, HeaderTag::Bb84, Role::Leader);
        let key = BB84Purified::new(session).execute(key_size).await?;
        self.store_message_key(peer, key);
        Ok(())
    }

    fn store_message_key(&self, peer: &str, key: Vec<u8>) {
        if key.len() != MESSAGE_KEY_LENGTH {
            warn!(%peer, got = key.len(), "derived key has unexpected length, discarding");
            return;
        }
        let mut fixed = [0u8; MESSAGE_KEY_LENGTH];
        fixed.copy_from_slice(&key);
        self.directory.change(peer, UserUpdate { message_key: Some(fixed), ..Default::default() });
    }

    /// Sends an AES-GCM encrypted chat message to `peer`, establishing a
    /// message key via BB84-Purified first if one isn't already shared.
    pub async fn send_qchat_message(&self, peer: &str, plaintext: &str) -> Result<(), NodeError> {
        self.request_user_info(peer).await?;

        if self.directory.message_key(peer)?.is_none() {
            self.establish_key(peer, MESSAGE_KEY_SIZE).await?;
        }
        let key = self.directory.message_key(peer)?.expect("just established");

        let encrypted = encrypt(&SecretKey::from_bytes(key), plaintext.as_bytes())?;
        let payload = json!({
            "nonce": to_latin1(encrypted.nonce.as_bytes()),
            "ciphertext": to_latin1(&encrypted.ciphertext),
            "tag": to_latin1(&encrypted.tag),
        });
        let mut frame = Frame::new(HeaderTag::Qcht, self.config.name.clone(), payload);
        self.sign(&mut frame)?;

        let endpoint = self.directory.connection(peer)?;
        send_message(&endpoint.host, endpoint.port, &frame).await?;
        info!(%peer, "sent QChat message");
        Ok(())
    }

    /// Sends `plaintext` to `peer` over the superdense-coding message
    /// protocol. Does not derive or store a message key.
    pub async fn send_superdense_message(&self, peer: &str, plaintext: &str) -> Result<(), NodeError> {
        self.request_user_info(peer).await?;
        let session = self.session(peer, HeaderTag::Spds, Role::Leader);
        SuperDenseCoding::new(session).send(plaintext.as_bytes()).await?;
        info!(%peer, "sent superdense message");
        Ok(())
    }

    /// Drains the mailbox, decrypting QCHT entries and reading SPDS
    /// entries as-is, grouped by sender. Destructive: a drained message is
    /// gone from the mailbox.
    pub fn get_message_history(&self) -> Result<HashMap<String, Vec<String>>, NodeError> {
        let mut history: HashMap<String, Vec<String>> = HashMap::new();
        for frame in self.mailbox.drain() {
            let text = self.decode_mailbox_frame(&frame)?;
            history.entry(frame.sender).or_default().push(text);
        }
        Ok(history)
    }

    /// Non-destructive variant of [`Self::get_message_history`], for
    /// callers that want to inspect pending messages without consuming
    /// them.
    pub fn peek_messages(&self) -> Result<HashMap<String, Vec<String>>, NodeError> {
        let mut history: HashMap<String, Vec<String>> = HashMap::new();
        for frame in self.mailbox.peek() {
            let text = self.decode_mailbox_frame(&frame)?;
            history.entry(frame.sender).or_default().push(text);
        }
        Ok(history)
    }

    fn decode_mailbox_frame(&self, frame: &Frame) -> Result<String, NodeError> {
        match frame.header {
            HeaderTag::Qcht => {
                let key = self
                    .directory
                    .message_key(&frame.sender)?
                    .ok_or_else(|| NodeError::NoMessageKey(frame.sender.clone()))?;
                let nonce_str = frame.payload["nonce"].as_str().unwrap_or_default();
                let ciphertext_str = frame.payload["ciphertext"].as_str().unwrap_or_default();
                let tag_str = frame.payload["tag"].as_str().unwrap_or_default();

                let nonce_bytes = from_latin1(nonce_str)?;
                let ciphertext = from_latin1(ciphertext_str)?;
                let tag_bytes = from_latin1(tag_str)?;

                let mut nonce = [0u8; 12];
                nonce.copy_from_slice(&nonce_bytes);
                let mut tag = [0u8; 16];
                tag.copy_from_slice(&tag_bytes);

                let plaintext = decrypt(
                    &SecretKey::from_bytes(key),
                    &qchat_crypto::Nonce::from_bytes(nonce),
                    &ciphertext,
                    &tag,
                )?;
                Ok(String::from_utf8_lossy(&plaintext).into_owned())
            }
            HeaderTag::Spds => Ok(frame.payload["plaintext"].as_str().unwrap_or_default().to_string()),
            other => Err(NodeError::MalformedMailboxEntry(frame.sender.clone(), other)),
        }
    }
}
