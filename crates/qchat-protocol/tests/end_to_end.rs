//! Wires two sessions together over in-memory queues and a shared quantum
//! hub, standing in for the classical connection and router a real node
//! would provide. Exercises the full leader/follower exchange for each
//! protocol, not just its internal pieces.

use qchat_net::{ControlQueues, OutboundQueue};
use qchat_protocol::{Role, Session, BB84Purified, SuperDenseCoding, DIQKD};
use qchat_quantum::sim::{LocalQuantumHub, LocalQuantumLink};
use qchat_quantum::QuantumLink;
use qchat_wire::HeaderTag;
use std::sync::Arc;
use std::time::Duration;

const REGISTRY: &str = "Registry";

/// Relays frames pushed onto `from`'s outbound queue into `to`'s control
/// queue, except RQQB frames which it answers itself by acting as the EPR
/// source (the registry's role per the router spec).
async fn relay(
    from_name: &'static str,
    from_outbound: Arc<OutboundQueue>,
    peer_control: Arc<ControlQueues>,
    registry_link: Arc<LocalQuantumLink>,
) {
    loop {
        let Some(item) = from_outbound.pop().await else { break };
        if item.frame.header == HeaderTag::Rqqb && item.destination == REGISTRY {
            let requested_peer = item.frame.payload["user"].as_str().unwrap().to_string();
            let half = registry_link.create_epr(from_name).await.unwrap();
            registry_link.send_qubit(half, &requested_peer).await.unwrap();
            continue;
        }
        peer_control.push(from_name, item.frame);
    }
}

struct Node {
    control: Arc<ControlQueues>,
    outbound: Arc<OutboundQueue>,
    link: Arc<LocalQuantumLink>,
}

fn spawn_relays(alice: &Node, bob: &Node, registry_link: Arc<LocalQuantumLink>) {
    tokio::spawn(relay("Alice", alice.outbound.clone(), bob.control.clone(), registry_link.clone()));
    tokio::spawn(relay("Bob", bob.outbound.clone(), alice.control.clone(), registry_link));
}

fn make_pair(hub: &Arc<LocalQuantumHub>) -> (Node, Node) {
    let alice = Node {
        control: Arc::new(ControlQueues::new()),
        outbound: Arc::new(OutboundQueue::new()),
        link: Arc::new(LocalQuantumLink::new("Alice", hub.clone())),
    };
    let bob = Node {
        control: Arc::new(ControlQueues::new()),
        outbound: Arc::new(OutboundQueue::new()),
        link: Arc::new(LocalQuantumLink::new("Bob", hub.clone())),
    };
    (alice, bob)
}

#[tokio::test]
async fn test_bb84_purified_derives_matching_keys() {
    let hub = LocalQuantumHub::new();
    let registry_link = Arc::new(LocalQuantumLink::new(REGISTRY, hub.clone()));
    let (alice, bob) = make_pair(&hub);
    spawn_relays(&alice, &bob, registry_link);

    let leader_session = Session::new(
        "Alice",
        "Bob",
        REGISTRY,
        Role::Leader,
        HeaderTag::Bb84,
        alice.control.clone(),
        alice.outbound.clone(),
        alice.link.clone(),
    );
    let follower_session = Session::new(
        "Bob",
        "Alice",
        REGISTRY,
        Role::Follower,
        HeaderTag::Bb84,
        bob.control.clone(),
        bob.outbound.clone(),
        bob.link.clone(),
    );

    let leader = BB84Purified::new(leader_session);
    let follower = BB84Purified::new(follower_session);

    let (leader_key, follower_key) = tokio::time::timeout(Duration::from_secs(30), async {
        tokio::join!(leader.execute(1), follower.execute(1))
    })
    .await
    .expect("protocol did not finish in time");

    assert_eq!(leader_key.unwrap(), follower_key.unwrap());
}

#[tokio::test]
async fn test_diqkd_derives_matching_keys() {
    let hub = LocalQuantumHub::new();
    let registry_link = Arc::new(LocalQuantumLink::new(REGISTRY, hub.clone()));
    let (alice, bob) = make_pair(&hub);
    spawn_relays(&alice, &bob, registry_link);

    let leader_session = Session::new(
        "Alice",
        "Bob",
        REGISTRY,
        Role::Leader,
        HeaderTag::Dqkd,
        alice.control.clone(),
        alice.outbound.clone(),
        alice.link.clone(),
    );
    let follower_session = Session::new(
        "Bob",
        "Alice",
        REGISTRY,
        Role::Follower,
        HeaderTag::Dqkd,
        bob.control.clone(),
        bob.outbound.clone(),
        bob.link.clone(),
    );

    let leader = DIQKD::new(leader_session);
    let follower = DIQKD::new(follower_session);

    let (leader_key, follower_key) = tokio::time::timeout(Duration::from_secs(60), async {
        tokio::join!(leader.execute(1), follower.execute(1))
    })
    .await
    .expect("protocol did not finish in time");

    assert_eq!(leader_key.unwrap(), follower_key.unwrap());
}

#[tokio::test]
async fn test_superdense_coding_round_trips_a_message() {
    let hub = LocalQuantumHub::new();
    let registry_link = Arc::new(LocalQuantumLink::new(REGISTRY, hub.clone()));
    let (alice, bob) = make_pair(&hub);
    spawn_relays(&alice, &bob, registry_link);

    let leader_session = Session::new(
        "Alice",
        "Bob",
        REGISTRY,
        Role::Leader,
        HeaderTag::Spds,
        alice.control.clone(),
        alice.outbound.clone(),
        alice.link.clone(),
    );
    let follower_session = Session::new(
        "Bob",
        "Alice",
        REGISTRY,
        Role::Follower,
        HeaderTag::Spds,
        bob.control.clone(),
        bob.outbound.clone(),
        bob.link.clone(),
    );

    let sender = SuperDenseCoding::new(leader_session);
    let receiver = SuperDenseCoding::new(follower_session);

    let message = b"Hi".to_vec();
    let (send_result, recv_result) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(sender.send(&message), receiver.receive())
    })
    .await
    .expect("protocol did not finish in time");

    send_result.unwrap();
    assert_eq!(recv_result.unwrap(), message);
}
