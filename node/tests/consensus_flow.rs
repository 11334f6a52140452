//! End-to-end consensus flows driven through the node's synchronous
//! pipelines: block ingest, election scheduling, vote counting, fork
//! settlement and cementing.

use lattice_consensus::Vote;
use lattice_ledger::dev_genesis_key;
use lattice_messages::Payload;
use lattice_node::{BlockSource, LoopbackNetwork, Node, NodeConfig};
use lattice_types::{
    generate_work, Account, Amount, Block, BlockHash, KeyPair, Signature, Timestamp,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn dev_node() -> (Node, Arc<LoopbackNetwork>) {
    let network = Arc::new(LoopbackNetwork::new());
    let node = Node::new(NodeConfig::default(), network.clone(), Timestamp::new(1));
    (node, network)
}

fn build_block(
    node: &Node,
    pair: &KeyPair,
    previous: BlockHash,
    representative: Account,
    balance: Amount,
    link: BlockHash,
) -> Block {
    let mut block = Block {
        account: Account::from(pair.public),
        previous,
        representative,
        balance,
        link,
        work: 0,
        signature: Signature::ZERO,
    };
    block.work = generate_work(&block.root(), node.ledger.params().work_threshold);
    block.sign(pair);
    block
}

fn send_from_genesis(node: &Node, destination: Account, amount: Amount) -> Block {
    let pair = dev_genesis_key();
    let info = node
        .ledger
        .account_info(&node.ledger.genesis_account())
        .unwrap();
    build_block(
        node,
        &pair,
        info.head,
        info.representative,
        info.balance.checked_sub(amount).unwrap(),
        BlockHash::new(*destination.as_bytes()),
    )
}

fn open_account(node: &Node, pair: &KeyPair, send_hash: BlockHash, balance: Amount) -> Block {
    let account = Account::from(pair.public);
    build_block(node, pair, BlockHash::ZERO, account, balance, send_hash)
}

#[test]
fn send_is_confirmed_through_vote_quorum() {
    let (node, network) = dev_node();
    let now = Timestamp::new(10);

    let confirmations = Arc::new(AtomicUsize::new(0));
    let counter = confirmations.clone();
    node.observers
        .on_block_confirmed(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    let destination = Account::from(KeyPair::generate().public);
    let send = send_from_genesis(&node, destination, Amount::raw(1));
    let hash = send.hash();

    assert!(node.submit_block(send, BlockSource::Local));
    node.drain_blocks(now);
    assert!(node.ledger.block_exists(&hash));
    assert!(!node.block_confirmed(&hash));

    // Processed blocks are republished to the network.
    let sent = network.take_sent();
    assert!(sent
        .iter()
        .any(|message| matches!(&message.payload, Payload::Publish(block) if block.hash() == hash)));

    node.run_schedulers(now);
    assert!(node.election_active(&hash));

    node.submit_vote(Vote::new_final(&dev_genesis_key(), vec![hash]));
    node.drain_votes(now);
    node.tick(now);

    assert!(node.block_confirmed(&hash));
    assert_eq!(confirmations.load(Ordering::SeqCst), 1);
}

#[test]
fn quorum_respects_online_weight_minimum_boundary() {
    let (node, _network) = dev_node();
    let now = Timestamp::new(10);

    // Two representatives whose combined weight lands exactly on the
    // quorum delta derived from the online-weight floor.
    let params = node.ledger.params().clone();
    let quorum = params
        .online_weight_minimum
        .multiply_bps(params.quorum_bps);
    assert_eq!(node.quorum_delta(), quorum);

    let weight_a = Amount::raw(30_000_000);
    let weight_b = quorum.checked_sub(weight_a).unwrap();
    let rep_a = KeyPair::generate();
    let rep_b = KeyPair::generate();

    let send_a = send_from_genesis(&node, Account::from(rep_a.public), weight_a);
    node.submit_block(send_a.clone(), BlockSource::Local);
    node.drain_blocks(now);
    node.submit_block(
        open_account(&node, &rep_a, send_a.hash(), weight_a),
        BlockSource::Local,
    );
    let send_b = send_from_genesis(&node, Account::from(rep_b.public), weight_b);
    node.submit_block(send_b.clone(), BlockSource::Local);
    node.submit_block(
        open_account(&node, &rep_b, send_b.hash(), weight_b),
        BlockSource::Local,
    );
    node.drain_blocks(now);

    // Elections confirm in chain order; both reps vote each one through.
    for expected in [send_a.hash(), send_b.hash()] {
        node.run_schedulers(now);
        assert!(node.election_active(&expected));
        node.submit_vote(Vote::new_final(&rep_a, vec![expected]));
        node.submit_vote(Vote::new_final(&rep_b, vec![expected]));
        node.drain_votes(now);
        node.tick(now);
        assert!(node.block_confirmed(&expected));
    }

    let contested = send_from_genesis(
        &node,
        Account::from(KeyPair::generate().public),
        Amount::raw(1),
    );
    let hash = contested.hash();
    node.submit_block(contested, BlockSource::Local);
    node.drain_blocks(now);
    node.run_schedulers(now);
    assert!(node.election_active(&hash));

    // One basis short of quorum: no confirmation.
    node.submit_vote(Vote::new_final(&rep_a, vec![hash]));
    node.drain_votes(now);
    node.tick(now);
    assert!(!node.block_confirmed(&hash));

    // The second vote lands the tally exactly on the delta.
    node.submit_vote(Vote::new_final(&rep_b, vec![hash]));
    node.drain_votes(now);
    node.tick(now);
    assert!(node.block_confirmed(&hash));
}

#[test]
fn fork_winner_replaces_losing_branch() {
    let (node, _network) = dev_node();
    let now = Timestamp::new(10);

    let genesis_pair = dev_genesis_key();
    let genesis_info = node
        .ledger
        .account_info(&node.ledger.genesis_account())
        .unwrap();
    let dest_a = Account::from(KeyPair::generate().public);
    let dest_b = Account::from(KeyPair::generate().public);

    let loser = build_block(
        &node,
        &genesis_pair,
        genesis_info.head,
        genesis_info.representative,
        genesis_info.balance.checked_sub(Amount::raw(5)).unwrap(),
        BlockHash::new(*dest_a.as_bytes()),
    );
    let winner = build_block(
        &node,
        &genesis_pair,
        genesis_info.head,
        genesis_info.representative,
        genesis_info.balance.checked_sub(Amount::raw(7)).unwrap(),
        BlockHash::new(*dest_b.as_bytes()),
    );

    node.submit_block(loser.clone(), BlockSource::Live);
    node.drain_blocks(now);
    assert!(node.ledger.block_exists(&loser.hash()));

    node.run_schedulers(now);
    assert!(node.election_active(&loser.hash()));

    // The competing branch joins the same election as a fork candidate.
    node.submit_block(winner.clone(), BlockSource::Live);
    node.drain_blocks(now);
    assert!(!node.ledger.block_exists(&winner.hash()));

    node.submit_vote(Vote::new_final(&genesis_pair, vec![winner.hash()]));
    node.drain_votes(now);
    node.tick(now);

    assert!(!node.ledger.block_exists(&loser.hash()));
    assert!(node.block_confirmed(&winner.hash()));
    assert_eq!(
        node.ledger.account_balance(&node.ledger.genesis_account()),
        Some(genesis_info.balance.checked_sub(Amount::raw(7)).unwrap())
    );
}

#[test]
fn confirming_a_block_cements_its_dependencies_first() {
    let (node, _network) = dev_node();
    let now = Timestamp::new(10);

    let destination = Account::from(KeyPair::generate().public);
    let first = send_from_genesis(&node, destination, Amount::raw(1));
    node.submit_block(first.clone(), BlockSource::Local);
    node.drain_blocks(now);
    let second = send_from_genesis(&node, destination, Amount::raw(1));
    node.submit_block(second.clone(), BlockSource::Local);
    node.drain_blocks(now);

    // An operator request elects the tip directly.
    node.election_request(second.clone());
    node.run_schedulers(now);
    assert!(node.election_active(&second.hash()));

    node.submit_vote(Vote::new_final(&dev_genesis_key(), vec![second.hash()]));
    node.drain_votes(now);
    node.tick(now);

    assert!(node.block_confirmed(&first.hash()));
    assert!(node.block_confirmed(&second.hash()));
}

#[test]
fn force_confirm_cements_without_votes() {
    let (node, _network) = dev_node();
    let now = Timestamp::new(10);

    let destination = Account::from(KeyPair::generate().public);
    let send = send_from_genesis(&node, destination, Amount::raw(1));
    let hash = send.hash();
    node.submit_block(send, BlockSource::Local);
    node.drain_blocks(now);
    node.run_schedulers(now);
    assert!(node.election_active(&hash));

    assert!(node.force_confirm(&hash, now));
    node.tick(now);
    assert!(node.block_confirmed(&hash));

    // No election for the hash means nothing to force.
    assert!(!node.force_confirm(&hash, now));
}

#[test]
fn gapped_block_waits_for_its_dependency() {
    let (node, _network) = dev_node();
    let now = Timestamp::new(10);

    let destination = Account::from(KeyPair::generate().public);
    let first = send_from_genesis(&node, destination, Amount::raw(1));
    let genesis_pair = dev_genesis_key();
    let info = node
        .ledger
        .account_info(&node.ledger.genesis_account())
        .unwrap();
    let second = build_block(
        &node,
        &genesis_pair,
        first.hash(),
        info.representative,
        info.balance.checked_sub(Amount::raw(2)).unwrap(),
        BlockHash::new(*destination.as_bytes()),
    );

    node.submit_block(second.clone(), BlockSource::Live);
    node.drain_blocks(now);
    assert!(!node.ledger.block_exists(&second.hash()));

    // The missing parent releases the buffered child in the same pass.
    node.submit_block(first.clone(), BlockSource::Live);
    node.drain_blocks(now);
    assert!(node.ledger.block_exists(&first.hash()));
    assert!(node.ledger.block_exists(&second.hash()));
}

#[test]
fn vote_arriving_before_its_block_still_counts() {
    let (node, _network) = dev_node();
    let now = Timestamp::new(10);

    let destination = Account::from(KeyPair::generate().public);
    let send = send_from_genesis(&node, destination, Amount::raw(1));
    let hash = send.hash();

    // The vote lands first: no election exists, so it is cached.
    node.submit_vote(Vote::new_final(&dev_genesis_key(), vec![hash]));
    node.drain_votes(now);
    assert!(!node.election_active(&hash));

    // When the block arrives and its election starts, the cached vote is
    // replayed and confirms it without further traffic.
    node.submit_block(send, BlockSource::Live);
    node.drain_blocks(now);
    node.run_schedulers(now);
    node.tick(now);
    assert!(node.block_confirmed(&hash));
}

#[test]
fn confirm_requests_are_flooded_for_stalled_elections() {
    let (node, network) = dev_node();
    let now = Timestamp::new(10);

    let destination = Account::from(KeyPair::generate().public);
    let send = send_from_genesis(&node, destination, Amount::raw(1));
    let hash = send.hash();
    node.submit_block(send, BlockSource::Local);
    node.drain_blocks(now);
    node.run_schedulers(now);
    network.take_sent();

    node.tick(now);
    let sent = network.take_sent();
    assert!(sent.iter().any(|message| matches!(
        &message.payload,
        Payload::ConfirmReq(roots) if roots.iter().any(|(_, winner)| *winner == hash)
    )));
}
