//! Bridge scenarios: subscriptions, swap attachment through the hub, unwraps.

mod common;

use solanoid_codec::CrossChainMintVector;
use solanoid_core::{ProgramEvent, ProtocolError};
use solanoid_executor::{
    ConfirmationConfig, Executor, ExecutorError, TransactionStatus,
};
use solanoid_nebula::NebulaClient;
use solanoid_simulation::{SimConfig, SimLedger};
use solanoid_test_helpers::{swap_id, test_rng};
use solanoid_types::{ForeignAddress, Round, SubscriptionId, SwapId, LAMPORTS_PER_SOL};
use std::sync::Arc;
use std::time::Duration;
use tracing_test::traced_test;

#[tokio::test]
async fn test_duplicate_subscription() {
    let bridge = common::bridge(21).await;
    let authority = bridge.port().authority();

    let err = bridge
        .nebula()
        .subscribe(authority, 3, 10, bridge.subscription_id())
        .await
        .unwrap_err();
    assert!(err.is_protocol(ProtocolError::DuplicateSubscription), "{err}");

    bridge
        .nebula()
        .subscribe(authority, 1, 1, SubscriptionId::new([0x77; 16]))
        .await
        .unwrap();
    let state = bridge.nebula().fetch_state().await.unwrap().unwrap();
    assert_eq!(state.subscriptions.len(), 2);
}

#[tokio::test]
async fn test_unknown_subscription() {
    let bridge = common::bridge(22).await;
    let owner = bridge.ledger().new_keypair();
    let recipient = bridge.create_recipient(&owner.pubkey()).unwrap();
    let delivery = bridge.delivery_to(recipient).unwrap();

    let err = bridge
        .nebula()
        .send_mint_vector(
            &bridge.consuls()[0],
            Round(1),
            SubscriptionId::new([0xee; 16]),
            CrossChainMintVector::new(SwapId::new([1; 16]), recipient, 1.0),
            &delivery,
        )
        .await
        .unwrap_err();
    assert!(err.is_protocol(ProtocolError::UnknownSubscription), "{err}");
    assert_eq!(bridge.ledger().token_balance(&recipient).unwrap(), 0);
}

#[tokio::test]
#[traced_test]
async fn test_attach_then_replay() {
    let bridge = common::bridge(23).await;
    let ledger = bridge.ledger();
    let alice = ledger.new_keypair();
    let bob = ledger.new_keypair();
    let alice_account = bridge.create_recipient(&alice.pubkey()).unwrap();
    let bob_account = bridge.create_recipient(&bob.pubkey()).unwrap();
    let swap = swap_id(&mut test_rng(23));

    let outcome = bridge
        .attach(0, Round(1), CrossChainMintVector::new(swap, alice_account, 12.5))
        .await
        .unwrap();
    assert_eq!(ledger.token_balance(&alice_account).unwrap(), 1_250_000_000);

    let events = ledger.events(&outcome.signature);
    assert!(events.contains(&ProgramEvent::SwapAttached {
        swap_id: swap,
        recipient: alice_account,
        amount: 1_250_000_000,
    }));
    assert!(events.contains(&ProgramEvent::TokensMinted {
        mint: bridge.mint(),
        destination: alice_account,
        amount: 1_250_000_000,
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgramEvent::ValueDelivered { round: Round(1), .. })));

    // same swap id, different recipient and amount, fresh round
    let err = bridge
        .attach(1, Round(2), CrossChainMintVector::new(swap, bob_account, 3.0))
        .await
        .unwrap_err();
    assert!(err.is_double_spend(), "{err}");
    assert_eq!(ledger.token_balance(&bob_account).unwrap(), 0);
    assert_eq!(ledger.mint(&bridge.mint()).unwrap().supply, 1_250_000_000);

    let port = bridge.port().fetch_state().await.unwrap().unwrap();
    assert_eq!(port.swaps.len(), 1);
    assert_eq!(port.swap(&swap).unwrap().recipient, alice_account);

    // the failed replay did not consume round 2
    let state = bridge.nebula().fetch_state().await.unwrap().unwrap();
    let subscription = state.subscription(&bridge.subscription_id()).unwrap();
    assert_eq!(subscription.last_round, Some(Round(1)));
}

#[tokio::test]
async fn test_stale_round_rejected() {
    let bridge = common::bridge(24).await;
    let owner = bridge.ledger().new_keypair();
    let recipient = bridge.create_recipient(&owner.pubkey()).unwrap();

    bridge
        .attach(0, Round(5), CrossChainMintVector::new(SwapId::new([1; 16]), recipient, 1.0))
        .await
        .unwrap();
    let err = bridge
        .attach(0, Round(5), CrossChainMintVector::new(SwapId::new([2; 16]), recipient, 1.0))
        .await
        .unwrap_err();
    assert!(err.is_protocol(ProtocolError::StaleRound), "{err}");
    assert_eq!(bridge.ledger().token_balance(&recipient).unwrap(), 100_000_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attach_same_swap() {
    let bridge = Arc::new(common::bridge(25).await);
    let owner = bridge.ledger().new_keypair();
    let recipient = bridge.create_recipient(&owner.pubkey()).unwrap();
    let swap = SwapId::new([0x42; 16]);

    // one subscription per racer, all at round 1, so only the swap id can
    // decide between them
    let mut subscriptions = vec![bridge.subscription_id()];
    for tag in 1..4u8 {
        let id = SubscriptionId::new([0x60 + tag; 16]);
        bridge
            .nebula()
            .subscribe(bridge.port().authority(), 1, 1, id)
            .await
            .unwrap();
        subscriptions.push(id);
    }
    let amounts = [1.0, 2.5, 7.0, 0.25];

    let tasks: Vec<_> = subscriptions
        .into_iter()
        .zip(amounts)
        .enumerate()
        .map(|(i, (subscription, amount))| {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                let vector = CrossChainMintVector::new(swap, recipient, amount);
                let delivery = bridge.delivery_to(recipient).unwrap();
                let result = bridge
                    .nebula()
                    .send_mint_vector(&bridge.consuls()[i], Round(1), subscription, vector, &delivery)
                    .await;
                (amount, result)
            })
        })
        .collect();

    let mut successes = Vec::new();
    for task in tasks {
        let (amount, result) = task.await.unwrap();
        match result {
            Ok(_) => successes.push(amount),
            Err(err) => assert!(err.is_double_spend(), "unexpected failure: {err}"),
        }
    }
    assert_eq!(successes.len(), 1, "exactly one attach must succeed");

    let minted = (successes[0] * 1e8).round() as u64;
    assert_eq!(bridge.ledger().token_balance(&recipient).unwrap(), minted);
    let port = bridge.port().fetch_state().await.unwrap().unwrap();
    assert_eq!(port.swaps.len(), 1);
    assert_eq!(port.swap(&swap).unwrap().amount, minted);
}

#[tokio::test]
async fn test_mint_vector_amount_boundaries() {
    let bridge = common::bridge(26).await;
    let owner = bridge.ledger().new_keypair();
    let recipient = bridge.create_recipient(&owner.pubkey()).unwrap();
    let swap = SwapId::new([9; 16]);

    for (round, amount) in [(1, f64::MAX), (2, -1.0), (3, f64::NAN)] {
        let err = bridge
            .attach(0, Round(round), CrossChainMintVector::new(swap, recipient, amount))
            .await
            .unwrap_err();
        assert!(err.is_protocol(ProtocolError::InvalidAmount), "{amount}: {err}");
    }

    // the rejected attempts left the swap id unused
    bridge
        .attach(0, Round(4), CrossChainMintVector::new(swap, recipient, 0.123456789))
        .await
        .unwrap();
    assert_eq!(bridge.ledger().token_balance(&recipient).unwrap(), 12_345_679);

    bridge
        .attach(0, Round(5), CrossChainMintVector::new(SwapId::new([10; 16]), recipient, 0.0))
        .await
        .unwrap();
    assert_eq!(bridge.ledger().token_balance(&recipient).unwrap(), 12_345_679);
}

#[tokio::test]
async fn test_direct_attach_rejected() {
    let bridge = common::bridge(27).await;
    let owner = bridge.ledger().new_keypair();
    let recipient = bridge.create_recipient(&owner.pubkey()).unwrap();

    let err = bridge
        .port()
        .attach_value(CrossChainMintVector::new(SwapId::new([3; 16]), recipient, 1.0))
        .await
        .unwrap_err();
    assert!(err.is_protocol(ProtocolError::UnauthorizedCaller), "{err}");
    assert_eq!(bridge.ledger().token_balance(&recipient).unwrap(), 0);
}

#[tokio::test]
async fn test_attach_to_wrong_recipient_account() {
    let bridge = common::bridge(28).await;
    let owner = bridge.ledger().new_keypair();
    let recipient = bridge.create_recipient(&owner.pubkey()).unwrap();
    let other = bridge.create_recipient(&owner.pubkey()).unwrap();
    let delivery = bridge.delivery_to(other).unwrap();

    let err = bridge
        .nebula()
        .send_mint_vector(
            &bridge.consuls()[0],
            Round(1),
            bridge.subscription_id(),
            CrossChainMintVector::new(SwapId::new([4; 16]), recipient, 1.0),
            &delivery,
        )
        .await
        .unwrap_err();
    assert!(err.is_protocol(ProtocolError::AccountMismatch), "{err}");
}

#[tokio::test]
#[traced_test]
async fn test_unwrap_flow() {
    let bridge = common::bridge(29).await;
    let ledger = bridge.ledger();
    let owner = ledger.funded_keypair(LAMPORTS_PER_SOL);
    let holding = bridge.create_recipient(&owner.pubkey()).unwrap();
    bridge
        .attach(0, Round(1), CrossChainMintVector::new(SwapId::new([5; 16]), holding, 10.0))
        .await
        .unwrap();

    let receiver = ForeignAddress::from_evm([0xab; 20]);
    let err = bridge
        .port()
        .create_transfer_unwrap_request(&owner, holding, receiver, 4.0)
        .await
        .unwrap_err();
    assert!(err.is_protocol(ProtocolError::InsufficientDelegation), "{err}");

    ledger
        .approve(&owner, &holding, &bridge.port().authority(), 400_000_000)
        .unwrap();
    let outcome = bridge
        .port()
        .create_transfer_unwrap_request(&owner, holding, receiver, 4.0)
        .await
        .unwrap();
    assert_eq!(ledger.token_balance(&holding).unwrap(), 600_000_000);
    assert_eq!(ledger.mint(&bridge.mint()).unwrap().supply, 600_000_000);
    assert!(ledger
        .events(&outcome.signature)
        .contains(&ProgramEvent::UnwrapRequested {
            seq: 0,
            sender: holding,
            receiver,
            amount: 400_000_000,
        }));

    let port = bridge.port().fetch_state().await.unwrap().unwrap();
    assert_eq!(port.unwraps.len(), 1);
    assert_eq!(port.unwraps[0].receiver, receiver);

    // the delegation is used up
    let err = bridge
        .port()
        .create_transfer_unwrap_request(&owner, holding, receiver, 1.0)
        .await
        .unwrap_err();
    assert!(err.is_protocol(ProtocolError::InsufficientDelegation), "{err}");

    let err = bridge
        .port()
        .create_transfer_unwrap_request(&owner, holding, receiver, -1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Malformed { .. }), "{err}");
}

#[tokio::test]
async fn test_unwrap_beyond_balance() {
    let bridge = common::bridge(33).await;
    let ledger = bridge.ledger();
    let owner = ledger.funded_keypair(LAMPORTS_PER_SOL);
    let holding = bridge.create_recipient(&owner.pubkey()).unwrap();
    bridge
        .attach(0, Round(1), CrossChainMintVector::new(SwapId::new([11; 16]), holding, 2.0))
        .await
        .unwrap();
    // delegation larger than the holding
    ledger
        .approve(&owner, &holding, &bridge.port().authority(), 1_000_000_000)
        .unwrap();

    let err = bridge
        .port()
        .create_transfer_unwrap_request(&owner, holding, ForeignAddress::from_evm([2; 20]), 5.0)
        .await
        .unwrap_err();
    assert!(err.is_protocol(ProtocolError::InsufficientBalance), "{err}");
    assert!(!err.is_double_spend(), "{err}");
    assert_eq!(ledger.token_balance(&holding).unwrap(), 200_000_000);
    let port = bridge.port().fetch_state().await.unwrap().unwrap();
    assert!(port.unwraps.is_empty());
}

#[tokio::test]
async fn test_unwrap_by_non_owner() {
    let bridge = common::bridge(30).await;
    let ledger = bridge.ledger();
    let owner = ledger.funded_keypair(LAMPORTS_PER_SOL);
    let thief = ledger.funded_keypair(LAMPORTS_PER_SOL);
    let holding = bridge.create_recipient(&owner.pubkey()).unwrap();
    bridge
        .attach(0, Round(1), CrossChainMintVector::new(SwapId::new([6; 16]), holding, 2.0))
        .await
        .unwrap();
    ledger
        .approve(&owner, &holding, &bridge.port().authority(), 200_000_000)
        .unwrap();

    let err = bridge
        .port()
        .create_transfer_unwrap_request(&thief, holding, ForeignAddress::from_evm([1; 20]), 1.0)
        .await
        .unwrap_err();
    assert!(err.is_protocol(ProtocolError::UnauthorizedCaller), "{err}");
    assert_eq!(ledger.token_balance(&holding).unwrap(), 200_000_000);
}

#[tokio::test]
async fn test_timeout_then_requery() {
    let ledger = Arc::new(SimLedger::new(
        SimConfig::default()
            .with_seed(31)
            .with_confirmation_latency(Duration::from_millis(200)),
    ));
    let bridge = common::bridge_on(ledger.clone(), 31).await;
    let owner = ledger.new_keypair();
    let recipient = bridge.create_recipient(&owner.pubkey()).unwrap();

    let impatient = NebulaClient::new(
        Executor::new(
            ledger.clone(),
            bridge.deployer().clone(),
            bridge.nebula().executor().config().clone(),
        )
        .unwrap()
        .with_confirmation(
            ConfirmationConfig::default()
                .with_timeout(Duration::from_millis(40))
                .with_poll_interval(Duration::from_millis(5)),
        ),
    );
    let vector = CrossChainMintVector::new(SwapId::new([7; 16]), recipient, 1.0);
    let err = impatient
        .send_mint_vector(
            &bridge.consuls()[0],
            Round(1),
            bridge.subscription_id(),
            vector,
            &bridge.delivery_to(recipient).unwrap(),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{err}");
    let signature = match err {
        ExecutorError::ConfirmationTimeout { signature, .. } => signature,
        other => panic!("expected timeout, got {other}"),
    };

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(matches!(
        impatient.executor().query_status(&signature).await.unwrap(),
        TransactionStatus::Confirmed { .. }
    ));
    assert_eq!(ledger.token_balance(&recipient).unwrap(), 100_000_000);
}

#[tokio::test]
async fn test_transport_failure_is_retryable() {
    let bridge = common::bridge(32).await;
    let owner = bridge.ledger().new_keypair();
    let recipient = bridge.create_recipient(&owner.pubkey()).unwrap();
    let vector = CrossChainMintVector::new(SwapId::new([8; 16]), recipient, 1.0);

    bridge.ledger().set_offline(true);
    let err = bridge.attach(0, Round(1), vector).await.unwrap_err();
    assert!(err.is_retryable(), "{err}");

    bridge.ledger().set_offline(false);
    bridge.attach(0, Round(1), vector).await.unwrap();
    assert_eq!(bridge.ledger().token_balance(&recipient).unwrap(), 100_000_000);
}
