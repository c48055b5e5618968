//! The hub program.
//!
//! Accounts for every instruction start with
//! `[state(w), multisig(w), caller(s), ...additional signers(s)]`, followed by
//! the instruction's own accounts and a trailing account that is the bound
//! Gravity state (`UpdateOracles` reads it; other instructions ignore it).
//!
//! `SendValueToSubs` expects its own accounts as
//! `[subscriber program, subscriber state(w), ...forwarded]`; the forwarded
//! accounts are passed to the subscriber's attach entrypoint unchanged.

use crate::state::{NebulaState, Pulse, Subscription};
use solanoid_codec::{
    attach_value_data, InstructionData, NebulaInstruction, NEBULA_AUTHORITY_SEED,
    PORT_AUTHORITY_SEED,
};
use solanoid_core::{
    Instruction, InvokeContext, Program, ProgramAction, ProgramError, ProgramEvent, ProtocolError,
};
use solanoid_gravity::{validated_set, GravityState, MultisigState};
use solanoid_types::{
    find_program_address, AccountMeta, ConsulSet, DataType, Hash, PdaError, Pubkey, Round,
    SubscriptionId,
};
use tracing::{debug, info, warn};

const STATE: usize = 0;
const MULTISIG: usize = 1;
const CALLER: usize = 2;

/// The hub's authority PDA and its bump. It signs every value delivery.
pub fn nebula_authority(program_id: &Pubkey) -> Result<(Pubkey, u8), PdaError> {
    find_program_address(&[NEBULA_AUTHORITY_SEED], program_id)
}

fn pda_error(e: PdaError) -> ProgramError {
    ProgramError::InvalidAccountData(e.to_string())
}

/// Nebula data hub program.
#[derive(Debug, Default, Clone, Copy)]
pub struct NebulaProgram;

impl Program for NebulaProgram {
    fn name(&self) -> &'static str {
        "nebula"
    }

    fn process(
        &self,
        ctx: &mut InvokeContext,
        data: &[u8],
    ) -> Result<Vec<ProgramAction>, ProgramError> {
        let instruction = NebulaInstruction::decode(data)?;
        let description = instruction.describe();
        debug!(instruction = %description, "Nebula processing");
        let state = NebulaState::unpack(ctx.data(STATE)?)?;

        let result = match (instruction, state) {
            (
                NebulaInstruction::Init {
                    bft,
                    data_type,
                    gravity_state,
                    oracles,
                },
                state,
            ) => {
                if state.is_some() {
                    Err(ProtocolError::AlreadyInitialized.into())
                } else {
                    init(ctx, bft, data_type, gravity_state, oracles)
                }
            }
            (_, None) => Err(ProtocolError::NotInitialized.into()),
            (
                NebulaInstruction::UpdateOracles {
                    bft,
                    new_round,
                    oracles,
                },
                Some(state),
            ) => update_oracles(ctx, state, bft, new_round, oracles),
            (NebulaInstruction::SendHashValue { round, data_hash }, Some(state)) => {
                send_hash_value(ctx, state, round, data_hash)
            }
            (
                NebulaInstruction::SendValueToSubs {
                    data_type,
                    round,
                    subscription_id,
                    value,
                },
                Some(state),
            ) => send_value_to_subs(ctx, state, data_type, round, subscription_id, value),
            (
                NebulaInstruction::Subscribe {
                    subscriber,
                    min_confirmations,
                    queue_size,
                    subscription_id,
                },
                Some(state),
            ) => subscribe(
                ctx,
                state,
                Subscription {
                    id: subscription_id,
                    subscriber,
                    min_confirmations,
                    queue_size,
                    last_round: None,
                },
            ),
        };
        if let Err(e) = &result {
            warn!(instruction = %description, error = %e, "Nebula instruction rejected");
        }
        result
    }
}

fn init(
    ctx: &mut InvokeContext,
    bft: u8,
    data_type: DataType,
    gravity_state: Pubkey,
    oracles: Vec<Pubkey>,
) -> Result<Vec<ProgramAction>, ProgramError> {
    ctx.require_signer(CALLER)?;
    let oracles = validated_set(bft, Round::ZERO, oracles)?;
    let state = NebulaState::new(data_type, gravity_state, oracles);
    store(ctx, &state, true)?;

    info!(bft, ?data_type, %gravity_state, oracles = state.oracles.len(), "Nebula initialized");
    Ok(vec![ProgramAction::Emit(ProgramEvent::NebulaInitialized {
        bft,
        gravity_state,
    })])
}

/// Rotate the hub's oracles under a quorum of the bound registry's consuls.
fn update_oracles(
    ctx: &mut InvokeContext,
    mut state: NebulaState,
    bft: u8,
    new_round: Round,
    oracles: Vec<Pubkey>,
) -> Result<Vec<ProgramAction>, ProgramError> {
    if !new_round.is_after(Some(state.oracles.round())) {
        return Err(ProtocolError::StaleRound.into());
    }

    let gravity_index = ctx
        .accounts()
        .len()
        .checked_sub(1)
        .ok_or(ProgramError::NotEnoughAccountKeys)?;
    let gravity = ctx.account(gravity_index)?;
    if gravity.key != state.gravity_state {
        debug!(expected = %state.gravity_state, got = %gravity.key, "Wrong gravity state account");
        return Err(ProtocolError::AccountMismatch.into());
    }
    let consuls = match GravityState::unpack(&gravity.account.data)? {
        GravityState::Active(set) => set,
        GravityState::Uninitialized => return Err(ProtocolError::NotInitialized.into()),
    };
    let signers = consuls.count_signers(ctx.signers());
    if signers < consuls.bft() as usize {
        debug!(signers, bft = consuls.bft(), "Oracle update lacks consul quorum");
        return Err(ProtocolError::QuorumNotReached.into());
    }

    state.oracles = validated_set(bft, new_round, oracles)?;
    store(ctx, &state, true)?;

    info!(round = new_round.0, bft, oracles = state.oracles.len(), "Nebula oracles rotated");
    Ok(vec![ProgramAction::Emit(ProgramEvent::OraclesUpdated {
        bft,
        round: new_round,
        oracles: state.oracles.consuls().to_vec(),
    })])
}

fn send_hash_value(
    ctx: &mut InvokeContext,
    mut state: NebulaState,
    round: Round,
    data_hash: Hash,
) -> Result<Vec<ProgramAction>, ProgramError> {
    require_oracle(ctx, &state.oracles)?;
    if !round.is_after(state.last_pulse.map(|p| p.round)) {
        return Err(ProtocolError::StaleRound.into());
    }
    state.last_pulse = Some(Pulse { round, data_hash });
    state.pulse_count = state.pulse_count.saturating_add(1);
    store(ctx, &state, false)?;

    debug!(round = round.0, %data_hash, "Pulse recorded");
    Ok(vec![ProgramAction::Emit(ProgramEvent::PulseRecorded {
        round,
        data_hash,
    })])
}

/// Record the round for the subscription, then deliver `value` to the
/// subscriber's attach entrypoint as a nested call signed by the hub's
/// authority. Both land in the same transaction or neither does.
fn send_value_to_subs(
    ctx: &mut InvokeContext,
    mut state: NebulaState,
    data_type: DataType,
    round: Round,
    subscription_id: SubscriptionId,
    value: Vec<u8>,
) -> Result<Vec<ProgramAction>, ProgramError> {
    let oracle = require_oracle(ctx, &state.oracles)?;
    if data_type != state.data_type {
        return Err(ProtocolError::DataTypeMismatch.into());
    }

    let start = first_meta(ctx);
    let end = ctx.accounts().len().saturating_sub(1);
    if end < start + 2 {
        return Err(ProgramError::NotEnoughAccountKeys);
    }
    let subscriber_program = ctx.key(start)?;
    let subscriber_state = ctx.key(start + 1)?;
    let forwarded: Vec<AccountMeta> = ctx.accounts()[start + 2..end]
        .iter()
        .map(|a| AccountMeta {
            pubkey: a.key,
            is_signer: false,
            is_writable: a.is_writable,
        })
        .collect();

    let subscription = state
        .subscription_mut(&subscription_id)
        .ok_or(ProtocolError::UnknownSubscription)?;
    if !round.is_after(subscription.last_round) {
        debug!(
            subscription = %subscription_id,
            last = ?subscription.last_round,
            requested = round.0,
            "Rejecting stale attestation"
        );
        return Err(ProtocolError::StaleRound.into());
    }
    let (port_authority, _) =
        find_program_address(&[PORT_AUTHORITY_SEED], &subscriber_program).map_err(pda_error)?;
    if subscription.subscriber != port_authority {
        debug!(
            subscription = %subscription_id,
            subscriber = %subscription.subscriber,
            program = %subscriber_program,
            "Subscriber does not belong to the target program"
        );
        return Err(ProtocolError::InvalidSubscriber.into());
    }
    subscription.last_round = Some(round);
    store(ctx, &state, false)?;

    let (authority, bump) = nebula_authority(&ctx.program_id()).map_err(pda_error)?;
    let mut accounts = Vec::with_capacity(2 + forwarded.len());
    accounts.push(AccountMeta::new(subscriber_state, false));
    accounts.push(AccountMeta::new_readonly(authority, true));
    accounts.extend(forwarded);
    let delivery = Instruction::new_with_bytes(subscriber_program, attach_value_data(&value), accounts);

    info!(
        subscription = %subscription_id,
        round = round.0,
        %oracle,
        subscriber = %subscriber_program,
        "Delivering value to subscriber"
    );
    Ok(vec![
        ProgramAction::invoke_signed(delivery, &[NEBULA_AUTHORITY_SEED, &[bump]]),
        ProgramAction::Emit(ProgramEvent::ValueDelivered {
            subscription_id,
            round,
            subscriber_program,
        }),
    ])
}

fn subscribe(
    ctx: &mut InvokeContext,
    mut state: NebulaState,
    subscription: Subscription,
) -> Result<Vec<ProgramAction>, ProgramError> {
    ctx.require_signer(CALLER)?;
    if state.subscription(&subscription.id).is_some() {
        return Err(ProtocolError::DuplicateSubscription.into());
    }
    let event = ProgramEvent::Subscribed {
        subscription_id: subscription.id,
        subscriber: subscription.subscriber,
    };
    info!(
        subscription = %subscription.id,
        subscriber = %subscription.subscriber,
        queue_size = subscription.queue_size,
        "Subscription registered"
    );
    state.subscriptions.push(subscription);
    store(ctx, &state, false)?;
    Ok(vec![ProgramAction::Emit(event)])
}

/// Some signer of the call must be a current oracle.
fn require_oracle(ctx: &InvokeContext, oracles: &ConsulSet) -> Result<Pubkey, ProgramError> {
    ctx.signers()
        .find(|key| oracles.contains(key))
        .copied()
        .ok_or_else(|| ProgramError::from(ProtocolError::UnauthorizedCaller))
}

/// Index of the first account after the signer block.
fn first_meta(ctx: &InvokeContext) -> usize {
    let accounts = ctx.accounts();
    (CALLER + 1..accounts.len())
        .find(|&i| !accounts[i].is_signer)
        .unwrap_or(accounts.len())
}

fn store(ctx: &mut InvokeContext, state: &NebulaState, mirror: bool) -> Result<(), ProgramError> {
    ctx.write_data(STATE, &state.pack())?;
    if mirror {
        ctx.write_data(MULTISIG, &MultisigState::from_consuls(&state.oracles).pack())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solanoid_core::KeyedAccount;
    use solanoid_test_helpers::{subscription_id, test_rng, ConsulFixture};
    use solanoid_types::Account;
    use tracing_test::traced_test;

    const PROGRAM: Pubkey = Pubkey::new([0xbb; 32]);
    const GRAVITY_PROGRAM: Pubkey = Pubkey::new([0xaa; 32]);
    const GRAVITY_STATE: Pubkey = Pubkey::new([0x61; 32]);
    const PORT_PROGRAM: Pubkey = Pubkey::new([0xcc; 32]);
    const PORT_STATE: Pubkey = Pubkey::new([0x63; 32]);

    struct Harness {
        state: Account,
        multisig: Account,
        gravity: (Pubkey, Account),
        deployer: Pubkey,
        oracles: ConsulFixture,
        consuls: ConsulFixture,
    }

    impl Harness {
        fn new(max_subscriptions: usize) -> Self {
            let consuls = ConsulFixture::generate(3, 1);
            let set = ConsulSet::new(3, Round(1), consuls.pubkeys()).unwrap();
            let mut gravity = Account::new(0, GravityState::LEN, GRAVITY_PROGRAM);
            gravity.data = GravityState::Active(set).pack();
            Self {
                state: Account::new(0, NebulaState::space(max_subscriptions), PROGRAM),
                multisig: Account::new(0, MultisigState::LEN, PROGRAM),
                gravity: (GRAVITY_STATE, gravity),
                deployer: Pubkey::new([0xdd; 32]),
                oracles: ConsulFixture::generate(3, 2),
                consuls,
            }
        }

        fn run(
            &mut self,
            ix: NebulaInstruction,
            primary: Pubkey,
            signers: &[Pubkey],
            metas: Vec<KeyedAccount>,
        ) -> Result<Vec<ProgramAction>, ProgramError> {
            let mut accounts = vec![
                KeyedAccount::new(Pubkey::new([1; 32]), false, true, self.state.clone()),
                KeyedAccount::new(Pubkey::new([2; 32]), false, true, self.multisig.clone()),
                KeyedAccount::new(primary, true, true, Account::default()),
            ];
            accounts.extend(
                signers
                    .iter()
                    .map(|k| KeyedAccount::new(*k, true, false, Account::default())),
            );
            accounts.extend(metas);
            accounts.push(KeyedAccount::new(self.gravity.0, false, false, self.gravity.1.clone()));

            let mut ctx = InvokeContext::new(PROGRAM, None, accounts);
            let actions = NebulaProgram.process(&mut ctx, &ix.encode())?;
            let accounts = ctx.into_accounts();
            self.state = accounts[0].account.clone();
            self.multisig = accounts[1].account.clone();
            Ok(actions)
        }

        fn init(&mut self) {
            let ix = NebulaInstruction::Init {
                bft: 2,
                data_type: DataType::Bytes,
                gravity_state: GRAVITY_STATE,
                oracles: self.oracles.pubkeys(),
            };
            self.run(ix, self.deployer, &[], vec![]).unwrap();
        }

        fn subscribe(&mut self, id: SubscriptionId, subscriber: Pubkey) -> Result<Vec<ProgramAction>, ProgramError> {
            let ix = NebulaInstruction::Subscribe {
                subscriber,
                min_confirmations: 1,
                queue_size: 1,
                subscription_id: id,
            };
            self.run(ix, self.deployer, &[], vec![])
        }

        fn send_value(&mut self, id: SubscriptionId, round: u64, caller: Pubkey) -> Result<Vec<ProgramAction>, ProgramError> {
            let ix = NebulaInstruction::SendValueToSubs {
                data_type: DataType::Bytes,
                round: Round(round),
                subscription_id: id,
                value: vec![0x42; 56],
            };
            self.run(ix, caller, &[], delivery_metas())
        }

        fn state(&self) -> NebulaState {
            NebulaState::unpack(&self.state.data).unwrap().unwrap()
        }
    }

    fn port_authority() -> Pubkey {
        find_program_address(&[PORT_AUTHORITY_SEED], &PORT_PROGRAM).unwrap().0
    }

    fn delivery_metas() -> Vec<KeyedAccount> {
        vec![
            KeyedAccount::new(PORT_PROGRAM, false, false, Account::default()),
            KeyedAccount::new(PORT_STATE, false, true, Account::default()),
            KeyedAccount::new(Pubkey::new([0x71; 32]), false, false, Account::default()),
            KeyedAccount::new(Pubkey::new([0x72; 32]), false, true, Account::default()),
        ]
    }

    fn protocol(result: Result<Vec<ProgramAction>, ProgramError>) -> ProtocolError {
        match result {
            Err(ProgramError::Protocol(e)) => e,
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_instructions_before_init_fail() {
        let mut h = Harness::new(4);
        let id = subscription_id(&mut test_rng(0));
        assert_eq!(
            protocol(h.subscribe(id, port_authority())),
            ProtocolError::NotInitialized
        );
        h.init();
        let ix = NebulaInstruction::Init {
            bft: 1,
            data_type: DataType::Int64,
            gravity_state: GRAVITY_STATE,
            oracles: h.oracles.pubkeys(),
        };
        assert_eq!(
            protocol(h.run(ix, h.deployer, &[], vec![])),
            ProtocolError::AlreadyInitialized
        );
    }

    #[test]
    fn test_init_mirrors_oracles() {
        let mut h = Harness::new(4);
        h.init();
        let mirror = MultisigState::unpack(&h.multisig.data).unwrap().unwrap();
        assert_eq!(mirror.threshold, 2);
        assert_eq!(mirror.signers, h.oracles.pubkeys());
        assert_eq!(h.state().gravity_state, GRAVITY_STATE);
    }

    #[test]
    #[traced_test]
    fn test_duplicate_subscription_rejected() {
        let mut h = Harness::new(4);
        h.init();
        let id = subscription_id(&mut test_rng(0));
        h.subscribe(id, port_authority()).unwrap();
        // same id, different subscriber
        assert_eq!(
            protocol(h.subscribe(id, Pubkey::new([9; 32]))),
            ProtocolError::DuplicateSubscription
        );
        h.subscribe(subscription_id(&mut test_rng(1)), port_authority()).unwrap();
        assert_eq!(h.state().subscriptions.len(), 2);
    }

    #[test]
    fn test_subscription_table_capacity() {
        let mut h = Harness::new(1);
        h.init();
        let mut rng = test_rng(0);
        h.subscribe(subscription_id(&mut rng), port_authority()).unwrap();
        assert!(matches!(
            h.subscribe(subscription_id(&mut rng), port_authority()),
            Err(ProgramError::AccountDataTooSmall { .. })
        ));
    }

    #[test]
    fn test_delivery_invokes_subscriber() {
        let mut h = Harness::new(4);
        h.init();
        let id = subscription_id(&mut test_rng(0));
        h.subscribe(id, port_authority()).unwrap();

        let oracle = h.oracles.pubkeys()[1];
        let actions = h.send_value(id, 1, oracle).unwrap();
        let (authority, bump) = nebula_authority(&PROGRAM).unwrap();
        match &actions[..] {
            [ProgramAction::Invoke {
                instruction,
                signer_seeds,
            }, ProgramAction::Emit(ProgramEvent::ValueDelivered { round, .. })] => {
                assert_eq!(instruction.program_id, PORT_PROGRAM);
                assert_eq!(instruction.data[0], solanoid_codec::ATTACH_VALUE_TAG);
                assert_eq!(&instruction.data[1..], &[0x42; 56][..]);
                assert_eq!(instruction.accounts[0], AccountMeta::new(PORT_STATE, false));
                assert_eq!(instruction.accounts[1], AccountMeta::new_readonly(authority, true));
                assert_eq!(instruction.accounts.len(), 4);
                assert!(instruction.accounts[3].is_writable);
                assert_eq!(signer_seeds, &vec![NEBULA_AUTHORITY_SEED.to_vec(), vec![bump]]);
                assert_eq!(*round, Round(1));
            }
            other => panic!("unexpected actions {other:?}"),
        }
        assert_eq!(h.state().subscription(&id).unwrap().last_round, Some(Round(1)));
    }

    #[test]
    fn test_delivery_rounds_strictly_increase_per_subscription() {
        let mut h = Harness::new(4);
        h.init();
        let mut rng = test_rng(0);
        let (a, b) = (subscription_id(&mut rng), subscription_id(&mut rng));
        h.subscribe(a, port_authority()).unwrap();
        h.subscribe(b, port_authority()).unwrap();
        let oracle = h.oracles.pubkeys()[0];

        h.send_value(a, 0, oracle).unwrap();
        assert_eq!(protocol(h.send_value(a, 0, oracle)), ProtocolError::StaleRound);
        h.send_value(a, 5, oracle).unwrap();
        assert_eq!(protocol(h.send_value(a, 4, oracle)), ProtocolError::StaleRound);
        // independent stream
        h.send_value(b, 1, oracle).unwrap();
    }

    #[test]
    fn test_delivery_rejections() {
        let mut h = Harness::new(4);
        h.init();
        let mut rng = test_rng(0);
        let id = subscription_id(&mut rng);
        let oracle = h.oracles.pubkeys()[0];

        assert_eq!(
            protocol(h.send_value(id, 1, oracle)),
            ProtocolError::UnknownSubscription
        );
        h.subscribe(id, port_authority()).unwrap();
        assert_eq!(
            protocol(h.send_value(id, 1, h.deployer)),
            ProtocolError::UnauthorizedCaller
        );

        let wrong_type = NebulaInstruction::SendValueToSubs {
            data_type: DataType::Int64,
            round: Round(1),
            subscription_id: id,
            value: vec![],
        };
        assert_eq!(
            protocol(h.run(wrong_type, oracle, &[], delivery_metas())),
            ProtocolError::DataTypeMismatch
        );

        let foreign = subscription_id(&mut rng);
        h.subscribe(foreign, Pubkey::new([0x99; 32])).unwrap();
        assert_eq!(
            protocol(h.send_value(foreign, 1, oracle)),
            ProtocolError::InvalidSubscriber
        );
        // rejected deliveries record nothing
        assert_eq!(h.state().subscription(&id).unwrap().last_round, None);
    }

    #[test]
    fn test_pulses() {
        let mut h = Harness::new(0);
        h.init();
        let oracle = h.oracles.pubkeys()[2];
        let pulse = |round| NebulaInstruction::SendHashValue {
            round: Round(round),
            data_hash: Hash::hash(b"value"),
        };

        h.run(pulse(3), oracle, &[], vec![]).unwrap();
        assert_eq!(
            protocol(h.run(pulse(3), oracle, &[], vec![])),
            ProtocolError::StaleRound
        );
        assert_eq!(
            protocol(h.run(pulse(4), h.deployer, &[], vec![])),
            ProtocolError::UnauthorizedCaller
        );
        h.run(pulse(4), oracle, &[], vec![]).unwrap();
        let state = h.state();
        assert_eq!(state.pulse_count, 2);
        assert_eq!(state.last_pulse.map(|p| p.round), Some(Round(4)));
    }

    #[test]
    fn test_update_oracles_needs_gravity_quorum() {
        let mut h = Harness::new(0);
        h.init();
        let next = ConsulFixture::generate(4, 3);
        let update = |round| NebulaInstruction::UpdateOracles {
            bft: 3,
            new_round: Round(round),
            oracles: next.pubkeys(),
        };
        let consuls = h.consuls.pubkeys();
        let oracles = h.oracles.pubkeys();

        // hub oracles are not gravity consuls
        assert_eq!(
            protocol(h.run(update(1), h.deployer, &oracles, vec![])),
            ProtocolError::QuorumNotReached
        );
        assert_eq!(
            protocol(h.run(update(1), h.deployer, &consuls[..2], vec![])),
            ProtocolError::QuorumNotReached
        );
        assert_eq!(
            protocol(h.run(update(0), h.deployer, &consuls, vec![])),
            ProtocolError::StaleRound
        );

        h.run(update(1), h.deployer, &consuls, vec![]).unwrap();
        let state = h.state();
        assert_eq!(state.oracles.round(), Round(1));
        assert_eq!(state.oracles.consuls(), &next.pubkeys()[..]);
        let mirror = MultisigState::unpack(&h.multisig.data).unwrap().unwrap();
        assert_eq!(mirror.signers, next.pubkeys());
    }

    #[test]
    fn test_update_oracles_rejects_unbound_registry() {
        let mut h = Harness::new(0);
        h.init();
        h.gravity.0 = Pubkey::new([0x62; 32]);
        let ix = NebulaInstruction::UpdateOracles {
            bft: 1,
            new_round: Round(1),
            oracles: vec![Pubkey::new([5; 32])],
        };
        let consuls = h.consuls.pubkeys();
        assert_eq!(
            protocol(h.run(ix, h.deployer, &consuls, vec![])),
            ProtocolError::AccountMismatch
        );
    }
}
