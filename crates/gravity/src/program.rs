//! The registry program.

use crate::state::{GravityState, MultisigState, StateError};
use solanoid_codec::{GravityInstruction, InstructionData};
use solanoid_core::{
    InvokeContext, Program, ProgramAction, ProgramError, ProgramEvent, ProtocolError,
};
use solanoid_types::{ConsulSet, Pubkey, Round};
use tracing::{debug, info, warn};

/// Largest consul set a registry account can hold.
pub const MAX_CONSULS: usize = 16;

const STATE: usize = 0;
const MULTISIG: usize = 1;
const CALLER: usize = 2;

impl From<StateError> for ProgramError {
    fn from(e: StateError) -> Self {
        ProgramError::InvalidAccountData(e.to_string())
    }
}

/// Gravity registry program.
///
/// Accounts: `[state(w), multisig(w), caller(s), ...consul signers(s), ..]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GravityProgram;

impl Program for GravityProgram {
    fn name(&self) -> &'static str {
        "gravity"
    }

    fn process(
        &self,
        ctx: &mut InvokeContext,
        data: &[u8],
    ) -> Result<Vec<ProgramAction>, ProgramError> {
        let instruction = GravityInstruction::decode(data)?;
        debug!(instruction = %instruction.describe(), "Gravity processing");
        let state = GravityState::unpack(ctx.data(STATE)?)?;

        let result = match instruction {
            GravityInstruction::Init {
                bft,
                init_round,
                consuls,
            } => self.init(ctx, state, bft, init_round, consuls),
            GravityInstruction::UpdateConsuls {
                bft,
                last_round,
                consuls,
            } => self.update_consuls(ctx, state, bft, last_round, consuls),
        };
        if let Err(e) = &result {
            warn!(error = %e, "Gravity instruction rejected");
        }
        result
    }
}

impl GravityProgram {
    fn init(
        &self,
        ctx: &mut InvokeContext,
        state: GravityState,
        bft: u8,
        init_round: Round,
        consuls: Vec<Pubkey>,
    ) -> Result<Vec<ProgramAction>, ProgramError> {
        if state.is_initialized() {
            return Err(ProtocolError::AlreadyInitialized.into());
        }
        ctx.require_signer(CALLER)?;
        let set = validated_set(bft, init_round, consuls)?;

        store(ctx, &set)?;
        info!(bft, round = init_round.0, consuls = set.len(), "Gravity initialized");
        Ok(vec![ProgramAction::Emit(ProgramEvent::GravityInitialized {
            bft,
            round: init_round,
            consuls: set.consuls().to_vec(),
        })])
    }

    /// Order of checks: initialized, round, quorum of the current set, then
    /// validity of the new set.
    fn update_consuls(
        &self,
        ctx: &mut InvokeContext,
        state: GravityState,
        bft: u8,
        last_round: Round,
        consuls: Vec<Pubkey>,
    ) -> Result<Vec<ProgramAction>, ProgramError> {
        let GravityState::Active(current) = state else {
            return Err(ProtocolError::NotInitialized.into());
        };
        if !last_round.is_after(Some(current.round())) {
            debug!(
                current = current.round().0,
                requested = last_round.0,
                "Rejecting stale consul update"
            );
            return Err(ProtocolError::StaleRound.into());
        }
        let signers = current.count_signers(ctx.signers());
        if signers < current.bft() as usize {
            debug!(signers, bft = current.bft(), "Consul update lacks quorum");
            return Err(ProtocolError::QuorumNotReached.into());
        }
        let next = validated_set(bft, last_round, consuls)?;

        store(ctx, &next)?;
        info!(
            round = last_round.0,
            bft,
            consuls = next.len(),
            signers,
            "Consul set rotated"
        );
        Ok(vec![ProgramAction::Emit(ProgramEvent::ConsulsUpdated {
            bft,
            round: last_round,
            consuls: next.consuls().to_vec(),
            signers,
        })])
    }
}

/// Build a consul set for storage, rejecting anything an account cannot
/// hold or `ConsulSet::new` refuses with `InvalidConsulSet`.
pub fn validated_set(bft: u8, round: Round, consuls: Vec<Pubkey>) -> Result<ConsulSet, ProgramError> {
    if consuls.len() > MAX_CONSULS {
        return Err(ProtocolError::InvalidConsulSet.into());
    }
    ConsulSet::new(bft, round, consuls).map_err(|e| {
        debug!(error = %e, "Invalid consul set");
        ProgramError::from(ProtocolError::InvalidConsulSet)
    })
}

fn store(ctx: &mut InvokeContext, set: &ConsulSet) -> Result<(), ProgramError> {
    ctx.write_data(STATE, &GravityState::Active(set.clone()).pack())?;
    ctx.write_data(MULTISIG, &MultisigState::from_consuls(set).pack())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solanoid_core::KeyedAccount;
    use solanoid_test_helpers::ConsulFixture;
    use solanoid_types::{Account, Keypair};
    use tracing_test::traced_test;

    const PROGRAM: Pubkey = Pubkey::new([0xaa; 32]);

    /// Ledger-side account storage for driving the program directly.
    struct Harness {
        state: Account,
        multisig: Account,
        caller: Keypair,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                state: Account::new(0, GravityState::LEN, PROGRAM),
                multisig: Account::new(0, MultisigState::LEN, PROGRAM),
                caller: Keypair::from_seed(&[0xcc; 32]),
            }
        }

        fn run(&mut self, ix: GravityInstruction, signers: &[Keypair]) -> Result<Vec<ProgramAction>, ProgramError> {
            let mut accounts = vec![
                KeyedAccount::new(Pubkey::new([1; 32]), false, true, self.state.clone()),
                KeyedAccount::new(Pubkey::new([2; 32]), false, true, self.multisig.clone()),
                KeyedAccount::new(self.caller.pubkey(), true, true, Account::default()),
            ];
            for kp in signers {
                accounts.push(KeyedAccount::new(kp.pubkey(), true, false, Account::default()));
            }
            let mut ctx = InvokeContext::new(PROGRAM, None, accounts);
            let actions = GravityProgram.process(&mut ctx, &ix.encode())?;
            let accounts = ctx.into_accounts();
            self.state = accounts[0].account.clone();
            self.multisig = accounts[1].account.clone();
            Ok(actions)
        }

        fn state(&self) -> GravityState {
            GravityState::unpack(&self.state.data).unwrap()
        }
    }

    fn init(consuls: &ConsulFixture, bft: u8, round: u64) -> GravityInstruction {
        GravityInstruction::Init {
            bft,
            init_round: Round(round),
            consuls: consuls.pubkeys(),
        }
    }

    fn update(consuls: &ConsulFixture, bft: u8, round: u64) -> GravityInstruction {
        GravityInstruction::UpdateConsuls {
            bft,
            last_round: Round(round),
            consuls: consuls.pubkeys(),
        }
    }

    fn protocol(result: Result<Vec<ProgramAction>, ProgramError>) -> ProtocolError {
        match result {
            Err(ProgramError::Protocol(e)) => e,
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    #[traced_test]
    fn test_update_before_init_fails() {
        let consuls = ConsulFixture::generate(3, 1);
        let mut h = Harness::new();
        assert_eq!(
            protocol(h.run(update(&consuls, 3, 10), consuls.keypairs())),
            ProtocolError::NotInitialized
        );
        assert_eq!(h.state(), GravityState::Uninitialized);
    }

    #[test]
    fn test_init_then_rotate() {
        let consuls = ConsulFixture::generate(3, 1);
        let next = ConsulFixture::generate(4, 2);
        let mut h = Harness::new();

        h.run(init(&consuls, 3, 1), &[]).unwrap();
        assert_eq!(h.state().consul_set().map(|s| s.round()), Some(Round(1)));

        let actions = h.run(update(&next, 2, 10), consuls.keypairs()).unwrap();
        let set = h.state().consul_set().cloned().unwrap();
        assert_eq!(set.round(), Round(10));
        assert_eq!(set.consuls(), &next.pubkeys()[..]);
        assert!(matches!(
            actions.as_slice(),
            [ProgramAction::Emit(ProgramEvent::ConsulsUpdated { signers: 3, .. })]
        ));

        let mirror = MultisigState::unpack(&h.multisig.data).unwrap().unwrap();
        assert_eq!(mirror.threshold, 2);
        assert_eq!(mirror.signers, next.pubkeys());
    }

    #[test]
    fn test_double_init_fails() {
        let consuls = ConsulFixture::generate(3, 1);
        let mut h = Harness::new();
        h.run(init(&consuls, 2, 0), &[]).unwrap();
        assert_eq!(
            protocol(h.run(init(&consuls, 2, 0), &[])),
            ProtocolError::AlreadyInitialized
        );
    }

    #[test]
    fn test_equal_or_lower_round_is_stale() {
        let consuls = ConsulFixture::generate(3, 1);
        let mut h = Harness::new();
        h.run(init(&consuls, 3, 5), &[]).unwrap();

        for round in [0, 4, 5] {
            assert_eq!(
                protocol(h.run(update(&consuls, 3, round), consuls.keypairs())),
                ProtocolError::StaleRound
            );
        }
        h.run(update(&consuls, 3, 6), consuls.keypairs()).unwrap();
    }

    #[test]
    fn test_quorum_boundary() {
        let consuls = ConsulFixture::generate(5, 1);
        let mut h = Harness::new();
        h.run(init(&consuls, 3, 0), &[]).unwrap();

        // f - 1 distinct consuls
        assert_eq!(
            protocol(h.run(update(&consuls, 3, 1), &consuls.keypairs()[..2])),
            ProtocolError::QuorumNotReached
        );
        // exactly f
        h.run(update(&consuls, 3, 1), &consuls.keypairs()[..3]).unwrap();
    }

    #[test]
    fn test_outsiders_do_not_count() {
        let consuls = ConsulFixture::generate(3, 1);
        let outsiders = ConsulFixture::generate(3, 9);
        let mut h = Harness::new();
        h.run(init(&consuls, 2, 0), &[]).unwrap();

        let mut signers = outsiders.keypairs().to_vec();
        signers.push(consuls.keypairs()[0].clone());
        assert_eq!(
            protocol(h.run(update(&consuls, 2, 1), &signers)),
            ProtocolError::QuorumNotReached
        );
    }

    #[test]
    fn test_invalid_new_set_rejected_after_quorum() {
        let consuls = ConsulFixture::generate(3, 1);
        let mut h = Harness::new();
        h.run(init(&consuls, 3, 0), &[]).unwrap();

        let mut doubled = consuls.pubkeys();
        doubled.extend(consuls.pubkeys());
        let ix = GravityInstruction::UpdateConsuls {
            bft: 3,
            last_round: Round(1),
            consuls: doubled,
        };
        assert_eq!(
            protocol(h.run(ix, consuls.keypairs())),
            ProtocolError::InvalidConsulSet
        );
        assert_eq!(
            protocol(h.run(update(&consuls, 0, 1), consuls.keypairs())),
            ProtocolError::InvalidConsulSet
        );
        // state untouched
        assert_eq!(h.state().consul_set().map(|s| s.round()), Some(Round(0)));
    }

    #[test]
    fn test_init_requires_valid_set() {
        let consuls = ConsulFixture::generate(2, 1);
        let mut h = Harness::new();
        assert_eq!(
            protocol(h.run(init(&consuls, 3, 0), &[])),
            ProtocolError::InvalidConsulSet
        );
        assert!(matches!(
            h.run(GravityInstruction::Init { bft: 1, init_round: Round(0), consuls: vec![] }, &[]),
            Err(ProgramError::Protocol(ProtocolError::InvalidConsulSet))
        ));
    }
}
