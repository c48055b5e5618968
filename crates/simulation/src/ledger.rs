//! The in-memory ledger.

use crate::runtime::{Accounts, Runtime};
use crate::token::{TokenProgram, TOKEN_PROGRAM_ID};
use crate::{SimConfig, SimError};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use solanoid_codec::{AuthorityType, Mint, TokenAccount, TokenInstruction};
use solanoid_core::{Instruction, Program, ProgramEvent};
use solanoid_executor::{
    Ledger, SubmitError, Transaction, TransactionFailure, TransactionStatus, TransportError,
};
use solanoid_types::{Account, AccountMeta, Hash, Keypair, Pubkey, Signature};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Owner of deployed program accounts.
pub const LOADER_ID: Pubkey = Pubkey::new([0xff; 32]);

/// Lamports per byte a new data account is funded with, plus a fixed
/// 128-byte account overhead.
const LAMPORTS_PER_BYTE: u64 = 6_960;
const ACCOUNT_OVERHEAD: u64 = 128;

/// Balance a freshly allocated account of `space` bytes receives.
pub fn rent_exempt_minimum(space: usize) -> u64 {
    (ACCOUNT_OVERHEAD + space as u64) * LAMPORTS_PER_BYTE
}

/// A processed transaction.
#[derive(Debug, Clone)]
struct Processed {
    slot: u64,
    result: Result<(), TransactionFailure>,
    visible_at: Instant,
    events: Vec<ProgramEvent>,
}

/// Accounts, blockhashes and processed transactions.
struct Bank {
    accounts: Accounts,
    slot: u64,
    blockhashes: VecDeque<Hash>,
    processed: HashMap<Signature, Processed>,
}

impl Bank {
    fn new(seed: u64) -> Self {
        let genesis = Hash::hashv(&[b"genesis", &seed.to_le_bytes()]);
        Self {
            accounts: Accounts::new(),
            slot: 0,
            blockhashes: VecDeque::from([genesis]),
            processed: HashMap::new(),
        }
    }

    fn latest_blockhash(&self) -> Hash {
        self.blockhashes.back().copied().unwrap_or(Hash::ZERO)
    }

    /// Close the current slot and start a new one with a fresh blockhash.
    fn advance(&mut self, window: usize) -> u64 {
        self.slot += 1;
        let next = Hash::hashv(&[self.latest_blockhash().as_bytes(), &self.slot.to_le_bytes()]);
        self.blockhashes.push_back(next);
        while self.blockhashes.len() > window.max(1) {
            self.blockhashes.pop_front();
        }
        self.slot
    }

    fn debit(&mut self, key: &Pubkey, lamports: u64) -> Result<(), SimError> {
        let account = self
            .accounts
            .get_mut(key)
            .ok_or(SimError::AccountNotFound(*key))?;
        if account.lamports < lamports {
            return Err(SimError::InsufficientLamports {
                account: *key,
                needed: lamports,
                available: account.lamports,
            });
        }
        account.lamports -= lamports;
        Ok(())
    }
}

/// A single-node ledger held in memory.
///
/// Transactions run one at a time under the bank lock against an
/// [`im`] snapshot of the account store; a transaction's changes are
/// committed only if every instruction succeeds. Each processed transaction
/// closes a slot.
///
/// Every key the ledger generates comes from one seeded RNG, so a run with
/// the same [`SimConfig::seed`] and the same call sequence reproduces the
/// same addresses.
pub struct SimLedger {
    config: SimConfig,
    bank: Mutex<Bank>,
    programs: RwLock<HashMap<Pubkey, Arc<dyn Program>>>,
    rng: Mutex<ChaCha8Rng>,
    offline: AtomicBool,
}

impl SimLedger {
    /// A ledger with the token program deployed at [`TOKEN_PROGRAM_ID`].
    pub fn new(config: SimConfig) -> Self {
        let ledger = Self {
            bank: Mutex::new(Bank::new(config.seed)),
            programs: RwLock::new(HashMap::new()),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(config.seed)),
            offline: AtomicBool::new(false),
            config,
        };
        ledger.deploy_program_at(TOKEN_PROGRAM_ID, Arc::new(TokenProgram));
        ledger
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn slot(&self) -> u64 {
        self.bank.lock().slot
    }

    /// While offline every [`Ledger`] call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("simulated ledger is offline".into()));
        }
        Ok(())
    }

    /// A new keypair from the ledger's RNG.
    pub fn new_keypair(&self) -> Keypair {
        Keypair::generate_with(&mut *self.rng.lock())
    }

    /// A new keypair holding `lamports`.
    pub fn funded_keypair(&self, lamports: u64) -> Keypair {
        let keypair = self.new_keypair();
        self.airdrop(&keypair.pubkey(), lamports);
        keypair
    }

    /// Credit `lamports` to `to`, creating a system account if needed.
    pub fn airdrop(&self, to: &Pubkey, lamports: u64) {
        let mut bank = self.bank.lock();
        let account = bank
            .accounts
            .entry(*to)
            .or_insert_with(|| Account::new(0, 0, Pubkey::ZERO));
        account.lamports = account.lamports.saturating_add(lamports);
    }

    /// Deploy `program` at a fresh address.
    pub fn deploy_program(&self, program: Arc<dyn Program>) -> Pubkey {
        let program_id = self.new_keypair().pubkey();
        self.deploy_program_at(program_id, program);
        program_id
    }

    /// Deploy `program` at `program_id`, replacing whatever was there.
    pub fn deploy_program_at(&self, program_id: Pubkey, program: Arc<dyn Program>) {
        info!(program = program.name(), %program_id, "Deploying program");
        self.bank.lock().accounts.insert(
            program_id,
            Account {
                lamports: 1,
                data: Vec::new(),
                owner: LOADER_ID,
                executable: true,
            },
        );
        self.programs.write().insert(program_id, program);
    }

    /// Create a zeroed data account of `space` bytes owned by `owner`,
    /// funded by `payer`.
    pub fn allocate_account(
        &self,
        payer: &Pubkey,
        space: usize,
        owner: &Pubkey,
    ) -> Result<Pubkey, SimError> {
        let address = self.new_keypair().pubkey();
        let lamports = rent_exempt_minimum(space);
        let mut bank = self.bank.lock();
        bank.debit(payer, lamports)?;
        bank.accounts
            .insert(address, Account::new(lamports, space, *owner));
        debug!(%address, space, %owner, "Allocated account");
        Ok(address)
    }

    /// Current contents of `pubkey`.
    pub fn account(&self, pubkey: &Pubkey) -> Option<Account> {
        self.bank.lock().accounts.get(pubkey).cloned()
    }

    pub fn balance(&self, pubkey: &Pubkey) -> u64 {
        self.account(pubkey).map(|a| a.lamports).unwrap_or(0)
    }

    /// Events logged by a successful transaction.
    pub fn events(&self, signature: &Signature) -> Vec<ProgramEvent> {
        self.bank
            .lock()
            .processed
            .get(signature)
            .map(|p| p.events.clone())
            .unwrap_or_default()
    }

    /// Check, execute and record one transaction.
    pub fn process_transaction(&self, transaction: &Transaction) -> Result<Signature, SubmitError> {
        self.check_online()?;
        let signature = transaction.id();
        let programs = self.programs.read();
        let mut bank = self.bank.lock();

        if bank.processed.contains_key(&signature) {
            return Err(SubmitError::Rejected(TransactionFailure::AlreadyProcessed));
        }
        if !bank
            .blockhashes
            .contains(&transaction.message.recent_blockhash)
        {
            return Err(SubmitError::Rejected(TransactionFailure::BlockhashNotFound));
        }
        if !transaction.verify() {
            return Err(SubmitError::Rejected(TransactionFailure::SignatureFailure));
        }
        let payer = *transaction
            .message
            .payer()
            .ok_or(SubmitError::Rejected(TransactionFailure::AccountNotFound))?;
        let fee = self.config.lamports_per_signature * transaction.signatures.len() as u64;
        match bank.accounts.get(&payer) {
            None => return Err(SubmitError::Rejected(TransactionFailure::AccountNotFound)),
            Some(account) if account.lamports < fee => {
                return Err(SubmitError::Rejected(
                    TransactionFailure::InsufficientFundsForFee,
                ))
            }
            Some(_) => {}
        }
        let instructions = transaction
            .message
            .decompile()
            .map_err(|e| SubmitError::Rejected(TransactionFailure::Other(e.to_string())))?;
        if instructions
            .iter()
            .any(|ix| !programs.contains_key(&ix.program_id))
        {
            return Err(SubmitError::Rejected(
                TransactionFailure::ProgramAccountNotFound,
            ));
        }

        let mut working = bank.accounts.clone();
        let mut runtime = Runtime::new(&programs, self.config.max_invoke_depth);
        let result = instructions
            .iter()
            .enumerate()
            .try_for_each(|(index, ix)| {
                runtime
                    .execute(&mut working, ix)
                    .map_err(|e| TransactionFailure::Instruction {
                        index: index as u8,
                        kind: e.kind(),
                    })
            });

        if let Err(failure) = &result {
            if !self.config.skip_preflight {
                debug!(%signature, %failure, "Preflight rejected transaction");
                return Err(SubmitError::Rejected(failure.clone()));
            }
            warn!(%signature, %failure, "Transaction failed");
        }

        let events = if result.is_ok() {
            bank.accounts = working;
            runtime.into_events()
        } else {
            Vec::new()
        };
        if let Some(account) = bank.accounts.get_mut(&payer) {
            account.lamports = account.lamports.saturating_sub(fee);
        }
        let slot = bank.advance(self.config.blockhash_window);
        debug!(%signature, slot, events = events.len(), "Processed transaction");
        bank.processed.insert(
            signature,
            Processed {
                slot,
                result,
                visible_at: Instant::now() + self.config.confirmation_latency,
                events,
            },
        );
        Ok(signature)
    }

    /// Sign and process `instructions`, failing if the transaction fails.
    /// `payer` pays the fee and signs first.
    pub fn execute(
        &self,
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
    ) -> Result<Signature, SimError> {
        let blockhash = self.bank.lock().latest_blockhash();
        let transaction = Transaction::new_signed(instructions, payer, signers, blockhash)?;
        let signature = self.process_transaction(&transaction)?;
        let failure = self
            .bank
            .lock()
            .processed
            .get(&signature)
            .and_then(|p| p.result.clone().err());
        match failure {
            Some(failure) => Err(SimError::Failed(failure)),
            None => Ok(signature),
        }
    }

    /// Allocate and initialize a mint whose authority is `authority`.
    pub fn create_mint(
        &self,
        payer: &Keypair,
        authority: &Pubkey,
        decimals: u8,
    ) -> Result<Pubkey, SimError> {
        let mint = self.allocate_account(&payer.pubkey(), Mint::LEN, &TOKEN_PROGRAM_ID)?;
        let ix = Instruction::new(
            TOKEN_PROGRAM_ID,
            &TokenInstruction::InitializeMint {
                decimals,
                mint_authority: *authority,
                freeze_authority: None,
            },
            vec![AccountMeta::new(mint, false)],
        );
        self.execute(&[ix], payer, &[])?;
        Ok(mint)
    }

    /// Allocate and initialize a token account of `mint` owned by `owner`.
    pub fn create_token_account(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Pubkey, SimError> {
        let account = self.allocate_account(&payer.pubkey(), TokenAccount::LEN, &TOKEN_PROGRAM_ID)?;
        let ix = Instruction::new(
            TOKEN_PROGRAM_ID,
            &TokenInstruction::InitializeAccount,
            vec![
                AccountMeta::new(account, false),
                AccountMeta::new_readonly(*mint, false),
                AccountMeta::new_readonly(*owner, false),
            ],
        );
        self.execute(&[ix], payer, &[])?;
        Ok(account)
    }

    /// Mint `amount` base units into `destination`, signed by the mint
    /// authority (who also pays).
    pub fn mint_to(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        destination: &Pubkey,
        amount: u64,
    ) -> Result<Signature, SimError> {
        let ix = Instruction::new(
            TOKEN_PROGRAM_ID,
            &TokenInstruction::MintTo { amount },
            vec![
                AccountMeta::new(*mint, false),
                AccountMeta::new(*destination, false),
                AccountMeta::new_readonly(authority.pubkey(), true),
            ],
        );
        self.execute(&[ix], authority, &[])
    }

    /// Let `delegate` move up to `amount` base units out of `source`.
    pub fn approve(
        &self,
        owner: &Keypair,
        source: &Pubkey,
        delegate: &Pubkey,
        amount: u64,
    ) -> Result<Signature, SimError> {
        let ix = Instruction::new(
            TOKEN_PROGRAM_ID,
            &TokenInstruction::Approve { amount },
            vec![
                AccountMeta::new(*source, false),
                AccountMeta::new_readonly(*delegate, false),
                AccountMeta::new_readonly(owner.pubkey(), true),
            ],
        );
        self.execute(&[ix], owner, &[])
    }

    /// Hand the mint authority of `mint` to `new_authority`.
    pub fn set_mint_authority(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        new_authority: Option<Pubkey>,
    ) -> Result<Signature, SimError> {
        let ix = Instruction::new(
            TOKEN_PROGRAM_ID,
            &TokenInstruction::SetAuthority {
                authority_type: AuthorityType::MintTokens,
                new_authority,
            },
            vec![
                AccountMeta::new(*mint, false),
                AccountMeta::new_readonly(authority.pubkey(), true),
            ],
        );
        self.execute(&[ix], authority, &[])
    }

    pub fn mint(&self, mint: &Pubkey) -> Result<Mint, SimError> {
        let account = self.account(mint).ok_or(SimError::AccountNotFound(*mint))?;
        Mint::unpack(&account.data).map_err(|e| SimError::AccountData {
            account: *mint,
            reason: e.to_string(),
        })
    }

    pub fn token_account(&self, pubkey: &Pubkey) -> Result<TokenAccount, SimError> {
        let account = self
            .account(pubkey)
            .ok_or(SimError::AccountNotFound(*pubkey))?;
        TokenAccount::unpack(&account.data).map_err(|e| SimError::AccountData {
            account: *pubkey,
            reason: e.to_string(),
        })
    }

    /// Token balance of `pubkey` in base units.
    pub fn token_balance(&self, pubkey: &Pubkey) -> Result<u64, SimError> {
        Ok(self.token_account(pubkey)?.amount)
    }
}

#[async_trait]
impl Ledger for SimLedger {
    async fn latest_blockhash(&self) -> Result<Hash, TransportError> {
        self.check_online()?;
        Ok(self.bank.lock().latest_blockhash())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, SubmitError> {
        self.process_transaction(transaction)
    }

    async fn transaction_status(
        &self,
        signature: &Signature,
    ) -> Result<TransactionStatus, TransportError> {
        self.check_online()?;
        let bank = self.bank.lock();
        let status = match bank.processed.get(signature) {
            Some(p) if Instant::now() >= p.visible_at => match &p.result {
                Ok(()) => TransactionStatus::Confirmed { slot: p.slot },
                Err(failure) => TransactionStatus::Failed {
                    slot: p.slot,
                    failure: failure.clone(),
                },
            },
            _ => TransactionStatus::Pending,
        };
        Ok(status)
    }

    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, TransportError> {
        self.check_online()?;
        Ok(self.account(pubkey))
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, TransportError> {
        self.check_online()?;
        Ok(self.balance(pubkey))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solanoid_types::LAMPORTS_PER_SOL;
    use std::time::Duration;

    fn ledger() -> SimLedger {
        SimLedger::new(SimConfig::default().with_seed(7))
    }

    #[test]
    fn test_token_helpers() {
        let ledger = ledger();
        let authority = ledger.funded_keypair(LAMPORTS_PER_SOL);
        let owner = ledger.new_keypair();
        let mint = ledger.create_mint(&authority, &authority.pubkey(), 8).unwrap();
        let holding = ledger
            .create_token_account(&authority, &mint, &owner.pubkey())
            .unwrap();

        let signature = ledger.mint_to(&authority, &mint, &holding, 1_500).unwrap();
        assert_eq!(ledger.token_balance(&holding).unwrap(), 1_500);
        assert_eq!(ledger.mint(&mint).unwrap().supply, 1_500);
        assert_eq!(
            ledger.events(&signature),
            vec![ProgramEvent::TokensMinted {
                mint,
                destination: holding,
                amount: 1_500
            }]
        );
    }

    #[test]
    fn test_failed_transaction_leaves_state_untouched() {
        let ledger = ledger();
        let authority = ledger.funded_keypair(LAMPORTS_PER_SOL);
        let impostor = ledger.funded_keypair(LAMPORTS_PER_SOL);
        let mint = ledger.create_mint(&authority, &authority.pubkey(), 0).unwrap();
        let holding = ledger
            .create_token_account(&authority, &mint, &authority.pubkey())
            .unwrap();
        let before = ledger.balance(&impostor.pubkey());

        let err = ledger.mint_to(&impostor, &mint, &holding, 5).unwrap_err();
        assert!(matches!(
            err,
            SimError::Failed(TransactionFailure::Instruction { index: 0, .. })
        ));
        assert_eq!(ledger.token_balance(&holding).unwrap(), 0);
        // preflight rejections cost nothing
        assert_eq!(ledger.balance(&impostor.pubkey()), before);
    }

    #[test]
    fn test_skip_preflight_records_failure_and_charges_fee() {
        let ledger = SimLedger::new(SimConfig::default().with_skip_preflight(true));
        let authority = ledger.funded_keypair(LAMPORTS_PER_SOL);
        let impostor = ledger.funded_keypair(LAMPORTS_PER_SOL);
        let mint = ledger.create_mint(&authority, &authority.pubkey(), 0).unwrap();
        let holding = ledger
            .create_token_account(&authority, &mint, &authority.pubkey())
            .unwrap();
        let before = ledger.balance(&impostor.pubkey());

        assert!(ledger.mint_to(&impostor, &mint, &holding, 5).is_err());
        assert_eq!(
            ledger.balance(&impostor.pubkey()),
            before - ledger.config().lamports_per_signature
        );
    }

    #[tokio::test]
    async fn test_duplicate_and_expired_transactions() {
        let ledger = SimLedger::new(SimConfig {
            blockhash_window: 2,
            ..SimConfig::default()
        });
        let payer = ledger.funded_keypair(LAMPORTS_PER_SOL);
        let mint = ledger.create_mint(&payer, &payer.pubkey(), 0).unwrap();
        let holding = ledger
            .create_token_account(&payer, &mint, &payer.pubkey())
            .unwrap();

        let ix = Instruction::new(
            TOKEN_PROGRAM_ID,
            &TokenInstruction::MintTo { amount: 1 },
            vec![
                AccountMeta::new(mint, false),
                AccountMeta::new(holding, false),
                AccountMeta::new_readonly(payer.pubkey(), true),
            ],
        );
        let blockhash = ledger.latest_blockhash().await.unwrap();
        let tx = Transaction::new_signed(&[ix.clone()], &payer, &[], blockhash).unwrap();
        ledger.send_transaction(&tx).await.unwrap();
        assert!(matches!(
            ledger.send_transaction(&tx).await,
            Err(SubmitError::Rejected(TransactionFailure::AlreadyProcessed))
        ));

        // two more slots push `blockhash` out of a two-entry window
        ledger.mint_to(&payer, &mint, &holding, 1).unwrap();
        ledger.mint_to(&payer, &mint, &holding, 1).unwrap();
        let stale = Transaction::new_signed(
            &[Instruction::new(TOKEN_PROGRAM_ID, &TokenInstruction::MintTo { amount: 2 }, ix.accounts)],
            &payer,
            &[],
            blockhash,
        )
        .unwrap();
        assert!(matches!(
            ledger.send_transaction(&stale).await,
            Err(SubmitError::Rejected(TransactionFailure::BlockhashNotFound))
        ));
    }

    #[tokio::test]
    async fn test_status_visible_after_latency() {
        let ledger = SimLedger::new(
            SimConfig::default().with_confirmation_latency(Duration::from_millis(50)),
        );
        let payer = ledger.funded_keypair(LAMPORTS_PER_SOL);
        let mint = ledger.create_mint(&payer, &payer.pubkey(), 0).unwrap();
        let holding = ledger
            .create_token_account(&payer, &mint, &payer.pubkey())
            .unwrap();
        let signature = ledger.mint_to(&payer, &mint, &holding, 1).unwrap();

        assert_eq!(
            ledger.transaction_status(&signature).await.unwrap(),
            TransactionStatus::Pending
        );
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(matches!(
            ledger.transaction_status(&signature).await.unwrap(),
            TransactionStatus::Confirmed { .. }
        ));
    }

    #[tokio::test]
    async fn test_offline() {
        let ledger = ledger();
        ledger.set_offline(true);
        assert!(matches!(
            ledger.latest_blockhash().await,
            Err(TransportError::Unavailable(_))
        ));
        ledger.set_offline(false);
        assert!(ledger.latest_blockhash().await.is_ok());
    }

    #[test]
    fn test_unfunded_payer() {
        let ledger = ledger();
        let payer = ledger.new_keypair();
        let err = ledger.create_mint(&payer, &payer.pubkey(), 0).unwrap_err();
        assert!(matches!(err, SimError::AccountNotFound(_)));
    }
}
