//! In-memory wallet extension
//!
//! Behaves like a browser wallet attached to a chain with a payable vault:
//! value sent by an account is credited to that account, and a read call
//! carrying an address argument returns that address's credited total.
//! Failures can be scripted per method, and every request is counted.

use crate::provider::{AddChainParams, CallRequest, TxReceipt, TxRequest, WalletEvent, WalletProvider};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use pennyvault_types::{ProviderError, UNAUTHORIZED_CODE};
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::broadcast;

/// Wallet requests, for scripting failures and counting calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletMethod {
    RequestAccounts,
    ChainId,
    SwitchChain,
    AddChain,
    Call,
    SendTransaction,
    WaitForReceipt,
}

#[derive(Debug, Default)]
struct SimState {
    accounts: Vec<Address>,
    chain_id: u64,
    known_chains: HashSet<u64>,
    failures: HashMap<WalletMethod, VecDeque<ProviderError>>,
    calls: HashMap<WalletMethod, usize>,
    added_chains: Vec<AddChainParams>,
    ledger: HashMap<Address, U256>,
    receipts: HashMap<TxHash, TxReceipt>,
    sent: Vec<TxRequest>,
    block_number: u64,
    nonce: u64,
    revert_transactions: bool,
}

impl SimState {
    fn enter(&mut self, method: WalletMethod) -> Result<(), ProviderError> {
        *self.calls.entry(method).or_default() += 1;
        match self.failures.get_mut(&method).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-memory wallet extension
pub struct SimulatedWallet {
    state: Mutex<SimState>,
    events: broadcast::Sender<WalletEvent>,
}

impl SimulatedWallet {
    /// A wallet exposing `account`, currently on `chain_id`
    pub fn new(account: Address, chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        let mut known_chains = HashSet::new();
        known_chains.insert(chain_id);
        Self {
            state: Mutex::new(SimState {
                accounts: vec![account],
                chain_id,
                known_chains,
                block_number: 1_000,
                ..Default::default()
            }),
            events,
        }
    }

    /// Register another chain the wallet can switch to
    pub fn with_known_chain(self, chain_id: u64) -> Self {
        self.state.lock().known_chains.insert(chain_id);
        self
    }

    /// Fail the next request of `method` with `error`; queued errors are
    /// consumed in order.
    pub fn fail_next(&self, method: WalletMethod, error: ProviderError) {
        self.state
            .lock()
            .failures
            .entry(method)
            .or_default()
            .push_back(error);
    }

    /// Mine every subsequent transaction as reverted
    pub fn revert_transactions(&self, revert: bool) {
        self.state.lock().revert_transactions = revert;
    }

    /// Number of requests made for `method`
    pub fn calls(&self, method: WalletMethod) -> usize {
        self.state.lock().calls.get(&method).copied().unwrap_or(0)
    }

    /// Chains registered through `wallet_addEthereumChain`
    pub fn added_chains(&self) -> Vec<AddChainParams> {
        self.state.lock().added_chains.clone()
    }

    /// Transactions submitted so far
    pub fn sent_transactions(&self) -> Vec<TxRequest> {
        self.state.lock().sent.clone()
    }

    pub fn current_chain(&self) -> u64 {
        self.state.lock().chain_id
    }

    /// Credited vault total of `address`, in wei
    pub fn balance_of(&self, address: Address) -> U256 {
        self.state
            .lock()
            .ledger
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    /// Credit `wei` to `address` directly, as a deposit from another session would
    pub fn credit(&self, address: Address, wei: U256) {
        *self.state.lock().ledger.entry(address).or_default() += wei;
    }

    /// Replace the exposed accounts and notify subscribers
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().accounts = accounts.clone();
        self.emit(WalletEvent::AccountsChanged(accounts));
    }

    /// Move to another chain from the wallet UI and notify subscribers
    pub fn set_chain(&self, chain_id: u64) {
        {
            let mut state = self.state.lock();
            state.known_chains.insert(chain_id);
            state.chain_id = chain_id;
        }
        self.emit(WalletEvent::ChainChanged(chain_id));
    }

    /// Fire a notification
    pub fn emit(&self, event: WalletEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for SimulatedWallet {
    fn name(&self) -> &'static str {
        "Simulated"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let mut state = self.state.lock();
        state.enter(WalletMethod::RequestAccounts)?;
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let mut state = self.state.lock();
        state.enter(WalletMethod::ChainId)?;
        Ok(state.chain_id)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        {
            let mut state = self.state.lock();
            state.enter(WalletMethod::SwitchChain)?;
            if !state.known_chains.contains(&chain_id) {
                return Err(ProviderError::unrecognized_chain(chain_id));
            }
            state.chain_id = chain_id;
        }
        self.emit(WalletEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), ProviderError> {
        let chain_id = params
            .chain_id_u64()
            .ok_or_else(|| ProviderError::new(-32602, "invalid chainId"))?;
        {
            let mut state = self.state.lock();
            state.enter(WalletMethod::AddChain)?;
            state.added_chains.push(params.clone());
            state.known_chains.insert(chain_id);
            state.chain_id = chain_id;
        }
        self.emit(WalletEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, ProviderError> {
        let mut state = self.state.lock();
        state.enter(WalletMethod::Call)?;
        // selector + one left-padded address word
        let balance = if request.data.len() == 36 {
            let account = Address::from_slice(&request.data[16..36]);
            state.ledger.get(&account).copied().unwrap_or_default()
        } else {
            U256::ZERO
        };
        Ok(Bytes::from(balance.to_be_bytes_vec()))
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<TxHash, ProviderError> {
        let mut state = self.state.lock();
        state.enter(WalletMethod::SendTransaction)?;
        let from = tx
            .from
            .ok_or_else(|| ProviderError::new(-32602, "missing from"))?;
        if !state.accounts.contains(&from) {
            return Err(ProviderError::new(
                UNAUTHORIZED_CODE,
                "The requested account has not been authorized by the user.",
            ));
        }

        state.nonce += 1;
        state.block_number += 1;
        let tx_hash = TxHash::from(U256::from(state.nonce));
        let status = !state.revert_transactions;
        if status {
            *state.ledger.entry(from).or_default() += tx.value;
        }
        let receipt = TxReceipt {
            tx_hash,
            block_number: state.block_number,
            status,
        };
        state.receipts.insert(tx_hash, receipt);
        state.sent.push(tx.clone());
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ProviderError> {
        let mut state = self.state.lock();
        state.enter(WalletMethod::WaitForReceipt)?;
        state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| ProviderError::message(format!("transaction {tx_hash} not found")))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
