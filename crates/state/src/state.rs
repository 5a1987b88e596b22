//! This module contains the [State] type: the mutable world state and
//! its snapshot stack.

use crate::{Account, TrieAccount};
use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::Encodable;
use silex_mpt::Trie;
use tracing::trace;

/// An error produced by a world-state operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// An ether transfer exceeded the sender's balance.
    #[error("insufficient funds for transfer")]
    InsufficientFunds,
}

/// A checkpoint of the maps a rollback must restore.
#[derive(Debug, Clone)]
struct Snapshot {
    accounts: BTreeMap<Address, Account>,
    storage: BTreeMap<Address, BTreeMap<B256, U256>>,
    transient_storage: BTreeMap<(Address, B256), U256>,
}

/// The world state: accounts, their storage, the per-transaction
/// transient storage, and the snapshot stack.
///
/// Snapshots nest LIFO. The executor opens one per transaction and the
/// interpreter one per call/create frame; each `begin_transaction` must
/// be matched by exactly one `commit_transaction` or
/// `rollback_transaction`. The block-level checkpoint is *not* part of
/// this stack (the driver clones the whole state instead), so the
/// bottom of the stack is always the transaction entry point, which is
/// what original-storage reads are defined against.
///
/// All maps are B-trees: iteration order is deterministic, which the
/// root computation and the EIP-161 sweep rely on.
#[derive(Debug, Clone, Default)]
pub struct State {
    accounts: BTreeMap<Address, Account>,
    storage: BTreeMap<Address, BTreeMap<B256, U256>>,
    transient_storage: BTreeMap<(Address, B256), U256>,
    snapshots: Vec<Snapshot>,
    created_accounts: BTreeSet<Address>,
}

impl State {
    /// Creates an empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Accounts
    // ---------------------------------------------------------------------

    /// Returns the account at the given address, or the empty account if
    /// none exists.
    pub fn get_account(&self, address: Address) -> Account {
        self.accounts.get(&address).cloned().unwrap_or_default()
    }

    /// Returns the account at the given address if one exists.
    pub fn get_account_optional(&self, address: Address) -> Option<&Account> {
        self.accounts.get(&address)
    }

    /// Writes (or creates) the account at the given address. `None`
    /// removes the account entry without touching its storage.
    pub fn set_account(&mut self, address: Address, account: Option<Account>) {
        match account {
            Some(account) => {
                self.accounts.insert(address, account);
            }
            None => {
                self.accounts.remove(&address);
            }
        }
    }

    /// Removes the account and all of its storage.
    pub fn destroy_account(&mut self, address: Address) {
        self.accounts.remove(&address);
        self.storage.remove(&address);
    }

    /// Removes all of the account's storage, leaving the account itself
    /// in place.
    pub fn destroy_storage(&mut self, address: Address) {
        self.storage.remove(&address);
    }

    /// Ensures an account entry exists at the address, creating an empty
    /// one if necessary. Empty entries created this way are what the
    /// EIP-161 sweep later removes.
    pub fn touch_account(&mut self, address: Address) {
        self.accounts.entry(address).or_default();
    }

    /// Returns `true` if an account (even an empty one) exists at the
    /// address.
    pub fn account_exists(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    /// Returns `true` if the account exists and is non-empty.
    pub fn is_account_alive(&self, address: Address) -> bool {
        self.accounts.get(&address).is_some_and(|account| !account.is_empty())
    }

    /// Returns `true` if an account exists and is empty per EIP-161.
    pub fn account_exists_and_is_empty(&self, address: Address) -> bool {
        self.accounts.get(&address).is_some_and(Account::is_empty)
    }

    /// Returns `true` if the account has code or a non-zero nonce, the
    /// create-collision criterion.
    pub fn account_has_code_or_nonce(&self, address: Address) -> bool {
        self.accounts.get(&address).is_some_and(Account::has_code_or_nonce)
    }

    /// Returns `true` if the account has any non-zero storage slot.
    pub fn account_has_storage(&self, address: Address) -> bool {
        self.storage.get(&address).is_some_and(|slots| !slots.is_empty())
    }

    /// Increments the account's nonce.
    pub fn increment_nonce(&mut self, address: Address) {
        let account = self.accounts.entry(address).or_default();
        account.nonce += 1;
    }

    /// Replaces the account's code.
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        let account = self.accounts.entry(address).or_default();
        account.code = code;
    }

    /// Returns the account's code, or empty bytes if the account does
    /// not exist.
    pub fn get_code(&self, address: Address) -> Bytes {
        self.accounts.get(&address).map(|account| account.code.clone()).unwrap_or_default()
    }

    /// Adds to the account's balance, creating the account if absent.
    pub fn add_balance(&mut self, address: Address, amount: U256) {
        let account = self.accounts.entry(address).or_default();
        account.balance += amount;
    }

    /// Overwrites the account's balance.
    pub fn set_balance(&mut self, address: Address, amount: U256) {
        let account = self.accounts.entry(address).or_default();
        account.balance = amount;
    }

    /// Subtracts from the account's balance.
    ///
    /// ## Panics
    /// Callers must have established that the balance suffices; the
    /// protocol checks this before every debit.
    pub fn sub_balance(&mut self, address: Address, amount: U256) {
        let account = self.accounts.entry(address).or_default();
        account.balance -= amount;
    }

    /// Transfers ether between two accounts, failing when the source
    /// balance is insufficient.
    pub fn move_ether(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), StateError> {
        if self.get_account(from).balance < amount {
            return Err(StateError::InsufficientFunds);
        }
        self.sub_balance(from, amount);
        self.add_balance(to, amount);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Storage
    // ---------------------------------------------------------------------

    /// Reads a storage slot; absent slots read as zero.
    pub fn get_storage(&self, address: Address, key: B256) -> U256 {
        self.storage
            .get(&address)
            .and_then(|slots| slots.get(&key))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Reads a storage slot as it was at the start of the current
    /// transaction, the baseline for SSTORE refund accounting.
    pub fn get_storage_original(&self, address: Address, key: B256) -> U256 {
        // Accounts created in this transaction started with empty
        // storage regardless of what a prior incarnation left behind.
        if self.created_accounts.contains(&address) {
            return U256::ZERO;
        }
        match self.snapshots.first() {
            Some(snapshot) => snapshot
                .storage
                .get(&address)
                .and_then(|slots| slots.get(&key))
                .copied()
                .unwrap_or(U256::ZERO),
            None => self.get_storage(address, key),
        }
    }

    /// Writes a storage slot; writing zero deletes it.
    pub fn set_storage(&mut self, address: Address, key: B256, value: U256) {
        debug_assert!(
            self.accounts.contains_key(&address),
            "storage write to a non-existent account"
        );
        let slots = self.storage.entry(address).or_default();
        if value.is_zero() {
            slots.remove(&key);
            if slots.is_empty() {
                self.storage.remove(&address);
            }
        } else {
            slots.insert(key, value);
        }
    }

    // ---------------------------------------------------------------------
    // Transient storage (EIP-1153)
    // ---------------------------------------------------------------------

    /// Reads a transient storage slot; absent slots read as zero.
    pub fn get_transient_storage(&self, address: Address, key: B256) -> U256 {
        self.transient_storage.get(&(address, key)).copied().unwrap_or(U256::ZERO)
    }

    /// Writes a transient storage slot.
    pub fn set_transient_storage(&mut self, address: Address, key: B256, value: U256) {
        if value.is_zero() {
            self.transient_storage.remove(&(address, key));
        } else {
            self.transient_storage.insert((address, key), value);
        }
    }

    /// Drops all transient storage; runs at every transaction boundary.
    pub fn clear_transient_storage(&mut self) {
        self.transient_storage.clear();
    }

    // ---------------------------------------------------------------------
    // Created-account bookkeeping (EIP-6780)
    // ---------------------------------------------------------------------

    /// Records that the address was created by CREATE/CREATE2 in the
    /// current transaction.
    pub fn mark_account_created(&mut self, address: Address) {
        self.created_accounts.insert(address);
    }

    /// Returns `true` if the address was created in the current
    /// transaction.
    pub fn account_created_in_transaction(&self, address: Address) -> bool {
        self.created_accounts.contains(&address)
    }

    /// Forgets the created-account set; runs at every transaction
    /// boundary.
    pub fn clear_created_accounts(&mut self) {
        self.created_accounts.clear();
    }

    // ---------------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------------

    /// Pushes a checkpoint that [Self::rollback_transaction] can restore.
    pub fn begin_transaction(&mut self) {
        self.snapshots.push(Snapshot {
            accounts: self.accounts.clone(),
            storage: self.storage.clone(),
            transient_storage: self.transient_storage.clone(),
        });
    }

    /// Discards the innermost checkpoint, keeping all changes since it.
    pub fn commit_transaction(&mut self) {
        self.snapshots.pop().expect("commit without matching begin");
    }

    /// Restores the innermost checkpoint, discarding all changes since
    /// it.
    pub fn rollback_transaction(&mut self) {
        let snapshot = self.snapshots.pop().expect("rollback without matching begin");
        self.accounts = snapshot.accounts;
        self.storage = snapshot.storage;
        self.transient_storage = snapshot.transient_storage;
    }

    /// Depth of the snapshot stack.
    pub fn snapshot_depth(&self) -> usize {
        self.snapshots.len()
    }

    // ---------------------------------------------------------------------
    // Roots
    // ---------------------------------------------------------------------

    /// Computes the storage-trie root of one account.
    pub fn storage_root(&self, address: Address) -> B256 {
        let mut trie = Trie::<U256>::new_secured();
        if let Some(slots) = self.storage.get(&address) {
            for (key, value) in slots {
                trie.insert(Bytes::copy_from_slice(key.as_slice()), *value);
            }
        }
        trie.root()
    }

    /// Materializes the state trie and returns its root: a secured trie
    /// over every existing account, each serialized with its storage
    /// root and code hash substituted in.
    pub fn state_root(&self) -> B256 {
        trace!(target: "state", accounts = self.accounts.len(), "computing state root");
        let mut trie = Trie::<Bytes>::new_secured();
        for (address, account) in &self.accounts {
            let trie_account = TrieAccount::from((account, self.storage_root(*address)));
            let mut encoded = Vec::new();
            trie_account.encode(&mut encoded);
            trie.insert(Bytes::copy_from_slice(address.as_slice()), encoded.into());
        }
        trie.root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silex_mpt::EMPTY_ROOT_HASH;

    fn addr(byte: u8) -> Address {
        Address::with_last_byte(byte)
    }

    #[test]
    fn test_empty_state_root() {
        assert_eq!(State::new().state_root(), EMPTY_ROOT_HASH);
    }

    #[test]
    fn test_move_ether_checks_balance() {
        let mut state = State::new();
        state.add_balance(addr(1), U256::from(10));

        assert_eq!(
            state.move_ether(addr(1), addr(2), U256::from(11)),
            Err(StateError::InsufficientFunds),
        );
        state.move_ether(addr(1), addr(2), U256::from(4)).unwrap();
        assert_eq!(state.get_account(addr(1)).balance, U256::from(6));
        assert_eq!(state.get_account(addr(2)).balance, U256::from(4));
    }

    #[test]
    fn test_zero_write_deletes_slot() {
        let mut state = State::new();
        state.set_account(addr(1), Some(Account::default()));
        state.set_storage(addr(1), B256::with_last_byte(1), U256::from(5));
        assert!(state.account_has_storage(addr(1)));

        state.set_storage(addr(1), B256::with_last_byte(1), U256::ZERO);
        assert_eq!(state.get_storage(addr(1), B256::with_last_byte(1)), U256::ZERO);
        assert!(!state.account_has_storage(addr(1)));
        assert_eq!(state.storage_root(addr(1)), EMPTY_ROOT_HASH);
    }

    #[test]
    fn test_nested_snapshots() {
        let mut state = State::new();
        state.add_balance(addr(1), U256::from(1));

        state.begin_transaction();
        state.add_balance(addr(1), U256::from(10));

        state.begin_transaction();
        state.add_balance(addr(1), U256::from(100));
        state.rollback_transaction();
        assert_eq!(state.get_account(addr(1)).balance, U256::from(11));

        state.commit_transaction();
        assert_eq!(state.get_account(addr(1)).balance, U256::from(11));
        assert_eq!(state.snapshot_depth(), 0);
    }

    #[test]
    fn test_rollback_restores_transient_storage() {
        let mut state = State::new();
        state.begin_transaction();
        state.set_transient_storage(addr(1), B256::ZERO, U256::from(3));
        state.rollback_transaction();
        assert_eq!(state.get_transient_storage(addr(1), B256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_original_storage_reads_transaction_entry() {
        let mut state = State::new();
        state.set_account(addr(1), Some(Account::default()));
        state.set_storage(addr(1), B256::ZERO, U256::from(3));

        state.begin_transaction();
        state.set_storage(addr(1), B256::ZERO, U256::from(9));
        assert_eq!(state.get_storage(addr(1), B256::ZERO), U256::from(9));
        assert_eq!(state.get_storage_original(addr(1), B256::ZERO), U256::from(3));

        // A nested frame still sees the transaction-entry value.
        state.begin_transaction();
        state.set_storage(addr(1), B256::ZERO, U256::from(12));
        assert_eq!(state.get_storage_original(addr(1), B256::ZERO), U256::from(3));
        state.commit_transaction();
        state.commit_transaction();
    }

    #[test]
    fn test_created_account_original_storage_is_zero() {
        let mut state = State::new();
        state.set_account(addr(1), Some(Account::default()));
        state.set_storage(addr(1), B256::ZERO, U256::from(3));

        state.begin_transaction();
        state.mark_account_created(addr(1));
        assert_eq!(state.get_storage_original(addr(1), B256::ZERO), U256::ZERO);
        state.commit_transaction();
        state.clear_created_accounts();
        assert!(!state.account_created_in_transaction(addr(1)));
    }

    #[test]
    fn test_destroy_account_removes_storage() {
        let mut state = State::new();
        state.set_account(addr(1), Some(Account { nonce: 1, ..Default::default() }));
        state.set_storage(addr(1), B256::ZERO, U256::from(1));
        state.destroy_account(addr(1));
        assert!(!state.account_exists(addr(1)));
        assert!(!state.account_has_storage(addr(1)));
    }
}
