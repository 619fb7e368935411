//! The EVM module keeper.
//!
//! Owns the EVM's own partition: account records, code, storage slots, the
//! address mapping and (through [`PointerRegistry`]) the pointer indexes.
//! Everything outside that partition is reached through the capability
//! traits it was constructed with.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use dualvm_core::{
    AddressMapper, BankKeeper, Context, EvmBalanceKeeper, KeeperError, KeeperResult, Keepers,
    PointerLookup, PointerReader, WasmdKeeper, WasmdViewKeeper,
};
use dualvm_storage::{partitions::EVM, ChangeSet, StorageError, Whitelist};
use dualvm_types::{
    default_evm_address, default_native_address, EvmAddress, NativeAddress, PointerKind,
};
use revm::primitives::{SpecId, KECCAK_EMPTY};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::abi::keccak256;
use crate::artifacts::PointerArtifacts;
use crate::keys::{account_key, code_key, evm_to_native_key, native_to_evm_key, storage_key};
use crate::precompiles::PrecompileRegistry;
use crate::registry::{PointerError, PointerRegistry};

/// Gas available to a pointer deployment
pub const DEFAULT_DEPLOY_GAS_LIMIT: u64 = 5_000_000;

/// Chain id used when none is configured
pub const DEFAULT_CHAIN_ID: u64 = 713_715;

/// Address of a module account: the trailing 20 bytes of the keccak hash of
/// its name
pub fn module_address(name: &str) -> EvmAddress {
    EvmAddress::from_slice(&keccak256(name.as_bytes())[12..])
}

/// Keeper parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmParams {
    /// EVM chain id
    pub chain_id: u64,
    /// Bech32 prefix of native addresses
    pub bech32_prefix: String,
    /// Denomination backing EVM balances, one base unit per wei
    pub base_denom: String,
    /// Gas limit of pointer deployments
    pub deploy_gas_limit: u64,
    /// Module account that deploys pointer contracts
    pub deployer: EvmAddress,
    /// Hardfork rules
    pub spec: SpecId,
}

impl EvmParams {
    /// Parameters for the given prefix and base denom, everything else default
    pub fn new(bech32_prefix: impl Into<String>, base_denom: impl Into<String>) -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            bech32_prefix: bech32_prefix.into(),
            base_denom: base_denom.into(),
            deploy_gas_limit: DEFAULT_DEPLOY_GAS_LIMIT,
            deployer: module_address("evm"),
            spec: SpecId::CANCUN,
        }
    }
}

/// Persisted part of an EVM account; the balance lives in the bank module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccount {
    /// Transaction count
    pub nonce: u64,
    /// Hash of the account's code, `None` for accounts without code
    pub code_hash: Option<[u8; 32]>,
}

impl StoredAccount {
    /// Code hash in revm form
    pub fn code_hash(&self) -> B256 {
        self.code_hash.map(B256::from).unwrap_or(KECCAK_EMPTY)
    }
}

/// Low 128 bits of a word, if nothing above them is set
pub(crate) fn u256_to_u128(value: U256) -> Option<u128> {
    if value.bit_len() > 128 {
        return None;
    }
    let limbs = value.as_limbs();
    Some(limbs[0] as u128 | (limbs[1] as u128) << 64)
}

/// The EVM module keeper
pub struct EvmKeeper {
    params: EvmParams,
    artifacts: PointerArtifacts,
    registry: PointerRegistry,
    whitelist: Arc<Whitelist>,
    pub(crate) bank: Arc<dyn BankKeeper>,
    pub(crate) evm_balance: Arc<dyn EvmBalanceKeeper>,
    pub(crate) wasmd: Arc<dyn WasmdKeeper>,
    pub(crate) wasmd_view: Arc<dyn WasmdViewKeeper>,
    precompiles: PrecompileRegistry,
}

impl EvmKeeper {
    /// Create a keeper. `whitelist` bounds what EVM messages may write outside
    /// the keeper's own partition.
    pub fn new(
        params: EvmParams,
        artifacts: PointerArtifacts,
        whitelist: Whitelist,
        keepers: &Keepers,
    ) -> Self {
        Self {
            registry: PointerRegistry::new(params.bech32_prefix.clone()),
            params,
            artifacts,
            whitelist: Arc::new(whitelist),
            bank: keepers.bank.clone(),
            evm_balance: keepers.evm_balance.clone(),
            wasmd: keepers.wasmd.clone(),
            wasmd_view: keepers.wasmd_view.clone(),
            precompiles: PrecompileRegistry::new(keepers),
        }
    }

    /// Keeper parameters
    pub fn params(&self) -> &EvmParams {
        &self.params
    }

    /// Pointer artifacts
    pub fn artifacts(&self) -> &PointerArtifacts {
        &self.artifacts
    }

    /// Pointer indexes
    pub fn registry(&self) -> &PointerRegistry {
        &self.registry
    }

    /// Write whitelist applied to EVM messages
    pub fn whitelist(&self) -> &Arc<Whitelist> {
        &self.whitelist
    }

    /// Bridge precompiles
    pub fn precompiles(&self) -> &PrecompileRegistry {
        &self.precompiles
    }

    /// Native address of the pointer deployer
    pub fn deployer_native(&self, ctx: &Context<'_>) -> KeeperResult<NativeAddress> {
        self.get_native_address_or_default(ctx, &self.params.deployer)
    }

    /// Stored account record
    pub fn account(
        &self,
        ctx: &Context<'_>,
        address: &Address,
    ) -> Result<Option<StoredAccount>, StorageError> {
        trace!(address = %address, "loading account record");
        match ctx.get(EVM, &account_key(address))? {
            Some(bytes) => Ok(Some(dualvm_storage::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Account nonce, 0 for unknown accounts
    pub fn get_nonce(&self, ctx: &Context<'_>, address: &Address) -> Result<u64, StorageError> {
        Ok(self.account(ctx, address)?.map(|a| a.nonce).unwrap_or(0))
    }

    /// Code hash, `KECCAK_EMPTY` for accounts without code
    pub fn get_code_hash(&self, ctx: &Context<'_>, address: &Address) -> Result<B256, StorageError> {
        Ok(self.account(ctx, address)?.unwrap_or_default().code_hash())
    }

    /// Code stored under a hash
    pub fn code_by_hash(&self, ctx: &Context<'_>, hash: &B256) -> Result<Option<Bytes>, StorageError> {
        Ok(ctx.get(EVM, &code_key(hash))?.map(Bytes::from))
    }

    /// Runtime code of an account
    pub fn get_code(&self, ctx: &Context<'_>, address: &Address) -> Result<Option<Bytes>, StorageError> {
        let hash = self.get_code_hash(ctx, address)?;
        if hash == KECCAK_EMPTY {
            return Ok(None);
        }
        self.code_by_hash(ctx, &hash)
    }

    /// Value of a storage slot, zero if unset
    pub fn get_state(&self, ctx: &Context<'_>, address: &Address, slot: &U256) -> Result<U256, StorageError> {
        Ok(ctx
            .get(EVM, &storage_key(address, slot))?
            .map(|bytes| U256::from_be_slice(&bytes))
            .unwrap_or(U256::ZERO))
    }

    /// EVM balance: the base-denom bank balance of the mapped native address
    pub fn get_balance(&self, ctx: &Context<'_>, address: &Address) -> KeeperResult<U256> {
        let native = self.get_native_address_or_default(ctx, address)?;
        let coin = self
            .evm_balance
            .get_balance(ctx, &native, &self.params.base_denom)?;
        Ok(U256::from(coin.amount))
    }

    /// Replace the code of an existing account, keeping its nonce and storage
    pub fn set_code(&self, ctx: &mut Context<'_>, address: &Address, code: &[u8]) -> Result<B256, StorageError> {
        let hash = keccak256(code);
        let mut account = self.account(ctx, address)?.unwrap_or_default();
        account.code_hash = Some(hash.0);

        let mut changes = ChangeSet::new();
        changes.set(EVM, &code_key(&hash), code.to_vec());
        changes.set(EVM, &account_key(address), dualvm_storage::encode(&account)?);
        ctx.store_mut().apply(changes)?;
        debug!(address = %address, code_hash = %hash, "code installed");
        Ok(hash)
    }

    /// Record `asset_key <-> pointer` at the current artifact version without
    /// deploying anything
    pub fn set_pointer(
        &self,
        ctx: &mut Context<'_>,
        kind: PointerKind,
        asset_key: &str,
        pointer: &str,
    ) -> Result<(), PointerError> {
        let version = self.artifacts.version(kind);
        self.registry
            .write_pointer(ctx, kind, asset_key, pointer, version)
    }
}

impl AddressMapper for EvmKeeper {
    fn get_native_address(
        &self,
        ctx: &Context<'_>,
        evm: &EvmAddress,
    ) -> KeeperResult<Option<NativeAddress>> {
        match ctx.get(EVM, &evm_to_native_key(evm))? {
            Some(bytes) => Ok(Some(NativeAddress::new(&self.params.bech32_prefix, bytes)?)),
            None => Ok(None),
        }
    }

    fn get_native_address_or_default(
        &self,
        ctx: &Context<'_>,
        evm: &EvmAddress,
    ) -> KeeperResult<NativeAddress> {
        match self.get_native_address(ctx, evm)? {
            Some(native) => Ok(native),
            None => Ok(default_native_address(evm, &self.params.bech32_prefix)?),
        }
    }

    fn get_evm_address(
        &self,
        ctx: &Context<'_>,
        native: &NativeAddress,
    ) -> KeeperResult<Option<EvmAddress>> {
        Ok(ctx
            .get(EVM, &native_to_evm_key(native.as_bytes()))?
            .map(|bytes| EvmAddress::from_slice(&bytes)))
    }

    fn get_evm_address_or_default(
        &self,
        ctx: &Context<'_>,
        native: &NativeAddress,
    ) -> KeeperResult<EvmAddress> {
        Ok(self
            .get_evm_address(ctx, native)?
            .unwrap_or_else(|| default_evm_address(native)))
    }

    fn set_address_mapping(
        &self,
        ctx: &mut Context<'_>,
        native: &NativeAddress,
        evm: &EvmAddress,
    ) -> KeeperResult<()> {
        if native.prefix() != self.params.bech32_prefix {
            return Err(KeeperError::InvalidRequest(format!(
                "address {native} does not use prefix {}",
                self.params.bech32_prefix
            )));
        }
        if let Some(existing) = self.get_evm_address(ctx, native)? {
            if existing != *evm {
                return Err(KeeperError::InvalidRequest(format!(
                    "{native} is already associated with {existing}"
                )));
            }
        }
        if let Some(existing) = self.get_native_address(ctx, evm)? {
            if existing != *native {
                return Err(KeeperError::InvalidRequest(format!(
                    "{evm} is already associated with {existing}"
                )));
            }
        }

        let mut changes = ChangeSet::new();
        changes.set(EVM, &evm_to_native_key(evm), native.as_bytes().to_vec());
        changes.set(EVM, &native_to_evm_key(native.as_bytes()), evm.as_slice().to_vec());
        ctx.store_mut().apply(changes)?;
        debug!(native = %native, evm = %evm, "address mapping set");
        Ok(())
    }
}

impl PointerReader for EvmKeeper {
    fn resolve_pointer(
        &self,
        ctx: &Context<'_>,
        kind: PointerKind,
        asset_key: &str,
    ) -> KeeperResult<PointerLookup> {
        self.registry.resolve_pointer(ctx, kind, asset_key)
    }

    fn resolve_asset(
        &self,
        ctx: &Context<'_>,
        kind: PointerKind,
        pointer: &str,
    ) -> KeeperResult<PointerLookup> {
        self.registry.resolve_asset(ctx, kind, pointer)
    }
}
