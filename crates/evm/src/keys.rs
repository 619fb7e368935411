//! Key layout of the `evm` partition.
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `0x01` | address | nonce and code hash |
//! | `0x02` | code hash | bytecode |
//! | `0x03` | address, slot | 32-byte word |
//! | `0x04` | EVM address | mapped native address |
//! | `0x05` | native address bytes | mapped EVM address |
//! | `0x10` | kind, asset key | pointer record |
//! | `0x11` | kind, pointer address | asset record |

use alloy_primitives::{Address, B256, U256};
use dualvm_types::PointerKind;

/// Account records
pub const ACCOUNT_PREFIX: u8 = 0x01;
/// Contract code by hash
pub const CODE_PREFIX: u8 = 0x02;
/// Contract storage slots
pub const STORAGE_PREFIX: u8 = 0x03;
/// EVM to native address mapping
pub const EVM_TO_NATIVE_PREFIX: u8 = 0x04;
/// Native to EVM address mapping
pub const NATIVE_TO_EVM_PREFIX: u8 = 0x05;
/// Forward pointer index, asset to pointer
pub const POINTER_PREFIX: u8 = 0x10;
/// Reverse pointer index, pointer to asset
pub const POINTER_REVERSE_PREFIX: u8 = 0x11;

fn prefixed(prefix: u8, parts: &[&[u8]]) -> Vec<u8> {
    let len = 1 + parts.iter().map(|p| p.len()).sum::<usize>();
    let mut key = Vec::with_capacity(len);
    key.push(prefix);
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// Key of an account record
pub fn account_key(address: &Address) -> Vec<u8> {
    prefixed(ACCOUNT_PREFIX, &[address.as_slice()])
}

/// Key of contract code
pub fn code_key(hash: &B256) -> Vec<u8> {
    prefixed(CODE_PREFIX, &[hash.as_slice()])
}

/// Prefix of every storage slot of a contract
pub fn storage_prefix(address: &Address) -> Vec<u8> {
    prefixed(STORAGE_PREFIX, &[address.as_slice()])
}

/// Key of one storage slot
pub fn storage_key(address: &Address, slot: &U256) -> Vec<u8> {
    prefixed(
        STORAGE_PREFIX,
        &[address.as_slice(), &slot.to_be_bytes::<32>()],
    )
}

/// Key of the native address mapped to an EVM address
pub fn evm_to_native_key(address: &Address) -> Vec<u8> {
    prefixed(EVM_TO_NATIVE_PREFIX, &[address.as_slice()])
}

/// Key of the EVM address mapped to native address bytes
pub fn native_to_evm_key(native: &[u8]) -> Vec<u8> {
    prefixed(NATIVE_TO_EVM_PREFIX, &[native])
}

/// Forward index entry of an asset
pub fn pointer_key(kind: PointerKind, asset: &[u8]) -> Vec<u8> {
    prefixed(POINTER_PREFIX, &[&[kind.as_byte()], asset])
}

/// Reverse index entry of a pointer
pub fn pointer_reverse_key(kind: PointerKind, pointer: &[u8]) -> Vec<u8> {
    prefixed(POINTER_REVERSE_PREFIX, &[&[kind.as_byte()], pointer])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_use_separate_key_spaces() {
        let asset = b"ufoo";
        let keys: Vec<_> = PointerKind::ALL
            .iter()
            .map(|k| pointer_key(*k, asset))
            .collect();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_ne!(
            pointer_key(PointerKind::Native, asset),
            pointer_reverse_key(PointerKind::Native, asset)
        );
    }

    #[test]
    fn test_storage_key_under_contract_prefix() {
        let addr = Address::repeat_byte(3);
        let key = storage_key(&addr, &U256::from(9u8));
        assert!(key.starts_with(&storage_prefix(&addr)));
        assert_eq!(key.len(), 1 + 20 + 32);
    }
}
