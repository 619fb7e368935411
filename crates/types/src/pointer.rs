//! Pointer kinds and the address spaces they bridge.
//!
//! Every kind pairs an asset living in one VM with a pointer contract living
//! in the other. The integer values are part of the query wire format.

use crate::{Error, Result, ZERO_EVM_ADDRESS_HEX};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which VM an address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressSpace {
    /// Bech32 native ledger addresses
    Native,
    /// 0x-prefixed hex EVM addresses
    Evm,
}

impl AddressSpace {
    /// Value returned by lookups that find nothing in this space
    pub fn zero_value(&self) -> &'static str {
        match self {
            AddressSpace::Native => "",
            AddressSpace::Evm => ZERO_EVM_ADDRESS_HEX,
        }
    }
}

/// The five asset/pointer pairings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PointerKind {
    /// EVM ERC-20 token, pointed to by a native CW-20 contract
    Erc20 = 0,
    /// EVM ERC-721 collection, pointed to by a native CW-721 contract
    Erc721 = 1,
    /// Native bank denomination, pointed to by an EVM ERC-20 contract
    Native = 2,
    /// Native CW-20 token, pointed to by an EVM ERC-20 contract
    Cw20 = 3,
    /// Native CW-721 collection, pointed to by an EVM ERC-721 contract
    Cw721 = 4,
}

impl PointerKind {
    /// All kinds in wire order
    pub const ALL: [PointerKind; 5] = [
        PointerKind::Erc20,
        PointerKind::Erc721,
        PointerKind::Native,
        PointerKind::Cw20,
        PointerKind::Cw721,
    ];

    /// Address space of the original asset
    pub fn asset_space(&self) -> AddressSpace {
        match self {
            PointerKind::Erc20 | PointerKind::Erc721 => AddressSpace::Evm,
            PointerKind::Native | PointerKind::Cw20 | PointerKind::Cw721 => AddressSpace::Native,
        }
    }

    /// Address space of the pointer contract
    pub fn pointer_space(&self) -> AddressSpace {
        match self.asset_space() {
            AddressSpace::Evm => AddressSpace::Native,
            AddressSpace::Native => AddressSpace::Evm,
        }
    }

    /// Wire value
    pub fn as_i32(&self) -> i32 {
        *self as u8 as i32
    }

    /// Single byte used in storage keys
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Canonical upper-case name
    pub fn name(&self) -> &'static str {
        match self {
            PointerKind::Erc20 => "ERC20",
            PointerKind::Erc721 => "ERC721",
            PointerKind::Native => "NATIVE",
            PointerKind::Cw20 => "CW20",
            PointerKind::Cw721 => "CW721",
        }
    }
}

impl TryFrom<i32> for PointerKind {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(PointerKind::Erc20),
            1 => Ok(PointerKind::Erc721),
            2 => Ok(PointerKind::Native),
            3 => Ok(PointerKind::Cw20),
            4 => Ok(PointerKind::Cw721),
            other => Err(Error::UnsupportedPointerKind(other)),
        }
    }
}

impl FromStr for PointerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PointerKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownPointerKindName(s.to_string()))
    }
}

impl fmt::Display for PointerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        for (i, kind) in PointerKind::ALL.iter().enumerate() {
            assert_eq!(kind.as_i32(), i as i32);
            assert_eq!(PointerKind::try_from(i as i32).unwrap(), *kind);
        }
        assert!(matches!(
            PointerKind::try_from(999),
            Err(Error::UnsupportedPointerKind(999))
        ));
        assert!(PointerKind::try_from(-1).is_err());
    }

    #[test]
    fn test_spaces_are_opposite() {
        for kind in PointerKind::ALL {
            assert_ne!(kind.asset_space(), kind.pointer_space());
        }
        assert_eq!(PointerKind::Native.pointer_space().zero_value(), ZERO_EVM_ADDRESS_HEX);
        assert_eq!(PointerKind::Erc20.pointer_space().zero_value(), "");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("cw721".parse::<PointerKind>().unwrap(), PointerKind::Cw721);
        assert_eq!("NATIVE".parse::<PointerKind>().unwrap(), PointerKind::Native);
        assert!("erc1155".parse::<PointerKind>().is_err());
    }
}
