//! Solidity ABI encoding for precompile calls and pointer constructor arguments.
//!
//! Only the types the bridge precompiles use are supported: `address`,
//! `uintN`, `bool`, `string`, `bytes`, dynamic arrays and tuples.

use alloy_primitives::ruint::UintTryFrom;
use alloy_primitives::{Address, B256, U256};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Errors decoding ABI data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// Input ended before a word or payload could be read
    #[error("input too short: need {needed} bytes at offset {offset}")]
    TooShort {
        /// Offset of the read
        offset: usize,
        /// Bytes required
        needed: usize,
    },

    /// Offset or length does not fit the input
    #[error("offset or length out of range")]
    OutOfRange,

    /// A `bool` word was neither 0 nor 1
    #[error("invalid bool encoding")]
    InvalidBool,

    /// A `string` payload was not UTF-8
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A decoded value did not have the requested type
    #[error("expected {0}")]
    UnexpectedType(&'static str),
}

/// A decoded or to-be-encoded ABI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `address`
    Address(Address),
    /// Any `uintN`
    Uint(U256),
    /// `bool`
    Bool(bool),
    /// `string`
    String(String),
    /// `bytes`
    Bytes(Vec<u8>),
    /// `T[]`
    Array(Vec<Token>),
    /// `(T1, T2, ...)`
    Tuple(Vec<Token>),
}

/// Type of a parameter to decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// `address`
    Address,
    /// Any `uintN`
    Uint,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// `T[]`
    Array(Box<ParamKind>),
    /// `(T1, T2, ...)`
    Tuple(Vec<ParamKind>),
}

impl ParamKind {
    fn is_dynamic(&self) -> bool {
        match self {
            ParamKind::String | ParamKind::Bytes | ParamKind::Array(_) => true,
            ParamKind::Tuple(items) => items.iter().any(ParamKind::is_dynamic),
            _ => false,
        }
    }

    fn head_len(&self) -> usize {
        match self {
            ParamKind::Tuple(items) if !self.is_dynamic() => {
                items.iter().map(ParamKind::head_len).sum()
            }
            _ => 32,
        }
    }
}

/// Keccak-256 hash
pub fn keccak256(data: impl AsRef<[u8]>) -> B256 {
    B256::from_slice(&Keccak256::digest(data.as_ref()))
}

/// Four-byte function selector of a canonical signature such as
/// `"balance(address,string)"`
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Split call data into selector and arguments
pub fn split_selector(input: &[u8]) -> Result<([u8; 4], &[u8]), AbiError> {
    if input.len() < 4 {
        return Err(AbiError::TooShort {
            offset: 0,
            needed: 4,
        });
    }
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&input[..4]);
    Ok((sel, &input[4..]))
}

impl Token {
    /// `uint` from a primitive
    pub fn uint<T>(value: T) -> Self
    where
        U256: UintTryFrom<T>,
    {
        Token::Uint(U256::from(value))
    }

    /// `string` from anything string-like
    pub fn string(value: impl Into<String>) -> Self {
        Token::String(value.into())
    }

    fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) | Token::Bytes(_) | Token::Array(_) => true,
            Token::Tuple(items) => items.iter().any(Token::is_dynamic),
            _ => false,
        }
    }

    fn head_len(&self) -> usize {
        match self {
            Token::Tuple(items) if !self.is_dynamic() => items.iter().map(Token::head_len).sum(),
            _ => 32,
        }
    }

    fn encode_static(&self, out: &mut Vec<u8>) {
        match self {
            Token::Address(addr) => {
                out.extend_from_slice(&[0u8; 12]);
                out.extend_from_slice(addr.as_slice());
            }
            Token::Uint(value) => out.extend_from_slice(&value.to_be_bytes::<32>()),
            Token::Bool(value) => out.extend_from_slice(&word(U256::from(*value as u8))),
            Token::Tuple(items) => out.extend(encode(items)),
            Token::String(_) | Token::Bytes(_) | Token::Array(_) => self.encode_tail(out),
        }
    }

    fn encode_tail(&self, out: &mut Vec<u8>) {
        match self {
            Token::String(s) => encode_packed_bytes(s.as_bytes(), out),
            Token::Bytes(b) => encode_packed_bytes(b, out),
            Token::Array(items) => {
                out.extend_from_slice(&word(U256::from(items.len())));
                out.extend(encode(items));
            }
            Token::Tuple(items) => out.extend(encode(items)),
            _ => self.encode_static(out),
        }
    }

    /// Take an address
    pub fn into_address(self) -> Result<Address, AbiError> {
        match self {
            Token::Address(a) => Ok(a),
            _ => Err(AbiError::UnexpectedType("address")),
        }
    }

    /// Take an unsigned integer
    pub fn into_uint(self) -> Result<U256, AbiError> {
        match self {
            Token::Uint(v) => Ok(v),
            _ => Err(AbiError::UnexpectedType("uint")),
        }
    }

    /// Take an unsigned integer that must fit in a `u64`
    pub fn into_u64(self) -> Result<u64, AbiError> {
        let value = self.into_uint()?;
        if value.bit_len() > 64 {
            return Err(AbiError::OutOfRange);
        }
        Ok(value.as_limbs()[0])
    }

    /// Take an unsigned integer that must fit in a `u128`
    pub fn into_u128(self) -> Result<u128, AbiError> {
        let value = self.into_uint()?;
        if value.bit_len() > 128 {
            return Err(AbiError::OutOfRange);
        }
        let limbs = value.as_limbs();
        Ok(limbs[0] as u128 | (limbs[1] as u128) << 64)
    }

    /// Take a bool
    pub fn into_bool(self) -> Result<bool, AbiError> {
        match self {
            Token::Bool(v) => Ok(v),
            _ => Err(AbiError::UnexpectedType("bool")),
        }
    }

    /// Take a string
    pub fn into_string(self) -> Result<String, AbiError> {
        match self {
            Token::String(s) => Ok(s),
            _ => Err(AbiError::UnexpectedType("string")),
        }
    }

    /// Take a byte string
    pub fn into_bytes(self) -> Result<Vec<u8>, AbiError> {
        match self {
            Token::Bytes(b) => Ok(b),
            _ => Err(AbiError::UnexpectedType("bytes")),
        }
    }
}

fn word(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

fn encode_packed_bytes(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&word(U256::from(data.len())));
    out.extend_from_slice(data);
    let pad = (32 - data.len() % 32) % 32;
    out.extend(std::iter::repeat(0u8).take(pad));
}

/// Encode a sequence of values as a tuple, the layout of call arguments and
/// return data
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = tokens.iter().map(Token::head_len).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&word(U256::from(head_len + tail.len())));
            token.encode_tail(&mut tail);
        } else {
            token.encode_static(&mut head);
        }
    }
    head.extend(tail);
    head
}

/// Selector followed by encoded arguments
pub fn encode_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut out = selector.to_vec();
    out.extend(encode(tokens));
    out
}

/// Decode values of the given kinds laid out as a tuple
pub fn decode(kinds: &[ParamKind], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode_tuple(kinds, data, 0)
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    data.get(offset..offset + 32).ok_or(AbiError::TooShort {
        offset,
        needed: 32,
    })
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let value = U256::from_be_slice(read_word(data, offset)?);
    if value > U256::from(data.len()) {
        return Err(AbiError::OutOfRange);
    }
    Ok(value.as_limbs()[0] as usize)
}

fn decode_tuple(kinds: &[ParamKind], data: &[u8], base: usize) -> Result<Vec<Token>, AbiError> {
    let mut tokens = Vec::with_capacity(kinds.len());
    let mut offset = base;
    for kind in kinds {
        if kind.is_dynamic() {
            let rel = read_usize(data, offset)?;
            tokens.push(decode_dynamic(kind, data, base + rel)?);
            offset += 32;
        } else {
            tokens.push(decode_static(kind, data, offset)?);
            offset += kind.head_len();
        }
    }
    Ok(tokens)
}

fn decode_static(kind: &ParamKind, data: &[u8], offset: usize) -> Result<Token, AbiError> {
    match kind {
        ParamKind::Address => {
            let w = read_word(data, offset)?;
            Ok(Token::Address(Address::from_slice(&w[12..])))
        }
        ParamKind::Uint => Ok(Token::Uint(U256::from_be_slice(read_word(data, offset)?))),
        ParamKind::Bool => match U256::from_be_slice(read_word(data, offset)?) {
            v if v == U256::ZERO => Ok(Token::Bool(false)),
            v if v == U256::from(1u8) => Ok(Token::Bool(true)),
            _ => Err(AbiError::InvalidBool),
        },
        ParamKind::Tuple(items) => Ok(Token::Tuple(decode_tuple(items, data, offset)?)),
        _ => decode_dynamic(kind, data, offset),
    }
}

fn decode_dynamic(kind: &ParamKind, data: &[u8], at: usize) -> Result<Token, AbiError> {
    match kind {
        ParamKind::String | ParamKind::Bytes => {
            let len = read_usize(data, at)?;
            let start = at + 32;
            let payload = data.get(start..start + len).ok_or(AbiError::TooShort {
                offset: start,
                needed: len,
            })?;
            if *kind == ParamKind::String {
                let s = std::str::from_utf8(payload).map_err(|_| AbiError::InvalidUtf8)?;
                Ok(Token::String(s.to_string()))
            } else {
                Ok(Token::Bytes(payload.to_vec()))
            }
        }
        ParamKind::Array(inner) => {
            let len = read_usize(data, at)?;
            if len.saturating_mul(inner.head_len()) > data.len() {
                return Err(AbiError::OutOfRange);
            }
            let kinds = vec![(**inner).clone(); len];
            Ok(Token::Array(decode_tuple(&kinds, data, at + 32)?))
        }
        ParamKind::Tuple(items) => Ok(Token::Tuple(decode_tuple(items, data, at)?)),
        _ => decode_static(kind, data, at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches_erc20_transfer() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn test_encode_string_layout() {
        let out = encode(&[Token::string("abc"), Token::uint(6u8)]);
        assert_eq!(out.len(), 32 * 4);
        // offset of the string tail
        assert_eq!(out[31], 0x40);
        assert_eq!(out[63], 6);
        assert_eq!(out[95], 3);
        assert_eq!(&out[96..99], b"abc");
        assert!(out[99..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_mixed_arguments() {
        let addr = Address::repeat_byte(0x11);
        let data = encode(&[
            Token::Address(addr),
            Token::string("udual"),
            Token::Array(vec![
                Token::Tuple(vec![Token::string("a"), Token::uint(1u8)]),
                Token::Tuple(vec![Token::string("b"), Token::uint(2u8)]),
            ]),
            Token::Bool(true),
        ]);
        let kinds = [
            ParamKind::Address,
            ParamKind::String,
            ParamKind::Array(Box::new(ParamKind::Tuple(vec![
                ParamKind::String,
                ParamKind::Uint,
            ]))),
            ParamKind::Bool,
        ];
        let tokens = decode(&kinds, &data).unwrap();
        assert_eq!(tokens[0], Token::Address(addr));
        assert_eq!(tokens[1], Token::string("udual"));
        match &tokens[2] {
            Token::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(tokens[3], Token::Bool(true));
    }

    #[test]
    fn test_uint_from_every_width() {
        assert_eq!(Token::uint(7u8), Token::Uint(U256::from(7u8)));
        assert_eq!(Token::uint(u16::MAX), Token::Uint(U256::from(65_535u64)));
        assert_eq!(Token::uint(u64::MAX), Token::Uint(U256::from(u64::MAX)));
        assert_eq!(
            Token::uint(u128::MAX).into_u128().unwrap(),
            u128::MAX
        );
        assert_eq!(Token::uint(U256::MAX), Token::Uint(U256::MAX));
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let data = encode(&[Token::string("hello world")]);
        assert!(decode(&[ParamKind::String], &data[..40]).is_err());
        assert!(decode(&[ParamKind::Uint], &[0u8; 16]).is_err());
        assert!(split_selector(&[1, 2]).is_err());
    }

    #[test]
    fn test_decode_rejects_huge_length() {
        let mut data = word(U256::from(32u8)).to_vec();
        data.extend_from_slice(&word(U256::MAX));
        assert_eq!(decode(&[ParamKind::Bytes], &data), Err(AbiError::OutOfRange));
    }
}
