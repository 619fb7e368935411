use std::collections::BTreeSet;

use dualvm_core::{Context, KeeperError, KeeperResult, WasmdKeeper, WasmdViewKeeper};
use dualvm_storage::partitions::WASM;
use dualvm_types::{Coin, NativeAddress};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{read, write};

const NEXT_INSTANCE_KEY: &str = "instances/next";

/// A stored contract instance. `state` is the JSON the contract was
/// instantiated or last migrated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    /// Code the instance runs
    pub code_id: u64,
    /// Instantiating account
    pub creator: NativeAddress,
    /// Account allowed to migrate
    pub admin: Option<NativeAddress>,
    /// Instance label
    pub label: String,
    /// Contract state as JSON
    pub state: Vec<u8>,
}

/// Contract instances under `contracts/{addr}`.
///
/// Smart queries answer `token_info` and `contract_info` from the stored
/// state; any other query returns the state itself. Executing a message that
/// carries a `"fail"` field errors.
#[derive(Debug)]
pub struct MockWasm {
    prefix: String,
    failing_codes: BTreeSet<u64>,
}

impl MockWasm {
    /// Contracts addressed under `prefix`
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            failing_codes: BTreeSet::new(),
        }
    }

    /// Make instantiation of `code_id` fail
    pub fn with_failing_code(mut self, code_id: u64) -> Self {
        self.failing_codes.insert(code_id);
        self
    }

    /// Stored instance, if any
    pub fn contract(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<Option<ContractInfo>> {
        read(ctx, WASM, &contract_key(addr))
    }

    /// Store an instance directly, bypassing instantiation
    pub fn register(&self, ctx: &mut Context<'_>, addr: &NativeAddress, info: &ContractInfo) -> KeeperResult<()> {
        write(ctx, WASM, &contract_key(addr), info)
    }

    /// Last message executed against a contract
    pub fn last_execution(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<Option<Vec<u8>>> {
        read(ctx, WASM, &format!("{}/exec", contract_key(addr)))
    }

    fn existing(&self, ctx: &Context<'_>, addr: &NativeAddress) -> KeeperResult<ContractInfo> {
        self.contract(ctx, addr)?
            .ok_or_else(|| KeeperError::NotFound(format!("contract {addr}")))
    }
}

fn contract_key(addr: &NativeAddress) -> String {
    format!("contracts/{addr}")
}

fn parse_json(bytes: &[u8]) -> KeeperResult<Value> {
    serde_json::from_slice(bytes).map_err(|e| KeeperError::InvalidRequest(e.to_string()))
}

fn to_json(value: &Value) -> KeeperResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| KeeperError::Contract(e.to_string()))
}

impl WasmdKeeper for MockWasm {
    fn instantiate(
        &self,
        ctx: &mut Context<'_>,
        code_id: u64,
        creator: &NativeAddress,
        admin: Option<&NativeAddress>,
        init_msg: &[u8],
        label: &str,
        _deposit: &[Coin],
    ) -> KeeperResult<(NativeAddress, Vec<u8>)> {
        if self.failing_codes.contains(&code_id) {
            return Err(KeeperError::Contract(format!("instantiate of code {code_id} failed")));
        }
        parse_json(init_msg)?;

        let instance: u64 = read(ctx, WASM, NEXT_INSTANCE_KEY)?.unwrap_or(1);
        write(ctx, WASM, NEXT_INSTANCE_KEY, &(instance + 1))?;

        let mut bytes = vec![0u8; 32];
        bytes[..8].copy_from_slice(&code_id.to_be_bytes());
        bytes[24..].copy_from_slice(&instance.to_be_bytes());
        let addr = NativeAddress::new(&self.prefix, bytes)?;

        let info = ContractInfo {
            code_id,
            creator: creator.clone(),
            admin: admin.cloned(),
            label: label.to_string(),
            state: init_msg.to_vec(),
        };
        write(ctx, WASM, &contract_key(&addr), &info)?;
        debug!(code_id, contract = %addr, "mock contract instantiated");
        Ok((addr, Vec::new()))
    }

    fn execute(
        &self,
        ctx: &mut Context<'_>,
        contract: &NativeAddress,
        _caller: &NativeAddress,
        msg: &[u8],
        _coins: &[Coin],
    ) -> KeeperResult<Vec<u8>> {
        self.existing(ctx, contract)?;
        let parsed = parse_json(msg)?;
        if parsed.get("fail").is_some() {
            return Err(KeeperError::Contract("execution failed".into()));
        }
        write(ctx, WASM, &format!("{}/exec", contract_key(contract)), &msg.to_vec())?;
        to_json(&json!({ "executed": true }))
    }

    fn migrate(
        &self,
        ctx: &mut Context<'_>,
        contract: &NativeAddress,
        caller: &NativeAddress,
        new_code_id: u64,
        msg: &[u8],
    ) -> KeeperResult<Vec<u8>> {
        let mut info = self.existing(ctx, contract)?;
        if info.admin.as_ref() != Some(caller) {
            return Err(KeeperError::Unauthorized(format!("{caller} is not admin of {contract}")));
        }
        let migrate_msg = parse_json(msg)?;
        let mut state = parse_json(&info.state)?;
        if let (Some(state), Some(update)) = (state.as_object_mut(), migrate_msg.as_object()) {
            for (k, v) in update {
                state.insert(k.clone(), v.clone());
            }
        }
        info.code_id = new_code_id;
        info.state = to_json(&state)?;
        write(ctx, WASM, &contract_key(contract), &info)?;
        Ok(Vec::new())
    }
}

impl WasmdViewKeeper for MockWasm {
    fn query_smart(&self, ctx: &Context<'_>, contract: &NativeAddress, req: &[u8]) -> KeeperResult<Vec<u8>> {
        let info = self.existing(ctx, contract)?;
        let query = parse_json(req)?;
        let state = parse_json(&info.state)?;
        let field = |name: &str, default: Value| state.get(name).cloned().unwrap_or(default);

        let response = if query.get("token_info").is_some() {
            json!({
                "name": field("name", Value::String(info.label.clone())),
                "symbol": field("symbol", Value::String("TKN".into())),
                "decimals": field("decimals", json!(6)),
                "total_supply": field("total_supply", Value::String("0".into())),
            })
        } else if query.get("contract_info").is_some() {
            json!({
                "name": field("name", Value::String(info.label.clone())),
                "symbol": field("symbol", Value::String("NFT".into())),
            })
        } else {
            state.clone()
        };
        to_json(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mock_address_pair, test_header, test_store, TEST_PREFIX};

    #[test]
    fn test_instantiate_query_migrate() {
        let mut store = test_store();
        let mut ctx = Context::new(&mut store, test_header());
        let wasm = MockWasm::new(TEST_PREFIX);
        let (admin, _) = mock_address_pair(9);

        let (addr, _) = wasm
            .instantiate(
                &mut ctx,
                5,
                &admin,
                Some(&admin),
                br#"{"name":"Dual Token","symbol":"DTK","decimals":8}"#,
                "dtk",
                &[],
            )
            .unwrap();
        assert!(addr.is_contract());

        let info: Value =
            serde_json::from_slice(&wasm.query_smart(&ctx, &addr, br#"{"token_info":{}}"#).unwrap())
                .unwrap();
        assert_eq!(info["symbol"], "DTK");
        assert_eq!(info["decimals"], 8);

        let (stranger, _) = mock_address_pair(3);
        assert!(matches!(
            wasm.migrate(&mut ctx, &addr, &stranger, 6, b"{}"),
            Err(KeeperError::Unauthorized(_))
        ));
        wasm.migrate(&mut ctx, &addr, &admin, 6, br#"{"symbol":"DTK2"}"#)
            .unwrap();
        assert_eq!(wasm.contract(&ctx, &addr).unwrap().unwrap().code_id, 6);
    }

    #[test]
    fn test_failing_code_and_execution() {
        let mut store = test_store();
        let mut ctx = Context::new(&mut store, test_header());
        let wasm = MockWasm::new(TEST_PREFIX).with_failing_code(7);
        let (creator, _) = mock_address_pair(1);

        assert!(wasm
            .instantiate(&mut ctx, 7, &creator, None, b"{}", "x", &[])
            .is_err());

        let (addr, _) = wasm
            .instantiate(&mut ctx, 1, &creator, None, b"{}", "x", &[])
            .unwrap();
        wasm.execute(&mut ctx, &addr, &creator, br#"{"transfer":{}}"#, &[])
            .unwrap();
        assert_eq!(
            wasm.last_execution(&ctx, &addr).unwrap(),
            Some(br#"{"transfer":{}}"#.to_vec())
        );
        assert!(wasm
            .execute(&mut ctx, &addr, &creator, br#"{"fail":1}"#, &[])
            .is_err());
    }
}
