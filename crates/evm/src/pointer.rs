//! Pointer upsert: deploy a pointer contract, or upgrade it in place.
//!
//! EVM-side pointers (NATIVE, CW20, CW721) are created from the artifact's
//! init code by the deployer module account. Native-side pointers (ERC20,
//! ERC721) are instantiated from stored wasm code. Either way the registry
//! pair is written in the same cache layer as the deployment, so a failed
//! upsert leaves no trace.

use alloy_primitives::Address;
use dualvm_core::Context;
use dualvm_types::{parse_evm_address, AddressSpace, DenomMetadata, NativeAddress, PointerKind};
use serde::Deserialize;
use tracing::{info, warn};

use crate::abi::{self, Token};
use crate::executor::EvmMessage;
use crate::keeper::EvmKeeper;
use crate::registry::{DeployError, PointerError, PointerRecord, Side};

/// Name and symbol reported by a CW20 `token_info` or CW721
/// `contract_info` query
#[derive(Debug, Deserialize)]
struct TokenInfo {
    name: String,
    symbol: String,
}

fn deploy_error(err: impl std::fmt::Display) -> PointerError {
    DeployError(err.to_string()).into()
}

impl EvmKeeper {
    /// Make sure `asset_key` has a pointer of `kind` at the current artifact
    /// version and return its address.
    ///
    /// Deploys if absent and upgrades in place if the recorded version is
    /// older. A record at the current or a newer version is returned as is.
    pub fn upsert_pointer(
        &self,
        ctx: &mut Context<'_>,
        kind: PointerKind,
        asset_key: &str,
    ) -> Result<String, PointerError> {
        let asset = self
            .registry()
            .normalize(kind, Side::Asset, asset_key)
            .ok_or_else(|| PointerError::InvalidAssetKey {
                kind,
                key: asset_key.to_string(),
            })?
            .canonical;
        let version = self.artifacts().version(kind);
        let existing = self.registry().pointer_record(ctx, kind, &asset)?;

        if let Some(record) = &existing {
            if record.version == version {
                return Ok(record.address.clone());
            }
            if record.version > version {
                warn!(
                    kind = %kind,
                    asset = %asset,
                    recorded = record.version,
                    artifact = version,
                    "recorded pointer is newer than the artifact; leaving it"
                );
                return Ok(record.address.clone());
            }
        }

        let address = ctx.run_cached(|inner| {
            let address = match kind.pointer_space() {
                AddressSpace::Evm => self.evm_pointer(inner, kind, &asset, existing.as_ref())?,
                AddressSpace::Native => self.wasm_pointer(inner, kind, &asset, existing.as_ref())?,
            };
            self.registry()
                .write_pointer(inner, kind, &asset, &address, version)?;
            Ok::<_, PointerError>(address)
        })?;

        match existing {
            Some(previous) => info!(
                kind = %kind,
                asset = %asset,
                pointer = %address,
                from = previous.version,
                to = version,
                "pointer upgraded"
            ),
            None => info!(kind = %kind, asset = %asset, pointer = %address, version, "pointer deployed"),
        }
        Ok(address)
    }

    fn constructor_args(
        &self,
        ctx: &Context<'_>,
        kind: PointerKind,
        asset: &str,
    ) -> Result<Vec<Token>, PointerError> {
        if kind == PointerKind::Native {
            let meta = self
                .bank
                .get_denom_metadata(ctx, asset)?
                .unwrap_or_else(|| DenomMetadata::fallback(asset));
            return Ok(vec![
                Token::string(asset),
                Token::String(meta.name),
                Token::String(meta.symbol),
                Token::uint(meta.decimals),
            ]);
        }

        let contract = NativeAddress::parse_with_prefix(asset, &self.params().bech32_prefix)?;
        if self
            .registry()
            .is_pointer(ctx, &[PointerKind::Erc20, PointerKind::Erc721], asset)?
        {
            return Err(deploy_error(format!("{asset} is itself a pointer")));
        }
        let query: &[u8] = if kind == PointerKind::Cw20 {
            br#"{"token_info":{}}"#
        } else {
            br#"{"contract_info":{}}"#
        };
        let raw = self
            .wasmd_view
            .query_smart(ctx, &contract, query)
            .map_err(deploy_error)?;
        let info: TokenInfo = serde_json::from_slice(&raw).map_err(deploy_error)?;
        Ok(vec![
            Token::string(asset),
            Token::String(info.name),
            Token::String(info.symbol),
        ])
    }

    fn evm_pointer(
        &self,
        ctx: &mut Context<'_>,
        kind: PointerKind,
        asset: &str,
        existing: Option<&PointerRecord>,
    ) -> Result<String, PointerError> {
        let artifact = self
            .artifacts()
            .evm(kind)
            .ok_or(PointerError::Unsupported(kind.as_i32()))?;
        let args = self.constructor_args(ctx, kind, asset)?;
        let mut init_code = artifact.init_code.to_vec();
        init_code.extend(abi::encode(&args));
        let msg = EvmMessage::create(self.params().deployer, init_code)
            .with_gas_limit(self.params().deploy_gas_limit);

        // An upgrade runs the init code without committing and keeps only
        // the runtime code it returns.
        let result = self
            .transact(ctx, &msg, existing.is_none())
            .map_err(deploy_error)?;
        if !result.success {
            return Err(deploy_error(
                result.error.unwrap_or_else(|| "execution failed".into()),
            ));
        }

        match existing {
            None => result
                .contract_address
                .map(|address| address.to_string())
                .ok_or_else(|| deploy_error("no contract address returned")),
            Some(record) => {
                let address: Address = parse_evm_address(&record.address)?;
                self.set_code(ctx, &address, &result.output)?;
                Ok(address.to_string())
            }
        }
    }

    fn wasm_pointer(
        &self,
        ctx: &mut Context<'_>,
        kind: PointerKind,
        asset: &str,
        existing: Option<&PointerRecord>,
    ) -> Result<String, PointerError> {
        let artifact = self
            .artifacts()
            .wasm(kind)
            .ok_or(PointerError::Unsupported(kind.as_i32()))?;
        let token = parse_evm_address(asset)?;
        if self.get_code(ctx, &token)?.is_none() {
            return Err(deploy_error(format!("{asset} has no code")));
        }
        if self.registry().is_pointer(
            ctx,
            &[PointerKind::Native, PointerKind::Cw20, PointerKind::Cw721],
            asset,
        )? {
            return Err(deploy_error(format!("{asset} is itself a pointer")));
        }

        let field = if kind == PointerKind::Erc20 {
            "erc20_address"
        } else {
            "erc721_address"
        };
        let mut body = serde_json::Map::new();
        body.insert(field.to_string(), asset.into());
        let msg = serde_json::to_vec(&body).map_err(deploy_error)?;
        let creator = self.deployer_native(ctx)?;

        match existing {
            None => {
                let label = format!("{kind} pointer for {asset}");
                let (contract, _) = self
                    .wasmd
                    .instantiate(
                        ctx,
                        artifact.code_id,
                        &creator,
                        Some(&creator),
                        &msg,
                        &label,
                        &[],
                    )
                    .map_err(deploy_error)?;
                Ok(contract.to_string())
            }
            Some(record) => {
                let contract =
                    NativeAddress::parse_with_prefix(&record.address, &self.params().bech32_prefix)?;
                self.wasmd
                    .migrate(ctx, &contract, &creator, artifact.code_id, &msg)
                    .map_err(deploy_error)?;
                Ok(contract.to_string())
            }
        }
    }
}
