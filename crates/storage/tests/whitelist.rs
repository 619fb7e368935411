//! Property tests for whitelist enforcement through nested cache layers

use dualvm_storage::{MemStore, MultiStore, Result, Whitelist, WhitelistedStore};
use proptest::prelude::*;
use std::sync::Arc;

const PREFIX: &[u8] = b"balances/";

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..16).prop_map(|tail| {
            let mut key = PREFIX.to_vec();
            key.extend(tail);
            key
        }),
        proptest::collection::vec(any::<u8>(), 0..24),
    ]
}

/// Write `key` at the bottom of `depth` nested cache layers, flushing each on success
fn write_nested(store: &mut dyn MultiStore, key: &[u8], depth: usize) -> Result<()> {
    if depth == 0 {
        return store.kv_store("bank")?.set(key, vec![1]);
    }
    let mut layer = store.cache_multi_store();
    write_nested(&mut layer, key, depth - 1)?;
    layer.write()
}

proptest! {
    #[test]
    fn prop_write_allowed_iff_prefix_matches(key in key_strategy(), depth in 0usize..5) {
        let mut base = MemStore::new(["bank"]);
        let whitelist = Arc::new(Whitelist::new().allow("bank", [PREFIX]));
        let mut restricted = WhitelistedStore::new(&mut base, whitelist);

        let allowed = key.starts_with(PREFIX);
        let result = write_nested(&mut restricted, &key, depth);

        prop_assert_eq!(result.is_ok(), allowed);
        if let Err(err) = result {
            prop_assert!(err.is_access_violation());
        }
        drop(restricted);
        prop_assert_eq!(base.get("bank", &key).unwrap().is_some(), allowed);
    }
}
