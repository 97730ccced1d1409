//! The controller propagator: per-block asset state machine.
//!
//! Runs once per connected block, after the base indexer has resolved
//! addresses and rebuilt the live UTXO lists. All v10 creates are
//! processed first, then all v11 transfers, so a transfer can spend an
//! asset created earlier in the same block without touching disk; the
//! in-flight controller map and the staged-registry overlay carry that
//! same-block state. Every write is staged into the caller's batch and
//! commits atomically with the rest of the block.

use std::collections::{BTreeSet, HashMap, HashSet};

use primitive_types::U256;

use coordd_primitives::encoding::DecodeError;
use coordd_primitives::hash::{pack_txid, Hash256};
use coordd_primitives::tx::{AssetMetadata, Block, Tx};
use coordd_primitives::ChainParams;
use coordd_storage::{Column, KeyValueStore, StoreError, WriteBatch};

use crate::balance::{addr_asset_key, AddrAssetBalance, AddrAssetInfo, AssetBalanceIndex};
use crate::controller::{
    controller_from_parts, format_controller_outpoint, parse_controller_string,
};
use crate::history::{
    addr_history_key, global_history_key, pack_history_record, AssetHistory,
    HistoryAppendBuffer, HistoryVisitor,
};
use crate::registry::{registry_key, AssetRegistry, AssetRegistryEntry};
use crate::router::block_passes;
use crate::types::{AddrBalance, AddrDesc, BaseIndex, TxAddresses};
use crate::undo::{asset_undo_key, AssetBlockUndo, KeyUndo, UtxoTagUndo};

const DEFAULT_PRECISION: i32 = 8;

/// The tag a live UTXO carries: which asset, and whether this coin is the
/// asset's controller coin.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerInfo {
    pub controller: Vec<u8>,
    pub is_controller: bool,
}

struct AssetTxRecord {
    controller: Vec<u8>,
    btx_id: Hash256,
    indexes: Vec<i32>,
}

/// Per-block working state: the in-flight controller map, the registry
/// overlay of entries staged earlier in this block, the affected
/// (address, controller) work list, the accumulated history records, and
/// the undo snapshot.
#[derive(Default)]
struct ConnectCtx {
    op_map: HashMap<(Hash256, u32), ControllerInfo>,
    staged_registry: HashMap<Vec<u8>, AssetRegistryEntry>,
    affected: BTreeSet<(AddrDesc, Vec<u8>)>,
    history: Vec<AssetTxRecord>,
    undo: AssetBlockUndo,
    snapshotted: HashSet<Vec<u8>>,
}

pub struct AssetIndex<S> {
    params: &'static ChainParams,
    asset_aware: bool,
    store: S,
    registry: AssetRegistry<S>,
    balances: AssetBalanceIndex<S>,
    history: AssetHistory<S>,
}

impl<S: KeyValueStore + Clone> AssetIndex<S> {
    pub fn new(store: S, params: &'static ChainParams, asset_aware: bool) -> Self {
        Self {
            params,
            asset_aware,
            registry: AssetRegistry::new(store.clone()),
            balances: AssetBalanceIndex::new(store.clone()),
            history: AssetHistory::new(store.clone()),
            store,
        }
    }
}

impl<S: KeyValueStore> AssetIndex<S> {
    pub fn chain_params(&self) -> &'static ChainParams {
        self.params
    }

    /// Whether controller tags survive the address-balance round-trip in
    /// the backing store.
    pub fn is_asset_aware(&self) -> bool {
        self.asset_aware
    }

    // ── read path ─────────────────────────────────────────────────────

    pub fn registry_entry(
        &self,
        controller: &[u8],
    ) -> Result<Option<AssetRegistryEntry>, StoreError> {
        self.registry.get(controller)
    }

    pub fn resolve_current_controller(&self, controller: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.registry.resolve_current(controller)
    }

    pub fn addr_asset_balance(
        &self,
        addr_desc: &[u8],
        controller: &[u8],
    ) -> Result<Option<AddrAssetBalance>, StoreError> {
        self.balances.get(addr_desc, controller)
    }

    pub fn addr_assets(&self, addr_desc: &[u8]) -> Result<Vec<AddrAssetInfo>, StoreError> {
        self.balances.assets(addr_desc)
    }

    pub fn asset_transactions(
        &self,
        controller: &[u8],
        lower: u32,
        higher: u32,
        visitor: &mut HistoryVisitor<'_>,
    ) -> Result<(), StoreError> {
        self.history
            .for_each_asset_tx(controller, lower, higher, visitor)
    }

    pub fn addr_asset_transactions(
        &self,
        addr_desc: &[u8],
        controller: &[u8],
        lower: u32,
        higher: u32,
        visitor: &mut HistoryVisitor<'_>,
    ) -> Result<(), StoreError> {
        self.history
            .for_each_addr_asset_tx(addr_desc, controller, lower, higher, visitor)
    }

    pub fn format_controller_outpoint(&self, controller: &[u8]) -> String {
        format_controller_outpoint(controller)
    }

    pub fn parse_controller_string(&self, s: &str) -> Result<Option<Vec<u8>>, StoreError> {
        parse_controller_string(s).map_err(decode_err)
    }

    // ── connect ───────────────────────────────────────────────────────

    /// Runs the asset passes over one block, mutating the live UTXO tags
    /// in `balances` and staging every index write plus the block's undo
    /// record into `batch`. The caller commits.
    pub fn connect_block<B: BaseIndex>(
        &self,
        block: &Block,
        tx_addresses: &HashMap<Hash256, TxAddresses>,
        balances: &mut HashMap<AddrDesc, AddrBalance>,
        base: &B,
        batch: &mut WriteBatch,
    ) -> Result<(), StoreError> {
        let mut ctx = ConnectCtx::default();
        let passes = block_passes(block);

        for position in &passes.creates {
            self.connect_create(&block.txs[*position], tx_addresses, balances, base, batch, &mut ctx)?;
        }
        for position in &passes.transfers {
            self.connect_transfer(&block.txs[*position], tx_addresses, balances, base, &mut ctx)?;
        }
        self.persist_block(block.height, tx_addresses, balances, batch, &mut ctx)?;

        if !ctx.undo.is_empty() {
            batch.put(
                Column::AssetUndo,
                asset_undo_key(block.height),
                ctx.undo.encode(),
            );
        }
        Ok(())
    }

    /// Phase 1: v10 ASSET_CREATE.
    fn connect_create<B: BaseIndex>(
        &self,
        tx: &Tx,
        tx_addresses: &HashMap<Hash256, TxAddresses>,
        balances: &mut HashMap<AddrDesc, AddrBalance>,
        base: &B,
        batch: &mut WriteBatch,
        ctx: &mut ConnectCtx,
    ) -> Result<(), StoreError> {
        if tx.vout.len() < 2 {
            return Ok(());
        }

        let btx_id = pack_txid(&tx.txid).map_err(decode_err)?;
        let new_ctrl = controller_from_parts(&btx_id, 0);
        let ta = tx_addresses.get(&btx_id);

        // Scan inputs: the first spent controller coin marks mint-more.
        // Every spent tag is snapshotted for disconnect, and supply coins
        // being consumed keep their old identity on the work list.
        let mut old_ctrl: Option<Vec<u8>> = None;
        for (i, vin) in tx.vin.iter().enumerate() {
            if vin.txid.is_empty() {
                continue;
            }
            let Ok(spent_btx_id) = pack_txid(&vin.txid) else {
                continue;
            };
            let Some(info) =
                self.resolve_input(&spent_btx_id, vin.vout, tx_addresses, base, ctx)?
            else {
                continue;
            };
            if let Some(io) = ta.and_then(|ta| ta.inputs.get(i)) {
                if !io.addr_desc.is_empty() {
                    ctx.undo.tags.push(UtxoTagUndo {
                        addr_desc: io.addr_desc.clone(),
                        btx_id: spent_btx_id,
                        vout: vin.vout,
                        controller: info.controller.clone(),
                        is_controller: info.is_controller,
                    });
                    ctx.affected
                        .insert((io.addr_desc.clone(), info.controller.clone()));
                }
            }
            if old_ctrl.is_none() && info.is_controller {
                old_ctrl = Some(info.controller);
            }
        }

        // Vout[0] is the controller coin, Vout[1] the supply.
        tag_utxo_controller(balances, tx_addresses, &btx_id, 0, &new_ctrl, true);
        tag_utxo_controller(balances, tx_addresses, &btx_id, 1, &new_ctrl, false);
        ctx.op_map.insert(
            (btx_id, 0),
            ControllerInfo {
                controller: new_ctrl.clone(),
                is_controller: true,
            },
        );
        ctx.op_map.insert(
            (btx_id, 1),
            ControllerInfo {
                controller: new_ctrl.clone(),
                is_controller: false,
            },
        );

        if let Some(ta) = ta {
            for io in ta.outputs.iter().take(2) {
                if !io.addr_desc.is_empty() {
                    ctx.affected.insert((io.addr_desc.clone(), new_ctrl.clone()));
                }
            }
        }

        ctx.history.push(AssetTxRecord {
            controller: new_ctrl.clone(),
            btx_id,
            indexes: vec![0, 1],
        });

        let supply = tx.vout[1].value_sat;
        let mut entry = AssetRegistryEntry {
            current_controller: new_ctrl.clone(),
            precision: DEFAULT_PRECISION,
            ..Default::default()
        };

        if matches!(&old_ctrl, Some(old) if *old == new_ctrl) {
            coordd_log::log_warn!(
                "refusing self redirect at {}",
                format_controller_outpoint(&new_ctrl),
            );
        }
        match old_ctrl.take().filter(|old| *old != new_ctrl) {
            Some(old) => {
                // Mint-more: carry metadata forward, extend the supply,
                // and leave a redirect tombstone at the old identity.
                let old_entry = match ctx.staged_registry.get(&old) {
                    Some(staged) => Some(staged.clone()),
                    None => self.registry.get(&old)?,
                };
                match old_entry.filter(|e| !e.is_redirect) {
                    Some(old_entry) => {
                        entry.ticker = old_entry.ticker;
                        entry.headline = old_entry.headline;
                        entry.precision = old_entry.precision;
                        entry.asset_type = old_entry.asset_type;
                        entry.total_supply = old_entry.total_supply.saturating_add(supply);
                    }
                    None => entry.total_supply = supply,
                }
                let redirect = AssetRegistryEntry::redirect_to(new_ctrl.clone());
                self.stage_registry_put(batch, ctx, &old, redirect)?;
                coordd_log::log_debug!(
                    "asset mint-more {} -> {}",
                    format_controller_outpoint(&old),
                    format_controller_outpoint(&new_ctrl),
                );
            }
            None => {
                entry.total_supply = supply;
                if let Some(raw) = &tx.coin_specific_data {
                    if let Some(metadata) = AssetMetadata::from_coin_specific_data(raw) {
                        apply_metadata(&mut entry, metadata);
                    }
                }
                coordd_log::log_debug!(
                    "asset create {} ticker {:?}",
                    format_controller_outpoint(&new_ctrl),
                    entry.ticker,
                );
            }
        }

        self.stage_registry_put(batch, ctx, &new_ctrl, entry)
    }

    /// Phase 2: v11 ASSET_TRANSFER.
    fn connect_transfer<B: BaseIndex>(
        &self,
        tx: &Tx,
        tx_addresses: &HashMap<Hash256, TxAddresses>,
        balances: &mut HashMap<AddrDesc, AddrBalance>,
        base: &B,
        ctx: &mut ConnectCtx,
    ) -> Result<(), StoreError> {
        let btx_id = pack_txid(&tx.txid).map_err(decode_err)?;
        let ta = tx_addresses.get(&btx_id);

        let mut asset_total = U256::zero();
        let mut controller: Option<Vec<u8>> = None;

        for (i, vin) in tx.vin.iter().enumerate() {
            if vin.txid.is_empty() {
                continue;
            }
            let Ok(spent_btx_id) = pack_txid(&vin.txid) else {
                continue;
            };
            let Some(info) =
                self.resolve_input(&spent_btx_id, vin.vout, tx_addresses, base, ctx)?
            else {
                continue;
            };
            if info.is_controller {
                // Controller coins contribute identity, not value.
                if controller.is_none() {
                    controller = Some(info.controller.clone());
                }
            } else {
                if let Some(io) = ta.and_then(|ta| ta.inputs.get(i)) {
                    asset_total = asset_total.saturating_add(io.value_sat);
                }
                if controller.is_none() {
                    controller = Some(info.controller.clone());
                }
            }
            if let Some(io) = ta.and_then(|ta| ta.inputs.get(i)) {
                if !io.addr_desc.is_empty() {
                    ctx.undo.tags.push(UtxoTagUndo {
                        addr_desc: io.addr_desc.clone(),
                        btx_id: spent_btx_id,
                        vout: vin.vout,
                        controller: info.controller.clone(),
                        is_controller: info.is_controller,
                    });
                    ctx.affected
                        .insert((io.addr_desc.clone(), info.controller.clone()));
                }
            }
        }

        let Some(controller) = controller else {
            return Ok(());
        };
        if asset_total.is_zero() {
            return Ok(());
        }

        let resolved = self
            .registry
            .resolve_current_with_overlay(&controller, |c| ctx.staged_registry.get(c).cloned())?;

        // Fill outputs in index order until the input total is consumed;
        // the output whose prefix sum reaches the total is the last one
        // tagged. If the outputs never reach the total, they all tag.
        let mut filled = U256::zero();
        let mut filled_indexes: Vec<i32> = Vec::new();
        for (i, vout) in tx.vout.iter().enumerate() {
            if filled >= asset_total {
                break;
            }
            tag_utxo_controller(balances, tx_addresses, &btx_id, i as i32, &resolved, false);
            ctx.op_map.insert(
                (btx_id, i as u32),
                ControllerInfo {
                    controller: resolved.clone(),
                    is_controller: false,
                },
            );
            filled_indexes.push(i as i32);
            if let Some(io) = ta.and_then(|ta| ta.outputs.get(i)) {
                if !io.addr_desc.is_empty() {
                    ctx.affected.insert((io.addr_desc.clone(), resolved.clone()));
                }
            }
            filled = filled.saturating_add(vout.value_sat);
        }

        coordd_log::log_debug!(
            "asset transfer {} fills {} outputs",
            format_controller_outpoint(&resolved),
            filled_indexes.len(),
        );
        ctx.history.push(AssetTxRecord {
            controller: resolved,
            btx_id,
            indexes: filled_indexes,
        });
        Ok(())
    }

    /// Phase 3: balances and history for everything the block touched.
    fn persist_block(
        &self,
        height: u32,
        tx_addresses: &HashMap<Hash256, TxAddresses>,
        balances: &HashMap<AddrDesc, AddrBalance>,
        batch: &mut WriteBatch,
        ctx: &mut ConnectCtx,
    ) -> Result<(), StoreError> {
        let affected = std::mem::take(&mut ctx.affected);
        for (addr_desc, controller) in &affected {
            let mut asset_balance = U256::zero();
            if let Some(balance) = balances.get(addr_desc) {
                for utxo in &balance.utxos {
                    if utxo.vout >= 0 && utxo.controller == *controller && !utxo.is_controller {
                        asset_balance = asset_balance.saturating_add(utxo.value_sat);
                    }
                }
            }

            let mut entry = AddrAssetBalance {
                balance_sat: asset_balance,
                ..Default::default()
            };
            match self.balances.get(addr_desc, controller)? {
                Some(existing) => {
                    entry.txs = existing.txs + 1;
                    entry.sent_sat = existing.sent_sat;
                }
                None => entry.txs = 1,
            }

            let key = addr_asset_key(addr_desc, controller);
            self.snapshot_key(ctx, &key)?;
            batch.put(Column::AssetIndex, key, entry.encode());
        }

        let mut buffer = HistoryAppendBuffer::new();
        for record in &ctx.history {
            let value = pack_history_record(&record.btx_id, &record.indexes);
            buffer.append(global_history_key(&record.controller, height), &value);

            let Some(ta) = tx_addresses.get(&record.btx_id) else {
                continue;
            };
            let mut seen: HashSet<&[u8]> = HashSet::new();
            for index in &record.indexes {
                if let Some(io) = ta.outputs.get(*index as usize) {
                    if !io.addr_desc.is_empty() && seen.insert(&io.addr_desc) {
                        buffer.append(
                            addr_history_key(&io.addr_desc, &record.controller, height),
                            &value,
                        );
                    }
                }
            }
            for io in &ta.inputs {
                if !io.addr_desc.is_empty() && seen.insert(&io.addr_desc) {
                    buffer.append(
                        addr_history_key(&io.addr_desc, &record.controller, height),
                        &value,
                    );
                }
            }
        }

        // One put per key: prior on-disk value plus everything this block
        // appended under it.
        for (key, appended) in buffer.entries() {
            let prior = self.store.get(Column::AssetIndex, key)?;
            if ctx.snapshotted.insert(key.clone()) {
                ctx.undo.keys.push(KeyUndo {
                    key: key.clone(),
                    prior: prior.clone(),
                });
            }
            let mut combined = prior.unwrap_or_default();
            combined.extend_from_slice(appended);
            batch.put(Column::AssetIndex, key.clone(), combined);
        }
        Ok(())
    }

    // ── disconnect ────────────────────────────────────────────────────

    /// Reverts one block's asset writes from its undo record and re-tags
    /// the UTXOs the base indexer restored into `balances`. A height
    /// without a record is a no-op.
    pub fn disconnect_block(
        &self,
        height: u32,
        balances: &mut HashMap<AddrDesc, AddrBalance>,
        batch: &mut WriteBatch,
    ) -> Result<(), StoreError> {
        let undo_key = asset_undo_key(height);
        let Some(bytes) = self.store.get(Column::AssetUndo, &undo_key)? else {
            return Ok(());
        };
        let undo = AssetBlockUndo::decode(&bytes).map_err(decode_err)?;

        for entry in &undo.keys {
            match &entry.prior {
                Some(value) => batch.put(Column::AssetIndex, entry.key.clone(), value.clone()),
                None => batch.delete(Column::AssetIndex, entry.key.clone()),
            }
        }
        for tag in &undo.tags {
            let Some(balance) = balances.get_mut(&tag.addr_desc) else {
                continue;
            };
            for utxo in &mut balance.utxos {
                if utxo.vout == tag.vout as i32 && utxo.btx_id == tag.btx_id {
                    utxo.controller = tag.controller.clone();
                    utxo.is_controller = tag.is_controller;
                    break;
                }
            }
        }
        batch.delete(Column::AssetUndo, undo_key);
        coordd_log::log_debug!(
            "asset disconnect height {height}: {} keys, {} tags",
            undo.keys.len(),
            undo.tags.len(),
        );
        Ok(())
    }

    // ── helpers ───────────────────────────────────────────────────────

    /// Resolves a spent input's controller tag: the in-flight map first,
    /// then the spent-controller lookup. Unresolvable inputs are native.
    fn resolve_input<B: BaseIndex>(
        &self,
        btx_id: &Hash256,
        vout: u32,
        tx_addresses: &HashMap<Hash256, TxAddresses>,
        base: &B,
        ctx: &ConnectCtx,
    ) -> Result<Option<ControllerInfo>, StoreError> {
        if let Some(info) = ctx.op_map.get(&(*btx_id, vout)) {
            if info.controller.is_empty() {
                return Ok(None);
            }
            return Ok(Some(info.clone()));
        }
        self.lookup_spent_controller(btx_id, vout, tx_addresses, base)
    }

    /// The sole disk read on the hot path: fetches the spent output's
    /// address, then its on-disk balance, and returns the tag of the
    /// matching live UTXO. The spent coin is already gone from the
    /// in-memory balances, but the on-disk copy still holds it until the
    /// block commits.
    fn lookup_spent_controller<B: BaseIndex>(
        &self,
        btx_id: &Hash256,
        vout: u32,
        tx_addresses: &HashMap<Hash256, TxAddresses>,
        base: &B,
    ) -> Result<Option<ControllerInfo>, StoreError> {
        let fetched;
        let ta = match tx_addresses.get(btx_id) {
            Some(ta) => ta,
            None => match base.tx_addresses(btx_id)? {
                Some(ta) => {
                    fetched = ta;
                    &fetched
                }
                None => return Ok(None),
            },
        };
        let Some(output) = ta.outputs.get(vout as usize) else {
            return Ok(None);
        };
        if output.addr_desc.is_empty() {
            return Ok(None);
        }
        let Some(balance) = base.addr_balance(&output.addr_desc)? else {
            return Ok(None);
        };
        for utxo in &balance.utxos {
            if utxo.vout == vout as i32 && utxo.btx_id == *btx_id {
                if utxo.controller.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(ControllerInfo {
                    controller: utxo.controller.clone(),
                    is_controller: utxo.is_controller,
                }));
            }
        }
        Ok(None)
    }

    /// Stages a registry put, snapshotting the prior on-disk value for
    /// undo and recording the entry in the same-block overlay.
    fn stage_registry_put(
        &self,
        batch: &mut WriteBatch,
        ctx: &mut ConnectCtx,
        controller: &[u8],
        entry: AssetRegistryEntry,
    ) -> Result<(), StoreError> {
        let key = registry_key(controller);
        self.snapshot_key(ctx, &key)?;
        batch.put(Column::AssetIndex, key, entry.encode());
        ctx.staged_registry.insert(controller.to_vec(), entry);
        Ok(())
    }

    /// Records a key's pre-block value the first time the block stages a
    /// write under it.
    fn snapshot_key(&self, ctx: &mut ConnectCtx, key: &[u8]) -> Result<(), StoreError> {
        if !ctx.snapshotted.insert(key.to_vec()) {
            return Ok(());
        }
        let prior = self.store.get(Column::AssetIndex, key)?;
        ctx.undo.keys.push(KeyUndo {
            key: key.to_vec(),
            prior,
        });
        Ok(())
    }
}

/// Attaches a controller tag to the live UTXO `(btx_id, vout)` in the
/// balances map, located through the transaction's resolved output
/// address. Outputs without an address or a live balance are skipped.
fn tag_utxo_controller(
    balances: &mut HashMap<AddrDesc, AddrBalance>,
    tx_addresses: &HashMap<Hash256, TxAddresses>,
    btx_id: &Hash256,
    vout: i32,
    controller: &[u8],
    is_controller: bool,
) {
    let Some(ta) = tx_addresses.get(btx_id) else {
        return;
    };
    let Some(output) = ta.outputs.get(vout as usize) else {
        return;
    };
    if output.addr_desc.is_empty() {
        return;
    }
    let Some(balance) = balances.get_mut(&output.addr_desc) else {
        return;
    };
    for utxo in &mut balance.utxos {
        if utxo.vout == vout && utxo.btx_id == *btx_id {
            utxo.controller = controller.to_vec();
            utxo.is_controller = is_controller;
            return;
        }
    }
}

/// Applies v10 metadata to a fresh registry entry. Empty strings and
/// non-positive precision leave the defaults in place; the asset type is
/// taken as-is.
fn apply_metadata(entry: &mut AssetRegistryEntry, metadata: AssetMetadata) {
    if !metadata.ticker.is_empty() {
        entry.ticker = metadata.ticker;
    }
    if !metadata.headline.is_empty() {
        entry.headline = metadata.headline;
    }
    if metadata.precision > 0 {
        entry.precision = metadata.precision;
    }
    entry.asset_type = metadata.asset_type;
}

fn decode_err(err: DecodeError) -> StoreError {
    StoreError::Backend(err.to_string())
}
