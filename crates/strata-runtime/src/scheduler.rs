use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use strata_blocks::codec;
use strata_blocks::rotation::BlockRotation;
use strata_blocks::{BlockRegistry, config::BlocksConfig};
use strata_chunk::{Chunk, ChunkCoord, ChunkPayload, ChunkStore, MeshLevel, WorldParams};
use strata_edit::{BlockUpdateCache, EditError, LocalEdit};
use strata_geom::Vec3;
use thiserror::Error;

use crate::clock::{Clock, MonotonicClock};
use crate::events::{BlockUpdate, BlockUpdateListener, ChunkInitListener};
use crate::host::ChunkRenderer;
use crate::options::SchedulerOptions;
use crate::protocol::{ClientMessage, LoadRequest, ServerMessage, UnloadRequest, VoxelUpdate};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("INIT rejected: {0}")]
    Init(String),
}

/// Where a chunk coordinate is in its streaming lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkStatus {
    Unrequested,
    Queued,
    Requested,
    PayloadPending,
    Meshed,
    Added,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub tick: u64,
    pub resident: usize,
    pub queued: usize,
    pub requested: usize,
    pub pending: usize,
    pub added: usize,
    pub edits_queued: usize,
    pub payloads_meshed: u64,
    pub payloads_dropped: u64,
    pub chunks_evicted: u64,
    pub edits_sent: u64,
    pub edits_skipped: u64,
    pub updates_applied: u64,
    pub scans_interrupted: u64,
    pub mesh_passes_interrupted: u64,
}

#[derive(Debug)]
struct PendingPayload {
    payload: ChunkPayload,
    seq: u64,
}

/// Drives chunk requests, payload application and eviction around the
/// player, one budgeted step per `tick`. Messages for the server collect in
/// an outbox; server messages are fed in through `on_message`.
pub struct StreamingScheduler<C: Clock = MonotonicClock> {
    options: SchedulerOptions,
    registry: Arc<BlockRegistry>,
    store: ChunkStore,
    cache: BlockUpdateCache,
    clock: C,
    tick: u64,
    position: Vec3,
    direction: Vec3,
    center: ChunkCoord,
    // Requested coords and how many ticks ago they were asked for
    requested: HashMap<ChunkCoord, u32>,
    to_request: Vec<ChunkCoord>,
    queued: HashSet<ChunkCoord>,
    to_process: VecDeque<PendingPayload>,
    pending: HashSet<ChunkCoord>,
    urgent: Vec<ChunkPayload>,
    to_add: VecDeque<ChunkCoord>,
    added: HashSet<ChunkCoord>,
    // Mesh levels received before the chunk had both buffers
    unmeshed: HashMap<ChunkCoord, Vec<MeshLevel>>,
    edits: VecDeque<LocalEdit>,
    init_listeners: HashMap<ChunkCoord, Vec<ChunkInitListener>>,
    block_listeners: Vec<BlockUpdateListener>,
    outbox: Vec<ClientMessage>,
    scan_offsets: Vec<(i32, i32)>,
    scan_cursor: usize,
    next_seq: u64,
    stats: SchedulerStats,
}

impl StreamingScheduler<MonotonicClock> {
    pub fn new(options: SchedulerOptions, registry: Arc<BlockRegistry>, params: WorldParams) -> Self {
        Self::with_clock(options, registry, params, MonotonicClock)
    }
}

impl<C: Clock> StreamingScheduler<C> {
    pub fn with_clock(
        options: SchedulerOptions,
        registry: Arc<BlockRegistry>,
        params: WorldParams,
        clock: C,
    ) -> Self {
        let scan_offsets = scan_offsets(options.render_radius);
        Self {
            options,
            registry,
            store: ChunkStore::new(params),
            cache: BlockUpdateCache::new(),
            clock,
            tick: 0,
            position: Vec3::ZERO,
            direction: Vec3::ZERO,
            center: ChunkCoord::default(),
            requested: HashMap::new(),
            to_request: Vec::new(),
            queued: HashSet::new(),
            to_process: VecDeque::new(),
            pending: HashSet::new(),
            urgent: Vec::new(),
            to_add: VecDeque::new(),
            added: HashSet::new(),
            unmeshed: HashMap::new(),
            edits: VecDeque::new(),
            init_listeners: HashMap::new(),
            block_listeners: Vec::new(),
            outbox: Vec::new(),
            scan_offsets,
            scan_cursor: 0,
            next_seq: 0,
            stats: SchedulerStats::default(),
        }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &BlockUpdateCache {
        &self.cache
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn center(&self) -> ChunkCoord {
        self.center
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Calls `listener` once the chunk's first payload has been applied, or
    /// right away when the chunk is already resident.
    pub fn add_chunk_init_listener(&mut self, coord: ChunkCoord, listener: impl FnOnce(&Chunk) + 'static) {
        if let Some(chunk) = self.store.get(coord) {
            listener(chunk);
            return;
        }
        self.init_listeners
            .entry(coord)
            .or_default()
            .push(Box::new(listener));
    }

    /// Called for every voxel word change, server or local.
    pub fn add_block_update_listener(&mut self, listener: impl FnMut(&BlockUpdate) + 'static) {
        self.block_listeners.push(Box::new(listener));
    }

    pub fn set_render_radius(&mut self, radius: u32) {
        if radius == self.options.render_radius {
            return;
        }
        self.options.render_radius = radius;
        self.scan_offsets = scan_offsets(radius);
        self.scan_cursor = 0;
    }

    /// Client messages produced since the last call, oldest first.
    pub fn take_outbox(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub fn chunk_status(&self, coord: ChunkCoord) -> ChunkStatus {
        if self.added.contains(&coord) {
            ChunkStatus::Added
        } else if self.store.contains(coord) {
            ChunkStatus::Meshed
        } else if self.pending.contains(&coord) {
            ChunkStatus::PayloadPending
        } else if self.requested.contains_key(&coord) {
            ChunkStatus::Requested
        } else if self.queued.contains(&coord) {
            ChunkStatus::Queued
        } else {
            ChunkStatus::Unrequested
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            tick: self.tick,
            resident: self.store.len(),
            queued: self.queued.len(),
            requested: self.requested.len(),
            pending: self.pending.len(),
            added: self.added.len(),
            edits_queued: self.edits.len(),
            ..self.stats
        }
    }

    // --- server messages ---

    pub fn on_message(&mut self, msg: ServerMessage) -> Result<(), SchedulerError> {
        match msg {
            ServerMessage::Init { params, registry } => self.on_init(params, registry),
            ServerMessage::Load { chunks } => {
                for payload in chunks {
                    self.queue_payload(payload);
                }
                Ok(())
            }
            ServerMessage::Update { updates, chunks } => {
                for update in &updates {
                    self.apply_server_update(update);
                }
                self.urgent.extend(chunks);
                Ok(())
            }
        }
    }

    fn on_init(&mut self, params: WorldParams, cfg: BlocksConfig) -> Result<(), SchedulerError> {
        params
            .validate()
            .map_err(|e| SchedulerError::Init(e.to_string()))?;
        let registry =
            BlockRegistry::from_config(cfg).map_err(|e| SchedulerError::Init(e.to_string()))?;
        log::info!(
            target: "stream",
            "[tick {}] Init chunk_size={} max_height={} blocks={}",
            self.tick,
            params.chunk_size,
            params.max_height,
            registry.len()
        );
        self.registry = Arc::new(registry);
        self.store.reset(params);
        self.cache.clear();
        self.requested.clear();
        self.to_request.clear();
        self.queued.clear();
        self.to_process.clear();
        self.pending.clear();
        self.urgent.clear();
        self.to_add.clear();
        self.added.clear();
        self.unmeshed.clear();
        self.edits.clear();
        self.init_listeners.clear();
        self.scan_cursor = 0;
        Ok(())
    }

    fn queue_payload(&mut self, payload: ChunkPayload) {
        let coord = payload.coord();
        if !self.store.is_within_world(coord) {
            log::warn!(target: "stream", "[tick {}] payload {} is outside the world; dropped", self.tick, coord);
            self.stats.payloads_dropped += 1;
            return;
        }
        self.requested.remove(&coord);
        if self.queued.remove(&coord) {
            self.to_request.retain(|c| *c != coord);
        }
        self.to_process.retain(|p| p.payload.coord() != coord);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.to_process.push_back(PendingPayload { payload, seq });
        self.pending.insert(coord);
    }

    fn apply_server_update(&mut self, u: &VoxelUpdate) {
        let Some(chunk) = self.store.chunk_at(u.vx, u.vz) else {
            return;
        };
        let current = chunk.get_raw_value(u.vx, u.vy, u.vz);
        let current_light = chunk.get_raw_light(u.vx, u.vy, u.vz);
        let light = u.light.unwrap_or(current_light);
        if current == u.voxel && current_light == light {
            return;
        }
        let prev_id = codec::extract_id(current);
        if prev_id != codec::extract_id(u.voxel) {
            self.cache.record_previous((u.vx, u.vy, u.vz), prev_id);
        }
        self.store.set_raw_value(u.vx, u.vy, u.vz, u.voxel);
        self.store.set_raw_light(u.vx, u.vy, u.vz, light);
        self.stats.updates_applied += 1;
        if current != u.voxel {
            self.notify_block_update((u.vx, u.vy, u.vz), current, u.voxel);
        }
    }

    fn notify_block_update(&mut self, voxel: (i32, i32, i32), old_value: u32, new_value: u32) {
        let update = BlockUpdate {
            voxel,
            old_value,
            new_value,
        };
        for listener in &mut self.block_listeners {
            listener(&update);
        }
    }

    // --- local edits ---

    /// Validates and queues a local block placement. `Ok(false)` means the
    /// voxel already holds exactly this word.
    pub fn update_voxel(&mut self, edit: LocalEdit) -> Result<bool, EditError> {
        let max_height = self.store.params().max_height;
        if edit.vy < 0 || edit.vy as usize >= max_height {
            return Err(EditError::OutOfWorld {
                vy: edit.vy,
                max_height,
            });
        }
        let Some(block) = self.registry.get(edit.id) else {
            log::warn!(target: "stream", "[tick {}] edit with unknown block id {}", self.tick, edit.id);
            return Err(EditError::UnknownBlock(edit.id));
        };
        let rotation = if block.rotatable {
            edit.rotation.map(|r| {
                let y = if block.y_rotatable && r.y_rotation.is_finite() {
                    r.y_rotation
                } else {
                    0.0
                };
                BlockRotation::new(r.axis, y)
            })
        } else {
            None
        };
        let edit = LocalEdit { rotation, ..edit };
        let word = edit.packed()?;
        if self.store.get_raw_value(edit.vx, edit.vy, edit.vz) == word {
            return Ok(false);
        }
        self.edits.push_back(edit);
        Ok(true)
    }

    /// Queues several edits; returns how many were accepted.
    pub fn update_voxels(&mut self, edits: impl IntoIterator<Item = LocalEdit>) -> usize {
        let mut accepted = 0;
        for edit in edits {
            match self.update_voxel(edit) {
                Ok(true) => accepted += 1,
                Ok(false) => {}
                Err(e) => log::debug!(target: "stream", "[tick {}] edit skipped: {}", self.tick, e),
            }
        }
        accepted
    }

    // --- tick ---

    pub fn tick<R: ChunkRenderer + ?Sized>(&mut self, position: Vec3, renderer: &mut R) {
        self.tick_facing(position, Vec3::ZERO, renderer);
    }

    /// Like [`Self::tick`], but chunks outside a cone around the horizontal
    /// part of `direction` are not requested, except those within half the
    /// render radius. A zero direction disables the cone.
    pub fn tick_facing<R: ChunkRenderer + ?Sized>(&mut self, position: Vec3, direction: Vec3, renderer: &mut R) {
        log::trace!(target: "stream", "[tick {}] Tick", self.tick);
        self.position = position;
        self.direction = direction;
        let center = ChunkCoord::from_position(position.x, position.z, self.store.params().chunk_size);
        if center != self.center {
            log::info!(
                target: "stream",
                "[tick {}] ViewCenterChanged cc=({}, {})",
                self.tick,
                center.cx,
                center.cz
            );
            self.center = center;
            self.scan_cursor = 0;
        }

        self.process_urgent(renderer);
        for age in self.requested.values_mut() {
            *age = age.saturating_add(1);
        }
        if self.tick % 2 == 0 {
            self.scan_surroundings();
        } else {
            self.mesh_pass(renderer);
        }
        self.flush_requests();
        self.flush_adds(renderer);
        self.maintain(renderer);
        self.flush_edits();
        self.tick += 1;
    }

    fn process_urgent<R: ChunkRenderer + ?Sized>(&mut self, renderer: &mut R) {
        if self.urgent.is_empty() {
            return;
        }
        let urgent = std::mem::take(&mut self.urgent);
        for payload in &urgent {
            self.apply_payload(payload, renderer);
        }
    }

    fn scan_surroundings(&mut self) {
        if self.scan_cursor >= self.scan_offsets.len() {
            self.scan_cursor = 0;
        }
        let start = self.clock.now();
        let timeout = self.options.update_timeout();
        let rerequest = self.options.rerequest_ticks;
        let cone = self.view_cone();
        while self.scan_cursor < self.scan_offsets.len() {
            let (dx, dz) = self.scan_offsets[self.scan_cursor];
            self.scan_cursor += 1;
            let coord = self.center.offset(dx, dz);
            if self.store.is_within_world(coord)
                && self.in_view(coord, cone)
                && !self.store.contains(coord)
                && !self.pending.contains(&coord)
                && !self.queued.contains(&coord)
            {
                match self.requested.get(&coord) {
                    Some(&age) if age <= rerequest => {}
                    Some(_) => {
                        log::debug!(target: "stream", "[tick {}] re-requesting {}", self.tick, coord);
                        self.requested.remove(&coord);
                        self.enqueue(coord);
                    }
                    None => self.enqueue(coord),
                }
            }
            if self.clock.now().saturating_duration_since(start) > timeout {
                if self.scan_cursor < self.scan_offsets.len() {
                    self.stats.scans_interrupted += 1;
                    log::trace!(
                        target: "stream",
                        "[tick {}] scan paused at {}/{}",
                        self.tick,
                        self.scan_cursor,
                        self.scan_offsets.len()
                    );
                    return;
                }
                break;
            }
        }
        self.scan_cursor = 0;
    }

    /// Unit horizontal look direction and cone half-angle, if culling applies.
    fn view_cone(&self) -> Option<(f64, f64, f64)> {
        let (x, z) = (self.direction.x, self.direction.z);
        let len = (x * x + z * z).sqrt();
        if !len.is_finite() || len <= 0.0 {
            return None;
        }
        let loaded = self.store.len();
        let total = loaded + self.requested.len() + self.to_request.len() + self.to_process.len();
        let ratio = if total == 0 {
            0.0
        } else {
            loaded as f64 / total as f64
        };
        Some((x / len, z / len, self.options.view_angle(ratio)))
    }

    fn in_view(&self, coord: ChunkCoord, cone: Option<(f64, f64, f64)>) -> bool {
        let Some((dir_x, dir_z, half_angle)) = cone else {
            return true;
        };
        let near = i64::from(self.options.render_radius / 2);
        if coord.distance_sq(self.center) < near * near {
            return true;
        }
        let dx = f64::from(coord.cx) - f64::from(self.center.cx);
        let dz = f64::from(coord.cz) - f64::from(self.center.cz);
        let len = (dx * dx + dz * dz).sqrt();
        if len == 0.0 {
            return true;
        }
        let cos = ((dx * dir_x + dz * dir_z) / len).clamp(-1.0, 1.0);
        cos.acos() < half_angle
    }

    fn enqueue(&mut self, coord: ChunkCoord) {
        if self.queued.insert(coord) {
            self.to_request.push(coord);
        }
    }

    fn flush_requests(&mut self) {
        if self.to_request.is_empty() {
            return;
        }
        let center = self.center;
        self.to_request
            .sort_by_key(|c| (c.distance_sq(center), c.cx, c.cz));
        let mut budget = self.options.max_requests_per_tick;
        if !self.store.is_ready(center) {
            budget = budget.saturating_mul(self.options.bootstrap_request_multiplier.max(1));
        }
        let take = budget.min(self.to_request.len());
        let mut chunks = Vec::with_capacity(take);
        for coord in self.to_request.drain(..take) {
            self.queued.remove(&coord);
            if self.store.contains(coord) || self.pending.contains(&coord) {
                continue;
            }
            self.requested.insert(coord, 0);
            chunks.push(coord);
        }
        if chunks.is_empty() {
            return;
        }
        log::debug!(
            target: "stream",
            "[tick {}] Load requested={} remaining={}",
            self.tick,
            chunks.len(),
            self.to_request.len()
        );
        self.outbox.push(ClientMessage::Load {
            json: LoadRequest { center, chunks },
        });
    }

    fn mesh_pass<R: ChunkRenderer + ?Sized>(&mut self, renderer: &mut R) {
        if self.to_process.is_empty() {
            return;
        }
        let center = self.center;
        self.to_process
            .make_contiguous()
            .sort_by_key(|p| (p.payload.coord().distance_sq(center), p.seq));
        let start = self.clock.now();
        let timeout = self.options.update_timeout();
        let mut processed = 0;
        while processed < self.options.max_processes_per_tick {
            if processed > 0 && self.clock.now().saturating_duration_since(start) > timeout {
                self.stats.mesh_passes_interrupted += 1;
                break;
            }
            let Some(PendingPayload { payload, .. }) = self.to_process.pop_front() else {
                break;
            };
            let coord = payload.coord();
            self.pending.remove(&coord);
            self.apply_payload(&payload, renderer);
            processed += 1;
        }
    }

    /// Decodes one payload into the store and hands its geometry to the
    /// renderer once the chunk is ready. Failures drop the payload.
    fn apply_payload<R: ChunkRenderer + ?Sized>(&mut self, payload: &ChunkPayload, renderer: &mut R) {
        let coord = match self.store.apply_payload(payload) {
            Ok(coord) => coord,
            Err(e) => {
                log::warn!(target: "stream", "[tick {}] dropping payload {}: {}", self.tick, payload.id, e);
                self.stats.payloads_dropped += 1;
                self.requested.remove(&payload.coord());
                return;
            }
        };
        self.requested.remove(&coord);
        if let Some(listeners) = self.init_listeners.remove(&coord) {
            if let Some(chunk) = self.store.get(coord) {
                for listener in listeners {
                    listener(chunk);
                }
            }
        }

        let mut levels = self.unmeshed.remove(&coord).unwrap_or_default();
        for level in &payload.meshes {
            levels.retain(|l| l.level != level.level);
            levels.push(level.clone());
        }
        let Some(chunk) = self.store.get(coord).filter(|c| c.is_ready()) else {
            log::debug!(
                target: "stream",
                "[tick {}] {} is not ready; holding {} mesh levels",
                self.tick,
                coord,
                levels.len()
            );
            if !levels.is_empty() {
                self.unmeshed.insert(coord, levels);
            }
            return;
        };
        let mut meshed = Vec::with_capacity(levels.len());
        for level in &levels {
            if let Err(e) = renderer.build_mesh(chunk, level) {
                log::warn!(
                    target: "stream",
                    "[tick {}] mesh build failed for {} level {}: {}",
                    self.tick,
                    coord,
                    level.level,
                    e
                );
                continue;
            }
            let transparent = level.geometries.iter().any(|g| {
                self.registry
                    .get(codec::extract_id(g.voxel))
                    .is_some_and(|b| !b.is_opaque)
            });
            meshed.push((level.level, transparent));
        }
        if let Some(chunk) = self.store.get_mut(coord) {
            for (level, transparent) in meshed {
                chunk.mark_meshed(level, false);
                if transparent {
                    chunk.mark_meshed(level, true);
                }
            }
        }
        self.stats.payloads_meshed += 1;
        if !self.added.contains(&coord) && !self.to_add.contains(&coord) {
            self.to_add.push_back(coord);
        }
    }

    fn flush_adds<R: ChunkRenderer + ?Sized>(&mut self, renderer: &mut R) {
        let mut attached = 0;
        let mut deferred = Vec::new();
        while attached < self.options.max_adds_per_tick {
            let Some(coord) = self.to_add.pop_front() else {
                break;
            };
            if !self.store.contains(coord) || self.added.contains(&coord) {
                continue;
            }
            if !self.store.is_ready(coord) {
                deferred.push(coord);
                continue;
            }
            renderer.attach(coord);
            self.added.insert(coord);
            attached += 1;
        }
        self.to_add.extend(deferred);
        if attached > 0 {
            log::debug!(target: "stream", "[tick {}] Attached {} chunks", self.tick, attached);
        }
    }

    fn maintain<R: ChunkRenderer + ?Sized>(&mut self, renderer: &mut R) {
        let center = self.center;
        let limit = self.options.delete_radius();
        let limit_sq = limit * limit;
        let too_far = |c: &ChunkCoord| c.distance_sq(center) as f64 > limit_sq;

        let mut unload: Vec<ChunkCoord> = self
            .store
            .coords()
            .chain(self.requested.keys().copied())
            .chain(self.pending.iter().copied())
            .filter(too_far)
            .collect();
        unload.sort_unstable();
        unload.dedup();

        for &coord in &unload {
            if let Some(_chunk) = self.store.remove(coord) {
                renderer.dispose(coord);
            }
            self.added.remove(&coord);
            self.requested.remove(&coord);
            self.pending.remove(&coord);
            self.unmeshed.remove(&coord);
            self.init_listeners.remove(&coord);
        }
        if !unload.is_empty() {
            self.to_process.retain(|p| !too_far(&p.payload.coord()));
            self.to_add.retain(|c| !too_far(c));
            self.urgent.retain(|p| !too_far(&p.coord()));
        }
        // Queued coords were never sent, so they leave without an UNLOAD.
        if self.queued.iter().any(too_far) {
            self.queued.retain(|c| !too_far(c));
            self.to_request.retain(|c| !too_far(c));
        }

        if unload.is_empty() {
            return;
        }
        self.stats.chunks_evicted += unload.len() as u64;
        log::info!(target: "stream", "[tick {}] Unload count={}", self.tick, unload.len());
        self.outbox.push(ClientMessage::Unload {
            json: UnloadRequest { chunks: unload },
        });
    }

    fn flush_edits(&mut self) {
        if self.edits.is_empty() {
            return;
        }
        let take = self.options.max_updates_per_tick.min(self.edits.len());
        let batch: Vec<LocalEdit> = self.edits.drain(..take).collect();
        let mut updates = Vec::with_capacity(take);
        for edit in batch {
            let word = match edit.packed() {
                Ok(w) => w,
                Err(e) => {
                    log::warn!(target: "stream", "[tick {}] edit dropped: {}", self.tick, e);
                    continue;
                }
            };
            if self.store.chunk_at(edit.vx, edit.vz).is_none() {
                log::debug!(
                    target: "stream",
                    "[tick {}] edit at ({}, {}, {}) skipped: chunk not resident",
                    self.tick,
                    edit.vx,
                    edit.vy,
                    edit.vz
                );
                self.stats.edits_skipped += 1;
                continue;
            }
            let old = self.store.get_raw_value(edit.vx, edit.vy, edit.vz);
            self.cache.record_previous(edit.voxel(), codec::extract_id(old));
            self.store.set_raw_value(edit.vx, edit.vy, edit.vz, word);
            if old != word {
                self.notify_block_update(edit.voxel(), old, word);
            }
            updates.push(VoxelUpdate {
                vx: edit.vx,
                vy: edit.vy,
                vz: edit.vz,
                voxel: word,
                light: None,
            });
        }
        if updates.is_empty() {
            return;
        }
        self.stats.edits_sent += updates.len() as u64;
        self.outbox.push(ClientMessage::Update { updates });
    }
}

/// Chunk offsets within `radius`, nearest first.
fn scan_offsets(radius: u32) -> Vec<(i32, i32)> {
    let r = radius.min(i32::MAX as u32 / 2) as i32;
    let r_sq = i64::from(r) * i64::from(r);
    let mut out = Vec::new();
    for dx in -r..=r {
        for dz in -r..=r {
            let d = i64::from(dx) * i64::from(dx) + i64::from(dz) * i64::from(dz);
            if d <= r_sq {
                out.push((dx, dz));
            }
        }
    }
    out.sort_by_key(|&(dx, dz)| (i64::from(dx).pow(2) + i64::from(dz).pow(2), dx, dz));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_start_at_center() {
        let o = scan_offsets(2);
        assert_eq!(o[0], (0, 0));
        assert_eq!(o.len(), 13);
        assert!(o.windows(2).all(|w| {
            let a = w[0].0 * w[0].0 + w[0].1 * w[0].1;
            let b = w[1].0 * w[1].0 + w[1].1 * w[1].1;
            a <= b
        }));
    }

    #[test]
    fn zero_radius_scans_only_own_chunk() {
        assert_eq!(scan_offsets(0), vec![(0, 0)]);
    }
}
