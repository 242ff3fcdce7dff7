use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashSet;
use strata_blocks::BlockRegistry;
use strata_blocks::codec;
use strata_blocks::config::{BlockDef, BlocksConfig};
use strata_blocks::rotation::BlockRotation;
use strata_chunk::{
    Chunk, ChunkCoord, ChunkPayload, GeometryData, MeshLevel, WorldParams, encode_words,
};
use strata_edit::{EditError, LocalEdit};
use strata_geom::Vec3;
use strata_runtime::host::RenderError;
use strata_runtime::{
    BlockUpdate, ChunkRenderer, ChunkStatus, ClientMessage, ManualClock, SchedulerError,
    SchedulerOptions, ServerMessage, StreamingScheduler, VoxelUpdate,
};

const SIZE: usize = 4;

#[derive(Default)]
struct RecordingRenderer {
    meshed: Vec<(ChunkCoord, usize)>,
    attached: Vec<ChunkCoord>,
    disposed: Vec<ChunkCoord>,
    fail_level: Option<usize>,
}

impl ChunkRenderer for RecordingRenderer {
    fn build_mesh(&mut self, chunk: &Chunk, level: &MeshLevel) -> Result<(), RenderError> {
        if self.fail_level == Some(level.level) {
            return Err("gpu upload failed".into());
        }
        self.meshed.push((chunk.coord, level.level));
        Ok(())
    }

    fn attach(&mut self, coord: ChunkCoord) {
        self.attached.push(coord);
    }

    fn dispose(&mut self, coord: ChunkCoord) {
        self.disposed.push(coord);
    }
}

fn params() -> WorldParams {
    WorldParams {
        chunk_size: SIZE,
        max_height: 8,
        sub_chunks: 2,
        ..WorldParams::default()
    }
}

fn blocks() -> BlocksConfig {
    let mut air = BlockDef::new(0, "air");
    air.is_empty = true;
    let mut glass = BlockDef::new(2, "glass");
    glass.is_opaque = false;
    let mut slab = BlockDef::new(3, "slab");
    slab.rotatable = true;
    BlocksConfig {
        blocks: vec![air, BlockDef::new(1, "stone"), glass, slab],
        ..BlocksConfig::default()
    }
}

fn registry() -> Arc<BlockRegistry> {
    Arc::new(BlockRegistry::from_config(blocks()).unwrap())
}

fn options(radius: u32) -> SchedulerOptions {
    SchedulerOptions {
        render_radius: radius,
        ..SchedulerOptions::default()
    }
}

fn scheduler(opts: SchedulerOptions, p: WorldParams) -> StreamingScheduler<ManualClock> {
    StreamingScheduler::with_clock(opts, registry(), p, ManualClock::new())
}

fn payload(c: ChunkCoord, fill: u32) -> ChunkPayload {
    let volume = params().chunk_volume();
    ChunkPayload::new(c).with_buffers(&vec![fill; volume], &vec![0; volume])
}

/// World position in the middle of chunk `c`.
fn at(c: ChunkCoord) -> Vec3 {
    let center = c.center(SIZE);
    Vec3::new(center.x, 4.0, center.y)
}

fn loads(out: &[ClientMessage]) -> Vec<Vec<ChunkCoord>> {
    out.iter()
        .filter_map(|m| match m {
            ClientMessage::Load { json } => Some(json.chunks.clone()),
            _ => None,
        })
        .collect()
}

fn unloads(out: &[ClientMessage]) -> Vec<ChunkCoord> {
    out.iter()
        .filter_map(|m| match m {
            ClientMessage::Unload { json } => Some(json.chunks.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn bounded_world() -> WorldParams {
    WorldParams {
        min_chunk: [-2, -1],
        max_chunk: [2, 2],
        ..params()
    }
}

fn world_coords() -> Vec<ChunkCoord> {
    (-2..=2)
        .flat_map(|x| (-1..=2).map(move |z| ChunkCoord::new(x, z)))
        .collect()
}

#[test]
fn request_budget_covers_missing_chunks_in_five_ticks() {
    let opts = SchedulerOptions {
        max_requests_per_tick: 4,
        bootstrap_request_multiplier: 1,
        ..options(3)
    };
    let mut s = scheduler(opts, bounded_world());
    let mut r = RecordingRenderer::default();
    let origin = at(ChunkCoord::new(0, 0));
    let mut out = Vec::new();
    for _ in 0..5 {
        s.tick(origin, &mut r);
        out.extend(s.take_outbox());
    }
    let batches = loads(&out);
    assert_eq!(batches.len(), 5);
    assert!(batches.iter().all(|b| b.len() <= 4));
    assert_eq!(batches[0][0], ChunkCoord::new(0, 0));
    let sent: HashSet<ChunkCoord> = batches.into_iter().flatten().collect();
    assert_eq!(sent.len(), 20);
    for c in world_coords() {
        assert_eq!(s.chunk_status(c), ChunkStatus::Requested, "{c}");
    }
    // Outside the world bounds
    assert_eq!(s.chunk_status(ChunkCoord::new(3, 0)), ChunkStatus::Unrequested);
}

#[test]
fn resident_center_uses_plain_budget() {
    let opts = SchedulerOptions {
        max_requests_per_tick: 4,
        ..options(3)
    };
    let mut s = scheduler(opts, bounded_world());
    let mut r = RecordingRenderer::default();
    let center = ChunkCoord::new(0, 0);
    s.on_message(ServerMessage::Update {
        updates: vec![],
        chunks: vec![payload(center, 1)],
    })
    .unwrap();

    s.tick(at(center), &mut r);
    assert_eq!(s.chunk_status(center), ChunkStatus::Added);
    assert_eq!(r.attached, vec![center]);
    let first = loads(&s.take_outbox());
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].len(), 4);

    for _ in 0..4 {
        s.tick(at(center), &mut r);
    }
    for c in world_coords().into_iter().filter(|c| *c != center) {
        assert_eq!(s.chunk_status(c), ChunkStatus::Requested, "{c}");
    }
}

#[test]
fn missing_center_multiplies_request_budget() {
    let opts = SchedulerOptions {
        max_requests_per_tick: 4,
        ..options(3)
    };
    let mut s = scheduler(opts, bounded_world());
    let mut r = RecordingRenderer::default();
    s.tick(at(ChunkCoord::new(0, 0)), &mut r);
    let batches = loads(&s.take_outbox());
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 20);
}

#[test]
fn payloads_mesh_nearest_first_and_attach_when_ready() {
    let opts = SchedulerOptions {
        max_processes_per_tick: 1,
        ..options(2)
    };
    let mut s = scheduler(opts, params());
    let mut r = RecordingRenderer::default();
    let origin = at(ChunkCoord::new(0, 0));
    s.tick(origin, &mut r);

    let mut far = payload(ChunkCoord::new(2, 0), 1);
    far.meshes = vec![MeshLevel { level: 0, geometries: vec![] }];
    let mut near = payload(ChunkCoord::new(0, 0), 1);
    near.meshes = vec![
        MeshLevel {
            level: 0,
            geometries: vec![GeometryData { voxel: 1, ..GeometryData::default() }],
        },
        MeshLevel {
            level: 1,
            geometries: vec![GeometryData { voxel: 2, ..GeometryData::default() }],
        },
    ];
    s.on_message(ServerMessage::Load { chunks: vec![far, near] }).unwrap();
    assert_eq!(s.chunk_status(ChunkCoord::new(2, 0)), ChunkStatus::PayloadPending);

    s.tick(origin, &mut r);
    assert_eq!(r.meshed, vec![(ChunkCoord::new(0, 0), 0), (ChunkCoord::new(0, 0), 1)]);
    assert_eq!(s.chunk_status(ChunkCoord::new(0, 0)), ChunkStatus::Added);
    assert_eq!(s.chunk_status(ChunkCoord::new(2, 0)), ChunkStatus::PayloadPending);

    let chunk = s.store().get(ChunkCoord::new(0, 0)).unwrap();
    assert!(chunk.is_level_meshed(0, false));
    assert!(!chunk.is_level_meshed(0, true));
    assert!(chunk.is_level_meshed(1, true));

    // Even ticks scan instead of meshing.
    s.tick(origin, &mut r);
    assert_eq!(s.chunk_status(ChunkCoord::new(2, 0)), ChunkStatus::PayloadPending);
    s.tick(origin, &mut r);
    assert_eq!(s.chunk_status(ChunkCoord::new(2, 0)), ChunkStatus::Added);
    assert_eq!(s.stats().payloads_meshed, 2);
}

#[test]
fn failed_mesh_level_leaves_chunk_usable() {
    let mut s = scheduler(options(1), params());
    let mut r = RecordingRenderer {
        fail_level: Some(1),
        ..RecordingRenderer::default()
    };
    let mut p = payload(ChunkCoord::new(0, 0), 1);
    p.meshes = vec![
        MeshLevel { level: 0, geometries: vec![] },
        MeshLevel { level: 1, geometries: vec![] },
    ];
    s.on_message(ServerMessage::Load { chunks: vec![p] }).unwrap();
    s.tick(Vec3::ZERO, &mut r);
    s.tick(Vec3::ZERO, &mut r);
    let chunk = s.store().get(ChunkCoord::new(0, 0)).unwrap();
    assert!(chunk.is_level_meshed(0, false));
    assert!(!chunk.is_level_meshed(1, false));
    assert_eq!(s.chunk_status(ChunkCoord::new(0, 0)), ChunkStatus::Added);
}

#[test]
fn malformed_payload_is_dropped() {
    let mut s = scheduler(options(1), params());
    let mut r = RecordingRenderer::default();
    let origin = Vec3::ZERO;
    s.tick(origin, &mut r);
    s.take_outbox();

    let mut bad = payload(ChunkCoord::new(1, 0), 1);
    bad.voxels = Some(vec![0; 10]);
    let good = payload(ChunkCoord::new(0, 0), 1);
    s.on_message(ServerMessage::Load { chunks: vec![bad, good] }).unwrap();
    s.tick(origin, &mut r);

    assert!(!s.store().contains(ChunkCoord::new(1, 0)));
    assert_ne!(s.chunk_status(ChunkCoord::new(1, 0)), ChunkStatus::PayloadPending);
    assert_eq!(s.chunk_status(ChunkCoord::new(0, 0)), ChunkStatus::Added);
    assert_eq!(s.stats().payloads_dropped, 1);
    assert_eq!(s.stats().payloads_meshed, 1);
}

#[test]
fn stale_requests_are_sent_again() {
    let opts = SchedulerOptions {
        rerequest_ticks: 3,
        ..options(0)
    };
    let mut s = scheduler(opts, params());
    let mut r = RecordingRenderer::default();
    let mut out = Vec::new();
    for _ in 0..5 {
        s.tick(Vec3::ZERO, &mut r);
        out.extend(s.take_outbox());
    }
    let batches = loads(&out);
    assert_eq!(batches, vec![vec![ChunkCoord::new(0, 0)], vec![ChunkCoord::new(0, 0)]]);
    assert_eq!(s.chunk_status(ChunkCoord::new(0, 0)), ChunkStatus::Requested);
}

#[test]
fn evicted_chunk_is_unloaded_once() {
    let mut s = scheduler(options(1), params());
    let mut r = RecordingRenderer::default();
    let near = ChunkCoord::new(1, 0);
    s.tick(at(ChunkCoord::new(0, 0)), &mut r);
    s.on_message(ServerMessage::Load { chunks: vec![payload(near, 1)] }).unwrap();
    s.tick(at(ChunkCoord::new(0, 0)), &mut r);
    assert_eq!(s.chunk_status(near), ChunkStatus::Added);
    s.take_outbox();

    let mut out = Vec::new();
    for _ in 0..4 {
        s.tick(at(ChunkCoord::new(4, 0)), &mut r);
        out.extend(s.take_outbox());
    }
    let unloaded = unloads(&out);
    assert_eq!(unloaded.iter().filter(|c| **c == near).count(), 1);
    let distinct: HashSet<ChunkCoord> = unloaded.iter().copied().collect();
    assert_eq!(distinct.len(), unloaded.len());
    assert_eq!(r.disposed.iter().filter(|c| **c == near).count(), 1);
    assert_eq!(s.chunk_status(near), ChunkStatus::Unrequested);
    assert!(!s.store().contains(near));
    assert!(s.stats().chunks_evicted >= 1);
}

#[test]
fn chunks_inside_delete_radius_survive() {
    let mut s = scheduler(options(2), params());
    let mut r = RecordingRenderer::default();
    let c = ChunkCoord::new(2, 0);
    s.on_message(ServerMessage::Update { updates: vec![], chunks: vec![payload(c, 1)] })
        .unwrap();
    for _ in 0..3 {
        s.tick(at(ChunkCoord::new(0, 0)), &mut r);
    }
    assert_eq!(s.chunk_status(c), ChunkStatus::Added);
    assert!(r.disposed.is_empty());
}

#[test]
fn local_edits_snapshot_previous_ids() {
    let mut s = scheduler(options(0), params());
    let mut r = RecordingRenderer::default();
    s.on_message(ServerMessage::Update {
        updates: vec![],
        chunks: vec![payload(ChunkCoord::new(0, 0), 0)],
    })
    .unwrap();
    s.tick(Vec3::ZERO, &mut r);
    s.take_outbox();

    assert_eq!(s.update_voxel(LocalEdit::new(1, 2, 3, 1)), Ok(true));
    assert_eq!(s.store().get_voxel(1, 2, 3), 0);
    s.tick(Vec3::ZERO, &mut r);
    assert_eq!(s.store().get_voxel(1, 2, 3), 1);
    assert_eq!(s.cache().previous((1, 2, 3)), Some(0));
    let out = s.take_outbox();
    assert_eq!(
        out,
        vec![ClientMessage::Update {
            updates: vec![VoxelUpdate { vx: 1, vy: 2, vz: 3, voxel: 1, light: None }]
        }]
    );

    // Same word again is a no-op.
    assert_eq!(s.update_voxel(LocalEdit::new(1, 2, 3, 1)), Ok(false));

    // Server echo of the same value changes nothing.
    s.on_message(ServerMessage::Update {
        updates: vec![VoxelUpdate { vx: 1, vy: 2, vz: 3, voxel: 1, light: None }],
        chunks: vec![],
    })
    .unwrap();
    assert_eq!(s.cache().history((1, 2, 3)), &[0u32]);

    // Authoritative change records what it replaced.
    s.on_message(ServerMessage::Update {
        updates: vec![VoxelUpdate { vx: 1, vy: 2, vz: 3, voxel: 2, light: Some(0xF000) }],
        chunks: vec![],
    })
    .unwrap();
    assert_eq!(s.store().get_voxel(1, 2, 3), 2);
    assert_eq!(s.store().get_sunlight(1, 2, 3), 15);
    assert_eq!(s.cache().previous_n((1, 2, 3), 2), vec![1, 0]);
}

#[test]
fn edit_validation() {
    let mut s = scheduler(options(0), params());
    assert_eq!(
        s.update_voxel(LocalEdit::new(0, -1, 0, 1)),
        Err(EditError::OutOfWorld { vy: -1, max_height: 8 })
    );
    assert_eq!(
        s.update_voxel(LocalEdit::new(0, 8, 0, 1)),
        Err(EditError::OutOfWorld { vy: 8, max_height: 8 })
    );
    assert_eq!(s.update_voxel(LocalEdit::new(0, 0, 0, 99)), Err(EditError::UnknownBlock(99)));
    assert!(matches!(
        s.update_voxel(LocalEdit::new(0, 0, 0, 1).with_stage(16)),
        Err(EditError::Codec(_))
    ));
    assert_eq!(s.stats().edits_queued, 0);
}

#[test]
fn edit_rotation_follows_block_flags() {
    let mut s = scheduler(options(0), params());
    let mut r = RecordingRenderer::default();
    s.on_message(ServerMessage::Update {
        updates: vec![],
        chunks: vec![payload(ChunkCoord::new(0, 0), 0)],
    })
    .unwrap();
    s.tick(Vec3::ZERO, &mut r);

    // Stone ignores rotation entirely; the slab keeps its axis but not its y turn.
    let quarter = std::f64::consts::FRAC_PI_2;
    s.update_voxel(LocalEdit::new(0, 0, 0, 1).with_rotation(BlockRotation::px(quarter)))
        .unwrap();
    s.update_voxel(LocalEdit::new(1, 0, 0, 3).with_rotation(BlockRotation::px(quarter)))
        .unwrap();
    s.tick(Vec3::ZERO, &mut r);

    assert_eq!(s.store().get_voxel_rotation(0, 0, 0), BlockRotation::default());
    let slab = s.store().get_voxel_rotation(1, 0, 0);
    assert_eq!(slab.decode(), (BlockRotation::px(0.0).axis(), 0));
    assert_eq!(codec::extract_id(s.store().get_raw_value(1, 0, 0)), 3);
}

#[test]
fn scan_resumes_after_timeout() {
    let clock = ManualClock::with_step(Duration::from_millis(10));
    let mut s = StreamingScheduler::with_clock(options(2), registry(), params(), clock);
    let mut r = RecordingRenderer::default();

    s.tick(Vec3::ZERO, &mut r);
    assert_eq!(s.stats().scans_interrupted, 1);
    assert_eq!(s.chunk_status(ChunkCoord::new(0, 0)), ChunkStatus::Requested);
    assert_eq!(s.chunk_status(ChunkCoord::new(-1, 0)), ChunkStatus::Unrequested);

    s.tick(Vec3::ZERO, &mut r);
    s.tick(Vec3::ZERO, &mut r);
    assert_eq!(s.chunk_status(ChunkCoord::new(-1, 0)), ChunkStatus::Requested);
    assert_eq!(s.chunk_status(ChunkCoord::new(0, -1)), ChunkStatus::Unrequested);
}

#[test]
fn mesh_pass_processes_one_payload_past_the_deadline() {
    let clock = ManualClock::with_step(Duration::from_millis(10));
    let mut s = StreamingScheduler::with_clock(options(1), registry(), params(), clock);
    let mut r = RecordingRenderer::default();
    s.tick(Vec3::ZERO, &mut r);
    let chunks = vec![payload(ChunkCoord::new(0, 0), 1), payload(ChunkCoord::new(1, 0), 1)];
    s.on_message(ServerMessage::Load { chunks }).unwrap();
    s.tick(Vec3::ZERO, &mut r);
    assert_eq!(s.stats().payloads_meshed, 1);
    assert_eq!(s.stats().mesh_passes_interrupted, 1);
    assert_eq!(s.chunk_status(ChunkCoord::new(1, 0)), ChunkStatus::PayloadPending);
}

#[test]
fn init_resets_world_and_registry() {
    let mut s = scheduler(options(1), params());
    let mut r = RecordingRenderer::default();
    s.on_message(ServerMessage::Update {
        updates: vec![],
        chunks: vec![payload(ChunkCoord::new(0, 0), 1)],
    })
    .unwrap();
    s.tick(Vec3::ZERO, &mut r);
    assert!(s.store().contains(ChunkCoord::new(0, 0)));

    let p = WorldParams {
        chunk_size: 8,
        ..params()
    };
    let mut cfg = blocks();
    cfg.blocks.push(BlockDef::new(7, "brick"));
    s.on_message(ServerMessage::Init { params: p, registry: cfg }).unwrap();
    assert!(s.store().is_empty());
    assert_eq!(s.store().params().chunk_size, 8);
    assert!(s.registry().get_by_name("Brick").is_some());
    assert_eq!(s.chunk_status(ChunkCoord::new(0, 0)), ChunkStatus::Unrequested);
}

#[test]
fn init_with_duplicate_ids_is_rejected() {
    let mut s = scheduler(options(1), params());
    let mut cfg = blocks();
    cfg.blocks.push(BlockDef::new(1, "other stone"));
    assert!(s.on_message(ServerMessage::Init { params: params(), registry: cfg }).is_err());
    assert_eq!(s.registry().len(), 4);
}

#[test]
fn init_with_degenerate_world_is_rejected() {
    let mut s = scheduler(options(1), params());
    let mut r = RecordingRenderer::default();
    for bad in [
        WorldParams { chunk_size: 0, ..params() },
        WorldParams { max_height: 0, ..params() },
        WorldParams { sub_chunks: 0, ..params() },
        WorldParams { chunk_size: 1 << 30, max_height: 1 << 30, ..params() },
    ] {
        let res = s.on_message(ServerMessage::Init { params: bad, registry: blocks() });
        assert!(matches!(res, Err(SchedulerError::Init(_))), "{bad:?}");
    }
    assert_eq!(*s.store().params(), params());

    // The old world keeps streaming.
    s.tick(Vec3::new(1.0, 1.0, 1.0), &mut r);
    let batches = loads(&s.take_outbox());
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0], ChunkCoord::new(0, 0));
}

#[test]
fn unaddressable_payloads_are_dropped() {
    let mut s = scheduler(options(1), params());
    let mut r = RecordingRenderer::default();
    let far = ChunkCoord::new(1_000_000_000, 0);
    s.on_message(ServerMessage::Update { updates: vec![], chunks: vec![payload(far, 1)] })
        .unwrap();
    s.tick(Vec3::ZERO, &mut r);
    assert!(!s.store().contains(far));
    assert_eq!(s.stats().payloads_dropped, 1);

    s.on_message(ServerMessage::Load { chunks: vec![payload(far, 1)] }).unwrap();
    assert_eq!(s.chunk_status(far), ChunkStatus::Unrequested);
    assert_eq!(s.stats().payloads_dropped, 2);
}

#[test]
fn meshes_wait_for_a_ready_chunk() {
    let mut s = scheduler(options(0), params());
    let mut r = RecordingRenderer::default();
    let c = ChunkCoord::new(0, 0);
    let volume = params().chunk_volume();

    let mut voxels_only = ChunkPayload::new(c);
    voxels_only.voxels = Some(encode_words(&vec![1u32; volume]));
    voxels_only.meshes = vec![MeshLevel { level: 0, geometries: vec![] }];
    s.on_message(ServerMessage::Update { updates: vec![], chunks: vec![voxels_only] })
        .unwrap();
    s.tick(Vec3::ZERO, &mut r);
    assert!(r.meshed.is_empty());
    assert!(r.attached.is_empty());
    assert_eq!(s.chunk_status(c), ChunkStatus::Meshed);
    assert_eq!(s.stats().payloads_meshed, 0);

    let mut lights_only = ChunkPayload::new(c);
    lights_only.lights = Some(encode_words(&vec![0u32; volume]));
    lights_only.meshes = vec![MeshLevel { level: 1, geometries: vec![] }];
    s.on_message(ServerMessage::Update { updates: vec![], chunks: vec![lights_only] })
        .unwrap();
    s.tick(Vec3::ZERO, &mut r);
    assert_eq!(r.meshed, vec![(c, 0), (c, 1)]);
    assert_eq!(r.attached, vec![c]);
    assert_eq!(s.chunk_status(c), ChunkStatus::Added);
}

#[test]
fn facing_direction_limits_requests_to_a_cone() {
    let mut s = scheduler(options(4), params());
    let mut r = RecordingRenderer::default();
    let origin = at(ChunkCoord::new(0, 0));
    s.tick_facing(origin, Vec3::new(1.0, 0.0, 0.0), &mut r);
    let sent: HashSet<ChunkCoord> = loads(&s.take_outbox()).into_iter().flatten().collect();
    // Everything within half the radius, plus the narrow cone straight ahead.
    let expected: HashSet<ChunkCoord> = [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 0),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
        (2, 0),
        (3, 0),
        (4, 0),
    ]
    .into_iter()
    .map(ChunkCoord::from)
    .collect();
    assert_eq!(sent, expected);
    assert_eq!(s.chunk_status(ChunkCoord::new(-4, 0)), ChunkStatus::Unrequested);

    // Without a direction the next scan covers the rest.
    s.tick(origin, &mut r);
    s.tick(origin, &mut r);
    assert_eq!(s.chunk_status(ChunkCoord::new(-4, 0)), ChunkStatus::Requested);
    assert_eq!(s.chunk_status(ChunkCoord::new(0, 3)), ChunkStatus::Requested);
}

#[test]
fn listeners_see_chunk_init_and_block_changes() {
    let mut s = scheduler(options(0), params());
    let mut r = RecordingRenderer::default();
    let c = ChunkCoord::new(0, 0);

    let inits = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&inits);
    s.add_chunk_init_listener(c, move |chunk| seen.borrow_mut().push(chunk.coord));
    let updates = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&updates);
    s.add_block_update_listener(move |u| sink.borrow_mut().push(*u));

    s.on_message(ServerMessage::Update { updates: vec![], chunks: vec![payload(c, 0)] })
        .unwrap();
    assert!(inits.borrow().is_empty());
    s.tick(Vec3::ZERO, &mut r);
    assert_eq!(*inits.borrow(), vec![c]);

    // Resident chunks answer right away.
    let late = Rc::clone(&inits);
    s.add_chunk_init_listener(c, move |chunk| late.borrow_mut().push(chunk.coord));
    assert_eq!(inits.borrow().len(), 2);

    s.update_voxel(LocalEdit::new(1, 2, 3, 1)).unwrap();
    s.tick(Vec3::ZERO, &mut r);
    let to_glass = VoxelUpdate { vx: 1, vy: 2, vz: 3, voxel: 2, light: None };
    s.on_message(ServerMessage::Update { updates: vec![to_glass], chunks: vec![] }).unwrap();
    // An unchanged word is not an update.
    s.on_message(ServerMessage::Update { updates: vec![to_glass], chunks: vec![] }).unwrap();
    assert_eq!(
        *updates.borrow(),
        vec![
            BlockUpdate { voxel: (1, 2, 3), old_value: 0, new_value: 1 },
            BlockUpdate { voxel: (1, 2, 3), old_value: 1, new_value: 2 },
        ]
    );
    assert_eq!(inits.borrow().len(), 2);
}

#[test]
fn edits_to_missing_chunks_are_not_sent() {
    let mut s = scheduler(options(0), params());
    let mut r = RecordingRenderer::default();
    assert_eq!(s.update_voxel(LocalEdit::new(100, 2, 100, 1)), Ok(true));
    s.tick(Vec3::ZERO, &mut r);
    let out = s.take_outbox();
    assert!(!out.iter().any(|m| matches!(m, ClientMessage::Update { .. })));
    assert_eq!(s.cache().previous((100, 2, 100)), None);
    assert_eq!(s.stats().edits_skipped, 1);
    assert_eq!(s.stats().edits_sent, 0);
}
