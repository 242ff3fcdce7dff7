use strata_blocks::codec;
use strata_blocks::config::{BlockDef, BlocksConfig, PartDef, PatternDef, RuleDef};
use strata_blocks::light::LightColor;
use strata_blocks::rotation::BlockRotation;
use strata_blocks::BlockRegistry;
use strata_chunk::{ChunkCoord, ChunkPayload, ChunkStore, PayloadError, WorldParams};
use strata_geom::{Aabb, Vec3};

fn params() -> WorldParams {
    WorldParams {
        chunk_size: 16,
        max_height: 256,
        sub_chunks: 8,
        ..WorldParams::default()
    }
}

fn registry() -> BlockRegistry {
    let mut water = BlockDef::new(2, "water");
    water.is_fluid = true;
    water.is_passable = true;
    let mut slab = BlockDef::new(3, "slab");
    slab.rotatable = true;
    slab.aabbs = Some(vec![[0.0, 0.0, 0.0, 1.0, 0.5, 1.0]]);
    let mut grass = BlockDef::new(5, "grass");
    grass.is_passable = true;
    let mut post = BlockDef::new(6, "post");
    post.aabbs = Some(vec![[0.25, 0.0, 0.25, 0.75, 1.0, 0.75]]);
    post.dynamic_patterns = vec![PatternDef {
        parts: vec![PartDef {
            rule: RuleDef::Simple {
                offset: [0, 1, 0],
                id: Some(6),
                rotation: None,
                stage: None,
            },
            aabbs: vec![[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]],
            ..PartDef::default()
        }],
    }];
    let mut air = BlockDef::new(0, "air");
    air.is_empty = true;
    let cfg = BlocksConfig {
        blocks: vec![air, BlockDef::new(1, "stone"), water, slab, grass, post],
        ..BlocksConfig::default()
    };
    BlockRegistry::from_config(cfg).unwrap()
}

fn ready_store(coords: &[ChunkCoord]) -> ChunkStore {
    let p = params();
    let mut store = ChunkStore::new(p);
    let zeros = vec![0u32; p.chunk_volume()];
    for &c in coords {
        let payload = ChunkPayload::new(c).with_buffers(&zeros, &zeros);
        store.apply_payload(&payload).unwrap();
    }
    store
}

#[test]
fn world_voxel_maps_to_local_cell() {
    let mut store = ready_store(&[ChunkCoord::new(1, 0)]);
    assert!(store.set_voxel(20, 10, 5, 5));
    let chunk = store.get(ChunkCoord::new(1, 0)).unwrap();
    assert_eq!(chunk.to_local(20, 10, 5), Some((4, 10, 5)));
    let idx = chunk.idx(4, 10, 5);
    assert_eq!(codec::extract_id(chunk.voxels()[idx]), 5);
    assert_eq!(store.get_voxel(20, 10, 5), 5);
    assert_eq!(store.get_voxel(20, 300, 5), 0);
    assert!(!store.set_voxel(20, 300, 5, 1));
}

#[test]
fn missing_chunks_read_zero() {
    let mut store = ready_store(&[]);
    assert_eq!(store.get_raw_value(0, 0, 0), 0);
    assert_eq!(store.get_sunlight(0, 0, 0), 0);
    assert!(!store.set_raw_value(0, 0, 0, 1));
    assert!(store.set_voxel_stage(0, 0, 0, 99).is_err());
}

#[test]
fn light_channels_through_store() {
    let mut store = ready_store(&[ChunkCoord::new(-1, -1)]);
    assert!(store.set_sunlight(-3, 40, -3, 15));
    assert!(store.set_torch_light(-3, 40, -3, LightColor::Green, 7));
    assert_eq!(store.get_sunlight(-3, 40, -3), 15);
    assert_eq!(store.get_torch_light(-3, 40, -3, LightColor::Green), 7);
    assert_eq!(store.get_torch_light(-3, 40, -3, LightColor::Red), 0);
    assert_eq!(store.get_raw_light(-3, 40, -3), 0xF070);
}

#[test]
fn payload_with_wrong_length_is_rejected() {
    let mut store = ChunkStore::new(params());
    let mut payload = ChunkPayload::new(ChunkCoord::new(0, 0));
    payload.voxels = Some(vec![0u8; 12]);
    let err = store.apply_payload(&payload).unwrap_err();
    assert!(matches!(err, PayloadError::BadLength { what: "voxel", .. }));
    assert!(!store.contains(ChunkCoord::new(0, 0)));
}

#[test]
fn payload_id_mismatch_is_rejected() {
    let mut store = ready_store(&[ChunkCoord::new(0, 0)]);
    let mut payload = ChunkPayload::new(ChunkCoord::new(0, 0));
    payload.id = "other".into();
    assert!(matches!(
        store.apply_payload(&payload),
        Err(PayloadError::IdMismatch { .. })
    ));
    // The resident chunk survives.
    assert!(store.is_ready(ChunkCoord::new(0, 0)));
}

#[test]
fn readiness_needs_both_buffers() {
    let p = params();
    let mut store = ChunkStore::new(p);
    let mut payload = ChunkPayload::new(ChunkCoord::new(0, 0));
    payload.voxels = Some(codec_bytes(p.chunk_volume()));
    store.apply_payload(&payload).unwrap();
    assert!(!store.is_ready(ChunkCoord::new(0, 0)));
    let mut lights = ChunkPayload::new(ChunkCoord::new(0, 0));
    lights.lights = Some(codec_bytes(p.chunk_volume()));
    store.apply_payload(&lights).unwrap();
    assert!(store.is_ready(ChunkCoord::new(0, 0)));
}

fn codec_bytes(n: usize) -> Vec<u8> {
    vec![0u8; n * 4]
}

#[test]
fn physics_boxes_are_rotated_and_translated() {
    let reg = registry();
    let mut store = ready_store(&[ChunkCoord::new(0, 0)]);
    store.set_voxel(1, 2, 3, 1);
    assert_eq!(
        store.voxel_aabbs_at(&reg, 1, 2, 3),
        vec![Aabb::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(2.0, 3.0, 4.0))]
    );

    let word = codec::insert_rotation(codec::insert_id(0, 3), BlockRotation::ny(0.0));
    store.set_raw_value(4, 4, 4, word);
    assert_eq!(
        store.voxel_aabbs_at(&reg, 4, 4, 4),
        vec![Aabb::new(Vec3::new(4.0, 4.5, 4.0), Vec3::new(5.0, 5.0, 5.0))]
    );
}

#[test]
fn passable_and_fluid_have_no_boxes() {
    let reg = registry();
    let mut store = ready_store(&[ChunkCoord::new(0, 0)]);
    store.set_voxel(0, 0, 0, 2);
    store.set_voxel(1, 0, 0, 5);
    store.set_voxel(2, 0, 0, 42);
    assert!(store.voxel_aabbs_at(&reg, 0, 0, 0).is_empty());
    assert!(store.voxel_aabbs_at(&reg, 1, 0, 0).is_empty());
    assert!(store.voxel_aabbs_at(&reg, 2, 0, 0).is_empty());
    assert!(store.is_fluid_at(&reg, 0, 0, 0));
    assert!(!store.is_fluid_at(&reg, 1, 0, 0));
    // Unloaded chunk
    assert!(!store.is_fluid_at(&reg, 100, 0, 100));
    assert!(store.voxel_aabbs_at(&reg, 100, 0, 100).is_empty());
}

#[test]
fn conditional_boxes_follow_neighbors() {
    let reg = registry();
    let mut store = ready_store(&[ChunkCoord::new(0, 0)]);
    store.set_voxel(8, 8, 8, 6);
    let alone = store.voxel_aabbs_at(&reg, 8, 8, 8);
    assert_eq!(alone.len(), 1);
    assert_eq!(alone[0].width(), 0.5);

    store.set_voxel(8, 9, 8, 6);
    let stacked = store.voxel_aabbs_at(&reg, 8, 8, 8);
    assert_eq!(stacked, vec![Aabb::new(Vec3::new(8.0, 8.0, 8.0), Vec3::new(9.0, 9.0, 9.0))]);
}

#[test]
fn column_height() {
    let reg = registry();
    let mut store = ready_store(&[ChunkCoord::new(0, 0)]);
    assert_eq!(store.max_height_at(&reg, 3, 3), None);
    store.set_voxel(3, 0, 3, 1);
    store.set_voxel(3, 64, 3, 1);
    assert_eq!(store.max_height_at(&reg, 3, 3), Some(64));
}

#[test]
fn removal_disposes() {
    let mut store = ready_store(&[ChunkCoord::new(2, 2)]);
    let chunk = store.remove(ChunkCoord::new(2, 2)).unwrap();
    assert!(!chunk.is_ready());
    assert!(store.is_empty());
}

#[test]
fn payload_beyond_addressable_range_is_rejected() {
    let mut store = ChunkStore::new(params());
    let far = ChunkCoord::new(1_000_000_000, 0);
    assert!(!store.is_within_world(far));
    let payload = ChunkPayload::new(far).with_buffers(&[], &[]);
    assert_eq!(store.apply_payload(&payload), Err(PayloadError::OutsideWorld(far)));
    assert!(store.is_empty());
}

#[test]
fn world_params_validation() {
    assert!(params().validate().is_ok());
    assert!(WorldParams::default().validate().is_ok());
    for bad in [
        WorldParams { chunk_size: 0, ..params() },
        WorldParams { max_height: 0, ..params() },
        WorldParams { sub_chunks: 0, ..params() },
        WorldParams { chunk_size: usize::MAX / 2, ..params() },
        WorldParams { chunk_size: 1 << 30, max_height: 1 << 30, ..params() },
        WorldParams { min_chunk: [3, 0], max_chunk: [2, 5], ..params() },
    ] {
        assert!(bad.validate().is_err(), "{bad:?}");
    }
}
