use std::sync::Arc;

use hashbrown::HashSet;
use proptest::prelude::*;
use strata_blocks::BlockRegistry;
use strata_chunk::{ChunkCoord, WorldParams};
use strata_geom::Vec3;
use strata_runtime::{
    ChunkStatus, ClientMessage, ManualClock, NullRenderer, SchedulerOptions, StreamingScheduler,
};

fn in_radius(radius: i32) -> Vec<ChunkCoord> {
    let mut out = Vec::new();
    for x in -radius..=radius {
        for z in -radius..=radius {
            if x * x + z * z <= radius * radius {
                out.push(ChunkCoord::new(x, z));
            }
        }
    }
    out
}

proptest! {
    #[test]
    fn every_chunk_in_radius_gets_requested_once(radius in 0u32..5, budget in 1usize..9) {
        let opts = SchedulerOptions {
            render_radius: radius,
            max_requests_per_tick: budget,
            bootstrap_request_multiplier: 1,
            ..SchedulerOptions::default()
        };
        let params = WorldParams { chunk_size: 4, max_height: 8, ..WorldParams::default() };
        let mut s = StreamingScheduler::with_clock(
            opts,
            Arc::new(BlockRegistry::new()),
            params,
            ManualClock::new(),
        );
        let want = in_radius(radius as i32);
        let ticks = want.len().div_ceil(budget);
        let mut sent = Vec::new();
        for _ in 0..ticks {
            s.tick(Vec3::new(2.0, 0.0, 2.0), &mut NullRenderer);
            for msg in s.take_outbox() {
                if let ClientMessage::Load { json } = msg {
                    prop_assert!(json.chunks.len() <= budget);
                    sent.extend(json.chunks);
                }
            }
        }
        let distinct: HashSet<ChunkCoord> = sent.iter().copied().collect();
        prop_assert_eq!(distinct.len(), sent.len());
        prop_assert_eq!(distinct.len(), want.len());
        for c in want {
            prop_assert_eq!(s.chunk_status(c), ChunkStatus::Requested);
        }
    }
}
