mod config;
mod loopback;
mod renderer;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use strata_blocks::BlockRegistry;
use strata_blocks::config::BlocksConfig;
use strata_edit::LocalEdit;
use strata_geom::Vec3;
use strata_runtime::StreamingScheduler;

use config::ClientConfig;
use loopback::Loopback;
use renderer::CountingRenderer;

const BUILTIN_BLOCKS: &str = include_str!("../assets/blocks.toml");

#[derive(Parser, Debug)]
#[command(name = "strata", about = "Headless voxel chunk streaming client")]
struct Args {
    /// Client settings (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Block palette (TOML) sent by the loopback server.
    #[arg(long)]
    blocks: Option<PathBuf>,
    #[arg(long)]
    ticks: Option<u64>,
    /// Render radius in chunks.
    #[arg(long)]
    radius: Option<u32>,
    /// Walk speed in voxels per tick.
    #[arg(long)]
    speed: Option<f64>,
    /// Print every client message as JSON.
    #[arg(long, default_value_t = false)]
    dump_packets: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => ClientConfig::load_from_path(path)?,
        None => ClientConfig::default(),
    };
    if let Some(t) = args.ticks {
        cfg.sim.ticks = t;
    }
    if let Some(r) = args.radius {
        cfg.scheduler.render_radius = r;
    }
    if let Some(s) = args.speed {
        cfg.sim.speed = s;
    }
    let blocks = match &args.blocks {
        Some(path) => BlocksConfig::from_path(path)?,
        None => BlocksConfig::from_toml_str(BUILTIN_BLOCKS)?,
    };

    let mut server = Loopback::new(cfg.world, blocks, cfg.sim.surface, cfg.sim.workers)?;
    let mut scheduler = StreamingScheduler::new(
        cfg.scheduler.clone(),
        Arc::new(BlockRegistry::new()),
        cfg.world,
    );
    scheduler.on_message(server.init_message())?;
    scheduler.add_block_update_listener(|u| {
        let (vx, vy, vz) = u.voxel;
        log::debug!(
            "block ({vx}, {vy}, {vz}): {:#x} -> {:#x}",
            u.old_value,
            u.new_value
        );
    });
    let mut renderer = CountingRenderer::default();
    let facing = Vec3::new(1.0, 0.0, 0.0);

    let place_id = scheduler.registry().id_by_name("stone").unwrap_or(1);
    let y = (cfg.sim.surface + 2) as f64;
    log::info!(
        "strata: {} ticks, radius {}, speed {}",
        cfg.sim.ticks,
        cfg.scheduler.render_radius,
        cfg.sim.speed
    );

    for t in 0..cfg.sim.ticks {
        let position = Vec3::new(0.5 + t as f64 * cfg.sim.speed, y, 0.5);

        while let Some(msg) = server.poll() {
            scheduler.on_message(msg)?;
        }
        scheduler.tick_facing(position, facing, &mut renderer);
        for msg in scheduler.take_outbox() {
            if args.dump_packets {
                println!("{}", msg.to_json()?);
            }
            for reply in server.handle(msg) {
                scheduler.on_message(reply)?;
            }
        }

        if cfg.sim.place_every > 0 && t > 0 && t % cfg.sim.place_every == 0 {
            place_block(&mut scheduler, position, place_id);
        }
        if t % 60 == 0 {
            log_stats(t, &scheduler, &renderer, &server);
        }
        if cfg.sim.tick_ms > 0 {
            thread::sleep(Duration::from_millis(cfg.sim.tick_ms));
        }
    }

    log_stats(cfg.sim.ticks, &scheduler, &renderer, &server);
    Ok(())
}

/// Drops a block on top of the column just ahead of the player.
fn place_block(scheduler: &mut StreamingScheduler, position: Vec3, id: u32) {
    let vx = position.x.floor() as i32 + 2;
    let vz = position.z.floor() as i32;
    let Some(top) = scheduler
        .store()
        .max_height_at(scheduler.registry(), vx, vz)
    else {
        log::debug!("column ({vx}, {vz}) not loaded yet; skipping placement");
        return;
    };
    match scheduler.update_voxel(LocalEdit::new(vx, top + 1, vz, id)) {
        Ok(true) => log::info!("placed block {} at ({}, {}, {})", id, vx, top + 1, vz),
        Ok(false) => {}
        Err(e) => log::warn!("placement at ({vx}, {}, {vz}) rejected: {e}", top + 1),
    }
}

fn log_stats(
    tick: u64,
    scheduler: &StreamingScheduler,
    renderer: &CountingRenderer,
    server: &Loopback,
) {
    let s = scheduler.stats();
    log::info!(
        "[tick {}] resident={} added={} visible={} levels={} geometries={} attached={} disposed={} requested={} pending={} meshed={} dropped={} evicted={} edits={} inflight={} served={} unloaded={}",
        tick,
        s.resident,
        s.added,
        renderer.visible(),
        renderer.levels_built,
        renderer.geometries,
        renderer.attached,
        renderer.disposed,
        s.requested,
        s.pending,
        s.payloads_meshed,
        s.payloads_dropped,
        s.chunks_evicted,
        s.edits_sent,
        server.inflight(),
        server.loads_served,
        server.unloads_seen
    );
}
