//! Prime a line of TNT and watch the blasts resolve through events.
//!
//! Run with `RUST_LOG=debug cargo run --example tnt_chain` for frame-level
//! logging.

use anyhow::Result;

use causeway_engine::logging;
use causeway_engine::prelude::*;
use causeway_world::properties::keys;

/// Prints every event as it is posted; cancels nothing.
struct Announcer;

impl EventDispatcher for Announcer {
    fn post(&mut self, event: &mut WorldEvent) -> bool {
        match event {
            WorldEvent::SpawnEntities(e) => {
                println!("spawn event: {} entities", e.entities.len());
            }
            WorldEvent::DropItems(e) => {
                println!("drop event: {} items", e.items.len());
            }
            WorldEvent::ChangeBlocks(e) => {
                println!("block event: {} changes", e.changes.len());
            }
        }
        false
    }
}

fn fuse_system(sim: &mut SimContext<'_>) -> Result<(), EngineError> {
    for id in sim.world.entities_of_type("tnt") {
        explosive::tick_fuse(sim, id)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::init();

    let mut tick_loop = TickLoop::new(
        World::new(),
        Tracker::new(
            EntityTypeRegistry::with_defaults(),
            SpawnTypeRegistry::with_defaults(),
        ),
        Announcer,
        EngineConfig::default(),
    );
    tick_loop.add_system("fuse", fuse_system);

    // A stone floor with three TNT devices on staggered fuses.
    {
        let world = tick_loop.world_mut();
        for x in -8..=8 {
            for z in -8..=8 {
                world.set_block_direct(BlockPos::new(x, 63, z), BlockState::named("stone"));
            }
        }
        for (i, fuse) in [4u32, 8, 12].into_iter().enumerate() {
            let x = (i as f64 - 1.0) * 4.0;
            let tnt = Entity::new("tnt", Position::new(x, 64.0, 0.0))
                .with_property(keys::FUSE_DURATION, fuse)?
                .with_property(keys::EXPLOSION_RADIUS, 2.5)?;
            let id = world.spawn_direct(tnt);
            explosive::prime(world, id)?;
        }
    }

    let before = tick_loop.world().block_count();
    tick_loop.run_ticks(20)?;
    println!(
        "blocks: {} -> {}, entities left: {}",
        before,
        tick_loop.world().block_count(),
        tick_loop.world().entity_count()
    );

    Ok(())
}
