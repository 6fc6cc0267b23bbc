//! Cadence Runtime
//!
//! Demo driver: loads settings, builds a world with a drifting swarm and
//! runs a fixed number of frames at 60Hz.
//!
//! Usage: `cadence [settings.json]`

use anyhow::Result;
use cadence_core::ecs::{system_ref, EntityManager, ListId, System};
use cadence_core::glam::DVec2;
use cadence_core::{SpawnRequest, World};
use cadence_services::Settings;
use std::time::{Duration, Instant};
use tracing::Level;

const SWARM_SIZE: usize = 200;
const ARENA_HALF_WIDTH: f64 = 500.0;

/// Integrates velocity into position and bounces entities off the arena walls.
#[derive(Default)]
struct Drift {
    movers: Option<ListId>,
}

impl System for Drift {
    fn name(&self) -> &str {
        "drift"
    }

    fn component_deps(&self) -> Vec<&'static str> {
        vec!["Vec2D,Position", "Vec2D,Velocity"]
    }

    fn link_world(&mut self, em: &mut EntityManager) {
        self.movers = Some(em.updated_entity_list_by_component_names(&["Position", "Velocity"]));
    }

    fn update(&mut self, em: &mut EntityManager, dt_ms: f64) {
        let Some(movers) = self.movers else {
            return;
        };
        let dt = dt_ms / 1000.0;

        // Compute next states in parallel, apply on this thread.
        let next: Vec<_> = em
            .par_chunks(movers, |chunk, table| {
                chunk
                    .iter()
                    .filter_map(|&e| {
                        let position = *table.get::<DVec2>(e.index(), "Position")?;
                        let mut velocity = *table.get::<DVec2>(e.index(), "Velocity")?;
                        let mut moved = position + velocity * dt;
                        if moved.x.abs() > ARENA_HALF_WIDTH {
                            velocity.x = -velocity.x;
                            moved.x = moved.x.clamp(-ARENA_HALF_WIDTH, ARENA_HALF_WIDTH);
                        }
                        if moved.y.abs() > ARENA_HALF_WIDTH {
                            velocity.y = -velocity.y;
                            moved.y = moved.y.clamp(-ARENA_HALF_WIDTH, ARENA_HALF_WIDTH);
                        }
                        Some((e, moved, velocity))
                    })
                    .collect::<Vec<_>>()
            })
            .into_iter()
            .flatten()
            .collect();

        for (entity, position, velocity) in next {
            if let Some(p) = em.get_mut::<DVec2>(entity, "Position") {
                *p = position;
            }
            if let Some(v) = em.get_mut::<DVec2>(entity, "Velocity") {
                *v = velocity;
            }
        }
    }
}

fn swarm_member(i: usize) -> SpawnRequest {
    let angle = i as f64 * 0.618_033_988_75 * std::f64::consts::TAU;
    let speed = 20.0 + (i % 7) as f64 * 10.0;
    let request = SpawnRequest::new()
        .with("Vec2D,Position", DVec2::ZERO)
        .with("Vec2D,Velocity", DVec2::from_angle(angle) * speed)
        .tag("swarm");
    if i % 10 == 0 {
        // Leaders periodically turn their velocity a quarter circle.
        request.tag("leader").with_logic("turn,500", |entity, em, _dt| {
            if let Some(v) = em.get_mut::<DVec2>(entity, "Velocity") {
                *v = v.perp();
            }
        })
    } else {
        request
    }
}

fn main() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let level: Level = settings.logging.level.parse()?;
    tracing_subscriber::fmt().with_max_level(level).init();

    tracing::info!("Cadence v{}", cadence_core::VERSION);

    let mut world = World::new(settings.world.clone());
    world.register_systems(vec![system_ref(Drift::default())]);
    world.add_world_logic_with_schedule("census", 1000.0, |em, _dt| {
        let (total, active) = em.num_entities();
        let leaders = em.active_entities_with_tags(&["leader"]).len();
        tracing::info!(total, active, leaders, "census");
    });

    for i in 0..SWARM_SIZE {
        world.queue_spawn(swarm_member(i));
    }

    let allowance_ms = settings.runtime.allowance_ms;
    let frame = Duration::from_secs_f64(allowance_ms / 1000.0);
    for _ in 0..settings.runtime.frames {
        let t_frame = Instant::now();
        world.update(allowance_ms);
        if let Some(rest) = frame.checked_sub(t_frame.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let timer = world.frame_timer();
    tracing::info!(
        ticks = world.tick_count(),
        frame_ms = timer.frame_time_ms(),
        average_overunder_ms = timer.average_overunder_ms(),
        overrun_ticks = world.counters().get("overrun_ticks"),
        starved_ticks = world.counters().get("starved_ticks"),
        "finished"
    );
    println!("{}", world.dump_stats_string()?);

    Ok(())
}
