use super::{Engine, StepTimings};
use crate::agent::ColumnsMut;
use crate::config::Backend;
use crate::diffusion::DiffusionStrategy;
use crate::sensor::sense;
use crate::steering::{in_bounds, turn, TurnDraw};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{trace, warn};

impl Engine {
    pub(super) fn step_spawn_phase(&mut self) {
        let mut count = self.config.spawn_rate;
        if self.config.max_agents != 0 {
            let room = self
                .config
                .max_agents
                .saturating_sub(self.population.count());
            if room < count {
                if !self.cap_warned {
                    warn!(
                        max_agents = self.config.max_agents,
                        step = self.step_index,
                        "population ceiling reached, spawning stopped"
                    );
                    self.cap_warned = true;
                }
                count = room;
            }
        }
        let center = self.spawn_center();
        self.population.spawn_batch(
            count,
            center,
            self.config.initial_radius as f64,
            &mut self.rng,
        );
    }

    /// Bounds check, sense, turn and move every agent against the frozen field.
    /// Returns the number of agents reset to the origin.
    pub(super) fn step_agent_phase(&mut self) -> usize {
        let count = self.population.count();
        let rng = &mut self.rng;
        self.draws.clear();
        self.draws.extend((0..count).map(|_| TurnDraw::sample(rng)));

        let field = &self.field;
        let sensors = &self.sensors;
        let moves = &self.moves;
        let (width, height) = (field.width(), field.height());
        let margin = self.config.sensor_distance;
        let turn_step = self.config.turn_step;

        let update = |x: &mut i32, y: &mut i32, heading: &mut i32, draw: &TurnDraw| -> usize {
            let reset = !in_bounds(*x, *y, width, height, margin);
            if reset {
                *x = 0;
                *y = 0;
            }
            let readings = sense(field, *x, *y, *heading, sensors);
            *heading = turn(*heading, readings, turn_step, *draw);
            (*x, *y) = moves.advance(*x, *y, *heading);
            reset as usize
        };

        let ColumnsMut { xs, ys, headings } = self.population.columns_mut();
        match self.config.backend {
            Backend::Sequential => xs
                .iter_mut()
                .zip(ys.iter_mut())
                .zip(headings.iter_mut())
                .zip(&self.draws)
                .map(|(((x, y), heading), draw)| update(x, y, heading, draw))
                .sum(),
            Backend::Parallel => xs
                .par_iter_mut()
                .zip(ys.par_iter_mut())
                .zip(headings.par_iter_mut())
                .zip(self.draws.par_iter())
                .map(|(((x, y), heading), draw)| update(x, y, heading, draw))
                .sum(),
        }
    }

    pub(super) fn step_field_phase(&mut self) {
        let backend = self.config.backend;
        self.field.deposit(self.population.positions());
        self.diffuser
            .diffuse(&mut self.field, self.config.diffusion_kernel_size, backend);
        let amount = self.config.evaporation_amount.min(u8::MAX as u32) as u8;
        self.field.evaporate(amount, backend);
    }

    /// Spawn, move every agent, then deposit, diffuse and evaporate.
    pub fn step(&mut self) -> StepTimings {
        let total_start = Instant::now();

        let t0 = Instant::now();
        self.step_spawn_phase();
        let spawn_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        let corner_resets = self.step_agent_phase();
        let agent_pass_us = t1.elapsed().as_micros() as u64;

        let t2 = Instant::now();
        self.step_field_phase();
        let field_update_us = t2.elapsed().as_micros() as u64;

        self.step_index += 1;
        self.corner_resets_last_step = corner_resets;
        self.total_corner_resets += corner_resets;

        let timings = StepTimings {
            spawn_us,
            agent_pass_us,
            field_update_us,
            total_us: total_start.elapsed().as_micros() as u64,
        };
        trace!(
            step = self.step_index,
            agents = self.population.count(),
            corner_resets,
            total_us = timings.total_us,
            "step complete"
        );
        timings
    }
}
