use crate::constants::HEADING_DEGREES;
use rand::Rng;
use std::f64::consts::PI;

/// Position and heading of a single agent, copied out of the population.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pose {
    pub x: i32,
    pub y: i32,
    /// Heading in integer degrees within `[0, 360)`.
    pub heading: i32,
}

impl Pose {
    pub fn new(x: i32, y: i32, heading: i32) -> Self {
        Self { x, y, heading }
    }
}

/// Mutable views over the three agent columns, all of length `count()`.
pub struct ColumnsMut<'a> {
    pub xs: &'a mut [i32],
    pub ys: &'a mut [i32],
    pub headings: &'a mut [i32],
}

/// Structure-of-arrays agent store indexed by dense ids `0..count()`.
///
/// Agents are only ever appended; the population never shrinks during a run.
#[derive(Clone, Debug, Default)]
pub struct AgentPopulation {
    xs: Vec<i32>,
    ys: Vec<i32>,
    headings: Vec<i32>,
}

impl AgentPopulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
            headings: Vec::with_capacity(capacity),
        }
    }

    pub fn count(&self) -> usize {
        debug_assert!(self.xs.len() == self.ys.len() && self.ys.len() == self.headings.len());
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Append `count` agents uniformly placed in a disc around `center`.
    ///
    /// Per agent the RNG is drawn for angle, radius, then heading. The radius is
    /// uniform (not area-uniform), so the disc is denser near its center.
    pub fn spawn_batch<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        center: [f64; 2],
        radius: f64,
        rng: &mut R,
    ) {
        self.xs.reserve(count);
        self.ys.reserve(count);
        self.headings.reserve(count);
        for _ in 0..count {
            let theta = rng.random_range(0.0..2.0 * PI);
            let r = rng.random_range(0.0..=radius);
            let heading = rng.random_range(0..HEADING_DEGREES);
            self.xs.push((center[0] + r * theta.cos()).round() as i32);
            self.ys.push((center[1] + r * theta.sin()).round() as i32);
            self.headings.push(heading);
        }
    }

    /// Push a single agent with an explicit pose.
    pub fn push(&mut self, pose: Pose) {
        self.xs.push(pose.x);
        self.ys.push(pose.y);
        self.headings.push(normalize_heading(pose.heading));
    }

    pub fn get(&self, id: usize) -> Pose {
        assert!(
            id < self.count(),
            "agent id {id} out of range for population of {}",
            self.count()
        );
        Pose {
            x: self.xs[id],
            y: self.ys[id],
            heading: self.headings[id],
        }
    }

    pub fn set(&mut self, id: usize, pose: Pose) {
        assert!(
            id < self.count(),
            "agent id {id} out of range for population of {}",
            self.count()
        );
        self.xs[id] = pose.x;
        self.ys[id] = pose.y;
        self.headings[id] = normalize_heading(pose.heading);
    }

    pub fn clear(&mut self) {
        self.xs.clear();
        self.ys.clear();
        self.headings.clear();
    }

    pub fn positions(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.xs.iter().copied().zip(self.ys.iter().copied())
    }

    pub fn poses(&self) -> impl Iterator<Item = Pose> + '_ {
        self.positions()
            .zip(self.headings.iter().copied())
            .map(|((x, y), heading)| Pose { x, y, heading })
    }

    pub fn columns_mut(&mut self) -> ColumnsMut<'_> {
        ColumnsMut {
            xs: &mut self.xs,
            ys: &mut self.ys,
            headings: &mut self.headings,
        }
    }
}

/// Wrap any integer heading into `[0, 360)`.
pub fn normalize_heading(heading: i32) -> i32 {
    heading.rem_euclid(HEADING_DEGREES)
}
