//! Fixed-depth octree stored as one array of cells per level, addressed by
//! Morton key.
//!
//! Level `d` holds `8^d` cells; cell `m` at level `d` is the parent of cells
//! `8m..8m+7` at level `d + 1`. Cell centers are fixed when the grid is built,
//! only the masses change from step to step. The domain spans
//! `[-2 * half_extent, 2 * half_extent]` on every axis.

use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;
use nalgebra::Vector3;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{morton, Body, Error, Execution};

/// Deepest supported grid: 10 levels use 27 bits of a `u32` key.
pub const MAX_LEVELS: usize = 10;

/// What a body contributes to the cells it is routed through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MassMode {
    /// Every body counts as one unit of mass.
    #[default]
    Count,
    /// Bodies deposit their own mass.
    Weighted,
}

/// An `f32` that can be accumulated concurrently.
#[derive(Debug, Default)]
struct AtomicMass(AtomicU32);

impl AtomicMass {
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&mut self, value: f32) {
        *self.0.get_mut() = value.to_bits();
    }

    fn add(&mut self, value: f32) {
        let bits = self.0.get_mut();
        *bits = (f32::from_bits(*bits) + value).to_bits();
    }

    #[cfg_attr(not(feature = "rayon"), allow(dead_code))]
    fn fetch_add(&self, value: f32) {
        // the closure always returns `Some`, so this cannot fail
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f32::from_bits(bits) + value).to_bits())
            });
    }
}

#[derive(Debug)]
pub struct GridCell {
    center: Vector3<f32>,
    mass: AtomicMass,
}

impl GridCell {
    #[must_use]
    pub fn center(&self) -> Vector3<f32> {
        self.center
    }

    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass.load()
    }
}

#[derive(Debug)]
pub struct Level {
    size: f32,
    cells: Vec<GridCell>,
}

impl Level {
    /// Edge length of every cell of this level.
    #[must_use]
    pub fn size(&self) -> f32 {
        self.size
    }

    #[must_use]
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Sum of the masses of all cells of this level.
    #[must_use]
    pub fn total_mass(&self) -> f32 {
        self.cells.iter().map(GridCell::mass).sum()
    }
}

#[derive(Debug)]
pub struct DenseOctree {
    levels: Vec<Level>,
    half_extent: f32,
    mode: MassMode,
}

impl DenseOctree {
    /// Lay out all cells of a grid with `depth` levels.
    pub fn build(
        depth: usize,
        half_extent: f32,
        mode: MassMode,
        execution: Execution,
    ) -> Result<Self, Error> {
        if depth == 0 || depth > MAX_LEVELS {
            return Err(Error::InvalidDepth(depth));
        }

        let levels = (0..depth)
            .map(|d| Self::build_level(d, half_extent, execution))
            .collect();

        debug!("built dense octree with {depth} levels, half extent {half_extent}");

        Ok(Self {
            levels,
            half_extent,
            mode,
        })
    }

    fn build_level(depth: usize, half_extent: f32, execution: Execution) -> Level {
        let dim = (1u32 << depth) as f32;
        let size = 4. * half_extent / dim;
        let cell = |key: u32| {
            let coord = morton::decode(key).map(|c| c as f32);
            GridCell {
                center: (coord + Vector3::from_element(0.5 - dim / 2.)) * size,
                mass: AtomicMass::default(),
            }
        };

        let count = 1u32 << (3 * depth);
        let cells = match execution {
            Execution::SingleThreaded => (0..count).map(cell).collect(),
            #[cfg(feature = "rayon")]
            Execution::RayonIter => (0..count).into_par_iter().map(cell).collect(),
        };

        Level { size, cells }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    #[must_use]
    pub fn mode(&self) -> MassMode {
        self.mode
    }

    #[must_use]
    pub fn level(&self, depth: usize) -> &Level {
        &self.levels[depth]
    }

    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Reset every cell mass to zero.
    pub fn clear(&mut self, execution: Execution) {
        match execution {
            Execution::SingleThreaded => {
                for cell in self.levels.iter_mut().flat_map(|l| l.cells.iter_mut()) {
                    cell.mass.set(0.);
                }
            }
            #[cfg(feature = "rayon")]
            Execution::RayonIter => {
                for level in &mut self.levels {
                    level.cells.par_iter_mut().for_each(|cell| cell.mass.set(0.));
                }
            }
        }
    }

    /// Route every body from its deepest cell up to the root, accumulating
    /// mass on the way. Returns the number of bodies outside the grid, which
    /// are left out.
    pub fn fill(&mut self, bodies: &[Body], execution: Execution) -> usize {
        let dropped = match execution {
            Execution::SingleThreaded => {
                let mut dropped = 0;
                for body in bodies {
                    match self.leaf_key(&body.position()) {
                        Some(key) => {
                            let weight = self.weight(body);
                            let mut key = key as usize;
                            for level in self.levels.iter_mut().rev() {
                                level.cells[key].mass.add(weight);
                                key >>= 3;
                            }
                        }
                        None => dropped += 1,
                    }
                }
                dropped
            }
            #[cfg(feature = "rayon")]
            Execution::RayonIter => {
                let this = &*self;
                bodies
                    .par_iter()
                    .filter(|body| match this.leaf_key(&body.position()) {
                        Some(key) => {
                            let weight = this.weight(body);
                            let mut key = key as usize;
                            for level in this.levels.iter().rev() {
                                level.cells[key].mass.fetch_add(weight);
                                key >>= 3;
                            }
                            false
                        }
                        None => true,
                    })
                    .count()
            }
        };

        if dropped > 0 {
            debug!("{dropped} bodies outside the dense octree were dropped");
        }
        dropped
    }

    fn weight(&self, body: &Body) -> f32 {
        match self.mode {
            MassMode::Count => 1.,
            MassMode::Weighted => body.mass(),
        }
    }

    /// Morton key of the deepest cell containing `position`, if inside the grid.
    #[must_use]
    pub fn leaf_key(&self, position: &Vector3<f32>) -> Option<u32> {
        let deepest = self.levels.last()?;
        let dim = 1i64 << (self.levels.len() - 1);
        let offset = 2. * self.half_extent;

        let mut coord = Vector3::zeros();
        for i in 0..3 {
            let c = ((position[i] + offset) / deepest.size).floor();
            if !c.is_finite() {
                return None;
            }
            let c = c as i64;
            if c < 0 || c >= dim {
                return None;
            }
            coord[i] = c as u32;
        }

        Some(morton::encode(coord))
    }
}
