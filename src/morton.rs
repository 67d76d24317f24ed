//! Morton (Z-order) keys for the dense octree.
//!
//! Each axis contributes one bit per level, `x` in the lowest position of every
//! 3-bit group. A child key is therefore `(parent << 3) | octant`. Keys are
//! `u32`, so at most 10 bits per axis survive; higher coordinate bits are
//! silently discarded and callers must bound-check before encoding.

use nalgebra::Vector3;

/// Spread the low 10 bits of `v` so that two zero bits follow each of them.
fn spread(v: u32) -> u32 {
    let mut v = v & 0x0000_03ff;
    v = (v | (v << 16)) & 0x0300_00ff;
    v = (v | (v << 8)) & 0x0300_f00f;
    v = (v | (v << 4)) & 0x030c_30c3;
    v = (v | (v << 2)) & 0x0924_9249;
    v
}

/// Inverse of [`spread`].
fn compact(v: u32) -> u32 {
    let mut v = v & 0x0924_9249;
    v = (v ^ (v >> 2)) & 0x030c_30c3;
    v = (v ^ (v >> 4)) & 0x0300_f00f;
    v = (v ^ (v >> 8)) & 0x0300_00ff;
    v = (v ^ (v >> 16)) & 0x0000_03ff;
    v
}

#[must_use]
pub fn encode(coord: Vector3<u32>) -> u32 {
    spread(coord.x) | (spread(coord.y) << 1) | (spread(coord.z) << 2)
}

#[must_use]
pub fn decode(key: u32) -> Vector3<u32> {
    Vector3::new(compact(key), compact(key >> 1), compact(key >> 2))
}
