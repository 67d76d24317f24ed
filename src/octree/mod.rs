pub mod adaptive;
pub mod dense;

use nalgebra::Vector3;

/// A cell as seen by a force walk, for diagnostics and visualization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSummary {
    pub center: Vector3<f32>,
    pub size: f32,
    pub mass: f32,
    /// The cell was applied as a single point mass.
    pub approximated: bool,
}

/// Octant of `position` relative to `center`, numbered like Morton digits:
/// bit 0 for `x`, bit 1 for `y`, bit 2 for `z`, set on the upper side.
fn choose_octant(center: &Vector3<f32>, position: &Vector3<f32>) -> usize {
    usize::from(position.x >= center.x)
        | usize::from(position.y >= center.y) << 1
        | usize::from(position.z >= center.z) << 2
}

/// Center of octant `i` of a cell with edge `width` centered at `center`.
fn octant_center(width: f32, center: Vector3<f32>, i: usize) -> Vector3<f32> {
    let step = width / 4.;
    let sign = |bit: usize| if i >> bit & 1 == 1 { step } else { -step };
    center + Vector3::new(sign(0), sign(1), sign(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octant_roundtrip() {
        let center = Vector3::new(1., -2., 0.5);
        for i in 0..8 {
            let c = octant_center(4., center, i);
            assert_eq!(choose_octant(&center, &c), i);
            assert_eq!((c - center).abs(), Vector3::from_element(1.));
        }
    }

    #[test]
    fn octant_on_boundary_goes_up() {
        let center = Vector3::zeros();
        assert_eq!(choose_octant(&center, &Vector3::zeros()), 7);
        assert_eq!(choose_octant(&center, &Vector3::new(-1., 0., -1.)), 2);
    }
}
