/*
 * Domain Module
 *
 * The simulation lives in a box centered at the origin whose faces wrap
 * around: each axis covers [-L/2, L/2) and leaving through one face re-enters
 * through the opposite one. This module owns the two operations that make the
 * box toroidal: wrapping a position back inside, and finding the nearest
 * periodic copy of another point (minimum-image convention).
 */

use glam::Vec3;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub lengths: Vec3,
}

impl Domain {
    pub fn new(x_length: f32, y_length: f32, z_length: f32) -> Result<Self, ConfigError> {
        for (axis, value) in [('x', x_length), ('y', y_length), ('z', z_length)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::DomainLength { axis, value });
            }
        }
        Ok(Self {
            lengths: Vec3::new(x_length, y_length, z_length),
        })
    }

    pub fn cube(length: f32) -> Result<Self, ConfigError> {
        Self::new(length, length, length)
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        self.lengths * 0.5
    }

    #[inline]
    pub fn contains(&self, position: Vec3) -> bool {
        let half = self.half_extents();
        position.cmpge(-half).all() && position.cmplt(half).all()
    }

    #[inline]
    pub fn wrap(&self, position: Vec3) -> Vec3 {
        Vec3::new(
            wrap_axis(position.x, self.lengths.x),
            wrap_axis(position.y, self.lengths.y),
            wrap_axis(position.z, self.lengths.z),
        )
    }

    // Among `other` and its 26 periodic translations, return the copy closest to
    // `center` together with its squared distance. Ties keep the untranslated point.
    #[inline]
    pub fn minimum_image(&self, center: Vec3, other: Vec3) -> (Vec3, f32) {
        let mut best = other;
        let mut best_d2 = center.distance_squared(other);

        for i in -1..=1 {
            for j in -1..=1 {
                for k in -1..=1 {
                    if i == 0 && j == 0 && k == 0 {
                        continue;
                    }
                    let shift = Vec3::new(i as f32, j as f32, k as f32) * self.lengths;
                    let image = other + shift;
                    let d2 = center.distance_squared(image);
                    if d2 < best_d2 {
                        best_d2 = d2;
                        best = image;
                    }
                }
            }
        }

        (best, best_d2)
    }

    // Periodic separation vector from `center` to the nearest copy of `other`
    #[inline]
    pub fn separation(&self, center: Vec3, other: Vec3) -> Vec3 {
        self.minimum_image(center, other).0 - center
    }
}

// Reduce one coordinate into [-L/2, L/2). Values already inside are returned
// untouched so that wrapping is idempotent bit for bit.
#[inline]
pub fn wrap_axis(value: f32, length: f32) -> f32 {
    let half = length * 0.5;
    if value >= -half && value < half {
        return value;
    }

    // Non-negative remainder first, then re-center
    let shifted = ((value + half) % length + length) % length;
    let wrapped = shifted - half;
    if wrapped >= half {
        -half
    } else {
        wrapped
    }
}
