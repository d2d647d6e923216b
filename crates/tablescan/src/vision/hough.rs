//! Progressive probabilistic Hough transform.
//!
//! Foreground pixels are visited in random order (fixed seed, so results are
//! reproducible). Each pixel votes in the (theta, rho) accumulator; once a
//! bin reaches the vote threshold the line through the pixel is walked in
//! both directions, tolerating gaps of up to `max_line_gap` pixels. Walked
//! pixels are removed from the working mask, and when the walked extent is at
//! least `min_line_length` along x or y the segment is kept and its votes are
//! withdrawn from the accumulator.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::mask::BinaryMask;
use crate::error::{Result, TablescanError};
use crate::types::{LineSegment, LineSet, Orientation, Point};

const RNG_SEED: u64 = 0xFFFF_FFFF_FFFF_FFFF;
const SHIFT: u32 = 16;

/// Parameters of the probabilistic line transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoughParams {
    /// Distance resolution of the accumulator in pixels
    #[serde(default = "default_rho")]
    pub rho: f64,

    /// Angular resolution of the accumulator in degrees
    #[serde(default = "default_theta_degrees")]
    pub theta_degrees: f64,

    /// Minimum accumulator votes before a line is walked
    #[serde(default = "default_vote_threshold")]
    pub vote_threshold: u32,

    /// Shorter segments are discarded
    #[serde(default = "default_min_line_length")]
    pub min_line_length: u32,

    /// Largest gap bridged between collinear pixels
    #[serde(default = "default_max_line_gap")]
    pub max_line_gap: u32,
}

fn default_rho() -> f64 {
    1.0
}
fn default_theta_degrees() -> f64 {
    1.0
}
fn default_vote_threshold() -> u32 {
    100
}
fn default_min_line_length() -> u32 {
    100
}
fn default_max_line_gap() -> u32 {
    10
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            rho: default_rho(),
            theta_degrees: default_theta_degrees(),
            vote_threshold: default_vote_threshold(),
            min_line_length: default_min_line_length(),
            max_line_gap: default_max_line_gap(),
        }
    }
}

impl HoughParams {
    pub fn theta_radians(&self) -> f64 {
        self.theta_degrees.to_radians()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rho > 0.0) {
            return Err(TablescanError::validation(format!("rho must be positive, got {}", self.rho)));
        }
        if !(self.theta_degrees > 0.0 && self.theta_degrees <= 180.0) {
            return Err(TablescanError::validation(format!(
                "theta_degrees must be in (0, 180], got {}",
                self.theta_degrees
            )));
        }
        if self.vote_threshold == 0 {
            return Err(TablescanError::validation("vote_threshold must be at least 1"));
        }
        Ok(())
    }
}

/// Runs the transform over `mask`, tagging every segment with `orientation`.
pub fn detect_segments(mask: &BinaryMask, params: &HoughParams, orientation: Orientation) -> Result<LineSet> {
    params.validate()?;
    if mask.is_empty() {
        return Err(TablescanError::image_processing(format!(
            "Cannot run line transform on an empty {}x{} mask",
            mask.width(),
            mask.height()
        )));
    }

    let width = mask.width() as i64;
    let height = mask.height() as i64;
    let theta = params.theta_radians();
    let irho = 1.0 / params.rho;

    let num_angle = (PI / theta).round() as usize;
    let num_rho = (((width + height) * 2 + 1) as f64 / params.rho).round() as usize;
    if num_angle == 0 || num_rho == 0 {
        return Err(TablescanError::image_processing("Line transform accumulator would be empty"));
    }
    let rho_offset = (num_rho as i64 - 1) / 2;

    let trig: Vec<(f32, f32)> = (0..num_angle)
        .map(|n| {
            let angle = n as f64 * theta;
            ((angle.cos() * irho) as f32, (angle.sin() * irho) as f32)
        })
        .collect();

    let bin = |n: usize, x: i64, y: i64| -> usize {
        let (cos_t, sin_t) = trig[n];
        let r = (x as f32 * cos_t + y as f32 * sin_t).round() as i64 + rho_offset;
        n * num_rho + r.clamp(0, num_rho as i64 - 1) as usize
    };

    let mut accum = vec![0i32; num_angle * num_rho];
    let mut work = mask.clone();
    let mut points: Vec<(i64, i64)> = mask.foreground().map(|(x, y)| (x as i64, y as i64)).collect();
    let mut rng = StdRng::seed_from_u64(RNG_SEED);

    let threshold = params.vote_threshold as i32;
    let min_length = params.min_line_length as i64;
    let max_gap = params.max_line_gap;
    let in_bounds = |x: i64, y: i64| x >= 0 && x < width && y >= 0 && y < height;

    let mut segments = Vec::new();
    let mut remaining = points.len();

    while remaining > 0 {
        let idx = rng.gen_range(0..remaining);
        let (px, py) = points[idx];
        points[idx] = points[remaining - 1];
        remaining -= 1;

        // Already consumed by an earlier line.
        if !work.get(px as u32, py as u32) {
            continue;
        }

        let mut max_val = threshold - 1;
        let mut max_n = 0;
        for n in 0..num_angle {
            let cell = &mut accum[bin(n, px, py)];
            *cell += 1;
            if max_val < *cell {
                max_val = *cell;
                max_n = n;
            }
        }
        if max_val < threshold {
            continue;
        }

        // Walk along the line direction in fixed point on the minor axis.
        let (cos_t, sin_t) = trig[max_n];
        let a = -sin_t;
        let b = cos_t;
        let (mut x0, mut y0) = (px, py);
        let (dx0, dy0, x_major) = if a.abs() > b.abs() {
            let dy0 = (b * (1i64 << SHIFT) as f32 / a.abs()).round() as i64;
            y0 = (y0 << SHIFT) + (1 << (SHIFT - 1));
            (if a > 0.0 { 1 } else { -1 }, dy0, true)
        } else {
            let dx0 = (a * (1i64 << SHIFT) as f32 / b.abs()).round() as i64;
            x0 = (x0 << SHIFT) + (1 << (SHIFT - 1));
            (dx0, if b > 0.0 { 1 } else { -1 }, false)
        };
        let to_pixel = |x: i64, y: i64| if x_major { (x, y >> SHIFT) } else { (x >> SHIFT, y) };

        let mut line_end = [(px, py); 2];
        for (k, end) in line_end.iter_mut().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            let mut gap = 0;
            loop {
                let (j, i) = to_pixel(x, y);
                if !in_bounds(j, i) {
                    break;
                }
                if work.get(j as u32, i as u32) {
                    gap = 0;
                    *end = (j, i);
                } else {
                    gap += 1;
                    if gap > max_gap {
                        break;
                    }
                }
                x += dx;
                y += dy;
            }
        }

        let good_line =
            (line_end[1].0 - line_end[0].0).abs() >= min_length || (line_end[1].1 - line_end[0].1).abs() >= min_length;

        for (k, end) in line_end.iter().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            loop {
                let (j, i) = to_pixel(x, y);
                if !in_bounds(j, i) {
                    break;
                }
                if work.get(j as u32, i as u32) {
                    if good_line {
                        for n in 0..num_angle {
                            accum[bin(n, j, i)] -= 1;
                        }
                    }
                    work.set(j as u32, i as u32, false);
                }
                if (j, i) == *end {
                    break;
                }
                x += dx;
                y += dy;
            }
        }

        if good_line {
            segments.push(LineSegment {
                start: Point::new(line_end[0].0 as i32, line_end[0].1 as i32),
                end: Point::new(line_end[1].0 as i32, line_end[1].1 as i32),
                orientation,
            });
        }
    }

    Ok(LineSet { segments })
}
