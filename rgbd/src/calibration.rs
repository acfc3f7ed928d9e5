//! Camera calibrations stored in recordings, and the per-pixel ray directions
//! derived from them.
//!
//! Directions use a right-handed frame with x right, y up and the camera
//! looking down -z. Texture coordinates `uv` are normalized to `[0, 1]` with
//! `v` growing downward.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Newton refinement passes when inverting the Brown-Conrady model.
const KINECT_UNPROJECT_PASSES: u32 = 20;

/// Fixed-point passes when inverting the iOS lens lookup table.
const IOS_INVERSE_PASSES: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(tag = "calibrationType")]
pub enum CameraCalibration {
    #[serde(rename = "azureKinect")]
    AzureKinect(KinectCalibration),
    #[serde(rename = "ios")]
    Ios(IosCalibration),
    #[serde(rename = "undistorted")]
    Undistorted(UndistortedCalibration),
}

/// Azure Kinect intrinsics using the Brown-Conrady distortion model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct KinectCalibration {
    pub color_width: i32,
    pub color_height: i32,
    pub depth_width: i32,
    pub depth_height: i32,
    /// Sensor resolution the intrinsics below are expressed in.
    pub resolution_width: i32,
    pub resolution_height: i32,
    pub cx: f32,
    pub cy: f32,
    pub fx: f32,
    pub fy: f32,
    pub k1: f32,
    pub k2: f32,
    pub k3: f32,
    pub k4: f32,
    pub k5: f32,
    pub k6: f32,
    /// Center of distortion, zero for Brown-Conrady.
    pub codx: f32,
    pub cody: f32,
    pub p1: f32,
    pub p2: f32,
    pub max_radius_for_projection: f32,
}

/// iOS intrinsics with a radial lens distortion lookup table.
///
/// The table holds relative radial magnification for linearly spaced radii,
/// from the distortion center out to the farthest image corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct IosCalibration {
    pub color_width: i32,
    pub color_height: i32,
    pub depth_width: i32,
    pub depth_height: i32,
    pub fx: f32,
    pub fy: f32,
    pub ox: f32,
    pub oy: f32,
    pub reference_dimension_width: f32,
    pub reference_dimension_height: f32,
    pub lens_distortion_center_x: f32,
    pub lens_distortion_center_y: f32,
    pub lens_distortion_lookup_table: Vec<f32>,
}

/// Pinhole intrinsics in normalized texture coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct UndistortedCalibration {
    pub color_width: i32,
    pub color_height: i32,
    pub depth_width: i32,
    pub depth_height: i32,
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl CameraCalibration {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The `calibrationType` discriminator.
    pub fn calibration_type(&self) -> &'static str {
        match self {
            CameraCalibration::AzureKinect(_) => "azureKinect",
            CameraCalibration::Ios(_) => "ios",
            CameraCalibration::Undistorted(_) => "undistorted",
        }
    }

    pub fn color_width(&self) -> i32 {
        match self {
            CameraCalibration::AzureKinect(c) => c.color_width,
            CameraCalibration::Ios(c) => c.color_width,
            CameraCalibration::Undistorted(c) => c.color_width,
        }
    }

    pub fn color_height(&self) -> i32 {
        match self {
            CameraCalibration::AzureKinect(c) => c.color_height,
            CameraCalibration::Ios(c) => c.color_height,
            CameraCalibration::Undistorted(c) => c.color_height,
        }
    }

    pub fn depth_width(&self) -> i32 {
        match self {
            CameraCalibration::AzureKinect(c) => c.depth_width,
            CameraCalibration::Ios(c) => c.depth_width,
            CameraCalibration::Undistorted(c) => c.depth_width,
        }
    }

    pub fn depth_height(&self) -> i32 {
        match self {
            CameraCalibration::AzureKinect(c) => c.depth_height,
            CameraCalibration::Ios(c) => c.depth_height,
            CameraCalibration::Undistorted(c) => c.depth_height,
        }
    }

    /// Ray direction through texture coordinate `uv`, scaled so z = -1.
    pub fn get_direction(&self, uv: Vec2) -> Vec3 {
        match self {
            CameraCalibration::AzureKinect(c) => c.get_direction(uv),
            CameraCalibration::Ios(c) => c.get_direction(uv),
            CameraCalibration::Undistorted(c) => c.get_direction(uv),
        }
    }

    /// Texture coordinate a ray direction projects to.
    pub fn get_uv(&self, direction: Vec3) -> Vec2 {
        match self {
            CameraCalibration::AzureKinect(c) => c.get_uv(direction),
            CameraCalibration::Ios(c) => c.get_uv(direction),
            CameraCalibration::Undistorted(c) => c.get_uv(direction),
        }
    }
}

impl UndistortedCalibration {
    pub fn get_direction(&self, uv: Vec2) -> Vec3 {
        Vec3::new((uv.x - self.cx) / self.fx, (uv.y - self.cy) / self.fy, -1.0)
    }

    pub fn get_uv(&self, direction: Vec3) -> Vec2 {
        let x = direction.x / -direction.z;
        let y = direction.y / -direction.z;
        Vec2::new(self.fx * x + self.cx, self.fy * y + self.cy)
    }
}

impl KinectCalibration {
    /// Distort and project a normalized point, returning pixel coordinates and
    /// the Jacobian `[du/dx, du/dy, dv/dx, dv/dy]`. None beyond the projection radius.
    fn project(&self, xy: Vec2) -> Option<(Vec2, [f32; 4])> {
        let xp = xy.x - self.codx;
        let yp = xy.y - self.cody;

        let xp2 = xp * xp;
        let yp2 = yp * yp;
        let xyp = xp * yp;
        let rs = xp2 + yp2;
        if rs > self.max_radius_for_projection * self.max_radius_for_projection {
            return None;
        }
        let rss = rs * rs;
        let rsc = rss * rs;
        let a = 1.0 + self.k1 * rs + self.k2 * rss + self.k3 * rsc;
        let b = 1.0 + self.k4 * rs + self.k5 * rss + self.k6 * rsc;
        let bi = if b != 0.0 { 1.0 / b } else { 1.0 };
        let d = a * bi;

        let mut xp_d = xp * d;
        let mut yp_d = yp * d;

        let rs_2xp2 = rs + 2.0 * xp2;
        let rs_2yp2 = rs + 2.0 * yp2;

        xp_d += rs_2xp2 * self.p2 + 2.0 * xyp * self.p1;
        yp_d += rs_2yp2 * self.p1 + 2.0 * xyp * self.p2;

        let uv = Vec2::new(
            (xp_d + self.codx) * self.fx + self.cx,
            (yp_d + self.cody) * self.fy + self.cy,
        );

        let dudrs = self.k1 + 2.0 * self.k2 * rs + 3.0 * self.k3 * rss;
        let dvdrs = self.k4 + 2.0 * self.k5 * rs + 3.0 * self.k6 * rss;
        let bis = bi * bi;
        let dddrs = (dudrs * b - a * dvdrs) * bis;

        let dddrs_2 = dddrs * 2.0;
        let xp_dddrs_2 = xp * dddrs_2;
        let yp_xp_dddrs_2 = yp * xp_dddrs_2;

        let jacobian = [
            self.fx * (d + xp * xp_dddrs_2 + 6.0 * xp * self.p2 + 2.0 * yp * self.p1),
            self.fx * (yp_xp_dddrs_2 + 2.0 * yp * self.p2 + 2.0 * xp * self.p1),
            self.fy * (yp_xp_dddrs_2 + 2.0 * xp * self.p1 + 2.0 * yp * self.p2),
            self.fy * (d + yp * yp * dddrs_2 + 6.0 * yp * self.p1 + 2.0 * xp * self.p2),
        ];

        Some((uv, jacobian))
    }

    /// Invert [`Self::project`] for pixel coordinates `point`.
    fn unproject(&self, point: Vec2) -> Vec2 {
        // Closed-form estimate for radial then tangential distortion.
        let xp_d = (point.x - self.cx) / self.fx - self.codx;
        let yp_d = (point.y - self.cy) / self.fy - self.cody;

        let rs = xp_d * xp_d + yp_d * yp_d;
        let rss = rs * rs;
        let rsc = rss * rs;
        let a = 1.0 + self.k1 * rs + self.k2 * rss + self.k3 * rsc;
        let b = 1.0 + self.k4 * rs + self.k5 * rss + self.k6 * rsc;
        let ai = if a != 0.0 { 1.0 / a } else { 1.0 };
        let di = ai * b;

        let mut xy = Vec2::new(xp_d * di, yp_d * di);

        let two_xy = 2.0 * xy.x * xy.y;
        let xx = xy.x * xy.x;
        let yy = xy.y * xy.y;

        xy.x -= (yy + 3.0 * xx) * self.p2 + two_xy * self.p1;
        xy.y -= (xx + 3.0 * yy) * self.p1 + two_xy * self.p2;

        xy.x += self.codx;
        xy.y += self.cody;

        // Newton refinement, keeping the best estimate seen.
        let mut best_xy = xy;
        let mut best_err = f32::MAX;
        for pass in 0..KINECT_UNPROJECT_PASSES {
            let Some((p, j)) = self.project(xy) else {
                return xy;
            };

            let err_x = point.x - p.x;
            let err_y = point.y - p.y;
            let err = err_x * err_x + err_y * err_y;
            if err >= best_err {
                return best_xy;
            }

            best_err = err;
            best_xy = xy;
            if pass + 1 == KINECT_UNPROJECT_PASSES || best_err < 1e-22 {
                break;
            }

            let inv_det = 1.0 / (j[0] * j[3] - j[1] * j[2]);
            let jinv = [inv_det * j[3], -inv_det * j[1], -inv_det * j[2], inv_det * j[0]];
            xy.x += jinv[0] * err_x + jinv[1] * err_y;
            xy.y += jinv[2] * err_x + jinv[3] * err_y;
        }
        best_xy
    }

    fn resolution_scale(&self) -> Vec2 {
        Vec2::new(
            (self.resolution_width - 1) as f32,
            (self.resolution_height - 1) as f32,
        )
    }

    pub fn get_direction(&self, uv: Vec2) -> Vec3 {
        let xy = self.unproject(uv * self.resolution_scale());
        // Kinect cameras look down +z with y down.
        Vec3::new(xy.x, -xy.y, -1.0)
    }

    pub fn get_uv(&self, direction: Vec3) -> Vec2 {
        let xy = Vec2::new(direction.x / -direction.z, direction.y / direction.z);
        let point = match self.project(xy) {
            Some((point, _)) => point,
            None => Vec2::new(xy.x * self.fx + self.cx, xy.y * self.fy + self.cy),
        };
        point / self.resolution_scale()
    }
}

impl IosCalibration {
    fn max_radius(&self) -> f32 {
        let dx = self
            .lens_distortion_center_x
            .max(self.reference_dimension_width - self.lens_distortion_center_x);
        let dy = self
            .lens_distortion_center_y
            .max(self.reference_dimension_height - self.lens_distortion_center_y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Linearly interpolated magnification at radius `r`.
    fn magnification(&self, r: f32, r_max: f32) -> f32 {
        let table = &self.lens_distortion_lookup_table;
        let Some(&last) = table.last() else {
            return 0.0;
        };
        if r >= r_max || table.len() < 2 {
            return last;
        }

        let val = r * (table.len() - 1) as f32 / r_max;
        let idx = val as usize;
        let frac = val - idx as f32;
        let mag1 = table[idx];
        let mag2 = table.get(idx + 1).copied().unwrap_or(last);
        (1.0 - frac) * mag1 + frac * mag2
    }

    fn center(&self) -> Vec2 {
        Vec2::new(self.lens_distortion_center_x, self.lens_distortion_center_y)
    }

    pub fn get_direction(&self, uv: Vec2) -> Vec3 {
        // Coordinates in the reference dimension, with v flipped upward.
        let reference = Vec2::new(
            uv.x * self.reference_dimension_width,
            (1.0 - uv.y) * self.reference_dimension_height,
        );
        let delta = reference - self.center();
        let magnification = self.magnification(delta.length(), self.max_radius());
        let calibrated = self.center() + delta * (1.0 + magnification);

        Vec3::new(
            (calibrated.x - self.ox) / self.fx,
            (calibrated.y - self.oy) / self.fy,
            -1.0,
        )
    }

    pub fn get_uv(&self, direction: Vec3) -> Vec2 {
        let x = direction.x / -direction.z;
        let y = direction.y / -direction.z;
        let calibrated = Vec2::new(x * self.fx + self.ox, y * self.fy + self.oy);
        let target = calibrated - self.center();

        let r_max = self.max_radius();
        let mut delta = target;
        for _ in 0..IOS_INVERSE_PASSES {
            delta = target / (1.0 + self.magnification(delta.length(), r_max));
        }

        let reference = self.center() + delta;
        Vec2::new(
            reference.x / self.reference_dimension_width,
            1.0 - reference.y / self.reference_dimension_height,
        )
    }
}

/// Ray directions for every depth pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionTable {
    pub width: i32,
    pub height: i32,
    pub directions: Vec<Vec3>,
}

fn step(extent: i32) -> f32 {
    if extent > 1 { 1.0 / (extent - 1) as f32 } else { 0.0 }
}

impl DirectionTable {
    /// Sample `calibration` at every pixel of its depth resolution.
    pub fn new(calibration: &CameraCalibration) -> Self {
        let width = calibration.depth_width().max(0);
        let height = calibration.depth_height().max(0);
        let (u_step, v_step) = (step(width), step(height));

        let mut directions = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for col in 0..width {
                let uv = Vec2::new(col as f32 * u_step, row as f32 * v_step);
                directions.push(calibration.get_direction(uv));
            }
        }

        Self {
            width,
            height,
            directions,
        }
    }

    /// Direction at `uv`, interpolated from the neighbouring table entries.
    pub fn get_direction(&self, uv: Vec2) -> Option<Vec3> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let col = (uv.x * (self.width - 1) as f32).clamp(0.0, (self.width - 1) as f32);
        let row = (uv.y * (self.height - 1) as f32).clamp(0.0, (self.height - 1) as f32);

        let left = col.floor() as i32;
        let top = row.floor() as i32;
        let right = (left + 1).min(self.width - 1);
        let bottom = (top + 1).min(self.height - 1);

        let at = |c: i32, r: i32| self.directions.get((c + r * self.width) as usize).copied();
        let left_top = at(left, top)?;
        let right_top = at(right, top)?;
        let left_bottom = at(left, bottom)?;

        Some(
            left_top
                + (right_top - left_top) * (col - left as f32)
                + (left_bottom - left_top) * (row - top as f32),
        )
    }
}
