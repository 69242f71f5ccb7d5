// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/calib.rs - 鱼眼相机标定参数与畸变模型
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::Path;

use nalgebra::{Matrix3, Vector2, Vector4};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 逆畸变定点迭代次数
const UNDISTORT_ITERS: usize = 10;
/// 视为零半径的阈值
const RADIUS_EPS: f64 = 1e-8;
/// 入射角上限；等距模型无法表示 π/2 及更大的入射角，
/// 超出可表示范围的点按该边界处理
const MAX_THETA: f64 = std::f64::consts::FRAC_PI_2 - 1e-2;
/// 计算去畸变包围矩形时每条边的采样点数
const RECT_GRID_N: usize = 9;

#[derive(Error, Debug)]
pub enum CalibError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标定文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 鱼眼相机标定参数：3×3 内参矩阵与等距模型的 4 个畸变系数。
///
/// 畸变模型为等距（Kannala-Brandt）投影：
/// θd = θ(1 + k1·θ² + k2·θ⁴ + k3·θ⁶ + k4·θ⁸)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FisheyeIntrinsics {
  /// 内参矩阵 K
  pub camera_matrix: Matrix3<f64>,
  /// 畸变系数 [k1, k2, k3, k4]
  pub distortion: Vector4<f64>,
}

/// 归一化坐标平面上的轴对齐矩形
#[derive(Clone, Copy, Debug)]
struct Rect {
  x: f64,
  y: f64,
  width: f64,
  height: f64,
}

impl FisheyeIntrinsics {
  pub fn new(camera_matrix: Matrix3<f64>, distortion: Vector4<f64>) -> Self {
    Self {
      camera_matrix,
      distortion,
    }
  }

  /// 从 JSON 标定文件加载
  pub fn from_json_file(path: &Path) -> Result<Self, CalibError> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
  }

  /// 像素坐标转归一化针孔坐标（经由 K 的逆）
  pub fn pixel_to_normalized(&self, pixel: Vector2<f64>) -> Vector2<f64> {
    let k = &self.camera_matrix;
    Vector2::new(
      (pixel.x - k[(0, 2)]) / k[(0, 0)],
      (pixel.y - k[(1, 2)]) / k[(1, 1)],
    )
  }

  /// 归一化坐标转像素坐标（经由 K）
  pub fn normalized_to_pixel(&self, normalized: Vector2<f64>) -> Vector2<f64> {
    let k = &self.camera_matrix;
    Vector2::new(
      k[(0, 0)] * normalized.x + k[(0, 2)],
      k[(1, 1)] * normalized.y + k[(1, 2)],
    )
  }

  fn theta_factor(&self, theta: f64) -> f64 {
    let d = &self.distortion;
    let t2 = theta * theta;
    let t4 = t2 * t2;
    let t6 = t4 * t2;
    let t8 = t4 * t4;
    1.0 + d.x * t2 + d.y * t4 + d.z * t6 + d.w * t8
  }

  /// 正向畸变：理想针孔归一化坐标 -> 畸变后的归一化坐标
  pub fn distort(&self, undistorted: Vector2<f64>) -> Vector2<f64> {
    let r = undistorted.norm();
    if r < RADIUS_EPS {
      return undistorted;
    }
    let theta = r.atan();
    let theta_d = theta * self.theta_factor(theta);
    undistorted * (theta_d / r)
  }

  /// 逆畸变：畸变后的归一化坐标 -> 理想针孔归一化坐标。
  ///
  /// θ 由定点迭代 θ ← θd / (1 + k1·θ² + …) 求解。
  pub fn undistort(&self, distorted: Vector2<f64>) -> Vector2<f64> {
    let theta_d = distorted.norm();
    if theta_d < RADIUS_EPS {
      return distorted;
    }
    let mut theta = theta_d.min(MAX_THETA);
    for _ in 0..UNDISTORT_ITERS {
      theta = (theta_d / self.theta_factor(theta)).clamp(0.0, MAX_THETA);
    }
    distorted * (theta.tan() / theta_d)
  }

  /// 计算去畸变后的最优新内参矩阵。
  ///
  /// 沿图像采样网格逆畸变，求归一化平面上的内接与外接矩形，
  /// 按 alpha 在两者之间插值：alpha = 0 时输出无黑边，
  /// alpha = 1 时保留全部源像素。
  pub fn optimal_new_matrix(&self, size: (u32, u32), alpha: f64) -> Matrix3<f64> {
    let (inner, outer) = self.undistort_rectangles(size);
    let w = size.0 as f64;
    let h = size.1 as f64;

    // 内接矩形铺满视口的投影
    let fx0 = (w - 1.0) / inner.width;
    let fy0 = (h - 1.0) / inner.height;
    let cx0 = -fx0 * inner.x;
    let cy0 = -fy0 * inner.y;

    // 外接矩形铺满视口的投影
    let fx1 = (w - 1.0) / outer.width;
    let fy1 = (h - 1.0) / outer.height;
    let cx1 = -fx1 * outer.x;
    let cy1 = -fy1 * outer.y;

    let alpha = alpha.clamp(0.0, 1.0);
    Matrix3::new(
      fx0 * (1.0 - alpha) + fx1 * alpha,
      0.0,
      cx0 * (1.0 - alpha) + cx1 * alpha,
      0.0,
      fy0 * (1.0 - alpha) + fy1 * alpha,
      cy0 * (1.0 - alpha) + cy1 * alpha,
      0.0,
      0.0,
      1.0,
    )
  }

  /// 将图像上的采样网格全部逆畸变，返回（内接, 外接）矩形
  fn undistort_rectangles(&self, size: (u32, u32)) -> (Rect, Rect) {
    let w = size.0 as f64;
    let h = size.1 as f64;
    let n = RECT_GRID_N;

    let mut o_x0 = f64::INFINITY;
    let mut o_y0 = f64::INFINITY;
    let mut o_x1 = f64::NEG_INFINITY;
    let mut o_y1 = f64::NEG_INFINITY;

    let mut i_x0 = f64::NEG_INFINITY;
    let mut i_y0 = f64::NEG_INFINITY;
    let mut i_x1 = f64::INFINITY;
    let mut i_y1 = f64::INFINITY;

    for gy in 0..n {
      for gx in 0..n {
        let pixel = Vector2::new(
          gx as f64 * (w - 1.0) / (n - 1) as f64,
          gy as f64 * (h - 1.0) / (n - 1) as f64,
        );
        let p = self.undistort(self.pixel_to_normalized(pixel));

        o_x0 = o_x0.min(p.x);
        o_y0 = o_y0.min(p.y);
        o_x1 = o_x1.max(p.x);
        o_y1 = o_y1.max(p.y);

        if gx == 0 {
          i_x0 = i_x0.max(p.x);
        }
        if gx == n - 1 {
          i_x1 = i_x1.min(p.x);
        }
        if gy == 0 {
          i_y0 = i_y0.max(p.y);
        }
        if gy == n - 1 {
          i_y1 = i_y1.min(p.y);
        }
      }
    }

    let outer = Rect {
      x: o_x0,
      y: o_y0,
      width: o_x1 - o_x0,
      height: o_y1 - o_y0,
    };
    let inner = Rect {
      x: i_x0,
      y: i_y0,
      width: i_x1 - i_x0,
      height: i_y1 - i_y0,
    };
    (inner, outer)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn demo_intrinsics() -> FisheyeIntrinsics {
    FisheyeIntrinsics::new(
      Matrix3::new(
        518.5206194361012,
        0.0,
        932.0926791943779,
        0.0,
        518.0241546073428,
        507.22695301062527,
        0.0,
        0.0,
        1.0,
      ),
      Vector4::new(
        -0.09556402717747697,
        0.012374049436718767,
        -0.010465758469831311,
        0.0033159128053917544,
      ),
    )
  }

  #[test]
  fn pixel_normalized_roundtrip() {
    let intr = demo_intrinsics();
    let pixel = Vector2::new(700.0, 400.0);
    let back = intr.normalized_to_pixel(intr.pixel_to_normalized(pixel));
    assert!((back.x - pixel.x).abs() < 1e-10);
    assert!((back.y - pixel.y).abs() < 1e-10);
  }

  #[test]
  fn principal_point_maps_to_origin() {
    let intr = demo_intrinsics();
    let pixel = Vector2::new(932.0926791943779, 507.22695301062527);
    let normalized = intr.pixel_to_normalized(pixel);
    assert!(normalized.x.abs() < 1e-10);
    assert!(normalized.y.abs() < 1e-10);
  }

  #[test]
  fn distort_keeps_center_fixed() {
    let intr = demo_intrinsics();
    let d = intr.distort(Vector2::new(0.0, 0.0));
    assert!(d.norm() < 1e-12);
  }

  #[test]
  fn distort_undistort_roundtrip() {
    let intr = demo_intrinsics();
    for &(x, y) in &[(0.1, 0.05), (-0.4, 0.3), (0.8, -0.6), (1.2, 1.0)] {
      let p = Vector2::new(x, y);
      let back = intr.undistort(intr.distort(p));
      assert!(
        (back - p).norm() < 1e-5,
        "roundtrip failed for ({x}, {y}): got ({}, {})",
        back.x,
        back.y
      );
    }
  }

  #[test]
  fn distortion_shrinks_off_axis_radius() {
    // 等距投影将 r = tan(θ) 压缩为 θd，远离中心的点半径必然变小
    let intr = demo_intrinsics();
    let p = Vector2::new(1.0, 0.8);
    let d = intr.distort(p);
    assert!(d.norm() < p.norm());
  }

  #[test]
  fn optimal_matrix_is_well_formed() {
    let intr = demo_intrinsics();
    let new_k = intr.optimal_new_matrix((1920, 1080), 1.0);
    assert!(new_k[(0, 0)] > 0.0);
    assert!(new_k[(1, 1)] > 0.0);
    assert!(new_k[(0, 2)] > 0.0 && new_k[(0, 2)] < 1920.0);
    assert!(new_k[(1, 2)] > 0.0 && new_k[(1, 2)] < 1080.0);
    assert!((new_k[(2, 2)] - 1.0).abs() < 1e-12);
  }

  #[test]
  fn alpha_one_keeps_all_samples_in_view() {
    // alpha = 1 时外接矩形铺满视口，所有去畸变采样点都应落在图内
    let intr = demo_intrinsics();
    let (w, h) = (1920u32, 1080u32);
    let new_k = intr.optimal_new_matrix((w, h), 1.0);
    for &(px, py) in &[
      (0.0, 0.0),
      (1919.0, 0.0),
      (0.0, 1079.0),
      (1919.0, 1079.0),
      (960.0, 540.0),
    ] {
      let und = intr.undistort(intr.pixel_to_normalized(Vector2::new(px, py)));
      let u = new_k[(0, 0)] * und.x + new_k[(0, 2)];
      let v = new_k[(1, 1)] * und.y + new_k[(1, 2)];
      assert!(
        u >= -0.5 && u <= w as f64 - 0.5,
        "u out of view for ({px}, {py}): {u}"
      );
      assert!(
        v >= -0.5 && v <= h as f64 - 0.5,
        "v out of view for ({px}, {py}): {v}"
      );
    }
  }
}
