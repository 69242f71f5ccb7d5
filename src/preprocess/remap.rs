// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/preprocess/remap.rs - 去畸变重映射表
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

use image::RgbImage;
use nalgebra::{Matrix3, Vector2};
use tracing::debug;

use crate::calib::FisheyeIntrinsics;

const CHANNELS: usize = 3;

/// 预计算的去畸变重映射表。
///
/// 每个输出像素对应一对源坐标 (map_x, map_y)，由内参与新内参矩阵
/// 一次性派生，构建后只读。表尺寸必须与每一帧输入完全一致。
pub struct RemapTable {
  width: u32,
  height: u32,
  map_x: Box<[f32]>,
  map_y: Box<[f32]>,
}

impl RemapTable {
  /// 由标定参数生成重映射表，O(宽×高)，只在构建时执行一次。
  ///
  /// 对每个输出像素：经新内参矩阵逆投影到归一化平面，施加正向
  /// 鱼眼畸变，再经原内参矩阵投影回源像素坐标。
  pub fn build(
    intrinsics: &FisheyeIntrinsics,
    new_matrix: &Matrix3<f64>,
    width: u32,
    height: u32,
  ) -> Self {
    let len = width as usize * height as usize;
    let mut map_x = vec![0f32; len];
    let mut map_y = vec![0f32; len];

    let fx = new_matrix[(0, 0)];
    let fy = new_matrix[(1, 1)];
    let cx = new_matrix[(0, 2)];
    let cy = new_matrix[(1, 2)];

    for v in 0..height {
      let y = (v as f64 - cy) / fy;
      for u in 0..width {
        let x = (u as f64 - cx) / fx;
        let distorted = intrinsics.distort(Vector2::new(x, y));
        let src = intrinsics.normalized_to_pixel(distorted);
        let idx = (v * width + u) as usize;
        map_x[idx] = src.x as f32;
        map_y[idx] = src.y as f32;
      }
    }

    debug!("重映射表生成完成: {}x{}", width, height);
    Self {
      width,
      height,
      map_x: map_x.into_boxed_slice(),
      map_y: map_y.into_boxed_slice(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// 双线性重映射，输出尺寸与输入一致。
  ///
  /// 落在源图之外的采样点填充黑色。输入帧尺寸必须与表一致，
  /// 不一致属于编程错误。
  pub fn remap(&self, src: &RgbImage) -> RgbImage {
    assert_eq!(
      (src.width(), src.height()),
      (self.width, self.height),
      "重映射表尺寸与输入帧不一致"
    );

    let raw = src.as_raw();
    let mut dst = vec![0u8; raw.len()];

    for idx in 0..(self.width as usize * self.height as usize) {
      if let Some(pixel) = sample_bilinear(raw, self.width, self.height, self.map_x[idx], self.map_y[idx]) {
        dst[idx * CHANNELS..idx * CHANNELS + CHANNELS].copy_from_slice(&pixel);
      }
    }

    RgbImage::from_raw(self.width, self.height, dst)
      .expect("重映射输出缓冲区尺寸不一致")
  }
}

/// 对 RGB 像素缓冲区做双线性采样；采样点出界时返回 None。
fn sample_bilinear(raw: &[u8], width: u32, height: u32, sx: f32, sy: f32) -> Option<[u8; 3]> {
  let max_x = (width - 1) as f32;
  let max_y = (height - 1) as f32;
  if !(sx >= 0.0 && sx <= max_x && sy >= 0.0 && sy <= max_y) {
    return None;
  }

  let x0 = sx.floor() as u32;
  let y0 = sy.floor() as u32;
  let x1 = (x0 + 1).min(width - 1);
  let y1 = (y0 + 1).min(height - 1);
  let tx = sx - x0 as f32;
  let ty = sy - y0 as f32;

  let at = |x: u32, y: u32, c: usize| raw[(y * width + x) as usize * CHANNELS + c] as f32;

  let mut out = [0u8; 3];
  for (c, channel) in out.iter_mut().enumerate() {
    let top = at(x0, y0, c) * (1.0 - tx) + at(x1, y0, c) * tx;
    let bottom = at(x0, y1, c) * (1.0 - tx) + at(x1, y1, c) * tx;
    *channel = (top * (1.0 - ty) + bottom * ty).round() as u8;
  }
  Some(out)
}
