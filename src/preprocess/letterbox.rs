// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/preprocess/letterbox.rs - 等比缩放与方形填充
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

use image::{RgbImage, imageops};

/// 信箱化几何参数：缩放后的内容尺寸与其在方形画布中的偏移。
///
/// 偏移为整数除法结果，奇数余量时上/左侧取较小的一半。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Letterbox {
  /// 源帧宽度
  pub source_width: u32,
  /// 源帧高度
  pub source_height: u32,
  /// 缩放后内容宽度
  pub content_width: u32,
  /// 缩放后内容高度
  pub content_height: u32,
  /// 内容左上角横向偏移
  pub offset_x: u32,
  /// 内容左上角纵向偏移
  pub offset_y: u32,
  /// 方形画布边长
  pub target: u32,
}

impl Letterbox {
  /// 计算保持宽高比的缩放尺寸与居中偏移，长边缩放到 target。
  pub fn compute(source_width: u32, source_height: u32, target: u32) -> Self {
    let (content_width, content_height) = if source_height > source_width {
      (
        (source_width * target / source_height).max(1),
        target,
      )
    } else {
      (
        target,
        (source_height * target / source_width).max(1),
      )
    };

    Letterbox {
      source_width,
      source_height,
      content_width,
      content_height,
      offset_x: (target - content_width) / 2,
      offset_y: (target - content_height) / 2,
      target,
    }
  }

  /// 将画布上的归一化 bbox [x_min, y_min, x_max, y_max]
  /// 映射回源帧像素坐标。
  pub fn unmap_bbox(&self, bbox: &[f32; 4]) -> [f32; 4] {
    let unmap_x = |x: f32| {
      (x * self.target as f32 - self.offset_x as f32) / self.content_width as f32
        * self.source_width as f32
    };
    let unmap_y = |y: f32| {
      (y * self.target as f32 - self.offset_y as f32) / self.content_height as f32
        * self.source_height as f32
    };
    [
      unmap_x(bbox[0]).clamp(0.0, self.source_width as f32),
      unmap_y(bbox[1]).clamp(0.0, self.source_height as f32),
      unmap_x(bbox[2]).clamp(0.0, self.source_width as f32),
      unmap_y(bbox[3]).clamp(0.0, self.source_height as f32),
    ]
  }
}

/// 等比缩放后粘贴到 target×target 的零填充画布中心。
///
/// 缩放固定使用双线性（Triangle）滤波，保证输出可复现；
/// 输出恒为 target×target，填充像素为黑色。
pub fn letterbox(src: &RgbImage, target: u32) -> (RgbImage, Letterbox) {
  let geometry = Letterbox::compute(src.width(), src.height(), target);
  let scaled = imageops::resize(
    src,
    geometry.content_width,
    geometry.content_height,
    imageops::FilterType::Triangle,
  );

  let mut canvas = RgbImage::new(target, target);
  imageops::replace(
    &mut canvas,
    &scaled,
    geometry.offset_x as i64,
    geometry.offset_y as i64,
  );
  (canvas, geometry)
}
