// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/frame.rs - 帧定义
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

use crate::preprocess::Letterbox;

/// 去畸变后的帧
#[derive(Debug, Clone)]
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
  /// 采集时间戳（毫秒）
  pub timestamp_ms: u64,
}

/// 信箱化后的方形帧，即下游推理模型的输入
#[derive(Debug, Clone)]
pub struct LetterboxFrame {
  /// target×target 的 RGB 图像数据
  pub image: RgbImage,
  /// 信箱化几何参数，用于把检测框映射回源帧
  pub geometry: Letterbox,
  /// 帧索引
  pub index: u64,
  /// 采集时间戳（毫秒）
  pub timestamp_ms: u64,
}

impl LetterboxFrame {
  /// 方形画布边长
  pub fn size(&self) -> u32 {
    self.geometry.target
  }

  /// 以 NHWC 排列的 RGB 字节访问，即推理输入的内存布局
  pub fn as_nhwc(&self) -> &[u8] {
    self.image.as_raw()
  }
}
