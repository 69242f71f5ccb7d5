// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/tap.rs - 诊断帧旁路
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

/// 诊断帧接收器：预处理过程的旁路观察点。
///
/// 默认不存在任何旁路；只有调用方显式注入时才产生输出，
/// 且旁路失败不得影响主流程。
pub trait FrameTap {
  /// 采集到的原始帧（去畸变前）
  fn raw_frame(&mut self, image: &RgbImage);

  /// 去畸变后的帧
  fn undistorted_frame(&mut self, image: &RgbImage);
}

#[cfg(feature = "directory_record")]
pub use self::directory::DirectoryTap;

#[cfg(feature = "directory_record")]
mod directory {
  use std::path::PathBuf;

  use chrono::Utc;
  use image::RgbImage;
  use tracing::warn;

  use super::FrameTap;

  /// 将原始帧与去畸变帧按时间和序号保存到目录
  pub struct DirectoryTap {
    directory: PathBuf,
    counter: u64,
  }

  impl DirectoryTap {
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
      let directory = directory.into();
      std::fs::create_dir_all(&directory)?;
      Ok(Self {
        directory,
        counter: 0,
      })
    }

    fn save(&self, image: &RgbImage, stage: &str) {
      let name = format!(
        "{}-{:06}-{}.png",
        Utc::now().format("%Y%m%d-%H%M%S"),
        self.counter,
        stage
      );
      let path = self.directory.join(name);
      if let Err(e) = image.save(&path) {
        warn!("诊断帧保存失败 {}: {}", path.display(), e);
      }
    }
  }

  impl FrameTap for DirectoryTap {
    fn raw_frame(&mut self, image: &RgbImage) {
      self.save(image, "origin");
    }

    fn undistorted_frame(&mut self, image: &RgbImage) {
      self.save(image, "undistorted");
      self.counter += 1;
    }
  }
}
