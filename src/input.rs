// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/input.rs - 采集源定义
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
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

mod v4l2_source;
pub use self::v4l2_source::V4l2Source;

#[cfg(feature = "read_image_file")]
mod image_file;
#[cfg(feature = "read_image_file")]
pub use self::image_file::ImageFileSource;

/// 解码为 RGB 后的原始采集帧
pub struct RawFrame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 自采集源启动起的时间戳（毫秒）
  pub timestamp_ms: u64,
}

#[derive(Error, Debug)]
pub enum SourceError {
  #[error("无法打开采集设备 {0}: {1}")]
  Open(String, std::io::Error),
  #[error("设备格式配置失败: {0}")]
  Configure(std::io::Error),
  #[error("采集流创建失败: {0}")]
  Stream(std::io::Error),
  #[error("图像解码错误: {0}")]
  Decode(#[from] image::ImageError),
  #[error("不支持的像素格式: {0}")]
  UnsupportedFormat(String),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 采集源：逐帧拉取，或明确告知当前无帧。
///
/// `read_frame` 返回 `Ok(None)` 表示流已结束或本次无帧可取，
/// 由调用方决定停止还是重试；瞬时读取失败不作为错误上抛。
pub trait FrameSource {
  /// 读取下一帧
  fn read_frame(&mut self) -> Result<Option<RawFrame>, SourceError>;

  /// 帧宽度
  fn width(&self) -> u32;

  /// 帧高度
  fn height(&self) -> u32;
}

/// 按 URL 方案选择采集源的包装
pub enum SourceWrapper {
  V4l2(V4l2Source),
  #[cfg(feature = "read_image_file")]
  ImageFile(ImageFileSource),
}

impl FromUrl for SourceWrapper {
  type Error = SourceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() == V4l2Source::SCHEME {
      return Ok(SourceWrapper::V4l2(V4l2Source::from_url(url)?));
    }
    #[cfg(feature = "read_image_file")]
    if url.scheme() == ImageFileSource::SCHEME {
      return Ok(SourceWrapper::ImageFile(ImageFileSource::from_url(url)?));
    }
    Err(SourceError::SchemeMismatch)
  }
}

impl FrameSource for SourceWrapper {
  fn read_frame(&mut self) -> Result<Option<RawFrame>, SourceError> {
    match self {
      SourceWrapper::V4l2(source) => source.read_frame(),
      #[cfg(feature = "read_image_file")]
      SourceWrapper::ImageFile(source) => source.read_frame(),
    }
  }

  fn width(&self) -> u32 {
    match self {
      SourceWrapper::V4l2(source) => source.width(),
      #[cfg(feature = "read_image_file")]
      SourceWrapper::ImageFile(source) => source.width(),
    }
  }

  fn height(&self) -> u32 {
    match self {
      SourceWrapper::V4l2(source) => source.height(),
      #[cfg(feature = "read_image_file")]
      SourceWrapper::ImageFile(source) => source.height(),
    }
  }
}
