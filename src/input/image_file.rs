// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/input/image_file.rs - 图像文件采集源
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

use image::{ImageReader, RgbImage};
use url::Url;

use super::{FrameSource, RawFrame, SourceError};
use crate::{FromUrl, FromUrlWithScheme};

/// 图像文件采集源：把单张图片当作一帧输入，读取一次后即枯竭。
///
/// 用于在没有摄像头的环境中运行和验证整条流水线。
pub struct ImageFileSource {
  image: Option<RgbImage>,
  width: u32,
  height: u32,
}

impl ImageFileSource {
  pub fn open(path: &str) -> Result<Self, SourceError> {
    let image = ImageReader::open(path)
      .map_err(|e| SourceError::Open(path.to_string(), e))?
      .decode()?
      .into_rgb8();
    let (width, height) = image.dimensions();
    Ok(Self {
      image: Some(image),
      width,
      height,
    })
  }
}

impl FromUrlWithScheme for ImageFileSource {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileSource {
  type Error = SourceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SourceError::SchemeMismatch);
    }
    Self::open(url.path())
  }
}

impl FrameSource for ImageFileSource {
  fn read_frame(&mut self) -> Result<Option<RawFrame>, SourceError> {
    Ok(self.image.take().map(|image| RawFrame {
      image,
      timestamp_ms: 0,
    }))
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }
}
