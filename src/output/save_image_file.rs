// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/output/save_image_file.rs - 图像文件输出
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use url::Url;

use super::Render;
use super::draw::{Draw, DrawError};
use crate::frame::LetterboxFrame;
use crate::model::{DetectResult, WithLabel};
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("图像保存错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 把绘制了检测结果的帧保存为单个图像文件。
///
/// URL 形如 file:///path/out.png，可用查询参数 font 指定
/// 标签字体文件（缺省只画框）。
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      draw: Draw::default(),
    }
  }

  /// 启用标签文字绘制
  pub fn with_font_file(mut self, font: &Path) -> Result<Self, SaveImageFileError> {
    self.draw = self.draw.with_font_file(font)?;
    Ok(self)
  }
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "file";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch);
    }

    let mut output = Self::new(url.path());
    for (key, value) in url.query_pairs() {
      if key == "font" {
        output = output.with_font_file(Path::new(value.as_ref()))?;
      }
    }
    Ok(output)
  }
}

impl<T: WithLabel> Render<LetterboxFrame, DetectResult<T>> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(
    &self,
    frame: &LetterboxFrame,
    result: &DetectResult<T>,
  ) -> Result<(), Self::Error> {
    let mut image = frame.image.clone();
    self.draw.draw_detections(&mut image, result);
    image.save(&self.path)?;
    info!("结果已保存: {}", self.path.display());
    Ok(())
  }
}
