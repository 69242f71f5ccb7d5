// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;
use url::Url;

use super::Render;
use crate::frame::LetterboxFrame;
use crate::model::{DetectResult, ReplayRecord, WithLabel};
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum DirectoryRecordError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像保存错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("记录序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

/// 目录记录输出：逐帧保存图像与检测记录。
///
/// 每帧写两个文件：帧图像（PNG）与同名的 JSON 检测记录，
/// 记录格式与回放模型读取的一致，可直接回放。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: Mutex<u64>,
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Result<Self, DirectoryRecordError> {
    let directory = directory.into();
    std::fs::create_dir_all(&directory)?;
    Ok(Self {
      directory,
      frame_counter: Mutex::new(0),
    })
  }
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DirectoryRecordError::SchemeMismatch);
    }
    Self::new(url.path())
  }
}

impl<T: WithLabel> Render<LetterboxFrame, DetectResult<T>> for DirectoryRecordOutput {
  type Error = DirectoryRecordError;

  fn render_result(
    &self,
    frame: &LetterboxFrame,
    result: &DetectResult<T>,
  ) -> Result<(), Self::Error> {
    let counter = {
      let mut counter = self
        .frame_counter
        .lock()
        .expect("帧计数器锁中毒");
      let current = *counter;
      *counter += 1;
      current
    };

    let stem = format!("{}-{:06}", Utc::now().format("%Y%m%d-%H%M%S"), counter);
    let image_path = self.directory.join(format!("{stem}.png"));
    let record_path = self.directory.join(format!("{stem}.json"));

    frame.image.save(&image_path)?;

    let records: Vec<ReplayRecord> = result
      .items
      .iter()
      .map(|item| ReplayRecord {
        class_id: item.kind.to_label_id(),
        score: item.score,
        bbox: item.bbox,
      })
      .collect();
    std::fs::write(&record_path, serde_json::to_string_pretty(&records)?)?;

    Ok(())
  }
}
