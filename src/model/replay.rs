// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/model/replay.rs - 检测记录回放模型
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use url::Url;

use super::{CocoLabel, DetectItem, DetectResult, Model, WithLabel};
use crate::frame::LetterboxFrame;
use crate::{FromUrl, FromUrlWithScheme};

/// 记录文件中的一条检测
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayRecord {
  pub class_id: u32,
  pub score: f32,
  /// 归一化坐标 [x_min, y_min, x_max, y_max]
  pub bbox: [f32; 4],
}

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("记录文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 回放模型：从 JSON 记录文件回放检测结果。
///
/// 在 `Model` 接口中占据加速器后端的位置，便于在没有推理硬件的
/// 环境中运行整条流水线；记录格式与目录记录输出写出的一致。
pub struct ReplayModel {
  records: Vec<ReplayRecord>,
}

impl ReplayModel {
  pub fn from_records(records: Vec<ReplayRecord>) -> Self {
    Self { records }
  }
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayModelError::SchemeMismatch);
    }
    let data = std::fs::read_to_string(url.path())?;
    let records: Vec<ReplayRecord> = serde_json::from_str(&data)?;
    info!("回放记录加载完成: {} 条检测", records.len());
    Ok(Self { records })
  }
}

impl Model for ReplayModel {
  type Input = LetterboxFrame;
  type Output = DetectResult<CocoLabel>;
  type Error = ReplayModelError;

  fn infer(&self, _input: &LetterboxFrame) -> Result<Self::Output, Self::Error> {
    let items = self
      .records
      .iter()
      .map(|record| DetectItem {
        kind: CocoLabel::from_label_id(record.class_id),
        score: record.score,
        bbox: record.bbox,
      })
      .collect::<Vec<_>>()
      .into_boxed_slice();
    Ok(DetectResult { items })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::preprocess::Letterbox;
  use image::RgbImage;

  fn dummy_frame() -> LetterboxFrame {
    LetterboxFrame {
      image: RgbImage::new(64, 64),
      geometry: Letterbox::compute(128, 96, 64),
      index: 0,
      timestamp_ms: 0,
    }
  }

  #[test]
  fn replays_recorded_detections() {
    let model = ReplayModel::from_records(vec![
      ReplayRecord {
        class_id: 0,
        score: 0.9,
        bbox: [0.1, 0.2, 0.3, 0.4],
      },
      ReplayRecord {
        class_id: 16,
        score: 0.5,
        bbox: [0.5, 0.5, 0.9, 0.9],
      },
    ]);

    let result = model.infer(&dummy_frame()).unwrap();
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].kind.to_label_str(), "person");
    assert_eq!(result.items[1].kind.to_label_str(), "dog");
    assert!((result.items[0].score - 0.9).abs() < f32::EPSILON);
    assert_eq!(result.items[1].bbox, [0.5, 0.5, 0.9, 0.9]);
  }

  #[test]
  fn record_json_roundtrip() {
    let record = ReplayRecord {
      class_id: 2,
      score: 0.75,
      bbox: [0.0, 0.25, 0.5, 1.0],
    };
    let text = serde_json::to_string(&vec![record]).unwrap();
    let back: Vec<ReplayRecord> = serde_json::from_str(&text).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].class_id, 2);
    assert_eq!(back[0].bbox, [0.0, 0.25, 0.5, 1.0]);
  }

  #[test]
  fn rejects_wrong_scheme() {
    let url = Url::parse("file:///tmp/records.json").unwrap();
    assert!(matches!(
      ReplayModel::from_url(&url),
      Err(ReplayModelError::SchemeMismatch)
    ));
  }
}
