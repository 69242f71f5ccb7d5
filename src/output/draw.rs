// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/output/draw.rs - 检测结果绘制
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::model::{DetectItem, DetectResult, WithLabel};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_HEIGHT: i32 = 20;
const LABEL_CHAR_WIDTH: f32 = 9.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色文本

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无效的字体文件: {0}")]
  InvalidFont(String),
}

/// 检测结果绘制工具。
///
/// 边框始终绘制；标签文字只在加载了字体时绘制。
pub struct Draw {
  font: Option<FontArc>,
  font_size: f32,
  box_color: Rgb<u8>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      box_color: Rgb(BOX_COLOR),
    }
  }
}

impl Draw {
  /// 从字体文件加载标签字体
  pub fn with_font_file(mut self, path: &Path) -> Result<Self, DrawError> {
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)
      .map_err(|_| DrawError::InvalidFont(path.display().to_string()))?;
    self.font = Some(font);
    Ok(self)
  }

  /// 在图像上绘制全部检测结果
  pub fn draw_detections<T: WithLabel>(&self, image: &mut RgbImage, result: &DetectResult<T>) {
    for item in result.items.iter() {
      self.draw_item(image, item);
    }
  }

  // bbox 为归一化坐标 [x_min, y_min, x_max, y_max]
  fn draw_item<T: WithLabel>(&self, image: &mut RgbImage, item: &DetectItem<T>) {
    let (w, h) = (image.width() as f32, image.height() as f32);

    let x_min = ((item.bbox[0] * w).floor() as i32).clamp(0, w as i32 - 1);
    let y_min = ((item.bbox[1] * h).floor() as i32).clamp(0, h as i32 - 1);
    let x_max = ((item.bbox[2] * w).ceil() as i32).clamp(0, w as i32 - 1);
    let y_max = ((item.bbox[3] * h).ceil() as i32).clamp(0, h as i32 - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let rect = Rect::at(x_min, y_min).of_size((x_max - x_min) as u32, (y_max - y_min) as u32);
    draw_hollow_rect_mut(image, rect, self.box_color);

    // 第二个边框以增加可见度
    if x_max - x_min > 2 && y_max - y_min > 2 {
      let inner =
        Rect::at(x_min + 1, y_min + 1).of_size((x_max - x_min - 2) as u32, (y_max - y_min - 2) as u32);
      draw_hollow_rect_mut(image, inner, self.box_color);
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = format!("{} {:.2}", item.kind.to_label_str(), item.score);
    let text_width = (label.len() as f32 * LABEL_CHAR_WIDTH) as i32;
    let label_x = x_min;
    let label_y = (y_min - LABEL_TEXT_HEIGHT).max(0);
    let label_width = text_width.min(w as i32 - label_x);

    if label_width > 0 {
      let background =
        Rect::at(label_x, label_y).of_size(label_width as u32, LABEL_TEXT_HEIGHT as u32);
      draw_filled_rect_mut(image, background, self.box_color);

      draw_text_mut(
        image,
        Rgb(TEXT_COLOR),
        label_x,
        label_y + LABEL_TEXT_VERTICAL_PADDING,
        PxScale::from(self.font_size),
        font,
        &label,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::CocoLabel;

  fn result_with(bbox: [f32; 4]) -> DetectResult<CocoLabel> {
    DetectResult {
      items: vec![DetectItem {
        kind: CocoLabel(0),
        score: 0.9,
        bbox,
      }]
      .into_boxed_slice(),
    }
  }

  #[test]
  fn draws_box_border_pixels() {
    let mut image = RgbImage::new(100, 100);
    Draw::default().draw_detections(&mut image, &result_with([0.2, 0.2, 0.8, 0.8]));

    assert_eq!(*image.get_pixel(20, 20), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(50, 20), Rgb(BOX_COLOR));
    // 框内部保持原样
    assert_eq!(*image.get_pixel(50, 50), Rgb([0, 0, 0]));
  }

  #[test]
  fn degenerate_box_is_skipped() {
    let mut image = RgbImage::new(100, 100);
    let before = image.clone();
    Draw::default().draw_detections(&mut image, &result_with([0.5, 0.5, 0.5, 0.5]));
    assert_eq!(image.as_raw(), before.as_raw());
  }

  #[test]
  fn out_of_range_box_is_clamped_without_panic() {
    let mut image = RgbImage::new(100, 100);
    Draw::default().draw_detections(&mut image, &result_with([-0.5, -0.5, 1.5, 1.5]));
    assert_eq!(*image.get_pixel(0, 0), Rgb(BOX_COLOR));
  }
}
