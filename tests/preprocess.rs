// 该文件是 Yuyan （鱼眼） 项目的一部分。
// tests/preprocess.rs - 预处理流水线集成测试
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

use image::{Rgb, RgbImage};
use nalgebra::{Matrix3, Vector4};

use yuyan::calib::FisheyeIntrinsics;
use yuyan::camera::FisheyeCamera;
use yuyan::input::{FrameSource, RawFrame, SourceError};

const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// 固定帧序列的合成采集源
struct SyntheticSource {
  frames: Vec<RgbImage>,
  width: u32,
  height: u32,
}

impl SyntheticSource {
  fn new(frames: Vec<RgbImage>, width: u32, height: u32) -> Self {
    let mut frames = frames;
    frames.reverse();
    Self {
      frames,
      width,
      height,
    }
  }
}

impl FrameSource for SyntheticSource {
  fn read_frame(&mut self) -> Result<Option<RawFrame>, SourceError> {
    Ok(self.frames.pop().map(|image| RawFrame {
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

/// 主点居中、畸变极轻的标定，近似"无畸变"相机
fn centered_intrinsics(width: u32, height: u32) -> FisheyeIntrinsics {
  FisheyeIntrinsics::new(
    Matrix3::new(
      width as f64 * 0.45,
      0.0,
      width as f64 / 2.0,
      0.0,
      width as f64 * 0.45,
      height as f64 / 2.0,
      0.0,
      0.0,
      1.0,
    ),
    Vector4::new(1e-6, 0.0, 0.0, 0.0),
  )
}

fn camera_over(
  frames: Vec<RgbImage>,
  width: u32,
  height: u32,
) -> FisheyeCamera<SyntheticSource> {
  let intrinsics = centered_intrinsics(width, height);
  FisheyeCamera::with_source(SyntheticSource::new(frames, width, height), &intrinsics)
}

#[test]
fn undistortion_preserves_capture_dimensions() {
  let (w, h) = (1920u32, 1080u32);
  let mut camera = camera_over(vec![RgbImage::from_pixel(w, h, GRAY)], w, h);
  let frame = camera.acquire_undistorted().unwrap().unwrap();
  assert_eq!(frame.image.dimensions(), (w, h));
}

#[test]
fn letterbox_output_is_square_for_any_aspect() {
  for &(w, h) in &[(1920u32, 1080u32), (1080, 1920), (640, 640), (700, 300)] {
    let mut camera = camera_over(vec![RgbImage::from_pixel(w, h, GRAY)], w, h);
    let frame = camera.acquire_letterboxed(640).unwrap().unwrap();
    assert_eq!(frame.image.dimensions(), (640, 640), "source {w}x{h}");
  }
}

#[test]
fn empty_source_signals_no_frame_on_both_operations() {
  let mut camera = camera_over(vec![], 640, 480);
  assert!(camera.acquire_undistorted().unwrap().is_none());
  assert!(camera.acquire_letterboxed(640).unwrap().is_none());

  let mut camera = camera_over(vec![RgbImage::from_pixel(640, 480, GRAY)], 640, 480);
  assert!(camera.acquire_letterboxed(640).unwrap().is_some());
  // 源枯竭后仍是明确的"无帧"，而不是残缺缓冲区
  assert!(camera.acquire_letterboxed(640).unwrap().is_none());
}

#[test]
fn static_input_yields_identical_frames_across_calls() {
  let (w, h) = (320u32, 240u32);
  let pattern = RgbImage::from_fn(w, h, |x, y| {
    Rgb([(x % 251) as u8, (y % 241) as u8, ((x * y) % 239) as u8])
  });
  let mut camera = camera_over(vec![pattern.clone(), pattern.clone(), pattern], w, h);

  let first = camera.acquire_letterboxed(224).unwrap().unwrap();
  let second = camera.acquire_letterboxed(224).unwrap().unwrap();
  let third = camera.acquire_letterboxed(224).unwrap().unwrap();
  assert_eq!(first.image.as_raw(), second.image.as_raw());
  assert_eq!(second.image.as_raw(), third.image.as_raw());
}

#[test]
fn gray_1080p_letterboxed_to_640_has_centered_band_and_black_padding() {
  let (w, h) = (1920u32, 1080u32);
  let mut camera = camera_over(vec![RgbImage::from_pixel(w, h, GRAY)], w, h);
  let frame = camera.acquire_letterboxed(640).unwrap().unwrap();

  let geometry = frame.geometry;
  assert_eq!(geometry.content_width, 640);
  assert_eq!(geometry.content_height, 360);
  assert_eq!(geometry.offset_y, 140);

  // 上下填充区域必须恰为背景黑
  for y in (0..geometry.offset_y).chain(geometry.offset_y + geometry.content_height..640) {
    for x in 0..640 {
      assert_eq!(*frame.image.get_pixel(x, y), BLACK, "padding at ({x}, {y})");
    }
  }

  // 内容区域应为缩放后的灰色内容；边界一两个像素可能混入
  // 去畸变边缘，中心必须是精确的灰色
  assert_eq!(*frame.image.get_pixel(320, 320), GRAY);
  let band_pixels = (geometry.content_height * 640) as usize;
  let gray_pixels = (geometry.offset_y..geometry.offset_y + geometry.content_height)
    .flat_map(|y| (0..640).map(move |x| (x, y)))
    .filter(|&(x, y)| *frame.image.get_pixel(x, y) == GRAY)
    .count();
  assert!(
    gray_pixels as f64 >= band_pixels as f64 * 0.99,
    "gray {gray_pixels}/{band_pixels}"
  );
}

#[test]
fn letterbox_padding_is_symmetric_within_one_pixel() {
  let (w, h) = (700u32, 300u32);
  let mut camera = camera_over(vec![RgbImage::from_pixel(w, h, GRAY)], w, h);
  let frame = camera.acquire_letterboxed(640).unwrap().unwrap();

  let geometry = frame.geometry;
  let pad_top = geometry.offset_y;
  let pad_bottom = 640 - geometry.offset_y - geometry.content_height;
  assert!(pad_bottom as i64 - pad_top as i64 <= 1);
  assert!(pad_top <= pad_bottom);
}
