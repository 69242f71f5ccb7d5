// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/input/v4l2_source.rs - V4L2 摄像头采集源
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

use std::pin::Pin;
use std::time::Instant;

use image::RgbImage;
use tracing::{info, warn};
use url::Url;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::video::capture::Parameters;

use super::{FrameSource, RawFrame, SourceError};
use crate::{FromUrl, FromUrlWithScheme};

const CAPTURE_WIDTH: u32 = 1920;
const CAPTURE_HEIGHT: u32 = 1080;
const CAPTURE_FPS: u32 = 30;
const CAPTURE_FOURCC: &[u8; 4] = b"MJPG";
const BUFFER_COUNT: u32 = 4;

/// V4L2 摄像头采集源。
///
/// 打开后请求 1920×1080 @ 30fps 的 MJPG 压缩格式；设备不接受时
/// 记录警告并沿用设备实际给出的格式（只要仍可解码）。
///
/// 由于 v4l 库的 Stream 需要引用 Device，我们使用 Pin<Box> 来保证
/// Device 的内存地址稳定，从而可以安全地创建引用它的 Stream。
pub struct V4l2Source {
  /// V4L2 设备（使用 Pin<Box> 固定内存位置）
  device: Pin<Box<Device>>,
  /// 捕获流（生命周期与 device 关联）
  stream: Option<Stream<'static>>,
  /// 设备实际输出的像素格式
  fourcc: FourCC,
  /// 视频宽度
  width: u32,
  /// 视频高度
  height: u32,
  /// 开始时间
  start_time: Instant,
}

impl V4l2Source {
  /// 按设备序号打开摄像头（/dev/videoN）
  pub fn open_index(index: usize) -> Result<Self, SourceError> {
    Self::open_path(&format!("/dev/video{index}"))
  }

  /// 按设备路径打开摄像头
  pub fn open_path(device_path: &str) -> Result<Self, SourceError> {
    let device = Box::pin(
      Device::with_path(device_path)
        .map_err(|e| SourceError::Open(device_path.to_string(), e))?,
    );

    // 请求固定的采集格式
    let mut format = device.format().map_err(SourceError::Configure)?;
    format.width = CAPTURE_WIDTH;
    format.height = CAPTURE_HEIGHT;
    format.fourcc = FourCC::new(CAPTURE_FOURCC);
    let format = device.set_format(&format).map_err(SourceError::Configure)?;

    if format.fourcc != FourCC::new(CAPTURE_FOURCC) {
      warn!("视频格式设置未生效，实际格式: {}", format.fourcc);
    }
    if format.width != CAPTURE_WIDTH || format.height != CAPTURE_HEIGHT {
      warn!(
        "分辨率设置未生效，实际分辨率: {}x{}",
        format.width, format.height
      );
    }
    match &format.fourcc.repr {
      b"MJPG" | b"YUYV" | b"RGB3" => {}
      _ => return Err(SourceError::UnsupportedFormat(format.fourcc.to_string())),
    }

    if let Err(e) = device.set_params(&Parameters::with_fps(CAPTURE_FPS)) {
      warn!("帧率设置失败: {}", e);
    }

    let mut source = Self {
      device,
      stream: None,
      fourcc: format.fourcc,
      width: format.width,
      height: format.height,
      start_time: Instant::now(),
    };

    // SAFETY: device 被 Pin<Box> 固定，不会移动，所以引用始终有效
    // Stream 的生命周期通过 source 的 Drop 来管理
    let device_ref: &Device = &source.device;
    let stream = unsafe {
      // 将设备引用的生命周期延长到 'static
      // 这是安全的，因为:
      // 1. device 被 Pin<Box> 固定在堆上，不会移动
      // 2. stream 存储在同一个结构体中，会在 device 之前被 drop
      // 3. Drop 顺序：stream (Option::take) -> device
      let device_static: &'static Device = std::mem::transmute(device_ref);
      Stream::with_buffers(device_static, Type::VideoCapture, BUFFER_COUNT)
        .map_err(SourceError::Stream)?
    };
    source.stream = Some(stream);

    info!(
      "摄像头已打开: {} {}x{} {}",
      device_path, source.width, source.height, source.fourcc
    );
    Ok(source)
  }
}

impl Drop for V4l2Source {
  fn drop(&mut self) {
    // 确保 stream 在 device 之前被 drop
    self.stream.take();
  }
}

impl FromUrlWithScheme for V4l2Source {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for V4l2Source {
  type Error = SourceError;

  /// 支持 v4l:///dev/video0 与 v4l:///0（设备序号）两种写法，
  /// 路径为空时默认 /dev/video0。
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SourceError::SchemeMismatch);
    }

    let path = url.path();
    if path.is_empty() || path == "/" {
      return Self::open_path("/dev/video0");
    }
    if let Ok(index) = path.trim_start_matches('/').parse::<usize>() {
      return Self::open_index(index);
    }
    Self::open_path(path)
  }
}

impl FrameSource for V4l2Source {
  fn read_frame(&mut self) -> Result<Option<RawFrame>, SourceError> {
    let fourcc = self.fourcc;
    let (width, height) = (self.width, self.height);

    let Some(stream) = self.stream.as_mut() else {
      return Ok(None);
    };
    let (buffer, meta) = match stream.next() {
      Ok(pair) => pair,
      Err(e) => {
        warn!("无法捕获帧: {}", e);
        return Ok(None);
      }
    };

    let used = (meta.bytesused as usize).min(buffer.len());
    if used == 0 {
      warn!("捕获到空帧");
      return Ok(None);
    }

    let image = match decode_frame(fourcc, width, height, &buffer[..used]) {
      Ok(image) => image,
      Err(e) => {
        warn!("帧解码失败: {}", e);
        return Ok(None);
      }
    };

    Ok(Some(RawFrame {
      image,
      timestamp_ms: self.start_time.elapsed().as_millis() as u64,
    }))
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }
}

/// 将一帧设备缓冲区解码为 RGB 图像
fn decode_frame(
  fourcc: FourCC,
  width: u32,
  height: u32,
  buffer: &[u8],
) -> Result<RgbImage, SourceError> {
  match &fourcc.repr {
    b"MJPG" => {
      let image = image::load_from_memory_with_format(buffer, image::ImageFormat::Jpeg)?;
      Ok(image.to_rgb8())
    }
    b"YUYV" => {
      let rgb = yuyv_to_rgb(buffer);
      RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| SourceError::UnsupportedFormat("YUYV 缓冲区长度不足".to_string()))
    }
    b"RGB3" => RgbImage::from_raw(width, height, buffer.to_vec())
      .ok_or_else(|| SourceError::UnsupportedFormat("RGB 缓冲区长度不足".to_string())),
    _ => Err(SourceError::UnsupportedFormat(fourcc.to_string())),
  }
}

/// 将 YUYV 格式转换为 RGB
fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
  let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);

  for chunk in yuyv.chunks(4) {
    if chunk.len() < 4 {
      break;
    }

    let y0 = chunk[0] as f32;
    let u = chunk[1] as f32 - 128.0;
    let y1 = chunk[2] as f32;
    let v = chunk[3] as f32 - 128.0;

    // 第一个像素
    let r = (y0 + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y0 - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y0 + 1.772 * u).clamp(0.0, 255.0) as u8;
    rgb.extend_from_slice(&[r, g, b]);

    // 第二个像素
    let r = (y1 + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y1 - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y1 + 1.772 * u).clamp(0.0, 255.0) as u8;
    rgb.extend_from_slice(&[r, g, b]);
  }

  rgb
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn yuyv_neutral_chroma_is_grayscale() {
    // U = V = 128 时应得到 R = G = B = Y
    let rgb = yuyv_to_rgb(&[100, 128, 200, 128]);
    assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
  }

  #[test]
  fn yuyv_truncated_tail_is_dropped() {
    let rgb = yuyv_to_rgb(&[100, 128, 200, 128, 50, 128]);
    assert_eq!(rgb.len(), 6);
  }

  #[test]
  fn decode_rejects_unknown_format() {
    let result = decode_frame(FourCC::new(b"H264"), 4, 4, &[0u8; 16]);
    assert!(matches!(result, Err(SourceError::UnsupportedFormat(_))));
  }
}
