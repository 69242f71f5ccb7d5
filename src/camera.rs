// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/camera.rs - 鱼眼相机帧预处理器
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

use thiserror::Error;
use tracing::{debug, info};

use crate::calib::FisheyeIntrinsics;
use crate::frame::{Frame, LetterboxFrame};
use crate::input::{FrameSource, SourceError, V4l2Source};
use crate::preprocess::{RemapTable, letterbox};
use crate::tap::FrameTap;

/// 去畸变保留全部源像素（外接矩形铺满视口）
const NEW_MATRIX_ALPHA: f64 = 1.0;

#[derive(Error, Debug)]
pub enum CameraError {
  #[error("采集源错误: {0}")]
  Source(#[from] SourceError),
}

/// 鱼眼相机帧预处理器。
///
/// 独占一个采集源，持有构建时一次性算好的去畸变重映射表。
/// 整个生命周期单线程同步使用；析构（或 `release`）即进入
/// 终态，设备随之释放。
pub struct FisheyeCamera<S> {
  source: S,
  remap: RemapTable,
  tap: Option<Box<dyn FrameTap>>,
  frame_index: u64,
}

impl FisheyeCamera<V4l2Source> {
  /// 按设备序号打开相机。
  ///
  /// 打开失败返回错误，由调用方决定是否终止进程。
  pub fn open(index: usize, intrinsics: &FisheyeIntrinsics) -> Result<Self, CameraError> {
    let source = V4l2Source::open_index(index)?;
    Ok(Self::with_source(source, intrinsics))
  }
}

impl<S: FrameSource> FisheyeCamera<S> {
  /// 由任意采集源构建预处理器，并按采集尺寸派生重映射表。
  pub fn with_source(source: S, intrinsics: &FisheyeIntrinsics) -> Self {
    let (width, height) = (source.width(), source.height());
    let new_matrix = intrinsics.optimal_new_matrix((width, height), NEW_MATRIX_ALPHA);
    debug!(
      "新内参矩阵: fx={:.2} fy={:.2} cx={:.2} cy={:.2}",
      new_matrix[(0, 0)],
      new_matrix[(1, 1)],
      new_matrix[(0, 2)],
      new_matrix[(1, 2)]
    );
    let remap = RemapTable::build(intrinsics, &new_matrix, width, height);
    info!("鱼眼相机就绪: {}x{}", width, height);

    Self {
      source,
      remap,
      tap: None,
      frame_index: 0,
    }
  }

  /// 注入诊断帧接收器
  pub fn with_tap(mut self, tap: Box<dyn FrameTap>) -> Self {
    self.tap = Some(tap);
    self
  }

  /// 读取一帧并去畸变，输出尺寸与采集尺寸一致。
  ///
  /// `Ok(None)` 表示采集源当前无帧可取。
  pub fn acquire_undistorted(&mut self) -> Result<Option<Frame>, CameraError> {
    let Some(raw) = self.source.read_frame()? else {
      return Ok(None);
    };

    if let Some(tap) = self.tap.as_mut() {
      tap.raw_frame(&raw.image);
    }

    let image = self.remap.remap(&raw.image);

    if let Some(tap) = self.tap.as_mut() {
      tap.undistorted_frame(&image);
    }

    let frame = Frame {
      image,
      index: self.frame_index,
      timestamp_ms: raw.timestamp_ms,
    };
    self.frame_index += 1;
    Ok(Some(frame))
  }

  /// 读取一帧，去畸变后信箱化为 target×target 的方形 RGB 帧。
  ///
  /// "无帧"结果原样向上传递。
  pub fn acquire_letterboxed(
    &mut self,
    target: u32,
  ) -> Result<Option<LetterboxFrame>, CameraError> {
    let Some(frame) = self.acquire_undistorted()? else {
      return Ok(None);
    };

    let (image, geometry) = letterbox(&frame.image, target);
    Ok(Some(LetterboxFrame {
      image,
      geometry,
      index: frame.index,
      timestamp_ms: frame.timestamp_ms,
    }))
  }

  /// 转为信箱化帧迭代器；首个"无帧"结果视为流结束。
  pub fn into_letterboxed_iter(self, target: u32) -> LetterboxIter<S> {
    LetterboxIter {
      camera: self,
      target,
    }
  }

  /// 显式释放相机（终态，设备随之关闭）
  pub fn release(self) {
    info!("释放相机资源");
  }
}

/// 信箱化帧迭代器
pub struct LetterboxIter<S> {
  camera: FisheyeCamera<S>,
  target: u32,
}

impl<S: FrameSource> Iterator for LetterboxIter<S> {
  type Item = Result<LetterboxFrame, CameraError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self.camera.acquire_letterboxed(self.target) {
      Ok(Some(frame)) => Some(Ok(frame)),
      Ok(None) => None,
      Err(e) => Some(Err(e)),
    }
  }
}
