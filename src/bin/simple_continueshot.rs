// 该文件是 Yuyan （鱼眼） 项目的一部分。
// src/bin/simple_continueshot.rs - 连续采集推理演示
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

use anyhow::Result;
use clap::Parser;
use nalgebra::{Matrix3, Vector4};
use tracing::info;
use url::Url;

use yuyan::{
  FromUrl,
  calib::FisheyeIntrinsics,
  camera::FisheyeCamera,
  input::SourceWrapper,
  model::ReplayModel,
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};

/// 演示相机的出厂标定参数（可用 --calibration 覆盖）
fn builtin_intrinsics() -> FisheyeIntrinsics {
  let camera_matrix = Matrix3::new(
    518.5206194361012,
    0.0,
    932.0926791943779,
    0.0,
    518.0241546073428,
    507.22695301062527,
    0.0,
    0.0,
    1.0,
  );
  let distortion = Vector4::new(
    -0.09556402717747697,
    0.012374049436718767,
    -0.010465758469831311,
    0.0033159128053917544,
  );
  FisheyeIntrinsics::new(camera_matrix, distortion)
}

/// Yuyan 连续演示参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测模型（如 replay:///path/detections.json）
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源（如 v4l:///dev/video0、v4l:///0 或 image:///path/in.png）
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出（如 folder:///record 或 file:///out.png）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// JSON 标定文件，缺省使用内置演示标定
  #[arg(long, value_name = "FILE")]
  pub calibration: Option<PathBuf>,

  /// 推理输入边长
  #[arg(long, value_name = "SIZE", default_value_t = 640)]
  pub target_size: u32,

  /// 处理帧数上限，0 表示不限
  #[arg(long, value_name = "FRAME_NUMBER", default_value_t = 0)]
  pub frame_number: usize,

  /// 诊断帧输出目录（保存原始帧与去畸变帧）
  #[arg(long, value_name = "DIR")]
  pub tap: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出: {}", args.output);

  let intrinsics = match &args.calibration {
    Some(path) => FisheyeIntrinsics::from_json_file(path)?,
    None => builtin_intrinsics(),
  };

  let source = SourceWrapper::from_url(&args.input)?;
  let camera = FisheyeCamera::with_source(source, &intrinsics);
  #[cfg(feature = "directory_record")]
  let camera = match &args.tap {
    Some(directory) => camera.with_tap(Box::new(yuyan::tap::DirectoryTap::new(directory.clone())?)),
    None => camera,
  };
  #[cfg(not(feature = "directory_record"))]
  if args.tap.is_some() {
    tracing::warn!("未启用 directory_record 特性，忽略 --tap");
  }

  let model = ReplayModel::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let frame_number = (args.frame_number > 0).then_some(args.frame_number);
  ContinuousTask::default()
    .with_frame_number(frame_number)
    .run_task(
      camera.into_letterboxed_iter(args.target_size),
      model,
      output,
    )
}
