// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::Parser;
use url::Url;

use gujian::config::{DEFAULT_PROCESSED_DIR, DEFAULT_UPLOAD_DIR};

/// Gujian 骨折检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，例如 yolov8:bonefracture_yolov8.onnx
  #[arg(long, default_value = "yolov8:bonefracture_yolov8.onnx", value_name = "MODEL")]
  pub model: Url,

  /// 待检测的 X 光片（png、jpg、jpeg）
  #[arg(long, value_name = "FILE")]
  pub input: PathBuf,

  /// 上传文件暂存目录
  #[arg(long, default_value = DEFAULT_UPLOAD_DIR, value_name = "DIR")]
  pub upload_dir: PathBuf,

  /// 处理结果输出目录
  #[arg(long, default_value = DEFAULT_PROCESSED_DIR, value_name = "DIR")]
  pub processed_dir: PathBuf,

  /// 标签字体文件，未指定时查找系统字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 同时写出 JSON 检测记录
  #[arg(long)]
  pub record: bool,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// ONNX Runtime 线程数
  #[arg(long, default_value = "4", value_name = "COUNT")]
  pub threads: usize,
}
