// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gujian::{
  FracturePipeline, FromUrl, PipelineConfig,
  input::{UploadError, stage_upload},
  model::{DetectionEngine, Thresholds, Yolov8Builder},
};

fn main() -> Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = args::Args::parse();

  info!("模型路径: {}", args.model);
  info!("输入文件: {}", args.input.display());
  info!("输出目录: {}", args.processed_dir.display());

  // 检测引擎只在启动时构造一次，模型缺失直接退出
  let thresholds = Thresholds {
    confidence: args.confidence,
    iou: args.nms_threshold,
  };
  let builder = Yolov8Builder::from_url(&args.model)
    .with_context(|| format!("无效的模型路径: {}", args.model))?
    .intra_threads(args.threads);
  let engine = Arc::new(DetectionEngine::from_builder(builder, thresholds).context("检测引擎初始化失败")?);

  let config = PipelineConfig::default()
    .with_processed_dir(&args.processed_dir)
    .with_font_path(args.font.clone())
    .with_record(args.record);
  let pipeline = FracturePipeline::new(config, engine).context("无法加载标签字体")?;

  let staged = match stage_upload(&args.input, &args.upload_dir) {
    Ok(path) => path,
    Err(UploadError::IoError(e)) => {
      return Err(anyhow::Error::from(e).context(format!("无法暂存上传文件: {}", args.input.display())));
    }
    Err(e) => {
      error!("上传文件无效: {}", e);
      println!("Invalid file type");
      return Ok(ExitCode::FAILURE);
    }
  };

  match pipeline.process_image(&staged) {
    Ok(bundle) => {
      println!("annotated_image_path: {}", bundle.annotated_image_path.display());
      println!("grayscale_path: {}", bundle.grayscale_path.display());
      println!("thresholded_path: {}", bundle.thresholded_path.display());
      println!("binary_path: {}", bundle.binary_path.display());
      if let Some(record_path) = &bundle.record_path {
        println!("record_path: {}", record_path.display());
      }
      println!();
      println!("{}", bundle.summary_text);
      Ok(ExitCode::SUCCESS)
    }
    Err(failure) => {
      println!("{}", failure);
      Ok(ExitCode::FAILURE)
    }
  }
}
