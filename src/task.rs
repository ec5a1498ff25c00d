// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/task.rs - 骨折检测流水线
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

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info, info_span};

use crate::{
  config::PipelineConfig,
  filter::filter_detections,
  input::{ImageFileInput, ImageFileInputError},
  model::{Detection, DetectionEngine, Model, ModelError},
  output::{ArtifactKind, OutputError, Record, Render, SaveImageFileOutput, draw::Draw},
  preprocess::preprocess,
  summary::summarize,
};

pub const LOAD_FAILURE_MESSAGE: &str = "Error: Could not load image";

/// 单次运行的状态，任一状态出错即终止
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Loading,
  Preprocessing,
  Detecting,
  Filtering,
  Annotating,
  Summarizing,
  Done,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Stage::Loading => "加载",
      Stage::Preprocessing => "预处理",
      Stage::Detecting => "检测",
      Stage::Filtering => "过滤",
      Stage::Annotating => "标注",
      Stage::Summarizing => "摘要",
      Stage::Done => "完成",
    })
  }
}

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("{0}")]
  Load(#[from] ImageFileInputError),
  #[error("{0}")]
  Model(#[from] ModelError),
  #[error("{0}")]
  Output(#[from] OutputError),
}

#[derive(Error, Debug)]
#[error("{stage}阶段失败: {source}")]
pub struct StageError {
  pub stage: Stage,
  #[source]
  pub source: PipelineError,
}

/// 已恢复的失败，调用方只会看到这条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
  pub message: String,
}

impl fmt::Display for Failure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)
  }
}

impl From<StageError> for Failure {
  fn from(err: StageError) -> Self {
    let message = match err.source {
      PipelineError::Load(_) => LOAD_FAILURE_MESSAGE.to_string(),
      other => format!("Error processing image: {}", other),
    };
    Failure { message }
  }
}

/// 一次成功运行返回给调用方的全部结果
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBundle {
  pub annotated_image_path: PathBuf,
  pub grayscale_path: PathBuf,
  pub thresholded_path: PathBuf,
  pub binary_path: PathBuf,
  pub summary_text: String,
  /// 过滤后按置信度降序排列的检测结果
  pub detections: Vec<Detection>,
  pub record_path: Option<PathBuf>,
}

/// 骨折检测流水线
///
/// 检测引擎在组合根构造后注入，多次运行共享同一个实例；除此之外每次运行
/// 互不共享可变状态，可以在不同线程上并发执行。输出文件名由输入文件名
/// 决定，并发运行时输入文件名必须互不相同。
pub struct FracturePipeline<M> {
  config: PipelineConfig,
  engine: Arc<DetectionEngine<M>>,
  output: SaveImageFileOutput,
  record: Record,
}

impl<M: Model> FracturePipeline<M> {
  pub fn new(config: PipelineConfig, engine: Arc<DetectionEngine<M>>) -> Result<Self, OutputError> {
    let draw = Draw::with_font_path(config.font_path.as_deref())?;
    Ok(Self::with_draw(config, engine, draw))
  }

  pub fn with_draw(config: PipelineConfig, engine: Arc<DetectionEngine<M>>, draw: Draw) -> Self {
    let output = SaveImageFileOutput::new(config.processed_dir.clone(), draw);
    Self {
      config,
      engine,
      output,
      record: Record::default(),
    }
  }

  /// 处理一张图像；任何失败都被恢复为 [`Failure`]，不会导致进程崩溃
  pub fn process_image(&self, image_path: impl AsRef<Path>) -> Result<ResultBundle, Failure> {
    self.run(image_path.as_ref()).map_err(|err| {
      error!("检测出错: {}", err);
      Failure::from(err)
    })
  }

  /// 与 [`process_image`](Self::process_image) 相同，但保留失败所在的阶段
  pub fn run(&self, image_path: &Path) -> Result<ResultBundle, StageError> {
    let _span = info_span!("process_image", path = %image_path.display()).entered();
    let started = Instant::now();

    let mut stage = Stage::Loading;
    let result = self.run_stages(image_path, &mut stage);
    match result {
      Ok(bundle) => {
        info!(
          "处理完成，{} 个检测结果，耗时: {:.2?}",
          bundle.detections.len(),
          started.elapsed()
        );
        Ok(bundle)
      }
      Err(source) => Err(StageError { stage, source }),
    }
  }

  fn run_stages(&self, image_path: &Path, stage: &mut Stage) -> Result<ResultBundle, PipelineError> {
    enter(stage, Stage::Loading);
    let input = ImageFileInput::open(image_path)?;
    let (width, height) = (input.width(), input.height());

    enter(stage, Stage::Preprocessing);
    let derived = preprocess(input.image());
    let grayscale_path =
      self
        .output
        .save_gray(ArtifactKind::Grayscale, image_path, &derived.grayscale)?;
    let thresholded_path =
      self
        .output
        .save_gray(ArtifactKind::Thresholded, image_path, &derived.thresholded)?;
    let binary_path = self
      .output
      .save_gray(ArtifactKind::Binary, image_path, &derived.binary)?;

    enter(stage, Stage::Detecting);
    let candidates = self.engine.detect(&derived.enhanced)?;

    enter(stage, Stage::Filtering);
    let detections = filter_detections(candidates, width, height, &self.config.area_bounds);
    debug!("过滤后保留 {} 个检测结果", detections.len());

    enter(stage, Stage::Annotating);
    let annotated_image_path = self.output.render_result(&input, &detections)?;

    enter(stage, Stage::Summarizing);
    let summary_text = summarize(&detections, width, height);
    let record_path = if self.config.write_record {
      Some(
        self
          .record
          .record(&detections, width, height, &summary_text, &annotated_image_path)?,
      )
    } else {
      None
    };

    enter(stage, Stage::Done);
    Ok(ResultBundle {
      annotated_image_path,
      grayscale_path,
      thresholded_path,
      binary_path,
      summary_text,
      detections,
      record_path,
    })
  }
}

fn enter(stage: &mut Stage, next: Stage) {
  debug!("进入{}阶段", next);
  *stage = next;
}
