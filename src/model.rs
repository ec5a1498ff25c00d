// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/model.rs - 模型
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

use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;

/// 推理阶段的置信度阈值
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
/// 推理阶段的 NMS IoU 阈值
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
  pub confidence: f32,
  pub iou: f32,
}

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      confidence: DEFAULT_CONFIDENCE_THRESHOLD,
      iou: DEFAULT_IOU_THRESHOLD,
    }
  }
}

/// 检测器的能力：对一张三通道图像给出候选框
///
/// 实现可以是进程内模型，也可以是远程推理服务。`infer` 取 `&mut self`，
/// 并发访问由 [`DetectionEngine`] 串行化。
pub trait Model {
  type Error: std::error::Error + Send + Sync + 'static;

  fn infer(&mut self, input: &RgbImage, thresholds: &Thresholds)
  -> Result<DetectResult, Self::Error>;
}

/// 由模型文件构造检测器
pub trait ModelBuilder {
  type Model: Model;

  fn model_path(&self) -> &Path;
  fn build(self) -> Result<Self::Model, ModelError>;
}

/// 模型原始输出中的一个候选框
#[derive(Debug, Clone)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，输入图像像素坐标
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl FromIterator<DetectItem> for DetectResult {
  fn from_iter<I: IntoIterator<Item = DetectItem>>(iter: I) -> Self {
    DetectResult {
      items: iter.into_iter().collect(),
    }
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> &'static str;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Option<Self>;
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("未找到训练好的模型文件 '{0}'，请将其放到指定位置")]
  ModelNotFound(PathBuf),
  #[error("模型加载错误: {0}")]
  ModelLoad(String),
  #[error("推理错误: {0}")]
  Inference(Box<dyn std::error::Error + Send + Sync>),
  #[error("模型输出无效: {0}")]
  InvalidOutput(String),
  #[error("未知类别索引: {0}")]
  UnknownClass(u32),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("检测器锁已损坏")]
  Poisoned,
}

mod bbox;
pub use self::bbox::{BBox, Detection};

mod label;
pub use self::label::FractureLabel;

mod engine;
pub use self::engine::DetectionEngine;

pub mod postprocess;

#[cfg(feature = "onnx")]
mod yolov8;
#[cfg(feature = "onnx")]
pub use self::yolov8::{Yolov8, Yolov8Builder};
