// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/model/engine.rs - 检测引擎
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

use std::sync::Mutex;

use image::RgbImage;
use tracing::{debug, error, info};

use crate::model::{Detection, Model, ModelBuilder, ModelError, Thresholds};

/// 进程内共享的检测器实例
///
/// 在组合根处构造一次，之后通过 `Arc` 在各次运行间共享。推理调用经由
/// 互斥锁串行执行，阈值在构造时固定。
pub struct DetectionEngine<M> {
  model: Mutex<M>,
  thresholds: Thresholds,
}

impl<M: Model> DetectionEngine<M> {
  pub fn new(model: M, thresholds: Thresholds) -> Self {
    Self {
      model: Mutex::new(model),
      thresholds,
    }
  }

  /// 模型文件不存在时直接返回 [`ModelError::ModelNotFound`]，不会重试
  pub fn from_builder<B>(builder: B, thresholds: Thresholds) -> Result<Self, ModelError>
  where
    B: ModelBuilder<Model = M>,
  {
    let path = builder.model_path().to_path_buf();
    if !path.is_file() {
      error!("模型文件不存在: {}", path.display());
      return Err(ModelError::ModelNotFound(path));
    }

    info!("加载模型文件: {}", path.display());
    let model = builder.build()?;
    info!(
      "模型加载完成，置信度阈值 {}，NMS 阈值 {}",
      thresholds.confidence, thresholds.iou
    );

    Ok(Self::new(model, thresholds))
  }

  pub fn thresholds(&self) -> Thresholds {
    self.thresholds
  }

  /// 对增强后的三通道图像做推理，返回映射好类别名的候选框（模型原始顺序）
  pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, ModelError> {
    let result = {
      let mut model = self.model.lock().map_err(|_| ModelError::Poisoned)?;
      model
        .infer(image, &self.thresholds)
        .map_err(|e| ModelError::Inference(Box::new(e)))?
    };
    debug!("模型返回 {} 个候选框", result.items.len());

    let mut detections = Vec::with_capacity(result.items.len());
    for item in result.items.iter() {
      match Detection::from_item(item)? {
        Some(detection) => detections.push(detection),
        None => debug!("丢弃退化候选框: {:?}", item.bbox),
      }
    }

    Ok(detections)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{DetectItem, DetectResult, FractureLabel};
  use std::path::{Path, PathBuf};

  #[derive(Debug, thiserror::Error)]
  #[error("scripted failure")]
  struct ScriptedError;

  struct Scripted {
    items: Vec<DetectItem>,
    seen: Vec<Thresholds>,
  }

  impl Model for Scripted {
    type Error = ScriptedError;

    fn infer(
      &mut self,
      _input: &RgbImage,
      thresholds: &Thresholds,
    ) -> Result<DetectResult, Self::Error> {
      self.seen.push(*thresholds);
      Ok(self.items.iter().cloned().collect())
    }
  }

  struct Failing;

  impl Model for Failing {
    type Error = ScriptedError;

    fn infer(&mut self, _: &RgbImage, _: &Thresholds) -> Result<DetectResult, Self::Error> {
      Err(ScriptedError)
    }
  }

  struct ScriptedBuilder(PathBuf);

  impl ModelBuilder for ScriptedBuilder {
    type Model = Scripted;

    fn model_path(&self) -> &Path {
      &self.0
    }

    fn build(self) -> Result<Scripted, ModelError> {
      Ok(Scripted {
        items: Vec::new(),
        seen: Vec::new(),
      })
    }
  }

  #[test]
  fn missing_model_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("bonefracture_yolov8.onnx");
    let err = DetectionEngine::from_builder(ScriptedBuilder(missing.clone()), Thresholds::default())
      .err()
      .unwrap();
    assert!(matches!(err, ModelError::ModelNotFound(path) if path == missing));
  }

  #[test]
  fn present_model_is_built_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.onnx");
    std::fs::write(&path, b"weights").unwrap();
    let engine = DetectionEngine::from_builder(ScriptedBuilder(path), Thresholds::default()).unwrap();
    assert_eq!(engine.thresholds(), Thresholds::default());
  }

  #[test]
  fn detect_passes_fixed_thresholds_and_maps_labels() {
    let model = Scripted {
      items: vec![
        DetectItem {
          class_id: 6,
          score: 0.87,
          bbox: [600.4, 100.0, 800.0, 300.9],
        },
        DetectItem {
          class_id: 0,
          score: 0.3,
          bbox: [1.0, 1.0, 1.5, 9.0],
        },
      ],
      seen: Vec::new(),
    };
    let engine = DetectionEngine::new(model, Thresholds::default());
    let detections = engine.detect(&RgbImage::new(10, 10)).unwrap();

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, FractureLabel::WristPositive);
    assert_eq!(detections[0].bbox.x1, 600);
    assert_eq!(detections[0].bbox.y2, 300);

    let seen = engine.model.lock().unwrap().seen.clone();
    assert_eq!(
      seen,
      vec![Thresholds {
        confidence: 0.25,
        iou: 0.45
      }]
    );
  }

  #[test]
  fn inference_failure_is_wrapped() {
    let engine = DetectionEngine::new(Failing, Thresholds::default());
    assert!(matches!(
      engine.detect(&RgbImage::new(4, 4)),
      Err(ModelError::Inference(_))
    ));
  }
}
