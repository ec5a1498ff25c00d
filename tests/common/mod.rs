// 该文件是 Gujian （骨鉴） 项目的一部分。
// tests/common/mod.rs - 集成测试公共工具
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

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgb, RgbImage};

use gujian::{
  FracturePipeline, PipelineConfig,
  model::{DetectItem, DetectResult, DetectionEngine, Model, ModelBuilder, ModelError, Thresholds},
  output::draw::Draw,
};

#[derive(Debug, thiserror::Error)]
#[error("脚本化推理失败")]
pub struct ScriptedError;

/// 每次推理都返回同一组候选框
pub struct ScriptedModel {
  items: Vec<DetectItem>,
  fail: bool,
}

impl ScriptedModel {
  pub fn returning(items: Vec<DetectItem>) -> Self {
    Self { items, fail: false }
  }

  pub fn empty() -> Self {
    Self::returning(Vec::new())
  }

  pub fn failing() -> Self {
    Self {
      items: Vec::new(),
      fail: true,
    }
  }
}

impl Model for ScriptedModel {
  type Error = ScriptedError;

  fn infer(&mut self, _input: &RgbImage, _: &Thresholds) -> Result<DetectResult, Self::Error> {
    if self.fail {
      return Err(ScriptedError);
    }
    Ok(self.items.iter().cloned().collect())
  }
}

pub struct ScriptedBuilder {
  pub path: PathBuf,
}

impl ModelBuilder for ScriptedBuilder {
  type Model = ScriptedModel;

  fn model_path(&self) -> &Path {
    &self.path
  }

  fn build(self) -> Result<ScriptedModel, ModelError> {
    Ok(ScriptedModel::empty())
  }
}

pub fn item(class_id: u32, score: f32, bbox: [f32; 4]) -> DetectItem {
  DetectItem {
    class_id,
    score,
    bbox,
  }
}

/// 合成一张类似 X 光片的图像：暗背景上一条亮的“骨骼”
pub fn synthetic_radiograph(width: u32, height: u32) -> RgbImage {
  RgbImage::from_fn(width, height, |x, y| {
    let bone = x > width / 3 && x < width / 2 && y > height / 8 && y < height * 7 / 8;
    let v = if bone {
      200 + ((x + y) % 40) as u8
    } else {
      20 + ((x * 7 + y * 3) % 60) as u8
    };
    Rgb([v, v, v])
  })
}

pub fn write_radiograph(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
  let path = dir.join(name);
  synthetic_radiograph(width, height).save(&path).unwrap();
  path
}

/// 不加载字体，输出与运行环境无关
pub fn pipeline(model: ScriptedModel, processed_dir: &Path) -> FracturePipeline<ScriptedModel> {
  pipeline_with(model, PipelineConfig::default().with_processed_dir(processed_dir))
}

pub fn pipeline_with(model: ScriptedModel, config: PipelineConfig) -> FracturePipeline<ScriptedModel> {
  let engine = Arc::new(DetectionEngine::new(model, Thresholds::default()));
  FracturePipeline::with_draw(config, engine, Draw::default())
}
