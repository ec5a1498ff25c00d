// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/model/yolov8.rs - YOLOv8 ONNX 检测器
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
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{
    DetectResult, FractureLabel, Model, ModelBuilder, ModelError, Thresholds,
    postprocess::{Letterbox, YOLOV8_INPUT_SIZE, YOLOV8_MAX_DET, decode, nms},
  },
};

const YOLOV8_INTRA_THREADS: usize = 4;

#[derive(Error, Debug)]
pub enum Yolov8Error {
  #[error("ONNX Runtime 错误: {0}")]
  Ort(String),
  #[error("模型缺少输出节点")]
  MissingOutput,
  #[error("{0}")]
  Postprocess(#[from] ModelError),
}

fn ort_error(e: impl std::fmt::Display) -> Yolov8Error {
  Yolov8Error::Ort(e.to_string())
}

fn load_error(e: impl std::fmt::Display) -> ModelError {
  ModelError::ModelLoad(e.to_string())
}

/// 导出为 ONNX 的 YOLOv8 骨折检测模型
pub struct Yolov8 {
  session: Session,
}

pub struct Yolov8Builder {
  model_path: PathBuf,
  intra_threads: usize,
}

impl FromUrlWithScheme for Yolov8Builder {
  const SCHEME: &'static str = "yolov8";
}

impl FromUrl for Yolov8Builder {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(Yolov8Builder::new(url.path()))
  }
}

impl Yolov8Builder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      intra_threads: YOLOV8_INTRA_THREADS,
    }
  }

  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = threads.max(1);
    self
  }
}

impl ModelBuilder for Yolov8Builder {
  type Model = Yolov8;

  fn model_path(&self) -> &Path {
    &self.model_path
  }

  fn build(self) -> Result<Yolov8, ModelError> {
    info!("创建 ONNX Runtime 推理会话");
    let session = Session::builder()
      .map_err(load_error)?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(load_error)?
      .with_intra_threads(self.intra_threads)
      .map_err(load_error)?
      .commit_from_file(&self.model_path)
      .map_err(load_error)?;

    debug!("模型输入数量: {}", session.inputs.len());
    debug!("模型输出数量: {}", session.outputs.len());

    Ok(Yolov8 { session })
  }
}

impl Yolov8 {
  fn preprocess(&self, image: &RgbImage) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::new(image.width(), image.height(), YOLOV8_INPUT_SIZE);
    let canvas = letterbox.apply(image, YOLOV8_INPUT_SIZE);

    let size = YOLOV8_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in canvas.enumerate_pixels() {
      for c in 0..3 {
        tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
      }
    }

    (tensor, letterbox)
  }
}

impl Model for Yolov8 {
  type Error = Yolov8Error;

  fn infer(
    &mut self,
    input: &RgbImage,
    thresholds: &Thresholds,
  ) -> Result<DetectResult, Self::Error> {
    let (tensor, letterbox) = self.preprocess(input);
    let input_value = Tensor::from_array(tensor).map_err(ort_error)?;

    debug!("执行模型推理");
    let outputs = self
      .session
      .run(ort::inputs![input_value])
      .map_err(ort_error)?;

    let output = outputs
      .get("output0")
      .or_else(|| outputs.get("output"))
      .ok_or(Yolov8Error::MissingOutput)?;
    let (shape, data) = output.try_extract_tensor::<f32>().map_err(ort_error)?;
    debug!("模型输出形状: {:?}", shape);

    let candidates = decode(shape, data, FractureLabel::COUNT, thresholds)?;
    let kept = nms(candidates, thresholds.iou, YOLOV8_MAX_DET);
    debug!("NMS 后剩余 {} 个候选框", kept.len());

    Ok(
      kept
        .into_iter()
        .map(|mut item| {
          item.bbox = letterbox.restore(item.bbox);
          item
        })
        .collect(),
    )
  }
}
