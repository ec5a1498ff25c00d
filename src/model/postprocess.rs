// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/model/postprocess.rs - YOLOv8 前后处理
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

use image::{
  Rgb, RgbImage,
  imageops::{self, FilterType},
};
use tracing::debug;

use crate::model::{DetectItem, ModelError, Thresholds};

pub const YOLOV8_INPUT_SIZE: u32 = 640;
pub const YOLOV8_PAD_VALUE: u8 = 114;
pub const YOLOV8_MAX_DET: usize = 300;

/// 等比缩放并居中填充后的几何信息，用于把检测框映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub gain: f32,
  pub pad_x: u32,
  pub pad_y: u32,
  pub src_width: u32,
  pub src_height: u32,
}

impl Letterbox {
  pub fn new(src_width: u32, src_height: u32, size: u32) -> Self {
    let gain = (size as f32 / src_width as f32).min(size as f32 / src_height as f32);
    let new_w = ((src_width as f32 * gain).round() as u32).clamp(1, size);
    let new_h = ((src_height as f32 * gain).round() as u32).clamp(1, size);
    let pad_x = ((size - new_w) as f32 / 2.0 - 0.1).round().max(0.0) as u32;
    let pad_y = ((size - new_h) as f32 / 2.0 - 0.1).round().max(0.0) as u32;

    Self {
      gain,
      pad_x,
      pad_y,
      src_width,
      src_height,
    }
  }

  pub fn scaled_size(&self) -> (u32, u32) {
    (
      ((self.src_width as f32 * self.gain).round() as u32).max(1),
      ((self.src_height as f32 * self.gain).round() as u32).max(1),
    )
  }

  /// 生成 size×size 的输入画布
  pub fn apply(&self, image: &RgbImage, size: u32) -> RgbImage {
    let (new_w, new_h) = self.scaled_size();
    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([YOLOV8_PAD_VALUE; 3]));
    imageops::replace(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);
    canvas
  }

  /// 将输入画布坐标映射回原图，并裁剪到图像范围内
  pub fn restore(&self, bbox: [f32; 4]) -> [f32; 4] {
    let w = self.src_width as f32;
    let h = self.src_height as f32;
    [
      ((bbox[0] - self.pad_x as f32) / self.gain).clamp(0.0, w),
      ((bbox[1] - self.pad_y as f32) / self.gain).clamp(0.0, h),
      ((bbox[2] - self.pad_x as f32) / self.gain).clamp(0.0, w),
      ((bbox[3] - self.pad_y as f32) / self.gain).clamp(0.0, h),
    ]
  }
}

/// 将 `[1, 4 + nc, N]` 或 `[1, N, 4 + nc]` 的原始输出解码为候选框
///
/// 返回的坐标仍位于输入画布坐标系。
pub fn decode(
  shape: &[i64],
  data: &[f32],
  num_classes: usize,
  thresholds: &Thresholds,
) -> Result<Vec<DetectItem>, ModelError> {
  let features = 4 + num_classes;
  if shape.len() != 3 || shape.iter().any(|&d| d <= 0) {
    return Err(ModelError::InvalidOutput(format!(
      "期望三维输出，实际形状 {:?}",
      shape
    )));
  }

  let (anchors, transposed) = if shape[1] as usize == features {
    (shape[2] as usize, false)
  } else if shape[2] as usize == features {
    (shape[1] as usize, true)
  } else {
    return Err(ModelError::InvalidOutput(format!(
      "输出形状 {:?} 与类别数 {} 不匹配",
      shape, num_classes
    )));
  };

  if data.len() < anchors * features {
    return Err(ModelError::InvalidOutput(format!(
      "输出长度 {} 小于 {}",
      data.len(),
      anchors * features
    )));
  }

  let at = |anchor: usize, feature: usize| {
    if transposed {
      data[anchor * features + feature]
    } else {
      data[feature * anchors + anchor]
    }
  };

  let mut items = Vec::new();
  for anchor in 0..anchors {
    let (class_id, score) = (0..num_classes)
      .map(|c| (c, at(anchor, 4 + c)))
      .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    if score <= thresholds.confidence {
      continue;
    }

    let (cx, cy, w, h) = (at(anchor, 0), at(anchor, 1), at(anchor, 2), at(anchor, 3));
    items.push(DetectItem {
      class_id: class_id as u32,
      score,
      bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
    });
  }

  debug!("置信度过滤后剩余 {} 个候选框", items.len());
  Ok(items)
}

/// 按类别做非极大值抑制，结果按置信度降序，至多保留 `max_det` 个
pub fn nms(mut items: Vec<DetectItem>, iou_threshold: f32, max_det: usize) -> Vec<DetectItem> {
  items.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result: Vec<DetectItem> = Vec::new();
  for item in items {
    if result.len() >= max_det {
      break;
    }
    let suppressed = result
      .iter()
      .any(|kept| kept.class_id == item.class_id && iou(&kept.bbox, &item.bbox) > iou_threshold);
    if !suppressed {
      result.push(item);
    }
  }

  result
}

/// 计算两个边界框的 IoU
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}
