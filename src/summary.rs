// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/summary.rs - 检测结果摘要
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

use std::fmt::{self, Write};

use crate::model::{BBox, Detection};

pub const NO_FRACTURES_MESSAGE: &str = "No fractures detected in the image";

const COLOR_LEGEND: [&str; 6] = [
  "- Blue: Elbow fracture",
  "- Green: Fingers fracture",
  "- Orange: Forearm fracture",
  "- Purple: Humerus fracture",
  "- Yellow: Shoulder fracture",
  "- Pink: Wrist fracture",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
  Upper,
  Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
  Left,
  Right,
}

impl Region {
  /// 框的上边缘位于图像垂直中线之上则为 upper
  pub fn of(bbox: &BBox, image_height: u32) -> Self {
    if (bbox.y1 as f64) < image_height as f64 / 2.0 {
      Region::Upper
    } else {
      Region::Lower
    }
  }
}

impl Side {
  /// 框的左边缘位于图像水平中线左侧则为 left
  pub fn of(bbox: &BBox, image_width: u32) -> Self {
    if (bbox.x1 as f64) < image_width as f64 / 2.0 {
      Side::Left
    } else {
      Side::Right
    }
  }
}

impl fmt::Display for Region {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Region::Upper => "upper",
      Region::Lower => "lower",
    })
  }
}

impl fmt::Display for Side {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Side::Left => "left",
      Side::Right => "right",
    })
  }
}

/// 生成给医生阅读的多行摘要，`detections` 需已按置信度排序
pub fn summarize(detections: &[Detection], width: u32, height: u32) -> String {
  if detections.is_empty() {
    return NO_FRACTURES_MESSAGE.to_string();
  }

  let mut result = format!("Found {} detection(s)\n", detections.len());
  result.push_str("\nDetected fractures:");
  for (i, det) in detections.iter().enumerate() {
    let region = Region::of(&det.bbox, height);
    let side = Side::of(&det.bbox, width);
    // 写入 String 不会失败
    let _ = write!(
      result,
      "\n{}. {} ({}-{} region)\n   Confidence: {:.2}",
      i + 1,
      det.class_name(),
      region,
      side,
      det.confidence
    );
  }

  result.push_str("\n\nColor Legend:");
  for line in COLOR_LEGEND {
    result.push('\n');
    result.push_str(line);
  }

  result
}
