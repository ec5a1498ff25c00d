// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/output/record.rs - 检测记录
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

use serde_json::{Value, json};
use tracing::info;

use crate::{
  model::{Detection, WithLabel},
  output::OutputError,
  summary::{Region, Side},
};

/// 把过滤后的检测结果写成与标注图像同名的 JSON 文件
#[derive(Debug, Default)]
pub struct Record;

impl Record {
  pub fn to_json(
    &self,
    detections: &[Detection],
    width: u32,
    height: u32,
    summary: &str,
  ) -> Value {
    let items: Vec<Value> = detections
      .iter()
      .map(|det| {
        json!({
          "label": det.class_name(),
          "class_id": det.label.to_label_id(),
          "confidence": det.confidence,
          "bbox": [det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2],
          "area_percent": det.bbox.area_percent(width, height),
          "region": Region::of(&det.bbox, height).to_string(),
          "side": Side::of(&det.bbox, width).to_string(),
        })
      })
      .collect();

    json!({
      "generated_at": chrono::Local::now().to_rfc3339(),
      "image": { "width": width, "height": height },
      "detections": items,
      "summary": summary,
    })
  }

  pub fn record(
    &self,
    detections: &[Detection],
    width: u32,
    height: u32,
    summary: &str,
    path: &Path,
  ) -> Result<PathBuf, OutputError> {
    let path = path.with_extension("json");
    let value = self.to_json(detections, width, height, summary);
    std::fs::write(&path, serde_json::to_string_pretty(&value)?)?;
    info!("保存检测记录: {}", path.display());
    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{BBox, FractureLabel};

  fn detections() -> Vec<Detection> {
    vec![Detection::new(
      FractureLabel::FingersPositive,
      0.66,
      BBox::new(10, 500, 110, 600).unwrap(),
    )]
  }

  #[test]
  fn json_contains_geometry_and_summary() {
    let value = Record.to_json(&detections(), 1000, 800, "summary text");
    let det = &value["detections"][0];
    assert_eq!(det["label"], "fingers positive");
    assert_eq!(det["class_id"], 1);
    assert_eq!(det["bbox"], json!([10, 500, 110, 600]));
    assert_eq!(det["region"], "lower");
    assert_eq!(det["side"], "left");
    assert_eq!(value["image"]["width"], 1000);
    assert_eq!(value["summary"], "summary text");
  }

  #[test]
  fn record_is_written_beside_annotated_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = Record
      .record(&detections(), 1000, 800, "s", &dir.path().join("arm.png"))
      .unwrap();
    assert_eq!(path, dir.path().join("arm.json"));
    let text = std::fs::read_to_string(path).unwrap();
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["detections"].as_array().unwrap().len(), 1);
  }
}
