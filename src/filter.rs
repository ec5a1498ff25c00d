// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/filter.rs - 检测结果过滤
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

use tracing::debug;

use crate::model::Detection;

pub const DEFAULT_MIN_AREA_PERCENT: f64 = 0.1;
pub const DEFAULT_MAX_AREA_PERCENT: f64 = 30.0;

/// 检测框面积占比的闭区间 `[min_percent, max_percent]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaBounds {
  pub min_percent: f64,
  pub max_percent: f64,
}

impl Default for AreaBounds {
  fn default() -> Self {
    Self {
      min_percent: DEFAULT_MIN_AREA_PERCENT,
      max_percent: DEFAULT_MAX_AREA_PERCENT,
    }
  }
}

impl AreaBounds {
  pub fn contains(&self, area_percent: f64) -> bool {
    self.min_percent <= area_percent && area_percent <= self.max_percent
  }
}

/// 按面积占比过滤，并按置信度降序排列（同分保持原顺序）
///
/// 既去掉噪声般的小框，也去掉几乎覆盖整幅图像的大框。结果为空不是错误。
pub fn filter_detections(
  detections: Vec<Detection>,
  width: u32,
  height: u32,
  bounds: &AreaBounds,
) -> Vec<Detection> {
  let mut kept: Vec<Detection> = detections
    .into_iter()
    .filter(|det| {
      let percent = det.bbox.area_percent(width, height);
      let keep = bounds.contains(percent);
      if !keep {
        debug!(
          "过滤 {} ({:.2}): 面积占比 {:.3}% 超出范围",
          det.class_name(),
          det.confidence,
          percent
        );
      }
      keep
    })
    .collect();

  kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
  kept
}
