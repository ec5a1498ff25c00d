// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/model/bbox.rs - 检测结果
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

use crate::model::{DetectItem, FractureLabel, ModelError, WithLabel};

/// 像素坐标的轴对齐矩形，满足 x1 < x2, y1 < y2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

impl BBox {
  /// 坐标不满足 x1 < x2, y1 < y2 时返回 None
  pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
    (x1 < x2 && y1 < y2).then_some(Self { x1, y1, x2, y2 })
  }

  /// 浮点坐标向零截断
  pub fn from_f32(bbox: &[f32; 4]) -> Option<Self> {
    Self::new(
      bbox[0] as i32,
      bbox[1] as i32,
      bbox[2] as i32,
      bbox[3] as i32,
    )
  }

  // 坐标可能因截断饱和到 i32 边界，几何量一律在 i64 上计算
  pub fn width(&self) -> i64 {
    self.x2 as i64 - self.x1 as i64
  }

  pub fn height(&self) -> i64 {
    self.y2 as i64 - self.y1 as i64
  }

  pub fn area(&self) -> i64 {
    self.width() * self.height()
  }

  /// 面积占整幅图像的百分比
  pub fn area_percent(&self, image_width: u32, image_height: u32) -> f64 {
    let total = image_width as f64 * image_height as f64;
    if total == 0.0 {
      return f64::INFINITY;
    }
    self.area() as f64 * 100.0 / total
  }

  pub fn center(&self) -> (i32, i32) {
    let mid = |a: i32, b: i32| (a as i64 + b as i64).div_euclid(2) as i32;
    (mid(self.x1, self.x2), mid(self.y1, self.y2))
  }

  /// 与 `[0, width) × [0, height)` 的交集，完全在图像外时返回 None
  pub fn clip_to(&self, width: u32, height: u32) -> Option<Self> {
    let max_x = i32::try_from(width).unwrap_or(i32::MAX).saturating_sub(1);
    let max_y = i32::try_from(height).unwrap_or(i32::MAX).saturating_sub(1);
    if max_x < 0 || max_y < 0 || self.x2 < 0 || self.y2 < 0 || self.x1 > max_x || self.y1 > max_y {
      return None;
    }
    Some(Self {
      x1: self.x1.clamp(0, max_x),
      y1: self.y1.clamp(0, max_y),
      x2: self.x2.clamp(0, max_x),
      y2: self.y2.clamp(0, max_y),
    })
  }
}

/// 一个已映射到类别名的检测结果，创建后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub label: FractureLabel,
  pub confidence: f32,
  pub bbox: BBox,
}

impl Detection {
  pub fn new(label: FractureLabel, confidence: f32, bbox: BBox) -> Self {
    Self {
      label,
      confidence,
      bbox,
    }
  }

  /// 退化框返回 `Ok(None)`，类别越界返回错误
  pub fn from_item(item: &DetectItem) -> Result<Option<Self>, ModelError> {
    let label =
      FractureLabel::from_label_id(item.class_id).ok_or(ModelError::UnknownClass(item.class_id))?;
    Ok(BBox::from_f32(&item.bbox).map(|bbox| Detection::new(label, item.score, bbox)))
  }

  pub fn class_name(&self) -> &'static str {
    self.label.to_label_str()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bbox_requires_positive_extent() {
    assert!(BBox::new(0, 0, 10, 10).is_some());
    assert!(BBox::new(5, 0, 5, 10).is_none());
    assert!(BBox::new(0, 9, 10, 3).is_none());
  }

  #[test]
  fn from_f32_truncates_toward_zero() {
    let bbox = BBox::from_f32(&[10.9, 20.2, 30.7, 40.99]).unwrap();
    assert_eq!(bbox, BBox::new(10, 20, 30, 40).unwrap());
  }

  #[test]
  fn area_percent_is_exact_at_round_values() {
    let bbox = BBox::new(0, 0, 3000, 100).unwrap();
    assert_eq!(bbox.area_percent(4000, 250), 30.0);
    let bbox = BBox::new(0, 0, 100, 10).unwrap();
    assert_eq!(bbox.area_percent(4000, 250), 0.1);
  }

  #[test]
  fn center_uses_floor_division() {
    assert_eq!(BBox::new(1, 2, 4, 7).unwrap().center(), (2, 4));
  }

  #[test]
  fn geometry_of_saturated_coordinates_does_not_overflow() {
    let wide = BBox::from_f32(&[-2e9, 0.0, 2e9, 10.0]).unwrap();
    assert_eq!(wide.width(), 4_000_000_000);
    assert_eq!(wide.area(), 40_000_000_000);
    assert!(wide.area_percent(1000, 800) > 30.0);

    let far = BBox::from_f32(&[1.1e9, 1.1e9, 1.1e9 + 256.0, 1.1e9 + 256.0]).unwrap();
    let (cx, cy) = far.center();
    assert!(cx > 1_000_000_000 && cy > 1_000_000_000);

    let edge = BBox::new(i32::MAX - 1, i32::MAX - 1, i32::MAX, i32::MAX).unwrap();
    assert_eq!(edge.center(), (i32::MAX - 1, i32::MAX - 1));
  }

  #[test]
  fn clip_to_keeps_the_visible_part() {
    let bbox = BBox::new(-50, 10, 120, 90).unwrap();
    assert_eq!(bbox.clip_to(100, 80), BBox::new(0, 10, 99, 79));
    let outside = BBox::new(200, 200, 300, 300).unwrap();
    assert_eq!(outside.clip_to(100, 80), None);
  }

  #[test]
  fn unknown_class_is_an_error() {
    let item = DetectItem {
      class_id: 9,
      score: 0.5,
      bbox: [0.0, 0.0, 10.0, 10.0],
    };
    assert!(matches!(
      Detection::from_item(&item),
      Err(ModelError::UnknownClass(9))
    ));
  }

  #[test]
  fn degenerate_item_is_skipped() {
    let item = DetectItem {
      class_id: 6,
      score: 0.5,
      bbox: [3.2, 0.0, 3.9, 10.0],
    };
    assert_eq!(Detection::from_item(&item).unwrap(), None);
  }
}
