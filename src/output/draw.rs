// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
  draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::{
  model::{Detection, FractureLabel},
  output::OutputError,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_BOX_HEIGHT: i32 = 20;
const LABEL_CHAR_WIDTH: f32 = 9.0; // 字体不可用时按每字符平均宽度估算
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const CROSS_HALF_LENGTH: f32 = 10.0;
const LINE_THICKNESS: i32 = 2;

// DejaVu Sans，许可证见 assets/LICENSE-font.txt
const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);
pub const PURPLE: Rgb<u8> = Rgb([128, 0, 128]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
pub const PINK: Rgb<u8> = Rgb([255, 192, 203]);

/// 每个类别对应的标注颜色，两类肱骨共用紫色
pub fn label_color(label: FractureLabel) -> Rgb<u8> {
  match label {
    FractureLabel::ElbowPositive => BLUE,
    FractureLabel::FingersPositive => GREEN,
    FractureLabel::ForearmFracture => ORANGE,
    FractureLabel::HumerusFracture | FractureLabel::Humerus => PURPLE,
    FractureLabel::ShoulderFracture => YELLOW,
    FractureLabel::WristPositive => PINK,
  }
}

pub struct Draw {
  font_size: f32,
  label_box_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  font: Option<FontArc>,
}

impl Default for Draw {
  fn default() -> Self {
    let font = FontArc::try_from_slice(EMBEDDED_FONT)
      .inspect_err(|e| warn!("无法加载嵌入的字体: {}", e))
      .ok();

    Self {
      font_size: LABEL_FONT_SIZE,
      label_box_height: LABEL_BOX_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      font,
    }
  }
}

impl Draw {
  /// 未指定字体时使用嵌入字体；指定的字体必须能加载成功
  pub fn with_font_path(font_path: Option<&Path>) -> Result<Self, OutputError> {
    let Some(path) = font_path else {
      return Ok(Self::default());
    };

    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)
      .map_err(|e| OutputError::FontError(format!("{}: {}", path.display(), e)))?;
    debug!("加载字体: {}", path.display());

    Ok(Self {
      font: Some(font),
      ..Self::default()
    })
  }

  /// 在图像副本上绘制全部检测结果
  pub fn draw_detections(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = image.clone();
    for detection in detections {
      self.draw_detection(&mut canvas, detection);
    }
    canvas
  }

  fn draw_detection(&self, image: &mut RgbImage, detection: &Detection) {
    let color = label_color(detection.label);
    let (width, height) = image.dimensions();
    let Some(bbox) = detection.bbox.clip_to(width, height) else {
      debug!("检测框在图像之外，跳过绘制: {:?}", detection.bbox);
      return;
    };

    // 边框，加粗为 2 像素
    for t in 0..LINE_THICKNESS {
      let w = bbox.width() + 1 - 2 * t as i64;
      let h = bbox.height() + 1 - 2 * t as i64;
      if w > 0 && h > 0 {
        let rect = Rect::at(bbox.x1 + t, bbox.y1 + t).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(image, rect, color);
      }
    }

    // 标签底色与文字
    let label = format!("{} {:.2}", detection.class_name(), detection.confidence);
    let label_width = self.label_width(&label).max(1);
    let label_y = bbox.y1 - self.label_box_height;
    let rect = Rect::at(bbox.x1, label_y).of_size(label_width, self.label_box_height as u32);
    draw_filled_rect_mut(image, rect, color);

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        LABEL_TEXT_COLOR,
        bbox.x1,
        label_y + self.label_text_vertical_padding,
        PxScale::from(self.font_size),
        font,
        &label,
      );
    }

    // 中心十字，位于原始检测框的中心
    let (cx, cy) = detection.bbox.center();
    let (cx, cy) = (cx as f32, cy as f32);
    for t in 0..LINE_THICKNESS {
      let t = t as f32;
      draw_line_segment_mut(
        image,
        (cx - CROSS_HALF_LENGTH, cy + t),
        (cx + CROSS_HALF_LENGTH, cy + t),
        color,
      );
      draw_line_segment_mut(
        image,
        (cx + t, cy - CROSS_HALF_LENGTH),
        (cx + t, cy + CROSS_HALF_LENGTH),
        color,
      );
    }

    debug!("绘制 {} at {:?}", label, bbox);
  }

  fn label_width(&self, label: &str) -> u32 {
    match &self.font {
      Some(font) => text_size(PxScale::from(self.font_size), font, label).0,
      None => (label.chars().count() as f32 * self.label_char_width) as u32,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BBox;

  fn wrist(confidence: f32) -> Detection {
    Detection::new(
      FractureLabel::WristPositive,
      confidence,
      BBox::new(600, 100, 800, 300).unwrap(),
    )
  }

  #[test]
  fn colors_follow_class_families() {
    assert_eq!(label_color(FractureLabel::ElbowPositive), BLUE);
    assert_eq!(label_color(FractureLabel::FingersPositive), GREEN);
    assert_eq!(label_color(FractureLabel::ForearmFracture), ORANGE);
    assert_eq!(label_color(FractureLabel::HumerusFracture), PURPLE);
    assert_eq!(label_color(FractureLabel::Humerus), PURPLE);
    assert_eq!(label_color(FractureLabel::ShoulderFracture), YELLOW);
    assert_eq!(label_color(FractureLabel::WristPositive), PINK);
  }

  #[test]
  fn draws_box_label_and_cross_in_class_color() {
    let image = RgbImage::from_pixel(1000, 800, Rgb([0, 0, 0]));
    let out = Draw::default().draw_detections(&image, &[wrist(0.87)]);

    // 边框
    assert_eq!(out.get_pixel(600, 300), &PINK);
    assert_eq!(out.get_pixel(800, 200), &PINK);
    assert_eq!(out.get_pixel(601, 200), &PINK);
    // 标签底色位于左上角上方
    assert_eq!(out.get_pixel(600, 80), &PINK);
    // 中心十字
    assert_eq!(out.get_pixel(700, 200), &PINK);
    assert_eq!(out.get_pixel(692, 200), &PINK);
    assert_eq!(out.get_pixel(700, 208), &PINK);
    // 框内其他位置保持原样
    assert_eq!(out.get_pixel(650, 250), &Rgb([0, 0, 0]));
  }

  #[test]
  fn label_text_is_written_on_the_background() {
    let image = RgbImage::from_pixel(1000, 800, Rgb([0, 0, 0]));
    let draw = Draw::default();
    assert!(draw.font.is_some());
    let out = draw.draw_detections(&image, &[wrist(0.87)]);

    let label_width = draw.label_width("wrist positive 0.87");
    assert!(label_width > 0);
    let label_pixels: Vec<Rgb<u8>> = (80..100)
      .flat_map(|y| (600..600 + label_width).map(move |x| (x, y)))
      .map(|(x, y)| *out.get_pixel(x, y))
      .collect();
    // 文字经过抗锯齿，笔画中心接近白色
    assert!(label_pixels.iter().any(|p| p[1] >= 240 && p[2] >= 240));
    assert!(label_pixels.contains(&PINK));
    assert!(label_pixels.iter().all(|p| *p != Rgb([0, 0, 0])));
  }

  #[test]
  fn default_font_is_used_without_a_path() {
    assert!(Draw::with_font_path(None).unwrap().font.is_some());
  }

  #[test]
  fn configured_font_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("label.ttf");
    std::fs::write(&path, EMBEDDED_FONT).unwrap();
    assert!(Draw::with_font_path(Some(&path)).unwrap().font.is_some());
  }

  #[test]
  fn boxes_outside_the_image_are_skipped() {
    let image = RgbImage::from_pixel(100, 80, Rgb([3, 3, 3]));
    let far = Detection::new(
      FractureLabel::WristPositive,
      0.9,
      BBox::from_f32(&[1.1e9, 1.1e9, 1.1e9 + 256.0, 1.1e9 + 256.0]).unwrap(),
    );
    let out = Draw::default().draw_detections(&image, &[far]);
    assert_eq!(out, image);
  }

  #[test]
  fn partly_visible_box_is_clipped_to_the_image() {
    let image = RgbImage::from_pixel(100, 80, Rgb([3, 3, 3]));
    let wide = Detection::new(
      FractureLabel::ForearmFracture,
      0.9,
      BBox::from_f32(&[-2e9, 40.0, 2e9, 60.0]).unwrap(),
    );
    let out = Draw::default().draw_detections(&image, &[wide]);
    assert_eq!(out.get_pixel(0, 50), &ORANGE);
    assert_eq!(out.get_pixel(99, 50), &ORANGE);
    assert_eq!(out.get_pixel(50, 40), &ORANGE);
    assert_eq!(out.get_pixel(50, 50), &Rgb([3, 3, 3]));
  }

  #[test]
  fn original_image_is_untouched() {
    let image = RgbImage::from_pixel(1000, 800, Rgb([7, 7, 7]));
    let _ = Draw::default().draw_detections(&image, &[wrist(0.5)]);
    assert!(image.pixels().all(|p| *p == Rgb([7, 7, 7])));
  }

  #[test]
  fn label_near_top_edge_is_clipped_not_panicking() {
    let image = RgbImage::new(50, 50);
    let det = Detection::new(
      FractureLabel::ShoulderFracture,
      0.3,
      BBox::new(40, 0, 60, 10).unwrap(),
    );
    let out = Draw::default().draw_detections(&image, &[det]);
    assert_eq!(out.get_pixel(40, 5), &YELLOW);
  }

  #[test]
  fn explicit_missing_font_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("none.ttf");
    assert!(Draw::with_font_path(Some(&missing)).is_err());
  }
}
