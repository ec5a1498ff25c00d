// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/preprocess.rs - 图像预处理
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

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::map::map_pixels;
use tracing::debug;

mod clahe;
pub use self::clahe::Clahe;

/// 固定二值化阈值，大于该值置 255，否则置 0
pub const BINARY_THRESHOLD: u8 = 127;
/// CLAHE 对比度限制
pub const CLAHE_CLIP_LIMIT: f32 = 3.0;
/// CLAHE 网格划分
pub const CLAHE_TILE_GRID: (u32, u32) = (8, 8);

/// 由原始图像派生出的全部中间图像
#[derive(Debug, Clone)]
pub struct Preprocessed {
  pub grayscale: GrayImage,
  pub thresholded: GrayImage,
  pub binary: GrayImage,
  /// 送入检测器的增强图像（灰度复制为三通道），不落盘
  pub enhanced: RgbImage,
}

/// 灰度化：ITU-R BT.601 亮度加权，四舍五入
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
  map_pixels(image, |p: Rgb<u8>| {
    let y: f32 = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
    Luma([y.round().clamp(0.0, 255.0) as u8])
  })
}

/// Otsu 自动阈值二值化
pub fn to_thresholded(gray: &GrayImage) -> GrayImage {
  let level = otsu_level(gray);
  debug!("Otsu 阈值: {}", level);
  threshold(gray, level, ThresholdType::Binary)
}

/// 固定阈值二值化
pub fn to_binary(gray: &GrayImage) -> GrayImage {
  threshold(gray, BINARY_THRESHOLD, ThresholdType::Binary)
}

/// 归一化到 [0,1] 后回到 8 位，做 CLAHE，再扩展为三通道
pub fn enhance(gray: &GrayImage) -> RgbImage {
  let rescaled = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
    let normalized = gray.get_pixel(x, y)[0] as f32 / 255.0;
    Luma([(normalized * 255.0) as u8])
  });

  let equalized = Clahe::new(CLAHE_CLIP_LIMIT, CLAHE_TILE_GRID).apply(&rescaled);
  DynamicImage::ImageLuma8(equalized).to_rgb8()
}

pub fn preprocess(image: &RgbImage) -> Preprocessed {
  let grayscale = to_grayscale(image);
  let thresholded = to_thresholded(&grayscale);
  let binary = to_binary(&grayscale);
  let enhanced = enhance(&grayscale);

  Preprocessed {
    grayscale,
    thresholded,
    binary,
    enhanced,
  }
}
