// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/preprocess/clahe.rs - 限制对比度自适应直方图均衡
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

use image::{GrayImage, Luma};

const HIST_SIZE: usize = 256;

/// CLAHE 参数
///
/// 图像尺寸不能被网格整除时，右侧与下侧按 reflect-101 方式补齐后再切块，
/// 查找表由每块裁剪后的直方图累积得到，最后在相邻四块之间双线性插值。
#[derive(Debug, Clone, Copy)]
pub struct Clahe {
  clip_limit: f32,
  tiles_x: u32,
  tiles_y: u32,
}

impl Clahe {
  pub fn new(clip_limit: f32, (tiles_x, tiles_y): (u32, u32)) -> Self {
    Self {
      clip_limit,
      tiles_x: tiles_x.max(1),
      tiles_y: tiles_y.max(1),
    }
  }

  pub fn apply(&self, image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return image.clone();
    }

    let padded_w = width.div_ceil(self.tiles_x) * self.tiles_x;
    let padded_h = height.div_ceil(self.tiles_y) * self.tiles_y;
    let tile_w = padded_w / self.tiles_x;
    let tile_h = padded_h / self.tiles_y;
    let tile_area = tile_w * tile_h;

    let luts = self.build_luts(image, tile_w, tile_h, tile_area);

    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;
    let last_x = self.tiles_x as i64 - 1;
    let last_y = self.tiles_y as i64 - 1;

    GrayImage::from_fn(width, height, |x, y| {
      let v = image.get_pixel(x, y)[0] as usize;

      let tyf = y as f32 * inv_th - 0.5;
      let ty1 = tyf.floor() as i64;
      let ya = tyf - ty1 as f32;
      let ty2 = (ty1 + 1).min(last_y) as usize;
      let ty1 = ty1.max(0) as usize;

      let txf = x as f32 * inv_tw - 0.5;
      let tx1 = txf.floor() as i64;
      let xa = txf - tx1 as f32;
      let tx2 = (tx1 + 1).min(last_x) as usize;
      let tx1 = tx1.max(0) as usize;

      let lut = |tx: usize, ty: usize| luts[ty * self.tiles_x as usize + tx][v] as f32;
      let top = lut(tx1, ty1) * (1.0 - xa) + lut(tx2, ty1) * xa;
      let bottom = lut(tx1, ty2) * (1.0 - xa) + lut(tx2, ty2) * xa;
      let res = top * (1.0 - ya) + bottom * ya;

      Luma([res.round().clamp(0.0, 255.0) as u8])
    })
  }

  fn build_luts(
    &self,
    image: &GrayImage,
    tile_w: u32,
    tile_h: u32,
    tile_area: u32,
  ) -> Vec<[u8; HIST_SIZE]> {
    let clip = ((self.clip_limit * tile_area as f32 / HIST_SIZE as f32) as u32).max(1);
    let lut_scale = 255.0 / tile_area as f32;
    let mut luts = Vec::with_capacity((self.tiles_x * self.tiles_y) as usize);

    for ty in 0..self.tiles_y {
      for tx in 0..self.tiles_x {
        let mut hist = [0u32; HIST_SIZE];
        for y in ty * tile_h..(ty + 1) * tile_h {
          let sy = reflect_101(y, image.height());
          for x in tx * tile_w..(tx + 1) * tile_w {
            let sx = reflect_101(x, image.width());
            hist[image.get_pixel(sx, sy)[0] as usize] += 1;
          }
        }

        if self.clip_limit > 0.0 {
          clip_histogram(&mut hist, clip);
        }
        luts.push(cumulative_lut(&hist, lut_scale));
      }
    }

    luts
  }
}

/// 裁掉超出限制的计数，均匀回填，余数按步长分散
fn clip_histogram(hist: &mut [u32; HIST_SIZE], clip: u32) {
  let mut clipped = 0u32;
  for count in hist.iter_mut() {
    if *count > clip {
      clipped += *count - clip;
      *count = clip;
    }
  }

  let batch = clipped / HIST_SIZE as u32;
  let mut residual = clipped - batch * HIST_SIZE as u32;
  for count in hist.iter_mut() {
    *count += batch;
  }

  if residual != 0 {
    let step = (HIST_SIZE / residual as usize).max(1);
    let mut i = 0;
    while i < HIST_SIZE && residual > 0 {
      hist[i] += 1;
      residual -= 1;
      i += step;
    }
  }
}

fn cumulative_lut(hist: &[u32; HIST_SIZE], scale: f32) -> [u8; HIST_SIZE] {
  let mut lut = [0u8; HIST_SIZE];
  let mut sum = 0u32;
  for (i, count) in hist.iter().enumerate() {
    sum += count;
    lut[i] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
  }
  lut
}

// gfedcb|abcdefgh|gfedcba
fn reflect_101(i: u32, len: u32) -> u32 {
  if len == 1 {
    return 0;
  }
  let period = 2 * (len - 1);
  let m = i % period;
  if m < len { m } else { period - m }
}
