// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use image::{GrayImage, RgbImage};
use tracing::info;

use crate::{
  input::ImageFileInput,
  model::Detection,
  output::{OutputError, Render, draw::Draw},
};

/// 落盘的图像种类，文件名为 `<前缀><原文件名>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
  Grayscale,
  Thresholded,
  Binary,
  Annotated,
}

impl ArtifactKind {
  pub fn prefix(&self) -> &'static str {
    match self {
      ArtifactKind::Grayscale => "grayscale_",
      ArtifactKind::Thresholded => "thresholded_",
      ArtifactKind::Binary => "binary_",
      ArtifactKind::Annotated => "",
    }
  }
}

/// 把派生图像和标注图像写到处理结果目录
pub struct SaveImageFileOutput {
  dir: PathBuf,
  draw: Draw,
}

impl SaveImageFileOutput {
  pub fn new(dir: impl Into<PathBuf>, draw: Draw) -> Self {
    Self {
      dir: dir.into(),
      draw,
    }
  }

  pub fn artifact_path(&self, kind: ArtifactKind, source: &Path) -> Result<PathBuf, OutputError> {
    let name = source
      .file_name()
      .ok_or_else(|| OutputError::InvalidFilename(source.to_path_buf()))?;
    let mut file_name = kind.prefix().to_string();
    file_name.push_str(&name.to_string_lossy());
    Ok(self.dir.join(file_name))
  }

  pub fn save_gray(
    &self,
    kind: ArtifactKind,
    source: &Path,
    image: &GrayImage,
  ) -> Result<PathBuf, OutputError> {
    let path = self.artifact_path(kind, source)?;
    self.ensure_dir()?;
    image.save(&path)?;
    info!("保存图像到文件: {}", path.display());
    Ok(path)
  }

  fn save_rgb(&self, path: PathBuf, image: &RgbImage) -> Result<PathBuf, OutputError> {
    self.ensure_dir()?;
    image.save(&path)?;
    info!("保存图像到文件: {}", path.display());
    Ok(path)
  }

  fn ensure_dir(&self) -> Result<(), OutputError> {
    if !self.dir.as_os_str().is_empty() {
      std::fs::create_dir_all(&self.dir)?;
    }
    Ok(())
  }
}

impl Render<ImageFileInput, [Detection]> for SaveImageFileOutput {
  type Error = OutputError;

  fn render_result(
    &self,
    frame: &ImageFileInput,
    result: &[Detection],
  ) -> Result<PathBuf, Self::Error> {
    let path = self.artifact_path(ArtifactKind::Annotated, frame.path())?;
    let annotated = self.draw.draw_detections(frame.image(), result);
    self.save_rgb(path, &annotated)
  }
}
