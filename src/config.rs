// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/config.rs - 流水线配置
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

use std::path::PathBuf;

use crate::filter::AreaBounds;

/// 默认的处理结果输出目录
pub const DEFAULT_PROCESSED_DIR: &str = "static/processed";
/// 默认的上传目录
pub const DEFAULT_UPLOAD_DIR: &str = "static/uploads";

/// 一次流水线运行所需的全部配置
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  /// 派生图像与标注图像的输出目录，不存在时自动创建
  pub processed_dir: PathBuf,
  /// 检测框面积占比的合理范围
  pub area_bounds: AreaBounds,
  /// 标签字体文件，为空时在系统字体目录中查找
  pub font_path: Option<PathBuf>,
  /// 是否额外写出 JSON 检测记录
  pub write_record: bool,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      processed_dir: PathBuf::from(DEFAULT_PROCESSED_DIR),
      area_bounds: AreaBounds::default(),
      font_path: None,
      write_record: false,
    }
  }
}

impl PipelineConfig {
  pub fn with_processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.processed_dir = dir.into();
    self
  }

  pub fn with_font_path(mut self, font_path: Option<PathBuf>) -> Self {
    self.font_path = font_path;
    self
  }

  pub fn with_record(mut self, write_record: bool) -> Self {
    self.write_record = write_record;
    self
  }
}
