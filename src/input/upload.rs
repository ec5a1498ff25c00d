// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/input/upload.rs - 上传文件暂存
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

use thiserror::Error;
use tracing::info;
use unicode_normalization::UnicodeNormalization;

/// 允许上传的图像扩展名
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum UploadError {
  #[error("不支持的文件类型: {0}")]
  ExtensionNotAllowed(String),
  #[error("文件名清理后为空: {0}")]
  EmptyFilename(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 文件名必须带扩展名，且扩展名（不区分大小写）在白名单内
pub fn is_allowed_file(filename: &str) -> bool {
  filename
    .rsplit_once('.')
    .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    .unwrap_or(false)
}

/// 将任意文件名清理为只含 `[A-Za-z0-9_.-]` 的安全文件名
///
/// 先做 NFKD 分解，带变音符号的拉丁字母保留其基本字母。
pub fn secure_filename(filename: &str) -> String {
  let ascii: String = filename
    .nfkd()
    .filter(char::is_ascii)
    .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
    .collect();

  ascii
    .split_whitespace()
    .collect::<Vec<_>>()
    .join("_")
    .chars()
    .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    .collect::<String>()
    .trim_matches(|c| c == '.' || c == '_')
    .to_string()
}

/// 校验并复制上传文件到上传目录，返回暂存后的路径
///
/// 并发运行的流水线以输入文件名区分输出，调用方需保证文件名互不相同。
pub fn stage_upload(
  source: impl AsRef<Path>,
  upload_dir: impl AsRef<Path>,
) -> Result<PathBuf, UploadError> {
  let source = source.as_ref();
  let original = source
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();

  if !is_allowed_file(&original) {
    return Err(UploadError::ExtensionNotAllowed(original));
  }

  let filename = secure_filename(&original);
  if filename.is_empty() || !is_allowed_file(&filename) {
    return Err(UploadError::EmptyFilename(original));
  }

  let upload_dir = upload_dir.as_ref();
  std::fs::create_dir_all(upload_dir)?;
  let staged = upload_dir.join(&filename);
  if is_same_file(source, &staged)? {
    info!("文件已位于上传目录: {}", staged.display());
    return Ok(staged);
  }

  std::fs::copy(source, &staged)?;
  info!("上传文件已暂存: {} -> {}", source.display(), staged.display());

  Ok(staged)
}

// 复制到自身会把文件截断为空
fn is_same_file(source: &Path, staged: &Path) -> std::io::Result<bool> {
  if !staged.exists() {
    return Ok(false);
  }
  Ok(std::fs::canonicalize(source)? == std::fs::canonicalize(staged)?)
}
