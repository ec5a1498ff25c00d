// 该文件是 Gujian （骨鉴） 项目的一部分。
// src/model/label.rs - 骨折类别
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

use std::fmt;

use crate::model::WithLabel;

/// 模型输出的 7 个类别，顺序与训练时的类别索引一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FractureLabel {
  ElbowPositive,
  FingersPositive,
  ForearmFracture,
  HumerusFracture,
  Humerus,
  ShoulderFracture,
  WristPositive,
}

impl FractureLabel {
  pub const ALL: [FractureLabel; 7] = [
    FractureLabel::ElbowPositive,
    FractureLabel::FingersPositive,
    FractureLabel::ForearmFracture,
    FractureLabel::HumerusFracture,
    FractureLabel::Humerus,
    FractureLabel::ShoulderFracture,
    FractureLabel::WristPositive,
  ];

  pub const COUNT: usize = Self::ALL.len();
}

impl WithLabel for FractureLabel {
  fn to_label_str(&self) -> &'static str {
    match self {
      FractureLabel::ElbowPositive => "elbow positive",
      FractureLabel::FingersPositive => "fingers positive",
      FractureLabel::ForearmFracture => "forearm fracture",
      FractureLabel::HumerusFracture => "humerus fracture",
      FractureLabel::Humerus => "humerus",
      FractureLabel::ShoulderFracture => "shoulder fracture",
      FractureLabel::WristPositive => "wrist positive",
    }
  }

  fn to_label_id(&self) -> u32 {
    *self as u32
  }

  fn from_label_id(id: u32) -> Option<Self> {
    Self::ALL.get(id as usize).copied()
  }
}

impl fmt::Display for FractureLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.to_label_str())
  }
}
