// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型输出解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  path::{Path, PathBuf},
  str::FromStr,
};

use thiserror::Error;
use url::Url;

use crate::{
  blob::BlobBuilder,
  error::DecodeError,
  frame::{Image, Tensor},
};

/// 各任务共用的解码接口
///
/// `blob` 给出该任务推理前的预处理配置，`decode` 把网络输出解释为任务结果。
pub trait Decoder {
  type Output;

  fn blob(&self) -> &BlobBuilder;
  fn decode(&self, output: &Tensor, source: &Image) -> Result<Self::Output, DecodeError>;
}

/// 一个任务在模型目录中的三件文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
  pub weights: PathBuf,
  pub topology: PathBuf,
  pub labels: Option<PathBuf>,
}

impl ModelFiles {
  pub const WEIGHTS_FILE: &'static str = "model.caffemodel";
  pub const TOPOLOGY_FILE: &'static str = "config.prototxt";
  pub const LABELS_FILE: &'static str = "labels.txt";

  pub fn from_dir(dir: impl AsRef<Path>) -> Self {
    let dir = dir.as_ref();
    Self {
      weights: dir.join(Self::WEIGHTS_FILE),
      topology: dir.join(Self::TOPOLOGY_FILE),
      labels: Some(dir.join(Self::LABELS_FILE)),
    }
  }

  pub fn without_labels(mut self) -> Self {
    self.labels = None;
    self
  }

  pub fn labels_file(mut self, name: &str) -> Self {
    let dir = self
      .weights
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_default();
    self.labels = Some(dir.join(name));
    self
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("未知参数: {0}")]
  UnknownParameter(String),
  #[error("参数 {key} 的值无效: {value}")]
  InvalidValue { key: String, value: String },
}

impl ConfigError {
  pub(crate) fn invalid(key: &str, value: &str) -> Self {
    ConfigError::InvalidValue {
      key: key.to_string(),
      value: value.to_string(),
    }
  }
}

pub(crate) fn check_scheme(url: &Url, expected: &'static str) -> Result<(), ConfigError> {
  if url.scheme() != expected {
    return Err(ConfigError::SchemeMismatch {
      expected,
      actual: url.scheme().to_string(),
    });
  }
  Ok(())
}

pub(crate) fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| ConfigError::invalid(key, value))
}

fn parse_mean(key: &str, value: &str) -> Result<[f32; 3], ConfigError> {
  let parts = value
    .split(',')
    .map(|v| parse_value::<f32>(key, v.trim()))
    .collect::<Result<Vec<_>, _>>()?;
  <[f32; 3]>::try_from(parts).map_err(|_| ConfigError::invalid(key, value))
}

/// 处理各任务共用的预处理参数，参数不属于预处理时返回 `Ok(false)`
pub(crate) fn apply_blob_param(
  blob: &mut BlobBuilder,
  key: &str,
  value: &str,
) -> Result<bool, ConfigError> {
  let (width, height) = blob.target_size();
  *blob = match key {
    "width" => blob.size(parse_value(key, value)?, height),
    "height" => blob.size(width, parse_value(key, value)?),
    "mean" => blob.mean(parse_mean(key, value)?),
    "scale" => blob.scale(parse_value(key, value)?),
    "swap_rb" => blob.swap_rb(parse_value(key, value)?),
    _ => return Ok(false),
  };
  Ok(true)
}

#[cfg(feature = "model_classification")]
mod classification;
#[cfg(feature = "model_classification")]
pub use self::classification::{
  ClassItem, ClassificationBuilder, ClassificationDecoder, ClassificationResult, softmax, top_k,
};

#[cfg(feature = "model_pose")]
mod pose;
#[cfg(feature = "model_pose")]
pub use self::pose::{Keypoint, Limb, PoseBuilder, PoseDecoder, PoseResult};

#[cfg(feature = "model_segmentation")]
mod segmentation;
#[cfg(feature = "model_segmentation")]
pub use self::segmentation::{
  SegmentationBuilder, SegmentationDecoder, SegmentationResult, generate_palette,
};
