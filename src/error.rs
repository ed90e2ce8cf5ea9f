// 该文件是 Shanan （山南西风） 项目的一部分。
// src/error.rs - 解码错误定义
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

use thiserror::Error;

/// 推理引擎返回的错误，原样保留
pub type EngineError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("图像无效: {0}")]
  InvalidImage(String),
  #[error("读取文件 {} 失败: {source}", .path.display())]
  FileReadError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("张量形状不匹配: {0}")]
  ShapeMismatch(String),
  #[error("标签数量不匹配: 类别数为 {expected}, 标签数为 {actual}")]
  LabelMismatch { expected: usize, actual: usize },
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[source] EngineError),
  #[error("推理错误: {0}")]
  InferenceError(#[source] EngineError),
}

impl DecodeError {
  pub fn invalid_image(msg: impl Into<String>) -> Self {
    DecodeError::InvalidImage(msg.into())
  }

  pub fn shape(msg: impl Into<String>) -> Self {
    DecodeError::ShapeMismatch(msg.into())
  }
}
