// 该文件是 Shanan （山南西风） 项目的一部分。
// src/engine.rs - 推理引擎接口
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

use crate::frame::Tensor;

/// 外部推理后端
///
/// 本库只负责前处理与解码，网络的加载与前向计算交给实现者。
/// 实现者的错误会被包装为 [`DecodeError::ModelLoadError`] 或
/// [`DecodeError::InferenceError`] 并保留为错误来源。
///
/// [`DecodeError::ModelLoadError`]: crate::DecodeError::ModelLoadError
/// [`DecodeError::InferenceError`]: crate::DecodeError::InferenceError
pub trait InferenceEngine {
  type Network;
  type Error: std::error::Error + Send + Sync + 'static;

  /// 从网络结构文件与权重文件加载网络
  fn load(&self, topology: &Path, weights: &Path) -> Result<Self::Network, Self::Error>;

  /// 输入为 NCHW 张量，输出形状由网络决定
  fn forward(&self, network: &Self::Network, input: &Tensor) -> Result<Tensor, Self::Error>;
}
