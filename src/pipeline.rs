// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline.rs - 预处理、推理与解码串联
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

use std::time::Instant;

use tracing::{debug, error, info};

use crate::{
  engine::InferenceEngine,
  error::DecodeError,
  frame::Image,
  model::{Decoder, ModelFiles},
};

pub struct Pipeline<E: InferenceEngine, D> {
  engine: E,
  network: E::Network,
  decoder: D,
}

impl<E: InferenceEngine, D: Decoder> Pipeline<E, D> {
  pub fn load(engine: E, files: &ModelFiles, decoder: D) -> Result<Self, DecodeError> {
    info!(
      "加载模型: {} / {}",
      files.topology.display(),
      files.weights.display()
    );
    let network = engine
      .load(&files.topology, &files.weights)
      .map_err(|e| {
        error!("模型加载失败: {}", e);
        DecodeError::ModelLoadError(Box::new(e))
      })?;

    Ok(Self {
      engine,
      network,
      decoder,
    })
  }

  pub fn decoder(&self) -> &D {
    &self.decoder
  }

  /// 一次完整的处理：生成输入张量，前向计算，再解码
  pub fn run(&self, image: &Image) -> Result<D::Output, DecodeError> {
    let blob = self.decoder.blob().build(image)?;
    debug!("输入张量形状: {:?}", blob.shape());

    let now = Instant::now();
    let output = self
      .engine
      .forward(&self.network, &blob)
      .map_err(|e| DecodeError::InferenceError(Box::new(e)))?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    debug!("输出张量形状: {:?}", output.shape());

    let now = Instant::now();
    let result = self.decoder.decode(&output, image)?;
    info!("解码完成，耗时: {:.2?}", now.elapsed());
    Ok(result)
  }
}
