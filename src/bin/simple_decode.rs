// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/simple_decode.rs - 解码已保存的网络输出
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

use std::{
  convert::Infallible,
  fs::File,
  io::BufReader,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use url::Url;

use shanan_decode::{
  FromUrl, FromUrlWithScheme, Tensor,
  engine::InferenceEngine,
  input::InputWrapper,
  model::{ClassificationBuilder, Decoder, ModelFiles, PoseBuilder, SegmentationBuilder},
  output::{Render, SaveImageFileError, SaveImageFileOutput},
  pipeline::Pipeline,
};

/// 解码参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 任务与模型目录，例如 classification:///models/alexnet?topk=5
  #[arg(long, value_name = "TASK")]
  pub task: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 网络输出张量（JSON: {"shape": [...], "data": [...]}）
  #[arg(long, value_name = "FILE")]
  pub tensor: PathBuf,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
}

#[derive(Deserialize)]
struct TensorFile {
  shape: Vec<usize>,
  data: Vec<f32>,
}

/// 回放事先保存的网络输出，代替真实的推理后端
struct ReplayEngine {
  output: Tensor,
}

impl ReplayEngine {
  fn open(path: &Path) -> Result<Self> {
    let reader = BufReader::new(
      File::open(path).with_context(|| format!("无法打开张量文件 {}", path.display()))?,
    );
    let file: TensorFile = serde_json::from_reader(reader)
      .with_context(|| format!("张量文件格式错误 {}", path.display()))?;
    let output = Tensor::new(file.shape, file.data)?;
    info!("读取网络输出: {:?}", output.shape());
    Ok(Self { output })
  }
}

impl InferenceEngine for ReplayEngine {
  type Network = ();
  type Error = Infallible;

  fn load(&self, _topology: &Path, _weights: &Path) -> Result<(), Infallible> {
    Ok(())
  }

  fn forward(&self, _network: &(), input: &Tensor) -> Result<Tensor, Infallible> {
    info!("输入张量形状: {:?}", input.shape());
    Ok(self.output.clone())
  }
}

fn run<D>(args: &Args, engine: ReplayEngine, files: &ModelFiles, decoder: D) -> Result<()>
where
  D: Decoder,
  SaveImageFileOutput: Render<D::Output, Error = SaveImageFileError>,
{
  let input = InputWrapper::from_url(&args.input)?;
  let output = SaveImageFileOutput::from_url(&args.output)?;
  let pipeline = Pipeline::load(engine, files, decoder)?;

  for image in input {
    let result = pipeline.run(&image)?;
    output.render_result(&result)?;
  }
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("任务: {}", args.task);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let engine = ReplayEngine::open(&args.tensor)?;

  match args.task.scheme() {
    ClassificationBuilder::SCHEME => {
      let builder = ClassificationBuilder::from_url(&args.task)?;
      run(&args, engine, builder.files(), builder.build())
    }
    PoseBuilder::SCHEME => {
      let builder = PoseBuilder::from_url(&args.task)?;
      run(&args, engine, builder.files(), builder.build())
    }
    SegmentationBuilder::SCHEME => {
      let builder = SegmentationBuilder::from_url(&args.task)?;
      run(&args, engine, builder.files(), builder.build())
    }
    other => bail!("不支持的任务: {}", other),
  }
}
