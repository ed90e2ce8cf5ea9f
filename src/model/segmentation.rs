// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/segmentation.rs - 语义分割解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{ImageBuffer, Rgba, RgbaImage};
use rand::{Rng, RngExt, SeedableRng, rngs::StdRng};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  blob::BlobBuilder,
  error::DecodeError,
  frame::{Image, Tensor},
  labels::LabelSet,
  model::{ConfigError, Decoder, ModelFiles, apply_blob_param, check_scheme, parse_value},
};

const SEGMENTATION_INPUT_W: u32 = 224;
const SEGMENTATION_INPUT_H: u32 = 224;
const SEGMENTATION_MEAN: [f32; 3] = [104.0, 117.0, 123.0];
const SEGMENTATION_SCALE: f32 = 1.0;
const SEGMENTATION_ALPHA: u8 = 255;

#[derive(Debug, Clone)]
pub struct SegmentationResult {
  pub image: RgbaImage,
  /// 行优先的每像素类别编号
  pub class_map: Box<[usize]>,
  pub palette: Box<[[u8; 3]]>,
  /// 按类别编号的名称，标签缺失的类别为 `None`
  pub class_names: Box<[Option<String>]>,
  pub labels_degraded: bool,
}

/// 类别 0 为黑色，之后每个通道取随机值与上一类别同通道的均值
///
/// 相邻类别颜色接近，并不保证容易区分。
pub fn generate_palette<R: Rng + ?Sized>(num_classes: usize, rng: &mut R) -> Box<[[u8; 3]]> {
  let mut palette: Vec<[u8; 3]> = Vec::with_capacity(num_classes);
  if num_classes == 0 {
    return palette.into_boxed_slice();
  }
  palette.push([0, 0, 0]);
  while palette.len() < num_classes {
    let previous = palette[palette.len() - 1];
    let color = previous.map(|channel| {
      let random: f64 = rng.random_range(0.0..255.0);
      ((random + channel as f64) / 2.0).round().clamp(0.0, 255.0) as u8
    });
    palette.push(color);
  }
  palette.into_boxed_slice()
}

/// 每个像素取分数最大的通道，相同分数取编号最小者
fn argmax_classes(scores: &Tensor, classes: usize, spatial: usize) -> Box<[usize]> {
  let data = scores.as_slice();
  (0..spatial)
    .map(|i| {
      let mut class_id = 0;
      for c in 1..classes {
        if data[c * spatial + i] > data[class_id * spatial + i] {
          class_id = c;
        }
      }
      class_id
    })
    .collect()
}

fn default_blob() -> BlobBuilder {
  BlobBuilder::new(SEGMENTATION_INPUT_W, SEGMENTATION_INPUT_H)
    .mean(SEGMENTATION_MEAN)
    .scale(SEGMENTATION_SCALE)
}

pub struct SegmentationDecoder {
  blob: BlobBuilder,
  labels: LabelSet,
  seed: Option<u64>,
}

impl Default for SegmentationDecoder {
  fn default() -> Self {
    Self::new()
  }
}

impl SegmentationDecoder {
  pub fn new() -> Self {
    Self {
      blob: default_blob(),
      labels: LabelSet::default(),
      seed: None,
    }
  }

  /// 标签只用于给类别命名，数量与通道数不一致时不报错
  pub fn with_labels(mut self, labels: LabelSet) -> Self {
    self.labels = labels;
    self
  }

  pub fn labels(&self) -> &LabelSet {
    &self.labels
  }

  pub fn with_blob(mut self, blob: BlobBuilder) -> Self {
    self.blob = blob;
    self
  }

  /// 固定调色板的随机种子，`None` 时每次解码使用系统熵
  pub fn seed(mut self, seed: Option<u64>) -> Self {
    self.seed = seed;
    self
  }

  fn check_shape(scores: &Tensor) -> Result<(usize, usize, usize), DecodeError> {
    let (classes, height, width) = scores.chw()?;
    if classes == 0 {
      return Err(DecodeError::shape("类别通道数为 0"));
    }
    if height == 0 || width == 0 {
      return Err(DecodeError::shape(format!(
        "分割输出尺寸必须为正: {}x{}",
        width, height
      )));
    }
    Ok((classes, height, width))
  }

  pub fn segment(&self, scores: &Tensor) -> Result<SegmentationResult, DecodeError> {
    let mut rng = match self.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_rng(&mut rand::rng()),
    };
    self.segment_with_rng(scores, &mut rng)
  }

  pub fn segment_with_rng<R: Rng + ?Sized>(
    &self,
    scores: &Tensor,
    rng: &mut R,
  ) -> Result<SegmentationResult, DecodeError> {
    debug!("后处理分割输出");
    let (classes, height, width) = Self::check_shape(scores)?;
    let palette = generate_palette(classes, rng);
    let class_map = argmax_classes(scores, classes, height * width);

    let image = ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
      let [r, g, b] = palette[class_map[y as usize * width + x as usize]];
      Rgba([r, g, b, SEGMENTATION_ALPHA])
    });
    debug!("分割结果: {}x{}, {} 个类别", width, height, classes);

    if !self.labels.is_degraded() && !self.labels.is_empty() && self.labels.len() != classes {
      warn!(
        "标签数量 {} 与类别通道数 {} 不一致",
        self.labels.len(),
        classes
      );
    }
    let class_names = (0..classes)
      .map(|c| self.labels.get(c).map(str::to_string))
      .collect();

    Ok(SegmentationResult {
      image,
      class_map,
      palette,
      class_names,
      labels_degraded: self.labels.is_degraded(),
    })
  }
}

impl Decoder for SegmentationDecoder {
  type Output = SegmentationResult;

  fn blob(&self) -> &BlobBuilder {
    &self.blob
  }

  fn decode(&self, output: &Tensor, _source: &Image) -> Result<Self::Output, DecodeError> {
    self.segment(output)
  }
}

/// 从 `segmentation:///模型目录?seed=7&labels=classes.txt` 构建分割解码器
#[derive(Debug, Clone)]
pub struct SegmentationBuilder {
  files: ModelFiles,
  blob: BlobBuilder,
  seed: Option<u64>,
}

impl FromUrlWithScheme for SegmentationBuilder {
  const SCHEME: &'static str = "segmentation";
}

impl FromUrl for SegmentationBuilder {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;

    let mut builder = SegmentationBuilder {
      files: ModelFiles::from_dir(url.path()),
      blob: default_blob(),
      seed: None,
    };

    for (key, value) in url.query_pairs() {
      if apply_blob_param(&mut builder.blob, &key, &value)? {
        continue;
      }
      match key.as_ref() {
        "seed" => builder.seed = Some(parse_value(&key, &value)?),
        "labels" => builder.files = builder.files.labels_file(&value),
        _ => return Err(ConfigError::UnknownParameter(key.to_string())),
      }
    }

    Ok(builder)
  }
}

impl SegmentationBuilder {
  pub fn files(&self) -> &ModelFiles {
    &self.files
  }

  pub fn build(&self) -> SegmentationDecoder {
    let labels = match &self.files.labels {
      Some(path) => LabelSet::load(path),
      None => LabelSet::default(),
    };
    info!(
      "分割解码器: 种子 = {:?}, 标签数 = {}",
      self.seed,
      labels.len()
    );
    SegmentationDecoder::new()
      .with_blob(self.blob)
      .with_labels(labels)
      .seed(self.seed)
  }
}
