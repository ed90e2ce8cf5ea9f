// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/classification.rs - 图像分类解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

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

const CLASSIFICATION_INPUT_W: u32 = 224;
const CLASSIFICATION_INPUT_H: u32 = 224;
const CLASSIFICATION_MEAN: [f32; 3] = [104.0, 117.0, 123.0];
const CLASSIFICATION_SCALE: f32 = 1.0;
const CLASSIFICATION_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassItem {
  pub class_id: usize,
  /// 标签不可用时为 `None`
  pub label: Option<String>,
  /// 百分比，保留两位小数
  pub probability: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
  pub items: Box<[ClassItem]>,
  pub labels_degraded: bool,
}

/// 数值稳定的 softmax：先减去最大值再取指数
pub fn softmax(scores: &[f32]) -> Vec<f32> {
  let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect()
}

/// 按分数降序取前 `k` 个 `(类别, 分数)`，分数相同时保持原下标顺序
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
  let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
  // sort_by 是稳定排序
  ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
  ranked.truncate(k.min(scores.len()));
  ranked
}

fn to_percentage(score: f32) -> f32 {
  ((score as f64 * 100.0 * 100.0).round() / 100.0) as f32
}

/// 分数向量：只允许一个维度大于 1，例如 `[N]`、`[1, N]`
fn score_vector(output: &Tensor) -> Result<&[f32], DecodeError> {
  if output.is_empty() {
    return Err(DecodeError::shape("分类输出为空"));
  }
  if output.shape().iter().filter(|&&d| d > 1).count() > 1 {
    return Err(DecodeError::shape(format!(
      "分类输出必须是一维分数向量, 实际形状为 {:?}",
      output.shape()
    )));
  }
  Ok(output.as_slice())
}

fn default_blob() -> BlobBuilder {
  BlobBuilder::new(CLASSIFICATION_INPUT_W, CLASSIFICATION_INPUT_H)
    .mean(CLASSIFICATION_MEAN)
    .scale(CLASSIFICATION_SCALE)
}

pub struct ClassificationDecoder {
  blob: BlobBuilder,
  labels: LabelSet,
  need_softmax: bool,
  top_k: usize,
}

impl ClassificationDecoder {
  pub fn new(labels: LabelSet) -> Self {
    Self {
      blob: default_blob(),
      labels,
      need_softmax: false,
      top_k: CLASSIFICATION_TOP_K,
    }
  }

  pub fn with_blob(mut self, blob: BlobBuilder) -> Self {
    self.blob = blob;
    self
  }

  /// 关闭时直接用原始分数排序和输出，结果不是概率分布
  pub fn need_softmax(mut self, need_softmax: bool) -> Self {
    self.need_softmax = need_softmax;
    self
  }

  pub fn top_k(mut self, top_k: usize) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn labels(&self) -> &LabelSet {
    &self.labels
  }

  pub fn classify(&self, output: &Tensor) -> Result<ClassificationResult, DecodeError> {
    debug!("后处理分类输出");
    let scores = score_vector(output)?;
    let num_classes = scores.len();

    let labels_degraded = self.labels.is_degraded();
    if labels_degraded {
      warn!("标签不可用, 仅输出类别编号");
    } else if self.labels.len() != num_classes {
      return Err(DecodeError::LabelMismatch {
        expected: num_classes,
        actual: self.labels.len(),
      });
    }

    let probs = if self.need_softmax {
      softmax(scores)
    } else {
      scores.to_vec()
    };

    let items: Box<[ClassItem]> = top_k(&probs, self.top_k)
      .into_iter()
      .map(|(class_id, score)| ClassItem {
        class_id,
        label: self.labels.get(class_id).map(str::to_string),
        probability: to_percentage(score),
      })
      .collect();

    debug!("分类结果: {:?}", items);

    Ok(ClassificationResult {
      items,
      labels_degraded,
    })
  }
}

impl Decoder for ClassificationDecoder {
  type Output = ClassificationResult;

  fn blob(&self) -> &BlobBuilder {
    &self.blob
  }

  fn decode(&self, output: &Tensor, _source: &Image) -> Result<Self::Output, DecodeError> {
    self.classify(output)
  }
}

/// 从 `classification:///模型目录?topk=5&softmax=true` 构建分类解码器
#[derive(Debug, Clone)]
pub struct ClassificationBuilder {
  files: ModelFiles,
  blob: BlobBuilder,
  need_softmax: bool,
  top_k: usize,
}

impl FromUrlWithScheme for ClassificationBuilder {
  const SCHEME: &'static str = "classification";
}

impl FromUrl for ClassificationBuilder {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;

    let mut builder = ClassificationBuilder {
      files: ModelFiles::from_dir(url.path()),
      blob: default_blob(),
      need_softmax: false,
      top_k: CLASSIFICATION_TOP_K,
    };

    for (key, value) in url.query_pairs() {
      if apply_blob_param(&mut builder.blob, &key, &value)? {
        continue;
      }
      match key.as_ref() {
        "softmax" => builder.need_softmax = parse_value(&key, &value)?,
        "topk" => builder.top_k = parse_value(&key, &value)?,
        "labels" => builder.files = builder.files.labels_file(&value),
        _ => return Err(ConfigError::UnknownParameter(key.to_string())),
      }
    }

    Ok(builder)
  }
}

impl ClassificationBuilder {
  pub fn files(&self) -> &ModelFiles {
    &self.files
  }

  pub fn build(&self) -> ClassificationDecoder {
    let labels = match &self.files.labels {
      Some(path) => LabelSet::load(path),
      None => LabelSet::default(),
    };
    info!(
      "分类解码器: top-k = {}, softmax = {}, 标签数 = {}",
      self.top_k,
      self.need_softmax,
      labels.len()
    );

    ClassificationDecoder::new(labels)
      .with_blob(self.blob)
      .need_softmax(self.need_softmax)
      .top_k(self.top_k)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn labels(names: &[&str]) -> LabelSet {
    names.iter().copied().collect()
  }

  fn scores(data: &[f32]) -> Tensor {
    Tensor::new(vec![1, data.len()], data.to_vec()).unwrap()
  }

  #[test]
  fn ranks_softmax_probabilities() {
    let decoder = ClassificationDecoder::new(labels(&["cat", "dog", "bird"]))
      .need_softmax(true)
      .top_k(2);
    let result = decoder.classify(&scores(&[0.2, 0.9, 0.5])).unwrap();

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].label.as_deref(), Some("dog"));
    assert_eq!(result.items[1].label.as_deref(), Some("bird"));
    assert!(result.items[0].probability > result.items[1].probability);
    assert!(!result.labels_degraded);
  }

  #[test]
  fn raw_scores_pass_through_without_softmax() {
    let decoder = ClassificationDecoder::new(labels(&["a", "b", "c"]));
    let result = decoder.classify(&scores(&[0.25, 3.0, -1.5])).unwrap();
    let probs: Vec<f32> = result.items.iter().map(|i| i.probability).collect();
    assert_eq!(probs, vec![300.0, 25.0, -150.0]);
  }

  #[test]
  fn percentages_round_to_two_decimals() {
    assert_eq!(to_percentage(0.123456), 12.35);
    assert_eq!(to_percentage(1.0), 100.0);
  }

  #[test]
  fn top_k_is_clamped_to_class_count() {
    let decoder = ClassificationDecoder::new(labels(&["a", "b"])).top_k(10);
    let result = decoder.classify(&scores(&[0.1, 0.2])).unwrap();
    assert_eq!(result.items.len(), 2);
  }

  #[test]
  fn equal_scores_keep_index_order() {
    let ranked = top_k(&[0.5, 0.9, 0.5, 0.9], 4);
    let ids: Vec<usize> = ranked.iter().map(|&(id, _)| id).collect();
    assert_eq!(ids, vec![1, 3, 0, 2]);
  }

  #[test]
  fn label_count_must_match_classes() {
    let decoder = ClassificationDecoder::new(labels(&["a", "b", ""]));
    let err = decoder.classify(&scores(&[0.1, 0.2, 0.3])).unwrap_err();
    assert!(matches!(
      err,
      DecodeError::LabelMismatch {
        expected: 3,
        actual: 2
      }
    ));
  }

  #[test]
  fn degraded_labels_still_decode() {
    let reason = DecodeError::FileReadError {
      path: "labels.txt".into(),
      source: std::io::Error::from(std::io::ErrorKind::NotFound),
    };
    let decoder = ClassificationDecoder::new(LabelSet::degraded(reason));
    let result = decoder.classify(&scores(&[0.1, 0.7, 0.2])).unwrap();
    assert!(result.labels_degraded);
    assert_eq!(result.items[0].class_id, 1);
    assert_eq!(result.items[0].label, None);
  }

  #[test]
  fn accepts_flat_and_singleton_shapes() {
    let decoder = ClassificationDecoder::new(labels(&["a", "b"]));
    let flat = Tensor::new(vec![2], vec![0.3, 0.6]).unwrap();
    let nchw = Tensor::new(vec![1, 2, 1, 1], vec![0.3, 0.6]).unwrap();
    assert_eq!(decoder.classify(&flat).unwrap(), decoder.classify(&nchw).unwrap());
  }

  #[test]
  fn rejects_matrices_and_empty_output() {
    let decoder = ClassificationDecoder::new(labels(&["a", "b", "c"]));
    let matrix = Tensor::new(vec![2, 3], vec![0.0; 6]).unwrap();
    assert!(matches!(
      decoder.classify(&matrix),
      Err(DecodeError::ShapeMismatch(_))
    ));
    let empty = Tensor::new(vec![1, 0], vec![]).unwrap();
    assert!(matches!(
      decoder.classify(&empty),
      Err(DecodeError::ShapeMismatch(_))
    ));
  }

  #[test]
  fn builder_reads_query_parameters() {
    let url = Url::parse(
      "classification:///models/alexnet?topk=5&softmax=true&width=227&labels=synset.txt",
    )
    .unwrap();
    let builder = ClassificationBuilder::from_url(&url).unwrap();
    assert_eq!(builder.top_k, 5);
    assert!(builder.need_softmax);
    assert_eq!(builder.blob.target_size(), (227, 224));
    assert_eq!(
      builder.files().labels.as_deref(),
      Some(std::path::Path::new("/models/alexnet/synset.txt"))
    );
  }

  #[test]
  fn builder_rejects_unknown_parameters_and_schemes() {
    let url = Url::parse("classification:///models/alexnet?dataset=COCO").unwrap();
    assert_eq!(
      ClassificationBuilder::from_url(&url).unwrap_err(),
      ConfigError::UnknownParameter("dataset".to_string())
    );

    let url = Url::parse("pose:///models/openpose").unwrap();
    assert!(matches!(
      ClassificationBuilder::from_url(&url),
      Err(ConfigError::SchemeMismatch { .. })
    ));
  }

  #[test]
  fn builder_degrades_when_labels_are_missing() {
    let url = Url::parse("classification:///nonexistent/shanan/model").unwrap();
    let decoder = ClassificationBuilder::from_url(&url).unwrap().build();
    assert!(decoder.labels().is_degraded());
    assert!(matches!(
      decoder.labels().degraded_reason(),
      Some(DecodeError::FileReadError { .. })
    ));
  }
}
