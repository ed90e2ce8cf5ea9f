// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/pose.rs - 人体姿态估计解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  blob::BlobBuilder,
  error::DecodeError,
  frame::{Image, Tensor},
  model::{ConfigError, Decoder, ModelFiles, apply_blob_param, check_scheme, parse_value},
  output::draw::Draw,
  topology::TopologyKind,
};

const POSE_INPUT_W: u32 = 368;
const POSE_INPUT_H: u32 = 368;
const POSE_MEAN: [f32; 3] = [0.0, 0.0, 0.0];
const POSE_SCALE: f32 = 0.00392;
const POSE_THRESHOLD: f32 = 0.1;

/// 单个身体部位的检测结果，`position` 为 `None` 表示本帧未检出
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
  pub part: usize,
  pub position: Option<(i32, i32)>,
  pub confidence: f32,
}

impl Keypoint {
  pub fn is_present(&self) -> bool {
    self.position.is_some()
  }
}

/// 实际绘制出的一条骨架连线
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limb {
  pub from: usize,
  pub to: usize,
  pub start: (i32, i32),
  pub end: (i32, i32),
}

#[derive(Debug, Clone)]
pub struct PoseResult {
  pub image: RgbImage,
  pub keypoints: Box<[Keypoint]>,
  pub limbs: Box<[Limb]>,
  pub topology: TopologyKind,
}

/// 行优先扫描，取第一个最大值
fn argmax(heatmap: &[f32]) -> (usize, f32) {
  heatmap
    .iter()
    .copied()
    .enumerate()
    .fold((0, f32::NEG_INFINITY), |best, (idx, value)| {
      if value > best.1 { (idx, value) } else { best }
    })
}

fn scale_coord(extent: u32, index: usize, size: usize) -> i32 {
  (extent as f64 * index as f64 / size as f64).round() as i32
}

fn default_blob() -> BlobBuilder {
  BlobBuilder::new(POSE_INPUT_W, POSE_INPUT_H)
    .mean(POSE_MEAN)
    .scale(POSE_SCALE)
}

pub struct PoseDecoder {
  blob: BlobBuilder,
  topology: TopologyKind,
  threshold: f32,
  draw: Draw,
}

impl PoseDecoder {
  pub fn new(topology: TopologyKind) -> Self {
    Self {
      blob: default_blob(),
      topology,
      threshold: POSE_THRESHOLD,
      draw: Draw::default(),
    }
  }

  pub fn with_blob(mut self, blob: BlobBuilder) -> Self {
    self.blob = blob;
    self
  }

  pub fn threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn topology(&self) -> TopologyKind {
    self.topology
  }

  /// 热力图通道数可以等于部位数，也可以多一个背景通道
  fn check_shape(&self, heatmaps: &Tensor) -> Result<(usize, usize, usize), DecodeError> {
    let (parts, map_h, map_w) = heatmaps.chw()?;
    let expected = self.topology.topology().part_count();
    if parts != expected && parts != expected + 1 {
      return Err(DecodeError::shape(format!(
        "{} 拓扑需要 {} 或 {} 个热力图通道, 实际为 {}",
        self.topology,
        expected,
        expected + 1,
        parts
      )));
    }
    if map_h == 0 || map_w == 0 {
      return Err(DecodeError::shape(format!(
        "热力图尺寸必须为正: {}x{}",
        map_w, map_h
      )));
    }
    Ok((parts, map_h, map_w))
  }

  /// 每个通道取最大响应，超过阈值时映射到 `width x height` 画布坐标
  pub fn keypoints(
    &self,
    heatmaps: &Tensor,
    width: u32,
    height: u32,
  ) -> Result<Box<[Keypoint]>, DecodeError> {
    let (parts, map_h, map_w) = self.check_shape(heatmaps)?;
    let map_size = map_h * map_w;

    let keypoints: Box<[Keypoint]> = (0..parts)
      .map(|part| {
        let (max_idx, confidence) = argmax(heatmaps.plane(part, map_size));
        let position = (confidence > self.threshold).then(|| {
          let row = max_idx / map_w;
          let col = max_idx % map_w;
          (scale_coord(width, col, map_w), scale_coord(height, row, map_h))
        });
        Keypoint {
          part,
          position,
          confidence,
        }
      })
      .collect();

    debug!(
      "检出 {} / {} 个关键点",
      keypoints.iter().filter(|k| k.is_present()).count(),
      parts
    );
    Ok(keypoints)
  }

  pub fn estimate(&self, heatmaps: &Tensor, source: &Image) -> Result<PoseResult, DecodeError> {
    debug!("后处理姿态输出");
    let keypoints = self.keypoints(heatmaps, source.width(), source.height())?;
    source.validate()?;
    let mut image = source.to_rgb_image()?;

    let position = |part: usize| keypoints.get(part).and_then(|k| k.position);
    let mut limbs = Vec::new();
    for (from, to) in self.topology.topology().edges() {
      // 两端都检出才画
      let (Some(start), Some(end)) = (position(from), position(to)) else {
        continue;
      };
      self.draw.draw_limb(&mut image, start, end);
      limbs.push(Limb {
        from,
        to,
        start,
        end,
      });
    }
    debug!("绘制 {} 条骨架连线", limbs.len());

    Ok(PoseResult {
      image,
      keypoints,
      limbs: limbs.into_boxed_slice(),
      topology: self.topology,
    })
  }
}

impl Decoder for PoseDecoder {
  type Output = PoseResult;

  fn blob(&self) -> &BlobBuilder {
    &self.blob
  }

  fn decode(&self, output: &Tensor, source: &Image) -> Result<Self::Output, DecodeError> {
    self.estimate(output, source)
  }
}

/// 从 `pose:///模型目录?dataset=MPI&threshold=0.2` 构建姿态解码器
#[derive(Debug, Clone)]
pub struct PoseBuilder {
  files: ModelFiles,
  blob: BlobBuilder,
  topology: TopologyKind,
  threshold: f32,
}

impl FromUrlWithScheme for PoseBuilder {
  const SCHEME: &'static str = "pose";
}

impl FromUrl for PoseBuilder {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;

    let mut builder = PoseBuilder {
      files: ModelFiles::from_dir(url.path()).without_labels(),
      blob: default_blob(),
      topology: TopologyKind::default(),
      threshold: POSE_THRESHOLD,
    };

    for (key, value) in url.query_pairs() {
      if apply_blob_param(&mut builder.blob, &key, &value)? {
        continue;
      }
      match key.as_ref() {
        "dataset" => builder.topology = parse_value(&key, &value)?,
        "threshold" => builder.threshold = parse_value(&key, &value)?,
        _ => return Err(ConfigError::UnknownParameter(key.to_string())),
      }
    }

    Ok(builder)
  }
}

impl PoseBuilder {
  pub fn files(&self) -> &ModelFiles {
    &self.files
  }

  pub fn build(&self) -> PoseDecoder {
    info!(
      "姿态解码器: 拓扑 = {}, 阈值 = {}",
      self.topology, self.threshold
    );
    PoseDecoder::new(self.topology)
      .with_blob(self.blob)
      .threshold(self.threshold)
  }
}
