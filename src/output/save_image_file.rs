// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/save_image_file.rs - 保存结果到文件
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

use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Render};

#[cfg(feature = "model_pose")]
use crate::topology::BACKGROUND;

#[cfg(feature = "model_classification")]
use crate::model::ClassificationResult;
#[cfg(feature = "model_pose")]
use crate::model::PoseResult;
#[cfg(feature = "model_segmentation")]
use crate::model::SegmentationResult;

/// 把解码结果写到 `image:///路径`
///
/// 图像结果保存到该路径，文字记录写到同名的 `.txt` 文件。
pub struct SaveImageFileOutput {
  path: PathBuf,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(Self::new(uri.path()))
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn record_path(&self) -> PathBuf {
    self.path.with_extension("txt")
  }

  fn ensure_parent(&self) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    Ok(())
  }

  fn save_image(&self, image: DynamicImage) -> Result<(), SaveImageFileError> {
    self.ensure_parent()?;

    // JPEG 不支持透明通道
    let image = match ImageFormat::from_path(&self.path) {
      Ok(ImageFormat::Jpeg) => DynamicImage::ImageRgb8(image.into_rgb8()),
      _ => image,
    };
    image.save(&self.path)?;

    warn!("保存图像到文件: {}", self.path.display());
    Ok(())
  }

  fn save_records(&self, records: Vec<String>) -> Result<(), SaveImageFileError> {
    self.ensure_parent()?;
    let path = self.record_path();
    std::fs::write(&path, records.join("\n"))?;
    warn!("保存记录到文件: {}", path.display());
    Ok(())
  }
}

#[cfg(feature = "model_classification")]
impl Render<ClassificationResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, result: &ClassificationResult) -> Result<(), Self::Error> {
    let records = result
      .items
      .iter()
      .map(|item| match &item.label {
        Some(label) => format!("{}, {:.2}", label, item.probability),
        None => format!("{}, {:.2}", item.class_id, item.probability),
      })
      .collect();
    self.save_records(records)
  }
}

#[cfg(feature = "model_pose")]
impl Render<PoseResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, result: &PoseResult) -> Result<(), Self::Error> {
    self.save_image(DynamicImage::ImageRgb8(result.image.clone()))?;

    let parts = result.topology.topology().body_parts();
    let records = result
      .keypoints
      .iter()
      .filter_map(|kp| {
        let (x, y) = kp.position?;
        // 背景通道不是身体部位
        let part = parts.get(kp.part).filter(|&&name| name != BACKGROUND)?;
        Some(format!("{}, {}, {}, {:.4}", part, x, y, kp.confidence))
      })
      .collect();
    self.save_records(records)
  }
}

#[cfg(feature = "model_segmentation")]
impl Render<SegmentationResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, result: &SegmentationResult) -> Result<(), Self::Error> {
    self.save_image(DynamicImage::ImageRgba8(result.image.clone()))?;

    // 图例：只列出图中出现过的类别
    let mut present = vec![false; result.palette.len()];
    for &class_id in result.class_map.iter() {
      present[class_id] = true;
    }
    let records = present
      .iter()
      .enumerate()
      .filter(|&(_, &seen)| seen)
      .map(|(class_id, _)| {
        let [r, g, b] = result.palette[class_id];
        match &result.class_names[class_id] {
          Some(name) => format!("{}, {}, {}, {}, {}", class_id, name, r, g, b),
          None => format!("{}, {}, {}, {}", class_id, r, g, b),
        }
      })
      .collect();
    self.save_records(records)
  }
}
