// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 图像与张量定义
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

use image::{DynamicImage, RgbImage, RgbaImage};

use crate::error::DecodeError;

pub const RGB_CHANNELS: usize = 3;
pub const RGBA_CHANNELS: usize = 4;

/// 行优先、通道交错存放的 8 位图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
  width: u32,
  height: u32,
  channels: usize,
  data: Box<[u8]>,
}

impl Image {
  pub fn from_raw(
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
  ) -> Result<Self, DecodeError> {
    let expected = width as usize * height as usize * channels;
    if data.len() != expected {
      return Err(DecodeError::invalid_image(format!(
        "数据长度不匹配: 期望长度 {}, 实际长度 {}",
        expected,
        data.len()
      )));
    }

    Ok(Self {
      width,
      height,
      channels,
      data: data.into_boxed_slice(),
    })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> usize {
    self.channels
  }

  pub fn as_raw(&self) -> &[u8] {
    &self.data
  }

  /// 检查尺寸为正且通道数为 3 或 4
  pub fn validate(&self) -> Result<(), DecodeError> {
    if self.width == 0 || self.height == 0 {
      return Err(DecodeError::invalid_image(format!(
        "图像尺寸必须为正: {}x{}",
        self.width, self.height
      )));
    }
    if self.channels != RGB_CHANNELS && self.channels != RGBA_CHANNELS {
      return Err(DecodeError::invalid_image(format!(
        "不支持的通道数: {}",
        self.channels
      )));
    }
    Ok(())
  }

  /// 转为三通道 RGB 图像，四通道输入会丢弃 alpha
  pub fn to_rgb_image(&self) -> Result<RgbImage, DecodeError> {
    let data = self.data.to_vec();
    match self.channels {
      RGB_CHANNELS => RgbImage::from_raw(self.width, self.height, data)
        .ok_or_else(|| DecodeError::invalid_image("RGB 缓冲区长度错误")),
      RGBA_CHANNELS => RgbaImage::from_raw(self.width, self.height, data)
        .map(|rgba| DynamicImage::ImageRgba8(rgba).to_rgb8())
        .ok_or_else(|| DecodeError::invalid_image("RGBA 缓冲区长度错误")),
      other => Err(DecodeError::invalid_image(format!(
        "不支持的通道数: {}",
        other
      ))),
    }
  }
}

impl From<RgbImage> for Image {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width,
      height,
      channels: RGB_CHANNELS,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

impl From<RgbaImage> for Image {
  fn from(image: RgbaImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width,
      height,
      channels: RGBA_CHANNELS,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

/// 行优先存放的 f32 张量
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
  shape: Box<[usize]>,
  data: Box<[f32]>,
}

impl Tensor {
  pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, DecodeError> {
    let expected: usize = shape.iter().product();
    if data.len() != expected {
      return Err(DecodeError::shape(format!(
        "形状 {:?} 需要 {} 个元素, 实际为 {}",
        shape,
        expected,
        data.len()
      )));
    }

    Ok(Self {
      shape: shape.into_boxed_slice(),
      data: data.into_boxed_slice(),
    })
  }

  pub fn shape(&self) -> &[usize] {
    &self.shape
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// 按 `[1, C, H, W]` 解释张量，返回 `(C, H, W)`
  pub fn chw(&self) -> Result<(usize, usize, usize), DecodeError> {
    match self.shape[..] {
      [1, c, h, w] => Ok((c, h, w)),
      [n, _, _, _] => Err(DecodeError::shape(format!(
        "批大小必须为 1, 实际为 {}",
        n
      ))),
      _ => Err(DecodeError::shape(format!(
        "期望 4 维张量, 实际形状为 {:?}",
        self.shape
      ))),
    }
  }

  /// 通道平面布局下第 `c` 个 `plane` 长度的切片
  pub fn plane(&self, c: usize, plane: usize) -> &[f32] {
    &self.data[c * plane..(c + 1) * plane]
  }
}
