// 该文件是 Shanan （山南西风） 项目的一部分。
// src/blob.rs - 网络输入 Blob 构建
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

use image::{ImageBuffer, Rgb, RgbImage};
use tracing::debug;

use crate::{
  error::DecodeError,
  frame::{Image, RGB_CHANNELS, Tensor},
};

/// 源坐标的两个相邻采样下标与右侧权重，像素中心对齐
///
/// `src = (dst + 0.5) * ratio - 0.5`，越界时夹到边缘。
fn linear_taps(dst: u32, ratio: f32, src_len: u32) -> (u32, u32, f32) {
  let src = ((dst as f32 + 0.5) * ratio - 0.5).max(0.0);
  let last = src_len - 1;
  let lo = (src.floor() as u32).min(last);
  let hi = (lo + 1).min(last);
  (lo, hi, src - lo as f32)
}

/// 双线性插值缩放，不做下采样抗锯齿
fn resize_bilinear(image: &RgbImage, width: u32, height: u32) -> RgbImage {
  let (src_w, src_h) = image.dimensions();
  let ratio_x = src_w as f32 / width as f32;
  let ratio_y = src_h as f32 / height as f32;
  let cols: Vec<_> = (0..width)
    .map(|x| linear_taps(x, ratio_x, src_w))
    .collect();

  ImageBuffer::from_fn(width, height, |x, y| {
    let (y0, y1, wy) = linear_taps(y, ratio_y, src_h);
    let (x0, x1, wx) = cols[x as usize];
    let (p00, p01) = (image.get_pixel(x0, y0), image.get_pixel(x1, y0));
    let (p10, p11) = (image.get_pixel(x0, y1), image.get_pixel(x1, y1));
    Rgb(std::array::from_fn(|c| {
      let top = p00[c] as f32 * (1.0 - wx) + p01[c] as f32 * wx;
      let bottom = p10[c] as f32 * (1.0 - wx) + p11[c] as f32 * wx;
      (top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8
    }))
  })
}

const BGR_ORDER: [usize; RGB_CHANNELS] = [2, 1, 0];
const RGB_ORDER: [usize; RGB_CHANNELS] = [0, 1, 2];

/// 把任意尺寸图像缩放、减均值、乘系数后排成 `[1, 3, H, W]` 的张量
///
/// 默认输出 BGR 通道顺序，`swap_rb` 打开时输出 RGB。
/// `mean[k]` 作用于输出的第 `k` 个通道平面。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobBuilder {
  width: u32,
  height: u32,
  mean: [f32; RGB_CHANNELS],
  scale: f32,
  swap_rb: bool,
}

impl BlobBuilder {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      mean: [0.0; RGB_CHANNELS],
      scale: 1.0,
      swap_rb: false,
    }
  }

  pub fn size(mut self, width: u32, height: u32) -> Self {
    self.width = width;
    self.height = height;
    self
  }

  pub fn mean(mut self, mean: [f32; RGB_CHANNELS]) -> Self {
    self.mean = mean;
    self
  }

  pub fn scale(mut self, scale: f32) -> Self {
    self.scale = scale;
    self
  }

  pub fn swap_rb(mut self, swap_rb: bool) -> Self {
    self.swap_rb = swap_rb;
    self
  }

  pub fn target_size(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  pub fn build(&self, image: &Image) -> Result<Tensor, DecodeError> {
    if self.width == 0 || self.height == 0 {
      return Err(DecodeError::invalid_image(format!(
        "目标尺寸必须为正: {}x{}",
        self.width, self.height
      )));
    }
    image.validate()?;

    // 四通道输入在这里丢弃 alpha，中间缓冲只在本函数内存活
    let rgb = image.to_rgb_image()?;
    let resized = if rgb.dimensions() == (self.width, self.height) {
      rgb
    } else {
      debug!(
        "缩放图像: {}x{} -> {}x{}",
        rgb.width(),
        rgb.height(),
        self.width,
        self.height
      );
      resize_bilinear(&rgb, self.width, self.height)
    };

    let order = if self.swap_rb { RGB_ORDER } else { BGR_ORDER };
    let plane = self.width as usize * self.height as usize;
    let mut data = vec![0f32; RGB_CHANNELS * plane];

    for (idx, pixel) in resized.pixels().enumerate() {
      for (k, &src) in order.iter().enumerate() {
        data[k * plane + idx] = (pixel[src] as f32 - self.mean[k]) * self.scale;
      }
    }

    Tensor::new(
      vec![1, RGB_CHANNELS, self.height as usize, self.width as usize],
      data,
    )
  }
}
