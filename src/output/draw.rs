// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 姿态骨架可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

// 骨架绘制常量
const LIMB_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const LIMB_THICKNESS: i32 = 3;
const JOINT_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const JOINT_RADIUS: i32 = 3;

pub struct Draw {
  limb_color: Rgb<u8>,
  limb_thickness: i32,
  joint_color: Rgb<u8>,
  joint_radius: i32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      limb_color: Rgb(LIMB_COLOR),
      limb_thickness: LIMB_THICKNESS,
      joint_color: Rgb(JOINT_COLOR),
      joint_radius: JOINT_RADIUS,
    }
  }
}

impl Draw {
  /// 画一段肢体：带宽度的连线，两端各一个实心圆
  pub fn draw_limb(&self, image: &mut RgbImage, start: (i32, i32), end: (i32, i32)) {
    let (x0, y0) = (start.0 as f32, start.1 as f32);
    let (x1, y1) = (end.0 as f32, end.1 as f32);
    let (dx, dy) = (x1 - x0, y1 - y0);
    let len = dx.hypot(dy);

    // 沿法线方向平移，叠出线宽
    let (nx, ny) = if len > 0.0 {
      (-dy / len, dx / len)
    } else {
      (0.0, 0.0)
    };
    let half = self.limb_thickness / 2;
    for offset in -half..=half {
      let o = offset as f32;
      draw_line_segment_mut(
        image,
        (x0 + nx * o, y0 + ny * o),
        (x1 + nx * o, y1 + ny * o),
        self.limb_color,
      );
    }

    self.draw_joint(image, start);
    self.draw_joint(image, end);
  }

  pub fn draw_joint(&self, image: &mut RgbImage, center: (i32, i32)) {
    draw_filled_circle_mut(image, center, self.joint_radius, self.joint_color);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn limb_marks_line_and_joints() {
    let mut image = RgbImage::new(40, 40);
    let draw = Draw::default();
    draw.draw_limb(&mut image, (5, 20), (35, 20));

    assert_eq!(image.get_pixel(20, 20), &Rgb(LIMB_COLOR));
    assert_eq!(image.get_pixel(20, 21), &Rgb(LIMB_COLOR));
    assert_eq!(image.get_pixel(5, 20), &Rgb(JOINT_COLOR));
    assert_eq!(image.get_pixel(35, 20), &Rgb(JOINT_COLOR));
    assert_eq!(image.get_pixel(20, 5), &Rgb([0, 0, 0]));
  }

  #[test]
  fn out_of_bounds_points_are_clipped() {
    let mut image = RgbImage::new(10, 10);
    Draw::default().draw_limb(&mut image, (-5, -5), (50, 50));
    assert_eq!(image.get_pixel(5, 5), &Rgb(LIMB_COLOR));
  }
}
