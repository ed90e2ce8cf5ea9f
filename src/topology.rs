// 该文件是 Shanan （山南西风） 项目的一部分。
// src/topology.rs - 姿态骨架拓扑
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

use std::{fmt, str::FromStr};

use thiserror::Error;

pub const BACKGROUND: &str = "Background";

/// 固定的骨架拓扑：部位名按下标排列，连线按部位名给出
#[derive(Debug, PartialEq, Eq)]
pub struct Topology {
  name: &'static str,
  body_parts: &'static [&'static str],
  pose_pairs: &'static [(&'static str, &'static str)],
}

pub const COCO: Topology = Topology {
  name: "COCO",
  body_parts: &[
    "Nose", "Neck", "RShoulder", "RElbow", "RWrist", "LShoulder", "LElbow", "LWrist", "RHip",
    "RKnee", "RAnkle", "LHip", "LKnee", "LAnkle", "REye", "LEye", "REar", "LEar", BACKGROUND,
  ],
  pose_pairs: &[
    ("Neck", "RShoulder"),
    ("Neck", "LShoulder"),
    ("RShoulder", "RElbow"),
    ("RElbow", "RWrist"),
    ("LShoulder", "LElbow"),
    ("LElbow", "LWrist"),
    ("Neck", "RHip"),
    ("RHip", "RKnee"),
    ("RKnee", "RAnkle"),
    ("Neck", "LHip"),
    ("LHip", "LKnee"),
    ("LKnee", "LAnkle"),
    ("Neck", "Nose"),
    ("Nose", "REye"),
    ("REye", "REar"),
    ("Nose", "LEye"),
    ("LEye", "LEar"),
  ],
};

pub const MPI: Topology = Topology {
  name: "MPI",
  body_parts: &[
    "Head", "Neck", "RShoulder", "RElbow", "RWrist", "LShoulder", "LElbow", "LWrist", "RHip",
    "RKnee", "RAnkle", "LHip", "LKnee", "LAnkle", "Chest", BACKGROUND,
  ],
  pose_pairs: &[
    ("Head", "Neck"),
    ("Neck", "RShoulder"),
    ("RShoulder", "RElbow"),
    ("RElbow", "RWrist"),
    ("Neck", "LShoulder"),
    ("LShoulder", "LElbow"),
    ("LElbow", "LWrist"),
    ("Neck", "Chest"),
    ("Chest", "RHip"),
    ("RHip", "RKnee"),
    ("RKnee", "RAnkle"),
    ("Chest", "LHip"),
    ("LHip", "LKnee"),
    ("LKnee", "LAnkle"),
  ],
};

pub const BODY_25: Topology = Topology {
  name: "BODY_25",
  body_parts: &[
    "Nose", "Neck", "RShoulder", "RElbow", "RWrist", "LShoulder", "LElbow", "LWrist", "MidHip",
    "RHip", "RKnee", "RAnkle", "LHip", "LKnee", "LAnkle", "REye", "LEye", "REar", "LEar",
    "LBigToe", "LSmallToe", "LHeel", "RBigToe", "RSmallToe", "RHeel", BACKGROUND,
  ],
  pose_pairs: &[
    ("Neck", "Nose"),
    ("Neck", "RShoulder"),
    ("Neck", "LShoulder"),
    ("RShoulder", "RElbow"),
    ("RElbow", "RWrist"),
    ("LShoulder", "LElbow"),
    ("LElbow", "LWrist"),
    ("Nose", "REye"),
    ("REye", "REar"),
    ("Nose", "LEye"),
    ("LEye", "LEar"),
    ("Neck", "MidHip"),
    ("MidHip", "RHip"),
    ("RHip", "RKnee"),
    ("RKnee", "RAnkle"),
    ("RAnkle", "RBigToe"),
    ("RBigToe", "RSmallToe"),
    ("RAnkle", "RHeel"),
    ("MidHip", "LHip"),
    ("LHip", "LKnee"),
    ("LKnee", "LAnkle"),
    ("LAnkle", "LBigToe"),
    ("LBigToe", "LSmallToe"),
    ("LAnkle", "LHeel"),
  ],
};

const fn same_name(a: &str, b: &str) -> bool {
  let (a, b) = (a.as_bytes(), b.as_bytes());
  if a.len() != b.len() {
    return false;
  }
  let mut i = 0;
  while i < a.len() {
    if a[i] != b[i] {
      return false;
    }
    i += 1;
  }
  true
}

const fn has_part(parts: &[&str], name: &str) -> bool {
  let mut i = 0;
  while i < parts.len() {
    if same_name(parts[i], name) {
      return true;
    }
    i += 1;
  }
  false
}

const fn pairs_resolve(topology: &Topology) -> bool {
  let mut i = 0;
  while i < topology.pose_pairs.len() {
    let (from, to) = topology.pose_pairs[i];
    if !has_part(topology.body_parts, from) || !has_part(topology.body_parts, to) {
      return false;
    }
    i += 1;
  }
  true
}

// 连线引用的部位必须存在，编译期检查
const _: () = assert!(pairs_resolve(&COCO));
const _: () = assert!(pairs_resolve(&MPI));
const _: () = assert!(pairs_resolve(&BODY_25));

impl Topology {
  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn body_parts(&self) -> &'static [&'static str] {
    self.body_parts
  }

  pub fn pose_pairs(&self) -> &'static [(&'static str, &'static str)] {
    self.pose_pairs
  }

  /// 身体部位数量，不含背景
  pub fn part_count(&self) -> usize {
    self
      .body_parts
      .iter()
      .filter(|&&name| name != BACKGROUND)
      .count()
  }

  pub fn part_index(&self, name: &str) -> Option<usize> {
    self.body_parts.iter().position(|&part| part == name)
  }

  /// 以部位下标表示的连线，顺序与 `pose_pairs` 一致
  pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
    self
      .pose_pairs
      .iter()
      .filter_map(|&(from, to)| Some((self.part_index(from)?, self.part_index(to)?)))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TopologyKind {
  #[default]
  Coco,
  Mpi,
  Body25,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("未知的骨架拓扑: {0}, 可选 COCO、MPI、BODY_25")]
pub struct UnknownTopology(pub String);

impl TopologyKind {
  pub fn topology(self) -> &'static Topology {
    match self {
      TopologyKind::Coco => &COCO,
      TopologyKind::Mpi => &MPI,
      TopologyKind::Body25 => &BODY_25,
    }
  }
}

impl FromStr for TopologyKind {
  type Err = UnknownTopology;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_uppercase().as_str() {
      "COCO" => Ok(TopologyKind::Coco),
      "MPI" => Ok(TopologyKind::Mpi),
      "BODY_25" | "BODY25" => Ok(TopologyKind::Body25),
      _ => Err(UnknownTopology(s.to_string())),
    }
  }
}

impl fmt::Display for TopologyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.topology().name())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const ALL: [TopologyKind; 3] = [TopologyKind::Coco, TopologyKind::Mpi, TopologyKind::Body25];

  #[test]
  fn part_counts_exclude_background() {
    assert_eq!(COCO.part_count(), 18);
    assert_eq!(MPI.part_count(), 15);
    assert_eq!(BODY_25.part_count(), 25);
  }

  #[test]
  fn every_pair_resolves_to_indices() {
    for kind in ALL {
      let topology = kind.topology();
      assert_eq!(topology.edges().count(), topology.pose_pairs().len());
    }
  }

  #[test]
  fn edges_follow_pair_order() {
    let edges: Vec<_> = COCO.edges().take(2).collect();
    assert_eq!(edges, vec![(1, 2), (1, 5)]);
    assert_eq!(MPI.edges().next(), Some((0, 1)));
  }

  #[test]
  fn background_is_last() {
    for kind in ALL {
      let parts = kind.topology().body_parts();
      assert_eq!(parts.last(), Some(&BACKGROUND));
    }
  }

  #[test]
  fn parse_and_display_round_trip() {
    for kind in ALL {
      assert_eq!(kind.to_string().parse::<TopologyKind>(), Ok(kind));
    }
    assert_eq!("body_25".parse::<TopologyKind>(), Ok(TopologyKind::Body25));
    assert!("HAND".parse::<TopologyKind>().is_err());
  }
}
