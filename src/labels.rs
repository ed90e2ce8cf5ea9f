// 该文件是 Shanan （山南西风） 项目的一部分。
// src/labels.rs - 类别标签
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

use std::path::Path;

use tracing::{debug, error, info};

use crate::error::DecodeError;

/// 按类别编号排列的标签
///
/// 标签文件读取失败不会中断解码：得到一个空集合，
/// 并通过 [`LabelSet::degraded`] 保留失败原因。
#[derive(Debug, Default)]
pub struct LabelSet {
  labels: Vec<String>,
  degraded: Option<DecodeError>,
}

impl LabelSet {
  /// 按行解析，去掉行尾 `\r` 和末尾的空行
  pub fn parse(text: &str) -> Self {
    text
      .split('\n')
      .map(|line| line.strip_suffix('\r').unwrap_or(line))
      .collect()
  }

  pub fn load(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    match std::fs::read_to_string(path) {
      Ok(text) => {
        let labels = Self::parse(&text);
        debug!("标签数量: {}", labels.len());
        labels
      }
      Err(source) => {
        error!("读取标签文件 {} 失败: {}, 使用空标签继续", path.display(), source);
        Self::degraded(DecodeError::FileReadError {
          path: path.to_path_buf(),
          source,
        })
      }
    }
  }

  /// 空标签集合，并记录降级原因
  pub fn degraded(reason: DecodeError) -> Self {
    Self {
      labels: Vec::new(),
      degraded: Some(reason),
    }
  }

  pub fn is_degraded(&self) -> bool {
    self.degraded.is_some()
  }

  pub fn degraded_reason(&self) -> Option<&DecodeError> {
    self.degraded.as_ref()
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.labels.get(class_id).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    let mut labels: Vec<String> = iter.into_iter().map(Into::into).collect();
    while labels.last().is_some_and(|label| label.is_empty()) {
      labels.pop();
    }
    Self {
      labels,
      degraded: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trailing_empty_lines_are_trimmed() {
    let labels = LabelSet::parse("cat\ndog\nbird\n\n");
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(2), Some("bird"));
    assert!(!labels.is_degraded());
  }

  #[test]
  fn interior_empty_lines_keep_their_index() {
    let labels = LabelSet::parse("cat\n\nbird\n");
    assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["cat", "", "bird"]);
  }

  #[test]
  fn carriage_returns_are_stripped() {
    let labels = LabelSet::parse("cat\r\ndog\r\n");
    assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["cat", "dog"]);
  }

  #[test]
  fn empty_text_gives_empty_set() {
    assert!(LabelSet::parse("").is_empty());
  }

  #[test]
  fn collecting_trims_trailing_empties() {
    let labels: LabelSet = ["a", "b", "", ""].into_iter().collect();
    assert_eq!(labels.len(), 2);
  }
}
