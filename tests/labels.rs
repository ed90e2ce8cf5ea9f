use std::fs;

use shanan_decode::{
  DecodeError, FromUrl, LabelSet, Tensor,
  model::{ClassificationBuilder, ModelFiles},
};
use tempfile::TempDir;
use url::Url;

fn model_dir_with_labels(text: &str) -> TempDir {
  let dir = tempfile::tempdir().unwrap();
  fs::write(dir.path().join(ModelFiles::LABELS_FILE), text).unwrap();
  dir
}

fn task_url(dir: &TempDir, query: &str) -> Url {
  let mut url = Url::parse("classification:///").unwrap();
  url.set_path(&dir.path().to_string_lossy());
  url.set_query(Some(query));
  url
}

#[test]
fn labels_load_with_crlf_and_trailing_newline() {
  let dir = model_dir_with_labels("tench\r\ngoldfish\r\nshark\r\n");
  let labels = LabelSet::load(dir.path().join(ModelFiles::LABELS_FILE));
  assert!(!labels.is_degraded());
  assert_eq!(labels.len(), 3);
  assert_eq!(labels.get(1), Some("goldfish"));
  assert_eq!(labels.get(3), None);
}

#[test]
fn missing_label_file_degrades_but_classifies() {
  let dir = tempfile::tempdir().unwrap();
  let labels = LabelSet::load(dir.path().join("nope.txt"));
  assert!(labels.is_degraded());
  assert!(matches!(
    labels.degraded_reason(),
    Some(DecodeError::FileReadError { .. })
  ));

  let decoder = ClassificationBuilder::from_url(&task_url(&dir, "topk=2"))
    .unwrap()
    .build();
  let scores = Tensor::new(vec![1, 4, 1, 1], vec![0.1, 0.2, 0.6, 0.1]).unwrap();
  let result = decoder.classify(&scores).unwrap();

  assert!(result.labels_degraded);
  assert_eq!(result.items.len(), 2);
  assert_eq!(result.items[0].class_id, 2);
  assert_eq!(result.items[0].label, None);
}

#[test]
fn builder_reads_labels_from_model_directory() {
  let dir = model_dir_with_labels("cat\ndog\n");
  let decoder = ClassificationBuilder::from_url(&task_url(&dir, "softmax=true"))
    .unwrap()
    .build();

  let result = decoder
    .classify(&Tensor::new(vec![2], vec![0.0, 0.0]).unwrap())
    .unwrap();
  assert!(!result.labels_degraded);
  assert_eq!(result.items.len(), 2);
  assert_eq!(result.items[0].label.as_deref(), Some("cat"));
  assert_eq!(result.items[0].probability, 50.0);
}

#[test]
fn custom_label_file_name() {
  let dir = tempfile::tempdir().unwrap();
  fs::write(dir.path().join("synset.txt"), "a\nb\nc").unwrap();

  let builder = ClassificationBuilder::from_url(&task_url(&dir, "labels=synset.txt")).unwrap();
  let decoder = builder.build();
  assert_eq!(decoder.labels().len(), 3);
}

#[test]
fn label_count_must_match_scores() {
  let dir = model_dir_with_labels("cat\ndog\n");
  let decoder = ClassificationBuilder::from_url(&task_url(&dir, "topk=1"))
    .unwrap()
    .build();

  let err = decoder
    .classify(&Tensor::new(vec![3], vec![0.1, 0.2, 0.7]).unwrap())
    .unwrap_err();
  assert!(matches!(
    err,
    DecodeError::LabelMismatch {
      expected: 3,
      actual: 2
    }
  ));
}

#[test]
fn segmentation_tolerates_missing_labels() {
  use shanan_decode::model::SegmentationBuilder;

  let dir = tempfile::tempdir().unwrap();
  let mut url = Url::parse("segmentation:///").unwrap();
  url.set_path(&dir.path().to_string_lossy());
  url.set_query(Some("seed=1"));

  let decoder = SegmentationBuilder::from_url(&url).unwrap().build();
  let scores = Tensor::new(vec![1, 2, 1, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
  let result = decoder.segment(&scores).unwrap();
  assert!(result.labels_degraded);
  assert_eq!(&*result.class_map, &[0, 1]);
  assert!(result.class_names.iter().all(Option::is_none));
}
