use std::fs;

use image::{Rgb, RgbImage};
use shanan_decode::{
  LabelSet, Tensor, TopologyKind,
  model::{ClassificationDecoder, Keypoint, PoseResult, SegmentationDecoder},
  output::{Render, SaveImageFileOutput},
};

#[test]
fn classification_writes_ranked_records() {
  let dir = tempfile::tempdir().unwrap();
  let output = SaveImageFileOutput::new(dir.path().join("cls/result.png"));

  let labels: LabelSet = ["cat", "dog", "bird"].into_iter().collect();
  let result = ClassificationDecoder::new(labels)
    .need_softmax(true)
    .top_k(2)
    .classify(&Tensor::new(vec![3], vec![0.2, 0.9, 0.5]).unwrap())
    .unwrap();
  output.render_result(&result).unwrap();

  let text = fs::read_to_string(dir.path().join("cls/result.txt")).unwrap();
  let names: Vec<&str> = text
    .lines()
    .map(|line| line.split(", ").next().unwrap())
    .collect();
  assert_eq!(names, ["dog", "bird"]);
}

#[test]
fn pose_saves_image_and_present_keypoints() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("pose.png");
  let output = SaveImageFileOutput::new(&path);

  let result = PoseResult {
    image: RgbImage::from_pixel(8, 6, Rgb([10, 20, 30])),
    keypoints: vec![
      Keypoint {
        part: 0,
        position: Some((3, 4)),
        confidence: 0.8,
      },
      Keypoint {
        part: 1,
        position: None,
        confidence: 0.05,
      },
    ]
    .into_boxed_slice(),
    limbs: Box::new([]),
    topology: TopologyKind::Coco,
  };
  output.render_result(&result).unwrap();

  let saved = image::open(&path).unwrap().into_rgb8();
  assert_eq!(saved.dimensions(), (8, 6));
  assert_eq!(saved.get_pixel(0, 0), &Rgb([10, 20, 30]));

  let text = fs::read_to_string(dir.path().join("pose.txt")).unwrap();
  assert_eq!(text, "Nose, 3, 4, 0.8000");
}

#[test]
fn pose_records_skip_background_channel() {
  let dir = tempfile::tempdir().unwrap();
  let output = SaveImageFileOutput::new(dir.path().join("pose.png"));

  let result = PoseResult {
    image: RgbImage::new(4, 4),
    keypoints: vec![
      Keypoint {
        part: 1,
        position: Some((2, 2)),
        confidence: 0.5,
      },
      Keypoint {
        part: 18,
        position: Some((1, 1)),
        confidence: 0.9,
      },
    ]
    .into_boxed_slice(),
    limbs: Box::new([]),
    topology: TopologyKind::Coco,
  };
  output.render_result(&result).unwrap();

  let text = fs::read_to_string(dir.path().join("pose.txt")).unwrap();
  assert_eq!(text, "Neck, 2, 2, 0.5000");
}

#[test]
fn segmentation_drops_alpha_for_jpeg() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("seg.jpg");
  let output = SaveImageFileOutput::new(&path);

  let scores = Tensor::new(
    vec![1, 2, 2, 2],
    vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0],
  )
  .unwrap();
  let result = SegmentationDecoder::new()
    .seed(Some(2))
    .segment(&scores)
    .unwrap();
  output.render_result(&result).unwrap();

  let saved = image::open(&path).unwrap();
  assert_eq!(saved.width(), 2);
  assert!(!saved.color().has_alpha());

  let legend = fs::read_to_string(dir.path().join("seg.txt")).unwrap();
  assert_eq!(legend.lines().count(), 2);
  assert!(legend.starts_with("0, 0, 0, 0"));
}
