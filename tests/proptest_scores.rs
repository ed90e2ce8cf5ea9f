//! 分数排序与 softmax 的性质测试

use proptest::prelude::*;
use shanan_decode::model::{softmax, top_k};

fn arb_scores() -> impl Strategy<Value = Vec<f32>> {
  prop::collection::vec(-50.0f32..50.0, 1..64)
}

proptest! {
  #[test]
  fn softmax_is_a_distribution(scores in arb_scores()) {
    let probs = softmax(&scores);
    prop_assert_eq!(probs.len(), scores.len());
    prop_assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
    let sum: f32 = probs.iter().sum();
    prop_assert!((sum - 1.0).abs() < 1e-4);
  }

  #[test]
  fn softmax_preserves_rank_order(scores in arb_scores(), shift in -100.0f32..100.0) {
    let shifted: Vec<f32> = scores.iter().map(|s| s + shift).collect();
    let probs = softmax(&shifted);
    let ranked = top_k(&scores, scores.len());
    // 平移和取指数的舍入只会把相邻分数压成并列，不会反转
    for pair in ranked.windows(2) {
      prop_assert!(probs[pair[0].0] >= probs[pair[1].0]);
    }
    let ranked_probs: Vec<usize> = top_k(&probs, probs.len()).iter().map(|r| r.0).collect();
    for pair in ranked_probs.windows(2) {
      prop_assert!(
        scores[pair[0]] >= scores[pair[1]] || probs[pair[0]] == probs[pair[1]]
      );
    }
  }

  #[test]
  fn top_k_is_sorted_and_bounded(scores in arb_scores(), k in 0usize..80) {
    let ranked = top_k(&scores, k);
    prop_assert_eq!(ranked.len(), k.min(scores.len()));
    for pair in ranked.windows(2) {
      prop_assert!(pair[0].1 >= pair[1].1);
      if pair[0].1.to_bits() == pair[1].1.to_bits() {
        prop_assert!(pair[0].0 < pair[1].0);
      }
    }
  }

  #[test]
  fn top_k_reports_unmodified_scores(scores in arb_scores()) {
    for (class_id, score) in top_k(&scores, scores.len()) {
      prop_assert_eq!(scores[class_id], score);
    }
  }
}
