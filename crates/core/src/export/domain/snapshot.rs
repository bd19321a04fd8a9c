/// File name of an identity's snapshot, e.g. `face_7_confidence_0.93.jpg`.
pub fn snapshot_file_name(track_id: u32, confidence: f64) -> String {
    format!("face_{track_id}_confidence_{confidence:.2}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(7, 0.93, "face_7_confidence_0.93.jpg")]
    #[case(12, 0.917, "face_12_confidence_0.92.jpg")]
    #[case(1, 1.0, "face_1_confidence_1.00.jpg")]
    #[case(3, 0.6, "face_3_confidence_0.60.jpg")]
    fn test_snapshot_file_name(#[case] id: u32, #[case] confidence: f64, #[case] expected: &str) {
        assert_eq!(snapshot_file_name(id, confidence), expected);
    }
}
