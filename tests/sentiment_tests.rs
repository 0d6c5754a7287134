use dip_buyer::error::SourceError;
use dip_buyer::sentiment::{
    extract_score_from_cnn_json, extract_score_from_html, NoSentiment, SentimentSource,
};

const PAGE: &str = r#"
<html>
  <body>
    <div class="market-fng-gauge">
      <span class="market-fng-gauge__label">Fear &amp; Greed Index</span>
      <span class="market-fng-gauge__dial-number-value">38</span>
    </div>
    <div id="needle">Now: <b>72.5</b> (Greed)</div>
    <div id="blank">0</div>
    <div id="word">Extreme Fear</div>
  </body>
</html>
"#;

#[test]
fn extracts_score_by_class() {
    let score =
        extract_score_from_html(PAGE, ".market-fng-gauge__dial-number-value").unwrap();
    assert!((score - 38.0).abs() < f64::EPSILON);
}

#[test]
fn extracts_score_by_id_with_surrounding_text() {
    let score = extract_score_from_html(PAGE, "#needle").unwrap();
    assert!((score - 72.5).abs() < f64::EPSILON);
}

#[test]
fn zero_is_not_a_score() {
    let err = extract_score_from_html(PAGE, "#blank").unwrap_err();
    assert!(err.is_unavailable());
}

/// A negative reading keeps its sign and is rejected, never flipped positive.
#[test]
fn negative_value_is_not_a_score() {
    let err = extract_score_from_html(r#"<div id="x">-40</div>"#, "#x").unwrap_err();
    assert!(err.is_unavailable());
}

#[test]
fn selector_miss_is_parse_failure() {
    assert!(matches!(
        extract_score_from_html(PAGE, ".redesigned-gauge"),
        Err(SourceError::Parse(_))
    ));
}

#[test]
fn element_without_number_is_parse_failure() {
    assert!(matches!(
        extract_score_from_html(PAGE, "#word"),
        Err(SourceError::Parse(_))
    ));
}

#[test]
fn cnn_graph_score() {
    let body = r#"{"fear_and_greed":{"score":27.4857142857143,"rating":"fear","timestamp":"2025-03-04T23:59:57+00:00","previous_close":33.2},"fear_and_greed_historical":{"data":[]}}"#;
    let score = extract_score_from_cnn_json(body).unwrap();
    assert!((score - 27.4857142857143).abs() < 1e-12);
}

#[test]
fn cnn_graph_zero_is_unavailable() {
    let body = r#"{"fear_and_greed":{"score":0,"rating":"extreme fear"}}"#;
    assert!(extract_score_from_cnn_json(body).unwrap_err().is_unavailable());
}

#[test]
fn cnn_graph_missing_field_is_parse_failure() {
    assert!(matches!(
        extract_score_from_cnn_json(r#"{"fear_and_greed":{}}"#),
        Err(SourceError::Parse(_))
    ));
    assert!(matches!(
        extract_score_from_cnn_json("<html>blocked</html>"),
        Err(SourceError::Parse(_))
    ));
}

#[tokio::test]
async fn disabled_provider_is_unavailable() {
    let err = NoSentiment.get_sentiment_score().await.unwrap_err();
    assert!(err.is_unavailable());
    assert_eq!(NoSentiment.name(), "none");
}
