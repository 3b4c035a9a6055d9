//! Glucose history analyzer
//!
//! Looks back over recently completed plan workouts, picks the latest one per
//! category, and turns its glucose trend into a suggested fuel rate.

use chrono::{Duration, NaiveDate};
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::intervals::{Activity, ActivitySource, ActivityStream};
use crate::models::{AnalysisResult, AnalysisStatus, Category, CategoryAnalysis, GlucosePoint};
use crate::trend::{
  build_points, detect_glucose_unit, extract_fuel_rate, glucose_trend, suggest_fuel, to_mmol,
};

/// ---------------------------------------------------------------------------
/// Classification
/// ---------------------------------------------------------------------------

/// Maps an activity name to the workout family it belongs to
pub type Classifier = fn(&str) -> Category;

/// Substring rules over the lowercased name; long-run markers win
pub fn classify_name(name: &str) -> Category {
  let name = name.to_lowercase();
  let has = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

  if has(&["lr", "long"]) {
    Category::Long
  } else if has(&["tempo", "hills", "interval"]) {
    Category::Interval
  } else if has(&["easy", "bonus"]) {
    Category::Easy
  } else {
    Category::Other
  }
}

/// ---------------------------------------------------------------------------
/// Options
/// ---------------------------------------------------------------------------

/// Stream types that carry glucose, compared case-insensitively
pub const GLUCOSE_STREAM_ALIASES: [&str; 5] =
  ["bloodglucose", "glucose", "blood_glucose", "glucosevalue", "cgm"];

const TIME_STREAM: &str = "time";

#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
  pub lookback_days: i64,
  /// Stream fetches issued together
  pub batch_size: usize,
  /// Pause between batches
  pub batch_delay: std::time::Duration,
  pub classifier: Classifier,
}

impl Default for AnalyzerOptions {
  fn default() -> Self {
    Self {
      lookback_days: 45,
      batch_size: 3,
      batch_delay: std::time::Duration::from_millis(250),
      classifier: classify_name,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Selection
/// ---------------------------------------------------------------------------

/// Most recent activity per tracked category, newest first.
/// `Other` activities are never selected.
pub fn select_latest(mut activities: Vec<Activity>, classifier: Classifier) -> Vec<(Category, Activity)> {
  activities.sort_by(|a, b| b.start_date_local.cmp(&a.start_date_local));

  let mut selected: Vec<(Category, Activity)> = Vec::new();
  for activity in activities {
    let category = classifier(activity.display_name());
    if category == Category::Other || selected.iter().any(|(c, _)| *c == category) {
      continue;
    }
    selected.push((category, activity));
  }

  selected
}

fn find_stream<'a>(streams: &'a [ActivityStream], names: &[&str]) -> Option<&'a ActivityStream> {
  streams.iter().find(|s| {
    let kind = s.stream_type.to_lowercase();
    names.iter().any(|n| kind == *n)
  })
}

/// ---------------------------------------------------------------------------
/// Per-Activity Analysis
/// ---------------------------------------------------------------------------

/// Analyze one activity from whatever streams it has. Missing time or glucose
/// data yields a flat trend and leaves the fuel rate unchanged.
pub fn analyze_activity(activity: &Activity, streams: &[ActivityStream]) -> CategoryAnalysis {
  let current_fuel = extract_fuel_rate(activity.description.as_deref());

  let glucose = find_stream(streams, &GLUCOSE_STREAM_ALIASES).map(|s| s.values());
  let times = find_stream(streams, &[TIME_STREAM]).map(|s| s.values());

  let (points, unit): (Vec<GlucosePoint>, _) = match (times, glucose) {
    (Some(times), Some(glucose)) => {
      let present: Vec<f64> = glucose.iter().flatten().copied().collect();
      let unit = detect_glucose_unit(&present);
      let mmol: Vec<Option<f64>> = glucose.iter().map(|g| g.map(|v| to_mmol(v, unit))).collect();
      (build_points(&times, &mmol), Some(unit))
    }
    (None, Some(_)) => {
      debug!(activity_id = %activity.id, "Glucose stream without time axis");
      (Vec::new(), None)
    }
    _ => (Vec::new(), None),
  };

  let trend = glucose_trend(&points);

  CategoryAnalysis {
    activity_id: activity.id.clone(),
    activity_name: activity.display_name().to_string(),
    started_at: activity.start_date_local,
    trend,
    current_fuel,
    suggested_fuel: suggest_fuel(current_fuel, trend),
    unit,
    points,
  }
}

/// Fetch streams in batches; each fetch settles on its own and a failure
/// becomes an empty stream set for that activity
async fn fetch_streams_batched<S>(
  source: &S,
  selected: &[(Category, Activity)],
  options: &AnalyzerOptions,
) -> Vec<Vec<ActivityStream>>
where
  S: ActivitySource + ?Sized,
{
  let mut all = Vec::with_capacity(selected.len());

  for (index, batch) in selected.chunks(options.batch_size.max(1)).enumerate() {
    if index > 0 && !options.batch_delay.is_zero() {
      tokio::time::sleep(options.batch_delay).await;
    }

    let results = join_all(batch.iter().map(|(_, a)| source.fetch_streams(&a.id))).await;

    for ((category, activity), result) in batch.iter().zip(results) {
      match result {
        Ok(streams) => all.push(streams),
        Err(e) => {
          warn!(
            activity_id = %activity.id,
            category = category.as_str(),
            error = %e,
            "Stream fetch failed, analyzing without streams"
          );
          all.push(Vec::new());
        }
      }
    }
  }

  all
}

/// ---------------------------------------------------------------------------
/// History Analysis
/// ---------------------------------------------------------------------------

/// Analyze plan workouts from the lookback window ending at `today`.
///
/// Never fails: a failed activity listing is reported through
/// `AnalysisStatus::Failed` with every category left empty.
pub async fn analyze_history<S>(
  source: &S,
  prefix: &str,
  today: NaiveDate,
  options: &AnalyzerOptions,
) -> AnalysisResult
where
  S: ActivitySource + ?Sized,
{
  let oldest = today - Duration::days(options.lookback_days);

  let activities = match source.fetch_activities(oldest, today).await {
    Ok(activities) => activities,
    Err(e) => {
      warn!(error = %e, "Failed to fetch activity history");
      return AnalysisResult::empty(AnalysisStatus::Failed {
        reason: e.to_string(),
      });
    }
  };

  let needle = prefix.to_lowercase();
  let matching: Vec<Activity> = activities
    .into_iter()
    .filter(|a| a.display_name().to_lowercase().contains(&needle))
    .collect();

  if matching.is_empty() {
    info!(prefix, %oldest, %today, "No plan activities in lookback window");
    return AnalysisResult::empty(AnalysisStatus::NoActivities);
  }

  let selected = select_latest(matching, options.classifier);
  debug!(selected = selected.len(), "Selected latest activity per category");

  let streams = fetch_streams_batched(source, &selected, options).await;

  let mut result = AnalysisResult::empty(AnalysisStatus::Complete);
  for ((category, activity), streams) in selected.iter().zip(streams) {
    let analysis = analyze_activity(activity, &streams);
    info!(
      category = category.as_str(),
      activity = %analysis.activity_name,
      trend = analysis.trend,
      current = analysis.current_fuel,
      suggested = analysis.suggested_fuel,
      "Analyzed glucose response"
    );
    if let Some(slot) = result.slot_mut(*category) {
      *slot = Some(analysis);
    }
  }

  result
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use crate::models::GlucoseUnit;
  use crate::test_utils::{date, datetime, glucose_streams, mock_activity, MockSource};

  fn fast_options() -> AnalyzerOptions {
    AnalyzerOptions {
      batch_delay: std::time::Duration::ZERO,
      ..AnalyzerOptions::default()
    }
  }

  #[test]
  fn test_classify_name() {
    assert_eq!(classify_name("W03 Sun LR (12km) eco16"), Category::Long);
    assert_eq!(classify_name("Sunday long run"), Category::Long);
    assert_eq!(classify_name("W04 Tue Tempo eco16"), Category::Interval);
    assert_eq!(classify_name("W18 Tue Hills [SHAKEOUT] eco16"), Category::Interval);
    assert_eq!(classify_name("W04 Thu Easy eco16"), Category::Easy);
    assert_eq!(classify_name("W05 Sat Bonus Easy eco16"), Category::Easy);
    assert_eq!(classify_name("RACE DAY Eco Half (16km) eco16"), Category::Other);
    assert_eq!(classify_name(""), Category::Other);
  }

  #[test]
  fn test_select_latest_per_category() {
    let activities = vec![
      mock_activity("old-lr", "W02 Sun LR (9km) eco16", datetime(2026, 3, 1, 12), None),
      mock_activity("new-lr", "W03 Sun LR (9.5km) eco16", datetime(2026, 3, 8, 12), None),
      mock_activity("tempo", "W03 Tue Tempo eco16", datetime(2026, 3, 3, 12), None),
      mock_activity("race", "RACE DAY Eco Half (16km) eco16", datetime(2026, 3, 9, 10), None),
    ];

    let selected = select_latest(activities, classify_name);
    let ids: Vec<(Category, &str)> = selected.iter().map(|(c, a)| (*c, a.id.as_str())).collect();
    assert_eq!(ids, vec![(Category::Long, "new-lr"), (Category::Interval, "tempo")]);
  }

  #[test]
  fn test_custom_classifier() {
    fn everything_is_easy(_: &str) -> Category {
      Category::Easy
    }

    let activities = vec![
      mock_activity("a", "W01 Sun LR (8km) eco16", datetime(2026, 3, 1, 12), None),
      mock_activity("b", "W01 Tue Tempo eco16", datetime(2026, 2, 24, 12), None),
    ];
    let selected = select_latest(activities, everything_is_easy);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].0, Category::Easy);
    assert_eq!(selected[0].1.id, "a");
  }

  #[test]
  fn test_analyze_activity_crash() {
    let activity = mock_activity(
      "lr",
      "W03 Sun LR (9km) eco16",
      datetime(2026, 3, 8, 12),
      Some("Long run 9km\nFUEL PER 10: 10g | TOTAL: 68g"),
    );
    // 6 -> 1 mmol/L over an hour
    let analysis = analyze_activity(&activity, &glucose_streams("bloodglucose", 6.0, 1.0, 60, false));

    assert_eq!(analysis.unit, Some(GlucoseUnit::MmolPerL));
    assert_approx_eq!(analysis.trend, -5.0, 1e-9);
    assert_eq!(analysis.current_fuel, 10.0);
    assert_eq!(analysis.suggested_fuel, 12.0);
    assert_eq!(analysis.points.len(), 61);
    assert_eq!(analysis.points[60].minutes, 60.0);
  }

  #[test]
  fn test_analyze_activity_converts_mgdl() {
    let activity = mock_activity(
      "tempo",
      "W03 Tue Tempo eco16",
      datetime(2026, 3, 3, 12),
      Some("FUEL PER 10: 5g | TOTAL: 30g"),
    );
    // 6 -> 10 mmol/L recorded in mg/dL
    let analysis = analyze_activity(&activity, &glucose_streams("CGM", 6.0, 10.0, 60, true));

    assert_eq!(analysis.unit, Some(GlucoseUnit::MgPerDl));
    assert_approx_eq!(analysis.points[0].mmol, 6.0, 1e-6);
    assert_approx_eq!(analysis.trend, 4.0, 1e-6);
    assert_eq!(analysis.suggested_fuel, 4.0);
  }

  #[test]
  fn test_analyze_activity_without_streams() {
    let activity = mock_activity("easy", "W03 Thu Easy eco16", datetime(2026, 3, 5, 12), None);
    let analysis = analyze_activity(&activity, &[]);

    assert_eq!(analysis.trend, 0.0);
    assert_eq!(analysis.unit, None);
    assert!(analysis.points.is_empty());
    assert_eq!(analysis.current_fuel, 10.0);
    assert_eq!(analysis.suggested_fuel, 10.0);
    assert_eq!(analysis.fuel_delta(), 0.0);
  }

  #[test]
  fn test_unknown_stream_type_is_ignored() {
    let activity = mock_activity("easy", "W03 Thu Easy eco16", datetime(2026, 3, 5, 12), None);
    let analysis = analyze_activity(&activity, &glucose_streams("heartrate", 140.0, 90.0, 60, false));
    assert_eq!(analysis.unit, None);
    assert_eq!(analysis.trend, 0.0);
  }

  #[tokio::test]
  async fn test_analyze_history_end_to_end() {
    let source = MockSource::new(vec![
      mock_activity(
        "lr",
        "W03 Sun LR (9km) eco16",
        datetime(2026, 3, 8, 12),
        Some("FUEL PER 10: 10g | TOTAL: 68g"),
      ),
      mock_activity(
        "tempo",
        "W03 Tue Tempo eco16",
        datetime(2026, 3, 3, 12),
        Some("FUEL PER 10: 5g | TOTAL: 30g"),
      ),
      mock_activity("easy", "W03 Thu Easy ECO16", datetime(2026, 3, 5, 12), None),
      mock_activity("other", "Lunch run", datetime(2026, 3, 6, 12), None),
    ])
    .with_streams("lr", glucose_streams("bloodglucose", 6.0, 1.0, 60, false))
    .with_streams("tempo", glucose_streams("glucose", 6.0, 10.0, 60, true));

    let result = analyze_history(&source, "eco16", date(2026, 3, 10), &fast_options()).await;

    assert_eq!(result.status, AnalysisStatus::Complete);
    assert_eq!(result.long.as_ref().unwrap().suggested_fuel, 12.0);
    assert_eq!(result.interval.as_ref().unwrap().suggested_fuel, 4.0);
    let easy = result.easy.as_ref().unwrap();
    assert_eq!(easy.activity_id, "easy");
    assert_eq!(easy.suggested_fuel, 10.0);

    assert_eq!(
      *source.activity_window.lock().unwrap(),
      Some((date(2026, 1, 24), date(2026, 3, 10)))
    );
    let mut calls = source.stream_calls.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls, vec!["easy", "lr", "tempo"]);
  }

  #[tokio::test]
  async fn test_no_matching_activities() {
    let source = MockSource::new(vec![mock_activity(
      "x",
      "Lunch run",
      datetime(2026, 3, 6, 12),
      None,
    )]);

    let result = analyze_history(&source, "eco16", date(2026, 3, 10), &fast_options()).await;
    assert_eq!(result, AnalysisResult::empty(AnalysisStatus::NoActivities));
    assert!(source.stream_calls.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_listing_failure_is_reported_not_raised() {
    let source = MockSource::failing("upstream unavailable");

    let result = analyze_history(&source, "eco16", date(2026, 3, 10), &fast_options()).await;
    match &result.status {
      AnalysisStatus::Failed { reason } => assert!(reason.contains("upstream unavailable")),
      other => panic!("unexpected status {:?}", other),
    }
    assert!(!result.has_suggestions());
  }

  #[tokio::test]
  async fn test_stream_failure_degrades_single_category() {
    let source = MockSource::new(vec![
      mock_activity(
        "lr",
        "W03 Sun LR (9km) eco16",
        datetime(2026, 3, 8, 12),
        Some("FUEL PER 10: 11g"),
      ),
      mock_activity("tempo", "W03 Tue Tempo eco16", datetime(2026, 3, 3, 12), None),
    ])
    .with_failing_streams("lr")
    .with_streams("tempo", glucose_streams("bloodglucose", 6.0, 1.0, 60, false));

    let result = analyze_history(&source, "eco16", date(2026, 3, 10), &fast_options()).await;

    assert_eq!(result.status, AnalysisStatus::Complete);
    let long = result.long.as_ref().unwrap();
    assert_eq!(long.trend, 0.0);
    assert_eq!(long.suggested_fuel, 11.0);
    assert_eq!(result.interval.as_ref().unwrap().suggested_fuel, 12.0);
  }

  #[tokio::test]
  async fn test_batches_cover_every_selected_activity() {
    let source = MockSource::new(vec![
      mock_activity("lr", "W03 Sun LR (9km) eco16", datetime(2026, 3, 8, 12), None),
      mock_activity("tempo", "W03 Tue Tempo eco16", datetime(2026, 3, 3, 12), None),
      mock_activity("easy", "W03 Thu Easy eco16", datetime(2026, 3, 5, 12), None),
    ]);

    let options = AnalyzerOptions {
      batch_size: 1,
      batch_delay: std::time::Duration::from_millis(1),
      ..AnalyzerOptions::default()
    };
    let result = analyze_history(&source, "eco16", date(2026, 3, 10), &options).await;

    // Newest first, one per batch
    assert_eq!(*source.stream_calls.lock().unwrap(), vec!["lr", "easy", "tempo"]);
    assert!(result.long.is_some() && result.interval.is_some() && result.easy.is_some());
  }
}
