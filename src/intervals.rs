use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::IntervalsConfig;
use crate::models::WorkoutEvent;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const API_KEY_USER: &str = "API_KEY";
const WORKOUT_CATEGORY: &str = "WORKOUT";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IntervalsError {
  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Intervals.icu returned {status}: {body}")]
  Api { status: u16, body: String },

  #[error("Failed to parse response: {0}")]
  Parse(String),

  #[error("Invalid URL: {0}")]
  Url(String),
}

/// ---------------------------------------------------------------------------
/// API Data Structures
/// ---------------------------------------------------------------------------

/// Activity summary from the athlete activity list
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Activity {
  pub id: String,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  pub start_date_local: NaiveDateTime,
  #[serde(rename = "type", default)]
  pub activity_type: Option<String>,
  #[serde(default)]
  pub distance: Option<f64>,
  #[serde(default)]
  pub moving_time: Option<i64>,
  #[serde(default)]
  pub average_heartrate: Option<f64>,
  #[serde(default)]
  pub average_cadence: Option<f64>,
  #[serde(default)]
  pub icu_training_load: Option<f64>,
  #[serde(default)]
  pub icu_intensity: Option<f64>,
}

impl Activity {
  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or("")
  }
}

/// One named time series of an activity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivityStream {
  #[serde(rename = "type")]
  pub stream_type: String,
  #[serde(default)]
  pub data: Vec<serde_json::Value>,
}

impl ActivityStream {
  /// Numeric samples; nulls and non-numbers become `None` so indices stay aligned
  pub fn values(&self) -> Vec<Option<f64>> {
    self.data.iter().map(|v| v.as_f64()).collect()
  }
}

/// Calendar event body accepted by the bulk endpoint
#[derive(Debug, Serialize)]
pub struct EventPayload<'a> {
  pub category: &'static str,
  pub start_date_local: String,
  pub name: &'a str,
  pub description: &'a str,
  pub external_id: &'a str,
  #[serde(rename = "type")]
  pub sport: &'a str,
}

impl<'a> From<&'a WorkoutEvent> for EventPayload<'a> {
  fn from(event: &'a WorkoutEvent) -> Self {
    Self {
      category: WORKOUT_CATEGORY,
      start_date_local: event.start_date_local.format(DATE_TIME_FORMAT).to_string(),
      name: &event.name,
      description: &event.description,
      external_id: &event.external_id,
      sport: &event.sport,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Activity Source
/// ---------------------------------------------------------------------------

/// Where the history analyzer gets its data from
#[async_trait]
pub trait ActivitySource: Send + Sync {
  async fn fetch_activities(
    &self,
    oldest: NaiveDate,
    newest: NaiveDate,
  ) -> Result<Vec<Activity>, IntervalsError>;

  async fn fetch_streams(&self, activity_id: &str) -> Result<Vec<ActivityStream>, IntervalsError>;
}

/// ---------------------------------------------------------------------------
/// Intervals.icu Client
/// ---------------------------------------------------------------------------

pub struct IntervalsClient {
  client: Client,
  config: IntervalsConfig,
}

impl IntervalsClient {
  pub fn new(config: IntervalsConfig) -> Self {
    Self {
      client: Client::new(),
      config,
    }
  }

  fn endpoint(&self, path: &str) -> Result<Url, IntervalsError> {
    Url::parse(&format!("{}{}", self.config.base_url, path))
      .map_err(|e| IntervalsError::Url(e.to_string()))
  }

  fn athlete_endpoint(&self, path: &str) -> Result<Url, IntervalsError> {
    self.endpoint(&format!("/api/v1/athlete/{}{}", self.config.athlete_id, path))
  }

  /// Pass 2xx responses through, turn anything else into `Api` with the body verbatim
  async fn check(response: Response) -> Result<Response, IntervalsError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(IntervalsError::Api {
      status: status.as_u16(),
      body,
    })
  }

  /// Delete planned workouts in a date range
  pub async fn delete_workouts(&self, oldest: NaiveDate, newest: NaiveDate) -> Result<(), IntervalsError> {
    let mut url = self.athlete_endpoint("/events")?;
    url
      .query_pairs_mut()
      .append_pair("oldest", &oldest.to_string())
      .append_pair("newest", &newest.to_string())
      .append_pair("category", WORKOUT_CATEGORY);

    let response = self
      .client
      .delete(url)
      .basic_auth(API_KEY_USER, Some(&self.config.api_key))
      .send()
      .await?;

    Self::check(response).await?;
    debug!(%oldest, %newest, "Deleted planned workouts");
    Ok(())
  }

  /// Insert or update events keyed by `external_id`; returns how many the service accepted
  pub async fn upsert_events(&self, events: &[WorkoutEvent]) -> Result<usize, IntervalsError> {
    let mut url = self.athlete_endpoint("/events/bulk")?;
    url.query_pairs_mut().append_pair("upsert", "true");

    let payload: Vec<EventPayload> = events.iter().map(EventPayload::from).collect();

    let response = self
      .client
      .post(url)
      .basic_auth(API_KEY_USER, Some(&self.config.api_key))
      .json(&payload)
      .send()
      .await?;

    let body = Self::check(response).await?.text().await?;

    match serde_json::from_str::<Vec<serde_json::Value>>(&body) {
      Ok(saved) => Ok(saved.len()),
      Err(e) => {
        debug!(error = %e, "Bulk response was not an event list, counting submitted events");
        Ok(events.len())
      }
    }
  }

  /// Replace the future calendar with a freshly generated plan.
  ///
  /// Workouts from `today` through the last event date are deleted first; a
  /// failed delete is logged and the upsert still runs since ids are stable.
  pub async fn upload_plan(&self, events: &[WorkoutEvent], today: NaiveDate) -> Result<usize, IntervalsError> {
    let Some(last) = events.iter().map(|e| e.start_date_local.date()).max() else {
      warn!("No events to upload, leaving calendar untouched");
      return Ok(0);
    };

    if last < today {
      debug!(%last, %today, "All events in the past, skipping delete");
    } else if let Err(e) = self.delete_workouts(today, last).await {
      warn!(error = %e, "Failed to clear future workouts before upload");
    }

    let count = self.upsert_events(events).await?;
    info!(submitted = events.len(), saved = count, "Uploaded plan");
    Ok(count)
  }
}

#[async_trait]
impl ActivitySource for IntervalsClient {
  async fn fetch_activities(
    &self,
    oldest: NaiveDate,
    newest: NaiveDate,
  ) -> Result<Vec<Activity>, IntervalsError> {
    let mut url = self.athlete_endpoint("/activities")?;
    url
      .query_pairs_mut()
      .append_pair("oldest", &oldest.to_string())
      .append_pair("newest", &newest.to_string());

    let response = self
      .client
      .get(url)
      .basic_auth(API_KEY_USER, Some(&self.config.api_key))
      .send()
      .await?;

    let response_text = Self::check(response).await?.text().await?;

    let activities: Vec<Activity> = serde_json::from_str(&response_text).map_err(|e| {
      warn!(
        error = %e,
        raw = %response_text.chars().take(500).collect::<String>(),
        "Failed to parse activities response"
      );
      IntervalsError::Parse(format!("Failed to parse activities: {}", e))
    })?;

    debug!(count = activities.len(), %oldest, %newest, "Fetched activities");
    Ok(activities)
  }

  async fn fetch_streams(&self, activity_id: &str) -> Result<Vec<ActivityStream>, IntervalsError> {
    let url = self.endpoint(&format!("/api/v1/activity/{}/streams", activity_id))?;

    let response = self
      .client
      .get(url)
      .basic_auth(API_KEY_USER, Some(&self.config.api_key))
      .send()
      .await?;

    // 404 means the activity has no recorded streams (manual entry)
    if response.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(vec![]);
    }

    let response_text = Self::check(response).await?.text().await?;

    serde_json::from_str(&response_text)
      .map_err(|e| IntervalsError::Parse(format!("Failed to parse streams: {}", e)))
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
