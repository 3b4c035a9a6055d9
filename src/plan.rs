//! Periodized Plan Generator
//!
//! Turns a `RaceConfig` into a dated list of structured workouts:
//! - Tuesday quality session (tempo and hills alternate week to week)
//! - Thursday easy run that grows with plan progress
//! - Saturday optional bonus easy run
//! - Sunday long run ramping from `start_km` to race distance
//!
//! Key principles:
//! - Pure: `today` is injected, identical inputs give identical output
//! - Every event id is stable per slot, so re-uploads overwrite
//! - Nothing is scheduled on or after race day except the race itself

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::RaceConfig;
use crate::models::{SessionKind, WorkoutEvent, SPORT_RUN};
use crate::zones::{HrZoneModel, Zone};

const WARMUP_MINUTES: f64 = 10.0;
const COOLDOWN_MINUTES: f64 = 5.0;
const TRAINING_START_HOUR: i64 = 12;
const RACE_START_HOUR: i64 = 10;

// ---------------------------------------------------------------------------
/// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Invalid race date '{input}': {source}")]
    InvalidRaceDate {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid race config: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
/// Week Phase: where a week sits in the periodization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekPhase {
    /// Normal progressive week
    Build,
    /// Every 4th week, long run drops back to the starting distance
    Recovery,
    /// The two weeks before the taper, long run at full race distance
    RaceTest,
    /// Second-to-last week, long run at half race distance
    Taper,
    /// Final week, Sunday slot becomes the race
    Race,
}

impl WeekPhase {
    /// Phase for a 0-based week index. Later phases take precedence.
    pub fn for_week(week_index: u32, total_weeks: u32) -> Self {
        let index = week_index as i64;
        let total = total_weeks as i64;

        if index == total - 1 {
            Self::Race
        } else if index == total - 2 {
            Self::Taper
        } else if index == total - 3 || index == total - 4 {
            Self::RaceTest
        } else if (week_index + 1) % 4 == 0 {
            Self::Recovery
        } else {
            Self::Build
        }
    }

    /// Tag appended to the long-run name
    pub fn long_run_tag(&self) -> Option<&'static str> {
        match self {
            Self::Recovery => Some("[RECOVERY]"),
            Self::RaceTest => Some("[RACE TEST]"),
            Self::Taper => Some("[TAPER]"),
            Self::Build | Self::Race => None,
        }
    }
}

impl std::fmt::Display for WeekPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Recovery => write!(f, "recovery"),
            Self::RaceTest => write!(f, "race_test"),
            Self::Taper => write!(f, "taper"),
            Self::Race => write!(f, "race"),
        }
    }
}

// ---------------------------------------------------------------------------
/// Workout Structure: warmup, repeated main set, cooldown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepLength {
    Minutes(f64),
    Km(f64),
}

impl StepLength {
    /// Duration estimate; distance blocks use the zone's expected pace
    pub fn minutes(&self, zone: Zone) -> f64 {
        match self {
            StepLength::Minutes(m) => *m,
            StepLength::Km(km) => km * zone.pace_min_per_km(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            StepLength::Minutes(m) => format!("{}m", m),
            StepLength::Km(km) => format!("{}km", format_km(*km)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub length: StepLength,
    pub zone: Zone,
    pub note: Option<String>,
}

impl Step {
    fn new(length: StepLength, zone: Zone) -> Self {
        Self {
            length,
            zone,
            note: None,
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    fn render(&self, zones: &HrZoneModel, lthr: u32) -> String {
        zones.step(&self.length.label(), self.zone, lthr, self.note.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutStructure {
    pub title: String,
    pub warmup: Step,
    pub repeats: u32,
    pub main: Vec<Step>,
    pub cooldown: Step,
}

impl WorkoutStructure {
    /// Standard shape: 10m easy warmup carrying the fuel note, 5m easy cooldown
    fn standard(title: String, fuel_rate: f64, repeats: u32, main: Vec<Step>) -> Self {
        Self {
            title,
            warmup: Step::new(StepLength::Minutes(WARMUP_MINUTES), Zone::Easy)
                .with_note(fuel_note(fuel_rate)),
            repeats,
            main,
            cooldown: Step::new(StepLength::Minutes(COOLDOWN_MINUTES), Zone::Easy),
        }
    }

    pub fn estimated_minutes(&self) -> f64 {
        let main: f64 = self.main.iter().map(|s| s.length.minutes(s.zone)).sum();
        self.warmup.length.minutes(self.warmup.zone)
            + main * self.repeats as f64
            + self.cooldown.length.minutes(self.cooldown.zone)
    }

    /// Intervals.icu workout text
    pub fn render(&self, zones: &HrZoneModel, lthr: u32, fuel_rate: f64, total_carbs: u32) -> String {
        let mut lines = vec![
            self.title.clone(),
            format!("{} | TOTAL: {}g", fuel_note(fuel_rate), total_carbs),
            String::new(),
            "Warmup".to_string(),
            format!("- {}", self.warmup.render(zones, lthr)),
            String::new(),
        ];

        if self.repeats > 1 {
            lines.push(format!("Main set {}x", self.repeats));
        } else {
            lines.push("Main set".to_string());
        }
        for step in &self.main {
            lines.push(format!("- {}", step.render(zones, lthr)));
        }

        lines.push(String::new());
        lines.push("Cooldown".to_string());
        lines.push(format!("- {}", self.cooldown.render(zones, lthr)));

        lines.join("\n")
    }
}

/// `FUEL PER 10: <N>g`, the token the history analyzer reads back
pub fn fuel_note(fuel_rate: f64) -> String {
    format!("FUEL PER 10: {}g", fuel_rate)
}

pub fn total_carbs(estimated_minutes: f64, fuel_rate: f64) -> u32 {
    (estimated_minutes / 10.0 * fuel_rate).round().max(0.0) as u32
}

fn format_km(km: f64) -> String {
    if (km - km.round()).abs() < 1e-9 {
        format!("{:.0}", km)
    } else {
        format!("{:.1}", km)
    }
}

fn round_tenth(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
/// Weekly Slots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Tue,
    Thu,
    Sat,
    Sun,
}

impl Slot {
    fn day_offset(&self) -> i64 {
        match self {
            Slot::Tue => 1,
            Slot::Thu => 3,
            Slot::Sat => 5,
            Slot::Sun => 6,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Slot::Tue => "Tue",
            Slot::Thu => "Thu",
            Slot::Sat => "Sat",
            Slot::Sun => "Sun",
        }
    }

    fn id_tag(&self) -> &'static str {
        match self {
            Slot::Tue => "tue",
            Slot::Thu => "thu",
            Slot::Sat => "sat",
            Slot::Sun => "sun",
        }
    }
}

/// Per-week values shared by every session builder
#[derive(Debug, Clone, Copy)]
struct WeekContext {
    index: u32,
    number: u32,
    phase: WeekPhase,
    /// 0.0 on the first week, 1.0 on the last
    progress: f64,
    start: NaiveDate,
}

/// A session before it is stamped with date, name and id
struct Session {
    kind: SessionKind,
    label: String,
    tags: Vec<&'static str>,
    structure: WorkoutStructure,
    fuel_rate: f64,
    distance_km: Option<f64>,
}

// ---------------------------------------------------------------------------
/// Session Builders
// ---------------------------------------------------------------------------

fn quality_session(config: &RaceConfig, week: &WeekContext) -> Session {
    let fuel_rate = config.fuel_interval;
    let race_week = week.phase == WeekPhase::Race;
    let tags = if race_week { vec!["[SHAKEOUT]"] } else { vec![] };

    if week.index % 2 == 0 {
        let (reps, tempo_minutes) = match week.phase {
            WeekPhase::Race => (2, 5.0),
            WeekPhase::RaceTest | WeekPhase::Taper => (3, 8.0),
            WeekPhase::Build | WeekPhase::Recovery => (3 + (week.progress * 3.0).floor() as u32, 8.0),
        };
        let main = vec![
            Step::new(StepLength::Minutes(tempo_minutes), Zone::Tempo),
            Step::new(StepLength::Minutes(2.0), Zone::Easy),
        ];
        Session {
            kind: SessionKind::Tempo,
            label: "Tempo".to_string(),
            tags,
            structure: WorkoutStructure::standard(
                format!("Tempo {}x{}m", reps, tempo_minutes),
                fuel_rate,
                reps,
                main,
            ),
            fuel_rate,
            distance_km: None,
        }
    } else {
        let reps = match week.phase {
            WeekPhase::Race => 2,
            WeekPhase::RaceTest | WeekPhase::Taper => 4,
            WeekPhase::Build | WeekPhase::Recovery => 6,
        };
        let main = vec![
            Step::new(StepLength::Minutes(2.0), Zone::Hard).with_note("Uphill"),
            Step::new(StepLength::Minutes(3.0), Zone::Easy).with_note("Downhill"),
        ];
        Session {
            kind: SessionKind::Hills,
            label: "Hills".to_string(),
            tags,
            structure: WorkoutStructure::standard(format!("Hills {}x2m", reps), fuel_rate, reps, main),
            fuel_rate,
            distance_km: None,
        }
    }
}

fn easy_session(config: &RaceConfig, week: &WeekContext) -> Session {
    let fuel_rate = config.effective_fuel_easy();
    let (minutes, tags) = match week.phase {
        WeekPhase::Race => (20.0, vec!["[SHAKEOUT]"]),
        WeekPhase::RaceTest => (30.0, vec![]),
        _ => ((40.0 + 20.0 * week.progress).round(), vec![]),
    };

    Session {
        kind: SessionKind::Easy,
        label: "Easy".to_string(),
        tags,
        structure: WorkoutStructure::standard(
            format!("Easy {}m", minutes),
            fuel_rate,
            1,
            vec![Step::new(StepLength::Minutes(minutes), Zone::Easy)],
        ),
        fuel_rate,
        distance_km: None,
    }
}

fn bonus_session(config: &RaceConfig) -> Session {
    let fuel_rate = config.effective_fuel_easy();

    Session {
        kind: SessionKind::Bonus,
        label: "Bonus Easy".to_string(),
        tags: vec![],
        structure: WorkoutStructure::standard(
            "Bonus easy 30m (optional)".to_string(),
            fuel_rate,
            1,
            vec![Step::new(StepLength::Minutes(30.0), Zone::Easy)],
        ),
        fuel_rate,
        distance_km: None,
    }
}

/// Long-run distance for a week; overrides win over the linear ramp
pub fn long_run_km(config: &RaceConfig, week_index: u32) -> f64 {
    let race_km = config.race_distance_km;
    match WeekPhase::for_week(week_index, config.total_weeks) {
        WeekPhase::Recovery => round_tenth(config.start_km),
        WeekPhase::RaceTest => round_tenth(race_km),
        WeekPhase::Taper => round_tenth(race_km * 0.5),
        WeekPhase::Build | WeekPhase::Race => {
            let divisor = (config.total_weeks as i64 - 4).max(1) as f64;
            let ramp = config.start_km + (race_km - config.start_km) * week_index as f64 / divisor;
            round_tenth(ramp.min(race_km))
        }
    }
}

fn long_run_session(config: &RaceConfig, week: &WeekContext) -> Session {
    let fuel_rate = config.fuel_long;
    let km = long_run_km(config, week.index);

    Session {
        kind: SessionKind::LongRun,
        label: format!("LR ({}km)", format_km(km)),
        tags: week.phase.long_run_tag().into_iter().collect(),
        structure: WorkoutStructure::standard(
            format!("Long run {}km", format_km(km)),
            fuel_rate,
            1,
            vec![Step::new(StepLength::Km(km), Zone::Steady)],
        ),
        fuel_rate,
        distance_km: Some(km),
    }
}

fn race_day_event(config: &RaceConfig, race_date: NaiveDate, week_number: u32) -> WorkoutEvent {
    let fuel_rate = config.fuel_long;
    let km = config.race_distance_km;
    let structure = WorkoutStructure::standard(
        format!("RACE DAY: {} {}km", config.race_name, format_km(km)),
        fuel_rate,
        1,
        vec![Step::new(StepLength::Km(km), Zone::Steady).with_note("Race")],
    );
    let estimated_minutes = structure.estimated_minutes();
    let carbs = total_carbs(estimated_minutes, fuel_rate);

    WorkoutEvent {
        start_date_local: at_hour(race_date, RACE_START_HOUR),
        name: format!("RACE DAY {} ({}km) {}", config.race_name, format_km(km), config.prefix),
        description: structure.render(&config.zones, config.lthr, fuel_rate, carbs),
        external_id: format!("{}-race", config.prefix),
        sport: SPORT_RUN.to_string(),
        kind: SessionKind::Race,
        week: week_number,
        fuel_rate,
        distance_km: Some(km),
        estimated_minutes,
        total_carbs_g: carbs,
    }
}

fn stamp(config: &RaceConfig, week: &WeekContext, slot: Slot, date: NaiveDate, session: Session) -> WorkoutEvent {
    let estimated_minutes = session.structure.estimated_minutes();
    let carbs = total_carbs(estimated_minutes, session.fuel_rate);

    let mut name = format!("W{:02} {} {}", week.number, slot.label(), session.label);
    for tag in &session.tags {
        name.push(' ');
        name.push_str(tag);
    }
    name.push(' ');
    name.push_str(&config.prefix);

    WorkoutEvent {
        start_date_local: at_hour(date, TRAINING_START_HOUR),
        name,
        description: session
            .structure
            .render(&config.zones, config.lthr, session.fuel_rate, carbs),
        external_id: format!("{}-{}-{}", config.prefix, slot.id_tag(), week.number),
        sport: SPORT_RUN.to_string(),
        kind: session.kind,
        week: week.number,
        fuel_rate: session.fuel_rate,
        distance_km: session.distance_km,
        estimated_minutes,
        total_carbs_g: carbs,
    }
}

fn at_hour(date: NaiveDate, hour: i64) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(hour)
}

// ---------------------------------------------------------------------------
/// Plan Generation
// ---------------------------------------------------------------------------

/// Monday of the race week, shifted back to the first plan week.
/// `None` when the start falls outside the representable calendar.
pub fn plan_start_monday(race_date: NaiveDate, total_weeks: u32) -> Option<NaiveDate> {
    race_date
        .checked_sub_signed(Duration::days(race_date.weekday().num_days_from_monday() as i64))?
        .checked_sub_signed(Duration::weeks(total_weeks.saturating_sub(1) as i64))
}

/// Generate every remaining workout of the plan relative to `today`.
///
/// Weeks that ended before `today` are skipped entirely; inside the current
/// week only sessions dated `today` or later are emitted. Sessions on or after
/// the race date are dropped, and the final week's Sunday slot is replaced by
/// the race-day event.
pub fn generate_plan(config: &RaceConfig, today: NaiveDate) -> Result<Vec<WorkoutEvent>, PlanError> {
    config.validate().map_err(PlanError::InvalidConfig)?;
    let race_date = config
        .parse_race_date()
        .map_err(|source| PlanError::InvalidRaceDate {
            input: config.race_date.clone(),
            source,
        })?;

    let plan_start = plan_start_monday(race_date, config.total_weeks).ok_or_else(|| {
        PlanError::InvalidConfig(format!(
            "total_weeks {} reaches before the earliest supported date",
            config.total_weeks
        ))
    })?;
    let progress_divisor = config.total_weeks.saturating_sub(1).max(1) as f64;
    let mut events = Vec::new();

    for index in 0..config.total_weeks {
        let start = plan_start + Duration::weeks(index as i64);
        let week = WeekContext {
            index,
            number: index + 1,
            phase: WeekPhase::for_week(index, config.total_weeks),
            progress: index as f64 / progress_divisor,
            start,
        };

        if week.start + Duration::days(7) < today {
            debug!(week = week.number, "Skipping elapsed week");
            continue;
        }

        let is_open = |date: NaiveDate| date >= today && date < race_date;

        for slot in [Slot::Tue, Slot::Thu, Slot::Sat] {
            let date = week.start + Duration::days(slot.day_offset());
            if !is_open(date) {
                continue;
            }
            let session = match slot {
                Slot::Tue => quality_session(config, &week),
                Slot::Thu => easy_session(config, &week),
                _ => bonus_session(config),
            };
            events.push(stamp(config, &week, slot, date, session));
        }

        if week.phase == WeekPhase::Race {
            // Exempt from the race-date gate, not from the past
            if race_date >= today {
                events.push(race_day_event(config, race_date, week.number));
            }
        } else {
            let date = week.start + Duration::days(Slot::Sun.day_offset());
            if is_open(date) {
                let session = long_run_session(config, &week);
                events.push(stamp(config, &week, Slot::Sun, date, session));
            }
        }
    }

    info!(
        prefix = %config.prefix,
        race_date = %race_date,
        events = events.len(),
        "Generated training plan"
    );

    Ok(events)
}

// ---------------------------------------------------------------------------
/// Plan Summary: compact per-week view for previews
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    pub week: u32,
    pub sessions: usize,
    pub long_run_km: Option<f64>,
    pub total_minutes: f64,
    pub total_carbs_g: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub weeks: Vec<WeekSummary>,
    pub total_sessions: usize,
    pub total_carbs_g: u32,
}

impl PlanSummary {
    pub fn from_events(events: &[WorkoutEvent]) -> Self {
        let mut by_week: BTreeMap<u32, WeekSummary> = BTreeMap::new();

        for event in events {
            let entry = by_week.entry(event.week).or_insert_with(|| WeekSummary {
                week: event.week,
                sessions: 0,
                long_run_km: None,
                total_minutes: 0.0,
                total_carbs_g: 0,
            });
            entry.sessions += 1;
            entry.total_minutes += event.estimated_minutes;
            entry.total_carbs_g += event.total_carbs_g;
            if matches!(event.kind, SessionKind::LongRun | SessionKind::Race) {
                entry.long_run_km = event.distance_km;
            }
        }

        let weeks: Vec<WeekSummary> = by_week.into_values().collect();
        Self {
            total_sessions: events.len(),
            total_carbs_g: weeks.iter().map(|w| w.total_carbs_g).sum(),
            weeks,
        }
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
