//! Static routing table.
//!
//! Each [`Operation`] maps to one HTTP method, one path template and the
//! parameter schema the validator enforces before anything is sent.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the payload an operation returns; selects the formatter field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Activity,
    Interval,
    Stream,
    Event,
    Wellness,
    Curve,
    Folder,
    Workout,
    Message,
    Weather,
    Generic,
}

/// Where a validated parameter ends up in the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Path,
    Query,
    /// A field of the JSON body object
    Body,
    /// The whole JSON body (e.g. a bulk array)
    BodyRoot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Positive integer or external identifier string (e.g. `i12345`)
    Id,
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`; sent as a local date-time
    DateTime,
    /// Member of a known set; unknown values pass with a warning
    Enum(&'static [&'static str]),
    /// Comma-separated list of [`ParamKind::Enum`] members
    EnumList(&'static [&'static str]),
    Int { min: i64, max: i64 },
    Number { min: f64, max: f64 },
    Bool,
    Text { max_len: usize },
    /// Structured JSON passed through untouched
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Name used by tool callers
    pub name: &'static str,
    /// Name used by the remote service
    pub api_name: &'static str,
    pub kind: ParamKind,
    pub location: Location,
    pub required: bool,
}

impl ParamSpec {
    const fn new(name: &'static str, api_name: &'static str, kind: ParamKind, location: Location) -> Self {
        Self {
            name,
            api_name,
            kind,
            location,
            required: false,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

const fn path(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec::new(name, name, kind, Location::Path).required()
}

const fn query(name: &'static str, api_name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec::new(name, api_name, kind, Location::Query)
}

const fn body(name: &'static str, api_name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec::new(name, api_name, kind, Location::Body)
}

pub const SPORT_TYPES: &[&str] = &[
    "Ride", "Run", "Swim", "WeightTraining", "Hike", "Walk", "AlpineSki", "BackcountrySki",
    "Canoeing", "Crossfit", "EBikeRide", "EMountainBikeRide", "Elliptical", "GravelRide",
    "Handcycle", "HighIntensityIntervalTraining", "IceSkate", "InlineSkate", "Kayaking",
    "MountainBikeRide", "NordicSki", "OpenWaterSwim", "Pilates", "RockClimbing", "RollerSki",
    "Rowing", "Snowshoe", "StairStepper", "StandUpPaddling", "TrackRide", "TrailRun",
    "Transition", "VirtualRide", "VirtualRow", "VirtualRun", "Wheelchair", "Workout", "Yoga",
    "Other",
];

pub const EVENT_CATEGORIES: &[&str] = &[
    "WORKOUT", "RACE_A", "RACE_B", "RACE_C", "NOTE", "PLAN", "HOLIDAY", "SICK", "INJURED",
    "SET_EFTP", "FITNESS_DAYS", "SEASON_START", "TARGET", "SET_FITNESS",
];

pub const EVENT_SUB_TYPES: &[&str] = &["NONE", "COMMUTE", "WARMUP", "COOLDOWN", "RACE"];

pub const STREAM_TYPES: &[&str] = &[
    "time", "watts", "heartrate", "cadence", "altitude", "distance", "core_temperature",
    "skin_temperature", "velocity_smooth", "latlng", "temp", "grade_smooth", "moving",
    "fixed_watts", "respiration", "smo2", "thb",
];

const ATHLETE: ParamSpec = path("athlete_id", ParamKind::Id);
const ACTIVITY: ParamSpec = path("activity_id", ParamKind::Id);
const EVENT: ParamSpec = path("event_id", ParamKind::Id);
const LIMIT: ParamSpec = query("limit", "limit", ParamKind::Int { min: 1, max: 1_000 });
const OLDEST: ParamSpec = query("start_date", "oldest", ParamKind::Date).required();
const NEWEST: ParamSpec = query("end_date", "newest", ParamKind::Date).required();
const CURVE_TYPE: ParamSpec = query("activity_type", "type", ParamKind::Enum(SPORT_TYPES));
const SCORE: ParamKind = ParamKind::Int { min: 1, max: 5 };
const COUNT: ParamKind = ParamKind::Int { min: 0, max: i64::MAX };
const SHORT_TEXT: ParamKind = ParamKind::Text { max_len: 256 };
const LONG_TEXT: ParamKind = ParamKind::Text { max_len: 20_000 };

const GET_ACTIVITIES: &[ParamSpec] = &[
    ATHLETE,
    OLDEST,
    NEWEST,
    LIMIT,
    query("fields", "fields", SHORT_TEXT),
];

const SEARCH_ACTIVITIES: &[ParamSpec] = &[
    ATHLETE,
    query("query", "q", SHORT_TEXT).required(),
    LIMIT,
];

const ACTIVITY_ONLY: &[ParamSpec] = &[ACTIVITY];

const GET_ACTIVITY_STREAMS: &[ParamSpec] = &[
    ACTIVITY,
    query("stream_types", "types", ParamKind::EnumList(STREAM_TYPES)),
];

const UPDATE_ACTIVITY: &[ParamSpec] = &[
    ACTIVITY,
    body("name", "name", SHORT_TEXT),
    body("description", "description", LONG_TEXT),
    body("feel", "feel", SCORE),
    body("perceived_exertion", "perceived_exertion", ParamKind::Int { min: 1, max: 10 }),
    body("coach_tick", "coach_tick", ParamKind::Int { min: -1, max: 5 }),
];

const ADD_ACTIVITY_MESSAGE: &[ParamSpec] = &[
    ACTIVITY,
    body("content", "content", LONG_TEXT).required(),
];

const DATE_RANGE: &[ParamSpec] = &[ATHLETE, OLDEST, NEWEST];

const ATHLETE_EVENT: &[ParamSpec] = &[ATHLETE, EVENT];

/// Messages are deleted through the activity's chat (`icu_chat_id`).
const DELETE_ACTIVITY_MESSAGE: &[ParamSpec] =
    &[path("chat_id", ParamKind::Id), path("message_id", ParamKind::Id)];

const EVENT_FIELDS_CREATE: &[ParamSpec] = &[
    ATHLETE,
    body("name", "name", SHORT_TEXT).required(),
    body("start_date", "start_date_local", ParamKind::DateTime).required(),
    body("end_date", "end_date_local", ParamKind::DateTime),
    body("category", "category", ParamKind::Enum(EVENT_CATEGORIES)),
    body("workout_type", "type", ParamKind::Enum(SPORT_TYPES)),
    body("sub_type", "sub_type", ParamKind::Enum(EVENT_SUB_TYPES)),
    body("description", "description", LONG_TEXT),
    body("moving_time", "moving_time", COUNT),
    body("distance", "distance", COUNT),
    body("workout_doc", "workout_doc", ParamKind::Json),
    body("color", "color", SHORT_TEXT),
    body("indoor", "indoor", ParamKind::Bool),
    body("icu_ftp", "icu_ftp", ParamKind::Int { min: 1, max: 2_000 }),
    body("entered", "entered", ParamKind::Bool),
];

const EVENT_FIELDS_UPDATE: &[ParamSpec] = &[
    ATHLETE,
    EVENT,
    body("name", "name", SHORT_TEXT),
    body("start_date", "start_date_local", ParamKind::DateTime),
    body("end_date", "end_date_local", ParamKind::DateTime),
    body("category", "category", ParamKind::Enum(EVENT_CATEGORIES)),
    body("workout_type", "type", ParamKind::Enum(SPORT_TYPES)),
    body("sub_type", "sub_type", ParamKind::Enum(EVENT_SUB_TYPES)),
    body("description", "description", LONG_TEXT),
    body("moving_time", "moving_time", COUNT),
    body("distance", "distance", COUNT),
    body("workout_doc", "workout_doc", ParamKind::Json),
    body("color", "color", SHORT_TEXT),
    body("indoor", "indoor", ParamKind::Bool),
    body("icu_ftp", "icu_ftp", ParamKind::Int { min: 1, max: 2_000 }),
    body("entered", "entered", ParamKind::Bool),
];

const UPDATE_WELLNESS: &[ParamSpec] = &[
    ATHLETE,
    path("date", ParamKind::Date),
    body("weight", "weight", ParamKind::Number { min: 0.0, max: 500.0 }),
    body("resting_hr", "restingHR", ParamKind::Int { min: 20, max: 250 }),
    body("hrv", "hrv", ParamKind::Number { min: 0.0, max: 500.0 }),
    body("hrv_sdnn", "hrvSDNN", ParamKind::Number { min: 0.0, max: 500.0 }),
    body("avg_sleeping_hr", "avgSleepingHR", ParamKind::Number { min: 20.0, max: 250.0 }),
    body("spo2", "spO2", ParamKind::Number { min: 0.0, max: 100.0 }),
    body("systolic", "systolic", ParamKind::Int { min: 40, max: 300 }),
    body("diastolic", "diastolic", ParamKind::Int { min: 20, max: 200 }),
    body("respiration", "respiration", ParamKind::Number { min: 0.0, max: 100.0 }),
    body("vo2max", "vo2max", ParamKind::Number { min: 0.0, max: 120.0 }),
    body("body_fat", "bodyFat", ParamKind::Number { min: 0.0, max: 100.0 }),
    body("sleep_secs", "sleepSecs", ParamKind::Int { min: 0, max: 86_400 }),
    body("sleep_quality", "sleepQuality", ParamKind::Int { min: 1, max: 4 }),
    body("sleep_score", "sleepScore", ParamKind::Number { min: 0.0, max: 100.0 }),
    body("readiness", "readiness", ParamKind::Number { min: 0.0, max: 100.0 }),
    body("soreness", "soreness", SCORE),
    body("fatigue", "fatigue", SCORE),
    body("stress", "stress", SCORE),
    body("mood", "mood", SCORE),
    body("motivation", "motivation", SCORE),
    body("injury", "injury", SCORE),
    body("kcal_consumed", "kcalConsumed", COUNT),
    body("hydration_volume", "hydrationVolume", COUNT),
    body("hydration", "hydration", ParamKind::Int { min: 0, max: 10 }),
    body("steps", "steps", COUNT),
    body("comments", "comments", LONG_TEXT),
];

const CURVES: &[ParamSpec] = &[ATHLETE, CURVE_TYPE];

const ATHLETE_ONLY: &[ParamSpec] = &[ATHLETE];

const CREATE_TRAINING_PLAN: &[ParamSpec] = &[
    ATHLETE,
    body("name", "name", SHORT_TEXT).required(),
    body("start_date", "start_date_local", ParamKind::DateTime),
    body("auto_rollout_day", "auto_rollout_day", ParamKind::Int { min: 0, max: 6 }),
];

const DELETE_TRAINING_PLAN: &[ParamSpec] = &[ATHLETE, path("plan_id", ParamKind::Id)];

const ADD_WORKOUT_TO_PLAN: &[ParamSpec] = &[
    ATHLETE,
    body("plan_id", "folder_id", ParamKind::Id).required(),
    body("name", "name", SHORT_TEXT).required(),
    body("day", "day", COUNT).required(),
    body("description", "description", LONG_TEXT),
    body("workout_type", "type", ParamKind::Enum(SPORT_TYPES)),
    body("moving_time", "moving_time", COUNT),
    body("workout_doc", "workout_doc", ParamKind::Json),
];

const ADD_WORKOUTS_BULK: &[ParamSpec] = &[
    ATHLETE,
    ParamSpec::new("workouts", "workouts", ParamKind::Json, Location::BodyRoot).required(),
];

/// Static route for one operation.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub method: HttpMethod,
    pub path: &'static str,
    pub entity: EntityKind,
    pub params: &'static [ParamSpec],
    /// `(start, end)` parameter names that must satisfy start <= end when both are present
    pub date_range: Option<(&'static str, &'static str)>,
}

impl Route {
    const fn new(
        method: HttpMethod,
        path: &'static str,
        entity: EntityKind,
        params: &'static [ParamSpec],
    ) -> Self {
        Self {
            method,
            path,
            entity,
            params,
            date_range: None,
        }
    }

    const fn ranged(mut self) -> Self {
        self.date_range = Some(("start_date", "end_date"));
        self
    }

    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        let params: &'static [ParamSpec] = self.params;
        params.iter().find(|p| p.name == name)
    }

    /// Whether the request carries a JSON body that must not be empty.
    pub fn has_body(&self) -> bool {
        self.params
            .iter()
            .any(|p| matches!(p.location, Location::Body | Location::BodyRoot))
    }
}

macro_rules! operations {
    ($( $variant:ident => $name:literal ),+ $(,)?) => {
        /// Every operation the dispatch core can route.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operation {
            $( $variant, )+
        }

        impl Operation {
            pub const ALL: &'static [Operation] = &[ $( Operation::$variant, )+ ];

            /// Tool-facing operation name (e.g. `"get_activities"`).
            pub fn name(&self) -> &'static str {
                match self {
                    $( Operation::$variant => $name, )+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some(Operation::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

operations! {
    GetActivities => "get_activities",
    SearchActivities => "search_activities",
    GetActivityDetails => "get_activity_details",
    GetActivityIntervals => "get_activity_intervals",
    GetActivityStreams => "get_activity_streams",
    UpdateActivity => "update_activity",
    GetActivityMessages => "get_activity_messages",
    AddActivityMessage => "add_activity_message",
    DeleteActivityMessage => "delete_activity_message",
    GetEvents => "get_events",
    GetEventById => "get_event_by_id",
    CreateEvent => "create_event",
    UpdateEvent => "update_event",
    DeleteEvent => "delete_event",
    GetWellnessData => "get_wellness_data",
    UpdateWellness => "update_wellness",
    GetPowerCurves => "get_power_curves",
    GetHrCurves => "get_hr_curves",
    GetPaceCurves => "get_pace_curves",
    GetTrainingPlans => "get_training_plans",
    CreateTrainingPlan => "create_training_plan",
    DeleteTrainingPlan => "delete_training_plan",
    AddWorkoutToPlan => "add_workout_to_plan",
    AddWorkoutsBulk => "add_workouts_bulk",
    GetWeatherForecast => "get_weather_forecast",
}

impl Operation {
    pub fn route(&self) -> Route {
        use EntityKind as E;
        use HttpMethod::*;
        match self {
            Self::GetActivities => {
                Route::new(Get, "/athlete/{athlete_id}/activities", E::Activity, GET_ACTIVITIES)
                    .ranged()
            }
            Self::SearchActivities => Route::new(
                Get,
                "/athlete/{athlete_id}/activities/search",
                E::Activity,
                SEARCH_ACTIVITIES,
            ),
            Self::GetActivityDetails => {
                Route::new(Get, "/activity/{activity_id}", E::Activity, ACTIVITY_ONLY)
            }
            Self::GetActivityIntervals => Route::new(
                Get,
                "/activity/{activity_id}/intervals",
                E::Interval,
                ACTIVITY_ONLY,
            ),
            Self::GetActivityStreams => Route::new(
                Get,
                "/activity/{activity_id}/streams",
                E::Stream,
                GET_ACTIVITY_STREAMS,
            ),
            Self::UpdateActivity => {
                Route::new(Put, "/activity/{activity_id}", E::Activity, UPDATE_ACTIVITY)
            }
            Self::GetActivityMessages => Route::new(
                Get,
                "/activity/{activity_id}/messages",
                E::Message,
                ACTIVITY_ONLY,
            ),
            Self::AddActivityMessage => Route::new(
                Post,
                "/activity/{activity_id}/messages",
                E::Message,
                ADD_ACTIVITY_MESSAGE,
            ),
            Self::DeleteActivityMessage => Route::new(
                Delete,
                "/chats/{chat_id}/messages/{message_id}",
                E::Generic,
                DELETE_ACTIVITY_MESSAGE,
            ),
            Self::GetEvents => {
                Route::new(Get, "/athlete/{athlete_id}/events", E::Event, DATE_RANGE).ranged()
            }
            Self::GetEventById => Route::new(
                Get,
                "/athlete/{athlete_id}/event/{event_id}",
                E::Event,
                ATHLETE_EVENT,
            ),
            Self::CreateEvent => {
                Route::new(Post, "/athlete/{athlete_id}/events", E::Event, EVENT_FIELDS_CREATE)
                    .ranged()
            }
            Self::UpdateEvent => Route::new(
                Put,
                "/athlete/{athlete_id}/events/{event_id}",
                E::Event,
                EVENT_FIELDS_UPDATE,
            )
            .ranged(),
            Self::DeleteEvent => Route::new(
                Delete,
                "/athlete/{athlete_id}/events/{event_id}",
                E::Generic,
                ATHLETE_EVENT,
            ),
            Self::GetWellnessData => {
                Route::new(Get, "/athlete/{athlete_id}/wellness", E::Wellness, DATE_RANGE)
                    .ranged()
            }
            Self::UpdateWellness => Route::new(
                Put,
                "/athlete/{athlete_id}/wellness/{date}",
                E::Wellness,
                UPDATE_WELLNESS,
            ),
            Self::GetPowerCurves => Route::new(
                Get,
                "/athlete/{athlete_id}/power-curves.json",
                E::Curve,
                CURVES,
            ),
            Self::GetHrCurves => {
                Route::new(Get, "/athlete/{athlete_id}/hr-curves.json", E::Curve, CURVES)
            }
            Self::GetPaceCurves => {
                Route::new(Get, "/athlete/{athlete_id}/pace-curves.json", E::Curve, CURVES)
            }
            Self::GetTrainingPlans => {
                Route::new(Get, "/athlete/{athlete_id}/folders", E::Folder, ATHLETE_ONLY)
            }
            Self::CreateTrainingPlan => Route::new(
                Post,
                "/athlete/{athlete_id}/folders",
                E::Folder,
                CREATE_TRAINING_PLAN,
            ),
            Self::DeleteTrainingPlan => Route::new(
                Delete,
                "/athlete/{athlete_id}/folders/{plan_id}",
                E::Generic,
                DELETE_TRAINING_PLAN,
            ),
            Self::AddWorkoutToPlan => Route::new(
                Post,
                "/athlete/{athlete_id}/workouts",
                E::Workout,
                ADD_WORKOUT_TO_PLAN,
            ),
            Self::AddWorkoutsBulk => Route::new(
                Post,
                "/athlete/{athlete_id}/workouts/bulk",
                E::Workout,
                ADD_WORKOUTS_BULK,
            ),
            Self::GetWeatherForecast => Route::new(
                Get,
                "/athlete/{athlete_id}/weather-forecast",
                E::Weather,
                ATHLETE_ONLY,
            ),
        }
    }

    /// Fixed body fields the service expects for this operation. Caller-supplied
    /// fields with the same name take precedence.
    pub fn body_defaults(&self) -> Option<serde_json::Value> {
        use serde_json::json;
        match self {
            Self::CreateEvent => Some(json!({ "category": "WORKOUT" })),
            Self::CreateTrainingPlan => Some(json!({
                "type": "PLAN",
                "rollout_weeks": 0,
                "auto_rollout_day": 1,
                "starting_ctl": -1,
                "starting_atl": -1,
            })),
            Self::AddWorkoutToPlan => Some(json!({ "type": "Ride", "targets": ["POWER"] })),
            _ => None,
        }
    }

    /// Whether the call changes remote state. All mutations target a specific
    /// record, so repeating one leaves the same end state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self.route().method, HttpMethod::Get)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
