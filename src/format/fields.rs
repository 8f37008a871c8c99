//! Field tables per entity kind.
//!
//! Canonical names are snake_case with a unit suffix where the value has a
//! unit: `_m` meters, `_s` seconds, `_mps` meters per second, `_kg`,
//! `_w` watts, `_bpm`, `_c` degrees Celsius, `_pct`, `_mm`.
//! A source key may be a dotted path into nested objects (`temp.min`,
//! `weather.0.description`).

use crate::routing::EntityKind;

const KMH_TO_MPS: f64 = 1.0 / 3.6;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Conv {
    /// Size-bounded passthrough
    Raw,
    /// String; other scalars are stringified
    Text,
    /// Number; numeric strings are coerced
    Num,
    /// Number multiplied into the canonical unit
    Scale(f64),
    /// Array of nested entities
    Rows(&'static [FieldRule]),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldRule {
    pub target: &'static str,
    /// Candidate source keys, first present wins
    pub sources: &'static [&'static str],
    pub conv: Conv,
    /// Emitted as `null` when absent or malformed
    pub required: bool,
}

const fn f(target: &'static str, sources: &'static [&'static str], conv: Conv) -> FieldRule {
    FieldRule {
        target,
        sources,
        conv,
        required: false,
    }
}

const fn req(target: &'static str, sources: &'static [&'static str], conv: Conv) -> FieldRule {
    FieldRule {
        target,
        sources,
        conv,
        required: true,
    }
}

use Conv::{Num, Raw, Text};

pub(crate) const ACTIVITY: &[FieldRule] = &[
    req("id", &["id"], Raw),
    req("name", &["name"], Text),
    req("type", &["type"], Text),
    req("start_date", &["start_date_local", "startTime", "start_date"], Text),
    f("description", &["description"], Text),
    req("distance_m", &["distance"], Num),
    req("moving_time_s", &["moving_time"], Num),
    f("elapsed_time_s", &["elapsed_time", "duration"], Num),
    f("elevation_gain_m", &["total_elevation_gain", "elevationGain"], Num),
    f("elevation_loss_m", &["total_elevation_loss"], Num),
    f("average_power_w", &["icu_average_watts", "average_watts", "avgPower"], Num),
    f("weighted_average_power_w", &["icu_weighted_avg_watts"], Num),
    f("ftp_w", &["icu_ftp"], Num),
    f("work_j", &["icu_joules"], Num),
    f("intensity", &["icu_intensity"], Num),
    f("variability_index", &["icu_variability_index"], Num),
    f("training_load", &["icu_training_load", "trainingLoad"], Num),
    f("average_hr_bpm", &["average_heartrate", "avgHr"], Num),
    f("max_hr_bpm", &["max_heartrate"], Num),
    f("lthr_bpm", &["lthr"], Num),
    f("decoupling_pct", &["decoupling"], Num),
    f("average_cadence_rpm", &["average_cadence"], Num),
    f("calories_kcal", &["calories"], Num),
    f("average_speed_mps", &["average_speed"], Num),
    f("max_speed_mps", &["max_speed"], Num),
    f("weight_kg", &["icu_weight"], Num),
    f("perceived_exertion", &["perceived_exertion", "icu_rpe"], Num),
    f("feel", &["feel"], Num),
    f("trainer", &["trainer"], Raw),
    f("average_temp_c", &["average_temp"], Num),
    f("average_wind_speed_mps", &["average_wind_speed"], Conv::Scale(KMH_TO_MPS)),
    f("headwind_pct", &["headwind_percent"], Num),
    f("ctl", &["icu_ctl"], Num),
    f("atl", &["icu_atl"], Num),
    f("trimp", &["trimp"], Num),
    f("efficiency_factor", &["icu_efficiency_factor"], Num),
    f("device_name", &["device_name"], Text),
    f("chat_id", &["icu_chat_id"], Raw),
];

const INTERVAL: &[FieldRule] = &[
    f("id", &["id"], Raw),
    f("label", &["label"], Text),
    f("type", &["type"], Text),
    f("start_index", &["start_index"], Num),
    f("end_index", &["end_index"], Num),
    f("count", &["count"], Num),
    f("distance_m", &["distance"], Num),
    f("elapsed_time_s", &["elapsed_time"], Num),
    f("moving_time_s", &["moving_time"], Num),
    f("average_power_w", &["average_watts"], Num),
    f("max_power_w", &["max_watts"], Num),
    f("weighted_average_power_w", &["weighted_average_watts"], Num),
    f("intensity", &["intensity"], Num),
    f("training_load", &["training_load"], Num),
    f("zone", &["zone"], Num),
    f("average_hr_bpm", &["average_heartrate"], Num),
    f("max_hr_bpm", &["max_heartrate"], Num),
    f("average_speed_mps", &["average_speed"], Num),
    f("max_speed_mps", &["max_speed"], Num),
    f("average_cadence_rpm", &["average_cadence"], Num),
    f("elevation_gain_m", &["total_elevation_gain"], Num),
    f("average_temp_c", &["average_temp"], Num),
    f("average_wind_speed_mps", &["average_wind_speed"], Conv::Scale(KMH_TO_MPS)),
];

pub(crate) const INTERVALS: &[FieldRule] = &[
    req("id", &["id"], Raw),
    f("analyzed", &["analyzed"], Raw),
    req("intervals", &["icu_intervals"], Conv::Rows(INTERVAL)),
    f("groups", &["icu_groups"], Conv::Rows(INTERVAL)),
];

pub(crate) const STREAM: &[FieldRule] = &[
    req("type", &["type"], Text),
    f("name", &["name"], Text),
    f("value_type", &["valueType"], Text),
    req("data", &["data"], Raw),
    f("data2", &["data2"], Raw),
];

pub(crate) const EVENT: &[FieldRule] = &[
    req("id", &["id"], Raw),
    req("name", &["name"], Text),
    req("category", &["category"], Text),
    req("start_date", &["start_date_local", "date"], Text),
    f("end_date", &["end_date_local"], Text),
    f("type", &["type"], Text),
    f("sub_type", &["sub_type"], Text),
    f("description", &["description"], Text),
    f("moving_time_s", &["moving_time"], Num),
    f("distance_m", &["distance"], Num),
    f("training_load", &["icu_training_load"], Num),
    f("indoor", &["indoor"], Raw),
    f("color", &["color"], Text),
    f("workout_doc", &["workout_doc"], Raw),
];

pub(crate) const WELLNESS: &[FieldRule] = &[
    req("date", &["id"], Text),
    f("ctl", &["ctl"], Num),
    f("atl", &["atl"], Num),
    f("ramp_rate", &["rampRate"], Num),
    f("ctl_load", &["ctlLoad"], Num),
    f("atl_load", &["atlLoad"], Num),
    f("weight_kg", &["weight"], Num),
    f("resting_hr_bpm", &["restingHR"], Num),
    f("hrv", &["hrv"], Num),
    f("hrv_sdnn", &["hrvSDNN"], Num),
    f("avg_sleeping_hr_bpm", &["avgSleepingHR"], Num),
    f("sleep_s", &["sleepSecs"], Num),
    f("sleep_s", &["sleepHours"], Conv::Scale(3_600.0)),
    f("sleep_quality", &["sleepQuality"], Num),
    f("sleep_score", &["sleepScore"], Num),
    f("readiness", &["readiness"], Num),
    f("spo2_pct", &["spO2"], Num),
    f("systolic", &["systolic"], Num),
    f("diastolic", &["diastolic"], Num),
    f("respiration", &["respiration"], Num),
    f("vo2max", &["vo2max"], Num),
    f("body_fat_pct", &["bodyFat"], Num),
    f("soreness", &["soreness"], Num),
    f("fatigue", &["fatigue"], Num),
    f("stress", &["stress"], Num),
    f("mood", &["mood"], Num),
    f("motivation", &["motivation"], Num),
    f("injury", &["injury"], Num),
    f("kcal_consumed", &["kcalConsumed"], Num),
    f("hydration_volume_ml", &["hydrationVolume"], Num),
    f("hydration", &["hydration"], Num),
    f("steps", &["steps"], Num),
    f("comments", &["comments"], Text),
    f("locked", &["locked"], Raw),
    f("sport_info", &["sportInfo"], Raw),
];

const CURVE: &[FieldRule] = &[
    f("id", &["id"], Raw),
    f("label", &["label"], Text),
    f("start_date", &["start_date_local"], Text),
    f("end_date", &["end_date_local"], Text),
    f("secs", &["secs"], Raw),
    f("watts", &["watts"], Raw),
    f("values", &["values", "bpm"], Raw),
    f("distance_m", &["distance"], Raw),
    f("moving_time_s", &["moving_time"], Num),
    f("training_load", &["training_load"], Num),
];

pub(crate) const CURVES: &[FieldRule] = &[
    req("curves", &["list"], Conv::Rows(CURVE)),
    f("activities", &["activities"], Raw),
];

pub(crate) const WORKOUT: &[FieldRule] = &[
    req("id", &["id"], Raw),
    req("name", &["name"], Text),
    f("type", &["type"], Text),
    f("folder_id", &["folder_id"], Raw),
    f("day", &["day"], Num),
    f("description", &["description"], Text),
    f("moving_time_s", &["moving_time"], Num),
    f("training_load", &["icu_training_load"], Num),
    f("workout_doc", &["workout_doc"], Raw),
];

pub(crate) const FOLDER: &[FieldRule] = &[
    req("id", &["id"], Raw),
    req("name", &["name"], Text),
    f("type", &["type"], Text),
    f("description", &["description"], Text),
    f("start_date", &["start_date_local"], Text),
    f("duration_weeks", &["duration_weeks"], Num),
    f("workouts", &["children"], Conv::Rows(WORKOUT)),
];

pub(crate) const MESSAGE: &[FieldRule] = &[
    req("id", &["id"], Raw),
    f("author", &["name"], Text),
    req("content", &["content"], Text),
    f("created", &["created"], Text),
    f("type", &["type"], Text),
    f("athlete_id", &["athlete_id"], Raw),
];

const DAILY: &[FieldRule] = &[
    req("date", &["id"], Text),
    f("temp_min_c", &["temp.min"], Num),
    f("temp_max_c", &["temp.max"], Num),
    f("description", &["weather.0.description"], Text),
    f("rain_mm", &["rain"], Num),
    f("wind_speed_mps", &["wind_speed"], Num),
];

const FORECAST: &[FieldRule] = &[
    f("location", &["location"], Text),
    f("label", &["label"], Text),
    f("lat", &["lat"], Num),
    f("lon", &["lon"], Num),
    f("provider", &["provider"], Text),
    f("enabled", &["enabled"], Raw),
    f("daily", &["daily"], Conv::Rows(DAILY)),
];

pub(crate) const WEATHER: &[FieldRule] = &[req("forecasts", &["forecasts"], Conv::Rows(FORECAST))];

/// Field table for an entity kind; `None` means generic passthrough.
pub(crate) fn table(kind: EntityKind) -> Option<&'static [FieldRule]> {
    match kind {
        EntityKind::Activity => Some(ACTIVITY),
        EntityKind::Interval => Some(INTERVALS),
        EntityKind::Stream => Some(STREAM),
        EntityKind::Event => Some(EVENT),
        EntityKind::Wellness => Some(WELLNESS),
        EntityKind::Curve => Some(CURVES),
        EntityKind::Folder => Some(FOLDER),
        EntityKind::Workout => Some(WORKOUT),
        EntityKind::Message => Some(MESSAGE),
        EntityKind::Weather => Some(WEATHER),
        EntityKind::Generic => None,
    }
}
