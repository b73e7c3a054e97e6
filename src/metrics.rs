use crate::errors::FitError;
use crate::http::ensure_success;
use crate::models::{MetricSample, TodayMetrics};
use crate::session::Session;
use chrono::{DateTime, Duration, Local, TimeZone};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

const SERVICE: &str = "Google Fit";

pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;
pub const SLEEP_ACTIVITY_TYPE: u32 = 72;

pub const STEP_SOURCE: &str =
    "derived:com.google.step_count.delta:com.google.android.gms:estimated_steps";
pub const CALORIE_SOURCE: &str =
    "derived:com.google.calories.expended:com.google.android.gms:merge_calories_expended";
pub const HEART_RATE_SOURCE: &str =
    "derived:com.google.heart_rate.bpm:com.google.android.gms:merge_heart_rate_bpm";
pub const WEIGHT_SOURCE: &str = "derived:com.google.weight.summary:com.google.android.gms:aggregated";

pub const STEP_DATA_TYPE: &str = "com.google.step_count.delta";
pub const CALORIE_DATA_TYPE: &str = "com.google.calories.expended";

/// Which slot of a point's first value to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueField {
    IntVal,
    FpVal,
}

impl ValueField {
    pub fn tag(self) -> &'static str {
        match self {
            Self::IntVal => "intVal",
            Self::FpVal => "fpVal",
        }
    }

    fn read(self, value: &PointValue) -> f64 {
        match self {
            Self::IntVal => value.int_val.map_or(0.0, |v| v as f64),
            Self::FpVal => value.fp_val.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationWindow {
    pub start_millis: i64,
    pub end_millis: i64,
    pub bucket_duration_millis: i64,
}

impl AggregationWindow {
    pub fn today() -> Self {
        Self::today_at(&Local::now())
    }

    /// `[local midnight, now]`.
    pub fn today_at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            start_millis: start_of_day_millis(now, 0),
            end_millis: now.timestamp_millis(),
            bucket_duration_millis: DAY_MILLIS,
        }
    }

    pub fn rolling_days(days: u32) -> Self {
        Self::rolling_days_at(&Local::now(), days)
    }

    /// Local midnight `days - 1` days back through now, one bucket per day.
    pub fn rolling_days_at<Tz: TimeZone>(now: &DateTime<Tz>, days: u32) -> Self {
        Self {
            start_millis: start_of_day_millis(now, i64::from(days.saturating_sub(1))),
            end_millis: now.timestamp_millis(),
            bucket_duration_millis: DAY_MILLIS,
        }
    }

    pub fn last_hours_at<Tz: TimeZone>(now: &DateTime<Tz>, hours: i64) -> Self {
        let end_millis = now.timestamp_millis();
        Self {
            start_millis: end_millis - hours * 60 * 60 * 1000,
            end_millis,
            bucket_duration_millis: DAY_MILLIS,
        }
    }

    /// Dataset id in the `{startNanos}-{endNanos}` form the dataset endpoint expects.
    pub fn dataset_id(&self) -> String {
        format!(
            "{}-{}",
            i128::from(self.start_millis) * 1_000_000,
            i128::from(self.end_millis) * 1_000_000
        )
    }
}

fn start_of_day_millis<Tz: TimeZone>(now: &DateTime<Tz>, days_back: i64) -> i64 {
    (now.date_naive() - Duration::days(days_back))
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest())
        .map_or_else(|| now.timestamp_millis() - days_back * DAY_MILLIS, |start| start.timestamp_millis())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointValue {
    #[serde(default)]
    pub int_val: Option<i64>,
    #[serde(default)]
    pub fp_val: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    #[serde(default)]
    pub start_time_nanos: Option<String>,
    #[serde(default)]
    pub value: Vec<PointValue>,
}

impl DataPoint {
    pub fn sample(&self, field: ValueField) -> MetricSample {
        MetricSample {
            timestamp_millis: self
                .start_time_nanos
                .as_deref()
                .and_then(|nanos| nanos.parse::<i64>().ok())
                .map_or(0, |nanos| nanos / 1_000_000),
            value: self.value.first().map_or(0.0, |value| field.read(value)),
            data_type_tag: field.tag(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub point: Vec<DataPoint>,
}

impl Dataset {
    pub fn samples(&self, field: ValueField) -> Vec<MetricSample> {
        self.point.iter().map(|point| point.sample(field)).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub start_time_millis: String,
    pub end_time_millis: String,
    #[serde(default)]
    pub dataset: Vec<Dataset>,
}

impl Bucket {
    pub fn start_millis(&self) -> Option<i64> {
        self.start_time_millis.parse().ok()
    }

    /// Sum of every point in the bucket.
    pub fn total(&self, field: ValueField) -> f64 {
        self.dataset
            .iter()
            .flat_map(|dataset| dataset.samples(field))
            .map(|sample| sample.value)
            .sum()
    }
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    bucket: Vec<Bucket>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateBy<'a> {
    data_type_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BucketByTime {
    duration_millis: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateRequest<'a> {
    aggregate_by: [AggregateBy<'a>; 1],
    bucket_by_time: BucketByTime,
    start_time_millis: i64,
    end_time_millis: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitSession {
    pub start_time_millis: String,
    pub end_time_millis: String,
}

impl FitSession {
    fn bounds(&self) -> Option<(i64, i64)> {
        Some((self.start_time_millis.parse().ok()?, self.end_time_millis.parse().ok()?))
    }
}

#[derive(Debug, Deserialize)]
struct SessionList {
    #[serde(default)]
    session: Vec<FitSession>,
}

/// Formats a duration as `"{h}h {m}m"`.
pub fn format_duration(duration_millis: i64) -> String {
    let minutes_total = duration_millis.max(0) / 60_000;
    format!("{}h {}m", minutes_total / 60, minutes_total % 60)
}

/// Windowed reads against the fitness REST API. Every call takes the caller's
/// [`Session`]; without a live token the call returns `None` and nothing is
/// sent upstream.
#[derive(Debug, Clone)]
pub struct FitClient {
    http: Client,
    base_url: String,
}

impl FitClient {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Sums `field` across every point of one data source in `window`.
    pub async fn fetch_point_sum(
        &self,
        session: &Session,
        source_id: &str,
        field: ValueField,
        window: AggregationWindow,
    ) -> Option<f64> {
        let Some(token) = session.access_token() else {
            warn!(source_id, "{}", FitError::NoAccessToken);
            return None;
        };

        match self.read_dataset(token, source_id, window).await {
            Ok(dataset) => {
                let total: f64 = dataset.samples(field).iter().map(|sample| sample.value).sum();
                debug!(source_id, points = dataset.point.len(), total, "summed dataset");
                Some(total)
            }
            Err(err) => {
                warn!(source_id, "failed to read dataset: {err}");
                None
            }
        }
    }

    /// Bucketed aggregate for one data type; callers label the buckets.
    pub async fn fetch_aggregate_buckets(
        &self,
        session: &Session,
        data_type: &str,
        window: AggregationWindow,
    ) -> Option<Vec<Bucket>> {
        let Some(token) = session.access_token() else {
            warn!(data_type, "{}", FitError::NoAccessToken);
            return None;
        };

        match self.aggregate(token, data_type, window).await {
            Ok(buckets) => Some(buckets),
            Err(err) => {
                warn!(data_type, "failed to fetch aggregate: {err}");
                None
            }
        }
    }

    /// Duration of the most recent sleep session in `window`.
    pub async fn fetch_latest_sleep(
        &self,
        session: &Session,
        window: AggregationWindow,
    ) -> Option<String> {
        let Some(token) = session.access_token() else {
            warn!("{}", FitError::NoAccessToken);
            return None;
        };

        let sessions = match self.list_sleep_sessions(token, window).await {
            Ok(sessions) => sessions,
            Err(err) => {
                warn!("failed to list sleep sessions: {err}");
                return None;
            }
        };

        let latest = sessions.iter().filter_map(FitSession::bounds).max_by_key(|(_, end)| *end);
        match latest {
            Some((start, end)) => Some(format_duration(end - start)),
            None => {
                warn!("no sleep sessions found");
                None
            }
        }
    }

    /// Today's headline metrics; each one degrades to `None` on its own.
    pub async fn fetch_today(&self, session: &Session) -> TodayMetrics {
        let now = Local::now();
        let today = AggregationWindow::today_at(&now);
        let (steps, calories, heart_rate, weight, sleep) = tokio::join!(
            self.fetch_point_sum(session, STEP_SOURCE, ValueField::IntVal, today),
            self.fetch_point_sum(session, CALORIE_SOURCE, ValueField::FpVal, today),
            self.fetch_point_sum(session, HEART_RATE_SOURCE, ValueField::FpVal, today),
            self.fetch_point_sum(session, WEIGHT_SOURCE, ValueField::FpVal, today),
            self.fetch_latest_sleep(session, AggregationWindow::last_hours_at(&now, 24)),
        );

        TodayMetrics {
            steps,
            calories,
            heart_rate,
            weight,
            sleep,
        }
    }

    async fn read_dataset(
        &self,
        token: &str,
        source_id: &str,
        window: AggregationWindow,
    ) -> Result<Dataset, FitError> {
        let url = self.endpoint(&[
            "users",
            "me",
            "dataSources",
            source_id,
            "datasets",
            &window.dataset_id(),
        ])?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        Ok(ensure_success(SERVICE, response)?.json().await?)
    }

    async fn aggregate(
        &self,
        token: &str,
        data_type: &str,
        window: AggregationWindow,
    ) -> Result<Vec<Bucket>, FitError> {
        let url = self.endpoint(&["users", "me", "dataset:aggregate"])?;
        let body = AggregateRequest {
            aggregate_by: [AggregateBy {
                data_type_name: data_type,
            }],
            bucket_by_time: BucketByTime {
                duration_millis: window.bucket_duration_millis,
            },
            start_time_millis: window.start_millis,
            end_time_millis: window.end_millis,
        };
        let response = self.http.post(url).bearer_auth(token).json(&body).send().await?;
        let parsed: AggregateResponse = ensure_success(SERVICE, response)?.json().await?;
        Ok(parsed.bucket)
    }

    async fn list_sleep_sessions(
        &self,
        token: &str,
        window: AggregationWindow,
    ) -> Result<Vec<FitSession>, FitError> {
        let url = self.endpoint(&["users", "me", "sessions"])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("startTimeMillis", window.start_millis.to_string()),
                ("endTimeMillis", window.end_millis.to_string()),
                ("activityType", SLEEP_ACTIVITY_TYPE.to_string()),
            ])
            .send()
            .await?;
        let parsed: SessionList = ensure_success(SERVICE, response)?.json().await?;
        Ok(parsed.session)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FitError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| FitError::InvalidConfig(format!("invalid fitness API base: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| FitError::InvalidConfig("fitness API base cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenPair;
    use chrono::{FixedOffset, Utc};
    use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn live_session() -> Session {
        Session::new(TokenPair {
            access_token: "live-token".to_string(),
            refresh_token: None,
            expiry_date: Some(Utc::now().timestamp_millis() + 60 * 60 * 1000),
            scope: None,
            token_type: Some("Bearer".to_string()),
        })
    }

    fn expired_session() -> Session {
        Session::new(TokenPair {
            access_token: "old-token".to_string(),
            refresh_token: None,
            expiry_date: Some(Utc::now().timestamp_millis() - 1),
            scope: None,
            token_type: None,
        })
    }

    fn client(server: &MockServer) -> FitClient {
        FitClient::new(format!("{}/fitness/v1", server.uri()), Client::new())
    }

    async fn silent_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn today_window_starts_at_local_midnight() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2026, 4, 28, 15, 30, 0).unwrap();
        let window = AggregationWindow::today_at(&now);
        let midnight = offset.with_ymd_and_hms(2026, 4, 28, 0, 0, 0).unwrap();

        assert_eq!(window.start_millis, midnight.timestamp_millis());
        assert_eq!(window.end_millis, now.timestamp_millis());
    }

    #[test]
    fn rolling_window_covers_seven_calendar_days() {
        let now = Utc.with_ymd_and_hms(2026, 4, 28, 9, 0, 0).unwrap();
        let window = AggregationWindow::rolling_days_at(&now, 7);
        let start = Utc.with_ymd_and_hms(2026, 4, 22, 0, 0, 0).unwrap();

        assert_eq!(window.start_millis, start.timestamp_millis());
        assert_eq!(window.bucket_duration_millis, DAY_MILLIS);
    }

    #[test]
    fn dataset_id_is_in_nanoseconds() {
        let window = AggregationWindow {
            start_millis: 1_000,
            end_millis: 2_500,
            bucket_duration_millis: DAY_MILLIS,
        };
        assert_eq!(window.dataset_id(), "1000000000-2500000000");
    }

    #[test]
    fn durations_format_as_hours_and_minutes() {
        assert_eq!(format_duration(7 * 3_600_000 + 42 * 60_000 + 59_000), "7h 42m");
        assert_eq!(format_duration(0), "0h 0m");
    }

    #[tokio::test]
    async fn no_session_means_no_request() {
        let server = silent_server().await;
        let fit = client(&server);
        let window = AggregationWindow::today();

        assert_eq!(
            fit.fetch_point_sum(&Session::anonymous(), STEP_SOURCE, ValueField::IntVal, window)
                .await,
            None
        );
        assert!(
            fit.fetch_aggregate_buckets(&Session::anonymous(), STEP_DATA_TYPE, window)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn expired_session_means_no_request() {
        let server = silent_server().await;
        let fit = client(&server);
        let window = AggregationWindow::rolling_days(7);

        assert_eq!(
            fit.fetch_point_sum(&expired_session(), CALORIE_SOURCE, ValueField::FpVal, window)
                .await,
            None
        );
        assert!(
            fit.fetch_aggregate_buckets(&expired_session(), CALORIE_DATA_TYPE, window)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn point_values_are_summed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/fitness/v1/users/me/dataSources/.+/datasets/\d+-\d+$"))
            .and(header("authorization", "Bearer live-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "point": [
                    { "startTimeNanos": "1000000", "value": [{ "intVal": 100 }] },
                    { "startTimeNanos": "2000000", "value": [{ "intVal": 250 }] }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let total = client(&server)
            .fetch_point_sum(&live_session(), STEP_SOURCE, ValueField::IntVal, AggregationWindow::today())
            .await;
        assert_eq!(total, Some(350.0));
    }

    #[tokio::test]
    async fn empty_dataset_sums_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/fitness/v1/users/me/dataSources/.+/datasets/.+$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "minStartTimeNs": "0",
                "maxEndTimeNs": "0",
                "dataSourceId": WEIGHT_SOURCE
            })))
            .mount(&server)
            .await;

        let total = client(&server)
            .fetch_point_sum(&live_session(), WEIGHT_SOURCE, ValueField::FpVal, AggregationWindow::today())
            .await;
        assert_eq!(total, Some(0.0));
    }

    #[tokio::test]
    async fn upstream_failure_degrades_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let total = client(&server)
            .fetch_point_sum(&live_session(), HEART_RATE_SOURCE, ValueField::FpVal, AggregationWindow::today())
            .await;
        assert_eq!(total, None);
    }

    #[tokio::test]
    async fn aggregate_posts_bucketed_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fitness/v1/users/me/dataset:aggregate"))
            .and(body_partial_json(serde_json::json!({
                "aggregateBy": [{ "dataTypeName": STEP_DATA_TYPE }],
                "bucketByTime": { "durationMillis": DAY_MILLIS }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "bucket": [
                    {
                        "startTimeMillis": "1745798400000",
                        "endTimeMillis": "1745884800000",
                        "dataset": [{ "point": [{ "value": [{ "intVal": 4200 }] }] }]
                    },
                    {
                        "startTimeMillis": "1745884800000",
                        "endTimeMillis": "1745971200000",
                        "dataset": [{ "point": [] }]
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let buckets = client(&server)
            .fetch_aggregate_buckets(&live_session(), STEP_DATA_TYPE, AggregationWindow::rolling_days(7))
            .await
            .unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].total(ValueField::IntVal), 4200.0);
        assert_eq!(buckets[1].total(ValueField::IntVal), 0.0);
        assert_eq!(buckets[0].start_millis(), Some(1_745_798_400_000));
    }

    #[tokio::test]
    async fn latest_sleep_session_is_formatted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fitness/v1/users/me/sessions"))
            .and(query_param("activityType", "72"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session": [
                    { "startTimeMillis": "1000", "endTimeMillis": "3601000" },
                    { "startTimeMillis": "90000000", "endTimeMillis": "117900000" }
                ]
            })))
            .mount(&server)
            .await;

        let sleep = client(&server)
            .fetch_latest_sleep(&live_session(), AggregationWindow::today())
            .await;
        assert_eq!(sleep.as_deref(), Some("7h 45m"));
    }

    #[tokio::test]
    async fn today_metrics_degrade_independently() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/fitness/v1/users/me/dataSources/derived:com\.google\.step_count.+$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "point": [{ "value": [{ "intVal": 812 }] }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let today = client(&server).fetch_today(&live_session()).await;
        assert_eq!(today.steps, Some(812.0));
        assert_eq!(today.calories, None);
        assert_eq!(today.sleep, None);
    }
}
