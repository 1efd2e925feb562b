use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::geo::Coordinate;
use crate::report::{Precedence, ProgressReport, RemoteProgress, ReportHandle};
use crate::route::{Route, RouteError, RouteModel, DEFAULT_FALLBACK_SPEED_KMH};
use crate::tracker::{
    DisplayState, LocationSample, ProgressSnapshot, ProgressTracker, StartMode, TrackerError,
    TrackerMode, TrackerSettings, TrackerStatus,
};

/// What the location source can hand to a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationEvent {
    Fix(LocationSample),
    PermissionDenied,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub tracker: TrackerSettings,
    pub fallback_speed_kmh: f64,
    pub precedence: Precedence,
    pub remote_max_age: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tracker: TrackerSettings::default(),
            fallback_speed_kmh: DEFAULT_FALLBACK_SPEED_KMH,
            precedence: Precedence::Local,
            remote_max_age: Duration::from_secs(15),
        }
    }
}

/// The progress figures the UI should show, after applying precedence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct EffectiveProgress {
    pub source: Precedence,
    pub snapped_position: Coordinate,
    pub remaining_km: f64,
    pub eta_minutes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct SessionUpdate {
    pub mode: TrackerMode,
    pub display: DisplayState,
    pub local: Option<ProgressSnapshot>,
    pub remote: Option<RemoteProgress>,
    pub effective: Option<EffectiveProgress>,
    /// Where the map camera should look.
    pub focus: Coordinate,
}

/// One navigation along one selected route.
#[derive(Debug)]
pub struct NavigationSession {
    id: Uuid,
    tracker: ProgressTracker,
    reporter: Option<ReportHandle>,
    precedence: Precedence,
    remote_max_age: Duration,
    permission_denied: bool,
    last_active: DateTime<Utc>,
}

impl NavigationSession {
    pub fn open(route: Route, start: StartMode, options: &SessionOptions) -> Result<Self, RouteError> {
        let model = RouteModel::build_with_fallback(route, options.fallback_speed_kmh)?;
        let id = Uuid::new_v4();
        log::info!(
            "session {}: {:.2} km route, baseline {:.1} km/h",
            id,
            model.total_route_km(),
            model.baseline_average_speed_kmh()
        );

        Ok(Self {
            id,
            tracker: ProgressTracker::new(Some(model), start, options.tracker),
            reporter: None,
            precedence: options.precedence,
            remote_max_age: options.remote_max_age,
            permission_denied: false,
            last_active: Utc::now(),
        })
    }

    pub fn with_reporter(mut self, reporter: ReportHandle) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Give up the reporter without ending the session. Local progress is
    /// unaffected.
    pub fn detach_reporter(&mut self) -> bool {
        self.reporter.take().is_some()
    }

    pub fn is_reporting(&self) -> bool {
        self.reporter.is_some()
    }

    /// When the client last drove this session.
    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> TrackerMode {
        self.tracker.mode()
    }

    pub fn model(&self) -> Option<&RouteModel> {
        self.tracker.model()
    }

    pub fn status(&self) -> TrackerStatus {
        self.tracker.status()
    }

    pub fn start(&mut self) -> Result<TrackerMode, TrackerError> {
        self.last_active = Utc::now();
        if self.permission_denied {
            return Err(TrackerError::LocationPermissionDenied);
        }
        self.tracker.start()
    }

    /// Stop tracking. In-flight remote reports are abandoned with the reporter.
    pub fn stop(&mut self) -> TrackerMode {
        self.last_active = Utc::now();
        self.reporter = None;
        self.tracker.stop()
    }

    pub fn handle(&mut self, event: LocationEvent) -> Result<SessionUpdate, TrackerError> {
        match event {
            LocationEvent::Fix(sample) => self.ingest(sample),
            LocationEvent::PermissionDenied => {
                if !self.permission_denied {
                    log::warn!("session {}: location permission denied", self.id);
                    self.permission_denied = true;
                    self.stop();
                }
                Err(TrackerError::LocationPermissionDenied)
            }
        }
    }

    pub fn ingest(&mut self, sample: LocationSample) -> Result<SessionUpdate, TrackerError> {
        self.last_active = Utc::now();
        if self.permission_denied {
            return Err(TrackerError::LocationPermissionDenied);
        }
        let update = self.tracker.ingest(sample)?;

        if let (Some(snapshot), Some(reporter)) = (&update.progress, &self.reporter) {
            reporter.submit(ProgressReport::new(&update.display, snapshot));
        }
        let remote = match update.progress {
            Some(_) => self.reporter.as_ref().and_then(ReportHandle::latest),
            None => None,
        };
        let effective = update
            .progress
            .map(|local| self.effective_progress(&local, remote.as_ref()));
        let focus = effective
            .map(|e| e.snapped_position)
            .unwrap_or(update.display.position);

        Ok(SessionUpdate {
            mode: self.tracker.mode(),
            display: update.display,
            local: update.progress,
            remote,
            effective,
            focus,
        })
    }

    fn effective_progress(
        &self,
        local: &ProgressSnapshot,
        remote: Option<&RemoteProgress>,
    ) -> EffectiveProgress {
        let fresh_remote = remote.filter(|r| {
            (Utc::now() - r.received_at)
                .to_std()
                .map(|age| age <= self.remote_max_age)
                .unwrap_or(true)
        });

        match (self.precedence, fresh_remote) {
            (Precedence::Remote, Some(remote)) => EffectiveProgress {
                source: Precedence::Remote,
                snapped_position: remote.snapped_position.unwrap_or(local.snapped_position),
                remaining_km: remote.remaining_km,
                eta_minutes: Some(remote.eta_minutes),
            },
            _ => EffectiveProgress {
                source: Precedence::Local,
                snapped_position: local.snapped_position,
                remaining_km: local.remaining_km(),
                eta_minutes: local.eta_minutes,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{spawn_reporter, ProgressReporter, ReportError, ReporterOptions};
    use async_trait::async_trait;
    use std::sync::Arc;

    fn route() -> Route {
        Route::new(
            vec![
                Coordinate::new(24.7136, 46.6753),
                Coordinate::new(24.7150, 46.6800),
                Coordinate::new(24.7200, 46.6850),
            ],
            "15 mins",
            "1.3 km",
        )
    }

    fn fix(position: Coordinate) -> LocationSample {
        LocationSample::new(position, Utc::now()).with_speed(0.0)
    }

    struct FixedRemote;

    #[async_trait]
    impl ProgressReporter for FixedRemote {
        async fn init_route(&self, _route: &Route) -> Result<(), ReportError> {
            Ok(())
        }

        async fn location_update(
            &self,
            report: &ProgressReport,
        ) -> Result<RemoteProgress, ReportError> {
            Ok(RemoteProgress {
                snapped_position: None,
                remaining_km: 0.5,
                eta_minutes: 1,
                sample_timestamp: report.timestamp,
                received_at: Utc::now(),
            })
        }
    }

    #[test]
    fn invalid_route_aborts_session_start() {
        let route = Route::new(vec![Coordinate::new(24.7, 46.6)], "5 mins", "");
        let err = NavigationSession::open(route, StartMode::Immediate, &SessionOptions::default())
            .unwrap_err();
        assert_eq!(err, RouteError::TooFewWaypoints(1));
    }

    #[test]
    fn local_progress_drives_the_camera() {
        let mut session =
            NavigationSession::open(route(), StartMode::Immediate, &SessionOptions::default())
                .unwrap();
        let raw = Coordinate::new(24.7151, 46.6801);

        let update = session.ingest(fix(raw)).unwrap();
        let effective = update.effective.unwrap();
        assert_eq!(effective.source, Precedence::Local);
        assert_eq!(update.focus, Coordinate::new(24.7150, 46.6800));
        assert_eq!(update.display.position, raw);
        assert!(update.remote.is_none());
    }

    #[test]
    fn preview_focuses_on_the_raw_fix() {
        let mut session =
            NavigationSession::open(route(), StartMode::Preview, &SessionOptions::default())
                .unwrap();
        let raw = Coordinate::new(24.7151, 46.6801);

        let update = session.ingest(fix(raw)).unwrap();
        assert_eq!(update.mode, TrackerMode::Previewing);
        assert!(update.local.is_none());
        assert!(update.effective.is_none());
        assert_eq!(update.focus, raw);
    }

    #[test]
    fn permission_denied_is_terminal() {
        let mut session =
            NavigationSession::open(route(), StartMode::Immediate, &SessionOptions::default())
                .unwrap();

        assert_eq!(
            session.handle(LocationEvent::PermissionDenied),
            Err(TrackerError::LocationPermissionDenied)
        );
        assert_eq!(session.mode(), TrackerMode::Idle);
        assert_eq!(
            session.handle(LocationEvent::Fix(fix(Coordinate::new(24.7136, 46.6753)))),
            Err(TrackerError::LocationPermissionDenied)
        );
        assert_eq!(session.start(), Err(TrackerError::LocationPermissionDenied));
    }

    #[tokio::test]
    async fn remote_precedence_overrides_when_fresh() {
        let options = SessionOptions {
            precedence: Precedence::Remote,
            ..SessionOptions::default()
        };
        let mut session = NavigationSession::open(route(), StartMode::Immediate, &options)
            .unwrap();
        let handle = spawn_reporter(Arc::new(FixedRemote), route(), ReporterOptions::default());
        let mut rx = handle.subscribe();
        session = session.with_reporter(handle);

        let start = Coordinate::new(24.7136, 46.6753);
        let first = session.ingest(fix(start)).unwrap();
        assert_eq!(first.effective.unwrap().source, Precedence::Local);

        rx.changed().await.unwrap();
        let second = session.ingest(fix(start)).unwrap();
        let effective = second.effective.unwrap();
        assert_eq!(effective.source, Precedence::Remote);
        assert_eq!(effective.remaining_km, 0.5);
        assert_eq!(effective.eta_minutes, Some(1));
        assert_eq!(effective.snapped_position, start);
        assert!(second.local.unwrap().remaining_distance_m > 500.0);
    }

    #[tokio::test]
    async fn detached_session_falls_back_to_local() {
        let options = SessionOptions {
            precedence: Precedence::Remote,
            ..SessionOptions::default()
        };
        let handle = spawn_reporter(Arc::new(FixedRemote), route(), ReporterOptions::default());
        let mut rx = handle.subscribe();
        let mut session = NavigationSession::open(route(), StartMode::Immediate, &options)
            .unwrap()
            .with_reporter(handle);

        let start = Coordinate::new(24.7136, 46.6753);
        session.ingest(fix(start)).unwrap();
        rx.changed().await.unwrap();

        assert!(session.detach_reporter());
        assert!(!session.is_reporting());
        assert!(!session.detach_reporter());

        let update = session.ingest(fix(start)).unwrap();
        assert!(update.remote.is_none());
        assert_eq!(update.effective.unwrap().source, Precedence::Local);
    }

    #[tokio::test]
    async fn local_precedence_keeps_local_figures() {
        let mut session =
            NavigationSession::open(route(), StartMode::Immediate, &SessionOptions::default())
                .unwrap();
        let handle = spawn_reporter(Arc::new(FixedRemote), route(), ReporterOptions::default());
        let mut rx = handle.subscribe();
        session = session.with_reporter(handle);

        let start = Coordinate::new(24.7136, 46.6753);
        session.ingest(fix(start)).unwrap();
        rx.changed().await.unwrap();

        let update = session.ingest(fix(start)).unwrap();
        assert!(update.remote.is_some());
        assert_eq!(update.effective.unwrap().source, Precedence::Local);
    }
}
