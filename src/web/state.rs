use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{Config, ConfigError};
use crate::report::{HttpReporter, ProgressReporter, ReportError};
use crate::session::NavigationSession;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// One lock for the whole table; ingests on any session are serialized.
    pub sessions: Arc<Mutex<HashMap<Uuid, NavigationSession>>>,
    pub reporter: Option<Arc<dyn ProgressReporter>>,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, StateError> {
        let reporter: Option<Arc<dyn ProgressReporter>> =
            match (&config.reporting, config.reporter_options()?) {
                (Some(reporting), Some(options)) => {
                    log::info!("forwarding progress to {}", reporting.endpoint);
                    let reporter = HttpReporter::new(&reporting.endpoint, options.timeout)?;
                    Some(Arc::new(reporter) as Arc<dyn ProgressReporter>)
                }
                _ => None,
            };

        Ok(Self::with_reporter(config, reporter))
    }

    pub fn with_reporter(config: Config, reporter: Option<Arc<dyn ProgressReporter>>) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            reporter,
        }
    }

    /// Drop sessions nobody has driven for longer than `max_idle`. Returns how
    /// many were removed.
    pub async fn sweep_idle_sessions(&self, now: DateTime<Utc>, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let idle = (now - session.last_active()).to_std().unwrap_or_default();
            if idle > max_idle {
                log::info!("session {} idle for {:?}, dropping it", id, idle);
                session.stop();
                false
            } else {
                true
            }
        });
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::route::Route;
    use crate::session::SessionOptions;
    use crate::tracker::StartMode;

    #[test]
    fn reporter_only_when_configured() {
        let state = AppState::new(Config::default()).unwrap();
        assert!(state.reporter.is_none());

        let config = Config::from_yaml("reporting:\n  endpoint: http://127.0.0.1:8000\n").unwrap();
        let state = AppState::new(config).unwrap();
        assert!(state.reporter.is_some());
    }

    #[tokio::test]
    async fn sweep_drops_only_idle_sessions() {
        let state = AppState::new(Config::default()).unwrap();
        let route = Route::new(
            vec![Coordinate::new(24.7136, 46.6753), Coordinate::new(24.72, 46.685)],
            "10 mins",
            "",
        );
        let session =
            NavigationSession::open(route, StartMode::Immediate, &SessionOptions::default())
                .unwrap();
        let id = session.id();
        state.sessions.lock().await.insert(id, session);

        let max_idle = Duration::from_secs(30 * 60);
        assert_eq!(state.sweep_idle_sessions(Utc::now(), max_idle).await, 0);
        assert!(state.sessions.lock().await.contains_key(&id));

        let later = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(state.sweep_idle_sessions(later, max_idle).await, 1);
        assert!(state.sessions.lock().await.is_empty());
    }
}
