//! In-memory session store: one `Wizard` per browser session, nothing persisted.
//!
//! The store is guarded by a `std::sync::Mutex` that is never held across an `.await`.
//! Long-running work (model call, PDF export) is tracked with an `InFlight` guard that
//! clears its flag on drop, so a cancelled request cannot leave a session stuck loading.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::wizard::models::GeoPoint;
use crate::wizard::state_machine::Wizard;

/// Kinds of request that may be in flight at most once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Analysis,
    Export,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub wizard: Wizard,
    /// Best-effort geolocation; recorded at most once.
    pub location: Option<GeoPoint>,
    pub analysis_in_flight: bool,
    pub export_in_flight: bool,
    last_touched: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            wizard: Wizard::default(),
            location: None,
            analysis_in_flight: false,
            export_in_flight: false,
            last_touched: now,
        }
    }

    /// Rejects form edits and transitions while the model call is pending.
    pub fn ensure_idle(&self) -> Result<(), AppError> {
        if self.analysis_in_flight {
            Err(AppError::Conflict(
                "an analysis is already being generated for this session".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    /// Records the first valid location; anything after that, or invalid, is ignored.
    /// Returns whether the location was stored.
    pub fn record_location(&mut self, point: GeoPoint) -> bool {
        if self.location.is_some() || !point.is_valid() {
            return false;
        }
        self.location = Some(point);
        true
    }

    fn flag_mut(&mut self, activity: Activity) -> &mut bool {
        match activity {
            Activity::Analysis => &mut self.analysis_in_flight,
            Activity::Export => &mut self.export_in_flight,
        }
    }

    fn is_busy(&self) -> bool {
        self.analysis_in_flight || self.export_in_flight
    }
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes.max(1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        // Mutations are single field assignments, so a poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a fresh session at step 1 with default form values.
    /// Expired idle sessions are pruned first.
    pub fn create(&self) -> (Uuid, Session) {
        let now = Utc::now();
        let mut sessions = self.lock();

        let before = sessions.len();
        let cutoff = now - self.ttl;
        sessions.retain(|_, s| s.is_busy() || s.last_touched >= cutoff);
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(pruned, "Pruned expired wizard sessions");
        }

        let id = Uuid::new_v4();
        let session = Session::new(now);
        sessions.insert(id, session.clone());
        debug!(%id, active = sessions.len(), "Created wizard session");
        (id, session)
    }

    /// Runs `f` against the session under the lock and returns its result.
    /// The session is only touched when `f` succeeds.
    pub fn update<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        let out = f(session)?;
        session.last_touched = Utc::now();
        Ok(out)
    }

    /// Snapshot of the session.
    pub fn get(&self, id: Uuid) -> Result<Session, AppError> {
        self.update(id, |s| Ok(s.clone()))
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Marks `activity` as in flight for the session. Fails with `Conflict` when it already is.
    pub fn begin(&self, id: Uuid, activity: Activity) -> Result<InFlight, AppError> {
        self.update(id, |s| {
            let flag = s.flag_mut(activity);
            if *flag {
                return Err(AppError::Conflict(format!(
                    "{activity:?} already in progress for this session"
                )));
            }
            *flag = true;
            Ok(())
        })?;
        Ok(InFlight {
            store: self.clone(),
            id,
            activity,
        })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    fn backdate(&self, id: Uuid, by: Duration) {
        if let Some(s) = self.lock().get_mut(&id) {
            s.last_touched -= by;
        }
    }
}

/// Clears its in-flight flag when dropped.
pub struct InFlight {
    store: SessionStore,
    id: Uuid,
    activity: Activity,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(session) = self.store.lock().get_mut(&self.id) {
            *session.flag_mut(self.activity) = false;
        }
    }
}
