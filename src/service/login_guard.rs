use crate::error::BookingError;

use chrono::{DateTime, Duration, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Failed-login threshold and lockout window.
#[derive(Debug, Clone, Copy)]
pub struct LoginPolicy {
    pub max_attempts: u32,
    pub lockout: Duration,
}

/// Per-IP entry of the lockout file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(default)]
    pub attempts: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
}

/// The attempts map and its rules, independent of the actor and the clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptBook {
    records: BTreeMap<String, AttemptRecord>,
}

impl AttemptBook {
    pub fn from_records(records: BTreeMap<String, AttemptRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &BTreeMap<String, AttemptRecord> {
        &self.records
    }

    /// Remaining lock time for `ip`. An expired lock forgets the IP entirely;
    /// the second value reports whether the book changed.
    pub fn locked_remaining(&mut self, ip: IpAddr, now: DateTime<Utc>) -> (Option<Duration>, bool) {
        let key = ip.to_string();
        let Some(until) = self.records.get(&key).and_then(|r| r.locked_until) else {
            return (None, false);
        };
        if now < until {
            (Some(until - now), false)
        } else {
            self.records.remove(&key);
            (None, true)
        }
    }

    /// Record a failure; returns true when this failure locks the IP.
    pub fn record_failure(&mut self, ip: IpAddr, now: DateTime<Utc>, policy: LoginPolicy) -> bool {
        let record = self.records.entry(ip.to_string()).or_default();
        record.attempts.retain(|t| now - *t < policy.lockout);
        record.attempts.push(now);

        if record.attempts.len() >= policy.max_attempts.max(1) as usize {
            record.locked_until = Some(now + policy.lockout);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self, ip: IpAddr) -> bool {
        self.records.remove(&ip.to_string()).is_some()
    }

    pub fn locked_count(&self, now: DateTime<Utc>) -> usize {
        self.records
            .values()
            .filter(|r| r.locked_until.is_some_and(|until| now < until))
            .count()
    }
}

/// Whole minutes left on a lock, rounded up so a live lock never reads as 0.
pub fn remaining_minutes(remaining: Duration) -> i64 {
    let secs = remaining.num_seconds().max(0);
    ((secs + 59) / 60).max(1)
}

#[derive(Debug)]
pub enum LoginGuardMessage {
    /// Remaining lock time, if the IP is locked.
    CheckLocked(IpAddr, RpcReplyPort<Option<Duration>>),
    /// Record a failed login; replies whether the IP is now locked.
    RecordFailure(IpAddr, RpcReplyPort<bool>),
    /// Forget the IP after a successful login.
    Clear(IpAddr),
    /// Number of IPs currently locked.
    LockedCount(RpcReplyPort<usize>),
}

/// Handle for interacting with the login guard actor.
#[derive(Clone)]
pub struct LoginGuardHandle {
    actor: ActorRef<LoginGuardMessage>,
    policy: LoginPolicy,
}

impl LoginGuardHandle {
    pub fn policy(&self) -> LoginPolicy {
        self.policy
    }

    pub async fn locked_remaining(&self, ip: IpAddr) -> Result<Option<Duration>, BookingError> {
        ractor::call!(self.actor, LoginGuardMessage::CheckLocked, ip)
            .map_err(|e| BookingError::RactorError(format!("CheckLocked RPC failed: {e}")))
    }

    pub async fn record_failure(&self, ip: IpAddr) -> Result<bool, BookingError> {
        ractor::call!(self.actor, LoginGuardMessage::RecordFailure, ip)
            .map_err(|e| BookingError::RactorError(format!("RecordFailure RPC failed: {e}")))
    }

    pub async fn clear(&self, ip: IpAddr) {
        let _ = ractor::cast!(self.actor, LoginGuardMessage::Clear(ip));
    }

    pub async fn locked_count(&self) -> Result<usize, BookingError> {
        ractor::call!(self.actor, LoginGuardMessage::LockedCount)
            .map_err(|e| BookingError::RactorError(format!("LockedCount RPC failed: {e}")))
    }
}

struct LoginGuardState {
    book: AttemptBook,
    policy: LoginPolicy,
    path: PathBuf,
}

impl LoginGuardState {
    /// Write the whole book to a temp file and move it over the lockout file.
    async fn persist(&self) {
        if let Err(e) = write_lockout_file(&self.path, self.book.records()).await {
            warn!(path = %self.path.display(), error = %e, "failed to persist lockout file");
        }
    }
}

struct LoginGuardActor;

#[ractor::async_trait]
impl Actor for LoginGuardActor {
    type Msg = LoginGuardMessage;
    type State = LoginGuardState;
    type Arguments = (LoginPolicy, PathBuf);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        (policy, path): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let book = AttemptBook::from_records(read_lockout_file(&path).await);
        info!(
            path = %path.display(),
            tracked_ips = book.records().len(),
            max_attempts = policy.max_attempts,
            lockout_minutes = policy.lockout.num_minutes(),
            "LoginGuard started"
        );
        Ok(LoginGuardState { book, policy, path })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let now = Utc::now();
        match message {
            LoginGuardMessage::CheckLocked(ip, rp) => {
                let (remaining, changed) = state.book.locked_remaining(ip, now);
                if changed {
                    debug!(ip = %ip, "lockout expired");
                    state.persist().await;
                }
                let _ = rp.send(remaining);
            }
            LoginGuardMessage::RecordFailure(ip, rp) => {
                let locked = state.book.record_failure(ip, now, state.policy);
                if locked {
                    warn!(
                        ip = %ip,
                        lockout_minutes = state.policy.lockout.num_minutes(),
                        "IP locked after repeated failed admin logins"
                    );
                } else {
                    info!(ip = %ip, "failed admin login recorded");
                }
                state.persist().await;
                let _ = rp.send(locked);
            }
            LoginGuardMessage::Clear(ip) => {
                if state.book.clear(ip) {
                    state.persist().await;
                }
            }
            LoginGuardMessage::LockedCount(rp) => {
                let _ = rp.send(state.book.locked_count(now));
            }
        }
        Ok(())
    }
}

/// Spawn the guard, loading any existing lockout file at `path`.
pub async fn spawn(policy: LoginPolicy, path: PathBuf) -> Result<LoginGuardHandle, BookingError> {
    let (actor, _jh) = Actor::spawn(None, LoginGuardActor, (policy, path))
        .await
        .map_err(|e| BookingError::RactorError(format!("LoginGuard spawn failed: {e}")))?;
    Ok(LoginGuardHandle { actor, policy })
}

async fn read_lockout_file(path: &Path) -> BTreeMap<String, AttemptRecord> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read lockout file; starting empty");
            return BTreeMap::new();
        }
    };
    serde_json::from_str(&contents)
        .inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "corrupt lockout file; starting empty");
        })
        .unwrap_or_default()
}

async fn write_lockout_file(
    path: &Path,
    records: &BTreeMap<String, AttemptRecord>,
) -> Result<(), BookingError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
