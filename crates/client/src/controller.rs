//! Roster controller
//!
//! Owns the client-side roster of one view and runs the upload workflow:
//! extract rows, normalize them, submit one batch, merge the outcome.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use roster_core::import::Upload;
use roster_core::member::{Identity, ImportOutcome};
use roster_core::roster::RosterState;
use roster_core::validate::ValidationPolicy;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::MembershipApi;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::poller::{PollHandle, Poller};
use crate::target::ImportTarget;

/// Result of a successful bulk import
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub upload_id: Uuid,
    /// Requests sent after validation
    pub submitted: usize,
    pub outcome: ImportOutcome,
    /// Message for the user, e.g. "2 students added successfully."
    pub summary: String,
    pub finished_at: DateTime<Utc>,
}

/// Clears the busy flag on every exit path
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Roster state plus the operations that are allowed to mutate it
pub struct RosterController {
    api: Arc<dyn MembershipApi>,
    target: ImportTarget,
    bulk_policy: ValidationPolicy,
    single_policy: ValidationPolicy,
    roster: Arc<RwLock<RosterState>>,
    busy: Arc<AtomicBool>,
    last_refreshed_at: Arc<RwLock<Option<DateTime<Utc>>>>,
    refresh_interval: Duration,
}

/// Apply a fetched list unless the roster changed (or an import started)
/// after the fetch was issued. Returns the resulting member count and
/// whether the fetched list was applied.
async fn apply_fetched(
    roster: &RwLock<RosterState>,
    busy: &AtomicBool,
    last_refreshed_at: &RwLock<Option<DateTime<Utc>>>,
    revision: u64,
    members: Vec<Identity>,
) -> (usize, bool) {
    let mut roster = roster.write().await;
    if busy.load(Ordering::Acquire) {
        debug!("Import in flight, discarding fetched roster");
        return (roster.len(), false);
    }
    if !roster.replace_if_unchanged(revision, members) {
        debug!(
            fetched_at = revision,
            current = roster.revision(),
            "Roster changed during fetch, discarding fetched roster"
        );
        return (roster.len(), false);
    }
    *last_refreshed_at.write().await = Some(Utc::now());
    (roster.len(), true)
}

impl RosterController {
    /// Create a controller with the target's default validation policies
    pub fn new(api: Arc<dyn MembershipApi>, target: ImportTarget) -> Self {
        Self {
            bulk_policy: target.bulk_policy(),
            single_policy: target.single_policy(),
            api,
            target,
            roster: Arc::new(RwLock::new(RosterState::new())),
            busy: Arc::new(AtomicBool::new(false)),
            last_refreshed_at: Arc::new(RwLock::new(None)),
            refresh_interval: ClientConfig::default().refresh_interval,
        }
    }

    /// Take the refresh period from a client config
    pub fn with_config(self, config: &ClientConfig) -> Self {
        self.with_refresh_interval(config.refresh_interval)
    }

    /// Period used by [`RosterController::start_refresh`]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Override the policy applied to uploaded files
    pub fn with_bulk_policy(mut self, policy: ValidationPolicy) -> Self {
        self.bulk_policy = policy;
        self
    }

    /// Override the policy applied to single adds
    pub fn with_single_policy(mut self, policy: ValidationPolicy) -> Self {
        self.single_policy = policy;
        self
    }

    pub fn target(&self) -> &ImportTarget {
        &self.target
    }

    /// True while a bulk import is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Snapshot of the current roster
    pub async fn roster(&self) -> RosterState {
        self.roster.read().await.clone()
    }

    pub async fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        *self.last_refreshed_at.read().await
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Initial fetch: replace the roster with the backend's list.
    ///
    /// If a local change lands while the fetch is in flight, the fetched
    /// list is dropped. Returns the roster size afterwards.
    pub async fn load(&self) -> Result<usize> {
        let revision = self.roster.read().await.revision();
        let members = self.api.fetch_roster(&self.target).await?;
        let (count, applied) = apply_fetched(
            &self.roster,
            &self.busy,
            &self.last_refreshed_at,
            revision,
            members,
        )
        .await;
        if applied {
            info!(members = count, "Roster loaded");
        }
        Ok(count)
    }

    /// Add one member typed in by the user.
    ///
    /// Validation failures return before any network call.
    pub async fn add_member(&self, email: &str, password: Option<&str>) -> Result<Identity> {
        let request = self.single_policy.request_for(email, password)?;
        let identity = self.api.add_member(&self.target, &request).await?;
        self.roster.write().await.push(identity.clone());
        info!(id = %identity.id, "Member added");
        Ok(identity)
    }

    /// Remove a member by id; the roster is untouched if the call fails
    pub async fn remove_member(&self, member_id: &str) -> Result<()> {
        self.api.remove_member(&self.target, member_id).await?;
        self.roster.write().await.remove_by_id(member_id);
        info!(id = member_id, "Member removed");
        Ok(())
    }

    /// Remove a member known only by email
    pub async fn remove_member_by_email(&self, email: &str) -> Result<()> {
        let member_id = {
            let roster = self.roster.read().await;
            roster
                .members()
                .iter()
                .find(|m| m.email.eq_ignore_ascii_case(email.trim()))
                .map(|m| m.id.clone())
        };
        let member_id = member_id.ok_or_else(|| {
            roster_core::Error::InvalidInput(format!("{} is not on this roster", email.trim()))
        })?;

        self.api.remove_member(&self.target, &member_id).await?;
        self.roster.write().await.remove_by_email(email.trim());
        info!(id = %member_id, "Member removed");
        Ok(())
    }

    /// Read a file from disk and import it
    pub async fn import_file(&self, path: impl AsRef<Path>) -> Result<ImportReport> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(ClientError::Busy)?;
        let upload = Upload::from_path(path).await?;
        self.run_import(&upload).await
    }

    /// Import an upload already held in memory.
    ///
    /// Rejected with `Busy` while another import from this controller is in
    /// flight.
    pub async fn import_upload(&self, upload: &Upload) -> Result<ImportReport> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(ClientError::Busy)?;
        self.run_import(upload).await
    }

    async fn run_import(&self, upload: &Upload) -> Result<ImportReport> {
        let upload_id = Uuid::new_v4();
        info!(%upload_id, file = upload.file_name(), "Starting roster import");

        let records = upload.extract()?;
        let requests = self.bulk_policy.normalize(&records)?;

        let outcome = match self.api.bulk_import(&self.target, &requests).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%upload_id, "Roster import failed: {}", e);
                return Err(e);
            }
        };

        self.roster
            .write()
            .await
            .append(outcome.added.iter().cloned());

        let summary = outcome.summary(self.target.kind());
        info!(
            %upload_id,
            added = outcome.added_count(),
            skipped = outcome.skipped_count(),
            "Roster import finished"
        );

        Ok(ImportReport {
            upload_id,
            submitted: requests.len(),
            outcome,
            summary,
            finished_at: Utc::now(),
        })
    }

    /// Keep the roster in sync with the backend every `refresh_interval`
    /// until the handle is stopped or dropped.
    ///
    /// Ticks that land during a bulk import are skipped, and a fetch that
    /// overlaps any local change is discarded.
    pub fn start_refresh(&self) -> Result<PollHandle> {
        let api = Arc::clone(&self.api);
        let target = self.target.clone();
        let roster = Arc::clone(&self.roster);
        let busy = Arc::clone(&self.busy);
        let last_refreshed_at = Arc::clone(&self.last_refreshed_at);

        Poller::spawn("roster-refresh", self.refresh_interval, move || {
            let api = Arc::clone(&api);
            let target = target.clone();
            let roster = Arc::clone(&roster);
            let busy = Arc::clone(&busy);
            let last_refreshed_at = Arc::clone(&last_refreshed_at);

            async move {
                if busy.load(Ordering::Acquire) {
                    debug!("Import in flight, skipping roster refresh");
                    return;
                }
                let revision = roster.read().await.revision();
                match api.fetch_roster(&target).await {
                    Ok(members) => {
                        apply_fetched(&roster, &busy, &last_refreshed_at, revision, members).await;
                    }
                    Err(e) => warn!("Roster refresh failed: {}", e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use roster_core::member::MembershipRequest;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    use super::*;

    /// In-memory backend that records every call
    #[derive(Default)]
    struct FakeApi {
        calls: AtomicUsize,
        submitted: Mutex<Vec<Vec<MembershipRequest>>>,
        server_roster: Mutex<Vec<Identity>>,
        skip: Vec<String>,
        fail_with: Option<String>,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
        fetch_gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl FakeApi {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn failure(&self) -> Option<ClientError> {
            self.fail_with
                .as_ref()
                .map(|message| ClientError::submission_failed(message.clone(), Some(500)))
        }
    }

    #[async_trait]
    impl MembershipApi for FakeApi {
        async fn fetch_roster(&self, _target: &ImportTarget) -> Result<Vec<Identity>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Snapshot first so the gated response is the pre-mutation list
            let members = self.server_roster.lock().unwrap().clone();
            if let Some((started, release)) = &self.fetch_gate {
                started.notify_one();
                release.notified().await;
            }
            Ok(members)
        }

        async fn add_member(
            &self,
            _target: &ImportTarget,
            request: &MembershipRequest,
        ) -> Result<Identity> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = self.failure() {
                return Err(e);
            }
            Ok(Identity::new(format!("id-{}", request.email), request.email.clone()))
        }

        async fn remove_member(&self, _target: &ImportTarget, _member_id: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failure() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn bulk_import(
            &self,
            _target: &ImportTarget,
            requests: &[MembershipRequest],
        ) -> Result<ImportOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.submitted.lock().unwrap().push(requests.to_vec());

            if let Some((started, release)) = &self.gate {
                started.notify_one();
                release.notified().await;
            }
            if let Some(e) = self.failure() {
                return Err(e);
            }

            let (skipped, added): (Vec<_>, Vec<_>) = requests
                .iter()
                .partition(|r| self.skip.contains(&r.email));
            Ok(ImportOutcome::new(
                added
                    .into_iter()
                    .map(|r| Identity::new(format!("id-{}", r.email), r.email.clone()))
                    .collect(),
                skipped.into_iter().map(|r| r.email.clone()).collect(),
            ))
        }
    }

    fn class_target() -> ImportTarget {
        ImportTarget::class_roster("c1", "s1")
    }

    fn controller(api: &Arc<FakeApi>, target: ImportTarget) -> RosterController {
        RosterController::new(Arc::clone(api) as Arc<dyn MembershipApi>, target)
    }

    fn csv_upload(content: &str) -> Upload {
        Upload::new("roster.csv", content.as_bytes().to_vec())
    }

    fn xlsx_upload(rows: &[&[&str]]) -> Upload {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                worksheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
        Upload::new("roster.xlsx", workbook.save_to_buffer().unwrap())
    }

    #[tokio::test]
    async fn test_import_appends_added_members() {
        let api = Arc::new(FakeApi {
            server_roster: Mutex::new(vec![Identity::new("c", "c@x.com")]),
            skip: vec!["b@x.com".to_string()],
            ..Default::default()
        });
        let controller = controller(&api, class_target());
        controller.load().await.unwrap();

        let report = controller
            .import_upload(&csv_upload("email\na@x.com\nb@x.com\nnot-an-email\n"))
            .await
            .unwrap();

        assert_eq!(report.submitted, 2);
        assert_eq!(
            report.summary,
            "1 student added successfully. 1 email skipped (already enrolled or invalid)."
        );

        let emails: Vec<_> = controller
            .roster()
            .await
            .members()
            .iter()
            .map(|m| m.email.clone())
            .collect();
        assert_eq!(emails, vec!["c@x.com", "a@x.com"]);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_xlsx_import_sends_email_only_requests() {
        let api = Arc::new(FakeApi::default());
        let controller = controller(&api, class_target());

        controller
            .import_upload(&xlsx_upload(&[&["name", "email"], &["Jane", "jane@x.com"]]))
            .await
            .unwrap();

        let submitted = api.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0], vec![MembershipRequest::new("jane@x.com")]);
    }

    #[tokio::test]
    async fn test_missing_xlsx_column_makes_no_calls() {
        let api = Arc::new(FakeApi::default());
        let controller = controller(&api, class_target());

        let err = controller
            .import_upload(&xlsx_upload(&[&["name", "mail"], &["Jane", "jane@x.com"]]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Import(roster_core::Error::MissingColumn(_))
        ));
        assert_eq!(api.calls(), 0);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_no_valid_rows_makes_no_calls() {
        let api = Arc::new(FakeApi::default());
        let controller = controller(&api, ImportTarget::Accounts);

        // Passwords are required for accounts and both are too short
        let err = controller
            .import_upload(&csv_upload("email,password\na@x.com,123\nb@x.com,\n"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Import(roster_core::Error::NoValidRows { checked: 2 })
        ));
        assert_eq!(api.calls(), 0);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_unsupported_format_makes_no_calls() {
        let api = Arc::new(FakeApi::default());
        let controller = controller(&api, class_target());

        let err = controller
            .import_upload(&Upload::new("roster.pdf", b"%PDF".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Import(roster_core::Error::UnsupportedFormat(_))
        ));
        assert!(err.is_local());
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_submission_leaves_roster_unchanged() {
        let api = Arc::new(FakeApi {
            server_roster: Mutex::new(vec![Identity::new("c", "c@x.com")]),
            fail_with: Some("Class is archived".to_string()),
            ..Default::default()
        });
        let controller = controller(&api, class_target());
        controller.load().await.unwrap();
        let before = controller.roster().await;

        let err = controller
            .import_upload(&csv_upload("email\na@x.com\n"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Class is archived");
        assert_eq!(controller.roster().await, before);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_second_click_while_in_flight_is_rejected() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let api = Arc::new(FakeApi {
            gate: Some((Arc::clone(&started), Arc::clone(&release))),
            ..Default::default()
        });
        let controller = Arc::new(controller(&api, class_target()));
        let upload = csv_upload("email\na@x.com\n");

        let first = {
            let controller = Arc::clone(&controller);
            let upload = upload.clone();
            tokio::spawn(async move { controller.import_upload(&upload).await })
        };

        started.notified().await;
        assert!(controller.is_busy());
        assert!(matches!(
            controller.import_upload(&upload).await,
            Err(ClientError::Busy)
        ));

        release.notify_one();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.outcome.added_count(), 1);
        assert_eq!(api.calls(), 1);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_import_file_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("students.csv");
        tokio::fs::write(&path, "email\nA@X.com\n").await.unwrap();

        let api = Arc::new(FakeApi::default());
        let controller = controller(&api, class_target());
        let report = controller.import_file(&path).await.unwrap();

        assert_eq!(report.outcome.added[0].email, "a@x.com");
        assert!(controller.import_file(temp_dir.path().join("gone.csv")).await.is_err());
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_single_add_uses_stricter_policy() {
        let api = Arc::new(FakeApi::default());
        let controller = controller(&api, class_target());

        let err = controller
            .add_member("student@school.edu", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Import(roster_core::Error::InvalidInput(_))
        ));
        assert_eq!(api.calls(), 0);

        let added = controller.add_member(" Student@Gmail.com ", None).await.unwrap();
        assert_eq!(added.email, "student@gmail.com");
        assert_eq!(controller.roster().await.len(), 1);
    }

    #[tokio::test]
    async fn test_single_policy_is_configurable() {
        let api = Arc::new(FakeApi::default());
        let controller = controller(&api, class_target())
            .with_single_policy(ValidationPolicy::bulk_enrollment());

        assert!(controller.add_member("student@school.edu", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_member() {
        let api = Arc::new(FakeApi {
            server_roster: Mutex::new(vec![
                Identity::new("1", "a@x.com"),
                Identity::new("2", "b@x.com"),
            ]),
            ..Default::default()
        });
        let controller = controller(&api, class_target());
        controller.load().await.unwrap();

        controller.remove_member("1").await.unwrap();
        controller.remove_member_by_email("B@x.com").await.unwrap();
        assert!(controller.roster().await.is_empty());

        assert!(controller.remove_member_by_email("zed@x.com").await.is_err());
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_member() {
        let api = Arc::new(FakeApi {
            server_roster: Mutex::new(vec![Identity::new("1", "a@x.com")]),
            fail_with: Some("Not allowed".to_string()),
            ..Default::default()
        });
        let controller = controller(&api, class_target());
        controller.load().await.unwrap();

        assert!(controller.remove_member("1").await.is_err());
        assert_eq!(controller.roster().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_replaces_roster() {
        let api = Arc::new(FakeApi {
            server_roster: Mutex::new(vec![Identity::new("1", "a@x.com")]),
            ..Default::default()
        });
        let controller = controller(&api, class_target())
            .with_config(&ClientConfig::default().with_refresh_interval(Duration::from_secs(5)));
        assert!(controller.last_refreshed_at().await.is_none());
        assert_eq!(controller.refresh_interval(), Duration::from_secs(5));

        let handle = controller.start_refresh().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(controller.roster().await.len(), 1);

        api.server_roster
            .lock()
            .unwrap()
            .push(Identity::new("2", "b@x.com"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.roster().await.len(), 2);
        assert!(controller.last_refreshed_at().await.is_some());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_started_before_import_keeps_imported_members() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let api = Arc::new(FakeApi {
            server_roster: Mutex::new(vec![Identity::new("c", "c@x.com")]),
            fetch_gate: Some((Arc::clone(&started), Arc::clone(&release))),
            ..Default::default()
        });
        let controller = controller(&api, class_target())
            .with_refresh_interval(Duration::from_secs(5));

        let handle = controller.start_refresh().unwrap();
        started.notified().await;

        // The import lands while the refresh's fetch is still outstanding
        controller
            .import_upload(&csv_upload("email\na@x.com\n"))
            .await
            .unwrap();
        release.notify_one();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let roster = controller.roster().await;
        assert!(roster.contains_email("a@x.com"));
        assert!(!roster.contains_email("c@x.com"));
        assert!(controller.last_refreshed_at().await.is_none());

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_load_overlapping_add_keeps_added_member() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let api = Arc::new(FakeApi {
            server_roster: Mutex::new(vec![Identity::new("c", "c@x.com")]),
            fetch_gate: Some((Arc::clone(&started), Arc::clone(&release))),
            ..Default::default()
        });
        let controller = Arc::new(controller(&api, class_target()));

        let load = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.load().await })
        };
        started.notified().await;

        controller.add_member("new@gmail.com", None).await.unwrap();
        release.notify_one();

        assert_eq!(load.await.unwrap().unwrap(), 1);
        let emails: Vec<_> = controller
            .roster()
            .await
            .members()
            .iter()
            .map(|m| m.email.clone())
            .collect();
        assert_eq!(emails, vec!["new@gmail.com"]);
    }

    #[tokio::test]
    async fn test_zero_refresh_interval_is_rejected() {
        let api = Arc::new(FakeApi::default());
        let controller = controller(&api, class_target()).with_refresh_interval(Duration::ZERO);

        assert!(matches!(
            controller.start_refresh(),
            Err(ClientError::Config(_))
        ));
        assert_eq!(api.calls(), 0);
    }
}
