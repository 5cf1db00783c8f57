//! Client-side roster store.
//!
//! Holds the session's view of the students collection. The list is only ever
//! replaced wholesale by a successful `list()` response; mutations go to the
//! server first and are followed by a refresh, never patched in locally.
//!
//! Concurrent mutations are not serialized: whichever refresh resolves last wins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::client::{ApiError, StudentsApi};
use crate::models::{StudentFilter, StudentFormData, StudentRecord, StudentUpdate};

/// What consumers render from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterSnapshot {
    /// Records from the last successful refresh, in server order.
    pub records: Arc<[StudentRecord]>,
    /// Set when the most recent refresh failed, cleared by the next success.
    pub refresh_error: Option<ApiError>,
}

impl Default for RosterSnapshot {
    fn default() -> Self {
        Self {
            records: Arc::from(Vec::new()),
            refresh_error: None,
        }
    }
}

/// Shared store handed to every console view.
pub struct StudentStore<C> {
    api: C,
    state: watch::Sender<RosterSnapshot>,
    refreshes_in_flight: AtomicUsize,
}

struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<C: StudentsApi> StudentStore<C> {
    /// Create an empty store. Call [`refresh`](Self::refresh) to load the roster.
    pub fn new(api: C) -> Self {
        let (state, _) = watch::channel(RosterSnapshot::default());
        Self {
            api,
            state,
            refreshes_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn records(&self) -> Arc<[StudentRecord]> {
        self.state.borrow().records.clone()
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        self.state.borrow().clone()
    }

    /// Error from the most recent refresh, if it failed.
    pub fn refresh_error(&self) -> Option<ApiError> {
        self.state.borrow().refresh_error.clone()
    }

    /// True while at least one refresh is outstanding.
    pub fn is_loading(&self) -> bool {
        self.refreshes_in_flight.load(Ordering::SeqCst) > 0
    }

    /// Receiver that is notified whenever a refresh completes.
    pub fn subscribe(&self) -> watch::Receiver<RosterSnapshot> {
        self.state.subscribe()
    }

    /// Look a student up in the local snapshot.
    pub fn find(&self, id: i64) -> Option<StudentRecord> {
        self.state
            .borrow()
            .records
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// Client-side filtered view of the local snapshot.
    pub fn filtered(&self, filter: &StudentFilter) -> Vec<StudentRecord> {
        filter.apply(&self.state.borrow().records)
    }

    /// Re-fetch the whole collection and replace the local list.
    ///
    /// On failure the previous records are kept and the error is returned.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let _loading = LoadingGuard::enter(&self.refreshes_in_flight);

        match self.api.list(&StudentFilter::default()).await {
            Ok(students) => {
                tracing::debug!(count = students.len(), "roster refreshed");
                self.state.send_replace(RosterSnapshot {
                    records: Arc::from(students),
                    refresh_error: None,
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("roster refresh failed: {}", e);
                self.state
                    .send_modify(|snapshot| snapshot.refresh_error = Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Register a student, then refresh.
    ///
    /// Returns the server's record. A failed create is returned as-is and skips
    /// the refresh.
    pub async fn add(&self, form: &StudentFormData) -> Result<StudentRecord, ApiError> {
        let created = self.api.create(form).await?;
        tracing::info!(id = created.id, "student registered");
        self.refresh_after_mutation("add").await;
        Ok(created)
    }

    /// Update a student (full form data or a partial update), then refresh.
    pub async fn update(
        &self,
        id: i64,
        update: impl Into<StudentUpdate>,
    ) -> Result<StudentRecord, ApiError> {
        let update = update.into();
        let updated = self.api.update(id, &update).await?;
        tracing::info!(id, "student updated");
        self.refresh_after_mutation("update").await;
        Ok(updated)
    }

    /// Delete a student, then refresh.
    ///
    /// A student that is already gone counts as removed.
    pub async fn remove(&self, id: i64) -> Result<(), ApiError> {
        match self.api.delete(id).await {
            Ok(()) => tracing::info!(id, "student removed"),
            Err(e) if e.is_not_found() => tracing::debug!(id, "student already absent"),
            Err(e) => return Err(e),
        }
        self.refresh_after_mutation("remove").await;
        Ok(())
    }

    /// The mutation already succeeded, so a failed refresh is logged and kept in
    /// the snapshot instead of being returned.
    async fn refresh_after_mutation(&self, operation: &'static str) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(operation, "refresh after mutation failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiErrorKind;
    use crate::models::{ClassSection, YearLevel};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::{oneshot, Mutex};

    /// In-memory collection resource with switchable failures.
    #[derive(Default)]
    struct FakeApi {
        students: Mutex<Vec<StudentRecord>>,
        next_id: AtomicUsize,
        fail_list: AtomicBool,
        fail_mutations: AtomicBool,
        list_calls: AtomicUsize,
        /// Each `list` call takes the next gate and answers with whatever is sent on it.
        list_gates: std::sync::Mutex<VecDeque<oneshot::Receiver<Vec<StudentRecord>>>>,
    }

    impl FakeApi {
        fn gated(&self) -> oneshot::Sender<Vec<StudentRecord>> {
            let (tx, rx) = oneshot::channel();
            self.list_gates.lock().unwrap().push_back(rx);
            tx
        }
    }

    fn rejected(message: &str) -> ApiError {
        ApiError::new(ApiErrorKind::Rejected { status: 400 }, message)
    }

    fn not_found() -> ApiError {
        ApiError::new(ApiErrorKind::NotFound, "Student not found")
    }

    #[async_trait]
    impl StudentsApi for FakeApi {
        async fn list(&self, filter: &StudentFilter) -> Result<Vec<StudentRecord>, ApiError> {
            let gate = self.list_gates.lock().unwrap().pop_front();
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = gate {
                return gate.await.map_err(|_| {
                    ApiError::new(ApiErrorKind::Transport, "Failed to fetch students")
                });
            }
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(ApiError::new(
                    ApiErrorKind::Transport,
                    "Failed to fetch students",
                ));
            }
            Ok(filter.apply(&self.students.lock().await))
        }

        async fn get(&self, id: i64) -> Result<StudentRecord, ApiError> {
            self.students
                .lock()
                .await
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or_else(not_found)
        }

        async fn create(&self, form: &StudentFormData) -> Result<StudentRecord, ApiError> {
            if self.fail_mutations.load(Ordering::SeqCst) {
                return Err(rejected("Email already registered"));
            }
            let id = 100 + self.next_id.fetch_add(1, Ordering::SeqCst) as i64;
            let record = StudentRecord {
                id,
                first_name: form.first_name.clone(),
                last_name: form.last_name.clone(),
                email: form.email.clone(),
                enrollment_year: form.enrollment_year,
                dob: form.dob.clone(),
                major: form.major.clone(),
                class_section: form.class_section,
                year: form.year,
                photo: form.photo.clone(),
                documents: form.documents.clone(),
            };
            self.students.lock().await.push(record.clone());
            Ok(record)
        }

        async fn update(
            &self,
            id: i64,
            update: &StudentUpdate,
        ) -> Result<StudentRecord, ApiError> {
            if self.fail_mutations.load(Ordering::SeqCst) {
                return Err(rejected("Failed to update student"));
            }
            let mut students = self.students.lock().await;
            let student = students
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(not_found)?;
            if let Some(major) = &update.major {
                student.major = major.clone();
            }
            if let Some(first_name) = &update.first_name {
                student.first_name = first_name.clone();
            }
            Ok(student.clone())
        }

        async fn delete(&self, id: i64) -> Result<(), ApiError> {
            if self.fail_mutations.load(Ordering::SeqCst) {
                return Err(rejected("Failed to delete student"));
            }
            let mut students = self.students.lock().await;
            let before = students.len();
            students.retain(|s| s.id != id);
            if students.len() == before {
                return Err(not_found());
            }
            Ok(())
        }
    }

    fn form(first_name: &str, email: &str) -> StudentFormData {
        StudentFormData {
            first_name: first_name.to_string(),
            last_name: "Lee".to_string(),
            email: email.to_string(),
            enrollment_year: 2024,
            dob: Some("2005-01-01".to_string()),
            major: None,
            class_section: ClassSection::A,
            year: YearLevel::First,
            photo: None,
            documents: None,
        }
    }

    #[tokio::test]
    async fn test_add_uses_server_id_and_refreshes() {
        let store = StudentStore::new(FakeApi::default());

        let created = store.add(&form("Ann", "a@x.com")).await.unwrap();

        assert_eq!(created.id, 100);
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 100);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_records_match_server_after_mutations() {
        let store = StudentStore::new(FakeApi::default());

        let ann = store.add(&form("Ann", "a@x.com")).await.unwrap();
        let bob = store.add(&form("Bob", "b@x.com")).await.unwrap();
        let mut changed = StudentFormData::from_record(&ann);
        changed.major = Some("Physics".to_string());
        store.update(ann.id, changed).await.unwrap();
        store.remove(bob.id).await.unwrap();

        let server = store.api.list(&StudentFilter::default()).await.unwrap();
        assert_eq!(&*store.records(), server.as_slice());
        assert_eq!(store.find(ann.id).unwrap().major.as_deref(), Some("Physics"));
        assert!(store.find(bob.id).is_none());
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_records_and_skips_refresh() {
        let store = StudentStore::new(FakeApi::default());
        let ann = store.add(&form("Ann", "a@x.com")).await.unwrap();
        let before = store.records();
        let list_calls = store.api.list_calls.load(Ordering::SeqCst);

        store.api.fail_mutations.store(true, Ordering::SeqCst);
        let err = store.add(&form("Ann", "a@x.com")).await.unwrap_err();
        assert_eq!(err.message, "Email already registered");
        assert!(store.update(ann.id, form("X", "x@x.com")).await.is_err());
        assert!(store.remove(ann.id).await.is_err());

        assert_eq!(store.records(), before);
        assert_eq!(store.api.list_calls.load(Ordering::SeqCst), list_calls);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_good_records() {
        let store = StudentStore::new(FakeApi::default());
        store.add(&form("Ann", "a@x.com")).await.unwrap();
        let before = store.records();

        store.api.fail_list.store(true, Ordering::SeqCst);
        let err = store.refresh().await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Transport);
        assert_eq!(store.records(), before);
        assert_eq!(store.refresh_error(), Some(err));
        assert!(!store.is_loading());

        // The mutation itself still succeeds when only its refresh fails
        let bob = store.add(&form("Bob", "b@x.com")).await.unwrap();
        assert!(store.find(bob.id).is_none());

        store.api.fail_list.store(false, Ordering::SeqCst);
        store.refresh().await.unwrap();
        assert!(store.find(bob.id).is_some());
        assert_eq!(store.refresh_error(), None);
    }

    #[tokio::test]
    async fn test_remove_treats_missing_student_as_removed() {
        let store = StudentStore::new(FakeApi::default());
        let ann = store.add(&form("Ann", "a@x.com")).await.unwrap();
        store.remove(ann.id).await.unwrap();
        let list_calls = store.api.list_calls.load(Ordering::SeqCst);

        store.remove(ann.id).await.unwrap();
        assert!(store.records().is_empty());
        assert_eq!(store.api.list_calls.load(Ordering::SeqCst), list_calls + 1);
    }

    #[tokio::test]
    async fn test_refresh_twice_is_stable_and_notifies_subscribers() {
        let store = StudentStore::new(FakeApi::default());
        store.add(&form("Ann", "a@x.com")).await.unwrap();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.refresh().await.unwrap();
        let first = store.records();
        store.refresh().await.unwrap();
        assert_eq!(store.records(), first);

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().records, first);
    }

    #[tokio::test]
    async fn test_filtered_view() {
        let store = StudentStore::new(FakeApi::default());
        store.add(&form("Ann", "a@x.com")).await.unwrap();
        let mut graduate = form("Gia", "g@x.com");
        graduate.year = YearLevel::Graduate;
        store.add(&graduate).await.unwrap();

        let filter = StudentFilter::new(Some(YearLevel::Graduate), None);
        let view = store.filtered(&filter);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].first_name, "Gia");
    }

    async fn wait_for_list_calls(store: &StudentStore<FakeApi>, calls: usize) {
        while store.api.list_calls.load(Ordering::SeqCst) < calls {
            tokio::task::yield_now().await;
        }
    }

    fn record(id: i64, first_name: &str) -> StudentRecord {
        let form = form(first_name, &format!("{}@x.com", first_name.to_lowercase()));
        StudentRecord {
            id,
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
            enrollment_year: form.enrollment_year,
            dob: form.dob,
            major: form.major,
            class_section: form.class_section,
            year: form.year,
            photo: None,
            documents: None,
        }
    }

    #[tokio::test]
    async fn test_loading_while_refresh_in_flight() {
        let store = Arc::new(StudentStore::new(FakeApi::default()));
        let gate = store.api.gated();
        assert!(!store.is_loading());

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.refresh().await }
        });
        wait_for_list_calls(&store, 1).await;
        assert!(store.is_loading());
        assert!(store.records().is_empty());

        gate.send(vec![record(1, "Ann")]).unwrap();
        pending.await.unwrap().unwrap();
        assert!(!store.is_loading());
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_last_to_resolve_wins() {
        let store = Arc::new(StudentStore::new(FakeApi::default()));
        let first_gate = store.api.gated();
        let second_gate = store.api.gated();

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.refresh().await }
        });
        wait_for_list_calls(&store, 1).await;
        let second = tokio::spawn({
            let store = store.clone();
            async move { store.refresh().await }
        });
        wait_for_list_calls(&store, 2).await;
        assert!(store.is_loading());

        // The later request answers first
        let newer = vec![record(1, "Ann"), record(2, "Bob")];
        second_gate.send(newer.clone()).unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(&*store.records(), newer.as_slice());
        assert!(store.is_loading());

        let older = vec![record(1, "Ann")];
        first_gate.send(older.clone()).unwrap();
        first.await.unwrap().unwrap();
        assert_eq!(&*store.records(), older.as_slice());
        assert!(!store.is_loading());
        assert_eq!(store.refreshes_in_flight.load(Ordering::SeqCst), 0);
    }
}
