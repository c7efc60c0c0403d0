//! Local replica of the remote course collection.
//!
//! The mirror keeps the confirmed state (last snapshot, or the seed list when
//! that snapshot was empty, plus every write the remote store has accepted
//! since) and the writes still in flight. Readers see the confirmed state
//! with in-flight writes replayed on top. Writes are optimistic: they are
//! applied locally, recorded in the pending ledger, then sent to the remote
//! store together with the confirmed version. Once the remote store answers,
//! the write leaves the in-flight list and the course is rebuilt, so a
//! rejected write falls back to the confirmed value without undoing other
//! writes that are still pending.

pub mod pending;
pub mod subscription;

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    CalendarEvent, CourseField, CourseRecord, DiscussionMessage, GradeSubmissionRequest,
    JoinClassRequest, Module, NewCalendarEvent, NewCourseRequest, NewDiscussionMessage, Student,
    SubmitAssignmentRequest, Submission, UpdateCourseRequest,
};
use crate::remote::RemoteStore;

pub use pending::{PendingKind, PendingLedger, PendingOperation};
pub use subscription::Subscription;

const JOIN_CODE_LEN: usize = 6;
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub struct CourseMirror {
    remote: Arc<dyn RemoteStore>,
    seed: Vec<CourseRecord>,
    state: RwLock<MirrorState>,
    pending: Mutex<PendingLedger>,
}

struct FieldWrite {
    op: Uuid,
    course_id: String,
    fields: Vec<CourseField>,
}

struct MirrorState {
    confirmed: Vec<CourseRecord>,
    /// In issue order.
    in_flight: Vec<FieldWrite>,
    /// `confirmed` with `in_flight` applied.
    courses: Vec<CourseRecord>,
}

impl MirrorState {
    fn new(courses: Vec<CourseRecord>) -> Self {
        Self {
            confirmed: courses.clone(),
            in_flight: Vec::new(),
            courses,
        }
    }

    fn confirmed_version(&self, id: &str) -> Option<u64> {
        self.confirmed.iter().find(|c| c.id == id).map(|c| c.version)
    }

    fn rebuild(&mut self, id: &str) {
        let Some(mut course) = self.confirmed.iter().find(|c| c.id == id).cloned() else {
            return;
        };
        for write in self.in_flight.iter().filter(|w| w.course_id == id) {
            for field in write.fields.iter().cloned() {
                field.apply(&mut course);
            }
        }

        match self.courses.iter_mut().find(|c| c.id == id) {
            Some(local) => *local = course,
            None => self.courses.push(course),
        }
    }

    fn rebuild_all(&mut self) {
        self.courses = self.confirmed.clone();
        let ids: Vec<String> = self.in_flight.iter().map(|w| w.course_id.clone()).collect();
        for id in ids {
            self.rebuild(&id);
        }
    }
}

impl CourseMirror {
    /// Starts out showing the seed list until the first snapshot arrives.
    pub fn new(remote: Arc<dyn RemoteStore>, seed: Vec<CourseRecord>) -> Self {
        Self {
            remote,
            state: RwLock::new(MirrorState::new(seed.clone())),
            seed,
            pending: Mutex::new(PendingLedger::default()),
        }
    }

    pub async fn courses(&self) -> Vec<CourseRecord> {
        self.state.read().await.courses.clone()
    }

    pub async fn get(&self, id: &str) -> Option<CourseRecord> {
        self.state
            .read()
            .await
            .courses
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.state.read().await.courses.iter().any(|c| c.id == id)
    }

    pub async fn pending(&self) -> Vec<PendingOperation> {
        self.pending.lock().await.list()
    }

    /// Replaces the confirmed state wholesale. Last snapshot wins; writes
    /// still in flight stay applied on top.
    pub async fn apply_snapshot(&self, docs: Vec<CourseRecord>) {
        let mut state = self.state.write().await;
        if docs.is_empty() {
            debug!("empty snapshot, showing {} seed courses", self.seed.len());
            state.confirmed = self.seed.clone();
        } else {
            debug!("snapshot with {} courses", docs.len());
            state.confirmed = docs;
        }
        state.rebuild_all();
    }

    /// One subscription tick. Errors are logged and leave state untouched.
    pub async fn refresh(&self) {
        match self.remote.fetch_courses().await {
            Ok(docs) => self.apply_snapshot(docs).await,
            Err(e) => warn!("course subscription error: {}", e),
        }
    }

    /// Content references held by every mirrored course.
    pub async fn live_content_refs(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .courses
            .iter()
            .flat_map(|c| c.content_refs().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    pub async fn create_course(&self, req: NewCourseRequest) -> Result<CourseRecord, AppError> {
        if req.title.trim().is_empty() {
            return Err(AppError::BadRequest("title is required".to_string()));
        }

        let course = CourseRecord {
            id: Uuid::new_v4().to_string(),
            title: req.title,
            description: req.description,
            code: generate_join_code(),
            color: req.color,
            meeting_link: None,
            modules: Vec::new(),
            submissions: Vec::new(),
            discussions: Vec::new(),
            students: Vec::new(),
            calendar_events: Vec::new(),
            created_at: Utc::now(),
            version: 0,
        };

        self.state.write().await.courses.push(course.clone());
        let op = self
            .pending
            .lock()
            .await
            .begin(&course.id, PendingKind::CreateCourse);

        let result = self.remote.insert_course(&course).await;
        self.pending.lock().await.settle(op);

        let mut state = self.state.write().await;
        match result {
            Ok(confirmed) => {
                state.confirmed.retain(|c| c.id != confirmed.id);
                state.confirmed.push(confirmed.clone());
                state.rebuild(&confirmed.id);
                info!("created course {} ({})", confirmed.title, confirmed.id);
                Ok(confirmed)
            }
            Err(e) => {
                state.courses.retain(|c| c.id != course.id);
                warn!("create course {} rejected, rolled back: {}", course.id, e);
                Err(e)
            }
        }
    }

    pub async fn update_course(
        &self,
        id: &str,
        req: UpdateCourseRequest,
    ) -> Result<CourseRecord, AppError> {
        let mut fields = Vec::new();
        if let Some(title) = req.title {
            fields.push(CourseField::Title(title));
        }
        if let Some(description) = req.description {
            fields.push(CourseField::Description(description));
        }
        if let Some(color) = req.color {
            fields.push(CourseField::Color(color));
        }
        if let Some(link) = req.meeting_link {
            let link = if link.trim().is_empty() { None } else { Some(link) };
            fields.push(CourseField::MeetingLink(link));
        }
        if fields.is_empty() {
            return Err(AppError::BadRequest("nothing to update".to_string()));
        }

        self.write_fields(id, move |_| Ok(fields)).await
    }

    pub async fn replace_modules(
        &self,
        id: &str,
        modules: Vec<Module>,
    ) -> Result<CourseRecord, AppError> {
        self.write_fields(id, move |_| Ok(vec![CourseField::Modules(modules)]))
            .await
    }

    pub async fn replace_discussions(
        &self,
        id: &str,
        discussions: Vec<DiscussionMessage>,
    ) -> Result<CourseRecord, AppError> {
        self.write_fields(id, move |_| Ok(vec![CourseField::Discussions(discussions)]))
            .await
    }

    pub async fn post_discussion(
        &self,
        id: &str,
        msg: NewDiscussionMessage,
    ) -> Result<CourseRecord, AppError> {
        if msg.text.trim().is_empty() {
            return Err(AppError::BadRequest("message is empty".to_string()));
        }

        self.write_fields(id, move |course| {
            let mut discussions = course.discussions.clone();
            discussions.push(DiscussionMessage {
                id: Uuid::new_v4().to_string(),
                user: msg.user,
                text: msg.text,
                role: msg.role,
                sent_at: Utc::now(),
            });
            Ok(vec![CourseField::Discussions(discussions)])
        })
        .await
    }

    pub async fn add_calendar_event(
        &self,
        id: &str,
        event: NewCalendarEvent,
    ) -> Result<CourseRecord, AppError> {
        self.write_fields(id, move |course| {
            let mut events = course.calendar_events.clone();
            events.push(CalendarEvent {
                id: Uuid::new_v4().to_string(),
                title: event.title,
                date: event.date,
                kind: event.kind,
            });
            Ok(vec![CourseField::CalendarEvents(events)])
        })
        .await
    }

    /// At most one submission per (student, assignment) pair.
    pub async fn submit_assignment(
        &self,
        id: &str,
        req: SubmitAssignmentRequest,
    ) -> Result<CourseRecord, AppError> {
        self.write_fields(id, move |course| {
            let exists = course
                .submissions
                .iter()
                .any(|s| s.student_id == req.student_id && s.assignment_id == req.assignment_id);
            if exists {
                return Err(AppError::Conflict(format!(
                    "student {} already submitted assignment {}",
                    req.student_id, req.assignment_id
                )));
            }

            let mut submissions = course.submissions.clone();
            submissions.push(Submission {
                student_id: req.student_id,
                student_name: req.student_name,
                assignment_id: req.assignment_id,
                file_ref: req.file_ref,
                file_name: req.file_name,
                submitted_at: Utc::now(),
                score: None,
            });
            Ok(vec![CourseField::Submissions(submissions)])
        })
        .await
    }

    pub async fn grade_submission(
        &self,
        id: &str,
        req: GradeSubmissionRequest,
    ) -> Result<CourseRecord, AppError> {
        if !req.score.is_finite() {
            return Err(AppError::BadRequest("score must be a number".to_string()));
        }

        self.write_fields(id, move |course| {
            let mut updated = course.clone();
            let submission = updated
                .find_submission_mut(&req.student_id, &req.assignment_id)
                .ok_or(AppError::NotFound)?;
            submission.score = Some(req.score);
            Ok(vec![CourseField::Submissions(updated.submissions)])
        })
        .await
    }

    pub async fn toggle_item_complete(
        &self,
        id: &str,
        item_id: &str,
        completed: bool,
    ) -> Result<CourseRecord, AppError> {
        let item_id = item_id.to_string();
        self.write_fields(id, move |course| {
            let mut modules = course.modules.clone();
            let item = modules
                .iter_mut()
                .flat_map(|m| m.items.iter_mut())
                .find(|item| item.id() == item_id)
                .ok_or(AppError::NotFound)?;
            item.set_completed(completed);
            Ok(vec![CourseField::Modules(modules)])
        })
        .await
    }

    /// Enrols a student by join code. Joining twice is a no-op.
    pub async fn join_class(&self, req: JoinClassRequest) -> Result<CourseRecord, AppError> {
        let code = req.code.trim().to_uppercase();
        let course = {
            let state = self.state.read().await;
            state
                .courses
                .iter()
                .find(|c| c.code.eq_ignore_ascii_case(&code))
                .cloned()
                .ok_or(AppError::NotFound)?
        };

        if course.students.iter().any(|s| s.uid == req.uid) {
            debug!("{} already enrolled in {}", req.uid, course.id);
            return Ok(course);
        }

        self.write_fields(&course.id, move |course| {
            let mut students = course.students.clone();
            students.push(Student {
                uid: req.uid,
                name: req.name,
            });
            Ok(vec![CourseField::Students(students)])
        })
        .await
    }

    /// Applies `build`'s fields locally, sends them to the remote store with
    /// the confirmed version and settles the outcome. `build` sees the
    /// current local record, in-flight writes included.
    async fn write_fields<F>(&self, id: &str, build: F) -> Result<CourseRecord, AppError>
    where
        F: FnOnce(&CourseRecord) -> Result<Vec<CourseField>, AppError> + Send,
    {
        let (fields, expected_version, op) = {
            let mut state = self.state.write().await;
            let confirmed_version = state.confirmed_version(id);
            let course = state
                .courses
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(AppError::NotFound)?;
            let Some(expected_version) = confirmed_version else {
                return Err(AppError::Conflict(format!(
                    "course {} is not confirmed yet",
                    id
                )));
            };

            let fields = build(course)?;
            for field in fields.iter().cloned() {
                field.apply(course);
            }

            let names = fields.iter().map(CourseField::name).collect();
            let op = self
                .pending
                .lock()
                .await
                .begin(id, PendingKind::ReplaceFields { fields: names });
            state.in_flight.push(FieldWrite {
                op,
                course_id: id.to_string(),
                fields: fields.clone(),
            });

            (fields, expected_version, op)
        };

        let result = self
            .remote
            .update_course_fields(id, &fields, expected_version)
            .await;
        self.pending.lock().await.settle(op);

        let mut state = self.state.write().await;
        state.in_flight.retain(|w| w.op != op);

        match result {
            Ok(version) => {
                if let Some(confirmed) = state.confirmed.iter_mut().find(|c| c.id == id) {
                    // A newer snapshot may already carry this write.
                    if version > confirmed.version {
                        for field in fields {
                            field.apply(confirmed);
                        }
                        confirmed.version = version;
                    }
                }
                state.rebuild(id);
                debug!("course {} confirmed at version {}", id, version);
                state
                    .courses
                    .iter()
                    .find(|c| c.id == id)
                    .cloned()
                    .ok_or(AppError::NotFound)
            }
            Err(e) => {
                state.rebuild(id);
                warn!("write to course {} rejected, rolled back: {}", id, e);
                Err(e)
            }
        }
    }
}

fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}
