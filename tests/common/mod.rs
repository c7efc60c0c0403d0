#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use eduflow::error::AppError;
use eduflow::models::{CourseField, CourseRecord, Item, Module, TaskDocument, UserProfile};
use eduflow::remote::RemoteStore;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// In-process remote store with switchable failures.
#[derive(Default)]
pub struct FakeRemote {
    pub courses: Mutex<Vec<CourseRecord>>,
    pub tasks: Mutex<Vec<TaskDocument>>,
    pub profiles: Mutex<HashMap<String, UserProfile>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fetch_calls: AtomicUsize,
    pub profile_writes: AtomicUsize,
    /// Per-call (delay, reject) for course field writes, consumed in order.
    pub write_script: Mutex<VecDeque<(Duration, bool)>>,
}

impl FakeRemote {
    pub fn with_courses(courses: Vec<CourseRecord>) -> Self {
        let remote = Self::default();
        *remote.courses.lock().unwrap() = courses;
        remote
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn course(&self, id: &str) -> Option<CourseRecord> {
        self.courses.lock().unwrap().iter().find(|c| c.id == id).cloned()
    }

    /// The next course field write waits `delay`, then is accepted or rejected.
    pub fn script_write(&self, delay: Duration, reject: bool) {
        self.write_script.lock().unwrap().push_back((delay, reject));
    }

    /// Simulates a write from another client.
    pub fn concurrent_edit(&self, id: &str, title: &str) {
        let mut courses = self.courses.lock().unwrap();
        if let Some(course) = courses.iter_mut().find(|c| c.id == id) {
            course.title = title.to_string();
            course.version += 1;
        }
    }

    fn check_writes(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Remote("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn fetch_courses(&self) -> Result<Vec<CourseRecord>, AppError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Remote("offline".to_string()));
        }
        Ok(self.courses.lock().unwrap().clone())
    }

    async fn insert_course(&self, course: &CourseRecord) -> Result<CourseRecord, AppError> {
        self.check_writes()?;
        self.courses.lock().unwrap().push(course.clone());
        Ok(course.clone())
    }

    async fn update_course_fields(
        &self,
        id: &str,
        fields: &[CourseField],
        expected_version: u64,
    ) -> Result<u64, AppError> {
        let step = self.write_script.lock().unwrap().pop_front();
        if let Some((delay, reject)) = step {
            tokio::time::sleep(delay).await;
            if reject {
                return Err(AppError::Remote("write rejected".to_string()));
            }
        }
        self.check_writes()?;
        let mut courses = self.courses.lock().unwrap();
        let course = courses
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(AppError::NotFound)?;
        if course.version != expected_version {
            return Err(AppError::Conflict(format!(
                "expected version {}, found {}",
                expected_version, course.version
            )));
        }
        for field in fields {
            field.clone().apply(course);
        }
        course.version += 1;
        Ok(course.version)
    }

    async fn fetch_tasks(&self, owner_id: &str) -> Result<Vec<TaskDocument>, AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Remote("offline".to_string()));
        }
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn insert_task(&self, task: &TaskDocument) -> Result<(), AppError> {
        self.check_writes()?;
        self.tasks.lock().unwrap().push(task.clone());
        Ok(())
    }

    async fn update_task_status(&self, task: &TaskDocument) -> Result<(), AppError> {
        self.check_writes()?;
        let mut tasks = self.tasks.lock().unwrap();
        let stored = tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or(AppError::NotFound)?;
        stored.status = task.status;
        stored.updated_at = task.updated_at;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        self.check_writes()?;
        self.tasks.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }

    async fn fetch_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Remote("offline".to_string()));
        }
        Ok(self.profiles.lock().unwrap().get(uid).cloned())
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.check_writes()?;
        self.profile_writes.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.uid.clone(), profile.clone());
        Ok(())
    }
}

pub fn course(id: &str) -> CourseRecord {
    CourseRecord {
        id: id.to_string(),
        title: format!("Kelas {}", id),
        description: String::new(),
        code: format!("{}CODE", id.to_uppercase()),
        color: "bg-teal-600".to_string(),
        meeting_link: None,
        modules: vec![Module {
            title: "Bab 1".to_string(),
            items: vec![Item::Assignment {
                id: format!("{}-assign", id),
                title: "Tugas 1".to_string(),
                deadline: "Minggu Depan".to_string(),
                attachment: None,
                completed: false,
            }],
        }],
        submissions: Vec::new(),
        discussions: Vec::new(),
        students: Vec::new(),
        calendar_events: Vec::new(),
        created_at: Utc::now(),
        version: 1,
    }
}

pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}
