use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    pub color: String,
    #[serde(default)]
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub discussions: Vec<DiscussionMessage>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub calendar_events: Vec<CalendarEvent>,
    pub created_at: DateTime<Utc>,
    /// Bumped by the remote store on every accepted field write.
    #[serde(default)]
    pub version: u64,
}

impl CourseRecord {
    /// Every content reference held by this course, for blob GC.
    pub fn content_refs(&self) -> impl Iterator<Item = &str> {
        let items = self
            .modules
            .iter()
            .flat_map(|m| m.items.iter())
            .flat_map(|item| item.content_refs());
        let submissions = self.submissions.iter().map(|s| s.file_ref.as_str());
        items.chain(submissions)
    }

    pub fn find_submission_mut(
        &mut self,
        student_id: &str,
        assignment_id: &str,
    ) -> Option<&mut Submission> {
        self.submissions
            .iter_mut()
            .find(|s| s.student_id == student_id && s.assignment_id == assignment_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub title: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    File {
        id: String,
        title: String,
        url: String,
        #[serde(default)]
        size: Option<String>,
        #[serde(default)]
        completed: bool,
    },
    Video {
        id: String,
        title: String,
        url: String,
        #[serde(default)]
        is_youtube: bool,
        #[serde(default)]
        completed: bool,
    },
    Link {
        id: String,
        title: String,
        url: String,
        #[serde(default)]
        completed: bool,
    },
    Assignment {
        id: String,
        title: String,
        deadline: String,
        #[serde(default)]
        attachment: Option<Attachment>,
        #[serde(default)]
        completed: bool,
    },
    Quiz {
        id: String,
        title: String,
        #[serde(default)]
        questions: Vec<QuizQuestion>,
        #[serde(default)]
        completed: bool,
    },
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::File { id, .. }
            | Item::Video { id, .. }
            | Item::Link { id, .. }
            | Item::Assignment { id, .. }
            | Item::Quiz { id, .. } => id,
        }
    }

    pub fn completed(&self) -> bool {
        match self {
            Item::File { completed, .. }
            | Item::Video { completed, .. }
            | Item::Link { completed, .. }
            | Item::Assignment { completed, .. }
            | Item::Quiz { completed, .. } => *completed,
        }
    }

    pub fn set_completed(&mut self, value: bool) {
        match self {
            Item::File { completed, .. }
            | Item::Video { completed, .. }
            | Item::Link { completed, .. }
            | Item::Assignment { completed, .. }
            | Item::Quiz { completed, .. } => *completed = value,
        }
    }

    fn content_refs(&self) -> Vec<&str> {
        match self {
            Item::File { url, .. } | Item::Video { url, .. } | Item::Link { url, .. } => {
                vec![url.as_str()]
            }
            Item::Assignment { attachment, .. } => attachment
                .iter()
                .map(|a| a.url.as_str())
                .collect(),
            Item::Quiz { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question_text: String,
    pub options: Vec<QuizOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOption {
    pub answer_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub student_id: String,
    pub student_name: String,
    pub assignment_id: String,
    pub file_ref: String,
    pub file_name: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionMessage {
    pub id: String,
    pub user: String,
    pub text: String,
    pub role: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub uid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub meeting_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAssignmentRequest {
    pub student_id: String,
    pub student_name: String,
    pub assignment_id: String,
    pub file_ref: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeSubmissionRequest {
    pub student_id: String,
    pub assignment_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiscussionMessage {
    pub user: String,
    pub text: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinClassRequest {
    pub code: String,
    pub uid: String,
    pub name: String,
}

/// A whole-field replacement of one course field. The remote store has no
/// partial patch semantics below this granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseField {
    Title(String),
    Description(String),
    Color(String),
    MeetingLink(Option<String>),
    Modules(Vec<Module>),
    Submissions(Vec<Submission>),
    Discussions(Vec<DiscussionMessage>),
    Students(Vec<Student>),
    CalendarEvents(Vec<CalendarEvent>),
}

impl CourseField {
    pub fn name(&self) -> &'static str {
        match self {
            CourseField::Title(_) => "title",
            CourseField::Description(_) => "description",
            CourseField::Color(_) => "color",
            CourseField::MeetingLink(_) => "meeting_link",
            CourseField::Modules(_) => "modules",
            CourseField::Submissions(_) => "submissions",
            CourseField::Discussions(_) => "discussions",
            CourseField::Students(_) => "students",
            CourseField::CalendarEvents(_) => "calendar_events",
        }
    }

    /// Writes this field into `course` and returns the value it replaced.
    pub fn apply(self, course: &mut CourseRecord) -> CourseField {
        match self {
            CourseField::Title(v) => CourseField::Title(std::mem::replace(&mut course.title, v)),
            CourseField::Description(v) => {
                CourseField::Description(std::mem::replace(&mut course.description, v))
            }
            CourseField::Color(v) => CourseField::Color(std::mem::replace(&mut course.color, v)),
            CourseField::MeetingLink(v) => {
                CourseField::MeetingLink(std::mem::replace(&mut course.meeting_link, v))
            }
            CourseField::Modules(v) => {
                CourseField::Modules(std::mem::replace(&mut course.modules, v))
            }
            CourseField::Submissions(v) => {
                CourseField::Submissions(std::mem::replace(&mut course.submissions, v))
            }
            CourseField::Discussions(v) => {
                CourseField::Discussions(std::mem::replace(&mut course.discussions, v))
            }
            CourseField::Students(v) => {
                CourseField::Students(std::mem::replace(&mut course.students, v))
            }
            CourseField::CalendarEvents(v) => {
                CourseField::CalendarEvents(std::mem::replace(&mut course.calendar_events, v))
            }
        }
    }
}
