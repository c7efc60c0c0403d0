pub mod course;
pub mod flashcard;
pub mod profile;
pub mod task;

pub use course::{
    Attachment, CalendarEvent, CourseField, CourseRecord, DiscussionMessage,
    GradeSubmissionRequest, Item, JoinClassRequest, Module, NewCalendarEvent, NewCourseRequest,
    NewDiscussionMessage, QuizOption, QuizQuestion, Student, SubmitAssignmentRequest, Submission,
    UpdateCourseRequest,
};
pub use flashcard::{Flashcard, FlashcardDeck, NewDeckRequest};
pub use profile::{AuthUser, RegisterRequest, Role, UserProfile};
pub use task::{MoveTaskRequest, NewTaskRequest, TaskDocument, TaskStatus};
