use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardDeck {
    pub id: String,
    #[serde(default)]
    pub course_id: Option<String>,
    pub title: String,
    pub subject: String,
    pub cards: Vec<Flashcard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeckRequest {
    #[serde(default)]
    pub course_id: Option<String>,
    pub title: String,
    pub subject: String,
    pub cards: Vec<Flashcard>,
}
