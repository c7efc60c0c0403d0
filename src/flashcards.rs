use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{FlashcardDeck, NewDeckRequest};

/// Decks live in process memory only; nothing here is persisted.
pub struct FlashcardShelf {
    decks: RwLock<Vec<FlashcardDeck>>,
}

impl FlashcardShelf {
    pub fn new(seed: Vec<FlashcardDeck>) -> Self {
        Self {
            decks: RwLock::new(seed),
        }
    }

    pub async fn list(&self) -> Vec<FlashcardDeck> {
        self.decks.read().await.clone()
    }

    pub async fn for_course(&self, course_id: &str) -> Vec<FlashcardDeck> {
        self.decks
            .read()
            .await
            .iter()
            .filter(|d| d.course_id.as_deref() == Some(course_id))
            .cloned()
            .collect()
    }

    /// `course_known` tells whether the deck's course is currently mirrored.
    pub async fn add_deck(
        &self,
        req: NewDeckRequest,
        course_known: bool,
    ) -> Result<FlashcardDeck, AppError> {
        if req.title.trim().is_empty() {
            return Err(AppError::BadRequest("deck title is required".to_string()));
        }
        if req.cards.is_empty() {
            return Err(AppError::BadRequest("deck has no cards".to_string()));
        }
        if req.course_id.is_some() && !course_known {
            return Err(AppError::BadRequest(format!(
                "unknown course {}",
                req.course_id.unwrap_or_default()
            )));
        }

        let deck = FlashcardDeck {
            id: Uuid::new_v4().to_string(),
            course_id: req.course_id,
            title: req.title,
            subject: req.subject,
            cards: req.cards,
        };
        self.decks.write().await.push(deck.clone());
        Ok(deck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Flashcard;
    use crate::seed::SeedData;

    fn request(course_id: Option<&str>) -> NewDeckRequest {
        NewDeckRequest {
            course_id: course_id.map(str::to_string),
            title: "Kimia".to_string(),
            subject: "Sains".to_string(),
            cards: vec![Flashcard {
                question: "H2O".to_string(),
                answer: "Air".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_seed_decks_filter_by_course() {
        let shelf = FlashcardShelf::new(SeedData::default().decks);
        assert_eq!(shelf.list().await.len(), 3);

        let decks = shelf.for_course("demo-1").await;
        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].title, "Vocabulary TOEFL");
    }

    #[tokio::test]
    async fn test_add_deck_rejects_unknown_course() {
        let shelf = FlashcardShelf::new(Vec::new());

        let err = shelf.add_deck(request(Some("nope")), false).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let deck = shelf.add_deck(request(None), false).await.unwrap();
        assert_eq!(shelf.list().await, vec![deck]);
    }
}
