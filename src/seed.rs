use chrono::{TimeZone, Utc};

use crate::models::{
    CalendarEvent, CourseRecord, Flashcard, FlashcardDeck, Item, Module,
};

/// Fallback data shown while the remote course collection is empty or
/// unreachable. Injected into the mirror and the flashcard shelf.
#[derive(Debug, Clone)]
pub struct SeedData {
    pub courses: Vec<CourseRecord>,
    pub decks: Vec<FlashcardDeck>,
}

impl SeedData {
    pub fn empty() -> Self {
        Self {
            courses: Vec::new(),
            decks: Vec::new(),
        }
    }

    pub fn course_ids(&self) -> Vec<String> {
        self.courses.iter().map(|c| c.id.clone()).collect()
    }
}

impl Default for SeedData {
    fn default() -> Self {
        Self {
            courses: demo_courses(),
            decks: demo_decks(),
        }
    }
}

fn demo_courses() -> Vec<CourseRecord> {
    let created_at = Utc
        .with_ymd_and_hms(2025, 1, 6, 8, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);

    vec![
        CourseRecord {
            id: "demo-1".to_string(),
            title: "Bahasa Inggris".to_string(),
            description: "Persiapan TOEFL dan kosakata akademik".to_string(),
            code: "ENG101".to_string(),
            color: "bg-purple-600".to_string(),
            meeting_link: None,
            modules: vec![Module {
                title: "Minggu 1: Vocabulary".to_string(),
                items: vec![
                    Item::Link {
                        id: "demo-1-link-1".to_string(),
                        title: "Daftar Kosakata".to_string(),
                        url: "https://example.com/vocabulary".to_string(),
                        completed: false,
                    },
                    Item::Assignment {
                        id: "demo-1-assign-1".to_string(),
                        title: "Essay Pendek".to_string(),
                        deadline: "Minggu Depan".to_string(),
                        attachment: None,
                        completed: false,
                    },
                ],
            }],
            submissions: Vec::new(),
            discussions: Vec::new(),
            students: Vec::new(),
            calendar_events: vec![CalendarEvent {
                id: "demo-1-event-1".to_string(),
                title: "Ujian Tengah Semester".to_string(),
                date: "2025-03-10".to_string(),
                kind: "exam".to_string(),
            }],
            created_at,
            version: 0,
        },
        CourseRecord {
            id: "demo-2".to_string(),
            title: "Fisika Dasar".to_string(),
            description: "Mekanika dan energi".to_string(),
            code: "FIS201".to_string(),
            color: "bg-blue-600".to_string(),
            meeting_link: None,
            modules: vec![Module {
                title: "Bab 1: Hukum Newton".to_string(),
                items: vec![Item::Video {
                    id: "demo-2-video-1".to_string(),
                    title: "Pengantar Hukum Newton".to_string(),
                    url: "https://www.youtube.com/watch?v=demo".to_string(),
                    is_youtube: true,
                    completed: false,
                }],
            }],
            submissions: Vec::new(),
            discussions: Vec::new(),
            students: Vec::new(),
            calendar_events: Vec::new(),
            created_at,
            version: 0,
        },
    ]
}

fn card(question: &str, answer: &str) -> Flashcard {
    Flashcard {
        question: question.to_string(),
        answer: answer.to_string(),
    }
}

fn demo_decks() -> Vec<FlashcardDeck> {
    vec![
        FlashcardDeck {
            id: "1".to_string(),
            course_id: Some("demo-1".to_string()),
            title: "Vocabulary TOEFL".to_string(),
            subject: "Bahasa Inggris".to_string(),
            cards: vec![
                card("Abundant", "Berlimpah / Banyak sekali"),
                card("Benevolent", "Baik hati / Dermawan"),
                card("Candid", "Jujur / Terus terang"),
            ],
        },
        FlashcardDeck {
            id: "2".to_string(),
            course_id: Some("demo-2".to_string()),
            title: "Rumus Fisika Dasar".to_string(),
            subject: "Fisika".to_string(),
            cards: vec![
                card("Rumus Gaya (F)", "F = m . a (Massa x Percepatan)"),
                card("Energi Kinetik (Ek)", "Ek = 1/2 . m . v^2"),
                card("Hukum Newton III", "Aksi = -Reaksi"),
            ],
        },
        FlashcardDeck {
            id: "3".to_string(),
            course_id: None,
            title: "Sejarah Indonesia".to_string(),
            subject: "Sejarah".to_string(),
            cards: vec![
                card("Tanggal Kemerdekaan", "17 Agustus 1945"),
                card("Presiden Pertama", "Ir. Soekarno"),
                card(
                    "Peristiwa Rengasdengklok",
                    "Penculikan Soekarno-Hatta oleh golongan muda",
                ),
            ],
        },
    ]
}
