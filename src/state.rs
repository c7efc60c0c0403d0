use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::flashcards::FlashcardShelf;
use crate::kv::KeyValueStore;
use crate::mirror::CourseMirror;
use crate::remote::RemoteStore;
use crate::seed::SeedData;
use crate::session::SessionGate;
use crate::spillover::SpilloverCodec;
use crate::tasks::TaskBoard;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub kv: Arc<dyn KeyValueStore>,
    pub mirror: Arc<CourseMirror>,
    pub codec: Arc<SpilloverCodec>,
    pub tasks: Arc<TaskBoard>,
    pub flashcards: Arc<FlashcardShelf>,
    pub session: Arc<SessionGate>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        kv: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteStore>,
        seed: SeedData,
        spillover_threshold: usize,
        spillover_gc_grace: Duration,
    ) -> Self {
        Self {
            db,
            mirror: Arc::new(CourseMirror::new(remote.clone(), seed.courses)),
            codec: Arc::new(
                SpilloverCodec::new(kv.clone(), spillover_threshold)
                    .with_gc_grace(spillover_gc_grace),
            ),
            tasks: Arc::new(TaskBoard::new(remote.clone())),
            flashcards: Arc::new(FlashcardShelf::new(seed.decks)),
            session: Arc::new(SessionGate::new(remote, kv.clone())),
            kv,
        }
    }
}
