#![allow(dead_code)]

use std::sync::Arc;

use quiz_engine::collab::{MemoryAnalytics, MemoryDocumentStore};
use quiz_engine::{EngineConfig, EngineServices, QuizController};
use quiz_spec::QuizConfig;
use serde_json::json;

pub fn abc_config() -> Arc<QuizConfig> {
    let config = QuizConfig::from_value(json!({
        "id": "abc",
        "version": "1",
        "sections": [{ "id": "main", "order": 1, "title": "Main" }],
        "questions": [
            { "id": "A", "section": "main", "order": 1, "type": "text", "label": "A" },
            {
                "id": "B", "section": "main", "order": 2, "type": "text", "label": "B",
                "branching": { "show_if": "answers.A == 'x'" }
            },
            { "id": "C", "section": "main", "order": 3, "type": "text", "label": "C" }
        ]
    }))
    .expect("abc config");
    Arc::new(config)
}

pub fn wellness_config() -> Arc<QuizConfig> {
    let config = QuizConfig::from_json_str(include_str!("../fixtures/wellness_intake.json"))
        .expect("wellness config");
    Arc::new(config)
}

pub struct Harness {
    pub controller: QuizController,
    pub analytics: Arc<MemoryAnalytics>,
    pub store: Arc<MemoryDocumentStore>,
}

pub fn harness(config: Arc<QuizConfig>) -> Harness {
    harness_with(config, EngineConfig::default())
}

pub fn harness_with(config: Arc<QuizConfig>, settings: EngineConfig) -> Harness {
    let analytics = Arc::new(MemoryAnalytics::new());
    let store = Arc::new(MemoryDocumentStore::new());
    let services = EngineServices::new(analytics.clone(), store.clone());
    Harness {
        controller: QuizController::new(config, services, settings),
        analytics,
        store,
    }
}
