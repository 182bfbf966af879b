use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::models::{QuizQuestion, ResourceEntry};

/// One entry in the built-in topic catalog
#[derive(Debug, Clone)]
pub struct TopicInfo {
    pub name: String,
    pub description: String,
    pub subtopics: Vec<String>,
}

/// The fixed set of topics the tutor teaches
#[derive(Debug, Clone)]
pub struct TopicCatalog {
    topics: HashMap<String, TopicInfo>,
}

impl TopicCatalog {
    pub fn builtin() -> Self {
        let entries: [(&str, &str, &str, &[&str]); 7] = [
            (
                "machine-learning",
                "Machine Learning",
                "Machine Learning is a subset of artificial intelligence that focuses on developing systems that can learn from and make decisions based on data.",
                &["Supervised Learning", "Unsupervised Learning", "Reinforcement Learning"],
            ),
            (
                "neural-networks",
                "Neural Networks",
                "Neural Networks are computing systems inspired by the biological neural networks that constitute animal brains.",
                &["Perceptrons", "Deep Learning", "Backpropagation"],
            ),
            (
                "nlp",
                "Natural Language Processing",
                "NLP is a branch of AI that helps computers understand, interpret and manipulate human language.",
                &["Text Classification", "Language Models", "Sentiment Analysis"],
            ),
            (
                "computer-vision",
                "Computer Vision",
                "Computer Vision is a field of AI that trains computers to interpret and understand the visual world.",
                &["Image Classification", "Object Detection", "Image Segmentation"],
            ),
            (
                "reinforcement-learning",
                "Reinforcement Learning",
                "Reinforcement Learning is an area of machine learning concerned with how software agents ought to take actions in an environment.",
                &["Q-Learning", "Deep Q Networks", "Policy Gradients"],
            ),
            (
                "ethics",
                "AI Ethics",
                "AI Ethics explores the moral implications of artificial intelligence and its impact on society.",
                &["Bias in AI", "Privacy Concerns", "AI Governance"],
            ),
            (
                "applications",
                "AI Applications",
                "AI Applications covers real-world implementations of artificial intelligence across various industries.",
                &["Healthcare AI", "Financial AI", "Autonomous Systems"],
            ),
        ];

        let mut topics = HashMap::new();
        for (key, name, description, subtopics) in entries {
            topics.insert(
                key.to_string(),
                TopicInfo {
                    name: name.to_string(),
                    description: description.to_string(),
                    subtopics: subtopics.iter().map(|s| s.to_string()).collect(),
                },
            );
        }

        TopicCatalog { topics }
    }

    pub fn get(&self, key: &str) -> Option<&TopicInfo> {
        self.topics.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.topics.contains_key(key)
    }

    /// Human-readable name for prompts; falls back to the raw key.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.topics.get(key).map(|t| t.name.as_str()).unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct BankTopic {
    questions: Vec<QuizQuestion>,
}

/// Multiple-choice question banks keyed by topic, loaded once at startup
#[derive(Debug, Clone)]
pub struct QuestionBank {
    topics: HashMap<String, Vec<QuizQuestion>>,
}

impl QuestionBank {
    /// Load the bank from disk. A missing or malformed file downgrades to an
    /// empty bank so the server still starts, just without quizzes.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path)
            .with_context(|| format!("reading question bank from {}", path))
            .and_then(|raw| Self::from_json_str(&raw))
        {
            Ok(bank) => {
                info!(
                    path = %path,
                    topics = bank.topics.len(),
                    "Question bank loaded"
                );
                bank
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to load question bank, quizzes disabled");
                QuestionBank {
                    topics: HashMap::new(),
                }
            }
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let parsed: HashMap<String, BankTopic> =
            serde_json::from_str(raw).context("parsing question bank JSON")?;
        Ok(Self::from_topics(
            parsed.into_iter().map(|(k, v)| (k, v.questions)).collect(),
        ))
    }

    pub fn from_topics(topics: HashMap<String, Vec<QuizQuestion>>) -> Self {
        QuestionBank { topics }
    }

    pub fn questions(&self, topic: &str) -> Option<&[QuizQuestion]> {
        self.topics.get(topic).map(|q| q.as_slice())
    }

    /// Bank size for a topic, used as the denominator when scoring a quiz.
    pub fn total_questions(&self, topic: &str) -> Option<usize> {
        self.topics.get(topic).map(|q| q.len())
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SubtopicResources {
    #[serde(default)]
    resources: Vec<ResourceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct TopicResources {
    #[serde(default)]
    resources: Vec<ResourceEntry>,
    #[serde(default)]
    subtopics: HashMap<String, SubtopicResources>,
}

/// Curated learning resources keyed by topic, with optional per-subtopic lists
#[derive(Debug, Clone)]
pub struct ResourceLibrary {
    topics: HashMap<String, TopicResources>,
}

impl ResourceLibrary {
    /// Load the library from disk, downgrading to empty on any error.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path)
            .with_context(|| format!("reading resource library from {}", path))
            .and_then(|raw| Self::from_json_str(&raw))
        {
            Ok(library) => {
                info!(
                    path = %path,
                    topics = library.topics.len(),
                    "Resource library loaded"
                );
                library
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to load resource library");
                ResourceLibrary {
                    topics: HashMap::new(),
                }
            }
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let topics: HashMap<String, TopicResources> =
            serde_json::from_str(raw).context("parsing resource library JSON")?;
        Ok(ResourceLibrary { topics })
    }

    /// Entries for a topic. A known subtopic narrows the list; an unknown
    /// subtopic falls back to the topic-level list; an unknown topic yields
    /// nothing.
    pub fn for_topic(&self, topic: &str, subtopic: Option<&str>) -> Vec<ResourceEntry> {
        let Some(topic_resources) = self.topics.get(topic) else {
            return Vec::new();
        };

        if let Some(subtopic) = subtopic {
            if let Some(subtopic_resources) = topic_resources.subtopics.get(subtopic) {
                return subtopic_resources.resources.clone();
            }
        }

        topic_resources.resources.clone()
    }

    /// A topic's entries plus everything filed under its subtopics, used as
    /// the sampling pool for chat resource requests.
    pub fn for_topic_with_subtopics(&self, topic: &str) -> Vec<ResourceEntry> {
        let Some(topic_resources) = self.topics.get(topic) else {
            return Vec::new();
        };

        let mut entries = topic_resources.resources.clone();
        for subtopic_resources in topic_resources.subtopics.values() {
            entries.extend(subtopic_resources.resources.iter().cloned());
        }
        entries
    }

    /// Every entry in the library, topic lists first, then subtopic lists.
    pub fn all_entries(&self) -> Vec<ResourceEntry> {
        let mut entries = Vec::new();
        for topic_resources in self.topics.values() {
            entries.extend(topic_resources.resources.iter().cloned());
            for subtopic_resources in topic_resources.subtopics.values() {
                entries.extend(subtopic_resources.resources.iter().cloned());
            }
        }
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Random sample of at most `max` entries, without replacement.
pub fn sample_entries(entries: &[ResourceEntry], max: usize) -> Vec<ResourceEntry> {
    let mut rng = rand::thread_rng();
    entries.choose_multiple(&mut rng, max).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_fixture() -> ResourceLibrary {
        ResourceLibrary::from_json_str(
            r#"
            {
                "machine-learning": {
                    "resources": [
                        {"title": "ML Course", "url": "https://example.com/ml"},
                        {"title": "ML Book", "url": "https://example.com/ml-book"}
                    ],
                    "subtopics": {
                        "Supervised Learning": {
                            "resources": [
                                {"title": "Supervised Guide", "url": "https://example.com/supervised"}
                            ]
                        }
                    }
                },
                "ethics": {
                    "resources": [
                        {"title": "Ethics Primer", "url": "https://example.com/ethics"}
                    ]
                }
            }
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_builtin_catalog_topics() {
        let catalog = TopicCatalog::builtin();
        assert_eq!(catalog.len(), 7);
        assert!(catalog.contains("machine-learning"));
        assert!(catalog.contains("ethics"));
        assert!(!catalog.contains("quantum-computing"));

        let ml = catalog.get("machine-learning").unwrap();
        assert_eq!(ml.name, "Machine Learning");
        assert_eq!(ml.subtopics.len(), 3);

        assert_eq!(catalog.display_name("nlp"), "Natural Language Processing");
        assert_eq!(catalog.display_name("unknown-key"), "unknown-key");
    }

    #[test]
    fn test_question_bank_parsing_and_lookup() {
        let bank = QuestionBank::from_json_str(
            r#"
            {
                "machine-learning": {
                    "questions": [
                        {
                            "question": "What is the main goal of machine learning?",
                            "options": [
                                "A. To create artificial intelligence",
                                "B. To enable computers to learn from data"
                            ],
                            "correct": "B"
                        }
                    ]
                }
            }
            "#,
        )
        .unwrap();

        assert_eq!(bank.total_questions("machine-learning"), Some(1));
        assert_eq!(bank.total_questions("nlp"), None);
        let questions = bank.questions("machine-learning").unwrap();
        assert_eq!(questions[0].correct, "B");
    }

    #[test]
    fn test_question_bank_missing_file_downgrades_to_empty() {
        let bank = QuestionBank::load("does/not/exist.json");
        assert!(bank.is_empty());
        assert!(bank.questions("machine-learning").is_none());
    }

    #[test]
    fn test_resource_lookup_narrows_by_subtopic() {
        let library = library_fixture();

        let topic_level = library.for_topic("machine-learning", None);
        assert_eq!(topic_level.len(), 2);

        let subtopic_level = library.for_topic("machine-learning", Some("Supervised Learning"));
        assert_eq!(subtopic_level.len(), 1);
        assert_eq!(subtopic_level[0].title, "Supervised Guide");

        // Unknown subtopic falls back to the topic list
        let fallback = library.for_topic("machine-learning", Some("Nonexistent"));
        assert_eq!(fallback.len(), 2);

        assert!(library.for_topic("quantum", None).is_empty());
    }

    #[test]
    fn test_for_topic_with_subtopics_combines_both_lists() {
        let library = library_fixture();

        let pool = library.for_topic_with_subtopics("machine-learning");
        assert_eq!(pool.len(), 3);
        assert!(pool.iter().any(|e| e.title == "Supervised Guide"));

        // No subtopics degrades to the topic list alone.
        let pool = library.for_topic_with_subtopics("ethics");
        assert_eq!(pool.len(), 1);

        assert!(library.for_topic_with_subtopics("quantum").is_empty());
    }

    #[test]
    fn test_all_entries_flattens_topics_and_subtopics() {
        let library = library_fixture();
        let all = library.all_entries();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_sample_entries_caps_at_max_without_duplicates() {
        let entries: Vec<ResourceEntry> = (0..6)
            .map(|i| ResourceEntry {
                title: format!("Resource {}", i),
                url: format!("https://example.com/{}", i),
            })
            .collect();

        let sampled = sample_entries(&entries, 4);
        assert_eq!(sampled.len(), 4);

        let mut titles: Vec<&str> = sampled.iter().map(|e| e.title.as_str()).collect();
        titles.sort();
        titles.dedup();
        assert_eq!(titles.len(), 4, "sampling must not repeat entries");

        for entry in &sampled {
            assert!(entries.iter().any(|e| e.title == entry.title));
        }
    }

    #[test]
    fn test_sample_entries_returns_all_when_fewer_than_max() {
        let entries = vec![
            ResourceEntry {
                title: "Only".to_string(),
                url: "https://example.com/only".to_string(),
            },
            ResourceEntry {
                title: "Pair".to_string(),
                url: "https://example.com/pair".to_string(),
            },
        ];

        let sampled = sample_entries(&entries, 4);
        assert_eq!(sampled.len(), 2);
    }
}
