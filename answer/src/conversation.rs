use crate::error::{AnswerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

/// Characters of the last question kept in a conversation summary
const SUMMARY_PREVIEW_CHARS: usize = 100;

/// Sources kept per logged answer
const LOGGED_SOURCES: usize = 3;

/// Identifies the caller of a request. Passed explicitly through the
/// pipeline so concurrent clients never share conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub client_id: String,

    /// Conversation to continue; a new one is started when absent
    pub conversation_id: Option<String>,
}

impl RequestContext {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            conversation_id: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// Source cited by a logged answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub page: Option<u32>,
    pub relevance_score: f32,
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub answer: String,
    pub confidence: f32,

    /// Number of sources shown with the answer
    pub sources_count: usize,

    /// The top sources only
    pub sources: Vec<SourceRef>,
}

impl ConversationEntry {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        confidence: f32,
        sources: Vec<SourceRef>,
    ) -> Self {
        let sources_count = sources.len();
        let mut sources = sources;
        sources.truncate(LOGGED_SOURCES);
        Self {
            timestamp: Utc::now(),
            question: question.into(),
            answer: answer.into(),
            confidence,
            sources_count,
            sources,
        }
    }
}

/// Listing entry for one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub message_count: usize,
    pub last_updated: Option<DateTime<Utc>>,

    /// Start of the most recent question
    pub preview: String,
}

/// Render the last `turns` entries as `Q: ...\nA: ...` blocks
pub fn render_turns(entries: &[ConversationEntry], turns: usize) -> Option<String> {
    if entries.is_empty() || turns == 0 {
        return None;
    }
    let start = entries.len().saturating_sub(turns);
    Some(
        entries[start..]
            .iter()
            .map(|entry| format!("Q: {}\nA: {}", entry.question, entry.answer))
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

/// Per-client conversation history
#[async_trait]
pub trait ConversationLog: Send + Sync {
    /// Append an entry, creating the conversation if needed
    async fn append(
        &self,
        client_id: &str,
        conversation_id: &str,
        entry: ConversationEntry,
    ) -> Result<()>;

    /// Entries of one conversation, oldest first; empty if unknown
    async fn history(&self, client_id: &str, conversation_id: &str)
    -> Result<Vec<ConversationEntry>>;

    /// Summaries of all the client's conversations, most recently updated first
    async fn conversations(&self, client_id: &str) -> Result<Vec<ConversationSummary>>;

    /// Delete one conversation. Returns whether it existed.
    async fn delete(&self, client_id: &str, conversation_id: &str) -> Result<bool>;

    /// Delete all of the client's conversations
    async fn clear(&self, client_id: &str) -> Result<()>;
}

type Conversations = BTreeMap<String, Vec<ConversationEntry>>;

fn summarize(conversations: &Conversations) -> Vec<ConversationSummary> {
    let mut summaries: Vec<ConversationSummary> = conversations
        .iter()
        .map(|(conversation_id, entries)| {
            let last = entries.last();
            ConversationSummary {
                conversation_id: conversation_id.clone(),
                message_count: entries.len(),
                last_updated: last.map(|entry| entry.timestamp),
                preview: last
                    .map(|entry| entry.question.chars().take(SUMMARY_PREVIEW_CHARS).collect())
                    .unwrap_or_default(),
            }
        })
        .collect();
    summaries.sort_by_key(|summary| Reverse(summary.last_updated));
    summaries
}

/// Conversation log held in memory
#[derive(Debug, Default)]
pub struct InMemoryConversationLog {
    clients: RwLock<HashMap<String, Conversations>>,
}

impl InMemoryConversationLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationLog for InMemoryConversationLog {
    async fn append(
        &self,
        client_id: &str,
        conversation_id: &str,
        entry: ConversationEntry,
    ) -> Result<()> {
        self.clients
            .write()
            .await
            .entry(client_id.to_string())
            .or_default()
            .entry(conversation_id.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn history(
        &self,
        client_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<ConversationEntry>> {
        let clients = self.clients.read().await;
        Ok(clients
            .get(client_id)
            .and_then(|conversations| conversations.get(conversation_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn conversations(&self, client_id: &str) -> Result<Vec<ConversationSummary>> {
        let clients = self.clients.read().await;
        Ok(clients.get(client_id).map(summarize).unwrap_or_default())
    }

    async fn delete(&self, client_id: &str, conversation_id: &str) -> Result<bool> {
        let mut clients = self.clients.write().await;
        Ok(clients
            .get_mut(client_id)
            .and_then(|conversations| conversations.remove(conversation_id))
            .is_some())
    }

    async fn clear(&self, client_id: &str) -> Result<()> {
        self.clients.write().await.remove(client_id);
        Ok(())
    }
}

/// Conversation log persisted as one JSON file per client:
/// `<root>/<client_id>/conversations.json`
#[derive(Debug)]
pub struct JsonFileConversationLog {
    root: PathBuf,
    file_lock: Mutex<()>,
}

impl JsonFileConversationLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_lock: Mutex::new(()),
        }
    }

    fn client_file(&self, client_id: &str) -> Result<PathBuf> {
        let valid = !client_id.is_empty()
            && client_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(AnswerError::ConversationLog(format!(
                "Invalid client id: {client_id:?}"
            )));
        }
        Ok(self.root.join(client_id).join("conversations.json"))
    }

    async fn load(&self, path: &Path) -> Result<Conversations> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Conversations::new());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AnswerError::ConversationLog(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| AnswerError::ConversationLog(format!("{}: {e}", path.display())))
    }

    async fn save(&self, path: &Path, conversations: &Conversations) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AnswerError::ConversationLog(format!("{}: {e}", dir.display())))?;
        }
        let json = serde_json::to_string_pretty(conversations)
            .map_err(|e| AnswerError::ConversationLog(e.to_string()))?;
        // Readers in other processes only ever see a complete file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| AnswerError::ConversationLog(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| AnswerError::ConversationLog(format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl ConversationLog for JsonFileConversationLog {
    async fn append(
        &self,
        client_id: &str,
        conversation_id: &str,
        entry: ConversationEntry,
    ) -> Result<()> {
        let path = self.client_file(client_id)?;
        let _guard = self.file_lock.lock().await;
        let mut conversations = self.load(&path).await?;
        conversations
            .entry(conversation_id.to_string())
            .or_default()
            .push(entry);
        self.save(&path, &conversations).await
    }

    async fn history(
        &self,
        client_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<ConversationEntry>> {
        let path = self.client_file(client_id)?;
        let _guard = self.file_lock.lock().await;
        let mut conversations = self.load(&path).await?;
        Ok(conversations.remove(conversation_id).unwrap_or_default())
    }

    async fn conversations(&self, client_id: &str) -> Result<Vec<ConversationSummary>> {
        let path = self.client_file(client_id)?;
        let _guard = self.file_lock.lock().await;
        Ok(summarize(&self.load(&path).await?))
    }

    async fn delete(&self, client_id: &str, conversation_id: &str) -> Result<bool> {
        let path = self.client_file(client_id)?;
        let _guard = self.file_lock.lock().await;
        let mut conversations = self.load(&path).await?;
        if conversations.remove(conversation_id).is_none() {
            return Ok(false);
        }
        self.save(&path, &conversations).await?;
        Ok(true)
    }

    async fn clear(&self, client_id: &str) -> Result<()> {
        let path = self.client_file(client_id)?;
        let _guard = self.file_lock.lock().await;
        self.save(&path, &Conversations::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn entry(question: &str) -> ConversationEntry {
        ConversationEntry::new(question, "answer", 0.7, Vec::new())
    }

    #[test]
    fn test_entry_keeps_top_sources() {
        let sources: Vec<SourceRef> = (0..5)
            .map(|i| SourceRef {
                source: format!("{i}.pdf"),
                page: None,
                relevance_score: 0.9,
            })
            .collect();
        let entry = ConversationEntry::new("q", "a", 0.5, sources);
        assert_eq!(entry.sources_count, 5);
        assert_eq!(entry.sources.len(), 3);
    }

    #[test]
    fn test_render_turns_takes_last() {
        let entries = vec![entry("one"), entry("two"), entry("three"), entry("four")];
        let rendered = render_turns(&entries, 2).unwrap();
        assert_eq!(rendered, "Q: three\nA: answer\n\nQ: four\nA: answer");
        assert_eq!(render_turns(&[], 3), None);
    }

    #[test]
    fn test_summary_preview_and_order() {
        let mut older = entry("old question");
        older.timestamp = Utc::now() - TimeDelta::hours(1);
        let long_question = "x".repeat(150);

        let mut conversations = Conversations::new();
        conversations.insert("a".to_string(), vec![older]);
        conversations.insert("b".to_string(), vec![entry("first"), entry(&long_question)]);

        let summaries = summarize(&conversations);
        assert_eq!(summaries[0].conversation_id, "b");
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[0].preview.chars().count(), 100);
        assert_eq!(summaries[1].preview, "old question");
    }

    #[tokio::test]
    async fn test_in_memory_clients_isolated() {
        let log = InMemoryConversationLog::new();
        log.append("alice", "c1", entry("hello")).await.unwrap();
        log.append("bob", "c1", entry("other")).await.unwrap();

        let history = log.history("alice", "c1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "hello");
        assert!(log.history("alice", "missing").await.unwrap().is_empty());

        assert!(log.delete("alice", "c1").await.unwrap());
        assert!(!log.delete("alice", "c1").await.unwrap());
        assert_eq!(log.conversations("bob").await.unwrap().len(), 1);

        log.clear("bob").await.unwrap();
        assert!(log.conversations("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_file_log_persists() {
        let dir = TempDir::new().unwrap();
        let log = JsonFileConversationLog::new(dir.path());
        log.append("client_1", "c1", entry("q1")).await.unwrap();
        log.append("client_1", "c1", entry("q2")).await.unwrap();

        let reopened = JsonFileConversationLog::new(dir.path());
        let history = reopened.history("client_1", "c1").await.unwrap();
        let questions: Vec<&str> = history.iter().map(|e| e.question.as_str()).collect();
        assert_eq!(questions, vec!["q1", "q2"]);
        assert!(dir.path().join("client_1/conversations.json").exists());

        assert!(reopened.delete("client_1", "c1").await.unwrap());
        assert!(reopened.conversations("client_1").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_json_file_log_reads_during_appends() {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(JsonFileConversationLog::new(dir.path()));
        log.append("client_1", "c1", entry("q0")).await.unwrap();

        let writer = {
            let log = log.clone();
            tokio::spawn(async move {
                for i in 1..40 {
                    log.append("client_1", "c1", entry(&format!("q{i}")))
                        .await
                        .unwrap();
                }
            })
        };
        let reader = {
            let log = log.clone();
            tokio::spawn(async move {
                let mut last = 0;
                for _ in 0..40 {
                    let history = log.history("client_1", "c1").await.unwrap();
                    assert!(history.len() >= last);
                    last = history.len();
                    log.conversations("client_1").await.unwrap();
                }
            })
        };
        writer.await.unwrap();
        reader.await.unwrap();

        assert_eq!(log.history("client_1", "c1").await.unwrap().len(), 40);
        assert!(!dir.path().join("client_1/conversations.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_file_log_rejects_path_like_client() {
        let dir = TempDir::new().unwrap();
        let log = JsonFileConversationLog::new(dir.path());
        let err = log.append("../escape", "c1", entry("q")).await.unwrap_err();
        assert!(matches!(err, AnswerError::ConversationLog(_)));
    }
}
