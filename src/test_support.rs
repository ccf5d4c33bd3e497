//! Fakes for the provider traits and the pacer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use tokio::sync::Notify;

use crate::error::{ChatError, GenerationError, PersistenceError};
use crate::orchestrator::Pacer;
use crate::provider::{ChatProvider, ChatSession, ImageGenerator};
use crate::storage::{KeyValueStore, MemoryStore};

/// Image generator that returns `image-N` for call N (1-based) and can be
/// told to fail on a specific call.
#[derive(Default)]
pub struct FakeImageGenerator {
    prompts: Mutex<Vec<String>>,
    fail_on_call: Option<usize>,
    empty_on_call: Option<usize>,
    image: Option<String>,
}

impl FakeImageGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the same image for every call
    pub fn with_image(image: String) -> Self {
        Self {
            image: Some(image),
            ..Self::default()
        }
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn empty_on(call: usize) -> Self {
        Self {
            empty_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };

        if self.fail_on_call == Some(call) {
            return Err(GenerationError::new(
                prompt,
                "Failed to generate image: Quota exceeded",
            ));
        }
        if self.empty_on_call == Some(call) {
            return Err(GenerationError::new(
                prompt,
                format!("Failed to generate image for prompt: \"{}\"", prompt),
            ));
        }
        Ok(self
            .image
            .clone()
            .unwrap_or_else(|| format!("image-{}", call)))
    }
}

/// A small white JPEG, base64 encoded
pub fn sample_jpeg_base64() -> String {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        8,
        6,
        image::Rgb([255, 255, 255]),
    ));
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Jpeg).unwrap();
    base64::engine::general_purpose::STANDARD.encode(bytes.into_inner())
}

/// Pacer that returns immediately and counts pauses
#[derive(Default)]
pub struct InstantPacer {
    pauses: AtomicUsize,
}

impl InstantPacer {
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for InstantPacer {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Chat provider with scripted replies
#[derive(Default)]
pub struct FakeChatProvider {
    replies: Mutex<VecDeque<String>>,
    fail_next: AtomicBool,
    history_lengths: Mutex<Vec<usize>>,
    sessions: AtomicUsize,
}

impl FakeChatProvider {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.history_lengths.lock().unwrap().len()
    }

    /// Number of prior turns the session carried on each send
    pub fn history_lengths(&self) -> Vec<usize> {
        self.history_lengths.lock().unwrap().clone()
    }

    pub fn sessions_started(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for FakeChatProvider {
    fn start_session(&self) -> ChatSession {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        ChatSession::new("test instruction")
    }

    async fn send(&self, session: &mut ChatSession, text: &str) -> Result<String, ChatError> {
        self.history_lengths.lock().unwrap().push(session.turns().len());

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ChatError::Api {
                status: 503,
                body: "overloaded".to_string(),
            });
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ChatError::EmptyResponse)?;
        session.commit(text, &reply);
        Ok(reply)
    }
}

/// Chat provider that blocks inside `send` until released
pub struct GatedChatProvider {
    reply: String,
    entered: Notify,
    gate: Notify,
}

impl GatedChatProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }

    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl ChatProvider for GatedChatProvider {
    fn start_session(&self) -> ChatSession {
        ChatSession::new("test instruction")
    }

    async fn send(&self, session: &mut ChatSession, text: &str) -> Result<String, ChatError> {
        self.entered.notify_one();
        self.gate.notified().await;
        session.commit(text, &self.reply);
        Ok(self.reply.clone())
    }
}

/// Memory store whose writes can be switched to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Io {
                path: format!("{}.json", key),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.inner.remove(key)
    }
}
