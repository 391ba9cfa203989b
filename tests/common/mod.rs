//! Shared test doubles for pipeline integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use medalforge::adapters::{GeneratorResponse, ImageGenerator, ImagePart};
use medalforge::domain::{ProgressEvent, ProgressSink};
use medalforge::storage::Storage;
use medalforge::GeneratorConfig;

/// What the scripted generator does on one call
#[derive(Debug, Clone)]
pub enum Step {
    /// Return one image whose bytes are `img-<call number>`
    Image,
    /// Return `n` images
    Images(usize),
    /// Return text only
    TextOnly,
    /// Fail with a provider error
    Fail,
    /// Sleep, then return an image (counted in `late_completions`)
    Hang(Duration),
}

/// A recorded call
#[derive(Debug, Clone)]
pub struct Call {
    pub prompt: String,
    pub images: Vec<ImagePart>,
}

/// Generator that follows a script, then answers with one image
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Call>>,
    pub late_completions: Arc<AtomicUsize>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn always(step: Step, count: usize) -> Self {
        Self::new(vec![step; count])
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub fn image_bytes(call_number: usize) -> Vec<u8> {
    format!("img-{}", call_number).into_bytes()
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_content(
        &self,
        prompt: &str,
        image_parts: &[ImagePart],
    ) -> Result<GeneratorResponse> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                prompt: prompt.to_string(),
                images: image_parts.to_vec(),
            });
            calls.len()
        };
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Image);

        let image = ImagePart::new(image_bytes(call_number), "image/png");
        match step {
            Step::Image => Ok(GeneratorResponse {
                text_parts: vec![],
                image_parts: vec![image],
            }),
            Step::Images(n) => Ok(GeneratorResponse {
                text_parts: vec![],
                image_parts: vec![image; n],
            }),
            Step::TextOnly => Ok(GeneratorResponse {
                text_parts: vec!["I cannot draw that".to_string()],
                image_parts: vec![],
            }),
            Step::Fail => anyhow::bail!("provider unavailable (call {})", call_number),
            Step::Hang(duration) => {
                tokio::time::sleep(duration).await;
                self.late_completions.fetch_add(1, Ordering::SeqCst);
                Ok(GeneratorResponse {
                    text_parts: vec![],
                    image_parts: vec![image],
                })
            }
        }
    }
}

/// Sink collecting every event
#[derive(Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Storage that refuses every operation
pub struct BrokenStorage {
    pub fail_directories: bool,
}

#[async_trait]
impl Storage for BrokenStorage {
    async fn ensure_directory(&self, path: &Path) -> Result<()> {
        if self.fail_directories {
            anyhow::bail!("permission denied: {}", path.display());
        }
        Ok(())
    }

    async fn write_file(&self, path: &Path, _bytes: &[u8]) -> Result<()> {
        anyhow::bail!("disk full: {}", path.display())
    }

    async fn list_files(&self, _path: &Path, _pattern: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Fast settings: no inter-call delay, short timeout
pub fn fast_config(propositions: u32) -> GeneratorConfig {
    GeneratorConfig {
        propositions_count: propositions,
        timeout_ms: 1_000,
        delay_ms: 0,
        ..Default::default()
    }
}
