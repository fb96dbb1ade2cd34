//! Mock generative model for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GenerativeModel, ModelSource};
use crate::encoding::EncodedImage;
use crate::error::{AetheriaError, Result};

/// Scripted result of one mock call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Return an image (the configured output, or the source echoed back).
    Image,
    /// Answer without an image payload.
    Empty,
    /// Fail the call with a transform error.
    Fail,
}

/// Mock model that echoes its input unless scripted otherwise.
///
/// Outcomes are consumed one per call in call order. Once the script is
/// exhausted every call returns an image.
/// WARNING: Do not use in production - it performs no transformation!
#[derive(Default)]
pub struct MockModel {
    script: Mutex<VecDeque<MockOutcome>>,
    output: Option<EncodedImage>,
    calls: AtomicUsize,
    instructions: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that plays `outcomes` in order.
    pub fn with_script(outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Create a mock whose every call fails.
    pub fn failing() -> Self {
        Self::with_script(std::iter::repeat(MockOutcome::Fail).take(64))
    }

    /// Return `output` instead of echoing the source.
    pub fn with_output(mut self, output: EncodedImage) -> Self {
        self.output = Some(output);
        self
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Instructions received, in call order.
    pub fn instructions(&self) -> Vec<String> {
        self.instructions
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn next_outcome(&self) -> MockOutcome {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or(MockOutcome::Image)
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(
        &self,
        source: &EncodedImage,
        instruction: &str,
    ) -> Result<Option<EncodedImage>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut instructions) = self.instructions.lock() {
            instructions.push(instruction.to_string());
        }

        match self.next_outcome() {
            MockOutcome::Image => Ok(Some(
                self.output.clone().unwrap_or_else(|| source.clone()),
            )),
            MockOutcome::Empty => Ok(None),
            MockOutcome::Fail => Err(AetheriaError::Transform(format!(
                "mock model failure on call {call}"
            ))),
        }
    }

    fn source_id(&self) -> ModelSource {
        ModelSource::Mock
    }
}
