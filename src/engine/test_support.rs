//! Scripted capabilities for engine tests

use crate::capability::{CriterionFeedback, Feedback, FeedbackCapability, SummaryCapability};
use crate::document::Document;
use crate::error::CapabilityError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

pub(crate) struct StubFeedback {
    score: i64,
    text: String,
    delay: Duration,
    fail: bool,
    panic: bool,
    completed: Option<Arc<AtomicUsize>>,
    tracking: Option<(Arc<AtomicUsize>, Arc<AtomicUsize>)>,
}

impl StubFeedback {
    pub fn scoring(score: i64) -> Self {
        Self {
            score,
            text: format!("scored {}", score),
            delay: Duration::ZERO,
            fail: false,
            panic: false,
            completed: None,
            tracking: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    /// Bump `counter` once the feedback is produced
    pub fn counting(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.completed = Some(counter);
        self
    }

    /// Track how many calls overlap, keeping the maximum in `peak`
    pub fn tracking(mut self, in_flight: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Self {
        self.tracking = Some((in_flight, peak));
        self
    }
}

#[async_trait]
impl FeedbackCapability for StubFeedback {
    async fn feedback(
        &self,
        criterion: &str,
        _document: &Document,
    ) -> Result<Feedback, CapabilityError> {
        if let Some((in_flight, peak)) = &self.tracking {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
        }

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        if let Some((in_flight, _)) = &self.tracking {
            in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        if self.panic {
            panic!("stub panic in {}", criterion);
        }
        if self.fail {
            return Err(CapabilityError::Other(format!("{} unavailable", criterion)));
        }

        if let Some(counter) = &self.completed {
            counter.fetch_add(1, Ordering::SeqCst);
        }

        Ok(Feedback {
            text: self.text.clone(),
            score: self.score,
        })
    }
}

pub(crate) struct StubSummary {
    text: String,
    fail: bool,
    panic: bool,
    observed: Option<Arc<AtomicUsize>>,
    calls: Mutex<Vec<Vec<CriterionFeedback>>>,
    completed_at_calls: Mutex<Vec<usize>>,
}

impl StubSummary {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fail: false,
            panic: false,
            observed: None,
            calls: Mutex::new(Vec::new()),
            completed_at_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    /// Snapshot `counter` every time the summary is requested
    pub fn observing(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.observed = Some(counter);
        self
    }

    pub fn calls(&self) -> Vec<Vec<CriterionFeedback>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn completed_at_calls(&self) -> Vec<usize> {
        self.completed_at_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummaryCapability for StubSummary {
    async fn summarize(&self, feedback: &[CriterionFeedback]) -> Result<String, CapabilityError> {
        if let Some(counter) = &self.observed {
            self.completed_at_calls
                .lock()
                .unwrap()
                .push(counter.load(Ordering::SeqCst));
        }
        self.calls.lock().unwrap().push(feedback.to_vec());

        if self.panic {
            panic!("stub summary panic");
        }
        if self.fail {
            return Err(CapabilityError::Other("summary unavailable".to_string()));
        }
        Ok(self.text.clone())
    }
}
