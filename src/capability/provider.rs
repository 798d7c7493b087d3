use super::{CriterionFeedback, Feedback, FeedbackCapability, SummaryCapability};
use crate::document::Document;
use crate::error::CapabilityError;
use crate::parser::{parse_evaluation, parse_summary};
use crate::provider::Runner;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const FORMAT_INSTRUCTIONS: &str = "Respond with a single JSON object and nothing else:\n\
```json\n{\"feedback\": \"<detailed feedback>\", \"score\": <integer from 0 to 10>}\n```";

/// Feedback from a provider, prompted with a criterion template
pub struct ProviderFeedback {
    pub runner: Arc<dyn Runner>,
    pub prompt: String,
    pub timeout: Duration,
}

impl ProviderFeedback {
    fn build_prompt(&self, document: &Document) -> String {
        format!(
            "{}\n\n{}\n\n## Essay\n\n{}",
            self.prompt.trim_end(),
            FORMAT_INSTRUCTIONS,
            document.text()
        )
    }
}

#[async_trait]
impl FeedbackCapability for ProviderFeedback {
    async fn feedback(
        &self,
        criterion: &str,
        document: &Document,
    ) -> Result<Feedback, CapabilityError> {
        let prompt = self.build_prompt(document);
        debug!(
            "Criterion {} invoking {} with {} byte prompt",
            criterion,
            self.runner.name(),
            prompt.len()
        );

        let output = self.runner.execute(&prompt, self.timeout).await?;
        debug!(
            "Criterion {} provider finished in {:?}",
            criterion, output.duration
        );

        let parsed = parse_evaluation(&output.stdout)?;
        Ok(Feedback {
            text: parsed.feedback,
            score: parsed.score,
        })
    }
}

/// Narrative synthesis from a provider
pub struct ProviderSummary {
    pub runner: Arc<dyn Runner>,
    pub prompt: String,
    pub timeout: Duration,
}

impl ProviderSummary {
    fn build_prompt(&self, feedback: &[CriterionFeedback]) -> String {
        let sections = feedback
            .iter()
            .map(|f| format!("### {} feedback\n\n{}", f.name, f.feedback))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "{}\n\n## Criterion Feedback\n\n{}",
            self.prompt.trim_end(),
            sections
        )
    }
}

#[async_trait]
impl SummaryCapability for ProviderSummary {
    async fn summarize(&self, feedback: &[CriterionFeedback]) -> Result<String, CapabilityError> {
        let prompt = self.build_prompt(feedback);
        debug!(
            "Invoking summary via {} with {} byte prompt",
            self.runner.name(),
            prompt.len()
        );

        let output = self.runner.execute(&prompt, self.timeout).await?;
        Ok(parse_summary(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::ProviderOutput;
    use std::sync::Mutex;

    /// Records the prompt and replies with a canned answer
    struct CannedRunner {
        reply: Result<String, ()>,
        seen: Mutex<Vec<String>>,
    }

    impl CannedRunner {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Runner for CannedRunner {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn execute(
            &self,
            prompt: &str,
            _timeout: Duration,
        ) -> Result<ProviderOutput, ProviderError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(stdout) => Ok(ProviderOutput {
                    stdout: stdout.clone(),
                    stderr: String::new(),
                    duration: Duration::ZERO,
                    exit_code: 0,
                }),
                Err(()) => Err(ProviderError::NonZeroExit {
                    code: 2,
                    stderr: "boom".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_feedback_prompt_and_parse() {
        let runner = CannedRunner::ok(r#"{"feedback": "Crisp prose", "score": 9}"#);
        let capability = ProviderFeedback {
            runner: runner.clone(),
            prompt: "Evaluate the language.".to_string(),
            timeout: Duration::from_secs(1),
        };

        let feedback = capability
            .feedback("language", &Document::new("My essay text"))
            .await
            .unwrap();

        assert_eq!(feedback.text, "Crisp prose");
        assert_eq!(feedback.score, 9);

        let seen = runner.seen.lock().unwrap();
        assert!(seen[0].starts_with("Evaluate the language."));
        assert!(seen[0].contains("\"score\""));
        assert!(seen[0].ends_with("My essay text"));
    }

    #[tokio::test]
    async fn test_feedback_provider_failure() {
        let capability = ProviderFeedback {
            runner: CannedRunner::failing(),
            prompt: "Evaluate.".to_string(),
            timeout: Duration::from_secs(1),
        };
        let result = capability.feedback("language", &Document::new("x")).await;
        assert!(matches!(
            result,
            Err(CapabilityError::Provider(ProviderError::NonZeroExit { code: 2, .. }))
        ));
    }

    #[tokio::test]
    async fn test_feedback_unparseable_output() {
        let capability = ProviderFeedback {
            runner: CannedRunner::ok("no idea"),
            prompt: "Evaluate.".to_string(),
            timeout: Duration::from_secs(1),
        };
        let result = capability.feedback("language", &Document::new("x")).await;
        assert!(matches!(result, Err(CapabilityError::Parser(_))));
    }

    #[tokio::test]
    async fn test_summary_includes_all_feedback_in_order() {
        let runner = CannedRunner::ok(r#"{"result": "Overall a strong essay."}"#);
        let capability = ProviderSummary {
            runner: runner.clone(),
            prompt: "Summarize.".to_string(),
            timeout: Duration::from_secs(1),
        };

        let input = vec![
            CriterionFeedback {
                criterion: "language".to_string(),
                name: "Language quality".to_string(),
                feedback: "F1".to_string(),
            },
            CriterionFeedback {
                criterion: "clarity".to_string(),
                name: "Clarity of thought".to_string(),
                feedback: "F2".to_string(),
            },
        ];

        let summary = capability.summarize(&input).await.unwrap();
        assert_eq!(summary, "Overall a strong essay.");

        let seen = runner.seen.lock().unwrap();
        let f1 = seen[0].find("F1").unwrap();
        let f2 = seen[0].find("F2").unwrap();
        assert!(f1 < f2);
        assert!(seen[0].contains("### Language quality feedback"));
    }
}
