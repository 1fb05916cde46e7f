//! Contract for the external component-code generator
//!
//! The generator itself is an opaque service. This module only fixes what is
//! sent, what comes back, how failures are classified and how calls are
//! retried.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// One fragment to turn into component code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRequest {
    /// PascalCase component name
    pub component_name: String,

    /// Outer HTML of the fragment
    pub html: String,

    /// Stylesheet text the fragment depends on
    pub css: String,
}

impl ComponentRequest {
    /// Prompt text sent to the generator
    pub fn prompt(&self) -> String {
        format!(
            "Convert the following HTML fragment into a component named `{}`.\n\
             Return the component source only.\n\n\
             HTML:\n{}\n\nCSS:\n{}\n",
            self.component_name, self.html, self.css
        )
    }
}

/// Structured generator output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedComponent {
    pub component_name: String,
    pub source: String,
}

/// Errors that can occur during generation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// Worth retrying (timeouts, 5xx, malformed output)
    #[error("Transient generator failure: {0}")]
    Transient(String),

    /// Quota or rate limit hit; retrying immediately will not help
    #[error("Generator resources exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Generator failed: {0}")]
    Permanent(String),
}

impl GenerateError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// An external text-generation service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &ComponentRequest) -> Result<GeneratedComponent, GenerateError>;
}

/// Attempt count and backoff schedule for generator calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based), doubling each time
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Calls the generator, retrying transient failures with exponential backoff
///
/// `ResourceExhausted` and `Permanent` failures return at once. After
/// `max_attempts` transient failures the last error is returned.
pub async fn generate_with_retry(
    generator: &dyn TextGenerator,
    request: &ComponentRequest,
    policy: RetryPolicy,
) -> Result<GeneratedComponent, GenerateError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match generator.generate(request).await {
            Ok(component) => return Ok(component),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    "Generating {} failed (attempt {}/{}), retrying in {:?}: {}",
                    request.component_name,
                    attempt + 1,
                    attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("Generating {} failed: {}", request.component_name, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedGenerator {
        responses: Mutex<Vec<Result<GeneratedComponent, GenerateError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedGenerator {
        fn new(mut responses: Vec<Result<GeneratedComponent, GenerateError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _request: &ComponentRequest,
        ) -> Result<GeneratedComponent, GenerateError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(GenerateError::Permanent("script exhausted".into())))
        }
    }

    fn request() -> ComponentRequest {
        ComponentRequest {
            component_name: "Header".into(),
            html: "<header>Hi</header>".into(),
            css: String::new(),
        }
    }

    fn component() -> GeneratedComponent {
        GeneratedComponent {
            component_name: "Header".into(),
            source: "export default function Header() {}".into(),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenerateError::Transient("timeout".into())),
            Err(GenerateError::Transient("502".into())),
            Ok(component()),
        ]);

        let result = generate_with_retry(&generator, &request(), fast_policy()).await;
        assert_eq!(result, Ok(component()));
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenerateError::Transient("a".into())),
            Err(GenerateError::Transient("b".into())),
            Err(GenerateError::Transient("c".into())),
            Ok(component()),
        ]);

        let result = generate_with_retry(&generator, &request(), fast_policy()).await;
        assert_eq!(result, Err(GenerateError::Transient("c".into())));
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_resource_exhaustion_short_circuits() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenerateError::ResourceExhausted("quota".into())),
            Ok(component()),
        ]);

        let result = generate_with_retry(&generator, &request(), fast_policy()).await;
        assert!(matches!(result, Err(GenerateError::ResourceExhausted(_))));
        assert_eq!(generator.calls(), 1);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn test_prompt_mentions_component() {
        let prompt = request().prompt();
        assert!(prompt.contains("`Header`"));
        assert!(prompt.contains("<header>Hi</header>"));
    }
}
