//! Ordered provider chains.
//!
//! Every upstream integration (weather, places, routing) is a list of
//! providers tried in priority order. A provider that errors, is not
//! configured, does not support the operation, or answers with an empty
//! result is skipped and the next one is asked. All providers normalize into
//! the same response types, so callers never see which one answered unless
//! they ask for [`Resolved::provider`].

use std::future::Future;
use std::sync::Arc;

use log::{info, warn};

use crate::error::ProviderError;

pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Keyless OpenStreetMap-family providers. `source=osm` restricts a
    /// chain to these.
    fn is_open_data(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub provider: &'static str,
}

/// Runs `call` against each provider until one returns a non-empty value.
///
/// When every provider is exhausted the last empty answer wins; with no
/// answer at all the error is `NotFound` if any provider reported it, else
/// the last real failure.
pub async fn first_success<'a, P, T, F, Fut, E>(
    operation: &str,
    providers: &'a [Arc<P>],
    mut call: F,
    is_empty: E,
) -> Result<Resolved<T>, ProviderError>
where
    P: Provider + ?Sized,
    F: FnMut(&'a P) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    E: Fn(&T) -> bool,
{
    let mut last_empty = None;
    let mut not_found = None;
    let mut last_error = None;
    let mut skipped = None;

    for provider in providers {
        let provider: &'a P = provider;
        match call(provider).await {
            Ok(value) if is_empty(&value) => {
                warn!("{operation}: {} returned no results", provider.name());
                last_empty = Some(Resolved {
                    value,
                    provider: provider.name(),
                });
            }
            Ok(value) => {
                info!("{operation}: answered by {}", provider.name());
                return Ok(Resolved {
                    value,
                    provider: provider.name(),
                });
            }
            Err(err @ (ProviderError::NotConfigured(_) | ProviderError::Unsupported(_))) => {
                warn!("{operation}: skipping {}: {err}", provider.name());
                skipped = Some(err);
            }
            Err(err @ ProviderError::NotFound(_)) => {
                warn!("{operation}: {} found nothing: {err}", provider.name());
                not_found = Some(err);
            }
            Err(err) => {
                warn!("{operation}: {} failed: {err}", provider.name());
                last_error = Some(err);
            }
        }
    }

    if let Some(empty) = last_empty {
        return Ok(empty);
    }

    Err(not_found
        .or(last_error)
        .or(skipped)
        .unwrap_or(ProviderError::Unsupported("empty provider chain")))
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Answer {
        Values(Vec<u32>),
        Empty,
        NotFound,
        Broken,
        Unconfigured,
        Unsupported,
    }

    struct Fake {
        name: &'static str,
        answer: Answer,
    }

    impl Provider for Fake {
        fn name(&self) -> &'static str {
            self.name
        }
    }

    impl Fake {
        async fn fetch(&self) -> Result<Vec<u32>, ProviderError> {
            match &self.answer {
                Answer::Values(values) => Ok(values.clone()),
                Answer::Empty => Ok(Vec::new()),
                Answer::NotFound => Err(ProviderError::NotFound("no such city".to_string())),
                Answer::Broken => Err(ProviderError::Decode("bad json".to_string())),
                Answer::Unconfigured => Err(ProviderError::NotConfigured("fake")),
                Answer::Unsupported => Err(ProviderError::Unsupported("fake")),
            }
        }
    }

    fn fake(name: &'static str, answer: Answer) -> Arc<Fake> {
        Arc::new(Fake { name, answer })
    }

    fn run(providers: &[Arc<Fake>]) -> Result<Resolved<Vec<u32>>, ProviderError> {
        tokio_test::block_on(first_success("test", providers, |p| p.fetch(), Vec::is_empty))
    }

    #[test]
    fn test_first_non_empty_answer_wins() {
        let providers = vec![
            fake("broken", Answer::Broken),
            fake("empty", Answer::Empty),
            fake("good", Answer::Values(vec![1, 2])),
            fake("never", Answer::Values(vec![9])),
        ];
        let resolved = run(&providers).unwrap();
        assert_eq!(resolved.provider, "good");
        assert_eq!(resolved.value, vec![1, 2]);
    }

    #[test]
    fn test_empty_answer_beats_errors() {
        let providers = vec![fake("empty", Answer::Empty), fake("broken", Answer::Broken)];
        let resolved = run(&providers).unwrap();
        assert_eq!(resolved.provider, "empty");
        assert!(resolved.value.is_empty());
    }

    #[test]
    fn test_not_found_preferred_over_other_failures() {
        let providers = vec![
            fake("unconfigured", Answer::Unconfigured),
            fake("missing", Answer::NotFound),
            fake("broken", Answer::Broken),
        ];
        assert!(matches!(run(&providers), Err(ProviderError::NotFound(_))));
    }

    #[test]
    fn test_skipped_only_chain_reports_skip() {
        let providers = vec![fake("unsupported", Answer::Unsupported)];
        assert!(matches!(run(&providers), Err(ProviderError::Unsupported(_))));
        assert!(matches!(run(&[]), Err(ProviderError::Unsupported(_))));
    }
}
