//! Smoke test client for a running prediction server
//!
//! Sends one canonical measurement of each species to `/invocations` and
//! checks that every id comes back as the expected species.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use super::service::PredictResponse;
use crate::dataset::{class_name, FeatureVector};
use crate::utils::error::{IrisError, Result};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One textbook sample per species, with the expected answer
pub const CANONICAL_SAMPLES: [(FeatureVector, &str); 3] = [
    ([5.1, 3.5, 1.4, 0.2], "setosa"),
    ([7.0, 3.2, 4.7, 1.4], "versicolor"),
    ([6.3, 3.3, 6.0, 2.5], "virginica"),
];

/// Result for one probe sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeOutcome {
    pub features: FeatureVector,
    pub expected: &'static str,
    pub predicted_id: usize,
    /// `None` when the id is outside the class table
    pub predicted: Option<&'static str>,
}

impl ProbeOutcome {
    pub fn is_correct(&self) -> bool {
        self.predicted == Some(self.expected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub outcomes: Vec<ProbeOutcome>,
}

impl ProbeReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(ProbeOutcome::is_correct)
    }

    pub fn correct(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_correct()).count()
    }
}

/// Join a server base URL with the prediction path
pub fn invocations_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/invocations") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/invocations")
    }
}

/// Pair server predictions with the canonical samples
pub fn compare(url: &str, predictions: &[usize]) -> Result<ProbeReport> {
    if predictions.len() != CANONICAL_SAMPLES.len() {
        return Err(IrisError::Inference(format!(
            "server returned {} predictions for {} samples",
            predictions.len(),
            CANONICAL_SAMPLES.len()
        )));
    }

    let outcomes = CANONICAL_SAMPLES
        .iter()
        .zip(predictions)
        .map(|(&(features, expected), &predicted_id)| ProbeOutcome {
            features,
            expected,
            predicted_id,
            predicted: class_name(predicted_id),
        })
        .collect();

    Ok(ProbeReport {
        url: url.to_string(),
        outcomes,
    })
}

#[derive(Serialize)]
struct ProbeRequest {
    instances: Vec<FeatureVector>,
}

/// POST the canonical samples to a running server
pub fn probe_server(base_url: &str, timeout: Duration) -> Result<ProbeReport> {
    let url = invocations_url(base_url);
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();

    let request = ProbeRequest {
        instances: CANONICAL_SAMPLES.iter().map(|(f, _)| *f).collect(),
    };

    info!("Probing {}", url);
    let response = match agent.post(&url).send_json(&request) {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            return Err(IrisError::Http(format!("{url} returned {code}: {body}")));
        }
        Err(e) => return Err(IrisError::Http(format!("request to {url} failed: {e}"))),
    };

    let body: PredictResponse = response
        .into_json()
        .map_err(|e| IrisError::Http(format!("invalid response from {url}: {e}")))?;
    debug!("Server predictions: {:?}", body.predictions);

    compare(&url, &body.predictions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_all_correct() {
        let report = compare("http://localhost:1235/invocations", &[0, 1, 2]).unwrap();
        assert!(report.passed());
        assert_eq!(report.correct(), 3);
        assert_eq!(report.outcomes[2].predicted, Some("virginica"));
    }

    #[test]
    fn test_compare_detects_mistakes() {
        let report = compare("u", &[0, 2, 9]).unwrap();
        assert!(!report.passed());
        assert_eq!(report.correct(), 1);
        assert!(!report.outcomes[1].is_correct());
        assert_eq!(report.outcomes[2].predicted, None);
    }

    #[test]
    fn test_compare_rejects_wrong_length() {
        assert!(matches!(compare("u", &[0, 1]), Err(IrisError::Inference(_))));
    }

    #[test]
    fn test_invocations_url() {
        assert_eq!(
            invocations_url("http://localhost:1235"),
            "http://localhost:1235/invocations"
        );
        assert_eq!(
            invocations_url("http://localhost:1235/"),
            "http://localhost:1235/invocations"
        );
        assert_eq!(
            invocations_url("http://host/invocations"),
            "http://host/invocations"
        );
    }

    #[test]
    fn test_unreachable_server_is_http_error() {
        // Port 9 (discard) on localhost is essentially never listening
        let err = probe_server("http://127.0.0.1:9", Duration::from_millis(500)).unwrap_err();
        assert!(matches!(err, IrisError::Http(_)));
    }
}
