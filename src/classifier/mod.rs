//! Sentiment classifier client
//!
//! Extracted article text can be sent to an external three-class sentiment
//! model (negative / neutral / positive). [`HttpClassifier`] talks to it over
//! HTTP:
//!
//! ```text
//! POST <endpoint>   {"text": "..."}
//! 200 OK            {"probabilities": [p_negative, p_neutral, p_positive]}
//! ```
//!
//! The predicted label is the class with the highest probability.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::utils::error::ClassifierError;

/// Allowed distance of the probability sum from 1.0
const PROBABILITY_TOLERANCE: f64 = 1e-3;

/// Sentiment class, in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [Self::Negative, Self::Neutral, Self::Positive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label plus the full probability distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label: SentimentLabel,
    /// Indexed like [`SentimentLabel::ALL`]
    pub probabilities: [f64; 3],
}

impl Classification {
    /// Validate a distribution and pick its most likely label
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::InvalidResponse` unless there are exactly
    /// three finite, non-negative values summing to 1.0.
    pub fn from_probabilities(values: &[f64]) -> Result<Self, ClassifierError> {
        let probabilities: [f64; 3] = values.try_into().map_err(|_| {
            ClassifierError::InvalidResponse(format!(
                "expected 3 probabilities, got {}",
                values.len()
            ))
        })?;

        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ClassifierError::InvalidResponse(format!(
                "probabilities must be finite and non-negative: {probabilities:?}"
            )));
        }

        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ClassifierError::InvalidResponse(format!(
                "probabilities sum to {sum}, not 1.0"
            )));
        }

        let mut best = 0;
        for (i, p) in probabilities.iter().enumerate() {
            if *p > probabilities[best] {
                best = i;
            }
        }

        Ok(Self {
            label: SentimentLabel::ALL[best],
            probabilities,
        })
    }

    /// Probability assigned to `label`
    pub fn probability(&self, label: SentimentLabel) -> f64 {
        let index = SentimentLabel::ALL
            .iter()
            .position(|l| *l == label)
            .unwrap_or_default();
        self.probabilities[index]
    }
}

/// Anything that can label a piece of text
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `text`
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError` for empty input, transport failures and
    /// malformed responses.
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    probabilities: Vec<f64>,
}

/// Classifier served over HTTP
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
}

impl HttpClassifier {
    /// Create a client for `endpoint` with a 60 second timeout
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::Http` if the HTTP client cannot be created
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClassifierError> {
        Self::with_timeout(endpoint, Duration::from_secs(60))
    }

    /// # Errors
    ///
    /// Returns `ClassifierError::Http` if the HTTP client cannot be created
    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        if text.trim().is_empty() {
            return Err(ClassifierError::EmptyInput);
        }

        tracing::debug!(endpoint = %self.endpoint, chars = text.chars().count(), "Classifying text");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;

        Classification::from_probabilities(&body.probabilities)
    }
}
