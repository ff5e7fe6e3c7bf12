use std::{sync::Arc, time::Duration};

use {
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

use crate::{
    normalize::normalize_reply,
    policy::{RetryPolicy, Sleeper},
    retry::with_retries,
};

/// Reply used when every dispatch attempt failed.
pub const FALLBACK_REPLY: &str =
    "não foi possível processar a solicitação, tente novamente mais tarde";

#[derive(Serialize)]
struct AnswerRequest<'a> {
    question: &'a str,
    #[serde(rename = "sessionId")]
    session_id: &'a str,
}

#[derive(Deserialize)]
struct AnswerResponse {
    text: String,
}

/// HTTP client for the answer-generation endpoint.
///
/// [`AnswerClient::dispatch`] never fails: after the retry budget is spent
/// it returns [`FALLBACK_REPLY`]. Delivery is the caller's job — keeping
/// generation failures and delivery failures distinguishable.
pub struct AnswerClient {
    http: reqwest::Client,
    endpoint: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl AnswerClient {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            policy,
            sleeper,
        })
    }

    /// Ask the answer service for a reply to `question` in the context of
    /// `session_id`, retrying per the policy. The successful reply comes
    /// back normalized for plain-text channels.
    pub async fn dispatch(&self, question: &str, session_id: &str) -> String {
        let result = with_retries(&self.policy, self.sleeper.as_ref(), |attempt| {
            self.ask(question, session_id, attempt)
        })
        .await;

        match result {
            Ok(text) => normalize_reply(&text),
            Err(error) => {
                warn!(
                    session_id,
                    max_attempts = self.policy.max_attempts,
                    %error,
                    "answer service unreachable, replying with fallback"
                );
                FALLBACK_REPLY.to_string()
            },
        }
    }

    async fn ask(&self, question: &str, session_id: &str, attempt: u32) -> anyhow::Result<String> {
        debug!(session_id, attempt, "querying answer service");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&AnswerRequest {
                question,
                session_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("answer service returned {status}");
        }

        let body: AnswerResponse = response.json().await?;
        Ok(body.text)
    }
}
