use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use exam_core::model::{ExamId, ExamInfo, ExamPaper, Question, QuestionId, Submission};

use crate::config::BackendConfig;
use crate::error::ApiError;

/// Backend answer to an attempt-start request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptStart {
    /// Whole seconds left, already clamped at zero.
    pub remaining_secs: u32,
}

/// Backend acknowledgement of a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub message: Option<String>,
}

/// The exam backend as seen by the session flow.
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// Create the attempt if absent and report the time left on it.
    ///
    /// Calling this again for a started exam must not reset the clock.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or backend rejections.
    async fn start_attempt(&self, exam_id: ExamId) -> Result<AttemptStart, ApiError>;

    /// Fetch exam info and the ordered question list.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures, rejections or invalid papers.
    async fn fetch_paper(&self, exam_id: ExamId) -> Result<ExamPaper, ApiError>;

    /// Send the final answers.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or backend rejections.
    async fn submit(&self, submission: &Submission) -> Result<SubmitReceipt, ApiError>;
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartAttemptResponse {
    success: bool,
    #[serde(default)]
    remaining_time: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

impl StartAttemptResponse {
    pub(crate) fn into_attempt_start(self) -> Result<AttemptStart, ApiError> {
        if !self.success {
            return Err(rejected(self.message, "Could not start exam"));
        }
        let raw = self
            .remaining_time
            .ok_or_else(|| ApiError::Decode("missing remaining_time".into()))?;
        Ok(AttemptStart {
            remaining_secs: exam_core::model::Attempt::clamp_remaining(raw),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ExamInfoWire {
    #[serde(default)]
    title: String,
    #[serde(default)]
    duration: u32,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    total_questions: u32,
}

#[derive(Debug, Deserialize)]
struct QuestionWire {
    id: u64,
    text: String,
    options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionsResponse {
    success: bool,
    #[serde(default)]
    exam: Option<ExamInfoWire>,
    #[serde(default)]
    questions: Vec<QuestionWire>,
    #[serde(default)]
    message: Option<String>,
}

impl QuestionsResponse {
    pub(crate) fn into_paper(self) -> Result<ExamPaper, ApiError> {
        if !self.success {
            return Err(rejected(self.message, "Could not load exam questions"));
        }
        let info = self
            .exam
            .map(|exam| ExamInfo {
                title: exam.title,
                duration: exam.duration,
                subject: exam.subject,
                total_questions: exam.total_questions,
            })
            .unwrap_or_default();
        let questions = self
            .questions
            .into_iter()
            .map(|q| Question::new(QuestionId::new(q.id), q.text, q.options))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ExamPaper::new(info, questions)?)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

impl SubmitResponse {
    pub(crate) fn into_receipt(self) -> Result<SubmitReceipt, ApiError> {
        if !self.success {
            return Err(rejected(self.message, "Could not submit exam"));
        }
        Ok(SubmitReceipt {
            message: self.message,
        })
    }
}

fn rejected(message: Option<String>, fallback: &str) -> ApiError {
    ApiError::Rejected {
        message: message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string()),
    }
}

//
// ─── HTTP CLIENT ───────────────────────────────────────────────────────────────
//

/// `ExamApi` over HTTP + JSON.
#[derive(Clone)]
pub struct HttpExamApi {
    client: Client,
    config: BackendConfig,
}

impl HttpExamApi {
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> Result<url::Url, ApiError> {
        self.config
            .url_for(path)
            .map_err(|err| ApiError::Decode(format!("bad endpoint {path}: {err}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match self.config.auth_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        match self.config.csrf_token.as_deref() {
            Some(token) => request.header("X-CSRFToken", token),
            None => request,
        }
    }
}

/// Decode a JSON body, turning non-2xx responses into `ApiError`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|env| env.message.or(env.error))
            .filter(|m| !m.trim().is_empty());
        return Err(match message {
            Some(message) => ApiError::Rejected { message },
            None => ApiError::HttpStatus(status),
        });
    }

    serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn start_attempt(&self, exam_id: ExamId) -> Result<AttemptStart, ApiError> {
        let url = self.url(&self.config.endpoints.start_attempt_path(exam_id))?;
        let response = self.authorize(self.client.post(url)).send().await?;
        let body: StartAttemptResponse = decode(response).await?;
        body.into_attempt_start()
    }

    async fn fetch_paper(&self, exam_id: ExamId) -> Result<ExamPaper, ApiError> {
        let url = self.url(&self.config.endpoints.questions_path(exam_id))?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let body: QuestionsResponse = decode(response).await?;
        body.into_paper()
    }

    async fn submit(&self, submission: &Submission) -> Result<SubmitReceipt, ApiError> {
        let url = self.url(&self.config.endpoints.submit)?;
        let response = self
            .authorize(self.client.post(url))
            .json(submission)
            .send()
            .await?;
        let body: SubmitResponse = decode(response).await?;
        body.into_receipt()
    }
}
