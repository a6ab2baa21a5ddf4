use std::env;
use std::time::Duration;

use exam_core::countdown::DEFAULT_WARNING_SECS;
use exam_core::model::ExamId;
use url::Url;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/";

/// Relative paths of the backend routes. `{exam_id}` is substituted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub start_attempt: String,
    pub questions: String,
    pub submit: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            start_attempt: "exams/api/start_attempt/{exam_id}/".into(),
            questions: "api/exams/{exam_id}/questions/".into(),
            submit: "api/exams/submit/".into(),
        }
    }
}

impl Endpoints {
    #[must_use]
    pub fn start_attempt_path(&self, exam_id: ExamId) -> String {
        fill(&self.start_attempt, exam_id)
    }

    #[must_use]
    pub fn questions_path(&self, exam_id: ExamId) -> String {
        fill(&self.questions, exam_id)
    }
}

fn fill(template: &str, exam_id: ExamId) -> String {
    template
        .replace("{exam_id}", &exam_id.to_string())
        .trim_start_matches('/')
        .to_string()
}

/// Where and how to reach the exam backend.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: Url,
    pub auth_token: Option<String>,
    pub csrf_token: Option<String>,
    pub endpoints: Endpoints,
    /// `None` leaves requests without a deadline.
    pub request_timeout: Option<Duration>,
}

impl BackendConfig {
    /// Build a config for `base_url` with default routes and no credentials.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("EXAM_API_BASE_URL", base_url)?,
            auth_token: None,
            csrf_token: None,
            endpoints: Endpoints::default(),
            request_timeout: None,
        })
    }

    /// Read `EXAM_API_BASE_URL`, `EXAM_API_TOKEN`, `EXAM_CSRF_TOKEN` and
    /// `EXAM_REQUEST_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = env::var("EXAM_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let mut config = Self::new(&base)?;
        config.auth_token = non_empty_var("EXAM_API_TOKEN");
        config.csrf_token = non_empty_var("EXAM_CSRF_TOKEN");
        config.request_timeout =
            parse_u64_var("EXAM_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);
        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = ensure_trailing_slash(base_url);
        self
    }

    /// Resolve a relative route against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the joined URL is invalid.
    pub fn url_for(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

/// Knobs for the in-browser session flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Remaining seconds at which the timer switches to its warning state.
    pub warning_secs: u32,
    /// Retry policy for idempotent backend reads.
    pub retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            warning_secs: DEFAULT_WARNING_SECS,
            retry: RetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Read `EXAM_WARNING_SECS` (defaults to five minutes).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` if the value is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(secs) = parse_u64_var("EXAM_WARNING_SECS")? {
            config.warning_secs =
                u32::try_from(secs).map_err(|_| ConfigError::InvalidNumber {
                    var: "EXAM_WARNING_SECS",
                    raw: secs.to_string(),
                })?;
        }
        Ok(config)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64_var(name: &'static str) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = non_empty_var(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber { var: name, raw })
}

fn parse_base_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim())
        .map(ensure_trailing_slash)
        .map_err(|source| ConfigError::InvalidUrl {
            var,
            raw: raw.to_string(),
            source,
        })
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_substitute_exam_id() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.start_attempt_path(ExamId::new(12)),
            "exams/api/start_attempt/12/"
        );
        assert_eq!(
            endpoints.questions_path(ExamId::new(12)),
            "api/exams/12/questions/"
        );
    }

    #[test]
    fn base_url_keeps_prefix_path() {
        let config = BackendConfig::new("https://school.example/portal").unwrap();
        let url = config.url_for("api/exams/submit/").unwrap();
        assert_eq!(url.as_str(), "https://school.example/portal/api/exams/submit/");
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let err = BackendConfig::new("not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn leading_slash_in_template_is_ignored() {
        let endpoints = Endpoints {
            questions: "/custom/{exam_id}/q".into(),
            ..Endpoints::default()
        };
        assert_eq!(endpoints.questions_path(ExamId::new(1)), "custom/1/q");
    }
}
