use crate::config::Settings;
use crate::error::QueryError;
use crate::model::ParamMap;
use async_trait::async_trait;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::time::Duration;

/// Executes planned requests and returns their bodies glued together.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run one GET per parameter set against `url`.
    ///
    /// Bodies are concatenated in submission order, each ending in a newline.
    ///
    /// # Errors
    ///
    /// Will return `Err` if any request fails or returns a non-success status
    async fn execute(&self, url: &str, param_sets: &[ParamMap]) -> Result<String, QueryError>;
}

/// Flatten a parameter map into query pairs; a key with several values repeats.
#[must_use]
pub fn query_pairs(params: &ParamMap) -> Vec<(String, String)> {
    params
        .iter()
        .flat_map(|(key, values)| values.iter().map(move |value| (key.clone(), value.clone())))
        .collect()
}

pub struct HttpTransport {
    client: Client,
    stagger: Duration,
    show_progress: bool,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client cannot be built
    pub fn new(settings: &Settings) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| QueryError::Config(format!("building http client: {e}")))?;
        Ok(Self::with_client(
            client,
            settings.stagger(),
            settings.show_progress,
        ))
    }

    #[must_use]
    pub fn with_client(client: Client, stagger: Duration, show_progress: bool) -> Self {
        Self {
            client,
            stagger,
            show_progress,
        }
    }

    /// Fetch a single URL with no query string.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the request fails or returns a non-success status
    pub async fn get_text(&self, url: &str) -> Result<String, QueryError> {
        fetch(&self.client, url, &[]).await
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let style = ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_message("requests");
        bar.enable_steady_tick(Duration::from_millis(120));
        Some(bar)
    }
}

async fn fetch(
    client: &Client,
    url: &str,
    pairs: &[(String, String)],
) -> Result<String, QueryError> {
    let response = client.get(url).query(pairs).send().await?;
    let response = response.error_for_status()?;
    Ok(response.text().await?)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, url: &str, param_sets: &[ParamMap]) -> Result<String, QueryError> {
        let total = param_sets.len();
        if total > 1 {
            tracing::info!(requests = total, "splitting query into several requests");
        }
        let progress = self.progress_bar(total);

        let mut handles = Vec::with_capacity(total);
        for (idx, params) in param_sets.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.stagger).await;
            }
            tracing::debug!(request = idx + 1, total, url, "submitting request");
            let client = self.client.clone();
            let url = url.to_string();
            let pairs = query_pairs(params);
            let progress = progress.clone();
            handles.push(tokio::spawn(async move {
                let body = fetch(&client, &url, &pairs).await;
                if let Some(bar) = progress {
                    bar.inc(1);
                }
                body
            }));
        }

        let results = join_all(handles).await;
        let mut combined = String::new();
        for result in results {
            let body = match result {
                Ok(Ok(body)) => body,
                Ok(Err(err)) => {
                    if let Some(bar) = &progress {
                        bar.abandon_with_message("request failed");
                    }
                    return Err(err);
                }
                Err(err) => return Err(QueryError::Network(format!("request task failed: {err}"))),
            };
            combined.push_str(&body);
            if !body.is_empty() && !body.ends_with('\n') {
                combined.push('\n');
            }
        }
        if let Some(bar) = progress {
            bar.finish_and_clear();
        }
        Ok(combined)
    }
}
