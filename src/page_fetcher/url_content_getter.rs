use std::future::Future;

use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Media type without parameters, e.g. `application/json`.
    pub content_type: Option<String>,
    pub body: String,
}

#[cfg(test)]
impl RawResponse {
    pub fn ok(content_type: &str, body: &str) -> Self {
        RawResponse {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: body.to_string(),
        }
    }
}

pub trait URLContentGetter: Send + Sync + Clone {
    fn get(&self, url: &str) -> impl Future<Output = Result<RawResponse, FetchError>> + Send;
}

fn media_type(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().to_ascii_lowercase())
}

impl URLContentGetter for reqwest::Client {
    #[tracing::instrument(skip(self))]
    fn get(&self, url: &str) -> impl Future<Output = Result<RawResponse, FetchError>> + Send {
        async move {
            let url = url.to_string();
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::USER_AGENT,
                reqwest::header::HeaderValue::from_static("terveyskirjasto-crawler/0.1"),
            );
            match reqwest::Client::get(self, url).headers(headers).send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let content_type = media_type(resp.headers());
                    tracing::info!("Got response [{}] content-type {:?}", status, content_type);
                    match resp.text().await {
                        Ok(body) => Ok(RawResponse {
                            status,
                            content_type,
                            body,
                        }),
                        Err(err) => {
                            tracing::error!("{}", err.to_string());
                            Err(FetchError::Body(err.to_string()))
                        }
                    }
                }
                Err(err) => {
                    tracing::error!("{}", err.to_string());
                    match err.status() {
                        Some(sc) => Err(FetchError::Status(sc.as_u16())),
                        None => Err(FetchError::Transport(err.to_string())),
                    }
                }
            }
        }
    }
}
