//! Write-path operations: subscribe and the two predictors.
//!
//! Mutations never touch the cache and never fall back to mock data;
//! the upstream message is surfaced verbatim and retry is the caller
//! invoking the operation again.

use std::sync::Arc;

use serde_json::json;

use crate::domain::{PriceFeatures, PricePrediction, PredictionOutcome};
use crate::error::{CoreError, FetchError, ValidationError};
use crate::gateway::{CancelToken, Gateway, DEFAULT_TIMEOUT_MS};

/// API write operations behind the gateway.
#[derive(Debug)]
pub struct Mutations {
    gateway: Arc<Gateway>,
}

impl Mutations {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Subscribe an email address to the notification list.
    pub async fn subscribe(&self, email: &str) -> Result<(), CoreError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ValidationError::InvalidEmail {
                value: email.to_owned(),
            }
            .into());
        }

        self.gateway
            .post(
                "/subscribe",
                &json!({ "email": email }),
                DEFAULT_TIMEOUT_MS,
                &CancelToken::new(),
            )
            .await?;
        Ok(())
    }

    /// Predict the next close from a raw feature vector.
    pub async fn predict_price(
        &self,
        features: PriceFeatures,
    ) -> Result<PricePrediction, FetchError> {
        let payload = self
            .gateway
            .post(
                "/stocks/predict/",
                &json!({ "features": features.as_vec() }),
                DEFAULT_TIMEOUT_MS,
                &CancelToken::new(),
            )
            .await?;
        serde_json::from_value(payload)
            .map_err(|e| FetchError::parse(format!("malformed prediction response: {e}")))
    }

    /// Classify a news snippet into a direction with confidence.
    pub async fn predict_news(&self, news_text: &str) -> Result<PredictionOutcome, FetchError> {
        let payload = self
            .gateway
            .post(
                "/predictions/",
                &json!({ "news_text": news_text }),
                DEFAULT_TIMEOUT_MS,
                &CancelToken::new(),
            )
            .await?;
        serde_json::from_value(payload)
            .map_err(|e| FetchError::parse(format!("malformed prediction response: {e}")))
    }

    /// List the symbols the backend can analyze.
    pub async fn symbol_directory(&self) -> Result<Vec<String>, FetchError> {
        let payload = self
            .gateway
            .get("/stocks/symbols/", &[], DEFAULT_TIMEOUT_MS, &CancelToken::new())
            .await?;
        let symbols = payload
            .get("symbols")
            .and_then(|value| value.as_array())
            .ok_or_else(|| FetchError::parse("symbol directory missing symbols list"))?;
        Ok(symbols
            .iter()
            .filter_map(|value| value.as_str().map(str::to_owned))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use crate::gateway::{HttpClient, HttpError, HttpRequest, HttpResponse};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    struct ScriptedClient {
        response: Mutex<Option<Result<HttpResponse, HttpError>>>,
        seen: Mutex<Option<HttpRequest>>,
    }

    impl ScriptedClient {
        fn replying(response: Result<HttpResponse, HttpError>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                seen: Mutex::new(None),
            })
        }
    }

    impl HttpClient for ScriptedClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            *self.seen.lock().expect("request log") = Some(request);
            let next = self
                .response
                .lock()
                .expect("script")
                .take()
                .unwrap_or_else(|| Ok(HttpResponse::ok_json("{}")));
            Box::pin(async move { next })
        }
    }

    fn mutations(client: Arc<ScriptedClient>) -> Mutations {
        Mutations::new(Arc::new(Gateway::new("/api", client)))
    }

    #[tokio::test]
    async fn subscribe_posts_the_email_body() {
        let client = ScriptedClient::replying(Ok(HttpResponse::ok_json("{}")));
        mutations(Arc::clone(&client))
            .subscribe("reader@example.com")
            .await
            .expect("subscribed");

        let seen = client.seen.lock().expect("request log");
        let request = seen.as_ref().expect("one request");
        assert_eq!(request.url, "/api/subscribe");
        assert_eq!(
            request.body.as_deref(),
            Some(r#"{"email":"reader@example.com"}"#)
        );
    }

    #[tokio::test]
    async fn subscribe_rejects_invalid_emails_locally() {
        let client = ScriptedClient::replying(Ok(HttpResponse::ok_json("{}")));
        let error = mutations(Arc::clone(&client))
            .subscribe("not-an-email")
            .await
            .expect_err("invalid");
        assert!(matches!(error, CoreError::Validation(_)));
        assert!(client.seen.lock().expect("request log").is_none());
    }

    #[tokio::test]
    async fn predictors_decode_their_payloads() {
        let client = ScriptedClient::replying(Ok(HttpResponse::ok_json(
            r#"{"prediction":"up","confidence":0.82}"#,
        )));
        let outcome = mutations(client)
            .predict_news("Earnings beat expectations")
            .await
            .expect("outcome");
        assert_eq!(outcome.prediction, "up");
        assert!((outcome.confidence - 0.82).abs() < 1e-9);

        let client = ScriptedClient::replying(Ok(HttpResponse::ok_json(r#"{"prediction":132.4}"#)));
        let features = PriceFeatures {
            open: 130.0,
            close: 131.5,
            volume: 2_000_000.0,
            sentiment: 0.3,
        };
        let prediction = mutations(client)
            .predict_price(features)
            .await
            .expect("prediction");
        assert!((prediction.prediction - 132.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn upstream_message_survives_verbatim() {
        let client = ScriptedClient::replying(Ok(HttpResponse {
            status: 400,
            body: String::from(r#"{"error":"News text is required"}"#),
        }));
        let error = mutations(client)
            .predict_news("")
            .await
            .expect_err("rejected");
        assert_eq!(error.kind(), FetchErrorKind::Http);
        assert!(error.message().contains("News text is required"));
    }

    #[tokio::test]
    async fn symbol_directory_extracts_the_list() {
        let client = ScriptedClient::replying(Ok(HttpResponse::ok_json(
            r#"{"symbols":["IBM","AAPL","TSLA"]}"#,
        )));
        let symbols = mutations(client).symbol_directory().await.expect("list");
        assert_eq!(symbols, vec!["IBM", "AAPL", "TSLA"]);
    }
}
