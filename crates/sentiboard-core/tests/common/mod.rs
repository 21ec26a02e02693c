//! Shared fixtures: a scripted HTTP transport and orchestrator
//! harness used across the behavior tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sentiboard_core::{
    FetchOrchestrator, Gateway, HttpClient, HttpError, HttpRequest, HttpResponse, MockPolicy,
    MockProviders, PersistentStore,
};

/// One scripted transport step.
pub enum Reply {
    /// Respond after the given virtual delay.
    Respond {
        delay: Duration,
        result: Result<HttpResponse, HttpError>,
    },
    /// Never resolve; the gateway deadline or a cancel token ends it.
    Hang,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Respond {
            delay: Duration::ZERO,
            result: Ok(HttpResponse::ok_json(body)),
        }
    }

    pub fn ok_after(delay: Duration, body: impl Into<String>) -> Self {
        Self::Respond {
            delay,
            result: Ok(HttpResponse::ok_json(body)),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Respond {
            delay: Duration::ZERO,
            result: Ok(HttpResponse {
                status,
                body: body.into(),
            }),
        }
    }

    pub fn error(error: HttpError) -> Self {
        Self::Respond {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }
}

/// FIFO-scripted `HttpClient` that records every request it sees.
/// An exhausted script answers with a connection failure.
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().expect("script lock").push_back(reply);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("request log").len()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("request log")
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests.lock().expect("request log").push(request);
        let reply = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(Reply::Respond {
                delay: Duration::ZERO,
                result: Err(HttpError::connect("script exhausted")),
            });

        Box::pin(async move {
            match reply {
                Reply::Respond { delay, result } => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    result
                }
                Reply::Hang => std::future::pending().await,
            }
        })
    }
}

/// Everything a pipeline test needs, wired the way production wires it
/// but with scripted transport, zero mock delay, and a memory store.
pub struct Harness {
    pub store: Arc<PersistentStore>,
    pub gateway: Arc<Gateway>,
    pub orchestrator: Arc<FetchOrchestrator>,
    pub client: Arc<ScriptedHttpClient>,
}

pub fn harness(policy: MockPolicy, script: Vec<Reply>) -> Harness {
    let client = ScriptedHttpClient::new(script);
    let store = Arc::new(PersistentStore::in_memory());
    let gateway = Arc::new(Gateway::new(
        "/api",
        Arc::clone(&client) as Arc<dyn HttpClient>,
    ));
    let orchestrator = Arc::new(FetchOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&gateway),
        MockProviders::without_delay(policy),
    ));
    Harness {
        store,
        gateway,
        orchestrator,
        client,
    }
}

/// A minimal live `/stock-opinion` body the normalizer accepts.
pub fn opinion_body(symbol: &str, price: f64) -> String {
    format!(
        r#"{{
            "symbol": "{symbol}",
            "technical": {{ "current_price": {price}, "rsi": 55.0 }},
            "opinion": {{ "action": "BUY", "confidence": 0.8, "rationale": ["earnings beat"] }},
            "factors": [{{ "title": "Momentum", "description": "above averages", "impact": "positive" }}]
        }}"#
    )
}
