//! Request dispatcher
//!
//! Sends one payload to the planner endpoint and turns whatever comes back
//! into a [`RenderState`]. Every submission gets a sequence number; when a
//! newer submission has started by the time a reply arrives, the older reply
//! is dropped instead of overwriting the newer one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::payload::Payload;
use crate::render::{RenderState, RenderTarget};
use crate::transport::{HttpReply, Transport};
use crate::{PlannerError, Result};

/// Result of a single dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The reply was the latest one and has been rendered
    Rendered(RenderState),
    /// Input was rejected before sending; carries the message shown
    Rejected(String),
    /// A newer submission started while this one was in flight
    Superseded,
}

impl Dispatch {
    /// Rendered state, if any
    #[must_use]
    pub fn state(&self) -> Option<&RenderState> {
        match self {
            Dispatch::Rendered(state) => Some(state),
            Dispatch::Rejected(_) | Dispatch::Superseded => None,
        }
    }

    /// Whether the submission left something in the error slot
    #[must_use]
    pub fn is_error(&self) -> bool {
        match self {
            Dispatch::Rendered(state) => state.has_error(),
            Dispatch::Rejected(_) | Dispatch::Superseded => true,
        }
    }
}

pub struct Dispatcher<T: Transport> {
    transport: Arc<T>,
    url: String,
    endpoint: String,
    latest: Arc<AtomicU64>,
}

// Manual impl: `T` itself does not need to be `Clone`
impl<T: Transport> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            url: self.url.clone(),
            endpoint: self.endpoint.clone(),
            latest: Arc::clone(&self.latest),
        }
    }
}

impl<T: Transport> Dispatcher<T> {
    /// `base_url` without trailing slash, `endpoint` with a leading one
    pub fn new(transport: T, base_url: &str, endpoint: &str) -> Self {
        Self {
            transport: Arc::new(transport),
            url: format!("{}{}", base_url.trim_end_matches('/'), endpoint),
            endpoint: endpoint.to_string(),
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Full request URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Placeholder rendered while a request is in flight
    #[must_use]
    pub fn placeholder(&self) -> RenderState {
        RenderState::sending(&self.endpoint)
    }

    /// Send `payload` and render the outcome on `target`.
    ///
    /// The target first receives the "sending" placeholder (which also clears
    /// any earlier error), then the final state unless the dispatch was
    /// superseded.
    #[instrument(skip(self, payload, target), fields(url = %self.url))]
    pub async fn dispatch<R: RenderTarget + ?Sized>(
        &self,
        payload: &Payload,
        target: &mut R,
    ) -> Dispatch {
        let sequence = self.next_sequence();
        target.render_sending(&self.placeholder());

        let body = payload.to_body();
        debug!(sequence, "Dispatching payload: {}", body);

        let state = match self.transport.post_json(&self.url, body).await {
            Ok(reply) => interpret(reply),
            Err(e) => RenderState::failure(e.user_message()),
        };

        if self.latest.load(Ordering::SeqCst) != sequence {
            debug!(sequence, "Dropping reply of superseded dispatch");
            return Dispatch::Superseded;
        }

        target.render(&state);
        Dispatch::Rendered(state)
    }

    /// Submit free text: parse it, and only dispatch when it is valid JSON.
    ///
    /// Input errors are rendered directly and nothing is sent. A rejected
    /// submission still counts as the latest one, so replies to earlier
    /// dispatches still in flight are dropped.
    pub async fn submit_text<R: RenderTarget + ?Sized>(
        &self,
        raw: &str,
        target: &mut R,
    ) -> Dispatch {
        match crate::payload::parse_freeform(raw) {
            Ok(payload) => self.dispatch(&payload, target).await,
            Err(e) => {
                let sequence = self.next_sequence();
                info!(sequence, "Rejected free-text input: {}", e);
                let message = e.user_message();
                target.render_input_error(&message);
                Dispatch::Rejected(message)
            }
        }
    }

    fn next_sequence(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Turn a raw reply into the rendering state
#[must_use]
pub fn interpret(reply: HttpReply) -> RenderState {
    let output = match body_text(&reply) {
        Ok(text) => text,
        // A JSON body that does not parse is reported like a failed request
        Err(e) => return RenderState::failure(e.user_message()),
    };

    if reply.is_success() {
        RenderState::success(output)
    } else {
        warn!("Planner API answered with status {}", reply.status);
        RenderState {
            output,
            error: PlannerError::Api {
                status: reply.status,
            }
            .user_message(),
        }
    }
}

/// Pretty-printed JSON (two-space indent) or the raw text
fn body_text(reply: &HttpReply) -> Result<String> {
    if !reply.is_json() {
        return Ok(reply.body.clone());
    }

    let value: Value = serde_json::from_str(&reply.body).map_err(|e| {
        PlannerError::network(format!("Response declared JSON but could not be parsed: {e}"))
    })?;
    serde_json::to_string_pretty(&value)
        .map_err(|e| PlannerError::network(format!("Failed to format response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingTarget;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted replies, one per call, with an optional delay each
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<(Duration, Result<HttpReply>)>>,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedTransport {
        fn reply(self, reply: Result<HttpReply>) -> Self {
            self.delayed(Duration::ZERO, reply)
        }

        fn delayed(self, delay: Duration, reply: Result<HttpReply>) -> Self {
            self.replies.lock().unwrap().push_back((delay, reply));
            self
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post_json(&self, url: &str, body: String) -> Result<HttpReply> {
            self.requests.lock().unwrap().push((url.to_string(), body));
            let (delay, reply) = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted reply left");
            tokio::time::sleep(delay).await;
            reply
        }
    }

    fn dispatcher(transport: ScriptedTransport) -> Dispatcher<ScriptedTransport> {
        Dispatcher::new(transport, "http://planner.test/", "/plan-activity")
    }

    fn sent(dispatcher: &Dispatcher<ScriptedTransport>) -> Vec<(String, String)> {
        dispatcher.transport.requests.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_json_success_is_pretty_printed() {
        let transport = ScriptedTransport::default().reply(Ok(HttpReply::new(
            200,
            Some("application/json"),
            r#"{"sunrise":"6:01:02 AM","activities":["Picnic"]}"#,
        )));
        let dispatcher = dispatcher(transport);
        let mut target = RecordingTarget::new();

        let payload = Payload::Freeform(serde_json::json!({"latitude": 1.0}));
        let outcome = dispatcher.dispatch(&payload, &mut target).await;

        let state = outcome.state().unwrap();
        assert_eq!(
            state.output,
            "{\n  \"sunrise\": \"6:01:02 AM\",\n  \"activities\": [\n    \"Picnic\"\n  ]\n}"
        );
        assert_eq!(state.error, "");
        assert_eq!(target.history[0], dispatcher.placeholder());
        assert_eq!(&target.current(), state);
    }

    #[tokio::test]
    async fn test_request_goes_to_endpoint_with_serialized_body() {
        let transport =
            ScriptedTransport::default().reply(Ok(HttpReply::new(200, Some("text/plain"), "ok")));
        let dispatcher = dispatcher(transport);
        let mut target = RecordingTarget::new();

        dispatcher
            .submit_text(
                r#"{"latitude": -23.5, "longitude": -46.6, "date": "2024-01-01"}"#,
                &mut target,
            )
            .await;

        assert_eq!(
            sent(&dispatcher),
            vec![(
                "http://planner.test/plan-activity".to_string(),
                r#"{"latitude":-23.5,"longitude":-46.6,"date":"2024-01-01"}"#.to_string()
            )]
        );
        assert_eq!(target.current().output, "ok");
    }

    #[tokio::test]
    async fn test_server_error_keeps_body_and_reports_status() {
        let transport = ScriptedTransport::default().reply(Ok(HttpReply::new(
            500,
            Some("application/json"),
            r#"{"error":"bad"}"#,
        )));
        let dispatcher = dispatcher(transport);
        let mut target = RecordingTarget::new();

        let payload = Payload::Freeform(serde_json::json!({}));
        dispatcher.dispatch(&payload, &mut target).await;

        let state = target.current();
        assert_eq!(state.output, "{\n  \"error\": \"bad\"\n}");
        assert!(state.error.contains("500"));
    }

    #[tokio::test]
    async fn test_plain_text_body_is_verbatim() {
        let transport = ScriptedTransport::default().reply(Ok(HttpReply::new(
            404,
            Some("text/html"),
            "<h1>Not Found</h1>\n",
        )));
        let dispatcher = dispatcher(transport);
        let mut target = RecordingTarget::new();

        dispatcher
            .dispatch(&Payload::Freeform(Value::Null), &mut target)
            .await;

        let state = target.current();
        assert_eq!(state.output, "<h1>Not Found</h1>\n");
        assert!(state.error.contains("status 404"));
    }

    #[tokio::test]
    async fn test_network_failure_clears_output() {
        let transport = ScriptedTransport::default()
            .reply(Err(PlannerError::network("connection refused")));
        let dispatcher = dispatcher(transport);
        let mut target = RecordingTarget::new();

        dispatcher
            .dispatch(&Payload::Freeform(Value::Null), &mut target)
            .await;

        let state = target.current();
        assert_eq!(state.output, "");
        assert_eq!(state.error, "Network error: connection refused");
    }

    #[tokio::test]
    async fn test_unparseable_json_body_is_reported_as_failure() {
        let transport = ScriptedTransport::default().reply(Ok(HttpReply::new(
            200,
            Some("application/json"),
            "not json",
        )));
        let dispatcher = dispatcher(transport);
        let mut target = RecordingTarget::new();

        dispatcher
            .dispatch(&Payload::Freeform(Value::Null), &mut target)
            .await;

        let state = target.current();
        assert_eq!(state.output, "");
        assert!(state.error.starts_with("Network error: Response declared JSON"));
    }

    #[tokio::test]
    async fn test_empty_text_sends_nothing() {
        let dispatcher = dispatcher(ScriptedTransport::default());
        let mut target = RecordingTarget::new();

        let outcome = dispatcher.submit_text("   \n", &mut target).await;

        assert!(sent(&dispatcher).is_empty());
        assert_eq!(
            outcome,
            Dispatch::Rejected("Paste valid JSON before sending.".to_string())
        );
        assert!(outcome.is_error());
        assert_eq!(target.history.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_text_keeps_previous_output() {
        let transport =
            ScriptedTransport::default().reply(Ok(HttpReply::new(200, Some("text/plain"), "plan")));
        let dispatcher = dispatcher(transport);
        let mut target = RecordingTarget::new();

        dispatcher.submit_text("{}", &mut target).await;
        dispatcher.submit_text("", &mut target).await;

        let state = target.current();
        assert_eq!(state.output, "plan");
        assert_eq!(state.error, "Paste valid JSON before sending.");
    }

    #[tokio::test]
    async fn test_malformed_text_sends_nothing() {
        let dispatcher = dispatcher(ScriptedTransport::default());
        let mut target = RecordingTarget::new();

        let outcome = dispatcher
            .submit_text("{\"date\": 2024-01-01}", &mut target)
            .await;

        assert!(sent(&dispatcher).is_empty());
        let Dispatch::Rejected(error) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert!(error.starts_with("Failed to parse JSON: "));
        assert!(error.contains("line 1"));
    }

    #[tokio::test]
    async fn test_stale_reply_is_not_rendered() {
        let transport = ScriptedTransport::default()
            .delayed(
                Duration::from_millis(200),
                Ok(HttpReply::new(200, Some("text/plain"), "first")),
            )
            .delayed(
                Duration::from_millis(10),
                Ok(HttpReply::new(200, Some("text/plain"), "second")),
            );
        let dispatcher = dispatcher(transport);
        let payload = Payload::Freeform(Value::Null);

        let mut first_target = RecordingTarget::new();
        let mut second_target = RecordingTarget::new();

        let first = dispatcher.dispatch(&payload, &mut first_target);
        let second = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            dispatcher.dispatch(&payload, &mut second_target).await
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, Dispatch::Superseded);
        assert_eq!(second.state().unwrap().output, "second");
        // The superseded dispatch only ever showed its placeholder
        assert_eq!(first_target.history, vec![dispatcher.placeholder()]);
    }

    #[tokio::test]
    async fn test_rejected_text_supersedes_reply_in_flight() {
        let transport = ScriptedTransport::default().delayed(
            Duration::from_millis(100),
            Ok(HttpReply::new(200, Some("text/plain"), "old reply")),
        );
        let dispatcher = dispatcher(transport);
        let payload = Payload::Freeform(Value::Null);

        let mut first_target = RecordingTarget::new();
        let mut second_target = RecordingTarget::new();

        let first = dispatcher.dispatch(&payload, &mut first_target);
        let second = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            dispatcher.submit_text("   ", &mut second_target).await
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, Dispatch::Superseded);
        assert!(matches!(second, Dispatch::Rejected(_)));
        assert_eq!(first_target.history, vec![dispatcher.placeholder()]);
        assert_eq!(second_target.current().error, "Paste valid JSON before sending.");
    }
}
