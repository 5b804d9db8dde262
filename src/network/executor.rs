//! Send pipeline: flush buffers, apply auth, exchange cookies, capture response

use crate::app::AppState;
use crate::auth::AuthResolver;
use crate::constants::{DEFAULT_METHOD, DEFAULT_URL_SCHEME};
use crate::error::{user_message, CoreError, Result};
use crate::models::{Request, Response};
use crate::network::transport::Transport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Completed { status: u16, time_ms: u64 },
    /// Another request was already in flight
    Skipped,
}

/// Drives one request at a time through a [`Transport`].
pub struct HttpExecutor<T: Transport> {
    transport: T,
}

impl<T: Transport> HttpExecutor<T> {
    pub fn new(transport: T) -> Self {
        HttpExecutor { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send the edited request and store the response in `current_response`.
    ///
    /// Auth and cookies go onto a copy; the stored request never carries
    /// credentials or `Cookie` headers.
    pub fn send(&mut self, state: &mut AppState) -> Result<SendOutcome> {
        if state.request_in_progress {
            tracing::debug!("Send ignored, request already in flight");
            return Ok(SendOutcome::Skipped);
        }
        state.request_in_progress = true;
        let result = self.execute(state);
        state.request_in_progress = false;

        match &result {
            Ok(SendOutcome::Completed { status, time_ms }) => {
                state.status_message = format!(
                    "{} {} - {} ms",
                    status, state.current_response.status_text, time_ms
                );
            }
            Ok(SendOutcome::Skipped) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Request failed");
                state.status_message = match e {
                    CoreError::Transport(detail) => detail.clone(),
                    other => user_message(other.kind(), "send request"),
                };
            }
        }
        result
    }

    fn execute(&mut self, state: &mut AppState) -> Result<SendOutcome> {
        state.sync_ui_to_request();

        let in_collection = state.is_editing_collection_request();
        if !in_collection {
            prepare_scratch(state)?;
        }

        let mut wire = state.target_request().clone();
        if wire.method_supports_body() && !state.content.body.is_empty() {
            wire.set_body(state.content.body.as_bytes())?;
        }

        let collection_default = state
            .manager
            .active_collection()
            .and_then(|c| c.default_auth.clone());
        AuthResolver::new(collection_default).apply(&mut wire)?;

        state.current_response = Response::default();

        let mut jar_changed = false;
        let response = match state.manager.active_collection_mut() {
            Some(collection) => {
                let before = collection.cookie_jar.clone();
                let response = self
                    .transport
                    .send_with_cookies(&wire, &mut collection.cookie_jar)?;
                if collection.cookie_jar != before {
                    collection.update_modified_time();
                    jar_changed = true;
                }
                response
            }
            None => self.transport.send(&wire)?,
        };
        if jar_changed {
            state.mark_changed();
        }

        let outcome = SendOutcome::Completed {
            status: response.status_code,
            time_ms: response.response_time_ms,
        };
        state.current_response = response;

        if in_collection {
            if let Err(e) = state.perform_auto_save() {
                tracing::warn!(error = %e, "Auto-save after send failed");
            }
        }
        Ok(outcome)
    }
}

/// Scratch requests get a method and a scheme before they go out.
fn prepare_scratch(state: &mut AppState) -> Result<()> {
    let request: &mut Request = &mut state.current_request;
    if request.method().is_empty() {
        request.set_method(DEFAULT_METHOD)?;
    }
    let url = request.url().trim().to_string();
    if url.is_empty() {
        return Err(CoreError::NullParam("url"));
    }
    if !url.contains("://") {
        let full = format!("{}{}", DEFAULT_URL_SCHEME, url);
        request.set_url(&full)?;
        state.url_buffer = full;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Collection, RequestAuth};
    use crate::storage::{Settings, StorageLayout};

    struct Canned {
        sent: Vec<Request>,
        status: u16,
    }

    impl Transport for Canned {
        fn send(&mut self, request: &Request) -> Result<Response> {
            self.sent.push(request.clone());
            let mut response = Response::new(self.status);
            response.response_time_ms = 12;
            response.headers.add("Set-Cookie", "sid=1; Path=/")?;
            Ok(response)
        }
    }

    struct Failing;

    impl Transport for Failing {
        fn send(&mut self, _request: &Request) -> Result<Response> {
            Err(CoreError::Transport("Connection failed: refused".into()))
        }
    }

    fn state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(StorageLayout::new(dir.path()), Settings::default());
        (dir, state)
    }

    #[test]
    fn test_scratch_gets_scheme_and_no_cookies() {
        let (_dir, mut state) = state();
        state.url_buffer = "example.com/ping".into();
        state.mark_ui_dirty();

        let mut executor = HttpExecutor::new(Canned { sent: Vec::new(), status: 204 });
        let outcome = executor.send(&mut state).unwrap();
        assert_eq!(outcome, SendOutcome::Completed { status: 204, time_ms: 12 });
        assert_eq!(executor.transport().sent[0].url(), "https://example.com/ping");
        assert_eq!(state.url_buffer, "https://example.com/ping");
        assert_eq!(state.current_response.status_code, 204);
        assert!(state.status_message.starts_with("204 No Content"));
        assert!(!state.is_request_in_progress());
    }

    #[test]
    fn test_empty_scratch_url_is_rejected() {
        let (_dir, mut state) = state();
        let mut executor = HttpExecutor::new(Canned { sent: Vec::new(), status: 200 });
        assert!(matches!(executor.send(&mut state), Err(CoreError::NullParam(_))));
        assert!(executor.transport().sent.is_empty());
        assert!(!state.is_request_in_progress());
    }

    #[test]
    fn test_in_flight_send_is_skipped() {
        let (_dir, mut state) = state();
        state.request_in_progress = true;
        let mut executor = HttpExecutor::new(Canned { sent: Vec::new(), status: 200 });
        assert_eq!(executor.send(&mut state).unwrap(), SendOutcome::Skipped);
        assert!(executor.transport().sent.is_empty());
    }

    #[test]
    fn test_auth_applied_to_wire_copy_only() {
        let (_dir, mut state) = state();
        let mut c = Collection::new("C", "").unwrap();
        c.default_auth = Some(RequestAuth::bearer("team"));
        c.add_request(&Request::new("GET", "https://h/me").unwrap(), "me")
            .unwrap();
        state.manager.add_collection(c);
        state.set_active_collection(0).unwrap();

        let mut executor = HttpExecutor::new(Canned { sent: Vec::new(), status: 200 });
        executor.send(&mut state).unwrap();
        let sent = &executor.transport().sent[0];
        assert_eq!(sent.headers.get("Authorization"), Some("Bearer team"));
        assert_eq!(state.active_request().unwrap().headers.find("Authorization"), None);

        assert_eq!(state.active_collection().unwrap().cookie_jar.len(), 1);
        assert!(state.has_unsaved_changes());

        executor.send(&mut state).unwrap();
        assert_eq!(executor.transport().sent[1].headers.get("Cookie"), Some("sid=1"));
        assert_eq!(state.active_request().unwrap().headers.find("Cookie"), None);
    }

    #[test]
    fn test_edited_default_auth_is_sent_and_kept() {
        let (_dir, mut state) = state();
        let mut c = Collection::new("C", "").unwrap();
        c.add_request(&Request::new("GET", "https://h/me").unwrap(), "me")
            .unwrap();
        state.manager.add_collection(c);
        state.set_active_collection(0).unwrap();
        assert_eq!(state.collection_default_auth, None);

        state.collection_default_auth = Some(RequestAuth::bearer("edited"));
        let mut executor = HttpExecutor::new(Canned { sent: Vec::new(), status: 200 });
        executor.send(&mut state).unwrap();

        let sent = &executor.transport().sent[0];
        assert_eq!(sent.headers.get("Authorization"), Some("Bearer edited"));
        assert_eq!(
            state.active_collection().unwrap().default_auth,
            Some(RequestAuth::bearer("edited"))
        );
        assert!(state.has_unsaved_changes());
    }

    #[test]
    fn test_transport_error_sets_status() {
        let (_dir, mut state) = state();
        state.url_buffer = "https://h/".into();
        state.mark_ui_dirty();
        let mut executor = HttpExecutor::new(Failing);
        assert!(executor.send(&mut state).is_err());
        assert_eq!(state.status_message, "Connection failed: refused");
        assert!(!state.current_response.has_response());
        assert!(!state.is_request_in_progress());
    }
}
