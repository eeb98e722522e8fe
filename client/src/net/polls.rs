//! Typed poll and vote endpoints.
//!
//! SYSTEM CONTEXT
//! ==============
//! Thin wrappers over [`ApiClient`]; the bearer token comes from the client's
//! session store, so callers never pass credentials here.
//!
//! ERROR HANDLING
//! ==============
//! Every method returns [`ApiError`]. Inputs that the server would reject
//! anyway (blank titles, fewer than two options, ids that would break the
//! path) fail locally with a 422 validation error and no request.

#[cfg(test)]
#[path = "polls_test.rs"]
mod polls_test;

use std::future::Future;

use super::api::ApiClient;
use super::error::ApiError;
use super::types::{CreatePollData, PaginatedResponse, Poll, UpdatePollData, Vote, VoteData};

pub const MIN_POLL_OPTIONS: usize = 2;

#[derive(Clone, Debug)]
pub struct PollsApi {
    api: ApiClient,
}

impl PollsApi {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails.
    pub async fn list(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<PaginatedResponse<Poll>, ApiError> {
        let params = [
            ("page", page.map(|p| p.to_string())),
            ("limit", limit.map(|l| l.to_string())),
        ];
        self.api.get("/polls", &params).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] if `id` is not a usable path segment or the
    /// request fails.
    pub async fn get(&self, id: &str) -> Result<Poll, ApiError> {
        let path = poll_path(id)?;
        self.api.get(&path, &[]).await
    }

    /// # Errors
    ///
    /// Returns a validation [`ApiError`] without sending when `data` is
    /// incomplete, otherwise any request failure.
    pub async fn create(&self, data: &CreatePollData) -> Result<Poll, ApiError> {
        validate_new_poll(data)?;
        let poll: Poll = self.api.post("/polls", data).await?;
        tracing::info!(poll_id = %poll.id, "poll created");
        Ok(poll)
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] if `id` is unusable or the request fails.
    pub async fn update(&self, id: &str, data: &UpdatePollData) -> Result<Poll, ApiError> {
        if data.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ApiError::validation("Poll title cannot be empty"));
        }
        let path = poll_path(id)?;
        self.api.patch(&path, data).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] if `id` is unusable or the request fails.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let path = poll_path(id)?;
        // Servers answer 204 or a JSON acknowledgement; either means deleted.
        let _ack: serde_json::Value = self.api.delete(&path).await?;
        tracing::info!(poll_id = %id, "poll deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] if no option is selected, the poll id is unusable,
    /// or the request fails.
    pub async fn vote(&self, data: &VoteData) -> Result<Vec<Vote>, ApiError> {
        if data.option_ids.is_empty() {
            return Err(ApiError::validation("Select at least one option"));
        }
        let path = format!("{}/votes", poll_path(&data.poll_id)?);
        self.api.post(&path, data).await
    }
}

/// Await `call`, keeping only the error message on failure.
///
/// # Errors
///
/// Returns the [`ApiError`] message when `call` fails.
pub async fn handle_api_call<T, F>(call: F) -> Result<T, String>
where
    F: Future<Output = Result<T, ApiError>>,
{
    call.await.map_err(|e| {
        tracing::debug!(status = e.status, error = %e, "api call failed");
        e.message
    })
}

// =============================================================================
// VALIDATION
// =============================================================================

pub(crate) fn validate_new_poll(data: &CreatePollData) -> Result<(), ApiError> {
    if data.title.trim().is_empty() {
        return Err(ApiError::validation("Poll title is required"));
    }
    let filled = data.options.iter().filter(|o| !o.trim().is_empty()).count();
    if filled < MIN_POLL_OPTIONS {
        return Err(ApiError::validation(format!(
            "A poll needs at least {MIN_POLL_OPTIONS} options"
        )));
    }
    Ok(())
}

pub(crate) fn poll_path(id: &str) -> Result<String, ApiError> {
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::validation(format!("invalid poll id `{id}`")));
    }
    Ok(format!("/polls/{id}"))
}
