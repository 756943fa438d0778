//! Authenticated Google Calendar session.
//!
//! [`CalendarApi`] is the seam the command dispatcher talks to: every
//! remote operation as an object-safe async method. [`GoogleSession`]
//! implements it over the REST client, loading stored tokens on
//! construction and refreshing the access token transparently before
//! each call.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock as TokioRwLock;
use tracing::{debug, info};

use calman_core::acl::AclRule;
use calman_core::calendar::{CalendarListEntry, WatchChannel};
use calman_core::event::EventBody;
use calman_core::freebusy::{FreeBusyRequest, FreeBusyResponse};

use crate::client::{BatchOutcome, CalendarClient};
use crate::config::GoogleConfig;
use crate::error::{ApiError, ApiResult};
use crate::oauth::OAuthClient;
use crate::tokens::TokenStorage;

/// A boxed future for async trait methods.
///
/// Async functions in traits do not mix with dynamic dispatch; boxing
/// keeps the trait object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The remote operations the command dispatcher relies on.
///
/// One method per operation, all yielding parsed entities or an
/// [`ApiError`]. Commands hold a `&dyn CalendarApi`, so tests drive
/// them with scripted fakes instead of a live session.
pub trait CalendarApi: Send + Sync {
    /// Lists non-cancelled event instances in a time window, expanded
    /// and ordered by start time.
    fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: Option<usize>,
    ) -> BoxFuture<'_, ApiResult<Vec<EventBody>>>;

    /// Fetches a single event by ID.
    fn get_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, ApiResult<EventBody>>;

    /// Inserts a new event and returns the created entity.
    fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventBody,
    ) -> BoxFuture<'_, ApiResult<EventBody>>;

    /// Replaces an event, honoring the body's ETag as `If-Match`.
    fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &EventBody,
    ) -> BoxFuture<'_, ApiResult<EventBody>>;

    /// Deletes an event.
    fn delete_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, ApiResult<()>>;

    /// Queries free/busy intervals for one or more calendars.
    fn query_free_busy(
        &self,
        query: &FreeBusyRequest,
    ) -> BoxFuture<'_, ApiResult<FreeBusyResponse>>;

    /// Lists the ACL rules of a calendar.
    fn list_acl_rules(&self, calendar_id: &str) -> BoxFuture<'_, ApiResult<Vec<AclRule>>>;

    /// Inserts an ACL rule and returns the created rule.
    fn insert_acl_rule(
        &self,
        calendar_id: &str,
        rule: &AclRule,
    ) -> BoxFuture<'_, ApiResult<AclRule>>;

    /// Deletes an ACL rule by rule ID.
    fn delete_acl_rule(&self, calendar_id: &str, rule_id: &str) -> BoxFuture<'_, ApiResult<()>>;

    /// Lists the calendars on the user's calendar list.
    fn list_calendars(&self) -> BoxFuture<'_, ApiResult<Vec<CalendarListEntry>>>;

    /// Registers a notification channel for event changes.
    fn watch_events(
        &self,
        calendar_id: &str,
        channel: &WatchChannel,
    ) -> BoxFuture<'_, ApiResult<WatchChannel>>;

    /// Lists events from several calendars in one round trip, with
    /// per-part outcomes.
    fn batch_list_events(
        &self,
        calendar_ids: &[String],
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> BoxFuture<'_, ApiResult<Vec<BatchOutcome>>>;
}

/// An authenticated Google Calendar session.
#[derive(Debug)]
pub struct GoogleSession {
    config: GoogleConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    /// REST client behind an async lock so a refresh can swap it.
    api_client: TokioRwLock<Option<CalendarClient>>,
}

impl GoogleSession {
    /// Opens a session with the given configuration.
    ///
    /// Loads any stored tokens but does not initiate the OAuth flow;
    /// call [`authenticate`](Self::authenticate) when
    /// [`needs_reauth`](Self::needs_reauth) says so.
    pub fn connect(config: GoogleConfig) -> ApiResult<Self> {
        config.validate().map_err(ApiError::configuration)?;

        let token_storage = TokenStorage::new(&config.token_path);
        let _ = token_storage.load();

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout);

        let api_client = token_storage
            .get()
            .filter(|tokens| !tokens.is_expired())
            .map(|tokens| client_for(&config, &tokens.access_token));

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client: TokioRwLock::new(api_client),
        })
    }

    /// Runs the OAuth consent flow and stores the obtained tokens.
    pub async fn authenticate(&self) -> ApiResult<()> {
        info!("starting Google authentication flow");

        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;

        self.token_storage.set(tokens.clone())?;
        *self.api_client.write().await = Some(client_for(&self.config, &tokens.access_token));

        info!("authentication successful");
        Ok(())
    }

    /// True when no usable grant is stored for the configured scopes.
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    /// True when stored tokens are usable, directly or via refresh.
    pub fn is_authenticated(&self) -> bool {
        match self.token_storage.get() {
            Some(tokens) => !tokens.is_expired() || tokens.refresh_token.is_some(),
            None => false,
        }
    }

    /// Where tokens are persisted.
    pub fn token_path(&self) -> &Path {
        self.token_storage.path()
    }

    /// Drops the stored tokens, forcing a fresh consent flow.
    pub fn clear_tokens(&self) -> ApiResult<()> {
        self.token_storage.clear()
    }

    /// Ensures a client with a live access token exists.
    async fn ensure_client(&self) -> ApiResult<()> {
        {
            let client = self.api_client.read().await;
            if client.is_some()
                && let Some(tokens) = self.token_storage.get()
                && !tokens.is_expired()
            {
                return Ok(());
            }
        }

        self.ensure_authenticated().await
    }

    /// Refreshes the access token if needed and (re)builds the client.
    async fn ensure_authenticated(&self) -> ApiResult<()> {
        let tokens = self
            .token_storage
            .get()
            .ok_or_else(|| ApiError::authentication("not authenticated - run 'calman auth'"))?;

        if tokens.is_expired() {
            let refresh_token = tokens.refresh_token.as_ref().ok_or_else(|| {
                ApiError::authentication("no refresh token - re-authentication required")
            })?;

            debug!("refreshing expired access token");

            let (new_access_token, expires_in) =
                self.oauth_client.refresh_token(refresh_token).await?;

            self.token_storage
                .update_access_token(&new_access_token, expires_in)?;

            let mut client = self.api_client.write().await;
            match client.as_mut() {
                Some(c) => c.set_access_token(&new_access_token),
                None => *client = Some(client_for(&self.config, &new_access_token)),
            }
        } else {
            let mut client = self.api_client.write().await;
            if client.is_none() {
                *client = Some(client_for(&self.config, &tokens.access_token));
            }
        }

        Ok(())
    }

    /// Read access to the client, refreshing tokens first.
    async fn client(&self) -> ApiResult<tokio::sync::RwLockReadGuard<'_, Option<CalendarClient>>> {
        self.ensure_client().await?;
        Ok(self.api_client.read().await)
    }
}

fn client_for(config: &GoogleConfig, access_token: &str) -> CalendarClient {
    CalendarClient::new(access_token, config.timeout, &config.user_agent)
}

fn ready(guard: &Option<CalendarClient>) -> ApiResult<&CalendarClient> {
    guard
        .as_ref()
        .ok_or_else(|| ApiError::internal("API client not available"))
}

impl CalendarApi for GoogleSession {
    fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: Option<usize>,
    ) -> BoxFuture<'_, ApiResult<Vec<EventBody>>> {
        let calendar_id = calendar_id.to_string();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?
                .list_events(&calendar_id, time_min, time_max, max_results)
                .await
        })
    }

    fn get_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, ApiResult<EventBody>> {
        let calendar_id = calendar_id.to_string();
        let event_id = event_id.to_string();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?.get_event(&calendar_id, &event_id).await
        })
    }

    fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventBody,
    ) -> BoxFuture<'_, ApiResult<EventBody>> {
        let calendar_id = calendar_id.to_string();
        let event = event.clone();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?.insert_event(&calendar_id, &event).await
        })
    }

    fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &EventBody,
    ) -> BoxFuture<'_, ApiResult<EventBody>> {
        let calendar_id = calendar_id.to_string();
        let event_id = event_id.to_string();
        let event = event.clone();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?
                .update_event(&calendar_id, &event_id, &event)
                .await
        })
    }

    fn delete_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, ApiResult<()>> {
        let calendar_id = calendar_id.to_string();
        let event_id = event_id.to_string();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?.delete_event(&calendar_id, &event_id).await
        })
    }

    fn query_free_busy(
        &self,
        query: &FreeBusyRequest,
    ) -> BoxFuture<'_, ApiResult<FreeBusyResponse>> {
        let query = query.clone();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?.query_free_busy(&query).await
        })
    }

    fn list_acl_rules(&self, calendar_id: &str) -> BoxFuture<'_, ApiResult<Vec<AclRule>>> {
        let calendar_id = calendar_id.to_string();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?.list_acl_rules(&calendar_id).await
        })
    }

    fn insert_acl_rule(
        &self,
        calendar_id: &str,
        rule: &AclRule,
    ) -> BoxFuture<'_, ApiResult<AclRule>> {
        let calendar_id = calendar_id.to_string();
        let rule = rule.clone();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?.insert_acl_rule(&calendar_id, &rule).await
        })
    }

    fn delete_acl_rule(&self, calendar_id: &str, rule_id: &str) -> BoxFuture<'_, ApiResult<()>> {
        let calendar_id = calendar_id.to_string();
        let rule_id = rule_id.to_string();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?.delete_acl_rule(&calendar_id, &rule_id).await
        })
    }

    fn list_calendars(&self) -> BoxFuture<'_, ApiResult<Vec<CalendarListEntry>>> {
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?.list_calendars().await
        })
    }

    fn watch_events(
        &self,
        calendar_id: &str,
        channel: &WatchChannel,
    ) -> BoxFuture<'_, ApiResult<WatchChannel>> {
        let calendar_id = calendar_id.to_string();
        let channel = channel.clone();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?.watch_events(&calendar_id, &channel).await
        })
    }

    fn batch_list_events(
        &self,
        calendar_ids: &[String],
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> BoxFuture<'_, ApiResult<Vec<BatchOutcome>>> {
        let calendar_ids = calendar_ids.to_vec();
        Box::pin(async move {
            let guard = self.client().await?;
            ready(&guard)?
                .batch_list_events(&calendar_ids, time_min, time_max)
                .await
        })
    }
}
