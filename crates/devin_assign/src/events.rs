//! The `createDevinSession` event: server-side handler and client-side call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devin_api::{
    dedupe_attachments, AttachmentRecord, CreateSessionRequest, DevinApiClient, DevinApiConfig,
    DevinApiError, SessionCreated,
};
use field_bridge::{
    Bridge, BridgeError, FieldChannel, HandlerContext, HandlerError, HandlerRegistry, Trigger,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::session::{append_attachment_urls, CreateSessionArgs, SessionRecord};
use crate::settings::{parse_tags, ExtensionSettings, SessionTags};
use crate::{CREATE_SESSION_EVENT, EXTENSION_NAME};

/// Session endpoints used by the handler.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn upload_attachments(
        &self,
        attachments: &[AttachmentRecord],
    ) -> Result<Vec<String>, DevinApiError>;

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionCreated, DevinApiError>;
}

#[async_trait]
impl SessionApi for DevinApiClient {
    async fn upload_attachments(
        &self,
        attachments: &[AttachmentRecord],
    ) -> Result<Vec<String>, DevinApiError> {
        DevinApiClient::upload_attachments(self, attachments).await
    }

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionCreated, DevinApiError> {
        DevinApiClient::create_session(self, request).await
    }
}

/// Builds a [`SessionApi`] for the API key resolved from settings.
pub trait SessionApiFactory: Send + Sync + 'static {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn SessionApi>, DevinApiError>;
}

/// Factory for real [`DevinApiClient`]s.
#[derive(Debug, Clone, Default)]
pub struct DevinConnector {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl DevinConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl SessionApiFactory for DevinConnector {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn SessionApi>, DevinApiError> {
        let mut config = DevinApiConfig::new(api_key);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        Ok(Arc::new(DevinApiClient::new(config)?))
    }
}

/// Installs the `createDevinSession` handler.
pub fn register_create_session<C, F>(registry: &mut HandlerRegistry<C>, factory: Arc<F>)
where
    C: FieldChannel,
    F: SessionApiFactory,
{
    registry.register(
        CREATE_SESSION_EVENT,
        move |args: CreateSessionArgs, context: HandlerContext| {
            let factory = Arc::clone(&factory);
            async move { handle_create_session(args, context, factory.as_ref()).await }
        },
    );
}

/// Client-side call of `createDevinSession` over the bridge.
pub async fn create_devin_session<C, T>(
    bridge: &Bridge<C, T>,
    args: &CreateSessionArgs,
) -> Result<SessionRecord, BridgeError>
where
    C: FieldChannel,
    T: Trigger,
{
    bridge.invoke(CREATE_SESSION_EVENT, args).await
}

async fn handle_create_session<F>(
    args: CreateSessionArgs,
    context: HandlerContext,
    factory: &F,
) -> Result<SessionRecord, HandlerError>
where
    F: SessionApiFactory + ?Sized,
{
    let settings =
        ExtensionSettings::from_value(context.settings).map_err(HandlerError::from_error)?;
    let api_key = settings
        .api_key()
        .ok_or_else(|| HandlerError::new(format!("{EXTENSION_NAME} API key is not configured")))?;
    let api = factory.connect(api_key).map_err(HandlerError::from_error)?;

    let attachments = dedupe_attachments(args.attachments);
    let urls = api
        .upload_attachments(&attachments)
        .await
        .map_err(HandlerError::from_error)?;
    let prompt = append_attachment_urls(&args.prompt, &urls);

    let tags = args
        .tags
        .and_then(|tags| parse_tags(Some(&SessionTags::List(tags))))
        .or_else(|| settings.tags());
    let playbook_id = args
        .playbook_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| settings.playbook_id().map(str::to_owned));

    let mut request = CreateSessionRequest::new(args.title.clone(), prompt.clone())
        .with_tags(tags.clone().unwrap_or_default());
    if let Some(playbook_id) = &playbook_id {
        request = request.with_playbook_id(playbook_id.clone());
    }

    let created = api
        .create_session(&request)
        .await
        .map_err(HandlerError::from_error)?;
    tracing::info!(
        session_id = %created.session_id,
        record = ?args.record_reference,
        attachments = urls.len(),
        "Devin session created"
    );

    let assigned_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(HandlerError::from_error)?;

    Ok(SessionRecord {
        session_id: created.session_id,
        session_url: created.session_url,
        assigned_at,
        title: args.title,
        prompt,
        repository: args
            .repository
            .or_else(|| settings.repository().map(str::to_owned)),
        base_branch: args.base_branch,
        tags,
        playbook_id,
    })
}
