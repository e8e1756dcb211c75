//! Send emails to user for important lifecycle updates.
//!
//! Events are published on a queue consumed by the mailer; delivery is
//! best-effort and never blocks or fails the operation that triggered it.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::Utc;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use serde::Serialize;

use crate::config::Mail;
use crate::user::User;

const DEFAULT_AMQP_VHOST: &str = "%2f";

const CONTENT_ENCODING: &str = "utf8";
const CONTENT_TYPE: &str = "application/cloudevents+json";
const DATA_CONTENT_TYPE: &str = "application/json";
const CLOUDEVENT_VERSION: &str = "1.0";
const ID_LENGTH: usize = 12;

type Result<T> = std::result::Result<T, MailError>;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error(transparent)]
    Amqp(#[from] lapin::Error),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Mail templates list.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    /// Ask user to confirm their address with an activation key.
    Activation,
    /// Tell an admin-created user how to claim their password.
    Creation,
    /// Provide user a password reset key.
    PasswordReset,
}

#[derive(Debug, Serialize)]
struct Cloudevent<'a> {
    specversion: &'static str,
    r#type: &'static str,
    source: &'static str,
    id: String,
    time: String,
    datacontenttype: &'static str,
    data: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    locale: Cow<'a, str>,
    to: Cow<'a, str>,
    template: Template,
    login: Cow<'a, str>,
    /// Activation or reset key the template links to, when one applies.
    key: Option<Cow<'a, str>>,
}

/// Mail event queue manager.
#[derive(Clone, Default)]
pub struct MailManager {
    queue: String,
    conn: Option<Arc<Connection>>,
}

impl MailManager {
    /// Create a new [`MailManager`].
    pub async fn new(config: &Mail) -> Result<Self> {
        let vhost = config
            .vhost
            .clone()
            .unwrap_or(DEFAULT_AMQP_VHOST.to_string());
        let addr = format!(
            "amqp://{}:{}@{}/{}",
            config.username, config.password, config.address, vhost,
        );
        let conn = Connection::connect(&addr, ConnectionProperties::default()).await?;

        tracing::info!(address = config.address, "rabbitmq connected");

        Ok(Self {
            queue: config.queue.clone(),
            conn: Some(Arc::new(conn)),
        })
    }

    async fn create_channel(conn: Arc<Connection>, queue: &str) -> Result<Channel> {
        let channel = conn.create_channel().await?;
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(channel)
    }

    fn create_event(data: Content) -> Cloudevent {
        let id = Alphanumeric.sample_string(&mut OsRng, ID_LENGTH);
        Cloudevent {
            specversion: CLOUDEVENT_VERSION,
            r#type: "io.accountd.email",
            source: "io.accountd",
            id,
            time: Utc::now().to_rfc3339(),
            datacontenttype: DATA_CONTENT_TYPE,
            data,
        }
    }

    /// Publish a mail event for a specific user.
    ///
    /// No-ops when the queue is not configured or the user has no email.
    pub async fn publish_event(&self, template: Template, user: &User) -> Result<()> {
        let Some(conn) = &self.conn else {
            tracing::debug!(?template, "mail queue disabled, event dropped");
            return Ok(());
        };
        let Some(email) = &user.email else {
            tracing::debug!(login = user.login, "user has no email, event dropped");
            return Ok(());
        };

        let channel = Self::create_channel(Arc::clone(conn), &self.queue).await?;

        let key = match template {
            Template::Activation => user.activation_key.as_deref(),
            Template::Creation | Template::PasswordReset => user.reset_key.as_deref(),
        };
        let content = Content {
            locale: Cow::from(&user.lang_key),
            to: Cow::from(email),
            template,
            login: Cow::from(&user.login),
            key: key.map(Cow::from),
        };
        let payload = Self::create_event(content);
        let payload = serde_json::to_string(&payload)?;

        channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                payload.as_bytes(),
                BasicProperties::default()
                    .with_content_encoding(CONTENT_ENCODING.into())
                    .with_content_type(CONTENT_TYPE.into()),
            )
            .await?;

        tracing::trace!(?template, login = user.login, "mail event sent");

        Ok(())
    }

    /// Fire-and-forget dispatch, detached from the calling operation.
    ///
    /// Failures are logged and dropped, never surfaced to the caller.
    pub fn send(&self, template: Template, user: &User) {
        let manager = self.clone();
        let user = user.clone();
        tokio::spawn(async move {
            if let Err(err) = manager.publish_event(template, &user).await {
                tracing::warn!(
                    login = user.login,
                    ?template,
                    error = %err,
                    "mail event could not be published"
                );
            }
        });
    }
}
