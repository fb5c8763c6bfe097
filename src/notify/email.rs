// src/notify/email.rs
use async_trait::async_trait;
use chrono::{DateTime, Local};
use lettre::message::{header::ContentType, Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{Deliverer, DeliveryError, DeliveryItem};
use crate::config::BotConfig;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    lookback_hours: i64,
}

impl EmailSender {
    /// SMTP over implicit TLS (port 465) to `cfg.smtp_host`.
    pub fn from_config(cfg: &BotConfig) -> Result<Self, DeliveryError> {
        let creds = Credentials::new(cfg.email.clone(), cfg.email_password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?
            .credentials(creds)
            .build();

        Ok(Self {
            mailer,
            from: parse_mailbox(&cfg.email)?,
            to: parse_mailbox(&cfg.email_to)?,
            lookback_hours: cfg.lookback_hours,
        })
    }

    pub fn build_message(
        &self,
        handle: &str,
        items: &[DeliveryItem],
        now: DateTime<Local>,
    ) -> Result<Message, DeliveryError> {
        compose(&self.from, &self.to, handle, items, self.lookback_hours, now)
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, DeliveryError> {
    addr.parse()
        .map_err(|_| DeliveryError::Address(addr.to_string()))
}

pub fn subject(handle: &str, now: DateTime<Local>) -> String {
    format!("Twitter Updates: @{handle} - {}", now.format("%Y-%m-%d %H:%M"))
}

/// HTML body: one card per post, in run order.
pub fn render_html(handle: &str, items: &[DeliveryItem], lookback_hours: i64) -> String {
    let esc = |s: &str| html_escape::encode_text(s).into_owned();
    let mut body = format!(
        "<html>\n<body>\n<h2>Recent Tweets from @{}</h2>\n<p>Found {} tweets in the last {} hours:</p>\n<hr>\n",
        esc(handle),
        items.len(),
        lookback_hours
    );
    for (i, item) in items.iter().enumerate() {
        let p = &item.post;
        let shot = match &item.artifact {
            Some(a) => format!("<p><em>Screenshot attached: {}</em></p>", esc(&a.filename)),
            None => "<p><em>Screenshot unavailable</em></p>".to_string(),
        };
        body.push_str(&format!(
            concat!(
                "<div style=\"margin: 20px 0; padding: 15px; border: 1px solid #ddd; border-radius: 8px;\">\n",
                "<h3>Tweet #{n}</h3>\n",
                "<p><strong>Posted:</strong> {posted}</p>\n",
                "<p><strong>Text:</strong> {text}</p>\n",
                "<p><strong>Likes:</strong> {likes} | <strong>Retweets:</strong> {reposts} | <strong>Replies:</strong> {replies}</p>\n",
                "<p><a href=\"{url}\">View on X</a></p>\n",
                "{shot}\n",
                "</div>\n"
            ),
            n = i + 1,
            posted = p.published_at,
            text = esc(&p.text),
            likes = p.metrics.likes,
            reposts = p.metrics.reposts,
            replies = p.metrics.replies,
            url = html_escape::encode_double_quoted_attribute(&p.reference_url),
            shot = shot,
        ));
    }
    body.push_str("</body>\n</html>\n");
    body
}

pub fn compose(
    from: &Mailbox,
    to: &Mailbox,
    handle: &str,
    items: &[DeliveryItem],
    lookback_hours: i64,
    now: DateTime<Local>,
) -> Result<Message, DeliveryError> {
    let png = ContentType::parse("image/png").map_err(|e| DeliveryError::Build(e.to_string()))?;

    let mut parts = MultiPart::mixed().singlepart(SinglePart::html(render_html(
        handle,
        items,
        lookback_hours,
    )));
    for artifact in items.iter().filter_map(|i| i.artifact.as_ref()) {
        parts = parts.singlepart(
            Attachment::new(artifact.filename.clone()).body(artifact.bytes.clone(), png.clone()),
        );
    }

    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(subject(handle, now))
        .multipart(parts)
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

#[async_trait]
impl Deliverer for EmailSender {
    async fn deliver(&self, handle: &str, items: &[DeliveryItem]) -> Result<(), DeliveryError> {
        let msg = self.build_message(handle, items, Local::now())?;
        self.mailer
            .send(msg)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        tracing::info!(to = %self.to, posts = items.len(), "email sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
