//! Message relay between matched users.
//!
//! The relay sits at the boundary with the transport: it applies the gates
//! (ban, rate limit, session, file denylist, bad-word mask) and hands the
//! cleaned content to a [`Courier`] the transport implements.
//!
//! If the courier reports the partner unreachable, the sender's side of the
//! session is torn down with [`SessionRegistry::detach`] and the sender is
//! told to search again. The unreachable partner is not notified.

use crate::activity::ActivityTracker;
use crate::error::{DeliveryError, EngineResult, Rejection};
use crate::security::{ContentFilter, ModerationEngine, RateLimiter};
use crate::state::{SessionRegistry, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Relayable message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Voice {
        file_id: String,
    },
    Sticker {
        file_id: String,
    },
    Document {
        file_id: String,
        file_name: String,
        caption: Option<String>,
    },
}

impl Content {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Photo { .. } => "photo",
            Self::Voice { .. } => "voice",
            Self::Sticker { .. } => "sticker",
            Self::Document { .. } => "document",
        }
    }

    /// Apply the bad-word mask to the text and any caption.
    fn censored(self, filter: &ContentFilter) -> Self {
        let mask = |caption: Option<String>| caption.map(|c| filter.censor(&c));
        match self {
            Self::Text(text) => Self::Text(filter.censor(&text)),
            Self::Photo { file_id, caption } => Self::Photo {
                file_id,
                caption: mask(caption),
            },
            Self::Document {
                file_id,
                file_name,
                caption,
            } => Self::Document {
                file_id,
                file_name,
                caption: mask(caption),
            },
            other => other,
        }
    }
}

/// Transport-side delivery.
#[async_trait]
pub trait Courier: Send + Sync {
    /// Deliver relayed content to `to`.
    async fn deliver(&self, to: UserId, content: &Content) -> Result<(), DeliveryError>;

    /// Show a typing indicator to `to`. Best effort.
    async fn typing(&self, _to: UserId) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered { partner: UserId },
    /// Sender is not in a chat; nothing was sent.
    NoPartner,
    /// Partner could not be reached; the sender's side was torn down.
    PartnerUnreachable { partner: UserId },
}

pub struct Relay {
    activity: Arc<ActivityTracker>,
    moderation: Arc<ModerationEngine>,
    rate_limiter: Arc<RateLimiter>,
    sessions: Arc<SessionRegistry>,
    filter: Arc<ContentFilter>,
}

impl Relay {
    pub fn new(
        activity: Arc<ActivityTracker>,
        moderation: Arc<ModerationEngine>,
        rate_limiter: Arc<RateLimiter>,
        sessions: Arc<SessionRegistry>,
        filter: Arc<ContentFilter>,
    ) -> Self {
        Self {
            activity,
            moderation,
            rate_limiter,
            sessions,
            filter,
        }
    }

    /// Forward `content` from `sender` to their partner.
    pub async fn forward(
        &self,
        courier: &dyn Courier,
        sender: UserId,
        content: Content,
    ) -> EngineResult<RelayOutcome> {
        self.activity.touch(sender).await?;
        if self.moderation.is_banned(sender).await? {
            return Err(Rejection::Blocked.into());
        }
        if !self.rate_limiter.check_and_record(sender).await? {
            return Err(Rejection::RateLimited.into());
        }

        let Some(partner) = self.sessions.partner_of(sender).await? else {
            debug!(user = %sender, "Dropping message outside a chat");
            return Ok(RelayOutcome::NoPartner);
        };

        if let Content::Document { file_name, .. } = &content
            && self.filter.is_dangerous_file(file_name)
        {
            return Err(Rejection::DangerousFile(file_name.clone()).into());
        }

        let content = content.censored(&self.filter);

        courier.typing(partner).await;
        match courier.deliver(partner, &content).await {
            Ok(()) => {
                debug!(from = %sender, to = %partner, kind = content.kind(), "Relayed");
                Ok(RelayOutcome::Delivered { partner })
            }
            Err(e) => {
                warn!(from = %sender, to = %partner, error = %e, "Partner unreachable, detaching");
                self.sessions.detach(sender).await?;
                Ok(RelayOutcome::PartnerUnreachable { partner })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn censoring_touches_text_and_captions_only() {
        let filter = ContentFilter::default();
        assert_eq!(
            Content::Text("dasar anjing".into()).censored(&filter),
            Content::Text("dasar ******".into())
        );
        assert_eq!(
            Content::Photo {
                file_id: "anjing".into(),
                caption: Some("babi".into()),
            }
            .censored(&filter),
            Content::Photo {
                file_id: "anjing".into(),
                caption: Some("****".into()),
            }
        );
        let sticker = Content::Sticker {
            file_id: "setan".into(),
        };
        assert_eq!(sticker.clone().censored(&filter), sticker);
    }
}
