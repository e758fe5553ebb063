//! # Feedback and Rating Module
//!
//! Admin-initiated follow-up with users who were introduced to
//! professionals: the user reports whom they contacted, rates them with one
//! to five stars, and each rating is relayed to an external web-hook.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::directory::ProfessionalDirectory;
use crate::errors::WebhookError;
use crate::localization::MessageArg;
use crate::session::ExpiringMap;

pub const NO_CONTACT_CALLBACK: &str = "feedback_no_contact";
pub const WILL_CONTACT_CALLBACK: &str = "feedback_will_contact";
pub const OPT_OUT_CALLBACK: &str = "feedback_opt_out";
pub const SELECT_PREFIX: &str = "feedback_select_pro_";
pub const RATE_PREFIX: &str = "rate_";
pub const RATE_ANOTHER_CALLBACK: &str = "followup_rate_another";
pub const END_RATING_CALLBACK: &str = "followup_end_rating";
/// Payload of the separator button, which does nothing
pub const IGNORE_CALLBACK: &str = "ignore_me";

/// Inline button payloads of the feedback workflow
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedbackCallback {
    NoContact,
    WillContact,
    OptOut,
    SelectProfessional(String),
    Rate { professional_id: String, rating: u8 },
    RateAnother,
    EndRating,
    Ignore,
    /// Recognised prefix with an unusable payload
    Malformed(String),
}

impl FeedbackCallback {
    /// Parse callback data. Returns `None` for payloads owned by other flows.
    pub fn parse(data: &str) -> Option<Self> {
        let callback = match data {
            NO_CONTACT_CALLBACK => Self::NoContact,
            WILL_CONTACT_CALLBACK => Self::WillContact,
            OPT_OUT_CALLBACK => Self::OptOut,
            RATE_ANOTHER_CALLBACK => Self::RateAnother,
            END_RATING_CALLBACK => Self::EndRating,
            IGNORE_CALLBACK => Self::Ignore,
            _ => {
                if let Some(id) = data.strip_prefix(SELECT_PREFIX) {
                    if id.is_empty() {
                        Self::Malformed(data.to_string())
                    } else {
                        Self::SelectProfessional(id.to_string())
                    }
                } else if let Some(rest) = data.strip_prefix(RATE_PREFIX) {
                    // The id may itself contain underscores
                    match rest.rsplit_once('_') {
                        Some((id, stars)) if !id.is_empty() => match stars.parse::<u8>() {
                            Ok(rating) if (1..=5).contains(&rating) => Self::Rate {
                                professional_id: id.to_string(),
                                rating,
                            },
                            _ => Self::Malformed(data.to_string()),
                        },
                        _ => Self::Malformed(data.to_string()),
                    }
                } else if data.starts_with("feedback_") || data.starts_with("followup_") {
                    Self::Malformed(data.to_string())
                } else {
                    return None;
                }
            }
        };
        Some(callback)
    }
}

/// Body posted to the rating web-hook
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingPayload {
    pub professional_id: String,
    pub rating: u8,
    pub user_telegram_id: String,
}

/// Web-hook answer
#[derive(Clone, Debug, Deserialize)]
pub struct RatingResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Destination of submitted ratings
#[async_trait]
pub trait RatingSink: Send + Sync {
    async fn submit(&self, payload: &RatingPayload) -> Result<(), WebhookError>;
}

/// Posts ratings as JSON to a configured URL
pub struct WebhookRatingSink {
    http: reqwest::Client,
    url: Option<String>,
    timeout: Duration,
}

impl WebhookRatingSink {
    pub fn new(url: Option<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            timeout,
        }
    }
}

#[async_trait]
impl RatingSink for WebhookRatingSink {
    async fn submit(&self, payload: &RatingPayload) -> Result<(), WebhookError> {
        let url = self.url.as_deref().ok_or(WebhookError::NotConfigured)?;

        let response = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| WebhookError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status.as_u16()));
        }

        let body: RatingResponse = response
            .json()
            .await
            .map_err(|e| WebhookError::InvalidResponse(e.without_url().to_string()))?;

        if body.success {
            Ok(())
        } else {
            Err(WebhookError::Rejected(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// A professional offered for rating
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Professional {
    pub id: String,
    pub name: String,
}

/// Inline keyboard attached to a feedback message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedbackMarkup {
    None,
    /// Status buttons, a separator, then one button per professional
    Offer(Vec<Professional>),
    /// Professionals still unrated, then an end button
    Pick(Vec<Professional>),
    Stars(Professional),
    FollowUp,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackReply {
    pub key: &'static str,
    pub args: Vec<(&'static str, MessageArg)>,
    pub markup: FeedbackMarkup,
}

impl FeedbackReply {
    fn new(key: &'static str, markup: FeedbackMarkup) -> Self {
        Self {
            key,
            args: Vec::new(),
            markup,
        }
    }

    fn arg(mut self, name: &'static str, value: impl Into<MessageArg>) -> Self {
        self.args.push((name, value.into()));
        self
    }
}

/// Per-user feedback state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedbackSession {
    /// Professionals offered, in request order
    pub offered: Vec<String>,
    pub rated: HashSet<String>,
}

impl FeedbackSession {
    fn unrated(&self) -> Vec<String> {
        self.offered
            .iter()
            .filter(|id| !self.rated.contains(*id))
            .cloned()
            .collect()
    }
}

/// Why an admin request was not delivered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestRefusal {
    OptedOut,
}

pub struct FeedbackService {
    sessions: Arc<ExpiringMap<u64, FeedbackSession>>,
    opted_out: Mutex<HashSet<u64>>,
    sink: Arc<dyn RatingSink>,
    directory: Arc<ProfessionalDirectory>,
}

impl FeedbackService {
    pub fn new(sink: Arc<dyn RatingSink>, directory: Arc<ProfessionalDirectory>, session_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(ExpiringMap::new(session_ttl)),
            opted_out: Mutex::new(HashSet::new()),
            sink,
            directory,
        }
    }

    pub fn sessions(&self) -> &Arc<ExpiringMap<u64, FeedbackSession>> {
        &self.sessions
    }

    pub fn directory(&self) -> &Arc<ProfessionalDirectory> {
        &self.directory
    }

    pub async fn session(&self, user_id: u64) -> Option<FeedbackSession> {
        self.sessions.get(&user_id).await
    }

    pub fn is_opted_out(&self, user_id: u64) -> bool {
        self.opted_out.lock().unwrap().contains(&user_id)
    }

    fn professional(&self, id: &str) -> Professional {
        Professional {
            id: id.to_string(),
            name: self.directory.display_name(id),
        }
    }

    fn professionals(&self, ids: &[String]) -> Vec<Professional> {
        ids.iter().map(|id| self.professional(id)).collect()
    }

    fn stars(&self, id: &str) -> FeedbackReply {
        let professional = self.professional(id);
        FeedbackReply::new("rating-request", FeedbackMarkup::Stars(professional.clone()))
            .arg("name", professional.name)
    }

    /// Start a feedback round for `user_id`, replacing any earlier one
    pub async fn request_feedback(
        &self,
        user_id: u64,
        professional_ids: Vec<String>,
    ) -> Result<FeedbackReply, RequestRefusal> {
        if self.is_opted_out(user_id) {
            return Err(RequestRefusal::OptedOut);
        }

        let mut unique: Vec<String> = Vec::with_capacity(professional_ids.len());
        for id in professional_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        let professionals = self.professionals(&unique);
        self.sessions
            .insert(
                user_id,
                FeedbackSession {
                    offered: unique,
                    rated: HashSet::new(),
                },
            )
            .await;

        info!(user_id, professionals = professionals.len(), "Feedback requested");
        Ok(FeedbackReply::new("feedback-request", FeedbackMarkup::Offer(professionals)))
    }

    /// Ask `user_id` to rate one professional directly
    pub async fn request_rating(&self, user_id: u64, professional_id: &str) -> Result<FeedbackReply, RequestRefusal> {
        if self.is_opted_out(user_id) {
            return Err(RequestRefusal::OptedOut);
        }

        self.sessions
            .update(user_id, |session| {
                if !session.offered.iter().any(|id| id == professional_id) {
                    session.offered.push(professional_id.to_string());
                }
            })
            .await;

        info!(user_id, professional_id, "Rating requested");
        Ok(self.stars(professional_id))
    }

    /// React to a feedback button pressed by `user_id`
    pub async fn handle_callback(&self, user_id: u64, callback: FeedbackCallback) -> Vec<FeedbackReply> {
        match callback {
            FeedbackCallback::NoContact => {
                self.sessions.remove(&user_id).await;
                vec![FeedbackReply::new("feedback-no-contact", FeedbackMarkup::None)]
            }
            FeedbackCallback::WillContact => {
                vec![FeedbackReply::new("feedback-will-contact", FeedbackMarkup::None)]
            }
            FeedbackCallback::OptOut => {
                self.opted_out.lock().unwrap().insert(user_id);
                self.sessions.remove(&user_id).await;
                info!(user_id, "User opted out of feedback requests");
                vec![FeedbackReply::new("feedback-opt-out", FeedbackMarkup::None)]
            }
            FeedbackCallback::SelectProfessional(id) => {
                let name = self.directory.display_name(&id);
                vec![
                    FeedbackReply::new("feedback-selected", FeedbackMarkup::None).arg("name", name),
                    self.stars(&id),
                ]
            }
            FeedbackCallback::Rate { professional_id, rating } => {
                self.rate(user_id, professional_id, rating).await
            }
            FeedbackCallback::RateAnother => {
                let remaining = self
                    .sessions
                    .get(&user_id)
                    .await
                    .map(|session| session.unrated())
                    .unwrap_or_default();

                if remaining.is_empty() {
                    self.sessions.remove(&user_id).await;
                    vec![FeedbackReply::new("nothing-left-to-rate", FeedbackMarkup::None)]
                } else {
                    vec![FeedbackReply::new(
                        "rate-another-prompt",
                        FeedbackMarkup::Pick(self.professionals(&remaining)),
                    )]
                }
            }
            FeedbackCallback::EndRating => {
                self.sessions.remove(&user_id).await;
                vec![FeedbackReply::new("rating-ended", FeedbackMarkup::None)]
            }
            FeedbackCallback::Ignore => Vec::new(),
            FeedbackCallback::Malformed(data) => {
                warn!(user_id, callback = %data, "Malformed feedback callback");
                vec![FeedbackReply::new("rating-invalid", FeedbackMarkup::None)]
            }
        }
    }

    async fn rate(&self, user_id: u64, professional_id: String, rating: u8) -> Vec<FeedbackReply> {
        let payload = RatingPayload {
            professional_id: professional_id.clone(),
            rating,
            user_telegram_id: user_id.to_string(),
        };

        match self.sink.submit(&payload).await {
            Ok(()) => {
                self.sessions
                    .update(user_id, |session| {
                        if !session.offered.contains(&professional_id) {
                            session.offered.push(professional_id.clone());
                        }
                        session.rated.insert(professional_id.clone());
                    })
                    .await;
                info!(user_id, professional_id = %professional_id, rating, "Rating recorded");

                let name = self.directory.display_name(&professional_id);
                vec![
                    FeedbackReply::new("rating-recorded", FeedbackMarkup::None)
                        .arg("rating", rating.to_string())
                        .arg("name", name),
                    FeedbackReply::new("rating-followup", FeedbackMarkup::FollowUp),
                ]
            }
            Err(WebhookError::Rejected(reason)) => {
                warn!(user_id, professional_id = %professional_id, reason = %reason, "Rating rejected");
                vec![FeedbackReply::new("rating-failed", FeedbackMarkup::None).arg("error", reason)]
            }
            Err(e) => {
                warn!(user_id, professional_id = %professional_id, error = %e, "Rating relay failed");
                vec![FeedbackReply::new("rating-unreachable", FeedbackMarkup::None)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rating_callbacks() {
        assert_eq!(
            FeedbackCallback::parse("rate_PRO42_4"),
            Some(FeedbackCallback::Rate {
                professional_id: "PRO42".to_string(),
                rating: 4
            })
        );
        assert_eq!(
            FeedbackCallback::parse("rate_PRO_42_5"),
            Some(FeedbackCallback::Rate {
                professional_id: "PRO_42".to_string(),
                rating: 5
            })
        );
        assert!(matches!(
            FeedbackCallback::parse("rate_PRO42_9"),
            Some(FeedbackCallback::Malformed(_))
        ));
        assert!(matches!(
            FeedbackCallback::parse("rate_4"),
            Some(FeedbackCallback::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_other_callbacks() {
        assert_eq!(
            FeedbackCallback::parse("feedback_select_pro_PRO_1"),
            Some(FeedbackCallback::SelectProfessional("PRO_1".to_string()))
        );
        assert_eq!(FeedbackCallback::parse("feedback_opt_out"), Some(FeedbackCallback::OptOut));
        assert_eq!(FeedbackCallback::parse("ignore_me"), Some(FeedbackCallback::Ignore));
        assert_eq!(FeedbackCallback::parse("edit_phone"), None);
    }

    #[test]
    fn test_unrated_keeps_offer_order() {
        let session = FeedbackSession {
            offered: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            rated: HashSet::from(["b".to_string()]),
        };
        assert_eq!(session.unrated(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_payload_serializes_expected_fields() {
        let payload = RatingPayload {
            professional_id: "PRO42".to_string(),
            rating: 4,
            user_telegram_id: "1001".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"professional_id": "PRO42", "rating": 4, "user_telegram_id": "1001"})
        );
    }
}
