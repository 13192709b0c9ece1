//! Messenger channel: webhook event envelope and the Graph API send endpoint.

use crate::channels::inbound::InboundMessage;
use crate::channels::outbound::{ChannelError, OutboundChannel};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com";
const GRAPH_API_VERSION: &str = "v19.0";

/// Webhook POST body. Entries and messaging events stay raw JSON so each one is decoded on its
/// own: a malformed event is skipped without losing the rest of the batch.
#[derive(Debug, Default, Deserialize)]
pub struct MessengerWebhook {
    #[serde(default)]
    pub object: Value,
    #[serde(default)]
    pub entry: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct MessengerEntry {
    #[serde(default)]
    messaging: Vec<Value>,
}

/// One messaging sub-event (message, echo, delivery receipt, postback...).
#[derive(Debug, Default, Deserialize)]
pub struct MessengerEvent {
    #[serde(default)]
    pub sender: Option<MessengerParticipant>,
    #[serde(default)]
    pub message: Option<MessengerMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessengerParticipant {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessengerMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_echo: Option<bool>,
}

impl MessengerEvent {
    pub fn sender_id(&self) -> Option<&str> {
        self.sender.as_ref().and_then(|s| s.id.as_deref())
    }
}

impl MessengerWebhook {
    /// True for page subscriptions; other objects (e.g. "instagram") are acknowledged and ignored.
    pub fn is_page(&self) -> bool {
        self.object.as_str() == Some("page")
    }

    /// Messaging events that decode; entries or events with wrong-typed fields are skipped.
    fn events(&self) -> impl Iterator<Item = MessengerEvent> + '_ {
        self.entry
            .iter()
            .filter_map(|raw| match MessengerEntry::deserialize(raw) {
                Ok(entry) => Some(entry.messaging),
                Err(e) => {
                    log::debug!("messenger: skipping malformed entry: {}", e);
                    None
                }
            })
            .flatten()
            .filter_map(|raw| match MessengerEvent::deserialize(&raw) {
                Ok(event) => Some(event),
                Err(e) => {
                    log::debug!("messenger: skipping malformed event: {}", e);
                    None
                }
            })
    }

    /// Genuine user text messages in delivery order.
    ///
    /// Skips events sent by `page_id` (the bot itself), events without a sender, echoes of the
    /// bot's own messages and events that carry no text (attachments, receipts, postbacks).
    pub fn inbound_messages(&self, page_id: Option<&str>) -> Vec<InboundMessage> {
        if !self.is_page() {
            log::debug!("messenger: ignoring webhook for object {}", self.object);
            return Vec::new();
        }
        let mut out = Vec::new();
        for event in self.events() {
            let Some(sender_id) = event.sender_id() else {
                log::debug!("messenger: event without sender id, skipping");
                continue;
            };
            if page_id == Some(sender_id) {
                log::debug!("messenger: event from own page, skipping");
                continue;
            }
            let Some(ref message) = event.message else {
                continue;
            };
            if message.is_echo.unwrap_or(false) {
                continue;
            }
            let Some(ref text) = message.text else {
                continue;
            };
            out.push(InboundMessage {
                sender_id: sender_id.to_string(),
                text: text.clone(),
            });
        }
        out
    }
}

/// Messenger send connector: posts replies via the Graph API send endpoint.
pub struct MessengerChannel {
    id: String,
    api_base: String,
    page_access_token: Option<String>,
    client: reqwest::Client,
}

impl MessengerChannel {
    pub fn new(page_access_token: Option<String>, api_base: Option<String>) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string());
        Self {
            id: "messenger".to_string(),
            api_base,
            page_access_token,
            client: reqwest::Client::new(),
        }
    }

    fn send_url(&self) -> String {
        format!("{}/{}/me/messages", self.api_base, GRAPH_API_VERSION)
    }

    /// POST /v19.0/me/messages?access_token=... with `{recipient: {id}, message: {text}}`.
    pub async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), ChannelError> {
        let token = self
            .page_access_token
            .as_deref()
            .ok_or(ChannelError::NotConfigured("page access token"))?;
        let body = serde_json::json!({
            "recipient": { "id": recipient_id },
            "message": { "text": text },
        });
        let res = self
            .client
            .post(self.send_url())
            .query(&[("access_token", token)])
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("{} {}", status, body)));
        }
        log::info!("message sent successfully to {}", recipient_id);
        Ok(())
    }
}

#[async_trait]
impl OutboundChannel for MessengerChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), ChannelError> {
        MessengerChannel::send_message(self, recipient_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn parse(json: &str) -> MessengerWebhook {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extracts_text_messages() {
        let hook = parse(
            r#"{"object":"page","entry":[{"id":"PAGE","messaging":[
                {"sender":{"id":"u1"},"recipient":{"id":"PAGE"},
                 "message":{"mid":"m1","text":"hello there"}},
                {"sender":{"id":"u2"},"message":{"text":"yo"}}
            ]}]}"#,
        );
        let msgs = hook.inbound_messages(Some("PAGE"));
        assert_eq!(
            msgs,
            vec![
                InboundMessage {
                    sender_id: "u1".into(),
                    text: "hello there".into(),
                },
                InboundMessage {
                    sender_id: "u2".into(),
                    text: "yo".into(),
                },
            ]
        );
    }

    #[test]
    fn skips_own_page_echoes_and_non_text() {
        let hook = parse(
            r#"{"object":"page","entry":[{"messaging":[
                {"sender":{"id":"PAGE"},"message":{"text":"from the page"}},
                {"sender":{"id":"u1"},"message":{"text":"my own reply","is_echo":true}},
                {"sender":{"id":"u1"},"message":{"mid":"m2"}},
                {"sender":{"id":"u1"},"delivery":{"mids":["m1"]}},
                {"message":{"text":"no sender"}},
                {"sender":{"id":"u3"},"message":{"text":"kept?"}}
            ]}]}"#,
        );
        let msgs = hook.inbound_messages(Some("PAGE"));
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].sender_id, "u3");
    }

    #[test]
    fn ignores_non_page_objects() {
        let hook = parse(
            r#"{"object":"instagram","entry":[{"messaging":[
                {"sender":{"id":"u1"},"message":{"text":"hi"}}
            ]}]}"#,
        );
        assert!(hook.inbound_messages(None).is_empty());
    }

    #[test]
    fn malformed_shape_parses_to_nothing() {
        let hook = parse(r#"{"object":"page"}"#);
        assert!(hook.inbound_messages(Some("PAGE")).is_empty());
        let hook = parse(r#"{"object":"page","entry":[{}]}"#);
        assert!(hook.inbound_messages(Some("PAGE")).is_empty());
    }

    #[test]
    fn null_echo_flag_is_not_an_echo() {
        let hook = parse(
            r#"{"object":"page","entry":[{"messaging":[
                {"sender":{"id":"u1"},"message":{"text":"hello there","is_echo":null}},
                {"sender":{"id":"u2"},"message":{"text":"good morning all"}}
            ]}]}"#,
        );
        let senders: Vec<String> = hook
            .inbound_messages(Some("PAGE"))
            .into_iter()
            .map(|m| m.sender_id)
            .collect();
        assert_eq!(senders, vec!["u1".to_string(), "u2".to_string()]);
    }

    #[test]
    fn wrong_typed_event_does_not_drop_the_batch() {
        let hook = parse(
            r#"{"object":"page","entry":[
                {"messaging":[
                    {"sender":{"id":12345},"message":{"text":"numeric sender"}},
                    {"sender":{"id":"u1"},"message":{"text":["not","a","string"]}},
                    {"sender":{"id":"u2"},"message":{"text":"good morning all"}}
                ]},
                {"messaging":"not a list"},
                "not an entry",
                {"messaging":[{"sender":{"id":"u3"},"message":{"text":"hey"}}]}
            ]}"#,
        );
        let senders: Vec<String> = hook
            .inbound_messages(Some("PAGE"))
            .into_iter()
            .map(|m| m.sender_id)
            .collect();
        assert_eq!(senders, vec!["u2".to_string(), "u3".to_string()]);
    }

    #[tokio::test]
    async fn send_message_posts_to_graph_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v19.0/me/messages")
            .match_query(Matcher::UrlEncoded("access_token".into(), "page-token".into()))
            .match_body(Matcher::Json(serde_json::json!({
                "recipient": { "id": "u1" },
                "message": { "text": "hey!" },
            })))
            .with_status(200)
            .with_body(r#"{"recipient_id":"u1","message_id":"m1"}"#)
            .create_async()
            .await;

        let channel = MessengerChannel::new(Some("page-token".into()), Some(server.url()));
        channel.send_message("u1", "hey!").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_message_reports_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v19.0/me/messages")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"message":"Invalid OAuth access token."}}"#)
            .create_async()
            .await;

        let channel = MessengerChannel::new(Some("bad".into()), Some(server.url()));
        let err = channel.send_message("u1", "hi").await.unwrap_err();
        assert!(matches!(err, ChannelError::Api(ref s) if s.contains("400")), "{}", err);
    }

    #[tokio::test]
    async fn send_message_without_token_is_not_configured() {
        let channel = MessengerChannel::new(None, Some("http://127.0.0.1:1".into()));
        let err = channel.send_message("u1", "hi").await.unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));
    }
}
