//! The outgoing message as seen by the spool.
//!
//! The spool never looks inside a message beyond what operators need to see
//! (sender, recipients, subject and the `Date` header). Encoding to MIME is
//! left to the real transport.

use std::fmt;

use chrono::{DateTime, Utc};
use mailparse::MailAddr;
use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// A single address with an optional display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mailbox {
    pub address: String,
    pub name: Option<String>,
}

impl Mailbox {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse a single address such as `Jane <jane@example.com>`.
    ///
    /// # Errors
    /// If the input is not a single, well formed address
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let mut list = Self::parse_list(input)?;
        match list.len() {
            1 => Ok(list.remove(0)),
            0 => Err(AddressError::Empty),
            _ => Err(AddressError::NotSingle(input.to_string())),
        }
    }

    /// Parse a comma separated list of addresses. Groups are flattened.
    ///
    /// # Errors
    /// If any of the addresses is malformed
    pub fn parse_list(input: &str) -> Result<Vec<Self>, AddressError> {
        if input.trim().is_empty() {
            return Err(AddressError::Empty);
        }

        let parsed = mailparse::addrparse(input)
            .map_err(|e| AddressError::Malformed(input.to_string(), e.to_string()))?;

        let mut mailboxes = Vec::with_capacity(parsed.len());
        for addr in parsed.iter() {
            match addr {
                MailAddr::Single(info) => mailboxes.push(Self {
                    address: info.addr.clone(),
                    name: info.display_name.clone(),
                }),
                MailAddr::Group(group) => {
                    mailboxes.extend(group.addrs.iter().map(|info| Self {
                        address: info.addr.clone(),
                        name: info.display_name.clone(),
                    }));
                }
            }
        }

        if mailboxes.iter().any(|m| !m.address.contains('@')) {
            return Err(AddressError::Malformed(
                input.to_string(),
                "missing '@'".to_string(),
            ));
        }

        Ok(mailboxes)
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => write!(f, "{name} <{}>", self.address),
            _ => f.write_str(&self.address),
        }
    }
}

/// An outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: Vec<Mailbox>,
    pub to: Vec<Mailbox>,
    #[serde(default)]
    pub cc: Vec<Mailbox>,
    #[serde(default)]
    pub bcc: Vec<Mailbox>,
    pub subject: String,
    pub body: String,
    pub content_type: String,
    pub charset: String,
    /// Value of the `Date` header
    pub date: DateTime<Utc>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            from: Vec::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: String::new(),
            body: String::new(),
            content_type: "text/plain".to_string(),
            charset: "UTF-8".to_string(),
            date: Utc::now(),
        }
    }
}

impl Message {
    /// Start building a message dated now
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// The first sender, if any
    #[must_use]
    pub fn sender(&self) -> Option<&Mailbox> {
        self.from.first()
    }

    /// Every envelope recipient: to, cc and bcc in that order
    pub fn recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }

    /// Seconds since the epoch of the `Date` header
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.date.timestamp()
    }
}

#[derive(Debug, Default)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    #[must_use]
    pub fn from(mut self, mailbox: Mailbox) -> Self {
        self.message.from.push(mailbox);
        self
    }

    #[must_use]
    pub fn to(mut self, mailbox: Mailbox) -> Self {
        self.message.to.push(mailbox);
        self
    }

    #[must_use]
    pub fn cc(mut self, mailbox: Mailbox) -> Self {
        self.message.cc.push(mailbox);
        self
    }

    #[must_use]
    pub fn bcc(mut self, mailbox: Mailbox) -> Self {
        self.message.bcc.push(mailbox);
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.message.subject = subject.into();
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.message.body = body.into();
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.message.content_type = content_type.into();
        self
    }

    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.message.charset = charset.into();
        self
    }

    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.message.date = date;
        self
    }

    #[must_use]
    pub fn build(self) -> Message {
        self.message
    }
}
