use std::{sync::Arc, time::Duration};

use mailspool_common::{Mailbox, Transport};
use serde::Deserialize;

use crate::{NullTransport, RedirectingTransport, SendmailTransport, SmtpTransport};

/// Transport security for SMTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    /// TLS from the first byte (SMTPS)
    Ssl,
    /// Plain connection upgraded with STARTTLS
    Tls,
}

/// SMTP authentication mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Plain,
    Login,
    Xoauth2,
}

/// Everything needed to open an SMTP connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub encryption: Option<Encryption>,
    pub auth_mode: Option<AuthMode>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    /// Name announced in EHLO; the local hostname when unset
    pub local_domain: Option<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            encryption: None,
            auth_mode: None,
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            local_domain: None,
        }
    }
}

/// A fully resolved real transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Smtp(SmtpSettings),
    Sendmail { command: Option<String> },
    Null,
}

impl TransportConfig {
    /// Name of the transport kind, as shown to operators
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Smtp(_) => "smtp",
            Self::Sendmail { .. } => "sendmail",
            Self::Null => "null",
        }
    }

    /// Build the transport, redirecting every message to `delivery_addresses`
    /// when there are any
    #[must_use]
    pub fn build(&self, delivery_addresses: &[Mailbox]) -> Arc<dyn Transport> {
        let transport: Arc<dyn Transport> = match self {
            Self::Smtp(settings) => Arc::new(SmtpTransport::new(settings.clone())),
            Self::Sendmail { command } => Arc::new(SendmailTransport::new(command.clone())),
            Self::Null => Arc::new(NullTransport),
        };

        if delivery_addresses.is_empty() {
            transport
        } else {
            Arc::new(RedirectingTransport::new(
                transport,
                delivery_addresses.to_vec(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encryption_and_auth_mode_from_ron() {
        let encryption: Encryption = ron::from_str("ssl").expect("ssl");
        assert_eq!(encryption, Encryption::Ssl);

        let auth: AuthMode = ron::from_str("xoauth2").expect("xoauth2");
        assert_eq!(auth, AuthMode::Xoauth2);
    }

    #[test]
    fn test_names() {
        assert_eq!(TransportConfig::Null.name(), "null");
        assert_eq!(
            TransportConfig::Sendmail { command: None }.name(),
            "sendmail"
        );
        assert_eq!(TransportConfig::Smtp(SmtpSettings::default()).name(), "smtp");
    }
}
