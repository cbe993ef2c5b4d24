//! Named mailers, built on first use.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use mailspool_common::Transport;
use mailspool_spool::{FlushOptions, SpoolServices};
use tokio::sync::OnceCell;

use crate::{
    config::{Config, ConfigError, ResolvedMailer},
    error::MailerError,
    mailer::{Mailer, MailerInfo},
};

#[derive(Debug)]
struct Entry {
    resolved: ResolvedMailer,
    info: MailerInfo,
    mailer: OnceCell<Arc<Mailer>>,
}

/// Every configured mailer, by name
///
/// Configuration is resolved and validated up front, but a mailer's
/// transports and spool are only built the first time it is asked for.
/// [`MailerRegistry::is_instantiated`] tells whether that happened, which is
/// how the end-of-work flush knows a mailer was never used.
#[derive(Debug)]
pub struct MailerRegistry {
    default: String,
    entries: BTreeMap<String, Entry>,
    services: SpoolServices,
    transports: HashMap<String, Arc<dyn Transport>>,
    flush: FlushOptions,
}

impl MailerRegistry {
    /// Resolve every mailer of `config`
    ///
    /// # Errors
    /// If the configuration is invalid
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let entries = config
            .resolve()?
            .into_iter()
            .map(|resolved| {
                let is_default = resolved.name == config.default_mailer;
                let info = MailerInfo::new(&resolved, is_default);
                (
                    resolved.name.clone(),
                    Entry {
                        resolved,
                        info,
                        mailer: OnceCell::new(),
                    },
                )
            })
            .collect();

        Ok(Self {
            default: config.default_mailer.clone(),
            entries,
            services: SpoolServices::new(),
            transports: HashMap::new(),
            flush: config.flush.options(),
        })
    }

    /// Backing stores for mailers configured with a `Service` spool
    #[must_use]
    pub fn with_services(mut self, services: SpoolServices) -> Self {
        self.services = services;
        self
    }

    /// Deliver the messages of mailer `name` through `transport` instead of
    /// the configured one
    #[must_use]
    pub fn with_transport(
        mut self,
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        self.transports.insert(name.into(), transport);
        self
    }

    /// Mailer names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn default_name(&self) -> &str {
        &self.default
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub const fn flush_options(&self) -> &FlushOptions {
        &self.flush
    }

    /// Whether the mailer has been built
    #[must_use]
    pub fn is_instantiated(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|entry| entry.mailer.initialized())
    }

    /// # Errors
    /// If no mailer is called `name`
    pub fn info(&self, name: &str) -> Result<&MailerInfo, MailerError> {
        self.entry(name).map(|entry| &entry.info)
    }

    /// Every mailer's info, sorted by name
    pub fn infos(&self) -> impl Iterator<Item = &MailerInfo> {
        self.entries.values().map(|entry| &entry.info)
    }

    /// The mailer called `name`, building it if needed
    ///
    /// # Errors
    /// If no mailer is called `name` or it cannot be built
    pub async fn mailer(&self, name: &str) -> Result<Arc<Mailer>, MailerError> {
        let entry = self.entry(name)?;

        entry
            .mailer
            .get_or_try_init(|| async {
                Mailer::build(
                    &entry.resolved,
                    entry.info.clone(),
                    &self.services,
                    self.transports.get(name).cloned(),
                    self.flush,
                )
                .await
                .map(Arc::new)
            })
            .await
            .cloned()
    }

    /// # Errors
    /// If the default mailer cannot be built
    pub async fn default_mailer(&self) -> Result<Arc<Mailer>, MailerError> {
        self.mailer(&self.default).await
    }

    fn entry(&self, name: &str) -> Result<&Entry, MailerError> {
        self.entries
            .get(name)
            .ok_or_else(|| MailerError::NotFound(name.to_string()))
    }
}
