//! Operations context for dependency injection

use crate::engine::TransactionEngine;
use std::sync::Arc;
use vpkg_config::Config;
use vpkg_errors::{ConfigError, Error};
use vpkg_events::{EventEmitter, EventSender};
use vpkg_net::{NetClient, NetConfig};
use vpkg_types::PackageSet;

/// Asks the user to approve a list of changes
pub trait Prompter: Send + Sync {
    /// Show `items` under `title` and return whether to go on
    fn confirm(&self, title: &str, items: &[String]) -> bool;
}

/// Approves everything without asking
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn confirm(&self, _title: &str, _items: &[String]) -> bool {
        true
    }
}

/// Everything an operation needs
pub struct OpsCtx {
    pub config: Config,
    pub packages: Arc<PackageSet>,
    pub net: NetClient,
    pub engine: Box<dyn TransactionEngine>,
    pub prompter: Box<dyn Prompter>,
    pub tx: EventSender,
}

impl EventEmitter for OpsCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

/// Builder for [`OpsCtx`]
#[derive(Default)]
pub struct OpsContextBuilder {
    config: Option<Config>,
    packages: Option<PackageSet>,
    net: Option<NetClient>,
    engine: Option<Box<dyn TransactionEngine>>,
    prompter: Option<Box<dyn Prompter>>,
    tx: Option<EventSender>,
}

impl OpsContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn with_packages(mut self, packages: PackageSet) -> Self {
        self.packages = Some(packages);
        self
    }

    #[must_use]
    pub fn with_net(mut self, net: NetClient) -> Self {
        self.net = Some(net);
        self
    }

    #[must_use]
    pub fn with_engine(mut self, engine: impl TransactionEngine + 'static) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }

    #[must_use]
    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Some(Box::new(prompter));
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Build the context
    ///
    /// The package set, engine and event sender are required. The config
    /// and network client fall back to defaults and the prompter to
    /// [`AssumeYes`].
    ///
    /// # Errors
    ///
    /// Returns an error if a required component is missing or the default
    /// network client cannot be created.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let config = self.config.unwrap_or_default();
        let net = match self.net {
            Some(net) => net,
            None => NetClient::new(NetConfig::from(&config.network))?,
        };

        Ok(OpsCtx {
            packages: Arc::new(self.packages.ok_or_else(|| missing("packages"))?),
            engine: self.engine.ok_or_else(|| missing("engine"))?,
            tx: self.tx.ok_or_else(|| missing("event sender"))?,
            prompter: self.prompter.unwrap_or_else(|| Box::new(AssumeYes)),
            config,
            net,
        })
    }
}

fn missing(component: &str) -> Error {
    ConfigError::InvalidValue {
        field: component.to_string(),
        value: "not set".to_string(),
    }
    .into()
}
