use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::auth::TokenSigner;
use crate::config::BrokerConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::notify::BroadcastNotifier;
use crate::rates;
use crate::session::SessionRegistry;
use crate::tools::{CreateLabel, GetShippingQuotes};

/// 会话级工具调用代理的组装根。
///
/// 持有进程级会话注册表、工具分发表、广播通知器与令牌签发器，
/// 供传输层（WebSocket handler 与 HTTP 端点）共享。
pub struct Broker {
    config: Arc<BrokerConfig>,
    registry: Arc<SessionRegistry>,
    dispatcher: Arc<Dispatcher>,
    notifier: BroadcastNotifier,
    signer: TokenSigner,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Result<Self> {
        info!(
            bind_addr = %config.bind_addr,
            outbound_buffer_size = config.outbound_buffer_size,
            "initializing broker"
        );

        let registry = Arc::new(SessionRegistry::new());
        let notifier = BroadcastNotifier::new(registry.clone());

        let provider = rates::provider_from_config(&config.rates);
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(GetShippingQuotes::new(provider)));
        dispatcher.register(Arc::new(CreateLabel::new()));
        info!(tools = ?dispatcher.tool_names(), "tool registry ready");

        let signer = TokenSigner::new(
            config.auth.secret.as_bytes().to_vec(),
            Duration::from_secs(config.auth.token_ttl_secs),
        );

        Ok(Self {
            config: Arc::new(config),
            registry,
            dispatcher: Arc::new(dispatcher),
            notifier,
            signer,
        })
    }

    /// 签发一枚连接令牌。
    pub fn issue_token(&self) -> Result<String> {
        self.signer.issue()
    }

    /// 校验连接令牌。
    pub fn verify_token(&self, token: &str) -> Result<()> {
        self.signer.verify(token).map(|_| ())
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn notifier(&self) -> &BroadcastNotifier {
        &self.notifier
    }

    pub fn outbound_buffer_size(&self) -> usize {
        self.config.outbound_buffer_size
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }
}
