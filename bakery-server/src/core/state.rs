use std::sync::Arc;

use crate::auth::JwtService;
use crate::core::Config;
use crate::core::event_forwarder::EventForwarder;
use crate::message::{EventBus, TransportConfig};
use crate::notify::{LogTicketSender, TicketSender};
use crate::orders::{OrderStorage, OrdersManager};
use crate::payment::{PaymentService, StripeClient};
use crate::utils::AppError;

/// Server state, shared handles to every service
///
/// | Field | Type | Role |
/// |-------|------|------|
/// | config | Config | Immutable configuration |
/// | manager | Arc<OrdersManager> | Order lifecycle authority |
/// | bus | EventBus | Order event channel |
/// | jwt_service | Arc<JwtService> | Token validation |
/// | payment | PaymentService | Payment intents (with minimum guard) |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub manager: Arc<OrdersManager>,
    pub bus: EventBus,
    pub jwt_service: Arc<JwtService>,
    pub payment: PaymentService,
}

impl ServerState {
    /// Initialize all services from configuration
    ///
    /// 1. Work directory and database
    /// 2. Payment client
    /// 3. Lifecycle manager
    /// 4. Event bus
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.work_dir)
            .map_err(|e| AppError::internal(format!("Failed to create work dir: {}", e)))?;

        let storage = OrderStorage::open(config.database_path())
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let ticket_sender: Arc<dyn TicketSender> = Arc::new(LogTicketSender);
        let manager = Arc::new(OrdersManager::with_capacity(
            storage,
            ticket_sender,
            config.event_channel_capacity,
        ));

        let bus = EventBus::from_config(TransportConfig {
            tcp_listen_addr: format!("0.0.0.0:{}", config.event_tcp_port),
            channel_capacity: config.event_channel_capacity,
        });

        let processor = StripeClient::new(
            config.payment_api_base.clone(),
            config.payment_secret_key.clone(),
            std::time::Duration::from_millis(config.request_timeout_ms),
        )?;
        let payment = PaymentService::new(Arc::new(processor), config.payment_currency.clone());

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Ok(Self {
            config: config.clone(),
            manager,
            bus,
            jwt_service,
            payment,
        })
    }

    /// Start background tasks
    ///
    /// Must run before `Server::run()`. Starts:
    /// - the event forwarder (manager broadcasts -> event bus)
    /// - the event channel TCP server
    pub fn start_background_tasks(&self) {
        let forwarder = EventForwarder::new(self.bus.clone());
        let rx = self.manager.subscribe();
        tokio::spawn(async move {
            forwarder.run(rx).await;
        });

        let bus = self.bus.clone();
        tokio::spawn(async move {
            if let Err(e) = bus.start_tcp_server().await {
                tracing::error!("Event channel TCP server failed: {}", e);
            }
        });
    }

    pub fn jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    pub fn manager(&self) -> &Arc<OrdersManager> {
        &self.manager
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Shut down background tasks
    pub fn shutdown(&self) {
        self.bus.shutdown();
    }
}
