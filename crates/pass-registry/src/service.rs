//! # Pass Registry Service
//!
//! Wraps the [`PassRegistry`] aggregate behind an async, lock-guarded
//! service and publishes the events of every applied mutation.
//!
//! ## Atomicity
//!
//! Each operation runs under a single write guard. A failed operation
//! leaves no trace: the aggregate validates before it mutates, and events
//! are only queued by successful operations. Events are published while
//! the guard is still held, so subscribers see them in mutation order.
//!
//! ## Caller Identity
//!
//! The caller is supplied by the transport, never read from the payload.

use crate::adapters::{InMemoryEventBus, InMemoryFunds, ManualClock};
use crate::config::{RegistryConfig, ServiceConfig};
use crate::domain::entities::IssueOrder;
use crate::domain::invariants::check_all_invariants;
use crate::domain::registry::PassRegistry;
use crate::domain::value_objects::{Address, PassId, Timestamp, Uin, U256};
use crate::errors::{ConfigError, RegistryError};
use crate::events::{RegistryInfo, RegistryReply, RegistryRequest, RegistryResponse};
use crate::ports::inbound::PassRegistryApi;
use crate::ports::outbound::{Clock, EventSink, FundsTransfer};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Statistics for the pass registry service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Envelopes handled through [`PassRegistryService::handle_request`].
    pub requests_handled: u64,
    /// Mutations that were applied.
    pub mutations_applied: u64,
    /// Operations that failed for any reason.
    pub failed_operations: u64,
    /// Operations refused for lack of authority.
    pub rejected_requests: u64,
    /// Passes created.
    pub passes_issued: u64,
    /// Events handed to the sink.
    pub events_emitted: u64,
}

/// The pass registry service.
pub struct PassRegistryService<C: Clock, F: FundsTransfer, E: EventSink> {
    config: ServiceConfig,
    registry: Arc<RwLock<PassRegistry>>,
    clock: Arc<C>,
    funds: Arc<F>,
    events: Arc<E>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl<C: Clock, F: FundsTransfer, E: EventSink> PassRegistryService<C, F, E> {
    /// Create a service over a fresh registry.
    ///
    /// # Errors
    ///
    /// `ZeroAdmin` if the registry config names no admin.
    pub fn new(config: ServiceConfig, clock: C, funds: F, events: E) -> Result<Self, ConfigError> {
        Self::with_shared(config, Arc::new(clock), Arc::new(funds), Arc::new(events))
    }

    /// Create a service over collaborators the caller keeps handles to.
    ///
    /// # Errors
    ///
    /// `ZeroAdmin` if the registry config names no admin.
    pub fn with_shared(
        config: ServiceConfig,
        clock: Arc<C>,
        funds: Arc<F>,
        events: Arc<E>,
    ) -> Result<Self, ConfigError> {
        config.registry.validate()?;
        Ok(Self::assemble(config, clock, funds, events))
    }

    fn assemble(config: ServiceConfig, clock: Arc<C>, funds: Arc<F>, events: Arc<E>) -> Self {
        let registry = PassRegistry::from_config(&config.registry);
        info!(
            name = registry.name(),
            symbol = registry.symbol(),
            admin = %registry.admin(),
            max_supply = registry.max_supply(),
            "Pass registry initialized"
        );

        Self {
            config,
            registry: Arc::new(RwLock::new(registry)),
            clock,
            funds,
            events,
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// Service configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Clock collaborator.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Funds collaborator.
    #[must_use]
    pub fn funds(&self) -> &F {
        &self.funds
    }

    /// Event sink.
    #[must_use]
    pub fn event_sink(&self) -> &E {
        &self.events
    }

    /// Run `read` against a consistent view of the registry.
    pub async fn read<T>(&self, read: impl FnOnce(&PassRegistry) -> T) -> T {
        read(&*self.registry.read().await)
    }

    // =========================================================================
    // ENVELOPE HANDLING
    // =========================================================================

    /// Handle one request on behalf of an authenticated caller.
    #[instrument(skip(self, request), fields(correlation_id = %correlation_id, caller = %caller))]
    pub async fn handle_request(
        &self,
        caller: Address,
        correlation_id: Uuid,
        request: RegistryRequest,
    ) -> RegistryResponse {
        self.stats.write().await.requests_handled += 1;
        debug!(mutation = request.is_mutation(), "Processing registry request");

        let result = self.dispatch(caller, request).await;
        if let Err(err) = &result {
            debug!(code = err.code(), "Request failed");
        }
        RegistryResponse::from_result(correlation_id, result)
    }

    async fn dispatch(
        &self,
        caller: Address,
        request: RegistryRequest,
    ) -> Result<RegistryReply, RegistryError> {
        use RegistryRequest as Req;

        let reply = match request {
            Req::Issue {
                recipient,
                owner_uin,
            } => RegistryReply::Issued {
                pass_id: self.issue(caller, recipient, owner_uin).await?,
            },
            Req::MassIssue { orders } => RegistryReply::BatchIssued {
                pass_ids: self.mass_issue(caller, orders).await?,
            },
            Req::MassAirdrop {
                recipients,
                owner_uins,
            } => RegistryReply::BatchIssued {
                pass_ids: self.mass_airdrop(caller, recipients, owner_uins).await?,
            },
            Req::ChangeOwnerUin { pass_id, owner_uin } => {
                self.change_owner_uin(caller, pass_id, owner_uin).await?;
                RegistryReply::Ack
            }
            Req::TransferOwnership { pass_id, new_owner } => {
                self.transfer_ownership(caller, pass_id, new_owner).await?;
                RegistryReply::Ack
            }
            Req::Approve { pass_id, approved } => {
                self.approve(caller, pass_id, approved).await?;
                RegistryReply::Ack
            }
            Req::SetApprovalForAll { operator, approved } => {
                self.set_approval_for_all(caller, operator, approved).await?;
                RegistryReply::Ack
            }
            Req::SetDelegation {
                pass_id,
                user,
                expires,
                user_uin,
            } => {
                self.set_delegation(caller, pass_id, user, expires, user_uin)
                    .await?;
                RegistryReply::Ack
            }
            Req::ClearDelegation { pass_id } => {
                self.clear_delegation(caller, pass_id).await?;
                RegistryReply::Ack
            }
            Req::SetBaseUri { base_uri } => {
                self.set_base_uri(caller, base_uri).await?;
                RegistryReply::Ack
            }
            Req::Deposit { amount } => {
                self.deposit(caller, amount).await?;
                RegistryReply::Ack
            }
            Req::Withdraw => RegistryReply::Withdrawn {
                amount: self.withdraw(caller).await?,
            },
            Req::OwnerOf { pass_id } => RegistryReply::Owner {
                owner: self.owner_of(pass_id).await?,
            },
            Req::OwnerUin { pass_id } => RegistryReply::Uin {
                uin: Some(self.owner_uin(pass_id).await?),
            },
            Req::UserUin { pass_id } => RegistryReply::Uin {
                uin: self.user_uin(pass_id).await?,
            },
            Req::UserOf { pass_id } => RegistryReply::User {
                user: self.user_of(pass_id).await?,
            },
            Req::UserExpires { pass_id } => RegistryReply::Expiry {
                expires: self.user_expires(pass_id).await?,
            },
            Req::TokenUri { pass_id } => RegistryReply::Uri {
                uri: self.resolve_uri(pass_id).await?,
            },
            Req::BalanceOf { owner } => {
                let (balance, pass_ids) = self.holdings(owner).await;
                RegistryReply::Holdings { balance, pass_ids }
            }
            Req::Info => RegistryReply::Info(self.info().await),
        };
        Ok(reply)
    }

    // =========================================================================
    // MUTATION PIPELINE
    // =========================================================================

    /// Apply `op` under the write guard, then publish the events it queued.
    async fn mutate<T, Op>(
        &self,
        name: &'static str,
        caller: Address,
        op: Op,
    ) -> Result<T, RegistryError>
    where
        T: Send,
        Op: FnOnce(&mut PassRegistry) -> Result<T, RegistryError> + Send,
    {
        let mut registry = self.registry.write().await;
        let issued_before = registry.total_issued();
        let result = op(&mut registry);
        let events = registry.drain_events();
        debug_assert!(
            check_all_invariants(&registry).is_valid(),
            "registry invariants broken by {name}"
        );

        {
            let mut stats = self.stats.write().await;
            match &result {
                Ok(_) => {
                    stats.mutations_applied += 1;
                    stats.passes_issued += registry.total_issued() - issued_before;
                    stats.events_emitted += events.len() as u64;
                }
                Err(err) => {
                    stats.failed_operations += 1;
                    if err.is_unauthorized() {
                        stats.rejected_requests += 1;
                    }
                }
            }
        }

        match &result {
            Ok(_) => info!(op = name, caller = %caller, events = events.len(), "Mutation applied"),
            Err(err) if err.is_unauthorized() => {
                warn!(op = name, caller = %caller, error = %err, "Unauthorized request rejected");
            }
            Err(err) => warn!(op = name, caller = %caller, error = %err, "Mutation rejected"),
        }

        for event in events {
            if let Err(err) = self.events.publish(event).await {
                debug!(error = %err, "Registry event not delivered");
            }
        }
        drop(registry);

        result
    }

    async fn query<T>(
        &self,
        read: impl FnOnce(&PassRegistry) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let result = self.read(read).await;
        if result.is_err() {
            self.stats.write().await.failed_operations += 1;
        }
        result
    }
}

/// Create a service with in-memory adapters (for testing).
///
/// The admin is `admin`, the clock starts at 1 700 000 000 and the supply
/// cap is the deployment default.
#[must_use]
pub fn create_test_service(
    admin: Address,
) -> PassRegistryService<ManualClock, InMemoryFunds, InMemoryEventBus> {
    create_test_service_with(RegistryConfig {
        admin,
        ..RegistryConfig::default()
    })
}

/// Create a service with in-memory adapters over `registry`.
///
/// Skips config validation so tests can build edge-case registries.
#[must_use]
pub fn create_test_service_with(
    registry: RegistryConfig,
) -> PassRegistryService<ManualClock, InMemoryFunds, InMemoryEventBus> {
    let config = ServiceConfig::new(registry);
    let bus = InMemoryEventBus::with_capacity(config.event_capacity);
    PassRegistryService::assemble(
        config,
        Arc::new(ManualClock::default()),
        Arc::new(InMemoryFunds::new()),
        Arc::new(bus),
    )
}

// =============================================================================
// PassRegistryApi Implementation
// =============================================================================

#[async_trait]
impl<C: Clock, F: FundsTransfer, E: EventSink> PassRegistryApi for PassRegistryService<C, F, E> {
    async fn issue(
        &self,
        caller: Address,
        recipient: Address,
        owner_uin: Uin,
    ) -> Result<PassId, RegistryError> {
        self.mutate("issue", caller, |registry| {
            registry.issue(caller, recipient, owner_uin)
        })
        .await
    }

    async fn change_owner_uin(
        &self,
        caller: Address,
        pass_id: PassId,
        owner_uin: Uin,
    ) -> Result<(), RegistryError> {
        self.mutate("change_owner_uin", caller, |registry| {
            registry.change_owner_uin(caller, pass_id, owner_uin)
        })
        .await
    }

    async fn transfer_ownership(
        &self,
        caller: Address,
        pass_id: PassId,
        new_owner: Address,
    ) -> Result<(), RegistryError> {
        self.mutate("transfer_ownership", caller, |registry| {
            registry.transfer_ownership(caller, pass_id, new_owner)
        })
        .await
    }

    async fn approve(
        &self,
        caller: Address,
        pass_id: PassId,
        approved: Option<Address>,
    ) -> Result<(), RegistryError> {
        self.mutate("approve", caller, |registry| {
            registry.approve(caller, pass_id, approved)
        })
        .await
    }

    async fn set_approval_for_all(
        &self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), RegistryError> {
        self.mutate("set_approval_for_all", caller, |registry| {
            registry.set_approval_for_all(caller, operator, approved)
        })
        .await
    }

    async fn set_base_uri(&self, caller: Address, base_uri: String) -> Result<(), RegistryError> {
        self.mutate("set_base_uri", caller, |registry| {
            registry.set_base_uri(caller, base_uri)
        })
        .await
    }

    async fn deposit(&self, from: Address, amount: U256) -> Result<(), RegistryError> {
        self.mutate("deposit", from, |registry| registry.deposit(from, amount))
            .await
    }

    async fn withdraw(&self, caller: Address) -> Result<U256, RegistryError> {
        let funds = Arc::clone(&self.funds);
        self.mutate("withdraw", caller, move |registry| {
            registry.withdraw(caller, |to, amount| funds.pay_out(to, amount))
        })
        .await
    }

    async fn resolve_uri(&self, pass_id: PassId) -> Result<String, RegistryError> {
        self.query(|registry| registry.resolve_uri(pass_id)).await
    }

    async fn owner_of(&self, pass_id: PassId) -> Result<Address, RegistryError> {
        self.query(|registry| registry.owner_of(pass_id)).await
    }

    async fn owner_uin(&self, pass_id: PassId) -> Result<Uin, RegistryError> {
        self.query(|registry| registry.owner_uin(pass_id)).await
    }

    async fn holdings(&self, owner: Address) -> (u64, Vec<PassId>) {
        self.read(|registry| (registry.balance_of(owner), registry.passes_of(owner)))
            .await
    }

    async fn info(&self) -> RegistryInfo {
        self.read(|registry| RegistryInfo {
            name: registry.name().to_string(),
            symbol: registry.symbol().to_string(),
            admin: registry.admin(),
            total_supply: registry.total_issued(),
            max_supply: registry.max_supply(),
            base_uri: registry.base_uri().to_string(),
            balance: registry.custodied_balance(),
        })
        .await
    }

    async fn set_delegation(
        &self,
        caller: Address,
        pass_id: PassId,
        user: Address,
        expires: Timestamp,
        user_uin: Uin,
    ) -> Result<(), RegistryError> {
        let clock = &self.clock;
        self.mutate("set_delegation", caller, |registry| {
            let now = clock.now();
            registry.set_delegation(caller, pass_id, user, expires, user_uin, now)
        })
        .await
    }

    async fn clear_delegation(
        &self,
        caller: Address,
        pass_id: PassId,
    ) -> Result<(), RegistryError> {
        self.mutate("clear_delegation", caller, |registry| {
            registry.clear_delegation(caller, pass_id)
        })
        .await
    }

    async fn user_of(&self, pass_id: PassId) -> Result<Option<Address>, RegistryError> {
        let now = self.clock.now();
        self.effective_user(pass_id, now).await
    }

    async fn effective_user(
        &self,
        pass_id: PassId,
        now: Timestamp,
    ) -> Result<Option<Address>, RegistryError> {
        self.query(|registry| registry.effective_user(pass_id, now))
            .await
    }

    async fn user_expires(&self, pass_id: PassId) -> Result<Option<Timestamp>, RegistryError> {
        self.query(|registry| registry.delegation_expiry(pass_id))
            .await
    }

    async fn user_uin(&self, pass_id: PassId) -> Result<Option<Uin>, RegistryError> {
        self.query(|registry| registry.user_uin(pass_id)).await
    }

    async fn mass_issue(
        &self,
        caller: Address,
        orders: Vec<IssueOrder>,
    ) -> Result<Vec<PassId>, RegistryError> {
        self.mutate("mass_issue", caller, |registry| {
            registry.mass_issue(caller, &orders)
        })
        .await
    }

    async fn mass_airdrop(
        &self,
        caller: Address,
        recipients: Vec<Address>,
        owner_uins: Vec<Uin>,
    ) -> Result<Vec<PassId>, RegistryError> {
        self.mutate("mass_airdrop", caller, |registry| {
            registry.mass_airdrop(caller, &recipients, &owner_uins)
        })
        .await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::RegistryEvent;
    use crate::domain::value_objects::Role;

    const ADMIN: Address = Address::new([0xAA; 20]);
    const ALICE: Address = Address::new([0x01; 20]);
    const BOB: Address = Address::new([0x02; 20]);

    #[tokio::test]
    async fn test_create_service() {
        let service = create_test_service(ADMIN);
        let stats = service.stats().await;
        assert_eq!(stats, ServiceStats::default());

        let info = service.info().await;
        assert_eq!(info.name, "RevPass");
        assert_eq!(info.symbol, "REV");
        assert_eq!(info.admin, ADMIN);
        assert_eq!(info.total_supply, 0);
        assert_eq!(info.max_supply, 1000);
    }

    #[test]
    fn test_zero_admin_refused() {
        let result = PassRegistryService::new(
            ServiceConfig::default(),
            ManualClock::default(),
            InMemoryFunds::new(),
            InMemoryEventBus::new(),
        );
        assert!(matches!(result, Err(ConfigError::ZeroAdmin)));
    }

    #[tokio::test]
    async fn test_issue_publishes_event() {
        let service = create_test_service(ADMIN);
        let mut rx = service.event_sink().subscribe();

        let id = service.issue(ADMIN, ALICE, 77).await.unwrap();
        assert_eq!(id, PassId::FIRST);

        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryEvent::Issued {
                pass_id: id,
                recipient: ALICE,
                owner_uin: 77,
            }
        );

        let stats = service.stats().await;
        assert_eq!(stats.mutations_applied, 1);
        assert_eq!(stats.passes_issued, 1);
        assert_eq!(stats.events_emitted, 1);
    }

    #[tokio::test]
    async fn test_unauthorized_counted_and_silent() {
        let service = create_test_service(ADMIN);
        let mut rx = service.event_sink().subscribe();

        let err = service.issue(ALICE, ALICE, 1).await.unwrap_err();
        assert_eq!(
            err,
            RegistryError::Unauthorized {
                caller: ALICE,
                required: Role::Admin,
            }
        );
        assert!(rx.try_recv().is_err());

        let stats = service.stats().await;
        assert_eq!(stats.rejected_requests, 1);
        assert_eq!(stats.failed_operations, 1);
        assert_eq!(stats.mutations_applied, 0);
    }

    #[tokio::test]
    async fn test_delegation_uses_service_clock() {
        let service = create_test_service(ADMIN);
        let id = service.issue(ADMIN, ALICE, 1).await.unwrap();
        let now = service.clock().now();

        service
            .set_delegation(ALICE, id, BOB, now + 100, 9)
            .await
            .unwrap();
        assert_eq!(service.user_of(id).await.unwrap(), Some(BOB));

        service.clock().advance(100);
        assert_eq!(service.user_of(id).await.unwrap(), None);
        assert_eq!(service.user_expires(id).await.unwrap(), Some(now + 100));

        let err = service
            .set_delegation(ALICE, id, BOB, now + 100, 9)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidExpiry { .. }));
    }

    #[tokio::test]
    async fn test_delegation_reads_clock_under_write_guard() {
        let service = Arc::new(create_test_service(ADMIN));
        let id = service.issue(ADMIN, ALICE, 1).await.unwrap();
        let now = service.clock().now();

        let guard = service.registry.write().await;
        let pending = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.set_delegation(ALICE, id, BOB, now + 50, 9).await }
        });
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        service.clock().advance(100);
        drop(guard);

        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(
            err,
            RegistryError::InvalidExpiry {
                expiry: now + 50,
                now: now + 100,
            }
        );
        assert_eq!(service.user_of(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_withdraw_pays_admin() {
        let service = create_test_service(ADMIN);
        service.deposit(BOB, U256::from(500u64)).await.unwrap();

        assert_eq!(service.withdraw(ADMIN).await, Ok(U256::from(500u64)));
        assert_eq!(service.funds().paid_to(ADMIN), U256::from(500u64));
        assert!(service.info().await.balance.is_zero());
        assert_eq!(
            service.withdraw(ADMIN).await,
            Err(RegistryError::NothingToWithdraw)
        );
    }

    #[tokio::test]
    async fn test_failed_payout_keeps_balance() {
        let service = create_test_service(ADMIN);
        service.deposit(BOB, U256::from(3u64)).await.unwrap();
        service.funds().set_failing(true);

        let err = service.withdraw(ADMIN).await.unwrap_err();
        assert!(matches!(err, RegistryError::FundsTransfer(_)));
        assert_eq!(service.info().await.balance, U256::from(3u64));
    }

    #[tokio::test]
    async fn test_handle_request_success() {
        let service = create_test_service(ADMIN);
        let correlation_id = Uuid::new_v4();

        let response = service
            .handle_request(
                ADMIN,
                correlation_id,
                RegistryRequest::Issue {
                    recipient: ALICE,
                    owner_uin: 5,
                },
            )
            .await;

        assert!(response.success);
        assert_eq!(response.correlation_id, correlation_id);
        assert_eq!(
            response.reply,
            Some(RegistryReply::Issued {
                pass_id: PassId::FIRST,
            })
        );
        assert_eq!(service.stats().await.requests_handled, 1);
    }

    #[tokio::test]
    async fn test_handle_request_error_payload() {
        let service = create_test_service(ADMIN);

        let response = service
            .handle_request(
                ALICE,
                Uuid::new_v4(),
                RegistryRequest::OwnerOf {
                    pass_id: PassId::new(3),
                },
            )
            .await;

        assert!(!response.success);
        assert!(response.reply.is_none());
        assert_eq!(response.error.unwrap().code, "NotFound");
    }

    #[tokio::test]
    async fn test_handle_request_reads() {
        let service = create_test_service(ADMIN);
        service
            .mass_airdrop(ADMIN, vec![ALICE, BOB, ALICE], vec![1, 2, 3])
            .await
            .unwrap();

        let response = service
            .handle_request(ALICE, Uuid::new_v4(), RegistryRequest::BalanceOf { owner: ALICE })
            .await;
        assert_eq!(
            response.reply,
            Some(RegistryReply::Holdings {
                balance: 2,
                pass_ids: vec![PassId::new(1), PassId::new(3)],
            })
        );

        let response = service
            .handle_request(
                BOB,
                Uuid::new_v4(),
                RegistryRequest::UserUin {
                    pass_id: PassId::new(2),
                },
            )
            .await;
        assert_eq!(response.reply, Some(RegistryReply::Uin { uin: None }));
    }

    #[tokio::test]
    async fn test_event_order_matches_mutations() {
        let service = create_test_service(ADMIN);
        let mut rx = service.event_sink().subscribe();

        let id = service.issue(ADMIN, ALICE, 1).await.unwrap();
        service.change_owner_uin(ADMIN, id, 2).await.unwrap();
        service.transfer_ownership(ALICE, id, BOB).await.unwrap();

        let topics: Vec<_> = (0..3).map(|_| rx.try_recv().unwrap().topic()).collect();
        assert_eq!(
            topics,
            vec!["revpass.issuance", "revpass.identifier", "revpass.transfer"]
        );
    }
}
