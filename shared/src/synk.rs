use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crate::{
    registry::{collect_from_providers, dispatch_to_send_handlers},
    InstanceKey, Property, SendHandlerError, SyncRole, SynkConfig, SynkError, SynkPacket,
    SynkRegistry, SynkValue,
};

/// Entry point used by the host application.
///
/// One `Synk` per process side (or per test). It owns the registry every
/// [`Property`] declared through it registers into, so it must be built
/// before any field is declared. Cloning is cheap and every clone shares the
/// same registry.
///
/// Authority side:
/// ```
/// use synk_shared::{InstanceKey, Synk};
///
/// let synk = Synk::authority();
/// synk.register_send_handler(|instance, data| {
///     // look up the connections of `instance` and send `data` to each
///     let _ = (instance, data);
///     Ok(())
/// })
/// .unwrap();
///
/// let game = InstanceKey::from_u64(1);
/// let score = synk.declare(game, "score", 0u32);
/// score.set(5).unwrap();
///
/// // a client joins `game`
/// for data in synk.snapshot_for_new_client(&game).unwrap() {
///     let _ = data; // send to the new client
/// }
/// ```
///
/// Replica side:
/// ```
/// use synk_shared::{InstanceKey, Synk};
///
/// let synk = Synk::replica();
/// let game = InstanceKey::from_u64(1);
/// let score = synk.declare(game, "score", 0u32);
///
/// let text = r#"{"varName":"score","data":"5"}"#;
/// if !synk.handle_inbound_data(&game, text).unwrap() {
///     // not a Synk packet, handle it yourself
/// }
/// assert_eq!(score.get(), 5);
/// ```
#[derive(Clone)]
pub struct Synk {
    config: Arc<SynkConfig>,
    registry: Arc<RwLock<SynkRegistry>>,
}

impl Synk {
    pub fn new(config: SynkConfig) -> Self {
        debug!("Synk: Starting as {}", config.role);
        Self {
            registry: Arc::new(RwLock::new(SynkRegistry::new(config.role))),
            config: Arc::new(config),
        }
    }

    pub fn authority() -> Self {
        Self::new(SynkConfig::authority())
    }

    pub fn replica() -> Self {
        Self::new(SynkConfig::replica())
    }

    pub fn role(&self) -> SyncRole {
        self.config.role
    }

    pub fn config(&self) -> &SynkConfig {
        &self.config
    }

    /// Register a handler that transmits a wire string to every connection
    /// of an instance. Handlers run in registration order on every change.
    /// Authority only.
    pub fn register_send_handler<F>(&self, handler: F) -> Result<(), SynkError>
    where
        F: Fn(&InstanceKey, &str) -> Result<(), SendHandlerError> + Send + Sync + 'static,
    {
        self.write_registry()
            .register_send_handler(Arc::new(handler))
    }

    /// Hand Synk a payload exactly as received from the authority.
    ///
    /// Returns `Ok(false)` if the payload is not a Synk packet, in which case
    /// the host should handle it itself. A packet addressed to a field that
    /// was never declared for `instance` is a usage error. Replica only.
    pub fn handle_inbound_data(&self, instance: &InstanceKey, data: &str) -> Result<bool, SynkError> {
        self.require(SyncRole::Replica, "handle_inbound_data")?;

        let Some(packet) = SynkPacket::try_decode(data) else {
            return Ok(false);
        };

        let callback = self
            .read_registry()
            .resolve_apply_callback(instance, packet.var_name())?;

        debug!("Synk: Applying {:?} to {}", packet.var_name(), instance);
        callback(packet.data())?;
        Ok(true)
    }

    /// Wire strings that bring a newly joined replica of `instance` up to
    /// date, in field declaration order. Fields still at their default are
    /// left out. Authority only.
    pub fn snapshot_for_new_client(&self, instance: &InstanceKey) -> Result<Vec<String>, SynkError> {
        let providers = self.read_registry().snapshot_providers(instance)?;
        let packets = collect_from_providers(&providers)?;

        debug!(
            "Synk: Snapshot for {} holds {} of {} field(s)",
            instance,
            packets.len(),
            providers.len()
        );
        packets
            .iter()
            .map(|packet| packet.encode().map_err(SynkError::from))
            .collect()
    }

    /// Drop every registration of `instance`. Call when the host disposes of
    /// it. Returns whether anything was registered.
    pub fn deregister_instance(&self, instance: &InstanceKey) -> bool {
        self.write_registry().deregister_instance(instance)
    }

    /// Declare a synchronized field of `instance`
    pub fn declare<T: SynkValue>(
        &self,
        instance: InstanceKey,
        var_name: impl Into<String>,
        default_value: T,
    ) -> Property<T> {
        Property::new(self, instance, var_name, default_value)
    }

    pub fn has_instance(&self, instance: &InstanceKey) -> bool {
        self.read_registry().has_instance(instance)
    }

    pub fn field_count(&self, instance: &InstanceKey) -> usize {
        self.read_registry().field_count(instance)
    }

    pub(crate) fn dispatch(&self, instance: &InstanceKey, wire: &str) -> Result<(), SynkError> {
        // Handlers run without the registry lock so they may call back into Synk
        let handlers = self.read_registry().send_handlers()?;
        dispatch_to_send_handlers(&handlers, instance, wire)
    }

    pub(crate) fn read_registry(&self) -> RwLockReadGuard<'_, SynkRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_registry(&self) -> RwLockWriteGuard<'_, SynkRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn require(&self, role: SyncRole, operation: &'static str) -> Result<(), SynkError> {
        if self.role() != role {
            return Err(SynkError::WrongRole {
                operation,
                role: self.role(),
            });
        }
        Ok(())
    }
}
