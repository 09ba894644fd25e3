use std::{collections::HashMap, sync::Arc};

use log::{debug, info};

use crate::{CodecError, InstanceKey, SendHandlerError, SyncRole, SynkError, SynkPacket};

/// Host callback that puts one wire string on the network for an instance
pub type SendHandler = Arc<dyn Fn(&InstanceKey, &str) -> Result<(), SendHandlerError> + Send + Sync>;

/// Replica-side callback that applies an encoded value to one field
pub type ApplyCallback = Arc<dyn Fn(&str) -> Result<(), CodecError> + Send + Sync>;

/// Authority-side callback that reports a field's value for a new replica,
/// or `None` if the field still holds its default
pub type SnapshotProvider = Arc<dyn Fn() -> Result<Option<SynkPacket>, CodecError> + Send + Sync>;

/// Bookkeeping of which fields belong to which instance, and where outbound
/// packets go. Holds no business logic of its own.
pub struct SynkRegistry {
    role: SyncRole,
    send_handlers: Vec<SendHandler>,
    // instance -> (varName -> apply callback)
    apply_callbacks: HashMap<InstanceKey, HashMap<String, ApplyCallback>>,
    // instance -> providers in declaration order
    snapshot_providers: HashMap<InstanceKey, Vec<(String, SnapshotProvider)>>,
}

impl SynkRegistry {
    pub fn new(role: SyncRole) -> Self {
        Self {
            role,
            send_handlers: Vec::new(),
            apply_callbacks: HashMap::new(),
            snapshot_providers: HashMap::new(),
        }
    }

    pub fn role(&self) -> SyncRole {
        self.role
    }

    // Registration

    pub fn register_send_handler(&mut self, handler: SendHandler) -> Result<(), SynkError> {
        self.require(SyncRole::Authority, "register_send_handler")?;

        self.send_handlers.push(handler);
        info!(
            "SynkRegistry: Registered send handler #{}",
            self.send_handlers.len()
        );
        Ok(())
    }

    /// Re-registering the same `var_name` for an instance replaces the old callback
    pub fn register_apply_callback(
        &mut self,
        instance: &InstanceKey,
        var_name: &str,
        callback: ApplyCallback,
    ) -> Result<(), SynkError> {
        self.require(SyncRole::Replica, "register_apply_callback")?;
        self.insert_apply_callback(instance, var_name, callback);
        Ok(())
    }

    /// Re-registering the same `var_name` for an instance replaces the old
    /// provider in place, keeping its position in the snapshot order
    pub fn register_snapshot_provider(
        &mut self,
        instance: &InstanceKey,
        var_name: &str,
        provider: SnapshotProvider,
    ) -> Result<(), SynkError> {
        self.require(SyncRole::Authority, "register_snapshot_provider")?;
        self.insert_snapshot_provider(instance, var_name, provider);
        Ok(())
    }

    // Property declares itself through these, its role always matches ours
    pub(crate) fn insert_apply_callback(
        &mut self,
        instance: &InstanceKey,
        var_name: &str,
        callback: ApplyCallback,
    ) {
        info!(
            "SynkRegistry: Registering apply callback {:?} for {}",
            var_name, instance
        );
        self.apply_callbacks
            .entry(*instance)
            .or_default()
            .insert(var_name.to_string(), callback);
    }

    pub(crate) fn insert_snapshot_provider(
        &mut self,
        instance: &InstanceKey,
        var_name: &str,
        provider: SnapshotProvider,
    ) {
        info!(
            "SynkRegistry: Registering snapshot provider {:?} for {}",
            var_name, instance
        );
        let providers = self.snapshot_providers.entry(*instance).or_default();
        if let Some(entry) = providers.iter_mut().find(|(name, _)| name == var_name) {
            entry.1 = provider;
        } else {
            providers.push((var_name.to_string(), provider));
        }
    }

    /// Forget every field declared for `instance`. Returns whether anything
    /// was registered.
    pub fn deregister_instance(&mut self, instance: &InstanceKey) -> bool {
        let had_callbacks = self.apply_callbacks.remove(instance).is_some();
        let had_providers = self.snapshot_providers.remove(instance).is_some();
        if had_callbacks || had_providers {
            info!("SynkRegistry: Deregistered {}", instance);
        }
        had_callbacks || had_providers
    }

    // Lookup

    /// Snapshot of the current handler list, in registration order
    pub fn send_handlers(&self) -> Result<Vec<SendHandler>, SynkError> {
        self.require(SyncRole::Authority, "send_handlers")?;
        Ok(self.send_handlers.clone())
    }

    /// Invoke every send handler in order. The first handler failure stops
    /// dispatch and is returned.
    pub fn dispatch_to_all_send_handlers(
        &self,
        instance: &InstanceKey,
        wire: &str,
    ) -> Result<(), SynkError> {
        self.require(SyncRole::Authority, "dispatch_to_all_send_handlers")?;
        dispatch_to_send_handlers(&self.send_handlers, instance, wire)
    }

    pub fn resolve_apply_callback(
        &self,
        instance: &InstanceKey,
        var_name: &str,
    ) -> Result<ApplyCallback, SynkError> {
        self.require(SyncRole::Replica, "resolve_apply_callback")?;

        let callbacks = self
            .apply_callbacks
            .get(instance)
            .ok_or(SynkError::UnknownInstance {
                instance: *instance,
            })?;
        callbacks
            .get(var_name)
            .cloned()
            .ok_or_else(|| SynkError::UnknownField {
                instance: *instance,
                var_name: var_name.to_string(),
            })
    }

    /// Providers of `instance` in declaration order, empty if none
    pub fn snapshot_providers(
        &self,
        instance: &InstanceKey,
    ) -> Result<Vec<SnapshotProvider>, SynkError> {
        self.require(SyncRole::Authority, "snapshot_providers")?;

        Ok(self
            .snapshot_providers
            .get(instance)
            .map(|providers| {
                providers
                    .iter()
                    .map(|(_, provider)| provider.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Ask every provider of `instance` for its packet, skipping fields that
    /// still hold their default
    pub fn collect_snapshots(&self, instance: &InstanceKey) -> Result<Vec<SynkPacket>, SynkError> {
        let providers = self.snapshot_providers(instance)?;
        Ok(collect_from_providers(&providers)?)
    }

    // Diagnostics

    pub fn has_instance(&self, instance: &InstanceKey) -> bool {
        self.apply_callbacks.contains_key(instance) || self.snapshot_providers.contains_key(instance)
    }

    /// Number of fields declared for `instance` on this side
    pub fn field_count(&self, instance: &InstanceKey) -> usize {
        match self.role {
            SyncRole::Authority => self
                .snapshot_providers
                .get(instance)
                .map_or(0, |providers| providers.len()),
            SyncRole::Replica => self
                .apply_callbacks
                .get(instance)
                .map_or(0, |callbacks| callbacks.len()),
        }
    }

    pub fn send_handler_count(&self) -> usize {
        self.send_handlers.len()
    }

    fn require(&self, role: SyncRole, operation: &'static str) -> Result<(), SynkError> {
        if self.role != role {
            return Err(SynkError::WrongRole {
                operation,
                role: self.role,
            });
        }
        Ok(())
    }
}

pub(crate) fn dispatch_to_send_handlers(
    handlers: &[SendHandler],
    instance: &InstanceKey,
    wire: &str,
) -> Result<(), SynkError> {
    debug!(
        "SynkRegistry: Dispatching {} to {} send handler(s)",
        instance,
        handlers.len()
    );
    for handler in handlers {
        handler(instance, wire)?;
    }
    Ok(())
}

pub(crate) fn collect_from_providers(
    providers: &[SnapshotProvider],
) -> Result<Vec<SynkPacket>, CodecError> {
    let mut packets = Vec::with_capacity(providers.len());
    for provider in providers {
        if let Some(packet) = provider()? {
            packets.push(packet);
        }
    }
    Ok(packets)
}
