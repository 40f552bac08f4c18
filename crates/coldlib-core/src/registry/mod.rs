//! ServiceRegistry - singleton services published through containers.
//!
//! Every (service type, optional instance name) pair owns one slot, an
//! `awaitable(future_immutable())` container holding `Arc<S>`. Consumers can
//! take a reference to a slot before anything is bound and await it; the
//! first bind resolves every waiter.
//!
//! Construction is explicit: services are either bound directly or built by
//! a factory registered per service type.
//!
//! # Example
//! ```ignore
//! let registry = ServiceRegistry::new();
//! let clock = registry.wait_for::<Clock>(None)?;
//! registry.bind(Clock::default())?;
//! let clock = clock.await?;
//! ```

pub mod status;

pub use self::status::{RegistryStatus, ServiceStatus};

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, error, trace};

use crate::container::{ContainerRef, awaitable, future_immutable};
use crate::error::{ColdError, Failure};
use crate::pending::Pending;

/// Something that can be published in a [`ServiceRegistry`].
pub trait Service: Send + Sync + 'static {
    /// Name of the slot `bind` publishes this instance under.
    fn instance_name(&self) -> Option<&str> {
        None
    }
}

/// Builds a service on demand. Receives the registry so it can resolve its
/// own dependencies, and the requested instance name.
pub type Factory<S> = Arc<dyn Fn(&ServiceRegistry, Option<&str>) -> Result<S, Failure> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Allow `wait_for` on a slot nothing has been bound to yet.
    pub allow_unbound_wait: bool,
    /// Fail a second bind of the same slot. When disabled, the slot is
    /// replaced and existing references keep the previous instance.
    pub reject_rebind: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_unbound_wait: true,
            reject_rebind: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no factory registered for service '{service}'")]
    FactoryMissing { service: &'static str },
    #[error("service '{service}' is not bound")]
    Unbound { service: &'static str, name: Option<String> },
    #[error(transparent)]
    Container(#[from] ColdError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    type_id: TypeId,
    name: Option<String>,
}

impl Key {
    fn of<S: Service>(name: Option<&str>) -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            name: name.map(str::to_owned),
        }
    }
}

/// Type-erased view of a slot container.
trait ErasedSlot: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn is_bound(&self) -> bool;
    fn service(&self) -> Option<Arc<dyn Service>>;
}

impl<S: Service> ErasedSlot for ContainerRef<Arc<S>> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_bound(&self) -> bool {
        self.is_set().unwrap_or(false)
    }

    fn service(&self) -> Option<Arc<dyn Service>> {
        let service = self.get().ok().flatten()?;
        Some(service as Arc<dyn Service>)
    }
}

struct Entry {
    key: Key,
    service: &'static str,
    slot: Box<dyn ErasedSlot>,
    bound_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    index: HashMap<Key, usize>,
    /// Slot indexes in the order the registry bound them.
    bindings: Vec<usize>,
    factories: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Inner {
    fn slot<S: Service>(&mut self, key: Key) -> Result<ContainerRef<Arc<S>>, ColdError> {
        let index = match self.index.get(&key) {
            Some(&index) => index,
            None => {
                let index = self.entries.len();
                trace!(service = std::any::type_name::<S>(), name = ?key.name, "service slot created");
                self.entries.push(Entry {
                    key: key.clone(),
                    service: std::any::type_name::<S>(),
                    slot: Box::new(awaitable(future_immutable::<Arc<S>>())),
                    bound_at: None,
                });
                self.index.insert(key, index);
                index
            }
        };
        Self::typed(&self.entries[index])
    }

    /// Slots are keyed by `TypeId`, so the downcast only fails on a broken key.
    fn typed<S: Service>(entry: &Entry) -> Result<ContainerRef<Arc<S>>, ColdError> {
        entry
            .slot
            .as_any()
            .downcast_ref::<ContainerRef<Arc<S>>>()
            .cloned()
            .ok_or(ColdError::Unsupported {
                variant: "registry",
                reason: "slot holds a different service type",
            })
    }
}

/// Registry of lazily published singleton services.
///
/// All methods take `&self`; share it behind an `Arc`. The internal lock is
/// never held while a factory runs or a slot is written.
pub struct ServiceRegistry {
    config: RegistryConfig,
    inner: RwLock<Inner>,
    /// Held by `get_or_create` around check and create. Reentrant so a
    /// factory can resolve its dependencies on the same thread.
    creating: ReentrantMutex<()>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner::default()),
            creating: ReentrantMutex::new(()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The slot for `S` under `name`, created empty if absent.
    pub fn reference<S: Service>(&self, name: Option<&str>) -> Result<ContainerRef<Arc<S>>, RegistryError> {
        let key = Key::of::<S>(name);
        {
            let inner = self.inner.read();
            if let Some(&index) = inner.index.get(&key) {
                return Ok(Inner::typed::<S>(&inner.entries[index])?);
            }
        }
        Ok(self.inner.write().slot::<S>(key)?)
    }

    /// The bound instance, if any. Never creates a slot.
    pub fn get<S: Service>(&self, name: Option<&str>) -> Result<Option<Arc<S>>, RegistryError> {
        let slot = {
            let inner = self.inner.read();
            match inner.index.get(&Key::of::<S>(name)) {
                Some(&index) => Inner::typed::<S>(&inner.entries[index])?,
                None => return Ok(None),
            }
        };
        Ok(slot.get()?)
    }

    /// Publish `service` under its own [`Service::instance_name`].
    pub fn bind<S: Service>(&self, service: S) -> Result<Arc<S>, RegistryError> {
        let name = service.instance_name().map(str::to_owned);
        self.bind_as(service, name.as_deref())
    }

    /// Publish `service` under `name`, resolving everything waiting on the slot.
    ///
    /// # Errors
    /// `RegistryError::Container(ColdError::AlreadySet)` if the slot is bound
    /// and rebinding is rejected.
    pub fn bind_as<S: Service>(&self, service: S, name: Option<&str>) -> Result<Arc<S>, RegistryError> {
        let service = Arc::new(service);
        let key = Key::of::<S>(name);
        let slot = self.reference::<S>(name)?;

        match slot.set(Arc::clone(&service)) {
            Ok(_) => {}
            Err(ColdError::AlreadySet { .. }) if !self.config.reject_rebind => {
                return self.rebind(key, service);
            }
            Err(e) => return Err(e.into()),
        }

        let mut inner = self.inner.write();
        if let Some(&index) = inner.index.get(&key) {
            inner.entries[index].bound_at = Some(Utc::now());
            inner.bindings.push(index);
        }
        debug!(service = std::any::type_name::<S>(), name = ?key.name, "service bound");
        Ok(service)
    }

    fn rebind<S: Service>(&self, key: Key, service: Arc<S>) -> Result<Arc<S>, RegistryError> {
        let replacement = awaitable(future_immutable::<Arc<S>>());
        replacement.set(Arc::clone(&service))?;

        let mut inner = self.inner.write();
        if let Some(&index) = inner.index.get(&key) {
            let entry = &mut inner.entries[index];
            entry.slot = Box::new(replacement);
            entry.bound_at = Some(Utc::now());
            inner.bindings.retain(|&i| i != index);
            inner.bindings.push(index);
        }
        debug!(service = std::any::type_name::<S>(), name = ?key.name, "service rebound");
        Ok(service)
    }

    /// Register the factory `create` uses for `S`, replacing any previous one.
    pub fn register_factory<S, F>(&self, factory: F)
    where
        S: Service,
        F: Fn(&ServiceRegistry, Option<&str>) -> Result<S, Failure> + Send + Sync + 'static,
    {
        let factory: Factory<S> = Arc::new(factory);
        self.inner
            .write()
            .factories
            .insert(TypeId::of::<S>(), Box::new(factory));
        trace!(service = std::any::type_name::<S>(), "service factory registered");
    }

    /// Build `S` with its factory and bind it under `name`.
    ///
    /// # Errors
    /// - [`RegistryError::FactoryMissing`] without a registered factory
    /// - `RegistryError::Container(ColdError::OperationFailed)` if the factory fails
    /// - whatever [`bind_as`](Self::bind_as) reports
    pub fn create<S: Service>(&self, name: Option<&str>) -> Result<Arc<S>, RegistryError> {
        let service = std::any::type_name::<S>();
        let factory = self
            .inner
            .read()
            .factories
            .get(&TypeId::of::<S>())
            .and_then(|f| f.downcast_ref::<Factory<S>>())
            .cloned()
            .ok_or(RegistryError::FactoryMissing { service })?;

        let instance = factory(self, name).map_err(|cause| {
            error!(service, name = ?name, error = %cause, "service factory failed");
            ColdError::OperationFailed(cause)
        })?;
        self.bind_as(instance, name)
    }

    /// The bound instance, or one built with the registered factory.
    ///
    /// Racing callers share a single factory run and get the same instance.
    pub fn get_or_create<S: Service>(&self, name: Option<&str>) -> Result<Arc<S>, RegistryError> {
        if let Some(service) = self.get::<S>(name)? {
            return Ok(service);
        }
        let _creating = self.creating.lock();
        if let Some(service) = self.get::<S>(name)? {
            return Ok(service);
        }
        match self.create::<S>(name) {
            // factory 実行中に reference 経由で直接 bind された
            Err(RegistryError::Container(ColdError::AlreadySet { .. })) => {
                self.get::<S>(name)?.ok_or_else(|| RegistryError::Unbound {
                    service: std::any::type_name::<S>(),
                    name: name.map(str::to_owned),
                })
            }
            other => other,
        }
    }

    /// A future resolved with the instance bound under `name`. Already
    /// resolved if the slot is bound.
    pub fn wait_for<S: Service>(&self, name: Option<&str>) -> Result<Pending<Arc<S>>, RegistryError> {
        let slot = self.reference::<S>(name)?;
        if !self.config.allow_unbound_wait && !slot.is_set()? {
            return Err(RegistryError::Unbound {
                service: std::any::type_name::<S>(),
                name: name.map(str::to_owned),
            });
        }
        Ok(slot.await_value()?)
    }

    /// Every bound service. Services bound through the registry come first,
    /// in binding order, followed by slots written directly through a
    /// reference, in slot creation order.
    pub fn services(&self) -> Vec<Arc<dyn Service>> {
        let inner = self.inner.read();
        let direct = (0..inner.entries.len()).filter(|i| !inner.bindings.contains(i));
        inner
            .bindings
            .iter()
            .copied()
            .chain(direct)
            .filter_map(|i| inner.entries[i].slot.service())
            .collect()
    }

    pub fn status(&self) -> RegistryStatus {
        let inner = self.inner.read();
        let services: Vec<ServiceStatus> = inner
            .entries
            .iter()
            .map(|entry| ServiceStatus {
                service: entry.service.to_string(),
                name: entry.key.name.clone(),
                bound: entry.slot.is_bound(),
                bound_at: entry.bound_at,
            })
            .collect();
        RegistryStatus {
            slots: services.len(),
            bound: services.iter().filter(|s| s.bound).count(),
            factories: inner.factories.len(),
            services,
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
