//! Device registry: the reachability state machine behind every accessory.
//!
//! Each bulb ever seen gets exactly one record keyed by its [`DeviceId`].
//! A record is `Online` while it holds a connection handle and `Offline`
//! otherwise; only discovery signals move it between the two.
//! Failed reads and writes are reported to the caller and never change
//! reachability.
//!
//! ```text
//!   Unknown --discovered/online--> Online <--online-- Offline
//!                                    |                  ^
//!                                    +-----offline------+
//!   Unknown --restore--> Offline          remove: any -> Unknown
//! ```

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::accessory::{AccessoryHost, AccessoryInfo};
use crate::cache::{CachedDevice, DeviceCache};
use crate::capabilities::Capabilities;
use crate::config::PlatformConfig;
use crate::errors::Error;
use crate::journal::{Transition, TransitionJournal};
use crate::mutation::Mutation;
use crate::response::Dispatch;
use crate::runtime::{self, Instant, Mutex};
use crate::state::{Field, FieldValue, LightState, StateReport};
use crate::transport::Transport;

type Result<T> = std::result::Result<T, Error>;

/// Namespace for accessory UUIDs derived from device ids.
const ACCESSORY_NAMESPACE: Uuid = Uuid::from_u128(0x5b1f_0c2e_9a4d_4e61_8f0b_6c7d_2e3a_1f90);

/// Stable vendor serial of a bulb.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: &str) -> Self {
        DeviceId(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name used until the bulb reports a label.
    ///
    /// ```
    /// use lifx_lan_bridge::DeviceId;
    ///
    /// assert_eq!(DeviceId::new("d073d5000001").default_display_name(), "LIFX d073d5000001");
    /// ```
    pub fn default_display_name(&self) -> String {
        format!("LIFX {}", self.0)
    }

    /// Deterministic accessory UUID, identical across restarts.
    pub fn accessory_uuid(&self) -> Uuid {
        Uuid::new_v5(&ACCESSORY_NAMESPACE, self.0.as_bytes())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        DeviceId::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        DeviceId(id)
    }
}

/// Lifecycle record of one bulb.
///
/// The record is online exactly when it holds a handle.
struct DeviceRecord<H> {
    display_name: String,
    handle: Option<H>,
    address: Option<SocketAddr>,
    state: LightState,
    capabilities: Option<Capabilities>,
    manufacturer: Option<String>,
    model: Option<String>,
    /// Hardware info was already requested on the current connection.
    capability_attempted: bool,
    /// Bumped whenever the handle is installed or dropped.
    generation: u64,
    /// Bumped whenever `state` is written.
    state_version: u64,
    last_refreshed: Option<Instant>,
    /// Commands awaiting the transport on the current connection.
    in_flight: Arc<AtomicU32>,
    ambient_lux: Option<f32>,
}

/// Marks a command as in flight until dropped, including when the command
/// future is cancelled.
struct InFlight(Arc<AtomicU32>);

impl InFlight {
    fn enter(counter: &Arc<AtomicU32>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlight(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<H> DeviceRecord<H> {
    fn new(id: &DeviceId) -> Self {
        DeviceRecord {
            display_name: id.default_display_name(),
            handle: None,
            address: None,
            state: LightState::default(),
            capabilities: None,
            manufacturer: None,
            model: None,
            capability_attempted: false,
            generation: 0,
            state_version: 0,
            last_refreshed: None,
            in_flight: Arc::default(),
            ambient_lux: None,
        }
    }

    fn reachable(&self) -> bool {
        self.handle.is_some()
    }

    fn commands_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Install a fresh connection; anything issued on the old one is stale.
    fn connect(&mut self, handle: H, address: Option<SocketAddr>) {
        self.handle = Some(handle);
        if address.is_some() {
            self.address = address;
        }
        self.generation += 1;
        self.in_flight = Arc::default();
    }

    fn disconnect(&mut self) {
        self.handle = None;
        self.generation += 1;
        self.in_flight = Arc::default();
        self.capability_attempted = false;
    }

    fn absorb(&mut self, report: StateReport) {
        if let Some(label) = report.label {
            self.display_name = label;
        }
        self.state = report.state;
        self.state_version += 1;
        self.last_refreshed = Some(Instant::now());
    }

    fn effective_capabilities(&self) -> Capabilities {
        self.capabilities.unwrap_or_default()
    }

    fn accessory_info(&self, id: &DeviceId) -> AccessoryInfo {
        AccessoryInfo {
            id: id.clone(),
            uuid: id.accessory_uuid(),
            display_name: self.display_name.clone(),
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            serial_number: id.to_string(),
            capabilities: self.effective_capabilities(),
        }
    }

    fn snapshot(&self, id: &DeviceId) -> DeviceSnapshot {
        DeviceSnapshot {
            id: id.clone(),
            display_name: self.display_name.clone(),
            reachable: self.reachable(),
            state: self.state,
            capabilities: self.capabilities,
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            address: self.address,
        }
    }
}

/// Read-only view of a device record.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub id: DeviceId,
    pub display_name: String,
    pub reachable: bool,
    pub state: LightState,
    /// `None` until hardware info was read successfully.
    pub capabilities: Option<Capabilities>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub address: Option<SocketAddr>,
}

struct Inner<H> {
    records: HashMap<DeviceId, DeviceRecord<H>>,
    journal: TransitionJournal,
}

/// Single source of truth mapping device ids to lifecycle records.
///
/// The record table sits behind an async mutex that is never held across a
/// transport call, so reads and writes to different (or the same) devices
/// proceed concurrently; the last completed write to a record wins.
pub struct Registry<T: Transport, A: AccessoryHost> {
    transport: Arc<T>,
    host: Arc<A>,
    config: PlatformConfig,
    inner: Mutex<Inner<T::Handle>>,
}

impl<T: Transport, A: AccessoryHost> Registry<T, A> {
    pub fn new(transport: Arc<T>, host: Arc<A>, config: PlatformConfig) -> Self {
        Registry {
            transport,
            host,
            config,
            inner: Mutex::new(Inner {
                records: HashMap::new(),
                journal: TransitionJournal::new(),
            }),
        }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// A bulb was discovered with a fresh handle and, if the probe answered,
    /// its current state.
    ///
    /// Attaches the handle, then resolves capabilities if they are still
    /// unknown. See [`Registry::attach`] and
    /// [`Registry::upgrade_capabilities`].
    pub async fn on_discovered(
        &self,
        id: &DeviceId,
        handle: T::Handle,
        address: Option<SocketAddr>,
        probed: Option<StateReport>,
    ) -> Transition {
        let transition = self.attach(id, handle, address, probed).await;
        if transition != Transition::Duplicate {
            self.upgrade_capabilities(id).await;
        }
        transition
    }

    /// Install a fresh handle without any network traffic.
    ///
    /// Unknown ids get a record and an accessory, registered with whatever
    /// capabilities are known (the white-only defaults for a new bulb).
    /// Offline records reconnect and are bound again. Online records only
    /// swap their handle.
    pub async fn attach(
        &self,
        id: &DeviceId,
        handle: T::Handle,
        address: Option<SocketAddr>,
        probed: Option<StateReport>,
    ) -> Transition {
        let mut inner = self.inner.lock().await;
        let transition = match inner.records.get_mut(id) {
            None => {
                let mut record = DeviceRecord::new(id);
                record.connect(handle, address);
                record.absorb(probed.unwrap_or_default());
                info!("Found: {} [{}]", record.display_name, id);
                self.host.register_accessory(&record.accessory_info(id));
                self.bind(id, &record);
                inner.records.insert(id.clone(), record);
                Transition::Discovered
            }
            Some(record) => {
                let was_reachable = record.reachable();
                record.connect(handle, address);
                if let Some(report) = probed {
                    record.absorb(report);
                }
                if was_reachable {
                    debug!("Duplicate announcement: {} [{}]", record.display_name, id);
                    Transition::Duplicate
                } else {
                    info!("Online: {} [{}]", record.display_name, id);
                    self.bind(id, record);
                    Transition::Reconnected
                }
            }
        };
        inner.journal.record(id, transition);
        transition
    }

    /// Resolve capabilities that are still unknown and, on success, bind the
    /// accessory again with the full characteristic set.
    ///
    /// Returns `true` if capabilities were upgraded by this call.
    pub async fn upgrade_capabilities(&self, id: &DeviceId) -> bool {
        {
            let inner = self.inner.lock().await;
            match inner.records.get(id) {
                Some(record) if record.capabilities.is_none() => {}
                _ => return false,
            }
        }

        if let Err(e) = self.resolve_capabilities(id).await {
            debug!("{id}: using default capabilities ({e})");
            return false;
        }

        let inner = self.inner.lock().await;
        if let Some(record) = inner.records.get(id) {
            if record.reachable() {
                self.bind(id, record);
            }
        }
        true
    }

    /// The discovery subsystem declared a bulb gone.
    ///
    /// Returns `None` for unknown or already offline devices.
    pub async fn on_offline(&self, id: &DeviceId) -> Option<Transition> {
        let mut inner = self.inner.lock().await;
        let Some(record) = inner.records.get_mut(id) else {
            debug!("Offline signal for unknown device {id}");
            return None;
        };
        if !record.reachable() {
            return None;
        }

        record.disconnect();
        info!("Offline: {} [{}]", record.display_name, id);
        self.host.unbind(id);
        inner.journal.record(id, Transition::Offline);
        Some(Transition::Offline)
    }

    /// A bulb answered again. First contact through this signal is handled
    /// exactly like a discovery without a probe.
    pub async fn on_online(
        &self,
        id: &DeviceId,
        handle: T::Handle,
        address: Option<SocketAddr>,
    ) -> Transition {
        self.on_discovered(id, handle, address, None).await
    }

    /// Read one field.
    ///
    /// Offline devices answer from the cache without touching the network. A
    /// failed live read also falls back to the cache; the error is logged,
    /// not returned. Only an unknown id is an error.
    pub async fn query(&self, id: &DeviceId, field: Field) -> Result<FieldValue> {
        match self.read_state(id, false).await {
            Ok(state) => Ok(state.get(field)),
            Err(e @ Error::DeviceNotFound(_)) => Err(e),
            Err(e) => {
                if e.is_unreachable() {
                    debug!("{e}; serving cached {field}");
                } else {
                    warn!("{e}; serving cached {field}");
                }
                self.cached_state(id).await.map(|s| s.get(field))
            }
        }
    }

    /// Force a live read and surface its failure.
    pub async fn refresh(&self, id: &DeviceId) -> Result<LightState> {
        self.read_state(id, true).await
    }

    /// The last known state, without any network traffic.
    pub async fn cached_state(&self, id: &DeviceId) -> Result<LightState> {
        let inner = self.inner.lock().await;
        inner
            .records
            .get(id)
            .map(|r| r.state)
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))
    }

    /// Apply a mutation locally and send it to the bulb.
    ///
    /// Offline devices skip the mutation entirely. Otherwise the cached state
    /// changes before the transport is called, so a read issued meanwhile
    /// sees the intended value.
    pub async fn command(&self, id: &DeviceId, mutation: &Mutation) -> Result<Dispatch> {
        if !mutation.is_valid() {
            return Err(Error::NoAttribute);
        }

        let (handle, generation, color, in_flight) = {
            let mut inner = self.inner.lock().await;
            let record = inner
                .records
                .get_mut(id)
                .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;
            let Some(handle) = record.handle.clone() else {
                debug!("{id} is offline; dropping {mutation:?}");
                return Ok(Dispatch::Skipped);
            };

            record.state.apply(mutation);
            if let Some(caps) = record.capabilities {
                if mutation.kelvin.is_some() {
                    let kelvin = caps.kelvin_range.clamp(record.state.color().kelvin);
                    record.state.apply(&Mutation::from(&kelvin));
                }
            }
            record.state_version += 1;
            let in_flight = InFlight::enter(&record.in_flight);
            (handle, record.generation, *record.state.color(), in_flight)
        };

        let fade = self.config.fade;
        let timeout = self.config.message_handler_timeout;
        let sent = async {
            if mutation.has_color() {
                runtime::timeout(timeout, self.transport.set_color(&handle, &color, fade))
                    .await
                    .map_err(|e| Error::transient(id, "set_color", e))?
                    .map_err(|e| Error::transient(id, "set_color", e))?;
            }
            if let Some(power) = mutation.power {
                runtime::timeout(timeout, self.transport.set_power(&handle, power, fade))
                    .await
                    .map_err(|e| Error::transient(id, "set_power", e))?
                    .map_err(|e| Error::transient(id, "set_power", e))?;
            }
            Ok::<(), Error>(())
        }
        .await;

        let inner = self.inner.lock().await;
        let current = matches!(inner.records.get(id), Some(r) if r.generation == generation);
        drop(in_flight);
        drop(inner);

        match sent {
            Ok(()) if current => Ok(Dispatch::Sent {
                power: mutation.power.is_some(),
                color: mutation.has_color(),
            }),
            Err(e) if current => Err(e),
            _ => {
                debug!("{id}: connection changed while commanding; result dropped");
                Ok(Dispatch::Superseded)
            }
        }
    }

    /// Resolve and cache hardware capabilities.
    ///
    /// Memoized once successful. Otherwise a single attempt is made per
    /// connection; later calls return [`Error::CapabilityUnresolved`] until the
    /// device reconnects.
    pub async fn resolve_capabilities(&self, id: &DeviceId) -> Result<Capabilities> {
        let handle = {
            let mut inner = self.inner.lock().await;
            let record = inner
                .records
                .get_mut(id)
                .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;
            if let Some(caps) = record.capabilities {
                return Ok(caps);
            }
            let Some(handle) = record.handle.clone() else {
                return Err(Error::CapabilityUnresolved(id.clone()));
            };
            if record.capability_attempted {
                return Err(Error::CapabilityUnresolved(id.clone()));
            }
            record.capability_attempted = true;
            handle
        };

        let info = match runtime::timeout(
            self.config.message_handler_timeout,
            self.transport.get_hardware_info(&handle),
        )
        .await
        {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                warn!("{id}: hardware info failed: {e}");
                return Err(Error::CapabilityUnresolved(id.clone()));
            }
            Err(e) => {
                warn!("{id}: hardware info failed: {e}");
                return Err(Error::CapabilityUnresolved(id.clone()));
            }
        };

        let mut inner = self.inner.lock().await;
        let record = inner
            .records
            .get_mut(id)
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;
        if let Some(caps) = record.capabilities {
            return Ok(caps);
        }
        debug!("{id}: {} {}", info.vendor, info.model);
        record.capabilities = Some(info.capabilities);
        record.manufacturer = Some(info.vendor);
        record.model = Some(info.model);
        Ok(info.capabilities)
    }

    /// Resolved capabilities, or the white-only defaults.
    pub async fn effective_capabilities(&self, id: &DeviceId) -> Result<Capabilities> {
        let inner = self.inner.lock().await;
        inner
            .records
            .get(id)
            .map(|r| r.effective_capabilities())
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))
    }

    /// Read the ambient light sensor, falling back to the last reading.
    pub async fn ambient_light(&self, id: &DeviceId) -> Result<f32> {
        let (handle, generation) = {
            let inner = self.inner.lock().await;
            let record = inner
                .records
                .get(id)
                .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;
            match &record.handle {
                Some(handle) => (handle.clone(), record.generation),
                None => {
                    return record
                        .ambient_lux
                        .ok_or_else(|| Error::DeviceUnreachable(id.clone()));
                }
            }
        };

        let read = runtime::timeout(
            self.config.message_handler_timeout,
            self.transport.get_ambient_light(&handle),
        )
        .await;

        let mut inner = self.inner.lock().await;
        let record = inner
            .records
            .get_mut(id)
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;
        let failure = match read {
            Ok(Ok(lux)) => {
                if record.generation == generation {
                    record.ambient_lux = Some(lux);
                }
                return Ok(lux);
            }
            Ok(Err(e)) => Error::transient(id, "get_ambient_light", e),
            Err(e) => Error::transient(id, "get_ambient_light", e),
        };
        warn!("{failure}");
        record.ambient_lux.ok_or(failure)
    }

    /// Operator removal: forget the device and withdraw its accessory.
    pub async fn remove(&self, id: &DeviceId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .records
            .remove(id)
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;
        info!("Remove: {} [{}]", record.display_name, id);
        inner.journal.record(id, Transition::Removed);
        self.host.unregister_accessory(id);
        Ok(())
    }

    /// Recreate an offline record for an accessory the host already knows.
    ///
    /// Returns `false` if the id already has a record. A later discovery of
    /// the device is a reconnection and does not register it again.
    pub async fn restore(&self, id: &DeviceId, cached: &CachedDevice) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.records.contains_key(id) {
            return false;
        }

        let mut record = DeviceRecord::new(id);
        record.display_name.clone_from(&cached.display_name);
        record.address = cached.address;
        record.capabilities = cached.capabilities;
        record.manufacturer.clone_from(&cached.manufacturer);
        record.model.clone_from(&cached.model);
        inner.records.insert(id.clone(), record);
        inner.journal.record(id, Transition::Restored);
        self.host.unbind(id);
        true
    }

    pub async fn snapshot(&self, id: &DeviceId) -> Option<DeviceSnapshot> {
        let inner = self.inner.lock().await;
        inner.records.get(id).map(|r| r.snapshot(id))
    }

    pub async fn is_reachable(&self, id: &DeviceId) -> Option<bool> {
        let inner = self.inner.lock().await;
        inner.records.get(id).map(|r| r.reachable())
    }

    /// The current connection handle, if the device is online.
    pub async fn handle(&self, id: &DeviceId) -> Option<T::Handle> {
        let inner = self.inner.lock().await;
        inner.records.get(id).and_then(|r| r.handle.clone())
    }

    pub async fn ids(&self) -> Vec<DeviceId> {
        let inner = self.inner.lock().await;
        let mut ids: Vec<DeviceId> = inner.records.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.records.is_empty()
    }

    pub async fn journal(&self) -> TransitionJournal {
        self.inner.lock().await.journal.clone()
    }

    /// Cache entries for every known device.
    pub async fn cache(&self) -> DeviceCache {
        let inner = self.inner.lock().await;
        inner
            .records
            .iter()
            .map(|(id, r)| {
                (
                    id.clone(),
                    CachedDevice {
                        display_name: r.display_name.clone(),
                        address: r.address,
                        manufacturer: r.manufacturer.clone(),
                        model: r.model.clone(),
                        capabilities: r.capabilities,
                    },
                )
            })
            .collect()
    }

    /// Returns diagnostics for every record plus the transition summary.
    pub async fn diagnostics(&self) -> Value {
        let inner = self.inner.lock().await;
        let mut devices: Vec<DeviceSnapshot> =
            inner.records.iter().map(|(id, r)| r.snapshot(id)).collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));

        json!({
            "devices": serde_json::to_value(devices).unwrap_or(Value::Null),
            "online": inner.records.values().filter(|r| r.reachable()).count(),
            "journal": serde_json::to_value(inner.journal.summary()).unwrap_or(Value::Null),
        })
    }

    async fn read_state(&self, id: &DeviceId, force: bool) -> Result<LightState> {
        let (handle, generation, version) = {
            let inner = self.inner.lock().await;
            let record = inner
                .records
                .get(id)
                .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;
            let Some(handle) = record.handle.clone() else {
                return Err(Error::DeviceUnreachable(id.clone()));
            };
            let fresh = record
                .last_refreshed
                .is_some_and(|t| t.elapsed() < self.config.state_ttl);
            if !force && (record.commands_in_flight() || fresh) {
                return Ok(record.state);
            }
            (handle, record.generation, record.state_version)
        };

        let report = runtime::timeout(
            self.config.message_handler_timeout,
            self.transport.get_state(&handle),
        )
        .await
        .map_err(|e| Error::transient(id, "get_state", e))?
        .map_err(|e| Error::transient(id, "get_state", e))?;

        let mut inner = self.inner.lock().await;
        let record = inner
            .records
            .get_mut(id)
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;
        // A write or reconnection that landed meanwhile is newer than this read.
        if record.generation == generation
            && record.state_version == version
            && !record.commands_in_flight()
        {
            record.absorb(report);
        }
        Ok(record.state)
    }

    fn bind(&self, id: &DeviceId, record: &DeviceRecord<T::Handle>) {
        let characteristics = record.effective_capabilities().characteristics();
        self.host.bind(id, &characteristics, &record.state);
    }
}
