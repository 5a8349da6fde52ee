//! Discovery pump and characteristic bindings.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use log::{debug, info, warn};

use crate::accessory::{AccessoryHost, Characteristic, CharacteristicValue};
use crate::cache::DeviceCache;
use crate::config::PlatformConfig;
use crate::discovery::DiscoveryEvent;
use crate::errors::Error;
use crate::journal::Transition;
use crate::mutation::Mutation;
use crate::registry::{DeviceId, Registry};
use crate::response::Dispatch;
use crate::runtime::{self, JoinHandle};
use crate::state::{FieldValue, StateReport};
use crate::transport::Transport;
use crate::types::{Brightness, Hue, Kelvin, PowerMode, Saturation};

type Result<T> = std::result::Result<T, Error>;

/// Connects a transport's discovery stream to the registry and serves the
/// accessory host's characteristic reads and writes.
///
/// Events are handled one at a time in arrival order, so an offline signal
/// can never overtake the online signal that preceded it.
pub struct Platform<T: Transport, A: AccessoryHost> {
    transport: Arc<T>,
    registry: Arc<Registry<T, A>>,
}

impl<T: Transport, A: AccessoryHost> Platform<T, A> {
    pub fn new(transport: Arc<T>, host: Arc<A>, config: PlatformConfig) -> Self {
        let registry = Arc::new(Registry::new(Arc::clone(&transport), host, config));
        Platform {
            transport,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<Registry<T, A>> {
        &self.registry
    }

    pub fn config(&self) -> &PlatformConfig {
        self.registry.config()
    }

    /// Handle one discovery event.
    ///
    /// Returns the transition applied, or `None` if the event was ignored or
    /// changed nothing.
    pub async fn handle_event(&self, event: DiscoveryEvent<T::Handle>) -> Option<Transition> {
        if self.config().is_ignored(event.id()) {
            debug!("Ignoring {} event for {}", event.kind(), event.id());
            return None;
        }

        let known = self.registry.is_reachable(event.id()).await.is_some();
        let (id, address, handle) = match event {
            DiscoveryEvent::Online {
                id,
                address,
                handle,
            } if known => {
                let transition = self.registry.attach(&id, handle, address, None).await;
                return Some(self.attached(id, transition).await);
            }
            // New bulbs, and online signals for ids never seen.
            DiscoveryEvent::New {
                id,
                address,
                handle,
            }
            | DiscoveryEvent::Online {
                id,
                address,
                handle,
            } => (id, address, handle),
            DiscoveryEvent::Offline { id } => return self.registry.on_offline(&id).await,
        };

        let probed = self.probe(&id, &handle).await;
        let transition = self.registry.attach(&id, handle, address, probed).await;
        Some(self.attached(id, transition).await)
    }

    /// Drain a discovery stream. Returns the number of events seen.
    pub async fn run<S>(&self, events: S) -> usize
    where
        S: Stream<Item = DiscoveryEvent<T::Handle>>,
    {
        futures::pin_mut!(events);
        let mut seen = 0;
        while let Some(event) = events.next().await {
            self.handle_event(event).await;
            seen += 1;
        }
        info!("Discovery stream ended after {seen} events");
        seen
    }

    /// Run the pump as a background task on the selected runtime.
    pub fn spawn<S>(self: Arc<Self>, events: S) -> JoinHandle<usize>
    where
        S: Stream<Item = DiscoveryEvent<T::Handle>> + Send + 'static,
    {
        runtime::spawn(async move { self.run(events).await })
    }

    /// Serve a characteristic read.
    pub async fn get(
        &self,
        id: &DeviceId,
        characteristic: Characteristic,
    ) -> Result<CharacteristicValue> {
        let value = match characteristic {
            Characteristic::AmbientLightLevel => {
                let lux = self.registry.ambient_light(id).await?;
                return Ok(CharacteristicValue::Number(f64::from(lux.max(0.0001))));
            }
            Characteristic::ColorTemperature => {
                let kelvin = self.query(id, characteristic).await?;
                let mired = kelvin
                    .as_u16()
                    .and_then(Kelvin::create)
                    .map(|k| k.mired())
                    .unwrap_or_else(|| Kelvin::new().mired());
                return Ok(CharacteristicValue::Number(f64::from(mired)));
            }
            _ => self.query(id, characteristic).await?,
        };

        Ok(match value {
            FieldValue::Power(on) => CharacteristicValue::Bool(on),
            other => CharacteristicValue::Number(f64::from(other.as_u16().unwrap_or_default())),
        })
    }

    /// Serve a characteristic write.
    pub async fn set(
        &self,
        id: &DeviceId,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> Result<Dispatch> {
        let target = characteristic.to_string();
        let invalid = |reason: &str| Error::invalid_value(&target, reason);

        let mutation = match characteristic {
            Characteristic::On => {
                let on = value.as_bool().ok_or_else(|| invalid("expected a boolean"))?;
                Mutation::from(&PowerMode::from(on))
            }
            Characteristic::Brightness => {
                let level = u8::try_from(number(&value, &target)?)
                    .ok()
                    .and_then(Brightness::create)
                    .ok_or_else(|| invalid("expected 1-100"))?;
                Mutation::from(&level)
            }
            Characteristic::Hue => {
                let hue = Hue::create(number(&value, &target)?)
                    .ok_or_else(|| invalid("expected 0-360"))?;
                Mutation::from(&hue)
            }
            Characteristic::Saturation => {
                let saturation = u8::try_from(number(&value, &target)?)
                    .ok()
                    .and_then(Saturation::create)
                    .ok_or_else(|| invalid("expected 0-100"))?;
                Mutation::from(&saturation)
            }
            Characteristic::Kelvin => {
                let kelvin = Kelvin::create(number(&value, &target)?)
                    .ok_or_else(|| invalid("expected 1500-9000"))?;
                Mutation::from(&kelvin)
            }
            Characteristic::ColorTemperature => {
                Mutation::from(&Kelvin::from_mired(number(&value, &target)?))
            }
            Characteristic::AmbientLightLevel => return Err(invalid("read-only")),
        };

        debug!("{id} - Set {characteristic}: {value:?}");
        self.registry.command(id, &mutation).await
    }

    /// Operator removal of a device.
    pub async fn remove(&self, id: &DeviceId) -> Result<()> {
        self.registry.remove(id).await?;
        self.persist().await;
        Ok(())
    }

    /// Restore offline records for every cached device that is not ignored.
    ///
    /// Returns the number of records created.
    pub async fn restore(&self, cache: &DeviceCache) -> usize {
        let mut restored = 0;
        for (id, device) in cache.iter() {
            if self.config().is_ignored(id) {
                continue;
            }
            if self.registry.restore(id, device).await {
                restored += 1;
            }
        }
        restored
    }

    /// Load the configured cache file and restore from it.
    pub async fn load_cache(&self) -> Result<usize> {
        let Some(path) = &self.config().cache_path else {
            return Ok(0);
        };
        let cache = DeviceCache::load(path)?;
        Ok(self.restore(&cache).await)
    }

    /// Write the configured cache file, if any.
    pub async fn save_cache(&self) -> Result<()> {
        save_cache(&self.registry).await
    }

    async fn persist(&self) {
        persist(&self.registry).await;
    }

    /// Persist a new or returning device, then resolve its capabilities off
    /// the pump so a silent bulb does not hold up other devices.
    async fn attached(&self, id: DeviceId, transition: Transition) -> Transition {
        if matches!(transition, Transition::Discovered | Transition::Reconnected) {
            self.persist().await;
            let registry = Arc::clone(&self.registry);
            runtime::spawn(async move {
                if registry.upgrade_capabilities(&id).await {
                    persist(&registry).await;
                }
            })
            .detach();
        }
        transition
    }

    async fn query(&self, id: &DeviceId, characteristic: Characteristic) -> Result<FieldValue> {
        let field = characteristic
            .field()
            .ok_or_else(|| Error::invalid_value(&characteristic.to_string(), "no field"))?;
        let value = self.registry.query(id, field).await?;
        debug!("{id} - Get {characteristic}: {value:?}");
        Ok(value)
    }

    async fn probe(&self, id: &DeviceId, handle: &T::Handle) -> Option<StateReport> {
        let timeout = self.config().message_handler_timeout;
        match runtime::timeout(timeout, self.transport.get_state(handle)).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                warn!("{id}: state probe failed: {e}");
                None
            }
            Err(e) => {
                warn!("{id}: state probe failed: {e}");
                None
            }
        }
    }
}

async fn save_cache<T: Transport, A: AccessoryHost>(registry: &Registry<T, A>) -> Result<()> {
    let Some(path) = &registry.config().cache_path else {
        return Ok(());
    };
    registry.cache().await.save(path)
}

async fn persist<T: Transport, A: AccessoryHost>(registry: &Registry<T, A>) {
    if let Err(e) = save_cache(registry).await {
        warn!("Failed to save device cache: {e}");
    }
}

/// A characteristic number as an integer, rounded.
fn number(value: &CharacteristicValue, target: &str) -> Result<u16> {
    let n = value
        .as_f64()
        .ok_or_else(|| Error::invalid_value(target, "expected a number"))?;
    if !n.is_finite() || n < 0.0 || n > f64::from(u16::MAX) {
        return Err(Error::invalid_value(target, "out of range"));
    }
    Ok(n.round() as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use crate::capabilities::Capabilities;
    use crate::state::LightState;
    use crate::testing::{MockHandle, MockTransport, RecordingHost};
    use crate::types::Hsbk;

    type TestPlatform = Platform<MockTransport, RecordingHost>;

    fn setup(config: PlatformConfig) -> (Arc<MockTransport>, Arc<RecordingHost>, TestPlatform) {
        let state = LightState::new(PowerMode::Off, Hsbk::create(0, 0, 50, 2500).unwrap());
        let transport = Arc::new(MockTransport::new(state));
        let host = Arc::new(RecordingHost::default());
        let platform = Platform::new(Arc::clone(&transport), Arc::clone(&host), config);
        (transport, host, platform)
    }

    fn new_event(transport: &MockTransport, id: &str) -> DiscoveryEvent<MockHandle> {
        DiscoveryEvent::New {
            id: id.into(),
            address: None,
            handle: transport.handle(),
        }
    }

    /// Wait for the background capability lookup after a discovery.
    async fn resolved(platform: &TestPlatform, id: &str) {
        let id = DeviceId::from(id);
        while platform
            .registry()
            .snapshot(&id)
            .await
            .is_some_and(|s| s.capabilities.is_none())
        {
            tokio::task::yield_now().await;
        }
    }

    fn temp_cache(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "lifx-lan-bridge-{name}-{}.json",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn test_ignored_device_never_registers() {
        let mut config = PlatformConfig::default();
        config.ignored_devices.insert("d1".into());
        let (transport, host, platform) = setup(config);

        assert_eq!(platform.handle_event(new_event(&transport, "d1")).await, None);
        assert!(platform.registry().is_empty().await);
        assert!(host.events().is_empty());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_online_first_contact_probes_state() {
        let (transport, host, platform) = setup(PlatformConfig::default());
        transport.bulb.lock().unwrap().label = Some("Porch".to_string());

        let event = DiscoveryEvent::Online {
            id: "d1".into(),
            address: None,
            handle: transport.handle(),
        };
        assert_eq!(
            platform.handle_event(event).await,
            Some(Transition::Discovered)
        );
        assert_eq!(transport.count("get_state"), 1);
        assert_eq!(host.registrations(&"d1".into())[0].display_name, "Porch");
    }

    #[tokio::test]
    async fn test_run_applies_events_in_order() {
        let (transport, _host, platform) = setup(PlatformConfig::default());
        let events = vec![
            new_event(&transport, "d1"),
            DiscoveryEvent::Offline { id: "d1".into() },
            DiscoveryEvent::Online {
                id: "d1".into(),
                address: None,
                handle: transport.handle(),
            },
            new_event(&transport, "d2"),
            DiscoveryEvent::Offline { id: "d2".into() },
        ];

        assert_eq!(platform.run(stream::iter(events)).await, 5);
        let registry = platform.registry();
        assert_eq!(registry.ids().await, vec!["d1".into(), "d2".into()]);
        assert_eq!(registry.is_reachable(&"d1".into()).await, Some(true));
        assert_eq!(registry.is_reachable(&"d2".into()).await, Some(false));
        assert_eq!(
            registry.journal().await.for_device(&"d1".into()),
            vec![
                Transition::Discovered,
                Transition::Offline,
                Transition::Reconnected
            ]
        );
    }

    #[tokio::test]
    async fn test_spawned_pump() {
        let (transport, _host, platform) = setup(PlatformConfig::default());
        let platform = Arc::new(platform);
        let events = stream::iter(vec![new_event(&transport, "d1")]);

        assert_eq!(Arc::clone(&platform).spawn(events).await, 1);
        assert_eq!(platform.registry().len().await, 1);
    }

    #[tokio::test]
    async fn test_silent_bulb_does_not_stall_discovery() {
        let (transport, host, platform) = setup(PlatformConfig::default());
        transport.hold_hardware.store(true, Ordering::SeqCst);
        let events = stream::iter(vec![new_event(&transport, "d1"), new_event(&transport, "d2")]);

        let seen = tokio::time::timeout(Duration::from_secs(1), platform.run(events)).await;
        assert_eq!(seen.ok(), Some(2));
        for id in ["d1", "d2"] {
            let id = DeviceId::from(id);
            let registered = host.registrations(&id);
            assert_eq!(registered.len(), 1);
            assert_eq!(registered[0].capabilities, Capabilities::default());
            assert!(host.bound(&id).is_some());
            assert_eq!(platform.registry().is_reachable(&id).await, Some(true));
        }
    }

    #[tokio::test]
    async fn test_characteristic_reads() {
        let (transport, _host, platform) = setup(PlatformConfig::default());
        platform.handle_event(new_event(&transport, "d1")).await;
        let id = DeviceId::from("d1");

        assert_eq!(
            platform.get(&id, Characteristic::On).await.unwrap(),
            CharacteristicValue::Bool(false)
        );
        assert_eq!(
            platform.get(&id, Characteristic::Brightness).await.unwrap(),
            CharacteristicValue::Number(50.0)
        );
        assert_eq!(
            platform
                .get(&id, Characteristic::ColorTemperature)
                .await
                .unwrap(),
            CharacteristicValue::Number(400.0)
        );

        *transport.lux.lock().unwrap() = Some(0.0);
        assert_eq!(
            platform
                .get(&id, Characteristic::AmbientLightLevel)
                .await
                .unwrap(),
            CharacteristicValue::Number(f64::from(0.0001f32))
        );
    }

    #[tokio::test]
    async fn test_characteristic_writes() {
        let (transport, _host, platform) = setup(PlatformConfig::default());
        platform.handle_event(new_event(&transport, "d1")).await;
        let id = DeviceId::from("d1");

        let dispatch = platform
            .set(&id, Characteristic::ColorTemperature, CharacteristicValue::Number(250.0))
            .await
            .unwrap();
        assert!(dispatch.was_sent());
        assert_eq!(
            platform.get(&id, Characteristic::Kelvin).await.unwrap(),
            CharacteristicValue::Number(4000.0)
        );

        platform
            .set(&id, Characteristic::Hue, CharacteristicValue::Number(119.6))
            .await
            .unwrap();
        assert_eq!(
            platform.get(&id, Characteristic::Hue).await.unwrap(),
            CharacteristicValue::Number(120.0)
        );

        platform
            .set(&id, Characteristic::On, CharacteristicValue::Bool(true))
            .await
            .unwrap();
        assert_eq!(transport.count("set_power"), 1);
    }

    #[tokio::test]
    async fn test_invalid_writes_are_rejected() {
        let (transport, _host, platform) = setup(PlatformConfig::default());
        platform.handle_event(new_event(&transport, "d1")).await;
        resolved(&platform, "d1").await;
        transport.clear_calls();
        let id = DeviceId::from("d1");

        let cases = [
            (Characteristic::Brightness, CharacteristicValue::Number(150.0)),
            (Characteristic::Brightness, CharacteristicValue::Number(0.0)),
            (Characteristic::Hue, CharacteristicValue::Number(400.0)),
            (Characteristic::Saturation, CharacteristicValue::Number(-3.0)),
            (Characteristic::Kelvin, CharacteristicValue::Bool(true)),
            (Characteristic::AmbientLightLevel, CharacteristicValue::Number(5.0)),
        ];
        for (characteristic, value) in cases {
            assert!(matches!(
                platform.set(&id, characteristic, value).await,
                Err(Error::InvalidValue { .. })
            ));
        }
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cache_survives_restart() {
        let path = temp_cache("restart");
        let _ = std::fs::remove_file(&path);
        let config = PlatformConfig {
            cache_path: Some(path.clone()),
            ..PlatformConfig::default()
        };

        let (transport, _host, platform) = setup(config.clone());
        platform.handle_event(new_event(&transport, "d1")).await;
        assert!(path.exists());
        // Capabilities are written once the background lookup finishes.
        let id = DeviceId::from("d1");
        while DeviceCache::load(&path)
            .ok()
            .and_then(|cache| cache.get(&id).and_then(|d| d.capabilities))
            .is_none()
        {
            tokio::task::yield_now().await;
        }

        let (transport, host, platform) = setup(config);
        assert_eq!(platform.load_cache().await.unwrap(), 1);
        assert_eq!(platform.registry().is_reachable(&id).await, Some(false));
        assert_eq!(
            platform.get(&id, Characteristic::On).await.unwrap(),
            CharacteristicValue::Bool(false)
        );

        assert_eq!(
            platform.handle_event(new_event(&transport, "d1")).await,
            Some(Transition::Reconnected)
        );
        assert!(host.registrations(&id).is_empty());

        platform.remove(&id).await.unwrap();
        assert!(DeviceCache::load(&path).unwrap().is_empty());
        let _ = std::fs::remove_file(&path);
    }
}
