//! In-memory transport and host used by the unit tests.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::accessory::{AccessoryHost, AccessoryInfo, Characteristic};
use crate::capabilities::HardwareInfo;
use crate::registry::DeviceId;
use crate::state::{LightState, StateReport};
use crate::transport::Transport;
use crate::types::{Hsbk, PowerMode};

/// Connection number; every online signal in a test gets a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockHandle(pub u32);

/// One simulated bulb shared by every handle.
pub struct MockTransport {
    pub bulb: Mutex<StateReport>,
    pub hardware: Mutex<Option<HardwareInfo>>,
    pub lux: Mutex<Option<f32>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub hold_writes: AtomicBool,
    pub hold_reads: AtomicBool,
    /// Hardware info requests never answer while set.
    pub hold_hardware: AtomicBool,
    release: Notify,
    release_read: Notify,
    calls: Mutex<Vec<String>>,
    next_handle: AtomicU32,
}

impl MockTransport {
    pub fn new(state: LightState) -> Self {
        MockTransport {
            bulb: Mutex::new(StateReport::from(state)),
            hardware: Mutex::new(Some(HardwareInfo::from_names("LIFX", "LIFX Color 1000"))),
            lux: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            hold_writes: AtomicBool::new(false),
            hold_reads: AtomicBool::new(false),
            hold_hardware: AtomicBool::new(false),
            release: Notify::new(),
            release_read: Notify::new(),
            calls: Mutex::new(Vec::new()),
            next_handle: AtomicU32::new(1),
        }
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    pub fn set_hardware(&self, info: Option<HardwareInfo>) {
        *self.hardware.lock().unwrap() = info;
    }

    pub fn set_bulb(&self, state: LightState) {
        self.bulb.lock().unwrap().state = state;
    }

    /// Let one held write complete.
    pub fn release(&self) {
        self.release.notify_one();
    }

    /// Let one held state read return what it saw when it was sent.
    pub fn release_read(&self) {
        self.release_read.notify_one();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn write(&self, call: String) -> io::Result<()> {
        self.record(call);
        if self.hold_writes.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no ack"));
        }
        Ok(())
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    async fn get_state(&self, handle: &MockHandle) -> io::Result<StateReport> {
        self.record(format!("get_state#{}", handle.0));
        let report = self.bulb.lock().unwrap().clone();
        if self.hold_reads.load(Ordering::SeqCst) {
            self.release_read.notified().await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no answer"));
        }
        Ok(report)
    }

    async fn get_hardware_info(&self, handle: &MockHandle) -> io::Result<HardwareInfo> {
        self.record(format!("get_hardware_info#{}", handle.0));
        if self.hold_hardware.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        self.hardware
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "no answer"))
    }

    async fn get_ambient_light(&self, handle: &MockHandle) -> io::Result<f32> {
        self.record(format!("get_ambient_light#{}", handle.0));
        self.lux
            .lock()
            .unwrap()
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "no answer"))
    }

    async fn set_power(
        &self,
        handle: &MockHandle,
        power: PowerMode,
        fade: Duration,
    ) -> io::Result<()> {
        self.write(format!("set_power#{} {:?} {}ms", handle.0, power, fade.as_millis()))
            .await?;
        let mut bulb = self.bulb.lock().unwrap();
        bulb.state = LightState::new(power, *bulb.state.color());
        Ok(())
    }

    async fn set_color(&self, handle: &MockHandle, color: &Hsbk, fade: Duration) -> io::Result<()> {
        self.write(format!(
            "set_color#{} {} {} {} {} {}ms",
            handle.0,
            color.hue.degrees(),
            color.saturation.value(),
            color.brightness.value(),
            color.kelvin.kelvin(),
            fade.as_millis()
        ))
        .await?;
        let mut bulb = self.bulb.lock().unwrap();
        bulb.state = LightState::new(bulb.state.power(), *color);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Registered(AccessoryInfo),
    Unregistered(DeviceId),
    Bound(DeviceId, Vec<Characteristic>, LightState),
    Unbound(DeviceId),
}

/// Accessory host that records every call.
#[derive(Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn registrations(&self, id: &DeviceId) -> Vec<AccessoryInfo> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Registered(info) if &info.id == id => Some(info),
                _ => None,
            })
            .collect()
    }

    /// Characteristics of the most recent binding, if the latest call for the
    /// device was a bind.
    pub fn bound(&self, id: &DeviceId) -> Option<Vec<Characteristic>> {
        self.events().into_iter().rev().find_map(|e| match e {
            HostEvent::Bound(bound, chars, _) if &bound == id => Some(Some(chars)),
            HostEvent::Unbound(unbound) if &unbound == id => Some(None),
            _ => None,
        })?
    }
}

impl AccessoryHost for RecordingHost {
    fn register_accessory(&self, info: &AccessoryInfo) {
        self.events
            .lock()
            .unwrap()
            .push(HostEvent::Registered(info.clone()));
    }

    fn unregister_accessory(&self, id: &DeviceId) {
        self.events
            .lock()
            .unwrap()
            .push(HostEvent::Unregistered(id.clone()));
    }

    fn bind(&self, id: &DeviceId, characteristics: &[Characteristic], state: &LightState) {
        self.events.lock().unwrap().push(HostEvent::Bound(
            id.clone(),
            characteristics.to_vec(),
            *state,
        ));
    }

    fn unbind(&self, id: &DeviceId) {
        self.events
            .lock()
            .unwrap()
            .push(HostEvent::Unbound(id.clone()));
    }
}
