//! Device lifecycle state machine
//!
//! Drives the node through join, measure-and-send, schedule and sleep. One
//! state is handled per [`LifecycleController::step`]; the firmware calls it
//! in a loop for the life of the device.
//!
//! ```text
//! Init -> Join -> Send -> Cycle -> Sleep
//!          ^__|    ^                 |
//!                  |_________________|  (cycle elapsed)
//! ```

use crate::config::uplink;
use crate::lora::traits::{DeviceClass, LorawanStack, Region, Wake};
use crate::scheduler::DutyCycleScheduler;
use crate::sensors::TelemetrySource;
use crate::telemetry::Payload;
use rand::RngCore;

/// Lifecycle states
///
/// The discriminants are stable so the state can be kept in memory that
/// survives a reset.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Radio parameter setup
    Init = 0,
    /// Waiting for the network join to succeed
    Join = 1,
    /// Measure and transmit
    Send = 2,
    /// Schedule the next wake
    Cycle = 3,
    /// Low power until the cycle elapses
    Sleep = 4,
}

impl DeviceState {
    /// Decode a persisted state; anything unrecognised restarts from Init
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Init,
            1 => Self::Join,
            2 => Self::Send,
            3 => Self::Cycle,
            4 => Self::Sleep,
            _ => Self::Init,
        }
    }

    pub fn as_raw(self) -> u8 {
        self as u8
    }
}

impl From<u8> for DeviceState {
    fn from(raw: u8) -> Self {
        Self::from_raw(raw)
    }
}

/// Radio and uplink parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UplinkConfig {
    pub class: DeviceClass,
    pub region: Region,
    /// Application port for every uplink
    pub port: u8,
    /// Request network acknowledgement
    pub confirmed: bool,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            class: DeviceClass::A,
            region: Region::Eu868,
            port: uplink::APP_PORT,
            confirmed: uplink::CONFIRMED,
        }
    }
}

/// Owns the device state and sequences every other component
pub struct LifecycleController<L, T, R>
where
    L: LorawanStack,
    T: TelemetrySource,
    R: RngCore,
{
    state: DeviceState,
    radio: L,
    telemetry: T,
    scheduler: DutyCycleScheduler<R>,
    uplink: UplinkConfig,
}

impl<L, T, R> LifecycleController<L, T, R>
where
    L: LorawanStack,
    T: TelemetrySource,
    R: RngCore,
{
    /// Create a controller in the Init state
    pub fn new(radio: L, telemetry: T, scheduler: DutyCycleScheduler<R>, uplink: UplinkConfig) -> Self {
        Self {
            state: DeviceState::Init,
            radio,
            telemetry,
            scheduler,
            uplink,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn radio(&self) -> &L {
        &self.radio
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    /// Resume from a persisted raw state
    pub fn restore(&mut self, raw: u8) {
        let state = DeviceState::from_raw(raw);
        if state.as_raw() != raw {
            log::warn!("Unknown device state {}, restarting from Init", raw);
        }
        self.state = state;
    }

    /// Handle the current state once and move to its successor
    pub async fn step(&mut self) -> DeviceState {
        let next = match self.state {
            DeviceState::Init => self.initialize().await,
            DeviceState::Join => self.join().await,
            DeviceState::Send => self.send().await,
            DeviceState::Cycle => self.cycle().await,
            DeviceState::Sleep => self.sleep().await,
        };

        if next != self.state {
            log::debug!("State {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        next
    }

    /// Run the lifecycle forever
    pub async fn run(&mut self) -> ! {
        loop {
            self.step().await;
        }
    }

    async fn initialize(&mut self) -> DeviceState {
        let duty = self.scheduler.config();
        log::info!(
            "Class {:?}, region {:?}, port {}, {} uplinks, every {} ms (+ up to {} ms)",
            self.uplink.class,
            self.uplink.region,
            self.uplink.port,
            if self.uplink.confirmed { "confirmed" } else { "unconfirmed" },
            duty.base_interval_ms,
            duty.max_jitter_ms
        );

        if let Err(e) = self.radio.initialize(self.uplink.class, self.uplink.region).await {
            log::warn!("Radio init failed: {}", e);
        }
        DeviceState::Join
    }

    async fn join(&mut self) -> DeviceState {
        match self.radio.join().await {
            Ok(()) => {
                log::info!("Joined");
                DeviceState::Send
            }
            Err(e) => {
                log::debug!("Join pending: {}", e);
                DeviceState::Join
            }
        }
    }

    async fn send(&mut self) -> DeviceState {
        let reading = self.telemetry.collect().await;
        reading.log_summary();

        let payload = Payload::encode(&reading);
        match self
            .radio
            .send(payload.as_bytes(), self.uplink.port, self.uplink.confirmed)
            .await
        {
            Ok(()) => log::debug!("Uplink queued: {:02x?}", payload.as_bytes()),
            Err(e) => log::warn!("Uplink failed: {}", e),
        }
        DeviceState::Cycle
    }

    async fn cycle(&mut self) -> DeviceState {
        let interval_ms = self.scheduler.next_interval();
        if let Err(e) = self.radio.schedule_next_cycle(interval_ms).await {
            log::warn!("Failed to schedule next cycle: {}", e);
        }
        log::info!("Next uplink in {} ms", interval_ms);
        DeviceState::Sleep
    }

    async fn sleep(&mut self) -> DeviceState {
        match self.radio.sleep().await {
            Wake::CycleElapsed => DeviceState::Send,
            Wake::Interrupted => DeviceState::Sleep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lora::traits::mock::{Call, MockLorawanStack};
    use crate::lora::traits::RadioError;
    use crate::scheduler::DutyCycleConfig;
    use crate::sensors::acquirer::mock::FixedTelemetry;
    use crate::telemetry::{BatteryStatus, EnvironmentSample, SensorReading};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    type TestController = LifecycleController<MockLorawanStack, FixedTelemetry, SmallRng>;

    fn reading() -> SensorReading {
        SensorReading {
            environment: Some(EnvironmentSample {
                temperature_centi_c: 2350,
                humidity_pct: 61,
                pressure_pa: 101_325,
            }),
            distance_cm: Some(120),
            external_mv: Some(5000),
            battery: BatteryStatus {
                voltage_mv: 4100,
                level_pct: 87,
            },
        }
    }

    fn controller(radio: MockLorawanStack) -> TestController {
        LifecycleController::new(
            radio,
            FixedTelemetry::new(reading()),
            DutyCycleScheduler::new(DutyCycleConfig::default(), SmallRng::seed_from_u64(9)),
            UplinkConfig::default(),
        )
    }

    /// Step `count` times, returning the state each step handled
    fn visit(controller: &mut TestController, count: usize) -> Vec<DeviceState> {
        futures::executor::block_on(async {
            let mut visited = Vec::new();
            for _ in 0..count {
                visited.push(controller.state());
                controller.step().await;
            }
            visited
        })
    }

    #[test]
    fn test_raw_state_roundtrip() {
        for state in [
            DeviceState::Init,
            DeviceState::Join,
            DeviceState::Send,
            DeviceState::Cycle,
            DeviceState::Sleep,
        ] {
            assert_eq!(DeviceState::from(state.as_raw()), state);
        }
        assert_eq!(DeviceState::from_raw(5), DeviceState::Init);
        assert_eq!(DeviceState::from_raw(0xFF), DeviceState::Init);
    }

    #[test]
    fn test_full_cycle_sequence() {
        let mut controller = controller(MockLorawanStack::new());

        let visited = visit(&mut controller, 6);

        assert_eq!(
            visited,
            vec![
                DeviceState::Init,
                DeviceState::Join,
                DeviceState::Send,
                DeviceState::Cycle,
                DeviceState::Sleep,
                DeviceState::Send,
            ]
        );
        assert_eq!(controller.state(), DeviceState::Cycle);
    }

    #[test]
    fn test_wake_never_reenters_init() {
        let mut controller = controller(MockLorawanStack::new());

        let visited = visit(&mut controller, 20);

        assert_eq!(visited.iter().filter(|s| **s == DeviceState::Init).count(), 1);
        assert_eq!(visited.iter().filter(|s| **s == DeviceState::Join).count(), 1);

        let calls = controller.radio().calls();
        assert_eq!(calls.iter().filter(|c| **c == Call::Initialize).count(), 1);
        assert_eq!(calls.iter().filter(|c| **c == Call::Join).count(), 1);
    }

    #[test]
    fn test_radio_call_order() {
        let mut controller = controller(MockLorawanStack::new());

        visit(&mut controller, 5);

        let calls = controller.radio().calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], Call::Initialize);
        assert_eq!(calls[1], Call::Join);
        assert_eq!(calls[2], Call::Send);
        assert!(matches!(calls[3], Call::Schedule(ms) if (180_000..=181_000).contains(&ms)));
        assert_eq!(calls[4], Call::Sleep);
        assert_eq!(
            controller.radio().get_setup(),
            Some((DeviceClass::A, Region::Eu868))
        );
    }

    #[test]
    fn test_join_retried_until_success() {
        let radio = MockLorawanStack::new();
        radio.fail_joins(3);
        let mut controller = controller(radio);

        let visited = visit(&mut controller, 6);

        assert_eq!(
            visited,
            vec![
                DeviceState::Init,
                DeviceState::Join,
                DeviceState::Join,
                DeviceState::Join,
                DeviceState::Join,
                DeviceState::Send,
            ]
        );
        assert_eq!(controller.telemetry().counter().get(), 1);
    }

    #[test]
    fn test_uplink_contents() {
        let mut controller = controller(MockLorawanStack::new());

        visit(&mut controller, 3);

        let history = controller.radio().get_tx_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].port, 2);
        assert!(!history[0].confirmed);
        assert_eq!(
            history[0].payload.as_slice(),
            Payload::encode(&reading()).as_bytes()
        );
    }

    #[test]
    fn test_send_failure_still_cycles() {
        let radio = MockLorawanStack::new();
        radio.set_next_tx_error(RadioError::TransmitFailed);
        let mut controller = controller(radio);

        let visited = visit(&mut controller, 4);

        assert_eq!(visited[3], DeviceState::Cycle);
        assert_eq!(controller.state(), DeviceState::Sleep);
        assert!(controller.radio().get_tx_history().is_empty());
    }

    #[test]
    fn test_interrupted_sleep_stays_asleep() {
        let radio = MockLorawanStack::new();
        radio.interrupt_sleeps(2);
        let mut controller = controller(radio);

        let visited = visit(&mut controller, 8);

        assert_eq!(
            &visited[4..],
            &[
                DeviceState::Sleep,
                DeviceState::Sleep,
                DeviceState::Sleep,
                DeviceState::Send,
            ]
        );
        assert_eq!(controller.telemetry().counter().get(), 2);
    }

    #[test]
    fn test_unknown_restored_state_resets_to_init() {
        let mut controller = controller(MockLorawanStack::new());
        visit(&mut controller, 5);
        assert_eq!(controller.state(), DeviceState::Send);

        controller.restore(0xA5);
        assert_eq!(controller.state(), DeviceState::Init);

        visit(&mut controller, 2);
        let calls = controller.radio().calls();
        assert_eq!(calls.iter().filter(|c| **c == Call::Initialize).count(), 2);
        assert_eq!(controller.state(), DeviceState::Send);
    }

    #[test]
    fn test_restore_sleep_resumes_cycle() {
        let mut controller = controller(MockLorawanStack::new());

        controller.restore(DeviceState::Sleep.as_raw());
        let visited = visit(&mut controller, 2);

        assert_eq!(visited, vec![DeviceState::Sleep, DeviceState::Send]);
        assert!(!controller.radio().calls().contains(&Call::Initialize));
    }
}
