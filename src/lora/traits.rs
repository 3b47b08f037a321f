//! Wide-area radio stack interface
//!
//! The network stack (join procedure, sessions, channel plan, retries and
//! regulatory duty cycle) lives behind this trait. The lifecycle controller
//! only sequences calls into it, so a mock can stand in for testing.

use core::future::Future;

/// Errors that can occur during radio stack operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Stack used before `initialize`
    NotInitialised,
    /// Network did not accept the join
    JoinFailed,
    /// Uplink could not be sent
    TransmitFailed,
    /// Payload does not fit in one uplink
    PayloadTooLarge,
    /// Radio busy timeout
    BusyTimeout,
    /// SPI communication error
    SpiError,
    /// Operation timed out
    Timeout,
}

impl core::fmt::Display for RadioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RadioError::NotInitialised => write!(f, "radio not initialised"),
            RadioError::JoinFailed => write!(f, "join failed"),
            RadioError::TransmitFailed => write!(f, "transmit failed"),
            RadioError::PayloadTooLarge => write!(f, "payload too large"),
            RadioError::BusyTimeout => write!(f, "radio busy timeout"),
            RadioError::SpiError => write!(f, "SPI error"),
            RadioError::Timeout => write!(f, "timeout"),
        }
    }
}

/// LoRaWAN device class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Receive windows only after uplinks
    A,
    /// Scheduled receive slots
    B,
    /// Continuous receive
    C,
}

/// Regional channel plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Eu868,
    Us915,
    As923,
}

/// Why [`LorawanStack::sleep`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The interval set by `schedule_next_cycle` has elapsed
    CycleElapsed,
    /// Woken for another reason; the cycle is still pending
    Interrupted,
}

/// Abstract radio stack interface for testability
///
/// Each call returns once the stack has done what it will do for that call;
/// its internal scheduling is opaque to the caller.
pub trait LorawanStack {
    /// One-time radio and region setup
    fn initialize(
        &mut self,
        class: DeviceClass,
        region: Region,
    ) -> impl Future<Output = Result<(), RadioError>>;

    /// Attempt to join the network
    ///
    /// Called again on every pass until it succeeds; backoff is the stack's
    /// concern.
    fn join(&mut self) -> impl Future<Output = Result<(), RadioError>>;

    /// Queue an uplink on the given application port
    fn send(
        &mut self,
        payload: &[u8],
        port: u8,
        confirmed: bool,
    ) -> impl Future<Output = Result<(), RadioError>>;

    /// Arm the wake timer for the next cycle
    fn schedule_next_cycle(&mut self, interval_ms: u32) -> impl Future<Output = Result<(), RadioError>>;

    /// Enter low power until woken
    fn sleep(&mut self) -> impl Future<Output = Wake>;
}

#[cfg(test)]
pub mod mock {
    //! Mock radio stack for testing

    use super::*;
    use crate::telemetry::PAYLOAD_LEN;
    use core::cell::RefCell;
    use heapless::Vec;

    /// Operations in the order they were invoked
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Call {
        Initialize,
        Join,
        Send,
        Schedule(u32),
        Sleep,
    }

    /// A recorded uplink
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentUplink {
        pub payload: Vec<u8, PAYLOAD_LEN>,
        pub port: u8,
        pub confirmed: bool,
    }

    /// Mock radio stack for unit testing
    pub struct MockLorawanStack {
        /// Every call, oldest first
        calls: RefCell<Vec<Call, 32>>,
        /// Record of sent uplinks
        tx_history: RefCell<Vec<SentUplink, 8>>,
        /// Parameters passed to initialize
        setup: RefCell<Option<(DeviceClass, Region)>>,
        /// Join attempts to reject before accepting
        join_failures: RefCell<u8>,
        /// Error to return on next send
        next_tx_error: RefCell<Option<RadioError>>,
        /// Sleeps to end with `Interrupted` before the cycle elapses
        interrupted_sleeps: RefCell<u8>,
    }

    impl MockLorawanStack {
        /// Create a new mock that joins and sends immediately
        pub fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                tx_history: RefCell::new(Vec::new()),
                setup: RefCell::new(None),
                join_failures: RefCell::new(0),
                next_tx_error: RefCell::new(None),
                interrupted_sleeps: RefCell::new(0),
            }
        }

        /// Reject the next `count` join attempts
        pub fn fail_joins(&self, count: u8) {
            *self.join_failures.borrow_mut() = count;
        }

        /// Set an error to be returned by the next send() call
        pub fn set_next_tx_error(&self, error: RadioError) {
            *self.next_tx_error.borrow_mut() = Some(error);
        }

        /// Wake early `count` times before the cycle elapses
        pub fn interrupt_sleeps(&self, count: u8) {
            *self.interrupted_sleeps.borrow_mut() = count;
        }

        pub fn calls(&self) -> Vec<Call, 32> {
            self.calls.borrow().clone()
        }

        /// Get all sent uplinks
        pub fn get_tx_history(&self) -> Vec<SentUplink, 8> {
            self.tx_history.borrow().clone()
        }

        pub fn get_setup(&self) -> Option<(DeviceClass, Region)> {
            *self.setup.borrow()
        }

        fn record(&self, call: Call) {
            let _ = self.calls.borrow_mut().push(call);
        }
    }

    impl Default for MockLorawanStack {
        fn default() -> Self {
            Self::new()
        }
    }

    impl LorawanStack for MockLorawanStack {
        async fn initialize(&mut self, class: DeviceClass, region: Region) -> Result<(), RadioError> {
            self.record(Call::Initialize);
            *self.setup.borrow_mut() = Some((class, region));
            Ok(())
        }

        async fn join(&mut self) -> Result<(), RadioError> {
            self.record(Call::Join);
            if self.setup.borrow().is_none() {
                return Err(RadioError::NotInitialised);
            }

            let mut failures = self.join_failures.borrow_mut();
            if *failures > 0 {
                *failures -= 1;
                return Err(RadioError::JoinFailed);
            }
            Ok(())
        }

        async fn send(&mut self, payload: &[u8], port: u8, confirmed: bool) -> Result<(), RadioError> {
            self.record(Call::Send);
            if let Some(error) = self.next_tx_error.borrow_mut().take() {
                return Err(error);
            }

            let mut data = Vec::new();
            data.extend_from_slice(payload)
                .map_err(|_| RadioError::PayloadTooLarge)?;
            let _ = self.tx_history.borrow_mut().push(SentUplink {
                payload: data,
                port,
                confirmed,
            });
            Ok(())
        }

        async fn schedule_next_cycle(&mut self, interval_ms: u32) -> Result<(), RadioError> {
            self.record(Call::Schedule(interval_ms));
            Ok(())
        }

        async fn sleep(&mut self) -> Wake {
            self.record(Call::Sleep);
            let mut interrupted = self.interrupted_sleeps.borrow_mut();
            if *interrupted > 0 {
                *interrupted -= 1;
                return Wake::Interrupted;
            }
            Wake::CycleElapsed
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_mock_join_requires_initialize() {
            let mut radio = MockLorawanStack::new();

            futures::executor::block_on(async {
                assert_eq!(radio.join().await, Err(RadioError::NotInitialised));

                radio.initialize(DeviceClass::A, Region::Eu868).await.unwrap();
                radio.join().await.unwrap();
            });
        }

        #[test]
        fn test_mock_join_failures() {
            let mut radio = MockLorawanStack::new();
            radio.fail_joins(2);

            futures::executor::block_on(async {
                radio.initialize(DeviceClass::A, Region::Eu868).await.unwrap();

                assert_eq!(radio.join().await, Err(RadioError::JoinFailed));
                assert_eq!(radio.join().await, Err(RadioError::JoinFailed));
                assert_eq!(radio.join().await, Ok(()));
            });
        }

        #[test]
        fn test_mock_send_records_uplink() {
            let mut radio = MockLorawanStack::new();

            futures::executor::block_on(async {
                radio.send(&[0x01, 0x02], 2, false).await.unwrap();

                let history = radio.get_tx_history();
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].payload.as_slice(), &[0x01, 0x02]);
                assert_eq!(history[0].port, 2);
                assert!(!history[0].confirmed);
            });
        }

        #[test]
        fn test_mock_tx_error() {
            let mut radio = MockLorawanStack::new();

            futures::executor::block_on(async {
                radio.set_next_tx_error(RadioError::TransmitFailed);

                let result = radio.send(&[0x01], 2, false).await;
                assert_eq!(result, Err(RadioError::TransmitFailed));

                // Error should be cleared, next call should succeed
                radio.send(&[0x02], 2, false).await.unwrap();
                assert_eq!(radio.get_tx_history().len(), 1);
            });
        }

        #[test]
        fn test_mock_interrupted_sleep() {
            let mut radio = MockLorawanStack::new();
            radio.interrupt_sleeps(1);

            futures::executor::block_on(async {
                assert_eq!(radio.sleep().await, Wake::Interrupted);
                assert_eq!(radio.sleep().await, Wake::CycleElapsed);
            });
        }
    }
}
