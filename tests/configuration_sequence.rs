//! Construction order and fail-fast behavior, checked against a strict mock handle.

use mockall::{mock, predicate::*, Sequence};
use rs232_session::{
    AcquireOptions, ConfigStep, LineState, Parity, PortBackend, PortError, PortHandle, Session,
    SessionError, SessionOptions, Status, Timeouts,
};

mock! {
    pub Port {}

    impl PortHandle for Port {
        fn get_line_state(&mut self) -> Result<LineState, PortError>;
        fn set_line_state(&mut self, state: &LineState) -> Result<(), PortError>;
        fn set_timeouts(&mut self, timeouts: &Timeouts) -> Result<(), PortError>;
        fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;
        fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;
        fn release(&mut self) -> Result<(), PortError>;
        fn name(&self) -> &str;
    }
}

impl std::fmt::Debug for MockPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MockPort")
    }
}

/// Hands out one prepared handle.
struct PreparedBackend(Option<MockPort>);

impl PortBackend for PreparedBackend {
    type Handle = MockPort;

    fn acquire(
        &mut self,
        address: &str,
        _options: &AcquireOptions,
    ) -> Result<MockPort, PortError> {
        self.0.take().ok_or_else(|| PortError::not_found(address))
    }
}

fn open(port: MockPort, options: &SessionOptions) -> Result<Session, SessionError> {
    Session::open_with(PreparedBackend(Some(port)), "MOCK0", options)
}

#[test]
fn test_open_runs_steps_in_order() {
    let mut seq = Sequence::new();
    let mut port = MockPort::new();
    let requested = LineState {
        baud_rate: 19200,
        parity: Parity::Odd,
        ..LineState::default()
    };

    port.expect_get_line_state()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(LineState::default()));
    port.expect_set_line_state()
        .with(eq(requested))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    port.expect_set_timeouts()
        .with(eq(Timeouts::default()))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    port.expect_release()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));

    let options = SessionOptions::new().baud_rate(19200).parity(Parity::Odd);
    let mut session = open(port, &options).unwrap();
    session.close().unwrap();
}

#[test]
fn test_failed_line_state_aborts_and_releases() {
    let mut port = MockPort::new();
    port.expect_get_line_state()
        .times(1)
        .returning(|| Ok(LineState::default()));
    port.expect_set_line_state()
        .times(1)
        .returning(|_| Err(PortError::Status(Status::INVALID_PARAMETER)));
    port.expect_set_timeouts().never();
    port.expect_release().times(1).returning(|| Ok(()));

    let err = open(port, &SessionOptions::default()).unwrap_err();
    match err {
        SessionError::Configuration { step, .. } => assert_eq!(step, ConfigStep::SetLineState),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn test_failed_line_state_read_skips_everything_else() {
    let mut port = MockPort::new();
    port.expect_get_line_state()
        .times(1)
        .returning(|| Err(PortError::Status(Status::GEN_FAILURE)));
    port.expect_set_line_state().never();
    port.expect_set_timeouts().never();
    port.expect_release().times(1).returning(|| Ok(()));

    let err = open(port, &SessionOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Configuration {
            step: ConfigStep::GetLineState,
            ..
        }
    ));
    assert_eq!(err.status(), Status::GEN_FAILURE);
}

#[test]
fn test_invalid_options_never_touch_the_port() {
    let mut port = MockPort::new();
    port.expect_get_line_state().never();
    port.expect_release().never();

    let err = open(port, &SessionOptions::new().byte_size(9)).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Configuration {
            step: ConfigStep::Options,
            ..
        }
    ));
}

#[test]
fn test_read_is_offered_whole_buffer_and_sliced_by_count() {
    let mut port = MockPort::new();
    port.expect_get_line_state()
        .returning(|| Ok(LineState::default()));
    port.expect_set_line_state().returning(|_| Ok(()));
    port.expect_set_timeouts().returning(|_| Ok(()));
    port.expect_read_bytes()
        .times(1)
        .returning(|buffer: &mut [u8]| {
            assert_eq!(buffer.len(), 128);
            buffer[..4].copy_from_slice(b"OK\r\n");
            Ok(4)
        });
    port.expect_release().times(1).returning(|| Ok(()));

    let mut session = open(port, &SessionOptions::default()).unwrap();
    assert_eq!(session.read().unwrap(), b"OK\r\n");
}

#[test]
fn test_release_failure_still_closes() {
    let mut port = MockPort::new();
    port.expect_get_line_state()
        .returning(|| Ok(LineState::default()));
    port.expect_set_line_state().returning(|_| Ok(()));
    port.expect_set_timeouts().returning(|_| Ok(()));
    port.expect_release()
        .times(1)
        .returning(|| Err(PortError::Status(Status::INVALID_HANDLE)));

    let mut session = open(port, &SessionOptions::default()).unwrap();
    assert!(matches!(session.close(), Err(SessionError::Close(_))));
    assert!(!session.is_open());
    assert_eq!(session.last_status(), Status::INVALID_HANDLE);
}
