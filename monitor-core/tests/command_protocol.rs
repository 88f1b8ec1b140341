use heapless::Vec;
use monitor_core::interpreter::UNKNOWN_COMMAND_REPLY;
use monitor_core::serial::ScriptedSource;
use monitor_core::{Command, CommandInterpreter, SharedState};

type Output = Vec<u8, 128>;

/// Feeds `script` through a fresh interpreter and collects every reply.
fn replay(shared: &SharedState, script: &[u8]) -> (Output, Option<Command>) {
    let mut interpreter = CommandInterpreter::new(shared);
    let mut source = ScriptedSource::new(script);
    let mut output = Output::new();
    let mut last = None;
    while let Some(command) = interpreter.poll(&mut source, &mut output) {
        last = Some(command);
    }
    (output, last)
}

#[test]
fn set_then_query_offset() {
    let shared = SharedState::new();

    let (output, last) = replay(&shared, b"o 10\nO\n");

    assert_eq!(last, Some(Command::QueryOffset));
    assert_eq!(output.as_slice(), b"T-Offset: 10\n");
    assert_eq!(shared.calibration_offset(), 10);
}

#[test]
fn unknown_command_leaves_state_untouched() {
    let shared = SharedState::with_values(false, 7);

    let (output, last) = replay(&shared, b"x\n");

    assert_eq!(last, Some(Command::Unknown(b'x')));
    assert_eq!(output.as_slice(), UNKNOWN_COMMAND_REPLY.as_bytes());
    assert!(!shared.streaming_enabled());
    assert_eq!(shared.calibration_offset(), 7);
}

#[test]
fn begin_is_idempotent() {
    let shared = SharedState::with_values(false, 0);

    let (output, _) = replay(&shared, b"b\nb\n");

    assert!(output.is_empty());
    assert!(shared.streaming_enabled());
}

#[test]
fn offset_without_argument_is_ignored() {
    let shared = SharedState::new();

    let (output, last) = replay(&shared, b"o\n");

    assert_eq!(last, Some(Command::SetOffset(None)));
    assert!(output.is_empty());
    assert_eq!(shared.calibration_offset(), -50);
}

#[test]
fn malformed_offset_becomes_zero() {
    let shared = SharedState::new();

    replay(&shared, b"o abc\n");

    assert_eq!(shared.calibration_offset(), 0);
}

#[test]
fn offset_accepts_sign_and_trailing_garbage() {
    let shared = SharedState::new();

    let (output, _) = replay(&shared, b"o -12 degrees\nO\n");

    assert_eq!(output.as_slice(), b"T-Offset: -12\n");
}

#[test]
fn stop_then_query_reports_default_offset() {
    let shared = SharedState::new();

    let (output, _) = replay(&shared, b"s\nO\n");

    assert!(!shared.streaming_enabled());
    assert_eq!(output.as_slice(), b"T-Offset: -50\n");
}

#[test]
fn nul_padding_between_bytes_is_invisible() {
    let shared = SharedState::new();

    let (output, last) = replay(&shared, b"\0o\0 \04\0\n");

    assert_eq!(last, Some(Command::SetOffset(Some(4))));
    assert!(output.is_empty());
    assert_eq!(shared.calibration_offset(), 4);
}

#[test]
fn overlong_line_is_corrupted_not_rejected() {
    let shared = SharedState::new();
    let mut interpreter = CommandInterpreter::new(&shared);
    let mut output = Output::new();

    // Twenty bytes of padding, then `x\n` overwrites the front of the buffer.
    let mut source = ScriptedSource::new(b"b234567890123456789-x\n");
    let command = interpreter.poll(&mut source, &mut output);

    assert_eq!(command, Some(Command::Unknown(b'x')));
    assert!(interpreter.last_line_wrapped());
    assert_eq!(output.as_slice(), UNKNOWN_COMMAND_REPLY.as_bytes());

    // The next cycle starts from a clean buffer.
    let command = interpreter.poll(&mut ScriptedSource::new(b"s\n"), &mut output);
    assert_eq!(command, Some(Command::Stop));
    assert!(!interpreter.last_line_wrapped());
}
