use std::sync::mpsc;
use std::time::{Duration, Instant};

use servo_dance::{
    controller::ServoController,
    playback::{CancelToken, Interpreter, Outcome, State},
    program::SequenceProgram,
    proto::{encode_move, Packet},
    studio::Studio,
    transport::MemorySink,
    Error,
};

fn dance() -> SequenceProgram {
    let mut prog = SequenceProgram::new();
    prog.append_move(1, 120, 500);
    prog.append_delay(200);
    prog.append_move(2, 60, 300);
    prog
}

#[test]
fn delay_separates_dispatches() {
    let sink = MemorySink::new();
    let mut ctrl = ServoController::new(sink.clone());

    let report = Interpreter::new()
        .play(&dance(), &mut ctrl)
        .expect("play");
    assert_eq!(report.outcome, Outcome::Completed);
    assert_eq!(report.dispatched, 2);

    let sent = sink.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].bytes, encode_move(1, 120, 500).into_vec());
    assert_eq!(sent[1].bytes, encode_move(2, 60, 300).into_vec());
    assert!(sent[1].at.duration_since(sent[0].at) >= Duration::from_millis(200));

    for s in &sent {
        Packet::try_from(s.bytes.as_slice()).expect("well formed frame");
    }
}

#[test]
fn text_round_trip_replays_identically() {
    let text = dance().serialize();
    let sink = MemorySink::new();
    let mut ctrl = ServoController::new(sink.clone());

    Interpreter::new()
        .play(&SequenceProgram::parse(&text), &mut ctrl)
        .expect("play");
    assert_eq!(
        sink.frames(),
        vec![
            encode_move(1, 120, 500).into_vec(),
            encode_move(2, 60, 300).into_vec()
        ]
    );
}

#[test]
fn out_of_range_angle_replays_truncated() {
    let sink = MemorySink::new();
    let mut ctrl = ServoController::new(sink.clone());
    let prog = SequenceProgram::parse("Servo_Do(5, 999, 100);  //01");

    let report = Interpreter::new().play(&prog, &mut ctrl).expect("play");
    assert_eq!(report.dispatched, 1);
    assert_eq!(sink.frames(), vec![encode_move(5, 999, 100).into_vec()]);
}

#[test]
fn background_playback_cancels_during_delay() {
    let sink = MemorySink::new();
    let mut studio = Studio::new(ServoController::new(sink.clone()));
    studio.append_move(1, 10, 10).expect("idle");
    studio.append_delay(60_000).expect("idle");
    studio.append_move(2, 20, 20).expect("idle");

    let (tx, rx) = mpsc::channel();
    studio
        .play(move |p| {
            let _ = tx.send(p.index);
        })
        .expect("start");
    assert!(studio.is_playing());

    // wait until the delay line is reached
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(0));
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(1));

    assert!(matches!(studio.append_delay(1), Err(Error::Busy)));
    assert!(matches!(studio.delete(0), Err(Error::Busy)));
    assert!(matches!(studio.clear(), Err(Error::Busy)));
    assert!(matches!(
        studio.play_blocking(&CancelToken::never()),
        Err(Error::Busy)
    ));

    let start = Instant::now();
    let report = studio.stop().expect("stop").expect("was playing");
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(report.outcome, Outcome::Cancelled);
    assert_eq!(report.dispatched, 1);
    assert_eq!(sink.frames().len(), 1);

    assert!(!studio.is_playing());
    studio.append_delay(1).expect("editable again");
    assert_eq!(studio.program().len(), 4);
}

#[test]
fn background_playback_runs_to_completion() {
    let sink = MemorySink::new();
    let mut studio =
        Studio::new(ServoController::new(sink.clone())).with_program(dance());

    studio.play(|_| {}).expect("start");
    let report = studio.wait().expect("join").expect("was playing");
    assert_eq!(report.outcome, Outcome::Completed);
    assert!(report.elapsed >= Duration::from_millis(200));
    assert_eq!(sink.frames().len(), 2);

    // a finished playback does not block the next one
    studio.play(|_| {}).expect("restart");
    studio.wait().expect("join");
    assert_eq!(sink.frames().len(), 4);
}

#[test]
fn state_returns_to_idle() {
    let interp = Interpreter::new();
    let mut ctrl = ServoController::new(MemorySink::new());
    assert_eq!(interp.state(), State::Idle);
    interp.play(&dance(), &mut ctrl).expect("play");
    assert_eq!(interp.state(), State::Idle);
}
