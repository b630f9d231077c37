mod common;

use common::{Reply, ScriptedHandle, ScriptedLauncher, evolver, init_logging, shout, test_config};
use evolver_kernel::channel::FALLBACK_PROMPT;
use evolver_kernel::error::{DriverError, Error};
use evolver_kernel::driver::{Handshake, SessionState};
use evolver_kernel::{HandshakeState, MemorySink, PromptMode};

#[tokio::test]
async fn test_handshake_collects_banner() {
    init_logging();
    let launcher = ScriptedLauncher::new(|_| Ok(evolver(shout)));
    let sink = MemorySink::new();
    let config = test_config();

    let (mut session, report) = Handshake::new(&config, &sink)
        .run(&launcher)
        .await
        .unwrap();

    assert_eq!(report.state, HandshakeState::Ready);
    assert!(report.datafile_prompt_seen);
    assert!(!report.nudged);
    assert_eq!(report.banner, "Surface Evolver 2.70\n\n");
    assert_eq!(session.mode(), PromptMode::Main);
    assert!(session.is_alive());
    assert_eq!(
        sink.diagnostics(),
        "[EvolverKernel] Evolver launched. Main prompt ready.\n"
    );
}

#[tokio::test]
async fn test_degraded_handshake_drains_stale_prompts() {
    init_logging();
    let launcher = ScriptedLauncher::new(|_| {
        Ok(ScriptedHandle::new("banner\n", |_| {
            Reply::Output(FALLBACK_PROMPT.to_string())
        }))
    });
    let spy = launcher.spy();
    let sink = MemorySink::new();
    let config = test_config();

    let (session, report) = Handshake::new(&config, &sink)
        .run(&launcher)
        .await
        .unwrap();

    assert_eq!(report.mode, PromptMode::Fallback);
    assert!(report.nudged);
    assert_eq!(report.banner, "banner\n> > ");
    assert!(session.prompt().is_literal());
    assert_eq!(session.state(), SessionState::Alive);
    assert_eq!(spy.activity(0).sent(), vec!["", ""]);
}

#[tokio::test]
async fn test_handshake_failure_terminates_child() {
    init_logging();
    let launcher = ScriptedLauncher::new(|_| Ok(ScriptedHandle::exited("")));
    let spy = launcher.spy();
    let sink = MemorySink::new();
    let config = test_config();

    let err = Handshake::new(&config, &sink)
        .run(&launcher)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Driver(DriverError::HandshakeFailed { .. })
    ));
    assert_eq!(spy.activity(0).terminations(), 1);
}

#[tokio::test]
async fn test_spawn_failure_passes_through() {
    init_logging();
    let launcher = ScriptedLauncher::failing();
    let sink = MemorySink::new();
    let config = test_config();

    let err = Handshake::new(&config, &sink)
        .run(&launcher)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Failed to spawn 'evolver'"));
    assert!(sink.events().is_empty());
}
