//! Integration tests for the sync client against a simulated controller.

use pixsync_client::{
    ClientState, Endpoint, HandshakeConfig, MockTransport, NoDiscovery, NullFeedback,
    RecordingFeedback, StaticDiscovery, SyncClient, DEFAULT_REMOTE_PORT,
};
use pixsync_protocol::{
    Command, CommandSet, Compression, Envelope, GuiState, Response, DEFAULT_BUFFER_SIZE,
};
use pixsync_testkit::{
    fast_config, gui_state_strategy, image_buffer_strategy, response_order_strategy,
    start_default, start_simulated, start_simulated_with_feedback, unknown_pattern_strategy,
    wait_for, ControllerFixture, SimulatedController, SETTLE_TIMEOUT,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn handshake_reaches_ready() {
    let (controller, client) = start_default();

    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);
    assert!(client.is_ready());
    assert_eq!(client.received(), CommandSet::all());

    let fixture = controller.fixture();
    assert_eq!(client.version().as_deref(), Some(&fixture.version));
    assert_eq!(client.matrix().as_deref(), Some(&fixture.matrix));
    assert_eq!(client.color_sets().as_deref(), Some(&fixture.color_sets));
    assert_eq!(client.output().as_deref(), Some(&fixture.output));
    assert_eq!(client.file_location().as_deref(), Some(&fixture.file_location));
    assert_eq!(client.nr_of_visuals(), Some(4));
    assert!(client.visual_buffer(3).is_some());
    assert!(client.visual_buffer(4).is_none());
    assert_eq!(client.compression(), Compression::Disabled);
}

#[test]
fn feedback_follows_lifecycle() {
    let controller = Arc::new(SimulatedController::new());
    let feedback = Arc::new(RecordingFeedback::new());
    let client = start_simulated_with_feedback(&controller, fast_config(), feedback.clone());
    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);

    let detect = feedback.position("Detect PixelController OSC Port").unwrap();
    let fallback = feedback
        .position(&format!("... not found, use default port {DEFAULT_REMOTE_PORT}"))
        .unwrap();
    let server = feedback.position("Start OSC Server").unwrap();
    let connected = feedback.position(" ... done").unwrap();
    let version = feedback.position("Found PixelController Version 3.0.1").unwrap();
    assert!(detect < fallback);
    assert!(fallback < server);
    assert!(server < connected);
    assert!(connected < version);

    for notice in [
        "Received Configuration",
        "Received Matrixdata",
        "Received Colorsets",
        "Received Output mapping",
    ] {
        assert!(feedback.position(notice).is_some(), "missing {notice}");
    }
    assert_eq!(
        client.endpoint(),
        Some(Endpoint::new(pixsync_client::DEFAULT_HOST, DEFAULT_REMOTE_PORT))
    );
}

#[test]
fn discovered_endpoint_is_announced() {
    let transport = MockTransport::new();
    let feedback = Arc::new(RecordingFeedback::new());
    let endpoint = Endpoint::new("192.168.1.20", 9999);
    let client = SyncClient::start(
        fast_config(),
        transport.clone(),
        StaticDiscovery::found(endpoint.clone()),
        feedback.clone(),
    )
    .unwrap();

    assert!(wait_for(SETTLE_TIMEOUT, || transport.endpoint().is_some()));
    assert_eq!(transport.endpoint(), Some(endpoint));
    assert!(feedback
        .position("... found on port 9999, ip: 192.168.1.20")
        .is_some());
    client.shutdown();
}

#[test]
fn unresponsive_controller_fails_after_five_rounds() {
    let controller = Arc::new(SimulatedController::unresponsive());
    let feedback = Arc::new(RecordingFeedback::new());
    let config =
        fast_config().with_handshake(HandshakeConfig::new(5, Duration::from_millis(10)));
    let client = start_simulated_with_feedback(&controller, config, feedback.clone());

    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Failed);
    assert!(wait_for(SETTLE_TIMEOUT, || client.worker_finished()));
    assert!(!client.is_ready());
    assert!(client.received().is_empty());

    for command in Command::ALL {
        assert_eq!(controller.requests(command), 5, "{command}");
    }
    thread::sleep(Duration::from_millis(50));
    assert_eq!(controller.total_requests(), 5 * Command::ALL.len() as u64);

    assert!(feedback.position("Waiting for PixelController (4/5)").is_some());
    assert!(feedback.position("Waiting for PixelController (5/5)").is_none());
    let messages = feedback.messages();
    let tail: Vec<&str> = messages.iter().rev().take(3).rev().map(String::as_str).collect();
    assert_eq!(
        tail,
        vec![
            "",
            "ERROR: No answer from PixelController received!",
            "Start aborted, make sure PixelController is running and restart client",
        ]
    );

    client.shutdown();
    assert_eq!(client.state(), ClientState::Failed);
}

#[test]
fn partial_answers_only_rerequest_missing() {
    let controller = Arc::new(SimulatedController::new());
    controller.set_silent([Command::GetFileLocation].into_iter().collect());
    let config =
        fast_config().with_handshake(HandshakeConfig::new(3, Duration::from_millis(15)));
    let client = start_simulated(&controller, config);

    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Failed);
    assert_eq!(controller.requests(Command::GetFileLocation), 3);
    assert_eq!(controller.requests(Command::GetVersion), 1);
    assert_eq!(controller.requests(Command::GetMatrixData), 1);
    assert!(client.version().is_some());
    assert!(client.file_location().is_none());
}

#[test]
fn late_answer_completes_handshake() {
    let controller = Arc::new(SimulatedController::new());
    controller.set_silent([Command::GetGuiState].into_iter().collect());
    let config =
        fast_config().with_handshake(HandshakeConfig::new(50, Duration::from_millis(10)));
    let client = start_simulated(&controller, config);

    assert!(wait_for(SETTLE_TIMEOUT, || controller.requests(Command::GetGuiState) >= 2));
    assert!(!client.is_ready());
    controller.set_silent(CommandSet::empty());

    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);
    assert_eq!(controller.requests(Command::GetVersion), 1);
    assert!(client.gui_state().is_some());
}

fn deliver_all(transport: &MockTransport, fixture: &ControllerFixture) {
    for command in Command::ALL {
        let reply = fixture
            .response(command)
            .encode(Compression::Disabled, DEFAULT_BUFFER_SIZE)
            .unwrap();
        assert!(transport.deliver(reply));
    }
}

#[test]
fn failing_sends_still_run_every_round() {
    let transport = MockTransport::new();
    transport.set_fail_send(true);
    let feedback = Arc::new(RecordingFeedback::new());
    let config =
        fast_config().with_handshake(HandshakeConfig::new(3, Duration::from_millis(10)));
    let client =
        SyncClient::start(config, transport.clone(), NoDiscovery, feedback.clone()).unwrap();

    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Failed);
    let stats = client.stats();
    assert_eq!(stats.handshake_rounds, 3);
    assert_eq!(stats.send_failures, 3 * Command::ALL.len() as u64);
    assert_eq!(stats.requests_sent, 0);
    assert!(transport.sent().is_empty());
    assert!(feedback
        .position("ERROR: No answer from PixelController received!")
        .is_some());
}

#[test]
fn handshake_recovers_once_sends_succeed() {
    let transport = MockTransport::new();
    transport.set_fail_send(true);
    let config =
        fast_config().with_handshake(HandshakeConfig::new(1_000, Duration::from_millis(5)));
    let client =
        SyncClient::start(config, transport.clone(), NoDiscovery, Arc::new(NullFeedback)).unwrap();

    let two_rounds = 2 * Command::ALL.len() as u64;
    assert!(wait_for(SETTLE_TIMEOUT, || client.stats().send_failures >= two_rounds));
    assert!(transport.sent().is_empty());
    assert_eq!(client.state(), ClientState::Handshaking);

    transport.set_fail_send(false);
    assert!(wait_for(SETTLE_TIMEOUT, || {
        transport.sent_commands().len() >= Command::ALL.len()
    }));
    deliver_all(&transport, &ControllerFixture::new());

    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);
    assert!(wait_for(SETTLE_TIMEOUT, || client.stats().poll_ticks >= 3));
    assert!(transport.sent_commands().contains(&Command::GetImageBuffer));
}

#[test]
fn polling_survives_failing_sends() {
    let transport = MockTransport::new();
    let config =
        fast_config().with_handshake(HandshakeConfig::new(1_000, Duration::from_millis(10)));
    let client =
        SyncClient::start(config, transport.clone(), NoDiscovery, Arc::new(NullFeedback)).unwrap();
    assert!(wait_for(SETTLE_TIMEOUT, || transport.is_listening()));
    deliver_all(&transport, &ControllerFixture::new());
    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);

    transport.set_fail_send(true);
    let before = client.stats();
    assert!(wait_for(SETTLE_TIMEOUT, || {
        client.stats().poll_ticks >= before.poll_ticks + 3
    }));
    assert!(client.stats().send_failures > before.send_failures);
    assert_eq!(client.state(), ClientState::Ready);

    transport.set_fail_send(false);
    let sent = transport.sent().len();
    let ticks = client.stats().poll_ticks;
    assert!(wait_for(SETTLE_TIMEOUT, || {
        transport.sent().len() > sent && client.stats().poll_ticks >= ticks + 3
    }));
    assert_eq!(client.state(), ClientState::Ready);
    assert!(client.is_ready());

    client.shutdown();
    assert_eq!(client.state(), ClientState::Stopped);
}

#[test]
fn compressed_session() {
    let controller = Arc::new(SimulatedController::compressed());
    let client = start_simulated(&controller, fast_config());

    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);
    assert_eq!(client.compression(), Compression::Lz4);
    assert_eq!(client.matrix().as_deref(), Some(&controller.fixture().matrix));
    assert!(wait_for(SETTLE_TIMEOUT, || {
        client.image_buffer().is_some_and(|b| b.output_buffers[0][0] > 1)
    }));
    assert_eq!(client.stats().decode_failures, 0);
}

#[test]
fn corrupt_payload_leaves_slot_unset() {
    let controller = Arc::new(SimulatedController::new());
    controller.set_corrupt([Command::GetOutput].into_iter().collect());
    let client = start_simulated(&controller, fast_config());

    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);
    assert!(client.output().is_none());
    assert!(client.received().contains(Command::GetOutput));
    assert!(client.matrix().is_some());
    assert_eq!(client.stats().decode_failures, 1);
}

#[test]
fn corrupt_update_keeps_previous_value() {
    let (_controller, client) = start_default();
    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);
    let before = client.color_sets();

    client.handle_envelope(Envelope::request(Command::GetColorSets).with_blob(vec![0xff, 0xfe]));

    assert_eq!(client.color_sets(), before);
    assert!(client.version().is_some());
}

#[test]
fn polling_refreshes_state() {
    let controller = Arc::new(SimulatedController::new());
    let config =
        fast_config().with_handshake(HandshakeConfig::new(5, Duration::from_millis(100)));
    let client = start_simulated(&controller, config);
    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);

    assert!(wait_for(SETTLE_TIMEOUT, || client.stats().poll_ticks >= 45));
    client.shutdown();

    let ticks = client.stats().poll_ticks;
    let slow_ticks = ticks.div_ceil(20);
    assert_eq!(controller.requests(Command::GetImageBuffer), 1 + ticks);
    assert_eq!(controller.requests(Command::GetOutputMapping), 1 + slow_ticks);
    assert_eq!(controller.requests(Command::GetPresetSettings), 1 + slow_ticks);
    assert_eq!(controller.requests(Command::GetJmxStatistics), 1 + slow_ticks);
    assert_eq!(controller.requests(Command::GetColorSets), 1);

    assert!(client.statistics().is_some());
    assert!(client.output_buffer(0).is_some_and(|b| b[0] >= 1));
}

#[test]
fn shutdown_stops_polling() {
    let (controller, client) = start_default();
    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);

    client.shutdown();
    assert_eq!(client.state(), ClientState::Stopped);
    assert!(client.worker_finished());
    assert!(client.is_ready());

    let requests = controller.total_requests();
    thread::sleep(Duration::from_millis(40));
    assert_eq!(controller.total_requests(), requests);

    client.shutdown();
    assert_eq!(client.state(), ClientState::Stopped);
}

#[test]
fn shutdown_interrupts_handshake() {
    let controller = Arc::new(SimulatedController::unresponsive());
    let config = fast_config().with_handshake(HandshakeConfig::new(5, Duration::from_secs(60)));
    let client = start_simulated(&controller, config);
    assert!(wait_for(SETTLE_TIMEOUT, || controller.total_requests() == 12));

    client.shutdown();
    assert_eq!(client.state(), ClientState::Stopped);
    assert!(!client.is_ready());
}

#[test]
fn bind_failure_leaves_state_connecting() {
    let transport = MockTransport::new();
    transport.set_fail_listen(true);
    let feedback = Arc::new(RecordingFeedback::new());
    let client =
        SyncClient::start(fast_config(), transport.clone(), NoDiscovery, feedback.clone()).unwrap();

    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Connecting);
    assert!(client.worker_finished());
    assert!(!client.is_ready());
    assert!(transport.sent().is_empty());
    assert!(feedback.position("ERROR: failed to bind").is_some());
    assert!(feedback.position(" ... started").is_none());
}

#[test]
fn messages_push_gui_state_to_observers() {
    let (controller, client) = start_default();
    assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);
    let updates = client.gui_state_channel();

    client.send_message(&["CHANGE_GENERATOR_A", "5"]).unwrap();

    let update = updates.recv_timeout(SETTLE_TIMEOUT).unwrap();
    assert_eq!(update.get("CHANGE_GENERATOR_A"), Some("5"));
    assert_eq!(client.gui_state().as_deref(), Some(&update));
    assert_eq!(controller.messages()[0].args, vec!["5".to_string()]);
}

#[test]
fn observers_see_updates_in_order() {
    let transport = MockTransport::new();
    let client = SyncClient::start(
        fast_config().with_handshake(HandshakeConfig::new(1, Duration::from_secs(60))),
        transport.clone(),
        NoDiscovery,
        Arc::new(NullFeedback),
    )
    .unwrap();
    assert!(wait_for(SETTLE_TIMEOUT, || transport.is_listening()));

    let updates = client.gui_state_channel();
    let mut fixture = ControllerFixture::new();
    for value in 0..5 {
        fixture.gui_state.0 = vec![format!("CURRENT_VISUAL {value}")];
        let envelope = fixture
            .response(Command::GetGuiState)
            .encode(Compression::Disabled, DEFAULT_BUFFER_SIZE)
            .unwrap();
        assert!(transport.deliver(envelope));
    }

    let seen: Vec<String> = updates
        .try_iter()
        .map(|state| state.get("CURRENT_VISUAL").unwrap_or_default().to_string())
        .collect();
    assert_eq!(seen, vec!["0", "1", "2", "3", "4"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn ready_iff_every_command_answered(order in response_order_strategy()) {
        let transport = MockTransport::new();
        let client = SyncClient::start(
            fast_config().with_handshake(HandshakeConfig::new(10_000, Duration::from_millis(2))),
            transport.clone(),
            NoDiscovery,
            Arc::new(NullFeedback),
        )
        .unwrap();
        prop_assert!(wait_for(SETTLE_TIMEOUT, || transport.is_listening()));

        let fixture = ControllerFixture::new();
        let (last, first) = order.split_last().unwrap();
        for command in first {
            let reply = fixture.response(*command).encode(Compression::Disabled, DEFAULT_BUFFER_SIZE).unwrap();
            transport.deliver(reply);
        }
        thread::sleep(Duration::from_millis(5));
        prop_assert!(!client.is_ready());
        prop_assert!(!client.received().contains(*last));

        let reply = fixture.response(*last).encode(Compression::Disabled, DEFAULT_BUFFER_SIZE).unwrap();
        transport.deliver(reply);
        prop_assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);
        prop_assert_eq!(client.received(), CommandSet::all());
    }

    #[test]
    fn pushed_values_land_in_slots_and_reach_observers(
        updates in prop::collection::vec(gui_state_strategy(), 1..5),
        buffer in image_buffer_strategy(2, 4, 16),
    ) {
        let client = SyncClient::start(
            fast_config().with_handshake(HandshakeConfig::new(1, Duration::from_secs(60))),
            MockTransport::new(),
            NoDiscovery,
            Arc::new(NullFeedback),
        )
        .unwrap();
        let channel = client.gui_state_channel();

        for state in &updates {
            let envelope = Response::GuiState(state.clone())
                .encode(Compression::Disabled, DEFAULT_BUFFER_SIZE)
                .unwrap();
            client.handle_envelope(envelope);
            let current = client.gui_state();
            prop_assert_eq!(current.as_deref(), Some(state));
        }
        let delivered: Vec<GuiState> = channel.try_iter().collect();
        prop_assert_eq!(&delivered, &updates);

        let envelope = Response::ImageBuffer(buffer.clone())
            .encode(Compression::Disabled, DEFAULT_BUFFER_SIZE)
            .unwrap();
        client.handle_envelope(envelope);
        let current_image = client.image_buffer();
        prop_assert_eq!(current_image.as_deref(), Some(&buffer));
        for (nr, pixels) in buffer.visual_buffers.iter().enumerate() {
            let visual = client.visual_buffer(nr);
            prop_assert_eq!(visual.as_ref(), Some(pixels));
        }
        prop_assert_eq!(client.output_buffer(1), buffer.output_buffers.get(1).cloned());
        prop_assert!(client.output_buffer(2).is_none());

        prop_assert!(client.received().contains(Command::GetGuiState));
        prop_assert!(client.received().contains(Command::GetImageBuffer));
        prop_assert_eq!(client.stats().decode_failures, 0);
    }

    #[test]
    fn unknown_patterns_change_nothing(patterns in prop::collection::vec(unknown_pattern_strategy(), 1..8)) {
        let (_controller, client) = start_default();
        prop_assert_eq!(client.wait_until_settled(SETTLE_TIMEOUT), ClientState::Ready);
        let version = client.version();
        let gui_state = client.gui_state();
        let discarded = client.stats().envelopes_discarded;

        for pattern in &patterns {
            client.handle_envelope(Envelope::new(pattern.clone()).with_blob(vec![1, 2, 3]));
        }

        prop_assert_eq!(client.received(), CommandSet::all());
        prop_assert_eq!(client.version(), version);
        prop_assert_eq!(client.gui_state(), gui_state);
        prop_assert_eq!(client.stats().envelopes_discarded, discarded + patterns.len() as u64);
    }
}
