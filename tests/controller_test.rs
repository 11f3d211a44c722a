//! Pipeline controller integration tests.
//!
//! Every role runs a stub that sleeps, so these exercise the real
//! supervisor: spawn, signal, and reap.

#![cfg(unix)]

mod common;

use std::collections::BTreeSet;

use assert_matches::assert_matches;
use common::{pid_alive, TestHarness};
use ristbond::config::{SenderMode, SenderSpec};
use ristbond::pipeline::{plan, PipelinePhase, ToggleAction};
use ristbond_core::{Error, Role, RoleStatus};
use serial_test::serial;

fn sender_roles(pids: &std::collections::BTreeMap<Role, u32>) -> BTreeSet<usize> {
    pids.keys()
        .filter_map(|role| match role {
            Role::Sender(i) => Some(*i),
            _ => None,
        })
        .collect()
}

#[tokio::test]
#[serial]
async fn start_all_launches_every_enabled_role() {
    let harness = TestHarness::new();
    let report = harness.controller.start_all().await.unwrap();

    assert!(report.is_clean());
    assert_eq!(harness.controller.phase(), PipelinePhase::Running);

    let pids = harness.controller.pids().await;
    assert!(pids.contains_key(&Role::Relay));
    assert!(pids.contains_key(&Role::Encoder));
    assert!(!pids.contains_key(&Role::Bond));
    assert_eq!(sender_roles(&pids), BTreeSet::from([0, 1, 2, 3]));

    let status = harness.controller.get_status().await;
    assert_eq!(status.encoder.status, RoleStatus::Running);
    assert!(status.senders.iter().all(|s| s.process.status == RoleStatus::Running));

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn stop_all_is_idempotent() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();

    harness.controller.stop_all().await;
    assert_eq!(harness.controller.phase(), PipelinePhase::Stopped);
    assert!(harness.controller.pids().await.is_empty());

    harness.controller.stop_all().await;
    assert_eq!(harness.controller.phase(), PipelinePhase::Stopped);

    let status = harness.controller.get_status().await;
    assert_eq!(status.relay.status, RoleStatus::Stopped);
    assert_eq!(status.encoder.status, RoleStatus::Stopped);
}

#[tokio::test]
#[serial]
async fn stop_all_without_start_is_a_no_op() {
    let harness = TestHarness::new();
    harness.controller.stop_all().await;
    assert_eq!(harness.controller.phase(), PipelinePhase::Stopped);
}

#[tokio::test]
#[serial]
async fn restart_all_replaces_every_process() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();
    let before = harness.controller.pids().await;

    harness.controller.restart_all().await.unwrap();
    let after = harness.controller.pids().await;

    assert_eq!(before.keys().collect::<Vec<_>>(), after.keys().collect::<Vec<_>>());
    for (role, pid) in &before {
        assert_ne!(after[role], *pid, "{role} kept its pid across a restart");
    }

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn stopping_one_path_leaves_the_others_alone() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();
    let before = harness.controller.pids().await;

    harness.controller.stop_sender(0).await.unwrap();
    let after = harness.controller.pids().await;

    assert!(!after.contains_key(&Role::Sender(0)));
    for role in [Role::Relay, Role::Encoder, Role::Sender(1), Role::Sender(2), Role::Sender(3)] {
        assert_eq!(before[&role], after[&role], "{role} was disturbed");
    }

    let status = harness.controller.get_status().await;
    let sender = status.sender(0).unwrap();
    assert!(sender.held);
    assert!(sender.enabled);
    assert_eq!(sender.process.status, RoleStatus::Stopped);
    // A held path is not a failure.
    assert_eq!(status.phase, PipelinePhase::Running);

    harness.controller.start_sender(0).await.unwrap();
    let restarted = harness.controller.pids().await;
    assert!(restarted.contains_key(&Role::Sender(0)));
    assert_eq!(before[&Role::Sender(1)], restarted[&Role::Sender(1)]);
    assert!(!harness.controller.get_status().await.sender(0).unwrap().held);

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn start_sender_restarts_a_running_path() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();
    let before = harness.controller.pids().await;

    harness.controller.start_sender(2).await.unwrap();
    let after = harness.controller.pids().await;

    assert_ne!(before[&Role::Sender(2)], after[&Role::Sender(2)]);
    assert_eq!(before[&Role::Encoder], after[&Role::Encoder]);

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn disabled_paths_are_never_launched() {
    let harness = TestHarness::with_config(|c| c.rist.senders[1].enabled = false);
    harness.controller.start_all().await.unwrap();

    let pids = harness.controller.pids().await;
    assert_eq!(sender_roles(&pids), BTreeSet::from([0, 2, 3]));

    let status = harness.controller.get_status().await;
    assert_eq!(status.sender(1).unwrap().process.status, RoleStatus::Disabled);
    assert_eq!(status.roles()["sender[1]"], RoleStatus::Disabled);

    let err = harness.controller.start_sender(1).await.unwrap_err();
    assert_matches!(err, Error::SenderDisabled(1));

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn out_of_range_index_is_rejected() {
    let harness = TestHarness::new();

    assert_matches!(
        harness.controller.start_sender(9).await,
        Err(Error::BadIndex { index: 9, len: 4 })
    );
    assert_matches!(
        harness.controller.stop_sender(4).await,
        Err(Error::BadIndex { index: 4, len: 4 })
    );
    assert_matches!(
        harness.controller.toggle_sender(7, ToggleAction::Toggle).await,
        Err(Error::BadIndex { .. })
    );
    assert_matches!(
        harness.controller.set_sender_weight(7, 10).await,
        Err(Error::BadIndex { .. })
    );
}

#[tokio::test]
#[serial]
async fn weight_bounds_are_enforced_before_anything_changes() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();
    let before = harness.controller.pids().await;
    let text_before = harness.stored_text();

    assert_matches!(
        harness.controller.set_sender_weight(0, 1001).await,
        Err(Error::WeightOutOfRange(1001))
    );
    assert_matches!(
        harness.controller.set_sender_weight(0, -1).await,
        Err(Error::WeightOutOfRange(-1))
    );
    assert_eq!(harness.stored_text(), text_before);
    assert_eq!(harness.controller.pids().await, before);

    harness.controller.set_sender_weight(0, 0).await.unwrap();
    assert_eq!(harness.stored().rist.senders[0].weight, 0);

    harness.controller.set_sender_weight(0, 1000).await.unwrap();
    assert_eq!(harness.stored().rist.senders[0].weight, 1000);

    let after = harness.controller.pids().await;
    assert_ne!(before[&Role::Sender(0)], after[&Role::Sender(0)]);
    assert_eq!(before[&Role::Sender(1)], after[&Role::Sender(1)]);
    assert_eq!(before[&Role::Encoder], after[&Role::Encoder]);
    assert_eq!(harness.controller.get_status().await.sender(0).unwrap().weight, 1000);

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn path_operations_reject_an_invalid_stored_config() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();
    let before = harness.controller.pids().await;

    // Edited behind the controller's back, below the allowed buffer.
    let mut config = harness.stored();
    config.rist.senders[1].buffer_ms = Some(10);
    harness.controller.store().save(&config).unwrap();
    let text_before = harness.stored_text();

    assert_matches!(
        harness.controller.set_sender_weight(1, 7).await,
        Err(Error::Validation(_))
    );
    assert_matches!(
        harness.controller.start_sender(1).await,
        Err(Error::Validation(_))
    );
    assert_matches!(
        harness.controller.toggle_sender(1, ToggleAction::Disable).await,
        Err(Error::Validation(_))
    );

    assert_eq!(harness.stored_text(), text_before);
    assert_eq!(harness.controller.pids().await, before);
    assert_eq!(harness.logged_pids("rist-1"), vec![before[&Role::Sender(1)]]);

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn paths_the_running_encoder_does_not_feed_need_a_restart() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();
    let before = harness.controller.pids().await;

    let mut config = harness.stored();
    config.rist.senders.push(SenderSpec {
        enabled: false,
        ..Default::default()
    });
    harness.controller.store().save(&config).unwrap();

    assert_matches!(
        harness.controller.toggle_sender(4, ToggleAction::Enable).await,
        Err(Error::RestartRequired(_))
    );
    assert!(!harness.stored().rist.senders[4].enabled);
    assert_eq!(harness.controller.pids().await, before);

    let mut config = harness.stored();
    config.rist.senders[2].feed_port = Some(12000);
    harness.controller.store().save(&config).unwrap();
    assert_matches!(
        harness.controller.start_sender(2).await,
        Err(Error::RestartRequired(_))
    );
    assert_matches!(
        harness.controller.set_sender_weight(2, 9).await,
        Err(Error::RestartRequired(_))
    );
    assert_eq!(harness.stored().rist.senders[2].weight, config.rist.senders[2].weight);
    assert_eq!(harness.controller.pids().await, before);

    // Once the encoder is rebuilt from the stored config both are accepted.
    harness.controller.restart_all().await.unwrap();
    harness.controller.start_sender(2).await.unwrap();
    let enabled = harness
        .controller
        .toggle_sender(4, ToggleAction::Enable)
        .await
        .unwrap();
    assert!(enabled);
    let pids = harness.controller.pids().await;
    assert_eq!(sender_roles(&pids), BTreeSet::from([0, 1, 2, 3, 4]));

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn concurrent_operations_leave_one_live_process_per_role() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();

    let (first, second) = tokio::join!(
        harness.controller.start_sender(0),
        harness.controller.start_sender(0)
    );
    first.unwrap();
    second.unwrap();
    assert_eq!(harness.logged_pids("rist-0").len(), 3);

    let (started, restarted) = tokio::join!(
        harness.controller.start_all(),
        harness.controller.restart_all()
    );
    assert!(started.unwrap().is_clean());
    assert!(restarted.unwrap().is_clean());

    let pids = harness.controller.pids().await;
    assert_eq!(sender_roles(&pids), BTreeSet::from([0, 1, 2, 3]));
    for role in [Role::Relay, Role::Encoder, Role::Sender(0), Role::Sender(3)] {
        let current = pids[&role];
        assert!(pid_alive(current), "{role} pid {current} is not running");

        for old in harness.logged_pids(&role.process_name()) {
            if old != current {
                assert!(!pid_alive(old), "{role} left pid {old} behind");
            }
        }
    }

    harness.controller.stop_all().await;
    for pid in pids.values() {
        assert!(!pid_alive(*pid));
    }
}

#[tokio::test]
#[serial]
async fn weight_change_while_stopped_only_persists() {
    let harness = TestHarness::new();
    harness.controller.set_sender_weight(3, 42).await.unwrap();

    assert_eq!(harness.stored().rist.senders[3].weight, 42);
    assert!(harness.controller.pids().await.is_empty());
}

#[tokio::test]
#[serial]
async fn toggle_disable_then_enable() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();
    let before = harness.controller.pids().await;

    let enabled = harness
        .controller
        .toggle_sender(2, ToggleAction::Disable)
        .await
        .unwrap();
    assert!(!enabled);
    assert!(!harness.stored().rist.senders[2].enabled);
    let pids = harness.controller.pids().await;
    assert_eq!(sender_roles(&pids), BTreeSet::from([0, 1, 3]));
    assert_eq!(before[&Role::Sender(0)], pids[&Role::Sender(0)]);

    let enabled = harness
        .controller
        .toggle_sender(2, ToggleAction::Toggle)
        .await
        .unwrap();
    assert!(enabled);
    assert!(harness.stored().rist.senders[2].enabled);
    let pids = harness.controller.pids().await;
    assert_eq!(sender_roles(&pids), BTreeSet::from([0, 1, 2, 3]));
    assert_eq!(before[&Role::Encoder], pids[&Role::Encoder]);

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn enabling_while_stopped_waits_for_the_next_start() {
    let harness = TestHarness::with_config(|c| c.rist.senders[2].enabled = false);

    let enabled = harness
        .controller
        .toggle_sender(2, ToggleAction::Enable)
        .await
        .unwrap();
    assert!(enabled);
    assert!(harness.stored().rist.senders[2].enabled);
    assert!(harness.controller.pids().await.is_empty());

    harness.controller.start_all().await.unwrap();
    assert!(harness.controller.pids().await.contains_key(&Role::Sender(2)));

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn rejected_config_leaves_everything_as_it_was() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();
    let before = harness.controller.pids().await;
    let text_before = harness.stored_text();

    let err = harness
        .controller
        .save_and_restart_all("not: valid: yaml: ][")
        .await
        .unwrap_err();
    assert_matches!(err, Error::InvalidConfig(_));

    let out_of_range = text_before.replacen("weight: 5", "weight: 5000", 1);
    let err = harness
        .controller
        .save_and_restart_all(&out_of_range)
        .await
        .unwrap_err();
    assert_matches!(err, Error::InvalidConfig(_));

    assert_eq!(harness.stored_text(), text_before);
    assert_eq!(harness.controller.pids().await, before);
    assert_eq!(harness.controller.phase(), PipelinePhase::Running);

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn accepted_config_is_saved_and_applied() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();
    let before = harness.controller.pids().await;

    let mut config = harness.stored();
    config.rist.senders[3].enabled = false;
    let text = config.to_yaml().unwrap();

    let report = harness.controller.save_and_restart_all(&text).await.unwrap();
    assert!(report.is_clean());
    assert!(!harness.stored().rist.senders[3].enabled);

    let after = harness.controller.pids().await;
    assert_eq!(sender_roles(&after), BTreeSet::from([0, 1, 2]));
    assert_ne!(before[&Role::Encoder], after[&Role::Encoder]);

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn encoder_launch_failure_stops_the_pipeline() {
    let harness = TestHarness::with_config(|c| {
        c.tools.ffmpeg_path = Some("/nonexistent/ffmpeg".into());
    });

    let err = harness.controller.start_all().await.unwrap_err();
    assert_matches!(err, Error::LaunchFailure { ref name, .. } if name == "ffmpeg");

    assert_eq!(harness.controller.phase(), PipelinePhase::Stopped);
    assert!(harness.controller.pids().await.is_empty());
}

#[tokio::test]
#[serial]
async fn a_path_that_fails_to_launch_does_not_stop_the_rest() {
    // No caller may switch to uid -1, root included.
    let harness = TestHarness::with_config(|c| c.rist.senders[3].run_uid = Some(u32::MAX));

    let report = harness.controller.start_all().await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].role, Role::Sender(3));
    assert_eq!(harness.controller.phase(), PipelinePhase::Degraded);

    let pids = harness.controller.pids().await;
    assert_eq!(sender_roles(&pids), BTreeSet::from([0, 1, 2]));
    assert!(pids.contains_key(&Role::Encoder));

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn no_enabled_paths_still_starts_encoder_and_relay() {
    let harness = TestHarness::with_config(|c| {
        for sender in &mut c.rist.senders {
            sender.enabled = false;
        }
    });

    let report = harness.controller.start_all().await.unwrap();
    assert!(report.is_clean());

    let pids = harness.controller.pids().await;
    assert!(pids.contains_key(&Role::Relay));
    assert!(pids.contains_key(&Role::Encoder));
    assert!(sender_roles(&pids).is_empty());

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn relay_disabled_is_reported_and_not_launched() {
    let harness = TestHarness::with_config(|c| c.mediamtx.enable = false);
    harness.controller.start_all().await.unwrap();

    assert!(!harness.controller.pids().await.contains_key(&Role::Relay));
    let status = harness.controller.get_status().await;
    assert_eq!(status.relay.status, RoleStatus::Disabled);

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn single_shape_rebuilds_the_bond_without_held_paths() {
    let harness = TestHarness::with_config(|c| c.rist.mode = SenderMode::Single);
    harness.controller.start_all().await.unwrap();

    let before = harness.controller.pids().await;
    assert!(before.contains_key(&Role::Bond));
    assert!(sender_roles(&before).is_empty());

    harness.controller.stop_sender(1).await.unwrap();
    let after = harness.controller.pids().await;
    assert_ne!(before[&Role::Bond], after[&Role::Bond]);
    assert_eq!(before[&Role::Encoder], after[&Role::Encoder]);

    let status = harness.controller.get_status().await;
    assert_eq!(status.sender(1).unwrap().process.status, RoleStatus::Stopped);
    assert_eq!(status.sender(0).unwrap().process.status, RoleStatus::Running);
    assert_eq!(status.bond.as_ref().unwrap().status, RoleStatus::Running);

    for i in [0, 2, 3] {
        harness.controller.stop_sender(i).await.unwrap();
    }
    assert!(!harness.controller.pids().await.contains_key(&Role::Bond));

    harness.controller.start_sender(2).await.unwrap();
    assert!(harness.controller.pids().await.contains_key(&Role::Bond));

    harness.controller.stop_all().await;
}

#[tokio::test]
#[serial]
async fn process_logs_land_in_the_log_dir() {
    let harness = TestHarness::new();
    harness.controller.start_all().await.unwrap();
    harness.controller.stop_all().await;

    for name in ["mediamtx", "ffmpeg", "rist-0", "rist-3"] {
        let log = std::fs::read_to_string(harness.log_dir().join(format!("{name}.log")))
            .unwrap_or_else(|e| panic!("{name}.log: {e}"));
        assert!(log.starts_with("[START] "), "{name}.log: {log}");
    }
}

#[test]
#[serial]
fn plan_is_deterministic() {
    let harness = TestHarness::new();
    let config = harness.stored();

    let first = plan(&config).unwrap();
    let second = plan(&config).unwrap();
    assert_eq!(first, second);

    let roles: Vec<Role> = first.iter().map(|spec| spec.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::Relay,
            Role::Encoder,
            Role::Sender(0),
            Role::Sender(1),
            Role::Sender(2),
            Role::Sender(3),
        ]
    );
    assert_eq!(harness.controller.planned_invocations().unwrap(), first);
}
