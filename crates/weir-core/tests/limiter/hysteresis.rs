//! 状态机性质：滞回、放行失败与回收时序。

use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;
use tracing_test::traced_test;
use weir_core::test_stubs::{CountingReclaimer, ScriptedProbe};
use weir_core::{GateState, StateAdvance};

use super::{HARD, SOFT, scripted_monitor};

#[test]
fn usage_trace_walks_through_both_thresholds() {
    let probe = ScriptedProbe::new([600, 800, 950, 850, 700]);
    let mut monitor = scripted_monitor(&probe);
    let gate = monitor.gate();

    let observed: Vec<_> = (0..5)
        .map(|_| {
            monitor.tick();
            gate.state()
        })
        .collect();
    assert_eq!(
        observed,
        vec![
            GateState::Normal,
            GateState::Normal,
            GateState::Limited,
            GateState::Limited,
            GateState::Normal,
        ]
    );
    assert_eq!(gate.last_usage(), 700);
    assert_eq!(probe.calls(), 5);
}

#[test]
fn limits_are_inclusive_on_both_edges() {
    let probe = ScriptedProbe::new([HARD - 1, HARD, SOFT + 1, SOFT]);
    let mut monitor = scripted_monitor(&probe);

    assert_eq!(monitor.tick(), StateAdvance::Noop { state: GateState::Normal });
    assert_eq!(
        monitor.tick(),
        StateAdvance::Transition {
            from: GateState::Normal,
            to: GateState::Limited,
        },
        "占用等于硬阈值即进入 Limited"
    );
    assert_eq!(monitor.tick(), StateAdvance::Noop { state: GateState::Limited });
    assert_eq!(
        monitor.tick(),
        StateAdvance::Transition {
            from: GateState::Limited,
            to: GateState::Normal,
        },
        "占用等于软阈值即恢复"
    );
}

#[traced_test]
#[test]
fn measurement_failure_fails_open() {
    let probe = ScriptedProbe::from_steps([Some(950), None, Some(950)]);
    let mut monitor = scripted_monitor(&probe);
    let gate = monitor.gate();

    monitor.tick();
    assert_eq!(gate.state(), GateState::Limited);

    let advance = monitor.tick();
    assert_eq!(advance.state(), GateState::Normal, "测量失败时放行");
    assert!(advance.is_transition());
    assert_eq!(gate.measurement_failures(), 1);
    assert_eq!(gate.last_usage(), 950, "失败周期不覆盖最近一次测量");
    assert!(logs_contain("failing open"));

    monitor.tick();
    assert_eq!(gate.state(), GateState::Limited, "恢复测量后重新评估");
}

#[test]
fn empty_script_keeps_gate_open() {
    let probe = ScriptedProbe::from_steps(Vec::new());
    let mut monitor = scripted_monitor(&probe);
    for _ in 0..3 {
        assert_eq!(monitor.tick().state(), GateState::Normal);
    }
    assert_eq!(monitor.gate().measurement_failures(), 3);
}

#[test]
fn reclaimer_runs_once_after_limited_is_visible() {
    let probe = ScriptedProbe::new([950, 990, 1000, 700, 950]);
    let monitor = scripted_monitor(&probe);
    let gate = monitor.gate();
    let seen_by_reclaimer = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen_by_reclaimer);
    let mut monitor = monitor.with_reclaimer(move || sink.lock().push(gate.state()));

    for _ in 0..5 {
        monitor.tick();
    }
    assert_eq!(
        *seen_by_reclaimer.lock(),
        vec![GateState::Limited, GateState::Limited],
        "每次进入 Limited 调用一次，且调用时新状态已可见"
    );
    assert_eq!(monitor.gate().reclamation_count(), 2);
}

#[test]
fn staying_limited_does_not_reclaim_again() {
    let probe = ScriptedProbe::new([950, 950, 950]);
    let reclaimer = CountingReclaimer::new();
    let mut monitor = scripted_monitor(&probe).with_reclaimer(reclaimer.clone());
    for _ in 0..3 {
        monitor.tick();
    }
    assert_eq!(reclaimer.calls(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// 任意测量序列下，写者与一个按规则手工推进的影子模型保持一致。
    #[test]
    fn gate_matches_shadow_model(
        steps in prop::collection::vec(prop::option::weighted(0.9, 0u64..1200), 1..64),
    ) {
        let probe = ScriptedProbe::from_steps(steps.clone());
        let mut monitor = scripted_monitor(&probe);
        let gate = monitor.gate();
        let mut shadow = GateState::Normal;
        let mut entered_limited = 0u64;

        for step in steps {
            let expected = match (shadow, step) {
                (_, None) => GateState::Normal,
                (GateState::Normal, Some(usage)) if usage >= HARD => GateState::Limited,
                (GateState::Limited, Some(usage)) if usage <= SOFT => GateState::Normal,
                (current, Some(_)) => current,
            };
            if shadow == GateState::Normal && expected == GateState::Limited {
                entered_limited += 1;
            }

            let advance = monitor.tick();
            prop_assert_eq!(advance.state(), expected);
            prop_assert_eq!(advance.is_transition(), shadow != expected);
            prop_assert_eq!(gate.state(), expected);
            prop_assert_eq!(gate.is_admitting(), expected == GateState::Normal);
            shadow = expected;
        }
        prop_assert_eq!(gate.reclamation_count(), entered_limited);
    }
}
