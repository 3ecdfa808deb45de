mod common;

use std::path::Path;

use common::{MemoryCheckpointStore, ScriptedLink};
use proptest::prelude::*;
use pyroseq::countdown::SkipSignal;
use pyroseq::runner::{EventLog, RunOutcome, ShowRunner};
use pyroseq::show::{parse_show, FiringStep, Pin, Show};
use pyroseq::shutdown::ShutdownHandle;

fn arb_show() -> impl Strategy<Value = Show> {
    prop::collection::vec(
        (0u16..600, prop::collection::vec(1u8..=127, 0..5)),
        0..12,
    )
    .prop_map(|steps| {
        Show::new(
            steps
                .into_iter()
                .map(|(delay, pins)| {
                    let pins = pins.into_iter().map(|p| Pin::new(p).unwrap()).collect();
                    FiringStep::new(f64::from(delay), pins).unwrap()
                })
                .collect(),
        )
    })
}

fn to_json(steps: &[(u16, Vec<i64>)]) -> String {
    let entries: Vec<String> = steps
        .iter()
        .map(|(delay, pins)| {
            let pins: Vec<String> = pins.iter().map(i64::to_string).collect();
            format!("[{}, [{}]]", delay, pins.join(", "))
        })
        .collect();
    format!("[{}]", entries.join(", "))
}

proptest! {
    #[test]
    fn remaining_time_is_sum_of_delays_from_start(show in arb_show(), start in 0usize..14) {
        let expected: f64 = show
            .steps()
            .iter()
            .enumerate()
            .filter(|(index, _)| *index >= start)
            .map(|(_, step)| step.delay_seconds())
            .sum();
        prop_assert_eq!(show.remaining_seconds(start), expected);
        prop_assert_eq!(show.plan(start).total_seconds, expected);
    }

    #[test]
    fn loaded_shows_never_contain_reserved_pin(
        steps in prop::collection::vec(
            (0u16..100, prop::collection::vec(-5i64..140, 0..6)),
            0..8,
        )
    ) {
        let all_valid = steps
            .iter()
            .flat_map(|(_, pins)| pins)
            .all(|pin| (1..=127).contains(pin));

        match parse_show(&to_json(&steps), Path::new("prop.json")) {
            Ok(show) => {
                prop_assert!(all_valid);
                prop_assert!(show.steps().iter().flat_map(FiringStep::pins).all(|p| p.get() != 0));
            }
            Err(_) => prop_assert!(!all_valid),
        }
    }

    #[test]
    fn skipped_steps_never_reach_the_link(
        pins in prop::collection::vec(prop::collection::vec(1u8..=127, 0..4), 1..8),
        start_seed in any::<prop::sample::Index>(),
    ) {
        let show = Show::new(
            pins.iter()
                .map(|p| {
                    let pins = p.iter().map(|&raw| Pin::new(raw).unwrap()).collect();
                    FiringStep::new(0.0, pins).unwrap()
                })
                .collect(),
        );
        let start = start_seed.index(show.len());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        let log = EventLog::new();
        let (outcome, link) = runtime.block_on(async {
            let mut runner = ShowRunner::new(
                ScriptedLink::acking(),
                MemoryCheckpointStore::default(),
                &log,
                SkipSignal::never(),
                ShutdownHandle::new(),
            );
            let outcome = runner.run(&show, start).await.unwrap();
            (outcome, runner.link().fire_commands())
        });

        let expected: Vec<u8> = pins[start..].iter().flatten().copied().collect();
        prop_assert_eq!(outcome, RunOutcome::Completed { steps_run: show.len() - start });
        prop_assert_eq!(link, expected);
    }
}
