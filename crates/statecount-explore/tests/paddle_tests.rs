use statecount_explore::traversal::bfs::BreadthFirst;
use statecount_explore::traversal::deepening::IterativeDeepening;
use statecount_explore::verify::{check_replay, check_round_trip, random_actions, DEFAULT_SEED};
use statecount_explore::{
    prepare_root, run_search, Action, CsvSink, Enumerator, FingerprintScheme, LayerReport,
    LayerSummary, SearchConfig, SearchKind, Simulator, StopPolicy, StopReason,
};
use statecount_sandbox::{Program, ProgramInstance, SandboxConfig};

const PADDLE_WAT: &str = include_str!("../../../demos/paddle.wat");

/// Serve counter whose reset state is inert: byte 1 only counts once
/// byte 0 is set, which the `warmup_action` export does.
const SERVING_WAT: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "action_count") (result i32) (i32.const 2))
  (func (export "action_at") (param $i i32) (result i32) (local.get $i))
  (func (export "warmup_action") (result i32) (i32.const 1))
  (func (export "step") (param $a i32)
    (if (i32.eq (local.get $a) (i32.const 1))
      (then (i32.store8 (i32.const 0) (i32.const 1)))
      (else
        (if (i32.load8_u (i32.const 0))
          (then
            (i32.store8 (i32.const 1)
              (i32.and (i32.add (i32.load8_u (i32.const 1)) (i32.const 1)) (i32.const 3)))))))))
"#;

fn boot(wat: &str) -> ProgramInstance {
    let wasm = wat::parse_str(wat).expect("valid WAT");
    let program = Program::from_bytes(&SandboxConfig::default(), &wasm).unwrap();
    let mut instance = program.boot().unwrap();
    prepare_root(&mut instance).unwrap();
    instance
}

fn counts(kind: SearchKind, scheme: FingerprintScheme, depth: u32) -> Vec<usize> {
    let mut sim = boot(PADDLE_WAT);
    let config = SearchConfig {
        kind,
        policy: StopPolicy::FixedDepth(depth),
        scheme,
    };
    let mut layers: Vec<LayerReport> = Vec::new();
    run_search(&mut sim, &config, &mut layers).unwrap();
    layers.iter().map(|l| l.states).collect()
}

#[test]
fn test_first_layers_by_hand() {
    // Depth 1: root, served ball, paddle right, paddle left (NOOP loops).
    // Depth 2 adds the ball one step up under three paddle columns, the
    // two sideways serves, and the paddle one further out either way.
    assert_eq!(
        counts(SearchKind::Bfs, FingerprintScheme::MemoryAndAux, 2),
        vec![1, 4, 11]
    );
}

#[test]
fn test_memory_alone_undercounts_paddle_positions() {
    assert_eq!(
        counts(SearchKind::Bfs, FingerprintScheme::MemoryOnly, 2),
        vec![1, 2, 3]
    );
}

#[test]
fn test_full_state_overcounts_bookkeeping() {
    let canonical = counts(SearchKind::Bfs, FingerprintScheme::MemoryAndAux, 2);
    let full = counts(SearchKind::Bfs, FingerprintScheme::FullState, 2);

    // Every full-state class refines a memory+aux class
    for (c, f) in canonical.iter().zip(&full) {
        assert!(f >= c);
    }
    // NOOP from the root only changes leftover fuel
    assert!(full[1] > canonical[1]);
}

#[test]
fn test_bfs_and_deepening_agree() {
    let bfs = counts(SearchKind::Bfs, FingerprintScheme::default(), 4);
    let id = counts(SearchKind::IterativeDeepening, FingerprintScheme::default(), 4);
    assert_eq!(bfs, id);
}

#[test]
fn test_counts_are_monotone() {
    let layers = counts(SearchKind::Bfs, FingerprintScheme::default(), 6);
    assert_eq!(layers.len(), 7);
    assert!(layers.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_incremental_bfs_matches_fresh_runs() {
    let mut sim = boot(PADDLE_WAT);
    let mut bfs = BreadthFirst::new(&mut sim, FingerprintScheme::default()).unwrap();
    let incremental: Vec<usize> = (0..=4)
        .map(|d| bfs.expand_to(&mut sim, d, None).unwrap())
        .collect();

    for (depth, expected) in incremental.iter().enumerate() {
        let mut fresh_sim = boot(PADDLE_WAT);
        let mut fresh = BreadthFirst::new(&mut fresh_sim, FingerprintScheme::default()).unwrap();
        let got = fresh.expand_to(&mut fresh_sim, depth as u32, None).unwrap();
        assert_eq!(got, *expected, "depth {depth}");
    }
}

#[test]
fn test_deepening_returns_program_to_root() {
    let mut sim = boot(PADDLE_WAT);
    let root_ram = sim.ram();
    let root_aux = sim.aux_state().unwrap();

    let mut id = IterativeDeepening::new(&mut sim, FingerprintScheme::default()).unwrap();
    id.expand_to(&mut sim, 3, None).unwrap();

    assert_eq!(sim.ram(), root_ram);
    assert_eq!(sim.aux_state().unwrap(), root_aux);
}

fn budget_run(kind: SearchKind, budget: usize) -> (Vec<LayerReport>, LayerSummary) {
    let mut sim = boot(PADDLE_WAT);
    let config = SearchConfig {
        kind,
        policy: StopPolicy::StateBudget(budget),
        scheme: FingerprintScheme::default(),
    };
    let mut layers: Vec<LayerReport> = Vec::new();
    let summary = run_search(&mut sim, &config, &mut layers).unwrap();
    (layers, summary)
}

#[test]
fn test_budget_mode_stops_on_crossing_layer() {
    let (layers, summary) = budget_run(SearchKind::Bfs, 10);

    // Depth 1 has 4 states; depth 2 crosses 10 and is reported in full
    assert_eq!(summary.reason, StopReason::BudgetReached);
    assert_eq!(summary.depth, 2);
    assert_eq!(
        summary.states,
        counts(SearchKind::Bfs, FingerprintScheme::default(), 2)[2]
    );
    assert_eq!(summary.states, 11);
    assert_eq!(layers.len(), 3);
}

#[test]
fn test_budget_rows_agree_across_searches() {
    let (bfs, _) = budget_run(SearchKind::Bfs, 10);
    let (id, _) = budget_run(SearchKind::IterativeDeepening, 10);
    assert_eq!(bfs, id);
}

#[test]
fn test_csv_output() {
    let mut sim = boot(PADDLE_WAT);
    let config = SearchConfig {
        policy: StopPolicy::FixedDepth(1),
        ..Default::default()
    };
    let mut sink = CsvSink::new(Vec::new()).unwrap();
    run_search(&mut sim, &config, &mut sink).unwrap();

    let text = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(text, "depth,states\n0,1\n1,4\n");
}

#[test]
fn test_warmup_action_defines_the_root() {
    let mut sim = boot(SERVING_WAT);
    // The warm-up served, so byte 0 is already set at the root
    assert_eq!(sim.ram()[0], 1);

    let config = SearchConfig {
        policy: StopPolicy::StateBudget(100),
        ..Default::default()
    };
    let mut layers: Vec<LayerReport> = Vec::new();
    let summary = run_search(&mut sim, &config, &mut layers).unwrap();

    // Counter byte 1 cycles through 4 values once served
    assert_eq!(summary.reason, StopReason::Exhausted);
    assert_eq!(summary.states, 4);
}

#[test]
fn test_save_restore_is_consistent() {
    let mut sim = boot(PADDLE_WAT);
    let actions = random_actions(&sim.action_set(), 40, DEFAULT_SEED);

    check_replay(&mut sim, &actions, FingerprintScheme::default()).unwrap();
    check_round_trip(&mut sim, &actions, FingerprintScheme::default()).unwrap();
}

#[test]
fn test_replay_with_explicit_actions() {
    let mut sim = boot(PADDLE_WAT);
    let fp = check_replay(
        &mut sim,
        &[Action(1), Action(4), Action(0)],
        FingerprintScheme::default(),
    )
    .unwrap();
    // Ball height 2, in flight, paddle at column 2
    assert_eq!(fp.as_bytes()[0], 2);
    assert_eq!(fp.as_bytes()[1], 1);
    assert_eq!(&fp.as_bytes()[128..], &2i32.to_le_bytes());
}
