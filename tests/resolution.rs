//! End-to-end tests for the overlap resolver.
//!
//! These tests drive the full axis × variation matrix over in-memory
//! events and verify the subset, ordering, registry, and cutflow
//! guarantees.

use std::sync::Arc;

use overlap_kernel::{
    CutflowError, CUTFLOW_STAGE, ConfigError, DecisionError, DecisionRequest, DecisionSet,
    EventStore, HistogramRegistry, KeepAllDecision, Kind, KindDecision, MemoryCatalog,
    ObjectCollection, ObjectRecord, ObjectRef, OverlapDecision, OverlapResolver, ResolverError,
    RunConfig, ScriptedDecision, VariationAxis, VariationName,
};
use parking_lot::Mutex;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn base_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Electron => "Electrons",
        Kind::Muon => "Muons",
        Kind::Jet => "Jets",
        Kind::Photon => "Photons",
        Kind::Tau => "Taus",
    }
}

/// Config with the given kinds active (jets are always added).
fn config_with(kinds: &[Kind]) -> RunConfig {
    let mut config = RunConfig::default();
    for &kind in kinds {
        config.input_names[kind] = base_name(kind).to_string();
        config.output_names[kind] = format!("{}OR", base_name(kind));
    }
    config
}

fn make_collection(kind: Kind, n: usize) -> ObjectCollection {
    let objects = (0..n)
        .map(|i| {
            ObjectRecord::new(
                80_000.0 + i as f64,
                60_000.0 - 1_000.0 * i as f64,
                -2.5 + i as f64,
                0.3 * i as f64,
            )
            .with_selected(true)
        })
        .collect();
    ObjectCollection::from_objects(kind, objects)
}

fn record(store: &mut EventStore, kind: Kind, key: &str, n: usize) {
    store
        .record_collection(key, make_collection(kind, n))
        .unwrap();
}

/// A decision set keeping every object, for the given collection sizes.
fn keep_all_set(sizes: &[(Kind, usize)]) -> DecisionSet {
    let mut set = DecisionSet::new();
    for &(kind, n) in sizes {
        set = set.with_kind(kind, KindDecision::keep_all(n));
    }
    set
}

// ─────────────────────────────────────────────────────────────────────────────
// SCENARIOS
// ─────────────────────────────────────────────────────────────────────────────

/// Scenario A: 3 electrons with flags [true, false, true] and cutflow on.
#[test]
fn scenario_a_electron_subset_and_cutflow() {
    let mut config = config_with(&[Kind::Electron]);
    config.cutflow_enabled = true;

    let decision = ScriptedDecision::new().with_set(
        DecisionSet::new()
            .with_kind(Kind::Electron, KindDecision::from_flags(vec![true, false, true]))
            .with_kind(Kind::Jet, KindDecision::keep_all(2)),
    );

    let registry = Arc::new(Mutex::new(HistogramRegistry::object_cutflows()));
    let mut resolver = OverlapResolver::new(
        config,
        decision,
        MemoryCatalog::new(),
        Some(Arc::clone(&registry)),
    )
    .unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Electron, "Electrons", 3);
    record(&mut store, Kind::Jet, "Jets", 2);

    let report = resolver.process_event(&mut store).unwrap();
    assert_eq!(report.registered, vec![VariationName::nominal()]);

    // Two electrons survive, in original order.
    let view = store.view("ElectronsOR").unwrap();
    assert_eq!(view.indices(), &[0, 2]);
    let source = store.collection("Electrons", Kind::Electron).unwrap();
    let pts: Vec<f64> = view.resolve(source).map(|o| o.pt).collect();
    assert_eq!(pts, vec![60_000.0, 58_000.0]);

    // One electron was removed.
    let cutflow = resolver.cutflow().unwrap();
    assert_eq!(cutflow.removed(Kind::Electron), 1);
    assert_eq!(cutflow.removed(Kind::Jet), 0);

    let reg = registry.lock();
    let hist = reg.get("cutflow_electrons_1").unwrap();
    let bin = hist.find_bin(CUTFLOW_STAGE).unwrap();
    assert_eq!(hist.entries(bin), 1);
}

/// Scenario B: jet variations ["", "JET_UP", "JET_DOWN"], all else inactive.
#[test]
fn scenario_b_jet_axis_registry() {
    let mut config = config_with(&[]);
    config.variation_sources[Kind::Jet] = "JetCalibrator".to_string();

    let catalog = MemoryCatalog::new().with_list("JetCalibrator", ["", "JET_UP", "JET_DOWN"]);
    let mut resolver =
        OverlapResolver::new(config, KeepAllDecision, catalog, None).unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Jet, "Jets", 3);
    record(&mut store, Kind::Jet, "JetsJET_UP", 3);
    record(&mut store, Kind::Jet, "JetsJET_DOWN", 3);

    let report = resolver.process_event(&mut store).unwrap();

    let expected: Vec<VariationName> = vec!["".into(), "JET_UP".into(), "JET_DOWN".into()];
    assert_eq!(report.registered, expected);
    assert_eq!(store.names("overlap_variations").unwrap(), &expected[..]);

    // One subset view per pass.
    assert!(store.view("JetsOR").is_ok());
    assert!(store.view("JetsORJET_UP").is_ok());
    assert!(store.view("JetsORJET_DOWN").is_ok());
}

/// Scenario C: empty jet input name fails before any event is processed.
#[test]
fn scenario_c_empty_jet_input_fails_setup() {
    let mut config = RunConfig::default();
    config.input_names[Kind::Jet] = String::new();

    let err = OverlapResolver::new(config, KeepAllDecision, MemoryCatalog::new(), None)
        .unwrap_err();
    match err {
        ResolverError::Config(ConfigError::JetInputMissing) => {}
        other => panic!("unexpected error: {other}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// REGISTRY AND GATING
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn registry_counts_one_plus_all_non_nominal_names() {
    let mut config = config_with(&[Kind::Electron, Kind::Muon]);
    config.variation_sources[Kind::Electron] = "ElectronCalibrator".to_string();
    config.variation_sources[Kind::Muon] = "MuonCalibrator".to_string();
    config.variation_sources[Kind::Jet] = "JetCalibrator".to_string();

    let catalog = MemoryCatalog::new()
        .with_list("ElectronCalibrator", ["", "EL_UP", "EL_DOWN"])
        .with_list("MuonCalibrator", ["", "MU_SCALE"])
        .with_list("JetCalibrator", ["", "JET_UP", "JET_DOWN"]);

    let mut resolver =
        OverlapResolver::new(config, KeepAllDecision, catalog, None).unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Electron, "Electrons", 2);
    record(&mut store, Kind::Electron, "ElectronsEL_UP", 2);
    record(&mut store, Kind::Electron, "ElectronsEL_DOWN", 2);
    record(&mut store, Kind::Muon, "Muons", 1);
    record(&mut store, Kind::Muon, "MuonsMU_SCALE", 1);
    record(&mut store, Kind::Jet, "Jets", 4);
    record(&mut store, Kind::Jet, "JetsJET_UP", 4);
    record(&mut store, Kind::Jet, "JetsJET_DOWN", 4);

    let report = resolver.process_event(&mut store).unwrap();

    // 1 nominal + 2 electron + 1 muon + 2 jet.
    assert_eq!(report.registered.len(), 6);

    // Fixed axis order: nominal, electron, muon, jet.
    let names: Vec<&str> = report.registered.iter().map(|n| n.as_str()).collect();
    assert_eq!(
        names,
        vec!["", "EL_UP", "EL_DOWN", "MU_SCALE", "JET_UP", "JET_DOWN"]
    );
}

#[test]
fn nominal_name_is_registered_exactly_once() {
    let mut config = config_with(&[]);
    config.variation_sources[Kind::Jet] = "JetCalibrator".to_string();

    // The catalog list leads with the nominal name, as the contract says;
    // the jet axis must not register it again.
    let catalog = MemoryCatalog::new().with_list("JetCalibrator", ["", "JET_UP"]);
    let mut resolver =
        OverlapResolver::new(config, KeepAllDecision, catalog, None).unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Jet, "Jets", 2);
    record(&mut store, Kind::Jet, "JetsJET_UP", 2);

    let report = resolver.process_event(&mut store).unwrap();
    let nominal_count = report
        .registered
        .iter()
        .filter(|n| n.is_nominal())
        .count();
    assert_eq!(nominal_count, 1);
}

#[test]
fn axis_with_only_nominal_variations_is_skipped() {
    let mut config = config_with(&[]);
    config.variation_sources[Kind::Jet] = "JetCalibrator".to_string();

    let catalog = MemoryCatalog::new().with_list("JetCalibrator", [""]);
    let mut resolver =
        OverlapResolver::new(config, KeepAllDecision, catalog, None).unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Jet, "Jets", 2);

    let report = resolver.process_event(&mut store).unwrap();
    assert_eq!(report.registered, vec![VariationName::nominal()]);
}

#[test]
fn axis_substitutes_only_its_own_kind() {
    let mut config = config_with(&[Kind::Electron]);
    config.variation_sources[Kind::Electron] = "ElectronCalibrator".to_string();

    let catalog = MemoryCatalog::new().with_list("ElectronCalibrator", ["", "EL_UP"]);

    // Nominal pass keeps everything; electron pass removes the varied
    // electron and one nominal jet.
    let decision = ScriptedDecision::new()
        .with_set(keep_all_set(&[(Kind::Electron, 1), (Kind::Jet, 2)]))
        .with_set(
            DecisionSet::new()
                .with_kind(Kind::Electron, KindDecision::from_flags(vec![false]))
                .with_kind(Kind::Jet, KindDecision::from_flags(vec![true, false])),
        );

    let mut resolver = OverlapResolver::new(config, decision, catalog, None).unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Electron, "Electrons", 1);
    record(&mut store, Kind::Electron, "ElectronsEL_UP", 1);
    record(&mut store, Kind::Jet, "Jets", 2);

    resolver.process_event(&mut store).unwrap();

    // The varied electron container was the one decided on.
    assert_eq!(store.view("ElectronsOREL_UP").unwrap().len(), 0);
    // Nominal electrons kept their nominal-pass result.
    assert_eq!(store.view("ElectronsOR").unwrap().len(), 1);
    // Jets were re-decided at nominal during the electron pass.
    assert_eq!(store.view("JetsOREL_UP").unwrap().indices(), &[0]);
}

// ─────────────────────────────────────────────────────────────────────────────
// FAILURE BEHAVIOR
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn missing_nominal_container_aborts_event() {
    let config = config_with(&[Kind::Electron, Kind::Muon]);
    let mut resolver = OverlapResolver::new(
        config,
        KeepAllDecision,
        MemoryCatalog::new(),
        None,
    )
    .unwrap();

    // Electrons present, muons missing.
    let mut store = EventStore::new();
    record(&mut store, Kind::Electron, "Electrons", 2);
    record(&mut store, Kind::Jet, "Jets", 2);

    let err = resolver.process_event(&mut store).unwrap_err();
    match err {
        ResolverError::ContainerNotFound { axis, kind, key } => {
            assert_eq!(axis, VariationAxis::Nominal);
            assert_eq!(kind, Kind::Muon);
            assert_eq!(key, "Muons");
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing was recorded for the failed event.
    assert_eq!(store.view_keys().count(), 0);
    assert!(store.names("overlap_variations").is_err());
}

#[test]
fn partial_outputs_survive_later_axis_failure() {
    let mut config = config_with(&[]);
    config.variation_sources[Kind::Jet] = "JetCalibrator".to_string();

    let catalog = MemoryCatalog::new().with_list("JetCalibrator", ["", "JET_UP", "JET_DOWN"]);
    let mut resolver =
        OverlapResolver::new(config, KeepAllDecision, catalog, None).unwrap();

    // JET_DOWN container deliberately absent.
    let mut store = EventStore::new();
    record(&mut store, Kind::Jet, "Jets", 2);
    record(&mut store, Kind::Jet, "JetsJET_UP", 2);

    let err = resolver.process_event(&mut store).unwrap_err();
    match err {
        ResolverError::ContainerNotFound { axis, kind, key } => {
            assert_eq!(axis, VariationAxis::Jet);
            assert_eq!(kind, Kind::Jet);
            assert_eq!(key, "JetsJET_DOWN");
        }
        other => panic!("unexpected error: {other}"),
    }

    // Earlier passes are not rolled back; the registry is never recorded.
    assert!(store.view("JetsOR").is_ok());
    assert!(store.view("JetsORJET_UP").is_ok());
    assert!(store.names("overlap_variations").is_err());
}

#[test]
fn decision_contract_violation_fails_event() {
    let config = config_with(&[Kind::Electron]);

    // The tool answers for electrons but forgets the jets.
    let decision = ScriptedDecision::new().with_set(
        DecisionSet::new().with_kind(Kind::Electron, KindDecision::keep_all(2)),
    );
    let mut resolver =
        OverlapResolver::new(config, decision, MemoryCatalog::new(), None).unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Electron, "Electrons", 2);
    record(&mut store, Kind::Jet, "Jets", 2);

    let err = resolver.process_event(&mut store).unwrap_err();
    match err {
        ResolverError::Decision(DecisionError::MissingKind { kind }) => {
            assert_eq!(kind, Kind::Jet)
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn decision_length_mismatch_fails_event() {
    let config = config_with(&[]);

    let decision = ScriptedDecision::new().with_set(
        DecisionSet::new().with_kind(Kind::Jet, KindDecision::from_flags(vec![true])),
    );
    let mut resolver =
        OverlapResolver::new(config, decision, MemoryCatalog::new(), None).unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Jet, "Jets", 3);

    let err = resolver.process_event(&mut store).unwrap_err();
    match err {
        ResolverError::Decision(DecisionError::LengthMismatch {
            kind,
            expected,
            got,
        }) => {
            assert_eq!(kind, Kind::Jet);
            assert_eq!(expected, 3);
            assert_eq!(got, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cutflow_setup_fails_on_missing_histogram() {
    let mut config = config_with(&[]);
    config.cutflow_enabled = true;

    // Empty registry: no cutflow histograms at all.
    let registry = Arc::new(Mutex::new(HistogramRegistry::new()));
    let err = OverlapResolver::new(
        config,
        KeepAllDecision,
        MemoryCatalog::new(),
        Some(registry),
    )
    .unwrap_err();
    match err {
        ResolverError::Cutflow(CutflowError::HistogramMissing { name }) => {
            assert_eq!(name, "cutflow_electrons_1");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CUTFLOW ACROSS EVENTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn cutflow_accumulates_across_events() {
    let mut config = config_with(&[]);
    config.cutflow_enabled = true;

    // Each event removes one of two jets.
    let decision = ScriptedDecision::new();
    for _ in 0..3 {
        decision.enqueue(
            DecisionSet::new().with_kind(Kind::Jet, KindDecision::from_flags(vec![true, false])),
        );
    }

    let registry = Arc::new(Mutex::new(HistogramRegistry::object_cutflows()));
    let mut resolver = OverlapResolver::new(
        config,
        decision,
        MemoryCatalog::new(),
        Some(Arc::clone(&registry)),
    )
    .unwrap();

    for _ in 0..3 {
        let mut store = EventStore::new();
        record(&mut store, Kind::Jet, "Jets", 2);
        resolver.process_event(&mut store).unwrap();
    }

    assert_eq!(resolver.cutflow().unwrap().removed(Kind::Jet), 3);

    let reg = registry.lock();
    let hist = reg.get("cutflow_jets_1").unwrap();
    let bin = hist.find_bin(CUTFLOW_STAGE).unwrap();
    assert_eq!(hist.entries(bin), 3);
}

// ─────────────────────────────────────────────────────────────────────────────
// DECORATIONS AND FLAG FORWARDING
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn cross_link_applies_partner_references() {
    let mut config = config_with(&[Kind::Muon]);
    config.cross_link_overlaps = true;

    // The second muon is removed by overlap with the first jet.
    let decision = ScriptedDecision::new().with_set(
        DecisionSet::new()
            .with_kind(
                Kind::Muon,
                KindDecision::from_flags(vec![true, false])
                    .with_partner(1, ObjectRef::new(Kind::Jet, 0)),
            )
            .with_kind(Kind::Jet, KindDecision::keep_all(2)),
    );
    let mut resolver =
        OverlapResolver::new(config, decision, MemoryCatalog::new(), None).unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Muon, "Muons", 2);
    record(&mut store, Kind::Jet, "Jets", 2);

    resolver.process_event(&mut store).unwrap();

    let muons = store.collection("Muons", Kind::Muon).unwrap();
    assert_eq!(muons.get(0).unwrap().overlap_partner, None);
    assert_eq!(
        muons.get(1).unwrap().overlap_partner,
        Some(ObjectRef::new(Kind::Jet, 0))
    );
}

#[test]
fn run_flags_are_forwarded_to_the_decision_tool() {
    #[derive(Default)]
    struct ProbeDecision {
        seen: Arc<std::sync::Mutex<Vec<(bool, bool)>>>,
    }

    impl OverlapDecision for ProbeDecision {
        fn decide(
            &self,
            request: &DecisionRequest<'_>,
        ) -> Result<DecisionSet, DecisionError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.selected_only, request.cross_link));
            Ok(DecisionSet::keep_all(request))
        }
    }

    let mut config = config_with(&[]);
    config.selected_only = true;
    config.cross_link_overlaps = true;

    let probe = ProbeDecision::default();
    let seen = Arc::clone(&probe.seen);
    let mut resolver =
        OverlapResolver::new(config, probe, MemoryCatalog::new(), None).unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Jet, "Jets", 1);
    resolver.process_event(&mut store).unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), &[(true, true)]);
}

#[test]
fn every_object_of_every_pass_is_decorated() {
    let mut config = config_with(&[Kind::Photon]);
    config.variation_sources[Kind::Photon] = "PhotonCalibrator".to_string();

    let catalog = MemoryCatalog::new().with_list("PhotonCalibrator", ["", "PH_UP"]);
    let mut resolver =
        OverlapResolver::new(config, KeepAllDecision, catalog, None).unwrap();

    let mut store = EventStore::new();
    record(&mut store, Kind::Photon, "Photons", 2);
    record(&mut store, Kind::Photon, "PhotonsPH_UP", 2);
    record(&mut store, Kind::Jet, "Jets", 2);

    resolver.process_event(&mut store).unwrap();

    for key in ["Photons", "PhotonsPH_UP"] {
        let coll = store.collection(key, Kind::Photon).unwrap();
        assert!(coll.iter().all(|o| o.survives_overlap == Some(true)), "{key}");
    }
    let jets = store.collection("Jets", Kind::Jet).unwrap();
    assert!(jets.iter().all(|o| o.survives_overlap == Some(true)));
}
