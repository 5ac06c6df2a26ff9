//! Dialogs, rebuilds, enrichment, coordination and configuration of
//! whole instances.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use olli::olli_core::{
    CancellationToken, EnrichError, Enricher, EnrichmentCache, EnrichmentRequest, enrich_tree,
};
use olli::prelude::*;
use olli::runtime::InstanceId;
use parking_lot::Mutex;

const CHART: &str = r#"{
    "data": [{"x": "a", "y": 1}, {"x": "b", "y": 2}, {"x": "a", "y": 3}],
    "structure": {"groupby": "x"}
}"#;

fn spec() -> OlliSpec {
    OlliSpec::from_json(CHART).unwrap()
}

fn olli_with(config: OlliConfig) -> Olli {
    Olli::new(spec(), config, None).unwrap()
}

fn press(olli: &mut Olli, key: Key) -> bool {
    olli.handle_key(key, KeyboardModifiers::NONE).unwrap()
}

#[test]
fn test_filter_dialog_rebuilds_tree() {
    let mut olli = olli_with(OlliConfig::default());
    press(&mut olli, Key::ArrowDown);
    assert_eq!(olli.navigator().focused_id(), "olli-0");
    let before = olli.tree().generation();

    assert!(press(&mut olli, Key::F));
    olli.filter_dialog_mut()
        .unwrap()
        .set_draft(FieldPredicate::equal("x", "a").into())
        .unwrap();
    assert!(press(&mut olli, Key::Enter));

    assert!(olli.dialog().is_none());
    assert!(olli.tree().generation() > before);
    let root = olli.tree().root();
    assert_eq!(olli.tree().children(root).len(), 1);
    assert_eq!(olli.tree().selection(root).len(), 2);
    // Same id survives the rebuild.
    assert_eq!(olli.navigator().focused_id(), "olli-0");
}

#[test]
fn test_rebuild_falls_back_to_surviving_ancestor() {
    let mut olli = olli_with(OlliConfig::default());
    press(&mut olli, Key::ArrowDown);
    press(&mut olli, Key::ArrowRight);
    assert_eq!(olli.navigator().focused_id(), "olli-1");

    olli.set_selection(Some(FieldPredicate::equal("x", "a").into()))
        .unwrap();
    assert_eq!(olli.navigator().focused_id(), "olli");

    olli.set_selection(None).unwrap();
    assert_eq!(olli.tree().children(olli.tree().root()).len(), 2);
}

#[test]
fn test_rejected_filter_keeps_tree() {
    let mut olli = olli_with(OlliConfig::default());
    let before = olli.tree().generation();
    press(&mut olli, Key::F);
    olli.filter_dialog_mut()
        .unwrap()
        .set_draft(FieldPredicate::equal("x", "b").into())
        .unwrap();
    assert!(press(&mut olli, Key::Escape));
    assert!(olli.dialog().is_none());
    assert_eq!(olli.tree().generation(), before);
}

struct RowCounter;

impl Enricher for RowCounter {
    async fn enrich(&self, request: &EnrichmentRequest<'_>) -> std::result::Result<Option<String>, EnrichError> {
        Ok(Some(format!("{} rows behind this", request.rows.len())))
    }
}

#[test]
fn test_enrichment_appends_to_descriptions() {
    let mut olli = olli_with(OlliConfig::default());
    let plain = olli.focused_description();
    let applied = pollster::block_on(olli.enrich(&RowCounter));
    assert_eq!(applied, olli.tree().len());

    let enriched = olli.focused_description();
    assert!(enriched.starts_with(plain.trim_end_matches('.')));
    assert!(enriched.ends_with("3 rows behind this."));
}

#[test]
fn test_stale_enrichment_is_dropped() {
    let mut olli = olli_with(OlliConfig::default());
    let cache = EnrichmentCache::new();
    let patches = pollster::block_on(enrich_tree(
        olli.tree(),
        &RowCounter,
        &cache,
        &CancellationToken::new(),
    ));
    assert!(!patches.is_empty());

    olli.set_selection(None).unwrap();
    assert_eq!(olli.apply_enrichment(patches), 0);
    assert!(!olli.focused_description().contains("rows behind this"));
}

#[derive(Default)]
struct CountingEnricher {
    calls: AtomicUsize,
}

impl Enricher for CountingEnricher {
    async fn enrich(&self, request: &EnrichmentRequest<'_>) -> std::result::Result<Option<String>, EnrichError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(format!("{} in {}", request.rows.len(), request.id)))
    }
}

#[test]
fn test_rebuild_leaves_running_pass_to_finish() {
    let mut olli = olli_with(OlliConfig::default());
    let old_tree = olli.tree().clone();
    let token = CancellationToken::new();

    olli.set_selection(Some(FieldPredicate::equal("x", "a").into()))
        .unwrap();
    assert!(!token.is_cancelled());

    // The pass over the pre-rebuild tree runs to completion.
    let enricher = CountingEnricher::default();
    let patches = pollster::block_on(enrich_tree(
        &old_tree,
        &enricher,
        &EnrichmentCache::new(),
        &token,
    ));
    assert_eq!(enricher.calls.load(Ordering::SeqCst), old_tree.len());
    assert_eq!(patches.len(), old_tree.len());

    // Its results are discarded by generation.
    assert_eq!(olli.apply_enrichment(patches), 0);
    assert!(!olli.focused_description().contains(" in olli"));
}

#[test]
fn test_caller_token_stops_enrichment() {
    let mut olli = olli_with(OlliConfig::default());
    let token = CancellationToken::new();
    token.cancel();
    let enricher = CountingEnricher::default();
    assert_eq!(pollster::block_on(olli.enrich_with_token(&enricher, &token)), 0);
    assert_eq!(enricher.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_o_cycles_between_instances() {
    let coordinator = NavigationCoordinator::new();
    let config = |namespace: &str| OlliConfig {
        namespace: namespace.to_string(),
        ..OlliConfig::default()
    };
    let mut first = Olli::new(spec(), config("first"), Some(coordinator.clone())).unwrap();
    let second = Olli::new(spec(), config("second"), Some(coordinator.clone())).unwrap();
    let first_id = first.instance_id().unwrap();
    let second_id = second.instance_id().unwrap();
    assert_eq!(second.tree().get(second.tree().root()).unwrap().id, "second");

    let requested: Arc<Mutex<Vec<InstanceId>>> = Arc::new(Mutex::new(Vec::new()));
    let requested_clone = requested.clone();
    coordinator
        .focus_requested()
        .connect(move |&id| requested_clone.lock().push(id));

    press(&mut first, Key::ArrowDown);
    assert_eq!(coordinator.last_focused(), Some(first_id));
    assert!(press(&mut first, Key::O));
    assert_eq!(*requested.lock(), vec![second_id]);
    assert_eq!(coordinator.last_focused(), Some(second_id));

    drop(second);
    assert_eq!(coordinator.instances(), vec![first_id]);
}

#[test]
fn test_config_file_drives_instance() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
namespace = "sales"
verbosity = "low"

[keys]
open_help = "Shift+Slash"
"#
    )
    .unwrap();
    let config = OlliConfig::from_file(file.path()).unwrap();
    let mut olli = olli_with(config);

    assert_eq!(olli.navigator().focused_id(), "sales");
    assert!(!press(&mut olli, Key::H));
    assert!(olli.handle_key(Key::Slash, KeyboardModifiers::SHIFT).unwrap());
    let Some(Dialog::Help(entries)) = olli.dialog() else {
        panic!("expected the help dialog");
    };
    assert!(entries.iter().any(|e| e.action == Action::OpenHelp && e.keys == "Shift+/"));
}

#[test]
fn test_low_verbosity_is_shorter() {
    let high = olli_with(OlliConfig::default());
    let low = olli_with(OlliConfig {
        verbosity: Verbosity::Low,
        ..OlliConfig::default()
    });
    let a_high = high.tree().description_text(high.tree().children(high.tree().root())[0]);
    let a_low = low.tree().description_text(low.tree().children(low.tree().root())[0]);
    assert!(a_low.len() < a_high.len());
}

#[test]
fn test_invalid_spec_is_an_error() {
    let spec = OlliSpec::from_json(
        r#"{"data": [{"x": "a"}], "axes": [{"field": "missing", "axisType": "x"}]}"#,
    )
    .unwrap();
    let err = Olli::new(spec, OlliConfig::default(), None).unwrap_err();
    assert!(matches!(err, olli::Error::Core(_)));
    assert!(err.to_string().contains("missing"));
}
