//! End-to-end runs of the macro against the in-memory host

use pm_core::{
    ConfigOption, ConfigurationChange, Document, Faults, HostApplication, Ledger, MacroError,
    MacroRecipe, MacroRunner, MemoryDocument, MemoryHost, RectangleSpec, RunReport, SegmentOrder,
    SketchBinder, StepReport,
};
use pretty_assertions::assert_eq;

fn run_default(doc: MemoryDocument) -> (MemoryHost, Result<RunReport, MacroError>) {
    let mut host = MemoryHost::with_document(doc);
    let report = MacroRunner::default().run(&mut host);
    (host, report)
}

#[test]
fn parameters_then_bindings_on_empty_ledger() {
    let mut doc = MemoryDocument::default();

    let mut ledger = Ledger::new(&mut doc);
    ledger.define_parameter("BaseLength", "150mm").unwrap();
    ledger.define_parameter("BaseHeight", "140mm").unwrap();
    assert_eq!(doc.equation_count(), 2);

    SketchBinder::new(&mut doc)
        .create_constrained_rectangle(&RectangleSpec::default())
        .unwrap();

    assert_eq!(
        doc.equations(),
        [
            "\"BaseLength\"=150mm",
            "\"BaseHeight\"=140mm",
            "\"D1@Sketch1@Part1.SLDPRT\" = \"BaseLength\"",
            "\"D2@Sketch1@Part1.SLDPRT\" = \"BaseHeight\"",
        ]
    );
}

#[test]
fn default_recipe_full_run() {
    let (host, report) = run_default(MemoryDocument::default());
    let report = report.unwrap();
    let doc = host.document().unwrap();

    assert!(report.is_clean());
    assert_eq!(report.steps.len(), 4);
    assert_eq!(doc.equation_count(), 4);

    let pla = doc.configuration("pla").unwrap();
    assert!(pla.has_option(ConfigOption::DontActivate));
    assert_eq!(doc.active_configuration().as_deref(), Some("Default"));

    // Rebuild drove the sketch to the parameter values
    let width = doc.dimension("D1@Sketch1@Part1.SLDPRT").unwrap();
    let height = doc.dimension("D2@Sketch1@Part1.SLDPRT").unwrap();
    assert!((width.value - 0.150).abs() < 1e-12);
    assert!((height.value - 0.140).abs() < 1e-12);

    assert_eq!(
        host.messages(),
        [
            "Macro started successfully.",
            "Configuration 'pla' created.",
            "D1@Sketch1 = \"BaseLength\"",
            "D2@Sketch1 = \"BaseHeight\"",
            "Macro completed successfully.",
        ]
    );
    assert!(!host.command_in_progress());
}

#[test]
fn rerun_does_not_duplicate_parameters_or_configurations() {
    let (mut host, report) = run_default(MemoryDocument::default());
    report.unwrap();

    let second = MacroRunner::default().run(&mut host).unwrap();
    let doc = host.document().unwrap();

    assert!(matches!(
        &second.steps[2],
        StepReport::Configuration { change, .. } if *change == ConfigurationChange::Updated
    ));
    assert_eq!(
        doc.configuration_names(),
        ["Default".to_string(), "pla".to_string()]
    );

    let mut doc = host.close().unwrap();
    let parameters = Ledger::new(&mut doc).parameters().unwrap();
    assert_eq!(parameters.len(), 2);
}

#[test]
fn no_selectable_plane_adds_no_bindings() {
    let doc = MemoryDocument::default().with_planes(["Plane1", "Plane2"]);
    let (host, report) = run_default(doc);
    let report = report.unwrap();
    let doc = host.document().unwrap();

    assert_eq!(report.failures().count(), 1);
    assert_eq!(doc.equation_count(), 2);
    assert!(doc.sketches().is_empty());
    assert!(!doc.is_editing_sketch());
    assert!(host.messages().contains(
        &"Could not select Front Plane. Please select a plane manually and re-run the macro."
            .to_string()
    ));
}

#[test]
fn short_segment_list_closes_sketch_without_bindings() {
    let doc = MemoryDocument::default().with_faults(Faults {
        segment_limit: Some(2),
        ..Default::default()
    });
    let (host, report) = run_default(doc);
    let doc = host.document().unwrap();

    assert_eq!(report.unwrap().failures().count(), 1);
    assert_eq!(doc.equation_count(), 2);
    assert_eq!(doc.sketches().len(), 1);
    assert!(!doc.is_editing_sketch());
}

#[test]
fn orientation_order_binds_same_edges_as_creation_order() {
    let recipe = MacroRecipe {
        rectangle: Some(RectangleSpec {
            segment_order: SegmentOrder::Orientation,
            ..Default::default()
        }),
        ..Default::default()
    };
    let mut host = MemoryHost::with_document(MemoryDocument::default());
    MacroRunner::new(recipe).run(&mut host).unwrap();

    let doc = host.document().unwrap();
    assert_eq!(doc.equations()[2], "\"D1@Sketch1@Part1.SLDPRT\" = \"BaseLength\"");
    assert_eq!(doc.equations()[3], "\"D2@Sketch1@Part1.SLDPRT\" = \"BaseHeight\"");
}

#[test]
fn earlier_changes_survive_a_later_failure() {
    let doc = MemoryDocument::default().with_faults(Faults {
        unselectable_segments: vec![0],
        ..Default::default()
    });
    let (host, report) = run_default(doc);
    let doc = host.document().unwrap();

    assert_eq!(report.unwrap().failures().count(), 1);
    assert_eq!(doc.equation_count(), 2);
    assert!(doc.configuration("pla").is_some());
    assert!(host.messages().contains(&"Could not select line1".to_string()));
}
