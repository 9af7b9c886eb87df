use amber_core::{persistent, to_string, ConvertError, Graph, MemoryStore, Persist, PersistError, Persister};

#[derive(Debug, Clone, PartialEq, Persist)]
enum Mode {
    Fast,
    #[persist(rename = "slow-mode")]
    Slow,
}

#[derive(Debug, PartialEq, Persist)]
struct Settings {
    name: String,
    retries: u32,
    mode: Mode,
    tags: Vec<String>,
    limit: Option<f64>,
    #[persist(skip)]
    cache: Vec<u8>,
    #[persist(rename = "type")]
    kind: String,
}

#[derive(Debug, PartialEq, Persist)]
struct Pair(i64, String);

#[derive(Debug, PartialEq, Persist)]
#[persist(rename = "marker")]
struct Marker;

#[persistent]
#[derive(PartialEq)]
struct Wrapped<T> {
    inner: T,
}

fn settings() -> Settings {
    Settings {
        name: "amber".to_string(),
        retries: 3,
        mode: Mode::Slow,
        tags: vec!["a".to_string(), "b".to_string()],
        limit: None,
        cache: vec![1, 2, 3],
        kind: "local".to_string(),
    }
}

#[test]
fn struct_renders_as_record() {
    let mut graph = Graph::new();
    let root = settings().store(&mut graph);
    let text = to_string(&graph, root, None).unwrap();
    assert_eq!(
        text,
        "#s(Settings name \"amber\" retries 3 mode 'slow-mode tags [\"a\" \"b\"] limit nil type \"local\")\n"
    );
}

#[test]
fn struct_roundtrip_skips_fields() {
    let mut persister = Persister::new(MemoryStore::new());
    persister.save_value(&settings(), "settings", None).unwrap();

    let restored: Settings = persister.restore_value("settings").unwrap();
    assert_eq!(restored.cache, Vec::<u8>::new());
    assert_eq!(Settings { cache: vec![1, 2, 3], ..restored }, settings());
}

#[test]
fn tuple_and_unit_structs() {
    let mut graph = Graph::new();
    let pair = Pair(-4, "four".to_string()).store(&mut graph);
    let marker = Marker.store(&mut graph);

    assert_eq!(to_string(&graph, pair, None).unwrap(), "#s(Pair _0 -4 _1 \"four\")\n");
    assert_eq!(to_string(&graph, marker, None).unwrap(), "#s(marker)\n");

    assert_eq!(Pair::load(&graph, pair).unwrap(), Pair(-4, "four".to_string()));
    assert_eq!(Marker::load(&graph, marker).unwrap(), Marker);
}

#[test]
fn generic_struct() {
    let value = Wrapped {
        inner: vec![Mode::Fast, Mode::Slow],
    };

    let mut persister = Persister::new(MemoryStore::new());
    persister.save_value(&value, "wrapped", Some("modes")).unwrap();
    let restored: Wrapped<Vec<Mode>> = persister.restore_value("wrapped").unwrap();
    assert_eq!(restored, value.clone());
}

#[test]
fn unknown_variant() {
    let mut graph = Graph::new();
    let id = graph.symbol("Medium");
    let err = Mode::load(&graph, id).unwrap_err();
    assert!(matches!(err, ConvertError::UnknownVariant(name) if name == "Medium"));
}

#[test]
fn wrong_record() {
    let mut graph = Graph::new();
    let root = Pair(1, "one".to_string()).store(&mut graph);
    let err = Settings::load(&graph, root).unwrap_err();
    assert!(matches!(err, ConvertError::WrongRecord { .. }));
}

#[test]
fn missing_field_on_restore() {
    let store = MemoryStore::new();
    amber_core::ArtifactStore::write_all(&store, "partial", b"#s(Pair _0 1)").unwrap();
    let mut persister = Persister::new(store);

    let err = persister.restore_value::<Pair>("partial").unwrap_err();
    assert!(matches!(
        err,
        PersistError::Convert(ConvertError::MissingField { ref field, .. }) if field == "_1"
    ));
}
