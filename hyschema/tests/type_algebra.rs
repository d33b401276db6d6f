use hyschema::{
    Error, Kind, Value,
    types::{
        ArrayType, HashType, Length, array, attrs, bounded,
        builtin::{any, int, num, string},
        hash, intersection, is, is_a, maybe, predicate, responds, union, xor,
    },
    utils::{AttributeMismatch, Capability},
    value::ValueMap,
};

fn list(items: impl IntoIterator<Item = i64>) -> Value {
    Value::List(items.into_iter().map(Value::Int).collect())
}

#[test]
fn int_scenario() {
    assert!(int().test(&Value::Int(5)));
    assert!(!int().test(&Value::from("5")));
    assert_eq!(int().from_string("5"), Ok(Value::Int(5)));
}

#[test]
fn array_of_ints_from_string() {
    let ty = array(int());
    assert_eq!(ty.from_string("1,2,3"), Ok(list([1, 2, 3])));

    let err = ty.from_string("1,a,3").unwrap_err();
    assert!(err.is_parse(), "expected a parse error, got {:?}", err);
}

#[test]
fn xor_scenario() {
    let ty = xor([is(1), is(2)]);
    assert!(ty.test(&Value::Int(1)));
    assert!(ty.test(&Value::Int(2)));
    assert!(!ty.test(&Value::Int(3)));
}

#[test]
fn xor_of_overlapping_bounds() {
    let ty = xor([
        bounded(Some(Value::Int(0)), Some(Value::Int(10))),
        bounded(Some(Value::Int(5)), Some(Value::Int(15))),
    ]);
    assert!(ty.test(&Value::Int(2)));
    assert!(!ty.test(&Value::Int(7)), "both members accept 7");
    assert!(ty.test(&Value::Int(12)));
    assert!(!ty.test(&Value::Int(20)));
}

#[test]
fn bounded_edges() {
    let ty = bounded(Some(Value::Int(0)), Some(Value::Int(0)));
    assert!(ty.test(&Value::Int(0)));
    assert!(!ty.test(&Value::Int(-1)));
    assert!(!ty.test(&Value::Int(1)));
    assert!(ty.test(&Value::Float(0.0)));
    assert!(!ty.test(&Value::from("0")));
}

#[test]
fn bounded_strings_use_lexical_order() {
    let ty = bounded(Some(Value::from("b")), None);
    assert!(ty.test(&Value::from("banana")));
    assert!(!ty.test(&Value::from("apple")));
    assert_eq!(ty.from_string("cherry"), Ok(Value::from("cherry")));
}

#[test]
fn check_with_a_custom_formatter() {
    let err = int()
        .check_with(Value::from("x"), |ty, value| format!("{} wanted, got {}", ty, value))
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Value \"x\" does not satisfy type `int`: int wanted, got \"x\""
    );
}

#[test]
fn attrs_report_the_failing_attribute() {
    let ty = attrs([("len", bounded(Some(Value::Int(2)), None))]);
    let short = Value::List(vec![Value::Int(1)]);

    match ty.check(short).unwrap_err() {
        Error::Validation { attribute, .. } => assert_eq!(
            attribute,
            Some(AttributeMismatch {
                name: "len".to_string(),
                expected: bounded(Some(Value::Int(2)), None).name(),
                actual: Some("1".to_string()),
            })
        ),
        other => panic!("unexpected error {:?}", other),
    }

    match ty.check(Value::Int(3)).unwrap_err() {
        Error::Validation { attribute, .. } => {
            assert_eq!(attribute.and_then(|a| a.actual), None)
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn attrs_read_map_keys() {
    let ty = attrs([("host", string()), ("port", int())]);
    let mut map = ValueMap::new();
    map.insert(Value::from("host"), Value::from("localhost"));
    map.insert(Value::from("port"), Value::Int(8080));
    assert!(ty.test(&Value::Map(map.clone())));

    map.insert(Value::from("port"), Value::from("8080"));
    assert!(!ty.test(&Value::Map(map)));
}

#[test]
fn responds_invokes_messages() {
    let ty = responds([("abs", bounded(Some(Value::Int(3)), None))], true);
    assert!(ty.test(&Value::Int(-4)));
    assert!(!ty.test(&Value::Int(2)));
    assert!(!ty.test(&Value::from("no abs")));
}

#[test]
fn sized_containers() {
    let ty: hyschema::Type = ArrayType::new().item(int()).length(Length::exactly(2)).into();
    assert!(ty.test(&list([1, 2])));
    assert!(!ty.test(&list([1, 2, 3])));
    assert!(!ty.test(&Value::List(vec![Value::Int(1), Value::from("2")])));

    let scores: hyschema::Type = HashType::new().key(string()).value(num()).into();
    let mut map = ValueMap::new();
    map.insert(Value::from("a"), Value::Float(1.5));
    assert!(scores.test(&Value::Map(map.clone())));
    map.insert(Value::Int(1), Value::Int(1));
    assert!(!scores.test(&Value::Map(map)));
}

#[test]
fn unconstrained_containers_are_kind_checks() {
    assert!(hash(any(), any()).test(&Value::Map(ValueMap::new())));
    let plain: hyschema::Type = ArrayType::new().into();
    assert!(plain.test(&Value::List(vec![Value::Null, Value::from("x")])));
    assert!(!plain.test(&Value::Map(ValueMap::new())));
}

#[test]
fn maybe_is_a_union_with_null() {
    let ty = maybe(int());
    assert!(ty.test(&Value::Null));
    assert!(ty.test(&Value::Int(1)));
    assert!(!ty.test(&Value::from("1")));
    assert_eq!(ty.from_string("7"), Ok(Value::Int(7)));
    assert_eq!(ty.from_string("null"), Ok(Value::Null));
}

#[test]
fn combinators_parse_with_the_first_accepted_member() {
    let ty = union([int(), string()]);
    assert_eq!(ty.from_string("12"), Ok(Value::Int(12)));
    assert_eq!(ty.from_string("twelve"), Ok(Value::from("twelve")));

    let positive_even = intersection([
        int(),
        predicate(|v| matches!(v, Value::Int(i) if i % 2 == 0)),
    ]);
    assert_eq!(positive_even.from_string("4"), Ok(Value::Int(4)));
    assert!(positive_even.from_string("3").unwrap_err().is_parse());
}

#[test]
fn missing_capabilities_are_not_validation_errors() {
    let ty = predicate(|_| true);
    assert!(!ty.has_from_string());
    assert_eq!(
        ty.from_string("x"),
        Err(Error::Capability {
            type_name: ty.name(),
            capability: Capability::FromString,
        })
    );
}

#[test]
fn kinds_are_parsed_by_name() {
    let kind: Kind = "number".parse().unwrap();
    let ty = is_a(kind);
    assert!(ty.test(&Value::Int(1)));
    assert!(ty.test(&Value::Float(1.5)));
    assert!(!ty.test(&Value::Bool(true)));
}

#[test]
fn explicit_hooks() {
    let csv = array(string())
        .named("csv")
        .with_to_data(|v| match v {
            Value::List(items) => Ok(Value::Str(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            )),
            other => Ok(other.clone()),
        });

    assert!(csv.has_to_data());
    assert_eq!(
        csv.to_data(&Value::List(vec![Value::from("a"), Value::from("b")])),
        Ok(Value::from("a,b"))
    );
    assert!(!int().has_to_data());
    assert_eq!(int().to_data(&Value::Int(1)), Ok(Value::Int(1)));
}
