use hyschema::{
    PlainDataOptions, PropOptions, SchemaRegistry, Type, Value,
    types::{
        array, bounded,
        builtin::{any, boolean, float, int, non_empty_str, num, pos_int, string},
        hash, intersection, is, maybe, union, xor,
    },
    value::ValueMap,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const SAMPLES: usize = 500;

fn random_scalar(rng: &mut impl Rng) -> Value {
    match rng.random_range(0..=5) {
        0 => Value::Null,
        1 => Value::Bool(rng.random_bool(0.5)),
        2 => Value::Int(rng.random_range(-20..=20)),
        3 => Value::Float(rng.random_range(-20.0..20.0)),
        4 => Value::Str(
            (0..rng.random_range(0..4))
                .map(|_| rng.random_range(b'a'..=b'e') as char)
                .collect(),
        ),
        5 => Value::Int(rng.random_range(0..=2)),
        _ => unreachable!(),
    }
}

fn random_value(depth: usize, rng: &mut impl Rng) -> Value {
    if depth == 0 || rng.random_bool(0.6) {
        return random_scalar(rng);
    }

    let size = rng.random_range(0..4);
    if rng.random_bool(0.5) {
        Value::List((0..size).map(|_| random_value(depth - 1, rng)).collect())
    } else {
        Value::Map(
            (0..size)
                .map(|_| (random_scalar(rng), random_value(depth - 1, rng)))
                .collect::<ValueMap>(),
        )
    }
}

fn sample_types() -> Vec<Type> {
    vec![
        any(),
        int(),
        pos_int(),
        float(),
        num(),
        boolean(),
        string(),
        non_empty_str(),
        is(1),
        is(Value::Null),
        bounded(Some(Value::Int(-5)), Some(Value::Int(5))),
        bounded(Some(Value::from("b")), None),
        maybe(int()),
        array(int()),
        hash(string(), any()),
        xor([int(), bounded(Some(Value::Int(0)), None)]),
    ]
}

#[test]
fn union_is_disjunction() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);
    let types = sample_types();

    for _ in 0..SAMPLES {
        let a = &types[rng.random_range(0..types.len())];
        let b = &types[rng.random_range(0..types.len())];
        let v = random_value(2, &mut rng);

        assert_eq!(
            union([a, b]).test(&v),
            a.test(&v) || b.test(&v),
            "union({}, {}) on {}",
            a,
            b,
            v
        );
    }
}

#[test]
fn intersection_is_conjunction() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x43);
    let types = sample_types();

    for _ in 0..SAMPLES {
        let a = &types[rng.random_range(0..types.len())];
        let b = &types[rng.random_range(0..types.len())];
        let v = random_value(2, &mut rng);

        assert_eq!(
            intersection([a, b]).test(&v),
            a.test(&v) && b.test(&v),
            "intersection({}, {}) on {}",
            a,
            b,
            v
        );
    }
}

#[test]
fn xor_is_exclusive_disjunction() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x44);
    let types = sample_types();

    for _ in 0..SAMPLES {
        let a = &types[rng.random_range(0..types.len())];
        let b = &types[rng.random_range(0..types.len())];
        let v = random_value(2, &mut rng);

        assert_eq!(xor([a, b]).test(&v), a.test(&v) != b.test(&v));
    }
}

#[test]
fn check_agrees_with_test() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x45);
    let types = sample_types();

    for _ in 0..SAMPLES {
        let ty = &types[rng.random_range(0..types.len())];
        let v = random_value(2, &mut rng);

        match ty.check(v.clone()) {
            Ok(checked) => assert_eq!(checked, v),
            Err(err) => {
                assert!(!ty.test(&v));
                assert!(err.is_validation());
                assert!(ty.explain(&v).is_some());
            }
        }
    }
}

#[test]
fn plain_data_round_trip() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x46);

    let registry = SchemaRegistry::new();
    let tag = registry.define_class("Tag", None).unwrap();
    tag.prop("label", PropOptions::new(string())).unwrap();
    tag.prop("weight", PropOptions::new(maybe(num())).with_default(Value::Null))
        .unwrap();

    let item = registry.define_class("Item", None).unwrap();
    item.prop("id", PropOptions::new(int())).unwrap();
    item.prop("payload", PropOptions::new(any())).unwrap();
    item.prop("tags", PropOptions::new(array(&tag))).unwrap();
    item.prop("main", PropOptions::new(maybe(&tag))).unwrap();

    let options = PlainDataOptions::default();

    for _ in 0..100 {
        let tags: Vec<Value> = (0..rng.random_range(0..3))
            .map(|i| {
                let weight = if rng.random_bool(0.5) {
                    Value::Float(rng.random_range(0..8) as f64 / 4.0)
                } else {
                    Value::Null
                };
                let label = format!("tag{}", i);
                tag.new_instance([("label", Value::from(label)), ("weight", weight)])
                    .map(Value::from)
                    .unwrap()
            })
            .collect();
        let main = tags.first().cloned().unwrap_or(Value::Null);

        let x = item
            .new_instance([
                ("id", Value::Int(rng.random_range(0..1000))),
                ("payload", random_payload(&mut rng)),
                ("tags", Value::List(tags)),
                ("main", main),
            ])
            .unwrap();

        let data = x.to_plain_data(&options).unwrap();
        let restored = item.from_plain_data(&data).unwrap();
        assert_eq!(restored.to_plain_data(&options).unwrap(), data);

        let text = x.to_json(&options).unwrap();
        let reloaded = registry.unsafe_load_json(&text, "__class__").unwrap();
        assert_eq!(reloaded.to_plain_data(&options).unwrap(), data);
    }
}

/// String-keyed scalars. Floats are multiples of 1/4 so their JSON text is exact.
fn random_payload(rng: &mut impl Rng) -> Value {
    Value::Map(
        (0..rng.random_range(0..4))
            .map(|i| {
                let value = match random_scalar(rng) {
                    Value::Float(f) => Value::Float((f * 4.0).round() / 4.0),
                    other => other,
                };
                (Value::Str(format!("k{}", i)), value)
            })
            .collect::<ValueMap>(),
    )
}
