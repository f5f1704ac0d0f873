use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::*;

#[derive(Debug, Clone, PartialEq)]
struct User {
    name: String,
    tags: Vec<u32>,
}

impl Encode for User {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let mut map = enc.map()?;
        map.str("name", &self.name)?;
        map.encode("tags", &self.tags)?;
        map.finish()
    }
}

impl Decode for User {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut map = dec.map()?;
        Ok(User { name: map.string("name")?, tags: map.decode("tags")? })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Profile {
    user: User,
}

impl Encode for Profile {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let mut map = enc.map()?;
        map.encode("user", &self.user)?;
        map.finish()
    }
}

impl Decode for Profile {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut map = dec.map()?;
        Ok(Profile { user: map.decode("user")? })
    }
}

fn profile() -> Profile {
    Profile { user: User { name: "a".into(), tags: vec![1, 2, 3] } }
}

fn roundtrip<T: Encode + Decode>(value: &T) -> Result<T> {
    let bytes = Encoder::encode(value)?;
    Decoder::decode(bytes)
}

// ============================================================================
//  ROUND TRIPS
// ============================================================================

#[derive(Debug, PartialEq)]
struct Scalars {
    flag: bool,
    u8s: [u8; 3],
    u16s: [u16; 3],
    u32s: [u32; 3],
    u64s: [u64; 3],
    i8s: [i8; 4],
    i16s: [i16; 4],
    i32s: [i32; 4],
    i64s: [i64; 4],
    f32s: [f32; 3],
    f64s: [f64; 3],
    int: isize,
    uint: usize,
}

impl Encode for Scalars {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let mut map = enc.map()?;
        map.bool("flag", self.flag)?;
        let mut arr = map.array("u8")?;
        for v in self.u8s { arr.u8(v)?; }
        arr.finish()?;
        let mut arr = map.array("u16")?;
        for v in self.u16s { arr.u16(v)?; }
        arr.finish()?;
        let mut arr = map.array("u32")?;
        for v in self.u32s { arr.u32(v)?; }
        arr.finish()?;
        let mut arr = map.array("u64")?;
        for v in self.u64s { arr.u64(v)?; }
        arr.finish()?;
        let mut arr = map.array("i8")?;
        for v in self.i8s { arr.i8(v)?; }
        arr.finish()?;
        let mut arr = map.array("i16")?;
        for v in self.i16s { arr.i16(v)?; }
        arr.finish()?;
        let mut arr = map.array("i32")?;
        for v in self.i32s { arr.i32(v)?; }
        arr.finish()?;
        let mut arr = map.array("i64")?;
        for v in self.i64s { arr.i64(v)?; }
        arr.finish()?;
        let mut arr = map.array("f32")?;
        for v in self.f32s { arr.f32(v)?; }
        arr.finish()?;
        let mut arr = map.array("f64")?;
        for v in self.f64s { arr.f64(v)?; }
        arr.finish()?;
        map.int("int", self.int)?;
        map.uint("uint", self.uint)?;
        map.finish()
    }
}

impl Decode for Scalars {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut map = dec.map()?;
        let flag = map.bool("flag")?;

        let mut arr = map.array("u8")?;
        let u8s = [arr.u8()?, arr.u8()?, arr.u8()?];
        drop(arr);
        let mut arr = map.array("u16")?;
        let u16s = [arr.u16()?, arr.u16()?, arr.u16()?];
        drop(arr);
        let mut arr = map.array("u32")?;
        let u32s = [arr.u32()?, arr.u32()?, arr.u32()?];
        drop(arr);
        let mut arr = map.array("u64")?;
        let u64s = [arr.u64()?, arr.u64()?, arr.u64()?];
        drop(arr);
        let mut arr = map.array("i8")?;
        let i8s = [arr.i8()?, arr.i8()?, arr.i8()?, arr.i8()?];
        drop(arr);
        let mut arr = map.array("i16")?;
        let i16s = [arr.i16()?, arr.i16()?, arr.i16()?, arr.i16()?];
        drop(arr);
        let mut arr = map.array("i32")?;
        let i32s = [arr.i32()?, arr.i32()?, arr.i32()?, arr.i32()?];
        drop(arr);
        let mut arr = map.array("i64")?;
        let i64s = [arr.i64()?, arr.i64()?, arr.i64()?, arr.i64()?];
        drop(arr);
        let mut arr = map.array("f32")?;
        let f32s = [arr.f32()?, arr.f32()?, arr.f32()?];
        drop(arr);
        let mut arr = map.array("f64")?;
        let f64s = [arr.f64()?, arr.f64()?, arr.f64()?];
        drop(arr);

        let int = map.int("int")?;
        let uint = map.uint("uint")?;
        Ok(Scalars { flag, u8s, u16s, u32s, u64s, i8s, i16s, i32s, i64s, f32s, f64s, int, uint })
    }
}

#[test]
fn test_scalar_boundaries_roundtrip() -> Result<()> {
    let value = Scalars {
        flag: true,
        u8s: [0, 1, u8::MAX],
        u16s: [0, 1, u16::MAX],
        u32s: [0, 1, u32::MAX],
        u64s: [0, 1, u64::MAX],
        i8s: [0, -1, i8::MIN, i8::MAX],
        i16s: [0, -1, i16::MIN, i16::MAX],
        i32s: [0, -1, i32::MIN, i32::MAX],
        i64s: [0, -1, i64::MIN, i64::MAX],
        f32s: [0.0, -1.5, f32::MAX],
        f64s: [std::f64::consts::E, f64::MIN_POSITIVE, f64::INFINITY],
        int: isize::MIN,
        uint: usize::MAX,
    };
    assert_eq!(roundtrip(&value)?, value);
    Ok(())
}

#[test]
fn test_strings_roundtrip() -> Result<()> {
    let strings = vec![String::new(), "hi".to_string(), "héllo wörld ✓ 日本".to_string()];
    assert_eq!(roundtrip(&strings)?, strings);
    Ok(())
}

#[test]
fn test_option_is_nil() -> Result<()> {
    let values: Vec<Option<i16>> = vec![Some(-1), None, Some(i16::MAX)];
    assert_eq!(roundtrip(&values)?, values);

    let bytes = Encoder::encode(&None::<u8>)?;
    assert!(Tree::parse(bytes).map_err(Error::Parse)?.root().is_nil());
    Ok(())
}

#[test]
fn test_nested_structure_roundtrip() -> Result<()> {
    let value = profile();
    assert_eq!(roundtrip(&value)?, value);

    // The same bytes seen as a dynamic value.
    let dynamic: Value = Decoder::decode(Encoder::encode(&value)?)?;
    let expected = Value::Map(vec![(
        "user".into(),
        Value::Map(vec![
            ("name".into(), Value::from("a")),
            ("tags".into(), Value::Array(vec![Value::Uint(1), Value::Uint(2), Value::Uint(3)])),
        ]),
    )]);
    assert_eq!(dynamic, expected);
    assert_eq!(roundtrip(&dynamic)?, dynamic);
    Ok(())
}

#[test]
fn test_value_three_levels_deep() -> Result<()> {
    let value = Value::Array(vec![
        Value::Map(vec![
            ("deep".into(), Value::Array(vec![Value::Map(vec![("leaf".into(), Value::Int(-7))])])),
            ("nil".into(), Value::Nil),
        ]),
        Value::Bool(false),
        Value::F32(0.25),
        Value::F64(-2.5),
    ]);
    assert_eq!(roundtrip(&value)?, value);
    Ok(())
}

#[test]
fn test_collections_roundtrip() -> Result<()> {
    let mut hashed: HashMap<String, Vec<u64>> = HashMap::new();
    hashed.insert("a".into(), vec![1, 2]);
    hashed.insert("b".into(), vec![]);
    assert_eq!(roundtrip(&hashed)?, hashed);

    let mut ordered: BTreeMap<String, Option<String>> = BTreeMap::new();
    ordered.insert("x".into(), Some("y".into()));
    ordered.insert("z".into(), None);
    assert_eq!(roundtrip(&ordered)?, ordered);

    let boxed: Box<u32> = Box::new(9);
    assert_eq!(roundtrip(&boxed)?, boxed);
    Ok(())
}

// ============================================================================
//  CONTAINER BALANCE
// ============================================================================

struct FailsMidway;

impl Encode for FailsMidway {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let mut map = enc.map()?;
        map.u8("ok", 1)?;
        let mut arr = map.array("items")?;
        arr.u8(1)?;
        let mut inner = arr.map()?;
        inner.bool("deep", true)?;
        Err(Error::custom("boom"))
    }
}

#[test]
fn test_encode_error_completes_open_containers() -> Result<()> {
    let mut enc = Encoder::new();
    assert_eq!(FailsMidway.encode(&mut enc), Err(Error::custom("boom")));
    assert_eq!(enc.depth(), 0);

    // Every container was completed, so the partial output is still well formed.
    let tree = Tree::parse(enc.finish()?).map_err(Error::Parse)?;
    let items = tree.root().field("items").map_err(Error::Parse)?;
    assert_eq!(items.map(|n| n.len()), Some(Ok(2)));
    Ok(())
}

struct Refuses;

impl Encode for Refuses {
    fn encode(&self, _enc: &mut Encoder) -> Result<()> {
        Err(Error::custom("refused"))
    }
}

#[test]
fn test_error_between_key_and_value_is_reported_at_finish() {
    let mut enc = Encoder::new();
    let result = (|| {
        let mut map = enc.map()?;
        map.encode("bad", &Refuses)?;
        map.finish()
    })();
    assert_eq!(result, Err(Error::custom("refused")));
    assert_eq!(enc.depth(), 0);
    assert_eq!(enc.finish(), Err(Error::Encoding(treepack::Error::DanglingKey)));
}

#[test]
fn test_dropped_guard_completes_container() -> Result<()> {
    let mut enc = Encoder::new();
    {
        let mut arr = enc.array()?;
        arr.str("no explicit finish")?;
    }
    assert_eq!(enc.depth(), 0);
    let items: Vec<String> = Decoder::decode(enc.finish()?)?;
    assert_eq!(items, vec!["no explicit finish".to_string()]);
    Ok(())
}

#[test]
fn test_encoder_finish_requires_a_value() {
    assert_eq!(Encoder::new().finish(), Err(Error::Encoding(treepack::Error::EmptyRoot)));
}

#[test]
fn test_decode_error_pops_every_frame() -> Result<()> {
    let bad = Value::Map(vec![(
        "user".into(),
        Value::Map(vec![
            ("name".into(), Value::from("a")),
            ("tags".into(), Value::Array(vec![Value::Uint(1), Value::from("x"), Value::Uint(3)])),
        ]),
    )]);
    let tree = Tree::parse(Encoder::encode(&bad)?).map_err(Error::Parse)?;
    let mut dec = Decoder::new(&tree);

    let err = Profile::decode(&mut dec).unwrap_err();
    assert_eq!(dec.depth(), 1);
    assert_eq!(err.path().map(|p| p.to_string()), Some("user.tags[1]".to_string()));
    assert_eq!(
        err,
        Error::DataCorrupted {
            path: Path(vec![Segment::Key("user".into()), Segment::Key("tags".into()), Segment::Index(1)]),
            cause: Corruption::Codec(treepack::Error::TypeMismatch { expected: Kind::Uint, found: Kind::Str }),
        }
    );
    Ok(())
}

// ============================================================================
//  DATA CORRUPTION
// ============================================================================

#[test]
fn test_missing_key_is_reported_by_name() -> Result<()> {
    let bytes = Encoder::encode(&Value::Map(vec![("name".into(), Value::from("a"))]))?;
    let err = Decoder::decode::<User>(bytes).unwrap_err();
    assert_eq!(
        err,
        Error::DataCorrupted { path: Path(vec![Segment::Key("tags".into())]), cause: Corruption::Missing }
    );
    Ok(())
}

#[test]
fn test_invalid_text_is_data_corrupted() -> Result<()> {
    let mut bytes = Encoder::encode(&User { name: "ok".into(), tags: vec![] })?;
    let at = bytes.windows(2).position(|w| w == b"ok").ok_or(Error::custom("no value"))?;
    bytes[at] = 0xFF;

    let err = Decoder::decode::<User>(bytes).unwrap_err();
    assert_eq!(
        err,
        Error::DataCorrupted {
            path: Path(vec![Segment::Key("name".into())]),
            cause: Corruption::Codec(treepack::Error::InvalidUtf8),
        }
    );
    Ok(())
}

#[test]
fn test_malformed_bytes_are_parse_errors() {
    assert_eq!(
        Decoder::decode::<u8>(vec![0xEE]),
        Err(Error::Parse(treepack::Error::InvalidTag(0xEE)))
    );
}

#[test]
fn test_wrong_container_kind() -> Result<()> {
    let bytes = Encoder::encode(&vec![1u8])?;
    let err = Decoder::decode::<User>(bytes).unwrap_err();
    assert!(matches!(
        err,
        Error::DataCorrupted { cause: Corruption::Codec(treepack::Error::TypeMismatch { expected: Kind::Map, .. }), .. }
    ));
    Ok(())
}

#[test]
fn test_narrowing_out_of_range() -> Result<()> {
    let bytes = Encoder::encode(&300u32)?;
    assert_eq!(
        Decoder::decode::<u8>(bytes),
        Err(Error::DataCorrupted { path: Path::default(), cause: Corruption::Codec(treepack::Error::OutOfRange("u8")) })
    );
    Ok(())
}

// ============================================================================
//  VIEWS
// ============================================================================

#[test]
fn test_map_view_queries() -> Result<()> {
    let bytes = Encoder::encode(&Value::Map(vec![
        ("present".into(), Value::Uint(5)),
        ("empty".into(), Value::Nil),
    ]))?;
    let tree = Tree::parse(bytes).map_err(Error::Parse)?;
    let mut dec = Decoder::new(&tree);
    let mut map = dec.map()?;

    assert_eq!(map.len(), 2);
    assert_eq!(map.keys()?, vec!["present", "empty"]);
    assert!(map.contains("present"));
    assert!(!map.contains("absent"));
    assert!(map.is_nil("empty")?);
    assert!(!map.is_nil("present")?);
    assert!(map.is_nil("absent").is_err());
    assert_eq!(map.decode_opt::<u8>("present")?, Some(5));
    assert_eq!(map.decode_opt::<u8>("empty")?, None);
    assert_eq!(map.decode_opt::<u8>("absent")?, None);
    assert_eq!(map.u64("present")?, 5);
    drop(map);
    assert_eq!(dec.depth(), 1);
    Ok(())
}

#[test]
fn test_array_view_cursor() -> Result<()> {
    let bytes = Encoder::encode(&Value::Array(vec![Value::Nil, Value::Int(-3)]))?;
    let tree = Tree::parse(bytes).map_err(Error::Parse)?;
    let mut dec = Decoder::new(&tree);
    let mut arr = dec.array()?;

    assert_eq!(arr.count(), 2);
    assert!(arr.is_nil()?);
    assert_eq!(arr.index(), 1);
    assert!(!arr.is_nil()?);
    assert_eq!(arr.index(), 1);
    assert_eq!(arr.i32()?, -3);
    assert!(arr.is_at_end());

    let err = arr.u8().unwrap_err();
    assert_eq!(
        err,
        Error::DataCorrupted {
            path: Path(vec![Segment::Index(2)]),
            cause: Corruption::Codec(treepack::Error::OutOfBounds { index: 2, len: 2 }),
        }
    );
    Ok(())
}

#[test]
fn test_nested_views_push_and_pop() -> Result<()> {
    let tree = Tree::parse(Encoder::encode(&profile())?).map_err(Error::Parse)?;
    let mut dec = Decoder::new(&tree);
    {
        let mut root = dec.map()?;
        let mut user = root.map("user")?;
        let mut tags = user.array("tags")?;
        assert_eq!(tags.u32()?, 1);
        assert_eq!(tags.super_decoder().depth(), 4);
        assert_eq!(tags.super_decoder().coding_path().to_string(), "user.tags");
    }
    assert_eq!(dec.depth(), 1);
    Ok(())
}

// ============================================================================
//  SUPER ENCODER / DECODER
// ============================================================================

#[derive(Debug, PartialEq)]
struct Base {
    id: u32,
}

impl Encode for Base {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let mut map = enc.map()?;
        map.u32("id", self.id)?;
        map.finish()
    }
}

impl Decode for Base {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let map = dec.map()?;
        Ok(Base { id: map.u32("id")? })
    }
}

#[derive(Debug, PartialEq)]
struct Derived {
    base: Base,
    label: String,
}

impl Encode for Derived {
    fn encode(&self, enc: &mut Encoder) -> Result<()> {
        let mut map = enc.map()?;
        map.str("label", &self.label)?;
        self.base.encode(map.super_encoder())?;
        map.finish()
    }
}

impl Decode for Derived {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut map = dec.map()?;
        let base = Base::decode(map.super_decoder())?;
        Ok(Derived { base, label: map.string("label")? })
    }
}

#[test]
fn test_super_encoder_merges_into_enclosing_map() -> Result<()> {
    let value = Derived { base: Base { id: 7 }, label: "seven".into() };
    let bytes = Encoder::encode(&value)?;

    let flat: Value = Decoder::decode(bytes.clone())?;
    assert_eq!(
        flat,
        Value::Map(vec![("label".into(), Value::from("seven")), ("id".into(), Value::Uint(7))])
    );
    assert_eq!(Decoder::decode::<Derived>(bytes)?, value);
    Ok(())
}

#[test]
fn test_super_encoder_rejects_mismatched_container() -> Result<()> {
    let mut enc = Encoder::new();
    let mut arr = enc.array()?;
    let err = Base { id: 1 }.encode(arr.super_encoder()).unwrap_err();
    assert!(matches!(err, Error::Encoding(treepack::Error::ScopeMismatch { .. })));
    arr.finish()?;
    assert_eq!(enc.depth(), 0);
    Ok(())
}

// ============================================================================
//  DERIVE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct Account {
    name: String,
    tags: Vec<u32>,
    nick: Option<String>,
    r#type: u8,
    owner: Profile,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct Pair(i16, String);

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct Marker;

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct Wrapper<T> {
    inner: T,
}

#[test]
fn test_derive_named_fields_roundtrip_as_map() -> Result<()> {
    let account = Account {
        name: "a".into(),
        tags: vec![1, 2, 3],
        nick: None,
        r#type: 4,
        owner: Profile { user: User { name: "b".into(), tags: vec![] } },
    };
    assert_eq!(roundtrip(&account)?, account);

    let value: Value = Decoder::decode(Encoder::encode(&account)?)?;
    assert_eq!(value.get("name"), Some(&Value::from("a")));
    assert_eq!(value.get("nick"), Some(&Value::Nil));
    assert_eq!(value.get("type"), Some(&Value::Uint(4)));
    Ok(())
}

#[test]
fn test_derive_tuple_and_unit_structs() -> Result<()> {
    let pair = Pair(-3, "x".into());
    assert_eq!(roundtrip(&pair)?, pair);
    let value: Value = Decoder::decode(Encoder::encode(&pair)?)?;
    assert_eq!(value, Value::Array(vec![Value::Int(-3), Value::from("x")]));

    assert_eq!(roundtrip(&Marker)?, Marker);
    assert_eq!(Encoder::encode(&Marker)?, Encoder::encode(&())?);
    Ok(())
}

#[test]
fn test_derive_generic_struct() -> Result<()> {
    let wrapped = Wrapper { inner: Pair(1, "y".into()) };
    assert_eq!(roundtrip(&wrapped)?, wrapped);
    Ok(())
}

#[test]
fn test_derive_tuple_count_mismatch_is_corruption() -> Result<()> {
    let bytes = Encoder::encode(&vec![1i16, 2, 3])?;
    let err = Decoder::decode::<Pair>(bytes).unwrap_err();
    match err {
        Error::DataCorrupted { cause: Corruption::Invalid(msg), .. } => {
            assert_eq!(msg, "expected 2 elements, found 3");
        }
        other => panic!("unexpected {:?}", other),
    }
    Ok(())
}

#[test]
fn test_derive_missing_field_reports_path() -> Result<()> {
    let bytes = Encoder::encode(&Value::Map(vec![("inner".into(), Value::Map(vec![]))]))?;
    let err = Decoder::decode::<Wrapper<Account>>(bytes).unwrap_err();
    assert_eq!(err.path().map(|p| p.to_string()), Some("inner.name".to_string()));
    Ok(())
}
