use crate::*;

fn sample() -> Result<Vec<u8>> {
    // {"name": "a", "tags": [1, 2, 3], "none": nil}
    let mut w = Writer::new();
    w.begin_map()?;
    w.str("name")?;
    w.str("a")?;
    w.str("tags")?;
    w.begin_array()?;
    w.u8(1)?;
    w.u16(2)?;
    w.i64(3)?;
    w.complete_array()?;
    w.str("none")?;
    w.nil()?;
    w.complete_map()?;
    w.finish()
}

// ============================================================================
//  WRITER
// ============================================================================

#[test]
fn test_scalar_layout() -> Result<()> {
    let mut w = Writer::new();
    w.u16(0x0102)?;
    let bytes = w.finish()?;
    assert_eq!(bytes, vec![Tag::U16 as u8, 0x02, 0x01]);
    Ok(())
}

#[test]
fn test_container_headers_are_patched() -> Result<()> {
    let mut w = Writer::new();
    w.begin_array()?;
    w.bool(true)?;
    w.nil()?;
    w.complete_array()?;
    let bytes = w.finish()?;
    assert_eq!(bytes, vec![Tag::Array as u8, 2, 0, 0, 0, 2, 0, 0, 0, Tag::True as u8, Tag::Nil as u8]);
    Ok(())
}

#[test]
fn test_nested_headers_are_patched_innermost_first() -> Result<()> {
    // {"k": [7]}
    let mut w = Writer::new();
    w.begin_map()?;
    w.str("k")?;
    w.begin_array()?;
    w.u8(7)?;
    w.complete_array()?;
    w.complete_map()?;
    let bytes = w.finish()?;

    let array = vec![Tag::Array as u8, 2, 0, 0, 0, 1, 0, 0, 0, Tag::U8 as u8, 7];
    let mut expected = vec![Tag::Map as u8, 17, 0, 0, 0, 1, 0, 0, 0];
    expected.extend_from_slice(&[Tag::Str as u8, 1, 0, 0, 0, b'k']);
    expected.extend_from_slice(&array);
    assert_eq!(bytes, expected);
    Ok(())
}

#[test]
fn test_finish_with_open_scope_fails() -> Result<()> {
    let mut w = Writer::new();
    w.begin_map()?;
    w.begin_array()?;
    assert_eq!(w.depth(), 2);
    assert_eq!(w.finish(), Err(Error::ScopeStillOpen(2)));
    Ok(())
}

#[test]
fn test_finish_empty_fails() {
    assert_eq!(Writer::new().finish(), Err(Error::EmptyRoot));
}

#[test]
fn test_second_root_rejected() -> Result<()> {
    let mut w = Writer::new();
    w.u8(1)?;
    assert_eq!(w.u8(2), Err(Error::TooManyRoots));
    Ok(())
}

#[test]
fn test_scope_mismatch() -> Result<()> {
    let mut w = Writer::new();
    w.begin_array()?;
    assert_eq!(
        w.complete_map(),
        Err(Error::ScopeMismatch { expected: Scope::Map, actual: Scope::Array })
    );
    w.complete_array()?;
    assert_eq!(w.complete_array(), Err(Error::ScopeUnderflow));
    Ok(())
}

#[test]
fn test_dangling_key() -> Result<()> {
    let mut w = Writer::new();
    w.begin_map()?;
    w.str("key")?;
    assert_eq!(w.complete_map(), Err(Error::DanglingKey));
    w.u8(0)?;
    w.complete_map()?;
    w.finish()?;
    Ok(())
}

// ============================================================================
//  TREE
// ============================================================================

#[test]
fn test_parse_and_navigate() -> Result<()> {
    let tree = Tree::parse(sample()?)?;
    let root = tree.root();
    assert_eq!(root.kind(), Kind::Map);
    assert_eq!(root.len()?, 3);
    assert!(root.contains("name"));
    assert!(!root.contains("missing"));

    let name = root.field("name")?.ok_or(Error::UnexpectedEnd)?;
    assert_eq!(name.str()?, "a");

    let tags = root.field("tags")?.ok_or(Error::UnexpectedEnd)?;
    assert_eq!(tags.len()?, 3);
    let values: Vec<u64> = tags.elements()?.map(|n| n.u64()).collect::<Result<_>>()?;
    assert_eq!(values, vec![1, 2, 3]);
    assert_eq!(tags.element(3).unwrap_err(), Error::OutOfBounds { index: 3, len: 3 });

    let none = root.field("none")?.ok_or(Error::UnexpectedEnd)?;
    assert!(none.is_nil());

    let keys: Vec<&str> = root.entries()?.map(|(k, _)| k.str()).collect::<Result<_>>()?;
    assert_eq!(keys, vec!["name", "tags", "none"]);
    Ok(())
}

#[test]
fn test_integer_width_conversion() -> Result<()> {
    let mut w = Writer::new();
    w.begin_array()?;
    w.u64(300)?;
    w.i8(-1)?;
    w.u8(255)?;
    w.complete_array()?;
    let tree = Tree::parse(w.finish()?)?;
    let root = tree.root();

    assert_eq!(root.element(0)?.u16()?, 300);
    assert_eq!(root.element(0)?.i32()?, 300);
    assert_eq!(root.element(0)?.u8(), Err(Error::OutOfRange("u8")));
    assert_eq!(root.element(1)?.i64()?, -1);
    assert_eq!(root.element(1)?.u32(), Err(Error::OutOfRange("u32")));
    assert_eq!(root.element(2)?.i8(), Err(Error::OutOfRange("i8")));
    assert_eq!(root.element(2)?.f64()?, 255.0);
    Ok(())
}

#[test]
fn test_type_mismatch() -> Result<()> {
    let mut w = Writer::new();
    w.str("text")?;
    let tree = Tree::parse(w.finish()?)?;
    assert_eq!(
        tree.root().u32(),
        Err(Error::TypeMismatch { expected: Kind::Uint, found: Kind::Str })
    );
    assert!(tree.root().field("x").is_err());
    assert!(!tree.root().contains("x"));
    Ok(())
}

#[test]
fn test_float_widths() -> Result<()> {
    let mut w = Writer::new();
    w.begin_array()?;
    w.f32(1.5)?;
    w.f64(std::f64::consts::PI)?;
    w.complete_array()?;
    let tree = Tree::parse(w.finish()?)?;
    assert_eq!(tree.root().element(0)?.f32()?, 1.5);
    assert_eq!(tree.root().element(0)?.f64()?, 1.5);
    assert_eq!(tree.root().element(1)?.f64()?, std::f64::consts::PI);
    Ok(())
}

#[test]
fn test_invalid_utf8_detected_on_read() -> Result<()> {
    let mut w = Writer::new();
    w.str("ok")?;
    let mut bytes = w.finish()?;
    let last = bytes.len() - 1;
    bytes[last] = 0xFF;

    // Parsing succeeds; the string is only validated when read.
    let tree = Tree::parse(bytes)?;
    assert_eq!(tree.root().kind(), Kind::Str);
    assert_eq!(tree.root().str(), Err(Error::InvalidUtf8));
    Ok(())
}

// ============================================================================
//  MALFORMED INPUT
// ============================================================================

#[test]
fn test_truncated_input() -> Result<()> {
    let bytes = sample()?;
    for cut in 0..bytes.len() {
        assert!(Tree::parse(&bytes[..cut]).is_err(), "prefix of {} bytes parsed", cut);
    }
    Ok(())
}

#[test]
fn test_trailing_bytes() {
    assert_eq!(
        Tree::parse(vec![Tag::Nil as u8, Tag::Nil as u8]).unwrap_err(),
        Error::TrailingBytes(1)
    );
}

#[test]
fn test_invalid_tag() {
    assert_eq!(Tree::parse(vec![0x7F]).unwrap_err(), Error::InvalidTag(0x7F));
}

#[test]
fn test_count_mismatch() {
    // Array claiming 3 items with a single nil in the body.
    let bytes = vec![Tag::Array as u8, 1, 0, 0, 0, 3, 0, 0, 0, Tag::Nil as u8];
    assert_eq!(
        Tree::parse(bytes).unwrap_err(),
        Error::CountMismatch { declared: 3, found: 1 }
    );
}

#[test]
fn test_depth_limit() -> Result<()> {
    let mut w = Writer::new();
    for _ in 0..=MAX_DEPTH {
        w.begin_array()?;
    }
    for _ in 0..=MAX_DEPTH {
        w.complete_array()?;
    }
    assert_eq!(Tree::parse(w.finish()?).unwrap_err(), Error::TooDeep);
    Ok(())
}
