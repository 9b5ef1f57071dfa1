//! Binary encoding of element graphs.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic            b"ASEG"
//! u32              encoding version (1)
//! u32              string count, then per string: u32 length + UTF-8 bytes
//! u32              element count, then per element:
//!                    u32 class (string index), u32 name (string index), [u8; 16] id
//! per element      u32 attribute count, then per attribute:
//!                    u32 key (string index), u8 type tag, payload
//! ```
//!
//! Element 0 is the root. Type tags: 1 element reference (`i32` index, -1 for
//! none), 2 integer (`i64`), 3 float (`f64`), 4 bool (`u8`), 5 string (u32
//! length + UTF-8), 6 binary (u32 length + bytes). Tag `| 0x40` is an array
//! of that type: u32 count followed by the payloads.

use std::collections::HashMap;

use appstate_core::{Error, Format, Value};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::{Attribute, Element};

/// File magic.
pub const MAGIC: &[u8; 4] = b"ASEG";

/// The only encoding version this build reads and writes.
pub const ENCODING_VERSION: u32 = 1;

const TAG_ELEMENT: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_BOOL: u8 = 4;
const TAG_STRING: u8 = 5;
const TAG_BINARY: u8 = 6;
const ARRAY: u8 = 0x40;

fn malformed(message: impl Into<String>) -> Error {
    Error::malformed(Format::BINARY, message)
}

fn unencodable(message: impl Into<String>) -> Error {
    Error::encode(Format::BINARY, message)
}

// === Encoding ===

#[derive(Default)]
struct StringTable {
    strings: Vec<String>,
    index: HashMap<String, u32>,
}

impl StringTable {
    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        let i = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        i
    }

    fn get(&self, s: &str) -> u32 {
        // Every string is interned before anything is written.
        self.index.get(s).copied().unwrap_or(0)
    }
}

/// Flatten the tree in pre-order, interning every name, class and key.
fn collect<'a>(elem: &'a Element, out: &mut Vec<&'a Element>, strings: &mut StringTable) {
    out.push(elem);
    strings.intern(elem.class());
    strings.intern(elem.name());
    for (key, attr) in elem.attributes() {
        strings.intern(key);
        match attr {
            Attribute::Value(_) => {}
            Attribute::Element(child) => collect(child, out, strings),
            Attribute::ElementArray(children) => {
                for child in children {
                    collect(child, out, strings);
                }
            }
        }
    }
}

fn scalar_tag(value: &Value) -> Result<u8, Error> {
    match value {
        Value::Bool(_) => Ok(TAG_BOOL),
        Value::Integer(_) => Ok(TAG_INT),
        Value::Float(_) => Ok(TAG_FLOAT),
        Value::String(_) => Ok(TAG_STRING),
        Value::Bytes(_) => Ok(TAG_BINARY),
        other => Err(unencodable(format!(
            "{} values cannot be stored in an attribute",
            other.kind()
        ))),
    }
}

fn value_tag(key: &str, value: &Value) -> Result<u8, Error> {
    let Value::Array(items) = value else {
        return scalar_tag(value);
    };
    // Empty arrays carry no type information; store them as binary arrays.
    let Some(first) = items.first() else {
        return Ok(TAG_BINARY | ARRAY);
    };
    let tag = scalar_tag(first)?;
    for item in items {
        if scalar_tag(item)? != tag {
            return Err(unencodable(format!(
                "attribute '{}' mixes {} and {} items",
                key,
                first.kind(),
                item.kind()
            )));
        }
    }
    Ok(tag | ARRAY)
}

fn put_len(buf: &mut BytesMut, len: usize) -> Result<(), Error> {
    let len = u32::try_from(len).map_err(|_| unencodable("length exceeds u32"))?;
    buf.put_u32_le(len);
    Ok(())
}

fn put_scalar(buf: &mut BytesMut, value: &Value) -> Result<(), Error> {
    match value {
        Value::Bool(b) => buf.put_u8(u8::from(*b)),
        Value::Integer(i) => buf.put_i64_le(*i),
        Value::Float(f) => buf.put_f64_le(*f),
        Value::String(s) => {
            put_len(buf, s.len())?;
            buf.put_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            put_len(buf, b.len())?;
            buf.put_slice(b);
        }
        other => {
            return Err(unencodable(format!(
                "{} values cannot be stored in an attribute",
                other.kind()
            )))
        }
    }
    Ok(())
}

/// Encode an element tree. The given element becomes the root.
pub fn encode(root: &Element) -> Result<Bytes, Error> {
    let mut elements = Vec::new();
    let mut strings = StringTable::default();
    collect(root, &mut elements, &mut strings);

    let positions: HashMap<*const Element, i32> = elements
        .iter()
        .enumerate()
        .map(|(i, e)| (*e as *const Element, i as i32))
        .collect();
    let index_of = |e: &Element| positions.get(&(e as *const Element)).copied().unwrap_or(-1);

    let mut buf = BytesMut::new();
    buf.put_slice(MAGIC);
    buf.put_u32_le(ENCODING_VERSION);

    put_len(&mut buf, strings.strings.len())?;
    for s in &strings.strings {
        put_len(&mut buf, s.len())?;
        buf.put_slice(s.as_bytes());
    }

    put_len(&mut buf, elements.len())?;
    for elem in &elements {
        buf.put_u32_le(strings.get(elem.class()));
        buf.put_u32_le(strings.get(elem.name()));
        buf.put_slice(elem.id().as_bytes());
    }

    for elem in &elements {
        put_len(&mut buf, elem.len())?;
        for (key, attr) in elem.attributes() {
            buf.put_u32_le(strings.get(key));
            match attr {
                Attribute::Element(child) => {
                    buf.put_u8(TAG_ELEMENT);
                    buf.put_i32_le(index_of(child));
                }
                Attribute::ElementArray(children) => {
                    buf.put_u8(TAG_ELEMENT | ARRAY);
                    put_len(&mut buf, children.len())?;
                    for child in children {
                        buf.put_i32_le(index_of(child));
                    }
                }
                Attribute::Value(value) => {
                    let tag = value_tag(key, value)?;
                    buf.put_u8(tag);
                    match value {
                        Value::Array(items) => {
                            put_len(&mut buf, items.len())?;
                            for item in items {
                                put_scalar(&mut buf, item)?;
                            }
                        }
                        scalar => put_scalar(&mut buf, scalar)?,
                    }
                }
            }
        }
    }

    tracing::trace!(
        elements = elements.len(),
        bytes = buf.len(),
        "encoded element graph"
    );
    Ok(buf.freeze())
}

// === Decoding ===

/// Bounds-checked reader; `bytes::Buf` panics on underflow.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn need(&self, n: usize, what: &str) -> Result<(), Error> {
        if self.buf.remaining() < n {
            Err(malformed(format!("truncated input while reading {}", what)))
        } else {
            Ok(())
        }
    }

    fn u8(&mut self, what: &str) -> Result<u8, Error> {
        self.need(1, what)?;
        Ok(self.buf.get_u8())
    }

    fn u32(&mut self, what: &str) -> Result<u32, Error> {
        self.need(4, what)?;
        Ok(self.buf.get_u32_le())
    }

    fn i32(&mut self, what: &str) -> Result<i32, Error> {
        self.need(4, what)?;
        Ok(self.buf.get_i32_le())
    }

    fn i64(&mut self, what: &str) -> Result<i64, Error> {
        self.need(8, what)?;
        Ok(self.buf.get_i64_le())
    }

    fn f64(&mut self, what: &str) -> Result<f64, Error> {
        self.need(8, what)?;
        Ok(self.buf.get_f64_le())
    }

    fn bytes(&mut self, n: usize, what: &str) -> Result<&'a [u8], Error> {
        self.need(n, what)?;
        let buf: &'a [u8] = self.buf;
        let (head, tail) = buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// A count prefix, sanity-checked against what could possibly follow.
    fn count(&mut self, what: &str) -> Result<usize, Error> {
        let n = self.u32(what)? as usize;
        if n > self.buf.remaining() {
            return Err(malformed(format!(
                "{} count {} exceeds remaining input",
                what, n
            )));
        }
        Ok(n)
    }

    fn string(&mut self, what: &str) -> Result<String, Error> {
        let len = self.u32(what)? as usize;
        let raw = self.bytes(len, what)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| malformed(format!("{} is not valid UTF-8", what)))
    }
}

enum RawAttr {
    Value(Value),
    Ref(Option<usize>),
    Refs(Vec<usize>),
}

struct RawElement {
    class: String,
    name: String,
    id: Uuid,
    attributes: Vec<(String, RawAttr)>,
}

fn read_scalar(r: &mut Reader<'_>, tag: u8) -> Result<Value, Error> {
    Ok(match tag {
        TAG_INT => Value::Integer(r.i64("integer")?),
        TAG_FLOAT => Value::Float(r.f64("float")?),
        TAG_BOOL => Value::Bool(r.u8("bool")? != 0),
        TAG_STRING => Value::String(r.string("string value")?),
        TAG_BINARY => {
            let len = r.u32("binary length")? as usize;
            Value::Bytes(r.bytes(len, "binary value")?.to_vec())
        }
        other => return Err(malformed(format!("unknown attribute type tag {:#04x}", other))),
    })
}

fn element_ref(raw: i32, count: usize) -> Result<Option<usize>, Error> {
    if raw == -1 {
        return Ok(None);
    }
    usize::try_from(raw)
        .ok()
        .filter(|i| *i < count)
        .map(Some)
        .ok_or_else(|| malformed(format!("dangling element reference {}", raw)))
}

/// Deepest reference chain `decode` follows from the root.
pub const MAX_DEPTH: usize = 256;

/// Elements `decode` may build beyond one per stored element. Shared
/// references are copied into the tree, so this bounds the duplication.
pub const MAX_SHARED: usize = 1 << 16;

/// Resolves raw elements into an owned tree.
struct Builder<'a> {
    raw: &'a [RawElement],
    visiting: Vec<bool>,
    budget: usize,
}

impl<'a> Builder<'a> {
    fn new(raw: &'a [RawElement]) -> Self {
        Self {
            raw,
            visiting: vec![false; raw.len()],
            budget: raw.len().saturating_add(MAX_SHARED),
        }
    }

    fn build(&mut self, index: usize, depth: usize) -> Result<Element, Error> {
        if self.visiting[index] {
            return Err(malformed(format!("element {} refers to itself", index)));
        }
        if depth > MAX_DEPTH {
            return Err(malformed(format!(
                "element references nested deeper than {}",
                MAX_DEPTH
            )));
        }
        if self.budget == 0 {
            return Err(malformed("too many shared element references"));
        }
        self.budget -= 1;
        self.visiting[index] = true;

        let raw = self.raw;
        let src = &raw[index];
        let mut elem = Element::with_id(src.id, src.name.clone(), src.class.clone());
        for (key, attr) in &src.attributes {
            let attr = match attr {
                RawAttr::Value(v) => Attribute::Value(v.clone()),
                RawAttr::Ref(None) => continue,
                RawAttr::Ref(Some(i)) => Attribute::Element(self.build(*i, depth + 1)?),
                RawAttr::Refs(indices) => Attribute::ElementArray(
                    indices
                        .iter()
                        .map(|i| self.build(*i, depth + 1))
                        .collect::<Result<_, _>>()?,
                ),
            };
            elem.insert(key.clone(), attr);
        }

        self.visiting[index] = false;
        Ok(elem)
    }
}

/// Decode an element graph, returning the root element.
///
/// References are resolved into an owned tree; an element referenced twice
/// is duplicated. Cycles, chains deeper than [`MAX_DEPTH`] and more than
/// [`MAX_SHARED`] duplicated elements are rejected.
pub fn decode(input: &[u8]) -> Result<Element, Error> {
    let mut r = Reader { buf: input };

    if r.bytes(MAGIC.len(), "magic")? != MAGIC {
        return Err(malformed("not an element graph (bad magic)"));
    }
    let version = r.u32("encoding version")?;
    if version != ENCODING_VERSION {
        return Err(malformed(format!(
            "unsupported encoding version {} (expected {})",
            version, ENCODING_VERSION
        )));
    }

    let string_count = r.count("string")?;
    let mut strings = Vec::with_capacity(string_count);
    for _ in 0..string_count {
        strings.push(r.string("string table entry")?);
    }
    let lookup = |i: u32| {
        strings
            .get(i as usize)
            .cloned()
            .ok_or_else(|| malformed(format!("string index {} out of range", i)))
    };

    let element_count = r.count("element")?;
    if element_count == 0 {
        return Err(malformed("no root element"));
    }
    let mut raw = Vec::with_capacity(element_count);
    for _ in 0..element_count {
        let class = lookup(r.u32("element class")?)?;
        let name = lookup(r.u32("element name")?)?;
        let id_bytes = r.bytes(16, "element id")?;
        let id = Uuid::from_slice(id_bytes).map_err(|e| malformed(e.to_string()))?;
        raw.push(RawElement {
            class,
            name,
            id,
            attributes: Vec::new(),
        });
    }

    for elem in raw.iter_mut() {
        let attr_count = r.count("attribute")?;
        for _ in 0..attr_count {
            let key = lookup(r.u32("attribute key")?)?;
            let tag = r.u8("attribute type")?;
            let attr = match tag {
                TAG_ELEMENT => RawAttr::Ref(element_ref(r.i32("element reference")?, element_count)?),
                t if t == TAG_ELEMENT | ARRAY => {
                    let n = r.count("element array")?;
                    let mut refs = Vec::with_capacity(n);
                    for _ in 0..n {
                        if let Some(i) = element_ref(r.i32("element reference")?, element_count)? {
                            refs.push(i);
                        }
                    }
                    RawAttr::Refs(refs)
                }
                t if t & ARRAY != 0 => {
                    let n = r.count("array")?;
                    let mut items = Vec::with_capacity(n);
                    for _ in 0..n {
                        items.push(read_scalar(&mut r, t & !ARRAY)?);
                    }
                    RawAttr::Value(Value::Array(items))
                }
                t => RawAttr::Value(read_scalar(&mut r, t)?),
            };
            elem.attributes.push((key, attr));
        }
    }

    if r.buf.has_remaining() {
        return Err(malformed(format!(
            "{} trailing bytes after element data",
            r.buf.remaining()
        )));
    }

    let root = Builder::new(&raw).build(0, 0)?;
    tracing::trace!(elements = element_count, "decoded element graph");
    Ok(root)
}
