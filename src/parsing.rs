//! Decoding of PHP-serialized capability blobs as stored in `wp_usermeta`.

/// A decoded PHP value.
#[derive(Debug, Clone, PartialEq)]
pub enum PhpValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<(PhpValue, PhpValue)>),
    Object {
        class: String,
        properties: Vec<(PhpValue, PhpValue)>,
    },
}

/// What a capability meta value turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleValue {
    /// Plain text, or serialized data that is not an array.
    Scalar(String),
    /// Keys of a serialized array, in source order.
    Roles(Vec<String>),
    /// Looked like serialized data but did not parse.
    Malformed(String),
}

impl RoleValue {
    pub fn intersects(&self, allowed: &[String]) -> bool {
        match self {
            RoleValue::Roles(keys) => keys.iter().any(|k| allowed.iter().any(|a| a == k)),
            RoleValue::Scalar(_) | RoleValue::Malformed(_) => false,
        }
    }
}

pub fn decode_role_value(raw: &str) -> RoleValue {
    if !looks_serialized(raw) {
        return RoleValue::Scalar(raw.to_string());
    }
    match unserialize(raw) {
        Some(PhpValue::Array(entries)) => {
            RoleValue::Roles(entries.iter().filter_map(|(k, _)| array_key(k)).collect())
        }
        Some(_) => RoleValue::Scalar(raw.to_string()),
        None => RoleValue::Malformed(raw.to_string()),
    }
}

fn array_key(key: &PhpValue) -> Option<String> {
    match key {
        PhpValue::Int(i) => Some(i.to_string()),
        PhpValue::Str(s) => Some(s.clone()),
        _ => None,
    }
}

/// Cheap shape check: a type tag followed by `:` or the `N;` literal.
pub fn looks_serialized(raw: &str) -> bool {
    let t = raw.trim();
    if t == "N;" {
        return true;
    }
    let bytes = t.as_bytes();
    bytes.len() >= 4
        && matches!(bytes[0], b'a' | b'b' | b'd' | b'i' | b'O' | b's')
        && bytes[1] == b':'
        && matches!(bytes[bytes.len() - 1], b';' | b'}')
}

/// Deepest array/object nesting accepted before a payload is rejected.
pub const MAX_DEPTH: usize = 128;

/// Parses a single PHP-serialized value. Trailing bytes after a complete value are ignored.
pub fn unserialize(raw: &str) -> Option<PhpValue> {
    let mut reader = Reader {
        input: raw.trim().as_bytes(),
        pos: 0,
        depth: 0,
    };
    reader.value()
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn value(&mut self) -> Option<PhpValue> {
        let tag = self.next()?;
        if tag == b'N' {
            self.expect(b';')?;
            return Some(PhpValue::Null);
        }
        self.expect(b':')?;
        match tag {
            b'b' => {
                let v = match self.until(b';')? {
                    "0" => false,
                    "1" => true,
                    _ => return None,
                };
                Some(PhpValue::Bool(v))
            }
            b'i' => self.until(b';')?.parse().ok().map(PhpValue::Int),
            b'd' => self.until(b';')?.parse().ok().map(PhpValue::Float),
            b's' => {
                let s = self.string()?;
                self.expect(b';')?;
                Some(PhpValue::Str(s))
            }
            b'a' => {
                let count: usize = self.until(b':')?.parse().ok()?;
                Some(PhpValue::Array(self.entries(count)?))
            }
            b'O' => {
                let class = self.string()?;
                self.expect(b':')?;
                let count: usize = self.until(b':')?.parse().ok()?;
                Some(PhpValue::Object {
                    class,
                    properties: self.entries(count)?,
                })
            }
            _ => None,
        }
    }

    // `{key value ...}` with exactly `count` pairs.
    fn entries(&mut self, count: usize) -> Option<Vec<(PhpValue, PhpValue)>> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        let entries = self.pairs(count);
        self.depth -= 1;
        entries
    }

    fn pairs(&mut self, count: usize) -> Option<Vec<(PhpValue, PhpValue)>> {
        self.expect(b'{')?;
        let mut entries = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let key = self.value()?;
            if !matches!(key, PhpValue::Int(_) | PhpValue::Str(_)) {
                return None;
            }
            let value = self.value()?;
            entries.push((key, value));
        }
        self.expect(b'}')?;
        Some(entries)
    }

    // `<len>:"<bytes>"`, length counted in bytes.
    fn string(&mut self) -> Option<String> {
        let len: usize = self.until(b':')?.parse().ok()?;
        self.expect(b'"')?;
        let end = self.pos.checked_add(len)?;
        let input = self.input;
        let bytes = input.get(self.pos..end)?;
        self.pos = end;
        self.expect(b'"')?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    fn until(&mut self, delim: u8) -> Option<&'a str> {
        let input = self.input;
        let rest = &input[self.pos..];
        let offset = rest.iter().position(|b| *b == delim)?;
        self.pos += offset + 1;
        std::str::from_utf8(&rest[..offset]).ok()
    }

    fn next(&mut self) -> Option<u8> {
        let b = *self.input.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, want: u8) -> Option<()> {
        (self.next()? == want).then_some(())
    }
}
