//! XMP packet reading and generation.
//!
//! Reading resolves namespace prefixes from `xmlns:*` declarations, so a
//! packet that binds the gain map namespace to an unusual prefix is still
//! recognized. Only the first `rdf:Description` under `rdf:RDF` is read.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::limits;
use crate::types::{Error, Result};

/// XMP namespace for HDR gain map metadata.
pub const HDRGM_NAMESPACE: &str = "http://ns.adobe.com/hdr-gain-map/1.0/";

/// RDF namespace.
pub const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// XMP namespace for container directory.
pub const CONTAINER_NAMESPACE: &str = "http://ns.google.com/photos/1.0/container/";

/// XMP namespace for container item.
pub const ITEM_NAMESPACE: &str = "http://ns.google.com/photos/1.0/container/item/";

/// Apple's gain map namespace (HEIC auxiliary gain maps).
pub const APPLE_HDRGM_NAMESPACE: &str = "http://ns.apple.com/HDRGainMap/1.0/";

/// Identifier that prefixes XMP payloads in JPEG APP1 segments.
pub const XMP_IDENTIFIER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// A coerced attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum XmpValue {
    /// Integer-looking text.
    Int(i64),
    /// Decimal-looking text.
    Float(f64),
    /// `True`/`False`, any case.
    Bool(bool),
    /// Anything else, verbatim.
    Text(String),
    /// Items of an `rdf:Seq` / `rdf:Bag` property.
    Seq(Vec<XmpValue>),
}

impl XmpValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view of the value, if it has one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// All numbers carried by the value: a scalar, a comma-separated list
    /// or a sequence. `None` if any entry is not numeric.
    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match self {
            Self::Int(_) | Self::Float(_) => self.as_f64().map(|v| vec![v]),
            Self::Text(s) => s
                .split(',')
                .map(|part| part.trim().parse::<f64>().ok())
                .collect(),
            Self::Seq(items) => items.iter().map(|i| i.as_f64()).collect(),
            Self::Bool(_) => None,
        }
    }
}

/// Coerce attribute text: decimals to floats, other numbers to integers,
/// `true`/`false` to booleans, everything else stays text.
pub fn coerce(raw: &str) -> XmpValue {
    let trimmed = raw.trim();
    let numeric = if trimmed.contains('.') {
        trimmed.parse::<f64>().ok().map(XmpValue::Float)
    } else {
        trimmed.parse::<i64>().ok().map(XmpValue::Int)
    };
    if let Some(v) = numeric {
        return v;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        XmpValue::Bool(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        XmpValue::Bool(false)
    } else {
        XmpValue::Text(raw.to_string())
    }
}

/// Properties of one namespace, keyed by local name, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmpAttributes {
    entries: Vec<(String, XmpValue)>,
}

impl XmpAttributes {
    /// Value of the property with the given local name.
    pub fn get(&self, name: &str) -> Option<&XmpValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Insert a property; the first occurrence of a name wins.
    pub fn insert(&mut self, name: &str, value: XmpValue) {
        if self.get(name).is_none() {
            self.entries.push((name.to_string(), value));
        }
    }

    /// Iterate properties in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &XmpValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any property name starts with `GainMap`.
    pub fn has_gainmap_keys(&self) -> bool {
        self.entries.iter().any(|(k, _)| k.starts_with("GainMap"))
    }
}

/// XML document inside an APP1 payload: everything after the first NUL
/// (the namespace identifier terminator), or the whole payload if none.
pub fn payload_xml(payload: &[u8]) -> &[u8] {
    match payload.iter().position(|&b| b == 0) {
        Some(nul) => &payload[nul + 1..],
        None => payload,
    }
}

/// Extract hdrgm gain map properties from an APP1 payload.
///
/// Never fails: payloads that are not XML, are not XMP, or carry no
/// `GainMap*` property all yield `None` so callers can keep scanning.
pub fn extract_gainmap_attributes(payload: &[u8]) -> Option<XmpAttributes> {
    let xml = payload_xml(payload);
    match read_namespace_properties(xml, HDRGM_NAMESPACE) {
        Ok(attrs) if attrs.has_gainmap_keys() => Some(attrs),
        Ok(_) => None,
        Err(e) => {
            log::debug!("ignoring unparseable XMP payload: {}", e);
            None
        }
    }
}

/// Read the properties in `namespace` from the first `rdf:Description`
/// under `rdf:RDF`: its attributes, then simple and `rdf:Seq` child
/// elements.
pub fn read_namespace_properties(xml: &[u8], namespace: &str) -> Result<XmpAttributes> {
    if xml.len() > limits::MAX_XMP_LENGTH {
        return Err(Error::LimitExceeded(format!(
            "XMP of {} bytes exceeds maximum {}",
            xml.len(),
            limits::MAX_XMP_LENGTH
        )));
    }

    // Text is split around entity references, so whitespace is trimmed
    // per property rather than per event.
    let mut reader = Reader::from_reader(xml);

    let mut scopes = NamespaceScopes::default();
    let mut attrs = XmpAttributes::default();
    let mut buf = Vec::new();

    let mut depth = 0usize;
    let mut rdf_depth: Option<usize> = None;
    let mut description_depth: Option<usize> = None;
    let mut property: Option<PropertyState> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::Format(format!("XMP parse error: {}", e)))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                depth += 1;
                scopes.push(e);
                let (ns, local) = scopes.resolve(e.name().as_ref());

                if rdf_depth.is_none() && ns == Some(RDF_NAMESPACE) && local == "RDF" {
                    rdf_depth = Some(depth);
                } else if rdf_depth.is_some()
                    && description_depth.is_none()
                    && ns == Some(RDF_NAMESPACE)
                    && local == "Description"
                {
                    for attr in e.attributes().flatten() {
                        let (attr_ns, attr_local) = scopes.resolve(attr.key.as_ref());
                        if attr_ns == Some(namespace) {
                            let raw = String::from_utf8_lossy(&attr.value);
                            attrs.insert(&attr_local, coerce(&unescaped(&raw)));
                        }
                    }
                    if is_empty {
                        return Ok(attrs);
                    }
                    description_depth = Some(depth);
                } else if let Some(d) = description_depth {
                    if depth == d + 1 && ns == Some(namespace) {
                        property = Some(PropertyState::new(&local));
                    } else if let Some(p) = property.as_mut() {
                        if ns == Some(RDF_NAMESPACE) && local == "li" {
                            p.in_item = !is_empty;
                            p.item_text.clear();
                            if is_empty {
                                p.items.push(XmpValue::Text(String::new()));
                            }
                        }
                    }
                }

                if is_empty {
                    scopes.pop();
                    depth -= 1;
                }
            }
            Event::Text(ref t) => {
                if let Some(p) = property.as_mut() {
                    p.push_text(&unescaped(&String::from_utf8_lossy(t)));
                }
            }
            Event::GeneralRef(ref r) => {
                if let Some(p) = property.as_mut() {
                    p.push_text(&unescaped(&format!("&{};", String::from_utf8_lossy(r))));
                }
            }
            Event::End(_) => {
                if let Some(d) = description_depth {
                    if depth == d {
                        return Ok(attrs);
                    }
                    if depth == d + 1 {
                        if let Some(p) = property.take() {
                            let name = p.name.clone();
                            attrs.insert(&name, p.into_value());
                        }
                    } else if let Some(p) = property.as_mut() {
                        p.end_item();
                    }
                }
                if rdf_depth == Some(depth) {
                    return Ok(attrs);
                }
                scopes.pop();
                depth = depth.saturating_sub(1);
            }
            Event::Eof => return Ok(attrs),
            _ => {}
        }
        buf.clear();
    }
}

/// Entity and character references resolved; unknown ones left as written.
fn unescaped(raw: &str) -> String {
    match unescape(raw) {
        Ok(text) => text.into_owned(),
        Err(e) => {
            log::debug!("keeping XMP text unescaped: {}", e);
            raw.to_string()
        }
    }
}

struct PropertyState {
    name: String,
    text: String,
    items: Vec<XmpValue>,
    item_text: String,
    in_item: bool,
}

impl PropertyState {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            text: String::new(),
            items: Vec::new(),
            item_text: String::new(),
            in_item: false,
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.in_item {
            self.item_text.push_str(text);
        } else {
            self.text.push_str(text);
        }
    }

    fn end_item(&mut self) {
        if self.in_item {
            self.items.push(coerce(self.item_text.trim()));
            self.item_text.clear();
            self.in_item = false;
        }
    }

    fn into_value(self) -> XmpValue {
        if self.items.is_empty() {
            coerce(self.text.trim())
        } else {
            XmpValue::Seq(self.items)
        }
    }
}

/// Stack of `xmlns` declarations, one frame per open element.
#[derive(Default)]
struct NamespaceScopes {
    frames: Vec<Vec<(String, String)>>,
}

impl NamespaceScopes {
    fn push(&mut self, e: &BytesStart<'_>) {
        let mut frame = Vec::new();
        for attr in e.attributes().flatten() {
            let key = attr.key.as_ref();
            if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                frame.push((
                    String::from_utf8_lossy(prefix).into_owned(),
                    String::from_utf8_lossy(&attr.value).into_owned(),
                ));
            } else if key == b"xmlns" {
                frame.push((
                    String::new(),
                    String::from_utf8_lossy(&attr.value).into_owned(),
                ));
            }
        }
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// Split a qualified name and resolve its prefix to a namespace URI.
    fn resolve(&self, qname: &[u8]) -> (Option<&str>, String) {
        let qname = String::from_utf8_lossy(qname);
        let (prefix, local) = match qname.split_once(':') {
            Some((p, l)) => (p, l),
            None => ("", qname.as_ref()),
        };
        let uri = self
            .frames
            .iter()
            .rev()
            .flat_map(|f| f.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str());
        (uri, local.to_string())
    }
}

// ============================================================================
// Generation
// ============================================================================

/// XMP for the primary image: hdrgm version plus the container directory
/// describing the appended gain map.
pub fn generate_primary_xmp(gainmap_length: usize) -> String {
    format!(
        r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="hdrconv">
  <rdf:RDF xmlns:rdf="{RDF_NAMESPACE}">
    <rdf:Description rdf:about=""
        xmlns:hdrgm="{HDRGM_NAMESPACE}"
        xmlns:Container="{CONTAINER_NAMESPACE}"
        xmlns:Item="{ITEM_NAMESPACE}"
        hdrgm:Version="1.0">
      <Container:Directory>
        <rdf:Seq>
          <rdf:li rdf:parseType="Resource">
            <Container:Item
                Item:Semantic="Primary"
                Item:Mime="image/jpeg"/>
          </rdf:li>
          <rdf:li rdf:parseType="Resource">
            <Container:Item
                Item:Semantic="GainMap"
                Item:Mime="image/jpeg"
                Item:Length="{gainmap_length}"/>
          </rdf:li>
        </rdf:Seq>
      </Container:Directory>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#
    )
}

/// XMP for the gain map image: the full hdrgm property set.
pub fn generate_gainmap_xmp(properties: &[(&str, String)]) -> String {
    let mut attrs = String::new();
    for (name, value) in properties {
        attrs.push_str(&format!("\n        hdrgm:{}=\"{}\"", name, value));
    }
    format!(
        r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="hdrconv">
  <rdf:RDF xmlns:rdf="{RDF_NAMESPACE}">
    <rdf:Description rdf:about=""
        xmlns:hdrgm="{HDRGM_NAMESPACE}"{attrs}/>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#
    )
}

/// Create APP1 marker with XMP data.
pub fn create_xmp_app1_marker(xmp: &str) -> Result<Vec<u8>> {
    let xmp_bytes = xmp.as_bytes();
    let total_length = 2 + XMP_IDENTIFIER.len() + xmp_bytes.len();
    if total_length > u16::MAX as usize {
        return Err(Error::LimitExceeded(format!(
            "XMP packet of {} bytes does not fit one APP1 segment",
            xmp_bytes.len()
        )));
    }

    let mut marker = Vec::with_capacity(2 + total_length);
    marker.push(0xFF);
    marker.push(0xE1);
    marker.extend_from_slice(&(total_length as u16).to_be_bytes());
    marker.extend_from_slice(XMP_IDENTIFIER);
    marker.extend_from_slice(xmp_bytes);

    Ok(marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANDROID_GAINMAP_XMP: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description xmlns:hdrgm="http://ns.adobe.com/hdr-gain-map/1.0/"
        hdrgm:Version="1.0"
        hdrgm:GainMapMin="0"
        hdrgm:GainMapMax="2.3"
        hdrgm:Gamma="1"
        hdrgm:OffsetSDR="0.015625"
        hdrgm:HDRCapacityMax="2.3"
        hdrgm:BaseRenditionIsHDR="False"/>
  </rdf:RDF>
</x:xmpmeta>"#;

    fn app1(xml: &str) -> Vec<u8> {
        let mut payload = XMP_IDENTIFIER.to_vec();
        payload.extend_from_slice(xml.as_bytes());
        payload
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce("12"), XmpValue::Int(12));
        assert_eq!(coerce("-3"), XmpValue::Int(-3));
        assert_eq!(coerce("2.5"), XmpValue::Float(2.5));
        assert_eq!(coerce("True"), XmpValue::Bool(true));
        assert_eq!(coerce("FALSE"), XmpValue::Bool(false));
        assert_eq!(coerce("1.0.2"), XmpValue::Text("1.0.2".into()));
        assert_eq!(coerce("abc"), XmpValue::Text("abc".into()));
    }

    #[test]
    fn test_extract_android_gainmap() {
        let attrs = extract_gainmap_attributes(&app1(ANDROID_GAINMAP_XMP)).unwrap();
        assert_eq!(attrs.get("GainMapMin"), Some(&XmpValue::Int(0)));
        assert_eq!(attrs.get("GainMapMax"), Some(&XmpValue::Float(2.3)));
        assert_eq!(attrs.get("BaseRenditionIsHDR"), Some(&XmpValue::Bool(false)));
        assert_eq!(attrs.get("Version"), Some(&XmpValue::Float(1.0)));
    }

    /// Payloads without hdrgm properties yield nothing and never fail.
    #[test]
    fn test_non_gainmap_payloads_are_empty() {
        let plain = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description xmlns:tiff="http://ns.adobe.com/tiff/1.0/" tiff:Make="Acme"/>
  </rdf:RDF>
</x:xmpmeta>"#;
        assert!(extract_gainmap_attributes(&app1(plain)).is_none());
        assert!(extract_gainmap_attributes(b"Exif\0\0MM\0*garbage").is_none());
        assert!(extract_gainmap_attributes(b"").is_none());
        assert!(extract_gainmap_attributes(&app1("<unclosed attr=")).is_none());
    }

    /// A version-only primary packet is not gain map metadata.
    #[test]
    fn test_version_only_is_not_accepted() {
        let xmp = generate_primary_xmp(1234);
        assert!(extract_gainmap_attributes(&app1(&xmp)).is_none());
        let attrs = read_namespace_properties(xmp.as_bytes(), HDRGM_NAMESPACE).unwrap();
        assert_eq!(attrs.get("Version"), Some(&XmpValue::Float(1.0)));
    }

    #[test]
    fn test_prefix_is_resolved_from_declaration() {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description xmlns:gm="http://ns.adobe.com/hdr-gain-map/1.0/"
        xmlns:hdrgm="urn:not-the-gainmap"
        gm:GainMapMax="3.0" hdrgm:GainMapMin="9.0"/>
  </rdf:RDF>
</x:xmpmeta>"#;
        let attrs = extract_gainmap_attributes(&app1(xml)).unwrap();
        assert_eq!(attrs.get("GainMapMax"), Some(&XmpValue::Float(3.0)));
        assert!(attrs.get("GainMapMin").is_none());
    }

    /// Only the first Description is consulted.
    #[test]
    fn test_first_description_only() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
    xmlns:hdrgm="http://ns.adobe.com/hdr-gain-map/1.0/">
  <rdf:Description hdrgm:Version="1.0"/>
  <rdf:Description hdrgm:GainMapMax="3.0"/>
</rdf:RDF>"#;
        assert!(extract_gainmap_attributes(&app1(xml)).is_none());
    }

    #[test]
    fn test_child_element_properties() {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description xmlns:hdrgm="http://ns.adobe.com/hdr-gain-map/1.0/">
      <hdrgm:Version>1.0</hdrgm:Version>
      <hdrgm:GainMapMax>
        <rdf:Seq>
          <rdf:li>1.5</rdf:li>
          <rdf:li>2.5</rdf:li>
          <rdf:li>3.5</rdf:li>
        </rdf:Seq>
      </hdrgm:GainMapMax>
      <hdrgm:Gamma>1.0</hdrgm:Gamma>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>"#;
        let attrs = extract_gainmap_attributes(&app1(xml)).unwrap();
        assert_eq!(
            attrs.get("GainMapMax").and_then(|v| v.as_f64_list()),
            Some(vec![1.5, 2.5, 3.5])
        );
        assert_eq!(attrs.get("Gamma"), Some(&XmpValue::Float(1.0)));
        assert_eq!(attrs.get("Version"), Some(&XmpValue::Float(1.0)));
    }

    /// Entity and character references are resolved in attributes,
    /// element text and sequence items.
    #[test]
    fn test_escaped_values_are_resolved() {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description xmlns:hdrgm="http://ns.adobe.com/hdr-gain-map/1.0/"
        hdrgm:GainMapMax="2.0"
        hdrgm:Label="a &amp; b &quot;c&quot;">
      <hdrgm:Note>x &lt; y</hdrgm:Note>
      <hdrgm:Tags>
        <rdf:Bag>
          <rdf:li>&#65;&#66;</rdf:li>
          <rdf:li> 1.5 </rdf:li>
        </rdf:Bag>
      </hdrgm:Tags>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>"#;
        let attrs = extract_gainmap_attributes(&app1(xml)).unwrap();
        assert_eq!(attrs.get("Label"), Some(&XmpValue::Text("a & b \"c\"".into())));
        assert_eq!(attrs.get("Note"), Some(&XmpValue::Text("x < y".into())));
        assert_eq!(
            attrs.get("Tags"),
            Some(&XmpValue::Seq(vec![
                XmpValue::Text("AB".into()),
                XmpValue::Float(1.5)
            ]))
        );
        assert_eq!(attrs.get("GainMapMax"), Some(&XmpValue::Float(2.0)));
    }

    #[test]
    fn test_comma_separated_list() {
        let v = coerce("0.1, 0.2, 0.3");
        assert!(matches!(v, XmpValue::Text(_)));
        assert_eq!(v.as_f64_list(), Some(vec![0.1, 0.2, 0.3]));
    }

    #[test]
    fn test_payload_without_nul_is_parsed_whole() {
        assert_eq!(payload_xml(b"<a/>"), b"<a/>");
        assert_eq!(payload_xml(b"ns\0<a/>"), b"<a/>");
    }

    #[test]
    fn test_app1_marker_layout() {
        let marker = create_xmp_app1_marker("<x/>").unwrap();
        assert_eq!(&marker[..2], &[0xFF, 0xE1]);
        let len = u16::from_be_bytes([marker[2], marker[3]]) as usize;
        assert_eq!(len, marker.len() - 2);
        assert!(marker[4..].starts_with(XMP_IDENTIFIER));
    }

    #[test]
    fn test_generated_gainmap_xmp_is_readable() {
        let xmp = generate_gainmap_xmp(&[
            ("Version", "1.0".into()),
            ("GainMapMax", "2.000000".into()),
        ]);
        let attrs = extract_gainmap_attributes(&app1(&xmp)).unwrap();
        assert_eq!(attrs.get("GainMapMax"), Some(&XmpValue::Float(2.0)));
    }
}
