/*
 * Copyright 2026 The Android Open Source Project
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Test helpers: an encoder for binary XML manifests and a builder for APK archives.

use crate::ANDROID_MANIFEST;
use bytes::BufMut;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use zip::{write::FileOptions, ZipWriter};

const RES_STRING_POOL_TYPE: u16 = 0x0001;
const RES_XML_TYPE: u16 = 0x0003;
const RES_XML_START_NAMESPACE_TYPE: u16 = 0x0100;
const RES_XML_END_NAMESPACE_TYPE: u16 = 0x0101;
const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;
const RES_XML_END_ELEMENT_TYPE: u16 = 0x0103;
const RES_XML_RESOURCE_MAP_TYPE: u16 = 0x0180;

const TYPE_STRING: u8 = 0x03;
const TYPE_INT_DEC: u8 = 0x10;
const TYPE_INT_BOOLEAN: u8 = 0x12;

const UTF8_FLAG: u32 = 1 << 8;
const NO_INDEX: u32 = 0xffff_ffff;
const ANDROID_NAMESPACE_URI: &str = "http://schemas.android.com/apk/res/android";

const CHUNK_HEADER_SIZE: usize = 8;
const STRING_POOL_HEADER_SIZE: usize = 28;
const XML_NODE_HEADER_SIZE: u16 = 16;
/// Offset of the attribute array from the start of a `ResXMLTree_attrExt`.
const ATTRIBUTE_START: u16 = 20;
const ATTRIBUTE_SIZE: u16 = 20;

/// Asserts that `haystack` contains `needle`.
pub fn assert_contains(haystack: &str, needle: &str) {
    assert!(haystack.contains(needle), "{} is not found in {}", needle, haystack);
}

/// A typed attribute value.
#[derive(Clone, Debug)]
pub enum Value {
    String(String),
    Int(i32),
    Bool(bool),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

struct ElementSpec {
    tag: String,
    attributes: Vec<(String, Value)>,
    children: Vec<ElementSpec>,
}

impl ElementSpec {
    fn new(tag: &str, attributes: &[(&str, Value)]) -> Self {
        let attributes = attributes.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        ElementSpec { tag: tag.to_owned(), attributes, children: Vec::new() }
    }

    fn attribute_names(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        let own = self.attributes.iter().map(|(name, _)| name.as_str());
        Box::new(own.chain(self.children.iter().flat_map(ElementSpec::attribute_names)))
    }
}

/// Builds a binary XML manifest: a `<manifest>` root holding the added elements as children.
pub struct ManifestBuilder {
    utf8: bool,
    corrupt: Vec<String>,
    root: ElementSpec,
}

impl ManifestBuilder {
    pub fn new(package: &str) -> Self {
        ManifestBuilder {
            utf8: false,
            corrupt: Vec::new(),
            root: ElementSpec::new("manifest", &[("package", package.into())]),
        }
    }

    /// Encodes the string pool as UTF-8 instead of UTF-16.
    pub fn utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    /// Adds a child element of `<manifest>`. Attribute names may carry the `android:` prefix.
    pub fn element(mut self, tag: &str, attributes: &[(&str, Value)]) -> Self {
        self.root.children.push(ElementSpec::new(tag, attributes));
        self
    }

    /// Adds a child to the element added last.
    pub fn child(mut self, tag: &str, attributes: &[(&str, Value)]) -> Self {
        let parent = self.root.children.last_mut().expect("child needs a parent element");
        parent.children.push(ElementSpec::new(tag, attributes));
        self
    }

    pub fn uses_permission(self, name: &str) -> Self {
        self.element("uses-permission", &[("android:name", name.into())])
    }

    pub fn uses_permission_sdk_23(self, name: &str) -> Self {
        self.element("uses-permission-sdk-23", &[("android:name", name.into())])
    }

    /// Encodes the given string so that it is not valid in the pool's encoding.
    pub fn corrupt_string(mut self, s: &str) -> Self {
        self.corrupt.push(s.to_owned());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = StringPoolBuilder::default();
        // Attribute names with resource ids go first so that the resource map covers them.
        for name in self.root.attribute_names() {
            if let Some(local) = name.strip_prefix("android:") {
                pool.intern(local);
            }
        }
        let resource_ids: Vec<u32> = pool.strings.iter().map(|s| resource_id(s)).collect();
        let prefix = pool.intern("android");
        let uri = pool.intern(ANDROID_NAMESPACE_URI);

        let mut events = xml_node(RES_XML_START_NAMESPACE_TYPE, &[prefix, uri]);
        encode_element(&mut events, &mut pool, &self.root, uri);
        events.extend(xml_node(RES_XML_END_NAMESPACE_TYPE, &[prefix, uri]));

        let mut body = pool.encode(self.utf8, &self.corrupt);
        let mut ids = Vec::new();
        resource_ids.iter().for_each(|id| ids.put_u32_le(*id));
        body.extend(chunk(RES_XML_RESOURCE_MAP_TYPE, &[], &ids));
        body.extend(events);
        chunk(RES_XML_TYPE, &[], &body)
    }
}

fn encode_element(out: &mut Vec<u8>, pool: &mut StringPoolBuilder, element: &ElementSpec, uri: u32) {
    out.extend(start_element(pool, &element.tag, &element.attributes, uri));
    for child in &element.children {
        encode_element(out, pool, child, uri);
    }
    let name = pool.intern(&element.tag);
    out.extend(xml_node(RES_XML_END_ELEMENT_TYPE, &[NO_INDEX, name]));
}

fn resource_id(attribute: &str) -> u32 {
    match attribute {
        "label" => 0x0101_0001,
        "icon" => 0x0101_0002,
        "name" => 0x0101_0003,
        "debuggable" => 0x0101_000f,
        "minSdkVersion" => 0x0101_020c,
        "maxSdkVersion" => 0x0101_0271,
        "allowBackup" => 0x0101_0280,
        _ => 0,
    }
}

#[derive(Default)]
struct StringPoolBuilder {
    strings: Vec<String>,
    indices: HashMap<String, u32>,
}

impl StringPoolBuilder {
    fn intern(&mut self, s: &str) -> u32 {
        if let Some(index) = self.indices.get(s) {
            return *index;
        }
        let index = self.strings.len() as u32;
        self.strings.push(s.to_owned());
        self.indices.insert(s.to_owned(), index);
        index
    }

    fn encode(&self, utf8: bool, corrupt: &[String]) -> Vec<u8> {
        let mut offsets = Vec::new();
        let mut data = Vec::new();
        for s in &self.strings {
            offsets.put_u32_le(data.len() as u32);
            let corrupt = corrupt.contains(s);
            if utf8 {
                encode_utf8(&mut data, s, corrupt);
            } else {
                encode_utf16(&mut data, s, corrupt);
            }
        }
        while data.len() % 4 != 0 {
            data.put_u8(0);
        }

        let mut header = Vec::new();
        header.put_u32_le(self.strings.len() as u32);
        header.put_u32_le(0);
        header.put_u32_le(if utf8 { UTF8_FLAG } else { 0 });
        header.put_u32_le((STRING_POOL_HEADER_SIZE + offsets.len()) as u32);
        header.put_u32_le(0);
        chunk(RES_STRING_POOL_TYPE, &header, &[offsets, data].concat())
    }
}

fn encode_utf8(out: &mut Vec<u8>, text: &str, corrupt: bool) {
    let mut bytes = text.as_bytes().to_vec();
    if corrupt {
        // 0xff never appears in UTF-8.
        bytes[0] = 0xff;
    }
    put_utf8_length(out, text.encode_utf16().count());
    put_utf8_length(out, bytes.len());
    out.put_slice(&bytes);
    out.put_u8(0);
}

fn put_utf8_length(out: &mut Vec<u8>, len: usize) {
    assert!(len <= 0x7fff, "string too long for UTF-8 pool: {}", len);
    if len < 0x80 {
        out.put_u8(len as u8);
    } else {
        out.put_u8(0x80 | (len >> 8) as u8);
        out.put_u8(len as u8);
    }
}

fn encode_utf16(out: &mut Vec<u8>, text: &str, corrupt: bool) {
    let mut units: Vec<u16> = text.encode_utf16().collect();
    if corrupt {
        // A high surrogate followed by a non-surrogate.
        units[0] = 0xd800;
    }
    let len = units.len();
    if len < 0x8000 {
        out.put_u16_le(len as u16);
    } else {
        out.put_u16_le(0x8000 | (len >> 16) as u16);
        out.put_u16_le(len as u16);
    }
    units.iter().for_each(|unit| out.put_u16_le(*unit));
    out.put_u16_le(0);
}

fn start_element(
    pool: &mut StringPoolBuilder,
    tag: &str,
    attributes: &[(String, Value)],
    android_uri: u32,
) -> Vec<u8> {
    let name = pool.intern(tag);
    let mut body = Vec::new();
    body.put_u32_le(NO_INDEX);
    body.put_u32_le(name);
    body.put_u16_le(ATTRIBUTE_START);
    body.put_u16_le(ATTRIBUTE_SIZE);
    body.put_u16_le(attributes.len() as u16);
    // id, class and style attribute indices
    body.put_u16_le(0);
    body.put_u16_le(0);
    body.put_u16_le(0);
    for (attribute, value) in attributes {
        let (namespace, local) = match attribute.split_once(':') {
            Some(("android", local)) => (android_uri, local),
            Some((prefix, _)) => panic!("unsupported namespace prefix {}", prefix),
            None => (NO_INDEX, attribute.as_str()),
        };
        let name = pool.intern(local);
        let (raw_value, data_type, data) = match value {
            Value::String(s) => {
                let index = pool.intern(s);
                (index, TYPE_STRING, index)
            }
            Value::Int(v) => (NO_INDEX, TYPE_INT_DEC, *v as u32),
            Value::Bool(v) => (NO_INDEX, TYPE_INT_BOOLEAN, if *v { 0xffff_ffff } else { 0 }),
        };
        body.put_u32_le(namespace);
        body.put_u32_le(name);
        body.put_u32_le(raw_value);
        // Res_value: size, res0, dataType, data
        body.put_u16_le(8);
        body.put_u8(0);
        body.put_u8(data_type);
        body.put_u32_le(data);
    }
    xml_node_with_body(RES_XML_START_ELEMENT_TYPE, &body)
}

fn xml_node(chunk_type: u16, fields: &[u32]) -> Vec<u8> {
    let mut body = Vec::new();
    fields.iter().for_each(|field| body.put_u32_le(*field));
    xml_node_with_body(chunk_type, &body)
}

fn xml_node_with_body(chunk_type: u16, body: &[u8]) -> Vec<u8> {
    let mut header = Vec::new();
    // line number, comment
    header.put_u32_le(1);
    header.put_u32_le(NO_INDEX);
    debug_assert_eq!(CHUNK_HEADER_SIZE + header.len(), XML_NODE_HEADER_SIZE as usize);
    chunk(chunk_type, &header, body)
}

fn chunk(chunk_type: u16, header: &[u8], body: &[u8]) -> Vec<u8> {
    let header_size = CHUNK_HEADER_SIZE + header.len();
    let mut out = Vec::with_capacity(header_size + body.len());
    out.put_u16_le(chunk_type);
    out.put_u16_le(header_size as u16);
    out.put_u32_le((header_size + body.len()) as u32);
    out.put_slice(header);
    out.put_slice(body);
    out
}

/// Builds an APK (zip) archive holding the given entries.
pub fn build_apk(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Builds an APK whose `AndroidManifest.xml` is the given manifest, next to a dummy dex file.
pub fn build_apk_with_manifest(manifest: &[u8]) -> Vec<u8> {
    build_apk(&[(ANDROID_MANIFEST, manifest), ("classes.dex", b"dex\n035\0")])
}
