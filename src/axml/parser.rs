use log::debug;

use crate::axml::attr_names::{ATTR_ID_BASE, FRAMEWORK_ATTR_NAMES};
use crate::axml::cursor::Cursor;
use crate::axml::error::{AxmlError, AxmlResult};
use crate::axml::string_pool::StringPool;
use crate::axml::value::ResValue;
use crate::axml::{
    read_chunk_header, NO_ENTRY, RES_STRING_POOL_TYPE, RES_XML_CDATA_TYPE,
    RES_XML_END_ELEMENT_TYPE, RES_XML_END_NAMESPACE_TYPE, RES_XML_RESOURCE_MAP_TYPE,
    RES_XML_START_ELEMENT_TYPE, RES_XML_START_NAMESPACE_TYPE, RES_XML_TYPE,
};
use crate::types::TreeSink;

/// Decodes a binary XML document into `sink`.
///
/// The sink receives elements, attributes and text in stream order. On error
/// the sink may hold a partially built tree; callers must discard it.
pub fn decode<S: TreeSink>(data: &[u8], sink: &mut S) -> AxmlResult<()> {
    Decoder {
        cursor: Cursor::new(data),
        sink,
        strings: StringPool::empty(),
        resource_map: Vec::new(),
        stack: Vec::new(),
    }
    .run()
}

/// One entry of the element stack: the tree node under construction plus the
/// namespace bindings declared inside it, as `(uri, prefix)` string-pool
/// index pairs in declaration order.
struct Frame<Id> {
    element: Id,
    namespaces: Vec<(u32, u32)>,
}

struct Decoder<'d, 's, S: TreeSink> {
    cursor: Cursor<'d>,
    sink: &'s mut S,
    strings: StringPool,
    resource_map: Vec<u32>,
    stack: Vec<Frame<S::ElementId>>,
}

impl<S: TreeSink> Decoder<'_, '_, S> {
    fn run(mut self) -> AxmlResult<()> {
        let outer = read_chunk_header(&mut self.cursor)?;
        if outer.chunk_type != RES_XML_TYPE {
            return Err(AxmlError::MagicMismatch {
                found: outer.chunk_type,
            });
        }
        outer.check_bounds(self.cursor.len())?;
        debug!("binary XML document, {} bytes declared", outer.chunk_size);

        self.stack.push(Frame {
            element: self.sink.root(),
            namespaces: Vec::new(),
        });

        while self.cursor.position() < outer.end() {
            let saved = self.cursor;
            let header = read_chunk_header(&mut self.cursor)?;
            header.check_bounds(self.cursor.len())?;
            match header.chunk_type {
                RES_STRING_POOL_TYPE => {
                    self.strings = StringPool::parse(&mut self.cursor, &header)?;
                    debug!("string pool with {} entries", self.strings.len());
                }
                RES_XML_RESOURCE_MAP_TYPE => {
                    self.cursor.move_to(header.payload_start())?;
                    let count = (header.chunk_size as usize - header.header_size as usize) / 4;
                    let mut ids = Vec::with_capacity(count);
                    for _ in 0..count {
                        ids.push(self.cursor.get_u32()?);
                    }
                    self.resource_map = ids;
                }
                RES_XML_START_NAMESPACE_TYPE => self.parse_start_namespace()?,
                RES_XML_END_NAMESPACE_TYPE => self.parse_end_namespace()?,
                RES_XML_START_ELEMENT_TYPE => self.parse_start_element()?,
                RES_XML_END_ELEMENT_TYPE => self.parse_end_element()?,
                RES_XML_CDATA_TYPE => self.parse_cdata()?,
                other => {
                    return Err(AxmlError::UnknownChunk {
                        chunk_type: other,
                        at: header.start,
                    });
                }
            }
            // Restore the saved framing and step over the declared size, so a
            // handler that over- or under-reads never desyncs the walk.
            self.cursor = saved;
            self.cursor.advance(header.chunk_size as usize)?;
        }

        if self.stack.len() != 1 {
            return Err(AxmlError::Malformed(format!(
                "{} elements left open at end of document",
                self.stack.len() - 1
            )));
        }
        Ok(())
    }

    fn parse_start_namespace(&mut self) -> AxmlResult<()> {
        self.cursor.advance(8)?; // line number, comment
        let prefix = self.cursor.get_u32()?;
        let uri = self.cursor.get_u32()?;
        self.current_frame_mut()?.namespaces.push((uri, prefix));
        Ok(())
    }

    fn parse_end_namespace(&mut self) -> AxmlResult<()> {
        self.cursor.advance(16)?; // line number, comment, prefix, uri
        if self.current_frame_mut()?.namespaces.pop().is_none() {
            return Err(AxmlError::Malformed(
                "namespace end without matching start".to_string(),
            ));
        }
        Ok(())
    }

    fn parse_start_element(&mut self) -> AxmlResult<()> {
        self.cursor.advance(8)?; // line number, comment
        let _ns = self.cursor.get_u32()?;
        let name = self.cursor.get_u32()?;
        let _attr_size = self.cursor.get_u32()?;
        let attr_count = self.cursor.get_u16()?;
        let _id_index = self.cursor.get_u16()?;
        let _class_index = self.cursor.get_u16()?;
        let _style_index = self.cursor.get_u16()?;

        let parent = self.current_frame()?.element;
        let tag = self.strings.require(name)?;
        let element = self.sink.add_child_element(parent, tag);

        // Bindings declared since the enclosing element opened become xmlns
        // attributes on this element, ahead of its own attributes.
        if let Some(frame) = self.stack.last() {
            for &(uri, prefix) in &frame.namespaces {
                let prefix = self.strings.require(prefix)?;
                let uri = self.strings.require(uri)?;
                self.sink
                    .add_attribute(element, &format!("xmlns:{prefix}"), uri);
            }
        }
        self.stack.push(Frame {
            element,
            namespaces: Vec::new(),
        });

        for _ in 0..attr_count {
            let attr_ns = self.cursor.get_u32()?;
            let attr_name = self.cursor.get_u32()?;
            let raw_value = self.cursor.get_u32()?;
            let value = ResValue::read(&mut self.cursor)?;

            let mut qualified = String::new();
            if attr_ns != NO_ENTRY {
                let prefix = self.lookup_prefix(attr_ns);
                if prefix != NO_ENTRY {
                    qualified.push_str(self.strings.require(prefix)?);
                    qualified.push(':');
                }
            }
            let local = self.strings.require(attr_name)?;
            if local.is_empty() {
                // Framework attributes ship with an empty pool entry; the
                // name comes back through the resource map.
                qualified.push_str(self.recover_attr_name(attr_name)?);
            } else {
                qualified.push_str(local);
            }

            let rendered = match self.strings.get(raw_value)? {
                Some(raw) => raw.to_string(),
                None => value.format(&self.strings)?,
            };
            self.sink.add_attribute(element, &qualified, &rendered);
        }
        Ok(())
    }

    fn parse_end_element(&mut self) -> AxmlResult<()> {
        self.cursor.advance(16)?; // line number, comment, namespace, name
        if self.stack.len() <= 1 {
            return Err(AxmlError::Malformed(
                "element end without matching start".to_string(),
            ));
        }
        self.stack.pop();
        Ok(())
    }

    fn parse_cdata(&mut self) -> AxmlResult<()> {
        self.cursor.advance(8)?; // line number, comment
        let text = self.cursor.get_u32()?;
        let _value = ResValue::read(&mut self.cursor)?;
        let element = self.current_frame()?.element;
        let content = self.strings.require(text)?;
        self.sink.add_text(element, content);
        Ok(())
    }

    /// Finds the prefix bound to `uri`, walking the element stack from the
    /// frame enclosing the element under construction outward, and each
    /// frame's bindings newest to oldest. The top frame is excluded: an
    /// element cannot resolve an attribute prefix against bindings declared
    /// in its own interior.
    fn lookup_prefix(&self, uri: u32) -> u32 {
        for frame in self.stack[..self.stack.len() - 1].iter().rev() {
            for &(bound_uri, prefix) in frame.namespaces.iter().rev() {
                if bound_uri == uri {
                    return prefix;
                }
            }
        }
        NO_ENTRY
    }

    /// Recovers the name of an attribute whose pool entry is empty: the pool
    /// index maps through the resource map to a framework resource ID, whose
    /// offset from `0x01010000` indexes the built-in name table.
    fn recover_attr_name(&self, index: u32) -> AxmlResult<&'static str> {
        let rid = *self
            .resource_map
            .get(index as usize)
            .ok_or(AxmlError::UndefinedAttr { index })?;
        let slot = rid.wrapping_sub(ATTR_ID_BASE) as usize;
        FRAMEWORK_ATTR_NAMES
            .get(slot)
            .copied()
            .ok_or(AxmlError::UndefinedAttr { index: rid })
    }

    fn current_frame(&self) -> AxmlResult<&Frame<S::ElementId>> {
        self.stack
            .last()
            .ok_or_else(|| AxmlError::Malformed("element stack underflow".to_string()))
    }

    fn current_frame_mut(&mut self) -> AxmlResult<&mut Frame<S::ElementId>> {
        self.stack
            .last_mut()
            .ok_or_else(|| AxmlError::Malformed("element stack underflow".to_string()))
    }
}
