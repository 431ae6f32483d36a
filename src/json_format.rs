//! JSON output in the layout downstream viewers were written against: four
//! space indentation and a bare `:` between keys and values, e.g.
//!
//! ```text
//! {
//!     "name":"a",
//!     "children":[]
//! }
//! ```

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};

use crate::error::{ErrorDetails, ErrorLayer, KvizError, Result};

const INDENT: &[u8] = b"    ";

/// `PrettyFormatter` with the space after the key separator dropped.
pub struct IndentedFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl<'a> IndentedFormatter<'a> {
    pub fn new() -> Self {
        IndentedFormatter {
            inner: PrettyFormatter::with_indent(INDENT),
        }
    }
}

impl<'a> Default for IndentedFormatter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Formatter for IndentedFormatter<'a> {
    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b":")
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_object_value(writer)
    }
}

pub fn write_indented<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let mut ser = Serializer::with_formatter(writer, IndentedFormatter::new());
    value.serialize(&mut ser)?;
    Ok(())
}

pub fn to_string_indented<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let mut buf = Vec::with_capacity(128);
    write_indented(&mut buf, value)?;
    output_to_string(buf)
}

pub(crate) fn output_to_string(buf: Vec<u8>) -> Result<String> {
    String::from_utf8(buf).map_err(|e| {
        KvizError::Problem(ErrorDetails {
            layer: ErrorLayer::DataLayer,
            message: e.to_string(),
        })
    })
}
